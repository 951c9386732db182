//! Shared test helpers for integration tests
//!
//! Builds course trees on disk and sync plans that never sleep.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use zaphod::core::config::{CourseLayout, SyncSettings};
use zaphod::core::pipeline::SyncPlan;
use zaphod::rubric::PollSettings;

/// Helper to get a zaphod command with no course settings leaking in from the environment
pub fn zaphod() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("zaphod"));
    cmd.env_remove("COURSE_ID")
        .env_remove("CANVAS_CREDENTIAL_FILE")
        .env_remove("RUST_LOG");
    cmd
}

/// A course root with empty `pages/` and `_course_metadata/` directories
pub struct TestCourse {
    pub dir: TempDir,
}

impl TestCourse {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pages")).unwrap();
        fs::create_dir_all(dir.path().join("_course_metadata")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> CourseLayout {
        CourseLayout::open(self.root()).unwrap()
    }

    /// Write `pages/<folder>/meta.json` plus an `index.md` body
    pub fn item(&self, folder: &str, meta: &str) -> PathBuf {
        let dir = self.root().join("pages").join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("meta.json"), meta).unwrap();
        fs::write(dir.join("index.md"), "# body\n").unwrap();
        dir
    }

    pub fn page(&self, folder: &str, name: &str, modules: &[&str]) -> PathBuf {
        self.item(folder, &meta("page", name, modules))
    }

    pub fn assignment(&self, folder: &str, name: &str, modules: &[&str]) -> PathBuf {
        self.item(folder, &meta("assignment", name, modules))
    }

    /// Write `rubric.yaml` into an existing folder
    pub fn rubric(&self, folder: &Path, yaml: &str) -> PathBuf {
        let path = folder.join("rubric.yaml");
        fs::write(&path, yaml).unwrap();
        path
    }

    pub fn outcome_map(&self, json: &str) {
        fs::write(self.root().join("_course_metadata/outcome_map.json"), json).unwrap();
    }

    pub fn defaults(&self, json: &str) {
        fs::write(self.root().join("_course_metadata/defaults.json"), json).unwrap();
    }
}

fn meta(kind: &str, name: &str, modules: &[&str]) -> String {
    serde_json::json!({
        "type": kind,
        "name": name,
        "modules": modules,
    })
    .to_string()
}

/// Full plan whose poll loop never sleeps
pub fn fast_plan() -> SyncPlan {
    let mut plan = SyncPlan::from_settings(&SyncSettings::default());
    plan.poll = PollSettings {
        interval: Duration::ZERO,
        timeout: Duration::from_secs(5),
    };
    plan
}

/// Two criteria: one local, one aligned to outcome `OC1`
pub const MIXED_RUBRIC: &str = r#"
title: Essay Rubric
free_form_criterion_comments: true
criteria:
  - description: Thesis
    points: 10
    ratings:
      - {description: Strong, points: 10}
      - {description: Weak, points: 4}
  - description: Evidence
    kind: outcome
    outcome_code: OC1
    ratings:
      - {description: Meets, points: 5}
      - {description: Does not meet, points: 0}
"#;
