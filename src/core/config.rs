//! Run configuration
//!
//! A [`Config`] is built once per run from command-line/environment values,
//! `_course_metadata/defaults.json`, `_course_metadata/zaphod.yaml` and the
//! credential file, then handed to every component that needs it.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::credentials::{default_credentials_path, Credentials};

/// Directory of local content folders
pub const PAGES_DIR: &str = "pages";
/// Directory of course-level metadata
pub const METADATA_DIR: &str = "_course_metadata";

/// Configuration errors; all of them abort the run before any remote call
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("course id is not set")]
    #[diagnostic(
        code(zaphod::config::course_id),
        help("pass --course-id, set COURSE_ID, or add \"course_id\" to _course_metadata/defaults.json")
    )]
    MissingCourseId,

    #[error("invalid course id '{0}'")]
    #[diagnostic(code(zaphod::config::course_id))]
    InvalidCourseId(String),

    #[error("credential file does not exist: {}", .0.display())]
    #[diagnostic(
        code(zaphod::config::credentials),
        help("pass --credentials or set CANVAS_CREDENTIAL_FILE")
    )]
    MissingCredentials(PathBuf),

    #[error("credential file {path} must define {key}")]
    #[diagnostic(code(zaphod::config::credentials))]
    MissingCredentialKey { path: String, key: &'static str },

    #[error("no credential file given and no home directory to look in")]
    #[diagnostic(
        code(zaphod::config::credentials),
        help("pass --credentials or set CANVAS_CREDENTIAL_FILE")
    )]
    NoHomeDirectory,

    #[error("no pages/ directory under {}", .0.display())]
    #[diagnostic(
        code(zaphod::config::course_root),
        help("run from the course root or pass --course-root")
    )]
    NoPagesDir(PathBuf),

    #[error("invalid settings in {path}: {message}")]
    #[diagnostic(code(zaphod::config::settings))]
    Settings { path: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How rubrics are created remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RubricStrategy {
    /// One create-and-associate request
    #[default]
    Inline,
    /// CSV upload job, polled, then a separate association request
    Upload,
}

impl std::fmt::Display for RubricStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RubricStrategy::Inline => write!(f, "inline"),
            RubricStrategy::Upload => write!(f, "upload"),
        }
    }
}

/// Settings from `_course_metadata/zaphod.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Whether the module placement step runs at all
    pub manage_modules: bool,

    /// Whether `sync` includes the rubric step
    pub sync_rubrics: bool,

    pub rubric_strategy: RubricStrategy,

    /// Seconds between upload job polls
    pub poll_interval_secs: f64,

    /// Seconds before a non-terminal upload job counts as timed out
    pub poll_timeout_secs: f64,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            manage_modules: true,
            sync_rubrics: true,
            rubric_strategy: RubricStrategy::Inline,
            poll_interval_secs: 1.0,
            poll_timeout_secs: 60.0,
            request_timeout_secs: 30,
        }
    }
}

impl SyncSettings {
    /// Load settings from a course root; a missing file means defaults
    pub fn load(layout: &CourseLayout) -> Result<Self, ConfigError> {
        let path = layout.settings_path();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let settings: Self = crate::yaml::parse_yaml_file(&path).map_err(|e| ConfigError::Settings {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        settings.validate(&path)?;
        Ok(settings)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Settings {
            path: path.display().to_string(),
            message: message.to_string(),
        };
        if Duration::try_from_secs_f64(self.poll_interval_secs).is_err() {
            return Err(invalid("poll_interval_secs must be a non-negative number of seconds"));
        }
        if Duration::try_from_secs_f64(self.poll_timeout_secs).is_err() {
            return Err(invalid("poll_timeout_secs must be a non-negative number of seconds"));
        }
        Ok(())
    }

    // Out-of-range values are rejected by `load`
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs).unwrap_or_default()
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_timeout_secs).unwrap_or_default()
    }
}

/// Well-known paths inside a course root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseLayout {
    root: PathBuf,
}

impl CourseLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a course root, requiring its `pages/` directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let layout = Self::new(root);
        if !layout.pages_dir().is_dir() {
            return Err(ConfigError::NoPagesDir(layout.root.clone()));
        }
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(PAGES_DIR)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn defaults_path(&self) -> PathBuf {
        self.metadata_dir().join("defaults.json")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.metadata_dir().join("zaphod.yaml")
    }

    pub fn outcome_map_path(&self) -> PathBuf {
        self.metadata_dir().join("outcome_map.json")
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub course_root: PathBuf,
    pub course_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

/// Everything a sync run needs, resolved up front
#[derive(Debug, Clone)]
pub struct Config {
    pub layout: CourseLayout,
    pub course_id: u64,
    pub credentials: Credentials,
    pub settings: SyncSettings,
}

impl Config {
    pub fn load(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let layout = CourseLayout::open(&sources.course_root)?;
        let course_id = resolve_course_id(sources.course_id.as_deref(), &layout)?;
        let credentials_path = match &sources.credentials_path {
            Some(path) => path.clone(),
            None => default_credentials_path().ok_or(ConfigError::NoHomeDirectory)?,
        };
        let credentials = Credentials::load(&credentials_path)?;
        let settings = SyncSettings::load(&layout)?;

        Ok(Self {
            layout,
            course_id,
            credentials,
            settings,
        })
    }
}

#[derive(Deserialize)]
struct CourseDefaults {
    course_id: Option<serde_json::Value>,
}

/// Explicit value first, then `_course_metadata/defaults.json`
pub fn resolve_course_id(explicit: Option<&str>, layout: &CourseLayout) -> Result<u64, ConfigError> {
    if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return parse_course_id(value);
    }

    let path = layout.defaults_path();
    if !path.is_file() {
        return Err(ConfigError::MissingCourseId);
    }
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let defaults: CourseDefaults = serde_json::from_str(&content).map_err(|e| ConfigError::Settings {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    match defaults.course_id {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| ConfigError::InvalidCourseId(n.to_string())),
        Some(serde_json::Value::String(s)) => parse_course_id(&s),
        Some(other) => Err(ConfigError::InvalidCourseId(other.to_string())),
        None => Err(ConfigError::MissingCourseId),
    }
}

fn parse_course_id(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidCourseId(value.to_string()))
}
