//! `zaphod validate` command - offline check of the course tree

use console::style;
use miette::Result;
use std::collections::HashSet;

use crate::cli::GlobalOpts;
use crate::core::config::{CourseLayout, SyncSettings};
use crate::core::content::ContentKind;
use crate::core::loader::{folder_label, load_items, LocalItem};
use crate::rubric::{resolve, OutcomeMapping, RubricSpec};

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Show summary only, don't show individual results
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Debug, Default, PartialEq, Eq)]
struct ValidationStats {
    folders_checked: usize,
    folders_passed: usize,
    folders_failed: usize,
    rubrics_checked: usize,
    total_warnings: usize,
}

impl ValidationStats {
    fn failed(&self, strict: bool) -> bool {
        self.folders_failed > 0 || (strict && self.total_warnings > 0)
    }
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let layout = CourseLayout::open(&global.course_root)?;
    let settings = SyncSettings::load(&layout)?;
    let outcomes = OutcomeMapping::load(&layout.outcome_map_path()).map_err(|e| miette::miette!("{}", e))?;
    tracing::debug!(outcomes = outcomes.len(), strategy = %settings.rubric_strategy, "validating");

    let mut stats = check_tree(&layout, &outcomes, &args);
    if !outcomes.is_loaded() {
        stats.total_warnings += 1;
        println!(
            "{} {} not found; outcome criteria will be created as local",
            style("!").yellow(),
            layout.outcome_map_path().display()
        );
    }
    print_summary(&stats);

    if stats.failed(args.strict) {
        if stats.folders_failed == 0 {
            Err(miette::miette!(
                "Validation failed: {} warning(s) in strict mode",
                stats.total_warnings
            ))
        } else if stats.folders_failed == 1 {
            Err(miette::miette!("Validation failed: 1 folder has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} folders have errors",
                stats.folders_failed
            ))
        }
    } else {
        println!("{} All folders passed validation!", style("✓").green().bold());
        Ok(())
    }
}

fn check_tree(layout: &CourseLayout, outcomes: &OutcomeMapping, args: &ValidateArgs) -> ValidationStats {
    let mut stats = ValidationStats::default();
    let mut seen: HashSet<(ContentKind, String)> = HashSet::new();

    for loaded in load_items(layout) {
        stats.folders_checked += 1;
        let item = match loaded {
            Ok(item) => item,
            Err(e) => {
                stats.folders_failed += 1;
                if !args.summary {
                    let subject = e.folder().map(folder_label).unwrap_or_else(|| "pages".to_string());
                    println!("{} {} - {}", style("✗").red(), subject, e);
                }
                continue;
            }
        };

        if !seen.insert((item.kind(), item.name().to_string())) {
            stats.total_warnings += 1;
            if !args.summary {
                println!(
                    "{} {} - duplicate {} name '{}' (skipped during sync)",
                    style("!").yellow(),
                    item.label(),
                    item.kind(),
                    item.name()
                );
            }
            continue;
        }

        match check_rubric(&item, outcomes) {
            Ok(warnings) => {
                stats.folders_passed += 1;
                if item.rubric_file.is_some() {
                    stats.rubrics_checked += 1;
                }
                stats.total_warnings += warnings.len();
                if !args.summary {
                    println!("{} {}", style("✓").green(), item.label());
                    for warning in warnings {
                        println!("    {} {}", style("!").yellow(), warning);
                    }
                }
            }
            Err(e) => {
                stats.folders_failed += 1;
                if !args.summary {
                    println!("{} {} - {}", style("✗").red(), item.label(), e);
                }
            }
        }
    }

    stats
}

/// Parse and resolve the item's rubric; returns outcome fallbacks as warnings
fn check_rubric(item: &LocalItem, outcomes: &OutcomeMapping) -> Result<Vec<String>, String> {
    let Some(path) = item.rubric_file.as_deref() else {
        return Ok(Vec::new());
    };
    if item.kind() != ContentKind::Assignment {
        return Ok(vec![format!("rubric file ignored on a {}", item.kind())]);
    }

    let spec = RubricSpec::load(path).map_err(|e| e.to_string())?;
    let resolution = resolve(&spec, outcomes);
    Ok(resolution.fallbacks.iter().map(ToString::to_string).collect())
}

fn print_summary(stats: &ValidationStats) {
    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Folders checked: {}", style(stats.folders_checked).cyan());
    println!("  Folders passed:  {}", style(stats.folders_passed).green());
    println!("  Folders failed:  {}", style(stats.folders_failed).red());
    println!("  Rubrics checked: {}", style(stats.rubrics_checked).cyan());
    if stats.total_warnings > 0 {
        println!("  Total warnings:  {}", style(stats.total_warnings).yellow());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn folder(root: &std::path::Path, name: &str, meta: &str) -> std::path::PathBuf {
        let dir = root.join("pages").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("meta.json"), meta).unwrap();
        dir
    }

    fn quiet_args() -> ValidateArgs {
        ValidateArgs {
            strict: false,
            summary: true,
        }
    }

    #[test]
    fn test_counts_bad_folders_and_rubrics() {
        let tmp = tempdir().unwrap();
        folder(tmp.path(), "intro.page", r#"{"type": "page", "name": "Intro"}"#);
        folder(tmp.path(), "broken.page", r#"{"type": "page"}"#);
        let hw = folder(tmp.path(), "hw1.assignment", r#"{"type": "assignment", "name": "HW 1"}"#);
        fs::write(
            hw.join("rubric.yaml"),
            "title: HW 1 Rubric\ncriteria:\n  - description: Clarity\n    ratings:\n      - {description: Good, points: 5}\n",
        )
        .unwrap();

        let layout = CourseLayout::open(tmp.path()).unwrap();
        let outcomes = OutcomeMapping::from_pairs([("OC1", 7)]);
        let stats = check_tree(&layout, &outcomes, &quiet_args());

        assert_eq!(stats.folders_checked, 3);
        assert_eq!(stats.folders_passed, 2);
        assert_eq!(stats.folders_failed, 1);
        assert_eq!(stats.rubrics_checked, 1);
        assert!(stats.failed(false));
    }

    #[test]
    fn test_fallbacks_only_fail_in_strict_mode() {
        let tmp = tempdir().unwrap();
        let hw = folder(tmp.path(), "hw1.assignment", r#"{"type": "assignment", "name": "HW 1"}"#);
        fs::write(
            hw.join("rubric.yaml"),
            "title: R\ncriteria:\n  - description: Goal\n    kind: outcome\n    outcome_code: MISSING\n    ratings:\n      - {description: Met, points: 3}\n",
        )
        .unwrap();

        let layout = CourseLayout::open(tmp.path()).unwrap();
        let outcomes = OutcomeMapping::from_pairs([("OC1", 7)]);
        let stats = check_tree(&layout, &outcomes, &quiet_args());

        assert_eq!(stats.folders_failed, 0);
        assert_eq!(stats.total_warnings, 1);
        assert!(!stats.failed(false));
        assert!(stats.failed(true));
    }

    #[test]
    fn test_duplicate_names_warn() {
        let tmp = tempdir().unwrap();
        folder(tmp.path(), "a.page", r#"{"type": "page", "name": "Same"}"#);
        folder(tmp.path(), "b.page", r#"{"type": "page", "name": "Same"}"#);

        let layout = CourseLayout::open(tmp.path()).unwrap();
        let outcomes = OutcomeMapping::from_pairs([("OC1", 7)]);
        let stats = check_tree(&layout, &outcomes, &quiet_args());

        assert_eq!(stats.folders_passed, 1);
        assert_eq!(stats.total_warnings, 1);
    }
}
