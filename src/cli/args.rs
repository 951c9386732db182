//! Command-line arguments

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    modules::ModulesArgs, prune::PruneArgs, rubrics::RubricsArgs, sync::SyncArgs,
    validate::ValidateArgs, watch::WatchArgs,
};
use crate::core::config::ConfigSources;

#[derive(Parser, Debug)]
#[command(name = "zaphod")]
#[command(author, version, about = "Sync a plain-text course tree to Canvas")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Course root (the directory holding pages/ and _course_metadata/)
    #[arg(long, global = true, default_value = ".")]
    pub course_root: PathBuf,

    /// Canvas course id (default: course_id in _course_metadata/defaults.json)
    #[arg(long, global = true, env = "COURSE_ID")]
    pub course_id: Option<String>,

    /// Credential file with API_KEY and API_URL (default: ~/.canvas/credentials.txt)
    #[arg(long, global = true, env = "CANVAS_CREDENTIAL_FILE")]
    pub credentials: Option<PathBuf>,

    /// Show debug logging and unchanged items
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors, skip the summary table
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    pub fn sources(&self) -> ConfigSources {
        ConfigSources {
            course_root: self.course_root.clone(),
            course_id: self.course_id.clone(),
            credentials_path: self.credentials.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile, place modules and create rubrics
    Sync(SyncArgs),

    /// Place content into modules only
    Modules(ModulesArgs),

    /// Create rubrics for assignments only
    Rubrics(RubricsArgs),

    /// List (or delete) remote content with no local declaration
    Prune(PruneArgs),

    /// Check descriptors and rubric specs without contacting Canvas
    Validate(ValidateArgs),

    /// Sync once, then again whenever the course tree changes
    Watch(WatchArgs),
}
