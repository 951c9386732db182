//! `zaphod rubrics` command - rubric creation only

use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{connect, finish, load_config};
use crate::cli::GlobalOpts;
use crate::core::config::RubricStrategy;
use crate::core::loader::ChangeSet;
use crate::core::pipeline::{Pipeline, SyncPlan};

#[derive(clap::Args, Debug)]
pub struct RubricsArgs {
    /// Only process assignment folders containing these paths
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Rubric creation strategy (default: rubric_strategy in zaphod.yaml)
    #[arg(long, value_enum)]
    pub strategy: Option<RubricStrategy>,
}

pub fn run(args: RubricsArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let client = connect(&config)?;

    let mut plan = SyncPlan::rubrics_only(&config.settings);
    if let Some(strategy) = args.strategy {
        plan.strategy = strategy;
    }
    let changes = (!args.paths.is_empty()).then(|| ChangeSet::new(args.paths));

    let report = Pipeline::new(&config.layout, &client)
        .sync(&plan, changes.as_ref())
        .map_err(|e| miette::miette!("{}", e))?;
    finish(&report, "Rubric Summary", global)
}
