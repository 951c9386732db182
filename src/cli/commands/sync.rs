//! `zaphod sync` command - full sync run

use miette::Result;

use crate::cli::helpers::{connect, finish, load_config};
use crate::cli::GlobalOpts;
use crate::core::config::RubricStrategy;
use crate::core::pipeline::{Pipeline, SyncPlan};

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Skip module placement for this run
    #[arg(long)]
    pub no_modules: bool,

    /// Skip rubric creation for this run
    #[arg(long)]
    pub no_rubrics: bool,

    /// Rubric creation strategy (default: rubric_strategy in zaphod.yaml)
    #[arg(long, value_enum)]
    pub strategy: Option<RubricStrategy>,
}

impl SyncArgs {
    pub fn apply_to(&self, plan: &mut SyncPlan) {
        if self.no_modules {
            plan.modules = false;
        }
        if self.no_rubrics {
            plan.rubrics = false;
        }
        if let Some(strategy) = self.strategy {
            plan.strategy = strategy;
        }
    }
}

pub fn run(args: SyncArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let client = connect(&config)?;

    let mut plan = SyncPlan::from_settings(&config.settings);
    args.apply_to(&mut plan);
    tracing::info!(
        course_id = config.course_id,
        modules = plan.modules,
        rubrics = plan.rubrics,
        strategy = %plan.strategy,
        "starting sync"
    );

    let report = Pipeline::new(&config.layout, &client)
        .sync(&plan, None)
        .map_err(|e| miette::miette!("{}", e))?;
    finish(&report, "Sync Summary", global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SyncSettings;

    #[test]
    fn test_flags_override_settings() {
        let args = SyncArgs {
            no_modules: true,
            no_rubrics: false,
            strategy: Some(RubricStrategy::Upload),
        };
        let mut plan = SyncPlan::from_settings(&SyncSettings::default());
        args.apply_to(&mut plan);
        assert!(!plan.modules);
        assert!(plan.rubrics);
        assert_eq!(plan.strategy, RubricStrategy::Upload);
    }
}
