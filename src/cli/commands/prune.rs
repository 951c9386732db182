//! `zaphod prune` command - delete remote items with no local folder

use console::style;
use dialoguer::Confirm;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{connect, finish, is_interactive, load_config};
use crate::cli::GlobalOpts;
use crate::core::pipeline::Pipeline;
use crate::core::prune::PrunePolicy;
use crate::core::report::Outcome;

#[derive(clap::Args, Debug)]
pub struct PruneArgs {
    /// Delete the extras (default: only list them)
    #[arg(long)]
    pub apply: bool,

    /// Also delete assignments that have no local folder
    #[arg(long)]
    pub include_assignments: bool,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the report as JSON instead of a table
    #[arg(long, conflicts_with = "apply")]
    pub json: bool,
}

impl PruneArgs {
    pub fn policy(&self) -> PrunePolicy {
        PrunePolicy {
            apply: self.apply,
            include_assignments: self.include_assignments,
        }
    }
}

pub fn run(args: PruneArgs, global: &GlobalOpts) -> Result<()> {
    if args.apply && !args.yes && !is_interactive() {
        return Err(miette::miette!(
            "Cannot confirm in non-interactive mode. Use --yes to skip confirmation."
        ));
    }

    let config = load_config(global)?;
    let client = connect(&config)?;
    let pipeline = Pipeline::new(&config.layout, &client);
    let policy = args.policy();

    let plan = pipeline.plan_prune().map_err(|e| miette::miette!("{}", e))?;

    if args.apply && !args.yes {
        let preview = pipeline.execute_prune(&plan, PrunePolicy { apply: false, ..policy });
        let pending = preview.count(Outcome::WouldPrune);
        if pending == 0 {
            preview.print_summary("Prune Summary", global.verbose);
            println!("{} Nothing to delete", style("✓").green().bold());
            return Ok(());
        }

        if let Some(table) = preview.render_table(global.verbose) {
            println!("{}", table);
        }
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} remote item(s)?", pending))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = pipeline.execute_prune(&plan, policy);

    if args.json {
        let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
        println!("{}", json);
        return Ok(());
    }
    finish(&report, "Prune Summary", global)
}
