//! Shared helper functions for CLI commands

use console::style;
use miette::Result;
use std::io::{self, IsTerminal};

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::report::{Outcome, RunReport};
use crate::remote::CanvasClient;

/// Resolve the run configuration; every error here is fatal
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let config = Config::load(&global.sources())?;
    tracing::debug!(
        course_id = config.course_id,
        root = %config.layout.root().display(),
        "loaded configuration"
    );
    Ok(config)
}

/// HTTP client for the configured course
pub fn connect(config: &Config) -> Result<CanvasClient> {
    CanvasClient::from_config(config).map_err(|e| miette::miette!("{}", e))
}

/// Whether a person can answer prompts
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Print the report and turn failed items into a non-zero exit
pub fn finish(report: &RunReport, title: &str, global: &GlobalOpts) -> Result<()> {
    if !global.quiet {
        report.print_summary(title, global.verbose);
    }

    match report.count(Outcome::Failed) {
        0 => {
            if !global.quiet {
                println!("{} Done", style("✓").green().bold());
            }
            Ok(())
        }
        1 => Err(miette::miette!("1 item failed")),
        n => Err(miette::miette!("{} items failed", n)),
    }
}
