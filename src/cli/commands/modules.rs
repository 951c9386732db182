//! `zaphod modules` command - module placement only

use miette::Result;

use crate::cli::helpers::{connect, finish, load_config};
use crate::cli::GlobalOpts;
use crate::core::pipeline::{Pipeline, SyncPlan};

#[derive(clap::Args, Debug)]
pub struct ModulesArgs {}

pub fn run(_args: ModulesArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    if !config.settings.manage_modules {
        tracing::info!("manage_modules is off in zaphod.yaml; nothing to do");
        return Ok(());
    }
    let client = connect(&config)?;

    let report = Pipeline::new(&config.layout, &client)
        .sync(&SyncPlan::modules_only(&config.settings), None)
        .map_err(|e| miette::miette!("{}", e))?;
    finish(&report, "Module Summary", global)
}
