//! Run orchestration: logging setup, options build, watch loop.

use anyhow::Result;

use super::arg_parser::Cli;
use crate::types::{DiffOptions, SchemaMode};
use crate::utils::setup_logging;
use crate::watcher::watch_directory;

/// Build the immutable diff configuration from CLI flags.
fn build_options(cli: &Cli) -> DiffOptions {
    DiffOptions {
        schema_mode: if cli.primarykey {
            SchemaMode::SchemaPk
        } else {
            SchemaMode::TruePk
        },
        rbu: cli.rbu,
        use_transaction: cli.transaction,
        debug: cli.debug,
        extensions: cli.lib.clone(),
    }
}

/// Handle the watch-and-replicate run.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose);
    let opts = build_options(cli);
    watch_directory(&cli.dir, cli.event.into(), &opts)
}
