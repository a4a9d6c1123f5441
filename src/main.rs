//! Repliq CLI: watch a database directory and keep its backups patched.

use anyhow::Result;
use clap::Parser;
use repliq::engine::arg_parser::Cli;
use repliq::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    // Usage errors exit 1 like every other fatal error; --help and
    // --version still print to stdout and exit 0.
    let cli = Cli::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            let _ = e.print();
            std::process::exit(1);
        }
        e.exit()
    });
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
