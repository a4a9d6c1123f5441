use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::types::FsEvent;

/// Keep live replicas of SQLite databases.
#[derive(Clone, Parser)]
#[command(name = "repliq")]
#[command(about = "Watch a database directory; diff, journal, and patch its backups.")]
pub struct Cli {
    /// Path to the database directory.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Load an SQLite extension library. Can be given more than once.
    #[arg(long = "lib", short = 'L', value_name = "LIBRARY")]
    pub lib: Vec<PathBuf>,

    /// Use schema-defined PRIMARY KEYs instead of the true primary key.
    #[arg(long)]
    pub primarykey: bool,

    /// Output SQL to create/populate RBU staging table(s).
    #[arg(long)]
    pub rbu: bool,

    /// Wrap each diff in BEGIN TRANSACTION / COMMIT.
    #[arg(long)]
    pub transaction: bool,

    /// Filesystem event to catch.
    #[arg(long, value_enum, value_name = "EVENT", default_value = "close_write")]
    pub event: EventArg,

    /// Debug bitset: bit 0 dumps column-name resolution, bit 1 prints the
    /// generated diff SQL instead of executing it.
    #[arg(long, value_name = "BITS", default_value_t = 0)]
    pub debug: u32,

    /// Verbose output.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// CLI spelling of the watcher event mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EventArg {
    /// A writable handle on the database was closed.
    #[value(name = "close_write")]
    CloseWrite,
    /// The database file was modified (waits 250 ms for lock release).
    #[value(name = "modify")]
    Modify,
}

impl From<EventArg> for FsEvent {
    fn from(e: EventArg) -> Self {
        match e {
            EventArg::CloseWrite => FsEvent::CloseWrite,
            EventArg::Modify => FsEvent::Modify,
        }
    }
}
