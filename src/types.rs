//! Public and internal types for the repliq API and diff pipeline.

use std::path::PathBuf;

/// Which primary key the column resolver reports for a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemaMode {
    /// The engine's effective row identifier: the declared PRIMARY KEY for
    /// WITHOUT ROWID tables and INTEGER PRIMARY KEY tables, the hidden rowid
    /// for everything else.
    #[default]
    TruePk,
    /// The PRIMARY KEY clause declared in CREATE TABLE, falling back to the
    /// hidden rowid only when no PK is declared. Rows with a NULL in any PK
    /// column are excluded from comparison. Mandatory for RBU output.
    SchemaPk,
}

/// Filesystem event the watcher reacts to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FsEvent {
    /// A writable file descriptor on the database was closed.
    #[default]
    CloseWrite,
    /// The database file was modified. The writer may still hold the engine
    /// lock, so the controller waits 250 ms before diffing.
    Modify,
}

/// Debug bit: dump resolved column names per table instead of diffing.
pub const DEBUG_COLUMN_NAMES: u32 = 0x0001;
/// Debug bit: print the generated comparison query instead of running it.
pub const DEBUG_DIFF_SQL: u32 = 0x0002;

/// Immutable diff configuration, built once from the CLI and threaded through
/// the driver and per-table differs.
#[derive(Clone, Debug, Default)]
pub struct DiffOptions {
    /// Primary-key discovery mode. Forced to [`SchemaMode::SchemaPk`] when
    /// `rbu` is set.
    pub schema_mode: SchemaMode,
    /// Emit RBU staging-table output instead of direct SQL statements.
    pub rbu: bool,
    /// Bracket each diff in BEGIN TRANSACTION / COMMIT.
    pub use_transaction: bool,
    /// Debug bitset ([`DEBUG_COLUMN_NAMES`], [`DEBUG_DIFF_SQL`]).
    pub debug: u32,
    /// SQLite extension libraries to load into the diff connection.
    pub extensions: Vec<PathBuf>,
}

impl DiffOptions {
    /// Effective schema mode: RBU output requires schema-defined PKs.
    pub fn effective_schema_mode(&self) -> SchemaMode {
        if self.rbu {
            SchemaMode::SchemaPk
        } else {
            self.schema_mode
        }
    }
}
