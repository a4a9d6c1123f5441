//! Schema-aware SQL diff between two attached databases.
//!
//! The driver opens the backup as `main`, attaches the primary as `aux`,
//! and emits the statement stream that turns `main` into `aux`, either as
//! direct SQL (standard differ) or as RBU staging-table rows.

pub mod columns;
pub mod driver;
pub mod quote;
pub mod rbu;
pub mod table;
pub mod value;

pub use columns::{TableColumns, check_schemas_match, column_names};
pub use driver::{JournalSink, diff_databases};
pub use quote::quote_identifier;
pub use rbu::RbuTableDiffer;
pub use table::SqlTableDiffer;

use anyhow::Context;
use rusqlite::{Connection, DatabaseName, OptionalExtension};

use crate::Result;
use crate::types::DiffOptions;

/// Which attached schema a query targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Db {
    /// The database being transformed (the backup).
    Main,
    /// The database being transformed toward (the freshly written primary).
    Aux,
}

impl Db {
    /// Schema qualifier for generated SQL text.
    pub fn qualifier(self) -> &'static str {
        match self {
            Db::Main => "main",
            Db::Aux => "aux",
        }
    }

    pub(crate) fn name(self) -> DatabaseName<'static> {
        match self {
            Db::Main => DatabaseName::Main,
            Db::Aux => DatabaseName::Attached("aux"),
        }
    }
}

/// Capability implemented by the two per-table differs. The driver picks one
/// at construction and routes every table through it.
pub trait TableDiffer {
    /// Append to `out` whatever reconciles `table` between `main` and `aux`.
    fn diff_table(
        &self,
        conn: &Connection,
        table: &str,
        opts: &DiffOptions,
        out: &mut JournalSink<'_>,
    ) -> Result<()>;
}

/// True if `table` exists in schema `db`.
pub(crate) fn table_exists(conn: &Connection, db: Db, table: &str) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT 1 FROM {}.sqlite_master WHERE type='table' AND name=?1",
                db.qualifier()
            ),
            [table],
            |row| row.get(0),
        )
        .optional()
        .context("probe table existence")?;
    Ok(hit.is_some())
}
