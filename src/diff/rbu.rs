//! RBU per-table differ: staged-update `data_<table>` output.
//!
//! Instead of direct SQL, each changed table gets a staging-table DDL plus
//! one INSERT per diff row carrying an `rbu_control` value: integer 0 for
//! inserts, integer 1 for deletes, and for updates a string with one `.`
//! (unchanged), `x` (changed) or `f` (changed, value is a binary delta) per
//! column.

use anyhow::{Context, bail};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use std::fmt::Write;

use super::columns::{TableColumns, check_schemas_match, column_names};
use super::driver::JournalSink;
use super::quote::{escape_single_quotes, quote_identifier};
use super::value::{push_blob, push_value};
use super::{Db, TableDiffer};
use crate::delta;
use crate::Result;
use crate::types::{DEBUG_DIFF_SQL, DiffOptions, SchemaMode};

/// Differ emitting RBU staging-table rows.
pub struct RbuTableDiffer;

impl TableDiffer for RbuTableDiffer {
    fn diff_table(
        &self,
        conn: &Connection,
        table: &str,
        opts: &DiffOptions,
        out: &mut JournalSink<'_>,
    ) -> Result<()> {
        rbudiff_one_table(conn, table, opts, out)
    }
}

fn rbudiff_one_table(
    conn: &Connection,
    table: &str,
    opts: &DiffOptions,
    out: &mut JournalSink<'_>,
) -> Result<()> {
    // RBU staging requires identical schemas on both sides; a mismatch
    // aborts the whole diff rather than producing an unappliable patch.
    check_schemas_match(conn, table)?;

    // RBU mode always keys on the schema-defined primary key.
    let Some(tc) = column_names(conn, Db::Main, table, SchemaMode::SchemaPk)? else {
        log::warn!(
            "table {} skipped: no usable PK columns",
            quote_identifier(table)
        );
        return Ok(());
    };
    let n_col = tc.cols.len();
    let n_pk = tc.n_pk;
    // With an implicit rowid the staging table carries a leading rbu_rowid
    // column in place of the alias name.
    let rowid = tc.implicit_rowid as usize;

    let sql = rbudiff_query(table, &tc);
    if opts.debug & DEBUG_DIFF_SQL != 0 {
        println!("SQL for {}:\n{}", quote_identifier(table), sql);
        return Ok(());
    }

    let esc = escape_single_quotes(table);
    let mut create = format!("CREATE TABLE IF NOT EXISTS 'data_{esc}'(");
    if rowid == 1 {
        create.push_str("rbu_rowid, ");
    }
    create.push_str(&tc.cols[rowid..].join(", "));
    create.push_str(", rbu_control);");

    let mut insert = format!("INSERT INTO 'data_{esc}' (");
    if rowid == 1 {
        insert.push_str("rbu_rowid, ");
    }
    insert.push_str(&tc.cols[rowid..].join(", "));
    insert.push_str(", rbu_control) VALUES(");

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("SQL statement error in RBU query for {table}"))?;
    let mut rows = stmt.query([])?;
    let mut first_row = true;
    while let Some(row) = rows.next()? {
        // Emit the staging DDL only once a first diff row exists.
        if first_row {
            out.stmt(&create)?;
            first_row = false;
        }
        let mut s = insert.clone();

        if let ValueRef::Integer(_) = row.get_ref(n_col)? {
            // Insert (0) or delete (1): values straight through, control last.
            for i in 0..=n_col {
                if i > 0 {
                    s.push_str(", ");
                }
                push_value(&mut s, row.get_ref(i)?);
            }
        } else {
            // Update row: the trailing columns carry the old values so blob
            // cells can be shrunk to deltas against them.
            let ValueRef::Text(text) = row.get_ref(n_col)? else {
                bail!("unexpected rbu_control type for table {table}");
            };
            let mut control = text.to_vec();
            for i in 0..n_col {
                let mut done = false;
                if i >= n_pk
                    && let (ValueRef::Blob(new), ValueRef::Blob(old)) =
                        (row.get_ref(i)?, row.get_ref(n_col + 1 + i)?)
                {
                    let d = delta::encode(old, new);
                    if d.len() < new.len() {
                        push_blob(&mut s, &d);
                        control[i - rowid] = b'f';
                        done = true;
                    }
                }
                if !done {
                    push_value(&mut s, row.get_ref(i)?);
                }
                s.push_str(", ");
            }
            let _ = write!(s, "'{}'", String::from_utf8_lossy(&control));
        }

        s.push_str(");");
        out.stmt(&s)?;
    }
    Ok(())
}

/// Build the three-branch UNION ALL query producing staging rows.
///
/// Result row layout: the table's columns (update rows hold NULL where a
/// column is unchanged), then the control value, then one old-value column
/// per table column (NULL except for changed non-PK columns of update rows).
fn rbudiff_query(table: &str, tc: &TableColumns) -> String {
    let id = quote_identifier(table);
    let cols = &tc.cols;
    let n_col = cols.len();
    let n_pk = tc.n_pk;
    let nulls = |n: usize| vec!["NULL"; n].join(", ");
    let pk_join: Vec<String> = cols[..n_pk]
        .iter()
        .map(|c| format!("(n.{c} IS o.{c})"))
        .collect();
    let pk_join = pk_join.join(" AND ");
    let mut sql = String::new();

    // Newly inserted rows: control 0.
    let _ = write!(
        sql,
        "SELECT {}, 0, {} FROM aux.{id} AS n WHERE NOT EXISTS (\n    \
         SELECT 1 FROM main.{id} AS o WHERE {pk_join}\n)",
        cols.join(", "),
        nulls(n_col),
    );
    if !tc.implicit_rowid {
        for pk in &cols[..n_pk] {
            let _ = write!(sql, " AND n.{pk} IS NOT NULL");
        }
    }

    // Deleted rows: control 1.
    let _ = write!(sql, "\nUNION ALL\nSELECT {}", cols[..n_pk].join(", "));
    if n_col > n_pk {
        let _ = write!(sql, ", {}", nulls(n_col - n_pk));
    }
    let _ = write!(
        sql,
        ", 1, {} FROM main.{id} AS n WHERE NOT EXISTS (\n    \
         SELECT 1 FROM aux.{id} AS o WHERE {pk_join}\n)",
        nulls(n_col),
    );
    if !tc.implicit_rowid {
        for pk in &cols[..n_pk] {
            let _ = write!(sql, " AND n.{pk} IS NOT NULL");
        }
    }

    // Updated rows. When every column is in the PK there is nothing to
    // update and the branch is omitted.
    if n_col > n_pk {
        sql.push_str("\nUNION ALL\nSELECT ");
        let pk_new: Vec<String> = cols[..n_pk].iter().map(|c| format!("n.{c}")).collect();
        let _ = write!(sql, "{},\n", pk_new.join(", "));
        let new_vals: Vec<String> = cols[n_pk..]
            .iter()
            .map(|c| format!("    CASE WHEN n.{c} IS o.{c} THEN NULL ELSE n.{c} END"))
            .collect();
        sql.push_str(&new_vals.join(" ,\n"));

        // The control string: dots for the PK positions (suppressed when the
        // key is the implicit rowid), then '.' or 'x' per data column.
        if tc.implicit_rowid {
            sql.push_str(",\n");
        } else {
            let _ = write!(sql, ", '{}' ||\n", ".".repeat(n_pk));
        }
        let flags: Vec<String> = cols[n_pk..]
            .iter()
            .map(|c| format!("    CASE WHEN n.{c} IS o.{c} THEN '.' ELSE 'x' END"))
            .collect();
        sql.push_str(&flags.join(" ||\n"));
        let _ = write!(sql, "\nAS ota_control, {},\n", nulls(n_pk));
        let old_vals: Vec<String> = cols[n_pk..]
            .iter()
            .map(|c| format!("    CASE WHEN n.{c} IS o.{c} THEN NULL ELSE o.{c} END"))
            .collect();
        sql.push_str(&old_vals.join(" ,\n"));
        let _ = write!(
            sql,
            "\nFROM main.{id} AS o, aux.{id} AS n\nWHERE {pk_join} AND ota_control LIKE '%x%'"
        );
        if !tc.implicit_rowid {
            for pk in &cols[..n_pk] {
                let _ = write!(sql, " AND n.{pk} IS NOT NULL");
            }
        }
    }

    sql.push_str("\nORDER BY ");
    let order: Vec<String> = (1..=n_pk).map(|i| i.to_string()).collect();
    sql.push_str(&order.join(", "));
    sql
}
