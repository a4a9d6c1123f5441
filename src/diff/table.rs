//! Standard per-table differ: direct INSERT/UPDATE/DELETE/DDL output.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::fmt::Write;

use super::columns::{TableColumns, column_names};
use super::driver::JournalSink;
use super::quote::quote_identifier;
use super::value::push_value;
use super::{Db, TableDiffer, table_exists};
use crate::Result;
use crate::types::{DEBUG_COLUMN_NAMES, DEBUG_DIFF_SQL, DiffOptions, SchemaMode};

/// Differ emitting plain SQL statements that replay against the backup.
pub struct SqlTableDiffer;

impl TableDiffer for SqlTableDiffer {
    fn diff_table(
        &self,
        conn: &Connection,
        table: &str,
        opts: &DiffOptions,
        out: &mut JournalSink<'_>,
    ) -> Result<()> {
        diff_one_table(conn, table, opts, out)
    }
}

/// Compute all differences for a single table.
fn diff_one_table(
    conn: &Connection,
    table: &str,
    opts: &DiffOptions,
    out: &mut JournalSink<'_>,
) -> Result<()> {
    let id = quote_identifier(table);
    let mode = opts.effective_schema_mode();

    if opts.debug & DEBUG_COLUMN_NAMES != 0 {
        dump_column_names(conn, table, &id, mode)?;
        return Ok(());
    }

    match (
        table_exists(conn, Db::Main, table)?,
        table_exists(conn, Db::Aux, table)?,
    ) {
        (false, false) => return Ok(()),
        (true, false) => {
            out.stmt(&format!("DROP TABLE {id};"))?;
            return Ok(());
        }
        (false, true) => return dump_table(conn, table, &id, mode, out),
        (true, true) => {}
    }

    let main_cols = column_names(conn, Db::Main, table, mode)?;
    let aux_cols = column_names(conn, Db::Aux, table, mode)?;
    let (Some(main_cols), Some(aux_cols)) = (main_cols, aux_cols) else {
        log::warn!("table {id} skipped: every rowid alias collides with a declared column");
        return Ok(());
    };

    // Length of the shared leading column run. Anything main has beyond it,
    // or a PK shape change, means the table must be rebuilt.
    let shared = main_cols
        .cols
        .iter()
        .zip(&aux_cols.cols)
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count();
    if main_cols.n_pk != aux_cols.n_pk || shared < main_cols.cols.len() {
        out.stmt(&format!("DROP TABLE {id}; -- due to schema mismatch"))?;
        return dump_table(conn, table, &id, mode, out);
    }

    let az2 = &aux_cols.cols;
    let n_pk = main_cols.n_pk;
    let n2 = az2.len();
    for extra in &az2[shared..] {
        out.stmt(&format!("ALTER TABLE {id} ADD COLUMN {extra};"))?;
    }

    let sql = build_diff_query(&main_cols, &aux_cols, &id, mode);
    if opts.debug & DEBUG_DIFF_SQL != 0 {
        println!("SQL for {id}:\n{sql}");
        return Ok(());
    }

    // Drop indexes that exist in main but not (by SQL text) in aux.
    let mut stmt = conn.prepare(
        "SELECT name FROM main.sqlite_master \
         WHERE type='index' AND tbl_name=?1 AND sql IS NOT NULL \
           AND sql NOT IN (SELECT sql FROM aux.sqlite_master \
                            WHERE type='index' AND tbl_name=?1 AND sql IS NOT NULL)",
    )?;
    let stale: Vec<String> = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()
        .context("list stale indexes")?;
    for name in stale {
        out.stmt(&format!("DROP INDEX {};", quote_identifier(&name)))?;
    }

    // Run the comparison query and turn each row into a statement.
    let n_q = n_pk + 1 + 2 * (n2 - n_pk);
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("SQL statement error in diff query for {id}"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let op: i64 = row.get(n_pk)?;
        let mut s;
        if op == 1 || op == 2 {
            if op == 1 {
                s = format!("UPDATE {id}");
                let mut sep = " SET";
                let mut i = n_pk + 1;
                while i < n_q {
                    let changed: i64 = row.get(i)?;
                    if changed != 0 {
                        let _ = write!(s, "{sep} {}=", az2[(i + n_pk - 1) / 2]);
                        sep = ",";
                        push_value(&mut s, row.get_ref(i + 1)?);
                    }
                    i += 2;
                }
            } else {
                s = format!("DELETE FROM {id}");
            }
            let mut sep = " WHERE";
            for (j, pk) in az2[..n_pk].iter().enumerate() {
                let _ = write!(s, "{sep} {pk}=");
                push_value(&mut s, row.get_ref(j)?);
                sep = " AND";
            }
        } else {
            s = format!("INSERT INTO {id}({}) VALUES", az2.join(","));
            let mut sep = '(';
            for j in 0..n_pk {
                s.push(sep);
                sep = ',';
                push_value(&mut s, row.get_ref(j)?);
            }
            let mut i = n_pk + 2;
            while i < n_q {
                s.push(',');
                push_value(&mut s, row.get_ref(i)?);
                i += 2;
            }
            s.push(')');
        }
        s.push(';');
        out.stmt(&s)?;
    }
    drop(rows);
    drop(stmt);

    // Create indexes that exist in aux but not in main, verbatim.
    let mut stmt = conn.prepare(
        "SELECT sql FROM aux.sqlite_master \
         WHERE type='index' AND tbl_name=?1 AND sql IS NOT NULL \
           AND sql NOT IN (SELECT sql FROM main.sqlite_master \
                            WHERE type='index' AND tbl_name=?1 AND sql IS NOT NULL)",
    )?;
    let missing: Vec<String> = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()
        .context("list missing indexes")?;
    for sql in missing {
        out.stmt(&format!("{sql};"))?;
    }
    Ok(())
}

/// Build the three-branch UNION ALL comparison query.
///
/// Result row layout: PK values, then `op` (1 changed, 2 deleted,
/// 3 inserted), then a `(changed, new_value)` pair per non-PK column.
/// Comparison uses IS NOT so two NULLs compare equal. Under the declared-PK
/// mode, rows with a NULL anywhere in the key are left out of every branch.
fn build_diff_query(
    main_cols: &TableColumns,
    aux_cols: &TableColumns,
    id: &str,
    mode: SchemaMode,
) -> String {
    let az = &main_cols.cols;
    let az2 = &aux_cols.cols;
    let n_pk = main_cols.n_pk;
    let n = az.len();
    let n2 = az2.len();
    let pk_not_null = mode == SchemaMode::SchemaPk && !main_cols.implicit_rowid;
    let mut sql = String::new();

    if n2 > n_pk {
        // Changed rows: PK match, at least one data column differs.
        let mut sep = "SELECT ";
        for pk in &az[..n_pk] {
            let _ = write!(sql, "{sep}B.{pk}");
            sep = ", ";
        }
        sql.push_str(", 1, -- changed row\n");
        for i in n_pk..n2 {
            let trail = if i + 1 == n2 { "" } else { "," };
            if i < n {
                let _ = writeln!(sql, "       A.{} IS NOT B.{}, B.{}{trail}", az[i], az2[i], az2[i]);
            } else {
                let _ = writeln!(sql, "       B.{} IS NOT NULL, B.{}{trail}", az2[i], az2[i]);
            }
        }
        let _ = writeln!(sql, "  FROM main.{id} A, aux.{id} B");
        let mut sep = " WHERE";
        for pk in &az[..n_pk] {
            let _ = write!(sql, "{sep} A.{pk}=B.{pk}");
            sep = " AND";
        }
        let mut sep = "\n   AND (";
        for i in n_pk..n2 {
            let close = if i + 1 == n2 { ")" } else { "" };
            if i < n {
                let _ = writeln!(sql, "{sep}A.{} IS NOT B.{}{close}", az[i], az2[i]);
            } else {
                let _ = writeln!(sql, "{sep}B.{} IS NOT NULL{close}", az2[i]);
            }
            sep = "        OR ";
        }
        sql.push_str(" UNION ALL\n");
    }

    // Deleted rows: in main, no PK match in aux.
    let mut sep = "SELECT ";
    for pk in &az[..n_pk] {
        let _ = write!(sql, "{sep}A.{pk}");
        sep = ", ";
    }
    let _ = writeln!(sql, ", 2{} -- deleted row", if n2 == n_pk { "" } else { "," });
    for i in n_pk..n2 {
        let _ = writeln!(sql, "       NULL, NULL{}", if i + 1 == n2 { "" } else { "," });
    }
    let _ = writeln!(sql, "  FROM main.{id} A");
    let _ = writeln!(sql, " WHERE NOT EXISTS(SELECT 1 FROM aux.{id} B");
    let mut sep = "                   WHERE";
    for pk in &az[..n_pk] {
        let _ = write!(sql, "{sep} A.{pk}=B.{pk}");
        sep = " AND";
    }
    sql.push_str(")\n");
    if pk_not_null {
        for pk in &az[..n_pk] {
            let _ = writeln!(sql, "   AND A.{pk} IS NOT NULL");
        }
    }

    // Inserted rows: in aux, no PK match in main.
    let mut sep = " UNION ALL\nSELECT ";
    for pk in &az[..n_pk] {
        let _ = write!(sql, "{sep}B.{pk}");
        sep = ", ";
    }
    let _ = writeln!(sql, ", 3{} -- inserted row", if n2 == n_pk { "" } else { "," });
    for i in n_pk..n2 {
        let _ = writeln!(sql, "       1, B.{}{}", az2[i], if i + 1 == n2 { "" } else { "," });
    }
    let _ = writeln!(sql, "  FROM aux.{id} B");
    let _ = writeln!(sql, " WHERE NOT EXISTS(SELECT 1 FROM main.{id} A");
    let mut sep = "                   WHERE";
    for pk in &az[..n_pk] {
        let _ = write!(sql, "{sep} A.{pk}=B.{pk}");
        sep = " AND";
    }
    sql.push_str(")\n");
    if pk_not_null {
        for pk in &az[..n_pk] {
            let _ = writeln!(sql, "   AND B.{pk} IS NOT NULL");
        }
    }

    // Deterministic output: order by the PK column positions.
    sql.push_str(" ORDER BY");
    let mut sep = " ";
    for i in 1..=n_pk {
        let _ = write!(sql, "{sep}{i}");
        sep = ", ";
    }
    sql.push_str(";\n");
    sql
}

/// Output SQL that recreates the aux table wholesale: schema, rows ordered
/// by PK (bare `SELECT *` order when no PK is usable), then its indexes.
fn dump_table(
    conn: &Connection,
    table: &str,
    id: &str,
    mode: SchemaMode,
    out: &mut JournalSink<'_>,
) -> Result<()> {
    let schema: Option<String> = conn
        .query_row(
            "SELECT sql FROM aux.sqlite_master WHERE name=?1",
            [table],
            |row| row.get(0),
        )
        .optional()
        .context("read table schema")?;
    if let Some(schema) = schema {
        out.stmt(&format!("{schema};"))?;
    }

    let (select_sql, insert_prefix) = match column_names(conn, Db::Aux, table, mode)? {
        None => (
            format!("SELECT * FROM aux.{id}"),
            format!("INSERT INTO {id} VALUES"),
        ),
        Some(tc) => {
            let order: Vec<String> = (1..=tc.n_pk).map(|i| i.to_string()).collect();
            (
                format!(
                    "SELECT {} FROM aux.{id} ORDER BY {}",
                    tc.cols.join(", "),
                    order.join(", ")
                ),
                format!("INSERT INTO {id}({}) VALUES", tc.cols.join(",")),
            )
        }
    };

    let mut stmt = conn.prepare(&select_sql)?;
    let n_col = stmt.column_count();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut s = insert_prefix.clone();
        let mut sep = '(';
        for i in 0..n_col {
            s.push(sep);
            sep = ',';
            push_value(&mut s, row.get_ref(i)?);
        }
        s.push_str(");");
        out.stmt(&s)?;
    }
    drop(rows);
    drop(stmt);

    let mut stmt = conn.prepare(
        "SELECT sql FROM aux.sqlite_master \
         WHERE type='index' AND tbl_name=?1 AND sql IS NOT NULL",
    )?;
    let indexes: Vec<String> = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()
        .context("list table indexes")?;
    for sql in indexes {
        out.stmt(&format!("{sql};"))?;
    }
    Ok(())
}

/// Debug aid: print the resolved column order for the aux table, marking the
/// end of the primary key with a `*`.
fn dump_column_names(conn: &Connection, table: &str, id: &str, mode: SchemaMode) -> Result<()> {
    match column_names(conn, Db::Aux, table, mode)? {
        None => println!("Rowid not accessible for {id}"),
        Some(tc) => {
            let mut line = format!("{id}:");
            for (i, col) in tc.cols.iter().enumerate() {
                let _ = write!(line, " {col}");
                if i + 1 == tc.n_pk {
                    line.push_str(" *");
                }
            }
            println!("{line}");
        }
    }
    Ok(())
}
