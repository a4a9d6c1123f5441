//! Column and primary-key resolution from the engine's table metadata.

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::{Connection, OptionalExtension};

use super::Db;
use super::quote::quote_identifier;
use crate::types::SchemaMode;

/// Names a table's implicit rowid can be reached through, in preference
/// order. Usable unless the schema declares a column with the same name.
const ROWID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

/// Resolved column list for one table in one attached schema.
///
/// `cols` holds quoted identifiers ready for interpolation into generated
/// SQL; the first `n_pk` entries are the primary key in declared order.
#[derive(Clone, Debug)]
pub struct TableColumns {
    pub cols: Vec<String>,
    pub n_pk: usize,
    /// True when the PK slot is the synthesised rowid rather than a declared
    /// column; `cols[0]` is then one of the rowid alias names.
    pub implicit_rowid: bool,
}

/// Resolve the ordered column list for `db.table`, primary key first.
///
/// In [`SchemaMode::TruePk`] the engine's effective row identifier is used:
/// the declared PRIMARY KEY for WITHOUT ROWID tables and INTEGER PRIMARY KEY
/// tables, the hidden rowid otherwise. In [`SchemaMode::SchemaPk`] the
/// declared PRIMARY KEY clause wins, falling back to the rowid only when the
/// table declares none.
///
/// Returns `Ok(None)` when the PK is the implicit rowid but every alias name
/// collides with a declared column; such a table cannot be diffed.
pub fn column_names(
    conn: &Connection,
    db: Db,
    table: &str,
    mode: SchemaMode,
) -> Result<Option<TableColumns>> {
    let (true_pk, n_pk) = match mode {
        SchemaMode::TruePk => true_pk_shape(conn, db, table)?,
        SchemaMode::SchemaPk => {
            let mut declared = 0usize;
            conn.pragma(Some(db.name()), "table_info", table, |row| {
                let ipk: i64 = row.get("pk")?;
                if ipk > 0 {
                    declared += 1;
                }
                Ok(())
            })
            .context("read table_info")?;
            (true, declared.max(1))
        }
    };

    // PK columns land at their declared ordinal, data columns append after.
    let mut slots: Vec<Option<String>> = vec![None; n_pk];
    conn.pragma(Some(db.name()), "table_info", table, |row| {
        let name: String = row.get("name")?;
        let ipk: i64 = row.get("pk")?;
        if true_pk && ipk > 0 && ipk as usize <= n_pk {
            slots[ipk as usize - 1] = Some(quote_identifier(&name));
        } else {
            slots.push(Some(quote_identifier(&name)));
        }
        Ok(())
    })
    .context("read table_info")?;

    let implicit_rowid = slots[0].is_none();
    if implicit_rowid {
        let alias = ROWID_ALIASES.iter().find(|alias| {
            !slots[1..]
                .iter()
                .flatten()
                .any(|c| c.eq_ignore_ascii_case(alias))
        });
        match alias {
            Some(alias) => slots[0] = Some((*alias).to_string()),
            None => return Ok(None),
        }
    }

    let cols = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow!("incomplete primary key metadata for table {table}"))?;
    Ok(Some(TableColumns {
        cols,
        n_pk,
        implicit_rowid,
    }))
}

/// Work out the effective PK shape for [`SchemaMode::TruePk`]: whether the
/// declared PK ordinals identify the key, and how many key columns there are.
fn true_pk_shape(conn: &Connection, db: Db, table: &str) -> Result<(bool, usize)> {
    let mut pk_index: Option<String> = None;
    conn.pragma(Some(db.name()), "index_list", table, |row| {
        let origin: String = row.get("origin")?;
        if pk_index.is_none() && origin.eq_ignore_ascii_case("pk") {
            pk_index = Some(row.get("name")?);
        }
        Ok(())
    })
    .context("read index_list")?;

    let Some(pk_index) = pk_index else {
        // No PK index: either INTEGER PRIMARY KEY (table_info carries the
        // ordinal) or no PK at all (hidden rowid).
        return Ok((true, 1));
    };

    let mut n_col = 0usize;
    let mut n_key = 0usize;
    let mut honest = false;
    conn.pragma(Some(db.name()), "index_xinfo", &pk_index, |row| {
        n_col += 1;
        let key: i64 = row.get("key")?;
        if key != 0 {
            n_key += 1;
            return Ok(());
        }
        let cid: i64 = row.get("cid")?;
        if cid >= 0 {
            // Auxiliary entry naming a real column: WITHOUT ROWID table.
            honest = true;
        }
        Ok(())
    })
    .context("read index_xinfo")?;
    if n_col == n_key {
        honest = true;
    }
    if honest {
        Ok((true, n_key))
    } else {
        // The PK index is backed by the hidden rowid.
        Ok((false, 1))
    }
}

/// Verify that `table` exists with an identical declared schema in both the
/// `main` and `aux` databases, erroring out otherwise.
pub fn check_schemas_match(conn: &Connection, table: &str) -> Result<()> {
    let same: Option<i64> = conn
        .query_row(
            "SELECT A.sql=B.sql FROM main.sqlite_master A, aux.sqlite_master B \
             WHERE A.name=?1 AND B.name=?1",
            [table],
            |row| row.get(0),
        )
        .optional()
        .context("compare schemas")?;
    match same {
        None => bail!(
            "table {} missing from one or both databases",
            quote_identifier(table)
        ),
        Some(0) => bail!("schema changes for table {}", quote_identifier(table)),
        Some(_) => Ok(()),
    }
}
