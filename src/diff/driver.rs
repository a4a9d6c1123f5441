//! Diff driver: connection bootstrap, journal framing, table dispatch.

use anyhow::{Context, bail};
use chrono::Local;
use rusqlite::{Connection, OpenFlags};
use std::fs::OpenOptions;
use std::io::{Seek, Write};
use std::path::Path;

use super::rbu::RbuTableDiffer;
use super::table::SqlTableDiffer;
use super::{Db, TableDiffer};
use crate::Result;
use crate::types::DiffOptions;

/// Statement-granular sink over the journal stream.
///
/// The BEGIN bracket is deferred to the first statement and COMMIT is only
/// written if a BEGIN was, so a diff with no differences leaves nothing in
/// the journal past its timestamp line.
pub struct JournalSink<'a> {
    out: &'a mut dyn Write,
    use_transaction: bool,
    wrote_any: bool,
}

impl<'a> JournalSink<'a> {
    pub fn new(out: &'a mut dyn Write, use_transaction: bool) -> Self {
        JournalSink {
            out,
            use_transaction,
            wrote_any: false,
        }
    }

    /// Append one newline-terminated statement.
    pub fn stmt(&mut self, s: &str) -> Result<()> {
        if !self.wrote_any {
            self.wrote_any = true;
            if self.use_transaction {
                writeln!(self.out, "BEGIN TRANSACTION;").context("write journal")?;
            }
        }
        writeln!(self.out, "{s}").context("write journal")?;
        Ok(())
    }

    /// Whether any statement has been appended.
    pub fn wrote_any(&self) -> bool {
        self.wrote_any
    }

    fn finish(&mut self) -> Result<()> {
        if self.wrote_any && self.use_transaction {
            writeln!(self.out, "COMMIT;").context("write journal")?;
        }
        Ok(())
    }
}

/// Check that the schema catalog of `db` is readable; anything else means
/// the file is not a database of the engine's format.
fn probe_database(conn: &Connection, db: Db, path: &Path) -> Result<()> {
    let probe = conn.query_row(
        &format!("SELECT count(*) FROM {}.sqlite_master", db.qualifier()),
        [],
        |_| Ok(()),
    );
    if probe.is_err() {
        bail!(
            "\"{}\" does not appear to be a valid SQLite database",
            path.display()
        );
    }
    Ok(())
}

/// Generate a difference patch that transforms `from_db` into `to_db`,
/// appending it to `journal` (stdout when `None`).
///
/// Returns `Ok(None)` when the databases do not differ, otherwise
/// `Ok(Some(offset))` where `offset` is the journal byte position of the
/// first statement of this diff — the anchor the patch applier resumes from.
pub fn diff_databases(
    from_db: &Path,
    to_db: &Path,
    journal: Option<&Path>,
    opts: &DiffOptions,
) -> Result<Option<u64>> {
    // One single-threaded connection per diff invocation.
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(from_db, flags)
        .with_context(|| format!("cannot open database file \"{}\"", from_db.display()))?;
    probe_database(&conn, Db::Main, from_db)?;

    if !opts.extensions.is_empty() {
        unsafe {
            conn.load_extension_enable()
                .context("enable extension loading")?;
            for ext in &opts.extensions {
                conn.load_extension(ext, None)
                    .with_context(|| format!("error loading {}", ext.display()))?;
            }
        }
        conn.load_extension_disable()
            .context("disable extension loading")?;
    }

    let to_str = to_db.to_string_lossy();
    conn.execute("ATTACH ?1 AS aux", [to_str.as_ref()])
        .with_context(|| format!("cannot attach database \"{}\"", to_db.display()))?;
    probe_database(&conn, Db::Aux, to_db)?;

    let timestamp = Local::now().format("%d %B %Y %I:%M:%S %p");
    let mut file;
    let mut stdout;
    let fstart;
    let out: &mut dyn Write = match journal {
        Some(path) => {
            file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("cannot open journal \"{}\"", path.display()))?;
            writeln!(file, "-- {timestamp}").context("write journal header")?;
            fstart = file.stream_position().context("journal offset")?;
            &mut file
        }
        None => {
            stdout = std::io::stdout();
            writeln!(stdout, "-- {timestamp}").context("write header")?;
            fstart = 0;
            &mut stdout
        }
    };

    let mut stmt = conn.prepare(
        "SELECT name FROM main.sqlite_master \
         WHERE type='table' AND sql NOT LIKE 'CREATE VIRTUAL%' \
         UNION \
         SELECT name FROM aux.sqlite_master \
         WHERE type='table' AND sql NOT LIKE 'CREATE VIRTUAL%' \
         ORDER BY name",
    )?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()
        .context("enumerate tables")?;
    drop(stmt);

    let differ: &dyn TableDiffer = if opts.rbu {
        &RbuTableDiffer
    } else {
        &SqlTableDiffer
    };
    let mut sink = JournalSink::new(&mut *out, opts.use_transaction);
    for table in &tables {
        differ.diff_table(&conn, table, opts, &mut sink)?;
    }
    sink.finish()?;
    let wrote_any = sink.wrote_any();
    drop(sink);
    out.flush().context("flush journal")?;

    if wrote_any { Ok(Some(fstart)) } else { Ok(None) }
}
