//! Journal replay: execute an appended diff against the backup database.

use anyhow::Context;
use rusqlite::Connection;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::Result;

/// Read one journal statement: bytes up to a newline that is not inside a
/// double-quoted run. Statements may span physical lines when a quoted
/// identifier or value embeds a newline. A trailing `\r` is stripped.
/// Returns `None` at end of input.
fn read_statement<R: Read>(bytes: &mut std::io::Bytes<R>) -> Result<Option<String>> {
    let mut buf: Vec<u8> = Vec::new();
    let mut in_quote = false;
    loop {
        match bytes.next() {
            None => {
                if buf.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Some(b) => {
                let b = b.context("read journal")?;
                if b == b'"' {
                    in_quote = !in_quote;
                }
                if b == b'\n' && !in_quote {
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    break;
                }
                buf.push(b);
            }
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Replay the journal at `journal` onto the database at `db`, starting from
/// byte `offset` (the anchor returned by the diff driver).
///
/// Individual statement failures are logged and skipped so a partially
/// applied or re-applied diff does not wedge the replica; only being unable
/// to open the journal or the database is fatal.
pub fn apply_patch(db: &Path, journal: &Path, offset: u64) -> Result<()> {
    let mut file = File::open(journal)
        .with_context(|| format!("cannot open journal \"{}\"", journal.display()))?;
    file.seek(SeekFrom::Start(offset)).context("seek journal")?;
    let conn = Connection::open(db)
        .with_context(|| format!("cannot open database file \"{}\"", db.display()))?;

    let mut bytes = BufReader::new(file).bytes();
    while let Some(stmt) = read_statement(&mut bytes)? {
        if let Err(e) = conn.execute_batch(&stmt) {
            log::warn!("patch statement failed: {e}");
        }
    }
    Ok(())
}
