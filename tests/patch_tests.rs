//! Patch applier tests: journal tokenizing, offset resume, replay tolerance.

use repliq::patch::apply_patch;
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

#[test]
fn replays_statements_from_offset() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("r.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch("CREATE TABLE t(x INTEGER PRIMARY KEY, y TEXT);")
        .unwrap();

    // Older journal content must be skipped; only the new diff applies.
    let stale = "-- 01 January 2026 01:00:00 AM\nINSERT INTO t(x,y) VALUES(9,'stale');\n";
    let fresh = "INSERT INTO t(x,y) VALUES(1,'a');\nINSERT INTO t(x,y) VALUES(2,'b');\n";
    let journal = dir.path().join("patch.sql");
    fs::write(&journal, format!("{stale}{fresh}")).unwrap();

    apply_patch(&db, &journal, stale.len() as u64).unwrap();

    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM t", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
    let missing: i64 = conn
        .query_row("SELECT count(*) FROM t WHERE x=9", [], |r| r.get(0))
        .unwrap();
    assert_eq!(missing, 0);
}

#[test]
fn header_comment_is_harmless() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("r.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch("CREATE TABLE t(x INTEGER PRIMARY KEY);")
        .unwrap();
    let journal = dir.path().join("patch.sql");
    fs::write(
        &journal,
        "-- 01 January 2026 01:00:00 AM\nINSERT INTO t(x) VALUES(5);\n",
    )
    .unwrap();

    apply_patch(&db, &journal, 0).unwrap();
    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM t", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn quoted_newline_stays_inside_one_statement() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("r.db");
    Connection::open(&db).unwrap();

    // A double-quoted identifier spanning a physical line break must not be
    // split by the tokenizer.
    let journal = dir.path().join("patch.sql");
    fs::write(
        &journal,
        "CREATE TABLE \"line\nbreak\"(x INTEGER PRIMARY KEY);\nINSERT INTO \"line\nbreak\"(x) VALUES(7);\n",
    )
    .unwrap();

    apply_patch(&db, &journal, 0).unwrap();
    let conn = Connection::open(&db).unwrap();
    let value: i64 = conn
        .query_row("SELECT x FROM \"line\nbreak\"", [], |r| r.get(0))
        .unwrap();
    assert_eq!(value, 7);
}

#[test]
fn failed_statement_does_not_stop_the_replay() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("r.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch("CREATE TABLE t(x INTEGER PRIMARY KEY);")
        .unwrap();
    let journal = dir.path().join("patch.sql");
    fs::write(
        &journal,
        "INSERT INTO nosuch(x) VALUES(1);\nINSERT INTO t(x) VALUES(2);\n",
    )
    .unwrap();

    apply_patch(&db, &journal, 0).unwrap();
    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM t", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn transaction_brackets_replay_atomically() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("r.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch("CREATE TABLE t(x INTEGER PRIMARY KEY);")
        .unwrap();
    let journal = dir.path().join("patch.sql");
    fs::write(
        &journal,
        "BEGIN TRANSACTION;\nINSERT INTO t(x) VALUES(1);\nINSERT INTO t(x) VALUES(2);\nCOMMIT;\n",
    )
    .unwrap();

    apply_patch(&db, &journal, 0).unwrap();
    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM t", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}
