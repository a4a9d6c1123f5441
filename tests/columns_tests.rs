//! Primary-key resolver tests over the engine's table metadata.

use repliq::diff::{Db, column_names};
use repliq::types::SchemaMode;
use rusqlite::Connection;

fn conn_with(sql: &str) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(sql).unwrap();
    conn
}

fn resolve(conn: &Connection, table: &str, mode: SchemaMode) -> Option<(Vec<String>, usize, bool)> {
    column_names(conn, Db::Main, table, mode)
        .unwrap()
        .map(|tc| (tc.cols, tc.n_pk, tc.implicit_rowid))
}

#[test]
fn text_pk_table_keys_on_rowid_by_default() {
    let conn = conn_with("CREATE TABLE t1(a INT UNIQUE, b INTEGER, c TEXT, PRIMARY KEY(c));");
    let (cols, n_pk, implicit) = resolve(&conn, "t1", SchemaMode::TruePk).unwrap();
    assert_eq!(cols, ["rowid", "a", "b", "c"]);
    assert_eq!(n_pk, 1);
    assert!(implicit);

    let (cols, n_pk, implicit) = resolve(&conn, "t1", SchemaMode::SchemaPk).unwrap();
    assert_eq!(cols, ["c", "a", "b"]);
    assert_eq!(n_pk, 1);
    assert!(!implicit);
}

#[test]
fn integer_pk_is_the_true_key() {
    let conn = conn_with("CREATE TABLE t2(a INT UNIQUE, b INTEGER, c TEXT, PRIMARY KEY(b));");
    let (cols, n_pk, implicit) = resolve(&conn, "t2", SchemaMode::TruePk).unwrap();
    assert_eq!(cols, ["b", "a", "c"]);
    assert_eq!(n_pk, 1);
    assert!(!implicit);
}

#[test]
fn composite_pk_on_rowid_table() {
    let conn = conn_with("CREATE TABLE t3(x,y,z,PRIMARY KEY(y,z));");
    let (cols, n_pk, implicit) = resolve(&conn, "t3", SchemaMode::TruePk).unwrap();
    assert_eq!(cols, ["rowid", "x", "y", "z"]);
    assert_eq!(n_pk, 1);
    assert!(implicit);

    let (cols, n_pk, implicit) = resolve(&conn, "t3", SchemaMode::SchemaPk).unwrap();
    assert_eq!(cols, ["y", "z", "x"]);
    assert_eq!(n_pk, 2);
    assert!(!implicit);
}

#[test]
fn without_rowid_pk_is_honest() {
    let conn = conn_with("CREATE TABLE t4(x,y,z,PRIMARY KEY(y,z)) WITHOUT ROWID;");
    let (cols, n_pk, implicit) = resolve(&conn, "t4", SchemaMode::TruePk).unwrap();
    assert_eq!(cols, ["y", "z", "x"]);
    assert_eq!(n_pk, 2);
    assert!(!implicit);
}

#[test]
fn all_rowid_aliases_shadowed_is_unusable() {
    let conn = conn_with("CREATE TABLE t5(rowid,_rowid_,oid);");
    assert!(resolve(&conn, "t5", SchemaMode::TruePk).is_none());
}

#[test]
fn alias_falls_back_past_shadowed_names() {
    let conn = conn_with("CREATE TABLE t6(rowid, v);");
    let (cols, n_pk, implicit) = resolve(&conn, "t6", SchemaMode::TruePk).unwrap();
    assert_eq!(cols, ["_rowid_", "rowid", "v"]);
    assert_eq!(n_pk, 1);
    assert!(implicit);
}

#[test]
fn quoted_names_stay_safe_in_the_column_list() {
    let conn = conn_with("CREATE TABLE q(\"my col\" INTEGER, \"select\" TEXT);");
    let (cols, _, _) = resolve(&conn, "q", SchemaMode::TruePk).unwrap();
    assert_eq!(cols, ["rowid", "\"my col\"", "\"select\""]);
}
