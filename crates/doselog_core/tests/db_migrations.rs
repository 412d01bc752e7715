use doselog_core::db::migrations::latest_version;
use doselog_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn in_memory_database_has_journal_tables() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "doses");
    assert_table_exists(&conn, "dose_notes");
}

#[test]
fn reopening_a_journal_file_keeps_its_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("journal.sqlite3");

    let first = open_db(&path).unwrap();
    assert_eq!(schema_version(&first), latest_version());
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_table_exists(&second, "doses");
}

#[test]
fn journal_from_a_newer_build_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_non_positive_amounts() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO doses (uuid, substance, amount, unit, route, taken_at)
         VALUES ('x', 'caffeine', 0, 'mg', 'oral', 0);",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn deleting_a_dose_removes_its_notes() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO doses (uuid, substance, amount, unit, route, taken_at)
         VALUES ('d1', 'caffeine', 100, 'mg', 'oral', 0),
                ('d2', 'theanine', 200, 'mg', 'oral', 0);
         INSERT INTO dose_notes (uuid, dose_uuid, body, noted_at)
         VALUES ('n1', 'd1', 'alert', 1), ('n2', 'd1', 'crash', 2), ('n3', 'd2', 'calm', 3);",
    )
    .unwrap();

    conn.execute("DELETE FROM doses WHERE uuid = 'd1';", []).unwrap();

    assert_eq!(count(&conn, "SELECT COUNT(*) FROM dose_notes WHERE dose_uuid = 'd1';"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM dose_notes;"), 1);
}

#[test]
fn note_for_unknown_dose_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO dose_notes (uuid, dose_uuid, body, noted_at)
         VALUES ('n1', 'missing', 'orphan', 0);",
        [],
    );
    assert!(result.is_err());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM dose_notes;"), 0);
}

#[test]
fn failed_migration_names_its_version_and_keeps_the_old_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clashing.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE doses (uuid TEXT PRIMARY KEY NOT NULL);
         CREATE TABLE dose_notes (uuid TEXT PRIMARY KEY NOT NULL);
         PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::Migration { version, .. } => assert_eq!(version, 2),
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 1);
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
