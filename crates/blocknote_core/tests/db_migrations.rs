use blocknote_core::db::migrations::{latest_version, schema_version};
use blocknote_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "note_blocks");
    assert_table_exists(&conn, "categories");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn default_categories_are_seeded() {
    let conn = open_db_in_memory().unwrap();
    let mut stmt = conn
        .prepare("SELECT id FROM categories WHERE is_default = 1 ORDER BY id;")
        .unwrap();
    let ids: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(ids, vec!["daily", "thoughts", "work"]);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocknote.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second).unwrap(), latest_version());
    let seeded: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM categories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(seeded, 3);
}

#[test]
fn version_one_database_upgrades_and_keeps_notes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
        .unwrap();
    conn.execute_batch(
        "INSERT INTO notes (id, title, created_at, updated_at)
         VALUES ('7f1c1f0e-2b7d-4c3e-9a8e-0d2f4b6a8c10', 'legacy', 1, 2);
         PRAGMA user_version = 1;",
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let category: String = conn
        .query_row(
            "SELECT category_id FROM notes WHERE title = 'legacy';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(category, "daily");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn block_positions_are_unique_per_note() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO notes (id, title, created_at, updated_at) VALUES ('n1', '', 0, 0);
         INSERT INTO note_blocks (id, note_id, kind, position, body, created_at, updated_at)
         VALUES ('b1', 'n1', 'text', 0, 'a', 0, 0);",
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO note_blocks (id, note_id, kind, position, body, created_at, updated_at)
         VALUES ('b2', 'n1', 'text', 0, 'b', 0, 0);",
        [],
    );
    assert!(duplicate.is_err());
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
