use lorekeep_core::db::migrations::latest_version;
use lorekeep_core::db::{open_db, open_db_in_memory, DbError};
use lorekeep_core::{RepoError, SqliteStore};
use rusqlite::Connection;

const CONTENT_TABLES: &[&str] = &[
    "projects",
    "universes",
    "sagas",
    "books",
    "characters",
    "character_appearances",
    "character_relationships",
    "character_timeline",
    "project_members",
    "project_likes",
    "project_saves",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in CONTENT_TABLES {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lorekeep.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute(
            "INSERT INTO projects (owner_id, name, slug, description) VALUES (1, 'Atlas', 'atlas', 'd');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let projects: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(projects, 1);
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
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteStore::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("store must refuse an unmigrated connection"),
    }
}

#[test]
fn scope_unique_index_rejects_raw_duplicate_slug() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO projects (owner_id, name, slug, description) VALUES (1, 'Atlas', 'atlas', 'd');
         INSERT INTO sagas (project_id, name, slug, description) VALUES (1, 'Saga A', 'saga-a', 'd');",
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO sagas (project_id, name, slug, description) VALUES (1, 'Other', 'saga-a', 'd');",
            [],
        )
        .unwrap_err();
    let err = RepoError::from(err);
    assert!(matches!(err, RepoError::UniqueViolation(_)), "got {err}");
}

#[test]
fn name_index_folds_case_beyond_ascii() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO projects (owner_id, name, slug, description) VALUES (1, 'Élan', 'elan', 'd');",
        [],
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO projects (owner_id, name, slug, description) VALUES (1, 'ÉLAN', 'elan-2', 'd');",
            [],
        )
        .unwrap_err();
    let err = RepoError::from(err);
    assert!(matches!(err, RepoError::UniqueViolation(_)), "got {err}");
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
