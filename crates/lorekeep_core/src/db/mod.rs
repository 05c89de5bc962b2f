//! SQLite bootstrap for the content graph.
//!
//! # Responsibility
//! - Open connections, register the collations the schema relies on and
//!   bring the schema to the latest migration.
//! - Own the name-folding rule shared by unique indexes and repository
//!   pre-checks.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - [`NAME_COLLATION`] is registered before any migration or query runs;
//!   the scoped name indexes cannot be written without it.
//! - Names compare equal when their NFC forms match after Unicode
//!   lowercasing, so `Élan`/`élan` and `Война`/`ВОЙНА` collide.

use rusqlite::Connection;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use unicode_normalization::UnicodeNormalization;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Collation applied to every scoped name and title comparison.
pub const NAME_COLLATION: &str = "UNICASE";

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the content graph.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "content graph schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Orders two names case-insensitively across scripts.
pub fn compare_names(left: &str, right: &str) -> Ordering {
    left.nfc()
        .flat_map(char::to_lowercase)
        .cmp(right.nfc().flat_map(char::to_lowercase))
}

pub(crate) fn register_collations(conn: &Connection) -> DbResult<()> {
    conn.create_collation(NAME_COLLATION, compare_names)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{compare_names, register_collations, NAME_COLLATION};
    use rusqlite::Connection;
    use std::cmp::Ordering;

    #[test]
    fn names_fold_case_beyond_ascii() {
        assert_eq!(compare_names("Ana", "ANA"), Ordering::Equal);
        assert_eq!(compare_names("Élan", "élan"), Ordering::Equal);
        assert_eq!(compare_names("Война", "ВОЙНА"), Ordering::Equal);
        assert_eq!(compare_names("E\u{301}lan", "élan"), Ordering::Equal);
        assert_ne!(compare_names("Elan", "élan"), Ordering::Equal);
    }

    #[test]
    fn registered_collation_is_usable_in_sql() {
        let conn = Connection::open_in_memory().unwrap();
        register_collations(&conn).unwrap();
        let equal: i64 = conn
            .query_row(
                &format!("SELECT 'ÖRN' = 'örn' COLLATE {NAME_COLLATION};"),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(equal, 1);
    }
}
