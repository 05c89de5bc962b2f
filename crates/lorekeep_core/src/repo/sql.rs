//! SQL helpers shared by the SQLite repositories.

use super::{RepoError, RepoResult};
use crate::db::migrations::latest_version;
use crate::model::graph::{EntityLite, Timestamps, WritingStatus};
use log::error;
use rusqlite::{Connection, Params, Row};

/// Timestamp projection appended to every entity `SELECT`.
pub(crate) const TIMESTAMP_COLUMNS: &str = "created_at,
    updated_at,
    strftime('%d/%m/%Y %H:%M', created_at / 1000, 'unixepoch') AS created_at_display,
    strftime('%d/%m/%Y %H:%M', updated_at / 1000, 'unixepoch') AS updated_at_display,
    strftime('%Y-%m-%dT%H:%M:%SZ', updated_at / 1000, 'unixepoch') AS updated_at_iso";

/// Epoch-ms "now" expression used on update.
pub(crate) const NOW_MS: &str = "(strftime('%s', 'now') * 1000)";

pub(crate) fn parse_timestamps(row: &Row<'_>) -> RepoResult<Timestamps> {
    Ok(Timestamps {
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        created_at_display: row.get("created_at_display")?,
        updated_at_display: row.get("updated_at_display")?,
        updated_at_iso: row.get("updated_at_iso")?,
    })
}

/// Parses an `id, name, slug` projection.
pub(crate) fn parse_lite(row: &Row<'_>) -> RepoResult<EntityLite> {
    Ok(EntityLite {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
    })
}

pub(crate) fn parse_status(row: &Row<'_>, column: &'static str) -> RepoResult<WritingStatus> {
    let value: String = row.get(column)?;
    WritingStatus::parse(&value)
        .map_err(|_| RepoError::InvalidData(format!("invalid status `{value}` in {column}")))
}

pub(crate) fn query_optional<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(parse(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn query_list<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}

pub(crate) fn query_exists<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(exists == 1)
}

/// Runs `work` inside a named SQLite savepoint.
///
/// Savepoints nest, so a cascade that calls into another cascade keeps a
/// single all-or-nothing outcome at the outermost level.
pub(crate) fn with_savepoint<T, E>(
    conn: &Connection,
    name: &'static str,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<RepoError>,
{
    conn.execute_batch(&format!("SAVEPOINT {name};"))
        .map_err(RepoError::from)?;
    match work() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE SAVEPOINT {name};"))
                .map_err(RepoError::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name};"
            )) {
                error!(
                    "event=savepoint_rollback module=repo status=error savepoint={} error={}",
                    name, rollback_err
                );
            }
            Err(err)
        }
    }
}

/// Verifies migrations are applied and `table` carries `columns`.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    for &column in columns {
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    query_exists(
        conn,
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
    )
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
