//! Universe repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Name and slug uniqueness scope is the owning project.

use super::sql::{
    ensure_table_ready, parse_lite, parse_timestamps, query_exists, query_list, query_optional,
    NOW_MS, TIMESTAMP_COLUMNS,
};
use super::{RepoError, RepoResult};
use crate::model::graph::{EntityLite, ProjectId, Universe, UniverseId};
use rusqlite::{params, Connection, Row};

/// Column values written on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseWrite {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Repository interface for universe rows.
pub trait UniverseRepository {
    fn get_by_id(&self, id: UniverseId) -> RepoResult<Option<Universe>>;
    fn get_lite(&self, id: UniverseId) -> RepoResult<Option<EntityLite>>;
    fn get_by_slug(&self, project_id: ProjectId, slug: &str) -> RepoResult<Option<Universe>>;
    fn name_taken(
        &self,
        project_id: ProjectId,
        name: &str,
        exclude: Option<UniverseId>,
    ) -> RepoResult<bool>;
    fn slug_taken(
        &self,
        project_id: ProjectId,
        slug: &str,
        exclude: Option<UniverseId>,
    ) -> RepoResult<bool>;
    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Universe>>;
    fn create(&self, project_id: ProjectId, data: &UniverseWrite) -> RepoResult<Universe>;
    fn update(&self, id: UniverseId, data: &UniverseWrite) -> RepoResult<usize>;
    fn delete(&self, id: UniverseId) -> RepoResult<usize>;
}

/// SQLite-backed universe repository.
pub struct SqliteUniverseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUniverseRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "universes",
            &["id", "project_id", "name", "slug", "description"],
        )?;
        Ok(Self { conn })
    }

    fn select_sql(filter: &str) -> String {
        format!(
            "SELECT id, project_id, name, slug, description, {TIMESTAMP_COLUMNS}
             FROM universes
             WHERE {filter}"
        )
    }
}

impl UniverseRepository for SqliteUniverseRepository<'_> {
    fn get_by_id(&self, id: UniverseId) -> RepoResult<Option<Universe>> {
        query_optional(
            self.conn,
            &Self::select_sql("id = ?1;"),
            [id],
            parse_universe_row,
        )
    }

    fn get_lite(&self, id: UniverseId) -> RepoResult<Option<EntityLite>> {
        query_optional(
            self.conn,
            "SELECT id, name, slug FROM universes WHERE id = ?1;",
            [id],
            parse_lite,
        )
    }

    fn get_by_slug(&self, project_id: ProjectId, slug: &str) -> RepoResult<Option<Universe>> {
        query_optional(
            self.conn,
            &Self::select_sql("project_id = ?1 AND slug = ?2;"),
            params![project_id, slug],
            parse_universe_row,
        )
    }

    fn name_taken(
        &self,
        project_id: ProjectId,
        name: &str,
        exclude: Option<UniverseId>,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM universes
                WHERE project_id = ?1
                  AND name = ?2 COLLATE UNICASE
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![project_id, name, exclude],
        )
    }

    fn slug_taken(
        &self,
        project_id: ProjectId,
        slug: &str,
        exclude: Option<UniverseId>,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM universes
                WHERE project_id = ?1
                  AND slug = ?2
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![project_id, slug, exclude],
        )
    }

    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Universe>> {
        query_list(
            self.conn,
            &Self::select_sql("project_id = ?1 ORDER BY name COLLATE UNICASE ASC, id ASC;"),
            [project_id],
            parse_universe_row,
        )
    }

    fn create(&self, project_id: ProjectId, data: &UniverseWrite) -> RepoResult<Universe> {
        self.conn.execute(
            "INSERT INTO universes (project_id, name, slug, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![project_id, data.name, data.slug, data.description],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("universe {id} missing after insert")))
    }

    fn update(&self, id: UniverseId, data: &UniverseWrite) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE universes
                 SET name = ?2,
                     slug = ?3,
                     description = ?4,
                     updated_at = {NOW_MS}
                 WHERE id = ?1;"
            ),
            params![id, data.name, data.slug, data.description],
        )?;
        Ok(changed)
    }

    fn delete(&self, id: UniverseId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM universes WHERE id = ?1;", [id])?;
        Ok(changed)
    }
}

fn parse_universe_row(row: &Row<'_>) -> RepoResult<Universe> {
    Ok(Universe {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        timestamps: parse_timestamps(row)?,
    })
}
