//! Saga repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist saga rows and their self-referential `parent_saga_id` link.
//! - Answer scoped name/slug lookups for the active [`SagaScope`].
//!
//! # Invariants
//! - Child listing is deterministic: `id ASC`.
//! - The repository never checks for cycles; the saga service owns that.

use super::sql::{
    ensure_table_ready, parse_lite, parse_status, parse_timestamps, query_exists, query_list,
    query_optional, NOW_MS, TIMESTAMP_COLUMNS,
};
use super::{RepoError, RepoResult};
use crate::model::graph::{
    EntityLite, ProjectId, Saga, SagaId, SagaScope, UniverseId, WritingStatus,
};
use rusqlite::{params, Connection, Row};

/// Column values written on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaWrite {
    pub universe_id: Option<UniverseId>,
    pub parent_saga_id: Option<SagaId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub status: WritingStatus,
}

/// Repository interface for saga rows.
pub trait SagaRepository {
    fn get_by_id(&self, id: SagaId) -> RepoResult<Option<Saga>>;
    fn get_lite(&self, id: SagaId) -> RepoResult<Option<EntityLite>>;
    fn get_by_slug(&self, scope: SagaScope, slug: &str) -> RepoResult<Option<Saga>>;
    fn name_taken(&self, scope: SagaScope, name: &str, exclude: Option<SagaId>)
        -> RepoResult<bool>;
    fn slug_taken(&self, scope: SagaScope, slug: &str, exclude: Option<SagaId>)
        -> RepoResult<bool>;
    /// Every saga of the project, whatever its universe.
    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Saga>>;
    fn list_by_universe(&self, universe_id: UniverseId) -> RepoResult<Vec<Saga>>;
    /// Direct children only.
    fn list_children(&self, parent_id: SagaId) -> RepoResult<Vec<Saga>>;
    fn create(&self, project_id: ProjectId, data: &SagaWrite) -> RepoResult<Saga>;
    fn update(&self, id: SagaId, data: &SagaWrite) -> RepoResult<usize>;
    fn delete(&self, id: SagaId) -> RepoResult<usize>;
}

/// SQLite-backed saga repository.
pub struct SqliteSagaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSagaRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "sagas",
            &[
                "id",
                "project_id",
                "universe_id",
                "parent_saga_id",
                "name",
                "slug",
                "description",
                "status",
            ],
        )?;
        Ok(Self { conn })
    }

    fn select_sql(filter: &str) -> String {
        format!(
            "SELECT id, project_id, universe_id, parent_saga_id, name, slug, description, status,
                    {TIMESTAMP_COLUMNS}
             FROM sagas
             WHERE {filter}"
        )
    }
}

/// SQL filter and bound id selecting the sagas of one scope, as `?1`.
fn scope_filter(scope: SagaScope) -> (&'static str, i64) {
    match scope {
        SagaScope::Universe(universe_id) => ("universe_id = ?1", universe_id),
        SagaScope::Project(project_id) => ("project_id = ?1 AND universe_id IS NULL", project_id),
    }
}

impl SagaRepository for SqliteSagaRepository<'_> {
    fn get_by_id(&self, id: SagaId) -> RepoResult<Option<Saga>> {
        query_optional(self.conn, &Self::select_sql("id = ?1;"), [id], parse_saga_row)
    }

    fn get_lite(&self, id: SagaId) -> RepoResult<Option<EntityLite>> {
        query_optional(
            self.conn,
            "SELECT id, name, slug FROM sagas WHERE id = ?1;",
            [id],
            parse_lite,
        )
    }

    fn get_by_slug(&self, scope: SagaScope, slug: &str) -> RepoResult<Option<Saga>> {
        let (filter, scope_id) = scope_filter(scope);
        query_optional(
            self.conn,
            &Self::select_sql(&format!("{filter} AND slug = ?2;")),
            params![scope_id, slug],
            parse_saga_row,
        )
    }

    fn name_taken(
        &self,
        scope: SagaScope,
        name: &str,
        exclude: Option<SagaId>,
    ) -> RepoResult<bool> {
        let (filter, scope_id) = scope_filter(scope);
        query_exists(
            self.conn,
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM sagas
                    WHERE {filter}
                      AND name = ?2 COLLATE UNICASE
                      AND (?3 IS NULL OR id <> ?3)
                );"
            ),
            params![scope_id, name, exclude],
        )
    }

    fn slug_taken(
        &self,
        scope: SagaScope,
        slug: &str,
        exclude: Option<SagaId>,
    ) -> RepoResult<bool> {
        let (filter, scope_id) = scope_filter(scope);
        query_exists(
            self.conn,
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM sagas
                    WHERE {filter}
                      AND slug = ?2
                      AND (?3 IS NULL OR id <> ?3)
                );"
            ),
            params![scope_id, slug, exclude],
        )
    }

    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Saga>> {
        query_list(
            self.conn,
            &Self::select_sql("project_id = ?1 ORDER BY id ASC;"),
            [project_id],
            parse_saga_row,
        )
    }

    fn list_by_universe(&self, universe_id: UniverseId) -> RepoResult<Vec<Saga>> {
        query_list(
            self.conn,
            &Self::select_sql("universe_id = ?1 ORDER BY id ASC;"),
            [universe_id],
            parse_saga_row,
        )
    }

    fn list_children(&self, parent_id: SagaId) -> RepoResult<Vec<Saga>> {
        query_list(
            self.conn,
            &Self::select_sql("parent_saga_id = ?1 ORDER BY id ASC;"),
            [parent_id],
            parse_saga_row,
        )
    }

    fn create(&self, project_id: ProjectId, data: &SagaWrite) -> RepoResult<Saga> {
        self.conn.execute(
            "INSERT INTO sagas (
                project_id,
                universe_id,
                parent_saga_id,
                name,
                slug,
                description,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                project_id,
                data.universe_id,
                data.parent_saga_id,
                data.name,
                data.slug,
                data.description,
                data.status.as_str(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("saga {id} missing after insert")))
    }

    fn update(&self, id: SagaId, data: &SagaWrite) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE sagas
                 SET universe_id = ?2,
                     parent_saga_id = ?3,
                     name = ?4,
                     slug = ?5,
                     description = ?6,
                     status = ?7,
                     updated_at = {NOW_MS}
                 WHERE id = ?1;"
            ),
            params![
                id,
                data.universe_id,
                data.parent_saga_id,
                data.name,
                data.slug,
                data.description,
                data.status.as_str(),
            ],
        )?;
        Ok(changed)
    }

    fn delete(&self, id: SagaId) -> RepoResult<usize> {
        let changed = self.conn.execute("DELETE FROM sagas WHERE id = ?1;", [id])?;
        Ok(changed)
    }
}

fn parse_saga_row(row: &Row<'_>) -> RepoResult<Saga> {
    Ok(Saga {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        universe_id: row.get("universe_id")?,
        parent_saga_id: row.get("parent_saga_id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        status: parse_status(row, "status")?,
        timestamps: parse_timestamps(row)?,
    })
}
