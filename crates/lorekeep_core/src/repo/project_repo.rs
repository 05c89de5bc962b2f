//! Project repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Name and slug uniqueness scope is the owning user.
//! - Membership, like and save rows are owned by outer collaborators and
//!   only removed here, never written.

use super::sql::{
    ensure_table_ready, parse_lite, parse_timestamps, query_exists, query_list, query_optional,
    NOW_MS, TIMESTAMP_COLUMNS,
};
use super::{RepoError, RepoResult};
use crate::model::graph::{EntityLite, Project, ProjectId, UserId};
use rusqlite::{params, Connection, Row};

/// Column values written on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectWrite {
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// Repository interface for project rows.
pub trait ProjectRepository {
    fn get_by_id(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn get_lite(&self, id: ProjectId) -> RepoResult<Option<EntityLite>>;
    fn get_by_slug(&self, owner_id: UserId, slug: &str) -> RepoResult<Option<Project>>;
    /// Case-insensitive name check, ignoring `exclude`.
    fn name_taken(
        &self,
        owner_id: UserId,
        name: &str,
        exclude: Option<ProjectId>,
    ) -> RepoResult<bool>;
    fn slug_taken(
        &self,
        owner_id: UserId,
        slug: &str,
        exclude: Option<ProjectId>,
    ) -> RepoResult<bool>;
    fn list_by_owner(&self, owner_id: UserId) -> RepoResult<Vec<Project>>;
    fn create(&self, owner_id: UserId, data: &ProjectWrite) -> RepoResult<Project>;
    /// Returns the affected row count.
    fn update(&self, id: ProjectId, data: &ProjectWrite) -> RepoResult<usize>;
    /// Removes membership, like and save rows; returns the total removed.
    fn delete_social_rows(&self, id: ProjectId) -> RepoResult<usize>;
    /// Returns the affected row count.
    fn delete(&self, id: ProjectId) -> RepoResult<usize>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "projects",
            &["id", "owner_id", "name", "slug", "description"],
        )?;
        Ok(Self { conn })
    }

    fn select_sql(filter: &str) -> String {
        format!(
            "SELECT id, owner_id, name, slug, description, {TIMESTAMP_COLUMNS}
             FROM projects
             WHERE {filter}"
        )
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn get_by_id(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        query_optional(
            self.conn,
            &Self::select_sql("id = ?1;"),
            [id],
            parse_project_row,
        )
    }

    fn get_lite(&self, id: ProjectId) -> RepoResult<Option<EntityLite>> {
        query_optional(
            self.conn,
            "SELECT id, name, slug FROM projects WHERE id = ?1;",
            [id],
            parse_lite,
        )
    }

    fn get_by_slug(&self, owner_id: UserId, slug: &str) -> RepoResult<Option<Project>> {
        query_optional(
            self.conn,
            &Self::select_sql("owner_id = ?1 AND slug = ?2;"),
            params![owner_id, slug],
            parse_project_row,
        )
    }

    fn name_taken(
        &self,
        owner_id: UserId,
        name: &str,
        exclude: Option<ProjectId>,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM projects
                WHERE owner_id = ?1
                  AND name = ?2 COLLATE UNICASE
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![owner_id, name, exclude],
        )
    }

    fn slug_taken(
        &self,
        owner_id: UserId,
        slug: &str,
        exclude: Option<ProjectId>,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM projects
                WHERE owner_id = ?1
                  AND slug = ?2
                  AND (?3 IS NULL OR id <> ?3)
            );",
            params![owner_id, slug, exclude],
        )
    }

    fn list_by_owner(&self, owner_id: UserId) -> RepoResult<Vec<Project>> {
        query_list(
            self.conn,
            &Self::select_sql("owner_id = ?1 ORDER BY updated_at DESC, id ASC;"),
            [owner_id],
            parse_project_row,
        )
    }

    fn create(&self, owner_id: UserId, data: &ProjectWrite) -> RepoResult<Project> {
        self.conn.execute(
            "INSERT INTO projects (owner_id, name, slug, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![owner_id, data.name, data.slug, data.description],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("project {id} missing after insert")))
    }

    fn update(&self, id: ProjectId, data: &ProjectWrite) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE projects
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

    fn delete_social_rows(&self, id: ProjectId) -> RepoResult<usize> {
        let mut removed = 0;
        for table in ["project_members", "project_likes", "project_saves"] {
            removed += self
                .conn
                .execute(&format!("DELETE FROM {table} WHERE project_id = ?1;"), [id])?;
        }
        Ok(removed)
    }

    fn delete(&self, id: ProjectId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id])?;
        Ok(changed)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    Ok(Project {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        timestamps: parse_timestamps(row)?,
    })
}
