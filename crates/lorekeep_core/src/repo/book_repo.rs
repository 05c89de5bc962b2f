//! Book repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Title and slug lookups honor the single active [`BookScope`]:
//!   saga > universe > project.
//! - `list_by_universe` and `list_by_project` return every book pointing at
//!   that parent, including books also attached to a saga.

use super::sql::{
    ensure_table_ready, parse_lite, parse_status, parse_timestamps, query_exists, query_list,
    query_optional, NOW_MS, TIMESTAMP_COLUMNS,
};
use super::{RepoError, RepoResult};
use crate::model::graph::{
    Book, BookId, BookScope, EntityLite, ProjectId, SagaId, UniverseId, WritingStatus,
};
use rusqlite::{params, Connection, Row};

/// Column values written on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWrite {
    pub universe_id: Option<UniverseId>,
    pub saga_id: Option<SagaId>,
    pub title: String,
    pub slug: String,
    pub synopsis: String,
    pub status: WritingStatus,
}

/// Repository interface for book rows.
pub trait BookRepository {
    fn get_by_id(&self, id: BookId) -> RepoResult<Option<Book>>;
    fn get_lite(&self, id: BookId) -> RepoResult<Option<EntityLite>>;
    fn get_by_slug(&self, scope: BookScope, slug: &str) -> RepoResult<Option<Book>>;
    fn title_taken(&self, scope: BookScope, title: &str, exclude: Option<BookId>)
        -> RepoResult<bool>;
    fn slug_taken(&self, scope: BookScope, slug: &str, exclude: Option<BookId>)
        -> RepoResult<bool>;
    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Book>>;
    fn list_by_universe(&self, universe_id: UniverseId) -> RepoResult<Vec<Book>>;
    fn list_by_saga(&self, saga_id: SagaId) -> RepoResult<Vec<Book>>;
    fn create(&self, project_id: ProjectId, data: &BookWrite) -> RepoResult<Book>;
    fn update(&self, id: BookId, data: &BookWrite) -> RepoResult<usize>;
    fn delete(&self, id: BookId) -> RepoResult<usize>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "books",
            &[
                "id",
                "project_id",
                "universe_id",
                "saga_id",
                "title",
                "slug",
                "synopsis",
                "status",
            ],
        )?;
        Ok(Self { conn })
    }

    fn select_sql(filter: &str) -> String {
        format!(
            "SELECT id, project_id, universe_id, saga_id, title, slug, synopsis, status,
                    {TIMESTAMP_COLUMNS}
             FROM books
             WHERE {filter}"
        )
    }
}

/// SQL filter and bound id selecting the books of one scope, as `?1`.
fn scope_filter(scope: BookScope) -> (&'static str, i64) {
    match scope {
        BookScope::Saga(saga_id) => ("saga_id = ?1", saga_id),
        BookScope::Universe(universe_id) => ("saga_id IS NULL AND universe_id = ?1", universe_id),
        BookScope::Project(project_id) => (
            "saga_id IS NULL AND universe_id IS NULL AND project_id = ?1",
            project_id,
        ),
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn get_by_id(&self, id: BookId) -> RepoResult<Option<Book>> {
        query_optional(self.conn, &Self::select_sql("id = ?1;"), [id], parse_book_row)
    }

    fn get_lite(&self, id: BookId) -> RepoResult<Option<EntityLite>> {
        query_optional(
            self.conn,
            "SELECT id, title AS name, slug FROM books WHERE id = ?1;",
            [id],
            parse_lite,
        )
    }

    fn get_by_slug(&self, scope: BookScope, slug: &str) -> RepoResult<Option<Book>> {
        let (filter, scope_id) = scope_filter(scope);
        query_optional(
            self.conn,
            &Self::select_sql(&format!("{filter} AND slug = ?2;")),
            params![scope_id, slug],
            parse_book_row,
        )
    }

    fn title_taken(
        &self,
        scope: BookScope,
        title: &str,
        exclude: Option<BookId>,
    ) -> RepoResult<bool> {
        let (filter, scope_id) = scope_filter(scope);
        query_exists(
            self.conn,
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM books
                    WHERE {filter}
                      AND title = ?2 COLLATE UNICASE
                      AND (?3 IS NULL OR id <> ?3)
                );"
            ),
            params![scope_id, title, exclude],
        )
    }

    fn slug_taken(
        &self,
        scope: BookScope,
        slug: &str,
        exclude: Option<BookId>,
    ) -> RepoResult<bool> {
        let (filter, scope_id) = scope_filter(scope);
        query_exists(
            self.conn,
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM books
                    WHERE {filter}
                      AND slug = ?2
                      AND (?3 IS NULL OR id <> ?3)
                );"
            ),
            params![scope_id, slug, exclude],
        )
    }

    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Book>> {
        query_list(
            self.conn,
            &Self::select_sql("project_id = ?1 ORDER BY id ASC;"),
            [project_id],
            parse_book_row,
        )
    }

    fn list_by_universe(&self, universe_id: UniverseId) -> RepoResult<Vec<Book>> {
        query_list(
            self.conn,
            &Self::select_sql("universe_id = ?1 ORDER BY id ASC;"),
            [universe_id],
            parse_book_row,
        )
    }

    fn list_by_saga(&self, saga_id: SagaId) -> RepoResult<Vec<Book>> {
        query_list(
            self.conn,
            &Self::select_sql("saga_id = ?1 ORDER BY id ASC;"),
            [saga_id],
            parse_book_row,
        )
    }

    fn create(&self, project_id: ProjectId, data: &BookWrite) -> RepoResult<Book> {
        self.conn.execute(
            "INSERT INTO books (
                project_id,
                universe_id,
                saga_id,
                title,
                slug,
                synopsis,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                project_id,
                data.universe_id,
                data.saga_id,
                data.title,
                data.slug,
                data.synopsis,
                data.status.as_str(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("book {id} missing after insert")))
    }

    fn update(&self, id: BookId, data: &BookWrite) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE books
                 SET universe_id = ?2,
                     saga_id = ?3,
                     title = ?4,
                     slug = ?5,
                     synopsis = ?6,
                     status = ?7,
                     updated_at = {NOW_MS}
                 WHERE id = ?1;"
            ),
            params![
                id,
                data.universe_id,
                data.saga_id,
                data.title,
                data.slug,
                data.synopsis,
                data.status.as_str(),
            ],
        )?;
        Ok(changed)
    }

    fn delete(&self, id: BookId) -> RepoResult<usize> {
        let changed = self.conn.execute("DELETE FROM books WHERE id = ?1;", [id])?;
        Ok(changed)
    }
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    Ok(Book {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        universe_id: row.get("universe_id")?,
        saga_id: row.get("saga_id")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        synopsis: row.get("synopsis")?,
        status: parse_status(row, "status")?,
        timestamps: parse_timestamps(row)?,
    })
}
