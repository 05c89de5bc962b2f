//! Store aggregate grouping one repository per entity kind.
//!
//! # Responsibility
//! - Hand services every repository they need through one injected value.
//! - Provide an atomic unit of work spanning several repositories.
//!
//! # Invariants
//! - `atomically` nests: an inner unit rolls back on its own failure without
//!   releasing the outer one, and the outer failure rolls back everything.

use super::book_repo::{BookRepository, SqliteBookRepository};
use super::character_links_repo::{CharacterLinkRepository, SqliteCharacterLinkRepository};
use super::character_repo::{CharacterRepository, SqliteCharacterRepository};
use super::project_repo::{ProjectRepository, SqliteProjectRepository};
use super::saga_repo::{SagaRepository, SqliteSagaRepository};
use super::sql::with_savepoint;
use super::universe_repo::{SqliteUniverseRepository, UniverseRepository};
use super::{RepoError, RepoResult};
use log::debug;
use rusqlite::Connection;

/// Repository set consumed by lifecycle services and the cascade orchestrator.
pub trait GraphStore {
    type Projects: ProjectRepository;
    type Universes: UniverseRepository;
    type Sagas: SagaRepository;
    type Books: BookRepository;
    type Characters: CharacterRepository;
    type CharacterLinks: CharacterLinkRepository;

    fn projects(&self) -> &Self::Projects;
    fn universes(&self) -> &Self::Universes;
    fn sagas(&self) -> &Self::Sagas;
    fn books(&self) -> &Self::Books;
    fn characters(&self) -> &Self::Characters;
    fn character_links(&self) -> &Self::CharacterLinks;

    /// Runs `work` as one all-or-nothing unit.
    ///
    /// `label` is diagnostic only.
    fn atomically<T, E>(
        &self,
        label: &'static str,
        work: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>;
}

/// SQLite store borrowing one migrated connection.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
    projects: SqliteProjectRepository<'conn>,
    universes: SqliteUniverseRepository<'conn>,
    sagas: SqliteSagaRepository<'conn>,
    books: SqliteBookRepository<'conn>,
    characters: SqliteCharacterRepository<'conn>,
    character_links: SqliteCharacterLinkRepository<'conn>,
}

impl<'conn> SqliteStore<'conn> {
    /// Builds every repository, failing if the schema is not fully migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            conn,
            projects: SqliteProjectRepository::try_new(conn)?,
            universes: SqliteUniverseRepository::try_new(conn)?,
            sagas: SqliteSagaRepository::try_new(conn)?,
            books: SqliteBookRepository::try_new(conn)?,
            characters: SqliteCharacterRepository::try_new(conn)?,
            character_links: SqliteCharacterLinkRepository::try_new(conn)?,
        })
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }
}

impl<'conn> GraphStore for SqliteStore<'conn> {
    type Projects = SqliteProjectRepository<'conn>;
    type Universes = SqliteUniverseRepository<'conn>;
    type Sagas = SqliteSagaRepository<'conn>;
    type Books = SqliteBookRepository<'conn>;
    type Characters = SqliteCharacterRepository<'conn>;
    type CharacterLinks = SqliteCharacterLinkRepository<'conn>;

    fn projects(&self) -> &Self::Projects {
        &self.projects
    }

    fn universes(&self) -> &Self::Universes {
        &self.universes
    }

    fn sagas(&self) -> &Self::Sagas {
        &self.sagas
    }

    fn books(&self) -> &Self::Books {
        &self.books
    }

    fn characters(&self) -> &Self::Characters {
        &self.characters
    }

    fn character_links(&self) -> &Self::CharacterLinks {
        &self.character_links
    }

    fn atomically<T, E>(
        &self,
        label: &'static str,
        work: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        debug!("event=unit_of_work module=repo status=start label={label}");
        let result = with_savepoint(self.conn, "graph_unit", work);
        let status = if result.is_ok() { "ok" } else { "rolled_back" };
        debug!("event=unit_of_work module=repo status={status} label={label}");
        result
    }
}
