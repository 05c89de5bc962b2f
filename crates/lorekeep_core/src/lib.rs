//! Core domain logic for Lorekeep.
//!
//! Owns the creative-writing content graph (projects, universes, sagas,
//! books and characters) and every invariant over it: scoped slug and name
//! uniqueness, character belonging resolution, cascading deletes and the
//! character appearance, relationship and timeline records.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod slug;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use error::{EntityKind, GraphError, GraphResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::character::{
    BelongingLevel, BelongingParent, BelongingRef, Character, CharacterId, NewTimelineEvent,
    RelatedCharacter, Relationship, TimelineEvent,
};
pub use model::graph::{
    Book, BookId, BookScope, EntityLite, Project, ProjectId, Saga, SagaId, SagaScope, Timestamps,
    Universe, UniverseId, UserId, WritingStatus,
};
pub use repo::store::{GraphStore, SqliteStore};
pub use repo::{RepoError, RepoResult};
pub use service::belonging::BelongingResolver;
pub use service::book_service::{BookDetails, BookService, CreateBook, UpdateBook};
pub use service::cascade::{CascadeOrchestrator, DeleteSummary};
pub use service::character_links_service::CharacterLinksService;
pub use service::character_service::{
    CharacterDetails, CharacterService, CreateCharacter, UpdateCharacter,
};
pub use service::project_service::{CreateProject, ProjectDetails, ProjectService, UpdateProject};
pub use service::saga_service::{CreateSaga, SagaDetails, SagaService, UpdateSaga};
pub use service::universe_service::{
    CreateUniverse, UniverseDetails, UniverseService, UpdateUniverse,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns the schema version this build migrates to.
pub fn schema_version() -> u32 {
    db::migrations::latest_version()
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping, schema_version};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn schema_version_counts_registered_migrations() {
        assert_eq!(schema_version(), 5);
    }
}
