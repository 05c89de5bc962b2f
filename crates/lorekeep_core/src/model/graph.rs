//! Structural entities: projects, universes, sagas and books.
//!
//! # Responsibility
//! - Define read models returned by repositories and services.
//! - Define the uniqueness scope of each entity kind.
//!
//! # Invariants
//! - A saga is scoped to its universe when it has one, otherwise to its project.
//! - A book is scoped by priority saga > universe > project; exactly one
//!   scope is active at a time.

use crate::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type UserId = i64;
pub type ProjectId = i64;
pub type UniverseId = i64;
pub type SagaId = i64;
pub type BookId = i64;

/// Writing progress shared by sagas and books.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Published,
}

impl WritingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Published => "published",
        }
    }

    /// Parses a status tag received from an outer layer.
    pub fn parse(value: &str) -> GraphResult<Self> {
        match value.trim() {
            "draft" => Ok(Self::Draft),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "published" => Ok(Self::Published),
            other => Err(GraphError::invalid(format!(
                "invalid status `{other}`; expected draft|in_progress|completed|published"
            ))),
        }
    }
}

/// Server-side timestamps carried by every row.
///
/// Epoch values are the source of truth; the string forms are computed by
/// SQLite on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: i64,
    pub updated_at: i64,
    /// `DD/MM/YYYY HH:MM`, UTC.
    pub created_at_display: String,
    /// `DD/MM/YYYY HH:MM`, UTC.
    pub updated_at_display: String,
    /// ISO-8601 `YYYY-MM-DDTHH:MM:SSZ`.
    pub updated_at_iso: String,
}

/// Reduced read of any entity, used to hydrate parent references without
/// recursing into the parent's own children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLite {
    pub id: i64,
    /// Display name (`title` for books).
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub id: UniverseId,
    pub project_id: ProjectId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saga {
    pub id: SagaId,
    pub project_id: ProjectId,
    pub universe_id: Option<UniverseId>,
    /// `None` marks a root of the saga tree.
    pub parent_saga_id: Option<SagaId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub status: WritingStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Saga {
    pub fn scope(&self) -> SagaScope {
        SagaScope::for_parents(self.project_id, self.universe_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub project_id: ProjectId,
    pub universe_id: Option<UniverseId>,
    pub saga_id: Option<SagaId>,
    pub title: String,
    pub slug: String,
    pub synopsis: String,
    pub status: WritingStatus,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Book {
    pub fn scope(&self) -> BookScope {
        BookScope::for_parents(self.project_id, self.universe_id, self.saga_id)
    }
}

/// Uniqueness scope for saga names and slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaScope {
    Universe(UniverseId),
    Project(ProjectId),
}

impl SagaScope {
    pub fn for_parents(project_id: ProjectId, universe_id: Option<UniverseId>) -> Self {
        match universe_id {
            Some(universe_id) => Self::Universe(universe_id),
            None => Self::Project(project_id),
        }
    }
}

impl Display for SagaScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Universe(id) => write!(f, "universe {id}"),
            Self::Project(id) => write!(f, "project {id}"),
        }
    }
}

/// Uniqueness scope for book titles and slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookScope {
    Saga(SagaId),
    Universe(UniverseId),
    Project(ProjectId),
}

impl BookScope {
    pub fn for_parents(
        project_id: ProjectId,
        universe_id: Option<UniverseId>,
        saga_id: Option<SagaId>,
    ) -> Self {
        match (saga_id, universe_id) {
            (Some(saga_id), _) => Self::Saga(saga_id),
            (None, Some(universe_id)) => Self::Universe(universe_id),
            (None, None) => Self::Project(project_id),
        }
    }
}

impl Display for BookScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Saga(id) => write!(f, "saga {id}"),
            Self::Universe(id) => write!(f, "universe {id}"),
            Self::Project(id) => write!(f, "project {id}"),
        }
    }
}
