//! Typed error taxonomy surfaced by lifecycle services.
//!
//! # Responsibility
//! - Give every caller-facing failure a human message, an HTTP-like status
//!   and a stable machine code.
//! - Translate repository failures into that taxonomy in one place.
//!
//! # Invariants
//! - Validation and existence errors are returned unmodified; nothing here
//!   retries or downgrades an error.

use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by every lifecycle service.
pub type GraphResult<T> = Result<T, GraphError>;

/// Entity kinds addressable by the content graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Universe,
    Saga,
    Book,
    Character,
    Relationship,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Universe => "universe",
            Self::Saga => "saga",
            Self::Book => "book",
            Self::Character => "character",
            Self::Relationship => "relationship",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing error for content graph operations.
#[derive(Debug)]
pub enum GraphError {
    /// Requested row, or a referenced parent, does not exist.
    NotFound { entity: EntityKind, key: String },
    /// Name/title/slug already taken inside the active uniqueness scope.
    DuplicateData(String),
    /// Structural validation failure.
    InvalidData(String),
    /// Persistence failure with no domain meaning.
    Store(RepoError),
}

impl GraphError {
    pub fn not_found(entity: EntityKind, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::DuplicateData(message.into())
    }

    /// HTTP-like status the outer layer maps this error to.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::DuplicateData(_) => 409,
            Self::InvalidData(_) => 400,
            Self::Store(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DuplicateData(_) => "DUPLICATE_DATA",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Human-readable message, without code or status.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::DuplicateData(message) => write!(f, "{message}"),
            Self::InvalidData(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for GraphError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UniqueViolation(details) => {
                Self::DuplicateData(format!("value already exists in this scope ({details})"))
            }
            other => Self::Store(other),
        }
    }
}
