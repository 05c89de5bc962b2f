//! Characters and their appearance, relationship and timeline records.
//!
//! # Responsibility
//! - Model the polymorphic `(belonging_level, belonging_id)` pair as a sum
//!   type with exactly four variants.
//! - Define read/write shapes for character link tables.
//!
//! # Invariants
//! - A character belongs to exactly one project, universe, saga or book.
//! - The string tag form exists only at storage/serialization boundaries.

use crate::error::{GraphError, GraphResult};
use crate::model::graph::{BookId, EntityLite, ProjectId, SagaId, Timestamps, UniverseId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type CharacterId = i64;

/// Narrative tier a character is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BelongingLevel {
    Project,
    Universe,
    Saga,
    Book,
}

impl BelongingLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Universe => "universe",
            Self::Saga => "saga",
            Self::Book => "book",
        }
    }

    /// Parses a belonging tag received from an outer layer.
    pub fn parse(value: &str) -> GraphResult<Self> {
        match value.trim() {
            "project" => Ok(Self::Project),
            "universe" => Ok(Self::Universe),
            "saga" => Ok(Self::Saga),
            "book" => Ok(Self::Book),
            other => Err(GraphError::invalid(format!(
                "invalid belonging_level `{other}`; expected project|universe|saga|book"
            ))),
        }
    }
}

impl Display for BelongingLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed reference to the entity a character belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    tag = "belonging_level",
    content = "belonging_id",
    rename_all = "lowercase"
)]
pub enum BelongingRef {
    Project(ProjectId),
    Universe(UniverseId),
    Saga(SagaId),
    Book(BookId),
}

impl BelongingRef {
    pub fn new(level: BelongingLevel, id: i64) -> Self {
        match level {
            BelongingLevel::Project => Self::Project(id),
            BelongingLevel::Universe => Self::Universe(id),
            BelongingLevel::Saga => Self::Saga(id),
            BelongingLevel::Book => Self::Book(id),
        }
    }

    /// Builds a reference from the untyped `(level, id)` pair.
    pub fn parse(level: &str, id: i64) -> GraphResult<Self> {
        Ok(Self::new(BelongingLevel::parse(level)?, id))
    }

    pub fn level(self) -> BelongingLevel {
        match self {
            Self::Project(_) => BelongingLevel::Project,
            Self::Universe(_) => BelongingLevel::Universe,
            Self::Saga(_) => BelongingLevel::Saga,
            Self::Book(_) => BelongingLevel::Book,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Project(id) | Self::Universe(id) | Self::Saga(id) | Self::Book(id) => id,
        }
    }
}

impl Display for BelongingRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.level(), self.id())
    }
}

/// Resolved parent of a character, used for read hydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BelongingParent {
    pub level: BelongingLevel,
    #[serde(flatten)]
    pub lite: EntityLite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    #[serde(flatten)]
    pub belonging: BelongingRef,
    pub name: String,
    pub slug: String,
    pub alias: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Directed character-to-character edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub character_id: CharacterId,
    pub related_character_id: CharacterId,
    pub relation_type: String,
    pub note: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Outgoing relationship hydrated with the related character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedCharacter {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub related: EntityLite,
}

/// One stored narrative event of a character timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: i64,
    pub character_id: CharacterId,
    pub event_order: i64,
    pub title: String,
    pub description: Option<String>,
    pub book_id: Option<BookId>,
}

/// Timeline event as submitted for a full timeline replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimelineEvent {
    pub event_order: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub book_id: Option<BookId>,
}

impl NewTimelineEvent {
    pub fn new(event_order: i64, title: impl Into<String>) -> Self {
        Self {
            event_order,
            title: title.into(),
            description: None,
            book_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BelongingLevel, BelongingRef};

    #[test]
    fn belonging_ref_round_trips_level_and_id() {
        let belonging = BelongingRef::parse("saga", 12).unwrap();
        assert_eq!(belonging, BelongingRef::Saga(12));
        assert_eq!(belonging.level(), BelongingLevel::Saga);
        assert_eq!(belonging.id(), 12);
        assert_eq!(belonging.to_string(), "saga 12");
    }

    #[test]
    fn belonging_parse_rejects_unknown_level() {
        let err = BelongingRef::parse("chapter", 1).unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");
    }

    #[test]
    fn belonging_serializes_as_tagged_pair() {
        let value = serde_json::to_value(BelongingRef::Book(9)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "belonging_level": "book", "belonging_id": 9 })
        );
    }
}
