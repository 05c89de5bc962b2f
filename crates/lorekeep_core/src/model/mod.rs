//! Domain model for the hierarchical content graph.
//!
//! # Responsibility
//! - Define the row shapes for projects, universes, sagas, books, characters
//!   and the character link tables.
//! - Define uniqueness scopes and the tagged belonging reference.
//!
//! # Invariants
//! - Every entity is addressed by a stable integer id.
//! - Deletion is a hard delete driven by the cascade orchestrator.

pub mod character;
pub mod graph;
pub mod validation;
