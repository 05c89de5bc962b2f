//! Content graph use-case services.
//!
//! # Responsibility
//! - Validate input and enforce scope uniqueness above the repository layer.
//! - Hydrate related data on read and route deletes through [`cascade`].
//!
//! Every service borrows a [`crate::repo::store::GraphStore`], so any store
//! implementation can back them.

pub mod belonging;
pub mod book_service;
pub mod cascade;
pub mod character_links_service;
pub mod character_service;
pub mod project_service;
pub mod saga_service;
pub mod universe_service;
