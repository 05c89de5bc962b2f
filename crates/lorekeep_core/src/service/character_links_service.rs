//! Character appearances, relationships and timeline use-cases.
//!
//! # Responsibility
//! - Validate both ends of every character edge before writing it.
//! - Keep appearance inserts idempotent and relationship inserts upserts.
//! - Replace a character timeline as one all-or-nothing batch.
//!
//! # Invariants
//! - A timeline batch is validated completely before any row is touched.
//! - `event_order` values are pairwise distinct within one batch.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{
    CharacterId, NewTimelineEvent, RelatedCharacter, Relationship, TimelineEvent,
};
use crate::model::graph::{BookId, EntityLite};
use crate::model::validation::optional_text;
use crate::repo::book_repo::BookRepository;
use crate::repo::character_links_repo::CharacterLinkRepository;
use crate::repo::character_repo::CharacterRepository;
use crate::repo::store::GraphStore;
use log::info;
use std::collections::{BTreeSet, HashSet};

/// Character link service facade.
pub struct CharacterLinksService<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> CharacterLinksService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Records that the character appears in every listed book.
    ///
    /// Already-recorded pairs are kept as-is. Returns the full appearance
    /// list after the insert.
    ///
    /// # Errors
    /// - `NotFound` for a missing character or any missing book; nothing is
    ///   written.
    pub fn add_appearances(
        &self,
        character_id: CharacterId,
        book_ids: &[BookId],
    ) -> GraphResult<Vec<EntityLite>> {
        self.ensure_character(character_id)?;
        let unique_books: BTreeSet<BookId> = book_ids.iter().copied().collect();
        for &book_id in &unique_books {
            self.ensure_book(book_id)?;
        }

        let books: Vec<BookId> = unique_books.into_iter().collect();
        let links = self.store.character_links();
        let inserted = links.add_appearances(character_id, &books)?;
        info!(
            "event=appearances_add module=service status=ok character_id={} requested={} inserted={}",
            character_id,
            books.len(),
            inserted
        );
        Ok(links.list_appearances(character_id)?)
    }

    /// Removes one appearance; returns whether a row existed.
    pub fn remove_appearance(&self, character_id: CharacterId, book_id: BookId) -> GraphResult<bool> {
        self.ensure_character(character_id)?;
        let removed = self
            .store
            .character_links()
            .remove_appearance(character_id, book_id)?;
        Ok(removed > 0)
    }

    pub fn list_appearances(&self, character_id: CharacterId) -> GraphResult<Vec<EntityLite>> {
        self.ensure_character(character_id)?;
        Ok(self.store.character_links().list_appearances(character_id)?)
    }

    /// Adds a directed relationship, or replaces the note of an existing one
    /// with the same type.
    ///
    /// # Errors
    /// - `NotFound` when either character is missing.
    /// - `InvalidData` for a blank `relation_type` or a self-relationship.
    pub fn add_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
        note: Option<String>,
    ) -> GraphResult<Relationship> {
        let relation_type = relation_type.trim();
        if relation_type.is_empty() {
            return Err(GraphError::invalid("relation_type is required"));
        }
        if character_id == related_character_id {
            return Err(GraphError::invalid(format!(
                "character {character_id} cannot be related to itself"
            )));
        }
        self.ensure_character(character_id)?;
        self.ensure_character(related_character_id)?;

        let note = optional_text(note);
        let relationship = self.store.character_links().upsert_relationship(
            character_id,
            related_character_id,
            relation_type,
            note.as_deref(),
        )?;
        info!(
            "event=relationship_upsert module=service status=ok id={} character_id={} related_character_id={}",
            relationship.id, character_id, related_character_id
        );
        Ok(relationship)
    }

    /// Removes one typed relationship.
    ///
    /// # Errors
    /// - `NotFound` when no such relationship exists.
    pub fn remove_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
    ) -> GraphResult<()> {
        let relation_type = relation_type.trim();
        let removed = self.store.character_links().remove_relationship(
            character_id,
            related_character_id,
            relation_type,
        )?;
        if removed == 0 {
            return Err(GraphError::not_found(
                EntityKind::Relationship,
                format!("{character_id}->{related_character_id} ({relation_type})"),
            ));
        }
        Ok(())
    }

    /// Outgoing relationships with the related character hydrated.
    pub fn list_relationships(
        &self,
        character_id: CharacterId,
    ) -> GraphResult<Vec<RelatedCharacter>> {
        self.ensure_character(character_id)?;
        Ok(self.store.character_links().list_relationships(character_id)?)
    }

    /// Replaces the whole timeline of a character.
    ///
    /// Returns the stored timeline sorted by `event_order`.
    ///
    /// # Errors
    /// - `InvalidData` for a blank title or a repeated `event_order`.
    /// - `NotFound` for a missing character or referenced book.
    pub fn set_timeline(
        &self,
        character_id: CharacterId,
        events: Vec<NewTimelineEvent>,
    ) -> GraphResult<Vec<TimelineEvent>> {
        self.ensure_character(character_id)?;
        let events = validate_timeline(events)?;
        for book_id in events.iter().filter_map(|event| event.book_id) {
            self.ensure_book(book_id)?;
        }

        let links = self.store.character_links();
        let stored = self
            .store
            .atomically("timeline_replace", || links.replace_timeline(character_id, &events))
            .map_err(GraphError::from)?;
        info!(
            "event=timeline_replace module=service status=ok character_id={character_id} events={stored}"
        );
        Ok(links.list_timeline(character_id)?)
    }

    /// Timeline sorted by `event_order`.
    pub fn get_timeline(&self, character_id: CharacterId) -> GraphResult<Vec<TimelineEvent>> {
        self.ensure_character(character_id)?;
        Ok(self.store.character_links().list_timeline(character_id)?)
    }

    fn ensure_character(&self, id: CharacterId) -> GraphResult<()> {
        match self.store.characters().get_lite(id)? {
            Some(_) => Ok(()),
            None => Err(GraphError::not_found(EntityKind::Character, id)),
        }
    }

    fn ensure_book(&self, id: BookId) -> GraphResult<()> {
        match self.store.books().get_lite(id)? {
            Some(_) => Ok(()),
            None => Err(GraphError::not_found(EntityKind::Book, id)),
        }
    }
}

/// Trims titles and descriptions and checks batch-level rules.
fn validate_timeline(events: Vec<NewTimelineEvent>) -> GraphResult<Vec<NewTimelineEvent>> {
    let orders: HashSet<i64> = events.iter().map(|event| event.event_order).collect();
    if orders.len() != events.len() {
        return Err(GraphError::invalid(
            "event_order must not repeat within a timeline",
        ));
    }

    events
        .into_iter()
        .map(|event| {
            let title = event.title.trim().to_string();
            if title.is_empty() {
                return Err(GraphError::invalid(format!(
                    "timeline event {} requires a title",
                    event.event_order
                )));
            }
            Ok(NewTimelineEvent {
                event_order: event.event_order,
                title,
                description: optional_text(event.description),
                book_id: event.book_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::validate_timeline;
    use crate::model::character::NewTimelineEvent;

    #[test]
    fn repeated_event_order_is_rejected() {
        let err = validate_timeline(vec![
            NewTimelineEvent::new(1, "A"),
            NewTimelineEvent::new(1, "B"),
        ])
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA");
        assert!(err.to_string().contains("event_order"));
    }

    #[test]
    fn blank_title_is_rejected_and_text_is_trimmed() {
        assert!(validate_timeline(vec![NewTimelineEvent::new(1, "   ")]).is_err());

        let mut event = NewTimelineEvent::new(3, "  Exile ");
        event.description = Some("  ".into());
        let events = validate_timeline(vec![event]).unwrap();
        assert_eq!(events[0].title, "Exile");
        assert_eq!(events[0].description, None);
    }

    #[test]
    fn empty_batch_is_valid() {
        assert!(validate_timeline(Vec::new()).unwrap().is_empty());
    }
}
