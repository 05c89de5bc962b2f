//! Persistence for character appearances, relationships and timelines.
//!
//! # Responsibility
//! - Store character-to-book and character-to-character edges.
//! - Replace a character timeline atomically.
//!
//! # Invariants
//! - Appearance inserts are idempotent (`ON CONFLICT DO NOTHING`).
//! - Relationship inserts upsert the note on
//!   `(character_id, related_character_id, relation_type)`.
//! - Timeline replace deletes and inserts inside one savepoint.

use super::sql::{
    ensure_table_ready, parse_lite, parse_timestamps, query_list, query_optional, with_savepoint,
    NOW_MS, TIMESTAMP_COLUMNS,
};
use super::{RepoError, RepoResult};
use crate::model::character::{
    CharacterId, NewTimelineEvent, RelatedCharacter, Relationship, TimelineEvent,
};
use crate::model::graph::{BookId, EntityLite};
use rusqlite::{params, Connection, Row};

/// Repository interface for character link tables.
pub trait CharacterLinkRepository {
    /// Inserts missing appearance rows; returns how many were new.
    fn add_appearances(&self, character_id: CharacterId, book_ids: &[BookId])
        -> RepoResult<usize>;
    fn remove_appearance(&self, character_id: CharacterId, book_id: BookId) -> RepoResult<usize>;
    /// Books the character appears in, as lite rows ordered by id.
    fn list_appearances(&self, character_id: CharacterId) -> RepoResult<Vec<EntityLite>>;
    /// Characters appearing in the book, as lite rows ordered by id.
    fn list_characters_in_book(&self, book_id: BookId) -> RepoResult<Vec<EntityLite>>;
    fn delete_appearances_for_character(&self, character_id: CharacterId) -> RepoResult<usize>;
    fn delete_appearances_for_book(&self, book_id: BookId) -> RepoResult<usize>;

    fn upsert_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
        note: Option<&str>,
    ) -> RepoResult<Relationship>;
    fn remove_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
    ) -> RepoResult<usize>;
    /// Outgoing relationships hydrated with the related character.
    fn list_relationships(&self, character_id: CharacterId) -> RepoResult<Vec<RelatedCharacter>>;
    /// Removes outgoing and incoming relationships.
    fn delete_relationships_for_character(&self, character_id: CharacterId)
        -> RepoResult<usize>;

    /// Replaces the full timeline; returns the number of stored events.
    fn replace_timeline(
        &self,
        character_id: CharacterId,
        events: &[NewTimelineEvent],
    ) -> RepoResult<usize>;
    /// Timeline ordered by `event_order ASC, id ASC`.
    fn list_timeline(&self, character_id: CharacterId) -> RepoResult<Vec<TimelineEvent>>;
    fn delete_timeline_for_character(&self, character_id: CharacterId) -> RepoResult<usize>;
    /// Clears `book_id` on events of any character that referenced the book.
    fn detach_timeline_book(&self, book_id: BookId) -> RepoResult<usize>;
}

/// SQLite-backed character link repository.
pub struct SqliteCharacterLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCharacterLinkRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "character_appearances", &["character_id", "book_id"])?;
        ensure_table_ready(
            conn,
            "character_relationships",
            &[
                "id",
                "character_id",
                "related_character_id",
                "relation_type",
                "note",
            ],
        )?;
        ensure_table_ready(
            conn,
            "character_timeline",
            &[
                "id",
                "character_id",
                "event_order",
                "title",
                "description",
                "book_id",
            ],
        )?;
        Ok(Self { conn })
    }

    fn get_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
    ) -> RepoResult<Option<Relationship>> {
        query_optional(
            self.conn,
            &format!(
                "SELECT id, character_id, related_character_id, relation_type, note,
                        {TIMESTAMP_COLUMNS}
                 FROM character_relationships
                 WHERE character_id = ?1
                   AND related_character_id = ?2
                   AND relation_type = ?3;"
            ),
            params![character_id, related_character_id, relation_type],
            parse_relationship_row,
        )
    }
}

impl CharacterLinkRepository for SqliteCharacterLinkRepository<'_> {
    fn add_appearances(
        &self,
        character_id: CharacterId,
        book_ids: &[BookId],
    ) -> RepoResult<usize> {
        with_savepoint(self.conn, "appearances_add", || {
            let mut stmt = self.conn.prepare(
                "INSERT INTO character_appearances (character_id, book_id)
                 VALUES (?1, ?2)
                 ON CONFLICT (character_id, book_id) DO NOTHING;",
            )?;
            let mut inserted = 0;
            for book_id in book_ids {
                inserted += stmt.execute(params![character_id, book_id])?;
            }
            Ok(inserted)
        })
    }

    fn remove_appearance(&self, character_id: CharacterId, book_id: BookId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM character_appearances
             WHERE character_id = ?1 AND book_id = ?2;",
            params![character_id, book_id],
        )?;
        Ok(changed)
    }

    fn list_appearances(&self, character_id: CharacterId) -> RepoResult<Vec<EntityLite>> {
        query_list(
            self.conn,
            "SELECT b.id AS id, b.title AS name, b.slug AS slug
             FROM character_appearances a
             INNER JOIN books b ON b.id = a.book_id
             WHERE a.character_id = ?1
             ORDER BY b.id ASC;",
            [character_id],
            parse_lite,
        )
    }

    fn list_characters_in_book(&self, book_id: BookId) -> RepoResult<Vec<EntityLite>> {
        query_list(
            self.conn,
            "SELECT c.id AS id, c.name AS name, c.slug AS slug
             FROM character_appearances a
             INNER JOIN characters c ON c.id = a.character_id
             WHERE a.book_id = ?1
             ORDER BY c.id ASC;",
            [book_id],
            parse_lite,
        )
    }

    fn delete_appearances_for_character(&self, character_id: CharacterId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM character_appearances WHERE character_id = ?1;",
            [character_id],
        )?;
        Ok(changed)
    }

    fn delete_appearances_for_book(&self, book_id: BookId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM character_appearances WHERE book_id = ?1;",
            [book_id],
        )?;
        Ok(changed)
    }

    fn upsert_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
        note: Option<&str>,
    ) -> RepoResult<Relationship> {
        self.conn.execute(
            &format!(
                "INSERT INTO character_relationships (
                    character_id,
                    related_character_id,
                    relation_type,
                    note
                 ) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (character_id, related_character_id, relation_type)
                 DO UPDATE SET note = excluded.note,
                               updated_at = {NOW_MS};"
            ),
            params![character_id, related_character_id, relation_type, note],
        )?;
        self.get_relationship(character_id, related_character_id, relation_type)?
            .ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "relationship {character_id}->{related_character_id} ({relation_type}) missing after upsert"
                ))
            })
    }

    fn remove_relationship(
        &self,
        character_id: CharacterId,
        related_character_id: CharacterId,
        relation_type: &str,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM character_relationships
             WHERE character_id = ?1
               AND related_character_id = ?2
               AND relation_type = ?3;",
            params![character_id, related_character_id, relation_type],
        )?;
        Ok(changed)
    }

    fn list_relationships(&self, character_id: CharacterId) -> RepoResult<Vec<RelatedCharacter>> {
        query_list(
            self.conn,
            &format!(
                "SELECT rel.*, c.name AS related_name, c.slug AS related_slug
                 FROM (
                    SELECT id, character_id, related_character_id, relation_type, note,
                           {TIMESTAMP_COLUMNS}
                    FROM character_relationships
                    WHERE character_id = ?1
                 ) AS rel
                 INNER JOIN characters c ON c.id = rel.related_character_id
                 ORDER BY rel.relation_type ASC, rel.id ASC;"
            ),
            [character_id],
            |row| {
                let relationship = parse_relationship_row(row)?;
                let related = EntityLite {
                    id: relationship.related_character_id,
                    name: row.get("related_name")?,
                    slug: row.get("related_slug")?,
                };
                Ok(RelatedCharacter {
                    relationship,
                    related,
                })
            },
        )
    }

    fn delete_relationships_for_character(
        &self,
        character_id: CharacterId,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM character_relationships
             WHERE character_id = ?1 OR related_character_id = ?1;",
            [character_id],
        )?;
        Ok(changed)
    }

    fn replace_timeline(
        &self,
        character_id: CharacterId,
        events: &[NewTimelineEvent],
    ) -> RepoResult<usize> {
        with_savepoint(self.conn, "timeline_replace", || {
            self.conn.execute(
                "DELETE FROM character_timeline WHERE character_id = ?1;",
                [character_id],
            )?;
            let mut stmt = self.conn.prepare(
                "INSERT INTO character_timeline (
                    character_id,
                    event_order,
                    title,
                    description,
                    book_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for event in events {
                stmt.execute(params![
                    character_id,
                    event.event_order,
                    event.title,
                    event.description,
                    event.book_id,
                ])?;
            }
            Ok(events.len())
        })
    }

    fn list_timeline(&self, character_id: CharacterId) -> RepoResult<Vec<TimelineEvent>> {
        query_list(
            self.conn,
            "SELECT id, character_id, event_order, title, description, book_id
             FROM character_timeline
             WHERE character_id = ?1
             ORDER BY event_order ASC, id ASC;",
            [character_id],
            parse_timeline_row,
        )
    }

    fn delete_timeline_for_character(&self, character_id: CharacterId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM character_timeline WHERE character_id = ?1;",
            [character_id],
        )?;
        Ok(changed)
    }

    fn detach_timeline_book(&self, book_id: BookId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE character_timeline SET book_id = NULL WHERE book_id = ?1;",
            [book_id],
        )?;
        Ok(changed)
    }
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    Ok(Relationship {
        id: row.get("id")?,
        character_id: row.get("character_id")?,
        related_character_id: row.get("related_character_id")?,
        relation_type: row.get("relation_type")?,
        note: row.get("note")?,
        timestamps: parse_timestamps(row)?,
    })
}

fn parse_timeline_row(row: &Row<'_>) -> RepoResult<TimelineEvent> {
    Ok(TimelineEvent {
        id: row.get("id")?,
        character_id: row.get("character_id")?,
        event_order: row.get("event_order")?,
        title: row.get("title")?,
        description: row.get("description")?,
        book_id: row.get("book_id")?,
    })
}
