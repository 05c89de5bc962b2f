//! Character repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(belonging_level, belonging_id)` is stored as a tag plus id; the pair
//!   is never a foreign key, so existence is validated by services.
//! - Name and slug uniqueness scope is the exact belonging pair.

use super::sql::{
    ensure_table_ready, parse_lite, parse_timestamps, query_exists, query_list, query_optional,
    NOW_MS, TIMESTAMP_COLUMNS,
};
use super::{RepoError, RepoResult};
use crate::model::character::{BelongingLevel, BelongingRef, Character, CharacterId};
use crate::model::graph::EntityLite;
use rusqlite::{params, Connection, Row};

/// Column values written on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterWrite {
    pub belonging: BelongingRef,
    pub name: String,
    pub slug: String,
    pub alias: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
}

/// Repository interface for character rows.
pub trait CharacterRepository {
    fn get_by_id(&self, id: CharacterId) -> RepoResult<Option<Character>>;
    fn get_lite(&self, id: CharacterId) -> RepoResult<Option<EntityLite>>;
    fn get_by_slug(&self, belonging: BelongingRef, slug: &str) -> RepoResult<Option<Character>>;
    fn get_by_name(&self, belonging: BelongingRef, name: &str)
        -> RepoResult<Option<Character>>;
    fn name_taken(
        &self,
        belonging: BelongingRef,
        name: &str,
        exclude: Option<CharacterId>,
    ) -> RepoResult<bool>;
    fn slug_taken(
        &self,
        belonging: BelongingRef,
        slug: &str,
        exclude: Option<CharacterId>,
    ) -> RepoResult<bool>;
    fn list_by_belonging(&self, belonging: BelongingRef) -> RepoResult<Vec<Character>>;
    fn create(&self, data: &CharacterWrite) -> RepoResult<Character>;
    fn update(&self, id: CharacterId, data: &CharacterWrite) -> RepoResult<usize>;
    fn delete(&self, id: CharacterId) -> RepoResult<usize>;
}

/// SQLite-backed character repository.
pub struct SqliteCharacterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCharacterRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(
            conn,
            "characters",
            &[
                "id",
                "belonging_level",
                "belonging_id",
                "name",
                "slug",
                "alias",
                "role",
                "description",
            ],
        )?;
        Ok(Self { conn })
    }

    fn select_sql(filter: &str) -> String {
        format!(
            "SELECT id, belonging_level, belonging_id, name, slug, alias, role, description,
                    {TIMESTAMP_COLUMNS}
             FROM characters
             WHERE {filter}"
        )
    }
}

impl CharacterRepository for SqliteCharacterRepository<'_> {
    fn get_by_id(&self, id: CharacterId) -> RepoResult<Option<Character>> {
        query_optional(
            self.conn,
            &Self::select_sql("id = ?1;"),
            [id],
            parse_character_row,
        )
    }

    fn get_lite(&self, id: CharacterId) -> RepoResult<Option<EntityLite>> {
        query_optional(
            self.conn,
            "SELECT id, name, slug FROM characters WHERE id = ?1;",
            [id],
            parse_lite,
        )
    }

    fn get_by_slug(&self, belonging: BelongingRef, slug: &str) -> RepoResult<Option<Character>> {
        query_optional(
            self.conn,
            &Self::select_sql("belonging_level = ?1 AND belonging_id = ?2 AND slug = ?3;"),
            params![belonging.level().as_str(), belonging.id(), slug],
            parse_character_row,
        )
    }

    fn get_by_name(
        &self,
        belonging: BelongingRef,
        name: &str,
    ) -> RepoResult<Option<Character>> {
        query_optional(
            self.conn,
            &Self::select_sql(
                "belonging_level = ?1 AND belonging_id = ?2 AND name = ?3 COLLATE UNICASE;",
            ),
            params![belonging.level().as_str(), belonging.id(), name],
            parse_character_row,
        )
    }

    fn name_taken(
        &self,
        belonging: BelongingRef,
        name: &str,
        exclude: Option<CharacterId>,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM characters
                WHERE belonging_level = ?1
                  AND belonging_id = ?2
                  AND name = ?3 COLLATE UNICASE
                  AND (?4 IS NULL OR id <> ?4)
            );",
            params![belonging.level().as_str(), belonging.id(), name, exclude],
        )
    }

    fn slug_taken(
        &self,
        belonging: BelongingRef,
        slug: &str,
        exclude: Option<CharacterId>,
    ) -> RepoResult<bool> {
        query_exists(
            self.conn,
            "SELECT EXISTS(
                SELECT 1 FROM characters
                WHERE belonging_level = ?1
                  AND belonging_id = ?2
                  AND slug = ?3
                  AND (?4 IS NULL OR id <> ?4)
            );",
            params![belonging.level().as_str(), belonging.id(), slug, exclude],
        )
    }

    fn list_by_belonging(&self, belonging: BelongingRef) -> RepoResult<Vec<Character>> {
        query_list(
            self.conn,
            &Self::select_sql(
                "belonging_level = ?1 AND belonging_id = ?2
                 ORDER BY name COLLATE UNICASE ASC, id ASC;",
            ),
            params![belonging.level().as_str(), belonging.id()],
            parse_character_row,
        )
    }

    fn create(&self, data: &CharacterWrite) -> RepoResult<Character> {
        self.conn.execute(
            "INSERT INTO characters (
                belonging_level,
                belonging_id,
                name,
                slug,
                alias,
                role,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                data.belonging.level().as_str(),
                data.belonging.id(),
                data.name,
                data.slug,
                data.alias,
                data.role,
                data.description,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_by_id(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("character {id} missing after insert")))
    }

    fn update(&self, id: CharacterId, data: &CharacterWrite) -> RepoResult<usize> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE characters
                 SET belonging_level = ?2,
                     belonging_id = ?3,
                     name = ?4,
                     slug = ?5,
                     alias = ?6,
                     role = ?7,
                     description = ?8,
                     updated_at = {NOW_MS}
                 WHERE id = ?1;"
            ),
            params![
                id,
                data.belonging.level().as_str(),
                data.belonging.id(),
                data.name,
                data.slug,
                data.alias,
                data.role,
                data.description,
            ],
        )?;
        Ok(changed)
    }

    fn delete(&self, id: CharacterId) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM characters WHERE id = ?1;", [id])?;
        Ok(changed)
    }
}

fn parse_character_row(row: &Row<'_>) -> RepoResult<Character> {
    let level_text: String = row.get("belonging_level")?;
    let level = BelongingLevel::parse(&level_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid belonging level `{level_text}` in characters.belonging_level"
        ))
    })?;

    Ok(Character {
        id: row.get("id")?,
        belonging: BelongingRef::new(level, row.get("belonging_id")?),
        name: row.get("name")?,
        slug: row.get("slug")?,
        alias: row.get("alias")?,
        role: row.get("role")?,
        description: row.get("description")?,
        timestamps: parse_timestamps(row)?,
    })
}
