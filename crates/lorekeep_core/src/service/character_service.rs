//! Character lifecycle use-cases.
//!
//! # Responsibility
//! - Validate the belonging parent before any character write.
//! - Enforce name and slug uniqueness per exact belonging pair.
//! - Hydrate a character with its parent, appearances, relationships and
//!   timeline on read.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{
    BelongingParent, BelongingRef, Character, CharacterId, RelatedCharacter, TimelineEvent,
};
use crate::model::graph::EntityLite;
use crate::model::validation::{optional_text, require_title};
use crate::repo::character_links_repo::CharacterLinkRepository;
use crate::repo::character_repo::{CharacterRepository, CharacterWrite};
use crate::repo::store::GraphStore;
use crate::service::belonging::BelongingResolver;
use crate::service::cascade::{CascadeOrchestrator, DeleteSummary};
use crate::slug;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCharacter {
    #[serde(flatten)]
    pub belonging: BelongingRef,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateCharacter {
    pub fn new(belonging: BelongingRef, name: impl Into<String>) -> Self {
        Self {
            belonging,
            name: name.into(),
            alias: None,
            role: None,
            description: None,
        }
    }
}

/// Partial update; a blank optional field clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCharacter {
    pub belonging: Option<BelongingRef>,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterDetails {
    #[serde(flatten)]
    pub character: Character,
    pub belongs_to: BelongingParent,
    pub appearances: Vec<EntityLite>,
    pub relationships: Vec<RelatedCharacter>,
    pub timeline: Vec<TimelineEvent>,
}

/// Character service facade.
pub struct CharacterService<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> CharacterService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Creates a character at its belonging level.
    ///
    /// # Errors
    /// - `NotFound` when the belonging parent does not exist; nothing is
    ///   written.
    /// - `DuplicateData` when the name exists at the same belonging pair.
    pub fn create(&self, input: CreateCharacter) -> GraphResult<Character> {
        let name = require_title("name", &input.name)?;
        let belonging = input.belonging;
        BelongingResolver::new(self.store).resolve(belonging)?;

        let repo = self.store.characters();
        if repo.name_taken(belonging, &name, None)? {
            return Err(GraphError::duplicate(format!(
                "character `{name}` already exists at {belonging}"
            )));
        }
        let slug = slug::resolve(&name, |candidate| {
            repo.slug_taken(belonging, candidate, None)
        })?;

        let character = repo.create(&CharacterWrite {
            belonging,
            name,
            slug,
            alias: optional_text(input.alias),
            role: optional_text(input.role),
            description: optional_text(input.description),
        })?;
        info!(
            "event=character_create module=service status=ok id={} belonging_level={} belonging_id={}",
            character.id,
            belonging.level(),
            belonging.id()
        );
        Ok(character)
    }

    pub fn get(&self, id: CharacterId) -> GraphResult<Character> {
        self.store
            .characters()
            .get_by_id(id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Character, id))
    }

    pub fn get_by_slug(&self, belonging: BelongingRef, slug: &str) -> GraphResult<Character> {
        self.store
            .characters()
            .get_by_slug(belonging, slug)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Character, slug))
    }

    /// Case-insensitive lookup inside the belonging pair.
    pub fn get_by_name(&self, belonging: BelongingRef, name: &str) -> GraphResult<Character> {
        self.store
            .characters()
            .get_by_name(belonging, name.trim())?
            .ok_or_else(|| GraphError::not_found(EntityKind::Character, name.trim()))
    }

    pub fn list_by_belonging(&self, belonging: BelongingRef) -> GraphResult<Vec<Character>> {
        BelongingResolver::new(self.store).resolve(belonging)?;
        Ok(self.store.characters().list_by_belonging(belonging)?)
    }

    pub fn get_all_data(&self, id: CharacterId) -> GraphResult<CharacterDetails> {
        let character = self.get(id)?;
        let links = self.store.character_links();
        Ok(CharacterDetails {
            belongs_to: BelongingResolver::new(self.store).resolve(character.belonging)?,
            appearances: links.list_appearances(id)?,
            relationships: links.list_relationships(id)?,
            timeline: links.list_timeline(id)?,
            character,
        })
    }

    /// Applies a partial update, optionally moving the character to another
    /// belonging parent.
    pub fn update(&self, id: CharacterId, input: UpdateCharacter) -> GraphResult<Character> {
        let current = self.get(id)?;
        let repo = self.store.characters();

        let belonging = input.belonging.unwrap_or(current.belonging);
        if belonging != current.belonging {
            BelongingResolver::new(self.store).resolve(belonging)?;
        }
        let name = match input.name {
            Some(name) => require_title("name", &name)?,
            None => current.name.clone(),
        };

        let moved = belonging != current.belonging;
        if (name != current.name || moved) && repo.name_taken(belonging, &name, Some(id))? {
            return Err(GraphError::duplicate(format!(
                "character `{name}` already exists at {belonging}"
            )));
        }
        let slug = if name != current.name
            || (moved && repo.slug_taken(belonging, &current.slug, Some(id))?)
        {
            slug::resolve(&name, |candidate| {
                repo.slug_taken(belonging, candidate, Some(id))
            })?
        } else {
            current.slug.clone()
        };

        repo.update(
            id,
            &CharacterWrite {
                belonging,
                name,
                slug,
                alias: input.alias.map_or(current.alias, |value| optional_text(Some(value))),
                role: input.role.map_or(current.role, |value| optional_text(Some(value))),
                description: input
                    .description
                    .map_or(current.description, |value| optional_text(Some(value))),
            },
        )?;
        info!("event=character_update module=service status=ok id={id} belonging={belonging}");
        self.get(id)
    }

    pub fn delete(&self, id: CharacterId) -> GraphResult<DeleteSummary> {
        CascadeOrchestrator::new(self.store).delete_character(id)
    }
}
