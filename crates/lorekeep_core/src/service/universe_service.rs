//! Universe lifecycle use-cases.
//!
//! # Invariants
//! - The owning project must exist before a universe is written.
//! - Name and slug are unique per project.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{BelongingRef, Character};
use crate::model::graph::{Book, EntityLite, ProjectId, Saga, Universe, UniverseId};
use crate::model::validation::{optional_text, require_title};
use crate::repo::book_repo::BookRepository;
use crate::repo::character_repo::CharacterRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::saga_repo::SagaRepository;
use crate::repo::store::GraphStore;
use crate::repo::universe_repo::{UniverseRepository, UniverseWrite};
use crate::service::cascade::{CascadeOrchestrator, DeleteSummary};
use crate::slug;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUniverse {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; a blank `description` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUniverse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniverseDetails {
    #[serde(flatten)]
    pub universe: Universe,
    pub project: EntityLite,
    pub sagas: Vec<Saga>,
    pub books: Vec<Book>,
    pub characters: Vec<Character>,
}

/// Universe service facade.
pub struct UniverseService<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> UniverseService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn create(&self, project_id: ProjectId, input: CreateUniverse) -> GraphResult<Universe> {
        let name = require_title("name", &input.name)?;
        self.project_lite(project_id)?;

        let repo = self.store.universes();
        if repo.name_taken(project_id, &name, None)? {
            return Err(GraphError::duplicate(format!(
                "universe `{name}` already exists in project {project_id}"
            )));
        }
        let slug = slug::resolve(&name, |candidate| {
            repo.slug_taken(project_id, candidate, None)
        })?;

        let universe = repo.create(
            project_id,
            &UniverseWrite {
                name,
                slug,
                description: optional_text(input.description),
            },
        )?;
        info!(
            "event=universe_create module=service status=ok id={} project_id={}",
            universe.id, project_id
        );
        Ok(universe)
    }

    pub fn get(&self, id: UniverseId) -> GraphResult<Universe> {
        self.store
            .universes()
            .get_by_id(id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Universe, id))
    }

    pub fn get_by_slug(&self, project_id: ProjectId, slug: &str) -> GraphResult<Universe> {
        self.store
            .universes()
            .get_by_slug(project_id, slug)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Universe, slug))
    }

    pub fn list_by_project(&self, project_id: ProjectId) -> GraphResult<Vec<Universe>> {
        self.project_lite(project_id)?;
        Ok(self.store.universes().list_by_project(project_id)?)
    }

    pub fn get_all_data(&self, id: UniverseId) -> GraphResult<UniverseDetails> {
        let universe = self.get(id)?;
        Ok(UniverseDetails {
            project: self.project_lite(universe.project_id)?,
            sagas: self.store.sagas().list_by_universe(id)?,
            books: self.store.books().list_by_universe(id)?,
            characters: self
                .store
                .characters()
                .list_by_belonging(BelongingRef::Universe(id))?,
            universe,
        })
    }

    pub fn update(&self, id: UniverseId, input: UpdateUniverse) -> GraphResult<Universe> {
        let current = self.get(id)?;
        let repo = self.store.universes();

        let name = match input.name {
            Some(name) => require_title("name", &name)?,
            None => current.name.clone(),
        };
        let description = match input.description {
            Some(description) => optional_text(Some(description)),
            None => current.description.clone(),
        };

        let slug = if name != current.name {
            if repo.name_taken(current.project_id, &name, Some(id))? {
                return Err(GraphError::duplicate(format!(
                    "universe `{name}` already exists in project {}",
                    current.project_id
                )));
            }
            slug::resolve(&name, |candidate| {
                repo.slug_taken(current.project_id, candidate, Some(id))
            })?
        } else {
            current.slug.clone()
        };

        repo.update(
            id,
            &UniverseWrite {
                name,
                slug,
                description,
            },
        )?;
        info!("event=universe_update module=service status=ok id={id}");
        self.get(id)
    }

    pub fn delete(&self, id: UniverseId) -> GraphResult<DeleteSummary> {
        CascadeOrchestrator::new(self.store).delete_universe(id)
    }

    fn project_lite(&self, project_id: ProjectId) -> GraphResult<EntityLite> {
        self.store
            .projects()
            .get_lite(project_id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Project, project_id))
    }
}
