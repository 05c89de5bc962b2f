//! Project lifecycle use-cases.
//!
//! # Responsibility
//! - Validate project input and enforce per-owner name and slug uniqueness.
//! - Hydrate a project with its direct content on read.
//! - Route deletes through the cascade orchestrator.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{BelongingRef, Character};
use crate::model::graph::{Book, Project, ProjectId, Saga, Universe, UserId};
use crate::model::validation::{require_text, require_title};
use crate::repo::book_repo::BookRepository;
use crate::repo::character_repo::CharacterRepository;
use crate::repo::project_repo::{ProjectRepository, ProjectWrite};
use crate::repo::saga_repo::SagaRepository;
use crate::repo::store::GraphStore;
use crate::repo::universe_repo::UniverseRepository;
use crate::service::cascade::{CascadeOrchestrator, DeleteSummary};
use crate::slug;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project with every entity it owns directly or transitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub universes: Vec<Universe>,
    pub sagas: Vec<Saga>,
    pub books: Vec<Book>,
    /// Characters attached at project level only.
    pub characters: Vec<Character>,
}

/// Project service facade.
pub struct ProjectService<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> ProjectService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Creates a project owned by `owner_id`.
    ///
    /// # Errors
    /// - `InvalidData` for a short name or a blank description.
    /// - `DuplicateData` when the owner already has a project with that name.
    pub fn create(&self, owner_id: UserId, input: CreateProject) -> GraphResult<Project> {
        let name = require_title("name", &input.name)?;
        let description = require_text("description", &input.description)?;
        let repo = self.store.projects();
        if repo.name_taken(owner_id, &name, None)? {
            return Err(GraphError::duplicate(format!(
                "project `{name}` already exists for this owner"
            )));
        }
        let slug = slug::resolve(&name, |candidate| repo.slug_taken(owner_id, candidate, None))?;

        let project = repo.create(
            owner_id,
            &ProjectWrite {
                name,
                slug,
                description,
            },
        )?;
        info!(
            "event=project_create module=service status=ok id={} owner_id={}",
            project.id, owner_id
        );
        Ok(project)
    }

    pub fn get(&self, id: ProjectId) -> GraphResult<Project> {
        self.store
            .projects()
            .get_by_id(id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Project, id))
    }

    pub fn get_by_slug(&self, owner_id: UserId, slug: &str) -> GraphResult<Project> {
        self.store
            .projects()
            .get_by_slug(owner_id, slug)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Project, slug))
    }

    /// Most recently updated first.
    pub fn list_by_owner(&self, owner_id: UserId) -> GraphResult<Vec<Project>> {
        Ok(self.store.projects().list_by_owner(owner_id)?)
    }

    pub fn get_all_data(&self, id: ProjectId) -> GraphResult<ProjectDetails> {
        let project = self.get(id)?;
        Ok(ProjectDetails {
            universes: self.store.universes().list_by_project(id)?,
            sagas: self.store.sagas().list_by_project(id)?,
            books: self.store.books().list_by_project(id)?,
            characters: self
                .store
                .characters()
                .list_by_belonging(BelongingRef::Project(id))?,
            project,
        })
    }

    /// Applies a partial update; the slug is regenerated only when the name
    /// changes.
    pub fn update(&self, id: ProjectId, input: UpdateProject) -> GraphResult<Project> {
        let current = self.get(id)?;
        let repo = self.store.projects();

        let name = match input.name {
            Some(name) => require_title("name", &name)?,
            None => current.name.clone(),
        };
        let description = match input.description {
            Some(description) => require_text("description", &description)?,
            None => current.description.clone(),
        };

        let slug = if name != current.name {
            if repo.name_taken(current.owner_id, &name, Some(id))? {
                return Err(GraphError::duplicate(format!(
                    "project `{name}` already exists for this owner"
                )));
            }
            slug::resolve(&name, |candidate| {
                repo.slug_taken(current.owner_id, candidate, Some(id))
            })?
        } else {
            current.slug.clone()
        };

        repo.update(
            id,
            &ProjectWrite {
                name,
                slug,
                description,
            },
        )?;
        info!("event=project_update module=service status=ok id={id}");
        self.get(id)
    }

    pub fn delete(&self, id: ProjectId) -> GraphResult<DeleteSummary> {
        CascadeOrchestrator::new(self.store).delete_project(id)
    }
}
