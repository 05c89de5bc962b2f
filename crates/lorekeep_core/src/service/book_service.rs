//! Book lifecycle use-cases.
//!
//! # Invariants
//! - A book carries at most one saga and one universe of its own project.
//! - A book in a saga carries the saga's universe.
//! - Title and slug are unique in the active [`BookScope`]; the slug is
//!   regenerated only when the title changes or the current slug collides
//!   in a new scope.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{BelongingRef, Character};
use crate::model::graph::{
    Book, BookId, BookScope, EntityLite, ProjectId, SagaId, UniverseId, WritingStatus,
};
use crate::model::validation::{require_text, require_title};
use crate::repo::book_repo::{BookRepository, BookWrite};
use crate::repo::character_links_repo::CharacterLinkRepository;
use crate::repo::character_repo::CharacterRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::saga_repo::SagaRepository;
use crate::repo::store::GraphStore;
use crate::repo::universe_repo::UniverseRepository;
use crate::service::cascade::{CascadeOrchestrator, DeleteSummary};
use crate::slug;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub synopsis: String,
    #[serde(default)]
    pub universe_id: Option<UniverseId>,
    #[serde(default)]
    pub saga_id: Option<SagaId>,
    #[serde(default)]
    pub status: Option<WritingStatus>,
}

/// Partial update; `Some(None)` on a link detaches it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub status: Option<WritingStatus>,
    pub universe_id: Option<Option<UniverseId>>,
    pub saga_id: Option<Option<SagaId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub project: EntityLite,
    pub universe: Option<EntityLite>,
    pub saga: Option<EntityLite>,
    /// Characters attached at book level.
    pub characters: Vec<Character>,
    /// Characters from any level recorded as appearing in the book.
    pub appearing: Vec<EntityLite>,
}

/// Book service facade.
pub struct BookService<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> BookService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn create(&self, project_id: ProjectId, input: CreateBook) -> GraphResult<Book> {
        let title = require_title("title", &input.title)?;
        let synopsis = require_text("synopsis", &input.synopsis)?;
        self.project_lite(project_id)?;
        let universe_id = self.resolve_placement(project_id, input.universe_id, input.saga_id)?;

        let scope = BookScope::for_parents(project_id, universe_id, input.saga_id);
        let repo = self.store.books();
        if repo.title_taken(scope, &title, None)? {
            return Err(GraphError::duplicate(format!(
                "book `{title}` already exists in {scope}"
            )));
        }
        let slug = slug::resolve(&title, |candidate| repo.slug_taken(scope, candidate, None))?;

        let book = repo.create(
            project_id,
            &BookWrite {
                universe_id,
                saga_id: input.saga_id,
                title,
                slug,
                synopsis,
                status: input.status.unwrap_or_default(),
            },
        )?;
        info!(
            "event=book_create module=service status=ok id={} project_id={} scope={}",
            book.id, project_id, scope
        );
        Ok(book)
    }

    pub fn get(&self, id: BookId) -> GraphResult<Book> {
        self.store
            .books()
            .get_by_id(id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Book, id))
    }

    pub fn get_by_slug(&self, scope: BookScope, slug: &str) -> GraphResult<Book> {
        self.store
            .books()
            .get_by_slug(scope, slug)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Book, slug))
    }

    pub fn list_by_project(&self, project_id: ProjectId) -> GraphResult<Vec<Book>> {
        self.project_lite(project_id)?;
        Ok(self.store.books().list_by_project(project_id)?)
    }

    pub fn list_by_universe(&self, universe_id: UniverseId) -> GraphResult<Vec<Book>> {
        self.universe_lite(universe_id)?;
        Ok(self.store.books().list_by_universe(universe_id)?)
    }

    pub fn list_by_saga(&self, saga_id: SagaId) -> GraphResult<Vec<Book>> {
        self.saga_lite(saga_id)?;
        Ok(self.store.books().list_by_saga(saga_id)?)
    }

    pub fn get_all_data(&self, id: BookId) -> GraphResult<BookDetails> {
        let book = self.get(id)?;
        let universe = match book.universe_id {
            Some(universe_id) => Some(self.universe_lite(universe_id)?),
            None => None,
        };
        let saga = match book.saga_id {
            Some(saga_id) => Some(self.saga_lite(saga_id)?),
            None => None,
        };
        Ok(BookDetails {
            project: self.project_lite(book.project_id)?,
            universe,
            saga,
            characters: self
                .store
                .characters()
                .list_by_belonging(BelongingRef::Book(id))?,
            appearing: self.store.character_links().list_characters_in_book(id)?,
            book,
        })
    }

    pub fn update(&self, id: BookId, input: UpdateBook) -> GraphResult<Book> {
        let current = self.get(id)?;
        let repo = self.store.books();

        let title = match input.title {
            Some(title) => require_title("title", &title)?,
            None => current.title.clone(),
        };
        let synopsis = match input.synopsis {
            Some(synopsis) => require_text("synopsis", &synopsis)?,
            None => current.synopsis.clone(),
        };
        let saga_id = input.saga_id.unwrap_or(current.saga_id);
        // An explicit universe wins; a new saga without one lends its own.
        let requested_universe = match (input.universe_id, input.saga_id) {
            (Some(universe_id), _) => universe_id,
            (None, Some(Some(_))) => None,
            (None, _) => current.universe_id,
        };
        let universe_id = self.resolve_placement(current.project_id, requested_universe, saga_id)?;

        let scope = BookScope::for_parents(current.project_id, universe_id, saga_id);
        let scope_changed = scope != current.scope();
        if (title != current.title || scope_changed) && repo.title_taken(scope, &title, Some(id))?
        {
            return Err(GraphError::duplicate(format!(
                "book `{title}` already exists in {scope}"
            )));
        }
        let slug = if title != current.title
            || (scope_changed && repo.slug_taken(scope, &current.slug, Some(id))?)
        {
            slug::resolve(&title, |candidate| {
                repo.slug_taken(scope, candidate, Some(id))
            })?
        } else {
            current.slug.clone()
        };

        repo.update(
            id,
            &BookWrite {
                universe_id,
                saga_id,
                title,
                slug,
                synopsis,
                status: input.status.unwrap_or(current.status),
            },
        )?;
        info!("event=book_update module=service status=ok id={id} scope={scope}");
        self.get(id)
    }

    pub fn delete(&self, id: BookId) -> GraphResult<DeleteSummary> {
        CascadeOrchestrator::new(self.store).delete_book(id)
    }

    /// Validates the saga/universe links and returns the universe to store.
    fn resolve_placement(
        &self,
        project_id: ProjectId,
        universe_id: Option<UniverseId>,
        saga_id: Option<SagaId>,
    ) -> GraphResult<Option<UniverseId>> {
        if let Some(saga_id) = saga_id {
            let saga = self
                .store
                .sagas()
                .get_by_id(saga_id)?
                .ok_or_else(|| GraphError::not_found(EntityKind::Saga, saga_id))?;
            if saga.project_id != project_id {
                return Err(GraphError::invalid(format!(
                    "saga {saga_id} belongs to another project"
                )));
            }
            if universe_id.is_some() && universe_id != saga.universe_id {
                return Err(GraphError::invalid(format!(
                    "book universe must match saga {saga_id}"
                )));
            }
            return Ok(saga.universe_id);
        }

        if let Some(universe_id) = universe_id {
            let universe = self
                .store
                .universes()
                .get_by_id(universe_id)?
                .ok_or_else(|| GraphError::not_found(EntityKind::Universe, universe_id))?;
            if universe.project_id != project_id {
                return Err(GraphError::invalid(format!(
                    "universe {universe_id} belongs to another project"
                )));
            }
        }
        Ok(universe_id)
    }

    fn project_lite(&self, project_id: ProjectId) -> GraphResult<EntityLite> {
        self.store
            .projects()
            .get_lite(project_id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Project, project_id))
    }

    fn universe_lite(&self, universe_id: UniverseId) -> GraphResult<EntityLite> {
        self.store
            .universes()
            .get_lite(universe_id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Universe, universe_id))
    }

    fn saga_lite(&self, saga_id: SagaId) -> GraphResult<EntityLite> {
        self.store
            .sagas()
            .get_lite(saga_id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Saga, saga_id))
    }
}
