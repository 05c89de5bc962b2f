//! Cascading deletes over the content graph.
//!
//! # Responsibility
//! - Delete a structural node together with every row pointing into its
//!   subtree, children strictly before parents.
//! - Define the delete order in one place for every entity kind.
//!
//! # Invariants
//! - Every public delete runs inside one [`GraphStore::atomically`] unit; a
//!   failing step rolls back the steps already taken.
//! - A missing root is `NotFound`. Children enumerated inside the unit that
//!   report zero deleted rows are treated as already gone.
//! - Saga recursion is depth-first and refuses to revisit a node.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{BelongingRef, CharacterId};
use crate::model::graph::{BookId, ProjectId, Saga, SagaId, UniverseId};
use crate::repo::book_repo::BookRepository;
use crate::repo::character_links_repo::CharacterLinkRepository;
use crate::repo::character_repo::CharacterRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::saga_repo::SagaRepository;
use crate::repo::store::GraphStore;
use crate::repo::universe_repo::UniverseRepository;
use crate::repo::RepoResult;
use log::{error, info};
use serde::Serialize;
use std::collections::HashSet;

/// Row counts removed (or detached) by one cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub projects: usize,
    pub universes: usize,
    pub sagas: usize,
    pub books: usize,
    pub characters: usize,
    pub appearances: usize,
    pub relationships: usize,
    pub timeline_events: usize,
    /// Timeline events that lost their `book_id` but were kept.
    pub timeline_events_detached: usize,
    /// Membership, like and save rows.
    pub social_rows: usize,
}

/// Mutable state of one running cascade.
#[derive(Default)]
struct CascadeRun {
    summary: DeleteSummary,
    visited_sagas: HashSet<SagaId>,
}

/// Orchestrates child-before-parent deletes.
pub struct CascadeOrchestrator<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> CascadeOrchestrator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Deletes a project with its books, sagas, universes, characters and
    /// social rows.
    pub fn delete_project(&self, id: ProjectId) -> GraphResult<DeleteSummary> {
        if self.store.projects().get_lite(id)?.is_none() {
            return Err(GraphError::not_found(EntityKind::Project, id));
        }
        self.run("delete_project", EntityKind::Project, id, |run| {
            self.remove_project(id, run)
        })
    }

    /// Deletes a universe with its sagas, books and characters.
    pub fn delete_universe(&self, id: UniverseId) -> GraphResult<DeleteSummary> {
        if self.store.universes().get_lite(id)?.is_none() {
            return Err(GraphError::not_found(EntityKind::Universe, id));
        }
        self.run("delete_universe", EntityKind::Universe, id, |run| {
            self.remove_universe(id, run)
        })
    }

    /// Deletes a saga subtree: child sagas depth-first, then books, then
    /// characters, then the saga row.
    pub fn delete_saga(&self, id: SagaId) -> GraphResult<DeleteSummary> {
        if self.store.sagas().get_lite(id)?.is_none() {
            return Err(GraphError::not_found(EntityKind::Saga, id));
        }
        self.run("delete_saga", EntityKind::Saga, id, |run| {
            self.remove_saga(id, run)
        })
    }

    /// Deletes a book, its characters and every appearance pointing at it.
    pub fn delete_book(&self, id: BookId) -> GraphResult<DeleteSummary> {
        if self.store.books().get_lite(id)?.is_none() {
            return Err(GraphError::not_found(EntityKind::Book, id));
        }
        self.run("delete_book", EntityKind::Book, id, |run| {
            self.remove_book(id, run)
        })
    }

    /// Deletes a character with its appearances, timeline and relationships
    /// in both directions.
    pub fn delete_character(&self, id: CharacterId) -> GraphResult<DeleteSummary> {
        if self.store.characters().get_lite(id)?.is_none() {
            return Err(GraphError::not_found(EntityKind::Character, id));
        }
        self.run("delete_character", EntityKind::Character, id, |run| {
            Ok(self.remove_character(id, run)?)
        })
    }

    fn run(
        &self,
        event: &'static str,
        entity: EntityKind,
        id: i64,
        work: impl FnOnce(&mut CascadeRun) -> GraphResult<()>,
    ) -> GraphResult<DeleteSummary> {
        info!("event={event} module=cascade status=start entity={entity} id={id}");
        let result = self.store.atomically(event, || -> GraphResult<DeleteSummary> {
            let mut run = CascadeRun::default();
            work(&mut run)?;
            Ok(run.summary)
        });
        match &result {
            Ok(summary) => info!(
                "event={event} module=cascade status=ok entity={entity} id={id} sagas={} books={} characters={}",
                summary.sagas, summary.books, summary.characters
            ),
            Err(err) => error!(
                "event={event} module=cascade status=error entity={entity} id={id} code={} error={err}",
                err.code()
            ),
        }
        result
    }

    fn remove_project(&self, id: ProjectId, run: &mut CascadeRun) -> GraphResult<()> {
        for book in self.store.books().list_by_project(id)? {
            self.remove_book(book.id, run)?;
        }
        let sagas = self.store.sagas().list_by_project(id)?;
        self.remove_saga_forest(sagas, run)?;
        for universe in self.store.universes().list_by_project(id)? {
            self.remove_universe(universe.id, run)?;
        }
        self.clear_characters(BelongingRef::Project(id), run)?;
        run.summary.social_rows += self.store.projects().delete_social_rows(id)?;
        run.summary.projects += self.store.projects().delete(id)?;
        Ok(())
    }

    fn remove_universe(&self, id: UniverseId, run: &mut CascadeRun) -> GraphResult<()> {
        let sagas = self.store.sagas().list_by_universe(id)?;
        self.remove_saga_forest(sagas, run)?;
        for book in self.store.books().list_by_universe(id)? {
            self.remove_book(book.id, run)?;
        }
        self.clear_characters(BelongingRef::Universe(id), run)?;
        run.summary.universes += self.store.universes().delete(id)?;
        Ok(())
    }

    /// Removes a set of sagas, roots first; descendants reached through an
    /// earlier root are skipped.
    fn remove_saga_forest(&self, mut sagas: Vec<Saga>, run: &mut CascadeRun) -> GraphResult<()> {
        sagas.sort_by_key(|saga| (saga.parent_saga_id.is_some(), saga.id));
        for saga in sagas {
            if run.visited_sagas.contains(&saga.id) {
                continue;
            }
            self.remove_saga(saga.id, run)?;
        }
        Ok(())
    }

    fn remove_saga(&self, id: SagaId, run: &mut CascadeRun) -> GraphResult<()> {
        if !run.visited_sagas.insert(id) {
            return Err(GraphError::invalid(format!(
                "saga {id} reached twice while deleting; saga tree contains a cycle"
            )));
        }
        for child in self.store.sagas().list_children(id)? {
            self.remove_saga(child.id, run)?;
        }
        for book in self.store.books().list_by_saga(id)? {
            self.remove_book(book.id, run)?;
        }
        self.clear_characters(BelongingRef::Saga(id), run)?;
        run.summary.sagas += self.store.sagas().delete(id)?;
        Ok(())
    }

    fn remove_book(&self, id: BookId, run: &mut CascadeRun) -> GraphResult<()> {
        let links = self.store.character_links();
        run.summary.appearances += links.delete_appearances_for_book(id)?;
        run.summary.timeline_events_detached += links.detach_timeline_book(id)?;
        self.clear_characters(BelongingRef::Book(id), run)?;
        run.summary.books += self.store.books().delete(id)?;
        Ok(())
    }

    fn clear_characters(&self, belonging: BelongingRef, run: &mut CascadeRun) -> GraphResult<()> {
        for character in self.store.characters().list_by_belonging(belonging)? {
            self.remove_character(character.id, run)?;
        }
        Ok(())
    }

    fn remove_character(&self, id: CharacterId, run: &mut CascadeRun) -> RepoResult<()> {
        let links = self.store.character_links();
        run.summary.appearances += links.delete_appearances_for_character(id)?;
        run.summary.timeline_events += links.delete_timeline_for_character(id)?;
        run.summary.relationships += links.delete_relationships_for_character(id)?;
        run.summary.characters += self.store.characters().delete(id)?;
        Ok(())
    }
}
