//! Saga tree lifecycle use-cases.
//!
//! # Responsibility
//! - Validate saga parents (project, universe, parent saga) before writes.
//! - Keep the saga hierarchy a strict tree.
//! - Enforce name/slug uniqueness in the active [`SagaScope`].
//!
//! # Invariants
//! - A child saga shares its parent's project and universe.
//! - Re-parenting never makes a saga its own ancestor.
//! - A saga with child sagas or books cannot switch universe.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{BelongingRef, Character};
use crate::model::graph::{
    Book, EntityLite, ProjectId, Saga, SagaId, SagaScope, UniverseId, WritingStatus,
};
use crate::model::validation::{require_text, require_title};
use crate::repo::book_repo::BookRepository;
use crate::repo::character_repo::CharacterRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::saga_repo::{SagaRepository, SagaWrite};
use crate::repo::store::GraphStore;
use crate::repo::universe_repo::UniverseRepository;
use crate::service::cascade::{CascadeOrchestrator, DeleteSummary};
use crate::slug;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSaga {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub universe_id: Option<UniverseId>,
    #[serde(default)]
    pub parent_saga_id: Option<SagaId>,
    #[serde(default)]
    pub status: Option<WritingStatus>,
}

/// Partial update.
///
/// For `universe_id` and `parent_saga_id`, the outer `None` keeps the stored
/// link and `Some(None)` detaches it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSaga {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<WritingStatus>,
    pub universe_id: Option<Option<UniverseId>>,
    pub parent_saga_id: Option<Option<SagaId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SagaDetails {
    #[serde(flatten)]
    pub saga: Saga,
    pub project: EntityLite,
    pub universe: Option<EntityLite>,
    pub parent: Option<EntityLite>,
    pub children: Vec<Saga>,
    pub books: Vec<Book>,
    pub characters: Vec<Character>,
}

/// Saga service facade.
pub struct SagaService<'s, S: GraphStore> {
    store: &'s S,
}

impl<'s, S: GraphStore> SagaService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Creates a saga in `project_id`.
    ///
    /// With a parent saga, the universe is inherited from the parent; an
    /// explicit different `universe_id` is rejected.
    pub fn create(&self, project_id: ProjectId, input: CreateSaga) -> GraphResult<Saga> {
        let name = require_title("name", &input.name)?;
        let description = require_text("description", &input.description)?;
        self.project_lite(project_id)?;
        let universe_id =
            self.resolve_placement(project_id, input.universe_id, input.parent_saga_id)?;

        let scope = SagaScope::for_parents(project_id, universe_id);
        let repo = self.store.sagas();
        if repo.name_taken(scope, &name, None)? {
            return Err(GraphError::duplicate(format!(
                "saga `{name}` already exists in {scope}"
            )));
        }
        let slug = slug::resolve(&name, |candidate| repo.slug_taken(scope, candidate, None))?;

        let saga = repo.create(
            project_id,
            &SagaWrite {
                universe_id,
                parent_saga_id: input.parent_saga_id,
                name,
                slug,
                description,
                status: input.status.unwrap_or_default(),
            },
        )?;
        info!(
            "event=saga_create module=service status=ok id={} project_id={} scope={}",
            saga.id, project_id, scope
        );
        Ok(saga)
    }

    pub fn get(&self, id: SagaId) -> GraphResult<Saga> {
        self.store
            .sagas()
            .get_by_id(id)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Saga, id))
    }

    pub fn get_by_slug(&self, scope: SagaScope, slug: &str) -> GraphResult<Saga> {
        self.store
            .sagas()
            .get_by_slug(scope, slug)?
            .ok_or_else(|| GraphError::not_found(EntityKind::Saga, slug))
    }

    pub fn list_by_project(&self, project_id: ProjectId) -> GraphResult<Vec<Saga>> {
        self.project_lite(project_id)?;
        Ok(self.store.sagas().list_by_project(project_id)?)
    }

    pub fn list_by_universe(&self, universe_id: UniverseId) -> GraphResult<Vec<Saga>> {
        self.universe_lite(universe_id)?;
        Ok(self.store.sagas().list_by_universe(universe_id)?)
    }

    pub fn list_children(&self, id: SagaId) -> GraphResult<Vec<Saga>> {
        self.get(id)?;
        Ok(self.store.sagas().list_children(id)?)
    }

    pub fn get_all_data(&self, id: SagaId) -> GraphResult<SagaDetails> {
        let saga = self.get(id)?;
        let universe = match saga.universe_id {
            Some(universe_id) => Some(self.universe_lite(universe_id)?),
            None => None,
        };
        let parent = match saga.parent_saga_id {
            Some(parent_id) => Some(self.saga_lite(parent_id)?),
            None => None,
        };
        Ok(SagaDetails {
            project: self.project_lite(saga.project_id)?,
            universe,
            parent,
            children: self.store.sagas().list_children(id)?,
            books: self.store.books().list_by_saga(id)?,
            characters: self
                .store
                .characters()
                .list_by_belonging(BelongingRef::Saga(id))?,
            saga,
        })
    }

    /// Applies a partial update, including re-parenting.
    ///
    /// # Errors
    /// - `InvalidData` when the new parent is the saga itself or one of its
    ///   descendants, or when the move changes universe for a saga that
    ///   still has child sagas or books.
    /// - `DuplicateData` when the name is taken in the resulting scope.
    pub fn update(&self, id: SagaId, input: UpdateSaga) -> GraphResult<Saga> {
        let current = self.get(id)?;
        let repo = self.store.sagas();

        let name = match input.name {
            Some(name) => require_title("name", &name)?,
            None => current.name.clone(),
        };
        let description = match input.description {
            Some(description) => require_text("description", &description)?,
            None => current.description.clone(),
        };
        let parent_saga_id = input.parent_saga_id.unwrap_or(current.parent_saga_id);
        if let Some(parent_id) = parent_saga_id {
            let cycle = would_create_cycle(id, parent_id, |saga_id| {
                Ok(repo.get_by_id(saga_id)?.and_then(|saga| saga.parent_saga_id))
            })?;
            if cycle {
                return Err(GraphError::invalid(format!(
                    "saga {id} cannot be placed under saga {parent_id}: it would become its own ancestor"
                )));
            }
        }
        // An explicit universe wins; with a parent and none given, inherit.
        let requested_universe = match input.universe_id {
            Some(universe_id) => universe_id,
            None if parent_saga_id.is_some() => None,
            None => current.universe_id,
        };
        let universe_id =
            self.resolve_placement(current.project_id, requested_universe, parent_saga_id)?;

        if universe_id != current.universe_id && self.has_dependents(id)? {
            return Err(GraphError::invalid(format!(
                "saga {id} has child sagas or books and cannot change universe"
            )));
        }

        let scope = SagaScope::for_parents(current.project_id, universe_id);
        let scope_changed = scope != current.scope();
        if (name != current.name || scope_changed) && repo.name_taken(scope, &name, Some(id))? {
            return Err(GraphError::duplicate(format!(
                "saga `{name}` already exists in {scope}"
            )));
        }
        let slug = if name != current.name
            || (scope_changed && repo.slug_taken(scope, &current.slug, Some(id))?)
        {
            slug::resolve(&name, |candidate| {
                repo.slug_taken(scope, candidate, Some(id))
            })?
        } else {
            current.slug.clone()
        };

        repo.update(
            id,
            &SagaWrite {
                universe_id,
                parent_saga_id,
                name,
                slug,
                description,
                status: input.status.unwrap_or(current.status),
            },
        )?;
        info!("event=saga_update module=service status=ok id={id} scope={scope}");
        self.get(id)
    }

    /// Deletes the saga subtree; see [`CascadeOrchestrator::delete_saga`].
    pub fn delete(&self, id: SagaId) -> GraphResult<DeleteSummary> {
        CascadeOrchestrator::new(self.store).delete_saga(id)
    }

    /// Validates parents and returns the universe the saga must carry.
    fn resolve_placement(
        &self,
        project_id: ProjectId,
        universe_id: Option<UniverseId>,
        parent_saga_id: Option<SagaId>,
    ) -> GraphResult<Option<UniverseId>> {
        if let Some(parent_id) = parent_saga_id {
            let parent = self.get(parent_id)?;
            if parent.project_id != project_id {
                return Err(GraphError::invalid(format!(
                    "parent saga {parent_id} belongs to another project"
                )));
            }
            if universe_id.is_some() && universe_id != parent.universe_id {
                return Err(GraphError::invalid(format!(
                    "saga universe must match parent saga {parent_id}"
                )));
            }
            return Ok(parent.universe_id);
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

    fn has_dependents(&self, id: SagaId) -> GraphResult<bool> {
        Ok(!self.store.sagas().list_children(id)?.is_empty()
            || !self.store.books().list_by_saga(id)?.is_empty())
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

/// Returns whether placing `saga_id` under `proposed_parent` closes a loop.
///
/// Walks ancestors of `proposed_parent` through `parent_of` until a root.
/// An already-corrupt loop above the proposed parent also reports `true`.
pub(crate) fn would_create_cycle(
    saga_id: SagaId,
    proposed_parent: SagaId,
    mut parent_of: impl FnMut(SagaId) -> GraphResult<Option<SagaId>>,
) -> GraphResult<bool> {
    let mut visited = HashSet::new();
    let mut cursor = Some(proposed_parent);
    while let Some(current) = cursor {
        if current == saga_id || !visited.insert(current) {
            return Ok(true);
        }
        cursor = parent_of(current)?;
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::would_create_cycle;
    use std::collections::HashMap;

    /// 1 -> 2 -> 3 (3's parent is 2, 2's parent is 1), 4 is a lone root.
    fn parents() -> HashMap<i64, Option<i64>> {
        HashMap::from([(1, None), (2, Some(1)), (3, Some(2)), (4, None)])
    }

    fn check(saga_id: i64, proposed_parent: i64) -> bool {
        let parents = parents();
        would_create_cycle(saga_id, proposed_parent, |id| {
            Ok(parents.get(&id).copied().flatten())
        })
        .unwrap()
    }

    #[test]
    fn rejects_self_and_descendants_as_parent() {
        assert!(check(1, 1));
        assert!(check(1, 2));
        assert!(check(1, 3));
        assert!(check(2, 3));
    }

    #[test]
    fn accepts_unrelated_or_ancestor_parents() {
        assert!(!check(3, 1));
        assert!(!check(1, 4));
        assert!(!check(4, 3));
    }

    #[test]
    fn reports_preexisting_loop_above_parent() {
        let looped = HashMap::from([(5, Some(6)), (6, Some(5))]);
        let cycle = would_create_cycle(9, 5, |id| Ok(looped.get(&id).copied().flatten())).unwrap();
        assert!(cycle);
    }
}
