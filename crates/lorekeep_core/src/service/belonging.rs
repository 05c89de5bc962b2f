//! Polymorphic belonging resolution for characters.
//!
//! # Responsibility
//! - Map a [`BelongingRef`] to the lite view of the entity it points at.
//! - Serve both read hydration and pre-write existence validation.
//!
//! # Invariants
//! - Dispatch is an exhaustive match over the four levels; there is no
//!   fallback branch.
//! - A missing parent is always `NotFound`, never a silent `None`.

use crate::error::{EntityKind, GraphError, GraphResult};
use crate::model::character::{BelongingParent, BelongingRef};
use crate::model::graph::{BookId, EntityLite, ProjectId, SagaId, UniverseId};
use crate::repo::book_repo::BookRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::saga_repo::SagaRepository;
use crate::repo::store::GraphStore;
use crate::repo::universe_repo::UniverseRepository;
use crate::repo::RepoResult;

/// Lite lookups for every entity a character can belong to.
pub trait ParentLookup {
    fn project_lite(&self, id: ProjectId) -> RepoResult<Option<EntityLite>>;
    fn universe_lite(&self, id: UniverseId) -> RepoResult<Option<EntityLite>>;
    fn saga_lite(&self, id: SagaId) -> RepoResult<Option<EntityLite>>;
    fn book_lite(&self, id: BookId) -> RepoResult<Option<EntityLite>>;
}

impl<S: GraphStore> ParentLookup for S {
    fn project_lite(&self, id: ProjectId) -> RepoResult<Option<EntityLite>> {
        self.projects().get_lite(id)
    }

    fn universe_lite(&self, id: UniverseId) -> RepoResult<Option<EntityLite>> {
        self.universes().get_lite(id)
    }

    fn saga_lite(&self, id: SagaId) -> RepoResult<Option<EntityLite>> {
        self.sagas().get_lite(id)
    }

    fn book_lite(&self, id: BookId) -> RepoResult<Option<EntityLite>> {
        self.books().get_lite(id)
    }
}

/// Resolver facade over any [`ParentLookup`].
pub struct BelongingResolver<'s, L: ParentLookup> {
    lookup: &'s L,
}

impl<'s, L: ParentLookup> BelongingResolver<'s, L> {
    pub fn new(lookup: &'s L) -> Self {
        Self { lookup }
    }

    /// Resolves the parent entity of `belonging`.
    ///
    /// # Errors
    /// - `NotFound` naming the parent kind when the row does not exist.
    pub fn resolve(&self, belonging: BelongingRef) -> GraphResult<BelongingParent> {
        let (entity, found) = match belonging {
            BelongingRef::Project(id) => (EntityKind::Project, self.lookup.project_lite(id)?),
            BelongingRef::Universe(id) => (EntityKind::Universe, self.lookup.universe_lite(id)?),
            BelongingRef::Saga(id) => (EntityKind::Saga, self.lookup.saga_lite(id)?),
            BelongingRef::Book(id) => (EntityKind::Book, self.lookup.book_lite(id)?),
        };
        let lite = found.ok_or_else(|| GraphError::not_found(entity, belonging.id()))?;
        Ok(BelongingParent {
            level: belonging.level(),
            lite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BelongingResolver, ParentLookup};
    use crate::error::{EntityKind, GraphError};
    use crate::model::character::{BelongingLevel, BelongingRef};
    use crate::model::graph::EntityLite;
    use crate::repo::RepoResult;

    /// Every level knows exactly one row: id 1.
    struct FakeLookup;

    fn lite(id: i64, name: &str) -> Option<EntityLite> {
        (id == 1).then(|| EntityLite {
            id,
            name: name.to_string(),
            slug: name.to_lowercase(),
        })
    }

    impl ParentLookup for FakeLookup {
        fn project_lite(&self, id: i64) -> RepoResult<Option<EntityLite>> {
            Ok(lite(id, "Project"))
        }

        fn universe_lite(&self, id: i64) -> RepoResult<Option<EntityLite>> {
            Ok(lite(id, "Universe"))
        }

        fn saga_lite(&self, id: i64) -> RepoResult<Option<EntityLite>> {
            Ok(lite(id, "Saga"))
        }

        fn book_lite(&self, id: i64) -> RepoResult<Option<EntityLite>> {
            Ok(lite(id, "Book"))
        }
    }

    #[test]
    fn resolves_each_level_to_its_own_lookup() {
        let resolver = BelongingResolver::new(&FakeLookup);
        let cases = [
            (BelongingRef::Project(1), BelongingLevel::Project, "Project"),
            (BelongingRef::Universe(1), BelongingLevel::Universe, "Universe"),
            (BelongingRef::Saga(1), BelongingLevel::Saga, "Saga"),
            (BelongingRef::Book(1), BelongingLevel::Book, "Book"),
        ];
        for (belonging, level, name) in cases {
            let parent = resolver.resolve(belonging).unwrap();
            assert_eq!(parent.level, level);
            assert_eq!(parent.lite.name, name);
        }
    }

    #[test]
    fn missing_parent_is_not_found_with_parent_kind() {
        let resolver = BelongingResolver::new(&FakeLookup);
        let err = resolver.resolve(BelongingRef::Book(9999)).unwrap_err();
        match err {
            GraphError::NotFound { entity, key } => {
                assert_eq!(entity, EntityKind::Book);
                assert_eq!(key, "9999");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
