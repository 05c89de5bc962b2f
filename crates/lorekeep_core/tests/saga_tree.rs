use lorekeep_core::db::open_db_in_memory;
use lorekeep_core::{
    BookService, CreateBook, CreateProject, CreateSaga, CreateUniverse, GraphError, Project,
    ProjectService, Saga, SagaScope, SagaService, SqliteStore, Universe, UniverseService,
    UpdateSaga, WritingStatus,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn project(store: &SqliteStore<'_>, name: &str) -> Project {
    ProjectService::new(store)
        .create(
            1,
            CreateProject {
                name: name.to_string(),
                description: "A test project".to_string(),
            },
        )
        .unwrap()
}

fn universe(store: &SqliteStore<'_>, project_id: i64, name: &str) -> Universe {
    UniverseService::new(store)
        .create(
            project_id,
            CreateUniverse {
                name: name.to_string(),
                description: None,
            },
        )
        .unwrap()
}

fn saga_input(name: &str) -> CreateSaga {
    CreateSaga {
        name: name.to_string(),
        description: "A saga".to_string(),
        universe_id: None,
        parent_saga_id: None,
        status: None,
    }
}

fn child_of(store: &SqliteStore<'_>, project_id: i64, parent: &Saga, name: &str) -> Saga {
    SagaService::new(store)
        .create(
            project_id,
            CreateSaga {
                parent_saga_id: Some(parent.id),
                ..saga_input(name)
            },
        )
        .unwrap()
}

#[test]
fn saga_name_is_unique_per_universe_only() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let north = universe(&store, project.id, "North");
    let south = universe(&store, project.id, "South");
    let sagas = SagaService::new(&store);

    let first = sagas
        .create(
            project.id,
            CreateSaga {
                universe_id: Some(north.id),
                ..saga_input("Saga A")
            },
        )
        .unwrap();
    assert_eq!(first.slug, "saga-a");
    assert_eq!(first.status, WritingStatus::Draft);

    let err = sagas
        .create(
            project.id,
            CreateSaga {
                universe_id: Some(north.id),
                ..saga_input("saga a")
            },
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateData(_)), "got {err}");
    assert_eq!(err.status(), 409);

    let other = sagas
        .create(
            project.id,
            CreateSaga {
                universe_id: Some(south.id),
                ..saga_input("Saga A")
            },
        )
        .unwrap();
    assert_eq!(other.slug, "saga-a");

    let found = sagas
        .get_by_slug(SagaScope::Universe(south.id), "saga-a")
        .unwrap();
    assert_eq!(found.id, other.id);
}

#[test]
fn distinct_names_with_same_base_get_numbered_slugs() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let sagas = SagaService::new(&store);

    let slugs: Vec<String> = ["Saga A", "Saga-A", "Saga  A!", "Sága A"]
        .into_iter()
        .map(|name| sagas.create(project.id, saga_input(name)).unwrap().slug)
        .collect();

    assert_eq!(slugs, vec!["saga-a", "saga-a-2", "saga-a-3", "saga-a-4"]);
}

#[test]
fn child_saga_inherits_parent_universe_and_rejects_mismatch() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let north = universe(&store, project.id, "North");
    let south = universe(&store, project.id, "South");
    let sagas = SagaService::new(&store);

    let root = sagas
        .create(
            project.id,
            CreateSaga {
                universe_id: Some(north.id),
                ..saga_input("Root")
            },
        )
        .unwrap();
    let child = child_of(&store, project.id, &root, "Child");
    assert_eq!(child.universe_id, Some(north.id));
    assert_eq!(child.parent_saga_id, Some(root.id));

    let err = sagas
        .create(
            project.id,
            CreateSaga {
                universe_id: Some(south.id),
                parent_saga_id: Some(root.id),
                ..saga_input("Stray")
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");

    let err = sagas
        .create(
            project.id,
            CreateSaga {
                parent_saga_id: Some(9999),
                ..saga_input("Orphan")
            },
        )
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn saga_parent_must_share_project() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let atlas = project(&store, "Atlas");
    let borealis = project(&store, "Borealis");
    let sagas = SagaService::new(&store);

    let foreign_root = sagas.create(borealis.id, saga_input("Root")).unwrap();
    let err = sagas
        .create(
            atlas.id,
            CreateSaga {
                parent_saga_id: Some(foreign_root.id),
                ..saga_input("Child")
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");
}

#[test]
fn reparenting_under_self_or_descendant_is_rejected() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let sagas = SagaService::new(&store);

    let root = sagas.create(project.id, saga_input("Root")).unwrap();
    let child = child_of(&store, project.id, &root, "Child");
    let grandchild = child_of(&store, project.id, &child, "Grandchild");

    for parent in [root.id, child.id, grandchild.id] {
        let err = sagas
            .update(
                root.id,
                UpdateSaga {
                    parent_saga_id: Some(Some(parent)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_DATA", "parent {parent}");
    }

    let moved = sagas
        .update(
            grandchild.id,
            UpdateSaga {
                parent_saga_id: Some(Some(root.id)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(moved.parent_saga_id, Some(root.id));

    let detached = sagas
        .update(
            moved.id,
            UpdateSaga {
                parent_saga_id: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(detached.parent_saga_id, None);
    assert_eq!(sagas.list_children(root.id).unwrap().len(), 1);
}

#[test]
fn saga_with_books_cannot_change_universe() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let north = universe(&store, project.id, "North");
    let sagas = SagaService::new(&store);

    let saga = sagas.create(project.id, saga_input("Root")).unwrap();
    BookService::new(&store)
        .create(
            project.id,
            CreateBook {
                title: "First Book".to_string(),
                synopsis: "Synopsis".to_string(),
                universe_id: None,
                saga_id: Some(saga.id),
                status: None,
            },
        )
        .unwrap();

    let err = sagas
        .update(
            saga.id,
            UpdateSaga {
                universe_id: Some(Some(north.id)),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");

    let lonely = sagas.create(project.id, saga_input("Lonely")).unwrap();
    let moved = sagas
        .update(
            lonely.id,
            UpdateSaga {
                universe_id: Some(Some(north.id)),
                status: Some(WritingStatus::InProgress),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(moved.universe_id, Some(north.id));
    assert_eq!(moved.slug, "lonely");
    assert_eq!(moved.status, WritingStatus::InProgress);
}

#[test]
fn saga_details_hydrate_parents_and_children() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let north = universe(&store, project.id, "North");
    let sagas = SagaService::new(&store);

    let root = sagas
        .create(
            project.id,
            CreateSaga {
                universe_id: Some(north.id),
                ..saga_input("Root")
            },
        )
        .unwrap();
    let child = child_of(&store, project.id, &root, "Child");

    let details = sagas.get_all_data(child.id).unwrap();
    assert_eq!(details.project.name, "Atlas");
    assert_eq!(details.universe.map(|u| u.slug).as_deref(), Some("north"));
    assert_eq!(details.parent.map(|p| p.id), Some(root.id));
    assert!(details.children.is_empty());

    let root_details = sagas.get_all_data(root.id).unwrap();
    assert_eq!(root_details.children.len(), 1);
    assert_eq!(root_details.children[0].id, child.id);
}

#[test]
fn short_or_blank_input_is_invalid() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store, "Atlas");
    let sagas = SagaService::new(&store);

    let err = sagas.create(project.id, saga_input(" A ")).unwrap_err();
    assert_eq!(err.status(), 400);

    let err = sagas
        .create(
            project.id,
            CreateSaga {
                description: "  ".to_string(),
                ..saga_input("Valid")
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");

    let err = sagas.create(project.id, saga_input("!!")).unwrap_err();
    assert_eq!(err.code(), "INVALID_DATA");
}
