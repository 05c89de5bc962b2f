use lorekeep_core::db::open_db_in_memory;
use lorekeep_core::{
    BelongingRef, Book, BookService, CascadeOrchestrator, CharacterLinksService,
    CharacterService, CreateBook, CreateCharacter, CreateProject, CreateSaga, CreateUniverse,
    NewTimelineEvent, Project, ProjectService, Saga, SagaService, SqliteStore, UniverseService,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn project(store: &SqliteStore<'_>) -> Project {
    ProjectService::new(store)
        .create(
            1,
            CreateProject {
                name: "Atlas".to_string(),
                description: "Cascade fixture".to_string(),
            },
        )
        .unwrap()
}

fn saga(store: &SqliteStore<'_>, project_id: i64, parent: Option<&Saga>, name: &str) -> Saga {
    SagaService::new(store)
        .create(
            project_id,
            CreateSaga {
                name: name.to_string(),
                description: "Saga".to_string(),
                universe_id: None,
                parent_saga_id: parent.map(|saga| saga.id),
                status: None,
            },
        )
        .unwrap()
}

fn book_in(store: &SqliteStore<'_>, project_id: i64, saga: Option<&Saga>, title: &str) -> Book {
    BookService::new(store)
        .create(
            project_id,
            CreateBook {
                title: title.to_string(),
                synopsis: "Synopsis".to_string(),
                universe_id: None,
                saga_id: saga.map(|saga| saga.id),
                status: None,
            },
        )
        .unwrap()
}

fn character(store: &SqliteStore<'_>, belonging: BelongingRef, name: &str) -> i64 {
    CharacterService::new(store)
        .create(CreateCharacter::new(belonging, name))
        .unwrap()
        .id
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn deleting_saga_removes_descendants_books_and_their_links() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store);
    let root = saga(&store, project.id, None, "S1");
    let child = saga(&store, project.id, Some(&root), "S2");
    let book = book_in(&store, project.id, Some(&child), "B1");
    let survivor = book_in(&store, project.id, None, "Standalone");

    let at_saga = character(&store, BelongingRef::Saga(child.id), "Saga Hero");
    let at_book = character(&store, BelongingRef::Book(book.id), "Book Hero");
    let at_project = character(&store, BelongingRef::Project(project.id), "Narrator");
    let links = CharacterLinksService::new(&store);
    links
        .add_appearances(at_project, &[book.id, survivor.id])
        .unwrap();
    links
        .add_relationship(at_project, at_book, "mentor", None)
        .unwrap();
    links
        .add_relationship(at_saga, at_project, "rival", None)
        .unwrap();
    links
        .set_timeline(
            at_project,
            vec![
                NewTimelineEvent {
                    book_id: Some(book.id),
                    ..NewTimelineEvent::new(1, "Arrival")
                },
                NewTimelineEvent::new(2, "Departure"),
            ],
        )
        .unwrap();

    let summary = SagaService::new(&store).delete(root.id).unwrap();

    assert_eq!(summary.sagas, 2);
    assert_eq!(summary.books, 1);
    assert_eq!(summary.characters, 2);
    assert_eq!(summary.appearances, 1);
    assert_eq!(summary.relationships, 2);
    assert_eq!(summary.timeline_events_detached, 1);

    assert_eq!(count(&conn, "sagas"), 0);
    assert_eq!(count(&conn, "books"), 1);
    assert_eq!(count(&conn, "characters"), 1);
    assert_eq!(count(&conn, "character_relationships"), 0);

    let appearances = links.list_appearances(at_project).unwrap();
    assert_eq!(appearances.len(), 1);
    assert_eq!(appearances[0].id, survivor.id);

    let timeline = links.get_timeline(at_project).unwrap();
    assert_eq!(timeline.len(), 2);
    assert!(timeline.iter().all(|event| event.book_id.is_none()));

    let err = SagaService::new(&store).get(child.id).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn deleting_deep_saga_tree_leaves_nothing_behind() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store);
    let root = saga(&store, project.id, None, "Root");
    let left = saga(&store, project.id, Some(&root), "Left");
    let right = saga(&store, project.id, Some(&root), "Right");
    let deep = saga(&store, project.id, Some(&left), "Deep");
    for (saga, title) in [(&root, "R"), (&left, "L"), (&right, "Rt"), (&deep, "D")] {
        let book = book_in(&store, project.id, Some(saga), &format!("{title} Book"));
        character(&store, BelongingRef::Book(book.id), &format!("{title} Hero"));
    }

    let summary = CascadeOrchestrator::new(&store).delete_saga(root.id).unwrap();

    assert_eq!(summary.sagas, 4);
    assert_eq!(summary.books, 4);
    assert_eq!(summary.characters, 4);
    for table in ["sagas", "books", "characters", "character_appearances"] {
        assert_eq!(count(&conn, table), 0, "table {table}");
    }
    assert_eq!(count(&conn, "projects"), 1);
}

#[test]
fn deleting_universe_removes_its_subtree_only() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store);
    let universes = UniverseService::new(&store);
    let north = universes
        .create(
            project.id,
            CreateUniverse {
                name: "North".to_string(),
                description: None,
            },
        )
        .unwrap();
    let south = universes
        .create(
            project.id,
            CreateUniverse {
                name: "South".to_string(),
                description: None,
            },
        )
        .unwrap();
    let sagas = SagaService::new(&store);
    let frost = sagas
        .create(
            project.id,
            CreateSaga {
                name: "Frost".to_string(),
                description: "Saga".to_string(),
                universe_id: Some(north.id),
                parent_saga_id: None,
                status: None,
            },
        )
        .unwrap();
    book_in(&store, project.id, Some(&frost), "Ice");
    BookService::new(&store)
        .create(
            project.id,
            CreateBook {
                title: "Sun".to_string(),
                synopsis: "Synopsis".to_string(),
                universe_id: Some(south.id),
                saga_id: None,
                status: None,
            },
        )
        .unwrap();
    character(&store, BelongingRef::Universe(north.id), "Yeti");
    character(&store, BelongingRef::Universe(south.id), "Salamander");

    let summary = universes.delete(north.id).unwrap();

    assert_eq!(summary.universes, 1);
    assert_eq!(summary.sagas, 1);
    assert_eq!(summary.books, 1);
    assert_eq!(summary.characters, 1);
    assert_eq!(count(&conn, "universes"), 1);
    assert_eq!(count(&conn, "books"), 1);
    assert_eq!(count(&conn, "characters"), 1);
    assert!(universes.get(north.id).unwrap_err().is_not_found());
}

#[test]
fn deleting_project_clears_every_table() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store);
    let universe = UniverseService::new(&store)
        .create(
            project.id,
            CreateUniverse {
                name: "North".to_string(),
                description: None,
            },
        )
        .unwrap();
    let root = saga(&store, project.id, None, "Root");
    saga(&store, project.id, Some(&root), "Child");
    let book = book_in(&store, project.id, None, "Loose");
    let hero = character(&store, BelongingRef::Project(project.id), "Hero");
    let sidekick = character(&store, BelongingRef::Universe(universe.id), "Sidekick");
    let links = CharacterLinksService::new(&store);
    links.add_appearances(hero, &[book.id]).unwrap();
    links.add_relationship(hero, sidekick, "ally", None).unwrap();
    links
        .set_timeline(hero, vec![NewTimelineEvent::new(1, "Start")])
        .unwrap();
    conn.execute_batch(&format!(
        "INSERT INTO project_members (project_id, user_id) VALUES ({id}, 2);
         INSERT INTO project_likes (project_id, user_id) VALUES ({id}, 3);
         INSERT INTO project_saves (project_id, user_id) VALUES ({id}, 3);",
        id = project.id
    ))
    .unwrap();

    let summary = ProjectService::new(&store).delete(project.id).unwrap();

    assert_eq!(summary.projects, 1);
    assert_eq!(summary.universes, 1);
    assert_eq!(summary.sagas, 2);
    assert_eq!(summary.books, 1);
    assert_eq!(summary.characters, 2);
    assert_eq!(summary.social_rows, 3);
    for table in [
        "projects",
        "universes",
        "sagas",
        "books",
        "characters",
        "character_appearances",
        "character_relationships",
        "character_timeline",
        "project_members",
        "project_likes",
        "project_saves",
    ] {
        assert_eq!(count(&conn, table), 0, "table {table}");
    }
}

#[test]
fn deleting_missing_root_is_not_found() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let cascade = CascadeOrchestrator::new(&store);

    assert!(cascade.delete_project(9999).unwrap_err().is_not_found());
    assert!(cascade.delete_universe(9999).unwrap_err().is_not_found());
    assert!(cascade.delete_saga(9999).unwrap_err().is_not_found());
    assert!(cascade.delete_book(9999).unwrap_err().is_not_found());
    assert!(cascade.delete_character(9999).unwrap_err().is_not_found());
}

#[test]
fn failing_step_rolls_back_whole_cascade() {
    let conn = setup();
    let store = SqliteStore::try_new(&conn).unwrap();
    let project = project(&store);
    let root = saga(&store, project.id, None, "Root");
    let child = saga(&store, project.id, Some(&root), "Child");
    book_in(&store, project.id, Some(&child), "Inside");
    character(&store, BelongingRef::Saga(child.id), "Hero");

    conn.execute_batch(&format!(
        "CREATE TRIGGER block_root_delete BEFORE DELETE ON sagas
         WHEN OLD.id = {}
         BEGIN SELECT RAISE(ABORT, 'root saga is locked'); END;",
        root.id
    ))
    .unwrap();

    let err = SagaService::new(&store).delete(root.id).unwrap_err();
    assert_eq!(err.code(), "STORE_ERROR");

    assert_eq!(count(&conn, "sagas"), 2);
    assert_eq!(count(&conn, "books"), 1);
    assert_eq!(count(&conn, "characters"), 1);
    assert_eq!(SagaService::new(&store).get(child.id).unwrap().id, child.id);

    conn.execute_batch("DROP TRIGGER block_root_delete;").unwrap();
    let summary = SagaService::new(&store).delete(root.id).unwrap();
    assert_eq!(summary.sagas, 2);
}
