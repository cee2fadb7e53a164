use todosync_core::db::open_db_in_memory;
use todosync_core::{
    SqliteTodoRepository, SqliteVersionRepository, Todo, TodoRepository, Version,
    VersionRepository,
};

#[test]
fn provision_user_starts_at_zero_and_is_not_repeated() {
    let conn = open_db_in_memory().unwrap();
    let versions = SqliteVersionRepository::new(&conn);

    assert!(versions.provision_user("alice").unwrap());
    assert!(!versions.provision_user("alice").unwrap());
    assert_eq!(
        versions.read_version("alice").unwrap(),
        Some(Version::INITIAL)
    );
    assert_eq!(versions.read_version("bob").unwrap(), None);
}

#[test]
fn store_version_is_compare_and_set() {
    let conn = open_db_in_memory().unwrap();
    let versions = SqliteVersionRepository::new(&conn);
    versions.provision_user("alice").unwrap();

    let stale = versions
        .store_version("alice", Version::new(5), Version::new(6))
        .unwrap();
    assert_eq!(stale, 0);

    let fresh = versions
        .store_version("alice", Version::INITIAL, Version::new(1))
        .unwrap();
    assert_eq!(fresh, 1);
    assert_eq!(versions.read_version("alice").unwrap(), Some(Version::new(1)));
}

#[test]
fn negative_persisted_version_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute(
        "INSERT INTO users (user_id, version) VALUES ('alice', -3);",
        [],
    )
    .unwrap();

    let versions = SqliteVersionRepository::new(&conn);
    assert!(versions.read_version("alice").is_err());
}

#[test]
fn todos_are_listed_in_creation_order_per_user() {
    let conn = open_db_in_memory().unwrap();
    let versions = SqliteVersionRepository::new(&conn);
    versions.provision_user("alice").unwrap();
    versions.provision_user("bob").unwrap();
    let todos = SqliteTodoRepository::new(&conn);

    assert_eq!(todos.insert_todo("alice", "zeta").unwrap(), 1);
    assert_eq!(todos.insert_todo("bob", "zeta").unwrap(), 1);
    assert_eq!(todos.insert_todo("alice", "alpha").unwrap(), 1);
    assert_eq!(todos.update_todo_value("alice", "zeta", "first").unwrap(), 1);

    assert_eq!(
        todos.list_todos("alice").unwrap(),
        vec![Todo::new("zeta", "first"), Todo::new("alpha", "")]
    );
    assert_eq!(todos.list_todos("bob").unwrap(), vec![Todo::new("zeta", "")]);
}

#[test]
fn duplicate_insert_and_missing_targets_touch_no_rows() {
    let conn = open_db_in_memory().unwrap();
    SqliteVersionRepository::new(&conn)
        .provision_user("alice")
        .unwrap();
    let todos = SqliteTodoRepository::new(&conn);

    assert_eq!(todos.insert_todo("alice", "a").unwrap(), 1);
    assert_eq!(todos.insert_todo("alice", "a").unwrap(), 0);
    assert_eq!(todos.update_todo_value("alice", "nope", "v").unwrap(), 0);
    assert_eq!(todos.delete_todo("alice", "nope").unwrap(), 0);
    assert_eq!(todos.delete_todo("alice", "a").unwrap(), 1);
    assert!(todos.list_todos("alice").unwrap().is_empty());
}
