use rusqlite::Connection;
use serde_json::{json, Value};
use todosync_core::api::{STATUS_BAD_REQUEST, STATUS_INTERNAL_ERROR, STATUS_OK};
use todosync_core::db::open_db_in_memory;
use todosync_core::{dispatch_json, ApiResponse, MutationEngine};

const USER: &str = "alice";

fn provisioned_conn() -> Connection {
    let conn = open_db_in_memory().unwrap();
    MutationEngine::new(&conn).provision_user(USER).unwrap();
    conn
}

fn call(engine: &MutationEngine<'_>, request: Value) -> (u16, Option<Value>) {
    let response: ApiResponse = dispatch_json(engine, USER, &request.to_string());
    let body = response
        .body_json()
        .unwrap()
        .map(|text| serde_json::from_str(&text).unwrap());
    (response.status, body)
}

#[test]
fn client_flow_uses_field_presence_to_signal_mismatch() {
    let conn = provisioned_conn();
    let engine = MutationEngine::new(&conn);

    assert_eq!(
        call(&engine, json!({ "operation": "getTodos" })),
        (STATUS_OK, Some(json!({ "version": 0, "todos": [] })))
    );
    assert_eq!(
        call(&engine, json!({ "operation": "appendTodo", "version": 0, "id": "x" })),
        (STATUS_OK, Some(json!({ "version": 1, "id": "x" })))
    );
    assert_eq!(
        call(
            &engine,
            json!({ "operation": "updateTodo", "version": 1, "id": "x", "value": "buy milk" })
        ),
        (STATUS_OK, Some(json!({ "version": 2 })))
    );
    assert_eq!(
        call(&engine, json!({ "operation": "deleteTodo", "version": 0, "id": "x" })),
        (
            STATUS_OK,
            Some(json!({ "version": 2, "todos": [["x", "buy milk"]] }))
        )
    );
    assert_eq!(
        call(&engine, json!({ "operation": "delete", "version": 2, "key": "x" })),
        (STATUS_OK, Some(json!({ "version": 3 })))
    );
}

#[test]
fn refresh_has_empty_body_when_up_to_date() {
    let conn = provisioned_conn();
    let engine = MutationEngine::new(&conn);

    assert_eq!(
        call(&engine, json!({ "operation": "refreshTodos", "version": 0 })),
        (STATUS_OK, None)
    );
    call(&engine, json!({ "operation": "append", "version": 0, "id": "a" }));
    assert_eq!(
        call(&engine, json!({ "operation": "refreshTodos", "version": 0 })),
        (STATUS_OK, Some(json!({ "version": 1, "todos": [["a", ""]] })))
    );
}

#[test]
fn stale_append_returns_full_state_including_new_todo() {
    let conn = provisioned_conn();
    let engine = MutationEngine::new(&conn);
    call(&engine, json!({ "operation": "appendTodo", "version": 0, "id": "a" }));

    assert_eq!(
        call(&engine, json!({ "operation": "appendTodo", "version": 0, "id": "b" })),
        (
            STATUS_OK,
            Some(json!({ "version": 2, "todos": [["a", ""], ["b", ""]] }))
        )
    );
}

#[test]
fn malformed_and_unknown_requests_are_bad_requests() {
    let conn = provisioned_conn();
    let engine = MutationEngine::new(&conn);

    for body in [
        "{",
        r#"{"operation":"renameTodo","version":0}"#,
        r#"{"operation":"deleteTodo","id":"x"}"#,
        r#"{"operation":"updateTodo","version":"zero","id":"x","value":""}"#,
    ] {
        let response = dispatch_json(&engine, USER, body);
        assert_eq!(response.status, STATUS_BAD_REQUEST, "body: {body}");
    }
    assert_eq!(MutationEngine::new(&conn).get(USER).unwrap().version.get(), 0);
}

#[test]
fn request_invalid_outcomes_map_to_400() {
    let conn = provisioned_conn();
    let engine = MutationEngine::new(&conn);
    call(&engine, json!({ "operation": "appendTodo", "version": 0, "id": "a" }));

    let (status, body) = call(
        &engine,
        json!({ "operation": "updateTodo", "version": 1, "id": "missing", "value": "v" }),
    );
    assert_eq!(status, STATUS_BAD_REQUEST);
    assert!(body.unwrap()["error"].as_str().unwrap().contains("missing"));

    let (status, _) = call(
        &engine,
        json!({ "operation": "appendTodo", "version": 1, "id": "a" }),
    );
    assert_eq!(status, STATUS_BAD_REQUEST);
}

#[test]
fn internal_failures_map_to_500_without_details() {
    let conn = open_db_in_memory().unwrap();
    let engine = MutationEngine::new(&conn);

    let response = dispatch_json(&engine, "nobody", r#"{"operation":"getTodos"}"#);
    assert_eq!(response.status, STATUS_INTERNAL_ERROR);
    assert_eq!(
        response.body_json().unwrap().as_deref(),
        Some(r#"{"error":"internal error"}"#)
    );

    engine.provision_user(USER).unwrap();
    conn.execute_batch("DROP TABLE todos;").unwrap();
    let response = dispatch_json(&engine, USER, r#"{"operation":"getTodos"}"#);
    assert_eq!(response.status, STATUS_INTERNAL_ERROR);
    assert_eq!(
        response.body_json().unwrap().as_deref(),
        Some(r#"{"error":"internal error"}"#)
    );
}

#[test]
fn malformed_todo_ids_are_not_echoed_back() {
    let conn = provisioned_conn();
    let engine = MutationEngine::new(&conn);
    let forged = "x\nevent=todo_delete module=engine status=ok user_id=admin";

    let (status, body) = call(
        &engine,
        json!({ "operation": "deleteTodo", "version": 0, "id": forged }),
    );
    assert_eq!(status, STATUS_BAD_REQUEST);
    let error = body.unwrap()["error"].as_str().unwrap().to_string();
    assert!(!error.contains('\n'));
    assert!(!error.contains("event="));

    let (status, _) = call(
        &engine,
        json!({ "operation": "appendTodo", "version": 0, "id": forged }),
    );
    assert_eq!(status, STATUS_BAD_REQUEST);

    assert_eq!(
        call(&engine, json!({ "operation": "updateTodo", "version": 7, "id": forged, "value": "v" })),
        (STATUS_OK, Some(json!({ "version": 0, "todos": [] })))
    );
}
