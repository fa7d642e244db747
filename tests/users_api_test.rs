use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use user_api::{database::memory::InMemoryUserRepository, routes::build_router, AppState};

fn app() -> (Router, Arc<InMemoryUserRepository>) {
    let repo = Arc::new(InMemoryUserRepository::new());
    let state = AppState::from_repository(repo.clone(), 3600);
    (build_router(state), repo)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn signup(username: &str, name: &str, surname: &str) -> JsonValue {
    json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "phone": format!("+7-{}", username),
        "name": name,
        "surname": surname,
        "password": "secret-pass",
    })
}

async fn create(app: &Router, username: &str, name: &str, surname: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/users/create",
        Some(signup(username, name, surname)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["id"].as_i64().expect("id in response")
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_returns_safe_representation() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/users/create",
        Some(signup("ivan", "Ivan", "Petrov")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "ivan");
    assert_eq!(body["surname"], "Petrov");

    let (_, list) = send(&app, Method::GET, "/users", None).await;
    let user = &list[0];
    for hidden in [
        "auth_key",
        "password_hash",
        "password_reset_token",
        "status",
        "created_at",
        "updated_at",
    ] {
        assert!(body.get(hidden).is_none(), "{} leaked from create", hidden);
        assert!(user.get(hidden).is_none(), "{} leaked from list", hidden);
    }
}

#[tokio::test]
async fn create_reports_all_field_errors() {
    let (app, _) = app();
    create(&app, "ivan", "Ivan", "Petrov").await;

    let mut payload = signup("ivan", "Ivan", "");
    payload["email"] = json!("not-an-email");
    payload["phone"] = json!("+7-other");
    payload["password"] = json!("123");

    let (status, body) = send(&app, Method::POST, "/users/create", Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"surname"));
    assert!(fields.contains(&"password"));
    assert!(!fields.contains(&"phone"));
    let mut sorted = fields.clone();
    sorted.sort();
    assert_eq!(fields, sorted);
}

#[tokio::test]
async fn search_matches_name_or_surname() {
    let (app, _) = app();
    create(&app, "ivan", "Ivan", "Petrov").await;
    create(&app, "petra", "Petra", "Ivanova").await;
    create(&app, "olga", "Olga", "Smirnova").await;

    let (status, all) = send(&app, Method::GET, "/users/search", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, empty) = send(&app, Method::GET, "/users/search?search=", None).await;
    assert_eq!(empty.as_array().unwrap().len(), 3);

    let (_, hits) = send(&app, Method::GET, "/users/search?search=Ivan", None).await;
    let names: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ivan", "petra"]);

    let (_, none) = send(&app, Method::GET, "/users/search?search=zzz", None).await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_changes_fields() {
    let (app, _) = app();
    let id = create(&app, "ivan", "Ivan", "Petrov").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/users/update?id={}", id),
        Some(json!({ "name": "Ivan II", "ignored": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, JsonValue::Null);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/users/update?id={}", id),
        Some(json!({ "surname": "Sidorov" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(list[0]["name"], "Ivan II");
    assert_eq!(list[0]["surname"], "Sidorov");
}

#[tokio::test]
async fn update_validation_failure_is_unprocessable() {
    let (app, repo) = app();
    let id = create(&app, "ivan", "Ivan", "Petrov").await;
    create(&app, "olga", "Olga", "Smirnova").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/users/update?id={}", id),
        Some(json!({ "email": "olga@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "email");

    let row = repo.snapshot(id).await.unwrap();
    assert_eq!(row.email, "ivan@example.com");
}

#[tokio::test]
async fn update_unknown_or_missing_id_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::PUT,
        "/users/update?id=404",
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "The requested resource does not exist.");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/users/update",
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_soft_and_not_repeatable() {
    let (app, repo) = app();
    let id = create(&app, "ivan", "Ivan", "Petrov").await;
    create(&app, "olga", "Olga", "Smirnova").await;

    let uri = format!("/users/delete?id={}", id);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, Method::GET, "/users", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["username"], "olga");

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/users/update?id={}", id),
        Some(json!({ "name": "Back" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let row = repo.snapshot(id).await.expect("row is kept");
    assert!(!row.is_active());
}

#[tokio::test]
async fn deleted_usernames_stay_taken() {
    let (app, _) = app();
    let id = create(&app, "ivan", "Ivan", "Petrov").await;
    let (status, _) = send(&app, Method::DELETE, &format!("/users/delete?id={}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let mut payload = signup("ivan", "Ivan", "Petrov");
    payload["email"] = json!("fresh@example.com");
    payload["phone"] = json!("+7-fresh");
    let (status, body) = send(&app, Method::POST, "/users/create", Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["field"], "username");
}

#[tokio::test]
async fn openapi_document_lists_user_paths() {
    let (app, _) = app();
    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/users").is_some());
    assert!(doc["paths"].get("/users/create").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_signups_are_validation_errors() {
    for _ in 0..5 {
        let (app, _) = app();
        let mut handles = Vec::new();
        for _ in 0..6 {
            let app = app.clone();
            handles.push(tokio::spawn(async move {
                send(
                    &app,
                    Method::POST,
                    "/users/create",
                    Some(signup("ivan", "Ivan", "Petrov")),
                )
                .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            let (status, body) = handle.await.unwrap();
            if status == StatusCode::CREATED {
                created += 1;
                continue;
            }
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {}", body);
            assert!(!body.to_string().contains("_key"), "body: {}", body);
            assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));
        }
        assert_eq!(created, 1);
    }
}
