//! HTTP behavior of the task API client against a wiremock server.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zenmatrix_core::api::{ApiClient, ApiError};
use zenmatrix_core::task::Task;
use zenmatrix_core::view::ViewState;

#[tokio::test(flavor = "multi_thread")]
async fn list_tasks_sends_the_derived_query_and_parses_the_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("Authorization", "Bearer tok-1"))
        .and(query_param("sortBy", "createdAt"))
        .and(query_param("sortDirection", "desc"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [{
                "id": "t1",
                "titulo": "Pay rent",
                "proyecto": "Home",
                "responsable": "Ana",
                "prioridad": "Urgente-Importante",
                "isCompleted": false,
                "createdAt": "2026-03-01T12:00:00Z"
            }],
            "totalCount": 12
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let page = tokio::task::spawn_blocking(move || {
        client.list_tasks("tok-1", &ViewState::default())
    })
    .await
    .expect("join")
    .expect("list tasks");

    assert_eq!(page.total_count, 12);
    assert_eq!(page.tasks.len(), 1);
    assert_eq!(page.tasks[0].titulo, "Pay rent");
    assert_eq!(page.tasks[0].id.as_deref(), Some("t1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn matrix_mode_fetch_carries_no_paging_parameters() {
    let server = MockServer::start().await;

    // The mock only matches when page/limit are absent; a request carrying
    // them falls through to the 404 default and fails the test.
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(query_param("sortBy", "createdAt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [],
            "totalCount": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let view = ViewState::unpaginated();

    let page = tokio::task::spawn_blocking(move || client.list_tasks("tok-1", &view))
        .await
        .expect("join")
        .expect("list tasks");
    assert_eq!(page.total_count, 0);

    let requests = server
        .received_requests()
        .await
        .expect("recorded requests");
    assert_eq!(requests.len(), 1);
    let query = requests[0].url.query().unwrap_or_default().to_string();
    assert!(!query.contains("page="), "unexpected paging in: {query}");
    assert!(!query.contains("limit="), "unexpected paging in: {query}");
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_responses_map_to_the_unauthorized_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let result = tokio::task::spawn_blocking(move || {
        client.list_tasks("stale-token", &ViewState::default())
    })
    .await
    .expect("join");

    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_delete_also_maps_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/tasks/t9"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let result = tokio::task::spawn_blocking(move || client.delete_task("tok-1", "t9"))
        .await
        .expect("join");

    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_carry_the_server_message_when_present() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "database unavailable" })),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let mut task = Task::new_draft("Pay rent".to_string());
    task.proyecto = "Home".to_string();
    task.responsable = "Ana".to_string();
    task.prioridad = "Urgente-Importante".to_string();

    let result = tokio::task::spawn_blocking(move || client.create_task("tok-1", &task))
        .await
        .expect("join");

    match result {
        Err(ApiError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected ApiError::Api, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn login_posts_credentials_and_parses_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({
            "email": "ana@example.com",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-42",
            "user": { "email": "ana@example.com" },
            "message": "welcome back"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let auth = tokio::task::spawn_blocking(move || client.login("ana@example.com", "secret"))
        .await
        .expect("join")
        .expect("login");

    assert_eq!(auth.token, "tok-42");
    assert_eq!(auth.user.email, "ana@example.com");
    assert_eq!(auth.message.as_deref(), Some("welcome back"));
}

#[tokio::test(flavor = "multi_thread")]
async fn update_sends_the_completion_invariant_intact() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/tasks/t1"))
        .and(header("Authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri());
    let now = chrono::Utc::now();
    let mut task = Task::new_draft("Pay rent".to_string());
    task.id = Some("t1".to_string());
    task.proyecto = "Home".to_string();
    task.responsable = "Ana".to_string();
    task.prioridad = "Urgente-Importante".to_string();
    task.is_completed = true;
    task.sync_completion(now);

    tokio::task::spawn_blocking(move || client.update_task("tok-1", "t1", &task))
        .await
        .expect("join")
        .expect("update");

    let requests = server
        .received_requests()
        .await
        .expect("recorded requests");
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body json");
    assert_eq!(body["isCompleted"], true);
    assert!(body["fechaTerminada"].is_string());
}
