//! HTTP behaviour of the API client against an in-process fake service

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use reskit_core::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

fn token_of(headers: &HeaderMap) -> Value {
    match headers.get(TOKEN_HEADER) {
        Some(v) => json!(v.to_str().unwrap_or("<binary>")),
        None => json!("<absent>"),
    }
}

async fn profile(headers: HeaderMap) -> Json<Value> {
    Json(json!({"id": "u-1", "username": "ada", "seen_token": token_of(&headers)}))
}

async fn projects_with_payload_error() -> Json<Value> {
    Json(json!({"error": "database unavailable"}))
}

async fn send_message(State(rec): State<Recorded>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    rec.bodies.lock().unwrap().push(body);
    (
        StatusCode::CREATED,
        Json(json!({"message": "Message sent successfully", "chat_id": "c1", "message_id": "m9"})),
    )
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "correct horse" {
        (StatusCode::OK, Json(json!({"token": "jwt-abc"})))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid credentials!"})),
        )
    }
}

async fn search(
    State(rec): State<Recorded>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.queries.lock().unwrap().push(q.clone());
    Json(json!({"results": [{
        "title": format!("About {}", q.get("q").cloned().unwrap_or_default()),
        "authors": ["A. Author"],
        "summary": "",
        "pdf_link": "",
        "published": "2020-01-01T00:00:00Z"
    }]}))
}

async fn read_messages(
    State(rec): State<Recorded>,
    Path(project): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.queries.lock().unwrap().push(q);
    Json(json!([{
        "id": "m1",
        "user_id": "system",
        "role": "ai",
        "content": [{"type": "text", "text": format!("history of {}", project)}],
        "timestamp": "2024-03-02T10:15:30.123456"
    }]))
}

async fn upload(mut multipart: Multipart) -> Json<Value> {
    let mut file_name = String::new();
    let mut project = String::new();
    let mut size = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            "project_id" => project = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }
    Json(json!({"message": "File uploaded successfully", "filename": format!("{}:{}:{}", project, file_name, size)}))
}

async fn create_project(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({"id": "p-new", "name": body["name"], "owner_id": "u-1", "is_public": false, "members": null})),
    )
}

async fn spawn_service(rec: Recorded) -> String {
    let router = Router::new()
        .route("/auth/profile", get(profile))
        .route("/auth/login", post(login))
        .route("/api/projects", get(projects_with_payload_error).post(create_project))
        .route("/api/send-message", post(send_message))
        .route("/api/search", get(search))
        .route("/api/read-messages/:project", get(read_messages))
        .route("/api/upload", post(upload))
        .with_state(rec);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

fn api_for(base: &str, session: Session) -> HttpResearchApi {
    let config = ClientConfig::new(base).unwrap();
    HttpResearchApi::new(ApiClient::new(config, session).unwrap())
}

#[tokio::test]
async fn test_stored_token_is_sent() {
    let base = spawn_service(Recorded::default()).await;
    let api = api_for(&base, Session::in_memory(Some("jwt-xyz")));

    let user = api.profile().await.unwrap();
    assert_eq!(user.username, "ada");
    assert_eq!(user.extra["seen_token"], json!("jwt-xyz"));
}

#[tokio::test]
async fn test_missing_token_still_sends_empty_header() {
    let base = spawn_service(Recorded::default()).await;
    let api = api_for(&base, Session::in_memory(None));

    let user = api.profile().await.unwrap();
    assert_eq!(user.extra["seen_token"], json!(""));
}

#[tokio::test]
async fn test_payload_error_field_rejects() {
    let base = spawn_service(Recorded::default()).await;
    let api = api_for(&base, Session::in_memory(Some("t")));

    match api.projects().await {
        Err(ReskitError::Api { status, message }) => {
            assert_eq!(status, 200);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_message_body() {
    let rec = Recorded::default();
    let base = spawn_service(rec.clone()).await;
    let api = api_for(&base, Session::in_memory(Some("t")));

    let receipt = api
        .send_message(SendMessageRequest {
            project_id: Id::Numeric(42),
            message: "hello".into(),
            attachments: vec![],
        })
        .await
        .unwrap();

    assert_eq!(receipt.message_id, Some(Id::Text("m9".into())));
    assert_eq!(
        rec.bodies.lock().unwrap().as_slice(),
        &[json!({"project_id": 42, "message": "hello", "attachments": []})]
    );
}

#[tokio::test]
async fn test_login_starts_session_only_on_success() {
    let base = spawn_service(Recorded::default()).await;
    let session = Session::in_memory(None);
    let api = api_for(&base, session.clone());

    let err = api
        .login(LoginRequest {
            email: "ada@example.org".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert!(err.is_auth_failure());
    assert!(err.to_string().contains("Invalid credentials!"));
    assert!(!session.is_authenticated());

    api.login(LoginRequest {
        email: "ada@example.org".into(),
        password: "correct horse".into(),
    })
    .await
    .unwrap();
    assert_eq!(session.token().as_deref(), Some("jwt-abc"));

    api.logout().await.unwrap();
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_search_query_string() {
    let rec = Recorded::default();
    let base = spawn_service(rec.clone()).await;
    let api = api_for(&base, Session::in_memory(Some("t")));

    let resp = api
        .search("graph neural nets", SearchCategory::Topics)
        .await
        .unwrap();
    assert_eq!(resp.results[0].title, "About graph neural nets");

    let queries = rec.queries.lock().unwrap();
    assert_eq!(queries[0]["q"], "graph neural nets");
    assert_eq!(queries[0]["category"], "topics");
}

#[tokio::test]
async fn test_read_messages_with_after() {
    let rec = Recorded::default();
    let base = spawn_service(rec.clone()).await;
    let api = api_for(&base, Session::in_memory(Some("t")));

    let first = api.read_messages(&Id::Numeric(7), None).await.unwrap();
    assert_eq!(first[0].text(), Some("history of 7"));
    assert_eq!(first[0].role, Role::Assistant);

    let after = first[0].timestamp().unwrap();
    api.read_messages(&Id::Numeric(7), Some(after)).await.unwrap();

    let queries = rec.queries.lock().unwrap();
    assert!(queries[0].get("after").is_none());
    assert_eq!(queries[1]["after"], "2024-03-02T10:15:30.123456Z");
}

#[tokio::test]
async fn test_upload_is_multipart() {
    let base = spawn_service(Recorded::default()).await;
    let api = api_for(&base, Session::in_memory(Some("t")));

    let receipt = api
        .upload(
            &Id::Numeric(42),
            FileUpload {
                file_name: "notes.txt".into(),
                mime: "text/plain".into(),
                bytes: bytes::Bytes::from_static(b"twelve bytes"),
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.filename, "42:notes.txt:12");
}

#[tokio::test]
async fn test_create_project_accepts_bare_object() {
    let base = spawn_service(Recorded::default()).await;
    let api = api_for(&base, Session::in_memory(Some("t")));

    let project = api.create_project("Graphs").await.unwrap();
    assert_eq!(project.id, Id::Text("p-new".into()));
    assert_eq!(project.name, "Graphs");
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    // nothing listens on port 9 of localhost in the test environment
    let api = api_for("http://127.0.0.1:9", Session::in_memory(Some("t")));
    assert!(matches!(api.profile().await, Err(ReskitError::Network(_))));
}
