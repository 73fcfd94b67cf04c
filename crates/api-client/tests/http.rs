use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use tutorchat_api_client::tutorchat_api::{ChatRequest, Stage};
use tutorchat_api_client::{ApiClient, ApiError, RetryConfig, TutorBackend};
use tutorchat_core::{AuthContext, MessageKind, Role};

#[derive(Clone, Default)]
struct MockState {
    session_list_calls: Arc<AtomicUsize>,
    flaky_failures_left: Arc<AtomicUsize>,
}

async fn list_sessions(State(state): State<MockState>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    state.session_list_calls.fetch_add(1, Ordering::SeqCst);
    if state
        .flaky_failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "warming up"})),
        );
    }
    let owner = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();
    (
        StatusCode::OK,
        Json(json!({
            "sessions": [
                {"session_id": "abc123", "title": owner, "updated_at": "2024-06-15T10:00:00Z", "current_stage": "EXPLAINING"},
                {"session_id": "def456", "title": "", "updated_at": null, "current_stage": "START"}
            ]
        })),
    )
}

async fn session_detail(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Session not found"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "session_id": id,
            "history": [
                {"role": "user", "content": "teach me graphs", "type": null, "timestamp": "2024-06-15T10:00:00Z"},
                {"role": "model", "content": "Sure!", "type": null, "timestamp": "2024-06-15T10:00:01Z"}
            ],
            "current_stage": "NEGOTIATING",
            "created_at": "2024-06-15T09:59:00Z"
        })),
    )
}

async fn update_title(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    let title = body["title"].as_str().unwrap_or_default().trim().to_string();
    Json(json!({"session_id": id, "title": title, "updated_at": "2024-06-15T11:00:00Z"}))
}

async fn delete_session(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "locked" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Not allowed"})),
        );
    }
    (StatusCode::NO_CONTENT, Json(json!({})))
}

async fn chat(Json(request): Json<ChatRequest>) -> (StatusCode, Json<Value>) {
    if request.user_message == "boom" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "ai_reply": "[SYSTEM ERROR]",
                "new_state": {"stage": "ERROR"},
                "session_id": request.session_id
            })),
        );
    }
    let session_id = request.session_id.unwrap_or_else(|| "minted1".to_string());
    (
        StatusCode::OK,
        Json(json!({
            "ai_reply": format!("You said: {}", request.user_message),
            "new_state": {"stage": "NEGOTIATING", "display_syllabus": null, "transition_to_explainer": false},
            "session_id": session_id
        })),
    )
}

async fn spawn_server(state: MockState) -> String {
    let app = Router::new()
        .route("/api/sessions/", get(list_sessions))
        .route("/api/session/{id}/", get(session_detail))
        .route("/api/session/{id}/update_title/", patch(update_title))
        .route("/api/session/{id}/delete/", delete(delete_session))
        .route("/api/chat/", post(chat))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    format!("http://{addr}/api")
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5))
        .expect("build client")
        .with_retry(RetryConfig::none())
}

#[tokio::test]
async fn lists_sessions_with_bearer_token() {
    let base = spawn_server(MockState::default()).await;
    let auth = AuthContext::signed_in("ada", Some("tok-1".to_string()));

    let list = client(&base).list_sessions(&auth).await.expect("list");
    assert_eq!(list.sessions.len(), 2);
    assert_eq!(list.sessions[0].id, "abc123");
    assert_eq!(list.sessions[0].title, "Bearer tok-1");
    assert_eq!(list.sessions[0].current_stage, Some(Stage::Explaining));
    assert!(list.sessions[1].updated_at.is_none());
}

#[tokio::test]
async fn anonymous_requests_carry_no_credentials() {
    let base = spawn_server(MockState::default()).await;
    let list = client(&base)
        .list_sessions(&AuthContext::Anonymous)
        .await
        .expect("list");
    assert_eq!(list.sessions[0].title, "anonymous");
}

#[tokio::test]
async fn loads_session_detail() {
    let base = spawn_server(MockState::default()).await;
    let detail = client(&base)
        .session_detail("abc123", &AuthContext::Anonymous)
        .await
        .expect("detail");
    assert_eq!(detail.current_stage, Some(Stage::Negotiating));
    assert_eq!(detail.history.len(), 2);
    assert_eq!(detail.history[0].role, Role::User);
    assert!(detail.history[0].kind.is_none());
    assert_eq!(
        detail.history[0].clone().retagged().kind,
        Some(MessageKind::Message)
    );
}

#[tokio::test]
async fn missing_session_maps_to_server_error() {
    let base = spawn_server(MockState::default()).await;
    let err = client(&base)
        .session_detail("missing", &AuthContext::Anonymous)
        .await
        .expect_err("404");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Session not found");
}

#[tokio::test]
async fn renames_and_deletes() {
    let base = spawn_server(MockState::default()).await;
    let api = client(&base);
    let auth = AuthContext::Anonymous;

    let renamed = api
        .update_title("abc123", "  Graph theory ", &auth)
        .await
        .expect("rename");
    assert_eq!(renamed.title, "Graph theory");

    api.delete_session("abc123", &auth).await.expect("delete");

    let err = api
        .delete_session("locked", &auth)
        .await
        .expect_err("forbidden");
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn chat_mints_session_and_reports_ai_errors() {
    let base = spawn_server(MockState::default()).await;
    let api = client(&base);
    let auth = AuthContext::Anonymous;

    let response = api
        .send_chat(
            &ChatRequest {
                user_message: "I want to learn recursion".to_string(),
                session_id: None,
            },
            &auth,
        )
        .await
        .expect("chat");
    assert_eq!(response.confirmed_session_id(), Some("minted1"));
    assert_eq!(response.stage(), Some(&Stage::Negotiating));
    let state = response.new_state.as_ref().expect("new_state");
    assert!(state.syllabus().is_none());
    assert!(!state.transitions_to_explainer());

    let err = api
        .send_chat(
            &ChatRequest {
                user_message: "boom".to_string(),
                session_id: Some("minted1".to_string()),
            },
            &auth,
        )
        .await
        .expect_err("500");
    let body = err.server_body().expect("server body");
    assert_eq!(err.status(), Some(500));
    assert_eq!(body.ai_error_tag(), Some("[SYSTEM ERROR]"));
    assert_eq!(body.stage(), Some(&Stage::Error));
}

#[tokio::test]
async fn get_requests_retry_on_server_errors() {
    let state = MockState::default();
    state.flaky_failures_left.store(1, Ordering::SeqCst);
    let base = spawn_server(state.clone()).await;

    let api = client(&base).with_retry(RetryConfig {
        max_retries: 1,
        delays: vec![0],
    });
    let list = api
        .list_sessions(&AuthContext::Anonymous)
        .await
        .expect("list after retry");
    assert_eq!(list.sessions.len(), 2);
    assert_eq!(state.session_list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}/api"))
        .list_sessions(&AuthContext::Anonymous)
        .await
        .expect_err("connection refused");
    assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn api_client_works_through_the_backend_trait() {
    async fn count_sessions<B: TutorBackend>(backend: &B) -> usize {
        backend
            .list_sessions(&AuthContext::Anonymous)
            .await
            .map(|list| list.sessions.len())
            .unwrap_or_default()
    }

    let base = spawn_server(MockState::default()).await;
    assert_eq!(count_sessions(&client(&base)).await, 2);
}
