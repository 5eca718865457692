use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use roundtable_config::ConfigLoader;
use roundtable_core::Layout;
use roundtable_memory::{ArtifactStore, ConversationMemory};

use crate::jobs::{JobRegistry, RunRequest, SubmitError};
use crate::view::{is_valid_agent_id, turn_view, TurnView, DEFAULT_BLOCKS};

/// Prefix of transcript blocks posted by a human operator.
pub const USER_MESSAGE_PREFIX: &str = "##### USER SAYS:   ";

/// Shared application state for API handlers.
pub struct AppState {
    pub layout: Layout,
    pub config: ConfigLoader,
    pub memory: ConversationMemory,
    pub artifacts: ArtifactStore,
    pub jobs: JobRegistry,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "status": message.into() })))
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/agents", get(list_agents))
        .route("/api/queue_turns", post(queue_turns))
        .route("/api/jobs/{id}", get(get_job))
        .route("/api/view_memory", get(view_memory))
        .route("/api/post_message", post(post_message))
        .route("/api/clear_convo", post(clear_convo))
        .route("/api/view_turn/{agent}", get(view_turn))
        .with_state(state)
}

/// Health check endpoint; also reports the active job, if any.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "roundtable",
        "version": env!("CARGO_PKG_VERSION"),
        "active_job": state.jobs.active().await,
    }))
}

/// Agent directories under `agents/`.
async fn list_agents(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    match state.config.list_agents().await {
        Ok(agents) => Ok(Json(json!({ "agents": agents }))),
        Err(e) => {
            error!(error = %e, "Failed to list agents");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list agents"))
        }
    }
}

/// Submit a run of `turns` turns over `agents`.
async fn queue_turns(
    State(state): State<Arc<AppState>>,
    request: Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = request.map_err(|rejection| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("No agents or invalid turn count: {}", rejection.body_text()),
        )
    })?;
    match state.jobs.submit(request).await {
        Ok(job) => Ok(Json(json!({
            "status": format!(
                "Running agent runner with {} turns for: {}",
                job.turns,
                job.agents.join(", ")
            ),
            "job": job,
        }))),
        Err(e @ SubmitError::Invalid(_)) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ SubmitError::Busy(_)) => Err(api_error(StatusCode::CONFLICT, e.to_string())),
    }
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    match state.jobs.get(id).await {
        Some(record) => Ok(Json(json!(record))),
        None => Err(api_error(StatusCode::NOT_FOUND, format!("No job {id}"))),
    }
}

async fn view_memory(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    match state.memory.read().await {
        Ok(content) => Ok(Json(json!({ "content": content }))),
        Err(e) => {
            error!(error = %e, "Failed to read transcript");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read transcript"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostMessage {
    #[serde(default)]
    text: String,
}

/// Append an operator message to the transcript. Blank text is ignored.
async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<PostMessage>,
) -> Result<Json<Value>, ApiError> {
    let text = message.text.trim();
    if !text.is_empty() {
        let block = format!("{USER_MESSAGE_PREFIX}{text}\n");
        if let Err(e) = state.memory.append(&block).await {
            error!(error = %e, "Failed to post message");
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to post message"));
        }
        info!(chars = text.len(), "Operator message posted");
    }
    Ok(Json(json!({ "status": "ok" })))
}

async fn clear_convo(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    match state.memory.clear().await {
        Ok(()) => Ok(Json(json!({ "status": "cleared" }))),
        Err(e) => {
            error!(error = %e, "Failed to clear transcript");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to clear transcript"))
        }
    }
}

async fn view_turn(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
) -> Result<Json<TurnView>, ApiError> {
    if !is_valid_agent_id(&agent) {
        return Err(api_error(StatusCode::BAD_REQUEST, format!("Invalid agent id '{agent}'")));
    }
    Ok(Json(turn_view(&state.layout, &state.artifacts, &agent, DEFAULT_BLOCKS).await))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::jobs::tests::mock_registry;

    fn state(dir: &std::path::Path) -> Arc<AppState> {
        let layout = Layout::new(dir);
        let memory = ConversationMemory::new(layout.conversation_path());
        let artifacts = ArtifactStore::new(layout.clone());
        let jobs = mock_registry(&layout, memory.clone(), "Hi.", Duration::from_secs(5));
        Arc::new(AppState {
            config: ConfigLoader::new(layout.clone()),
            layout,
            memory,
            artifacts,
            jobs,
        })
    }

    fn run_request(agents: &[&str], turns: i64) -> Result<Json<RunRequest>, JsonRejection> {
        Ok(Json(RunRequest {
            agents: agents.iter().map(|s| s.to_string()).collect(),
            turns,
            max_tokens: 16,
        }))
    }

    async fn post_json(router: Router, uri: &str, body: &str) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn queue_turns_route_refuses_bad_turn_counts_with_400() {
        let tmp = tempfile::tempdir().unwrap();
        let router = build_router(state(tmp.path()));

        for body in [
            r#"{"agents":["a"],"turns":-1}"#,
            r#"{"agents":["a"],"turns":0}"#,
            r#"{"agents":["a"],"turns":"many"}"#,
            r#"{"agents":["a"],"turns":3,"max_tokens":-5}"#,
            r#"{"agents":["a"],"turns":"#,
        ] {
            assert_eq!(
                post_json(router.clone(), "/api/queue_turns", body).await,
                StatusCode::BAD_REQUEST,
                "body {body}"
            );
        }

        assert_eq!(
            post_json(router, "/api/queue_turns", r#"{"agents":["a"],"turns":"3"}"#).await,
            StatusCode::OK
        );
    }

    #[test]
    fn turn_counts_accept_numeric_strings_and_floats() {
        let request: RunRequest =
            serde_json::from_str(r#"{"agents":["a"],"turns":" 4 ","max_tokens":12.7}"#).unwrap();
        assert_eq!(request.turns, 4);
        assert_eq!(request.max_tokens, 12);

        let request: RunRequest = serde_json::from_str(r#"{"agents":["a"]}"#).unwrap();
        assert_eq!(request.turns, 0);
        assert_eq!(request.max_tokens, 1000);
    }

    #[tokio::test]
    async fn posts_views_and_clears_the_transcript() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());

        post_message(State(state.clone()), Json(PostMessage { text: "  hello all ".into() }))
            .await
            .unwrap();
        post_message(State(state.clone()), Json(PostMessage { text: "   ".into() }))
            .await
            .unwrap();

        let Json(body) = view_memory(State(state.clone())).await.unwrap();
        assert_eq!(body["content"], "##### USER SAYS:   hello all\n\n");

        let Json(body) = clear_convo(State(state.clone())).await.unwrap();
        assert_eq!(body["status"], "cleared");
        let Json(body) = view_memory(State(state)).await.unwrap();
        assert_eq!(body["content"], "");
    }

    #[tokio::test]
    async fn queue_turns_maps_errors_to_status_codes() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());

        let (status, _) = queue_turns(State(state.clone()), run_request(&[], 3)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = queue_turns(State(state.clone()), run_request(&["a"], 0)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let Json(body) = queue_turns(State(state.clone()), run_request(&["a", "b"], 2)).await.unwrap();
        assert_eq!(body["status"], "Running agent runner with 2 turns for: a, b");
        let id: Uuid = serde_json::from_value(body["job"]["id"].clone()).unwrap();

        let (status, _) = queue_turns(State(state.clone()), run_request(&["a"], 1)).await.unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);

        let Json(body) = health(State(state.clone())).await;
        assert_eq!(body["active_job"], json!(id));

        let Json(job) = get_job(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(job["job"]["turns"], 2);

        let (status, _) = get_job(State(state), Path(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_agent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        for agent in ["bob", "ada"] {
            tokio::fs::create_dir_all(tmp.path().join("agents").join(agent)).await.unwrap();
        }
        let Json(body) = list_agents(State(state(tmp.path()))).await.unwrap();
        assert_eq!(body["agents"], json!(["ada", "bob"]));
    }

    #[tokio::test]
    async fn view_turn_rejects_path_escapes() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path());
        let (status, _) = view_turn(State(state.clone()), Path("..".into())).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let Json(view) = view_turn(State(state), Path("ada".into())).await.unwrap();
        assert!(view.logs.rcall.is_empty());
        assert_eq!(view.payloads.tail, "");
    }
}
