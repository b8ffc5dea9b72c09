//! Axum-based API gateway for Haven: chat with safety-keyword detection,
//! conversation history, and the wellness tracking resources.
//!
//! The completion API key stays in this backend; the UI is a stateless client
//! and never receives or sends LLM credentials. Stores are in-memory and
//! constructed once in `main`, then shared through [`AppState`].

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use haven_core::{
    ChatPipeline, CompletionBridge, ConversationLog, CoreConfig, CoreError, KeywordStore,
    NewCycleEntry, NewEmergencyContact, NewMoodEntry, NewSafetyKeyword, NewVoiceSettings,
    NewWellnessMetric, Responder, TrackerStore,
};

/// Gateway version from Cargo.toml, reported by `/api/v1/status`.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) keywords: Arc<KeywordStore>,
    pub(crate) conversations: Arc<ConversationLog>,
    pub(crate) tracker: Arc<TrackerStore>,
    pub(crate) pipeline: Arc<ChatPipeline>,
}

#[tokio::main]
async fn main() {
    // Load .env first. The completion API key stays in the backend only.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[haven-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CoreConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("Config load failed: {}", e);
            std::process::exit(1);
        }
    };

    if config.llm_live()
        && std::env::var("HAVEN_LLM_API_KEY").is_err()
        && std::env::var("GROQ_API_KEY").is_err()
    {
        tracing::warn!(
            "llm_mode is 'live' but neither HAVEN_LLM_API_KEY nor GROQ_API_KEY is set; chat requests will fail upstream"
        );
    }

    let keywords = Arc::new(KeywordStore::new());
    let conversations = Arc::new(ConversationLog::new());
    let tracker = Arc::new(TrackerStore::new());
    let responder: Arc<dyn Responder> = Arc::new(CompletionBridge::from_config(&config));
    let pipeline = Arc::new(ChatPipeline::new(
        Arc::clone(&keywords),
        Arc::clone(&conversations),
        responder,
    ));

    let state = AppState {
        config: Arc::clone(&config),
        keywords,
        conversations,
        tracker,
        pipeline,
    };

    let app = build_app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        "{} listening on {} (llm_mode: {})",
        config.app_name,
        addr,
        config.llm_mode
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn build_app(state: AppState) -> Router {
    // CORS: allow local UI origins; the UI must talk to this gateway only.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &axum::http::HeaderValue, _| {
            let s = origin.to_str().unwrap_or("");
            if s == "http://localhost:3000" || s == "http://127.0.0.1:3000" {
                return true;
            }
            let port = s
                .split(':')
                .last()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(0);
            (3000..=3099).contains(&port) || (5173..=5180).contains(&port)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/status", get(status))
        .route("/api/v1/chat", post(chat_post))
        .route("/api/v1/conversations", get(conversations_list))
        .route("/api/v1/safety-keywords", get(keywords_list).post(keywords_create))
        .route("/api/v1/safety-keywords/:id", axum::routing::patch(keywords_set_active))
        .route(
            "/api/v1/emergency-contacts",
            get(contacts_list).post(contacts_create),
        )
        .route(
            "/api/v1/emergency-contacts/:id",
            axum::routing::patch(contacts_update).delete(contacts_delete),
        )
        .route("/api/v1/cycle-tracking", get(cycles_list).post(cycles_create))
        .route("/api/v1/mood-entries", get(moods_list).post(moods_create))
        .route(
            "/api/v1/wellness-metrics",
            get(metrics_list).post(metrics_create),
        )
        .route(
            "/api/v1/voice-settings",
            get(voice_settings_get).post(voice_settings_upsert),
        )
        .with_state(state)
        .layer(cors)
}

/// Maps the core error taxonomy onto HTTP statuses.
fn error_response(err: &CoreError) -> Response {
    let status = match err {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(serde_json::json!({ "status": "error", "error": err.to_string() })),
    )
        .into_response()
}

/// GET /api/v1/health – liveness check.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/v1/status – app identity and configuration summary.
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "app_name": state.config.app_name,
        "version": GATEWAY_VERSION,
        "port": state.config.port,
        "llm_mode": state.config.llm_mode,
        "llm_model": state.config.llm_model,
        "keywords": state.keywords.len(),
        "conversations": state.conversations.len(),
    }))
}

#[derive(serde::Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: Option<String>,
}

/// POST /api/v1/chat – run one chat turn through the pipeline. A failed turn
/// logs nothing; the entry is only returned once it is persisted.
async fn chat_post(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Response {
    let Some(message) = body.message else {
        return error_response(&CoreError::Validation("message is required".to_string()));
    };
    match state.pipeline.submit(&message).await {
        Ok(entry) => Json(entry).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/conversations – full history, ascending by creation time.
async fn conversations_list(State(state): State<AppState>) -> Response {
    Json(state.conversations.list()).into_response()
}

/// GET /api/v1/safety-keywords – all keywords (active and inactive), newest first.
async fn keywords_list(State(state): State<AppState>) -> Response {
    Json(state.keywords.list()).into_response()
}

/// POST /api/v1/safety-keywords – add a keyword, active by default.
async fn keywords_create(
    State(state): State<AppState>,
    Json(body): Json<NewSafetyKeyword>,
) -> Response {
    match state.keywords.add(&body.keyword) {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetActiveBody {
    is_active: bool,
}

/// PATCH /api/v1/safety-keywords/:id – toggle the active flag. Keywords are
/// never deleted, only deactivated.
async fn keywords_set_active(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetActiveBody>,
) -> Response {
    match state.keywords.set_active(id, body.is_active) {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/emergency-contacts – newest first.
async fn contacts_list(State(state): State<AppState>) -> Response {
    Json(state.tracker.list_contacts()).into_response()
}

/// POST /api/v1/emergency-contacts
async fn contacts_create(
    State(state): State<AppState>,
    Json(body): Json<NewEmergencyContact>,
) -> Response {
    match state.tracker.create_contact(body) {
        Ok(contact) => Json(contact).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PATCH /api/v1/emergency-contacts/:id – replace fields, keep created_at.
async fn contacts_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NewEmergencyContact>,
) -> Response {
    match state.tracker.update_contact(id, body) {
        Ok(contact) => Json(contact).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/v1/emergency-contacts/:id
async fn contacts_delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    state.tracker.delete_contact(id);
    Json(serde_json::json!({ "success": true })).into_response()
}

/// GET /api/v1/cycle-tracking – most recent start date first.
async fn cycles_list(State(state): State<AppState>) -> Response {
    Json(state.tracker.list_cycles()).into_response()
}

/// POST /api/v1/cycle-tracking
async fn cycles_create(State(state): State<AppState>, Json(body): Json<NewCycleEntry>) -> Response {
    Json(state.tracker.create_cycle(body)).into_response()
}

/// GET /api/v1/mood-entries – newest first.
async fn moods_list(State(state): State<AppState>) -> Response {
    Json(state.tracker.list_moods()).into_response()
}

/// POST /api/v1/mood-entries
async fn moods_create(State(state): State<AppState>, Json(body): Json<NewMoodEntry>) -> Response {
    match state.tracker.create_mood(body) {
        Ok(entry) => Json(entry).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/wellness-metrics – most recent date first.
async fn metrics_list(State(state): State<AppState>) -> Response {
    Json(state.tracker.list_metrics()).into_response()
}

/// POST /api/v1/wellness-metrics
async fn metrics_create(
    State(state): State<AppState>,
    Json(body): Json<NewWellnessMetric>,
) -> Response {
    Json(state.tracker.create_metric(body)).into_response()
}

/// GET /api/v1/voice-settings – stored profile, or the default one when unset.
async fn voice_settings_get(State(state): State<AppState>) -> Response {
    Json(state.tracker.voice_settings()).into_response()
}

/// POST /api/v1/voice-settings – create or replace the voice profile.
async fn voice_settings_upsert(
    State(state): State<AppState>,
    Json(body): Json<NewVoiceSettings>,
) -> Response {
    Json(state.tracker.upsert_voice_settings(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use haven_core::CoreResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Scripted responder: fixed reply, call counter, optional failure.
    struct ScriptedResponder {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Responder for ScriptedResponder {
        async fn complete(&self, _message: &str) -> CoreResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CoreError::Upstream("scripted failure".to_string()))
            } else {
                Ok("scripted response".to_string())
            }
        }
    }

    fn test_state_with(fail: bool) -> (AppState, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let responder: Arc<dyn Responder> = Arc::new(ScriptedResponder {
            calls: Arc::clone(&calls),
            fail,
        });
        let keywords = Arc::new(KeywordStore::new());
        let conversations = Arc::new(ConversationLog::new());
        let pipeline = Arc::new(ChatPipeline::new(
            Arc::clone(&keywords),
            Arc::clone(&conversations),
            responder,
        ));
        let state = AppState {
            config: Arc::new(CoreConfig::default()),
            keywords,
            conversations,
            tracker: Arc::new(TrackerStore::new()),
            pipeline,
        };
        (state, calls)
    }

    fn test_state() -> AppState {
        test_state_with(false).0
    }

    async fn send_json(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(v) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&v).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_and_status_respond() {
        let app = build_app(test_state());
        let (status_code, json) = send_json(app.clone(), "GET", "/api/v1/health", None).await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let (status_code, json) = send_json(app, "GET", "/api/v1/status", None).await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["app_name"], "Haven Gateway");
        assert_eq!(json["llm_mode"], "mock");
        assert_eq!(json["keywords"], 4);
    }

    #[tokio::test]
    async fn chat_flags_matching_message_and_persists_it() {
        let app = build_app(test_state());
        let (status_code, json) = send_json(
            app.clone(),
            "POST",
            "/api/v1/chat",
            Some(serde_json::json!({ "message": "I need some help now" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["userMessage"], "I need some help now");
        assert_eq!(json["aiResponse"], "scripted response");
        assert_eq!(json["isSafetyAlert"], true);

        let (status_code, listed) = send_json(app, "GET", "/api/v1/conversations", None).await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn chat_without_matching_keyword_is_not_flagged() {
        let app = build_app(test_state());
        let (_, json) = send_json(
            app,
            "POST",
            "/api/v1/chat",
            Some(serde_json::json!({ "message": "I'm doing fine" })),
        )
        .await;
        assert_eq!(json["isSafetyAlert"], false);
    }

    #[tokio::test]
    async fn chat_rejects_missing_or_empty_message_before_the_bridge() {
        let (state, calls) = test_state_with(false);
        let app = build_app(state);

        let (status_code, _) = send_json(
            app.clone(),
            "POST",
            "/api/v1/chat",
            Some(serde_json::json!({ "message": "" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::BAD_REQUEST);

        let (status_code, json) =
            send_json(app.clone(), "POST", "/api/v1/chat", Some(serde_json::json!({}))).await;
        assert_eq!(status_code, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "error");

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let (_, listed) = send_json(app, "GET", "/api/v1/conversations", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_completion_returns_bad_gateway_and_logs_nothing() {
        let (state, calls) = test_state_with(true);
        let app = build_app(state);

        let (status_code, json) = send_json(
            app.clone(),
            "POST",
            "/api/v1/chat",
            Some(serde_json::json!({ "message": "help me" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::BAD_GATEWAY);
        assert_eq!(json["status"], "error");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let (_, listed) = send_json(app, "GET", "/api/v1/conversations", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn conversations_list_ascending_across_turns() {
        let app = build_app(test_state());
        for message in ["first message", "second message"] {
            let (status_code, _) = send_json(
                app.clone(),
                "POST",
                "/api/v1/chat",
                Some(serde_json::json!({ "message": message })),
            )
            .await;
            assert_eq!(status_code, StatusCode::OK);
        }

        let (_, listed) = send_json(app, "GET", "/api/v1/conversations", None).await;
        let listed = listed.as_array().unwrap().clone();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["userMessage"], "first message");
        assert_eq!(listed[1]["userMessage"], "second message");
    }

    #[tokio::test]
    async fn keyword_toggle_changes_alert_outcome() {
        let app = build_app(test_state());

        // Find the seeded "help" keyword id via the listing.
        let (_, listed) = send_json(app.clone(), "GET", "/api/v1/safety-keywords", None).await;
        let help_id = listed
            .as_array()
            .unwrap()
            .iter()
            .find(|k| k["keyword"] == "help")
            .map(|k| k["id"].as_str().unwrap().to_string())
            .unwrap();

        let (status_code, json) = send_json(
            app.clone(),
            "PATCH",
            &format!("/api/v1/safety-keywords/{}", help_id),
            Some(serde_json::json!({ "isActive": false })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["isActive"], false);

        let (_, entry) = send_json(
            app.clone(),
            "POST",
            "/api/v1/chat",
            Some(serde_json::json!({ "message": "I need some help now" })),
        )
        .await;
        assert_eq!(entry["isSafetyAlert"], false);

        send_json(
            app.clone(),
            "PATCH",
            &format!("/api/v1/safety-keywords/{}", help_id),
            Some(serde_json::json!({ "isActive": true })),
        )
        .await;
        let (_, entry) = send_json(
            app,
            "POST",
            "/api/v1/chat",
            Some(serde_json::json!({ "message": "I need some help now" })),
        )
        .await;
        assert_eq!(entry["isSafetyAlert"], true);
    }

    #[tokio::test]
    async fn keyword_create_validates_and_unknown_patch_is_404() {
        let app = build_app(test_state());

        let (status_code, json) = send_json(
            app.clone(),
            "POST",
            "/api/v1/safety-keywords",
            Some(serde_json::json!({ "keyword": "scared" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["isActive"], true);

        let (status_code, _) = send_json(
            app.clone(),
            "POST",
            "/api/v1/safety-keywords",
            Some(serde_json::json!({ "keyword": "   " })),
        )
        .await;
        assert_eq!(status_code, StatusCode::BAD_REQUEST);

        let (status_code, _) = send_json(
            app,
            "PATCH",
            &format!("/api/v1/safety-keywords/{}", Uuid::new_v4()),
            Some(serde_json::json!({ "isActive": false })),
        )
        .await;
        assert_eq!(status_code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn emergency_contacts_crud() {
        let app = build_app(test_state());

        let (status_code, created) = send_json(
            app.clone(),
            "POST",
            "/api/v1/emergency-contacts",
            Some(serde_json::json!({ "name": "Maya", "phone": "555-0100", "relationship": "sister" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();

        let (status_code, updated) = send_json(
            app.clone(),
            "PATCH",
            &format!("/api/v1/emergency-contacts/{}", id),
            Some(serde_json::json!({ "name": "Maya R.", "phone": "555-0101", "relationship": "sister" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(updated["name"], "Maya R.");
        assert_eq!(updated["createdAt"], created["createdAt"]);

        let (status_code, _) = send_json(
            app.clone(),
            "PATCH",
            &format!("/api/v1/emergency-contacts/{}", Uuid::new_v4()),
            Some(serde_json::json!({ "name": "X", "phone": "1" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::NOT_FOUND);

        let (status_code, json) = send_json(
            app.clone(),
            "DELETE",
            &format!("/api/v1/emergency-contacts/{}", id),
            None,
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (_, listed) = send_json(app, "GET", "/api/v1/emergency-contacts", None).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mood_and_metric_creation() {
        let app = build_app(test_state());

        let (status_code, mood) = send_json(
            app.clone(),
            "POST",
            "/api/v1/mood-entries",
            Some(serde_json::json!({ "mood": "calm", "notes": "after a walk" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(mood["mood"], "calm");

        let (status_code, _) = send_json(
            app.clone(),
            "POST",
            "/api/v1/mood-entries",
            Some(serde_json::json!({ "mood": " " })),
        )
        .await;
        assert_eq!(status_code, StatusCode::BAD_REQUEST);

        let (status_code, metric) = send_json(
            app,
            "POST",
            "/api/v1/wellness-metrics",
            Some(serde_json::json!({ "date": "2026-08-06T08:00:00Z", "waterIntake": 1500, "sleepHours": 7 })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(metric["waterIntake"], 1500);
        assert_eq!(metric["sleepHours"], 7);
    }

    #[tokio::test]
    async fn cycle_entries_default_lengths_and_sort() {
        let app = build_app(test_state());

        let (status_code, entry) = send_json(
            app.clone(),
            "POST",
            "/api/v1/cycle-tracking",
            Some(serde_json::json!({ "startDate": "2026-07-01T00:00:00Z" })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(entry["cycleLength"], 28);
        assert_eq!(entry["periodLength"], 5);

        send_json(
            app.clone(),
            "POST",
            "/api/v1/cycle-tracking",
            Some(serde_json::json!({ "startDate": "2026-08-01T00:00:00Z", "cycleLength": 30 })),
        )
        .await;

        let (_, listed) = send_json(app, "GET", "/api/v1/cycle-tracking", None).await;
        let listed = listed.as_array().unwrap().clone();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["cycleLength"], 30);
    }

    #[tokio::test]
    async fn voice_settings_default_then_upsert() {
        let app = build_app(test_state());

        let (status_code, json) = send_json(app.clone(), "GET", "/api/v1/voice-settings", None).await;
        assert_eq!(status_code, StatusCode::OK);
        assert_eq!(json["id"], "default");
        assert_eq!(json["voiceName"], "Google US English Female");

        let (status_code, saved) = send_json(
            app.clone(),
            "POST",
            "/api/v1/voice-settings",
            Some(serde_json::json!({ "voiceName": "Google UK English Female", "pitch": 12, "rate": 9 })),
        )
        .await;
        assert_eq!(status_code, StatusCode::OK);
        assert_ne!(saved["id"], "default");

        let (_, fetched) = send_json(app, "GET", "/api/v1/voice-settings", None).await;
        assert_eq!(fetched["voiceName"], "Google UK English Female");
        assert_eq!(fetched["id"], saved["id"]);
    }
}
