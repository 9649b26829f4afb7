//! HTTP surface over the translator.

use crate::activity::{ActivityEntry, ActivityStats};
use crate::error::TranslateError;
use crate::language::{code_for_name, name_for_code, normalize};
use crate::metrics::MetricsReport;
use crate::translator::Translator;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowCredentials, AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

pub struct AppState {
    pub translator: Translator,
}

type SharedState = Arc<AppState>;

/// Error response: `{"error": "<message>"}` with a status per error class.
pub struct AppError(TranslateError);

impl From<TranslateError> for AppError {
    fn from(e: TranslateError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TranslateError::Validation(_) => StatusCode::BAD_REQUEST,
            TranslateError::ModelNotAvailable { .. } | TranslateError::RouteNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            TranslateError::EngineInit { .. } | TranslateError::EngineInitTimeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            TranslateError::EngineRuntime { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(AllowCredentials::yes())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Router::new()
        .route("/translate", post(translate))
        .route("/hcfy", post(translate_hcfy))
        .route("/detect", post(detect))
        .route("/health", get(health))
        .route("/models", get(models))
        .route("/activity", get(activity).delete(clear_activity))
        .route("/activity/stats", get(activity_stats))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(addr: SocketAddr, state: SharedState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

// ==================== Translation Endpoints ====================

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub text: String,
    pub from: String,
    pub to: String,
}

async fn translate(
    State(state): State<SharedState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, AppError> {
    let translation = state
        .translator
        .translate(&request.text, request.from.as_deref(), &request.to)
        .await?;

    Ok(Json(TranslateResponse {
        text: translation.text,
        from: translation.from,
        to: translation.to,
    }))
}

/// Request shape of the hcfy browser extension. Languages are localized
/// display names, e.g. `"中文(简体)"`.
#[derive(Debug, Deserialize)]
pub struct HcfyRequest {
    pub text: String,
    #[serde(default)]
    pub source: Option<String>,
    pub destination: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HcfyResponse {
    pub text: String,
    pub from: String,
    pub to: String,
    pub result: Vec<String>,
}

async fn translate_hcfy(
    State(state): State<SharedState>,
    Json(request): Json<HcfyRequest>,
) -> Result<Json<HcfyResponse>, AppError> {
    let source = request.source.as_deref().map(language_from_name);
    let from = state
        .translator
        .source_language(&request.text, source.as_deref());

    let targets: Vec<String> = request
        .destination
        .iter()
        .map(|name| language_from_name(name))
        .collect();

    // The extension sends a preferred target and a fallback, and expects the
    // fallback when the text is already in the preferred language.
    let to = targets
        .iter()
        .find(|code| **code != from)
        .or_else(|| targets.first())
        .cloned()
        .ok_or_else(|| TranslateError::Validation("destination must not be empty".to_string()))?;

    let translation = state
        .translator
        .translate(&request.text, Some(&from), &to)
        .await?;

    Ok(Json(HcfyResponse {
        text: request.text,
        from: display_name(&translation.from),
        to: display_name(&translation.to),
        result: vec![translation.text],
    }))
}

fn language_from_name(name: &str) -> String {
    if name.trim().eq_ignore_ascii_case("auto") {
        return "auto".to_string();
    }
    code_for_name(name)
        .map(str::to_string)
        .unwrap_or_else(|| normalize(name))
}

fn display_name(code: &str) -> String {
    name_for_code(code).unwrap_or(code).to_string()
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub language: String,
}

async fn detect(
    State(state): State<SharedState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(TranslateError::Validation("text must not be empty".to_string()).into());
    }

    Ok(Json(DetectResponse {
        language: state.translator.detect(&request.text),
    }))
}

// ==================== Status Endpoints ====================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    pub resident: Option<String>,
    pub pending_loads: usize,
}

async fn models(State(state): State<SharedState>) -> Json<ModelsResponse> {
    let coordinator = state.translator.coordinator();

    Json(ModelsResponse {
        models: state.translator.registry().keys(),
        resident: coordinator.resident_key().await,
        pending_loads: coordinator.pending_loads(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

async fn activity(
    State(state): State<SharedState>,
    Query(query): Query<ActivityQuery>,
) -> Json<Vec<ActivityEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    Json(state.translator.activity().recent(limit))
}

async fn activity_stats(State(state): State<SharedState>) -> Json<ActivityStats> {
    Json(state.translator.activity().stats())
}

async fn clear_activity(State(state): State<SharedState>) -> StatusCode {
    state.translator.activity().clear();
    info!("Activity log cleared");
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<SharedState>) -> Json<MetricsReport> {
    Json(state.translator.metrics().report())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLog;
    use crate::coordinator::LoadCoordinator;
    use crate::engine::fake::FakeRuntime;
    use crate::language::LanguageDetector;
    use crate::metrics::EngineMetrics;
    use crate::registry::ModelRegistry;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct FixedDetector(&'static str);

    impl LanguageDetector for FixedDetector {
        fn detect(&self, _text: &str) -> String {
            self.0.to_string()
        }
    }

    fn app_with(root: &Path, pairs: &[&str], detected: &'static str) -> Router {
        for pair in pairs {
            let dir = root.join(pair);
            std::fs::create_dir_all(&dir).unwrap();
            for file in ["model.bin", "lex.bin", "vocab.spm"] {
                std::fs::write(dir.join(file), b"bytes").unwrap();
            }
        }
        let registry = Arc::new(ModelRegistry::new());
        registry.scan(root).unwrap();

        let metrics = Arc::new(EngineMetrics::new());
        let coordinator = Arc::new(LoadCoordinator::new(
            Arc::clone(&registry),
            Arc::new(FakeRuntime::default()),
            Duration::from_secs(5),
            Arc::clone(&metrics),
        ));
        let translator = Translator::new(
            registry,
            coordinator,
            Box::new(FixedDetector(detected)),
            Arc::new(ActivityLog::new(100, Duration::from_secs(1200))),
            metrics,
            "en",
        );
        router(Arc::new(AppState { translator }))
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    // ==================== /translate Tests ====================

    #[tokio::test]
    async fn test_translate_ok() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["en-zh"], "en");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/translate",
                serde_json::json!({"text": "hello", "from": "en", "to": "zh-CN"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "[en>zh] hello");
        assert_eq!(body["from"], "en");
        assert_eq!(body["to"], "zh");
    }

    #[tokio::test]
    async fn test_translate_error_statuses() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["en-zh", "de-zh"], "en");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/translate",
                serde_json::json!({"text": "", "to": "zh"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("empty"));

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/translate",
                serde_json::json!({"text": "hi", "from": "fr", "to": "ja"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/translate",
                serde_json::json!({"text": "<explode>", "from": "en", "to": "zh"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ==================== /hcfy Tests ====================

    #[tokio::test]
    async fn test_hcfy_uses_localized_names() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["en-zh"], "en");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/hcfy",
                serde_json::json!({"text": "hello", "destination": ["中文(简体)", "英语"]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "hello");
        assert_eq!(body["from"], "英语");
        assert_eq!(body["to"], "中文(简体)");
        assert_eq!(body["result"][0], "[en>zh] hello");
    }

    #[tokio::test]
    async fn test_hcfy_falls_back_when_already_in_target() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["zh-en"], "zh");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/hcfy",
                serde_json::json!({"text": "你好", "destination": ["中文(简体)", "英语"]}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["to"], "英语");
        assert_eq!(body["result"][0], "[zh>en] 你好");
    }

    #[tokio::test]
    async fn test_hcfy_auto_source_prefers_only_registered_source() {
        let tmp = TempDir::new().unwrap();
        // Detector guesses Chinese, but English is the only source on disk
        let app = app_with(tmp.path(), &["en-zh"], "zh");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/hcfy",
                serde_json::json!({
                    "text": "hello",
                    "source": "auto",
                    "destination": ["中文(简体)", "英语"]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "英语");
        assert_eq!(body["to"], "中文(简体)");
        assert_eq!(body["result"][0], "[en>zh] hello");
    }

    #[tokio::test]
    async fn test_hcfy_empty_destination() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["en-zh"], "en");

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/hcfy",
                serde_json::json!({"text": "hello", "destination": []}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // ==================== Status Endpoint Tests ====================

    #[tokio::test]
    async fn test_detect_and_health() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &[], "ja");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/detect",
                serde_json::json!({"text": "こんにちは"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["language"], "ja");

        let (status, body) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_models_and_metrics() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["en-zh", "zh-en"], "en");

        send(
            &app,
            json_request(
                Method::POST,
                "/translate",
                serde_json::json!({"text": "hi", "from": "en", "to": "zh"}),
            ),
        )
        .await;

        let (_, body) = send(&app, get_request("/models")).await;
        assert_eq!(body["models"], serde_json::json!(["en-zh", "zh-en"]));
        assert_eq!(body["resident"], "en-zh");
        assert_eq!(body["pending_loads"], 0);

        let (_, body) = send(&app, get_request("/metrics")).await;
        assert_eq!(body["loads"], 1);
        assert_eq!(body["translations"], 1);
    }

    #[tokio::test]
    async fn test_activity_endpoints() {
        let tmp = TempDir::new().unwrap();
        let app = app_with(tmp.path(), &["en-zh"], "en");

        for text in ["one", "two", "three"] {
            send(
                &app,
                json_request(
                    Method::POST,
                    "/translate",
                    serde_json::json!({"text": text, "from": "en", "to": "zh"}),
                ),
            )
            .await;
        }

        let (status, body) = send(&app, get_request("/activity?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["source_excerpt"], "two");
        assert_eq!(entries[1]["source_excerpt"], "three");

        let (_, body) = send(&app, get_request("/activity/stats")).await;
        assert_eq!(body["total_entries"], 3);

        let (status, _) = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri("/activity")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, get_request("/activity/stats")).await;
        assert_eq!(body["total_entries"], 0);
    }
}
