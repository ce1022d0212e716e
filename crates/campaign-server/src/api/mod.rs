mod analytics;
mod campaigns;

use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use campaign_core::{AppConfig, ValidationError};
use campaign_db::{DbError, TopicStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TopicStore>,
}

/// HTTP-level settings derived from [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Single allowed CORS origin; any origin when `None`.
    pub cors_origin: Option<HeaderValue>,
    /// Directory holding the built UI, served for unmatched paths.
    pub static_dir: Option<PathBuf>,
}

impl HttpOptions {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let cors_origin = config
            .cors_origin
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|e| anyhow::anyhow!("CAMPAIGN_CORS_ORIGIN is not a valid header value: {e}"))?;

        Ok(Self {
            cors_origin,
            static_dir: config.static_dir.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    store: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_validation_error(request_id: String, error: &ValidationError) -> ApiError {
    ApiError::new(request_id, "validation_error", error.to_string())
}

pub(super) fn map_json_rejection(request_id: String, rejection: &JsonRejection) -> ApiError {
    ApiError::new(request_id, "validation_error", rejection.body_text())
}

pub(super) fn map_store_error(request_id: String, error: &DbError) -> ApiError {
    if error.is_not_found() {
        return ApiError::new(
            request_id,
            "not_found",
            "no topic matches the given topicTitle, geo and platform",
        );
    }
    tracing::error!(error = %error, "topic store call failed");
    ApiError::new(request_id, "store_unavailable", "topic store is unavailable")
}

fn build_cors(origin: Option<HeaderValue>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    match origin {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/campaigns", post(campaigns::ingest_topics))
        .route(
            "/api/campaigns/aggregated",
            get(campaigns::aggregate_topics),
        )
        .route("/api/campaigns/feedback", post(campaigns::record_feedback))
        .route("/api/campaigns/summary", get(analytics::campaign_summary))
}

pub fn build_app(state: AppState, options: &HttpOptions) -> Router {
    let mut router = api_router();

    if let Some(dir) = &options.static_dir {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        router = router.fallback_service(spa);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(build_cors(options.cors_origin.clone())),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                HealthData {
                    status: "ok",
                    store: "ok",
                },
                req_id.0,
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: topic store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        store: "unavailable",
                    },
                    req_id.0,
                )),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use campaign_db::MemoryTopicStore;
    use tower::ServiceExt;

    pub(super) fn memory_app() -> (Router, Arc<MemoryTopicStore>) {
        let store = Arc::new(MemoryTopicStore::new());
        let app = build_app(
            AppState {
                store: store.clone(),
            },
            &HttpOptions::default(),
        );
        (app, store)
    }

    pub(super) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).expect("json parse")
        };
        (status, json)
    }

    pub(super) fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    pub(super) fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("not_found", StatusCode::NOT_FOUND),
            ("store_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "msg").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn store_errors_split_into_not_found_and_unavailable() {
        let not_found = map_store_error("r".to_string(), &DbError::NotFound);
        assert_eq!(not_found.error.code, "not_found");

        let down = map_store_error(
            "r".to_string(),
            &DbError::InvalidRow("feedback column holds 'meh'".to_string()),
        );
        assert_eq!(down.error.code, "store_unavailable");
        assert_eq!(down.error.message, "topic store is unavailable");
    }

    #[test]
    fn http_options_reject_invalid_cors_origin() {
        let config = AppConfig {
            database_url: None,
            env: campaign_core::Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("addr"),
            log_level: "info".to_string(),
            store: campaign_core::StoreBackend::Memory,
            cors_origin: Some("http://bad\norigin".to_string()),
            static_dir: None,
            db_max_connections: 1,
            db_min_connections: 1,
            db_acquire_timeout_secs: 1,
        };
        assert!(HttpOptions::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn health_reports_ok_for_memory_store() {
        let (app, _) = memory_app();
        let (status, json) = send(&app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let store = Arc::new(MemoryTopicStore::new());
        let options = HttpOptions {
            cors_origin: Some(HeaderValue::from_static("http://localhost:3000")),
            static_dir: None,
        };
        let app = build_app(AppState { store }, &options);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/campaigns")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
    }

    #[tokio::test]
    async fn static_dir_serves_index_for_unknown_paths() {
        let dir = std::env::temp_dir().join(format!("campaign-ui-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join("index.html"), "<html>campaigns</html>").expect("write index");

        let store = Arc::new(MemoryTopicStore::new());
        let options = HttpOptions {
            cors_origin: None,
            static_dir: Some(dir.clone()),
        };
        let app = build_app(AppState { store }, &options);
        let response = app
            .oneshot(get_request("/analytics"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(&body[..], b"<html>campaigns</html>");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn unknown_path_without_static_dir_is_404() {
        let (app, _) = memory_app();
        let (status, _) = send(&app, get_request("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
