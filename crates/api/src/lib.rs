mod config;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Json, Multipart, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use farm_agents::ChatRouter;
use farm_core::{parse_question, ChatReply, StoreStats};
use farm_ml::{FreshnessModel, Generator, ModelError};
use farm_observability::{AppMetrics, MetricsSnapshot};
use farm_storage::{KnowledgeRepository, Store};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

pub use crate::config::{
    parse_origins, AppConfig, DEFAULT_BIND, DEFAULT_GENERATOR_MODEL, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use crate::rate_limit::IpRateLimiter;

pub const NO_FILE_MESSAGE: &str = "No file uploaded. Please upload with key 'file'.";
pub const EMPTY_FILENAME_MESSAGE: &str = "Empty filename.";
pub const MODEL_MISSING_MESSAGE: &str = "freshness model is not loaded";

pub type FarmRouter = ChatRouter<Store, Generator>;

#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<FarmRouter>,
    pub store: Arc<Store>,
    pub freshness: Option<FreshnessModel>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
    pub max_upload_bytes: usize,
}

impl ApiState {
    pub fn new(
        store: Store,
        generator: Generator,
        freshness: Option<FreshnessModel>,
        config: &AppConfig,
    ) -> Self {
        let metrics = AppMetrics::shared();
        let store = Arc::new(store);
        let router = Arc::new(ChatRouter::new(
            store.clone(),
            Arc::new(generator),
            metrics.clone(),
            config.generator_timeout,
        ));

        Self {
            router,
            store,
            freshness,
            metrics,
            limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
            allowed_origins: Arc::new(config.allowed_origins.clone()),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: MetricsSnapshot,
    store: StoreHealth,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct StoreHealth {
    backend: &'static str,
    stats: Option<StoreStats>,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    generator: bool,
    freshness_model: bool,
    burn_enabled: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn build_app(config: AppConfig) -> Result<Router> {
    let store = Store::open_seeded(config.database_url.as_deref()).await?;
    let generator = Generator::from_config(config.generator.clone())
        .context("failed to initialize text generator")?;
    let freshness = config
        .freshness_model
        .as_ref()
        .map(FreshnessModel::load)
        .transpose()
        .context("failed to load freshness model")?;

    if !generator.is_configured() {
        warn!("FARM_GENERATOR_URL not set; unanswered questions will get the apology reply");
    }
    if freshness.is_none() {
        warn!("FARM_FRESHNESS_MODEL not set; /predict will answer 503");
    }

    let state = ApiState::new(store, generator, freshness, &config);
    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/predict", post(predict))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(state.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = match state.store.stats().await {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!(error = %err, "store stats unavailable");
            None
        }
    };

    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        store: StoreHealth {
            backend: state.store.backend_name(),
            stats,
        },
        capabilities: HealthCapabilities {
            generator: state.router.generator().is_configured(),
            freshness_model: state.freshness.is_some(),
            burn_enabled: state
                .freshness
                .as_ref()
                .map(|model| model.burn_enabled)
                .unwrap_or(false),
        },
    };
    (StatusCode::OK, Json(payload))
}

/// Takes the raw body so malformed JSON maps onto the chat error replies
/// instead of axum's default rejection.
async fn chat(State(state): State<ApiState>, body: Bytes) -> Response {
    let question = match parse_question(&body) {
        Ok(question) => question,
        Err(err) => {
            state.metrics.inc_invalid_request();
            warn!(reason = %err, "chat request rejected");
            return (StatusCode::BAD_REQUEST, Json(ChatReply::new(err.to_string())))
                .into_response();
        }
    };

    let routed = state.router.reply(&question).await;
    (StatusCode::OK, Json(ChatReply::new(routed.reply))).into_response()
}

async fn predict(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let upload_id = Uuid::new_v4();
    let Ok(mut multipart) = multipart else {
        return error_response(StatusCode::BAD_REQUEST, NO_FILE_MESSAGE);
    };

    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes)),
                    Err(err) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("failed to read upload: {err}"),
                        )
                    }
                }
                break;
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(err) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("failed to read multipart body: {err}"),
                )
            }
        }
    }

    let Some((file_name, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, NO_FILE_MESSAGE);
    };
    if file_name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, EMPTY_FILENAME_MESSAGE);
    }
    let Some(model) = state.freshness.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, MODEL_MISSING_MESSAGE);
    };

    let size = bytes.len();
    let outcome = tokio::task::spawn_blocking(move || model.classify_image(&bytes)).await;

    match outcome {
        Ok(Ok(report)) => {
            state.metrics.inc_prediction();
            info!(
                upload_id = %upload_id,
                file_name = %file_name,
                bytes = size,
                predicted_class = %report.predicted_class,
                quality = report.quality.label(),
                "freshness prediction"
            );
            (StatusCode::OK, Json(report.to_payload())).into_response()
        }
        Ok(Err(err @ ModelError::Decode(_))) => {
            warn!(upload_id = %upload_id, file_name = %file_name, error = %err, "upload rejected");
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Ok(Err(err)) => {
            error!(upload_id = %upload_id, error = %err, "freshness inference failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(err) => {
            error!(upload_id = %upload_id, error = %err, "freshness worker panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "inference worker failed")
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        warn!(ip = %ip, path = request.uri().path(), "rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

/// First `x-forwarded-for` hop when a proxy sets it, otherwise the peer
/// address recorded by `into_make_service_with_connect_info`.
fn request_ip(request: &Request<Body>) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(forwarded) = forwarded {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
