//! HTTP transport.
//!
//! Registers one axum route per endpoint of the default table and the
//! administrative routes that feed the engine's update operation.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, MethodFilter, MethodRouter};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::{MockServerConfig, UpdateRequest};
use crate::engine::{Resolution, ResolutionEngine};
use crate::error::ValidationError;
use crate::model::{EndpointKey, HttpMethod};
use crate::openapi::OpenApiDocument;
use crate::registry::build_registry;

/// Application state shared across all handlers.
pub type AppState = Arc<ResolutionEngine>;

/// HTTP-facing error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No candidate or route matched.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for HttpError {
    fn from(err: ValidationError) -> Self {
        HttpError::BadRequest(err.to_string())
    }
}

/// Derive the default table from `spec`, build the engine and apply the
/// configured overrides in order.
pub fn bootstrap(
    spec: &OpenApiDocument,
    config: MockServerConfig,
) -> anyhow::Result<AppState> {
    config.validate()?;
    let defaults = build_registry(spec)?;

    let MockServerConfig {
        settings,
        overrides,
    } = config;
    let engine = ResolutionEngine::with_settings(defaults, settings);

    for (i, update) in overrides.iter().enumerate() {
        let (key, response) = update
            .validate()
            .map_err(|e| anyhow::anyhow!("Override {}: {}", i, e))?;
        engine.update(key, response);
    }

    Ok(Arc::new(engine))
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Options => MethodFilter::OPTIONS,
        HttpMethod::Head => MethodFilter::HEAD,
    }
}

/// Whether axum can register `path` as-is. OpenAPI `{param}` templates are
/// accepted when they span a whole segment.
fn is_routable(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    rest.split('/').all(|segment| {
        if segment.starts_with(':') || segment.starts_with('*') {
            return false;
        }
        if segment.contains('{') || segment.contains('}') {
            return segment.starts_with('{')
                && segment.ends_with('}')
                && segment.len() > 2
                && segment[1..segment.len() - 1]
                    .chars()
                    .all(|c| c != '{' && c != '}' && c != '*');
        }
        true
    })
}

/// Path with parameter names erased; axum rejects two routes of the same
/// shape.
fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with('{') { "{}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the router: spec endpoints plus administrative routes.
pub fn build_router(engine: AppState) -> Router {
    let prefix = engine.settings().admin_prefix.clone();
    let admin_paths = [
        format!("{prefix}/update"),
        format!("{prefix}/config"),
        format!("{prefix}/stats"),
    ];

    // Group methods per path; axum takes one MethodRouter per path.
    let mut by_path: BTreeMap<&str, Vec<HttpMethod>> = BTreeMap::new();
    for key in engine.defaults().keys() {
        by_path.entry(key.path.as_str()).or_default().push(key.method);
    }

    let mut shapes = HashSet::new();
    let mut router = Router::new();
    for (path, methods) in by_path {
        if admin_paths.iter().any(|admin| admin == path) {
            warn!(path, "Spec path collides with an administrative route, skipping");
            continue;
        }
        if !is_routable(path) {
            warn!(path, "Spec path cannot be routed, skipping");
            continue;
        }
        if !shapes.insert(route_shape(path)) {
            warn!(path, "Spec path differs from another only by parameter names, skipping");
            continue;
        }

        let mut method_router: MethodRouter<AppState> = MethodRouter::new();
        for method in methods {
            let key = EndpointKey::new(method, path);
            debug!(endpoint = %key, "Registering route");
            method_router = method_router.on(
                method_filter(method),
                move |State(engine): State<AppState>, body: Bytes| {
                    let key = key.clone();
                    async move { handle_mock(&engine, &key, &body) }
                },
            );
        }
        router = router.route(path, method_router);
    }

    let [update_path, config_path, stats_path] = admin_paths;
    router
        .route(&update_path, post(update_mock))
        .route(&config_path, get(mock_config))
        .route(&stats_path, get(mock_stats))
        .fallback(no_route)
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Parse a request body; an absent body reads as an empty object.
fn parse_body(body: &[u8]) -> Result<Value, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| HttpError::BadRequest(format!("Invalid JSON request body: {e}")))
}

fn handle_mock(engine: &ResolutionEngine, key: &EndpointKey, body: &[u8]) -> Response {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(err) => return err.into_response(),
    };

    match engine.resolve(key, &body) {
        Resolution::Matched(response) => match StatusCode::from_u16(response.status_code) {
            Ok(status) => (status, Json(response.body)).into_response(),
            Err(_) => HttpError::Internal(format!(
                "invalid status code {} for {}",
                response.status_code, key
            ))
            .into_response(),
        },
        Resolution::NotFound => {
            HttpError::NotFound(format!("No matching mock response for {key}")).into_response()
        }
    }
}

async fn update_mock(
    State(engine): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, HttpError> {
    let (key, response) = UpdateRequest::from_json(&body)?.validate()?;
    engine.update(key, response);
    Ok(Json(json!({ "msg": "Mock updated successfully" })))
}

async fn mock_config(State(engine): State<AppState>) -> impl IntoResponse {
    Json(engine.snapshot())
}

async fn mock_stats(State(engine): State<AppState>) -> impl IntoResponse {
    Json(engine.stats())
}

async fn no_route(method: Method, uri: Uri) -> HttpError {
    HttpError::NotFound(format!("No route for {} {}", method, uri.path()))
}

/// Serve `router` on `listener` until ctrl-c.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Mock server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
