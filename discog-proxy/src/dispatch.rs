//! Request entry point: decide between server-rendering and pass-through.

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, CatalogSource};
use crate::classify::{extract_locator, AgentKind, Classifier};
use crate::config::Config;
use crate::detail::{DetailError, DetailSource};
use crate::origin::{ForwardRequest, Origin};
use crate::render::render;
use crate::resolver::{resolve, RequestLocator};

/// Immutable per-process state. Nothing in here changes between requests.
pub struct EdgeState {
    pub config: Config,
    pub classifier: Classifier,
    pub catalog: Arc<dyn CatalogSource>,
    pub details: Arc<dyn DetailSource>,
    pub origin: Arc<dyn Origin>,
}

/// Failures of the render pipeline that are shown to the caller instead of
/// falling back to the origin.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Detail(#[from] DetailError),
}

impl PipelineError {
    fn code(&self) -> &'static str {
        match self {
            PipelineError::Catalog(CatalogError::Unavailable(_)) => "catalog_unavailable",
            PipelineError::Catalog(CatalogError::Malformed(_)) => "catalog_malformed",
            PipelineError::Detail(DetailError::Unavailable(_)) => "detail_unavailable",
            PipelineError::Detail(DetailError::Malformed(_)) => "detail_malformed",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            PipelineError::Catalog(CatalogError::Unavailable(_))
            | PipelineError::Detail(DetailError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Catalog(CatalogError::Malformed(_))
            | PipelineError::Detail(DetailError::Malformed(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        diagnostic(self.status(), self.code(), &self.to_string())
    }
}

fn diagnostic(status: StatusCode, code: &str, details: &str) -> Response {
    let body = serde_json::json!({
        "error": code,
        "details": details,
    });
    (
        status,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body.to_string(),
    )
        .into_response()
}

/// What to do with a request, decided before any outbound call.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Forward(&'static str),
    Render(RequestLocator),
}

fn route(state: &EdgeState, request: &Request) -> Route {
    let locator = match extract_locator(
        request.uri(),
        &state.config.player_path,
        state.config.max_track_id,
    ) {
        Ok(Some(locator)) => locator,
        Ok(None) => return Route::Forward("no locator"),
        Err(e) => {
            debug!("{e}");
            return Route::Forward("invalid locator");
        }
    };

    if state.classifier.classify_headers(request.headers()) != AgentKind::Crawler {
        return Route::Forward("not a crawler");
    }
    let method = request.method();
    if method != Method::GET && method != Method::HEAD {
        return Route::Forward("method not renderable");
    }

    Route::Render(locator)
}

pub fn edge_router(state: Arc<EdgeState>) -> Router {
    Router::new()
        .route("/_edge/health", get(health))
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({ "status": "ok" }).to_string(),
    )
        .into_response()
}

async fn dispatch(State(state): State<Arc<EdgeState>>, request: Request) -> Response {
    let decision = route(&state, &request);
    let locator = match decision {
        Route::Forward(reason) => {
            debug!("forwarding {} ({reason})", request.uri());
            return forward(&state, request).await;
        }
        Route::Render(locator) => locator,
    };

    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    info!("crawler request for {locator}, user-agent: {user_agent}");

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let request_url = format!("{}{path_and_query}", state.config.site_url);

    match render_page(&state, &locator, &request_url).await {
        Ok(Some(page)) => page,
        Ok(None) => forward(&state, request).await,
        Err(e) => {
            warn!("render pipeline failed for {locator}: {e}");
            e.into_response()
        }
    }
}

/// Fetch, resolve, render. `Ok(None)` when the locator matches no song.
async fn render_page(
    state: &EdgeState,
    locator: &RequestLocator,
    request_url: &str,
) -> Result<Option<Response>, PipelineError> {
    let catalog = state.catalog.fetch_catalog().await?;

    let resolved = match resolve(locator, &catalog) {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!("nothing to render: {e}");
            return Ok(None);
        }
    };

    let detail = state
        .details
        .fetch_detail(resolved.album.id, resolved.song.id)
        .await?;

    let document = render(&resolved, &detail, request_url, &state.config);
    Ok(Some(document.into_response()))
}

async fn forward(state: &EdgeState, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, state.config.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            warn!("request body for {} rejected: {e}", parts.uri);
            return diagnostic(StatusCode::PAYLOAD_TOO_LARGE, "body_too_large", &e.to_string());
        }
    };

    let forward_request = ForwardRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };

    match state.origin.forward(forward_request).await {
        Ok(resp) => resp.into_response(),
        Err(e) => {
            warn!("{e}");
            diagnostic(StatusCode::BAD_GATEWAY, "origin_unavailable", &e.to_string())
        }
    }
}
