//! Frontend service: serves the page and relays the two API calls to the backend.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use url::Url;

use crate::config::FrontendConfig;
use crate::error::ProxyError;

const INDEX_HTML: &str = include_str!("../templates/index.html");

/// Long-lived client and the backend root it talks to.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    backend: Arc<Url>,
}

impl ProxyState {
    pub fn new(client: reqwest::Client, backend: Url) -> Self {
        Self {
            client,
            backend: Arc::new(backend),
        }
    }

    pub fn from_config(config: &FrontendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.backend_timeout())
            .build()?;
        Ok(Self::new(client, config.backend_url()?))
    }

    /// Backend url with `segments` appended, each percent-encoded.
    fn backend_url(&self, segments: &[&str]) -> Result<Url, ProxyError> {
        let mut url = Url::clone(&self.backend);
        url.path_segments_mut()
            .map_err(|_| ProxyError::Internal(format!("backend url {} cannot be a base", self.backend)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Copy status, content type and body of a backend response.
async fn relay(resp: reqwest::Response) -> Result<Response, ProxyError> {
    let status = StatusCode::from_u16(resp.status().as_u16())
        .map_err(|e| ProxyError::Internal(e.to_string()))?;
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let body = resp.bytes().await?;

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| ProxyError::Internal(e.to_string()))
}

/// GET / -> search and insert page.
pub async fn index_page() -> Html<&'static str> {
    tracing::info!("Rendering index.html");
    Html(INDEX_HTML)
}

/// GET /ping -> liveness message.
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "Frontend is running" }))
}

/// GET /api/search/:query -> relay of backend GET /search/:query.
pub async fn proxy_search(
    State(state): State<ProxyState>,
    Path(query): Path<String>,
) -> Result<Response, ProxyError> {
    let url = state.backend_url(&["search", &query])?;
    tracing::info!("Proxying search request for query: '{}' to {}", query, url);
    let resp = state.client.get(url).send().await.map_err(|e| {
        tracing::error!("Request error while contacting backend for search: {}", e);
        ProxyError::Unreachable(e)
    })?;
    relay(resp).await
}

/// POST /api/insert -> relay of backend POST /insert with the same JSON body.
pub async fn proxy_insert(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Unexpected error in insert proxy: {}", e);
        ProxyError::Internal(e.to_string())
    })?;
    let url = state.backend_url(&["insert"])?;
    tracing::info!("Proxying insert request to {} with body: {}", url, payload);
    let resp = state
        .client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Request error while contacting backend for insert: {}", e);
            ProxyError::Unreachable(e)
        })?;
    relay(resp).await
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/ping", get(ping))
        .route("/api/search/:query", get(proxy_search))
        .route("/api/insert", post(proxy_insert))
        .with_state(state)
}

/// Serve the frontend until Ctrl+C.
pub async fn serve(config: FrontendConfig) -> anyhow::Result<()> {
    let state = ProxyState::from_config(&config)?;
    tracing::info!("Proxying API calls to {}", state.backend);

    let app = router(state);
    tracing::info!("Frontend listening on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    tracing::info!("Frontend service shutting down.");
    Ok(())
}
