//! Backend service: search and insert endpoints over the document-search engine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BackendConfig;
use crate::engine::{ElasticClient, SearchEngine, INDEX_NAME};
use crate::error::{ApiError, EngineError};
use crate::seed::SeedSource;
use crate::startup::{self, Readiness};

/// Shared app state: engine readiness, decided once at startup.
#[derive(Clone)]
pub struct AppState {
    pub readiness: Readiness,
}

impl AppState {
    pub fn new(readiness: Readiness) -> Self {
        Self { readiness }
    }

    fn engine(&self) -> Result<&dyn SearchEngine, ApiError> {
        self.readiness.engine().ok_or(ApiError::Unavailable)
    }
}

#[derive(Serialize)]
pub struct Message {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub message: String,
    pub document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Body of POST /insert. A missing `text` is treated like an empty one.
#[derive(Deserialize)]
pub struct InsertItem {
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize)]
pub struct InsertResponse {
    pub message: &'static str,
    pub inserted_id: String,
    pub result: String,
}

/// GET / -> liveness message.
pub async fn root() -> Json<Message> {
    Json(Message {
        message: "Backend is running",
    })
}

/// GET /search/:query -> best-scoring document for a match query on `text`.
pub async fn search_handler(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<SearchResponse>, ApiError> {
    let engine = state.engine()?;
    let hit = engine
        .search_best(INDEX_NAME, &query)
        .await
        .map_err(|e| {
            tracing::error!("Elasticsearch search error: {}", e);
            ApiError::from_engine(e, "Internal server error during search")
        })?;

    let response = match hit {
        None => SearchResponse {
            message: "No matching documents found.".to_string(),
            document: None,
            id: None,
        },
        Some(hit) => SearchResponse {
            message: match hit.score {
                Some(score) => format!("Found document with score {score}"),
                None => "Found document with score None".to_string(),
            },
            document: Some(hit.source),
            id: Some(hit.id),
        },
    };
    Ok(Json(response))
}

/// POST /insert -> write a document with an engine-assigned id and refresh.
pub async fn insert_handler(
    State(state): State<AppState>,
    Json(item): Json<InsertItem>,
) -> Result<Json<InsertResponse>, ApiError> {
    let engine = state.engine()?;
    if item.text.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "Input text cannot be empty.".to_string(),
        ));
    }

    let insert_failed = |e: EngineError| {
        tracing::error!("Elasticsearch insert error: {}", e);
        ApiError::from_engine(e, "Internal server error during insert")
    };
    let written = engine
        .index_document(INDEX_NAME, None, &item.text)
        .await
        .map_err(insert_failed)?;
    engine.refresh(INDEX_NAME).await.map_err(insert_failed)?;

    Ok(Json(InsertResponse {
        message: "Document inserted successfully!",
        inserted_id: written.id,
        result: written.result,
    }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/search/:query", get(search_handler))
        .route("/insert", post(insert_handler))
        .with_state(state)
}

/// Run startup against Elasticsearch, then serve until Ctrl+C.
pub async fn serve(config: BackendConfig) -> anyhow::Result<()> {
    let engine: Arc<dyn SearchEngine> = Arc::new(ElasticClient::new(
        config.engine_url()?,
        config.engine_timeout(),
    )?);
    tracing::info!(
        "Attempting to connect to Elasticsearch at {}:{}...",
        config.es_host,
        config.es_port
    );
    let source = SeedSource::new(reqwest::Client::new(), config.seed_url.clone());
    let readiness = startup::run(engine, &config.retry_policy(), &source).await;

    let app = router(AppState::new(readiness));
    tracing::info!("Backend listening on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    tracing::info!("Backend service shutting down.");
    Ok(())
}
