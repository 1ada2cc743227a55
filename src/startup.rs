//! Backend startup: wait for the engine, ensure the collection, seed it if empty.

use std::sync::Arc;

use crate::engine::{IndexMapping, SearchEngine, INDEX_NAME};
use crate::error::EngineError;
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::seed::{SeedError, SeedSource};

/// Whether the backend has a usable engine.
#[derive(Clone)]
pub enum Readiness {
    NotReady,
    Ready(Arc<dyn SearchEngine>),
}

impl Readiness {
    pub fn engine(&self) -> Option<&dyn SearchEngine> {
        match self {
            Readiness::NotReady => None,
            Readiness::Ready(engine) => Some(engine.as_ref()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The collection already held documents.
    Skipped { existing: u64 },
    /// The page had no usable paragraphs.
    NothingToSeed,
    Seeded { written: usize, failed: usize },
}

/// Probe the engine until it answers a ping, per `policy`.
pub async fn connect(engine: &dyn SearchEngine, policy: &RetryPolicy) -> Result<u32, RetryExhausted> {
    policy.run("Elasticsearch", |_| engine.ping()).await
}

/// Create the collection with the document mapping unless it exists.
pub async fn ensure_collection(
    engine: &dyn SearchEngine,
    index: &str,
) -> Result<EnsureOutcome, EngineError> {
    if engine.index_exists(index).await? {
        tracing::info!("Index '{}' already exists.", index);
        return Ok(EnsureOutcome::AlreadyExists);
    }
    tracing::info!("Index '{}' not found. Creating...", index);
    engine.create_index(index, &IndexMapping::documents()).await?;
    tracing::info!("Index '{}' created successfully.", index);
    Ok(EnsureOutcome::Created)
}

/// Seed the collection from `source` when it holds no documents.
///
/// Individual write failures are logged and skipped; the collection is refreshed
/// at the end regardless.
pub async fn seed_if_empty(
    engine: &dyn SearchEngine,
    index: &str,
    source: &SeedSource,
) -> Result<SeedOutcome, SeedError> {
    let existing = engine.count(index).await?;
    if existing > 0 {
        tracing::info!("Initial data already seems to be present. Skipping insertion.");
        return Ok(SeedOutcome::Skipped { existing });
    }

    tracing::info!("Fetching content from {} for initial data...", source.url());
    let docs = source.fetch_documents().await?;
    if docs.is_empty() {
        tracing::warn!("No suitable paragraphs found for initial insertion.");
        return Ok(SeedOutcome::NothingToSeed);
    }

    tracing::info!("Inserting {} initial documents...", docs.len());
    let mut written = 0;
    let mut failed = 0;
    for doc in &docs {
        match engine.index_document(index, Some(&doc.id), &doc.text).await {
            Ok(_) => written += 1,
            Err(e) => {
                tracing::error!("Error indexing document id {}: {}", doc.id, e);
                failed += 1;
            }
        }
    }

    engine.refresh(index).await?;
    tracing::info!("Initial data insertion complete.");
    Ok(SeedOutcome::Seeded { written, failed })
}

/// Full startup sequence. Never fails: every problem is logged, and an engine that
/// never answers leaves the backend `NotReady`.
pub async fn run(engine: Arc<dyn SearchEngine>, policy: &RetryPolicy, source: &SeedSource) -> Readiness {
    tracing::info!("Backend service starting up...");
    match connect(engine.as_ref(), policy).await {
        Ok(attempt) => tracing::info!(
            "Successfully connected to Elasticsearch (attempt {}).",
            attempt
        ),
        Err(e) => {
            tracing::error!(
                "FATAL: Failed to connect to Elasticsearch ({}). Backend might not function correctly.",
                e
            );
            return Readiness::NotReady;
        }
    }

    if let Err(e) = ensure_collection(engine.as_ref(), INDEX_NAME).await {
        tracing::error!("Failed to check or create index '{}': {}", INDEX_NAME, e);
    }
    if let Err(e) = seed_if_empty(engine.as_ref(), INDEX_NAME, source).await {
        tracing::error!("Initial data insertion failed: {}", e);
    }

    Readiness::Ready(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use std::time::Duration;
    use url::Url;

    fn unreachable_source() -> SeedSource {
        // port 9 (discard) on loopback; nothing listens there in tests
        SeedSource::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/wiki/India").unwrap(),
        )
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let engine = MemoryEngine::new();
        assert_eq!(
            ensure_collection(&engine, INDEX_NAME).await.unwrap(),
            EnsureOutcome::Created
        );
        assert_eq!(
            ensure_collection(&engine, INDEX_NAME).await.unwrap(),
            EnsureOutcome::AlreadyExists
        );
        assert_eq!(engine.index_count().await, 1);
        assert_eq!(engine.mapping(INDEX_NAME).await, Some(IndexMapping::documents()));
    }

    #[tokio::test]
    async fn seeding_is_skipped_when_documents_exist() {
        let engine = MemoryEngine::new();
        ensure_collection(&engine, INDEX_NAME).await.unwrap();
        engine
            .index_document(INDEX_NAME, None, "already here")
            .await
            .unwrap();
        engine.refresh(INDEX_NAME).await.unwrap();

        // the source is never contacted, so an unreachable one is fine
        let outcome = seed_if_empty(&engine, INDEX_NAME, &unreachable_source())
            .await
            .unwrap();
        assert_eq!(outcome, SeedOutcome::Skipped { existing: 1 });
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreachable_seed_source_is_an_error_not_a_panic() {
        let engine = MemoryEngine::new();
        ensure_collection(&engine, INDEX_NAME).await.unwrap();
        let err = seed_if_empty(&engine, INDEX_NAME, &unreachable_source())
            .await
            .unwrap_err();
        assert!(matches!(err, SeedError::Fetch(_)));
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_connect_leaves_backend_not_ready() {
        let engine = Arc::new(MemoryEngine::new());
        engine.set_reachable(false);
        let policy = RetryPolicy::new(3, Duration::from_secs(5));

        let readiness = run(engine.clone(), &policy, &unreachable_source()).await;

        assert!(!readiness.is_ready());
        assert_eq!(engine.ping_count(), 3);
        assert_eq!(engine.index_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_slow_engine_keeps_existing_data() {
        let engine = Arc::new(MemoryEngine::new());
        ensure_collection(engine.as_ref(), INDEX_NAME).await.unwrap();
        engine
            .index_document(INDEX_NAME, Some("wiki_1"), "seeded on a previous run")
            .await
            .unwrap();
        engine.refresh(INDEX_NAME).await.unwrap();
        engine.fail_pings(2);
        let policy = RetryPolicy::new(5, Duration::from_secs(5));

        let readiness = run(engine.clone(), &policy, &unreachable_source()).await;

        assert!(readiness.is_ready());
        assert_eq!(engine.ping_count(), 3);
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 1);
        assert_eq!(engine.index_count().await, 1);
    }

    #[tokio::test]
    async fn startup_survives_seed_failure() {
        let engine = Arc::new(MemoryEngine::new());
        let policy = RetryPolicy::new(1, Duration::from_secs(5));

        let readiness = run(engine.clone(), &policy, &unreachable_source()).await;

        assert!(readiness.is_ready());
        assert!(engine.index_exists(INDEX_NAME).await.unwrap());
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 0);
    }
}
