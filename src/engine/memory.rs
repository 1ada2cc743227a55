//! In-process engine: term-frequency index with TF-IDF ranking and refresh visibility.
//! Behaves like a single Elasticsearch node closely enough to drive the backend
//! without a network dependency, and can be made unreachable or made to reject
//! specific writes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use super::analyzer::analyze;
use super::{Hit, IndexMapping, IndexResponse, SearchEngine};
use crate::error::EngineError;

#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    text: String,
    /// term -> count in this document
    term_tf: HashMap<String, u32>,
}

impl StoredDoc {
    fn new(id: String, text: String) -> Self {
        let mut term_tf = HashMap::new();
        for term in analyze(&text) {
            *term_tf.entry(term).or_insert(0) += 1;
        }
        Self { id, text, term_tf }
    }
}

#[derive(Debug)]
struct MemoryIndex {
    mapping: IndexMapping,
    /// Searchable documents, in first-write order.
    docs: Vec<StoredDoc>,
    /// Written but not yet refreshed.
    pending: Vec<StoredDoc>,
}

impl MemoryIndex {
    fn new(mapping: IndexMapping) -> Self {
        Self {
            mapping,
            docs: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.docs.iter().chain(self.pending.iter()).any(|d| d.id == id)
    }

    fn refresh(&mut self) {
        for doc in self.pending.drain(..) {
            match self.docs.iter_mut().find(|d| d.id == doc.id) {
                Some(slot) => *slot = doc,
                None => self.docs.push(doc),
            }
        }
    }

    /// TF-IDF over visible docs. Returns (position, score) sorted by score descending;
    /// ties keep write order.
    fn search_ranked(&self, query: &str) -> Vec<(usize, f64)> {
        let terms = analyze(query);
        if terms.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }
        let n = self.docs.len() as f64;
        let mut scores = vec![0.0f64; self.docs.len()];
        for term in &terms {
            let df = self.docs.iter().filter(|d| d.term_tf.contains_key(term)).count() as f64;
            if df == 0.0 {
                continue;
            }
            let idf = ((n + 1.0) / (df + 1.0)).ln() + 1.0;
            for (pos, doc) in self.docs.iter().enumerate() {
                if let Some(&tf) = doc.term_tf.get(term) {
                    scores[pos] += tf as f64 * idf;
                }
            }
        }
        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, s)| *s > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

fn index_not_found(index: &str) -> EngineError {
    EngineError::Rejected {
        status: 404,
        info: json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": format!("no such index [{index}]"),
                "index": index
            },
            "status": 404
        }),
    }
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    indices: RwLock<HashMap<String, MemoryIndex>>,
    rejected_ids: RwLock<HashSet<String>>,
    unreachable: AtomicBool,
    failing_pings: AtomicU32,
    pings: AtomicU32,
    next_id: AtomicU64,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with `Unavailable` while set.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// The next `n` pings report the engine as not reachable.
    pub fn fail_pings(&self, n: u32) {
        self.failing_pings.store(n, Ordering::SeqCst);
    }

    /// Number of pings received so far.
    pub fn ping_count(&self) -> u32 {
        self.pings.load(Ordering::SeqCst)
    }

    /// Writes of a document with this explicit id are rejected.
    pub async fn reject_document(&self, id: &str) {
        self.rejected_ids.write().await.insert(id.to_string());
    }

    pub async fn index_count(&self) -> usize {
        self.indices.read().await.len()
    }

    pub async fn mapping(&self, index: &str) -> Option<IndexMapping> {
        self.indices.read().await.get(index).map(|i| i.mapping.clone())
    }

    /// Text of a visible document, by id.
    pub async fn document(&self, index: &str, id: &str) -> Option<String> {
        let indices = self.indices.read().await;
        let found = indices.get(index)?.docs.iter().find(|d| d.id == id)?;
        Some(found.text.clone())
    }

    fn ensure_reachable(&self) -> Result<(), EngineError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn ping(&self) -> Result<bool, EngineError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.ensure_reachable()?;
        let failing = self
            .failing_pings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        Ok(!failing)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        self.ensure_reachable()?;
        Ok(self.indices.read().await.contains_key(index))
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        self.indices
            .write()
            .await
            .entry(index.to_string())
            .or_insert_with(|| MemoryIndex::new(mapping.clone()));
        Ok(())
    }

    async fn count(&self, index: &str) -> Result<u64, EngineError> {
        self.ensure_reachable()?;
        let indices = self.indices.read().await;
        let idx = indices.get(index).ok_or_else(|| index_not_found(index))?;
        Ok(idx.docs.len() as u64)
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        text: &str,
    ) -> Result<IndexResponse, EngineError> {
        self.ensure_reachable()?;
        if let Some(id) = id {
            if self.rejected_ids.read().await.contains(id) {
                return Err(EngineError::Rejected {
                    status: 400,
                    info: json!({
                        "error": { "type": "document_parsing_exception", "reason": format!("rejected [{id}]") },
                        "status": 400
                    }),
                });
            }
        }
        let id = match id {
            Some(id) => id.to_string(),
            None => format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        };

        let mut indices = self.indices.write().await;
        // writes to a missing index create it, as Elasticsearch does
        let idx = indices
            .entry(index.to_string())
            .or_insert_with(|| MemoryIndex::new(IndexMapping { fields: Vec::new() }));
        let result = if idx.contains(&id) { "updated" } else { "created" };
        idx.pending.retain(|d| d.id != id);
        idx.pending.push(StoredDoc::new(id.clone(), text.to_string()));
        Ok(IndexResponse {
            id,
            result: result.to_string(),
        })
    }

    async fn search_best(&self, index: &str, query: &str) -> Result<Option<Hit>, EngineError> {
        self.ensure_reachable()?;
        let indices = self.indices.read().await;
        let idx = indices.get(index).ok_or_else(|| index_not_found(index))?;
        Ok(idx.search_ranked(query).first().map(|&(pos, score)| {
            let doc = &idx.docs[pos];
            Hit {
                id: doc.id.clone(),
                score: Some(score),
                source: json!({ "text": doc.text }),
            }
        }))
    }

    async fn refresh(&self, index: &str) -> Result<(), EngineError> {
        self.ensure_reachable()?;
        let mut indices = self.indices.write().await;
        let idx = indices.get_mut(index).ok_or_else(|| index_not_found(index))?;
        idx.refresh();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::INDEX_NAME;

    async fn engine_with(texts: &[&str]) -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine
            .create_index(INDEX_NAME, &IndexMapping::documents())
            .await
            .unwrap();
        for (i, text) in texts.iter().enumerate() {
            let id = format!("doc_{}", i + 1);
            engine
                .index_document(INDEX_NAME, Some(&id), text)
                .await
                .unwrap();
        }
        engine.refresh(INDEX_NAME).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn higher_term_frequency_wins() {
        let engine = engine_with(&["rust is a language", "rust rust rust everywhere", "python"]).await;
        let hit = engine.search_best(INDEX_NAME, "rust").await.unwrap().unwrap();
        assert_eq!(hit.id, "doc_2");
        assert_eq!(hit.source, json!({ "text": "rust rust rust everywhere" }));
    }

    #[tokio::test]
    async fn rare_terms_outweigh_common_ones() {
        let engine = engine_with(&["the cat", "the dog", "the bird"]).await;
        let hit = engine.search_best(INDEX_NAME, "the dog").await.unwrap().unwrap();
        assert_eq!(hit.id, "doc_2");
    }

    #[tokio::test]
    async fn no_matching_terms_is_no_hit() {
        let engine = engine_with(&["alpha", "beta"]).await;
        assert!(engine.search_best(INDEX_NAME, "gamma").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_are_invisible_until_refresh() {
        let engine = engine_with(&[]).await;
        engine
            .index_document(INDEX_NAME, None, "fresh document")
            .await
            .unwrap();
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 0);
        assert!(engine.search_best(INDEX_NAME, "fresh").await.unwrap().is_none());

        engine.refresh(INDEX_NAME).await.unwrap();
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 1);
        assert!(engine.search_best(INDEX_NAME, "fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rewriting_an_id_reports_updated() {
        let engine = engine_with(&["first"]).await;
        let resp = engine
            .index_document(INDEX_NAME, Some("doc_1"), "second")
            .await
            .unwrap();
        assert_eq!(resp.result, "updated");
        engine.refresh(INDEX_NAME).await.unwrap();
        assert_eq!(engine.count(INDEX_NAME).await.unwrap(), 1);
        assert_eq!(engine.document(INDEX_NAME, "doc_1").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn assigned_ids_are_distinct() {
        let engine = engine_with(&[]).await;
        let a = engine.index_document(INDEX_NAME, None, "same").await.unwrap();
        let b = engine.index_document(INDEX_NAME, None, "same").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.result, "created");
        assert_eq!(b.result, "created");
    }

    #[tokio::test]
    async fn create_index_keeps_original_mapping() {
        let engine = engine_with(&[]).await;
        engine
            .create_index(INDEX_NAME, &IndexMapping { fields: Vec::new() })
            .await
            .unwrap();
        assert_eq!(engine.index_count().await, 1);
        assert_eq!(engine.mapping(INDEX_NAME).await, Some(IndexMapping::documents()));
    }

    #[tokio::test]
    async fn missing_index_is_rejected_with_404() {
        let engine = MemoryEngine::new();
        let err = engine.count(INDEX_NAME).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn unreachable_engine_fails_every_call() {
        let engine = engine_with(&["text"]).await;
        engine.set_reachable(false);
        assert!(matches!(engine.ping().await, Err(EngineError::Unavailable(_))));
        assert!(matches!(
            engine.search_best(INDEX_NAME, "text").await,
            Err(EngineError::Unavailable(_))
        ));
        engine.set_reachable(true);
        assert!(engine.ping().await.unwrap());
    }

    #[tokio::test]
    async fn failing_pings_recover_after_n_probes() {
        let engine = MemoryEngine::new();
        engine.fail_pings(2);
        assert!(!engine.ping().await.unwrap());
        assert!(!engine.ping().await.unwrap());
        assert!(engine.ping().await.unwrap());
        assert_eq!(engine.ping_count(), 3);
    }
}
