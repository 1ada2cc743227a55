//! Search engine seam: the operations the backend consumes from the external
//! document-search engine, plus the Elasticsearch and in-memory implementations.

pub mod analyzer;
pub mod elastic;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::EngineError;

pub use elastic::ElasticClient;
pub use memory::MemoryEngine;

/// Name of the single collection this system owns.
pub const INDEX_NAME: &str = "my_index";

/// How the engine treats a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Exact-match token.
    Keyword,
    /// Full-text analyzed.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    pub kind: FieldKind,
}

/// Field mapping a collection is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMapping {
    pub fields: Vec<FieldMapping>,
}

impl IndexMapping {
    /// `id` as keyword, `text` as analyzed text.
    pub fn documents() -> Self {
        Self {
            fields: vec![
                FieldMapping {
                    name: "id".to_string(),
                    kind: FieldKind::Keyword,
                },
                FieldMapping {
                    name: "text".to_string(),
                    kind: FieldKind::Text,
                },
            ],
        }
    }

    /// Render as the engine's `{"properties": {...}}` object.
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), json!({ "type": f.kind })))
            .collect();
        json!({ "properties": properties })
    }
}

/// Top-scoring search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: String,
    pub score: Option<f64>,
    pub source: Value,
}

/// Outcome of a document write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResponse {
    pub id: String,
    /// Engine write classification, e.g. `created` or `updated`.
    pub result: String,
}

/// Operations consumed from the document-search engine.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Reachability probe. `Ok(false)` means the engine answered but is not usable.
    async fn ping(&self) -> Result<bool, EngineError>;

    async fn index_exists(&self, index: &str) -> Result<bool, EngineError>;

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<(), EngineError>;

    /// Number of searchable documents in `index`.
    async fn count(&self, index: &str) -> Result<u64, EngineError>;

    /// Write a document with body `{"text": text}`. With `id: None` the engine
    /// assigns the identifier.
    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        text: &str,
    ) -> Result<IndexResponse, EngineError>;

    /// Match query against `text`, returning only the highest-scoring hit.
    async fn search_best(&self, index: &str, query: &str) -> Result<Option<Hit>, EngineError>;

    /// Make recent writes visible to `count` and `search_best`.
    async fn refresh(&self, index: &str) -> Result<(), EngineError>;
}
