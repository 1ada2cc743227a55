//! Elasticsearch REST client over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{Hit, IndexMapping, IndexResponse, SearchEngine};
use crate::error::EngineError;

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

#[derive(Deserialize)]
struct CountBody {
    count: u64,
}

#[derive(Deserialize)]
struct WriteBody {
    #[serde(rename = "_id")]
    id: String,
    result: String,
}

#[derive(Deserialize)]
struct SearchBody {
    hits: HitsBody,
}

#[derive(Deserialize)]
struct HitsBody {
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Client for one Elasticsearch node, e.g. `http://elasticsearch:9200/`.
#[derive(Clone)]
pub struct ElasticClient {
    http: reqwest::Client,
    base: Url,
}

impl ElasticClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Protocol(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base })
    }

    /// Append percent-encoded path segments to the node url.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, EngineError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Protocol(format!("engine url {} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Pass 2xx responses through; turn anything else into `Rejected` with the body as diagnostic.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, EngineError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let bytes = resp.bytes().await?;
    let info = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Err(EngineError::Rejected {
        status: status.as_u16(),
        info,
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, EngineError> {
    let bytes = check(resp).await?.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| EngineError::Protocol(e.to_string()))
}

fn already_exists(info: &Value) -> bool {
    info.pointer("/error/type").and_then(Value::as_str) == Some(ALREADY_EXISTS)
}

#[async_trait]
impl SearchEngine for ElasticClient {
    async fn ping(&self) -> Result<bool, EngineError> {
        let resp = self.http.get(self.base.clone()).send().await?;
        Ok(resp.status().is_success())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, EngineError> {
        let resp = self.http.head(self.endpoint(&[index])?).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check(resp).await.map(|_| true),
        }
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<(), EngineError> {
        let body = json!({ "mappings": mapping.to_json() });
        let resp = self
            .http
            .put(self.endpoint(&[index])?)
            .json(&body)
            .send()
            .await?;
        match check(resp).await {
            Ok(_) => Ok(()),
            // lost a creation race with another writer; the index is there either way
            Err(EngineError::Rejected { info, .. }) if already_exists(&info) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn count(&self, index: &str) -> Result<u64, EngineError> {
        let resp = self
            .http
            .get(self.endpoint(&[index, "_count"])?)
            .send()
            .await?;
        let body: CountBody = decode(resp).await?;
        Ok(body.count)
    }

    async fn index_document(
        &self,
        index: &str,
        id: Option<&str>,
        text: &str,
    ) -> Result<IndexResponse, EngineError> {
        let doc = json!({ "text": text });
        let request = match id {
            Some(id) => self.http.put(self.endpoint(&[index, "_doc", id])?),
            None => self.http.post(self.endpoint(&[index, "_doc"])?),
        };
        let body: WriteBody = decode(request.json(&doc).send().await?).await?;
        Ok(IndexResponse {
            id: body.id,
            result: body.result,
        })
    }

    async fn search_best(&self, index: &str, query: &str) -> Result<Option<Hit>, EngineError> {
        let body = json!({
            "query": { "match": { "text": { "query": query } } },
            "size": 1
        });
        let resp = self
            .http
            .post(self.endpoint(&[index, "_search"])?)
            .json(&body)
            .send()
            .await?;
        let body: SearchBody = decode(resp).await?;
        Ok(body.hits.hits.into_iter().next().map(|h| Hit {
            id: h.id,
            score: h.score,
            source: h.source,
        }))
    }

    async fn refresh(&self, index: &str) -> Result<(), EngineError> {
        let resp = self
            .http
            .post(self.endpoint(&[index, "_refresh"])?)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }
}
