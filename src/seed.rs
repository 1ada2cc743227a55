//! Seed content: fetch one page and extract a few paragraphs to make an empty index searchable.

use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::error::EngineError;

pub const DEFAULT_SEED_URL: &str = "https://en.wikipedia.org/wiki/India";

/// Element whose paragraphs are harvested.
const CONTENT_SELECTOR: &str = "#mw-content-text";
/// Only the first paragraphs in document order are considered.
const MAX_CANDIDATES: usize = 6;
/// At most this many of the candidates are accepted.
pub const MAX_SEED_DOCS: usize = 3;
/// Paragraphs must be strictly longer than this many characters.
const MIN_PARAGRAPH_CHARS: usize = 50;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to fetch seed page: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("invalid selector {0}")]
    Selector(String),

    #[error("could not find content element '{0}' on seed page")]
    MissingContent(&'static str),

    #[error("search engine error during seeding: {0}")]
    Engine(#[from] EngineError),
}

/// A document to write at first startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedDocument {
    pub id: String,
    pub text: String,
}

/// Where seed content comes from.
#[derive(Debug, Clone)]
pub struct SeedSource {
    client: reqwest::Client,
    url: Url,
}

impl SeedSource {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the page and turn its leading paragraphs into seed documents.
    pub async fn fetch_documents(&self) -> Result<Vec<SeedDocument>, SeedError> {
        let body = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_documents(&body)
    }
}

fn selector(css: &str) -> Result<Selector, SeedError> {
    Selector::parse(css).map_err(|e| SeedError::Selector(format!("{css}: {e}")))
}

/// Paragraph texts from the content element, filtered and capped.
pub fn extract_paragraphs(html: &str) -> Result<Vec<String>, SeedError> {
    let document = Html::parse_document(html);
    let content = document
        .select(&selector(CONTENT_SELECTOR)?)
        .next()
        .ok_or(SeedError::MissingContent(CONTENT_SELECTOR))?;

    let paragraph = selector("p")?;
    let paragraphs = content
        .select(&paragraph)
        .take(MAX_CANDIDATES)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|text| text.chars().count() > MIN_PARAGRAPH_CHARS)
        .take(MAX_SEED_DOCS)
        .collect();
    Ok(paragraphs)
}

/// Paragraphs with sequential `wiki_N` identifiers, starting at 1.
pub fn extract_documents(html: &str) -> Result<Vec<SeedDocument>, SeedError> {
    let docs = extract_paragraphs(html)?
        .into_iter()
        .enumerate()
        .map(|(i, text)| SeedDocument {
            id: format!("wiki_{}", i + 1),
            text,
        })
        .collect();
    Ok(docs)
}
