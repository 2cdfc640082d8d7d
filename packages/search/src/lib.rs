#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Structured address search.
//!
//! [`StructuredSearchHandler`] compiles a [`StructuredAddressRequest`]
//! into a strict query, runs it against a [`SearchBackend`], and falls
//! back to a single lenient query when the strict one finds nothing.
//!
//! Two backends are provided: [`OpenSearchBackend`] for a remote cluster
//! and [`TantivyBackend`] for a local index. [`create_backend`] picks one
//! from a [`SearchConfig`].

pub mod config;
pub mod local;
pub mod opensearch;

use std::borrow::Cow;
use std::time::Duration;

use geosearch_index::IndexError;
use geosearch_query::{MatchMode, QueryError, StructuredAddressRequest, compile_request};
use geosearch_query_models::QueryNode;
use geosearch_search_models::{BackendConfig, PlaceResult, SearchConfig, SearchHits};

pub use config::{ConfigError, load_config};
pub use local::TantivyBackend;
pub use opensearch::OpenSearchBackend;

/// Errors from running a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// HTTP request to the search cluster failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend did not answer in time.
    #[error("Search timed out after {secs}s")]
    Timeout {
        /// Configured timeout.
        secs: u64,
    },

    /// The search cluster rejected the query.
    #[error("Search backend returned status {status}: {body}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The backend response could not be understood.
    #[error("Failed to parse search response: {message}")]
    Parse {
        /// What was wrong.
        message: String,
    },

    /// Local index error.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// The request could not be compiled.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Async task join error.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Something that can answer a compiled query.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Runs `query` and returns up to `limit` hits, best first.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the backend cannot be reached or its
    /// answer cannot be read.
    async fn execute(&self, query: &QueryNode, limit: usize) -> Result<SearchHits, SearchError>;
}

#[async_trait::async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for Box<T> {
    async fn execute(&self, query: &QueryNode, limit: usize) -> Result<SearchHits, SearchError> {
        (**self).execute(query, limit).await
    }
}

/// Number of hits to fetch for a request asking for `limit` results.
///
/// Leaves headroom for deduplicating near-identical places downstream.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn extended_limit(limit: usize) -> usize {
    if limit <= 1 {
        1
    } else {
        (limit as f64 * 1.5).round() as usize
    }
}

/// Runs structured address requests against a backend.
#[derive(Debug, Clone)]
pub struct StructuredSearchHandler<B> {
    backend: B,
    languages: Vec<String>,
}

impl<B: SearchBackend> StructuredSearchHandler<B> {
    /// Creates a handler.
    ///
    /// `languages` fills in the supported languages of requests that do
    /// not list any.
    #[must_use]
    pub const fn new(backend: B, languages: Vec<String>) -> Self {
        Self {
            backend,
            languages,
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Searches for `request`.
    ///
    /// Runs the strict query first. Only if it matches no document at all
    /// is the lenient query run, once, with the same limit. Backend errors
    /// are returned as-is without a retry.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if compilation or a backend call fails.
    pub async fn search(
        &self,
        request: &StructuredAddressRequest,
    ) -> Result<Vec<PlaceResult>, SearchError> {
        let request = self.with_languages(request);
        let limit = extended_limit(request.limit());

        let mut hits = self.run(&request, MatchMode::Strict, limit).await?;

        if hits.total_hits == 0 {
            log::debug!("Strict query found nothing, retrying leniently (limit {limit})");
            hits = self.run(&request, MatchMode::Lenient, limit).await?;
        }

        Ok(hits
            .hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| PlaceResult {
                place: hit.place,
                score: hit.score,
                rank: i + 1,
            })
            .collect())
    }

    async fn run(
        &self,
        request: &StructuredAddressRequest,
        mode: MatchMode,
        limit: usize,
    ) -> Result<SearchHits, SearchError> {
        let query = compile_request(request, mode)?;
        let hits = self.backend.execute(&query, limit).await?;
        log::debug!("{mode} query: {} total hits", hits.total_hits);
        Ok(hits)
    }

    fn with_languages<'a>(
        &self,
        request: &'a StructuredAddressRequest,
    ) -> Cow<'a, StructuredAddressRequest> {
        if request.supported_languages.is_empty() && !self.languages.is_empty() {
            Cow::Owned(
                request
                    .clone()
                    .with_supported_languages(self.languages.iter().cloned()),
            )
        } else {
            Cow::Borrowed(request)
        }
    }
}

/// Creates the backend described by `config`.
///
/// # Errors
///
/// * If the HTTP client cannot be built
/// * If the local index cannot be opened
pub fn create_backend(config: &SearchConfig) -> Result<Box<dyn SearchBackend>, SearchError> {
    let timeout = Duration::from_secs(config.query_timeout_secs);

    match &config.backend {
        BackendConfig::OpenSearch { base_url, index } => {
            log::info!("Using OpenSearch backend at {base_url} (index {index})");
            Ok(Box::new(OpenSearchBackend::new(
                base_url.as_str(),
                index.as_str(),
                timeout,
            )?))
        }
        BackendConfig::Tantivy { index_dir, .. } => {
            log::info!("Using tantivy backend at {index_dir}");
            Ok(Box::new(TantivyBackend::open(index_dir, timeout)?))
        }
    }
}

/// Creates a handler for the backend and languages in `config`.
///
/// # Errors
///
/// Returns an error if the backend cannot be created.
pub fn create_handler(
    config: &SearchConfig,
) -> Result<StructuredSearchHandler<Box<dyn SearchBackend>>, SearchError> {
    Ok(StructuredSearchHandler::new(
        create_backend(config)?,
        config.languages.clone(),
    ))
}
