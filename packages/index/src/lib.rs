#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Local tantivy index of place records.
//!
//! Answers compiled address queries without a search cluster. Documents
//! are stored with one field per language variant, mirroring the logical
//! field paths the query compiler emits.
//!
//! # Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use geosearch_index::PlaceIndex;
//! use geosearch_query::{MatchMode, StructuredAddressRequest, compile_request};
//!
//! let index = PlaceIndex::open("data/place_index")?;
//! let request = StructuredAddressRequest::new("en")
//!     .with_supported_languages(index.languages().to_vec())
//!     .with_city("Berlin")
//!     .with_street("Unter den Linden");
//! let query = compile_request(&request, MatchMode::Lenient)?;
//! let hits = index.search(query, request.limit()).await?;
//! println!("{} hits", hits.total_hits);
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod schema;
pub mod translate;

use std::path::Path;

use geosearch_query_models::QueryNode;
use geosearch_search_models::{Place, SearchHit, SearchHits};
use tantivy::collector::{Count, TopDocs};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use schema::PlaceFields;
use translate::QueryTranslator;

/// Errors from place index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Tantivy error.
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index directory not found.
    #[error("Index directory not found: {0}")]
    IndexNotFound(String),

    /// A place could not be serialized or a stored place could not be
    /// parsed.
    #[error("Place JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A hit carries no stored place.
    #[error("Indexed document has no stored place")]
    MissingSource,

    /// Async task join error.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A handle to a place index.
///
/// Cloning is cheap and clones share the underlying index, so a handle
/// can be moved onto a blocking thread for each search.
#[derive(Clone)]
pub struct PlaceIndex {
    index: Index,
    reader: IndexReader,
    fields: PlaceFields,
}

impl std::fmt::Debug for PlaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceIndex")
            .field("languages", &self.fields.languages())
            .finish_non_exhaustive()
    }
}

impl PlaceIndex {
    /// Creates an empty in-memory index.
    ///
    /// # Errors
    ///
    /// Returns an error if tantivy fails to set up the index.
    pub fn create_in_ram(languages: &[String]) -> Result<Self, IndexError> {
        Self::from_index(Index::create_in_ram(schema::build_schema(languages)))
    }

    /// Creates an empty index in `index_dir`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or already
    /// holds an index.
    pub fn create_in_dir(
        index_dir: impl AsRef<Path>,
        languages: &[String],
    ) -> Result<Self, IndexError> {
        let index_dir = index_dir.as_ref();
        std::fs::create_dir_all(index_dir)?;

        log::info!("Creating place index at {}", index_dir.display());

        Self::from_index(Index::create_in_dir(
            index_dir,
            schema::build_schema(languages),
        )?)
    }

    /// Opens an existing index.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or does not
    /// contain a valid index.
    pub fn open(index_dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let index_dir = index_dir.as_ref();
        if !index_dir.exists() {
            return Err(IndexError::IndexNotFound(index_dir.display().to_string()));
        }

        log::info!("Opening place index at {}", index_dir.display());

        Self::from_index(Index::open_in_dir(index_dir)?)
    }

    /// Opens the index in `index_dir`, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the index can neither be opened nor created.
    pub fn open_or_create(
        index_dir: impl AsRef<Path>,
        languages: &[String],
    ) -> Result<Self, IndexError> {
        let index_dir = index_dir.as_ref();
        if index_dir.join("meta.json").exists() {
            Self::open(index_dir)
        } else {
            Self::create_in_dir(index_dir, languages)
        }
    }

    fn from_index(index: Index) -> Result<Self, IndexError> {
        schema::register_tokenizers(&index);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let fields = PlaceFields::from_schema(&index.schema())?;

        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// Languages the index has localized fields for.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        self.fields.languages()
    }

    /// Returns the total number of documents in the index.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Adds places and commits them.
    ///
    /// The new documents are visible to searches once this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if a place cannot be converted or the index
    /// cannot be written.
    pub fn add_places<'a>(
        &self,
        places: impl IntoIterator<Item = &'a Place>,
        writer_heap_bytes: usize,
    ) -> Result<u64, IndexError> {
        let mut writer: IndexWriter = self.index.writer_with_num_threads(1, writer_heap_bytes)?;

        let mut count = 0u64;
        for place in places {
            writer.add_document(document::to_document(&self.fields, place)?)?;
            count += 1;
            if count.is_multiple_of(100_000) {
                log::info!("  indexed {count} places...");
            }
        }

        log::info!("Committing place index ({count} new documents)...");
        writer.commit()?;
        self.reader.reload()?;

        Ok(count)
    }

    /// Runs `query` and returns up to `limit` hits, best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails or a stored place cannot be
    /// read back.
    pub fn search_sync(&self, query: &QueryNode, limit: usize) -> Result<SearchHits, IndexError> {
        let searcher = self.reader.searcher();
        let query = QueryTranslator::new(&self.fields).translate(query);

        let (top_docs, total) =
            searcher.search(&query, &(TopDocs::with_limit(limit.max(1)), Count))?;

        let hits = top_docs
            .into_iter()
            .map(|(score, address)| -> Result<SearchHit, IndexError> {
                let doc: TantivyDocument = searcher.doc(address)?;
                Ok(SearchHit {
                    place: document::from_document(&self.fields, &doc)?,
                    score,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Place index returned {} of {total} hits", hits.len());

        Ok(SearchHits {
            total_hits: total as u64,
            hits,
        })
    }

    /// Async wrapper around [`PlaceIndex::search_sync`], dispatched to a
    /// blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails or the blocking task panics.
    pub async fn search(&self, query: QueryNode, limit: usize) -> Result<SearchHits, IndexError> {
        let index = self.clone();
        tokio::task::spawn_blocking(move || index.search_sync(&query, limit)).await?
    }
}
