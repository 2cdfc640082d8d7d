//! Backend answering queries from a local tantivy [`PlaceIndex`].

use std::path::Path;
use std::time::Duration;

use geosearch_index::PlaceIndex;
use geosearch_query_models::QueryNode;
use geosearch_search_models::SearchHits;

use crate::{SearchBackend, SearchError};

/// A [`SearchBackend`] over a [`PlaceIndex`].
#[derive(Debug, Clone)]
pub struct TantivyBackend {
    index: PlaceIndex,
    timeout: Duration,
}

impl TantivyBackend {
    /// Wraps an open index. Searches taking longer than `timeout` fail
    /// with [`SearchError::Timeout`].
    #[must_use]
    pub const fn new(index: PlaceIndex, timeout: Duration) -> Self {
        Self { index, timeout }
    }

    /// Opens the index in `index_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Index`] if the directory holds no valid
    /// index.
    pub fn open(index_dir: impl AsRef<Path>, timeout: Duration) -> Result<Self, SearchError> {
        Ok(Self::new(PlaceIndex::open(index_dir)?, timeout))
    }
}

#[async_trait::async_trait]
impl SearchBackend for TantivyBackend {
    async fn execute(&self, query: &QueryNode, limit: usize) -> Result<SearchHits, SearchError> {
        let search = self.index.search(query.clone(), limit);

        match tokio::time::timeout(self.timeout, search).await {
            Ok(hits) => Ok(hits?),
            Err(_) => Err(SearchError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
