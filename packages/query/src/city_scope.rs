//! Accumulated city context for street-level matching.

use geosearch_query_models::{BoolQuery, QueryNode};

/// Disjunction of every city, postcode and district clause seen so far.
///
/// Once non-empty it is attached as a filter to the house-number clause so
/// that a matching street in some other city is rejected without being
/// re-scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityScopeFilter {
    alternatives: BoolQuery,
}

impl CityScopeFilter {
    /// Creates an empty scope.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            alternatives: BoolQuery::new(),
        }
    }

    /// Adds one acceptable city context.
    pub fn add_alternative(&mut self, clause: impl Into<QueryNode>) {
        self.alternatives = std::mem::take(&mut self.alternatives).should(clause);
    }

    /// Whether no city context has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// The accumulated disjunction, or `None` when empty.
    #[must_use]
    pub fn as_filter(&self) -> Option<QueryNode> {
        if self.is_empty() {
            None
        } else {
            Some(self.alternatives.clone().into())
        }
    }
}
