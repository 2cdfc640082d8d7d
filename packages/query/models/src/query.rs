//! Backend-agnostic weighted boolean query tree.
//!
//! The compiler only ever produces these nodes. Each search backend owns a
//! small adapter that turns a [`QueryNode`] into its native query type, so
//! nothing in here knows about a particular search client.

use serde::{Deserialize, Serialize};

/// How a clause participates in its parent [`BoolQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Occur {
    /// The clause must match and contributes to the score.
    Must,
    /// The clause may match; matching adds to the score.
    Should,
    /// The clause must not match.
    MustNot,
    /// The clause must match but does not contribute to the score.
    Filter,
}

/// Minimum number of `Should` clauses a document has to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MinimumShouldMatch {
    /// An absolute number of clauses.
    Count(usize),
    /// A percentage of the `Should` clauses, rounded down.
    Percent(u8),
}

impl MinimumShouldMatch {
    /// Resolves the threshold against the number of `Should` clauses.
    #[must_use]
    pub fn resolve(self, should_count: usize) -> usize {
        match self {
            Self::Count(count) => count.min(should_count),
            Self::Percent(percent) => should_count * usize::from(percent.min(100)) / 100,
        }
    }
}

/// Allowed edit distance for fuzzy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fuzziness {
    /// No edits: the term must match exactly.
    Exact,
    /// Edit distance derived from the term length (0, 1 or 2).
    Auto,
}

impl Fuzziness {
    /// Maximum number of edits allowed for a term of `term_len` characters.
    #[must_use]
    pub const fn max_edits(self, term_len: usize) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Auto => match term_len {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
        }
    }
}

/// Match semantics of a [`FieldMatch`] leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Exact, unanalyzed term equality.
    Term,
    /// All tokens of the value, in order.
    Phrase,
    /// Every analyzed token of the value, each matched fuzzily; all must match.
    Fuzzy(Fuzziness),
    /// Each whitespace-separated token matched fuzzily; any token may match.
    FuzzyTokens(Fuzziness),
}

/// A leaf clause matching a literal value against one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    /// Logical field path, e.g. `name.default` or `postcode`.
    pub field: String,
    /// The literal value to match.
    pub value: String,
    /// How the value is matched.
    pub kind: MatchKind,
    /// Score multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
}

impl FieldMatch {
    fn new(field: impl Into<String>, value: impl Into<String>, kind: MatchKind) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind,
            boost: None,
        }
    }

    /// Exact term match.
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, value, MatchKind::Term)
    }

    /// Phrase match.
    #[must_use]
    pub fn phrase(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, value, MatchKind::Phrase)
    }

    /// Fuzzy match requiring every token of `value`.
    #[must_use]
    pub fn fuzzy(field: impl Into<String>, value: impl Into<String>, fuzziness: Fuzziness) -> Self {
        Self::new(field, value, MatchKind::Fuzzy(fuzziness))
    }

    /// Per-token fuzzy match.
    #[must_use]
    pub fn fuzzy_tokens(
        field: impl Into<String>,
        value: impl Into<String>,
        fuzziness: Fuzziness,
    ) -> Self {
        Self::new(field, value, MatchKind::FuzzyTokens(fuzziness))
    }

    /// Sets the boost.
    #[must_use]
    pub fn boosted(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }
}

/// A boolean combination of clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    clauses: Vec<(Occur, QueryNode)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    boost: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum_should_match: Option<MinimumShouldMatch>,
}

impl BoolQuery {
    /// Creates an empty boolean query.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
            boost: None,
            minimum_should_match: None,
        }
    }

    /// Appends a clause in place.
    pub fn push(&mut self, occur: Occur, clause: impl Into<QueryNode>) {
        self.clauses.push((occur, clause.into()));
    }

    /// Adds a `Must` clause.
    #[must_use]
    pub fn must(mut self, clause: impl Into<QueryNode>) -> Self {
        self.push(Occur::Must, clause);
        self
    }

    /// Adds a `Should` clause.
    #[must_use]
    pub fn should(mut self, clause: impl Into<QueryNode>) -> Self {
        self.push(Occur::Should, clause);
        self
    }

    /// Adds a `MustNot` clause.
    #[must_use]
    pub fn must_not(mut self, clause: impl Into<QueryNode>) -> Self {
        self.push(Occur::MustNot, clause);
        self
    }

    /// Adds a `Filter` clause.
    #[must_use]
    pub fn filter(mut self, clause: impl Into<QueryNode>) -> Self {
        self.push(Occur::Filter, clause);
        self
    }

    /// Sets the boost.
    #[must_use]
    pub fn boosted(mut self, boost: f32) -> Self {
        self.boost = Some(boost);
        self
    }

    /// Sets the minimum number of `Should` clauses that must match.
    #[must_use]
    pub fn with_minimum_should_match(mut self, threshold: MinimumShouldMatch) -> Self {
        self.minimum_should_match = Some(threshold);
        self
    }

    /// Sets the minimum number of `Should` clauses in place.
    pub const fn set_minimum_should_match(&mut self, threshold: MinimumShouldMatch) {
        self.minimum_should_match = Some(threshold);
    }

    /// All clauses in insertion order.
    #[must_use]
    pub fn clauses(&self) -> &[(Occur, QueryNode)] {
        &self.clauses
    }

    /// Clauses with the given occurrence, in insertion order.
    pub fn clauses_with(&self, occur: Occur) -> impl Iterator<Item = &QueryNode> {
        self.clauses
            .iter()
            .filter(move |(o, _)| *o == occur)
            .map(|(_, clause)| clause)
    }

    /// Number of clauses with the given occurrence.
    #[must_use]
    pub fn count(&self, occur: Occur) -> usize {
        self.clauses_with(occur).count()
    }

    /// Whether the query has no clauses at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The boost, if set.
    #[must_use]
    pub const fn boost(&self) -> Option<f32> {
        self.boost
    }

    /// The `Should` threshold, if set.
    #[must_use]
    pub const fn minimum_should_match(&self) -> Option<MinimumShouldMatch> {
        self.minimum_should_match
    }
}

/// A WGS84 rectangle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a box from two corners given in any order.
    #[must_use]
    pub fn new(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> Self {
        Self {
            min_lon: lon1.min(lon2),
            min_lat: lat1.min(lat2),
            max_lon: lon1.max(lon2),
            max_lat: lat1.max(lat2),
        }
    }

    /// Whether the point lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }
}

/// A node of the query tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryNode {
    /// Boolean combination.
    Bool(BoolQuery),
    /// Literal match against one field.
    Match(FieldMatch),
    /// Matches documents that have any value for the field.
    Exists {
        /// Logical field path.
        field: String,
    },
    /// Matches what `filter` matches, every hit scoring exactly `score`.
    ConstantScore {
        /// Decides which documents match; its own score is ignored.
        filter: Box<Self>,
        /// Score of every match.
        score: f32,
    },
    /// Matches places whose coordinate lies inside the box.
    GeoBoundingBox(BoundingBox),
}

impl QueryNode {
    /// Matches documents that carry a value for `field`.
    #[must_use]
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    /// Wraps `filter` so that every match scores `score`.
    #[must_use]
    pub fn constant_score(filter: impl Into<Self>, score: f32) -> Self {
        Self::ConstantScore {
            filter: Box::new(filter.into()),
            score,
        }
    }

    /// The node's boost, if it has one.
    #[must_use]
    pub const fn boost(&self) -> Option<f32> {
        match self {
            Self::Bool(query) => query.boost,
            Self::Match(field_match) => field_match.boost,
            Self::ConstantScore { score, .. } => Some(*score),
            Self::Exists { .. } | Self::GeoBoundingBox(_) => None,
        }
    }

    /// The inner boolean query, if this is a `Bool` node.
    #[must_use]
    pub const fn as_bool(&self) -> Option<&BoolQuery> {
        match self {
            Self::Bool(query) => Some(query),
            _ => None,
        }
    }

    /// The inner field match, if this is a `Match` node.
    #[must_use]
    pub const fn as_match(&self) -> Option<&FieldMatch> {
        match self {
            Self::Match(field_match) => Some(field_match),
            _ => None,
        }
    }

    /// Depth-first search for a node satisfying `predicate`.
    pub fn find(&self, predicate: &impl Fn(&Self) -> bool) -> Option<&Self> {
        if predicate(self) {
            return Some(self);
        }
        match self {
            Self::Bool(query) => query
                .clauses
                .iter()
                .find_map(|(_, clause)| clause.find(predicate)),
            Self::ConstantScore { filter, .. } => filter.find(predicate),
            Self::Match(_) | Self::Exists { .. } | Self::GeoBoundingBox(_) => None,
        }
    }
}

impl From<BoolQuery> for QueryNode {
    fn from(query: BoolQuery) -> Self {
        Self::Bool(query)
    }
}

impl From<FieldMatch> for QueryNode {
    fn from(field_match: FieldMatch) -> Self {
        Self::Match(field_match)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn auto_fuzziness_grows_with_length() {
        assert_eq!(Fuzziness::Auto.max_edits(2), 0);
        assert_eq!(Fuzziness::Auto.max_edits(4), 1);
        assert_eq!(Fuzziness::Auto.max_edits(9), 2);
        assert_eq!(Fuzziness::Exact.max_edits(9), 0);
    }

    #[test]
    fn percent_threshold_rounds_down() {
        assert_eq!(MinimumShouldMatch::Percent(10).resolve(25), 2);
        assert_eq!(MinimumShouldMatch::Percent(10).resolve(5), 0);
        assert_eq!(MinimumShouldMatch::Count(3).resolve(2), 2);
    }

    #[test]
    fn counts_clauses_by_occurrence() {
        let query = BoolQuery::new()
            .must(FieldMatch::term("a", "1"))
            .should(FieldMatch::term("b", "2"))
            .should(FieldMatch::term("c", "3"))
            .filter(QueryNode::exists("d"));
        assert_eq!(query.count(Occur::Should), 2);
        assert_eq!(query.count(Occur::Must), 1);
        assert_eq!(query.count(Occur::MustNot), 0);
        assert!(!query.is_empty());
    }

    #[test]
    fn finds_nested_nodes() {
        let tree: QueryNode = BoolQuery::new()
            .should(BoolQuery::new().must(FieldMatch::phrase("street.default", "Main")))
            .into();
        let found = tree.find(&|node| {
            node.as_match()
                .is_some_and(|m| m.field == "street.default")
        });
        assert!(found.is_some());
    }

    #[test]
    fn finds_nodes_inside_constant_score() {
        let tree = QueryNode::constant_score(FieldMatch::phrase("housenumber", "12"), 10.0);
        assert_eq!(tree.boost(), Some(10.0));
        assert!(tree.find(&|node| node.as_match().is_some()).is_some());
    }

    #[test]
    fn bounding_box_orders_its_corners() {
        let bbox = BoundingBox::new(13.5, 52.6, 13.3, 52.4);
        assert_eq!(bbox.min_lon, 13.3);
        assert_eq!(bbox.max_lat, 52.6);
        assert!(bbox.contains(13.4, 52.5));
        assert!(bbox.contains(13.3, 52.6));
        assert!(!bbox.contains(13.6, 52.5));
    }

    #[test]
    fn serializes_to_tagged_json() {
        let tree: QueryNode = BoolQuery::new()
            .filter(FieldMatch::term("countrycode", "DE"))
            .boosted(2.0)
            .into();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["bool"]["clauses"][0][0], "filter");
        assert_eq!(json["bool"]["clauses"][0][1]["match"]["kind"], "term");
        assert_eq!(json["bool"]["boost"], 2.0);
    }
}
