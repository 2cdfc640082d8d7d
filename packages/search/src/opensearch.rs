//! OpenSearch / Elasticsearch backend.
//!
//! Query trees are rendered as the JSON query DSL and sent to the
//! `_search` endpoint of a single index. Responses are read from
//! `hits.total` and `hits.hits[]`, with each hit's `_source` holding a
//! serialized [`Place`].
//!
//! See <https://opensearch.org/docs/latest/query-dsl/>

use std::time::Duration;

use geosearch_query_models::{
    BoolQuery, BoundingBox, FieldMatch, Fuzziness, MatchKind, MinimumShouldMatch, Occur,
    QueryNode,
};
use geosearch_search_models::{Place, SearchHit, SearchHits};
use serde_json::{Map, Value, json};

use crate::{SearchBackend, SearchError};

/// `geo_point` field holding a place's [`Place::coordinate`].
const COORDINATE_FIELD: &str = "coordinate";

/// A remote index answering queries over HTTP.
#[derive(Debug, Clone)]
pub struct OpenSearchBackend {
    client: reqwest::Client,
    base_url: String,
    index: String,
    timeout: Duration,
}

impl OpenSearchBackend {
    /// Creates a backend for `index` on the cluster at `base_url`.
    ///
    /// `timeout` bounds each HTTP round trip and is also passed to the
    /// cluster as the search timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        index: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
            timeout,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }

    fn http_error(&self, err: reqwest::Error) -> SearchError {
        if err.is_timeout() {
            SearchError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            SearchError::Http(err)
        }
    }
}

#[async_trait::async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn execute(&self, query: &QueryNode, limit: usize) -> Result<SearchHits, SearchError> {
        let body = request_body(query, limit, self.timeout);
        log::trace!("POST {} {body}", self.search_url());

        let resp = self
            .client
            .post(self.search_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await.map_err(|e| self.http_error(e))?;
        let body: Value = serde_json::from_str(&text).map_err(|e| SearchError::Parse {
            message: format!("Search response is not JSON: {e}"),
        })?;

        parse_response(&body)
    }
}

/// Builds the `_search` request body.
#[must_use]
pub fn request_body(query: &QueryNode, size: usize, timeout: Duration) -> Value {
    json!({
        "query": to_dsl(query),
        "size": size,
        "timeout": format!("{}s", timeout.as_secs()),
        "track_total_hits": true,
    })
}

/// Renders a query tree as query DSL.
#[must_use]
pub fn to_dsl(node: &QueryNode) -> Value {
    match node {
        QueryNode::Bool(query) => bool_dsl(query),
        QueryNode::Match(field_match) => match_dsl(field_match),
        QueryNode::Exists { field } => json!({ "exists": { "field": field } }),
        QueryNode::ConstantScore { filter, score } => json!({
            "constant_score": { "filter": to_dsl(filter), "boost": score }
        }),
        QueryNode::GeoBoundingBox(bbox) => bbox_dsl(bbox),
    }
}

fn bbox_dsl(bbox: &BoundingBox) -> Value {
    let mut corners = Map::new();
    corners.insert(
        COORDINATE_FIELD.to_string(),
        json!({
            "top_left": { "lat": bbox.max_lat, "lon": bbox.min_lon },
            "bottom_right": { "lat": bbox.min_lat, "lon": bbox.max_lon },
        }),
    );
    json!({ "geo_bounding_box": corners })
}

fn bool_dsl(query: &BoolQuery) -> Value {
    let mut body = Map::new();

    for (occur, key) in [
        (Occur::Must, "must"),
        (Occur::Should, "should"),
        (Occur::MustNot, "must_not"),
        (Occur::Filter, "filter"),
    ] {
        let clauses: Vec<Value> = query.clauses_with(occur).map(to_dsl).collect();
        if !clauses.is_empty() {
            body.insert(key.to_string(), Value::Array(clauses));
        }
    }

    if let Some(threshold) = query.minimum_should_match() {
        let value = match threshold {
            MinimumShouldMatch::Count(count) => json!(count),
            MinimumShouldMatch::Percent(percent) => json!(format!("{percent}%")),
        };
        body.insert("minimum_should_match".to_string(), value);
    }

    if let Some(boost) = query.boost() {
        body.insert("boost".to_string(), json!(boost));
    }

    json!({ "bool": body })
}

fn match_dsl(field_match: &FieldMatch) -> Value {
    let mut params = Map::new();

    let kind = match field_match.kind {
        MatchKind::Term => {
            params.insert("value".to_string(), json!(field_match.value));
            "term"
        }
        MatchKind::Phrase => {
            params.insert("query".to_string(), json!(field_match.value));
            "match_phrase"
        }
        MatchKind::Fuzzy(fuzziness) | MatchKind::FuzzyTokens(fuzziness) => {
            let operator = if matches!(field_match.kind, MatchKind::Fuzzy(_)) {
                "and"
            } else {
                "or"
            };
            params.insert("query".to_string(), json!(field_match.value));
            params.insert("fuzziness".to_string(), json!(fuzziness_dsl(fuzziness)));
            params.insert("operator".to_string(), json!(operator));
            "match"
        }
    };

    if let Some(boost) = field_match.boost {
        params.insert("boost".to_string(), json!(boost));
    }

    let mut field = Map::new();
    field.insert(field_match.field.clone(), Value::Object(params));

    let mut clause = Map::new();
    clause.insert(kind.to_string(), Value::Object(field));
    Value::Object(clause)
}

const fn fuzziness_dsl(fuzziness: Fuzziness) -> &'static str {
    match fuzziness {
        Fuzziness::Exact => "0",
        Fuzziness::Auto => "AUTO",
    }
}

/// Parses a `_search` response body.
///
/// `hits.total` may be an object with a `value` (current versions) or a
/// bare number (older Elasticsearch). When it is absent the number of
/// returned hits is used.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the body has no `hits.hits` array or
/// a hit's `_source` is not a place.
pub fn parse_response(body: &Value) -> Result<SearchHits, SearchError> {
    let raw_hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Parse {
            message: "Search response missing 'hits.hits' array".to_string(),
        })?;

    let hits = raw_hits
        .iter()
        .map(parse_hit)
        .collect::<Result<Vec<_>, _>>()?;

    let total_hits = body
        .pointer("/hits/total")
        .and_then(|total| total.get("value").unwrap_or(total).as_u64())
        .unwrap_or(hits.len() as u64);

    Ok(SearchHits { total_hits, hits })
}

#[allow(clippy::cast_possible_truncation)]
fn parse_hit(hit: &Value) -> Result<SearchHit, SearchError> {
    let source = hit.get("_source").ok_or_else(|| SearchError::Parse {
        message: "Hit missing '_source'".to_string(),
    })?;

    let place: Place = serde_json::from_value(source.clone()).map_err(|e| SearchError::Parse {
        message: format!("Hit '_source' is not a place: {e}"),
    })?;

    // `_score` is null when results are sorted.
    let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0) as f32;

    Ok(SearchHit { place, score })
}
