#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for structured address search.
//!
//! This crate contains only data types and configuration structs. It has
//! no heavyweight dependencies (no search client, no I/O).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-language values of one place attribute, keyed by language code.
///
/// The language-neutral value is stored under `default`.
pub type LocalizedNames = BTreeMap<String, String>;

/// Key of the language-neutral entry in [`LocalizedNames`].
pub const DEFAULT_LANGUAGE_KEY: &str = "default";

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// A place record as stored by a search backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    /// OpenStreetMap id, if the record came from OSM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm_id: Option<i64>,
    /// Kind of place (`house`, `street`, `city`, …).
    pub object_type: String,
    /// Upper-cased ISO 3166-1 alpha-2 code.
    #[serde(rename = "countrycode")]
    pub country_code: String,
    /// Name of the place itself.
    pub name: LocalizedNames,
    /// State or region.
    pub state: LocalizedNames,
    /// County.
    pub county: LocalizedNames,
    /// City.
    pub city: LocalizedNames,
    /// District or suburb.
    pub district: LocalizedNames,
    /// Street.
    pub street: LocalizedNames,
    /// Postal code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    /// House number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housenumber: Option<String>,
    /// Location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
}

impl Place {
    /// The place's name in `language`, falling back to the default name.
    #[must_use]
    pub fn name_in(&self, language: &str) -> Option<&str> {
        localized(&self.name, language)
    }

    /// The place's city in `language`, falling back to the default value.
    #[must_use]
    pub fn city_in(&self, language: &str) -> Option<&str> {
        localized(&self.city, language)
    }

    /// The place's street in `language`, falling back to the default value.
    #[must_use]
    pub fn street_in(&self, language: &str) -> Option<&str> {
        localized(&self.street, language)
    }
}

fn localized<'a>(names: &'a LocalizedNames, language: &str) -> Option<&'a str> {
    names
        .get(language)
        .or_else(|| names.get(DEFAULT_LANGUAGE_KEY))
        .map(String::as_str)
}

/// One backend hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched place.
    pub place: Place,
    /// Backend relevance score (higher is better).
    pub score: f32,
}

/// A backend's answer to one query, best hit first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    /// Number of matching documents, which may exceed `hits.len()`.
    pub total_hits: u64,
    /// The returned hits.
    pub hits: Vec<SearchHit>,
}

impl SearchHits {
    /// Whether no document matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    /// The matched place.
    pub place: Place,
    /// Backend relevance score.
    pub score: f32,
    /// 1-based position in the result list.
    pub rank: usize,
}

/// Search service configuration, loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Language codes the index carries field variants for.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Language used when a request does not name one.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Upper bound for a single backend call, in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// Which backend answers queries.
    pub backend: BackendConfig,
}

/// Backend-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// A remote OpenSearch or Elasticsearch cluster.
    OpenSearch {
        /// Cluster URL (e.g., `"http://localhost:9200"`).
        base_url: String,
        /// Index holding the place documents.
        index: String,
    },
    /// A local tantivy index.
    Tantivy {
        /// Directory of the index.
        index_dir: String,
        /// Memory budget for the index writer in bytes.
        #[serde(default = "default_writer_heap")]
        writer_heap_bytes: usize,
    },
}

fn default_languages() -> Vec<String> {
    ["en", "de", "fr", "it"].map(String::from).to_vec()
}

fn default_language() -> String {
    "en".to_string()
}

const fn default_query_timeout_secs() -> u64 {
    7
}

/// Default index writer heap.
#[must_use]
pub const fn default_writer_heap() -> usize {
    64 * 1024 * 1024 // 64 MB
}
