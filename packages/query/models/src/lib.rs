#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for structured address search.
//!
//! This crate contains only data types: the [`StructuredAddressRequest`]
//! that callers build from transport input, and the backend-agnostic
//! [`query::QueryNode`] tree the compiler produces. It has no heavyweight
//! dependencies (no search client, no I/O).

pub mod query;

use serde::{Deserialize, Deserializer, Serialize};

pub use query::{
    BoolQuery, BoundingBox, FieldMatch, Fuzziness, MatchKind, MinimumShouldMatch, Occur, QueryNode,
};

/// Number of results returned when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: usize = 15;

/// Upper bound on the number of results a caller may ask for.
pub const MAX_LIMIT: usize = 50;

/// A structured forward-geocoding request.
///
/// Every address component is optional. Empty and whitespace-only values
/// are treated exactly like missing ones by the accessors, so callers can
/// pass raw form input through without cleaning it first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredAddressRequest {
    /// Preferred result language. Empty means "no preference".
    pub language: String,
    /// Language codes the index carries per-language field variants for.
    pub supported_languages: Vec<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: Option<String>,
    /// State, province or region.
    pub state: Option<String>,
    /// County.
    pub county: Option<String>,
    /// City, town or village.
    pub city: Option<String>,
    /// Postal code as typed by the caller.
    pub postal_code: Option<String>,
    /// District, suburb or borough.
    pub district: Option<String>,
    /// Street name.
    pub street: Option<String>,
    /// House number.
    pub house_number: Option<String>,
    /// Object types (`house`, `street`, `city`, ...) results are limited
    /// to. Empty means any type.
    pub layers: Vec<String>,
    /// Area results are limited to.
    pub bbox: Option<BoundingBox>,
    #[serde(deserialize_with = "deserialize_limit")]
    limit: usize,
}

impl Default for StructuredAddressRequest {
    fn default() -> Self {
        Self {
            language: String::new(),
            supported_languages: Vec::new(),
            country_code: None,
            state: None,
            county: None,
            city: None,
            postal_code: None,
            district: None,
            street: None,
            house_number: None,
            layers: Vec::new(),
            bbox: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn deserialize_limit<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let limit: Option<usize> = Option::deserialize(deserializer)?;
    Ok(limit.map_or(DEFAULT_LIMIT, clamp_limit))
}

/// Clamps a requested result count into `1..=MAX_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl StructuredAddressRequest {
    /// Creates an empty request preferring `language`.
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Sets the languages the index supports.
    #[must_use]
    pub fn with_supported_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the country code.
    #[must_use]
    pub fn with_country_code(mut self, value: impl Into<String>) -> Self {
        self.country_code = Some(value.into());
        self
    }

    /// Sets the state.
    #[must_use]
    pub fn with_state(mut self, value: impl Into<String>) -> Self {
        self.state = Some(value.into());
        self
    }

    /// Sets the county.
    #[must_use]
    pub fn with_county(mut self, value: impl Into<String>) -> Self {
        self.county = Some(value.into());
        self
    }

    /// Sets the city.
    #[must_use]
    pub fn with_city(mut self, value: impl Into<String>) -> Self {
        self.city = Some(value.into());
        self
    }

    /// Sets the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, value: impl Into<String>) -> Self {
        self.postal_code = Some(value.into());
        self
    }

    /// Sets the district.
    #[must_use]
    pub fn with_district(mut self, value: impl Into<String>) -> Self {
        self.district = Some(value.into());
        self
    }

    /// Sets the street.
    #[must_use]
    pub fn with_street(mut self, value: impl Into<String>) -> Self {
        self.street = Some(value.into());
        self
    }

    /// Sets the house number.
    #[must_use]
    pub fn with_house_number(mut self, value: impl Into<String>) -> Self {
        self.house_number = Some(value.into());
        self
    }

    /// Limits results to the given object types.
    #[must_use]
    pub fn with_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Limits results to the given area.
    #[must_use]
    pub const fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Sets the result limit, clamped into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = clamp_limit(limit);
        self
    }

    /// Maximum number of results the caller wants back.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// The country code, if present.
    #[must_use]
    pub fn country_code(&self) -> Option<&str> {
        non_empty(self.country_code.as_ref())
    }

    /// The state, if present.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        non_empty(self.state.as_ref())
    }

    /// The county, if present.
    #[must_use]
    pub fn county(&self) -> Option<&str> {
        non_empty(self.county.as_ref())
    }

    /// The city, if present.
    #[must_use]
    pub fn city(&self) -> Option<&str> {
        non_empty(self.city.as_ref())
    }

    /// The postal code, if present.
    #[must_use]
    pub fn postal_code(&self) -> Option<&str> {
        non_empty(self.postal_code.as_ref())
    }

    /// The district, if present.
    #[must_use]
    pub fn district(&self) -> Option<&str> {
        non_empty(self.district.as_ref())
    }

    /// The street, if present.
    #[must_use]
    pub fn street(&self) -> Option<&str> {
        non_empty(self.street.as_ref())
    }

    /// The house number, if present.
    #[must_use]
    pub fn house_number(&self) -> Option<&str> {
        non_empty(self.house_number.as_ref())
    }

    /// Requested layers, trimmed and lowercased, blanks and repeats dropped.
    #[must_use]
    pub fn layers(&self) -> Vec<String> {
        let mut layers: Vec<String> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let layer = layer.trim().to_lowercase();
            if !layer.is_empty() && !layers.contains(&layer) {
                layers.push(layer);
            }
        }
        layers
    }

    /// Whether a district was supplied.
    #[must_use]
    pub fn has_district(&self) -> bool {
        self.district().is_some()
    }

    /// Whether a street or a house number was supplied.
    #[must_use]
    pub fn has_street_level_address(&self) -> bool {
        self.street().is_some() || self.house_number().is_some()
    }

    /// Whether a house number was supplied.
    #[must_use]
    pub fn has_house_number(&self) -> bool {
        self.house_number().is_some()
    }
}
