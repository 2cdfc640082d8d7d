#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Structured address query compilation.
//!
//! Turns a [`StructuredAddressRequest`] into a weighted boolean
//! [`QueryNode`] tree. The tree is backend-agnostic; search backends
//! translate it into their own query types.
//!
//! Two [`MatchMode`]s exist. Strict mode requires every supplied field to
//! match. Lenient mode makes every field optional and only ranks, so that
//! a request with a typo or a missing house number still finds the
//! closest place.

pub mod boosts;
pub mod city_scope;
pub mod compiler;
pub mod fields;
pub mod matcher;
pub mod postcode;

use std::borrow::Cow;

pub use boosts::BoostTable;
pub use city_scope::CityScopeFilter;
pub use compiler::{AddressQueryCompiler, CompilerPhase};
pub use fields::{FieldNames, ObjectTypes};
pub use geosearch_query_models::{BoundingBox, QueryNode, StructuredAddressRequest};
pub use matcher::FuzzyFieldMatcher;
pub use postcode::{PostalCodeNormalizer, TemplateError};

/// Errors that can occur while compiling a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// A geography field was added after the street or house number.
    #[error("Cannot add {field} after the street or house number")]
    Sequencing {
        /// The rejected field.
        field: &'static str,
    },
}

/// How strictly a request's fields have to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Every supplied field must match.
    Strict,
    /// Fields only rank results; typos are tolerated.
    Lenient,
}

impl MatchMode {
    /// Whether this is [`MatchMode::Lenient`].
    #[must_use]
    pub const fn is_lenient(self) -> bool {
        matches!(self, Self::Lenient)
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Lenient => f.write_str("lenient"),
        }
    }
}

/// Compiles `request` with the default boosts and postcode rules.
///
/// # Errors
///
/// * If the compiler rejects the field order (never happens for requests
///   built through this function)
pub fn compile_request(
    request: &StructuredAddressRequest,
    mode: MatchMode,
) -> Result<QueryNode, QueryError> {
    compile_request_with(
        request,
        mode,
        &BoostTable::DEFAULT,
        PostalCodeNormalizer::global(),
    )
}

/// Compiles `request` with custom boosts and postcode rules.
///
/// Fields are added in geography-first order. The postcode is
/// canonicalized for the request's country before matching. Country,
/// layers and bounding box only filter.
///
/// # Errors
///
/// * If the compiler rejects the field order
pub fn compile_request_with(
    request: &StructuredAddressRequest,
    mode: MatchMode,
    boosts: &BoostTable,
    normalizer: &PostalCodeNormalizer,
) -> Result<QueryNode, QueryError> {
    let has_district = request.has_district();
    let has_street = request.has_street_level_address();
    let has_city_details =
        request.city().is_some() || has_district || request.postal_code().is_some();

    let postal_code = match (request.country_code(), request.postal_code()) {
        (Some(country_code), Some(postal_code)) => {
            Some(normalizer.normalize(country_code, postal_code))
        }
        (None, postal_code) => postal_code.map(Cow::Borrowed),
        (Some(_), None) => None,
    };

    let mut compiler = AddressQueryCompiler::with_boosts(
        mode,
        &request.language,
        &request.supported_languages,
        *boosts,
    );

    compiler
        .add_country_code(request.country_code())
        .add_layers(&request.layers())
        .add_bounding_box(request.bbox);
    compiler
        .add_state(request.state(), request.county().is_some() || has_city_details)?
        .add_county(request.county(), has_city_details)?
        .add_city(request.city(), has_district, has_street)?
        .add_postal_code(postal_code.as_deref())?
        .add_district(request.district(), has_street)?
        .add_street_and_house_number(request.street(), request.house_number());

    let query = compiler.into_query();
    log::trace!("compile_request: mode={mode} query={query:?}");

    Ok(query)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use geosearch_query_models::{BoundingBox, FieldMatch, MatchKind, Occur};

    use super::*;

    fn find_match<'a>(query: &'a QueryNode, field: &str) -> Option<&'a FieldMatch> {
        query
            .find(&|node| node.as_match().is_some_and(|m| m.field == field))
            .and_then(QueryNode::as_match)
    }

    #[test]
    fn empty_request_compiles_to_empty_query() {
        let request = StructuredAddressRequest::new("en");
        let query = compile_request(&request, MatchMode::Strict).unwrap();
        assert!(query.as_bool().unwrap().is_empty());
    }

    #[test]
    fn normalizes_postcode_for_country() {
        let request = StructuredAddressRequest::new("en")
            .with_country_code("gr")
            .with_postal_code("12345");
        let query = compile_request(&request, MatchMode::Strict).unwrap();

        let postcode = find_match(&query, "postcode").unwrap();
        assert_eq!(postcode.value, "123 45");
        assert!(matches!(postcode.kind, MatchKind::FuzzyTokens(_)));
        assert_eq!(find_match(&query, "countrycode").unwrap().value, "GR");
    }

    #[test]
    fn postcode_without_country_is_used_as_is() {
        let request = StructuredAddressRequest::new("en").with_postal_code("12345");
        let query = compile_request(&request, MatchMode::Lenient).unwrap();
        assert_eq!(find_match(&query, "postcode").unwrap().value, "12345");
    }

    #[test]
    fn full_address_compiles_in_both_modes() {
        let request = StructuredAddressRequest::new("de")
            .with_supported_languages(["en", "de"])
            .with_country_code("DE")
            .with_state("Berlin")
            .with_city("Berlin")
            .with_postal_code("10117")
            .with_district("Mitte")
            .with_street("Unter den Linden")
            .with_house_number("77");

        let strict = compile_request(&request, MatchMode::Strict).unwrap();
        let root = strict.as_bool().unwrap();
        assert_eq!(root.count(Occur::Filter), 1);
        assert!(root.count(Occur::Must) >= 4);
        assert_eq!(root.minimum_should_match(), None);

        let lenient = compile_request(&request, MatchMode::Lenient).unwrap();
        let root = lenient.as_bool().unwrap();
        assert_eq!(root.count(Occur::Must), 0);
        assert!(root.minimum_should_match().is_some());
        assert!(find_match(&lenient, "street.de").is_some());
    }

    #[test]
    fn layers_and_bbox_filter_in_both_modes() {
        let request = StructuredAddressRequest::new("en")
            .with_country_code("US")
            .with_city("Springfield")
            .with_layers(["House", "house", " "])
            .with_bbox(BoundingBox::new(-90.0, 39.0, -89.0, 40.0));

        for mode in [MatchMode::Strict, MatchMode::Lenient] {
            let query = compile_request(&request, mode).unwrap();
            let root = query.as_bool().unwrap();
            assert_eq!(root.count(Occur::Filter), 3);
            let layer = find_match(&query, "object_type").unwrap();
            assert_eq!(layer.value, "house");
            assert!(
                query
                    .find(&|node| matches!(node, QueryNode::GeoBoundingBox(_)))
                    .is_some()
            );
        }
    }

    #[test]
    fn custom_boosts_are_applied() {
        let boosts = BoostTable {
            postcode: 42.0,
            ..BoostTable::DEFAULT
        };
        let request = StructuredAddressRequest::new("en").with_postal_code("10117");
        let query = compile_request_with(
            &request,
            MatchMode::Strict,
            &boosts,
            &PostalCodeNormalizer::new(),
        )
        .unwrap();
        assert_eq!(find_match(&query, "postcode").unwrap().boost, Some(42.0));
    }

    #[test]
    fn match_mode_displays_lowercase() {
        assert_eq!(MatchMode::Strict.to_string(), "strict");
        assert!(MatchMode::Lenient.is_lenient());
    }
}
