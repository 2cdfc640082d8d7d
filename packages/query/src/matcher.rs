//! Language-weighted field matching.
//!
//! Every multi-language field is indexed once per language plus a
//! `default` variant. A value is accepted if it matches any variant, but
//! the variant in the requested language scores highest.

use geosearch_query_models::{BoolQuery, FieldMatch, MinimumShouldMatch};

use crate::MatchMode;
use crate::fields::{self, FieldNames};

/// A structured field that places may also carry only as a typed name,
/// e.g. a county record whose county is stored in `name` with
/// `object_type = "county"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedField {
    /// The structured field.
    pub field: &'static str,
    /// `object_type` of records that name this concept.
    pub object_type: &'static str,
}

/// Builds per-language match clauses for one request.
#[derive(Debug, Clone)]
pub struct FuzzyFieldMatcher<'a> {
    language: &'a str,
    languages: &'a [String],
    wrong_language_factor: f32,
    mode: MatchMode,
}

impl<'a> FuzzyFieldMatcher<'a> {
    /// Creates a matcher preferring `language` among `languages`.
    #[must_use]
    pub const fn new(
        language: &'a str,
        languages: &'a [String],
        wrong_language_factor: f32,
        mode: MatchMode,
    ) -> Self {
        Self {
            language,
            languages,
            wrong_language_factor,
            mode,
        }
    }

    /// Matches `value` against every language variant of `field`.
    ///
    /// At least one variant has to match. The requested language scores
    /// at full weight, the `default` variant and all other languages at
    /// the wrong-language factor.
    #[must_use]
    pub fn match_field(&self, field: &str, value: &str) -> BoolQuery {
        let mut query = BoolQuery::new().should(
            FieldMatch::phrase(
                fields::variant(field, FieldNames::DEFAULT_VARIANT),
                value,
            )
            .boosted(self.wrong_language_factor),
        );

        for lang in self.languages {
            let boost = if lang == self.language {
                1.0
            } else {
                self.wrong_language_factor
            };
            query =
                query.should(FieldMatch::phrase(fields::variant(field, lang), value).boosted(boost));
        }

        query.with_minimum_should_match(MinimumShouldMatch::Count(1))
    }

    /// Matches `value` against a structured field, or against the generic
    /// name of records of the field's object type.
    ///
    /// In strict mode, when the request carries a more specific sibling
    /// field, only the structured field is matched.
    #[must_use]
    pub fn match_named_or_field(
        &self,
        target: NamedField,
        value: &str,
        boost: f32,
        has_more_details: bool,
    ) -> BoolQuery {
        if has_more_details && self.mode == MatchMode::Strict {
            return self.match_field(target.field, value).boosted(boost);
        }

        BoolQuery::new()
            .should(self.match_field(target.field, value))
            .should(self.match_typed_name(value, target.object_type))
            .boosted(boost)
    }

    /// Matches `value` against the generic `name` field of records with
    /// the given `object_type`.
    #[must_use]
    pub fn match_typed_name(&self, value: &str, object_type: &str) -> BoolQuery {
        self.match_field(FieldNames::NAME, value)
            .filter(object_type_is(object_type))
    }
}

/// Exact filter on the record's `object_type`.
#[must_use]
pub fn object_type_is(object_type: &str) -> FieldMatch {
    FieldMatch::term(FieldNames::OBJECT_TYPE, object_type)
}
