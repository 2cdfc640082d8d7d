//! Staged structured-address query compiler.
//!
//! Fields are added geography first (country, state, county, city,
//! postcode, district), then street and house number. The house-number
//! stage consumes the city scope collected by the earlier stages, so once
//! a street-level value has been added no further geography may follow.

use geosearch_query_models::{
    BoolQuery, BoundingBox, FieldMatch, Fuzziness, MinimumShouldMatch, Occur, QueryNode,
};

use crate::boosts::BoostTable;
use crate::city_scope::CityScopeFilter;
use crate::fields::{self, FieldNames, ObjectTypes};
use crate::matcher::{FuzzyFieldMatcher, NamedField, object_type_is};
use crate::{MatchMode, QueryError};

const STATE: NamedField = NamedField {
    field: FieldNames::STATE,
    object_type: ObjectTypes::STATE,
};

const COUNTY: NamedField = NamedField {
    field: FieldNames::COUNTY,
    object_type: ObjectTypes::COUNTY,
};

const DISTRICT: NamedField = NamedField {
    field: FieldNames::DISTRICT,
    object_type: ObjectTypes::DISTRICT,
};

/// Percentage of `Should` clauses a lenient query has to match.
const LENIENT_SHOULD_PERCENT: usize = 10;

/// Which kind of field the compiler currently accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerPhase {
    /// Geography fields (state down to district) may still be added.
    City,
    /// A street or house number has been added.
    Street,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the query for one request.
///
/// An instance is used for exactly one request and consumed by
/// [`AddressQueryCompiler::into_query`]. Every `add_*` method is a no-op
/// for missing or blank values.
#[derive(Debug, Clone)]
pub struct AddressQueryCompiler<'a> {
    mode: MatchMode,
    boosts: BoostTable,
    matcher: FuzzyFieldMatcher<'a>,
    query: BoolQuery,
    city_scope: CityScopeFilter,
    phase: CompilerPhase,
}

impl<'a> AddressQueryCompiler<'a> {
    /// Creates a compiler with the default boost table.
    #[must_use]
    pub fn new(mode: MatchMode, language: &'a str, languages: &'a [String]) -> Self {
        Self::with_boosts(mode, language, languages, BoostTable::DEFAULT)
    }

    /// Creates a compiler with a custom boost table.
    #[must_use]
    pub const fn with_boosts(
        mode: MatchMode,
        language: &'a str,
        languages: &'a [String],
        boosts: BoostTable,
    ) -> Self {
        Self {
            mode,
            boosts,
            matcher: FuzzyFieldMatcher::new(language, languages, boosts.wrong_language, mode),
            query: BoolQuery::new(),
            city_scope: CityScopeFilter::new(),
            phase: CompilerPhase::City,
        }
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> CompilerPhase {
        self.phase
    }

    /// Restricts results to one country. Never scored.
    pub fn add_country_code(&mut self, country_code: Option<&str>) -> &mut Self {
        if let Some(country_code) = present(country_code) {
            self.query.push(
                Occur::Filter,
                FieldMatch::term(FieldNames::COUNTRY_CODE, country_code.to_uppercase()),
            );
        }
        self
    }

    /// Restricts results to the given object types. Never scored.
    pub fn add_layers(&mut self, layers: &[String]) -> &mut Self {
        if layers.is_empty() {
            return self;
        }
        let any_layer = layers
            .iter()
            .fold(BoolQuery::new(), |query, layer| {
                query.should(object_type_is(layer))
            })
            .with_minimum_should_match(MinimumShouldMatch::Count(1));
        self.query.push(Occur::Filter, any_layer);
        self
    }

    /// Restricts results to places inside `bbox`. Never scored.
    pub fn add_bounding_box(&mut self, bbox: Option<BoundingBox>) -> &mut Self {
        if let Some(bbox) = bbox {
            self.query.push(Occur::Filter, QueryNode::GeoBoundingBox(bbox));
        }
        self
    }

    /// Adds the state as an optional scoring clause, in both modes.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Sequencing`] if a street-level value was
    /// already added.
    pub fn add_state(
        &mut self,
        state: Option<&str>,
        has_more_details: bool,
    ) -> Result<&mut Self, QueryError> {
        let Some(state) = present(state) else {
            return Ok(self);
        };
        self.verify_city_phase(FieldNames::STATE)?;

        let clause =
            self.matcher
                .match_named_or_field(STATE, state, self.boosts.state, has_more_details);
        self.query.push(Occur::Should, clause);
        Ok(self)
    }

    /// Adds the county.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Sequencing`] if a street-level value was
    /// already added.
    pub fn add_county(
        &mut self,
        county: Option<&str>,
        has_more_details: bool,
    ) -> Result<&mut Self, QueryError> {
        let Some(county) = present(county) else {
            return Ok(self);
        };
        self.verify_city_phase(FieldNames::COUNTY)?;

        self.add_named_or_field(COUNTY, county, self.boosts.county, has_more_details);
        Ok(self)
    }

    /// Adds the city.
    ///
    /// Without a district, the city value is also tried against district
    /// records, since users often type a well-known district where a city
    /// is expected. District matches exclude anything that already
    /// matched as a city.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Sequencing`] if a street-level value was
    /// already added.
    pub fn add_city(
        &mut self,
        city: Option<&str>,
        has_district: bool,
        has_street: bool,
    ) -> Result<&mut Self, QueryError> {
        let Some(city) = present(city) else {
            return Ok(self);
        };
        self.verify_city_phase(FieldNames::CITY)?;

        let clause = self.city_clause(city, has_district, has_street);
        self.city_scope.add_alternative(clause.clone());
        self.add_query(clause);
        Ok(self)
    }

    fn city_clause(&self, city: &str, has_district: bool, has_street: bool) -> BoolQuery {
        let should_match_city_entry = !has_street || self.mode == MatchMode::Lenient;
        let city_boost = self.boosts.city;
        let city_query = self
            .matcher
            .match_field(FieldNames::CITY, city)
            .boosted(city_boost);

        if has_district && !should_match_city_entry {
            return city_query;
        }

        let city_name_query = self
            .matcher
            .match_typed_name(city, ObjectTypes::CITY)
            .boosted(self.boosts.city_name(has_street, has_district));

        if has_district {
            return BoolQuery::new().should(city_query).should(city_name_query);
        }

        let not_city = BoolQuery::new().must_not(city_query.clone());
        let district_query = self
            .matcher
            .match_field(FieldNames::DISTRICT, city)
            .filter(not_city.clone())
            .boosted(self.boosts.district_as_city * city_boost);

        if !should_match_city_entry {
            return BoolQuery::new().should(city_query).should(district_query);
        }

        let district_name_query = self
            .matcher
            .match_typed_name(city, ObjectTypes::DISTRICT)
            .filter(not_city)
            .boosted(self.boosts.district_name_as_city * city_boost);

        BoolQuery::new()
            .should(city_query)
            .should(city_name_query)
            .should(district_query)
            .should(district_name_query)
    }

    /// Adds the postal code.
    ///
    /// The value should already be normalized for the request's country.
    /// Lenient mode tolerates typos.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Sequencing`] if a street-level value was
    /// already added.
    pub fn add_postal_code(&mut self, postal_code: Option<&str>) -> Result<&mut Self, QueryError> {
        let Some(postal_code) = present(postal_code) else {
            return Ok(self);
        };
        self.verify_city_phase(FieldNames::POSTCODE)?;

        let fuzziness = match self.mode {
            MatchMode::Strict => Fuzziness::Exact,
            MatchMode::Lenient => Fuzziness::Auto,
        };

        let clause = if postal_code.contains(char::is_whitespace) {
            FieldMatch::fuzzy_tokens(FieldNames::POSTCODE, postal_code, fuzziness)
        } else {
            FieldMatch::fuzzy(FieldNames::POSTCODE, postal_code, fuzziness)
        }
        .boosted(self.boosts.postcode);

        self.city_scope.add_alternative(clause.clone());
        self.add_query(clause);
        Ok(self)
    }

    /// Adds the district.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Sequencing`] if a street-level value was
    /// already added.
    pub fn add_district(
        &mut self,
        district: Option<&str>,
        has_more_details: bool,
    ) -> Result<&mut Self, QueryError> {
        let Some(district) = present(district) else {
            return Ok(self);
        };
        self.verify_city_phase(FieldNames::DISTRICT)?;

        self.add_named_or_field(DISTRICT, district, self.boosts.district, has_more_details);
        Ok(self)
    }

    /// Adds the street and house number and enters the street phase.
    ///
    /// A house number without a street moves the compiler into the street
    /// phase but adds no clause.
    pub fn add_street_and_house_number(
        &mut self,
        street: Option<&str>,
        house_number: Option<&str>,
    ) -> &mut Self {
        let street = present(street);
        let house_number = present(house_number);
        if street.is_none() && house_number.is_none() {
            return self;
        }

        self.phase = CompilerPhase::Street;

        let Some(street) = street else {
            log::debug!("Ignoring house number without a street");
            return self;
        };

        let include_street_names = house_number.is_none() || self.mode == MatchMode::Lenient;
        let street_query = self.street_clause(street, include_street_names);

        match (house_number, self.mode) {
            (None, _) => self.query.push(Occur::Should, street_query),
            (Some(house_number), MatchMode::Strict) => {
                let clause = BoolQuery::new()
                    .must(FieldMatch::phrase(FieldNames::HOUSENUMBER, house_number))
                    .filter(street_query)
                    .boosted(self.boosts.house_number);
                self.add_query(clause);
            }
            (Some(house_number), MatchMode::Lenient) => {
                self.add_lenient_house_number(street_query, house_number);
            }
        }

        self
    }

    fn street_clause(&self, street: &str, include_street_names: bool) -> BoolQuery {
        let mut query =
            BoolQuery::new().should(self.matcher.match_field(FieldNames::STREET, street));
        if include_street_names {
            query = query.should(self.matcher.match_typed_name(street, ObjectTypes::STREET));
        }
        query.boosted(self.boosts.street)
    }

    fn add_lenient_house_number(&mut self, street_query: BoolQuery, house_number: &str) {
        let has_house_number = QueryNode::exists(FieldNames::HOUSENUMBER);

        // Records without any street data are not excluded.
        let no_street = BoolQuery::new()
            .must_not(QueryNode::exists(fields::variant(
                FieldNames::STREET,
                FieldNames::DEFAULT_VARIANT,
            )))
            .must_not(object_type_is(ObjectTypes::STREET));
        self.query.push(
            Occur::Filter,
            BoolQuery::new().should(street_query.clone()).should(no_street),
        );

        self.query.push(
            Occur::Should,
            BoolQuery::new()
                .must(street_query.clone())
                .must_not(has_house_number.clone())
                .boosted(self.boosts.street_without_house_number),
        );

        // Both branches score a constant: exact number > no number > other number.
        let mut clause = BoolQuery::new()
            .should(QueryNode::constant_score(
                BoolQuery::new().must_not(has_house_number),
                self.boosts.house_number_unmatched,
            ))
            .should(QueryNode::constant_score(
                FieldMatch::phrase(FieldNames::HOUSENUMBER, house_number),
                self.boosts.house_number,
            ))
            .filter(street_query);
        if let Some(scope) = self.city_scope.as_filter() {
            clause = clause.filter(scope);
        }

        self.add_query(clause);
    }

    /// Finishes the query.
    ///
    /// In lenient mode at least 10% of the optional clauses (and never
    /// fewer than one) have to match.
    #[must_use]
    pub fn into_query(self) -> QueryNode {
        let mut query = self.query;

        if self.mode == MatchMode::Lenient {
            let should_count = query.count(Occur::Should);
            if should_count > 0 {
                let required = (should_count * LENIENT_SHOULD_PERCENT / 100).max(1);
                query.set_minimum_should_match(MinimumShouldMatch::Count(required));
            }
        }

        query.into()
    }

    fn add_named_or_field(
        &mut self,
        target: NamedField,
        value: &str,
        boost: f32,
        has_more_details: bool,
    ) {
        let clause = self
            .matcher
            .match_named_or_field(target, value, boost, has_more_details);
        if fields::is_city_related(target.field) {
            self.city_scope.add_alternative(clause.clone());
        }
        self.add_query(clause);
    }

    fn add_query(&mut self, clause: impl Into<QueryNode>) {
        let occur = match self.mode {
            MatchMode::Strict => Occur::Must,
            MatchMode::Lenient => Occur::Should,
        };
        self.query.push(occur, clause);
    }

    fn verify_city_phase(&self, field: &'static str) -> Result<(), QueryError> {
        if self.phase == CompilerPhase::Street {
            return Err(QueryError::Sequencing { field });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn languages() -> Vec<String> {
        vec!["en".to_string(), "de".to_string()]
    }

    fn root(query: &QueryNode) -> &BoolQuery {
        query.as_bool().expect("root is a bool query")
    }

    fn is_typed_name(node: &QueryNode, object_type: &str) -> bool {
        node.as_bool().is_some_and(|b| {
            b.clauses_with(Occur::Filter)
                .filter_map(QueryNode::as_match)
                .any(|m| m.field == FieldNames::OBJECT_TYPE && m.value == object_type)
                && b.clauses_with(Occur::Should)
                    .filter_map(QueryNode::as_match)
                    .any(|m| m.field.starts_with("name."))
        })
    }

    fn only_clause(query: &QueryNode, occur: Occur) -> &QueryNode {
        let mut clauses = root(query).clauses_with(occur);
        let clause = clauses.next().expect("one clause");
        assert!(clauses.next().is_none(), "more than one {occur:?} clause");
        clause
    }

    #[test]
    fn missing_values_leave_query_unchanged() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Berlin"), false, false).unwrap();
        let before = compiler.clone().into_query();

        compiler.add_country_code(None);
        compiler.add_state(Some(""), false).unwrap();
        compiler.add_county(None, false).unwrap();
        compiler.add_city(Some("  "), false, false).unwrap();
        compiler.add_postal_code(None).unwrap();
        compiler.add_district(Some(""), false).unwrap();
        compiler.add_street_and_house_number(None, Some(" "));

        assert_eq!(compiler.phase(), CompilerPhase::City);
        assert_eq!(compiler.into_query(), before);
    }

    #[test]
    fn missing_values_are_accepted_in_street_phase() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_street_and_house_number(Some("Main Street"), None);
        assert!(compiler.add_city(None, false, true).is_ok());
        assert!(compiler.add_postal_code(Some("")).is_ok());
    }

    #[test]
    fn geography_after_house_number_is_rejected() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_street_and_house_number(None, Some("12"));
        assert_eq!(compiler.phase(), CompilerPhase::Street);

        assert!(matches!(
            compiler.add_city(Some("Berlin"), false, true),
            Err(QueryError::Sequencing { field: "city" })
        ));
        assert!(matches!(
            compiler.add_state(Some("Berlin"), false),
            Err(QueryError::Sequencing { field: "state" })
        ));
        assert!(matches!(
            compiler.add_county(Some("Berlin"), false),
            Err(QueryError::Sequencing { .. })
        ));
        assert!(matches!(
            compiler.add_postal_code(Some("10115")),
            Err(QueryError::Sequencing { field: "postcode" })
        ));
        assert!(matches!(
            compiler.add_district(Some("Mitte"), false),
            Err(QueryError::Sequencing { .. })
        ));
    }

    #[test]
    fn country_code_is_an_uppercased_filter() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_country_code(Some("de"));
        let query = compiler.into_query();

        let filter = only_clause(&query, Occur::Filter).as_match().unwrap();
        assert_eq!(filter.field, "countrycode");
        assert_eq!(filter.value, "DE");
        assert_eq!(filter.kind, geosearch_query_models::MatchKind::Term);
        assert_eq!(root(&query).count(Occur::Must), 0);
    }

    #[test]
    fn layers_and_bbox_are_unscored_filters() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler
            .add_layers(&["house".to_string(), "street".to_string()])
            .add_bounding_box(Some(BoundingBox::new(13.0, 52.0, 14.0, 53.0)));
        let query = compiler.into_query();
        let root = root(&query);

        assert_eq!(root.count(Occur::Filter), 2);
        assert_eq!(root.count(Occur::Should), 0);
        let layers = root.clauses_with(Occur::Filter).next().unwrap().as_bool().unwrap();
        assert_eq!(layers.minimum_should_match(), Some(MinimumShouldMatch::Count(1)));
        let values: Vec<&str> = layers
            .clauses_with(Occur::Should)
            .filter_map(QueryNode::as_match)
            .map(|m| m.value.as_str())
            .collect();
        assert_eq!(values, ["house", "street"]);
        assert!(matches!(
            root.clauses_with(Occur::Filter).nth(1),
            Some(QueryNode::GeoBoundingBox(_))
        ));
    }

    #[test]
    fn no_layers_and_no_bbox_add_nothing() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_layers(&[]).add_bounding_box(None);
        assert!(compiler.into_query().as_bool().unwrap().is_empty());
    }

    #[test]
    fn state_is_optional_even_in_strict_mode() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_state(Some("NY"), true).unwrap();
        let query = compiler.into_query();

        let state = only_clause(&query, Occur::Should);
        assert_eq!(state.boost(), Some(0.1));
        assert_eq!(root(&query).count(Occur::Must), 0);
    }

    #[test]
    fn city_alone_matches_city_and_district_records() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Springfield"), false, false).unwrap();
        let query = compiler.into_query();

        let combined = only_clause(&query, Occur::Must).as_bool().unwrap();
        assert_eq!(combined.count(Occur::Should), 4);

        let branches: Vec<&QueryNode> = combined.clauses_with(Occur::Should).collect();
        let city_field = branches[0].as_bool().unwrap();
        assert_eq!(city_field.boost(), Some(3.0));
        assert!(
            city_field
                .clauses_with(Occur::Should)
                .filter_map(QueryNode::as_match)
                .any(|m| m.field == "city.en" && m.value == "Springfield")
        );

        let city_name = branches
            .iter()
            .find(|node| is_typed_name(node, "city"))
            .expect("city name branch");
        assert_eq!(city_name.boost(), Some(3.75));

        let district_name = branches
            .iter()
            .find(|node| is_typed_name(node, "district"))
            .expect("district name branch");
        assert!((district_name.boost().unwrap() - 2.97).abs() < 1e-5);
        assert_eq!(
            district_name
                .as_bool()
                .unwrap()
                .clauses_with(Occur::Filter)
                .filter_map(QueryNode::as_bool)
                .filter(|b| b.count(Occur::MustNot) == 1)
                .count(),
            1
        );
    }

    #[test]
    fn district_field_branch_excludes_city_matches() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Springfield"), false, false).unwrap();
        let query = compiler.into_query();

        let combined = only_clause(&query, Occur::Must).as_bool().unwrap();
        let district = combined
            .clauses_with(Occur::Should)
            .filter_map(QueryNode::as_bool)
            .find(|b| {
                b.clauses_with(Occur::Should)
                    .filter_map(QueryNode::as_match)
                    .any(|m| m.field == "district.en")
            })
            .expect("district field branch");
        assert!((district.boost().unwrap() - 2.85).abs() < 1e-5);

        let exclusion = district
            .clauses_with(Occur::Filter)
            .filter_map(QueryNode::as_bool)
            .next()
            .unwrap();
        let excluded = exclusion.clauses_with(Occur::MustNot).next().unwrap();
        assert_eq!(excluded.boost(), Some(3.0));
    }

    #[test]
    fn strict_city_with_district_and_street_matches_city_field_only() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Berlin"), true, true).unwrap();
        let query = compiler.into_query();

        let city = only_clause(&query, Occur::Must).as_bool().unwrap();
        assert_eq!(city.boost(), Some(3.0));
        assert!(
            city.clauses_with(Occur::Should)
                .filter_map(QueryNode::as_match)
                .all(|m| m.field.starts_with("city."))
        );
    }

    #[test]
    fn city_with_district_offers_city_name() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Berlin"), true, false).unwrap();
        let query = compiler.into_query();

        let combined = only_clause(&query, Occur::Must).as_bool().unwrap();
        assert_eq!(combined.count(Occur::Should), 2);
        let city_name = combined
            .clauses_with(Occur::Should)
            .find(|node| is_typed_name(node, "city"))
            .unwrap();
        assert_eq!(city_name.boost(), Some(3.0));
    }

    #[test]
    fn strict_city_with_street_skips_name_records() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Berlin"), false, true).unwrap();
        let query = compiler.into_query();

        let combined = only_clause(&query, Occur::Must).as_bool().unwrap();
        assert_eq!(combined.count(Occur::Should), 2);
        assert!(
            !combined
                .clauses_with(Occur::Should)
                .any(|node| is_typed_name(node, "city") || is_typed_name(node, "district"))
        );
    }

    #[test]
    fn lenient_city_with_street_keeps_name_records() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler.add_city(Some("Berlin"), false, true).unwrap();
        let query = compiler.into_query();

        let combined = only_clause(&query, Occur::Should).as_bool().unwrap();
        assert_eq!(combined.count(Occur::Should), 4);
        let city_name = combined
            .clauses_with(Occur::Should)
            .find(|node| is_typed_name(node, "city"))
            .unwrap();
        assert_eq!(city_name.boost(), Some(2.25));
    }

    #[test]
    fn postcode_fuzziness_follows_mode() {
        let languages = languages();

        let mut strict = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        strict.add_postal_code(Some("10115")).unwrap();
        let query = strict.into_query();
        let postcode = only_clause(&query, Occur::Must).as_match().unwrap();
        assert_eq!(postcode.kind, geosearch_query_models::MatchKind::Fuzzy(Fuzziness::Exact));
        assert_eq!(postcode.boost, Some(7.0));

        let mut lenient = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        lenient.add_postal_code(Some("SW1A 1AA")).unwrap();
        let query = lenient.into_query();
        let postcode = only_clause(&query, Occur::Should).as_match().unwrap();
        assert_eq!(
            postcode.kind,
            geosearch_query_models::MatchKind::FuzzyTokens(Fuzziness::Auto)
        );
    }

    #[test]
    fn street_without_house_number_is_optional() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_street_and_house_number(Some("Main Street"), None);
        let query = compiler.into_query();

        let street = only_clause(&query, Occur::Should).as_bool().unwrap();
        assert_eq!(street.boost(), Some(5.0));
        assert_eq!(street.count(Occur::Should), 2);
        assert!(
            street
                .clauses_with(Occur::Should)
                .any(|node| is_typed_name(node, "street"))
        );
    }

    #[test]
    fn strict_house_number_requires_number_on_street() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_city(Some("Berlin"), false, true).unwrap();
        compiler.add_street_and_house_number(Some("Unter den Linden"), Some("77"));
        let query = compiler.into_query();

        assert_eq!(root(&query).count(Occur::Must), 2);
        let house = root(&query)
            .clauses_with(Occur::Must)
            .nth(1)
            .and_then(QueryNode::as_bool)
            .unwrap();
        assert_eq!(house.boost(), Some(10.0));

        let number = house
            .clauses_with(Occur::Must)
            .next()
            .and_then(QueryNode::as_match)
            .unwrap();
        assert_eq!(number.field, "housenumber");
        assert_eq!(number.kind, geosearch_query_models::MatchKind::Phrase);

        let street = house
            .clauses_with(Occur::Filter)
            .next()
            .and_then(QueryNode::as_bool)
            .unwrap();
        assert_eq!(street.count(Occur::Should), 1);
        assert_eq!(house.count(Occur::Filter), 1);
    }

    #[test]
    fn lenient_house_number_scores_unmatched_below_matched() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler.add_city(Some("Berlin"), false, true).unwrap();
        compiler.add_street_and_house_number(Some("Unter den Linden"), Some("77"));
        let query = compiler.into_query();
        let root = root(&query);

        assert_eq!(root.count(Occur::Filter), 1);
        assert_eq!(root.count(Occur::Should), 3);

        let house = root
            .clauses_with(Occur::Should)
            .filter_map(QueryNode::as_bool)
            .find(|b| b.count(Occur::Filter) == 2)
            .expect("house-number clause filtered by street and city scope");

        let branches: Vec<(&QueryNode, f32)> = house
            .clauses_with(Occur::Should)
            .map(|node| match node {
                QueryNode::ConstantScore { filter, score } => (filter.as_ref(), *score),
                other => panic!("expected a constant-score branch, got {other:?}"),
            })
            .collect();
        assert_eq!(branches.len(), 2);

        let (_, unmatched_boost) = branches
            .iter()
            .find(|(filter, _)| filter.as_bool().is_some_and(|b| b.count(Occur::MustNot) == 1))
            .unwrap();
        let (_, matched_boost) = branches
            .iter()
            .find(|(filter, _)| filter.as_match().is_some_and(|m| m.field == "housenumber"))
            .unwrap();

        assert_eq!(*matched_boost, 10.0);
        assert_eq!(*unmatched_boost, 5.0);

        let street_only = root
            .clauses_with(Occur::Should)
            .find(|node| node.boost() == Some(0.1))
            .and_then(QueryNode::as_bool)
            .expect("street-without-number bonus");
        assert_eq!(street_only.count(Occur::Must), 1);
        assert_eq!(street_only.count(Occur::MustNot), 1);
    }

    #[test]
    fn lenient_house_number_without_city_has_no_scope_filter() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler.add_street_and_house_number(Some("Main Street"), Some("1"));
        let query = compiler.into_query();

        let house = root(&query)
            .clauses_with(Occur::Should)
            .filter_map(QueryNode::as_bool)
            .find(|b| {
                b.clauses_with(Occur::Should).any(|node| {
                    node.find(&|n| n.as_match().is_some_and(|m| m.field == "housenumber"))
                        .is_some()
                })
            })
            .unwrap();
        assert_eq!(house.count(Occur::Filter), 1);
    }

    #[test]
    fn strict_never_sets_minimum_should_match() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Strict, "en", &languages);
        compiler.add_state(Some("Bavaria"), true).unwrap();
        compiler.add_street_and_house_number(Some("Main Street"), None);
        let query = compiler.into_query();
        assert_eq!(root(&query).minimum_should_match(), None);
    }

    #[test]
    fn lenient_requires_ten_percent_of_should_clauses() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler.add_state(Some("Bavaria"), true).unwrap();
        compiler.add_county(Some("Upper Bavaria"), true).unwrap();
        compiler.add_city(Some("Munich"), false, true).unwrap();
        let query = compiler.into_query();
        assert_eq!(root(&query).count(Occur::Should), 3);
        assert_eq!(
            root(&query).minimum_should_match(),
            Some(MinimumShouldMatch::Count(1))
        );
    }

    #[test]
    fn lenient_without_should_clauses_sets_no_threshold() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler.add_country_code(Some("DE"));
        let query = compiler.into_query();
        assert_eq!(root(&query).minimum_should_match(), None);
    }

    #[test]
    fn district_and_postcode_feed_city_scope() {
        let languages = languages();
        let mut compiler = AddressQueryCompiler::new(MatchMode::Lenient, "en", &languages);
        compiler.add_county(Some("Cork"), true).unwrap();
        compiler.add_postal_code(Some("T12")).unwrap();
        compiler.add_district(Some("Ballintemple"), true).unwrap();
        assert!(!compiler.city_scope.is_empty());
        let scope = compiler.city_scope.as_filter().unwrap();
        assert_eq!(scope.as_bool().unwrap().count(Occur::Should), 2);
    }
}
