//! Field and object-type names the compiler matches against.
//!
//! These are logical paths. Multi-language fields are stored as one
//! variant per language (`city.en`, `city.de`, …) plus a `default`
//! variant; single-valued fields like `postcode` have no variants.

/// Names of the indexed place fields.
pub struct FieldNames;

impl FieldNames {
    /// Generic name of the place itself (multi-language).
    pub const NAME: &'static str = "name";
    /// Upper-cased ISO 3166-1 alpha-2 code, exact match.
    pub const COUNTRY_CODE: &'static str = "countrycode";
    /// State or region (multi-language).
    pub const STATE: &'static str = "state";
    /// County (multi-language).
    pub const COUNTY: &'static str = "county";
    /// City (multi-language).
    pub const CITY: &'static str = "city";
    /// District or suburb (multi-language).
    pub const DISTRICT: &'static str = "district";
    /// Street (multi-language).
    pub const STREET: &'static str = "street";
    /// Postal code.
    pub const POSTCODE: &'static str = "postcode";
    /// House number.
    pub const HOUSENUMBER: &'static str = "housenumber";
    /// Kind of place a record describes (see [`ObjectTypes`]).
    pub const OBJECT_TYPE: &'static str = "object_type";
    /// Language-neutral variant suffix of multi-language fields.
    pub const DEFAULT_VARIANT: &'static str = "default";
}

/// Values of the `object_type` field.
pub struct ObjectTypes;

impl ObjectTypes {
    /// A state or region record.
    pub const STATE: &'static str = "state";
    /// A county record.
    pub const COUNTY: &'static str = "county";
    /// A city, town or village record.
    pub const CITY: &'static str = "city";
    /// A district or suburb record.
    pub const DISTRICT: &'static str = "district";
    /// A street record.
    pub const STREET: &'static str = "street";
    /// A single address (house) record.
    pub const HOUSE: &'static str = "house";
}

/// Path of one variant of a multi-language field, e.g. `street.default`.
#[must_use]
pub fn variant(field: &str, variant: &str) -> String {
    format!("{field}.{variant}")
}

/// Whether clauses on `field` narrow the set of acceptable cities.
#[must_use]
pub fn is_city_related(field: &str) -> bool {
    matches!(
        field,
        FieldNames::CITY | FieldNames::POSTCODE | FieldNames::DISTRICT
    )
}
