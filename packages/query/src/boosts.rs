//! Per-field boost weights.
//!
//! All weights live in one [`BoostTable`] so that every variant of the
//! ranking can be compared side by side and tested in isolation.

/// Boost weights used by the address compiler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostTable {
    /// State. Kept tiny because some records carry "NY" and others
    /// "New York".
    pub state: f32,
    /// County.
    pub county: f32,
    /// City.
    pub city: f32,
    /// Postal code.
    pub postcode: f32,
    /// District.
    pub district: f32,
    /// Street. Streets in the wrong city are filtered out, so this can
    /// be high.
    pub street: f32,
    /// House number matched exactly.
    pub house_number: f32,
    /// Lenient mode: record has no house number at all.
    pub house_number_unmatched: f32,
    /// Lenient mode: street matched, record has no house number.
    pub street_without_house_number: f32,
    /// Multiplier for field variants in a language other than the
    /// requested one (and for the `default` variant).
    pub wrong_language: f32,
    /// City-name record boost, as a factor of `city`, when a street is
    /// present.
    pub city_name_with_street: f32,
    /// City-name record boost, as a factor of `city`, when a district is
    /// present.
    pub city_name_with_district: f32,
    /// City-name record boost, as a factor of `city`, with neither.
    pub city_name_alone: f32,
    /// District field matched by the city value, as a factor of `city`.
    pub district_as_city: f32,
    /// District-name record matched by the city value, as a factor of
    /// `city`.
    pub district_name_as_city: f32,
}

impl BoostTable {
    /// Current reference weights.
    pub const DEFAULT: Self = Self {
        state: 0.1,
        county: 4.0,
        city: 3.0,
        postcode: 7.0,
        district: 2.0,
        street: 5.0,
        house_number: 10.0,
        house_number_unmatched: 5.0,
        street_without_house_number: 0.1,
        wrong_language: 0.1,
        city_name_with_street: 0.75,
        city_name_with_district: 1.0,
        city_name_alone: 1.25,
        district_as_city: 0.95,
        district_name_as_city: 0.99,
    };

    /// Boost of a city-name record given the rest of the request.
    #[must_use]
    pub fn city_name(&self, has_street: bool, has_district: bool) -> f32 {
        let factor = if has_street {
            self.city_name_with_street
        } else if has_district {
            self.city_name_with_district
        } else {
            self.city_name_alone
        };
        factor * self.city
    }
}

impl Default for BoostTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}
