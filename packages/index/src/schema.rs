//! Tantivy schema for place documents.
//!
//! Logical field paths (`street.default`, `city.en`, `postcode`) map to
//! tantivy fields by replacing the dot with an underscore. Multi-language
//! attributes get one field per configured language plus a `default`
//! variant.

use std::collections::BTreeMap;

use geosearch_query::FieldNames;
use geosearch_query::fields;
use tantivy::Index;
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, TextFieldIndexing,
    TextOptions,
};
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer};

use crate::IndexError;

/// Name under which [`place_analyzer`] is registered.
pub const PLACE_TOKENIZER: &str = "place";

/// Keyword field listing the logical paths a document has values for.
pub const PRESENT_FIELDS: &str = "present_fields";

/// Stored-only field holding the original place as JSON.
pub const SOURCE: &str = "source";

/// Latitude (WGS84).
pub const LAT: &str = "lat";

/// Longitude (WGS84).
pub const LON: &str = "lon";

/// Attributes stored once per language.
pub const LOCALIZED_FIELDS: &[&str] = &[
    FieldNames::NAME,
    FieldNames::STATE,
    FieldNames::COUNTY,
    FieldNames::CITY,
    FieldNames::DISTRICT,
    FieldNames::STREET,
];

/// Tantivy field name for a logical field path.
#[must_use]
pub fn tantivy_name(path: &str) -> String {
    path.replace('.', "_")
}

/// The analyzer used for every tokenized field, at index and query time.
#[must_use]
pub fn place_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(AsciiFoldingFilter)
        .build()
}

/// Registers [`place_analyzer`] on `index`.
///
/// Tokenizers are not persisted with the index, so this has to run every
/// time an index is created or opened.
pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(PLACE_TOKENIZER, place_analyzer());
}

/// Builds the schema for the given languages.
#[must_use]
pub fn build_schema(languages: &[String]) -> Schema {
    let mut builder = Schema::builder();

    let text = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(PLACE_TOKENIZER)
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    for field in LOCALIZED_FIELDS {
        builder.add_text_field(&variant_name(field, FieldNames::DEFAULT_VARIANT), text.clone());
        for language in languages {
            builder.add_text_field(&variant_name(field, language), text.clone());
        }
    }

    builder.add_text_field(FieldNames::POSTCODE, text.clone());
    builder.add_text_field(FieldNames::HOUSENUMBER, text);

    builder.add_text_field(FieldNames::COUNTRY_CODE, STRING);
    builder.add_text_field(FieldNames::OBJECT_TYPE, STRING);
    builder.add_text_field(PRESENT_FIELDS, STRING);

    let coordinate = NumericOptions::default().set_stored().set_fast();
    builder.add_f64_field(LAT, coordinate.clone());
    builder.add_f64_field(LON, coordinate);

    builder.add_text_field(SOURCE, STORED);

    builder.build()
}

fn variant_name(field: &str, variant: &str) -> String {
    tantivy_name(&fields::variant(field, variant))
}

/// Resolved field handles.
#[derive(Debug, Clone)]
pub struct PlaceFields {
    /// `object_type`.
    pub object_type: Field,
    /// `countrycode`.
    pub country_code: Field,
    /// `postcode`.
    pub postcode: Field,
    /// `housenumber`.
    pub housenumber: Field,
    /// `present_fields`.
    pub present_fields: Field,
    /// `lat`.
    pub lat: Field,
    /// `lon`.
    pub lon: Field,
    /// `source`.
    pub source: Field,
    by_path: BTreeMap<String, Field>,
    languages: Vec<String>,
}

impl PlaceFields {
    /// Resolves field handles from a schema built by [`build_schema`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Tantivy`] if a required field is missing.
    pub fn from_schema(schema: &Schema) -> Result<Self, IndexError> {
        let mut by_path = BTreeMap::new();
        let mut languages = Vec::new();

        for (field, entry) in schema.fields() {
            let name = entry.name();
            for logical in LOCALIZED_FIELDS {
                let Some(variant) = name
                    .strip_prefix(*logical)
                    .and_then(|rest| rest.strip_prefix('_'))
                else {
                    continue;
                };
                by_path.insert(fields::variant(logical, variant), field);
                if *logical == FieldNames::NAME
                    && variant != FieldNames::DEFAULT_VARIANT
                    && !languages.iter().any(|l| l == variant)
                {
                    languages.push(variant.to_string());
                }
            }
        }

        let object_type = schema.get_field(FieldNames::OBJECT_TYPE)?;
        let country_code = schema.get_field(FieldNames::COUNTRY_CODE)?;
        let postcode = schema.get_field(FieldNames::POSTCODE)?;
        let housenumber = schema.get_field(FieldNames::HOUSENUMBER)?;

        by_path.insert(FieldNames::OBJECT_TYPE.to_string(), object_type);
        by_path.insert(FieldNames::COUNTRY_CODE.to_string(), country_code);
        by_path.insert(FieldNames::POSTCODE.to_string(), postcode);
        by_path.insert(FieldNames::HOUSENUMBER.to_string(), housenumber);

        Ok(Self {
            object_type,
            country_code,
            postcode,
            housenumber,
            present_fields: schema.get_field(PRESENT_FIELDS)?,
            lat: schema.get_field(LAT)?,
            lon: schema.get_field(LON)?,
            source: schema.get_field(SOURCE)?,
            by_path,
            languages,
        })
    }

    /// The field for a logical path such as `city.en`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<Field> {
        self.by_path.get(path).copied()
    }

    /// Languages the schema has localized fields for.
    #[must_use]
    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

#[cfg(test)]
mod tests {
    use tantivy::tokenizer::TokenStream;

    use super::*;

    fn languages() -> Vec<String> {
        vec!["en".to_string(), "de".to_string()]
    }

    #[test]
    fn maps_logical_paths_to_tantivy_names() {
        assert_eq!(tantivy_name("street.default"), "street_default");
        assert_eq!(tantivy_name("postcode"), "postcode");
    }

    #[test]
    fn schema_has_variant_per_language() {
        let schema = build_schema(&languages());
        assert!(schema.get_field("city_default").is_ok());
        assert!(schema.get_field("city_en").is_ok());
        assert!(schema.get_field("name_de").is_ok());
        assert!(schema.get_field("city_fr").is_err());
        assert!(schema.get_field(PRESENT_FIELDS).is_ok());
    }

    #[test]
    fn fields_resolve_logical_paths() {
        let schema = build_schema(&languages());
        let fields = PlaceFields::from_schema(&schema).unwrap();

        assert_eq!(fields.resolve("street.default"), schema.get_field("street_default").ok());
        assert_eq!(fields.resolve("countrycode"), Some(fields.country_code));
        assert_eq!(fields.resolve("street.fr"), None);
        assert_eq!(fields.languages(), languages().as_slice());
    }

    #[test]
    fn analyzer_folds_and_lowercases() {
        let mut analyzer = place_analyzer();
        let mut stream = analyzer.token_stream("Große Straße");
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        assert_eq!(tokens, vec!["grosse", "strasse"]);
    }
}
