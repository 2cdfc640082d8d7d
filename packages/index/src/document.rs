//! Conversion between [`Place`] records and tantivy documents.

use geosearch_query::{FieldNames, fields};
use geosearch_search_models::{LocalizedNames, Place};
use tantivy::TantivyDocument;
use tantivy::schema::Value;

use crate::IndexError;
use crate::schema::PlaceFields;

/// Builds the tantivy document for `place`.
///
/// Localized values in languages the schema does not know are skipped.
/// Every logical path that receives a value is listed in the
/// `present_fields` keyword field so that existence checks can be
/// answered with a term lookup.
///
/// # Errors
///
/// Returns [`IndexError::Json`] if the place cannot be serialized.
pub fn to_document(fields: &PlaceFields, place: &Place) -> Result<TantivyDocument, IndexError> {
    let mut doc = TantivyDocument::default();
    let mut present = Vec::new();

    let localized: [(&str, &LocalizedNames); 6] = [
        (FieldNames::NAME, &place.name),
        (FieldNames::STATE, &place.state),
        (FieldNames::COUNTY, &place.county),
        (FieldNames::CITY, &place.city),
        (FieldNames::DISTRICT, &place.district),
        (FieldNames::STREET, &place.street),
    ];

    for (logical, names) in localized {
        for (language, value) in names {
            let path = fields::variant(logical, language);
            let Some(field) = fields.resolve(&path) else {
                log::trace!("Skipping {path}: not in schema");
                continue;
            };
            doc.add_text(field, value);
            present.push(path);
        }
        if !names.is_empty() {
            present.push(logical.to_string());
        }
    }

    if let Some(postcode) = place.postcode.as_deref().filter(|v| !v.is_empty()) {
        doc.add_text(fields.postcode, postcode);
        present.push(FieldNames::POSTCODE.to_string());
    }

    if let Some(housenumber) = place.housenumber.as_deref().filter(|v| !v.is_empty()) {
        doc.add_text(fields.housenumber, housenumber);
        present.push(FieldNames::HOUSENUMBER.to_string());
    }

    doc.add_text(fields.object_type, &place.object_type);
    doc.add_text(fields.country_code, place.country_code.to_uppercase());

    if let Some(coordinate) = place.coordinate {
        doc.add_f64(fields.lat, coordinate.lat);
        doc.add_f64(fields.lon, coordinate.lon);
    }

    for path in present {
        doc.add_text(fields.present_fields, path);
    }

    doc.add_text(fields.source, serde_json::to_string(place)?);

    Ok(doc)
}

/// Reads the stored place back from a search hit.
///
/// # Errors
///
/// Returns [`IndexError::MissingSource`] if the document carries no stored
/// place, or [`IndexError::Json`] if it cannot be parsed.
pub fn from_document(fields: &PlaceFields, doc: &TantivyDocument) -> Result<Place, IndexError> {
    let source = doc
        .get_first(fields.source)
        .and_then(|v| v.as_str())
        .ok_or(IndexError::MissingSource)?;

    Ok(serde_json::from_str(source)?)
}
