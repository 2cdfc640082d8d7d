//! Reading places from JSON-lines files.

use std::io::BufRead;

use geosearch_search_models::Place;

/// Reads one [`Place`] per non-blank line.
///
/// # Errors
///
/// * If a line cannot be read
/// * If a line is not a place, naming its 1-based line number
pub fn read_places(reader: impl BufRead) -> Result<Vec<Place>, Box<dyn std::error::Error>> {
    let mut places = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let place: Place =
            serde_json::from_str(&line).map_err(|e| format!("line {}: {e}", i + 1))?;
        places.push(place);
    }

    Ok(places)
}
