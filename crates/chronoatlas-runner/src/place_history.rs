//! Parsing of place-name etymology responses.
//!
//! The place-history prompt asks for a bare JSON array of
//! [`PlaceNameEntry`] values. Models often wrap it in a code fence or a
//! sentence of prose; both are tolerated. An unusable response is an empty
//! history, never an error.

use chronoatlas_types::PlaceNameEntry;
use tracing::debug;

/// Parse a place-name history, oldest name first.
///
/// Entries with the same `startYear` keep the order the model gave them.
pub fn parse_place_name_history(raw: &str) -> Vec<PlaceNameEntry> {
    let cleaned = raw
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "");
    let cleaned = cleaned.trim();

    let mut entries = serde_json::from_str::<Vec<PlaceNameEntry>>(cleaned)
        .ok()
        .or_else(|| {
            let start = cleaned.find('[')?;
            let end = cleaned.rfind(']')?;
            let slice = cleaned.get(start..=end)?;
            debug!("place history recovered from embedded array");
            serde_json::from_str(slice).ok()
        })
        .unwrap_or_else(|| {
            debug!(len = raw.len(), "place history response unparsable");
            Vec::new()
        });

    entries.sort_by_key(|entry| entry.start_year);
    entries
}
