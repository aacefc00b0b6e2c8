//! Period-appropriate names for historical entities.
//!
//! [`resolve_historical_name`] answers for a single entity and year using
//! the exact-match interval lookup. [`list_entities_active_in_year`]
//! enumerates everything that existed in a year: an entity with no epoch
//! covering the year is left out rather than shown under an anachronistic
//! name.

use chronoatlas_types::{ActiveEntity, EpochName, HistoricalEntity};

use crate::interval;

/// Return the name and civilization valid for `entity` in `year`.
///
/// `None` when the entity did not exist yet or had ceased to exist
/// according to the dataset.
pub fn resolve_historical_name(entity: &HistoricalEntity, year: i32) -> Option<&EpochName> {
    interval::resolve(&entity.epochs, year).map(|record| &record.payload)
}

/// List every entity that has an epoch covering `year`, in dataset order.
pub fn list_entities_active_in_year(entities: &[HistoricalEntity], year: i32) -> Vec<ActiveEntity> {
    entities
        .iter()
        .filter_map(|entity| {
            resolve_historical_name(entity, year).map(|epoch| ActiveEntity {
                key: entity.canonical_key.clone(),
                historical_name: epoch.name.clone(),
                civilization: epoch.civilization.clone(),
                location: entity.location,
                kind: entity.kind,
                period: entity.period.clone(),
            })
        })
        .collect()
}

/// Find an entity by its key or any of its historical names.
///
/// Matching is case-insensitive and ignores surrounding whitespace. The
/// canonical key is checked across the whole dataset before epoch names,
/// so a modern name always beats an ancient homonym.
pub fn find_entity<'a>(entities: &'a [HistoricalEntity], query: &str) -> Option<&'a HistoricalEntity> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    entities
        .iter()
        .find(|entity| entity.canonical_key.to_lowercase() == needle)
        .or_else(|| {
            entities.iter().find(|entity| {
                entity
                    .epochs
                    .iter()
                    .any(|epoch| epoch.payload.name.to_lowercase() == needle)
            })
        })
}
