//! Time-bounded records and the historical entities built from them.
//!
//! A [`HistoricalEntity`] owns a list of name epochs, each a
//! [`TimeBoundedRecord`] over an [`EpochName`]. Entities are loaded once
//! at startup and never mutated at runtime.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinates;

/// A payload valid over the closed year interval `[start_year, end_year]`.
///
/// Years before the common era are negative. The interval is expected to
/// satisfy `start_year <= end_year`; inverted intervals never match any
/// year and are reported by dataset validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TimeBoundedRecord<T> {
    /// The record valid during the interval.
    pub payload: T,
    /// First year of validity (inclusive).
    pub start_year: i32,
    /// Last year of validity (inclusive).
    pub end_year: i32,
}

impl<T> TimeBoundedRecord<T> {
    /// Create a record valid from `start_year` through `end_year`.
    pub const fn new(payload: T, start_year: i32, end_year: i32) -> Self {
        Self {
            payload,
            start_year,
            end_year,
        }
    }

    /// Whether `year` falls inside the closed interval.
    pub const fn contains(&self, year: i32) -> bool {
        year >= self.start_year && year <= self.end_year
    }
}

/// The name and civilization an entity carried during one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EpochName {
    /// The period-appropriate name.
    pub name: String,
    /// The civilization that used the name.
    pub civilization: String,
}

impl EpochName {
    /// Create an epoch name.
    pub fn new(name: impl Into<String>, civilization: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            civilization: civilization.into(),
        }
    }
}

/// Marker category for the map layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// A settlement.
    #[default]
    City,
    /// An archaeological site.
    AncientSite,
}

/// A place whose name changes over time.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalEntity {
    /// Stable lookup key (the modern name).
    pub canonical_key: String,
    /// Marker position.
    pub location: Coordinates,
    /// Name epochs in dataset order.
    pub epochs: Vec<TimeBoundedRecord<EpochName>>,
    /// Marker category.
    pub kind: EntityKind,
    /// Free-text period label (e.g. "Bronze Age").
    pub period: Option<String>,
}

impl HistoricalEntity {
    /// Create a city entity with the given epochs.
    pub fn new(
        canonical_key: impl Into<String>,
        location: Coordinates,
        epochs: Vec<TimeBoundedRecord<EpochName>>,
    ) -> Self {
        Self {
            canonical_key: canonical_key.into(),
            location,
            epochs,
            kind: EntityKind::City,
            period: None,
        }
    }
}

/// The outcome of resolving a single searched entity at a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResolvedName {
    /// The resolved name.
    pub name: String,
    /// The civilization that used it.
    pub civilization: String,
    /// True when no epoch covers the year and the nearest one was used.
    pub approximate: bool,
}

/// One entity that existed in a queried year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ActiveEntity {
    /// The entity's canonical key (modern name).
    pub key: String,
    /// The name valid in the queried year.
    pub historical_name: String,
    /// The civilization valid in the queried year.
    pub civilization: String,
    /// Marker position.
    pub location: Coordinates,
    /// Marker category.
    pub kind: EntityKind,
    /// Free-text period label.
    pub period: Option<String>,
}
