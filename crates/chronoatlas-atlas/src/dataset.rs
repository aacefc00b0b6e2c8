//! Reference dataset loading and data-quality reporting.
//!
//! Region datasets are `GeoJSON` feature collections; entity datasets are
//! JSON arrays of `{ modernName, lat, lng, names: [...] }`. Both are static
//! inputs produced by external conversion scripts and loaded once at
//! startup.
//!
//! Messy data is tolerated. [`validate_entities`] and [`validate_regions`]
//! report overlapping or gapped epochs and degenerate rings so they can be
//! corrected later, but nothing is rejected: lookups stay deterministic via
//! first-match-wins.

use std::path::Path;

use chronoatlas_types::{
    Coordinates, EntityKind, EpochName, GeoRegion, Geometry, HistoricalEntity, TimeBoundedRecord,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::AtlasError;

// ---------------------------------------------------------------------------
// Raw dataset shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawFeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntity {
    modern_name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    names: Vec<RawName>,
    #[serde(default, rename = "type")]
    kind: Option<EntityKind>,
    #[serde(default)]
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawName {
    name: String,
    start_year: i32,
    end_year: i32,
    #[serde(default)]
    civilization: String,
}

impl From<RawEntity> for HistoricalEntity {
    fn from(raw: RawEntity) -> Self {
        Self {
            canonical_key: raw.modern_name,
            location: Coordinates::new(raw.lat, raw.lng),
            epochs: raw
                .names
                .into_iter()
                .map(|n| {
                    TimeBoundedRecord::new(EpochName::new(n.name, n.civilization), n.start_year, n.end_year)
                })
                .collect(),
            kind: raw.kind.unwrap_or_default(),
            period: raw.period,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Decode regions from a `GeoJSON` `FeatureCollection` document.
///
/// Features without a string `properties.name`, or whose geometry is not a
/// `Polygon`/`MultiPolygon`, are skipped.
///
/// # Errors
///
/// Returns [`AtlasError::Decode`] for malformed JSON and
/// [`AtlasError::NotFeatureCollection`] for other `GeoJSON` objects.
pub fn regions_from_geojson(json: &str) -> Result<Vec<GeoRegion>, AtlasError> {
    let collection: RawFeatureCollection = serde_json::from_str(json)?;
    if collection.kind != "FeatureCollection" {
        return Err(AtlasError::NotFeatureCollection(collection.kind));
    }

    let total = collection.features.len();
    let regions: Vec<GeoRegion> = collection
        .features
        .into_iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let Some(label) = feature.properties.get("name").and_then(serde_json::Value::as_str)
            else {
                debug!(index, "skipping feature without a name");
                return None;
            };
            let geometry = feature
                .geometry
                .and_then(|g| serde_json::from_value::<Geometry>(g).ok());
            let Some(geometry) = geometry else {
                debug!(index, label, "skipping feature without polygon geometry");
                return None;
            };
            Some(GeoRegion::new(label, geometry))
        })
        .collect();

    debug!(total, kept = regions.len(), "decoded region features");
    Ok(regions)
}

/// Decode historical entities from a JSON array.
///
/// # Errors
///
/// Returns [`AtlasError::Decode`] if the document is not an array of
/// entity records.
pub fn entities_from_json(json: &str) -> Result<Vec<HistoricalEntity>, AtlasError> {
    let raw: Vec<RawEntity> = serde_json::from_str(json)?;
    Ok(raw.into_iter().map(HistoricalEntity::from).collect())
}

/// Load a region dataset from disk and report its data-quality issues.
///
/// # Errors
///
/// Returns [`AtlasError::Io`] if the file cannot be read, or a decode
/// error from [`regions_from_geojson`].
pub fn load_regions(path: &Path) -> Result<Vec<GeoRegion>, AtlasError> {
    let json = read(path)?;
    let regions = regions_from_geojson(&json)?;
    let issues = validate_regions(&regions);
    info!(
        path = %path.display(),
        regions = regions.len(),
        issues = issues.len(),
        "region dataset loaded"
    );
    Ok(regions)
}

/// Load an entity dataset from disk and report its data-quality issues.
///
/// # Errors
///
/// Returns [`AtlasError::Io`] if the file cannot be read, or a decode
/// error from [`entities_from_json`].
pub fn load_entities(path: &Path) -> Result<Vec<HistoricalEntity>, AtlasError> {
    let json = read(path)?;
    let entities = entities_from_json(&json)?;
    let issues = validate_entities(&entities);
    info!(
        path = %path.display(),
        entities = entities.len(),
        issues = issues.len(),
        "entity dataset loaded"
    );
    Ok(entities)
}

fn read(path: &Path) -> Result<String, AtlasError> {
    std::fs::read_to_string(path).map_err(|source| AtlasError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A data-quality problem found in a reference dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityIssue {
    /// An epoch ends before it starts.
    InvertedInterval {
        /// Entity key.
        entity: String,
        /// Epoch name.
        epoch: String,
    },
    /// Two epochs share more than a boundary year.
    OverlappingEpochs {
        /// Entity key.
        entity: String,
        /// The earlier epoch in dataset order.
        first: String,
        /// The later epoch in dataset order.
        second: String,
    },
    /// Consecutive epochs (by start year) leave years uncovered.
    EpochGap {
        /// Entity key.
        entity: String,
        /// Last covered year before the gap.
        after_year: i32,
        /// First covered year after the gap.
        before_year: i32,
    },
    /// A region polygon has no rings at all.
    MissingExteriorRing {
        /// Region label.
        region: String,
    },
    /// A region's exterior ring has fewer than three vertices.
    DegenerateRing {
        /// Region label.
        region: String,
        /// Number of vertices found.
        vertices: usize,
    },
}

/// Report interval problems in every entity's epoch list.
///
/// Adjacent epochs sharing their boundary year (e.g. `..1453` and
/// `1453..`) are the dataset convention and are not reported.
pub fn validate_entities(entities: &[HistoricalEntity]) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();
    for entity in entities {
        let key = &entity.canonical_key;
        let epochs = &entity.epochs;

        for epoch in epochs.iter().filter(|e| e.start_year > e.end_year) {
            issues.push(DataQualityIssue::InvertedInterval {
                entity: key.clone(),
                epoch: epoch.payload.name.clone(),
            });
        }

        for (i, a) in epochs.iter().enumerate() {
            for b in epochs.iter().skip(i.saturating_add(1)) {
                if a.start_year < b.end_year && b.start_year < a.end_year {
                    issues.push(DataQualityIssue::OverlappingEpochs {
                        entity: key.clone(),
                        first: a.payload.name.clone(),
                        second: b.payload.name.clone(),
                    });
                }
            }
        }

        let mut ordered: Vec<_> = epochs.iter().filter(|e| e.start_year <= e.end_year).collect();
        ordered.sort_by_key(|e| e.start_year);
        let mut covered_until: Option<i32> = None;
        for epoch in ordered {
            if let Some(until) = covered_until.filter(|u| epoch.start_year > u.saturating_add(1)) {
                issues.push(DataQualityIssue::EpochGap {
                    entity: key.clone(),
                    after_year: until,
                    before_year: epoch.start_year,
                });
            }
            covered_until = Some(covered_until.map_or(epoch.end_year, |u| u.max(epoch.end_year)));
        }
    }

    for issue in &issues {
        warn!(?issue, "entity dataset quality issue");
    }
    issues
}

/// Report polygons the locator can never match.
pub fn validate_regions(regions: &[GeoRegion]) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();
    for region in regions {
        for polygon in region.geometry.polygons() {
            match polygon.exterior() {
                None => issues.push(DataQualityIssue::MissingExteriorRing {
                    region: region.label.clone(),
                }),
                Some(ring) if ring.len() < 3 => issues.push(DataQualityIssue::DegenerateRing {
                    region: region.label.clone(),
                    vertices: ring.len(),
                }),
                Some(_) => {}
            }
        }
    }

    for issue in &issues {
        warn!(?issue, "region dataset quality issue");
    }
    issues
}
