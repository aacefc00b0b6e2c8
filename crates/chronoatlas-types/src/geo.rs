//! Geographic primitives: coordinates, polygon rings and named regions.
//!
//! Region geometry follows the `GeoJSON` layout so district and country
//! datasets deserialize straight into [`Geometry`]. Vertices are stored as
//! `[lng, lat]` pairs; the locator treats `lng` as `x` and `lat` as `y`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point on the map in plain degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinates {
    /// Create a coordinate pair.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite numbers.
    pub const fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// The point in ring space (`x = lng`, `y = lat`).
    pub const fn to_position(self) -> Position {
        Position {
            x: self.lng,
            y: self.lat,
        }
    }
}

/// A single ring vertex in `GeoJSON` order.
///
/// Deserializes from a `[x, y]` or `[x, y, z]` array; any altitude
/// component is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Position {
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
}

impl Position {
    /// Create a vertex from longitude and latitude.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(raw: Vec<f64>) -> Result<Self, Self::Error> {
        match (raw.first(), raw.get(1)) {
            (Some(&x), Some(&y)) => Ok(Self { x, y }),
            _ => Err(format!(
                "position needs at least 2 components, got {}",
                raw.len()
            )),
        }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

/// A linear ring. Closed or implicitly closed.
pub type Ring = Vec<Position>;

/// An ordered list of rings: the first is the exterior boundary, the rest
/// are holes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    /// Exterior ring followed by hole rings.
    pub rings: Vec<Ring>,
}

impl Polygon {
    /// Create a polygon from its rings.
    pub const fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    /// The exterior boundary, if the polygon has any rings.
    pub fn exterior(&self) -> Option<&[Position]> {
        self.rings.first().map(Vec::as_slice)
    }
}

/// Region geometry, tagged the way `GeoJSON` tags it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single polygon.
    Polygon(Polygon),
    /// Several disjoint polygons sharing one label.
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Iterate the constituent polygons in collection order.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        let slice: &[Polygon] = match self {
            Self::Polygon(p) => core::slice::from_ref(p),
            Self::MultiPolygon(ps) => ps,
        };
        slice.iter()
    }
}

/// A labelled region such as a district or a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRegion {
    /// Display label (the feature's `properties.name`).
    pub label: String,
    /// Boundary geometry.
    pub geometry: Geometry,
}

impl GeoRegion {
    /// Create a region from a label and geometry.
    pub fn new(label: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            label: label.into(),
            geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_deserializes_from_geojson() {
        let json = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[0,1],[1,1,12.5],[1,0]]]]}"#;
        let geometry: Result<Geometry, _> = serde_json::from_str(json);
        assert!(matches!(geometry, Ok(Geometry::MultiPolygon(_))));
        let Ok(Geometry::MultiPolygon(polys)) = geometry else {
            return;
        };
        assert_eq!(polys.len(), 1);
        assert_eq!(
            polys.first().and_then(Polygon::exterior).map(<[Position]>::len),
            Some(4)
        );
    }

    #[test]
    fn short_position_is_rejected() {
        let json = r#"{"type":"Polygon","coordinates":[[[0],[1,1],[2,2]]]}"#;
        assert!(serde_json::from_str::<Geometry>(json).is_err());
    }

    #[test]
    fn unknown_geometry_type_is_rejected() {
        let json = r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#;
        assert!(serde_json::from_str::<Geometry>(json).is_err());
    }

    #[test]
    fn polygon_without_rings_has_no_exterior() {
        assert!(Polygon::default().exterior().is_none());
    }

    #[test]
    fn coordinates_map_to_lng_lat_position() {
        let p = Coordinates::new(41.0, 29.0).to_position();
        assert_eq!(p, Position::new(29.0, 41.0));
        assert!(!Coordinates::new(f64::NAN, 0.0).is_finite());
    }
}
