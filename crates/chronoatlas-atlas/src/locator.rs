//! Point-in-polygon lookup against labelled region datasets.
//!
//! Containment uses the even-odd ray-casting rule against each polygon's
//! exterior ring only; holes are ignored. Regions are tested in collection
//! order and the first containing region wins, so overlapping regions
//! resolve by input order rather than nesting depth.
//!
//! Coordinates are plain degrees. Polygons crossing the antimeridian are
//! not supported.

use chronoatlas_types::{Coordinates, GeoRegion, Polygon, Position};

/// Even-odd ray-casting test of `point` against a ring.
///
/// The ring is treated as closed whether or not its last vertex repeats
/// the first. Rings with fewer than three vertices contain nothing.
pub fn ring_contains(ring: &[Position], point: Position) -> bool {
    if ring.len() < 3 {
        return false;
    }

    // Pair every vertex with its predecessor, wrapping the first vertex
    // around to the last.
    let predecessors = ring.iter().cycle().skip(ring.len().saturating_sub(1));
    ring.iter()
        .zip(predecessors)
        .filter(|(vi, vj)| edge_crosses_ray(vi, vj, point))
        .fold(false, |inside, _| !inside)
}

/// Whether the edge `(vi, vj)` crosses the horizontal ray from `p` to `+x`.
fn edge_crosses_ray(vi: &Position, vj: &Position, p: Position) -> bool {
    ((vi.y > p.y) != (vj.y > p.y)) && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
}

/// Whether `point` lies inside the polygon's exterior ring.
pub fn polygon_contains(polygon: &Polygon, point: Position) -> bool {
    polygon
        .exterior()
        .is_some_and(|ring| ring_contains(ring, point))
}

/// Whether any constituent polygon of the region contains `point`.
pub fn region_contains(region: &GeoRegion, point: Position) -> bool {
    region
        .geometry
        .polygons()
        .any(|polygon| polygon_contains(polygon, point))
}

/// Return the first region containing `point`, in collection order.
pub fn locate_region(point: Coordinates, regions: &[GeoRegion]) -> Option<&GeoRegion> {
    let position = point.to_position();
    regions.iter().find(|region| region_contains(region, position))
}

/// Return the label of the region enclosing `(lat, lng)`.
///
/// `None` is the normal answer for open sea or areas outside the dataset.
pub fn locate_district(lat: f64, lng: f64, regions: &[GeoRegion]) -> Option<&str> {
    locate_region(Coordinates::new(lat, lng), regions).map(|region| region.label.as_str())
}
