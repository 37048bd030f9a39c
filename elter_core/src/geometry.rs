//! # Site Geometry
//!
//! Boundary polygons for eLTER sites. DEIMS publishes boundaries as GeoJSON
//! (WGS84 lon/lat); they are held as a [`geo_types::MultiPolygon`] and
//! serialized back out as a GeoJSON `MultiPolygon` geometry when forwarded to
//! the compute service.
//!
//! ## Example
//!
//! ```rust
//! use elter_core::geometry::SiteBoundary;
//!
//! let boundary = SiteBoundary::from_geojson_str(r#"{
//!     "type": "Polygon",
//!     "coordinates": [[[-6.5, 36.8], [-6.2, 36.8], [-6.2, 37.1], [-6.5, 37.1], [-6.5, 36.8]]]
//! }"#).unwrap();
//!
//! let bbox = boundary.bounding_box().unwrap();
//! assert_eq!(bbox.min_lon, -6.5);
//! ```

use std::str::FromStr;

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::errors::{ToolbarError, ToolbarResult};

/// Axis-aligned lon/lat rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        BoundingBox {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Center as (lon, lat)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Grow each side by `fraction` of the box size.
    ///
    /// Degenerate (point) boxes grow by a fixed 0.01° so a view can still be
    /// framed around them.
    pub fn padded(&self, fraction: f64) -> BoundingBox {
        let dx = (self.width() * fraction).max(0.01);
        let dy = (self.height() * fraction).max(0.01);
        BoundingBox {
            min_lon: self.min_lon - dx,
            min_lat: self.min_lat - dy,
            max_lon: self.max_lon + dx,
            max_lat: self.max_lat + dy,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Boundary of a site as one or more polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonMultiPolygon", into = "GeoJsonMultiPolygon")]
pub struct SiteBoundary {
    shape: MultiPolygon<f64>,
}

impl SiteBoundary {
    /// A boundary with no polygons (DEIMS returns this for unmapped sites)
    pub fn empty() -> Self {
        SiteBoundary {
            shape: MultiPolygon::new(Vec::new()),
        }
    }

    pub fn from_polygons(polygons: Vec<Polygon<f64>>) -> Self {
        SiteBoundary {
            shape: MultiPolygon::new(polygons),
        }
    }

    /// Axis-aligned rectangle as a boundary, handy for fixtures and bbox queries
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        let ring = LineString::from(vec![
            (bbox.min_lon, bbox.min_lat),
            (bbox.max_lon, bbox.min_lat),
            (bbox.max_lon, bbox.max_lat),
            (bbox.min_lon, bbox.max_lat),
            (bbox.min_lon, bbox.min_lat),
        ]);
        SiteBoundary::from_polygons(vec![Polygon::new(ring, Vec::new())])
    }

    /// Parse any GeoJSON document: a bare geometry, a Feature or a
    /// FeatureCollection. All polygonal parts are merged; points and lines
    /// are ignored. A collection with no polygonal features yields an empty
    /// boundary, not an error.
    pub fn from_geojson_str(text: &str) -> ToolbarResult<Self> {
        let document = GeoJson::from_str(text)
            .map_err(|e| ToolbarError::serialization(format!("Invalid GeoJSON: {}", e)))?;

        let mut polygons = Vec::new();
        match document {
            GeoJson::Geometry(geometry) => collect_polygons(&geometry, &mut polygons)?,
            GeoJson::Feature(feature) => {
                if let Some(geometry) = feature.geometry.as_ref() {
                    collect_polygons(geometry, &mut polygons)?;
                }
            }
            GeoJson::FeatureCollection(collection) => {
                for feature in &collection.features {
                    if let Some(geometry) = feature.geometry.as_ref() {
                        collect_polygons(geometry, &mut polygons)?;
                    }
                }
            }
        }

        Ok(SiteBoundary::from_polygons(polygons))
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.iter().all(|p| p.exterior().0.is_empty())
    }

    pub fn polygon_count(&self) -> usize {
        self.shape.0.len()
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.shape.0
    }

    pub fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    /// Bounding box over every vertex, `None` for an empty boundary
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut coords = self
            .shape
            .0
            .iter()
            .flat_map(|p| p.exterior().0.iter());

        let first = coords.next()?;
        let mut bbox = BoundingBox::new(first.x, first.y, first.x, first.y);
        for c in coords {
            bbox.min_lon = bbox.min_lon.min(c.x);
            bbox.min_lat = bbox.min_lat.min(c.y);
            bbox.max_lon = bbox.max_lon.max(c.x);
            bbox.max_lat = bbox.max_lat.max(c.y);
        }
        Some(bbox)
    }

    /// GeoJSON geometry for this boundary
    pub fn to_geojson(&self) -> Geometry {
        let polygons = self
            .shape
            .0
            .iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors().iter())
                    .map(|ring| ring.0.iter().map(|c| vec![c.x, c.y]).collect())
                    .collect()
            })
            .collect();
        Geometry::new(Value::MultiPolygon(polygons))
    }
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon<f64>>) -> ToolbarResult<()> {
    match &geometry.value {
        Value::Polygon(rings) => out.push(polygon_from_rings(rings)?),
        Value::MultiPolygon(parts) => {
            for rings in parts {
                out.push(polygon_from_rings(rings)?);
            }
        }
        Value::GeometryCollection(members) => {
            for member in members {
                collect_polygons(member, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> ToolbarResult<Polygon<f64>> {
    let mut line_strings = rings
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<ToolbarResult<Vec<_>>>()?;

    if line_strings.is_empty() {
        return Ok(Polygon::new(LineString(Vec::new()), Vec::new()));
    }
    let exterior = line_strings.remove(0);
    Ok(Polygon::new(exterior, line_strings))
}

fn ring_from_positions(ring: &[Vec<f64>]) -> ToolbarResult<LineString<f64>> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(ToolbarError::serialization(
                "GeoJSON position needs at least two coordinates",
            )),
        })
        .collect::<ToolbarResult<Vec<_>>>()
        .map(LineString)
}

/// Wire form: GeoJSON MultiPolygon geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonMultiPolygon {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<Vec<[f64; 2]>>>,
}

impl From<SiteBoundary> for GeoJsonMultiPolygon {
    fn from(boundary: SiteBoundary) -> Self {
        let coordinates = boundary
            .shape
            .0
            .iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors().iter())
                    .map(|ring| ring.0.iter().map(|c| [c.x, c.y]).collect())
                    .collect()
            })
            .collect();
        GeoJsonMultiPolygon {
            kind: "MultiPolygon".to_string(),
            coordinates,
        }
    }
}

impl TryFrom<GeoJsonMultiPolygon> for SiteBoundary {
    type Error = String;

    fn try_from(wire: GeoJsonMultiPolygon) -> Result<Self, Self::Error> {
        if wire.kind != "MultiPolygon" {
            return Err(format!("expected MultiPolygon geometry, got {}", wire.kind));
        }
        let polygons = wire
            .coordinates
            .into_iter()
            .map(|rings| {
                let mut rings: Vec<LineString<f64>> = rings
                    .into_iter()
                    .map(|ring| LineString(ring.into_iter().map(|[x, y]| Coord { x, y }).collect()))
                    .collect();
                if rings.is_empty() {
                    Polygon::new(LineString(Vec::new()), Vec::new())
                } else {
                    let exterior = rings.remove(0);
                    Polygon::new(exterior, rings)
                }
            })
            .collect();
        Ok(SiteBoundary::from_polygons(polygons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DONANA_FC: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"deimsid": "https://deims.org/bcbc866c-3f4f-47a8-bbbc-0a93df6de7b2"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-6.6, 36.8], [-6.1, 36.8], [-6.1, 37.2], [-6.6, 37.2], [-6.6, 36.8]]],
                        [[[-6.0, 37.0], [-5.9, 37.0], [-5.9, 37.1], [-6.0, 37.0]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let boundary = SiteBoundary::from_geojson_str(DONANA_FC).unwrap();
        assert_eq!(boundary.polygon_count(), 2);
        assert!(!boundary.is_empty());

        let bbox = boundary.bounding_box().unwrap();
        assert_eq!(bbox, BoundingBox::new(-6.6, 36.8, -5.9, 37.2));
    }

    #[test]
    fn test_empty_feature_collection_is_empty_boundary() {
        let boundary =
            SiteBoundary::from_geojson_str(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert!(boundary.is_empty());
        assert!(boundary.bounding_box().is_none());
    }

    #[test]
    fn test_points_are_ignored() {
        let boundary =
            SiteBoundary::from_geojson_str(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#).unwrap();
        assert!(boundary.is_empty());
    }

    #[test]
    fn test_invalid_geojson_is_an_error() {
        let err = SiteBoundary::from_geojson_str("{not json").unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_serializes_as_geojson_multipolygon() {
        let boundary = SiteBoundary::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let json = serde_json::to_value(&boundary).unwrap();
        assert_eq!(json["type"], "MultiPolygon");
        assert_eq!(json["coordinates"][0][0][2], serde_json::json!([1.0, 1.0]));

        let back: SiteBoundary = serde_json::from_value(json).unwrap();
        assert_eq!(back, boundary);
    }

    #[test]
    fn test_bbox_helpers() {
        let a = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BoundingBox::new(1.0, -1.0, 3.0, 1.0);
        assert_eq!(a.union(&b), BoundingBox::new(0.0, -1.0, 3.0, 2.0));
        assert_eq!(a.center(), (1.0, 1.0));
        assert!(a.contains(1.5, 0.5));

        let point = BoundingBox::new(5.0, 5.0, 5.0, 5.0).padded(0.1);
        assert!(point.width() > 0.0);
    }
}
