// geo.rs
//
// State boundary collection used as choropleth geometry.

use anyhow::{Context, Result, bail};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::{info, warn};

/// A closed ring of (lon, lat) points.
pub type Ring = Vec<(f64, f64)>;

/// One named region with its polygon outlines (exterior rings only).
#[derive(Debug, Clone, PartialEq)]
pub struct StateShape {
    pub name: String,
    pub rings: Vec<Ring>,
}

/// Immutable collection of state shapes plus their combined bounding box.
#[derive(Debug, Clone, Default)]
pub struct GeoBoundary {
    shapes: Vec<StateShape>,
    bbox: Option<[f64; 4]>, // [min_lon, min_lat, max_lon, max_lat]
}

fn read_geojson<R: Read>(reader: R) -> Result<GeoJson> {
    let json: serde_json::Value =
        serde_json::from_reader(io::BufReader::new(reader)).context("not valid JSON")?;
    GeoJson::from_json_value(json).context("not a GeoJSON document")
}

fn collect_rings(geometry: &Geometry, rings: &mut Vec<Ring>) {
    let to_ring = |ring: &Vec<Vec<f64>>| -> Ring {
        ring.iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };
    match &geometry.value {
        Value::Polygon(polygon) => {
            if let Some(exterior) = polygon.first() {
                rings.push(to_ring(exterior));
            }
        }
        Value::MultiPolygon(multi_polygon) => {
            for polygon in multi_polygon {
                if let Some(exterior) = polygon.first() {
                    rings.push(to_ring(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_rings(g, rings);
            }
        }
        _ => {}
    }
}

impl GeoBoundary {
    pub fn from_shapes(shapes: Vec<StateShape>) -> Self {
        let mut min_lon = f64::MAX;
        let mut min_lat = f64::MAX;
        let mut max_lon = f64::MIN;
        let mut max_lat = f64::MIN;
        for (lon, lat) in shapes.iter().flat_map(|s| s.rings.iter().flatten()) {
            min_lon = min_lon.min(*lon);
            min_lat = min_lat.min(*lat);
            max_lon = max_lon.max(*lon);
            max_lat = max_lat.max(*lat);
        }
        let bbox = (min_lon != f64::MAX).then_some([min_lon, min_lat, max_lon, max_lat]);
        GeoBoundary { shapes, bbox }
    }

    /// Reads a GeoJSON FeatureCollection from `path`, naming each region by
    /// the `name_key` property.
    pub fn load(path: &Path, name_key: &str) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open boundary file {}", path.display()))?;
        let boundary = Self::from_reader(file, name_key)
            .with_context(|| format!("failed to parse boundary file {}", path.display()))?;
        info!(
            path = %path.display(),
            features = boundary.shapes.len(),
            "boundary collection loaded"
        );
        Ok(boundary)
    }

    pub fn from_reader<R: Read>(reader: R, name_key: &str) -> Result<Self> {
        let collection = match read_geojson(reader)? {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(_) => bail!("expected a FeatureCollection, found a single Feature"),
            GeoJson::Geometry(_) => bail!("expected a FeatureCollection, found a bare Geometry"),
        };

        let mut shapes = Vec::with_capacity(collection.features.len());
        for (i, feature) in collection.features.iter().enumerate() {
            let Some(name) = feature.property(name_key).and_then(serde_json::Value::as_str) else {
                warn!(feature = i, key = name_key, "feature has no name property, skipped");
                continue;
            };
            let mut rings = Vec::new();
            if let Some(geometry) = &feature.geometry {
                collect_rings(geometry, &mut rings);
            }
            if rings.is_empty() {
                warn!(feature = i, name, "feature has no polygon geometry, skipped");
                continue;
            }
            shapes.push(StateShape {
                name: name.trim().to_string(),
                rings,
            });
        }
        Ok(Self::from_shapes(shapes))
    }

    pub fn shapes(&self) -> &[StateShape] {
        &self.shapes
    }

    pub fn bbox(&self) -> Option<[f64; 4]> {
        self.bbox
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.name == name)
    }

    /// Bounding box padded by `padding` of its extent on each side and
    /// clamped to valid lon/lat. Falls back to the whole globe.
    pub fn padded_bounds(&self, padding: f64) -> ([f64; 2], [f64; 2]) {
        let Some([min_lon, min_lat, max_lon, max_lat]) = self.bbox else {
            return ([-180.0, 180.0], [-90.0, 90.0]);
        };
        let epsilon = 0.001;
        let lon_pad = (max_lon - min_lon).max(epsilon) * padding;
        let lat_pad = (max_lat - min_lat).max(epsilon) * padding;
        (
            [(min_lon - lon_pad).max(-180.0), (max_lon + lon_pad).min(180.0)],
            [(min_lat - lat_pad).max(-90.0), (max_lat + lat_pad).min(90.0)],
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"NAME_1": "Punjab"},
         "geometry": {"type": "Polygon", "coordinates": [[[74,30],[76,30],[76,32],[74,32],[74,30]]]}},
        {"type": "Feature", "properties": {"NAME_1": "Andaman and Nicobar"},
         "geometry": {"type": "MultiPolygon", "coordinates": [
            [[[92,11],[93,11],[93,12],[92,12],[92,11]]],
            [[[92,7],[93,7],[93,8],[92,8],[92,7]]]]}},
        {"type": "Feature", "properties": {"NAME_1": "Kerala"},
         "geometry": {"type": "Polygon", "coordinates": [[[75,8],[77,8],[77,12],[75,12],[75,8]]]}},
        {"type": "Feature", "properties": {"other": "x"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
      ]
    }"#;

    #[test]
    fn reads_named_polygons() {
        let boundary = GeoBoundary::from_reader(SAMPLE.as_bytes(), "NAME_1").unwrap();
        assert_eq!(boundary.shapes().len(), 3);
        assert_eq!(boundary.shapes()[1].name, "Andaman and Nicobar");
        assert_eq!(boundary.shapes()[1].rings.len(), 2);
        assert_eq!(boundary.position("Kerala"), Some(2));
        assert_eq!(boundary.bbox(), Some([74.0, 7.0, 93.0, 32.0]));
    }

    #[test]
    fn rejects_non_collections() {
        let single = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(GeoBoundary::from_reader(single.as_bytes(), "NAME_1").is_err());
        assert!(GeoBoundary::from_reader("not json".as_bytes(), "NAME_1").is_err());
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = GeoBoundary::from_reader("{\"type\": ".as_bytes(), "NAME_1").unwrap_err();
        assert!(format!("{:#}", err).contains("not valid JSON"));
    }

    #[test]
    fn padded_bounds_fall_back_to_globe() {
        let empty = GeoBoundary::default();
        assert_eq!(empty.padded_bounds(0.1), ([-180.0, 180.0], [-90.0, 90.0]));

        let boundary = GeoBoundary::from_reader(SAMPLE.as_bytes(), "NAME_1").unwrap();
        let (lon, lat) = boundary.padded_bounds(0.1);
        assert!(lon[0] < 74.0 && lon[1] > 93.0);
        assert!(lat[0] < 7.0 && lat[1] > 32.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(GeoBoundary::load(Path::new("/nonexistent/india.json"), "NAME_1").is_err());
    }
}
