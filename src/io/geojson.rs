//! GeoJSON FeatureCollection reading and writing.
//!
//! Files ending in `.gz` are transparently (de)compressed. Writes go through a
//! temporary file in the target directory and are persisted once complete.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use geo::{Coord, Line, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use xxhash_rust::xxh64::xxh64;

use super::staging_file;
use crate::error::{Error, Result};
use crate::models::{Attributes, Feature, FieldValue, Layer};

/// xxh64 digest of a layer's serialized GeoJSON
pub type LayerDigest = u64;

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "gz")
}

fn invalid(path: &Path, reason: impl Into<String>) -> Error {
    Error::GeoJson {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_collection(path: &Path) -> Result<Value> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let value: Value = serde_json::from_reader(BufReader::new(reader))?;
    if value.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(invalid(path, "not a FeatureCollection"));
    }
    Ok(value)
}

fn layer_name(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("layer");
    name.split('.').next().unwrap_or(name).to_string()
}

fn parse_properties(feature: &Value) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(props) = feature.get("properties").and_then(Value::as_object) {
        for (name, value) in props {
            attributes.set(name, FieldValue::from_json(value));
        }
    }
    attributes
}

fn parse_coord(value: &Value) -> Option<Coord<f64>> {
    let array = value.as_array()?;
    Some(Coord {
        x: array.first()?.as_f64()?,
        y: array.get(1)?.as_f64()?,
    })
}

fn parse_line(value: &Value) -> Option<LineString<f64>> {
    value
        .as_array()?
        .iter()
        .map(parse_coord)
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

/// Features of a collection with their geometry object, skipping null geometries
fn features<'a>(path: &Path, collection: &'a Value) -> Result<Vec<(usize, &'a Value, &'a Value)>> {
    let list = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(path, "missing `features` array"))?;

    let mut out = Vec::with_capacity(list.len());
    for (i, feature) in list.iter().enumerate() {
        match feature.get("geometry") {
            Some(geometry) if !geometry.is_null() => out.push((i, feature, geometry)),
            _ => debug!("Skipping feature {} without geometry", i),
        }
    }
    Ok(out)
}

fn geometry_type<'a>(path: &Path, geometry: &'a Value) -> Result<&'a str> {
    geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(path, "geometry without `type`"))
}

fn unsupported(path: &Path, kind: &str) -> Error {
    Error::UnsupportedGeometry {
        kind: kind.to_string(),
        path: path.to_path_buf(),
    }
}

/// Category of a point feature: its integral `id`, else its `cat` property, else its position
fn point_category(feature: &Value, attributes: &Attributes, index: usize) -> u64 {
    feature
        .get("id")
        .and_then(Value::as_u64)
        .or_else(|| {
            attributes
                .get("cat")
                .and_then(FieldValue::as_i64)
                .and_then(|c| u64::try_from(c).ok())
        })
        .unwrap_or(index as u64 + 1)
}

/// Read a point layer. Each `MultiPoint` part becomes its own feature sharing the parent's category.
pub fn read_points(path: &Path) -> Result<Layer<Point<f64>>> {
    let collection = read_collection(path)?;
    let mut layer = Layer::new(layer_name(path));
    layer.crs = collection.get("crs").cloned();

    for (i, feature, geometry) in features(path, &collection)? {
        let attributes = parse_properties(feature);
        let id = point_category(feature, &attributes, i);
        let coordinates = geometry.get("coordinates").unwrap_or(&Value::Null);

        let points: Vec<Coord<f64>> = match geometry_type(path, geometry)? {
            "Point" => vec![parse_coord(coordinates).ok_or_else(|| invalid(path, "bad Point coordinates"))?],
            "MultiPoint" => parse_line(coordinates)
                .ok_or_else(|| invalid(path, "bad MultiPoint coordinates"))?
                .0,
            other => return Err(unsupported(path, other)),
        };
        for c in points {
            layer
                .features
                .push(Feature::new(id, Point::from(c), attributes.clone()));
        }
    }

    info!("Read {} points from {}", layer.len(), path.display());
    Ok(layer)
}

/// Read a line layer, promoting `LineString` features to single-part multilines
pub fn read_lines(path: &Path) -> Result<Layer<MultiLineString<f64>>> {
    let collection = read_collection(path)?;
    let mut layer = Layer::new(layer_name(path));
    layer.crs = collection.get("crs").cloned();

    for (_, feature, geometry) in features(path, &collection)? {
        let coordinates = geometry.get("coordinates").unwrap_or(&Value::Null);
        let lines = match geometry_type(path, geometry)? {
            "LineString" => vec![parse_line(coordinates).ok_or_else(|| invalid(path, "bad LineString coordinates"))?],
            "MultiLineString" => coordinates
                .as_array()
                .and_then(|parts| parts.iter().map(parse_line).collect::<Option<Vec<_>>>())
                .ok_or_else(|| invalid(path, "bad MultiLineString coordinates"))?,
            other => return Err(unsupported(path, other)),
        };
        layer.push(MultiLineString::new(lines), parse_properties(feature));
    }

    info!("Read {} lines from {}", layer.len(), path.display());
    Ok(layer)
}

/// Geometry types that can be written as GeoJSON
pub trait ToGeoJson {
    fn to_geojson(&self) -> Value;
}

fn coord_json(c: Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn ring_json(line: &LineString<f64>) -> Value {
    Value::Array(line.0.iter().copied().map(coord_json).collect())
}

fn polygon_rings(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_json));
    Value::Array(rings)
}

impl ToGeoJson for Point<f64> {
    fn to_geojson(&self) -> Value {
        json!({ "type": "Point", "coordinates": coord_json(self.0) })
    }
}

impl ToGeoJson for Line<f64> {
    fn to_geojson(&self) -> Value {
        json!({
            "type": "LineString",
            "coordinates": [coord_json(self.start), coord_json(self.end)],
        })
    }
}

impl ToGeoJson for LineString<f64> {
    fn to_geojson(&self) -> Value {
        json!({ "type": "LineString", "coordinates": ring_json(self) })
    }
}

impl ToGeoJson for Polygon<f64> {
    fn to_geojson(&self) -> Value {
        json!({ "type": "Polygon", "coordinates": polygon_rings(self) })
    }
}

impl ToGeoJson for MultiPolygon<f64> {
    fn to_geojson(&self) -> Value {
        let polygons: Vec<Value> = self.0.iter().map(polygon_rings).collect();
        json!({ "type": "MultiPolygon", "coordinates": polygons })
    }
}

/// Build the FeatureCollection for a layer
pub fn to_feature_collection<G: ToGeoJson>(layer: &Layer<G>) -> Value {
    let features: Vec<Value> = layer
        .iter()
        .map(|feature| {
            let properties: Map<String, Value> = feature
                .attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect();
            json!({
                "type": "Feature",
                "id": feature.id,
                "geometry": feature.geometry.to_geojson(),
                "properties": properties,
            })
        })
        .collect();

    let mut collection = Map::new();
    collection.insert("type".to_string(), json!("FeatureCollection"));
    collection.insert("name".to_string(), json!(layer.name));
    if let Some(crs) = &layer.crs {
        collection.insert("crs".to_string(), crs.clone());
    }
    collection.insert("features".to_string(), Value::Array(features));
    Value::Object(collection)
}

/// Serialize a layer, returning the bytes and their digest
pub fn encode_layer<G: ToGeoJson>(layer: &Layer<G>) -> Result<(Vec<u8>, LayerDigest)> {
    let bytes = serde_json::to_vec(&to_feature_collection(layer))?;
    let digest = xxh64(&bytes, 0);
    Ok((bytes, digest))
}

/// Write a layer atomically to `path`, returning the digest of the uncompressed GeoJSON
pub fn write_layer<G: ToGeoJson>(layer: &Layer<G>, path: &Path) -> Result<LayerDigest> {
    let (bytes, digest) = encode_layer(layer)?;

    let mut tmp = staging_file(path)?;
    if is_gzip(path) {
        let mut encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
        encoder.write_all(&bytes)?;
        encoder.finish()?;
    } else {
        tmp.write_all(&bytes)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    info!(
        "Wrote {} features to {} (xxh64 {:016x})",
        layer.len(),
        path.display(),
        digest
    );
    Ok(digest)
}
