//! Typed GeoJSON documents.
//!
//! Raw GeoJSON is decoded into [`GeoNode`] before anything is drawn. The
//! decoder is lenient: a malformed subtree is recorded as a
//! [`SkippedNode`] and left out, and its siblings decode normally.

use super::properties::Properties;
use crate::config::Boundaries;
use crate::error::{GeometryError, SkippedNode};
use geo_types::Coord;
use serde_json::{Map, Value};

/// One ring or line of coordinates.
pub type Line = Vec<Coord<f64>>;

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord<f64>),
    MultiPoint(Vec<Coord<f64>>),
    LineString(Line),
    MultiLineString(Vec<Line>),
    /// Rings, outer boundary first and holes after.
    Polygon(Vec<Line>),
    MultiPolygon(Vec<Vec<Line>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    /// Calls `f` with every coordinate in the geometry, in document order.
    pub fn for_each_coord(&self, f: &mut impl FnMut(Coord<f64>)) {
        match self {
            Geometry::Point(c) => f(*c),
            Geometry::MultiPoint(coords) | Geometry::LineString(coords) => {
                coords.iter().for_each(|c| f(*c))
            }
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                lines.iter().flatten().for_each(|c| f(*c))
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().for_each(|c| f(*c))
            }
            Geometry::GeometryCollection(geometries) => {
                for g in geometries {
                    g.for_each_coord(f);
                }
            }
        }
    }

    /// The GeoJSON `type` tag of this geometry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
        }
    }
}

/// A geometry with its properties. A feature without geometry draws nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: Properties,
}

/// Any GeoJSON document that can back a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoNode {
    Geometry(Geometry),
    Feature(Feature),
    FeatureCollection(Vec<Feature>),
}

/// Result of decoding a document: the usable part plus what was left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    /// `None` when the top-level object itself was unusable.
    pub node: Option<GeoNode>,
    pub skipped: Vec<SkippedNode>,
}

impl GeoNode {
    /// Decodes a parsed JSON value, nesting no deeper than `max_depth`.
    pub fn from_json(value: &Value, max_depth: usize) -> Decoded {
        let mut decoder = Decoder {
            max_depth,
            skipped: Vec::new(),
        };
        let node = decoder.node(value, String::new(), 0);
        Decoded {
            node,
            skipped: decoder.skipped,
        }
    }

    /// Parses GeoJSON text and decodes it. Only invalid JSON is an error;
    /// malformed GeoJSON shows up in [`Decoded::skipped`].
    pub fn parse(text: &str, max_depth: usize) -> Result<Decoded, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&value, max_depth))
    }

    /// Converts a document already parsed by the `geojson` crate.
    pub fn from_geojson(geojson: &geojson::GeoJson, max_depth: usize) -> Decoded {
        let mut converter = GeoJsonConverter {
            max_depth,
            skipped: Vec::new(),
        };
        let node = match geojson {
            geojson::GeoJson::Geometry(g) => converter
                .geometry(g, String::new(), 0)
                .map(GeoNode::Geometry),
            geojson::GeoJson::Feature(f) => {
                Some(GeoNode::Feature(converter.feature(f, String::new(), 0)))
            }
            geojson::GeoJson::FeatureCollection(fc) => Some(GeoNode::FeatureCollection(
                fc.features
                    .iter()
                    .enumerate()
                    .map(|(i, f)| converter.feature(f, format!("/features/{}", i), 1))
                    .collect(),
            )),
        };
        Decoded {
            node,
            skipped: converter.skipped,
        }
    }

    /// Calls `f` with every coordinate in the document.
    pub fn for_each_coord(&self, f: &mut impl FnMut(Coord<f64>)) {
        match self {
            GeoNode::Geometry(g) => g.for_each_coord(f),
            GeoNode::Feature(feature) => {
                if let Some(g) = &feature.geometry {
                    g.for_each_coord(f);
                }
            }
            GeoNode::FeatureCollection(features) => {
                for g in features.iter().filter_map(|feature| feature.geometry.as_ref()) {
                    g.for_each_coord(f);
                }
            }
        }
    }

    /// Geographic bounding box of every coordinate, or `None` for a
    /// document without coordinates.
    pub fn extent(&self) -> Option<Boundaries> {
        let mut extent: Option<(f64, f64, f64, f64)> = None;
        self.for_each_coord(&mut |c| {
            let (min_x, min_y, max_x, max_y) = extent.unwrap_or((c.x, c.y, c.x, c.y));
            extent = Some((min_x.min(c.x), min_y.min(c.y), max_x.max(c.x), max_y.max(c.y)));
        });
        extent.map(|(west, south, east, north)| Boundaries::new(north, south, west, east))
    }
}

/// Anything a layer can be built from.
pub trait IntoDocument {
    fn into_document(self, max_depth: usize) -> Decoded;
}

impl IntoDocument for &Value {
    fn into_document(self, max_depth: usize) -> Decoded {
        GeoNode::from_json(self, max_depth)
    }
}

impl IntoDocument for Value {
    fn into_document(self, max_depth: usize) -> Decoded {
        GeoNode::from_json(&self, max_depth)
    }
}

impl IntoDocument for &geojson::GeoJson {
    fn into_document(self, max_depth: usize) -> Decoded {
        GeoNode::from_geojson(self, max_depth)
    }
}

/// Already decoded; the depth limit was applied when it was decoded.
impl IntoDocument for Decoded {
    fn into_document(self, _max_depth: usize) -> Decoded {
        self
    }
}

impl IntoDocument for GeoNode {
    fn into_document(self, _max_depth: usize) -> Decoded {
        Decoded {
            node: Some(self),
            skipped: Vec::new(),
        }
    }
}

struct Decoder {
    max_depth: usize,
    skipped: Vec<SkippedNode>,
}

impl Decoder {
    fn skip(&mut self, path: String, error: GeometryError) {
        log::debug!("Skipping GeoJSON node at {}: {}", display_path(&path), error);
        self.skipped.push(SkippedNode { path, error });
    }

    fn node(&mut self, value: &Value, path: String, depth: usize) -> Option<GeoNode> {
        let Some(object) = value.as_object() else {
            self.skip(path, GeometryError::BadNesting("a GeoJSON object"));
            return None;
        };
        match object.get("type").and_then(Value::as_str) {
            Some("Feature") => Some(GeoNode::Feature(self.feature(object, path, depth))),
            Some("FeatureCollection") => self
                .feature_collection(object, path, depth)
                .map(GeoNode::FeatureCollection),
            _ => self.geometry(value, path, depth).map(GeoNode::Geometry),
        }
    }

    fn feature_collection(
        &mut self,
        object: &Map<String, Value>,
        path: String,
        depth: usize,
    ) -> Option<Vec<Feature>> {
        let features = match object.get("features") {
            Some(Value::Array(features)) => features,
            Some(_) => {
                self.skip(path, GeometryError::BadNesting("`features` to be an array"));
                return None;
            }
            None => {
                self.skip(path, GeometryError::MissingField("features"));
                return None;
            }
        };

        let mut decoded = Vec::with_capacity(features.len());
        for (i, value) in features.iter().enumerate() {
            let feature_path = format!("{}/features/{}", path, i);
            match value.as_object() {
                Some(obj) if obj.get("type").and_then(Value::as_str) == Some("Feature") => {
                    decoded.push(self.feature(obj, feature_path, depth + 1));
                }
                Some(obj) if obj.get("type").is_none() => {
                    self.skip(feature_path, GeometryError::MissingType);
                }
                _ => self.skip(feature_path, GeometryError::BadNesting("a Feature")),
            }
        }
        Some(decoded)
    }

    fn feature(&mut self, object: &Map<String, Value>, path: String, depth: usize) -> Feature {
        let properties = match object.get("properties") {
            Some(Value::Object(map)) => Properties::from_json_object(map),
            Some(Value::Null) | None => Properties::new(),
            Some(_) => {
                log::debug!("Ignoring non-object properties at {}", display_path(&path));
                Properties::new()
            }
        };
        let geometry = match object.get("geometry") {
            Some(Value::Null) | None => None,
            Some(value) => self.geometry(value, format!("{}/geometry", path), depth + 1),
        };
        Feature {
            geometry,
            properties,
        }
    }

    fn geometry(&mut self, value: &Value, path: String, depth: usize) -> Option<Geometry> {
        if depth > self.max_depth {
            let limit = self.max_depth;
            self.skip(path, GeometryError::TooDeep { limit });
            return None;
        }
        let Some(object) = value.as_object() else {
            self.skip(path, GeometryError::BadNesting("a geometry object"));
            return None;
        };
        let Some(type_name) = object.get("type").and_then(Value::as_str) else {
            self.skip(path, GeometryError::MissingType);
            return None;
        };

        if type_name == "GeometryCollection" {
            let Some(members) = object.get("geometries") else {
                self.skip(path, GeometryError::MissingField("geometries"));
                return None;
            };
            let Some(members) = members.as_array() else {
                self.skip(path, GeometryError::BadNesting("`geometries` to be an array"));
                return None;
            };
            let geometries = members
                .iter()
                .enumerate()
                .filter_map(|(i, g)| {
                    self.geometry(g, format!("{}/geometries/{}", path, i), depth + 1)
                })
                .collect();
            return Some(Geometry::GeometryCollection(geometries));
        }

        let result = match object.get("coordinates") {
            None if is_simple_type(type_name) => Err(GeometryError::MissingField("coordinates")),
            None => Err(GeometryError::UnknownType(type_name.to_string())),
            Some(coords) => simple_geometry(type_name, coords),
        };
        match result {
            Ok(geometry) => Some(geometry),
            Err(error) => {
                self.skip(path, error);
                None
            }
        }
    }
}

fn is_simple_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" | "Polygon" | "MultiPolygon"
    )
}

fn simple_geometry(type_name: &str, coords: &Value) -> Result<Geometry, GeometryError> {
    match type_name {
        "Point" => json_position(coords).map(Geometry::Point),
        "MultiPoint" => json_positions(coords).map(Geometry::MultiPoint),
        "LineString" => json_positions(coords).map(Geometry::LineString),
        "MultiLineString" => json_lines(coords).map(Geometry::MultiLineString),
        "Polygon" => json_lines(coords).map(Geometry::Polygon),
        "MultiPolygon" => json_array(coords, "an array of polygons")?
            .iter()
            .map(json_lines)
            .collect::<Result<_, _>>()
            .map(Geometry::MultiPolygon),
        other => Err(GeometryError::UnknownType(other.to_string())),
    }
}

fn json_array<'a>(
    value: &'a Value,
    expected: &'static str,
) -> Result<&'a Vec<Value>, GeometryError> {
    value.as_array().ok_or(GeometryError::BadNesting(expected))
}

fn json_position(value: &Value) -> Result<Coord<f64>, GeometryError> {
    let elements = json_array(value, "a position array")?;
    let numbers = elements
        .iter()
        .map(|v| v.as_f64().ok_or(GeometryError::NonNumericCoordinate))
        .collect::<Result<Vec<_>, _>>()?;
    position(&numbers)
}

fn json_positions(value: &Value) -> Result<Line, GeometryError> {
    json_array(value, "an array of positions")?
        .iter()
        .map(json_position)
        .collect()
}

fn json_lines(value: &Value) -> Result<Vec<Line>, GeometryError> {
    json_array(value, "an array of position arrays")?
        .iter()
        .map(json_positions)
        .collect()
}

/// First two elements as (lon, lat); any altitude is dropped.
fn position(elements: &[f64]) -> Result<Coord<f64>, GeometryError> {
    match elements {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        [_, _, ..] => Err(GeometryError::NonNumericCoordinate),
        _ => Err(GeometryError::BadPosition {
            arity: elements.len(),
        }),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Converts `geojson` crate values, which are already structurally typed
/// but may still carry short positions.
struct GeoJsonConverter {
    max_depth: usize,
    skipped: Vec<SkippedNode>,
}

impl GeoJsonConverter {
    fn skip(&mut self, path: String, error: GeometryError) {
        log::debug!("Skipping GeoJSON node at {}: {}", display_path(&path), error);
        self.skipped.push(SkippedNode { path, error });
    }

    fn feature(&mut self, feature: &geojson::Feature, path: String, depth: usize) -> Feature {
        let properties = feature
            .properties
            .as_ref()
            .map(Properties::from_json_object)
            .unwrap_or_default();
        let geometry = feature
            .geometry
            .as_ref()
            .and_then(|g| self.geometry(g, format!("{}/geometry", path), depth + 1));
        Feature {
            geometry,
            properties,
        }
    }

    fn geometry(
        &mut self,
        geometry: &geojson::Geometry,
        path: String,
        depth: usize,
    ) -> Option<Geometry> {
        use geojson::Value as G;

        if depth > self.max_depth {
            let limit = self.max_depth;
            self.skip(path, GeometryError::TooDeep { limit });
            return None;
        }

        let lines = |rings: &Vec<Vec<Vec<f64>>>| -> Result<Vec<Line>, GeometryError> {
            rings
                .iter()
                .map(|ring| ring.iter().map(|p| position(p)).collect())
                .collect()
        };

        let result = match &geometry.value {
            G::Point(p) => position(p).map(Geometry::Point),
            G::MultiPoint(points) => points
                .iter()
                .map(|p| position(p))
                .collect::<Result<_, _>>()
                .map(Geometry::MultiPoint),
            G::LineString(line) => line
                .iter()
                .map(|p| position(p))
                .collect::<Result<_, _>>()
                .map(Geometry::LineString),
            G::MultiLineString(multi) => lines(multi).map(Geometry::MultiLineString),
            G::Polygon(rings) => lines(rings).map(Geometry::Polygon),
            G::MultiPolygon(polygons) => polygons
                .iter()
                .map(lines)
                .collect::<Result<_, _>>()
                .map(Geometry::MultiPolygon),
            G::GeometryCollection(geometries) => Ok(Geometry::GeometryCollection(
                geometries
                    .iter()
                    .enumerate()
                    .filter_map(|(i, g)| {
                        self.geometry(g, format!("{}/geometries/{}", path, i), depth + 1)
                    })
                    .collect(),
            )),
        };

        match result {
            Ok(g) => Some(g),
            Err(error) => {
                self.skip(path, error);
                None
            }
        }
    }
}
