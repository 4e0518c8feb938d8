//! Vector features as returned by the feature server.
//!
//! The cache stores these opaquely; only the GeoJSON decoder looks inside.

use std::collections::BTreeMap;

use serde_json::Value;

pub type Position = [f64; 2];

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
    /// Anything else (including `null`), kept as raw JSON.
    Other(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub geometry: Geometry,
    pub properties: BTreeMap<String, AttributeValue>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&AttributeValue> {
        self.properties.get(name)
    }
}

/// Malformed GeoJSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoJsonError {
    pub message: String,
}

impl GeoJsonError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GeoJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid GeoJSON: {}", self.message)
    }
}

impl std::error::Error for GeoJsonError {}

/// Decodes a GeoJSON `FeatureCollection`, keeping server order.
pub fn parse_feature_collection(body: &[u8]) -> Result<Vec<Feature>, GeoJsonError> {
    let doc: Value =
        serde_json::from_slice(body).map_err(|e| GeoJsonError::new(e.to_string()))?;
    feature_collection_from_value(&doc)
}

pub fn feature_collection_from_value(doc: &Value) -> Result<Vec<Feature>, GeoJsonError> {
    match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {}
        Some(other) => {
            return Err(GeoJsonError::new(format!(
                "expected FeatureCollection, got {other}"
            )));
        }
        None => return Err(GeoJsonError::new("missing \"type\"")),
    }
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| GeoJsonError::new("missing \"features\" array"))?;
    features
        .iter()
        .enumerate()
        .map(|(i, f)| {
            parse_feature(f).map_err(|e| GeoJsonError::new(format!("feature {i}: {}", e.message)))
        })
        .collect()
}

fn parse_feature(v: &Value) -> Result<Feature, GeoJsonError> {
    let id = match v.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => return Err(GeoJsonError::new(format!("unsupported id {other}"))),
    };
    let geometry = match v.get("geometry") {
        None | Some(Value::Null) => Geometry::Other(Value::Null),
        Some(g) => parse_geometry(g)?,
    };
    let mut properties = BTreeMap::new();
    match v.get("properties") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (k, p) in map {
                properties.insert(k.clone(), attribute(p));
            }
        }
        Some(_) => return Err(GeoJsonError::new("\"properties\" is not an object")),
    }
    Ok(Feature {
        id,
        geometry,
        properties,
    })
}

fn attribute(v: &Value) -> AttributeValue {
    match v {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => n
            .as_f64()
            .map(AttributeValue::Number)
            .unwrap_or_else(|| AttributeValue::Text(n.to_string())),
        Value::String(s) => AttributeValue::Text(s.clone()),
        // Nested values are flattened to their JSON text.
        other => AttributeValue::Text(other.to_string()),
    }
}

fn parse_geometry(g: &Value) -> Result<Geometry, GeoJsonError> {
    let kind = g.get("type").and_then(Value::as_str);
    let coords = g.get("coordinates");
    let geometry = match (kind, coords) {
        (Some("Point"), Some(c)) => Geometry::Point(position(c)?),
        (Some("LineString"), Some(c)) => Geometry::LineString(positions(c)?),
        (Some("Polygon"), Some(c)) => Geometry::Polygon(rings(c)?),
        (Some("MultiLineString"), Some(c)) => Geometry::MultiLineString(rings(c)?),
        (Some("MultiPolygon"), Some(c)) => Geometry::MultiPolygon(
            array(c)?
                .iter()
                .map(rings)
                .collect::<Result<_, _>>()?,
        ),
        (Some("Point" | "LineString" | "Polygon" | "MultiLineString" | "MultiPolygon"), None) => {
            return Err(GeoJsonError::new("geometry without coordinates"));
        }
        _ => Geometry::Other(g.clone()),
    };
    Ok(geometry)
}

fn array(v: &Value) -> Result<&Vec<Value>, GeoJsonError> {
    v.as_array()
        .ok_or_else(|| GeoJsonError::new(format!("expected array, got {v}")))
}

fn position(v: &Value) -> Result<Position, GeoJsonError> {
    let a = array(v)?;
    // Extra ordinates (elevation, measure) are dropped.
    match (a.first().and_then(Value::as_f64), a.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok([x, y]),
        _ => Err(GeoJsonError::new(format!("bad position {v}"))),
    }
}

fn positions(v: &Value) -> Result<Vec<Position>, GeoJsonError> {
    array(v)?.iter().map(position).collect()
}

fn rings(v: &Value) -> Result<Vec<Vec<Position>>, GeoJsonError> {
    array(v)?.iter().map(positions).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ROADS: &str = r#"{
        "type": "FeatureCollection",
        "totalFeatures": 2,
        "features": [
            {
                "type": "Feature",
                "id": "roads.1",
                "geometry": {
                    "type": "MultiLineString",
                    "coordinates": [[[38.7, 9.0, 0], [38.8, 9.1]]]
                },
                "properties": {"name": "Ring Road", "lanes": 4, "paved": true, "ref": null}
            },
            {
                "type": "Feature",
                "id": 7,
                "geometry": {"type": "Point", "coordinates": [1.5, 2.5]},
                "properties": {"tags": {"a": 1}}
            }
        ]
    }"#;

    #[test]
    fn parses_wfs_collection_in_order() {
        let features = parse_feature_collection(ROADS.as_bytes()).unwrap();
        assert_eq!(features.len(), 2);

        let road = &features[0];
        assert_eq!(road.id.as_deref(), Some("roads.1"));
        assert_eq!(
            road.geometry,
            Geometry::MultiLineString(vec![vec![[38.7, 9.0], [38.8, 9.1]]])
        );
        assert_eq!(
            road.property("name"),
            Some(&AttributeValue::Text("Ring Road".into()))
        );
        assert_eq!(road.property("lanes"), Some(&AttributeValue::Number(4.0)));
        assert_eq!(road.property("paved"), Some(&AttributeValue::Bool(true)));
        assert_eq!(road.property("ref"), Some(&AttributeValue::Null));

        let point = &features[1];
        assert_eq!(point.id.as_deref(), Some("7"));
        assert_eq!(point.geometry, Geometry::Point([1.5, 2.5]));
        assert_eq!(
            point.property("tags"),
            Some(&AttributeValue::Text(r#"{"a":1}"#.into()))
        );
    }

    #[test]
    fn empty_collection_is_valid() {
        let features =
            parse_feature_collection(br#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn null_and_unknown_geometries_are_kept_raw() {
        let body = br#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":null,"properties":null},
            {"type":"Feature","geometry":{"type":"GeometryCollection","geometries":[]}}
        ]}"#;
        let features = parse_feature_collection(body).unwrap();
        assert_eq!(features[0].geometry, Geometry::Other(Value::Null));
        assert!(matches!(features[1].geometry, Geometry::Other(Value::Object(_))));
        assert_eq!(features[0].id, None);
    }

    #[test]
    fn rejects_malformed_bodies() {
        assert!(parse_feature_collection(b"<ServiceExceptionReport/>").is_err());
        assert!(parse_feature_collection(br#"{"type":"Feature"}"#).is_err());
        assert!(parse_feature_collection(br#"{"type":"FeatureCollection"}"#).is_err());
        let bad_point = br#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1]}}
        ]}"#;
        let err = parse_feature_collection(bad_point).unwrap_err();
        assert!(err.message.starts_with("feature 0"), "{err}");
    }
}
