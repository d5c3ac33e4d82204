//! Typed access to the coordinates of a GeoJSON feature, dispatched on its declared geometry type.

use geojson::{Feature, Value};

use crate::error::PipelineError;


/// The coordinate structure of one feature, restricted to the geometry types this crate consumes.
#[derive(Copy, Clone, Debug)]
pub enum FeatureGeometry<'a> {
    Point(&'a [f64]),
    LineString(&'a [Vec<f64>]),
    MultiLineString(&'a [Vec<Vec<f64>>]),
    /// Outer ring only, holes are ignored.
    Polygon(&'a [Vec<f64>]),
}

impl<'a> FeatureGeometry<'a> {
    pub fn from_feature(feature: &'a Feature) -> Result<Self, PipelineError> {
        match feature.geometry.as_ref() {
            Some(geometry) => Self::from_value(&geometry.value),
            None => Err(PipelineError::MissingGeometry),
        }
    }

    pub fn from_value(value: &'a Value) -> Result<Self, PipelineError> {
        match value {
            Value::Point(pos) => Ok(FeatureGeometry::Point(pos)),
            Value::LineString(line) => Ok(FeatureGeometry::LineString(line)),
            Value::MultiLineString(lines) => Ok(FeatureGeometry::MultiLineString(lines)),
            Value::Polygon(rings) => Ok(FeatureGeometry::Polygon(
                rings.first().map(|r| r.as_slice()).unwrap_or(&[])
            )),
            other => Err(PipelineError::UnsupportedGeometryType(type_name(other).to_string())),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureGeometry::Point(_) => "Point",
            FeatureGeometry::LineString(_) => "LineString",
            FeatureGeometry::MultiLineString(_) => "MultiLineString",
            FeatureGeometry::Polygon(_) => "Polygon",
        }
    }

    /// The coordinate sequences of this geometry. A point yields no lines.
    pub fn lines(&self) -> Vec<&'a [Vec<f64>]> {
        match *self {
            FeatureGeometry::Point(_) => vec![],
            FeatureGeometry::LineString(line) => vec![line],
            FeatureGeometry::MultiLineString(lines) => lines.iter().map(|l| l.as_slice()).collect(),
            FeatureGeometry::Polygon(ring) => vec![ring],
        }
    }

    /// Every position of this geometry in document order.
    pub fn positions(&self) -> Vec<&'a [f64]> {
        match *self {
            FeatureGeometry::Point(pos) => vec![pos],
            _ => self.lines()
                .into_iter()
                .flat_map(|line| line.iter().map(|p| p.as_slice()))
                .collect(),
        }
    }
}

/// Name of a GeoJSON geometry type as it appears in the `type` member.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Read a numeric property from a feature.
pub fn number_property(feature: &Feature, name: &str) -> Option<f64> {
    feature.properties.as_ref().and_then(|p| p.get(name)).and_then(|n| n.as_f64())
}

/// Read a string property from a feature.
pub fn string_property<'a>(feature: &'a Feature, name: &str) -> Option<&'a str> {
    feature.properties.as_ref().and_then(|p| p.get(name)).and_then(|s| s.as_str())
}
