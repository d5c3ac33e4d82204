//! Forward projection from geographic coordinates into the planar scene frame.

use std::collections::HashMap;

use geomatic::{laea, Point3035, Point4326};

use crate::error::PipelineError;


/// Identifier the default coordinate reference system is registered under.
pub const DEFAULT_CRS_ID: &str = "EPSG:32118";

/// PROJ definition of the default coordinate reference system.
pub const DEFAULT_CRS_DEFINITION: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";


/// A point in the planar frame. `x` and `y` come from the projection, `z` is assigned by the
/// caller (usually a scaled elevation).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        ProjectedPoint { x, y, z }
    }

    /// Euclidean distance in all three dimensions.
    pub fn distance_to(&self, other: &ProjectedPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}


#[derive(Copy, Clone, Debug, PartialEq)]
enum Method {
    /// Degrees are used as planar units unchanged.
    LongLat,
    /// Lambert azimuthal equal-area on ETRS89 (EPSG:3035).
    Laea,
}

/// A registered coordinate reference system that converts (lon, lat) pairs to planar (x, y).
#[derive(Clone, Debug)]
pub struct Projector {
    identifier: String,
    definition: String,
    method: Method,
}

impl Projector {
    /// Parse a PROJ style definition string and register it under `identifier`.
    ///
    /// Every parameter has to be understood: unknown keys, values that don't parse and parameters
    /// that would move the projection away from what is implemented are rejected.
    pub fn from_definition<S: Into<String>>(identifier: S, definition: S)
        -> Result<Projector, PipelineError>
    {
        let definition = definition.into();
        let unsupported = || PipelineError::UnsupportedProjection(definition.clone());

        let params: Vec<(&str, Option<&str>)> = definition.split_whitespace()
            .map(|token| {
                let mut kv = token.trim_start_matches('+').splitn(2, '=');
                (kv.next().unwrap_or(""), kv.next())
            })
            .collect();

        let method = match params.iter().find(|(key, _)| *key == "proj").and_then(|(_, v)| *v) {
            Some("longlat") | Some("latlong") => Method::LongLat,
            Some("laea") => Method::Laea,
            _ => return Err(unsupported()),
        };

        let mut numbers: HashMap<&str, f64> = HashMap::new();
        for &(key, value) in &params {
            match (method, key, value) {
                (_, "proj", Some(_)) | (_, "no_defs", None) | (_, "type", Some("crs")) => {},
                (Method::LongLat, "ellps", Some("WGS84")) | (Method::LongLat, "datum", Some("WGS84")) => {},
                (Method::Laea, "ellps", Some("GRS80")) | (Method::Laea, "units", Some("m")) => {},
                (_, "lat_0", Some(v)) | (_, "lon_0", Some(v)) | (_, "x_0", Some(v))
                    | (_, "y_0", Some(v)) | (_, "pm", Some(v)) =>
                {
                    let number = v.parse::<f64>().map_err(|_| unsupported())?;
                    if numbers.insert(key, number).is_some() {
                        return Err(unsupported());
                    }
                },
                _ => return Err(unsupported()),
            }
        }

        // PROJ defaults all of these to zero
        let has = |key: &str, expected: f64| numbers.get(key).cloned().unwrap_or(0.0) == expected;
        let implemented = match method {
            Method::LongLat => numbers.values().all(|&n| n == 0.0),
            // geomatic only implements EPSG:3035
            Method::Laea => has("lat_0", 52.0) && has("lon_0", 10.0)
                && has("x_0", 4321000.0) && has("y_0", 3210000.0) && has("pm", 0.0),
        };
        if !implemented {
            return Err(unsupported());
        }

        Ok(Projector {
            identifier: identifier.into(),
            definition,
            method,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Project a geographic coordinate. Fails with `InvalidCoordinate` if either value is not
    /// finite.
    pub fn project(&self, lon: f64, lat: f64) -> Result<(f64, f64), PipelineError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(PipelineError::InvalidCoordinate { lon, lat });
        }

        match self.method {
            Method::LongLat => Ok((lon, lat)),
            Method::Laea => {
                if lat.abs() > 90.0 || lon.abs() > 180.0 {
                    return Err(PipelineError::InvalidCoordinate { lon, lat });
                }
                let p: Point3035 = laea::forward(Point4326::new(lat, lon));
                Ok((p.coords.0, p.coords.1))
            },
        }
    }

    /// Project a GeoJSON position (`[lon, lat, ...]`) and attach the given z value.
    pub fn project_position(&self, position: &[f64], z: f64)
        -> Result<ProjectedPoint, PipelineError>
    {
        if position.len() < 2 {
            return Err(PipelineError::MalformedPosition { len: position.len() });
        }
        let (x, y) = self.project(position[0], position[1])?;
        Ok(ProjectedPoint::new(x, y, z))
    }
}

impl Default for Projector {
    fn default() -> Self {
        Projector {
            identifier: DEFAULT_CRS_ID.to_string(),
            definition: DEFAULT_CRS_DEFINITION.to_string(),
            method: Method::LongLat,
        }
    }
}
