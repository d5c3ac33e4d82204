//! Turn parsed GeoJSON layers into projected scene products.

use geojson::FeatureCollection;
use log::{debug, warn};

use crate::error::PipelineError;
use crate::geometry::{number_property, string_property, FeatureGeometry};
use crate::labels::LabelOffsets;
use crate::mst::{build_mst, Edge};
use crate::projection::{ProjectedPoint, Projector};


/// Property names and scaling used when building layers.
#[derive(Clone, Debug)]
pub struct LayerSettings {
    /// Factor from elevation values to z.
    pub z_scale: f64,
    /// Elevation property of contour features.
    pub contour_property: String,
    /// Elevation property of tower features.
    pub elevation_property: String,
    /// Label property of tower features.
    pub label_property: String,
}

impl Default for LayerSettings {
    fn default() -> Self {
        LayerSettings {
            z_scale: 0.0004,
            contour_property: "contour".to_string(),
            elevation_property: "Elevation".to_string(),
            label_property: "Callsign".to_string(),
        }
    }
}


#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }
}

/// Maps contour elevations to colors, blue for the lowest and red for the highest.
pub struct ElevationColors {
    gradient: palette::Gradient<palette::LinSrgb>,
}

impl ElevationColors {
    pub fn new() -> Self {
        let s2l = |r: u8, g: u8, b: u8| -> palette::LinSrgb {
            palette::Srgb::new(
                r as f32 / 255.0,
                g as f32 / 255.0,
                b as f32 / 255.0,
            ).into_linear()
        };

        let stops = vec![
            (0.0, s2l(0x00, 0x00, 0xff)),
            (0.2, s2l(0x00, 0x7f, 0xff)),
            (0.4, s2l(0x00, 0xff, 0x95)),
            (0.5, s2l(0x00, 0xff, 0x00)),
            (0.6, s2l(0xbf, 0xff, 0x00)),
            (0.8, s2l(0xff, 0xbf, 0x00)),
            (1.0, s2l(0xff, 0x00, 0x00)),
        ];
        ElevationColors {
            gradient: palette::Gradient::with_domain(stops),
        }
    }

    pub fn color(&self, elevation: f64, min: f64, max: f64) -> Color {
        let t = if max > min {
            ((elevation - min) / (max - min)).max(0.0).min(1.0)
        } else {
            0.0
        };
        let c = palette::Srgb::from_linear(self.gradient.get(t as f32));
        let to_u8 = |v: f32| (v * 255.0).round().max(0.0).min(255.0) as u8;
        Color::new(to_u8(c.red), to_u8(c.green), to_u8(c.blue))
    }
}


#[derive(Clone, Debug)]
pub struct ContourLine {
    pub color: Color,
    pub vertices: Vec<ProjectedPoint>,
}

#[derive(Clone, Debug)]
pub struct ContourLayer {
    pub lines: Vec<ContourLine>,
    /// Lowest contour elevation of the collection, used as the base of the polygons.
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
}

/// Build one colored polyline per LineString and per member of a MultiLineString.
pub fn build_contours(fc: &FeatureCollection, projector: &Projector, settings: &LayerSettings)
    -> ContourLayer
{
    let elevations: Vec<f64> = fc.features.iter()
        .filter_map(|f| number_property(f, &settings.contour_property))
        .collect();
    let min_elevation = elevations.iter().cloned().fold(None, |m: Option<f64>, e| Some(m.map_or(e, |m| m.min(e))));
    let max_elevation = elevations.iter().cloned().fold(None, |m: Option<f64>, e| Some(m.map_or(e, |m| m.max(e))));

    let colors = ElevationColors::new();
    let mut lines = vec![];

    for (index, feature) in fc.features.iter().enumerate() {
        let elevation = match number_property(feature, &settings.contour_property) {
            Some(e) => e,
            None => {
                warn!("Contour feature {} has no {:?} value", index, settings.contour_property);
                continue;
            },
        };

        let geometry = match FeatureGeometry::from_feature(feature) {
            Ok(g @ FeatureGeometry::LineString(_)) | Ok(g @ FeatureGeometry::MultiLineString(_)) => g,
            Ok(other) => {
                warn!("Contour feature {}: {}", index, PipelineError::UnsupportedGeometryType(other.type_name().to_string()));
                continue;
            },
            Err(err) => {
                warn!("Contour feature {}: {}", index, err);
                continue;
            },
        };

        let color = colors.color(
            elevation,
            min_elevation.unwrap_or(elevation),
            max_elevation.unwrap_or(elevation),
        );
        let z = elevation * settings.z_scale;

        for line in geometry.lines() {
            let mut vertices = Vec::with_capacity(line.len());
            for position in line {
                match projector.project_position(position, z) {
                    Ok(p) => vertices.push(p),
                    Err(err) => warn!("Contour feature {} has invalid coordinates: {}", index, err),
                }
            }
            if !vertices.is_empty() {
                lines.push(ContourLine { color, vertices });
            }
        }
    }

    debug!("Built {} contour lines", lines.len());
    ContourLayer { lines, min_elevation, max_elevation }
}


/// The transmitter networks that are drawn as separate layers.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Network {
    Fm,
    Cellular,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Fm => "fm",
            Network::Cellular => "cell",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "fm" => Some(Network::Fm),
            "cell" | "cellular" => Some(Network::Cellular),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TowerMarker {
    pub position: ProjectedPoint,
    pub label: Option<String>,
    /// Lift of the label to keep it apart from labels at the same spot.
    pub label_offset: f64,
}

#[derive(Clone, Debug)]
pub struct TowerLayer {
    pub network: Network,
    pub markers: Vec<TowerMarker>,
    /// Minimum spanning tree over the markers.
    pub edges: Vec<Edge>,
}

/// Project every Point feature of a tower layer and connect the towers by a spanning tree.
///
/// Only cellular towers are labeled.
pub fn build_towers(
    fc: &FeatureCollection,
    projector: &Projector,
    network: Network,
    settings: &LayerSettings,
) -> TowerLayer {
    let mut offsets = LabelOffsets::default();
    let mut markers = vec![];

    for (index, feature) in fc.features.iter().enumerate() {
        let position = match FeatureGeometry::from_feature(feature) {
            Ok(FeatureGeometry::Point(pos)) => pos,
            Ok(other) => {
                warn!("Tower feature {}: unsupported geometry type for points: {}", index, other.type_name());
                continue;
            },
            Err(err) => {
                warn!("Tower feature {}: {}", index, err);
                continue;
            },
        };

        let elevation = match number_property(feature, &settings.elevation_property) {
            Some(e) => e,
            None => {
                warn!("Tower feature {} has no {:?} value, using 0", index, settings.elevation_property);
                0.0
            },
        };

        let point = match projector.project_position(position, elevation * settings.z_scale) {
            Ok(p) => p,
            Err(err) => {
                warn!("Error projecting tower {}: {}", index, err);
                continue;
            },
        };

        let label = match network {
            Network::Cellular => string_property(feature, &settings.label_property).map(|s| s.to_string()),
            Network::Fm => None,
        };
        let label_offset = match &label {
            Some(label) => offsets.offset(position[0], position[1], label),
            None => 0.0,
        };

        markers.push(TowerMarker { position: point, label, label_offset });
    }

    let points: Vec<ProjectedPoint> = markers.iter().map(|m| m.position).collect();
    let edges = build_mst(&points);
    debug!("{} network: {} towers, {} edges", network.name(), markers.len(), edges.len());

    TowerLayer { network, markers, edges }
}


#[derive(Clone, Debug)]
pub struct PropagationPolygon {
    pub ring: Vec<ProjectedPoint>,
    pub centroid: ProjectedPoint,
}

/// Project the outer ring of every `stride`-th polygon feature at height `base_z`.
///
/// A feature with a single bad coordinate is dropped as a whole.
pub fn build_polygons(
    fc: &FeatureCollection,
    projector: &Projector,
    stride: usize,
    base_z: f64,
) -> Vec<PropagationPolygon> {
    let mut polygons = vec![];

    for (index, feature) in fc.features.iter().enumerate().step_by(stride.max(1)) {
        let ring = match FeatureGeometry::from_feature(feature) {
            Ok(FeatureGeometry::Polygon(ring)) => ring,
            Ok(other) => {
                warn!("Polygon feature {}: unsupported geometry type: {}", index, other.type_name());
                continue;
            },
            Err(err) => {
                warn!("Polygon feature {}: {}", index, err);
                continue;
            },
        };

        let projected: Result<Vec<ProjectedPoint>, PipelineError> = ring.iter()
            .map(|pos| projector.project_position(pos, base_z))
            .collect();
        let ring = match projected {
            Ok(ring) if !ring.is_empty() => ring,
            Ok(_) => {
                warn!("Polygon feature {} has an empty ring", index);
                continue;
            },
            Err(err) => {
                warn!("Error processing polygon feature {}: {}", index, err);
                continue;
            },
        };

        let n = ring.len() as f64;
        let centroid = ProjectedPoint::new(
            ring.iter().map(|p| p.x).sum::<f64>() / n,
            ring.iter().map(|p| p.y).sum::<f64>() / n,
            base_z,
        );
        polygons.push(PropagationPolygon { ring, centroid });
    }

    debug!("Built {} propagation polygons", polygons.len());
    polygons
}
