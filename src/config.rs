//! Settings of a view, read from an optional JSON file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::ingest::Source;
use crate::layers::LayerSettings;
use crate::projection::{Projector, DEFAULT_CRS_DEFINITION, DEFAULT_CRS_ID};
use crate::scene::LayerSources;


#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrsConfig {
    pub identifier: String,
    pub definition: String,
}

impl Default for CrsConfig {
    fn default() -> Self {
        CrsConfig {
            identifier: DEFAULT_CRS_ID.to_string(),
            definition: DEFAULT_CRS_DEFINITION.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerSourceConfig {
    pub contours: Option<String>,
    pub cell_towers: Option<String>,
    pub fm_towers: Option<String>,
    pub fm_polygons: Option<String>,
}

impl LayerSourceConfig {
    pub fn to_sources(&self) -> LayerSources {
        let parse = |s: &Option<String>| s.as_ref().map(|s| Source::parse(s));
        LayerSources {
            contours: parse(&self.contours),
            cell_towers: parse(&self.cell_towers),
            fm_towers: parse(&self.fm_towers),
            fm_polygons: parse(&self.fm_polygons),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub crs: CrsConfig,
    pub z_scale: f64,
    pub fov_degrees: f64,
    pub contour_property: String,
    pub elevation_property: String,
    pub label_property: String,
    /// Draw every n-th propagation polygon. Picked at random around 10 if not set.
    pub polygon_stride: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    /// Largest camera distance from its target.
    pub max_distance: Option<f64>,
    pub layers: LayerSourceConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let settings = LayerSettings::default();
        ViewerConfig {
            crs: CrsConfig::default(),
            z_scale: settings.z_scale,
            fov_degrees: 75.0,
            contour_property: settings.contour_property,
            elevation_property: settings.elevation_property,
            label_property: settings.label_property,
            polygon_stride: None,
            fetch_timeout_secs: None,
            max_distance: None,
            layers: LayerSourceConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let reader = BufReader::new(
            File::open(&path)
                .with_context(|| format!("Failed to open config file {}", path.as_ref().display()))?
        );
        let config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file {}", path.as_ref().display()))?;
        Ok(config)
    }

    pub fn projector(&self) -> anyhow::Result<Projector> {
        let projector = Projector::from_definition(
            self.crs.identifier.as_str(),
            self.crs.definition.as_str(),
        )?;
        Ok(projector)
    }

    pub fn layer_settings(&self) -> LayerSettings {
        LayerSettings {
            z_scale: self.z_scale,
            contour_property: self.contour_property.clone(),
            elevation_property: self.elevation_property.clone(),
            label_property: self.label_property.clone(),
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// The configured stride, or a random one in 7..=12.
    pub fn polygon_stride<R: rand::Rng>(&self, rng: &mut R) -> usize {
        match self.polygon_stride {
            Some(stride) => stride.max(1),
            None => (10 + rng.gen_range(-3i64, 3)) as usize,
        }
    }
}
