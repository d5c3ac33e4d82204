//! The set of layers on display and everything derived from the contour layer.

use std::collections::BTreeMap;

use log::{error, info};

use crate::bounding_box::{compute_bounding_box, BoundingBox};
use crate::error::PipelineError;
use crate::ingest::{Ingestor, Source};
use crate::layers::{
    build_contours, build_polygons, build_towers, ContourLine, LayerSettings, Network,
    PropagationPolygon, TowerLayer, TowerMarker,
};
use crate::mst::Edge;
use crate::projection::Projector;


/// Layers that can be shown or hidden on their own.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LayerId {
    FmTransmitterPoints,
    FmMstLines,
    CellTransmitterPoints,
    CellMstLines,
    ContourLines,
    FmPropagationPolygons,
}

impl LayerId {
    pub const ALL: [LayerId; 6] = [
        LayerId::FmTransmitterPoints,
        LayerId::FmMstLines,
        LayerId::CellTransmitterPoints,
        LayerId::CellMstLines,
        LayerId::ContourLines,
        LayerId::FmPropagationPolygons,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerId::FmTransmitterPoints => "fm transmitter points",
            LayerId::FmMstLines => "fm minimum spanning tree lines",
            LayerId::CellTransmitterPoints => "cell transmitter points",
            LayerId::CellMstLines => "cell MST lines",
            LayerId::ContourLines => "contour lines",
            LayerId::FmPropagationPolygons => "fm propagation polygons",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        LayerId::ALL.iter().cloned().find(|id| id.name() == name)
    }

    fn points_of(network: Network) -> Self {
        match network {
            Network::Fm => LayerId::FmTransmitterPoints,
            Network::Cellular => LayerId::CellTransmitterPoints,
        }
    }

    fn edges_of(network: Network) -> Self {
        match network {
            Network::Fm => LayerId::FmMstLines,
            Network::Cellular => LayerId::CellMstLines,
        }
    }
}


#[derive(Clone, Debug)]
pub enum LayerContent {
    Contours(Vec<ContourLine>),
    Towers(Vec<TowerMarker>),
    Edges(Vec<Edge>),
    Polygons(Vec<PropagationPolygon>),
}

impl LayerContent {
    pub fn len(&self) -> usize {
        match self {
            LayerContent::Contours(v) => v.len(),
            LayerContent::Towers(v) => v.len(),
            LayerContent::Edges(v) => v.len(),
            LayerContent::Polygons(v) => v.len(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub content: LayerContent,
    pub visible: bool,
}

/// Requested changes to the scene.
#[derive(Clone, Debug)]
pub enum SceneUpdate {
    SetVisibility { layer: String, visible: bool },
}


/// All loaded layers, their visibility and the envelope of the contour layer.
#[derive(Clone, Debug, Default)]
pub struct SceneState {
    layers: BTreeMap<LayerId, Layer>,
    bounding_box: Option<BoundingBox>,
    base_elevation: Option<f64>,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, id: LayerId, content: LayerContent) {
        self.layers.insert(id, Layer { content, visible: true });
    }

    pub fn insert_contours(&mut self, lines: Vec<ContourLine>, bounds: BoundingBox, min_elevation: Option<f64>) {
        self.insert(LayerId::ContourLines, LayerContent::Contours(lines));
        self.bounding_box = Some(bounds);
        self.base_elevation = min_elevation;
    }

    pub fn insert_towers(&mut self, layer: TowerLayer) {
        self.insert(LayerId::points_of(layer.network), LayerContent::Towers(layer.markers));
        self.insert(LayerId::edges_of(layer.network), LayerContent::Edges(layer.edges));
    }

    pub fn insert_polygons(&mut self, polygons: Vec<PropagationPolygon>) {
        self.insert(LayerId::FmPropagationPolygons, LayerContent::Polygons(polygons));
    }

    pub fn bounding_box(&self) -> Option<&BoundingBox> {
        self.bounding_box.as_ref()
    }

    /// Lowest contour elevation, the height propagation polygons are placed at.
    pub fn base_elevation(&self) -> Option<f64> {
        self.base_elevation
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item=(LayerId, &Layer)> + '_ {
        self.layers.iter().map(|(id, layer)| (*id, layer))
    }

    pub fn is_visible(&self, id: LayerId) -> bool {
        self.layer(id).map(|l| l.visible).unwrap_or(false)
    }

    /// Apply a change. Unknown or not loaded layers leave the scene untouched.
    pub fn apply(&mut self, update: SceneUpdate) -> Result<(), PipelineError> {
        match update {
            SceneUpdate::SetVisibility { layer, visible } => {
                let target = LayerId::from_name(&layer).and_then(|id| self.layers.get_mut(&id));
                match target {
                    Some(l) => {
                        l.visible = visible;
                        Ok(())
                    },
                    None => Err(PipelineError::MissingAbstraction(layer)),
                }
            },
        }
    }
}


/// Sources of the layers of one view. Any of them may be missing.
#[derive(Clone, Debug, Default)]
pub struct LayerSources {
    pub contours: Option<Source>,
    pub cell_towers: Option<Source>,
    pub fm_towers: Option<Source>,
    pub fm_polygons: Option<Source>,
}

/// Fetch and build every configured layer. A layer that fails to load is logged and left out,
/// the others are unaffected.
pub fn load_scene(
    sources: &LayerSources,
    ingestor: &Ingestor,
    projector: &Projector,
    settings: &LayerSettings,
    polygon_stride: usize,
) -> SceneState {
    let mut scene = SceneState::new();

    if let Some(source) = &sources.contours {
        let loaded = ingestor.fetch(source).and_then(|fc| {
            let bounds = compute_bounding_box(&fc, projector)?;
            Ok((build_contours(&fc, projector, settings), bounds))
        });
        match loaded {
            Ok((contours, bounds)) => {
                if let (Some(low), Some(high)) = (contours.min_elevation, contours.max_elevation) {
                    info!("Loaded {} contour lines from {}, elevation {} to {}", contours.lines.len(), source, low, high);
                } else {
                    info!("Loaded {} contour lines from {}", contours.lines.len(), source);
                }
                scene.insert_contours(contours.lines, bounds, contours.min_elevation);
            },
            Err(err) => error!("Error loading contour layer: {}", err),
        }
    }

    let towers = [
        (&sources.cell_towers, Network::Cellular),
        (&sources.fm_towers, Network::Fm),
    ];
    for &(source, network) in towers.iter() {
        if let Some(source) = source {
            match ingestor.fetch(source) {
                Ok(fc) => {
                    let layer = build_towers(&fc, projector, network, settings);
                    info!("Loaded {} {} towers from {}", layer.markers.len(), network.name(), source);
                    scene.insert_towers(layer);
                },
                Err(err) => error!("Error loading {} tower layer: {}", network.name(), err),
            }
        }
    }

    if let Some(source) = &sources.fm_polygons {
        match ingestor.fetch(source) {
            Ok(fc) => {
                let base_z = scene.base_elevation().unwrap_or(0.0) * settings.z_scale;
                let polygons = build_polygons(&fc, projector, polygon_stride, base_z);
                info!("Loaded {} propagation polygons from {}", polygons.len(), source);
                scene.insert_polygons(polygons);
            },
            Err(err) => error!("Error loading polygon layer: {}", err),
        }
    }

    scene
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("towerscape-scene-{}-{}", std::process::id(), name));
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const CONTOURS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"contour": 100},
         "geometry": {"type": "LineString", "coordinates": [[-74, 43], [-73, 44]]}},
        {"type": "Feature", "properties": {"contour": 500},
         "geometry": {"type": "LineString", "coordinates": [[-75, 42], [-74, 43]]}}
    ]}"#;

    const TOWERS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"Elevation": 10, "Callsign": "WAAA"},
         "geometry": {"type": "Point", "coordinates": [-74.5, 42.5]}},
        {"type": "Feature", "properties": {"Elevation": 20, "Callsign": "WBBB"},
         "geometry": {"type": "Point", "coordinates": [-73.5, 43.5]}},
        {"type": "Feature", "properties": {"Elevation": 30, "Callsign": "WCCC"},
         "geometry": {"type": "Point", "coordinates": [-74.0, 43.9]}}
    ]}"#;

    const POLYGONS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {},
         "geometry": {"type": "Polygon", "coordinates": [[[-74, 43], [-73, 43], [-73, 44], [-74, 43]]]}}
    ]}"#;

    #[test]
    fn test_load_scene_isolates_failures() {
        let contours = temp_file("contours.geojson", CONTOURS);
        let towers = temp_file("towers.geojson", TOWERS);
        let polygons = temp_file("polygons.geojson", POLYGONS);
        let sources = LayerSources {
            contours: Some(Source::File(contours.clone())),
            cell_towers: Some(Source::File(towers.clone())),
            fm_towers: Some(Source::File(std::env::temp_dir().join("towerscape-missing.geojson"))),
            fm_polygons: Some(Source::File(polygons.clone())),
        };
        let settings = LayerSettings { z_scale: 0.01, ..LayerSettings::default() };
        let ingestor = Ingestor::new(None).unwrap();
        let scene = load_scene(&sources, &ingestor, &Projector::default(), &settings, 1);

        let bounds = scene.bounding_box().unwrap();
        assert_eq!((bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y), (-77.0, 40.0, -71.0, 46.0));
        assert_eq!(scene.base_elevation(), Some(100.0));

        assert_eq!(scene.layer(LayerId::ContourLines).unwrap().content.len(), 2);
        assert_eq!(scene.layer(LayerId::CellTransmitterPoints).unwrap().content.len(), 3);
        assert_eq!(scene.layer(LayerId::CellMstLines).unwrap().content.len(), 2);
        assert!(scene.layer(LayerId::FmTransmitterPoints).is_none());
        assert!(scene.layer(LayerId::FmMstLines).is_none());

        match &scene.layer(LayerId::FmPropagationPolygons).unwrap().content {
            LayerContent::Polygons(polys) => assert_eq!(polys[0].ring[0].z, 1.0),
            other => panic!("unexpected layer content {:?}", other),
        }

        for path in &[contours, towers, polygons] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn test_visibility_updates() {
        let mut scene = SceneState::new();
        scene.insert_polygons(vec![]);
        assert!(scene.is_visible(LayerId::FmPropagationPolygons));

        scene.apply(SceneUpdate::SetVisibility {
            layer: "fm propagation polygons".to_string(),
            visible: false,
        }).unwrap();
        assert!(!scene.is_visible(LayerId::FmPropagationPolygons));

        // known name, but not loaded
        match scene.apply(SceneUpdate::SetVisibility { layer: "contour lines".to_string(), visible: false }) {
            Err(PipelineError::MissingAbstraction(name)) => assert_eq!(name, "contour lines"),
            other => panic!("expected MissingAbstraction, got {:?}", other),
        }
        assert!(scene.apply(SceneUpdate::SetVisibility { layer: "graticule".to_string(), visible: true }).is_err());
        assert_eq!(scene.layers().count(), 1);
    }

    #[test]
    fn test_layer_names() {
        for id in LayerId::ALL.iter() {
            assert_eq!(LayerId::from_name(id.name()), Some(*id));
        }
    }
}
