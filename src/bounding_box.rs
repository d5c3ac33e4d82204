use geojson::FeatureCollection;
use log::warn;

use crate::error::PipelineError;
use crate::geometry::FeatureGeometry;
use crate::projection::{ProjectedPoint, Projector};


/// Margin in projected units added on each side of the x and y extent.
pub const PADDING: f64 = 2.0;


/// Axis-aligned envelope of a layer in projected coordinates. The z range is unbounded.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: ProjectedPoint,
    pub max: ProjectedPoint,
}

impl BoundingBox {
    pub fn new(min: ProjectedPoint, max: ProjectedPoint) -> Self {
        BoundingBox { min, max }
    }

    /// Center of the x/y extent at z = 0.
    pub fn center(&self) -> ProjectedPoint {
        ProjectedPoint::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            0.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// The larger of width and height.
    pub fn max_dimension(&self) -> f64 {
        self.width().max(self.height())
    }

    pub fn is_inside(&self, point: ProjectedPoint) -> bool {
        point.x >= self.min.x &&
        point.y >= self.min.y &&
        point.z >= self.min.z &&
        point.x <= self.max.x &&
        point.y <= self.max.y &&
        point.z <= self.max.z
    }
}


/// Running min/max over projected x and y.
#[derive(Copy, Clone, Debug)]
struct Extent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Extent {
    fn empty() -> Self {
        Extent {
            min_x: std::f64::INFINITY,
            min_y: std::f64::INFINITY,
            max_x: std::f64::NEG_INFINITY,
            max_y: std::f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }
}

/// Compute the padded envelope of every projected coordinate in the collection.
///
/// Coordinates that fail to project are skipped with a warning so they never reach the running
/// min/max. Features with unsupported or missing geometry are skipped as well. Fails with
/// `EmptyCollection` if nothing valid is left.
pub fn compute_bounding_box(fc: &FeatureCollection, projector: &Projector)
    -> Result<BoundingBox, PipelineError>
{
    let mut extent = Extent::empty();

    for (index, feature) in fc.features.iter().enumerate() {
        let geometry = match FeatureGeometry::from_feature(feature) {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!("Skipping feature {} in bounding box: {}", index, err);
                continue;
            },
        };

        for position in geometry.positions() {
            match projector.project_position(position, 0.0) {
                Ok(p) => extent.add(p.x, p.y),
                Err(err) => warn!("Skipping coordinate of feature {} in bounding box: {}", index, err),
            }
        }
    }

    if extent.is_empty() {
        return Err(PipelineError::EmptyCollection);
    }

    Ok(BoundingBox {
        min: ProjectedPoint::new(extent.min_x - PADDING, extent.min_y - PADDING, std::f64::NEG_INFINITY),
        max: ProjectedPoint::new(extent.max_x + PADDING, extent.max_y + PADDING, std::f64::INFINITY),
    })
}
