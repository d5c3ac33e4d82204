use thiserror::Error;


/// Errors raised while turning GeoJSON layers into scene products.
///
/// Feature and point level variants are recovered by the caller (logged and skipped), only
/// `FetchFailure` and `EmptyCollection` end the processing of a whole layer.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid coordinates: longitude ({lon}), latitude ({lat})")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("position has {len} ordinates, expected at least 2")]
    MalformedPosition { len: usize },

    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    #[error("feature has no geometry")]
    MissingGeometry,

    #[error("failed to load {location}: {reason}")]
    FetchFailure { location: String, reason: String },

    #[error("layer {0:?} not found in the scene")]
    MissingAbstraction(String),

    #[error("unsupported projection definition: {0:?}")]
    UnsupportedProjection(String),

    #[error("feature collection contains no valid coordinates")]
    EmptyCollection,

    #[error("bounding box is not set")]
    MissingBoundingBox,

    #[error("field of view must be between 0 and 180 degrees, got {0}")]
    InvalidFieldOfView(f64),
}
