//! Fetch GeoJSON layers from static files or plain HTTP.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use geojson::{FeatureCollection, GeoJson};
use log::debug;

use crate::error::PipelineError;


/// Where a layer document lives.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Source::Url(s.to_string())
        } else {
            Source::File(PathBuf::from(s))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}


/// Loads and decodes feature collections. Geometry is not validated here.
pub struct Ingestor {
    client: reqwest::blocking::Client,
}

impl Ingestor {
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Ingestor {
            client: builder.build()?,
        })
    }

    fn fetch_text(&self, source: &Source) -> Result<String, Box<dyn std::error::Error>> {
        match source {
            Source::Url(url) => {
                let text = self.client.get(url.as_str())
                    .send()?
                    .error_for_status()?
                    .text()?;
                Ok(text)
            },
            Source::File(path) => {
                let mut f = File::open(path)?;
                let mut text = String::new();
                f.read_to_string(&mut text)?;
                Ok(text)
            },
        }
    }

    /// Fetch a document and decode it as a GeoJSON feature collection.
    pub fn fetch(&self, source: &Source) -> Result<FeatureCollection, PipelineError> {
        let failure = |reason: String| PipelineError::FetchFailure {
            location: source.to_string(),
            reason,
        };

        let text = self.fetch_text(source).map_err(|e| failure(e.to_string()))?;
        debug!("Read {} bytes from {}", text.len(), source);
        parse_feature_collection(&text).map_err(failure)
    }
}

/// Decode a GeoJSON text that has to be a feature collection.
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection, String> {
    match text.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(fc)) => Ok(fc),
        Ok(_) => Err("GeoJSON document is no FeatureCollection".to_string()),
        Err(err) => Err(err.to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("towerscape-{}-{}", std::process::id(), name));
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(Source::parse("http://localhost/a.geojson"), Source::Url("http://localhost/a.geojson".into()));
        assert_eq!(Source::parse("data/a.geojson"), Source::File(PathBuf::from("data/a.geojson")));
        assert_eq!(Source::parse("data/a.geojson").to_string(), "data/a.geojson");
    }

    #[test]
    fn test_fetch_file() {
        let path = temp_file("points.geojson", r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"Elevation": 10},
             "geometry": {"type": "Point", "coordinates": [-74, 43]}}
        ]}"#);
        let ingestor = Ingestor::new(None).unwrap();
        let fc = ingestor.fetch(&Source::File(path.clone())).unwrap();
        assert_eq!(fc.features.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_fetch_failures() {
        let ingestor = Ingestor::new(Some(Duration::from_secs(1))).unwrap();

        let missing = Source::File(std::env::temp_dir().join("towerscape-does-not-exist.geojson"));
        match ingestor.fetch(&missing) {
            Err(PipelineError::FetchFailure { location, .. }) => assert!(location.ends_with("does-not-exist.geojson")),
            other => panic!("expected FetchFailure, got {:?}", other),
        }

        let path = temp_file("broken.geojson", "{ not json");
        assert!(matches!(ingestor.fetch(&Source::File(path.clone())), Err(PipelineError::FetchFailure { .. })));
        let _ = std::fs::remove_file(path);

        let path = temp_file("point.geojson", r#"{"type": "Point", "coordinates": [1, 2]}"#);
        match ingestor.fetch(&Source::File(path.clone())) {
            Err(PipelineError::FetchFailure { reason, .. }) => assert!(reason.contains("FeatureCollection")),
            other => panic!("expected FetchFailure, got {:?}", other),
        }
        let _ = std::fs::remove_file(path);
    }
}
