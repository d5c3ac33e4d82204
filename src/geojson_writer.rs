//! A simple interface for writing projected features as GeoJSON feature collections

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::layers::TowerMarker;
use crate::mst::Edge;
use crate::projection::ProjectedPoint;


/// Write feature collections. Positions are written as `[x, y, z]` in projected units.
pub struct GeoJsonWriter<W: Write> {
    writer: BufWriter<W>,
    is_first_feature: bool,
    finished: bool,
}


impl GeoJsonWriter<File> {
    pub fn from_path<P: AsRef<Path>>(path: P)
        -> anyhow::Result<GeoJsonWriter<File>>
    {
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> GeoJsonWriter<W> {
    pub fn new(writer: W)
        -> anyhow::Result<GeoJsonWriter<W>>
    {
        let mut writer = BufWriter::new(writer);
        writer.write_all(b"{\"type\": \"FeatureCollection\", \"features\": [")?;
        Ok(GeoJsonWriter {
            writer,
            is_first_feature: true,
            finished: false,
        })
    }

    fn begin_feature(&mut self) -> anyhow::Result<()> {
        if self.is_first_feature {
            self.is_first_feature = false;
        } else {
            write!(self.writer, ",")?;
        }
        Ok(())
    }

    fn write_position(&mut self, p: &ProjectedPoint) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, &[p.x, p.y, p.z])?;
        Ok(())
    }

    pub fn add_line_string(&mut self, coords: &[ProjectedPoint]) -> anyhow::Result<FeatureWriter<W>> {
        self.begin_feature()?;
        write!(
            self.writer,
            "\n{{\"type\": \"Feature\", \
               \"geometry\": {{\
                 \"type\": \"LineString\", \
                 \"coordinates\": [",
        )?;

        for (i, point) in coords.iter().enumerate() {
            if i > 0 {
                write!(self.writer, ",")?;
            }
            self.write_position(point)?;
        }

        write!(self.writer, "]}}, \"properties\": {{")?;

        Ok(FeatureWriter {
            gjwriter: self,
            is_first: true,
            finished: false,
        })
    }

    pub fn add_point(&mut self, coord: &ProjectedPoint) -> anyhow::Result<FeatureWriter<W>> {
        self.begin_feature()?;
        write!(
            self.writer,
            "\n{{\"type\": \"Feature\", \
               \"geometry\": {{\
                 \"type\": \"Point\", \
                 \"coordinates\": ",
        )?;
        self.write_position(coord)?;
        write!(self.writer, "}}, \"properties\": {{")?;
        Ok(FeatureWriter {
            gjwriter: self,
            is_first: true,
            finished: false,
        })
    }

    /// Write every edge of a spanning tree as a two-point line string.
    pub fn add_edges(&mut self, edges: &[Edge], network: &str) -> anyhow::Result<()> {
        for edge in edges {
            let mut feat = self.add_line_string(&[edge.from, edge.to])?;
            feat.add_property("network", network)?;
            feat.add_property("length", edge.length())?;
            feat.finish()?;
        }
        Ok(())
    }

    /// Write every tower as a point with its label and the lift that keeps the label apart
    /// from others at the same spot.
    pub fn add_towers(&mut self, markers: &[TowerMarker], network: &str) -> anyhow::Result<()> {
        for marker in markers {
            let mut feat = self.add_point(&marker.position)?;
            feat.add_property("network", network)?;
            if let Some(label) = &marker.label {
                feat.add_property("label", label)?;
            }
            feat.add_property("label_offset", marker.label_offset)?;
            feat.finish()?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> anyhow::Result<()> {
        self.mut_finish()
    }

    /// A private method that does not move self so Drop can call it.
    fn mut_finish(&mut self) -> anyhow::Result<()> {
        if !self.finished {
            self.writer.write_all(b"\n]}")?;
            self.writer.flush()?;
            self.finished = true;
        }
        Ok(())
    }
}

impl<W: Write> Drop for GeoJsonWriter<W> {
    fn drop(&mut self) {
        // drop can't return errors :(
        let _ = self.mut_finish();
    }
}

pub struct FeatureWriter<'a, W: Write> {
    gjwriter: &'a mut GeoJsonWriter<W>,
    is_first: bool,
    finished: bool,
}

impl<'a, W: Write> FeatureWriter<'a, W> {
    /// Add a property. Non-finite numbers are written as `null`.
    pub fn add_property<V: Serialize>(&mut self, key: &str, value: V) -> anyhow::Result<()> {
        if self.is_first {
            self.is_first = false;
        } else {
            write!(self.gjwriter.writer, ",")?;
        }
        serde_json::to_writer(&mut self.gjwriter.writer, key)?;
        write!(self.gjwriter.writer, ": ")?;
        serde_json::to_writer(&mut self.gjwriter.writer, &value)?;
        Ok(())
    }

    pub fn finish(mut self) -> anyhow::Result<()> {
        self.mut_finish()
    }

    /// A private method that does not move self so Drop can call it.
    fn mut_finish(&mut self) -> anyhow::Result<()> {
        if !self.finished {
            self.gjwriter.writer.write_all(b"}}")?;
            self.finished = true;
        }
        Ok(())
    }
}

impl<'a, W: Write> Drop for FeatureWriter<'a, W> {
    fn drop(&mut self) {
        // drop can't return errors :(
        let _ = self.mut_finish();
    }
}
