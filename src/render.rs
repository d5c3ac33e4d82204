//! Top-down preview image of the visible layers.

use std::path::Path;

use raqote::{DrawOptions, DrawTarget, PathBuilder, SolidSource, Source, StrokeStyle};

use crate::bounding_box::BoundingBox;
use crate::layers::Color;
use crate::projection::ProjectedPoint;
use crate::scene::{LayerContent, SceneState};


const BACKGROUND: Color = Color::new(0x00, 0x00, 0x00);
const POLYGON_COLOR: Color = Color::new(0xff, 0x14, 0x93);
const FM_COLOR: Color = Color::new(0xff, 0xff, 0x00);
const CELL_COLOR: Color = Color::new(0xff, 0x5f, 0x1f);
const EDGE_CORE_COLOR: Color = Color::new(0xff, 0xff, 0xff);


fn solid(c: Color, a: u8) -> Source<'static> {
    Source::Solid(SolidSource { r: c.r, g: c.g, b: c.b, a })
}

fn stroke(width: f32) -> StrokeStyle {
    StrokeStyle {
        cap: raqote::LineCap::Round,
        join: raqote::LineJoin::Round,
        width,
        miter_limit: 2.0,
        dash_array: vec![],
        dash_offset: 0.0,
    }
}

/// Maps projected x/y to pixel coordinates, keeping the aspect ratio and centering the box.
#[derive(Copy, Clone, Debug)]
pub struct Viewport {
    bounds: BoundingBox,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Viewport {
    pub fn new(bounds: BoundingBox, width: i32, height: i32) -> Self {
        let bounds_width = bounds.width();
        let bounds_height = bounds.height();

        let canvas_ratio = width as f64 / height as f64;
        let bounds_ratio = bounds_width / bounds_height;

        let (scale, offset_x, offset_y) = if bounds_ratio > canvas_ratio {
            let scale = width as f64 / bounds_width;
            (
                scale,
                0.0,
                (height as f64 - bounds_height * scale) * 0.5,
            )
        } else {
            let scale = height as f64 / bounds_height;
            (
                scale,
                (width as f64 - bounds_width * scale) * 0.5,
                0.0,
            )
        };

        Viewport { bounds, scale, offset_x, offset_y }
    }

    pub fn to_pixel(&self, p: &ProjectedPoint) -> (f32, f32) {
        (
            (self.offset_x + (p.x - self.bounds.min.x) * self.scale) as f32,
            (self.offset_y + (self.bounds.max.y - p.y) * self.scale) as f32,
        )
    }
}

fn polyline(viewport: &Viewport, points: &[ProjectedPoint], close: bool) -> raqote::Path {
    let mut pb = PathBuilder::new();
    for (i, p) in points.iter().enumerate() {
        let (x, y) = viewport.to_pixel(p);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    if close {
        pb.close();
    }
    pb.finish()
}

fn dot(viewport: &Viewport, p: &ProjectedPoint, radius: f32) -> raqote::Path {
    let (x, y) = viewport.to_pixel(p);
    let mut pb = PathBuilder::new();
    pb.arc(x, y, radius, 0.0, 2.0 * std::f32::consts::PI);
    pb.close();
    pb.finish()
}

/// Render the visible layers of a scene as seen from straight above.
pub fn render_image(scene: &SceneState, bounds: BoundingBox, width: i32, height: i32) -> DrawTarget {
    let mut dt = DrawTarget::new(width, height);
    dt.fill_rect(
        0.0,
        0.0,
        width as f32,
        height as f32,
        &solid(BACKGROUND, 0xff),
        &DrawOptions::new(),
    );

    let viewport = Viewport::new(bounds, width, height);

    // back to front: polygons, contours, tree edges, towers
    let mut layers: Vec<_> = scene.layers().filter(|(id, _)| scene.is_visible(*id)).collect();
    layers.sort_by_key(|(_, l)| match l.content {
        LayerContent::Polygons(_) => 0,
        LayerContent::Contours(_) => 1,
        LayerContent::Edges(_) => 2,
        LayerContent::Towers(_) => 3,
    });

    for (id, layer) in layers {
        let network_color = if id.name().starts_with("fm") { FM_COLOR } else { CELL_COLOR };
        match &layer.content {
            LayerContent::Polygons(polygons) => {
                for polygon in polygons {
                    let path = polyline(&viewport, &polygon.ring, true);
                    dt.stroke(&path, &solid(POLYGON_COLOR, 0xcc), &stroke(1.0), &DrawOptions::new());
                    let center = dot(&viewport, &polygon.centroid, 2.0);
                    dt.fill(&center, &solid(POLYGON_COLOR, 0xff), &DrawOptions::new());
                }
            },
            LayerContent::Contours(lines) => {
                for line in lines {
                    let path = polyline(&viewport, &line.vertices, false);
                    dt.stroke(&path, &solid(line.color, 0xff), &stroke(1.0), &DrawOptions::new());
                }
            },
            LayerContent::Edges(edges) => {
                for edge in edges {
                    let path = polyline(&viewport, &[edge.from, edge.to], false);
                    dt.stroke(&path, &solid(network_color, 0x80), &stroke(4.0), &DrawOptions::new());
                    dt.stroke(&path, &solid(EDGE_CORE_COLOR, 0xff), &stroke(1.5), &DrawOptions::new());
                }
            },
            LayerContent::Towers(markers) => {
                for marker in markers.iter().filter(|m| bounds.is_inside(m.position)) {
                    let path = dot(&viewport, &marker.position, 3.0);
                    dt.fill(&path, &solid(network_color, 0xff), &DrawOptions::new());
                }
            },
        }
    }

    dt
}

/// Render a preview of the scene and save it as a PNG file.
pub fn write_png<P: AsRef<Path>>(
    scene: &SceneState,
    bounds: BoundingBox,
    path: P,
    width: i32,
    height: i32,
) -> anyhow::Result<()> {
    let dt = render_image(scene, bounds, width, height);
    dt.write_png(path)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{ContourLine, Network, PropagationPolygon, TowerLayer, TowerMarker};
    use crate::scene::SceneUpdate;

    const OPAQUE_BLACK: u32 = 0xff00_0000;

    fn bounds() -> BoundingBox {
        BoundingBox::new(
            ProjectedPoint::new(0.0, 0.0, std::f64::NEG_INFINITY),
            ProjectedPoint::new(4.0, 2.0, std::f64::INFINITY),
        )
    }

    fn pixel(dt: &DrawTarget, x: i32, y: i32) -> u32 {
        dt.get_data()[(y * dt.width() + x) as usize]
    }

    fn rgb(dt: &DrawTarget, x: i32, y: i32) -> (u8, u8, u8) {
        let p = pixel(dt, x, y);
        ((p >> 16) as u8, (p >> 8) as u8, p as u8)
    }

    /// 64x32 pixels, 16 pixels per unit.
    fn scene() -> SceneState {
        let mut scene = SceneState::new();
        // a horizontal contour through the middle of pixel row 16
        let contour = ContourLine {
            color: Color::new(0x00, 0x00, 0xff),
            vertices: vec![ProjectedPoint::new(0.5, 0.96875, 0.0), ProjectedPoint::new(3.5, 0.96875, 0.0)],
        };
        scene.insert_contours(vec![contour], bounds(), Some(0.0));
        // an FM tower at pixel (16, 24)
        scene.insert_towers(TowerLayer {
            network: Network::Fm,
            markers: vec![TowerMarker {
                position: ProjectedPoint::new(1.0, 0.5, 0.0),
                label: None,
                label_offset: 0.0,
            }],
            edges: vec![],
        });
        // a square around pixel (48, 24)
        let ring = vec![
            ProjectedPoint::new(2.75, 0.25, 0.0),
            ProjectedPoint::new(3.25, 0.25, 0.0),
            ProjectedPoint::new(3.25, 0.75, 0.0),
            ProjectedPoint::new(2.75, 0.75, 0.0),
        ];
        scene.insert_polygons(vec![PropagationPolygon { ring, centroid: ProjectedPoint::new(3.0, 0.5, 0.0) }]);
        scene
    }

    #[test]
    fn test_viewport_keeps_aspect_ratio() {
        let vp = Viewport::new(bounds(), 400, 400);
        assert_eq!(vp.to_pixel(&ProjectedPoint::new(0.0, 2.0, 0.0)), (0.0, 100.0));
        assert_eq!(vp.to_pixel(&ProjectedPoint::new(4.0, 0.0, 0.0)), (400.0, 300.0));
        assert_eq!(vp.to_pixel(&ProjectedPoint::new(2.0, 1.0, 0.0)), (200.0, 200.0));
    }

    #[test]
    fn test_render_draws_layers() {
        let dt = render_image(&scene(), bounds(), 64, 32);
        assert_eq!((dt.width(), dt.height()), (64, 32));

        assert_eq!(pixel(&dt, 2, 2), OPAQUE_BLACK);

        let (r, g, b) = rgb(&dt, 32, 16);
        assert!(r < 16 && g < 16 && b > 240, "contour pixel {:?}", (r, g, b));

        let (r, g, b) = rgb(&dt, 16, 24);
        assert!(r > 240 && g > 240 && b < 16, "tower pixel {:?}", (r, g, b));

        let (r, g, b) = rgb(&dt, 48, 24);
        assert!(r > 240 && g < 40 && b > 120 && b < 170, "centroid pixel {:?}", (r, g, b));
    }

    #[test]
    fn test_hidden_layers_are_not_drawn() {
        let mut scene = scene();
        for name in &["contour lines", "fm transmitter points", "fm propagation polygons"] {
            scene.apply(SceneUpdate::SetVisibility { layer: name.to_string(), visible: false }).unwrap();
        }
        let dt = render_image(&scene, bounds(), 64, 32);
        assert!(dt.get_data().iter().all(|&p| p == OPAQUE_BLACK));
    }
}
