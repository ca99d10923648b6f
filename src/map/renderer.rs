use crate::braille::BrailleCanvas;
use crate::map::geometry::draw_line;
use crate::map::projection::Projection;
use geojson::{FeatureCollection, Geometry, Value};
use glam::DVec2;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Country outlines drawn underneath the bubbles
#[derive(Clone, Default)]
pub struct BoundaryLayer {
    rings: Vec<LineString>,
}

impl BoundaryLayer {
    /// Collect every polygon ring (exterior and holes) of every feature
    pub fn from_features(collection: &FeatureCollection) -> Self {
        let mut layer = Self::default();
        for feature in &collection.features {
            if let Some(ref geometry) = feature.geometry {
                layer.add_geometry(geometry);
            }
        }
        layer
    }

    fn add_geometry(&mut self, geometry: &Geometry) {
        match &geometry.value {
            Value::LineString(coords) => self.add_line(coords),
            Value::MultiLineString(lines) => lines.iter().for_each(|l| self.add_line(l)),
            Value::Polygon(rings) => rings.iter().for_each(|r| self.add_line(r)),
            Value::MultiPolygon(polygons) => polygons.iter().flatten().for_each(|r| self.add_line(r)),
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.add_geometry(g);
                }
            }
            Value::Point(_) | Value::MultiPoint(_) => {}
        }
    }

    fn add_line(&mut self, coords: &[Vec<f64>]) {
        let line: LineString = coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect();
        if line.len() >= 2 {
            self.rings.push(line);
        }
    }

    /// Draw all outlines to the canvas
    pub fn draw(&self, canvas: &mut BrailleCanvas, projection: &Projection) {
        for line in &self.rings {
            draw_linestring(canvas, line, projection);
        }
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, projection: &Projection) {
    let mut prev: Option<DVec2> = None;

    for &(lon, lat) in line {
        let p = projection.project(lon, lat);

        if let Some(q) = prev {
            // Segments crossing the antimeridian would smear across the whole map
            let wraps = (p.x - q.x).abs() > projection.width as f64 / 2.0;
            if !wraps && projection.segment_might_be_visible(q, p) {
                draw_line(
                    canvas,
                    q.x.round() as i32,
                    q.y.round() as i32,
                    p.x.round() as i32,
                    p.y.round() as i32,
                );
            }
        }

        prev = Some(p);
    }
}
