use crate::config::ProjectionConfig;
use geojson::{Geometry, Value};
use glam::DVec2;
use std::f64::consts::{FRAC_PI_4, PI, TAU};

/// Latitude where Web Mercator's square world ends
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Fixed Mercator projection from lon/lat degrees to canvas pixels
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    /// Pixels per radian of longitude
    pub scale: f64,
    /// Pixel position of (0°, 0°)
    pub translate: DVec2,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Projection {
    pub fn new(scale: f64, translate: DVec2, width: usize, height: usize) -> Self {
        Self {
            scale,
            translate,
            width,
            height,
        }
    }

    /// Size the projection so the world's 360° spans `scale_factor` canvas widths
    pub fn fit(width: usize, height: usize, config: &ProjectionConfig) -> Self {
        let scale = width as f64 / TAU * config.scale_factor;
        let divisor = if config.translate_y_divisor > 0.0 {
            config.translate_y_divisor
        } else {
            2.0
        };
        let translate = DVec2::new(width as f64 / 2.0, height as f64 / divisor);
        Self::new(scale, translate, width, height)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> DVec2 {
        let lambda = lon.to_radians();
        let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let y = (FRAC_PI_4 + phi / 2.0).tan().ln();
        DVec2::new(
            self.translate.x + self.scale * lambda,
            self.translate.y - self.scale * y,
        )
    }

    /// Inverse of `project`
    pub fn unproject(&self, p: DVec2) -> (f64, f64) {
        if self.scale <= 0.0 {
            return (0.0, 0.0);
        }
        let lambda = (p.x - self.translate.x) / self.scale;
        let y = (self.translate.y - p.y) / self.scale;
        let phi = 2.0 * y.exp().atan() - PI / 2.0;
        (lambda.to_degrees(), phi.to_degrees())
    }

    /// Whether a pixel position lies on the canvas
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f64 && p.y < self.height as f64
    }

    /// Rough bounding box check for a projected segment
    pub fn segment_might_be_visible(&self, a: DVec2, b: DVec2) -> bool {
        let min = a.min(b);
        let max = a.max(b);
        max.x >= 0.0 && min.x < self.width as f64 && max.y >= 0.0 && min.y < self.height as f64
    }
}

/// Running sums for a planar centroid
#[derive(Default)]
struct CentroidSums {
    area: f64,
    moment: DVec2,
    vertices: DVec2,
    vertex_count: usize,
}

impl CentroidSums {
    fn add_vertex(&mut self, p: DVec2) {
        self.vertices += p;
        self.vertex_count += 1;
    }

    /// Exterior rings add area and holes subtract it, whatever their winding
    fn add_ring(&mut self, ring: &[Vec<f64>], projection: &Projection, is_hole: bool) {
        let points: Vec<DVec2> = ring
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| projection.project(c[0], c[1]))
            .collect();
        if points.is_empty() {
            return;
        }

        // GeoJSON rings repeat the first vertex at the end
        let open = if points.len() > 1 && points.first() == points.last() {
            &points[..points.len() - 1]
        } else {
            &points[..]
        };
        for &p in open {
            self.add_vertex(p);
        }

        let mut area = 0.0;
        let mut moment = DVec2::ZERO;
        for (i, &a) in open.iter().enumerate() {
            let b = open[(i + 1) % open.len()];
            let cross = a.perp_dot(b);
            area += cross;
            moment += (a + b) * cross;
        }

        let sign = match (area >= 0.0, is_hole) {
            (true, false) | (false, true) => 1.0,
            _ => -1.0,
        };
        self.area += sign * area;
        self.moment += sign * moment;
    }

    fn add_geometry(&mut self, value: &Value, projection: &Projection) {
        match value {
            Value::Point(c) => {
                if c.len() >= 2 {
                    self.add_vertex(projection.project(c[0], c[1]));
                }
            }
            Value::MultiPoint(points) | Value::LineString(points) => {
                for c in points.iter().filter(|c| c.len() >= 2) {
                    self.add_vertex(projection.project(c[0], c[1]));
                }
            }
            Value::MultiLineString(lines) => {
                for c in lines.iter().flatten().filter(|c| c.len() >= 2) {
                    self.add_vertex(projection.project(c[0], c[1]));
                }
            }
            Value::Polygon(rings) => self.add_polygon(rings, projection),
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.add_polygon(rings, projection);
                }
            }
            Value::GeometryCollection(geometries) => {
                for g in geometries {
                    self.add_geometry(&g.value, projection);
                }
            }
        }
    }

    fn add_polygon(&mut self, rings: &[Vec<Vec<f64>>], projection: &Projection) {
        for (i, ring) in rings.iter().enumerate() {
            self.add_ring(ring, projection, i > 0);
        }
    }

    fn finish(self) -> Option<DVec2> {
        let c = if self.area.abs() > 1e-9 {
            self.moment / (3.0 * self.area)
        } else if self.vertex_count > 0 {
            self.vertices / self.vertex_count as f64
        } else {
            return None;
        };
        c.is_finite().then_some(c)
    }
}

/// Screen-space centroid of a geometry: area-weighted over polygons,
/// falling back to the mean vertex for lines, points and zero-area shapes.
/// `None` when there is nothing to average.
pub fn centroid(geometry: &Geometry, projection: &Projection) -> Option<DVec2> {
    let mut sums = CentroidSums::default();
    sums.add_geometry(&geometry.value, projection);
    sums.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lon: f64, lat: f64, size: f64) -> Vec<Vec<f64>> {
        vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ]
    }

    #[test]
    fn test_project_origin_is_translate() {
        let p = Projection::new(100.0, DVec2::new(50.0, 60.0), 100, 100);
        assert!((p.project(0.0, 0.0) - DVec2::new(50.0, 60.0)).length() < 1e-9);
    }

    #[test]
    fn test_fit_spans_width() {
        let p = Projection::fit(
            400,
            200,
            &ProjectionConfig {
                scale_factor: 1.0,
                translate_y_divisor: 2.0,
            },
        );
        let west = p.project(-180.0, 0.0);
        let east = p.project(180.0, 0.0);
        assert!((west.x - 0.0).abs() < 1e-9);
        assert!((east.x - 400.0).abs() < 1e-9);
        assert_eq!(p.translate, DVec2::new(200.0, 100.0));
    }

    #[test]
    fn test_north_is_up_and_poles_are_finite() {
        let p = Projection::fit(400, 200, &ProjectionConfig::default());
        assert!(p.project(0.0, 45.0).y < p.project(0.0, 0.0).y);
        assert!(p.project(0.0, 90.0).is_finite());
        assert!(p.project(0.0, -90.0).is_finite());
    }

    #[test]
    fn test_unproject_round_trips() {
        let p = Projection::fit(400, 200, &ProjectionConfig::default());
        let (lon, lat) = p.unproject(p.project(12.5, -33.0));
        assert!((lon - 12.5).abs() < 1e-9);
        assert!((lat + 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_of_square_is_its_middle() {
        let p = Projection::new(100.0, DVec2::new(200.0, 200.0), 400, 400);
        let geometry = Geometry::new(Value::Polygon(vec![square(-10.0, -10.0, 20.0)]));
        let c = centroid(&geometry, &p).unwrap();
        assert!((c.x - 200.0).abs() < 1e-9);
        // Mercator stretches symmetric latitudes symmetrically
        assert!((c.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_ignores_winding() {
        let p = Projection::new(100.0, DVec2::new(200.0, 200.0), 400, 400);
        let mut reversed = square(-10.0, -10.0, 20.0);
        reversed.reverse();
        let a = centroid(&Geometry::new(Value::Polygon(vec![square(-10.0, -10.0, 20.0)])), &p).unwrap();
        let b = centroid(&Geometry::new(Value::Polygon(vec![reversed])), &p).unwrap();
        assert!((a - b).length() < 1e-9);
    }

    #[test]
    fn test_centroid_weights_multipolygon_parts_by_area() {
        let p = Projection::new(100.0, DVec2::new(200.0, 200.0), 400, 400);
        let mut small = square(30.0, -1.0, 2.0);
        small.reverse();
        let geometry = Geometry::new(Value::MultiPolygon(vec![
            vec![square(-10.0, -10.0, 20.0)],
            vec![small],
        ]));
        let c = centroid(&geometry, &p).unwrap();
        let big_center = p.project(0.0, 0.0);
        let small_center = p.project(31.0, 0.0);
        assert!(c.x > big_center.x && c.x < (big_center.x + small_center.x) / 2.0);
    }

    #[test]
    fn test_centroid_hole_shifts_away() {
        let p = Projection::new(100.0, DVec2::new(200.0, 200.0), 400, 400);
        let geometry = Geometry::new(Value::Polygon(vec![
            square(-10.0, -10.0, 20.0),
            square(0.0, -5.0, 8.0),
        ]));
        let c = centroid(&geometry, &p).unwrap();
        assert!(c.x < p.project(0.0, 0.0).x);
    }

    #[test]
    fn test_centroid_degenerate_geometry() {
        let p = Projection::new(100.0, DVec2::new(200.0, 200.0), 400, 400);
        assert_eq!(centroid(&Geometry::new(Value::Polygon(vec![])), &p), None);
        assert_eq!(centroid(&Geometry::new(Value::MultiPolygon(vec![vec![vec![]]])), &p), None);

        let point = Geometry::new(Value::Point(vec![0.0, 0.0]));
        assert_eq!(centroid(&point, &p), Some(DVec2::new(200.0, 200.0)));

        // Zero-area sliver falls back to its vertices
        let sliver = Geometry::new(Value::Polygon(vec![vec![
            vec![-1.0, 0.0],
            vec![1.0, 0.0],
            vec![-1.0, 0.0],
        ]]));
        let c = centroid(&sliver, &p).unwrap();
        assert!((c.x - 200.0).abs() < 1e-9);
    }
}
