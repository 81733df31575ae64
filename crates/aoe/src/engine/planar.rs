//! Default `GeometryEngine` backed by `geo`.

use geo::{
    Area, BooleanOps, BoundingRect, Centroid, InteriorPoint, Intersects, LineString, MapCoords,
    MultiPolygon, Point, Rect,
};

use super::buffer::{buffer_linestring, buffer_polygonal};
use super::{Affine2, EngineCfg, GeometryEngine};

/// Planar engine over `geo` multipolygons.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanarEngine {
    pub cfg: EngineCfg,
}

impl PlanarEngine {
    pub fn new(cfg: EngineCfg) -> Self {
        Self { cfg }
    }
}

#[inline]
fn ring_length(ring: &LineString<f64>) -> f64 {
    ring.lines().map(|l| l.dx().hypot(l.dy())).sum()
}

fn all_finite(g: &MultiPolygon<f64>) -> bool {
    g.0.iter().all(|p| {
        p.exterior()
            .coords()
            .chain(p.interiors().iter().flat_map(|r| r.coords()))
            .all(|c| c.x.is_finite() && c.y.is_finite())
    })
}

impl GeometryEngine for PlanarEngine {
    fn area(&self, g: &MultiPolygon<f64>) -> f64 {
        g.unsigned_area()
    }

    fn perimeter(&self, g: &MultiPolygon<f64>) -> f64 {
        g.0.iter()
            .map(|p| {
                ring_length(p.exterior()) + p.interiors().iter().map(ring_length).sum::<f64>()
            })
            .sum()
    }

    fn line_length(&self, line: &LineString<f64>) -> f64 {
        ring_length(line)
    }

    fn buffer(&self, g: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
        buffer_polygonal(g, distance, self.cfg.arc_segments)
    }

    fn buffer_line(&self, line: &LineString<f64>, distance: f64) -> MultiPolygon<f64> {
        buffer_linestring(line, distance, self.cfg.arc_segments)
    }

    fn transform(&self, g: &MultiPolygon<f64>, map: &Affine2) -> MultiPolygon<f64> {
        let map = *map;
        g.map_coords(move |c| map.apply_coord(c))
    }

    fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if a.0.is_empty() || b.0.is_empty() {
            return MultiPolygon::new(vec![]);
        }
        a.intersection(b)
    }

    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        a.union(b)
    }

    fn difference(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if a.0.is_empty() || b.0.is_empty() {
            return a.clone();
        }
        a.difference(b)
    }

    fn contains_point(&self, g: &MultiPolygon<f64>, p: &Point<f64>) -> bool {
        // `intersects` is boundary-inclusive, unlike `contains`.
        g.intersects(p)
    }

    fn centroid(&self, g: &MultiPolygon<f64>) -> Option<Point<f64>> {
        g.centroid()
    }

    fn interior_point(&self, g: &MultiPolygon<f64>) -> Option<Point<f64>> {
        g.interior_point()
    }

    fn bounding_rect(&self, g: &MultiPolygon<f64>) -> Option<Rect<f64>> {
        g.bounding_rect()
    }

    fn make_valid(&self, g: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, String> {
        if !all_finite(g) {
            return Err("non-finite coordinate".to_string());
        }
        if g.0.is_empty() {
            return Ok(g.clone());
        }
        // Boolean union with the empty set re-noding the rings resolves
        // self-intersections and normalises orientation.
        let noded = g.union(&MultiPolygon::new(vec![]));
        Ok(MultiPolygon::new(
            noded
                .0
                .into_iter()
                .filter(|p| p.unsigned_area() > self.cfg.sliver_area)
                .collect(),
        ))
    }
}
