//! Point Classifier: label observations against an original and an AoE.
//!
//! Boundary convention: membership is boundary-inclusive for both regions,
//! and the original is tested first, so a point on the original boundary is
//! always `Core`.

use geo::{Geometry, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::engine::GeometryEngine;
use crate::error::{AoeError, Result};

/// An input point with its caller-side identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub id: String,
    pub point: Point<f64>,
}

impl Observation {
    pub fn new(id: impl Into<String>, point: Point<f64>) -> Self {
        Self {
            id: id.into(),
            point,
        }
    }

    /// Accept only point geometries.
    pub fn from_geometry(id: impl Into<String>, g: &Geometry<f64>) -> Result<Self> {
        match g {
            Geometry::Point(p) => Ok(Self::new(id, *p)),
            other => Err(AoeError::GeometryType {
                role: "points",
                expected: "Point",
                found: geometry_kind(other),
            }),
        }
    }
}

/// Core (inside the original) or halo (inside the AoE only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AoeClass {
    Core,
    Halo,
}

impl AoeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AoeClass::Core => "core",
            AoeClass::Halo => "halo",
        }
    }
}

impl std::fmt::Display for AoeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[inline]
fn in_rect(r: &Rect<f64>, p: &Point<f64>) -> bool {
    p.x() >= r.min().x && p.x() <= r.max().x && p.y() >= r.min().y && p.y() <= r.max().y
}

/// Class of a single point; `None` means pruned.
pub fn classify_point<E: GeometryEngine + ?Sized>(
    engine: &E,
    p: &Point<f64>,
    original: &MultiPolygon<f64>,
    aoe_final: &MultiPolygon<f64>,
) -> Option<AoeClass> {
    if engine.contains_point(original, p) {
        Some(AoeClass::Core)
    } else if engine.contains_point(aoe_final, p) {
        Some(AoeClass::Halo)
    } else {
        None
    }
}

/// Label every observation: `(index, class)` with `None` for pruned points.
///
/// Points outside the bounding box of `original ∪ aoe_final` skip the exact
/// membership tests.
pub fn classify_points<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    original: &MultiPolygon<f64>,
    aoe_final: &MultiPolygon<f64>,
) -> Vec<(usize, Option<AoeClass>)> {
    let orig_bb = engine.bounding_rect(original);
    let aoe_bb = engine.bounding_rect(aoe_final);
    points
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let p = &obs.point;
            let maybe_core = orig_bb.as_ref().is_some_and(|r| in_rect(r, p));
            let maybe_halo = aoe_bb.as_ref().is_some_and(|r| in_rect(r, p));
            let class = if maybe_core && engine.contains_point(original, p) {
                Some(AoeClass::Core)
            } else if maybe_halo && engine.contains_point(aoe_final, p) {
                Some(AoeClass::Halo)
            } else {
                None
            };
            (i, class)
        })
        .collect()
}

/// Number of points captured (core or halo).
pub fn count_captured<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    original: &MultiPolygon<f64>,
    aoe_final: &MultiPolygon<f64>,
) -> usize {
    classify_points(engine, points, original, aoe_final)
        .into_iter()
        .filter(|(_, c)| c.is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PlanarEngine;
    use geo::{coord, LineString};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon(),
        ])
    }

    #[test]
    fn core_halo_pruned() {
        let eng = PlanarEngine::default();
        let original = rect(0.0, 0.0, 10.0, 10.0);
        let aoe = rect(-5.0, -5.0, 15.0, 15.0);
        let pts = vec![
            Observation::new("a", Point::new(5.0, 5.0)),
            Observation::new("b", Point::new(12.0, 5.0)),
            Observation::new("c", Point::new(100.0, 100.0)),
        ];
        let out = classify_points(&eng, &pts, &original, &aoe);
        assert_eq!(
            out,
            vec![(0, Some(AoeClass::Core)), (1, Some(AoeClass::Halo)), (2, None)]
        );
        assert_eq!(count_captured(&eng, &pts, &original, &aoe), 2);
    }

    #[test]
    fn original_boundary_is_core() {
        let eng = PlanarEngine::default();
        let original = rect(0.0, 0.0, 10.0, 10.0);
        let aoe = rect(-5.0, -5.0, 15.0, 15.0);
        for p in [Point::new(10.0, 5.0), Point::new(0.0, 0.0), Point::new(3.0, 10.0)] {
            assert_eq!(classify_point(&eng, &p, &original, &aoe), Some(AoeClass::Core));
        }
        // On the AoE boundary: halo, not pruned.
        assert_eq!(
            classify_point(&eng, &Point::new(15.0, 0.0), &original, &aoe),
            Some(AoeClass::Halo)
        );
    }

    #[test]
    fn core_wins_even_when_masked_out_of_aoe() {
        let eng = PlanarEngine::default();
        let original = rect(0.0, 0.0, 10.0, 10.0);
        let empty = MultiPolygon::new(vec![]);
        let pts = vec![Observation::new("a", Point::new(1.0, 1.0))];
        assert_eq!(classify_points(&eng, &pts, &original, &empty), vec![(0, Some(AoeClass::Core))]);
    }

    #[test]
    fn from_geometry_rejects_non_points() {
        let line: Geometry<f64> = LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]).into();
        let err = Observation::from_geometry("x", &line).unwrap_err();
        assert_eq!(
            err,
            AoeError::GeometryType {
                role: "points",
                expected: "Point",
                found: "LineString"
            }
        );
        let p: Geometry<f64> = Point::new(1.0, 2.0).into();
        assert_eq!(Observation::from_geometry("p", &p).unwrap().point, Point::new(1.0, 2.0));
    }

    #[test]
    fn class_labels() {
        assert_eq!(AoeClass::Core.to_string(), "core");
        assert_eq!(AoeClass::Halo.as_str(), "halo");
    }
}
