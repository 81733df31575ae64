//! Geometry Engine capability interface.
//!
//! Purpose
//! - Give the solvers and classifiers one narrow seam for planar geometry:
//!   area, perimeter, buffering, affine transforms, boolean ops,
//!   boundary-inclusive point membership, centroids and validity repair.
//! - The expansion/classification code only talks to `GeometryEngine`;
//!   `PlanarEngine` is the default backend built on `geo`.
//!
//! Conventions
//! - All polygonal values are `MultiPolygon<f64>`; an empty multipolygon is a
//!   valid (empty) region, never an error.
//! - Coordinates are planar. Reprojection is the caller's business
//!   (`transform` applies an already-known affine map only).

mod buffer;
mod planar;
mod types;

pub use planar::PlanarEngine;
pub use types::{Affine2, EngineCfg};

use geo::{LineString, MultiPolygon, Point, Rect};
use nalgebra::Vector2;

/// Planar geometry capabilities required by the core algorithms.
///
/// Implementations must be `Sync`: supports are processed on worker threads
/// that share one engine by reference.
pub trait GeometryEngine: Sync {
    /// Unsigned area.
    fn area(&self, g: &MultiPolygon<f64>) -> f64;
    /// Total length of all rings (exterior and holes).
    fn perimeter(&self, g: &MultiPolygon<f64>) -> f64;
    /// Euclidean length of a polyline.
    fn line_length(&self, line: &LineString<f64>) -> f64;
    /// Outward buffer by `distance` (non-positive distance returns the input).
    fn buffer(&self, g: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64>;
    /// Two-sided buffer around a polyline with round joins and caps.
    fn buffer_line(&self, line: &LineString<f64>, distance: f64) -> MultiPolygon<f64>;
    /// Apply an affine map to every vertex.
    fn transform(&self, g: &MultiPolygon<f64>, map: &Affine2) -> MultiPolygon<f64>;
    fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;
    fn union(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;
    fn difference(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64>;
    /// Boundary-inclusive membership: points on an edge count as inside.
    fn contains_point(&self, g: &MultiPolygon<f64>, p: &Point<f64>) -> bool;
    /// Area-weighted centroid; `None` for empty input.
    fn centroid(&self, g: &MultiPolygon<f64>) -> Option<Point<f64>>;
    /// A point guaranteed to lie inside `g` (unlike the centroid of a bent
    /// strip); `None` for empty input.
    fn interior_point(&self, g: &MultiPolygon<f64>) -> Option<Point<f64>>;
    fn bounding_rect(&self, g: &MultiPolygon<f64>) -> Option<Rect<f64>>;
    /// Resolve self-intersections and drop slivers. `Err` carries the reason
    /// when the input cannot be repaired.
    fn make_valid(&self, g: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, String>;

    /// Uniform scaling `p ↦ r + k (p − r)` about `origin`.
    fn scale_about(&self, g: &MultiPolygon<f64>, k: f64, origin: Point<f64>) -> MultiPolygon<f64> {
        let r = Vector2::new(origin.x(), origin.y());
        self.transform(g, &Affine2::scaling_about(k, r))
    }
}
