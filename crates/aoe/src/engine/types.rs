//! Affine maps and engine tolerances.
//!
//! - `Affine2`: `x ↦ M x + t`, used for the closed-form scale expansion.
//! - `EngineCfg`: disc resolution for buffers and the sliver cutoff applied by
//!   validity repair.

use geo::Coord;
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// 2D affine map: `x ↦ M x + t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2 {
    pub m: Matrix2<f64>,
    pub t: Vector2<f64>,
}

impl Affine2 {
    /// Uniform scaling by `k` about the fixed point `r`: `p ↦ r + k (p − r)`.
    #[inline]
    pub fn scaling_about(k: f64, r: Vector2<f64>) -> Self {
        Self {
            m: Matrix2::identity() * k,
            t: r - r * k,
        }
    }

    #[inline]
    pub fn apply(&self, p: Vector2<f64>) -> Vector2<f64> {
        self.m * p + self.t
    }

    #[inline]
    pub fn apply_coord(&self, c: Coord<f64>) -> Coord<f64> {
        let q = self.apply(Vector2::new(c.x, c.y));
        Coord { x: q.x, y: q.y }
    }
}

/// Engine tolerances.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    /// Vertices per full disc when sweeping buffers.
    pub arc_segments: usize,
    /// Polygons below this area are discarded by `make_valid`.
    pub sliver_area: f64,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            arc_segments: 32,
            sliver_area: 1e-12,
        }
    }
}
