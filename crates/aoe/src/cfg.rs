//! Solver tolerances and iteration caps.
//!
//! Policy
//! - Defaults are fixed constants matching the documented search caps
//!   (buffer bisection 50, adaptive search 30, secant 10).
//! - Kept in one `Copy` struct so call sites pass a single value; the CLI can
//!   override fields from a JSON file.

use serde::{Deserialize, Serialize};

/// Tolerances and caps for the iterative searches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverCfg {
    /// Relative area tolerance for bisection/secant (0.01%).
    pub area_rel_tol: f64,
    /// Bisection cap on buffer distance (polygon supports).
    pub buffer_max_iter: usize,
    /// Secant cap for masked area targets.
    pub secant_max_iter: usize,
    /// Interval width (scale units) that ends the adaptive search.
    pub search_width_tol: f64,
    /// Cap on adaptive search halvings.
    pub search_max_iter: usize,
    /// Bisection cap on border buffer widths.
    pub border_max_iter: usize,
    /// Cap on bracket doublings before a bisection starts.
    pub bracket_max_doublings: usize,
}

impl Default for SolverCfg {
    fn default() -> Self {
        Self {
            area_rel_tol: 1e-4,
            buffer_max_iter: 50,
            secant_max_iter: 10,
            search_width_tol: 1e-3,
            search_max_iter: 30,
            border_max_iter: 50,
            bracket_max_doublings: 40,
        }
    }
}
