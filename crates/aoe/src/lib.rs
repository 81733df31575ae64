//! Area-of-effect classification of point observations.
//!
//! A support polygon is grown into an area of effect (AoE), optionally
//! clipped to a hard mask, and every point is labelled `core` (inside the
//! support), `halo` (inside the AoE only) or pruned. Multiple supports yield
//! long-format rows; an adaptive search finds the smallest AoE reaching a
//! point count; a border variant classifies points by side of a line.
//!
//! Layout
//! - `engine`: planar geometry capability trait and the `geo` backend.
//! - `expand`, `mask`, `classify`: the per-support pipeline.
//! - `orchestrate`, `adaptive`, `border`: the entry points.
//! - `result`: explicit result types and read-only views.
//!
//! API Policy
//! - Entry points take an engine, observations and supports by reference and
//!   return a result value; nothing is mutated in place.
//! - Non-fatal diagnostics travel on `warnings`, not on stderr.

pub mod adaptive;
pub mod api;
pub mod border;
pub mod cfg;
pub mod classify;
pub mod engine;
pub mod error;
pub mod expand;
pub mod mask;
pub mod orchestrate;
pub mod result;
pub mod support;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use cfg::SolverCfg;
pub use engine::{EngineCfg, GeometryEngine, PlanarEngine};
pub use error::{AoeError, Result, Warning};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::adaptive::{expand_to_count, ExpandParams};
    pub use crate::border::{classify_by_border, BorderParams};
    pub use crate::classify::{AoeClass, Observation};
    pub use crate::engine::{GeometryEngine, PlanarEngine};
    pub use crate::expand::{Method, Target, EQUAL_AREA_SCALE};
    pub use crate::orchestrate::{classify, ClassifyParams};
    pub use crate::result::{area_statistics, extract_geometry, AoeResult, Which};
    pub use crate::support::{FragmentPolicy, Support};
    pub use crate::SolverCfg;
}
