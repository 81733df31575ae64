//! Curated surface of the crate.
//!
//! - Entry points and their parameter structs.
//! - Result types with their views.
//! - Building blocks for callers that drive a single support by hand.

// Entry points
pub use crate::adaptive::{expand_to_count, ExpandParams, ExpansionRecord};
pub use crate::border::{
    border_line_from_geometry, classify_by_border, BorderGeometry, BorderParams, BorderPoint,
    BorderResult, BorderSummary, ZoneArea, DEFAULT_SIDE_NAMES,
};
pub use crate::orchestrate::{classify, ClassifyParams};
// Results
pub use crate::result::{
    area_statistics, extract_geometry, AoeResult, AreaRow, ClassifiedPoint, GeometryBundle,
    GeometryKind, GeometryRow, LongFormResult, Parameter, ResultKind, SupportGeometry,
    SupportSummary, Which, LONG_FORM_COLUMNS,
};
// Building blocks
pub use crate::classify::{classify_point, classify_points, count_captured, AoeClass, Observation};
pub use crate::engine::{Affine2, EngineCfg, GeometryEngine, PlanarEngine};
pub use crate::error::{AoeError, CapHit, Warning};
pub use crate::expand::{expand, Expander, Expansion, Method, Target, EQUAL_AREA_SCALE};
pub use crate::mask::clip;
pub use crate::support::{FragmentPolicy, Support};
pub use crate::cfg::SolverCfg;
