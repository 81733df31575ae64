//! Error taxonomy and non-fatal warnings.
//!
//! - `AoeError`: fatal, raised before any computation starts (or when a
//!   geometry repair fails for one support).
//! - `Warning`: degraded-but-usable outcomes (non-convergence, unreachable
//!   point targets, dropped fragments). Returned on results, never printed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors for classification calls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AoeError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("wrong geometry type for {role}: expected {expected}, found {found}")]
    GeometryType {
        role: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("geometry repair failed for support `{support_id}`: {reason}")]
    RepairFailed { support_id: String, reason: String },

    #[error("unknown support id `{0}`")]
    UnknownSupport(String),

    #[error("result carries no geometry bundle")]
    NoGeometry,
}

impl AoeError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AoeError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AoeError>;

/// Which cap bounded an adaptive expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapHit {
    None,
    MaxArea,
    MaxDist,
}

/// Non-fatal diagnostics attached to a result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// An iterative search hit its cap; the best estimate was used.
    NonConvergence {
        support_id: Option<String>,
        stage: String,
        iterations: usize,
        rel_error: f64,
    },
    /// Adaptive search could not capture `min_points` within the caps.
    TargetUnreachable {
        support_ids: Vec<String>,
        min_points: usize,
    },
    /// A multipolygon support lost minor fragments under `KeepDominant`.
    FragmentsDropped {
        support_id: String,
        dropped: usize,
        dropped_area: f64,
    },
}

impl Warning {
    /// Log through `tracing` and hand the warning back for collection.
    pub(crate) fn emit(self) -> Self {
        match &self {
            Warning::NonConvergence {
                support_id,
                stage,
                iterations,
                rel_error,
            } => tracing::warn!(
                support = ?support_id,
                stage = stage.as_str(),
                iterations,
                rel_error,
                "search did not converge; using best estimate"
            ),
            Warning::TargetUnreachable {
                support_ids,
                min_points,
            } => tracing::warn!(
                supports = ?support_ids,
                min_points,
                "min_points not reached within caps"
            ),
            Warning::FragmentsDropped {
                support_id,
                dropped,
                dropped_area,
            } => tracing::warn!(
                support = support_id.as_str(),
                dropped,
                dropped_area,
                "dropped minor fragments of multipolygon support"
            ),
        }
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NonConvergence {
                support_id,
                stage,
                iterations,
                rel_error,
            } => write!(
                f,
                "{stage} did not converge after {iterations} iterations (rel. error {rel_error:.2e}){}",
                support_id
                    .as_deref()
                    .map(|s| format!(" for support `{s}`"))
                    .unwrap_or_default()
            ),
            Warning::TargetUnreachable {
                support_ids,
                min_points,
            } => write!(
                f,
                "could not reach {min_points} points within caps for: {}",
                support_ids.join(", ")
            ),
            Warning::FragmentsDropped {
                support_id,
                dropped,
                dropped_area,
            } => write!(
                f,
                "support `{support_id}`: dropped {dropped} minor fragment(s), area {dropped_area:.3}"
            ),
        }
    }
}
