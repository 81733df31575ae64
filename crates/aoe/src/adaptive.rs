//! Adaptive Expansion Search: the smallest scale that captures `min_points`.
//!
//! Purpose
//! - Wrap the per-support pipeline (expand → clip → classify) in an outer
//!   binary search over the scale `s ∈ [0, max_scale]`.
//!
//! Conventions
//! - `max_scale = min(√(1+max_area) − 1, max_dist / √(A/π))`; the binding cap
//!   is reported as `CapHit` when the target cannot be met.
//! - The search keeps the last scale that met the count, so overshoot is
//!   possible and undershoot is not.
//! - Supports are searched independently; an unreachable support only adds
//!   its id to one aggregated `Warning::TargetUnreachable`.

use geo::{MultiPolygon, Point};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cfg::SolverCfg;
use crate::classify::{count_captured, Observation};
use crate::engine::GeometryEngine;
use crate::error::{AoeError, CapHit, Result, Warning};
use crate::expand::{Expander, Expansion, Method};
use crate::orchestrate::{
    assemble, outcome_from_expansion, prepare_mask, validate_inputs, SupportOutcome,
};
use crate::result::{LongFormResult, Parameter, ResultKind};
use crate::support::{prepare_geometry, FragmentPolicy, Support};

/// Outcome of the search for one support.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpansionRecord {
    pub support_id: String,
    pub scale_used: f64,
    pub points_captured: usize,
    pub target_reached: bool,
    pub cap_hit: CapHit,
}

/// Parameters of an `expand_to_count` call.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandParams {
    pub min_points: usize,
    /// Cap on halo area relative to the original area.
    pub max_area: f64,
    /// Cap on the expansion distance, in coordinate units.
    pub max_dist: Option<f64>,
    pub method: Method,
    pub reference: Option<Point<f64>>,
    pub mask: Option<MultiPolygon<f64>>,
    pub fragments: FragmentPolicy,
    pub solver: SolverCfg,
}

impl ExpandParams {
    pub fn new(min_points: usize) -> Self {
        Self {
            min_points,
            max_area: 2.0,
            max_dist: None,
            method: Method::default(),
            reference: None,
            mask: None,
            fragments: FragmentPolicy::default(),
            solver: SolverCfg::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.min_points < 1 {
            return Err(AoeError::invalid("min_points", "must be >= 1"));
        }
        if !(self.max_area.is_finite() && self.max_area > 0.0) {
            return Err(AoeError::invalid(
                "max_area",
                format!("must be > 0, got {}", self.max_area),
            ));
        }
        if let Some(d) = self.max_dist {
            if !(d.is_finite() && d > 0.0) {
                return Err(AoeError::invalid("max_dist", format!("must be > 0, got {d}")));
            }
        }
        Ok(())
    }
}

/// Largest admissible scale and the cap that sets it.
fn scale_cap(max_area: f64, max_dist: Option<f64>, char_radius: f64) -> (f64, CapHit) {
    let area_cap = (1.0 + max_area).sqrt() - 1.0;
    match max_dist.map(|d| d / char_radius) {
        Some(dist_cap) if dist_cap < area_cap => (dist_cap, CapHit::MaxDist),
        _ => (area_cap, CapHit::MaxArea),
    }
}

fn search_support<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    support: &Support,
    mask: Option<&MultiPolygon<f64>>,
    params: &ExpandParams,
) -> Result<(SupportOutcome, ExpansionRecord)> {
    let (original, fragment_warning) = prepare_geometry(engine, support, params.fragments)?;
    let masked = mask.is_some();
    let record = |scale_used, points_captured, target_reached, cap_hit| ExpansionRecord {
        support_id: support.id.clone(),
        scale_used,
        points_captured,
        target_reached,
        cap_hit,
    };
    let finish = |original: MultiPolygon<f64>, exp: Expansion, rec: ExpansionRecord| {
        let mut outcome = outcome_from_expansion(engine, points, &support.id, original, exp, masked);
        if let Some(w) = fragment_warning.clone() {
            outcome.warnings.insert(0, w);
        }
        (outcome, rec)
    };

    let core_count = count_captured(engine, points, &original, &original);
    if core_count >= params.min_points {
        tracing::debug!(support = support.id.as_str(), core_count, "core_suffices");
        let exp = Expansion {
            aoe_raw: original.clone(),
            aoe_final: original.clone(),
            scale: 0.0,
            warnings: Vec::new(),
        };
        return Ok(finish(original, exp, record(0.0, core_count, true, CapHit::None)));
    }

    let reference = params.reference.or(support.reference);
    let expander = Expander::new(
        engine,
        params.solver,
        params.method,
        &support.id,
        &original,
        mask,
        reference,
    )?;
    let (max_scale, binding) =
        scale_cap(params.max_area, params.max_dist, expander.characteristic_radius());

    let top = expander.at_scale(max_scale)?;
    let top_count = count_captured(engine, points, &original, &top.aoe_final);
    if top_count < params.min_points {
        let rec = record(max_scale, top_count, false, binding);
        return Ok(finish(original.clone(), top, rec));
    }

    let cfg = &params.solver;
    let (mut lo, mut hi) = (0.0_f64, max_scale);
    let mut best = (top, top_count);
    let mut iterations = 0;
    while hi - lo >= cfg.search_width_tol && iterations < cfg.search_max_iter {
        iterations += 1;
        let mid = 0.5 * (lo + hi);
        let exp = expander.at_scale(mid)?;
        let count = count_captured(engine, points, &original, &exp.aoe_final);
        tracing::debug!(support = support.id.as_str(), iterations, scale = mid, count, "count_search");
        if count >= params.min_points {
            hi = mid;
            best = (exp, count);
        } else {
            lo = mid;
        }
    }
    let (mut exp, count) = best;
    if hi - lo >= cfg.search_width_tol {
        exp.warnings.push(
            Warning::NonConvergence {
                support_id: Some(support.id.clone()),
                stage: "count_search".to_string(),
                iterations,
                rel_error: (hi - lo) / max_scale,
            }
            .emit(),
        );
    }
    let rec = record(hi, count, true, CapHit::None);
    Ok(finish(original.clone(), exp, rec))
}

/// Per support, find the smallest expansion capturing at least
/// `params.min_points` points (core + halo), within the area and distance
/// caps. Unreachable supports keep their capped expansion and are listed in
/// a single `TargetUnreachable` warning.
pub fn expand_to_count<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    supports: &[Support],
    params: &ExpandParams,
) -> Result<LongFormResult> {
    params.validate()?;
    validate_inputs(
        points,
        supports,
        params.method,
        params.reference,
        params.fragments,
    )?;
    let mask = prepare_mask(engine, params.mask.as_ref())?;

    let (outcomes, records): (Vec<_>, Vec<_>) = supports
        .par_iter()
        .map(|s| search_support(engine, points, s, mask.as_ref(), params))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    let unreached: Vec<String> = records
        .iter()
        .filter(|r| !r.target_reached)
        .map(|r| r.support_id.clone())
        .collect();
    let mut extra = Vec::new();
    if !unreached.is_empty() {
        extra.push(
            Warning::TargetUnreachable {
                support_ids: unreached,
                min_points: params.min_points,
            }
            .emit(),
        );
    }

    let parameter = Parameter::MinPoints {
        min_points: params.min_points,
        max_area: params.max_area,
        max_dist: params.max_dist,
    };
    let result = assemble(
        outcomes,
        parameter,
        params.method,
        ResultKind::Expanded { records },
        extra,
    );
    tracing::info!(
        supports = result.support_count,
        points = points.len(),
        rows = result.rows.len(),
        warnings = result.warnings.len(),
        "expand_to_count"
    );
    Ok(result)
}
