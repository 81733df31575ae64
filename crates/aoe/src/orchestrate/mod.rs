//! Multi-Support Orchestrator and the `classify` entry point.
//!
//! Each support runs expand → clip → classify on its own. Supports share
//! only immutable inputs (points, mask, engine), so they are mapped in
//! parallel; `collect` keeps input support order, which fixes row order.

use geo::{MultiPolygon, Point};
use rayon::prelude::*;

use crate::cfg::SolverCfg;
use crate::classify::{classify_points, Observation};
use crate::engine::GeometryEngine;
use crate::error::{AoeError, Result, Warning};
use crate::expand::{Expander, Expansion, Method, Target};
use crate::result::{
    ClassifiedPoint, GeometryBundle, LongFormResult, Parameter, ResultKind, SupportGeometry,
};
use crate::support::{prepare_geometry, validate_supports, FragmentPolicy, Support};

/// Parameters of a `classify` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassifyParams {
    pub target: Target,
    pub method: Method,
    /// Call-level reference point: single support and `ScaleAffine` only.
    pub reference: Option<Point<f64>>,
    pub mask: Option<MultiPolygon<f64>>,
    pub fragments: FragmentPolicy,
    pub solver: SolverCfg,
}

/// Everything one support contributes to a long-format result.
pub(crate) struct SupportOutcome {
    pub geometry: SupportGeometry,
    pub rows: Vec<ClassifiedPoint>,
    pub warnings: Vec<Warning>,
}

/// Checks shared by `classify` and `expand_to_count`, run before any
/// geometry work.
pub(crate) fn validate_inputs(
    points: &[Observation],
    supports: &[Support],
    method: Method,
    reference: Option<Point<f64>>,
    fragments: FragmentPolicy,
) -> Result<()> {
    validate_supports(supports)?;
    fragments.validate()?;
    if let Some(bad) = points
        .iter()
        .find(|o| !(o.point.x().is_finite() && o.point.y().is_finite()))
    {
        return Err(AoeError::invalid(
            "points",
            format!("point `{}` has non-finite coordinates", bad.id),
        ));
    }
    if reference.is_some() {
        if supports.len() != 1 {
            return Err(AoeError::invalid(
                "reference",
                "a reference point requires exactly one support; each of several supports uses its own centroid",
            ));
        }
        if method != Method::ScaleAffine {
            return Err(AoeError::invalid(
                "reference",
                "a reference point only applies to the scale_affine method",
            ));
        }
    }
    if method == Method::Buffer {
        if let Some(s) = supports.iter().find(|s| s.reference.is_some()) {
            return Err(AoeError::invalid(
                "reference",
                format!(
                    "support `{}` carries a reference point, which only applies to the scale_affine method",
                    s.id
                ),
            ));
        }
    }
    Ok(())
}

/// Repair the mask once per call.
pub(crate) fn prepare_mask<E: GeometryEngine + ?Sized>(
    engine: &E,
    mask: Option<&MultiPolygon<f64>>,
) -> Result<Option<MultiPolygon<f64>>> {
    mask.map(|m| {
        engine
            .make_valid(m)
            .map_err(|reason| AoeError::invalid("mask", reason))
    })
    .transpose()
}

/// Rows for one support from a finished expansion.
pub(crate) fn outcome_from_expansion<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    support_id: &str,
    original: MultiPolygon<f64>,
    expansion: Expansion,
    masked: bool,
) -> SupportOutcome {
    let rows = classify_points(engine, points, &original, &expansion.aoe_final)
        .into_iter()
        .filter_map(|(i, class)| {
            class.map(|class| ClassifiedPoint {
                point_index: i,
                point_id: points[i].id.clone(),
                support_id: support_id.to_string(),
                class,
                point: points[i].point,
            })
        })
        .collect();
    SupportOutcome {
        geometry: SupportGeometry {
            support_id: support_id.to_string(),
            original,
            aoe_raw: expansion.aoe_raw,
            aoe_final: expansion.aoe_final,
            masked,
            scale: expansion.scale,
        },
        rows,
        warnings: expansion.warnings,
    }
}

fn run_support<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    support: &Support,
    mask: Option<&MultiPolygon<f64>>,
    params: &ClassifyParams,
) -> Result<SupportOutcome> {
    let (original, fragment_warning) = prepare_geometry(engine, support, params.fragments)?;
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
    let expansion = expander.for_target(params.target)?;
    let mut outcome = outcome_from_expansion(
        engine,
        points,
        &support.id,
        original,
        expansion,
        mask.is_some(),
    );
    if let Some(w) = fragment_warning {
        outcome.warnings.insert(0, w);
    }
    Ok(outcome)
}

/// Concatenate per-support outcomes (already in support order).
pub(crate) fn assemble(
    outcomes: Vec<SupportOutcome>,
    parameter: Parameter,
    method: Method,
    kind: ResultKind,
    mut extra_warnings: Vec<Warning>,
) -> LongFormResult {
    let support_count = outcomes.len();
    let mut rows = Vec::with_capacity(outcomes.iter().map(|o| o.rows.len()).sum());
    let mut entries = Vec::with_capacity(outcomes.len());
    let mut warnings = Vec::new();
    for o in outcomes {
        rows.extend(o.rows);
        entries.push(o.geometry);
        warnings.extend(o.warnings);
    }
    warnings.append(&mut extra_warnings);
    LongFormResult {
        rows,
        geometry: Some(GeometryBundle::new(entries)),
        parameter,
        method,
        support_count,
        kind,
        warnings,
    }
}

/// Classify `points` against every support: long-format rows (a point may
/// appear once per support whose AoE contains it) plus the geometry bundle.
///
/// Fails fast on invalid arguments; per-support degradations come back as
/// warnings on the result.
pub fn classify<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    supports: &[Support],
    params: &ClassifyParams,
) -> Result<LongFormResult> {
    params.target.validate()?;
    validate_inputs(
        points,
        supports,
        params.method,
        params.reference,
        params.fragments,
    )?;
    let mask = prepare_mask(engine, params.mask.as_ref())?;

    let outcomes = supports
        .par_iter()
        .map(|s| run_support(engine, points, s, mask.as_ref(), params))
        .collect::<Result<Vec<_>>>()?;

    let parameter = match params.target {
        Target::Scale(scale) => Parameter::Scale { scale },
        Target::Area(area) => Parameter::Area { area },
    };
    let result = assemble(
        outcomes,
        parameter,
        params.method,
        ResultKind::Classified,
        Vec::new(),
    );
    tracing::info!(
        supports = result.support_count,
        points = points.len(),
        rows = result.rows.len(),
        warnings = result.warnings.len(),
        "classify"
    );
    Ok(result)
}

#[cfg(test)]
mod tests;
