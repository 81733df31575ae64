//! Expansion Solver: original polygon + target → area-of-effect polygon.
//!
//! Methods
//! - `Method::ScaleAffine`: `p' = r + (1+s)(p − r)` about the reference point
//!   (default: centroid). Exact and search-free. Containment of the original
//!   only holds for shapes star-shaped w.r.t. `r`; concave shapes may show
//!   small gaps at concavities. This is documented behaviour, not corrected.
//! - `Method::Buffer` (default): uniform outward buffer whose area equals
//!   `A (1+s)²`. Seeded by the convex closed form `π d² + P d = H`, refined by
//!   bisection on `d` against the engine's true buffered area.
//!
//! Targets
//! - `Target::Scale(s)`: linear multiplier `1+s`, area multiplier `(1+s)²`.
//! - `Target::Area(a)`: halo area `a · A` measured after masking, solved with
//!   the secant method on `s` since masking makes the area curve non-linear.
//!
//! `Expander` caches per-support quantities (area, perimeter, reference,
//! masked original area) so every search iteration only pays for one
//! expand + clip + area evaluation.

mod solvers;

pub use solvers::{bisect_increasing, secant, Refinement, Stop};

use std::f64::consts::PI;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use crate::cfg::SolverCfg;
use crate::engine::GeometryEngine;
use crate::error::{AoeError, Result, Warning};
use crate::mask::clip;

/// Scale giving a halo with the same area as the original: `√2 − 1`.
pub const EQUAL_AREA_SCALE: f64 = std::f64::consts::SQRT_2 - 1.0;

/// How the original polygon is grown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Buffer,
    ScaleAffine,
}

/// Expansion target (mutually exclusive modes).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Target {
    Scale(f64),
    Area(f64),
}

impl Default for Target {
    fn default() -> Self {
        Target::Scale(EQUAL_AREA_SCALE)
    }
}

impl Target {
    /// Build from optional `scale`/`area` arguments; both set is an error,
    /// neither set yields the equal-area default.
    pub fn from_options(scale: Option<f64>, area: Option<f64>) -> Result<Self> {
        let t = match (scale, area) {
            (Some(_), Some(_)) => {
                return Err(AoeError::invalid(
                    "scale/area",
                    "`scale` and `area` are mutually exclusive",
                ))
            }
            (Some(s), None) => Target::Scale(s),
            (None, Some(a)) => Target::Area(a),
            (None, None) => Target::default(),
        };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Target::Scale(s) if !(s.is_finite() && s > 0.0) => {
                Err(AoeError::invalid("scale", format!("must be > 0, got {s}")))
            }
            Target::Area(a) if !(a.is_finite() && a > 0.0) => {
                Err(AoeError::invalid("area", format!("must be > 0, got {a}")))
            }
            _ => Ok(()),
        }
    }
}

/// Expanded geometry of one support.
#[derive(Clone, Debug, PartialEq)]
pub struct Expansion {
    pub aoe_raw: MultiPolygon<f64>,
    pub aoe_final: MultiPolygon<f64>,
    /// Scale actually used (solved value in area mode).
    pub scale: f64,
    pub warnings: Vec<Warning>,
}

/// Per-support expansion context.
pub struct Expander<'a, E: GeometryEngine + ?Sized> {
    engine: &'a E,
    cfg: SolverCfg,
    method: Method,
    support_id: &'a str,
    original: &'a MultiPolygon<f64>,
    mask: Option<&'a MultiPolygon<f64>>,
    reference: Point<f64>,
    area: f64,
    perimeter: f64,
}

impl<'a, E: GeometryEngine + ?Sized> Expander<'a, E> {
    /// Prepare an expander. `reference` only applies to `ScaleAffine`;
    /// absent, the centroid is used.
    pub fn new(
        engine: &'a E,
        cfg: SolverCfg,
        method: Method,
        support_id: &'a str,
        original: &'a MultiPolygon<f64>,
        mask: Option<&'a MultiPolygon<f64>>,
        reference: Option<Point<f64>>,
    ) -> Result<Self> {
        let area = engine.area(original);
        if !(area.is_finite() && area > 0.0) {
            return Err(AoeError::invalid(
                "support",
                format!("support `{support_id}` has no area"),
            ));
        }
        let reference = match reference.or_else(|| engine.centroid(original)) {
            Some(r) => r,
            None => {
                return Err(AoeError::invalid(
                    "support",
                    format!("support `{support_id}` has no centroid"),
                ))
            }
        };
        Ok(Self {
            engine,
            cfg,
            method,
            support_id,
            original,
            mask,
            reference,
            area,
            perimeter: engine.perimeter(original),
        })
    }

    pub fn original_area(&self) -> f64 {
        self.area
    }

    /// `sqrt(A/π)`: radius of the disc with the support's area.
    pub fn characteristic_radius(&self) -> f64 {
        (self.area / PI).sqrt()
    }

    fn repair(&self, g: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        self.engine
            .make_valid(g)
            .map_err(|reason| AoeError::RepairFailed {
                support_id: self.support_id.to_string(),
                reason,
            })
    }

    /// Unmasked expansion at scale `s` (`s = 0` returns the original).
    pub fn raw_at_scale(&self, s: f64) -> Result<(MultiPolygon<f64>, Vec<Warning>)> {
        if !(s.is_finite() && s >= 0.0) {
            return Err(AoeError::invalid("scale", format!("must be >= 0, got {s}")));
        }
        if s == 0.0 {
            return Ok((self.original.clone(), Vec::new()));
        }
        match self.method {
            Method::ScaleAffine => {
                let scaled = self.engine.scale_about(self.original, 1.0 + s, self.reference);
                Ok((self.repair(&scaled)?, Vec::new()))
            }
            Method::Buffer => self.buffer_at_scale(s),
        }
    }

    fn buffer_at_scale(&self, s: f64) -> Result<(MultiPolygon<f64>, Vec<Warning>)> {
        let target = self.area * (1.0 + s).powi(2);
        let halo = target - self.area;
        // Convex closed form π d² + P d − H = 0, positive root.
        let p = self.perimeter;
        let guess = (-p + (p * p + 4.0 * PI * halo).sqrt()) / (2.0 * PI);

        let mut best: Option<(f64, MultiPolygon<f64>)> = None;
        let refinement = bisect_increasing(
            |d| {
                let g = self.engine.buffer(self.original, d);
                let a = self.engine.area(&g);
                let err = (a - target).abs() / target;
                tracing::debug!(support = self.support_id, d, area = a, err, "buffer_bisection");
                if best.as_ref().is_none_or(|(e, _)| err < *e) {
                    best = Some((err, g));
                }
                a
            },
            guess,
            target,
            Stop {
                rel_tol: self.cfg.area_rel_tol,
                max_iter: self.cfg.buffer_max_iter,
            },
            self.cfg.bracket_max_doublings,
        );
        let mut warnings = Vec::new();
        if !refinement.converged {
            warnings.push(
                Warning::NonConvergence {
                    support_id: Some(self.support_id.to_string()),
                    stage: "buffer_distance".to_string(),
                    iterations: refinement.iterations,
                    rel_error: refinement.rel_error,
                }
                .emit(),
            );
        }
        let geometry = match best {
            Some((_, g)) => g,
            None => self.engine.buffer(self.original, refinement.value),
        };
        Ok((self.repair(&geometry)?, warnings))
    }

    /// Expansion at scale `s`, clipped to the mask.
    pub fn at_scale(&self, s: f64) -> Result<Expansion> {
        let (aoe_raw, warnings) = self.raw_at_scale(s)?;
        let aoe_final = clip(self.engine, &aoe_raw, self.mask).map_err(|reason| {
            AoeError::RepairFailed {
                support_id: self.support_id.to_string(),
                reason,
            }
        })?;
        Ok(Expansion {
            aoe_raw,
            aoe_final,
            scale: s,
            warnings,
        })
    }

    /// Expansion meeting `target`.
    pub fn for_target(&self, target: Target) -> Result<Expansion> {
        target.validate()?;
        match target {
            Target::Scale(s) => self.at_scale(s),
            Target::Area(a) => self.for_masked_halo_area(a),
        }
    }

    /// Secant search on `s` so that `area(aoe_final \ original) = a · A`.
    fn for_masked_halo_area(&self, a: f64) -> Result<Expansion> {
        let target = a * self.area;
        // Computed once: the part of the original that survives the mask.
        let kept_original = match self.mask {
            Some(m) => self.engine.area(&self.engine.intersection(self.original, m)),
            None => self.area,
        };

        let mut failure: Option<AoeError> = None;
        let mut best: Option<(f64, Expansion)> = None;
        let mut residual = |s: f64| -> f64 {
            match self.at_scale(s) {
                Ok(exp) => {
                    let halo = self.engine.area(&exp.aoe_final) - kept_original;
                    let r = halo - target;
                    tracing::debug!(support = self.support_id, s, halo, target, "area_secant");
                    if best.as_ref().is_none_or(|(e, _)| r.abs() < *e) {
                        best = Some((r.abs(), exp));
                    }
                    r
                }
                Err(e) => {
                    failure.get_or_insert(e);
                    f64::NAN
                }
            }
        };

        // Closed form ignoring the mask: (1+s)² = 1 + a.
        let s0 = (1.0 + a).sqrt() - 1.0;
        let r0 = residual(s0);
        let halo0 = r0 + target;
        let s1 = if halo0 > 0.0 {
            s0 * (target / halo0).sqrt()
        } else {
            2.0 * s0
        };
        let refinement = if (r0.abs() / target) <= self.cfg.area_rel_tol {
            Refinement {
                value: s0,
                converged: true,
                iterations: 0,
                rel_error: r0.abs() / target,
            }
        } else {
            secant(
                &mut residual,
                (s0, r0),
                s1,
                target,
                0.0,
                Stop {
                    rel_tol: self.cfg.area_rel_tol,
                    max_iter: self.cfg.secant_max_iter,
                },
            )
        };
        drop(residual);
        if let Some(e) = failure {
            return Err(e);
        }
        let Some((_, mut exp)) = best else {
            return Err(AoeError::invalid("area", "no expansion evaluated"));
        };
        if !refinement.converged {
            exp.warnings.push(
                Warning::NonConvergence {
                    support_id: Some(self.support_id.to_string()),
                    stage: "masked_area_secant".to_string(),
                    iterations: refinement.iterations,
                    rel_error: refinement.rel_error,
                }
                .emit(),
            );
        }
        Ok(exp)
    }
}

/// Expand one polygon without a mask.
///
/// `reference` is only meaningful for `Method::ScaleAffine`; passing it with
/// `Method::Buffer` is an invalid argument.
pub fn expand<E: GeometryEngine + ?Sized>(
    engine: &E,
    original: &MultiPolygon<f64>,
    target: Target,
    method: Method,
    reference: Option<Point<f64>>,
    cfg: SolverCfg,
) -> Result<Expansion> {
    if reference.is_some() && method == Method::Buffer {
        return Err(AoeError::invalid(
            "reference",
            "a reference point only applies to the scale_affine method",
        ));
    }
    Expander::new(engine, cfg, method, "<polygon>", original, None, reference)?.for_target(target)
}

#[cfg(test)]
mod tests;
