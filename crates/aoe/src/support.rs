//! Support regions and input validation.
//!
//! A support is one identified polygonal region. Multipolygon supports are
//! kept whole unless `FragmentPolicy::KeepDominant` is requested, in which
//! case a clearly dominant part replaces the whole (with a warning).

use std::collections::HashSet;

use geo::{Geometry, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use crate::classify::geometry_kind;
use crate::engine::GeometryEngine;
use crate::error::{AoeError, Result, Warning};

/// Identified original region.
#[derive(Clone, Debug, PartialEq)]
pub struct Support {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
    /// Fixed point for `ScaleAffine`; the centroid when absent.
    pub reference: Option<Point<f64>>,
}

impl Support {
    pub fn new(id: impl Into<String>, geometry: impl Into<MultiPolygon<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Point<f64>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Accept only `Polygon` and `MultiPolygon` geometries.
    pub fn from_geometry(id: impl Into<String>, g: &Geometry<f64>) -> Result<Self> {
        match g {
            Geometry::Polygon(p) => Ok(Self::new(id, p.clone())),
            Geometry::MultiPolygon(mp) => Ok(Self::new(id, mp.clone())),
            other => Err(AoeError::GeometryType {
                role: "support",
                expected: "Polygon or MultiPolygon",
                found: geometry_kind(other),
            }),
        }
    }
}

/// What to do with multipolygon supports whose parts differ greatly in area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FragmentPolicy {
    /// Use every part.
    #[default]
    KeepAll,
    /// Keep only the largest part when it is at least `ratio` times the
    /// second largest.
    KeepDominant { ratio: f64 },
}

impl FragmentPolicy {
    /// `ratio` must be finite and `>= 1`; anything else would drop parts
    /// of comparable size.
    pub(crate) fn validate(&self) -> Result<()> {
        match *self {
            FragmentPolicy::KeepDominant { ratio } if !(ratio.is_finite() && ratio >= 1.0) => {
                Err(AoeError::invalid(
                    "fragments",
                    format!("keep_dominant ratio must be finite and >= 1, got {ratio}"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Non-empty list, non-empty and unique ids, non-empty geometries.
pub(crate) fn validate_supports(supports: &[Support]) -> Result<()> {
    if supports.is_empty() {
        return Err(AoeError::invalid("support", "at least one support is required"));
    }
    let mut seen = HashSet::with_capacity(supports.len());
    for s in supports {
        if s.id.is_empty() {
            return Err(AoeError::invalid("support", "support ids must be non-empty"));
        }
        if !seen.insert(s.id.as_str()) {
            return Err(AoeError::invalid(
                "support",
                format!("duplicate support id `{}`", s.id),
            ));
        }
        if s.geometry.0.is_empty() {
            return Err(AoeError::invalid(
                "support",
                format!("support `{}` has an empty geometry", s.id),
            ));
        }
    }
    Ok(())
}

/// Repair the support geometry and apply the fragment policy.
pub(crate) fn prepare_geometry<E: GeometryEngine + ?Sized>(
    engine: &E,
    support: &Support,
    policy: FragmentPolicy,
) -> Result<(MultiPolygon<f64>, Option<Warning>)> {
    let repaired = engine
        .make_valid(&support.geometry)
        .map_err(|reason| AoeError::RepairFailed {
            support_id: support.id.clone(),
            reason,
        })?;
    let FragmentPolicy::KeepDominant { ratio } = policy else {
        return Ok((repaired, None));
    };
    if repaired.0.len() < 2 {
        return Ok((repaired, None));
    }
    let mut parts: Vec<(f64, usize)> = repaired
        .0
        .iter()
        .enumerate()
        .map(|(i, p)| (engine.area(&MultiPolygon::new(vec![p.clone()])), i))
        .collect();
    parts.sort_by(|a, b| b.0.total_cmp(&a.0));
    let (largest, keep) = parts[0];
    let second = parts[1].0;
    if largest < ratio * second {
        return Ok((repaired, None));
    }
    let dropped_area: f64 = parts[1..].iter().map(|(a, _)| a).sum();
    let warning = Warning::FragmentsDropped {
        support_id: support.id.clone(),
        dropped: parts.len() - 1,
        dropped_area,
    }
    .emit();
    let mut polys = repaired.0;
    let kept = polys.swap_remove(keep);
    Ok((MultiPolygon::new(vec![kept]), Some(warning)))
}
