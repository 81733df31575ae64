//! Explicit result types.
//!
//! - `LongFormResult`: one row per (point, support) pair inside that
//!   support's AoE, plus the per-support geometry bundle, the expansion
//!   parameter and the support count. Row subsetting is pure and keeps the
//!   bundle consistent with the surviving rows.
//! - `ResultKind`: extra fields of adaptive runs (`ExpansionRecord`s).
//! - `AoeResult`: tagged union over long-form and border results.
//! - `extract_geometry`, `area_statistics`: read-only views on the bundle.

use std::collections::{BTreeMap, HashSet};

use geo::{MultiPolygon, Point};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::adaptive::ExpansionRecord;
use crate::border::BorderResult;
use crate::classify::AoeClass;
use crate::engine::GeometryEngine;
use crate::error::{AoeError, Result, Warning};
use crate::expand::Method;

/// Column order of the long-format table.
pub const LONG_FORM_COLUMNS: [&str; 6] = ["point_index", "point_id", "support_id", "aoe_class", "x", "y"];

/// One long-format row.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedPoint {
    /// Index into the caller's point slice (recovers the original columns).
    pub point_index: usize,
    pub point_id: String,
    pub support_id: String,
    pub class: AoeClass,
    pub point: Point<f64>,
}

/// Geometries retained for one support.
#[derive(Clone, Debug, PartialEq)]
pub struct SupportGeometry {
    pub support_id: String,
    pub original: MultiPolygon<f64>,
    /// Expanded, before masking.
    pub aoe_raw: MultiPolygon<f64>,
    /// After masking (equal to `aoe_raw` without a mask).
    pub aoe_final: MultiPolygon<f64>,
    pub masked: bool,
    /// Scale the expansion used; the solved value for area targets.
    pub scale: f64,
}

/// Per-support geometries keyed by support id, in input support order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryBundle {
    entries: Vec<SupportGeometry>,
}

impl GeometryBundle {
    pub fn new(entries: Vec<SupportGeometry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, support_id: &str) -> Option<&SupportGeometry> {
        self.entries.iter().find(|e| e.support_id == support_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SupportGeometry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn retained(&self, keep: &HashSet<&str>) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| keep.contains(e.support_id.as_str()))
                .cloned()
                .collect(),
        }
    }
}

/// Expansion parameter recorded on a result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Parameter {
    Scale { scale: f64 },
    Area { area: f64 },
    MinPoints {
        min_points: usize,
        max_area: f64,
        max_dist: Option<f64>,
    },
}

/// Kind-specific fields of a long-format result.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultKind {
    Classified,
    Expanded { records: Vec<ExpansionRecord> },
}

/// Long-format classification result.
#[derive(Clone, Debug, PartialEq)]
pub struct LongFormResult {
    pub rows: Vec<ClassifiedPoint>,
    pub geometry: Option<GeometryBundle>,
    pub parameter: Parameter,
    pub method: Method,
    pub support_count: usize,
    pub kind: ResultKind,
    pub warnings: Vec<Warning>,
}

/// Core/halo counts of one support.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportSummary {
    pub support_id: String,
    pub core: usize,
    pub halo: usize,
}

impl LongFormResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Expansion records for adaptive runs.
    pub fn expansion_records(&self) -> Option<&[ExpansionRecord]> {
        match &self.kind {
            ResultKind::Classified => None,
            ResultKind::Expanded { records } => Some(records),
        }
    }

    /// Keep the rows matching `pred`.
    pub fn filter<P>(&self, pred: P) -> Self
    where
        P: Fn(&ClassifiedPoint) -> bool,
    {
        self.with_rows(self.rows.iter().filter(|r| pred(r)).cloned().collect())
    }

    /// Keep the rows at `indices` (in the given order; out-of-range indices
    /// are ignored).
    pub fn select(&self, indices: &[usize]) -> Self {
        self.with_rows(
            indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        )
    }

    /// New result over `rows`: bundle and records pruned to the surviving
    /// supports, `support_count` recomputed, other attributes carried over.
    fn with_rows(&self, rows: Vec<ClassifiedPoint>) -> Self {
        let keep: HashSet<&str> = rows.iter().map(|r| r.support_id.as_str()).collect();
        let kind = match &self.kind {
            ResultKind::Classified => ResultKind::Classified,
            ResultKind::Expanded { records } => ResultKind::Expanded {
                records: records
                    .iter()
                    .filter(|r| keep.contains(r.support_id.as_str()))
                    .cloned()
                    .collect(),
            },
        };
        let geometry = self.geometry.as_ref().map(|g| g.retained(&keep));
        let support_count = keep.len();
        Self {
            geometry,
            kind,
            support_count,
            parameter: self.parameter,
            method: self.method,
            warnings: self.warnings.clone(),
            rows,
        }
    }

    /// Drop the geometry bundle (rows and attributes are kept).
    pub fn discard_geometry(mut self) -> Self {
        self.geometry = None;
        self
    }

    /// Core/halo counts per support, in bundle order when geometry is
    /// retained, else in order of first appearance.
    pub fn summary(&self) -> Vec<SupportSummary> {
        let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        let mut order: Vec<&str> = match &self.geometry {
            Some(g) => g.iter().map(|e| e.support_id.as_str()).collect(),
            None => Vec::new(),
        };
        for r in &self.rows {
            let c = counts.entry(r.support_id.as_str()).or_insert_with(|| (0, 0));
            match r.class {
                AoeClass::Core => c.0 += 1,
                AoeClass::Halo => c.1 += 1,
            }
            if !order.contains(&r.support_id.as_str()) {
                order.push(r.support_id.as_str());
            }
        }
        order
            .into_iter()
            .map(|id| {
                let (core, halo) = counts.get(id).copied().unwrap_or((0, 0));
                SupportSummary {
                    support_id: id.to_string(),
                    core,
                    halo,
                }
            })
            .collect()
    }
}

/// Which geometries `extract_geometry` returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Which {
    Original,
    #[default]
    Aoe,
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Original,
    Aoe,
}

/// One row of `extract_geometry`.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryRow {
    pub support_id: String,
    pub kind: GeometryKind,
    pub geometry: MultiPolygon<f64>,
}

/// Geometries retained on `result`, optionally for one support only.
pub fn extract_geometry(
    result: &LongFormResult,
    which: Which,
    support_id: Option<&str>,
) -> Result<Vec<GeometryRow>> {
    let bundle = result.geometry.as_ref().ok_or(AoeError::NoGeometry)?;
    let entries: Vec<&SupportGeometry> = match support_id {
        Some(id) => vec![bundle
            .get(id)
            .ok_or_else(|| AoeError::UnknownSupport(id.to_string()))?],
        None => bundle.iter().collect(),
    };
    let mut rows = Vec::with_capacity(entries.len() * 2);
    for e in entries {
        if matches!(which, Which::Original | Which::Both) {
            rows.push(GeometryRow {
                support_id: e.support_id.clone(),
                kind: GeometryKind::Original,
                geometry: e.original.clone(),
            });
        }
        if matches!(which, Which::Aoe | Which::Both) {
            rows.push(GeometryRow {
                support_id: e.support_id.clone(),
                kind: GeometryKind::Aoe,
                geometry: e.aoe_final.clone(),
            });
        }
    }
    Ok(rows)
}

/// Area breakdown of one support.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaRow {
    pub support_id: String,
    pub area_core: f64,
    pub area_halo: f64,
    pub area_aoe: f64,
    pub halo_core_ratio: f64,
    /// Share of the unmasked AoE removed by the mask, in percent.
    pub pct_masked: f64,
    pub scale_used: f64,
}

/// Areas of core, halo and AoE per support.
///
/// `area_halo = area(aoe_final \ original)`.
pub fn area_statistics<E: GeometryEngine + ?Sized>(
    engine: &E,
    result: &LongFormResult,
) -> Result<Vec<AreaRow>> {
    let bundle = result.geometry.as_ref().ok_or(AoeError::NoGeometry)?;
    Ok(bundle
        .entries
        .par_iter()
        .map(|e| {
            let area_core = engine.area(&e.original);
            let area_aoe = engine.area(&e.aoe_final);
            let area_halo = engine.area(&engine.difference(&e.aoe_final, &e.original));
            let raw = engine.area(&e.aoe_raw);
            let pct_masked = if e.masked && raw > 0.0 {
                100.0 * (1.0 - area_aoe / raw).max(0.0)
            } else {
                0.0
            };
            AreaRow {
                support_id: e.support_id.clone(),
                area_core,
                area_halo,
                area_aoe,
                halo_core_ratio: if area_core > 0.0 {
                    area_halo / area_core
                } else {
                    f64::NAN
                },
                pct_masked,
                scale_used: e.scale,
            }
        })
        .collect())
}

/// Any result produced by the public entry points.
#[derive(Clone, Debug, PartialEq)]
pub enum AoeResult {
    LongForm(LongFormResult),
    Border(BorderResult),
}

impl AoeResult {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AoeResult::LongForm(r) => match r.kind {
                ResultKind::Classified => "classified",
                ResultKind::Expanded { .. } => "expanded",
            },
            AoeResult::Border(_) => "border",
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            AoeResult::LongForm(r) => r.rows.len(),
            AoeResult::Border(r) => r.rows.len(),
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        match self {
            AoeResult::LongForm(r) => &r.warnings,
            AoeResult::Border(r) => &r.warnings,
        }
    }
}

impl From<LongFormResult> for AoeResult {
    fn from(r: LongFormResult) -> Self {
        AoeResult::LongForm(r)
    }
}

impl From<BorderResult> for AoeResult {
    fn from(r: BorderResult) -> Self {
        AoeResult::Border(r)
    }
}
