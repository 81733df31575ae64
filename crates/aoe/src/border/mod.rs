//! Border Classifier: two-sided core/halo zones around a line.
//!
//! Purpose
//! - Buffer a border polyline by `core_width` and `core_width + halo_width`,
//!   clip each buffer to the optional bbox then the optional mask, split
//!   both by the border, and label points by side and distance band.
//!
//! Conventions
//! - Widths given as areas are per-side areas: the bisection matches the
//!   mean of the two side zones, which is half the clipped buffer area.
//! - Without `halo_width`/`halo_area` the halo is as wide as the core.
//! - Point order of tests: side 1 core, side 2 core, side 1 halo,
//!   side 2 halo. The first hit wins; exact boundary overlaps between zones
//!   resolve in this order.

mod split;

use geo::{Geometry, LineString, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::cfg::SolverCfg;
use crate::classify::{geometry_kind, AoeClass, Observation};
use crate::engine::GeometryEngine;
use crate::error::{AoeError, Result, Warning};
use crate::expand::{bisect_increasing, Stop};
use crate::mask::clip;

use split::split_by_line;

/// Default side labels.
pub const DEFAULT_SIDE_NAMES: [&str; 2] = ["side_1", "side_2"];

/// Parameters of a `classify_by_border` call.
#[derive(Clone, Debug, PartialEq)]
pub struct BorderParams {
    /// Core width on each side (exclusive with `area`).
    pub width: Option<f64>,
    /// Core area per side (exclusive with `width`).
    pub area: Option<f64>,
    pub halo_width: Option<f64>,
    pub halo_area: Option<f64>,
    pub mask: Option<MultiPolygon<f64>>,
    pub bbox: Option<Rect<f64>>,
    /// Labels for side 1 (left of the border direction) and side 2.
    pub side_names: Vec<String>,
    pub solver: SolverCfg,
}

impl Default for BorderParams {
    fn default() -> Self {
        Self {
            width: None,
            area: None,
            halo_width: None,
            halo_area: None,
            mask: None,
            bbox: None,
            side_names: DEFAULT_SIDE_NAMES.iter().map(|s| s.to_string()).collect(),
            solver: SolverCfg::default(),
        }
    }
}

fn positive(name: &'static str, v: Option<f64>) -> Result<()> {
    match v {
        Some(x) if !(x.is_finite() && x > 0.0) => {
            Err(AoeError::invalid(name, format!("must be > 0, got {x}")))
        }
        _ => Ok(()),
    }
}

impl BorderParams {
    fn validate(&self) -> Result<()> {
        match (self.width, self.area) {
            (Some(_), Some(_)) => {
                return Err(AoeError::invalid(
                    "width/area",
                    "`width` and `area` are mutually exclusive",
                ))
            }
            (None, None) => {
                return Err(AoeError::invalid("width/area", "one of `width` or `area` is required"))
            }
            _ => {}
        }
        if self.halo_width.is_some() && self.halo_area.is_some() {
            return Err(AoeError::invalid(
                "halo_width/halo_area",
                "`halo_width` and `halo_area` are mutually exclusive",
            ));
        }
        positive("width", self.width)?;
        positive("area", self.area)?;
        positive("halo_width", self.halo_width)?;
        positive("halo_area", self.halo_area)?;
        if self.side_names.len() != 2 {
            return Err(AoeError::invalid(
                "side_names",
                format!("expected 2 names, got {}", self.side_names.len()),
            ));
        }
        if self.side_names[0] == self.side_names[1] {
            return Err(AoeError::invalid("side_names", "side names must differ"));
        }
        if let Some(b) = self.bbox {
            if !(b.width() > 0.0 && b.height() > 0.0) {
                return Err(AoeError::invalid("bbox", "bounding box must have positive extent"));
            }
        }
        Ok(())
    }
}

/// Accept only line geometries as a border.
pub fn border_line_from_geometry(g: &Geometry<f64>) -> Result<LineString<f64>> {
    match g {
        Geometry::LineString(l) => Ok(l.clone()),
        Geometry::Line(l) => Ok(LineString::from(vec![l.start, l.end])),
        other => Err(AoeError::GeometryType {
            role: "border",
            expected: "LineString",
            found: geometry_kind(other),
        }),
    }
}

/// Drop repeated vertices; reject non-finite or degenerate borders.
fn normalize_border(line: &LineString<f64>) -> Result<LineString<f64>> {
    if line.coords().any(|c| !(c.x.is_finite() && c.y.is_finite())) {
        return Err(AoeError::invalid("border", "non-finite coordinate"));
    }
    let mut coords = line.0.clone();
    coords.dedup();
    if coords.len() < 2 {
        return Err(AoeError::invalid("border", "needs at least two distinct vertices"));
    }
    Ok(LineString::from(coords))
}

/// One classified point.
#[derive(Clone, Debug, PartialEq)]
pub struct BorderPoint {
    pub point_index: usize,
    pub point_id: String,
    pub side: String,
    pub class: AoeClass,
    pub point: Point<f64>,
}

/// Zones and widths retained on a border result.
#[derive(Clone, Debug, PartialEq)]
pub struct BorderGeometry {
    pub border: LineString<f64>,
    pub side1_core: MultiPolygon<f64>,
    pub side1_halo: MultiPolygon<f64>,
    pub side2_core: MultiPolygon<f64>,
    pub side2_halo: MultiPolygon<f64>,
    pub core_width: f64,
    pub halo_width: f64,
}

/// Result of `classify_by_border`.
#[derive(Clone, Debug, PartialEq)]
pub struct BorderResult {
    pub rows: Vec<BorderPoint>,
    pub geometry: BorderGeometry,
    pub side_names: [String; 2],
    pub warnings: Vec<Warning>,
}

/// Core/halo counts of one side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderSummary {
    pub side: String,
    pub core: usize,
    pub halo: usize,
}

/// Area of one zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneArea {
    pub side: String,
    pub class: AoeClass,
    pub area: f64,
}

impl BorderResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Counts per side, side 1 first.
    pub fn summary(&self) -> Vec<BorderSummary> {
        self.side_names
            .iter()
            .map(|side| {
                let count = |class| {
                    self.rows
                        .iter()
                        .filter(|r| &r.side == side && r.class == class)
                        .count()
                };
                BorderSummary {
                    side: side.clone(),
                    core: count(AoeClass::Core),
                    halo: count(AoeClass::Halo),
                }
            })
            .collect()
    }

    /// Areas of the four zones in classification order.
    pub fn zone_areas<E: GeometryEngine + ?Sized>(&self, engine: &E) -> Vec<ZoneArea> {
        let g = &self.geometry;
        let [s1, s2] = &self.side_names;
        [
            (s1, AoeClass::Core, &g.side1_core),
            (s2, AoeClass::Core, &g.side2_core),
            (s1, AoeClass::Halo, &g.side1_halo),
            (s2, AoeClass::Halo, &g.side2_halo),
        ]
        .into_iter()
        .map(|(side, class, zone)| ZoneArea {
            side: side.clone(),
            class,
            area: engine.area(zone),
        })
        .collect()
    }
}

/// Buffers of the border clipped to bbox and mask.
struct ZoneBuilder<'a, E: GeometryEngine + ?Sized> {
    engine: &'a E,
    line: &'a LineString<f64>,
    bbox: Option<MultiPolygon<f64>>,
    mask: Option<&'a MultiPolygon<f64>>,
    cfg: SolverCfg,
}

impl<E: GeometryEngine + ?Sized> ZoneBuilder<'_, E> {
    fn clipped(&self, width: f64) -> Result<MultiPolygon<f64>> {
        let mut zone = self.engine.buffer_line(self.line, width);
        if let Some(b) = &self.bbox {
            zone = self.engine.intersection(&zone, b);
        }
        clip(self.engine, &zone, self.mask).map_err(|reason| AoeError::RepairFailed {
            support_id: "border".to_string(),
            reason,
        })
    }

    /// Extra width `h` beyond `base` so that the mean per-side area added
    /// between `base` and `base + h` equals `target`.
    fn solve_width(
        &self,
        base: f64,
        target: f64,
        stage: &str,
        warnings: &mut Vec<Warning>,
    ) -> Result<f64> {
        let base_side = if base > 0.0 {
            0.5 * self.engine.area(&self.clipped(base)?)
        } else {
            0.0
        };
        let guess = target / self.engine.line_length(self.line);
        let mut failure: Option<AoeError> = None;
        let refinement = bisect_increasing(
            |h| match self.clipped(base + h) {
                Ok(zone) => {
                    let side = 0.5 * self.engine.area(&zone) - base_side;
                    tracing::debug!(stage, width = h, side_area = side, target, "border_bisection");
                    side
                }
                Err(e) => {
                    failure.get_or_insert(e);
                    f64::NAN
                }
            },
            guess,
            target,
            Stop {
                rel_tol: self.cfg.area_rel_tol,
                max_iter: self.cfg.border_max_iter,
            },
            self.cfg.bracket_max_doublings,
        );
        if let Some(e) = failure {
            return Err(e);
        }
        if !refinement.converged {
            warnings.push(
                Warning::NonConvergence {
                    support_id: None,
                    stage: stage.to_string(),
                    iterations: refinement.iterations,
                    rel_error: refinement.rel_error,
                }
                .emit(),
            );
        }
        Ok(refinement.value)
    }
}

/// Classify `points` by side of `border` and by distance band.
pub fn classify_by_border<E: GeometryEngine + ?Sized>(
    engine: &E,
    points: &[Observation],
    border: &LineString<f64>,
    params: &BorderParams,
) -> Result<BorderResult> {
    params.validate()?;
    let line = normalize_border(border)?;
    if let Some(bad) = points
        .iter()
        .find(|o| !(o.point.x().is_finite() && o.point.y().is_finite()))
    {
        return Err(AoeError::invalid(
            "points",
            format!("point `{}` has non-finite coordinates", bad.id),
        ));
    }
    let mask = params
        .mask
        .as_ref()
        .map(|m| engine.make_valid(m).map_err(|reason| AoeError::invalid("mask", reason)))
        .transpose()?;

    let builder = ZoneBuilder {
        engine,
        line: &line,
        bbox: params.bbox.map(|b| MultiPolygon::new(vec![b.to_polygon()])),
        mask: mask.as_ref(),
        cfg: params.solver,
    };
    let mut warnings = Vec::new();
    let core_width = match (params.width, params.area) {
        (Some(w), _) => w,
        (None, a) => {
            let a = a.ok_or_else(|| AoeError::invalid("width/area", "missing"))?;
            builder.solve_width(0.0, a, "border_core_width", &mut warnings)?
        }
    };
    let halo_width = match (params.halo_width, params.halo_area) {
        (Some(w), _) => w,
        (None, Some(a)) => builder.solve_width(core_width, a, "border_halo_width", &mut warnings)?,
        (None, None) => core_width,
    };

    let split = |zone: &MultiPolygon<f64>| {
        split_by_line(engine, zone, &line).map_err(|reason| AoeError::RepairFailed {
            support_id: "border".to_string(),
            reason,
        })
    };
    let (side1_core, side2_core) = split(&builder.clipped(core_width)?)?;
    let (side1_total, side2_total) = split(&builder.clipped(core_width + halo_width)?)?;
    let halo = |total: &MultiPolygon<f64>, core: &MultiPolygon<f64>| {
        engine
            .make_valid(&engine.difference(total, core))
            .map_err(|reason| AoeError::RepairFailed {
                support_id: "border".to_string(),
                reason,
            })
    };
    let side1_halo = halo(&side1_total, &side1_core)?;
    let side2_halo = halo(&side2_total, &side2_core)?;

    let side_names = [params.side_names[0].clone(), params.side_names[1].clone()];
    let zones = [
        (&side1_core, 0, AoeClass::Core),
        (&side2_core, 1, AoeClass::Core),
        (&side1_halo, 0, AoeClass::Halo),
        (&side2_halo, 1, AoeClass::Halo),
    ];
    let rows: Vec<BorderPoint> = points
        .iter()
        .enumerate()
        .filter_map(|(i, obs)| {
            zones
                .iter()
                .find(|(zone, _, _)| engine.contains_point(zone, &obs.point))
                .map(|&(_, side, class)| BorderPoint {
                    point_index: i,
                    point_id: obs.id.clone(),
                    side: side_names[side].clone(),
                    class,
                    point: obs.point,
                })
        })
        .collect();

    tracing::info!(
        points = points.len(),
        rows = rows.len(),
        core_width,
        halo_width,
        "classify_by_border"
    );
    Ok(BorderResult {
        rows,
        geometry: BorderGeometry {
            border: line,
            side1_core,
            side1_halo,
            side2_core,
            side2_halo,
            core_width,
            halo_width,
        },
        side_names,
        warnings,
    })
}
