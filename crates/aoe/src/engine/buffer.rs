//! Disc-sweep buffers.
//!
//! The buffer of a region `R` by `d` is the Minkowski sum `R ⊕ D(d)`. For a
//! polygonal `R` this equals `R ∪ ⋃ strip(e, d) ∪ ⋃ disc(v, d)` over boundary
//! edges `e` and vertices `v`; for a polyline it is the same union without
//! `R`. Discs are inscribed regular polygons, so the result is contained in
//! the exact buffer and always contains the input.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use std::f64::consts::TAU;

/// Regular polygon inscribed in the circle of radius `r` around `center`.
pub(crate) fn disc(center: Coord<f64>, r: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(8);
    let mut coords: Vec<Coord<f64>> = (0..n)
        .map(|k| {
            let a = TAU * (k as f64) / (n as f64);
            Coord {
                x: center.x + r * a.cos(),
                y: center.y + r * a.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

/// Rectangle of half-width `r` around segment `a→b`; `None` for a
/// zero-length segment.
fn strip(a: Coord<f64>, b: Coord<f64>, r: f64) -> Option<Polygon<f64>> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len.is_nan() || len <= 0.0 {
        return None;
    }
    // Left unit normal scaled by r.
    let nx = -dy / len * r;
    let ny = dx / len * r;
    let ring = vec![
        Coord { x: a.x - nx, y: a.y - ny },
        Coord { x: b.x - nx, y: b.y - ny },
        Coord { x: b.x + nx, y: b.y + ny },
        Coord { x: a.x + nx, y: a.y + ny },
        Coord { x: a.x - nx, y: a.y - ny },
    ];
    Some(Polygon::new(LineString::new(ring), vec![]))
}

fn sweep_path(path: &LineString<f64>, r: f64, segments: usize, out: &mut Vec<MultiPolygon<f64>>) {
    for line in path.lines() {
        if let Some(s) = strip(line.start, line.end, r) {
            out.push(MultiPolygon::new(vec![s]));
        }
    }
    let mut last: Option<Coord<f64>> = None;
    for c in path.coords() {
        if last != Some(*c) {
            out.push(MultiPolygon::new(vec![disc(*c, r, segments)]));
        }
        last = Some(*c);
    }
}

/// Union a list of pieces by pairwise reduction (balanced merge tree keeps
/// intermediate polygons small).
pub(crate) fn union_all(mut pieces: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    if pieces.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    while pieces.len() > 1 {
        let mut next = Vec::with_capacity(pieces.len() / 2 + 1);
        let mut it = pieces.into_iter();
        while let Some(a) = it.next() {
            match it.next() {
                Some(b) => next.push(a.union(&b)),
                None => next.push(a),
            }
        }
        pieces = next;
    }
    pieces.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

pub(crate) fn buffer_polygonal(
    g: &MultiPolygon<f64>,
    r: f64,
    segments: usize,
) -> MultiPolygon<f64> {
    if r.is_nan() || r <= 0.0 || g.0.is_empty() {
        return g.clone();
    }
    let mut pieces = vec![g.clone()];
    for poly in &g.0 {
        sweep_path(poly.exterior(), r, segments, &mut pieces);
        for hole in poly.interiors() {
            sweep_path(hole, r, segments, &mut pieces);
        }
    }
    union_all(pieces)
}

pub(crate) fn buffer_linestring(
    line: &LineString<f64>,
    r: f64,
    segments: usize,
) -> MultiPolygon<f64> {
    if r.is_nan() || r <= 0.0 || line.0.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    let mut pieces = Vec::with_capacity(2 * line.0.len());
    sweep_path(line, r, segments, &mut pieces);
    union_all(pieces)
}
