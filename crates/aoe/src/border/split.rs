//! Split a region into the two sides of a polyline.
//!
//! Side 1 is the left of the line's direction of travel (2D cross product
//! of the direction with the offset is `≥ 0`), side 2 the right.
//!
//! The region is first cut by an oversized half-plane polygon built from the
//! border extended past both endpoints. Every resulting fragment is then
//! assigned a side by the cross product against the border segment nearest
//! to one of its interior points, which corrects fragments the half-plane
//! misplaces around strongly bent borders.

use geo::{Coord, Line, LineString, MultiPolygon, Point, Polygon};
use nalgebra::Vector2;

use crate::engine::GeometryEngine;

/// Which side of the border a fragment lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    First,
    Second,
}

#[inline]
fn vec2(c: Coord<f64>) -> Vector2<f64> {
    Vector2::new(c.x, c.y)
}

#[inline]
fn coord(v: Vector2<f64>) -> Coord<f64> {
    Coord { x: v.x, y: v.y }
}

#[inline]
fn left_normal(u: Vector2<f64>) -> Vector2<f64> {
    Vector2::new(-u.y, u.x)
}

fn segment_distance(p: Vector2<f64>, a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    let t = if len2 > 0.0 {
        ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p - (a + ab * t)).norm()
}

/// Side of `p` relative to the segment of `line` nearest to it.
///
/// `line` must have at least two distinct vertices.
pub(crate) fn side_of(line: &LineString<f64>, p: Point<f64>) -> Side {
    let p = vec2(p.0);
    let dist = |l: &Line<f64>| segment_distance(p, vec2(l.start), vec2(l.end));
    let nearest = line
        .lines()
        .filter(|l| l.dx() != 0.0 || l.dy() != 0.0)
        .min_by(|l, m| dist(l).total_cmp(&dist(m)));
    match nearest {
        Some(l) if vec2(l.end - l.start).perp(&(p - vec2(l.start))) < 0.0 => Side::Second,
        _ => Side::First,
    }
}

/// Polygon covering the left of `line` out to distance `reach`, with the
/// line extended by `reach` at both ends.
pub(crate) fn left_half_plane(line: &LineString<f64>, reach: f64) -> Option<Polygon<f64>> {
    let c = &line.0;
    let n = c.len();
    if n < 2 {
        return None;
    }
    let u0 = vec2(c[1] - c[0]).normalize();
    let un = vec2(c[n - 1] - c[n - 2]).normalize();
    let start = vec2(c[0]) - u0 * reach;
    let end = vec2(c[n - 1]) + un * reach;
    let mut ring = Vec::with_capacity(n + 5);
    ring.push(coord(start));
    ring.extend(c.iter().copied());
    ring.push(coord(end));
    ring.push(coord(end + left_normal(un) * reach));
    ring.push(coord(start + left_normal(u0) * reach));
    Some(Polygon::new(LineString::from(ring), vec![]))
}

/// `(side_1, side_2)` parts of `region`; they partition it.
pub(crate) fn split_by_line<E: GeometryEngine + ?Sized>(
    engine: &E,
    region: &MultiPolygon<f64>,
    line: &LineString<f64>,
) -> Result<(MultiPolygon<f64>, MultiPolygon<f64>), String> {
    let empty = || MultiPolygon::new(vec![]);
    let Some(bounds) = engine.bounding_rect(region) else {
        return Ok((empty(), empty()));
    };
    let span = bounds.width().hypot(bounds.height());
    let line_span: f64 = line.lines().map(|l| l.dx().hypot(l.dy())).sum();
    let reach = 4.0 * (span + line_span) + 1.0;
    let Some(half) = left_half_plane(line, reach) else {
        return Err("border needs at least two vertices".to_string());
    };
    let half = engine.make_valid(&MultiPolygon::new(vec![half]))?;

    let cut_left = engine.intersection(region, &half);
    let cut_right = engine.difference(region, &half);
    let (mut first, mut second) = (Vec::new(), Vec::new());
    for poly in cut_left.0.into_iter().chain(cut_right.0) {
        let piece = MultiPolygon::new(vec![poly]);
        let side = engine
            .interior_point(&piece)
            .map(|p| side_of(line, p))
            .unwrap_or(Side::First);
        let bucket = match side {
            Side::First => &mut first,
            Side::Second => &mut second,
        };
        bucket.extend(piece.0);
    }
    Ok((
        engine.make_valid(&MultiPolygon::new(first))?,
        engine.make_valid(&MultiPolygon::new(second))?,
    ))
}
