//! Mask Clipper: intersect an expanded polygon with an optional hard boundary.

use geo::MultiPolygon;

use crate::engine::GeometryEngine;

/// `aoe_raw ∩ mask`, re-validated. Without a mask this is the identity.
///
/// An empty intersection is a valid result (every point of that support will
/// be pruned). `Err` carries the repair failure reason.
pub fn clip<E: GeometryEngine + ?Sized>(
    engine: &E,
    aoe_raw: &MultiPolygon<f64>,
    mask: Option<&MultiPolygon<f64>>,
) -> Result<MultiPolygon<f64>, String> {
    match mask {
        None => Ok(aoe_raw.clone()),
        Some(m) => engine.make_valid(&engine.intersection(aoe_raw, m)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PlanarEngine;
    use geo::{Rect, coord};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()])
    }

    #[test]
    fn no_mask_is_identity() {
        let eng = PlanarEngine::default();
        let g = rect(0.0, 0.0, 2.0, 3.0);
        assert_eq!(clip(&eng, &g, None).unwrap(), g);
    }

    #[test]
    fn mask_never_increases_area() {
        let eng = PlanarEngine::default();
        let g = rect(0.0, 0.0, 10.0, 10.0);
        let m = rect(5.0, -100.0, 100.0, 100.0);
        let out = clip(&eng, &g, Some(&m)).unwrap();
        assert!((eng.area(&out) - 50.0).abs() < 1e-9);
        assert!(eng.area(&out) <= eng.area(&g));
    }

    #[test]
    fn disjoint_mask_gives_empty_region() {
        let eng = PlanarEngine::default();
        let g = rect(0.0, 0.0, 1.0, 1.0);
        let m = rect(5.0, 5.0, 6.0, 6.0);
        let out = clip(&eng, &g, Some(&m)).unwrap();
        assert!(out.0.is_empty());
    }
}
