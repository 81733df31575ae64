use super::*;
use crate::engine::PlanarEngine;
use geo::{coord, polygon, MultiPolygon, Point, Rect};
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::classify::{count_captured, Observation};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon(),
    ])
}

fn halo_ratio(eng: &PlanarEngine, original: &MultiPolygon<f64>, exp: &Expansion) -> f64 {
    let a = eng.area(original);
    (eng.area(&exp.aoe_final) - a) / a
}

#[test]
fn equal_area_default_for_both_methods() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    for method in [Method::Buffer, Method::ScaleAffine] {
        let exp = expand(&eng, &sq, Target::default(), method, None, SolverCfg::default()).unwrap();
        let ratio = halo_ratio(&eng, &sq, &exp);
        assert!((ratio - 1.0).abs() < 0.01, "{method:?}: ratio {ratio}");
        assert!(exp.warnings.is_empty());
    }
}

#[test]
fn unit_scale_triples_halo() {
    let eng = PlanarEngine::default();
    let sq = rect(40.0, 40.0, 60.0, 60.0);
    for method in [Method::Buffer, Method::ScaleAffine] {
        let exp = expand(&eng, &sq, Target::Scale(1.0), method, None, SolverCfg::default()).unwrap();
        let ratio = halo_ratio(&eng, &sq, &exp);
        assert!((ratio - 3.0).abs() < 0.03, "{method:?}: ratio {ratio}");
    }
}

#[test]
fn buffer_contains_every_original_vertex() {
    let eng = PlanarEngine::default();
    // Concave "L" shape.
    let l = MultiPolygon::new(vec![polygon![
        (x: 0.0, y: 0.0),
        (x: 10.0, y: 0.0),
        (x: 10.0, y: 2.0),
        (x: 2.0, y: 2.0),
        (x: 2.0, y: 10.0),
        (x: 0.0, y: 10.0),
    ]]);
    let exp = expand(&eng, &l, Target::Scale(0.3), Method::Buffer, None, SolverCfg::default()).unwrap();
    assert!(eng.area(&exp.aoe_final) >= eng.area(&l));
    for c in l.0[0].exterior().coords() {
        assert!(eng.contains_point(&exp.aoe_final, &Point::from(*c)));
    }
}

#[test]
fn affine_scaling_keeps_exact_area_multiplier_on_concave_shape() {
    let eng = PlanarEngine::default();
    let l = MultiPolygon::new(vec![polygon![
        (x: 0.0, y: 0.0),
        (x: 10.0, y: 0.0),
        (x: 10.0, y: 2.0),
        (x: 2.0, y: 2.0),
        (x: 2.0, y: 10.0),
        (x: 0.0, y: 10.0),
    ]]);
    let exp = expand(&eng, &l, Target::Scale(0.5), Method::ScaleAffine, None, SolverCfg::default())
        .unwrap();
    let k = eng.area(&exp.aoe_raw) / eng.area(&l);
    assert!((k - 2.25).abs() < 1e-9);
}

#[test]
fn explicit_reference_moves_the_fixed_point() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    let exp = expand(
        &eng,
        &sq,
        Target::Scale(1.0),
        Method::ScaleAffine,
        Some(Point::new(0.0, 0.0)),
        SolverCfg::default(),
    )
    .unwrap();
    let bb = eng.bounding_rect(&exp.aoe_raw).unwrap();
    assert!((bb.min().x).abs() < 1e-9 && (bb.max().x - 20.0).abs() < 1e-9);
}

#[test]
fn reference_with_buffer_is_rejected() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    let err = expand(
        &eng,
        &sq,
        Target::default(),
        Method::Buffer,
        Some(Point::new(1.0, 1.0)),
        SolverCfg::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AoeError::InvalidArgument { name: "reference", .. }));
}

#[test]
fn target_options_validation() {
    assert!(Target::from_options(Some(1.0), Some(1.0)).is_err());
    assert!(Target::from_options(Some(0.0), None).is_err());
    assert!(Target::from_options(None, Some(-2.0)).is_err());
    assert_eq!(Target::from_options(None, None).unwrap(), Target::Scale(EQUAL_AREA_SCALE));
    assert_eq!(Target::from_options(None, Some(0.5)).unwrap(), Target::Area(0.5));
}

#[test]
fn area_mode_without_mask_matches_scale_closed_form() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    let exp = expand(&eng, &sq, Target::Area(1.0), Method::ScaleAffine, None, SolverCfg::default())
        .unwrap();
    assert!((exp.scale - EQUAL_AREA_SCALE).abs() < 1e-9);
}

#[test]
fn area_mode_hits_masked_halo_target() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    // Mask cuts everything right of x = 12.
    let mask = rect(-1000.0, -1000.0, 12.0, 1000.0);
    let cfg = SolverCfg::default();
    for method in [Method::ScaleAffine, Method::Buffer] {
        let ex = Expander::new(&eng, cfg, method, "sq", &sq, Some(&mask), None).unwrap();
        let exp = ex.for_target(Target::Area(1.0)).unwrap();
        let halo = eng.area(&exp.aoe_final) - 100.0;
        assert!((halo - 100.0).abs() / 100.0 < 5e-3, "{method:?}: halo {halo}");
        // The mask forces more expansion than the unmasked closed form.
        assert!(exp.scale > EQUAL_AREA_SCALE);
        assert!(eng.area(&exp.aoe_final) <= eng.area(&exp.aoe_raw) + 1e-9);
    }
}

#[test]
fn unreachable_masked_target_warns_but_succeeds() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    // Mask equal to the support: the halo can never grow.
    let ex = Expander::new(&eng, SolverCfg::default(), Method::ScaleAffine, "sq", &sq, Some(&sq), None)
        .unwrap();
    let exp = ex.for_target(Target::Area(1.0)).unwrap();
    assert!(exp
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::NonConvergence { stage, .. } if stage == "masked_area_secant")));
}

#[test]
fn zero_area_support_is_invalid() {
    let eng = PlanarEngine::default();
    let flat = rect(0.0, 0.0, 10.0, 0.0);
    assert!(expand(&eng, &flat, Target::default(), Method::Buffer, None, SolverCfg::default()).is_err());
}

#[test]
fn characteristic_radius_of_square() {
    let eng = PlanarEngine::default();
    let sq = rect(0.0, 0.0, 10.0, 10.0);
    let ex = Expander::new(&eng, SolverCfg::default(), Method::Buffer, "sq", &sq, None, None).unwrap();
    assert!((ex.characteristic_radius() - (100.0 / std::f64::consts::PI).sqrt()).abs() < 1e-12);
    assert!((ex.original_area() - 100.0).abs() < 1e-12);
}

fn point_cloud(seed: u64, n: usize) -> Vec<Observation> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let p = Point::new(rng.gen_range(-15.0..25.0), rng.gen_range(-15.0..25.0));
            Observation::new(i.to_string(), p)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn aoe_area_and_count_are_monotone_in_scale(
        s in 0.05f64..1.5,
        ds in 0.05f64..1.0,
        seed in any::<u64>(),
    ) {
        let eng = PlanarEngine::default();
        let poly = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 8.0, y: 1.0),
            (x: 9.0, y: 7.0),
            (x: 3.0, y: 9.0),
        ]]);
        let points = point_cloud(seed, 200);
        for method in [Method::Buffer, Method::ScaleAffine] {
            let lo = expand(&eng, &poly, Target::Scale(s), method, None, SolverCfg::default()).unwrap();
            let hi = expand(&eng, &poly, Target::Scale(s + ds), method, None, SolverCfg::default()).unwrap();
            prop_assert!(eng.area(&hi.aoe_final) >= eng.area(&lo.aoe_final));
            prop_assert!(eng.area(&lo.aoe_final) >= eng.area(&poly));
            let n_lo = count_captured(&eng, &points, &poly, &lo.aoe_final);
            let n_hi = count_captured(&eng, &points, &poly, &hi.aoe_final);
            prop_assert!(n_hi >= n_lo, "{method:?}: {n_hi} < {n_lo}");
        }
    }
}
