use super::*;
use crate::classify::AoeClass;
use crate::engine::PlanarEngine;
use geo::{coord, Rect};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon(),
    ])
}

fn obs(id: &str, x: f64, y: f64) -> Observation {
    Observation::new(id, Point::new(x, y))
}

#[test]
fn single_square_core_halo_pruned() {
    let eng = PlanarEngine::default();
    let points = vec![
        obs("p1", 5.0, 5.0),
        obs("p2", 2.0, 2.0),
        obs("p3", 12.0, 5.0),
        obs("p4", 100.0, 100.0),
    ];
    let supports = vec![Support::new("sq", rect(0.0, 0.0, 10.0, 10.0))];
    let res = classify(&eng, &points, &supports, &ClassifyParams::default()).unwrap();
    assert_eq!(res.rows.len(), 3);
    let classes: Vec<(&str, AoeClass)> = res
        .rows
        .iter()
        .map(|r| (r.point_id.as_str(), r.class))
        .collect();
    assert_eq!(
        classes,
        vec![("p1", AoeClass::Core), ("p2", AoeClass::Core), ("p3", AoeClass::Halo)]
    );
    assert_eq!(res.support_count, 1);
    assert_eq!(res.parameter, Parameter::Scale { scale: crate::expand::EQUAL_AREA_SCALE });
    assert!(res.warnings.is_empty());
}

#[test]
fn overlapping_supports_give_one_row_each() {
    let eng = PlanarEngine::default();
    let points = vec![obs("shared", 9.0, 5.0)];
    let supports = vec![
        Support::new("A", rect(0.0, 0.0, 10.0, 10.0)),
        Support::new("B", rect(8.0, 0.0, 18.0, 10.0)),
    ];
    let res = classify(&eng, &points, &supports, &ClassifyParams::default()).unwrap();
    assert_eq!(res.rows.len(), 2);
    assert_eq!(res.rows[0].support_id, "A");
    assert_eq!(res.rows[1].support_id, "B");
    assert!(res.rows.iter().all(|r| r.point_index == 0));
}

#[test]
fn row_order_follows_support_order() {
    let eng = PlanarEngine::default();
    let points = vec![obs("a", 1.0, 1.0), obs("b", 51.0, 51.0)];
    let supports: Vec<Support> = (0..6)
        .rev()
        .map(|k| {
            let o = 10.0 * k as f64;
            Support::new(format!("s{k}"), rect(o, o, o + 2.0, o + 2.0))
        })
        .collect();
    let res = classify(&eng, &points, &supports, &ClassifyParams::default()).unwrap();
    let ids: Vec<String> = res
        .geometry
        .as_ref()
        .unwrap()
        .iter()
        .map(|g| g.support_id.clone())
        .collect();
    assert_eq!(ids, vec!["s5", "s4", "s3", "s2", "s1", "s0"]);
    let row_ids: Vec<&str> = res.rows.iter().map(|r| r.support_id.as_str()).collect();
    assert_eq!(row_ids, vec!["s5", "s0"]);
}

#[test]
fn mask_prunes_halo_outside() {
    let eng = PlanarEngine::default();
    let points = vec![obs("east", 70.0, 50.0), obs("west", 32.0, 50.0)];
    let supports = vec![Support::new("sq", rect(40.0, 40.0, 60.0, 60.0))];
    let unmasked = ClassifyParams {
        target: Target::Scale(1.0),
        ..ClassifyParams::default()
    };
    let res = classify(&eng, &points, &supports, &unmasked).unwrap();
    assert!(res.rows.iter().any(|r| r.point_id == "east" && r.class == AoeClass::Halo));

    let masked = ClassifyParams {
        mask: Some(rect(-1000.0, -1000.0, 55.0, 1000.0)),
        ..unmasked
    };
    let res = classify(&eng, &points, &supports, &masked).unwrap();
    assert!(res.rows.iter().all(|r| r.point_id != "east"));
    assert!(res.rows.iter().any(|r| r.point_id == "west" && r.class == AoeClass::Halo));
    let g = res.geometry.as_ref().unwrap().get("sq").unwrap();
    assert!(g.masked);
    assert!(eng.area(&g.aoe_final) <= eng.area(&g.aoe_raw));
}

#[test]
fn all_pruned_is_empty_not_error() {
    let eng = PlanarEngine::default();
    let points = vec![obs("far", 1e6, 1e6)];
    let supports = vec![Support::new("sq", rect(0.0, 0.0, 1.0, 1.0))];
    let res = classify(&eng, &points, &supports, &ClassifyParams::default()).unwrap();
    assert!(res.is_empty());
    assert_eq!(res.support_count, 1);
    assert_eq!(res.geometry.as_ref().unwrap().len(), 1);
}

#[test]
fn reference_rules() {
    let eng = PlanarEngine::default();
    let points = vec![obs("a", 1.0, 1.0)];
    let one = vec![Support::new("A", rect(0.0, 0.0, 10.0, 10.0))];
    let two = vec![
        Support::new("A", rect(0.0, 0.0, 10.0, 10.0)),
        Support::new("B", rect(20.0, 0.0, 30.0, 10.0)),
    ];
    let with_ref = ClassifyParams {
        reference: Some(Point::new(0.0, 0.0)),
        method: Method::ScaleAffine,
        ..ClassifyParams::default()
    };
    assert!(classify(&eng, &points, &one, &with_ref).is_ok());
    assert!(matches!(
        classify(&eng, &points, &two, &with_ref),
        Err(AoeError::InvalidArgument { name: "reference", .. })
    ));
    let buffer_ref = ClassifyParams {
        method: Method::Buffer,
        ..with_ref
    };
    assert!(classify(&eng, &points, &one, &buffer_ref).is_err());

    let per_support = vec![Support::new("A", rect(0.0, 0.0, 10.0, 10.0)).with_reference(Point::new(0.0, 0.0))];
    assert!(classify(&eng, &points, &per_support, &ClassifyParams::default()).is_err());
}

#[test]
fn invalid_target_fails_before_work() {
    let eng = PlanarEngine::default();
    let supports = vec![Support::new("A", rect(0.0, 0.0, 10.0, 10.0))];
    let params = ClassifyParams {
        target: Target::Scale(-1.0),
        ..ClassifyParams::default()
    };
    assert!(classify(&eng, &[], &supports, &params).is_err());
    let nan_point = vec![obs("nan", f64::NAN, 0.0)];
    assert!(classify(&eng, &nan_point, &supports, &ClassifyParams::default()).is_err());
}

#[test]
fn area_target_is_recorded() {
    let eng = PlanarEngine::default();
    let supports = vec![Support::new("A", rect(0.0, 0.0, 10.0, 10.0))];
    let params = ClassifyParams {
        target: Target::Area(2.0),
        method: Method::ScaleAffine,
        ..ClassifyParams::default()
    };
    let res = classify(&eng, &[obs("a", 1.0, 1.0)], &supports, &params).unwrap();
    assert_eq!(res.parameter, Parameter::Area { area: 2.0 });
    let g = res.geometry.as_ref().unwrap().get("A").unwrap();
    assert!((eng.area(&g.aoe_final) - 300.0).abs() < 0.1);
    // (1+s)^2 = 3 for a halo twice the support area.
    assert!((g.scale - (3f64.sqrt() - 1.0)).abs() < 1e-3, "{}", g.scale);
    let stats = crate::result::area_statistics(&eng, &res).unwrap();
    assert_eq!(stats[0].scale_used, g.scale);
}

#[test]
fn scale_target_is_kept_per_support() {
    let eng = PlanarEngine::default();
    let supports = vec![
        Support::new("A", rect(0.0, 0.0, 10.0, 10.0)),
        Support::new("B", rect(50.0, 0.0, 60.0, 10.0)),
    ];
    let params = ClassifyParams {
        target: Target::Scale(0.25),
        ..ClassifyParams::default()
    };
    let res = classify(&eng, &[], &supports, &params).unwrap();
    assert!(res.geometry.as_ref().unwrap().iter().all(|g| g.scale == 0.25));
}

#[test]
fn unusable_fragment_ratio_is_rejected() {
    let eng = PlanarEngine::default();
    let twins = MultiPolygon::new(
        rect(0.0, 0.0, 10.0, 10.0)
            .0
            .into_iter()
            .chain(rect(20.0, 0.0, 30.0, 10.0).0)
            .collect(),
    );
    let supports = vec![Support::new("twins", twins)];
    let points = vec![obs("east", 25.0, 5.0)];
    for ratio in [f64::NAN, 0.0, -1.0] {
        let params = ClassifyParams {
            fragments: FragmentPolicy::KeepDominant { ratio },
            ..ClassifyParams::default()
        };
        assert!(matches!(
            classify(&eng, &points, &supports, &params),
            Err(AoeError::InvalidArgument { name: "fragments", .. })
        ));
    }
    let keep_all = classify(&eng, &points, &supports, &ClassifyParams::default()).unwrap();
    assert_eq!(keep_all.rows.len(), 1);
    assert_eq!(keep_all.rows[0].class, AoeClass::Core);
}
