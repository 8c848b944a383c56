use cutkit_designer::{
    CamShape, DesignArc, DesignMixedPath, DesignPolyline, DesignSpline, PathElement, Point, Shape,
};

fn polyline(points: &[(f64, f64)]) -> DesignPolyline {
    let pts: Vec<Point> = points.iter().map(|(x, y)| Point::new(*x, *y)).collect();
    DesignPolyline::from_points("p", &pts)
}

#[test]
fn test_first_point_is_rapid() {
    let p = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    let motions = p.motions();
    assert!(motions[0].is_rapid());
    assert!(motions[1..].iter().all(|m| !m.is_rapid()));
}

#[test]
fn test_distance_is_minimum_over_segments() {
    let p = polyline(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    assert!((p.distance_to(&Point::new(5.0, 2.0)) - 2.0).abs() < 1e-12);
    assert!((p.distance_to(&Point::new(12.0, 5.0)) - 2.0).abs() < 1e-12);
    assert_eq!(p.distance_to(&Point::new(f64::NAN, 0.0)), f64::INFINITY);
}

#[test]
fn test_closed_is_derived() {
    let mut p = polyline(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    assert!(!p.is_closed());
    assert!(p.close());
    assert!(p.is_closed());
}

#[test]
fn test_concat_end_to_start() {
    let mut a: Shape = polyline(&[(0.0, 0.0), (1.0, 0.0)]).into();
    let b: Shape = polyline(&[(1.0, 0.0), (2.0, 0.0)]).into();
    assert!(a.concat(&b, 0.01));
    assert_eq!(a.point_count(), 3);
    assert_eq!(a.end_point(), Some(Point::new(2.0, 0.0)));
}

#[test]
fn test_concat_prefers_end_matches_first() {
    // b touches a at both ends; the end-to-start case wins
    let mut a: Shape = polyline(&[(0.0, 0.0), (1.0, 0.0)]).into();
    let b: Shape = polyline(&[(1.0, 0.0), (0.0, 0.0)]).into();
    assert!(a.concat(&b, 0.01));
    assert_eq!(a.point_count(), 3);
    assert_eq!(a.end_point(), Some(Point::new(0.0, 0.0)));
}

#[test]
fn test_concat_rejects_far_and_incompatible() {
    let mut a: Shape = polyline(&[(0.0, 0.0), (1.0, 0.0)]).into();
    let far: Shape = polyline(&[(5.0, 5.0), (6.0, 5.0)]).into();
    assert!(!a.concat(&far, 0.01));
    let arc: Shape =
        DesignArc::new("a", Point::new(1.0, 0.0), Point::new(0.0, 1.0), Point::origin(), false).into();
    assert!(!a.concat(&arc, 0.01));
}

#[test]
fn test_join_falls_back_to_mixed_path() {
    let a: Shape = polyline(&[(-1.0, 0.0), (1.0, 0.0)]).into();
    let arc: Shape =
        DesignArc::new("a", Point::new(1.0, 0.0), Point::new(0.0, 1.0), Point::origin(), false).into();
    let joined = Shape::join(&a, &arc, 0.01).unwrap();
    let Shape::MixedPath(m) = &joined else {
        panic!("expected a mixed path");
    };
    assert!(m.elements().iter().any(|e| matches!(e, PathElement::Arc(_))));
    assert_eq!(joined.end_point(), Some(Point::new(0.0, 1.0)));
}

#[test]
fn test_mixed_path_bridges_gaps() {
    let mut m = DesignMixedPath::new("m");
    m.push_point(Point::new(0.0, 0.0));
    m.push_spline(DesignSpline::quadratic(
        "s",
        Point::new(5.0, 5.0),
        Point::new(6.0, 8.0),
        Point::new(8.0, 5.0),
    ));
    // the spline start is pulled onto the cursor
    let Some(PathElement::Spline(s)) = m.elements().last() else {
        panic!("expected spline");
    };
    assert_eq!(s.start(), Point::new(0.0, 0.0));
}

#[test]
fn test_simplify_skips_comments() {
    let mut p = polyline(&[(0.0, 0.0), (5.0, 0.001), (10.0, 0.0)]);
    p.add_comment("marker");
    let removed = p.simplify(0.01, 90.0);
    assert_eq!(removed, 1);
    assert_eq!(p.point_count(), 2);
    assert!(p.motion_list().iter().any(|m| m.is_comment()));
}

#[test]
fn test_spline_degenerate_control_collapses() {
    let mut s = DesignSpline::cubic(
        "s",
        Point::new(0.0, 0.0),
        Point::new(1.0, 2.0),
        Point::new(3.0, 2.0),
        Point::new(4.0, 0.0),
    );
    assert_eq!(s.degree(), 3);
    assert!(s.set_control(1, Point::new(4.0, 0.0)));
    assert_eq!(s.degree(), 2);
}

#[test]
fn test_arc_full_circle_tie() {
    let c = DesignArc::circle("c", Point::origin(), 2.0);
    assert!(c.is_full_circle());
    assert!((c.length() - 4.0 * std::f64::consts::PI).abs() < 1e-9);
    assert!(c.flat_points().len() >= 13);
}

#[test]
fn test_mirror_flips_arc_direction() {
    let mut a = DesignArc::new(
        "a",
        Point::new(1.0, 0.0),
        Point::new(0.0, 1.0),
        Point::origin(),
        false,
    );
    a.scale(-1.0, 1.0, Point::origin());
    assert!(a.is_clockwise());
    assert_eq!(a.start(), Point::new(-1.0, 0.0));
}

#[test]
fn test_rotate_moves_points() {
    let mut p = polyline(&[(1.0, 0.0), (2.0, 0.0)]);
    p.rotate(std::f64::consts::FRAC_PI_2, Point::origin());
    let start = p.start_point().unwrap();
    assert!(start.approx_eq(&Point::new(0.0, 1.0)));
}
