use cutkit_designer::geometry::segment_distance;
use cutkit_designer::{CamShape, DesignArc, DesignPolyline, Point};

fn square(size: f64) -> DesignPolyline {
    DesignPolyline::from_points(
        "square",
        &[
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
            Point::new(0.0, 0.0),
        ],
    )
}

fn distance_to_boundary(p: &Point, rings: &[Vec<Point>]) -> f64 {
    rings
        .iter()
        .flat_map(|r| r.windows(2).map(|w| segment_distance(p, &w[0], &w[1])))
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn test_offset_bounds_strictly_contain_shape() {
    let sq = square(10.0);
    let area = sq.offset_area(1.5).unwrap();
    assert!(area.bounds().strictly_contains(&sq.bounds()));
}

#[test]
fn test_offset_boundary_is_at_offset_distance() {
    let sq = square(10.0);
    let d = 1.0;
    let area = sq.offset_area(d).unwrap();
    let rings: Vec<Vec<Point>> = area.loops().into_iter().map(|l| l.points).collect();
    assert!(!rings.is_empty());
    for v in sq.flat_points() {
        let dist = distance_to_boundary(v, &rings);
        assert!((dist - d).abs() < 1e-3, "vertex {:?} at {}", v, dist);
    }
}

#[test]
fn test_closed_offset_has_hole() {
    let area = square(10.0).offset_area(1.0).unwrap();
    let loops = area.loops();
    assert_eq!(loops.iter().filter(|l| !l.is_hole).count(), 1);
    assert_eq!(loops.iter().filter(|l| l.is_hole).count(), 1);
    assert!(!area.contains_point(&Point::new(5.0, 5.0)));
    assert!(area.contains_point(&Point::new(0.5, 5.0)));
}

#[test]
fn test_short_shape_has_no_offset() {
    let single = DesignPolyline::from_points("p", &[Point::new(1.0, 1.0)]);
    assert!(single.offset_area(1.0).is_none());
    assert!(single.length().is_nan());
}

#[test]
fn test_arc_offset_is_a_thick_band() {
    let arc = DesignArc::new(
        "a",
        Point::new(10.0, 0.0),
        Point::new(0.0, 10.0),
        Point::new(0.0, 0.0),
        false,
    );
    let area = arc.offset_area(1.0).unwrap();
    assert!(area.contains_point(&Point::new(7.07, 7.07)));
    assert!(!area.contains_point(&Point::new(0.0, 0.0)));
    assert!(!area.contains_point(&Point::new(-7.07, -7.07)));
}
