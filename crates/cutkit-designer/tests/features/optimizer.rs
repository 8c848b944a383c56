use cutkit_designer::{
    travel_length, CamShape, DesignGroup, DesignPolyline, Point, Shape, TravelOptimizer,
};
use proptest::prelude::*;

fn segment(x: f64, y: f64, dx: f64, dy: f64) -> Shape {
    DesignPolyline::from_points("s", &[Point::new(x, y), Point::new(x + dx, y + dy)]).into()
}

proptest! {
    #[test]
    fn optimizer_never_worsens_travel(
        coords in prop::collection::vec((-100.0..100.0f64, -100.0..100.0f64, -5.0..5.0f64, -5.0..5.0f64), 1..12),
        start in prop::option::of((-100.0..100.0f64, -100.0..100.0f64)),
    ) {
        let shapes: Vec<Shape> = coords.iter().map(|(x, y, dx, dy)| segment(*x, *y, *dx, *dy)).collect();
        let start = start.map(|(x, y)| Point::new(x, y));
        let before = travel_length(&shapes, start);
        let order = TravelOptimizer::default().optimize(shapes, start);
        prop_assert!(order.travel <= before + 1e-9);
        prop_assert!((order.original_travel - before).abs() < 1e-9);
        prop_assert_eq!(order.shapes.len(), coords.len());
        prop_assert!((travel_length(&order.shapes, start) - order.travel).abs() < 1e-9);
    }
}

#[test]
fn test_adversarial_permutation_improves() {
    let shapes = vec![
        segment(0.0, 0.0, 1.0, 0.0),
        segment(50.0, 0.0, 1.0, 0.0),
        segment(2.0, 0.0, 1.0, 0.0),
        segment(52.0, 0.0, 1.0, 0.0),
    ];
    let order = TravelOptimizer::default().optimize(shapes, None);
    assert!(order.travel < order.original_travel);
    let starts: Vec<f64> = order
        .shapes
        .iter()
        .map(|s| s.start_point().unwrap().x)
        .collect();
    assert_eq!(starts, vec![0.0, 2.0, 50.0, 52.0]);
}

#[test]
fn test_group_optimization_recurses() {
    let mut inner = DesignGroup::new("inner");
    inner.add(segment(30.0, 0.0, 1.0, 0.0));
    inner.add(segment(20.0, 0.0, 1.0, 0.0));
    let mut root = DesignGroup::new("root");
    root.add(inner);
    root.add(segment(0.0, 0.0, 1.0, 0.0));

    let cursor = TravelOptimizer::new(true).optimize_group(&mut root, Some(Point::origin()));
    assert_eq!(root.children()[0].start_point(), Some(Point::new(0.0, 0.0)));
    let inner = root.children()[1].as_group().unwrap();
    assert_eq!(inner.children()[0].start_point(), Some(Point::new(20.0, 0.0)));
    assert_eq!(cursor, Some(Point::new(31.0, 0.0)));
}

#[test]
fn test_group_optimization_without_recursion_keeps_inner_order() {
    let mut inner = DesignGroup::new("inner");
    inner.add(segment(30.0, 0.0, 1.0, 0.0));
    inner.add(segment(20.0, 0.0, 1.0, 0.0));
    let mut root = DesignGroup::new("root");
    root.add(inner);

    TravelOptimizer::new(false).optimize_group(&mut root, None);
    let inner = root.children()[0].as_group().unwrap();
    assert_eq!(inner.children()[0].start_point(), Some(Point::new(30.0, 0.0)));
}
