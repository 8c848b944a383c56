use cutkit_designer::area::ring_contains;
use cutkit_designer::{CamShape, DesignArc, DesignPolyline, PocketGenerator, Point, Shape};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Shape {
    DesignPolyline::from_points(
        "rect",
        &[
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
            Point::new(x0, y0),
        ],
    )
    .into()
}

#[test]
fn test_square_pocket_passes_move_inward() {
    let outer = rect(0.0, 0.0, 20.0, 20.0);
    let result = PocketGenerator::new(1.0).generate(std::slice::from_ref(&outer));
    assert!(result.passes.len() >= 4);
    assert!(result.iterations >= result.passes.len());

    let boundary = outer.flat_points().to_vec();
    let mut last_width = f64::INFINITY;
    for pass in &result.passes {
        assert!(pass.is_closed());
        assert!(pass.flat_points().iter().all(|p| ring_contains(&boundary, p)));
        let w = pass.bounds().width();
        assert!(w < last_width);
        last_width = w;
    }
    // first pass runs one tool radius inside the boundary
    let first = result.passes[0].bounds();
    assert!((first.width() - 18.0).abs() < 1e-3);
}

#[test]
fn test_island_is_never_cut() {
    let outer = rect(0.0, 0.0, 30.0, 30.0);
    let island = rect(12.0, 12.0, 18.0, 18.0);
    let island_ring = island.flat_points().to_vec();
    let result = PocketGenerator::new(1.0).generate(&[outer, island]);
    assert!(!result.is_empty());
    for pass in &result.passes {
        assert!(!pass.flat_points().iter().all(|p| ring_contains(&island_ring, p)));
    }
    // some pass hugs the island from outside
    assert!(result.passes.iter().any(|p| {
        let b = p.bounds();
        (b.width() - 8.0).abs() < 0.5 && (b.center().x - 15.0).abs() < 1e-3
    }));
}

#[test]
fn test_generation_terminates_on_circle() {
    let circle: Shape = DesignArc::circle("c", Point::new(0.0, 0.0), 10.0).into();
    let result = PocketGenerator::new(1.5).with_max_iterations(100).generate(&[circle]);
    assert!(result.iterations < 100);
    assert!(!result.is_empty());
}

#[test]
fn test_first_closed_shape_is_outer() {
    let small = rect(5.0, 5.0, 10.0, 10.0);
    let big = rect(0.0, 0.0, 40.0, 40.0);
    // the small square comes first, so it is the outer boundary and the big
    // one is an island that swallows every loop inside it
    let result = PocketGenerator::new(1.0).generate(&[small.clone(), big.clone()]);
    assert!(result.is_empty());
    assert_eq!(result.iterations, 1);

    let result = PocketGenerator::new(1.0).generate(&[big, small]);
    assert!(!result.is_empty());
}
