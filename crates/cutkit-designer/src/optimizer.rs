//! Travel-order optimization.
//!
//! Greedy nearest neighbour over shape start points: from the cursor, take
//! the remaining shape whose start is closest (first in list order on a
//! tie), then continue from that shape's end point.

use crate::geometry::Point;
use crate::model::{CamShape, DesignGroup, Shape};

/// Reordered shapes plus the travel before and after.
#[derive(Debug, Clone)]
pub struct OptimizedOrder {
    pub shapes: Vec<Shape>,
    pub travel: f64,
    pub original_travel: f64,
}

impl OptimizedOrder {
    pub fn saved(&self) -> f64 {
        self.original_travel - self.travel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TravelOptimizer {
    pub recurse_groups: bool,
}

impl Default for TravelOptimizer {
    fn default() -> Self {
        Self {
            recurse_groups: true,
        }
    }
}

/// Non-cutting distance walked when visiting `shapes` in order.
///
/// Starts at `start`, or at the first shape's start point when none is
/// given. Shapes without geometry add nothing.
pub fn travel_length(shapes: &[Shape], start: Option<Point>) -> f64 {
    let mut cursor = start;
    let mut total = 0.0;
    for s in shapes {
        let (Some(a), Some(b)) = (s.start_point(), s.end_point()) else {
            continue;
        };
        if let Some(c) = cursor {
            total += c.distance_to(&a);
        }
        cursor = Some(b);
    }
    total
}

impl TravelOptimizer {
    pub fn new(recurse_groups: bool) -> Self {
        Self { recurse_groups }
    }

    /// Reorder `shapes`. The input order is kept when the greedy tour is
    /// not shorter.
    pub fn optimize(&self, shapes: Vec<Shape>, start: Option<Point>) -> OptimizedOrder {
        let original_travel = travel_length(&shapes, start);

        let (mut remaining, empty): (Vec<Shape>, Vec<Shape>) =
            shapes.iter().cloned().partition(|s| s.start_point().is_some());
        let mut cursor = start.or_else(|| remaining.first().and_then(|s| s.start_point()));
        let mut ordered = Vec::with_capacity(shapes.len());

        while !remaining.is_empty() {
            let pick = match cursor {
                Some(c) => nearest_start(&remaining, &c),
                None => 0,
            };
            let shape = remaining.remove(pick);
            cursor = shape.end_point().or(cursor);
            ordered.push(shape);
        }
        ordered.extend(empty);

        let travel = travel_length(&ordered, start);
        if travel > original_travel {
            tracing::debug!(
                "greedy order longer than input ({:.3} > {:.3}), keeping input",
                travel,
                original_travel
            );
            return OptimizedOrder {
                shapes,
                travel: original_travel,
                original_travel,
            };
        }
        OptimizedOrder {
            shapes: ordered,
            travel,
            original_travel,
        }
    }

    /// Reorder the children of `group` in place, descending into child
    /// groups when configured. Returns the cursor after the group.
    pub fn optimize_group(&self, group: &mut DesignGroup, start: Option<Point>) -> Option<Point> {
        let order = self.optimize(group.children().to_vec(), start);
        tracing::debug!(
            "group '{}' travel {:.3} -> {:.3}",
            group.header().name(),
            order.original_travel,
            order.travel
        );
        let mut children = order.shapes;
        let mut cursor = start;
        for child in children.iter_mut() {
            if self.recurse_groups {
                if let Shape::Group(g) = child {
                    cursor = self.optimize_group(g, cursor).or(cursor);
                    continue;
                }
            }
            cursor = child.end_point().or(cursor);
        }
        group.set_children(children);
        cursor
    }
}

fn nearest_start(shapes: &[Shape], cursor: &Point) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, s) in shapes.iter().enumerate() {
        let Some(p) = s.start_point() else { continue };
        let d = cursor.distance_to(&p);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DesignPolyline;

    fn seg(x: f64) -> Shape {
        DesignPolyline::from_points("s", &[Point::new(x, 0.0), Point::new(x + 1.0, 0.0)]).into()
    }

    #[test]
    fn nearest_start_is_taken_first() {
        let a = seg(2.0);
        let b = seg(-3.0);
        let (ida, idb) = (a.id(), b.id());
        let order = TravelOptimizer::default().optimize(vec![b, a], Some(Point::new(0.0, 0.0)));
        assert_eq!(order.shapes[0].id(), ida);
        assert_eq!(order.shapes[1].id(), idb);
    }

    #[test]
    fn ties_go_to_the_first_shape() {
        // both starts are 2 units from the cursor
        let a: Shape =
            DesignPolyline::from_points("a", &[Point::new(-2.0, 0.0), Point::new(-3.0, 0.0)]).into();
        let b = seg(2.0);
        let ida = a.id();
        let order = TravelOptimizer::default().optimize(vec![a, b], Some(Point::origin()));
        assert_eq!(order.shapes[0].id(), ida);
    }

    #[test]
    fn travel_of_empty_list_is_zero() {
        assert_eq!(travel_length(&[], None), 0.0);
    }

    #[test]
    fn adversarial_order_is_improved() {
        let shapes = vec![seg(20.0), seg(0.0), seg(10.0)];
        let order = TravelOptimizer::default().optimize(shapes, None);
        assert!(order.travel < order.original_travel);
        assert!(order.saved() > 0.0);
    }
}
