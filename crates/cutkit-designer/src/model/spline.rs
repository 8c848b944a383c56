use lyon::geom::{point, CubicBezierSegment, QuadraticBezierSegment};
use nalgebra::Matrix3;
use smallvec::SmallVec;

use super::{CamShape, ShapeHeader};
use crate::geometry::Point;
use crate::motion::Motion;

const SPLINE_SEGMENTS: usize = 24;

/// Quadratic (one control point) or cubic (two) Bézier curve. A control
/// point lying on its endpoint is dropped, lowering the degree; with no
/// control points left the curve is a straight line.
#[derive(Debug, Clone)]
pub struct DesignSpline {
    header: ShapeHeader,
    start: Point,
    end: Point,
    controls: SmallVec<[Point; 2]>,
}

impl DesignSpline {
    pub fn cubic(name: impl Into<String>, start: Point, c1: Point, c2: Point, end: Point) -> Self {
        Self::from_parts(ShapeHeader::new(name), start, end, &[c1, c2])
    }

    pub fn quadratic(name: impl Into<String>, start: Point, c: Point, end: Point) -> Self {
        Self::from_parts(ShapeHeader::new(name), start, end, &[c])
    }

    pub(crate) fn from_parts(header: ShapeHeader, start: Point, end: Point, controls: &[Point]) -> Self {
        let mut s = Self {
            header,
            start,
            end,
            controls: controls.iter().copied().collect(),
        };
        s.collapse_degenerate();
        s
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn controls(&self) -> &[Point] {
        &self.controls
    }

    /// 3 for cubic, 2 for quadratic, 1 for a straight line.
    pub fn degree(&self) -> usize {
        self.controls.len() + 1
    }

    fn collapse_degenerate(&mut self) {
        match self.controls.len() {
            2 => {
                let (c1, c2) = (self.controls[0], self.controls[1]);
                let c1_dead = c1.approx_eq(&self.start);
                let c2_dead = c2.approx_eq(&self.end);
                self.controls = match (c1_dead, c2_dead) {
                    (true, true) => SmallVec::new(),
                    (true, false) => SmallVec::from_slice(&[c2]),
                    (false, true) => SmallVec::from_slice(&[c1]),
                    (false, false) => return,
                };
                self.collapse_degenerate();
            }
            1 => {
                let c = self.controls[0];
                if c.approx_eq(&self.start) || c.approx_eq(&self.end) {
                    self.controls.clear();
                }
            }
            _ => {}
        }
    }

    fn changed(&mut self) {
        self.collapse_degenerate();
        self.header.touch();
    }

    pub fn set_start(&mut self, p: Point) {
        self.start = p;
        self.changed();
    }

    pub fn set_end(&mut self, p: Point) {
        self.end = p;
        self.changed();
    }

    /// Replace control point `index`. `false` if the index does not exist.
    pub fn set_control(&mut self, index: usize, p: Point) -> bool {
        match self.controls.get_mut(index) {
            Some(c) => {
                *c = p;
                self.changed();
                true
            }
            None => false,
        }
    }

    pub fn sample(&self, t: f64) -> Point {
        let from = point(self.start.x, self.start.y);
        let to = point(self.end.x, self.end.y);
        let p = match self.controls.as_slice() {
            [c1, c2] => CubicBezierSegment {
                from,
                ctrl1: point(c1.x, c1.y),
                ctrl2: point(c2.x, c2.y),
                to,
            }
            .sample(t),
            [c] => QuadraticBezierSegment {
                from,
                ctrl: point(c.x, c.y),
                to,
            }
            .sample(t),
            _ => from.lerp(to, t),
        };
        Point::new(p.x, p.y)
    }

    /// Motion drawing this curve from its start point.
    pub fn curve_motion(&self) -> Motion {
        match self.controls.as_slice() {
            [c1, c2] => Motion::spline(self.end, *c1 - self.start, Some(*c2 - self.end)),
            [c] => Motion::spline(self.end, *c - self.start, None),
            _ => Motion::feed(self.end),
        }
    }
}

impl CamShape for DesignSpline {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        if self.controls.is_empty() {
            return vec![self.start, self.end];
        }
        let mut pts: Vec<Point> = (0..SPLINE_SEGMENTS)
            .map(|i| self.sample(i as f64 / SPLINE_SEGMENTS as f64))
            .collect();
        pts.push(self.end);
        pts
    }

    fn motions(&self) -> Vec<Motion> {
        vec![Motion::rapid(self.start), self.curve_motion()]
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        self.start = self.start.transformed(m);
        self.end = self.end.transformed(m);
        for c in self.controls.iter_mut() {
            *c = c.transformed(m);
        }
        self.header.touch();
    }

    fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        self.controls.reverse();
        self.header.touch();
    }

    fn start_point(&self) -> Option<Point> {
        Some(self.start)
    }

    fn end_point(&self) -> Option<Point> {
        Some(self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_cubic_collapses() {
        let s = DesignSpline::cubic(
            "s",
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(s.degree(), 2);
        assert_eq!(s.controls(), &[Point::new(5.0, 5.0)]);
    }

    #[test]
    fn test_control_edit_collapses_to_line() {
        let mut s = DesignSpline::quadratic(
            "s",
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 0.0),
        );
        assert!(s.set_control(0, Point::new(10.0, 0.0)));
        assert_eq!(s.degree(), 1);
        assert_eq!(s.flat_points().len(), 2);
        assert!(!s.set_control(0, Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_sample_endpoints() {
        let s = DesignSpline::cubic(
            "s",
            Point::new(0.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert!(s.sample(0.0).approx_eq(&Point::new(0.0, 0.0)));
        assert!(s.sample(1.0).approx_eq(&Point::new(10.0, 0.0)));
        assert!(s.sample(0.5).approx_eq(&Point::new(5.0, 7.5)));
    }

    #[test]
    fn test_reverse_swaps_controls() {
        let mut s = DesignSpline::cubic(
            "s",
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.0),
            Point::new(3.0, 4.0),
            Point::new(5.0, 0.0),
        );
        s.reverse();
        assert_eq!(s.start(), Point::new(5.0, 0.0));
        assert_eq!(s.controls(), &[Point::new(3.0, 4.0), Point::new(1.0, 2.0)]);
    }
}
