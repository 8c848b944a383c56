use nalgebra::Matrix3;

use super::{CamShape, ShapeHeader};
use crate::area::Area;
use crate::geometry::{is_mirroring, Bounds, Point};
use crate::motion::Motion;
use cutkit_core::constants::{FULL_CIRCLE_TOLERANCE_DEG, MIN_ARC_SEGMENTS};

/// Segments used per full turn when flattening.
const SEGMENTS_PER_TURN: f64 = 12.0;

/// Circular arc from `start` to `end` around `center`.
#[derive(Debug, Clone)]
pub struct DesignArc {
    header: ShapeHeader,
    start: Point,
    end: Point,
    center: Point,
    clockwise: bool,
}

impl DesignArc {
    pub fn new(
        name: impl Into<String>,
        start: Point,
        end: Point,
        center: Point,
        clockwise: bool,
    ) -> Self {
        Self::from_parts(ShapeHeader::new(name), start, end, center, clockwise)
    }

    pub(crate) fn from_parts(
        header: ShapeHeader,
        start: Point,
        end: Point,
        center: Point,
        clockwise: bool,
    ) -> Self {
        Self {
            header,
            start,
            end,
            center,
            clockwise,
        }
    }

    /// Full circle starting and ending at angle 0.
    pub fn circle(name: impl Into<String>, center: Point, radius: f64) -> Self {
        let p = Point::new(center.x + radius, center.y);
        Self::new(name, p, p, center, false)
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn is_clockwise(&self) -> bool {
        self.clockwise
    }

    pub fn radius(&self) -> f64 {
        self.center.distance_to(&self.start)
    }

    /// Angle of the start point, degrees in (-180, 180].
    pub fn start_angle(&self) -> f64 {
        self.center.angle_to(&self.start).to_degrees()
    }

    /// Swept angle in degrees, always positive and in the arc's direction.
    /// Sweeps within a hair of 0 or 360 are a full circle.
    pub fn angular_length(&self) -> f64 {
        let a0 = self.start_angle();
        let a1 = self.center.angle_to(&self.end).to_degrees();
        let raw = if self.clockwise { a0 - a1 } else { a1 - a0 };
        let sweep = raw.rem_euclid(360.0);
        if sweep <= FULL_CIRCLE_TOLERANCE_DEG || sweep >= 360.0 - FULL_CIRCLE_TOLERANCE_DEG {
            360.0
        } else {
            sweep
        }
    }

    pub fn is_full_circle(&self) -> bool {
        self.angular_length() >= 360.0
    }

    pub fn set_start(&mut self, p: Point) {
        self.start = p;
        self.header.touch();
    }

    pub fn set_end(&mut self, p: Point) {
        self.end = p;
        self.header.touch();
    }

    pub fn set_center(&mut self, p: Point) {
        self.center = p;
        self.header.touch();
    }

    pub fn set_clockwise(&mut self, clockwise: bool) {
        self.clockwise = clockwise;
        self.header.touch();
    }

    /// Point at `fraction` (0..=1) along the sweep.
    pub fn point_at(&self, fraction: f64) -> Point {
        let sign = if self.clockwise { -1.0 } else { 1.0 };
        let angle = self.start_angle().to_radians()
            + sign * self.angular_length().to_radians() * fraction;
        let r = self.radius();
        Point::new(self.center.x + r * angle.cos(), self.center.y + r * angle.sin())
    }

    fn in_sweep(&self, angle_deg: f64) -> bool {
        let a0 = self.start_angle();
        let offset = if self.clockwise {
            a0 - angle_deg
        } else {
            angle_deg - a0
        };
        offset.rem_euclid(360.0) <= self.angular_length()
    }

    /// The motion drawing this arc from its start point.
    pub fn arc_motion(&self) -> Motion {
        Motion::arc(self.end, self.center - self.start, self.clockwise)
    }
}

impl CamShape for DesignArc {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        let fraction = self.angular_length() / 360.0;
        let segments = ((SEGMENTS_PER_TURN * fraction).ceil() as usize).max(MIN_ARC_SEGMENTS);
        let mut points: Vec<Point> = (0..segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect();
        points.push(self.end);
        points
    }

    fn motions(&self) -> Vec<Motion> {
        vec![Motion::rapid(self.start), self.arc_motion()]
    }

    fn compute_bounds(&self) -> Bounds {
        let mut b = Bounds::from_points([self.start, self.end].iter());
        let r = self.radius();
        for quadrant in [0.0, 90.0, 180.0, -90.0] {
            if self.in_sweep(quadrant) {
                let a = quadrant.to_radians();
                b.include(&Point::new(self.center.x + r * a.cos(), self.center.y + r * a.sin()));
            }
        }
        b
    }

    fn compute_length(&self) -> f64 {
        self.radius() * self.angular_length().to_radians()
    }

    fn distance_to(&self, p: &Point) -> f64 {
        if !p.is_finite() {
            return f64::INFINITY;
        }
        let angle = self.center.angle_to(p).to_degrees();
        if p.distance_to(&self.center) > 0.0 && self.in_sweep(angle) {
            (p.distance_to(&self.center) - self.radius()).abs()
        } else {
            p.distance_to(&self.start).min(p.distance_to(&self.end))
        }
    }

    fn offset_area_with(&self, distance: f64, tolerance: f64) -> Option<Area> {
        if !(distance > 0.0) {
            return None;
        }
        if self.is_full_circle() {
            let ring = Area::offset_polyline(self.flat_points(), distance, tolerance)?;
            return Some(ring);
        }
        Some(Area::thick_arc(
            self.start,
            self.end,
            self.center,
            self.clockwise,
            distance,
            tolerance,
        ))
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        self.start = self.start.transformed(m);
        self.end = self.end.transformed(m);
        self.center = self.center.transformed(m);
        if is_mirroring(m) {
            self.clockwise = !self.clockwise;
        }
        self.header.touch();
    }

    fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        self.clockwise = !self.clockwise;
        self.header.touch();
    }

    fn start_point(&self) -> Option<Point> {
        Some(self.start)
    }

    fn end_point(&self) -> Option<Point> {
        Some(self.end)
    }

    fn is_closed(&self) -> bool {
        self.start.approx_eq(&self.end)
    }
}
