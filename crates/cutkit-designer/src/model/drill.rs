use nalgebra::Matrix3;

use super::{CamShape, ShapeHeader};
use crate::area::Area;
use crate::geometry::{Bounds, Point};
use crate::motion::Motion;
use crate::properties::MAX_PASSES;

/// One hole: a position plus a canned drilling cycle.
///
/// `peck` of zero drills in a single plunge. Geometry edits go through the
/// setters; point insertion and removal are refused.
#[derive(Debug, Clone)]
pub struct DesignDrill {
    header: ShapeHeader,
    position: Point,
    depth: f64,
    retract: f64,
    peck: f64,
}

impl DesignDrill {
    pub fn new(name: impl Into<String>, position: Point, depth: f64, retract: f64, peck: f64) -> Self {
        Self::from_parts(ShapeHeader::new(name), position, depth, retract, peck)
    }

    pub(crate) fn from_parts(
        header: ShapeHeader,
        position: Point,
        depth: f64,
        retract: f64,
        peck: f64,
    ) -> Self {
        Self {
            header,
            position,
            depth,
            retract,
            peck: peck.max(0.0),
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn retract(&self) -> f64 {
        self.retract
    }

    pub fn peck(&self) -> f64 {
        self.peck
    }

    pub fn set_position(&mut self, p: Point) {
        self.position = p;
        self.header.touch();
    }

    pub fn set_depth(&mut self, depth: f64) {
        self.depth = depth;
        self.header.touch();
    }

    pub fn set_retract(&mut self, retract: f64) {
        self.retract = retract;
        self.header.touch();
    }

    pub fn set_peck(&mut self, peck: f64) {
        self.peck = peck.max(0.0);
        self.header.touch();
    }

    /// Plunge targets from `top` down to the hole depth.
    ///
    /// A single plunge when pecking is off; otherwise one entry per peck,
    /// the last clamped at the final depth. A peck so small that it would
    /// need more than [`MAX_PASSES`] plunges is widened to fit.
    pub fn peck_schedule(&self, top: f64) -> Vec<f64> {
        if self.peck <= 0.0 || !(top > self.depth) || !self.depth.is_finite() {
            return vec![self.depth];
        }
        let span = top - self.depth;
        let wanted = (span / self.peck).ceil();
        let (count, step) = if wanted > MAX_PASSES as f64 {
            (MAX_PASSES, span / MAX_PASSES as f64)
        } else {
            (wanted.max(1.0) as usize, self.peck)
        };
        (1..=count)
            .map(|i| {
                if i == count {
                    self.depth
                } else {
                    (top - step * i as f64).max(self.depth)
                }
            })
            .collect()
    }

    pub fn cycle_motion(&self) -> Motion {
        Motion::drill(self.position, self.depth, self.retract, self.peck)
    }
}

impl CamShape for DesignDrill {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        vec![self.position]
    }

    fn motions(&self) -> Vec<Motion> {
        vec![Motion::rapid(self.position), self.cycle_motion()]
    }

    fn compute_bounds(&self) -> Bounds {
        Bounds::from_points([self.position].iter())
    }

    fn offset_area_with(&self, _distance: f64, _tolerance: f64) -> Option<Area> {
        None
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        self.position = self.position.transformed(m);
        self.header.touch();
    }

    fn reverse(&mut self) {}

    fn is_closed(&self) -> bool {
        false
    }
}
