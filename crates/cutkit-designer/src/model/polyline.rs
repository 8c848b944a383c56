use nalgebra::Matrix3;

use super::{CamShape, Shape, ShapeHeader};
use crate::geometry::{segment_distance, signed_area, Point};
use crate::motion::{Motion, MotionKind};

/// Open or closed chain of straight moves. Comments may sit between points.
#[derive(Debug, Clone)]
pub struct DesignPolyline {
    header: ShapeHeader,
    motions: Vec<Motion>,
}

impl DesignPolyline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: ShapeHeader::new(name),
            motions: Vec::new(),
        }
    }

    pub fn from_points(name: impl Into<String>, points: &[Point]) -> Self {
        let motions = points.iter().map(|p| Motion::feed(*p)).collect();
        Self::from_motions(name, motions)
    }

    /// Any coordinate-carrying motion becomes a straight move to its end.
    pub fn from_motions(name: impl Into<String>, motions: Vec<Motion>) -> Self {
        Self::from_parts(ShapeHeader::new(name), motions)
    }

    pub(crate) fn from_parts(header: ShapeHeader, motions: Vec<Motion>) -> Self {
        let mut pl = Self { header, motions };
        pl.normalize();
        pl
    }

    pub fn motion_list(&self) -> &[Motion] {
        &self.motions
    }

    /// Real points only, comments skipped.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.motions.iter().filter(|m| m.is_point()).map(Motion::point)
    }

    fn point_indices(&self) -> Vec<usize> {
        self.motions
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_point())
            .map(|(i, _)| i)
            .collect()
    }

    /// First point is a rapid, every later point a straight feed.
    fn normalize(&mut self) {
        let mut first = true;
        for m in self.motions.iter_mut() {
            if !m.is_point() {
                continue;
            }
            m.kind = if first {
                MotionKind::Rapid
            } else {
                MotionKind::Feed
            };
            first = false;
        }
    }

    fn changed(&mut self) {
        self.normalize();
        self.header.touch();
    }

    pub fn add_point(&mut self, p: Point) {
        self.motions.push(Motion::feed(p));
        self.changed();
    }

    pub fn add_comment(&mut self, text: &str) {
        self.motions.push(Motion::comment(text));
        self.header.touch();
    }

    /// Append the first point again. `false` if already closed or too short.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        let pts: Vec<Point> = self.points().collect();
        if pts.len() < 2 {
            return false;
        }
        self.add_point(pts[0]);
        true
    }

    /// Drop vertices that sit within `tolerance` of the chord between their
    /// neighbours and whose angle exceeds `min_angle_deg`. Endpoints and
    /// comments are kept. Returns the number of removed points.
    pub fn simplify(&mut self, tolerance: f64, min_angle_deg: f64) -> usize {
        let indices = self.point_indices();
        if indices.len() < 3 {
            return 0;
        }
        let pts: Vec<Point> = indices.iter().map(|&i| self.motions[i].point()).collect();
        let mut remove = vec![false; self.motions.len()];
        let mut prev = pts[0];
        let mut removed = 0;
        for k in 1..pts.len() - 1 {
            let (p, next) = (pts[k], pts[k + 1]);
            let chord = segment_distance(&p, &prev, &next);
            let a = prev - p;
            let b = next - p;
            let denom = a.length() * b.length();
            let angle = if denom > f64::EPSILON {
                (a.dot(&b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
            } else {
                0.0
            };
            if chord <= tolerance && angle > min_angle_deg {
                remove[indices[k]] = true;
                removed += 1;
            } else {
                prev = p;
            }
        }
        if removed > 0 {
            let mut i = 0;
            self.motions.retain(|_| {
                let keep = !remove[i];
                i += 1;
                keep
            });
            self.changed();
        }
        removed
    }

    /// Shoelace area of the point ring; positive when counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let mut pts: Vec<Point> = self.points().collect();
        if pts.len() > 1 && pts[0].approx_eq(&pts[pts.len() - 1]) {
            pts.pop();
        }
        signed_area(&pts)
    }

    /// Motions of `other`, optionally reversed, without the first point.
    fn tail(other: &DesignPolyline, reversed: bool) -> Vec<Motion> {
        let mut motions = other.motions.clone();
        if reversed {
            motions.reverse();
        }
        if let Some(first) = motions.iter().position(Motion::is_point) {
            motions.remove(first);
        }
        motions
    }
}

impl CamShape for DesignPolyline {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        self.points().collect()
    }

    fn motions(&self) -> Vec<Motion> {
        self.motions.clone()
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        for motion in self.motions.iter_mut().filter(|mo| mo.is_point()) {
            let p = motion.point().transformed(m);
            motion.set_point(p);
        }
        self.header.touch();
    }

    fn reverse(&mut self) {
        self.motions.reverse();
        self.changed();
    }

    /// Endpoint matching is tried in a fixed order and the first hit wins:
    /// end to start, end to end, start to end, start to start.
    fn concat(&mut self, other: &Shape, tolerance: f64) -> bool {
        let Shape::Polyline(other) = other else {
            return false;
        };
        let (Some(s0), Some(s1)) = (self.start_point(), self.end_point()) else {
            return false;
        };
        let (Some(o0), Some(o1)) = (other.start_point(), other.end_point()) else {
            return false;
        };

        if s1.near(&o0, tolerance) {
            self.motions.extend(Self::tail(other, false));
        } else if s1.near(&o1, tolerance) {
            self.motions.extend(Self::tail(other, true));
        } else if s0.near(&o1, tolerance) {
            let mut joined = other.motions.clone();
            joined.extend(Self::tail(self, false));
            self.motions = joined;
        } else if s0.near(&o0, tolerance) {
            let mut joined = other.motions.clone();
            joined.reverse();
            joined.extend(Self::tail(self, false));
            self.motions = joined;
        } else {
            return false;
        }
        self.changed();
        true
    }

    fn insert_point(&mut self, index: usize, p: Point) -> bool {
        let indices = self.point_indices();
        if index > indices.len() || !p.is_finite() {
            return false;
        }
        let at = indices.get(index).copied().unwrap_or(self.motions.len());
        self.motions.insert(at, Motion::feed(p));
        self.changed();
        true
    }

    fn remove_point(&mut self, index: usize) -> bool {
        match self.point_indices().get(index) {
            Some(&at) => {
                self.motions.remove(at);
                self.changed();
                true
            }
            None => false,
        }
    }

    fn move_point(&mut self, index: usize, p: Point) -> bool {
        match self.point_indices().get(index) {
            Some(&at) if p.is_finite() => {
                self.motions[at].set_point(p);
                self.header.touch();
                true
            }
            _ => false,
        }
    }
}
