//! Parametric 3D pockets.
//!
//! A pocket is described by a few parameters and its boundary at any depth
//! is derived from them on demand. The flattened outline of the shape is
//! the boundary at the surface (z = 0). Point edits are refused; the
//! setters recompute everything.

use std::f64::consts::TAU;

use nalgebra::Matrix3;

use super::{CamShape, ShapeHeader};
use crate::geometry::{rotation_angle, uniform_scale, Point};
use crate::motion::Motion;

const SPHERE_SEGMENTS: usize = 48;

/// Half-width of a circular section of radius `r` whose centre sits at
/// `-inlay + r`, cut at height `z`. Above the centre the walls are vertical.
fn section_half_width(r: f64, inlay: f64, z: f64) -> Option<f64> {
    if !(r > 0.0) || z < -inlay || z > 0.0 {
        return None;
    }
    let axis = -inlay + r;
    if z >= axis {
        return Some(r);
    }
    let dz = axis - z;
    let half = (r * r - dz * dz).max(0.0).sqrt();
    (half > 0.0).then_some(half)
}

fn ring_motions(ring: &[Point]) -> Vec<Motion> {
    ring.iter()
        .enumerate()
        .map(|(i, p)| if i == 0 { Motion::rapid(*p) } else { Motion::feed(*p) })
        .collect()
}

/// Half-cylinder trough lying on its side, e.g. for inlaying a round bar.
#[derive(Debug, Clone)]
pub struct DesignCylinderPocket {
    header: ShapeHeader,
    center: Point,
    radius: f64,
    length: f64,
    inlay_depth: f64,
    /// Axis direction in degrees.
    rotation: f64,
}

impl DesignCylinderPocket {
    pub fn new(
        name: impl Into<String>,
        center: Point,
        radius: f64,
        length: f64,
        inlay_depth: f64,
        rotation: f64,
    ) -> Self {
        Self::from_parts(ShapeHeader::new(name), center, radius, length, inlay_depth, rotation)
    }

    pub(crate) fn from_parts(
        header: ShapeHeader,
        center: Point,
        radius: f64,
        length: f64,
        inlay_depth: f64,
        rotation: f64,
    ) -> Self {
        Self {
            header,
            center,
            radius,
            length,
            inlay_depth,
            rotation,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn length_param(&self) -> f64 {
        self.length
    }

    pub fn inlay_depth(&self) -> f64 {
        self.inlay_depth
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
        self.header.touch();
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.header.touch();
    }

    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.header.touch();
    }

    pub fn set_inlay_depth(&mut self, depth: f64) {
        self.inlay_depth = depth;
        self.header.touch();
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees;
        self.header.touch();
    }

    /// Closed rectangle cut by the plane at `z`; `None` below the floor.
    pub fn contour_at_depth(&self, z: f64) -> Option<Vec<Point>> {
        let half_w = section_half_width(self.radius, self.inlay_depth, z)?;
        let half_l = self.length / 2.0;
        let corners = [
            Point::new(self.center.x - half_l, self.center.y - half_w),
            Point::new(self.center.x + half_l, self.center.y - half_w),
            Point::new(self.center.x + half_l, self.center.y + half_w),
            Point::new(self.center.x - half_l, self.center.y + half_w),
        ];
        let angle = self.rotation.to_radians();
        let mut ring: Vec<Point> = corners
            .iter()
            .map(|c| c.rotate_about(&self.center, angle))
            .collect();
        ring.push(ring[0]);
        Some(ring)
    }

    pub fn contour_motions(&self, z: f64) -> Vec<Motion> {
        self.contour_at_depth(z)
            .map(|ring| ring_motions(&ring))
            .unwrap_or_default()
    }
}

impl CamShape for DesignCylinderPocket {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        self.contour_at_depth(0.0).unwrap_or_default()
    }

    fn motions(&self) -> Vec<Motion> {
        self.contour_motions(0.0)
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        let scale = uniform_scale(m);
        self.center = self.center.transformed(m);
        self.rotation += rotation_angle(m).to_degrees();
        self.radius *= scale;
        self.length *= scale;
        self.header.touch();
    }

    fn reverse(&mut self) {}
}

/// Spherical dimple centred at `-inlay + r`.
#[derive(Debug, Clone)]
pub struct DesignSpherePocket {
    header: ShapeHeader,
    center: Point,
    radius: f64,
    inlay_depth: f64,
}

impl DesignSpherePocket {
    pub fn new(name: impl Into<String>, center: Point, radius: f64, inlay_depth: f64) -> Self {
        Self::from_parts(ShapeHeader::new(name), center, radius, inlay_depth)
    }

    pub(crate) fn from_parts(header: ShapeHeader, center: Point, radius: f64, inlay_depth: f64) -> Self {
        Self {
            header,
            center,
            radius,
            inlay_depth,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn inlay_depth(&self) -> f64 {
        self.inlay_depth
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
        self.header.touch();
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
        self.header.touch();
    }

    pub fn set_inlay_depth(&mut self, depth: f64) {
        self.inlay_depth = depth;
        self.header.touch();
    }

    /// Radius of the circular section at `z`.
    pub fn section_radius(&self, z: f64) -> Option<f64> {
        section_half_width(self.radius, self.inlay_depth, z)
    }

    pub fn contour_at_depth(&self, z: f64) -> Option<Vec<Point>> {
        let r = self.section_radius(z)?;
        let mut ring: Vec<Point> = (0..SPHERE_SEGMENTS)
            .map(|i| {
                let a = TAU * i as f64 / SPHERE_SEGMENTS as f64;
                Point::new(self.center.x + r * a.cos(), self.center.y + r * a.sin())
            })
            .collect();
        ring.push(ring[0]);
        Some(ring)
    }

    pub fn contour_motions(&self, z: f64) -> Vec<Motion> {
        self.contour_at_depth(z)
            .map(|ring| ring_motions(&ring))
            .unwrap_or_default()
    }
}

impl CamShape for DesignSpherePocket {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        self.contour_at_depth(0.0).unwrap_or_default()
    }

    fn motions(&self) -> Vec<Motion> {
        self.contour_motions(0.0)
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        self.center = self.center.transformed(m);
        self.radius *= uniform_scale(m);
        self.header.touch();
    }

    fn reverse(&mut self) {}
}
