//! Point, bounds and segment math shared by every shape variant.

use cutkit_core::EPSILON;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Same location within [`EPSILON`].
    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= EPSILON && (self.y - other.y).abs() <= EPSILON
    }

    /// Same location within `tolerance` (euclidean).
    pub fn near(&self, other: &Point, tolerance: f64) -> bool {
        self.distance_to(other) <= tolerance.max(EPSILON)
    }

    /// Angle of the vector from `self` to `other`, radians in (-π, π].
    pub fn angle_to(&self, other: &Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn rotate_about(&self, pivot: &Point, angle: f64) -> Point {
        let (s, c) = angle.sin_cos();
        let dx = self.x - pivot.x;
        let dy = self.y - pivot.y;
        Point::new(pivot.x + dx * c - dy * s, pivot.y + dx * s + dy * c)
    }

    pub fn transformed(&self, m: &Matrix3<f64>) -> Point {
        let v = m * Vector3::new(self.x, self.y, 1.0);
        Point::new(v.x, v.y)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned bounding box. The empty box has inverted infinite extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut b = Self::empty();
        for p in points {
            b.include(p);
        }
        b
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn include(&mut self, p: &Point) {
        if !p.is_finite() {
            return;
        }
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn expand(&self, amount: f64) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        Bounds::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// `other` lies strictly inside `self` on all four sides.
    pub fn strictly_contains(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x < other.min_x
            && self.min_y < other.min_y
            && self.max_x > other.max_x
            && self.max_y > other.max_y
    }
}

/// Closest point to `p` on the segment `a`..`b`.
pub fn closest_on_segment(p: &Point, a: &Point, b: &Point) -> Point {
    let ab = *b - *a;
    let len2 = ab.dot(&ab);
    if len2 <= f64::EPSILON {
        return *a;
    }
    let t = ((*p - *a).dot(&ab) / len2).clamp(0.0, 1.0);
    a.lerp(b, t)
}

pub fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    p.distance_to(&closest_on_segment(p, a, b))
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
pub fn line_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = *b - *a;
    let len = ab.length();
    if len <= f64::EPSILON {
        return p.distance_to(a);
    }
    (ab.cross(&(*p - *a)) / len).abs()
}

/// Sum of consecutive distances.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Shoelace area, positive for counter-clockwise rings.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let p1 = points[i];
        let p2 = points[(i + 1) % points.len()];
        sum += p1.x * p2.y - p2.x * p1.y;
    }
    sum / 2.0
}

pub fn translation(dx: f64, dy: f64) -> Matrix3<f64> {
    Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0)
}

/// Rotation by `angle` radians about `center`.
pub fn rotation_about(angle: f64, center: &Point) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    let rotation = Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0);
    translation(center.x, center.y) * rotation * translation(-center.x, -center.y)
}

pub fn scale_about(sx: f64, sy: f64, center: &Point) -> Matrix3<f64> {
    let scale = Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0);
    translation(center.x, center.y) * scale * translation(-center.x, -center.y)
}

/// A transform with negative determinant flips orientation.
pub fn is_mirroring(m: &Matrix3<f64>) -> bool {
    linear_determinant(m) < 0.0
}

fn linear_determinant(m: &Matrix3<f64>) -> f64 {
    m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]
}

/// Rotation angle (radians) carried by the linear part of `m`.
pub fn rotation_angle(m: &Matrix3<f64>) -> f64 {
    m[(1, 0)].atan2(m[(0, 0)])
}

/// Uniform scale factor of the linear part (geometric mean of the axes).
pub fn uniform_scale(m: &Matrix3<f64>) -> f64 {
    linear_determinant(m).abs().sqrt()
}
