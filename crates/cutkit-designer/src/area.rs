//! Filled regions built from constant-radius offsets.
//!
//! An offset area is the union of capsules (a rectangle of width `2d`
//! along a segment plus a disc of radius `d` at each end). This gives a
//! Minkowski-style offset without polygon-offset math. Regions are held
//! as a csgrs [`Sketch`] and read back as closed rings.

use crate::geometry::{signed_area, Bounds, Point};
use cavalier_contours::core::math::Vector2;
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use nalgebra::{Matrix4, Vector3};
use std::f64::consts::PI;

/// Default maximum chord error for circles.
pub const DEFAULT_CIRCLE_TOLERANCE: f64 = 1e-4;

const MIN_CIRCLE_SEGMENTS: usize = 16;
const MAX_CIRCLE_SEGMENTS: usize = 256;

/// One boundary ring of an area. Rings are closed: last point equals first.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaLoop {
    pub points: Vec<Point>,
    pub is_hole: bool,
}

impl AreaLoop {
    pub fn area(&self) -> f64 {
        signed_area(&self.points[..self.points.len().saturating_sub(1)]).abs()
    }

    pub fn contains(&self, p: &Point) -> bool {
        ring_contains(&self.points, p)
    }
}

#[derive(Debug, Clone)]
pub struct Area {
    sketch: Sketch<()>,
}

impl Default for Area {
    fn default() -> Self {
        Self::empty()
    }
}

impl Area {
    pub fn empty() -> Self {
        Self {
            sketch: Sketch::new(),
        }
    }

    /// Disc of radius `r` around `center`.
    pub fn disc(center: Point, r: f64, tolerance: f64) -> Self {
        let s: Sketch<()> = Sketch::circle(r, circle_segments(r, tolerance), None);
        Self {
            sketch: s.transform(&Matrix4::new_translation(&Vector3::new(
                center.x, center.y, 0.0,
            ))),
        }
    }

    /// Capsule of radius `r` around the segment `a`..`b`.
    pub fn capsule(a: Point, b: Point, r: f64, tolerance: f64) -> Self {
        let len = a.distance_to(&b);
        if len < 1e-9 {
            return Self::disc(a, r, tolerance);
        }

        let angle = a.angle_to(&b);
        let mid = a.lerp(&b, 0.5);
        let half_l = len / 2.0;
        let pts = vec![[-half_l, -r], [half_l, -r], [half_l, r], [-half_l, r]];
        let rect: Sketch<()> = Sketch::polygon(&pts, None);
        let rotation = Matrix4::new_rotation(Vector3::new(0.0, 0.0, angle));
        let translation = Matrix4::new_translation(&Vector3::new(mid.x, mid.y, 0.0));
        let rect = rect.transform(&(translation * rotation));

        let c1 = Self::disc(a, r, tolerance);
        let c2 = Self::disc(b, r, tolerance);
        Self {
            sketch: rect.union(&c1.sketch).union(&c2.sketch),
        }
    }

    /// Band of half-width `r` around a circular arc, with round ends.
    pub fn thick_arc(
        start: Point,
        end: Point,
        center: Point,
        clockwise: bool,
        r: f64,
        tolerance: f64,
    ) -> Self {
        let radius = center.distance_to(&start);
        let start_angle = center.angle_to(&start);
        let mut end_angle = center.angle_to(&end);
        if clockwise {
            if end_angle >= start_angle {
                end_angle -= 2.0 * PI;
            }
        } else if end_angle <= start_angle {
            end_angle += 2.0 * PI;
        }

        let diff = end_angle - start_angle;
        let segments = ((diff.abs() / (2.0 * PI)) * circle_segments(radius + r, tolerance) as f64)
            .ceil()
            .max(2.0) as usize;

        let r_outer = radius + r;
        let r_inner = (radius - r).max(0.0);
        let mut outer = Vec::with_capacity(segments + 1);
        let mut inner = Vec::with_capacity(segments + 1);
        for i in 0..=segments {
            let t = i as f64 / segments as f64;
            let (s, c) = (start_angle + diff * t).sin_cos();
            outer.push([center.x + r_outer * c, center.y + r_outer * s]);
            inner.push([center.x + r_inner * c, center.y + r_inner * s]);
        }
        inner.reverse();
        outer.extend(inner);
        let band: Sketch<()> = Sketch::polygon(&outer, None);

        let c1 = Self::disc(start, r, tolerance);
        let c2 = Self::disc(end, r, tolerance);
        Self {
            sketch: band.union(&c1.sketch).union(&c2.sketch),
        }
    }

    /// Union of the capsules over consecutive points. `None` for fewer than
    /// two points.
    pub fn offset_polyline(points: &[Point], r: f64, tolerance: f64) -> Option<Self> {
        if points.len() < 2 || !(r > 0.0) {
            return None;
        }
        let pieces = points
            .windows(2)
            .filter(|w| w[0].is_finite() && w[1].is_finite())
            .map(|w| Self::capsule(w[0], w[1], r, tolerance))
            .collect();
        Some(Self::union_all(pieces))
    }

    /// Filled polygon.
    pub fn polygon(points: &[Point]) -> Self {
        let pts: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        if pts.len() < 3 {
            return Self::empty();
        }
        Self {
            sketch: Sketch::polygon(&pts, None),
        }
    }

    pub fn union(&self, other: &Area) -> Area {
        Area {
            sketch: self.sketch.union(&other.sketch),
        }
    }

    /// Pairwise union, keeping operands of similar size.
    pub fn union_all(mut areas: Vec<Area>) -> Area {
        if areas.is_empty() {
            return Area::empty();
        }
        while areas.len() > 1 {
            let mut next = Vec::with_capacity(areas.len().div_ceil(2));
            let mut iter = areas.into_iter();
            while let Some(a) = iter.next() {
                match iter.next() {
                    Some(b) => next.push(a.union(&b)),
                    None => next.push(a),
                }
            }
            areas = next;
        }
        areas.pop().unwrap_or_default()
    }

    /// Every boundary ring, exteriors followed by their holes.
    pub fn loops(&self) -> Vec<AreaLoop> {
        let mp = self.sketch.to_multipolygon();
        let mut loops = Vec::new();
        for poly in mp.0 {
            let exterior: Vec<Point> = poly.exterior().0.iter().map(|c| Point::new(c.x, c.y)).collect();
            if let Some(points) = clean_ring(exterior) {
                loops.push(AreaLoop {
                    points,
                    is_hole: false,
                });
            }
            for interior in poly.interiors() {
                let ring: Vec<Point> = interior.0.iter().map(|c| Point::new(c.x, c.y)).collect();
                if let Some(points) = clean_ring(ring) {
                    loops.push(AreaLoop {
                        points,
                        is_hole: true,
                    });
                }
            }
        }
        loops
    }

    pub fn is_empty(&self) -> bool {
        self.loops().is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds::empty();
        for l in self.loops().iter().filter(|l| !l.is_hole) {
            for p in &l.points {
                b.include(p);
            }
        }
        b
    }

    /// Inside some exterior ring and outside that polygon's holes.
    pub fn contains_point(&self, p: &Point) -> bool {
        let mp = self.sketch.to_multipolygon();
        mp.0.iter().any(|poly| {
            let ext: Vec<Point> = poly.exterior().0.iter().map(|c| Point::new(c.x, c.y)).collect();
            ring_contains(&ext, p)
                && !poly.interiors().iter().any(|hole| {
                    let ring: Vec<Point> = hole.0.iter().map(|c| Point::new(c.x, c.y)).collect();
                    ring_contains(&ring, p)
                })
        })
    }

    /// Net enclosed area.
    pub fn area(&self) -> f64 {
        self.loops()
            .iter()
            .map(|l| if l.is_hole { -l.area() } else { l.area() })
            .sum()
    }

    pub fn sketch(&self) -> &Sketch<()> {
        &self.sketch
    }
}

/// Segments needed so a circle of radius `r` deviates at most `tolerance`.
pub fn circle_segments(r: f64, tolerance: f64) -> usize {
    if !(r > 0.0) || !(tolerance > 0.0) || tolerance >= r {
        return MIN_CIRCLE_SEGMENTS;
    }
    let half_angle = (1.0 - tolerance / r).acos();
    let n = (PI / half_angle).ceil();
    (n as usize).clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS)
}

fn clean_ring(points: Vec<Point>) -> Option<Vec<Point>> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len() + 1);
    for p in points {
        if out.last().is_some_and(|last| last.distance_to(&p) < 1e-9) {
            continue;
        }
        out.push(p);
    }
    while out.len() > 1 && out[0].distance_to(&out[out.len() - 1]) < 1e-9 {
        out.pop();
    }
    if out.len() < 3 {
        return None;
    }
    out.push(out[0]);
    Some(out)
}

/// Cavalier polyline for a ring; a repeated closing point is dropped.
pub(crate) fn to_pline(ring: &[Point]) -> Polyline<f64> {
    let mut pline = Polyline::new();
    let mut count = ring.len();
    if count > 1 && ring[0].distance_to(&ring[count - 1]) < 1e-9 {
        count -= 1;
    }
    for p in &ring[..count] {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// Non-zero winding containment test.
pub fn ring_contains(ring: &[Point], p: &Point) -> bool {
    if ring.len() < 3 {
        return false;
    }
    to_pline(ring).winding_number(Vector2::new(p.x, p.y)) != 0
}
