use nalgebra::Matrix3;

use super::{CamShape, DesignArc, DesignSpline, Shape, ShapeHeader};
use crate::geometry::Point;
use crate::motion::{Motion, MotionKind};

/// One step of a mixed path.
#[derive(Debug, Clone)]
pub enum PathElement {
    /// Straight move or comment
    Move(Motion),
    Arc(DesignArc),
    Spline(DesignSpline),
}

impl PathElement {
    fn start(&self) -> Option<Point> {
        match self {
            PathElement::Move(m) if m.is_point() => Some(m.point()),
            PathElement::Move(_) => None,
            PathElement::Arc(a) => Some(a.start()),
            PathElement::Spline(s) => Some(s.start()),
        }
    }

    fn end(&self) -> Option<Point> {
        match self {
            PathElement::Move(m) if m.is_point() => Some(m.point()),
            PathElement::Move(_) => None,
            PathElement::Arc(a) => Some(a.end()),
            PathElement::Spline(s) => Some(s.end()),
        }
    }
}

/// Sequence mixing straight moves with embedded arcs and splines.
///
/// After every change the path is re-validated so each embedded curve
/// starts where the previous element ended: a spline's start is moved onto
/// the cursor, an arc (whose start fixes its radius) gets a bridging feed.
#[derive(Debug, Clone)]
pub struct DesignMixedPath {
    header: ShapeHeader,
    elements: Vec<PathElement>,
}

impl DesignMixedPath {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(ShapeHeader::new(name), Vec::new())
    }

    pub(crate) fn from_parts(header: ShapeHeader, elements: Vec<PathElement>) -> Self {
        let mut path = Self { header, elements };
        path.validate();
        path
    }

    /// Build from a path-like shape. `None` for groups and fixed-topology
    /// shapes.
    pub fn from_shape(shape: &Shape) -> Option<Self> {
        let elements = Self::elements_of(shape)?;
        Some(Self::from_parts(
            ShapeHeader::new(shape.name().to_string()),
            elements,
        ))
    }

    fn elements_of(shape: &Shape) -> Option<Vec<PathElement>> {
        match shape {
            Shape::Polyline(p) => Some(p.motions().into_iter().map(PathElement::Move).collect()),
            Shape::Arc(a) => Some(vec![PathElement::Arc(a.clone())]),
            Shape::Spline(s) => Some(vec![PathElement::Spline(s.clone())]),
            Shape::MixedPath(m) => Some(m.elements.clone()),
            _ => None,
        }
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn push_point(&mut self, p: Point) {
        self.elements.push(PathElement::Move(Motion::feed(p)));
        self.changed();
    }

    pub fn push_arc(&mut self, arc: DesignArc) {
        self.elements.push(PathElement::Arc(arc));
        self.changed();
    }

    pub fn push_spline(&mut self, spline: DesignSpline) {
        self.elements.push(PathElement::Spline(spline));
        self.changed();
    }

    pub fn push_comment(&mut self, text: &str) {
        self.elements.push(PathElement::Move(Motion::comment(text)));
        self.header.touch();
    }

    fn changed(&mut self) {
        self.validate();
        self.header.touch();
    }

    /// Restore the continuity invariant.
    fn validate(&mut self) {
        let old = std::mem::take(&mut self.elements);
        let mut cursor: Option<Point> = None;
        for element in old {
            match element {
                PathElement::Move(mut m) => {
                    if m.is_point() {
                        m.kind = if cursor.is_none() {
                            MotionKind::Rapid
                        } else {
                            MotionKind::Feed
                        };
                        cursor = Some(m.point());
                    }
                    self.elements.push(PathElement::Move(m));
                }
                PathElement::Arc(arc) => {
                    match cursor {
                        None => self.elements.push(PathElement::Move(Motion::rapid(arc.start()))),
                        Some(c) if !c.approx_eq(&arc.start()) => {
                            self.elements.push(PathElement::Move(Motion::feed(arc.start())))
                        }
                        _ => {}
                    }
                    cursor = Some(arc.end());
                    self.elements.push(PathElement::Arc(arc));
                }
                PathElement::Spline(mut spline) => {
                    match cursor {
                        None => self
                            .elements
                            .push(PathElement::Move(Motion::rapid(spline.start()))),
                        Some(c) if !c.approx_eq(&spline.start()) => spline.set_start(c),
                        _ => {}
                    }
                    cursor = Some(spline.end());
                    self.elements.push(PathElement::Spline(spline));
                }
            }
        }
    }

    fn cursor_start(&self) -> Option<Point> {
        self.elements.iter().find_map(PathElement::start)
    }

    fn cursor_end(&self) -> Option<Point> {
        self.elements.iter().rev().find_map(PathElement::end)
    }

    fn reversed_elements(elements: &[PathElement]) -> Vec<PathElement> {
        // start point of every element, i.e. the cursor before it
        let mut before: Vec<Option<Point>> = Vec::with_capacity(elements.len());
        let mut cursor = None;
        for e in elements {
            before.push(cursor);
            if let Some(end) = e.end() {
                cursor = Some(end);
            }
        }

        let mut out = Vec::with_capacity(elements.len() + 1);
        if let Some(end) = cursor {
            out.push(PathElement::Move(Motion::rapid(end)));
        }
        for (e, prev) in elements.iter().zip(before).rev() {
            match e {
                PathElement::Move(m) if !m.is_point() => out.push(PathElement::Move(m.clone())),
                PathElement::Move(_) => {
                    if let Some(p) = prev {
                        out.push(PathElement::Move(Motion::feed(p)));
                    }
                }
                PathElement::Arc(a) => {
                    let mut a = a.clone();
                    a.reverse();
                    out.push(PathElement::Arc(a));
                }
                PathElement::Spline(s) => {
                    let mut s = s.clone();
                    s.reverse();
                    out.push(PathElement::Spline(s));
                }
            }
        }
        out
    }
}

impl CamShape for DesignMixedPath {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        let mut pts: Vec<Point> = Vec::new();
        for e in &self.elements {
            match e {
                PathElement::Move(m) if m.is_point() => pts.push(m.point()),
                PathElement::Move(_) => {}
                PathElement::Arc(a) => pts.extend(a.flat_points().iter().skip(1)),
                PathElement::Spline(s) => pts.extend(s.flat_points().iter().skip(1)),
            }
        }
        pts
    }

    fn motions(&self) -> Vec<Motion> {
        self.elements
            .iter()
            .map(|e| match e {
                PathElement::Move(m) => m.clone(),
                PathElement::Arc(a) => a.arc_motion(),
                PathElement::Spline(s) => s.curve_motion(),
            })
            .collect()
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        for e in self.elements.iter_mut() {
            match e {
                PathElement::Move(mo) if mo.is_point() => {
                    let p = mo.point().transformed(m);
                    mo.set_point(p);
                }
                PathElement::Move(_) => {}
                PathElement::Arc(a) => a.transform(m),
                PathElement::Spline(s) => s.transform(m),
            }
        }
        self.changed();
    }

    fn reverse(&mut self) {
        self.elements = Self::reversed_elements(&self.elements);
        self.changed();
    }

    /// Same endpoint order as polylines: end to start, end to end, start to
    /// end, start to start. Accepts any path-like variant.
    fn concat(&mut self, other: &Shape, tolerance: f64) -> bool {
        let Some(mut theirs) = Self::elements_of(other) else {
            return false;
        };
        let (Some(s0), Some(s1)) = (self.cursor_start(), self.cursor_end()) else {
            return false;
        };
        let other_path = Self::from_parts(ShapeHeader::new(""), theirs.clone());
        let (Some(o0), Some(o1)) = (other_path.cursor_start(), other_path.cursor_end()) else {
            return false;
        };

        let mut joined;
        if s1.near(&o0, tolerance) {
            joined = std::mem::take(&mut self.elements);
            joined.extend(theirs);
        } else if s1.near(&o1, tolerance) {
            joined = std::mem::take(&mut self.elements);
            joined.extend(Self::reversed_elements(&theirs));
        } else if s0.near(&o1, tolerance) {
            joined = theirs;
            joined.append(&mut self.elements);
        } else if s0.near(&o0, tolerance) {
            theirs = Self::reversed_elements(&theirs);
            joined = theirs;
            joined.append(&mut self.elements);
        } else {
            return false;
        }
        self.elements = joined;
        self.drop_redundant_moves();
        self.changed();
        true
    }

    fn start_point(&self) -> Option<Point> {
        self.cursor_start()
    }

    fn end_point(&self) -> Option<Point> {
        self.cursor_end()
    }
}

impl DesignMixedPath {
    /// Straight moves that land on the current cursor add nothing.
    fn drop_redundant_moves(&mut self) {
        let mut cursor: Option<Point> = None;
        self.elements.retain(|e| {
            if let PathElement::Move(m) = e {
                if m.is_point() && cursor.is_some_and(|c| c.approx_eq(&m.point())) {
                    return false;
                }
            }
            if let Some(end) = e.end() {
                cursor = Some(end);
            }
            true
        });
    }
}
