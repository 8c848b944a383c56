//! Shape model.
//!
//! Every variant implements [`CamShape`]; [`Shape`] is the closed set of
//! variants a document can hold, dispatching by `match`. Derived values
//! (flattened points, bounds, length) are cached in the shape header and
//! dropped by every mutation.

use crate::area::{Area, DEFAULT_CIRCLE_TOLERANCE};
use crate::geometry::{
    path_length, rotation_about, scale_about, segment_distance, translation, Bounds, Point,
};
use crate::motion::Motion;
use crate::properties::EngravingProperties;
use cutkit_core::ShapeId;
use nalgebra::Matrix3;
use std::sync::OnceLock;

mod arc;
mod drill;
mod group;
mod mixed;
mod pocket3d;
mod polyline;
mod spline;
mod text;

pub use arc::DesignArc;
pub use drill::DesignDrill;
pub use group::DesignGroup;
pub use mixed::{DesignMixedPath, PathElement};
pub use pocket3d::{DesignCylinderPocket, DesignSpherePocket};
pub use polyline::DesignPolyline;
pub use spline::DesignSpline;
pub use text::{DesignTextPath, Glyph, GlyphOutliner};

#[derive(Debug, Clone, Default)]
struct ShapeCache {
    points: OnceLock<Vec<Point>>,
    bounds: OnceLock<Bounds>,
    length: OnceLock<f64>,
}

/// Identity, name, properties and change tracking shared by all variants.
#[derive(Debug, Clone)]
pub struct ShapeHeader {
    id: ShapeId,
    name: String,
    properties: EngravingProperties,
    modified: bool,
    child_modified: bool,
    cache: ShapeCache,
}

impl ShapeHeader {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ShapeId::next(), name)
    }

    pub fn with_id(id: ShapeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            properties: EngravingProperties::unset(),
            modified: false,
            child_modified: false,
            cache: ShapeCache::default(),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &EngravingProperties {
        &self.properties
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.modified = true;
    }

    pub fn set_properties(&mut self, properties: EngravingProperties) {
        self.properties = properties;
        self.modified = true;
    }

    /// The shape's own geometry or structure changed.
    pub fn touch(&mut self) {
        self.modified = true;
        self.invalidate();
    }

    /// Something below this group changed.
    pub fn mark_child_modified(&mut self) {
        self.child_modified = true;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.cache = ShapeCache::default();
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_child_modified(&self) -> bool {
        self.child_modified
    }

    pub fn clear_flags(&mut self) {
        self.modified = false;
        self.child_modified = false;
    }

    pub(crate) fn reassign_id(&mut self) {
        self.id = ShapeId::next();
    }
}

/// Geometry contract shared by every shape variant.
pub trait CamShape {
    fn header(&self) -> &ShapeHeader;
    fn header_mut(&mut self) -> &mut ShapeHeader;

    /// Flattened point sequence, uncached.
    fn compute_points(&self) -> Vec<Point>;

    /// Native motion list: what is written to documents and streamed.
    fn motions(&self) -> Vec<Motion>;

    fn transform(&mut self, m: &Matrix3<f64>);

    fn reverse(&mut self);

    /// Absorb `other` when an endpoint matches within `tolerance`.
    fn concat(&mut self, _other: &Shape, _tolerance: f64) -> bool {
        false
    }

    /// Fixed-topology shapes refuse point edits.
    fn insert_point(&mut self, _index: usize, _p: Point) -> bool {
        false
    }

    fn remove_point(&mut self, _index: usize) -> bool {
        false
    }

    fn move_point(&mut self, _index: usize, _p: Point) -> bool {
        false
    }

    /// Cached flattened points. The returned slice is finite and can be
    /// iterated any number of times.
    fn flat_points(&self) -> &[Point] {
        self.header()
            .cache
            .points
            .get_or_init(|| self.compute_points())
    }

    /// Consecutive pairs of flattened points.
    fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.flat_points().windows(2).map(|w| (w[0], w[1]))
    }

    fn compute_bounds(&self) -> Bounds {
        Bounds::from_points(self.flat_points())
    }

    fn bounds(&self) -> Bounds {
        *self
            .header()
            .cache
            .bounds
            .get_or_init(|| self.compute_bounds())
    }

    fn compute_length(&self) -> f64 {
        let pts = self.flat_points();
        if pts.len() < 2 {
            f64::NAN
        } else {
            path_length(pts)
        }
    }

    /// Total path length; NaN for fewer than two points.
    fn length(&self) -> f64 {
        *self
            .header()
            .cache
            .length
            .get_or_init(|| self.compute_length())
    }

    /// Minimum distance from `p` to the outline; +∞ for a non-finite point.
    fn distance_to(&self, p: &Point) -> f64 {
        if !p.is_finite() {
            return f64::INFINITY;
        }
        let pts = self.flat_points();
        match pts.len() {
            0 => f64::INFINITY,
            1 => p.distance_to(&pts[0]),
            _ => pts
                .windows(2)
                .map(|w| segment_distance(p, &w[0], &w[1]))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Nearest vertex within `max_dist` of `p`, skipping `exclude`.
    fn closer_point(&self, p: &Point, max_dist: f64, exclude: Option<&Point>) -> Option<Point> {
        if !p.is_finite() {
            return None;
        }
        nearest_vertex(self.flat_points(), p, max_dist, exclude)
    }

    fn offset_area_with(&self, distance: f64, tolerance: f64) -> Option<Area> {
        Area::offset_polyline(self.flat_points(), distance, tolerance)
    }

    /// Union of capsules of radius `distance`; `None` below two points.
    fn offset_area(&self, distance: f64) -> Option<Area> {
        self.offset_area_with(distance, DEFAULT_CIRCLE_TOLERANCE)
    }

    /// Simplified flattened copy as a polyline.
    fn flatten(&self) -> DesignPolyline {
        DesignPolyline::from_points(self.header().name(), self.flat_points())
    }

    fn start_point(&self) -> Option<Point> {
        self.flat_points().first().copied()
    }

    fn end_point(&self) -> Option<Point> {
        self.flat_points().last().copied()
    }

    /// First and last point coincide within epsilon.
    fn is_closed(&self) -> bool {
        let pts = self.flat_points();
        pts.len() >= 3 && pts[0].approx_eq(&pts[pts.len() - 1])
    }

    fn point_count(&self) -> usize {
        self.flat_points().len()
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.transform(&translation(dx, dy));
    }

    /// Rotate by `angle` radians about `center`.
    fn rotate(&mut self, angle: f64, center: Point) {
        self.transform(&rotation_about(angle, &center));
    }

    fn scale(&mut self, sx: f64, sy: f64, center: Point) {
        self.transform(&scale_about(sx, sy, &center));
    }
}

pub(crate) fn nearest_vertex(
    points: &[Point],
    p: &Point,
    max_dist: f64,
    exclude: Option<&Point>,
) -> Option<Point> {
    let mut best: Option<(f64, Point)> = None;
    for v in points {
        if exclude.is_some_and(|e| e.approx_eq(v)) {
            continue;
        }
        let d = v.distance_to(p);
        if d <= max_dist && best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, *v));
        }
    }
    best.map(|(_, v)| v)
}

#[derive(Debug, Clone)]
pub enum Shape {
    Polyline(DesignPolyline),
    Arc(DesignArc),
    Spline(DesignSpline),
    MixedPath(DesignMixedPath),
    Group(DesignGroup),
    Drill(DesignDrill),
    CylinderPocket(DesignCylinderPocket),
    SpherePocket(DesignSpherePocket),
    TextPath(DesignTextPath),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Shape::Polyline($s) => $body,
            Shape::Arc($s) => $body,
            Shape::Spline($s) => $body,
            Shape::MixedPath($s) => $body,
            Shape::Group($s) => $body,
            Shape::Drill($s) => $body,
            Shape::CylinderPocket($s) => $body,
            Shape::SpherePocket($s) => $body,
            Shape::TextPath($s) => $body,
        }
    };
}

impl CamShape for Shape {
    fn header(&self) -> &ShapeHeader {
        dispatch!(self, s => s.header())
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        dispatch!(self, s => s.header_mut())
    }

    fn compute_points(&self) -> Vec<Point> {
        dispatch!(self, s => s.compute_points())
    }

    fn motions(&self) -> Vec<Motion> {
        dispatch!(self, s => s.motions())
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        dispatch!(self, s => s.transform(m))
    }

    fn reverse(&mut self) {
        dispatch!(self, s => s.reverse())
    }

    fn concat(&mut self, other: &Shape, tolerance: f64) -> bool {
        dispatch!(self, s => s.concat(other, tolerance))
    }

    fn insert_point(&mut self, index: usize, p: Point) -> bool {
        dispatch!(self, s => s.insert_point(index, p))
    }

    fn remove_point(&mut self, index: usize) -> bool {
        dispatch!(self, s => s.remove_point(index))
    }

    fn move_point(&mut self, index: usize, p: Point) -> bool {
        dispatch!(self, s => s.move_point(index, p))
    }

    fn flat_points(&self) -> &[Point] {
        dispatch!(self, s => s.flat_points())
    }

    fn bounds(&self) -> Bounds {
        dispatch!(self, s => s.bounds())
    }

    fn length(&self) -> f64 {
        dispatch!(self, s => s.length())
    }

    fn distance_to(&self, p: &Point) -> f64 {
        dispatch!(self, s => s.distance_to(p))
    }

    fn closer_point(&self, p: &Point, max_dist: f64, exclude: Option<&Point>) -> Option<Point> {
        dispatch!(self, s => s.closer_point(p, max_dist, exclude))
    }

    fn offset_area_with(&self, distance: f64, tolerance: f64) -> Option<Area> {
        dispatch!(self, s => s.offset_area_with(distance, tolerance))
    }

    fn flatten(&self) -> DesignPolyline {
        dispatch!(self, s => s.flatten())
    }

    fn start_point(&self) -> Option<Point> {
        dispatch!(self, s => s.start_point())
    }

    fn end_point(&self) -> Option<Point> {
        dispatch!(self, s => s.end_point())
    }

    fn is_closed(&self) -> bool {
        dispatch!(self, s => s.is_closed())
    }
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        self.header().id()
    }

    pub fn name(&self) -> &str {
        self.header().name()
    }

    pub fn properties(&self) -> &EngravingProperties {
        self.header().properties()
    }

    pub fn set_properties(&mut self, properties: EngravingProperties) {
        self.header_mut().set_properties(properties);
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.header_mut().set_name(name);
    }

    pub fn is_enabled(&self) -> bool {
        self.properties().enabled
    }

    /// Header discriminant used by the document format.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Polyline(_) => "Polyline",
            Shape::Arc(_) => "Arc",
            Shape::Spline(_) => "Spline",
            Shape::MixedPath(_) => "MixedPath",
            Shape::Group(_) => "Group",
            Shape::Drill(_) => "Drill",
            Shape::CylinderPocket(_) => "CylinderPocket",
            Shape::SpherePocket(_) => "SpherePocket",
            Shape::TextPath(_) => "TextPath",
        }
    }

    /// Drill points, parametric pockets and text keep their topology.
    pub fn is_fixed_topology(&self) -> bool {
        matches!(
            self,
            Shape::Drill(_)
                | Shape::CylinderPocket(_)
                | Shape::SpherePocket(_)
                | Shape::TextPath(_)
        )
    }

    pub fn as_group(&self) -> Option<&DesignGroup> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut DesignGroup> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    /// `id` is this shape or somewhere below it.
    pub fn contains_id(&self, id: ShapeId) -> bool {
        self.id() == id || self.as_group().is_some_and(|g| g.contains(id))
    }

    /// Find `id` in this shape's subtree, including the shape itself.
    pub fn find(&self, id: ShapeId) -> Option<&Shape> {
        if self.id() == id {
            return Some(self);
        }
        self.as_group().and_then(|g| g.find(id))
    }

    pub fn is_modified(&self) -> bool {
        self.header().is_modified()
    }

    /// Clear change flags on this shape and everything below it.
    pub fn clear_flags(&mut self) {
        self.header_mut().clear_flags();
        if let Shape::Group(g) = self {
            g.clear_flags();
        }
    }

    /// Deep copy with fresh ids throughout.
    pub fn clone_with_new_id(&self) -> Shape {
        let mut copy = self.clone();
        copy.reassign_ids();
        copy
    }

    fn reassign_ids(&mut self) {
        self.header_mut().reassign_id();
        if let Shape::Group(g) = self {
            for child in g.children_mut_untracked() {
                child.reassign_ids();
            }
        }
    }

    /// Join two open paths into one shape.
    ///
    /// Tries `a.concat(b)` first; variants that cannot absorb each other
    /// are combined as a mixed path. `None` when no endpoints meet or a
    /// group/fixed-topology shape is involved.
    pub fn join(a: &Shape, b: &Shape, tolerance: f64) -> Option<Shape> {
        let mut joined = a.clone();
        if joined.concat(b, tolerance) {
            return Some(joined);
        }
        let mut mixed = DesignMixedPath::from_shape(a)?;
        if mixed.concat(b, tolerance) {
            Some(Shape::MixedPath(mixed))
        } else {
            None
        }
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Shape {
                fn from(s: $ty) -> Self {
                    Shape::$variant(s)
                }
            }
        )*
    };
}

impl_from_variant!(
    Polyline => DesignPolyline,
    Arc => DesignArc,
    Spline => DesignSpline,
    MixedPath => DesignMixedPath,
    Group => DesignGroup,
    Drill => DesignDrill,
    CylinderPocket => DesignCylinderPocket,
    SpherePocket => DesignSpherePocket,
    TextPath => DesignTextPath,
);
