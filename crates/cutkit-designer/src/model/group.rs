use nalgebra::Matrix3;

use super::{CamShape, Shape, ShapeHeader};
use crate::area::Area;
use crate::geometry::{Bounds, Point};
use crate::motion::Motion;
use cutkit_core::ShapeId;

/// Ordered, exclusively owned children.
///
/// Structural edits (add, insert, remove, replace, clear) mark the group
/// itself modified. Reaching a descendant through [`DesignGroup::find_mut`]
/// marks every group on the way as having a modified child. There are no
/// parent pointers: [`DesignGroup::parent_of`] searches from this group.
#[derive(Debug, Clone)]
pub struct DesignGroup {
    header: ShapeHeader,
    children: Vec<Shape>,
}

impl DesignGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(ShapeHeader::new(name), Vec::new())
    }

    pub(crate) fn from_parts(header: ShapeHeader, children: Vec<Shape>) -> Self {
        Self { header, children }
    }

    pub fn id(&self) -> ShapeId {
        self.header.id()
    }

    pub fn children(&self) -> &[Shape] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn children_mut_untracked(&mut self) -> &mut Vec<Shape> {
        &mut self.children
    }

    pub fn add(&mut self, shape: impl Into<Shape>) -> ShapeId {
        let shape = shape.into();
        let id = shape.id();
        self.children.push(shape);
        self.header.touch();
        id
    }

    pub fn insert(&mut self, index: usize, shape: impl Into<Shape>) -> bool {
        if index > self.children.len() {
            return false;
        }
        self.children.insert(index, shape.into());
        self.header.touch();
        true
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.header.touch();
    }

    /// Take the children out and leave the group empty.
    pub fn ungroup(&mut self) -> Vec<Shape> {
        self.header.touch();
        std::mem::take(&mut self.children)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.children.iter().any(|c| c.contains_id(id))
    }

    pub fn find(&self, id: ShapeId) -> Option<&Shape> {
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Mutable access to a descendant; the path to it is marked.
    pub fn find_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        let idx = self.children.iter().position(|c| c.contains_id(id))?;
        self.header.mark_child_modified();
        let child = &mut self.children[idx];
        if child.id() == id {
            return Some(child);
        }
        match child {
            Shape::Group(g) => g.find_mut(id),
            _ => None,
        }
    }

    /// Parent group id and index of `id` below this group.
    pub fn parent_of(&self, id: ShapeId) -> Option<(ShapeId, usize)> {
        for (i, child) in self.children.iter().enumerate() {
            if child.id() == id {
                return Some((self.id(), i));
            }
            if let Shape::Group(g) = child {
                if let Some(found) = g.parent_of(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// This group or a descendant group with `id`.
    pub fn group_mut(&mut self, id: ShapeId) -> Option<&mut DesignGroup> {
        if self.id() == id {
            return Some(self);
        }
        match self.find_mut(id)? {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn group(&self, id: ShapeId) -> Option<&DesignGroup> {
        if self.id() == id {
            return Some(self);
        }
        self.find(id).and_then(Shape::as_group)
    }

    /// Remove a descendant. The group that held it is marked modified.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        if let Some(idx) = self.children.iter().position(|c| c.id() == id) {
            self.header.touch();
            return Some(self.children.remove(idx));
        }
        let idx = self.children.iter().position(|c| c.contains_id(id))?;
        self.header.mark_child_modified();
        match &mut self.children[idx] {
            Shape::Group(g) => g.remove(id),
            _ => None,
        }
    }

    /// Swap the descendant with `id` for `shape`, returning the old one.
    pub fn replace(&mut self, id: ShapeId, shape: Shape) -> Result<Shape, Shape> {
        if let Some(idx) = self.children.iter().position(|c| c.id() == id) {
            self.header.touch();
            return Ok(std::mem::replace(&mut self.children[idx], shape));
        }
        let Some(idx) = self.children.iter().position(|c| c.contains_id(id)) else {
            return Err(shape);
        };
        self.header.mark_child_modified();
        match &mut self.children[idx] {
            Shape::Group(g) => g.replace(id, shape),
            _ => Err(shape),
        }
    }

    /// Insert into the group `parent` (this group or a descendant) at
    /// `index`, clamped to the end.
    pub fn insert_into(&mut self, parent: ShapeId, index: usize, shape: Shape) -> Result<(), Shape> {
        match self.group_mut(parent) {
            Some(g) => {
                let at = index.min(g.children.len());
                g.children.insert(at, shape);
                g.header.touch();
                Ok(())
            }
            None => Err(shape),
        }
    }

    /// Pre-order walk over every descendant.
    pub fn depth_first(&self) -> Vec<&Shape> {
        let mut out = Vec::new();
        fn walk<'a>(g: &'a DesignGroup, out: &mut Vec<&'a Shape>) {
            for c in &g.children {
                out.push(c);
                if let Shape::Group(inner) = c {
                    walk(inner, out);
                }
            }
        }
        walk(self, &mut out);
        out
    }

    /// Number of shapes below this group.
    pub fn shape_count(&self) -> usize {
        self.depth_first().len()
    }

    /// Bounds over enabled children only, recursively.
    pub fn enabled_bounds(&self) -> Bounds {
        self.children
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| match c {
                Shape::Group(g) => g.enabled_bounds(),
                other => other.bounds(),
            })
            .fold(Bounds::empty(), |acc, b| acc.union(&b))
    }

    /// Clear change flags here and below.
    pub fn clear_flags(&mut self) {
        self.header.clear_flags();
        for c in self.children.iter_mut() {
            c.clear_flags();
        }
    }

    /// Does anything here or below carry a change flag?
    pub fn has_changes(&self) -> bool {
        self.header.is_modified()
            || self.header.is_child_modified()
            || self.children.iter().any(|c| match c {
                Shape::Group(g) => g.has_changes(),
                other => other.is_modified(),
            })
    }

    pub fn set_children(&mut self, children: Vec<Shape>) {
        self.children = children;
        self.header.touch();
    }
}

impl CamShape for DesignGroup {
    fn header(&self) -> &ShapeHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ShapeHeader {
        &mut self.header
    }

    fn compute_points(&self) -> Vec<Point> {
        self.children
            .iter()
            .flat_map(|c| c.flat_points().iter().copied())
            .collect()
    }

    fn motions(&self) -> Vec<Motion> {
        self.children.iter().flat_map(|c| c.motions()).collect()
    }

    fn compute_bounds(&self) -> Bounds {
        self.children
            .iter()
            .fold(Bounds::empty(), |acc, c| acc.union(&c.bounds()))
    }

    fn compute_length(&self) -> f64 {
        let lengths: Vec<f64> = self
            .children
            .iter()
            .map(|c| c.length())
            .filter(|l| !l.is_nan())
            .collect();
        if lengths.is_empty() {
            f64::NAN
        } else {
            lengths.iter().sum()
        }
    }

    fn distance_to(&self, p: &Point) -> f64 {
        self.children
            .iter()
            .map(|c| c.distance_to(p))
            .fold(f64::INFINITY, f64::min)
    }

    fn closer_point(&self, p: &Point, max_dist: f64, exclude: Option<&Point>) -> Option<Point> {
        self.children
            .iter()
            .filter_map(|c| c.closer_point(p, max_dist, exclude))
            .min_by(|a, b| a.distance_to(p).total_cmp(&b.distance_to(p)))
    }

    fn offset_area_with(&self, distance: f64, tolerance: f64) -> Option<Area> {
        let areas: Vec<Area> = self
            .children
            .iter()
            .filter_map(|c| c.offset_area_with(distance, tolerance))
            .collect();
        if areas.is_empty() {
            None
        } else {
            Some(Area::union_all(areas))
        }
    }

    fn transform(&mut self, m: &Matrix3<f64>) {
        for c in self.children.iter_mut() {
            c.transform(m);
        }
        self.header.touch();
    }

    fn reverse(&mut self) {
        self.children.reverse();
        for c in self.children.iter_mut() {
            c.reverse();
        }
        self.header.touch();
    }

    fn start_point(&self) -> Option<Point> {
        self.children.iter().find_map(|c| c.start_point())
    }

    fn end_point(&self) -> Option<Point> {
        self.children.iter().rev().find_map(|c| c.end_point())
    }

    fn is_closed(&self) -> bool {
        false
    }
}
