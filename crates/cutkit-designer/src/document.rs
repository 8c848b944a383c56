//! The document: a root group plus its undo history.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;

use crate::history::{History, HistoryOutcome, DEFAULT_MAX_DEPTH};
use crate::model::{CamShape, DesignGroup, Shape};
use crate::serialization::{read_from, write_document, ShapeRegistry};
use cutkit_core::ShapeId;
use cutkit_settings::GeometrySettings;

/// A document shared between the editing context and an execution worker.
pub type SharedDocument = Arc<RwLock<Document>>;

#[derive(Debug)]
pub struct Document {
    root: DesignGroup,
    path: Option<PathBuf>,
    history: History,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_root(DesignGroup::new("root"))
    }

    pub fn from_root(mut root: DesignGroup) -> Self {
        let history = History::new(&mut root, DEFAULT_MAX_DEPTH);
        Self {
            root,
            path: None,
            history,
        }
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> &DesignGroup {
        &self.root
    }

    /// Direct access for structural edits. Call [`Document::save_point`]
    /// afterwards to make them undoable.
    pub fn root_mut(&mut self) -> &mut DesignGroup {
        &mut self.root
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Swap in a new tree; history starts over.
    pub fn replace_root(&mut self, root: DesignGroup) {
        self.root = root;
        self.history.clear(&mut self.root);
    }

    pub fn from_reader<R: BufRead>(input: R) -> cutkit_core::Result<Self> {
        Self::from_reader_with(input, &ShapeRegistry::default())
    }

    pub fn from_reader_with<R: BufRead>(input: R, registry: &ShapeRegistry) -> cutkit_core::Result<Self> {
        Ok(Self::from_root(read_from(input, registry)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open document {}", path.display()))?;
        let mut doc = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to read document {}", path.display()))?;
        tracing::info!(
            "loaded {} ({} shapes)",
            path.display(),
            doc.shape_count()
        );
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    pub fn to_text(&self) -> String {
        write_document(&self.root)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_text())
            .with_context(|| format!("Failed to write document {}", path.display()))?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn shape_count(&self) -> usize {
        self.root.shape_count()
    }

    pub fn find(&self, id: ShapeId) -> Option<&Shape> {
        self.root.find(id)
    }

    pub fn parent_of(&self, id: ShapeId) -> Option<(ShapeId, usize)> {
        self.root.parent_of(id)
    }

    /// Append to the group `parent`, or to the root when `None`.
    pub fn add_shape(&mut self, parent: Option<ShapeId>, shape: impl Into<Shape>) -> Option<ShapeId> {
        let shape = shape.into();
        let id = shape.id();
        let parent = parent.unwrap_or_else(|| self.root.id());
        self.root.insert_into(parent, usize::MAX, shape).ok()?;
        Some(id)
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        self.root.remove(id)
    }

    /// Run `f` on the shape with `id`, marking the path to it.
    pub fn edit<R>(&mut self, id: ShapeId, f: impl FnOnce(&mut Shape) -> R) -> Option<R> {
        self.root.find_mut(id).map(f)
    }

    /// Join `b` onto `a` within the configured join tolerance. `a` is
    /// replaced by the joined shape and `b` removed. `None` when the two
    /// do not meet.
    pub fn join_shapes(&mut self, a: ShapeId, b: ShapeId, settings: &GeometrySettings) -> Option<ShapeId> {
        if a == b {
            return None;
        }
        let joined = Shape::join(self.find(a)?, self.find(b)?, settings.join_tolerance)?;
        let id = joined.id();
        self.root.replace(a, joined).ok()?;
        self.root.remove(b);
        Some(id)
    }

    /// Simplify every polyline with the configured tolerance and minimum
    /// angle. Returns the number of points removed.
    pub fn simplify_polylines(&mut self, settings: &GeometrySettings) -> usize {
        let ids: Vec<ShapeId> = self
            .root
            .depth_first()
            .into_iter()
            .filter(|s| matches!(s, Shape::Polyline(_)))
            .map(|s| s.id())
            .collect();
        ids.into_iter()
            .filter_map(|id| {
                self.edit(id, |s| match s {
                    Shape::Polyline(p) => {
                        p.simplify(settings.simplify_tolerance, settings.simplify_min_angle_deg)
                    }
                    _ => 0,
                })
            })
            .sum()
    }

    pub fn save_point(&mut self, edited: Option<ShapeId>) -> bool {
        self.history.save_point(&mut self.root, edited)
    }

    pub fn undo(&mut self) -> Option<HistoryOutcome> {
        self.history.undo(&mut self.root)
    }

    pub fn redo(&mut self) -> Option<HistoryOutcome> {
        self.history.redo(&mut self.root)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Bounds of everything that will be cut.
    pub fn enabled_bounds(&self) -> crate::geometry::Bounds {
        self.root.enabled_bounds()
    }

    pub fn name(&self) -> &str {
        self.root.header().name()
    }
}
