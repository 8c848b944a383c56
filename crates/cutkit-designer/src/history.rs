//! Undo/redo over the shape tree.
//!
//! A save point stores clones of whatever carries a change flag. When the
//! root itself was edited the whole tree is stored once instead. The first
//! record is always a full baseline, so every partial record has something
//! older to fall back on.

use crate::model::{CamShape, DesignGroup, Shape};
use cutkit_core::ShapeId;

pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Clone of one shape at a save point, tagged with where it lived.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub live_id: ShapeId,
    pub parent: Option<ShapeId>,
    pub index: usize,
    pub shape: Shape,
}

#[derive(Debug, Clone)]
struct UndoRecord {
    edited: Option<ShapeId>,
    entries: Vec<Snapshot>,
    full: bool,
}

impl UndoRecord {
    fn full(root: &DesignGroup, edited: Option<ShapeId>) -> Self {
        Self {
            edited,
            entries: vec![Snapshot {
                live_id: root.id(),
                parent: None,
                index: 0,
                shape: Shape::Group(root.clone()),
            }],
            full: true,
        }
    }

    fn root_snapshot(&self) -> Option<&DesignGroup> {
        if !self.full {
            return None;
        }
        self.entries.first().and_then(|e| e.shape.as_group())
    }
}

/// What an undo or redo changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryOutcome {
    pub edited: Option<ShapeId>,
    pub restored: Vec<ShapeId>,
    pub removed: Vec<ShapeId>,
    pub full: bool,
}

/// Linear undo stack with a current position.
#[derive(Debug, Clone)]
pub struct History {
    records: Vec<UndoRecord>,
    position: usize,
    max_depth: usize,
}

impl History {
    /// Start a history with `root` as the baseline. Clears change flags.
    pub fn new(root: &mut DesignGroup, max_depth: usize) -> Self {
        root.clear_flags();
        Self {
            records: vec![UndoRecord::full(root, None)],
            position: 0,
            max_depth: max_depth.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position + 1 < self.records.len()
    }

    pub fn undo_depth(&self) -> usize {
        self.position
    }

    pub fn redo_depth(&self) -> usize {
        self.records.len() - 1 - self.position
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop every record and take `root` as the new baseline.
    pub fn clear(&mut self, root: &mut DesignGroup) {
        root.clear_flags();
        self.records = vec![UndoRecord::full(root, None)];
        self.position = 0;
    }

    /// Capture everything flagged since the last save point.
    ///
    /// Returns false when nothing was flagged, or when only ancestor marks
    /// were left behind by a lookup that changed nothing; those marks are
    /// cleared. Otherwise redo entries past the current position are
    /// discarded.
    pub fn save_point(&mut self, root: &mut DesignGroup, edited: Option<ShapeId>) -> bool {
        if !root.has_changes() {
            return false;
        }

        let record = if root.header().is_modified() {
            UndoRecord::full(root, edited)
        } else {
            let mut entries = Vec::new();
            collect_modified(root, &mut entries);
            if entries.is_empty() {
                root.clear_flags();
                return false;
            }
            UndoRecord {
                edited,
                entries,
                full: false,
            }
        };
        self.records.truncate(self.position + 1);
        tracing::debug!(
            "save point {}: {} entries{}",
            self.records.len(),
            record.entries.len(),
            if record.full { " (full)" } else { "" }
        );
        root.clear_flags();
        self.records.push(record);
        self.position = self.records.len() - 1;
        self.trim();
        true
    }

    pub fn undo(&mut self, root: &mut DesignGroup) -> Option<HistoryOutcome> {
        if !self.can_undo() {
            return None;
        }
        let current = self.position;
        let record = &self.records[current];
        let mut outcome = HistoryOutcome {
            edited: record.edited,
            full: record.full,
            ..Default::default()
        };

        if record.full {
            let base = (0..current)
                .rev()
                .find(|&i| self.records[i].full)
                .unwrap_or(0);
            if let Some(snapshot) = self.records[base].root_snapshot() {
                *root = snapshot.clone();
            }
            for later in &self.records[base + 1..current] {
                apply_forward(root, later);
            }
            outcome.restored.push(root.id());
        } else {
            for entry in record.entries.iter().rev() {
                match self.previous_version(current, entry.live_id) {
                    Some(previous) => {
                        restore(root, entry, previous);
                        outcome.restored.push(entry.live_id);
                    }
                    None => {
                        // no earlier version: the shape was created after
                        // the last save point
                        root.remove(entry.live_id);
                        outcome.removed.push(entry.live_id);
                    }
                }
            }
        }

        root.clear_flags();
        self.position -= 1;
        Some(outcome)
    }

    pub fn redo(&mut self, root: &mut DesignGroup) -> Option<HistoryOutcome> {
        if !self.can_redo() {
            return None;
        }
        self.position += 1;
        let record = &self.records[self.position];
        apply_forward(root, record);
        root.clear_flags();
        let restored = if record.full {
            vec![root.id()]
        } else {
            record.entries.iter().map(|e| e.live_id).collect()
        };
        Some(HistoryOutcome {
            edited: record.edited,
            restored,
            removed: Vec::new(),
            full: record.full,
        })
    }

    /// Newest version of `id` captured before record `before`, looking
    /// inside group snapshots and stopping at the first full record.
    fn previous_version(&self, before: usize, id: ShapeId) -> Option<Shape> {
        for record in self.records[..before].iter().rev() {
            for entry in record.entries.iter().rev() {
                if let Some(found) = entry.shape.find(id) {
                    return Some(found.clone());
                }
            }
            if record.full {
                break;
            }
        }
        None
    }

    /// Fold the oldest records into the baseline until within depth.
    fn trim(&mut self) {
        while self.records.len() > self.max_depth + 1 {
            let Some(mut base) = self.records[0].root_snapshot().cloned() else {
                break;
            };
            apply_forward(&mut base, &self.records[1]);
            let edited = self.records[1].edited;
            self.records[1] = UndoRecord::full(&base, edited);
            self.records.remove(0);
            self.position = self.position.saturating_sub(1);
        }
    }
}

fn collect_modified(group: &DesignGroup, out: &mut Vec<Snapshot>) {
    for (index, child) in group.children().iter().enumerate() {
        if child.is_modified() {
            out.push(Snapshot {
                live_id: child.id(),
                parent: Some(group.id()),
                index,
                shape: child.clone(),
            });
        } else if let Shape::Group(g) = child {
            if g.has_changes() {
                collect_modified(g, out);
            }
        }
    }
}

fn apply_forward(root: &mut DesignGroup, record: &UndoRecord) {
    if let Some(snapshot) = record.root_snapshot() {
        *root = snapshot.clone();
        return;
    }
    for entry in &record.entries {
        restore(root, entry, entry.shape.clone());
    }
}

/// Put `shape` in place of the live shape with the entry's id, or back
/// where the entry says it lived when the live one is gone.
fn restore(root: &mut DesignGroup, entry: &Snapshot, shape: Shape) {
    let Err(shape) = root.replace(entry.live_id, shape) else {
        return;
    };
    let parent = entry.parent.unwrap_or_else(|| root.id());
    if let Err(shape) = root.insert_into(parent, entry.index, shape) {
        tracing::debug!("parent {} gone, restoring {} at the root", parent, entry.live_id);
        root.add(shape);
    }
}
