//! Process-wide shape identity counter.
//!
//! Every shape receives a unique, monotonically increasing id when it is
//! created. Ids are not written to documents; a loaded shape gets a fresh
//! id from the same counter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a shape inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeId(pub u64);

impl ShapeId {
    /// Allocate the next id from the global counter.
    pub fn next() -> Self {
        ShapeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reset the counter so the next allocated id is `start`.
///
/// Only meant for process start-up and tests; resetting below ids that are
/// still alive produces duplicates.
pub fn init_ids(start: u64) {
    let start = start.max(1);
    NEXT_ID.store(start, Ordering::SeqCst);
    tracing::debug!("Shape id counter reset to {}", start);
}

/// Peek at the id the counter will hand out next.
pub fn peek_next_id() -> u64 {
    NEXT_ID.load(Ordering::SeqCst)
}
