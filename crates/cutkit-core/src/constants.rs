//! Numeric constants shared by the geometry and execution layers.

/// Two coordinates closer than this are the same point.
pub const EPSILON: f64 = 1e-5;

/// Angular lengths (degrees) within this margin of 0 or 360 denote a full circle.
pub const FULL_CIRCLE_TOLERANCE_DEG: f64 = 0.0001;

/// Minimum number of segments used when flattening any arc.
pub const MIN_ARC_SEGMENTS: usize = 12;

/// Default queue depth above which the executor stops pushing commands.
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 3;

/// Default sleep between controller queue polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

/// Default retract height for rapid moves.
pub const DEFAULT_SAFE_Z: f64 = 5.0;

/// Returns `true` if two values are equal within [`EPSILON`].
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}
