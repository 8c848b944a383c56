//! Pocket clearing passes built from repeated offset areas.
//!
//! Each iteration takes the union of the offset areas of the current
//! boundary set and reads its rings back as closed loops. A loop survives
//! when it lies inside the outer boundary, is not swallowed by an island
//! (inner boundary) and does not retrace a ring that has already been cut.
//! Survivors become the next boundary set; the walk ends when nothing new
//! survives.

use crate::area::{ring_contains, Area, AreaLoop};
use crate::geometry::{segment_distance, Point};
use crate::model::{CamShape, DesignPolyline, Shape};
use cutkit_settings::GeometrySettings;

/// Upper bound on iterations when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 500;

/// Loops smaller than this fraction of `d²` are noise.
const MIN_LOOP_AREA_FACTOR: f64 = 0.01;

/// Two rings closer than this fraction of `d` everywhere are the same cut.
const RETRACE_FACTOR: f64 = 0.5;

/// Configuration for contour-parallel pocket generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PocketGenerator {
    pub tool_radius: f64,
    pub max_iterations: usize,
    /// Chord tolerance of the offset discs; derived from the tool radius
    /// when unset.
    pub tolerance: Option<f64>,
}

/// Clearing passes, outermost first.
#[derive(Debug, Clone, Default)]
pub struct PocketResult {
    pub passes: Vec<DesignPolyline>,
    pub iterations: usize,
}

impl PocketResult {
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn into_shapes(self) -> Vec<Shape> {
        self.passes.into_iter().map(Shape::from).collect()
    }
}

impl PocketGenerator {
    pub fn new(tool_radius: f64) -> Self {
        Self {
            tool_radius,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: None,
        }
    }

    /// Iteration cap and circle tolerance taken from the geometry settings.
    pub fn from_settings(tool_radius: f64, settings: &GeometrySettings) -> Self {
        Self::new(tool_radius)
            .with_max_iterations(settings.pocket_max_iterations)
            .with_tolerance(settings.circle_tolerance)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Non-positive values fall back to the radius-derived tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = (tolerance > 0.0).then_some(tolerance);
        self
    }

    /// By default coarser than the area default so repeated unions stay cheap.
    fn tolerance(&self) -> f64 {
        self.tolerance
            .unwrap_or_else(|| (self.tool_radius * 0.01).max(1e-3))
    }

    /// Generate passes inside `boundaries`.
    ///
    /// The first closed boundary is the outer one and every further closed
    /// boundary is an island. Open shapes are ignored. The result depends on
    /// which closed shape comes first.
    pub fn generate(&self, boundaries: &[Shape]) -> PocketResult {
        let d = self.tool_radius;
        if !(d > 0.0) {
            tracing::warn!("pocket generation skipped: tool radius {} is not positive", d);
            return PocketResult::default();
        }

        let mut closed = boundaries
            .iter()
            .filter(|s| s.is_closed())
            .map(|s| s.flat_points().to_vec());
        let Some(outer) = closed.next() else {
            tracing::debug!("pocket generation skipped: no closed boundary");
            return PocketResult::default();
        };
        let holes: Vec<Vec<Point>> = closed.collect();

        let mut cut: Vec<Vec<Point>> = std::iter::once(outer.clone())
            .chain(holes.iter().cloned())
            .collect();
        let mut current = cut.clone();
        let mut result = PocketResult::default();

        while !current.is_empty() {
            if result.iterations >= self.max_iterations {
                tracing::warn!(
                    "pocket generation stopped after {} iterations with {} open loops",
                    result.iterations,
                    current.len()
                );
                break;
            }
            result.iterations += 1;

            let areas: Vec<Area> = current
                .iter()
                .filter_map(|ring| Area::offset_polyline(ring, d, self.tolerance()))
                .collect();
            let merged = Area::union_all(areas);

            let mut survivors: Vec<Vec<Point>> = Vec::new();
            for lp in merged.loops() {
                if !self.keeps(&lp, &outer, &holes) {
                    continue;
                }
                let retraced = cut
                    .iter()
                    .chain(survivors.iter())
                    .any(|known| retraces(&lp.points, known, d * RETRACE_FACTOR));
                if !retraced {
                    survivors.push(lp.points);
                }
            }

            tracing::debug!(
                "pocket iteration {}: {} new loops",
                result.iterations,
                survivors.len()
            );
            for (i, ring) in survivors.iter().enumerate() {
                let name = format!("Pocket {}.{}", result.iterations, i + 1);
                result.passes.push(DesignPolyline::from_points(name, ring));
            }
            cut.extend(survivors.iter().cloned());
            current = survivors;
        }

        result
    }

    /// Inside the outer boundary, not inside an island and not negligible.
    fn keeps(&self, lp: &AreaLoop, outer: &[Point], holes: &[Vec<Point>]) -> bool {
        let d = self.tool_radius;
        if lp.area() < MIN_LOOP_AREA_FACTOR * d * d {
            return false;
        }
        if !lp.points.iter().all(|p| ring_contains(outer, p)) {
            return false;
        }
        !holes
            .iter()
            .any(|hole| lp.points.iter().all(|p| ring_contains(hole, p)))
    }
}

/// Every vertex of `ring` lies within `tolerance` of `known`.
fn retraces(ring: &[Point], known: &[Point], tolerance: f64) -> bool {
    ring.iter().all(|p| {
        known
            .windows(2)
            .any(|w| segment_distance(p, &w[0], &w[1]) <= tolerance)
    })
}
