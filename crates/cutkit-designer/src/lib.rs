//! # CutKit Designer
//!
//! The geometry side of CutKit: a document of 2D shapes, the machining
//! properties attached to them and the CAM operations that work on them.
//!
//! ## Core Components
//!
//! - **Motion**: one rapid/feed/arc/spline/drill command, the unit every
//!   shape is written and streamed in
//! - **Shapes**: polylines, arcs, Bézier splines, mixed paths, groups, drill
//!   points, cylindrical and spherical pockets, text on a path
//! - **Properties**: per-shape feed, power, pass schedule with inheritance
//! - **Pocket Operations**: concentric clearing passes from offset areas
//! - **Optimizer**: travel ordering of sibling shapes
//! - **History**: undo/redo save points over the shape tree
//! - **Serialization**: the line-oriented document format
//!
//! ## Architecture
//!
//! ```text
//! Document
//!   ├── DesignGroup (root)
//!   │     └── Shape (Polyline | Arc | Spline | MixedPath | Group | ...)
//!   │           ├── ShapeHeader (id, name, EngravingProperties, flags, cache)
//!   │           └── Motion list
//!   └── History (save points)
//!
//! Operations (PocketGenerator, TravelOptimizer) take shapes and return
//! new shapes; they never mutate the document themselves.
//! ```

pub mod area;
pub mod document;
pub mod geometry;
pub mod history;
pub mod model;
pub mod motion;
pub mod optimizer;
pub mod pocket_operations;
pub mod properties;
pub mod serialization;

pub use area::{Area, AreaLoop};
pub use document::{Document, SharedDocument};
pub use geometry::{Bounds, Point};
pub use history::{History, HistoryOutcome};
pub use model::{
    CamShape, DesignArc, DesignCylinderPocket, DesignDrill, DesignGroup, DesignMixedPath,
    DesignPolyline, DesignSpherePocket, DesignSpline, DesignTextPath, Glyph, GlyphOutliner,
    PathElement, Shape, ShapeHeader,
};
pub use motion::{format_number, Motion, MotionKind};
pub use optimizer::{travel_length, OptimizedOrder, TravelOptimizer};
pub use pocket_operations::{PocketGenerator, PocketResult};
pub use properties::EngravingProperties;
pub use serialization::{read_document, write_document, ShapeRegistry};
