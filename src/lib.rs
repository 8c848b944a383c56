//! # CutKit
//!
//! A CAM geometry engine: layered 2D vector documents in, multi-pass
//! machine tool-paths out.
//!
//! ## Architecture
//!
//! CutKit is organized as a workspace with multiple crates:
//!
//! 1. **cutkit-core** - Error taxonomy, shape ids, controller and parser state
//! 2. **cutkit-designer** - Shapes, properties, offsets, pockets, travel optimizer, undo/redo, document format
//! 3. **cutkit-settings** - Configuration files
//! 4. **cutkit-communication** - Controller contract, command logging, execution engine
//! 5. **cutkit** - This crate: re-exports, logging setup, and the `cutkit` binary
//!
//! ```text
//!  Document ──(SharedDocument)──▶ Executor ──push/poll──▶ MachineController
//!     │                              │
//!  History, TravelOptimizer      ListenerDispatcher ──▶ ExecutionListener
//! ```

pub use cutkit_communication as communication;
pub use cutkit_core as core;
pub use cutkit_designer as designer;
pub use cutkit_settings as settings;

pub use cutkit_core::{
    ControllerError, ControllerState, Error, ExecutionError, FormatError, MeasurementSystem,
    ParserState, Result, ShapeId,
};

pub use cutkit_designer::{
    CamShape, DesignArc, DesignCylinderPocket, DesignDrill, DesignGroup, DesignMixedPath,
    DesignPolyline, DesignSpherePocket, DesignSpline, DesignTextPath, Document,
    EngravingProperties, History, Motion, PocketGenerator, Point, Shape, ShapeRegistry,
    SharedDocument, TravelOptimizer,
};

pub use cutkit_communication::{
    CommandLogger, ExecutionListener, ExecutionReport, ExecutionSnapshot, Executor,
    GcodeFileController, MachineController, SimulatedController,
};

pub use cutkit_settings::{Config, ExecutionSettings, GeometrySettings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, so a command stream on stdout stays clean
/// - RUST_LOG environment variable support, INFO by default
/// - Targets, thread names and line numbers on every event
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
