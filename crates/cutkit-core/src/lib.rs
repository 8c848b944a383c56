//! # CutKit Core
//!
//! Core types and utilities for CutKit.
//! Provides the error taxonomy, the process-wide shape identity counter,
//! and the controller-facing state shared by the designer and the
//! execution engine.

pub mod constants;
pub mod data;
pub mod error;
pub mod ids;
pub mod units;

pub use constants::{approx_eq, EPSILON};
pub use data::{ControllerState, ParserState};
pub use error::{ControllerError, Error, ExecutionError, FormatError, Result};
pub use ids::{init_ids, peek_next_id, ShapeId};
pub use units::MeasurementSystem;
