//! # CutKit Communication
//!
//! The machine side of CutKit: the controller contract the engine streams
//! into, two controllers (an in-memory simulator and a file sink), the
//! command file logger, listener dispatch, and the execution engine that
//! walks a live document and turns it into a flow-controlled command stream.

pub mod controller;
pub mod executor;
pub mod listener;
pub mod logger;

pub use controller::{GcodeFileController, MachineController, SimulatedController};
pub use executor::{ExecutionReport, ExecutionSnapshot, Executor};
pub use listener::{ExecutionListener, ListenerDispatcher};
pub use logger::CommandLogger;
