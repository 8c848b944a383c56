//! Controller contract consumed by the execution engine.
//!
//! The engine is the only producer of commands while a run is active. It
//! reads the queue depth before every push and keeps the parser state
//! current by writing it back after each accepted command.

mod file;
mod simulated;

pub use file::GcodeFileController;
pub use simulated::SimulatedController;

use cutkit_core::{ControllerError, ControllerState, ParserState};
use std::path::Path;

/// A machine controller the executor can stream commands into.
///
/// Every method takes `&self`; implementations guard their own state so a
/// controller can be shared between the executor thread and the caller.
pub trait MachineController: Send + Sync {
    /// Enqueue one command line for transmission.
    fn push_command(&self, command: &str) -> Result<(), ControllerError>;

    /// Commands accepted but not yet consumed by the machine.
    fn waiting_queue_size(&self) -> usize;

    fn is_connected(&self) -> bool;

    fn state(&self) -> ControllerState;

    /// Nothing left in the queue and the machine reports idle.
    fn is_idle(&self) -> bool {
        self.waiting_queue_size() == 0 && self.state() == ControllerState::Idle
    }

    /// Last-known modal state of the command parser.
    fn parser_state(&self) -> ParserState;

    fn update_parser_state(&self, state: ParserState);

    fn start_file_logger(&self, path: &Path) -> Result<(), ControllerError>;

    fn stop_file_logger(&self) -> Result<(), ControllerError>;

    /// Abort whatever is queued and return to a safe idle condition.
    fn soft_reset(&self) -> Result<(), ControllerError>;
}
