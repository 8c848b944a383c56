//! Controller that writes the command stream to a sink instead of a machine.

use super::MachineController;
use crate::logger::CommandLogger;
use cutkit_core::{ControllerError, ControllerState, ParserState};
use parking_lot::Mutex;
use std::io::Write;
use std::path::Path;

/// Writes one command per line to any `Write` sink.
///
/// The sink consumes commands immediately, so the queue is always empty
/// and the executor never waits.
pub struct GcodeFileController<W: Write + Send> {
    sink: Mutex<W>,
    parser: Mutex<ParserState>,
    logger: Mutex<Option<CommandLogger>>,
    written: Mutex<usize>,
}

impl<W: Write + Send> GcodeFileController<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
            parser: Mutex::new(ParserState::unknown()),
            logger: Mutex::new(None),
            written: Mutex::new(0),
        }
    }

    pub fn commands_written(&self) -> usize {
        *self.written.lock()
    }

    pub fn flush(&self) -> Result<(), ControllerError> {
        self.sink.lock().flush().map_err(|e| ControllerError::QueueFailure {
            message: e.to_string(),
        })
    }

    /// Take the sink back, e.g. to inspect an in-memory buffer.
    pub fn into_inner(self) -> W {
        self.sink.into_inner()
    }
}

impl<W: Write + Send> MachineController for GcodeFileController<W> {
    fn push_command(&self, command: &str) -> Result<(), ControllerError> {
        writeln!(self.sink.lock(), "{}", command).map_err(|e| ControllerError::QueueFailure {
            message: e.to_string(),
        })?;
        if let Some(logger) = self.logger.lock().as_mut() {
            logger.log(command)?;
        }
        *self.written.lock() += 1;
        Ok(())
    }

    fn waiting_queue_size(&self) -> usize {
        0
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn state(&self) -> ControllerState {
        ControllerState::Idle
    }

    fn parser_state(&self) -> ParserState {
        *self.parser.lock()
    }

    fn update_parser_state(&self, state: ParserState) {
        *self.parser.lock() = state;
    }

    fn start_file_logger(&self, path: &Path) -> Result<(), ControllerError> {
        *self.logger.lock() = Some(CommandLogger::create(path)?);
        Ok(())
    }

    fn stop_file_logger(&self) -> Result<(), ControllerError> {
        if let Some(logger) = self.logger.lock().take() {
            logger.finish()?;
        }
        self.flush()
    }

    fn soft_reset(&self) -> Result<(), ControllerError> {
        *self.parser.lock() = ParserState::unknown();
        self.flush()
    }
}
