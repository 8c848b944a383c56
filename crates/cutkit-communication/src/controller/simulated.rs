//! In-memory controller used for dry runs and tests.

use super::MachineController;
use crate::logger::CommandLogger;
use cutkit_core::{ControllerError, ControllerState, ParserState};
use parking_lot::Mutex;
use std::path::Path;

#[derive(Debug)]
struct SimState {
    connected: bool,
    queued: usize,
    drain_per_poll: usize,
    stall: Option<Stall>,
    fail_after: Option<usize>,
    sent: Vec<String>,
    parser: ParserState,
    logger: Option<CommandLogger>,
    resets: usize,
    alarm: bool,
}

#[derive(Debug, Clone, Copy)]
struct Stall {
    after: usize,
    depth: usize,
}

/// Records every command and drains its queue as it is polled.
///
/// By default the whole queue is consumed on each poll, so the executor
/// never waits. A stall makes the reported depth stick at a fixed value
/// once a number of commands have been accepted, until released.
#[derive(Debug)]
pub struct SimulatedController {
    inner: Mutex<SimState>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SimState {
                connected: true,
                queued: 0,
                drain_per_poll: usize::MAX,
                stall: None,
                fail_after: None,
                sent: Vec::new(),
                parser: ParserState::unknown(),
                logger: None,
                resets: 0,
                alarm: false,
            }),
        }
    }

    /// Consume at most `n` queued commands per poll.
    pub fn with_drain_per_poll(self, n: usize) -> Self {
        self.inner.lock().drain_per_poll = n;
        self
    }

    /// Reject every push once `n` commands have been accepted.
    pub fn with_fail_after(self, n: usize) -> Self {
        self.inner.lock().fail_after = Some(n);
        self
    }

    /// Report a queue depth of `depth` once `after` commands are accepted.
    pub fn stall_after(&self, after: usize, depth: usize) {
        self.inner.lock().stall = Some(Stall { after, depth });
    }

    pub fn release_stall(&self) {
        self.inner.lock().stall = None;
    }

    /// Enter the alarm state; commands are rejected until a soft reset.
    pub fn raise_alarm(&self) {
        self.inner.lock().alarm = true;
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().connected = connected;
    }

    /// Every accepted command, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.inner.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.lock().sent.len()
    }

    pub fn reset_count(&self) -> usize {
        self.inner.lock().resets
    }

    pub fn is_logging(&self) -> bool {
        self.inner.lock().logger.is_some()
    }
}

impl SimState {
    fn stalled_depth(&self) -> Option<usize> {
        self.stall
            .filter(|s| self.sent.len() >= s.after)
            .map(|s| s.depth)
    }
}

impl MachineController for SimulatedController {
    fn push_command(&self, command: &str) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(ControllerError::NotConnected);
        }
        if inner.alarm {
            return Err(ControllerError::CommandRejected {
                reason: format!("alarm active, '{}' refused", command),
            });
        }
        if inner.fail_after.is_some_and(|n| inner.sent.len() >= n) {
            return Err(ControllerError::CommandRejected {
                reason: format!("simulated failure on '{}'", command),
            });
        }
        if let Some(logger) = inner.logger.as_mut() {
            logger.log(command)?;
        }
        inner.sent.push(command.to_string());
        inner.queued += 1;
        Ok(())
    }

    fn waiting_queue_size(&self) -> usize {
        let mut inner = self.inner.lock();
        if let Some(depth) = inner.stalled_depth() {
            return depth;
        }
        let reported = inner.queued;
        inner.queued = inner.queued.saturating_sub(inner.drain_per_poll);
        reported
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    fn state(&self) -> ControllerState {
        let inner = self.inner.lock();
        if !inner.connected {
            ControllerState::Disconnected
        } else if inner.alarm {
            ControllerState::Alarm
        } else if inner.queued > 0 || inner.stalled_depth().is_some() {
            ControllerState::Run
        } else {
            ControllerState::Idle
        }
    }

    fn parser_state(&self) -> ParserState {
        self.inner.lock().parser
    }

    fn update_parser_state(&self, state: ParserState) {
        self.inner.lock().parser = state;
    }

    fn start_file_logger(&self, path: &Path) -> Result<(), ControllerError> {
        let logger = CommandLogger::create(path)?;
        self.inner.lock().logger = Some(logger);
        Ok(())
    }

    fn stop_file_logger(&self) -> Result<(), ControllerError> {
        let logger = self.inner.lock().logger.take();
        if let Some(logger) = logger {
            logger.finish()?;
        }
        Ok(())
    }

    fn soft_reset(&self) -> Result<(), ControllerError> {
        let mut inner = self.inner.lock();
        inner.queued = 0;
        inner.stall = None;
        inner.alarm = false;
        inner.parser = ParserState::unknown();
        inner.resets += 1;
        tracing::info!("Simulated controller reset ({} commands recorded)", inner.sent.len());
        Ok(())
    }
}
