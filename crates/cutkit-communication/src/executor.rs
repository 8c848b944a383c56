//! Document execution.
//!
//! The executor walks the group tree depth-first and turns every enabled
//! leaf into commands for a [`MachineController`]:
//!
//! - Properties are merged by value on the way down. A group that selects
//!   all-at-once repeats its whole subtree once per depth; everything below
//!   it runs flat at that depth.
//! - Leaves are cloned from the live document at the start of each pass, so
//!   edits made during a run affect later passes only.
//! - Before every command the queue depth is polled; while it is above the
//!   configured maximum the executor sleeps instead of pushing.
//! - The stop flag is checked before every command. A stopped run still
//!   retracts and switches the spindle off.
//! - A controller failure aborts the run, switches the spindle off on a
//!   best-effort basis, closes the command log, resets the controller, and
//!   reports through the listener.

use crate::controller::MachineController;
use crate::listener::{ExecutionListener, ListenerDispatcher};
use cutkit_core::{ControllerError, ControllerState, ExecutionError, ShapeId, EPSILON};
use cutkit_designer::properties::MAX_PASSES;
use cutkit_designer::{
    format_number, CamShape, DesignDrill, DesignGroup, EngravingProperties, Motion, MotionKind,
    Shape, SharedDocument,
};
use cutkit_settings::ExecutionSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Progress as seen by a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSnapshot {
    pub state: ControllerState,
    pub shape_id: Option<ShapeId>,
    pub shape_name: String,
    /// Zero-based pass index within `pass_count`
    pub pass_index: usize,
    pub pass_count: usize,
    /// Last known Z; NaN when Z is not in use
    pub z: f64,
    pub commands_sent: usize,
}

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub commands_sent: usize,
    /// The stop flag ended the run early
    pub stopped: bool,
    /// Set when the run failed
    pub error: Option<String>,
    pub shapes_executed: usize,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        !self.stopped && self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct RunState {
    sent: usize,
    shapes_executed: usize,
    shape_id: Option<ShapeId>,
    shape_name: String,
    pass_index: usize,
    pass_count: usize,
}

pub struct Executor {
    controller: Arc<dyn MachineController>,
    settings: ExecutionSettings,
    listener: Option<ListenerDispatcher>,
    stop: Arc<AtomicBool>,
    running: AtomicBool,
}

impl Executor {
    pub fn new(controller: Arc<dyn MachineController>, settings: ExecutionSettings) -> Self {
        Self {
            controller,
            settings,
            listener: None,
            stop: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
        }
    }

    /// Deliver progress, errors and completion to `listener` on its own thread.
    pub fn with_listener(mut self, listener: impl ExecutionListener) -> std::io::Result<Self> {
        self.listener = Some(ListenerDispatcher::spawn(listener)?);
        Ok(self)
    }

    /// Flag that stops the current run before its next command.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Run on a dedicated `cutkit-executor` thread.
    pub fn spawn(self, document: SharedDocument) -> std::io::Result<JoinHandle<ExecutionReport>> {
        thread::Builder::new()
            .name("cutkit-executor".into())
            .spawn(move || self.run(&document))
    }

    /// Stream the whole document and block until done.
    ///
    /// The stop flag is cleared when the run starts.
    pub fn run(&self, document: &SharedDocument) -> ExecutionReport {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Execution requested while another run is active");
            return ExecutionReport {
                error: Some(ExecutionError::AlreadyRunning.to_string()),
                ..Default::default()
            };
        }
        self.stop.store(false, Ordering::SeqCst);

        let root = document.read().root().clone();
        tracing::info!(
            "Executing '{}' ({} shapes)",
            root.header().name(),
            root.shape_count()
        );

        let logging = self.start_logger();
        let mut run = RunState::default();
        let mut stopped = false;

        let mut result = self
            .preamble(&mut run)
            .and_then(|()| self.run_group(document, &root, &EngravingProperties::unset(), None, &mut run));
        if matches!(result, Err(ExecutionError::Stopped)) {
            tracing::info!("Execution stopped after {} commands", run.sent);
            stopped = true;
            result = Ok(());
        }
        let result = result.and_then(|()| self.shutdown(&mut run)).and_then(|()| {
            if stopped || !self.settings.wait_for_idle {
                Ok(())
            } else {
                self.wait_until_idle()
            }
        });

        let error = match result {
            Ok(()) => {
                self.stop_logger(logging);
                None
            }
            Err(ExecutionError::Stopped) => {
                stopped = true;
                self.stop_logger(logging);
                None
            }
            Err(e) => {
                self.fail_safe(&e, logging);
                Some(e.to_string())
            }
        };

        let report = ExecutionReport {
            commands_sent: run.sent,
            stopped,
            error,
            shapes_executed: run.shapes_executed,
        };
        tracing::info!(
            "Execution finished: {} commands, {} shapes{}",
            report.commands_sent,
            report.shapes_executed,
            if report.stopped { " (stopped)" } else { "" }
        );
        if let Some(listener) = &self.listener {
            listener.finished(report.clone());
        }
        self.running.store(false, Ordering::SeqCst);
        report
    }

    fn start_logger(&self) -> bool {
        let Some(path) = &self.settings.command_log else {
            return false;
        };
        match self.controller.start_file_logger(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Command log not started: {}", e);
                false
            }
        }
    }

    fn stop_logger(&self, logging: bool) {
        if logging {
            if let Err(e) = self.controller.stop_file_logger() {
                tracing::warn!("Command log not closed cleanly: {}", e);
            }
        }
    }

    fn fail_safe(&self, error: &ExecutionError, logging: bool) {
        tracing::error!("Execution failed: {}", error);
        if let Err(e) = self.controller.push_command("M5") {
            tracing::warn!("Spindle stop after failure not sent: {}", e);
        }
        self.stop_logger(logging);
        if let Err(e) = self.controller.soft_reset() {
            tracing::error!("Controller reset after failure failed: {}", e);
        }
        if let Some(listener) = &self.listener {
            listener.error(error.to_string());
        }
    }

    fn preamble(&self, run: &mut RunState) -> Result<(), ExecutionError> {
        self.emit(run, self.settings.measurement_system.units_command().to_string())?;
        self.emit(run, "G90".to_string())
    }

    fn shutdown(&self, run: &mut RunState) -> Result<(), ExecutionError> {
        if self.controller.parser_state().z_known() {
            let retract = format!("G0 Z{}", self.num(self.settings.safe_z));
            self.push(run, retract, false)?;
        }
        self.push(run, "M5".to_string(), false)
    }

    fn wait_until_idle(&self) -> Result<(), ExecutionError> {
        loop {
            if self.controller.is_idle() {
                return Ok(());
            }
            self.check_controller()?;
            if self.stop_requested() {
                return Err(ExecutionError::Stopped);
            }
            thread::sleep(self.settings.poll_interval());
        }
    }

    fn run_group(
        &self,
        document: &SharedDocument,
        group: &DesignGroup,
        inherited: &EngravingProperties,
        flat_z: Option<f64>,
        run: &mut RunState,
    ) -> Result<(), ExecutionError> {
        let props = inherited.merge(group.header().properties());
        if !props.enabled {
            tracing::debug!("Group '{}' disabled, skipped", group.header().name());
            return Ok(());
        }

        match flat_z {
            Some(z) => self.run_children(document, group, &props, Some(z), run),
            None if props.all_at_once => {
                let schedule = props.try_z_schedule().ok_or_else(|| ExecutionError::TooManyPasses {
                    name: group.header().name().to_string(),
                    limit: MAX_PASSES,
                })?;
                for (index, z) in schedule.iter().copied().enumerate() {
                    run.pass_index = index;
                    run.pass_count = schedule.len();
                    tracing::info!(
                        "Group '{}' pass {}/{} at Z{}",
                        group.header().name(),
                        index + 1,
                        schedule.len(),
                        self.num(z)
                    );
                    self.run_children(document, group, &props, Some(z), run)?;
                }
                Ok(())
            }
            None => self.run_children(document, group, &props, None, run),
        }
    }

    fn run_children(
        &self,
        document: &SharedDocument,
        group: &DesignGroup,
        props: &EngravingProperties,
        flat_z: Option<f64>,
        run: &mut RunState,
    ) -> Result<(), ExecutionError> {
        for child in group.children() {
            match child {
                Shape::Group(g) => self.run_group(document, g, props, flat_z, run)?,
                leaf => self.run_leaf(document, leaf.id(), props, flat_z, run)?,
            }
        }
        Ok(())
    }

    fn run_leaf(
        &self,
        document: &SharedDocument,
        id: ShapeId,
        inherited: &EngravingProperties,
        flat_z: Option<f64>,
        run: &mut RunState,
    ) -> Result<(), ExecutionError> {
        let Some(shape) = live_shape(document, id) else {
            return Ok(());
        };
        let props = inherited.merge(shape.properties());
        if !props.enabled {
            tracing::debug!("Shape '{}' disabled, skipped", shape.name());
            return Ok(());
        }
        run.shape_id = Some(id);
        run.shape_name = shape.name().to_string();

        if let Shape::Drill(drill) = &shape {
            // Inside an all-at-once group the hole is finished on the first pass.
            if flat_z.is_some() && run.pass_index > 0 {
                tracing::debug!("Drill '{}' already cut, skipped on pass {}", shape.name(), run.pass_index + 1);
                return Ok(());
            }
            self.run_drill(drill, &props, run)?;
            run.shapes_executed += 1;
            self.notify(run);
            return Ok(());
        }

        let schedule = match flat_z {
            Some(z) => vec![z],
            None => leaf_schedule(&shape, &props).ok_or_else(|| ExecutionError::TooManyPasses {
                name: shape.name().to_string(),
                limit: MAX_PASSES,
            })?,
        };
        let mut first = Some(shape);
        for (index, z) in schedule.iter().copied().enumerate() {
            let shape = match first.take() {
                Some(shape) => shape,
                None => match live_shape(document, id) {
                    Some(shape) => shape,
                    None => return Ok(()),
                },
            };
            let props = inherited.merge(shape.properties());
            if !props.enabled {
                tracing::debug!("Shape '{}' disabled during the run", shape.name());
                return Ok(());
            }
            if flat_z.is_none() {
                run.pass_index = index;
                run.pass_count = schedule.len();
                if schedule.len() > 1 {
                    tracing::debug!(
                        "'{}' pass {}/{} at Z{}",
                        shape.name(),
                        index + 1,
                        schedule.len(),
                        self.num(z)
                    );
                }
            }

            let top = if props.z_start.is_nan() { 0.0 } else { props.z_start };
            let motions = pass_motions(&shape, z, top);
            if motions.is_empty() {
                tracing::debug!("'{}' has nothing to cut at Z{}", shape.name(), self.num(z));
                continue;
            }
            self.apply_power(&props, run)?;
            self.cut_path(&motions, z, &props, run)?;
        }
        run.shapes_executed += 1;
        self.notify(run);
        Ok(())
    }

    /// Spindle on, or a new power word when it changed.
    fn apply_power(&self, props: &EngravingProperties, run: &mut RunState) -> Result<(), ExecutionError> {
        let parser = self.controller.parser_state();
        if !parser.engraving_active {
            let command = if props.has_power() {
                format!("M3 S{}", self.num(props.power))
            } else {
                "M3".to_string()
            };
            self.emit(run, command)
        } else if props.has_power() && self.changed(parser.power, props.power) {
            self.emit(run, format!("S{}", self.num(props.power)))
        } else {
            Ok(())
        }
    }

    fn cut_path(
        &self,
        motions: &[Motion],
        z: f64,
        props: &EngravingProperties,
        run: &mut RunState,
    ) -> Result<(), ExecutionError> {
        let use_z = z.is_finite();
        for motion in motions {
            match motion.kind {
                MotionKind::Comment(_) | MotionKind::Drill { .. } => continue,
                MotionKind::Rapid => {
                    if use_z {
                        self.retract(run)?;
                    }
                    let travel = format!("G0 X{} Y{}", self.num(motion.x), self.num(motion.y));
                    self.emit(run, travel)?;
                    if use_z {
                        self.plunge(z, props, run)?;
                    }
                }
                _ => {
                    let mut m = motion.clone();
                    m.z = None;
                    let mut command = m.format_with(Some(self.settings.decimal_places));
                    command.push_str(&self.feed_word(props.feed));
                    self.emit(run, command)?;
                }
            }
        }
        Ok(())
    }

    fn run_drill(
        &self,
        drill: &DesignDrill,
        props: &EngravingProperties,
        run: &mut RunState,
    ) -> Result<(), ExecutionError> {
        self.apply_power(props, run)?;
        self.retract(run)?;
        let p = drill.position();
        self.emit(run, format!("G0 X{} Y{}", self.num(p.x), self.num(p.y)))?;

        let feed = self.settings.plunge_feed.unwrap_or(props.feed);
        if self.settings.expand_drill_cycles {
            let retract = format!("G0 Z{}", self.num(drill.retract()));
            self.emit(run, retract.clone())?;
            for target in drill.peck_schedule(drill.retract()) {
                let mut plunge = format!("G1 Z{}", self.num(target));
                plunge.push_str(&self.feed_word(feed));
                self.emit(run, plunge)?;
                self.emit(run, retract.clone())?;
            }
        } else {
            let mut cycle = drill.cycle_motion().format_with(Some(self.settings.decimal_places));
            cycle.push_str(&self.feed_word(feed));
            self.emit(run, cycle)?;
            self.emit(run, "G80".to_string())?;
        }
        Ok(())
    }

    /// Rapid up to the safe height unless already there.
    fn retract(&self, run: &mut RunState) -> Result<(), ExecutionError> {
        let parser = self.controller.parser_state();
        if !parser.z_known() || parser.z < self.settings.safe_z - EPSILON {
            self.emit(run, format!("G0 Z{}", self.num(self.settings.safe_z)))?;
        }
        Ok(())
    }

    fn plunge(&self, z: f64, props: &EngravingProperties, run: &mut RunState) -> Result<(), ExecutionError> {
        let feed = self.settings.plunge_feed.unwrap_or(props.feed);
        let mut command = format!("G1 Z{}", self.num(z));
        command.push_str(&self.feed_word(feed));
        self.emit(run, command)
    }

    /// ` F<feed>` when the controller does not already have it, else empty.
    fn feed_word(&self, feed: f64) -> String {
        if feed.is_nan() || !self.changed(self.controller.parser_state().feed, feed) {
            String::new()
        } else {
            format!(" F{}", self.num(feed))
        }
    }

    fn changed(&self, known: f64, wanted: f64) -> bool {
        known.is_nan() || self.num(known) != self.num(wanted)
    }

    fn num(&self, value: f64) -> String {
        format_number(value, Some(self.settings.decimal_places))
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn emit(&self, run: &mut RunState, command: String) -> Result<(), ExecutionError> {
        self.push(run, command, true)
    }

    fn push(&self, run: &mut RunState, command: String, honour_stop: bool) -> Result<(), ExecutionError> {
        if honour_stop && self.stop_requested() {
            return Err(ExecutionError::Stopped);
        }
        self.wait_for_room(honour_stop)?;
        if honour_stop && self.stop_requested() {
            return Err(ExecutionError::Stopped);
        }

        self.controller.push_command(&command)?;
        let mut parser = self.controller.parser_state();
        parser.apply(&command);
        self.controller.update_parser_state(parser);
        run.sent += 1;
        tracing::trace!("> {}", command);

        let every = self.settings.gui_update_every;
        if every > 0 && run.sent % every == 0 {
            self.notify(run);
        }
        Ok(())
    }

    /// Block while the controller queue is above the configured depth.
    fn wait_for_room(&self, honour_stop: bool) -> Result<(), ExecutionError> {
        loop {
            if self.controller.waiting_queue_size() <= self.settings.max_queue_depth {
                return Ok(());
            }
            self.check_controller()?;
            if honour_stop && self.stop_requested() {
                return Err(ExecutionError::Stopped);
            }
            thread::sleep(self.settings.poll_interval());
        }
    }

    /// Fails when the controller dropped out or raised an alarm while we wait.
    fn check_controller(&self) -> Result<(), ExecutionError> {
        if !self.controller.is_connected() {
            return Err(ControllerError::NotConnected.into());
        }
        let state = self.controller.state();
        if state.is_error() {
            return Err(ControllerError::Faulted { state }.into());
        }
        Ok(())
    }

    fn notify(&self, run: &RunState) {
        let Some(listener) = &self.listener else {
            return;
        };
        listener.update_gui(ExecutionSnapshot {
            state: self.controller.state(),
            shape_id: run.shape_id,
            shape_name: run.shape_name.clone(),
            pass_index: run.pass_index,
            pass_count: run.pass_count,
            z: self.controller.parser_state().z,
            commands_sent: run.sent,
        });
    }
}

/// Clone of the shape as it is now; `None` when it was deleted mid-run.
fn live_shape(document: &SharedDocument, id: ShapeId) -> Option<Shape> {
    let shape = document.read().find(id).cloned();
    if shape.is_none() {
        tracing::warn!("{}, skipped", ExecutionError::ShapeVanished { id: id.value() });
    }
    shape
}

/// Depths for a leaf that schedules its own passes.
///
/// Pockets without an explicit depth range step from the surface down to
/// their inlay depth, one pass per `pass_depth` (a single pass when unset).
/// `None` when the schedule exceeds [`MAX_PASSES`].
fn leaf_schedule(shape: &Shape, props: &EngravingProperties) -> Option<Vec<f64>> {
    let inlay = match shape {
        Shape::CylinderPocket(c) => c.inlay_depth(),
        Shape::SpherePocket(s) => s.inlay_depth(),
        _ => return props.try_z_schedule(),
    };
    if !props.z_start.is_nan() && !props.z_end.is_nan() {
        return props.try_z_schedule();
    }
    let step = if props.pass_depth > 0.0 { props.pass_depth } else { inlay };
    EngravingProperties::unset()
        .with_depth(0.0, -inlay, step)
        .try_z_schedule()
}

/// Motions for one pass. Pocket contours are recomputed for the depth below `top`.
fn pass_motions(shape: &Shape, z: f64, top: f64) -> Vec<Motion> {
    let depth = if z.is_nan() { 0.0 } else { z - top };
    match shape {
        Shape::CylinderPocket(c) => c.contour_motions(depth),
        Shape::SpherePocket(s) => s.contour_motions(depth),
        other => other.motions(),
    }
}
