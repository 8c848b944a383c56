use cutkit_communication::{
    ExecutionListener, ExecutionReport, ExecutionSnapshot, Executor, MachineController,
    SimulatedController,
};
use cutkit_core::ParserState;
use cutkit_designer::{
    CamShape, DesignDrill, DesignGroup, DesignPolyline, Document, EngravingProperties, Point,
    SharedDocument,
};
use cutkit_settings::ExecutionSettings;
use proptest::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn square(name: &str, props: EngravingProperties) -> DesignPolyline {
    let mut p = DesignPolyline::from_points(
        name,
        &[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 0.0),
        ],
    );
    p.header_mut().set_properties(props);
    p
}

fn shared(root: DesignGroup) -> SharedDocument {
    Document::from_root(root).into_shared()
}

fn settings() -> ExecutionSettings {
    ExecutionSettings {
        poll_interval_ms: 1,
        ..Default::default()
    }
}

fn run(root: DesignGroup, settings: ExecutionSettings) -> (ExecutionReport, Vec<String>) {
    let sim = Arc::new(SimulatedController::new());
    let executor = Executor::new(sim.clone(), settings);
    let report = executor.run(&shared(root));
    (report, sim.sent())
}

fn plunge_depths(sent: &[String]) -> Vec<f64> {
    sent.iter()
        .filter_map(|c| c.strip_prefix("G1 Z"))
        .map(|rest| rest.split(' ').next().unwrap().parse::<f64>().unwrap())
        .collect()
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_depth_schedule_drives_plunges() {
    let mut root = DesignGroup::new("root");
    root.add(square(
        "outline",
        EngravingProperties::unset()
            .with_depth(0.0, -6.0, 2.0)
            .with_feed(300.0)
            .with_power(1000.0),
    ));
    let (report, sent) = run(root, settings());

    assert!(report.is_success());
    assert_eq!(report.shapes_executed, 1);
    assert_eq!(report.commands_sent, sent.len());
    assert_eq!(&sent[..2], &["G21".to_string(), "G90".to_string()]);
    assert_eq!(plunge_depths(&sent), vec![0.0, -2.0, -4.0, -6.0]);
    assert_eq!(sent.iter().filter(|c| c.starts_with("M3")).count(), 1);
    assert!(sent.contains(&"M3 S1000".to_string()));
    // feed goes out once and is never repeated
    assert_eq!(sent.iter().filter(|c| c.contains(" F")).count(), 1);
    assert_eq!(&sent[sent.len() - 2..], &["G0 Z5".to_string(), "M5".to_string()]);
}

#[test]
fn test_xy_rapids_happen_at_safe_height() {
    let mut root = DesignGroup::new("root");
    root.add(square(
        "a",
        EngravingProperties::unset().with_depth(-1.0, -3.0, 1.0),
    ));
    let mut b = square("b", EngravingProperties::unset().with_depth(-1.0, -1.0, 1.0));
    b.translate(20.0, 0.0);
    root.add(b);
    let (_, sent) = run(root, settings());

    let mut state = ParserState::unknown();
    for command in &sent {
        if command.starts_with("G0 X") {
            assert_eq!(state.z, 5.0, "rapid '{}' below safe height", command);
            assert!(!command.contains('Z'));
        }
        state.apply(command);
    }
}

#[test]
fn test_all_at_once_group_repeats_children_per_depth() {
    let mut group = DesignGroup::new("layer");
    group.header_mut().set_properties(
        EngravingProperties::unset()
            .with_depth(0.0, -2.0, 1.0)
            .with_all_at_once(true),
    );
    // a child's own schedule is ignored under a flat ancestor
    group.add(square(
        "a",
        EngravingProperties::unset().with_depth(0.0, -10.0, 5.0),
    ));
    group.add(square("b", EngravingProperties::unset()));
    let mut root = DesignGroup::new("root");
    root.add(group);

    let (report, sent) = run(root, settings());
    assert!(report.is_success());
    assert_eq!(plunge_depths(&sent), vec![0.0, 0.0, -1.0, -1.0, -2.0, -2.0]);
    assert_eq!(report.shapes_executed, 6);
}

#[test]
fn test_disabled_shapes_are_skipped() {
    let mut root = DesignGroup::new("root");
    root.add(square("off", EngravingProperties::unset().with_enabled(false)));
    let mut group = DesignGroup::new("hidden");
    group
        .header_mut()
        .set_properties(EngravingProperties::unset().with_enabled(false));
    group.add(square("inside", EngravingProperties::unset()));
    root.add(group);

    let (report, sent) = run(root, settings());
    assert_eq!(report.shapes_executed, 0);
    assert_eq!(sent, vec!["G21", "G90", "M5"]);
}

#[test]
fn test_drill_pecks_are_expanded() {
    let mut root = DesignGroup::new("root");
    root.add(DesignDrill::new("hole", Point::new(5.0, 5.0), -3.0, 1.0, 1.5));
    let (report, sent) = run(root, settings());

    assert!(report.is_success());
    assert_eq!(plunge_depths(&sent), vec![-0.5, -2.0, -3.0]);
    assert_eq!(sent.iter().filter(|c| c.as_str() == "G0 Z1").count(), 4);
    assert!(sent.contains(&"G0 X5 Y5".to_string()));
}

#[test]
fn test_drill_canned_cycle() {
    let mut root = DesignGroup::new("root");
    let mut drill = DesignDrill::new("hole", Point::new(5.0, 5.0), -3.0, 1.0, 1.5);
    drill
        .header_mut()
        .set_properties(EngravingProperties::unset().with_feed(80.0));
    root.add(drill);
    let settings = ExecutionSettings {
        expand_drill_cycles: false,
        ..settings()
    };
    let (_, sent) = run(root, settings);

    let cycle = sent.iter().position(|c| c.starts_with("G83")).unwrap();
    assert_eq!(sent[cycle], "G83 X5 Y5 Z-3 R1 Q1.5 F80");
    assert_eq!(sent[cycle + 1], "G80");
}

#[test]
fn test_power_changes_are_delta_encoded() {
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset().with_power(800.0)));
    root.add(square("b", EngravingProperties::unset().with_power(800.0)));
    root.add(square("c", EngravingProperties::unset().with_power(500.0)));
    let (_, sent) = run(root, settings());

    let power: Vec<&String> = sent
        .iter()
        .filter(|c| c.starts_with("M3") || c.starts_with('S'))
        .collect();
    assert_eq!(power, vec!["M3 S800", "S500"]);
}

#[test]
fn test_flow_control_waits_for_queue() {
    let sim = Arc::new(SimulatedController::new());
    sim.stall_after(1, 4);
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset()));

    let handle = Executor::new(sim.clone(), settings())
        .spawn(shared(root))
        .unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(sim.sent_count(), 1);

    sim.release_stall();
    let report = handle.join().unwrap();
    assert!(report.is_success());
    assert!(sim.sent_count() > 1);
    assert!(sim.is_idle());
}

#[test]
fn test_stop_sends_no_further_cutting_commands() {
    let sim = Arc::new(SimulatedController::new());
    sim.stall_after(6, 4);
    let mut root = DesignGroup::new("root");
    root.add(square(
        "a",
        EngravingProperties::unset().with_depth(0.0, -4.0, 1.0),
    ));

    let executor = Executor::new(sim.clone(), settings());
    let stop = executor.stop_handle();
    let handle = executor.spawn(shared(root)).unwrap();

    wait_for(|| sim.sent_count() == 6);
    stop.store(true, Ordering::SeqCst);
    sim.release_stall();
    let report = handle.join().unwrap();

    assert!(report.stopped);
    assert!(report.error.is_none());
    let sent = sim.sent();
    assert_eq!(&sent[6..], &["G0 Z5".to_string(), "M5".to_string()]);
}

#[test]
fn test_alarm_while_waiting_aborts_run() {
    let sim = Arc::new(SimulatedController::new());
    sim.stall_after(2, 4);
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset()));

    let handle = Executor::new(sim.clone(), settings())
        .spawn(shared(root))
        .unwrap();
    wait_for(|| sim.sent_count() == 2);
    sim.raise_alarm();
    let report = handle.join().unwrap();

    assert!(report.error.unwrap().contains("Controller entered Alarm state"));
    assert_eq!(report.commands_sent, 2);
    assert_eq!(sim.reset_count(), 1);
    assert!(sim.is_idle());
}

#[derive(Debug)]
enum Event {
    Update(ExecutionSnapshot),
    Error(String),
    Finished(ExecutionReport),
}

struct ChannelListener(Sender<Event>);

impl ExecutionListener for ChannelListener {
    fn update_gui(&self, snapshot: &ExecutionSnapshot) {
        let _ = self.0.send(Event::Update(snapshot.clone()));
    }

    fn error(&self, message: &str) {
        let _ = self.0.send(Event::Error(message.to_string()));
    }

    fn execution_finished(&self, report: &ExecutionReport) {
        let _ = self.0.send(Event::Finished(report.clone()));
    }
}

#[test]
fn test_controller_failure_resets_and_reports() {
    let sim = Arc::new(SimulatedController::new().with_fail_after(4));
    let (tx, rx) = mpsc::channel();
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset().with_depth(0.0, -1.0, 1.0)));

    let executor = Executor::new(sim.clone(), settings())
        .with_listener(ChannelListener(tx))
        .unwrap();
    let report = executor.run(&shared(root));
    drop(executor);

    assert!(report.error.as_deref().unwrap().contains("Command rejected"));
    assert_eq!(report.commands_sent, 4);
    assert_eq!(sim.reset_count(), 1);

    let events: Vec<Event> = rx.try_iter().collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Error(m) if m.contains("Command rejected"))));
    assert!(matches!(events.last(), Some(Event::Finished(r)) if *r == report));
}

#[test]
fn test_runaway_pass_schedule_fails_safe() {
    let sim = Arc::new(SimulatedController::new());
    let (tx, rx) = mpsc::channel();
    let mut root = DesignGroup::new("root");
    root.add(square("first", EngravingProperties::unset().with_power(500.0)));
    root.add(square(
        "fine",
        EngravingProperties::unset().with_depth(0.0, -6.0, 1e-300),
    ));

    let executor = Executor::new(sim.clone(), settings())
        .with_listener(ChannelListener(tx))
        .unwrap();
    let report = executor.run(&shared(root));
    assert!(!executor.is_running());
    drop(executor);

    let message = report.error.clone().unwrap();
    assert!(message.contains("'fine'"), "{}", message);
    assert!(message.contains("passes"));
    assert_eq!(report.shapes_executed, 1);
    assert_eq!(sim.reset_count(), 1);
    assert_eq!(sim.sent().last().map(String::as_str), Some("M5"));

    let events: Vec<Event> = rx.try_iter().collect();
    assert!(events.iter().any(|e| matches!(e, Event::Error(m) if m.contains("'fine'"))));
    assert!(matches!(events.last(), Some(Event::Finished(_))));
}

#[test]
fn test_runaway_group_schedule_fails_before_cutting() {
    let mut group = DesignGroup::new("layer");
    group.header_mut().set_properties(
        EngravingProperties::unset()
            .with_depth(0.0, -1e9, 0.001)
            .with_all_at_once(true),
    );
    group.add(square("a", EngravingProperties::unset()));
    let mut root = DesignGroup::new("root");
    root.add(group);

    let (report, sent) = run(root, settings());
    assert!(report.error.unwrap().contains("'layer'"));
    assert_eq!(report.shapes_executed, 0);
    assert!(plunge_depths(&sent).is_empty());
}

#[test]
fn test_drill_in_all_at_once_group_runs_once() {
    let mut group = DesignGroup::new("layer");
    group.header_mut().set_properties(
        EngravingProperties::unset()
            .with_depth(0.0, -2.0, 1.0)
            .with_all_at_once(true),
    );
    group.add(square("a", EngravingProperties::unset()));
    group.add(DesignDrill::new("hole", Point::new(5.0, 5.0), -3.0, 1.0, 0.0));
    let mut root = DesignGroup::new("root");
    root.add(group);

    let (report, sent) = run(root, settings());
    assert!(report.is_success());
    assert_eq!(sent.iter().filter(|c| c.as_str() == "G0 X5 Y5").count(), 1);
    assert_eq!(sent.iter().filter(|c| c.starts_with("G1 Z-3")).count(), 1);
    assert_eq!(report.shapes_executed, 4);
}

#[test]
fn test_listener_receives_progress() {
    let sim = Arc::new(SimulatedController::new());
    let (tx, rx) = mpsc::channel();
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset()));
    let settings = ExecutionSettings {
        gui_update_every: 1,
        ..settings()
    };

    let executor = Executor::new(sim, settings)
        .with_listener(ChannelListener(tx))
        .unwrap();
    let report = executor.run(&shared(root));
    drop(executor);

    let counts: Vec<usize> = rx
        .try_iter()
        .filter_map(|e| match e {
            Event::Update(s) => Some(s.commands_sent),
            _ => None,
        })
        .collect();
    assert!(!counts.is_empty());
    assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(counts.last().copied(), Some(report.commands_sent));
}

#[test]
fn test_command_log_covers_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("run.log");
    let sim = Arc::new(SimulatedController::new());
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset()));
    let settings = ExecutionSettings {
        command_log: Some(log.clone()),
        ..settings()
    };

    let report = Executor::new(sim.clone(), settings).run(&shared(root));
    assert!(!sim.is_logging());
    let text = std::fs::read_to_string(&log).unwrap();
    assert_eq!(text.lines().count(), report.commands_sent + 1);
    assert!(text.lines().last().unwrap().ends_with("] M5"));
}

#[test]
fn test_disconnected_controller_fails_run() {
    let sim = Arc::new(SimulatedController::new());
    sim.set_connected(false);
    let mut root = DesignGroup::new("root");
    root.add(square("a", EngravingProperties::unset()));

    let report = Executor::new(sim.clone(), settings()).run(&shared(root));
    assert_eq!(report.commands_sent, 0);
    assert!(report.error.unwrap().contains("not connected"));
    assert!(!sim.is_connected());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_plunges_follow_the_depth_schedule(
        z_end in -12.0f64..-0.5,
        step in 0.25f64..4.0,
    ) {
        let props = EngravingProperties::unset().with_depth(0.0, z_end, step);
        let mut root = DesignGroup::new("root");
        root.add(square("a", props));
        let (report, sent) = run(root, settings());

        prop_assert!(report.is_success());
        let expected: Vec<String> = props
            .z_schedule()
            .iter()
            .map(|z| cutkit_designer::format_number(*z, Some(4)))
            .collect();
        let plunged: Vec<String> = sent
            .iter()
            .filter_map(|c| c.strip_prefix("G1 Z"))
            .map(|rest| rest.split(' ').next().unwrap().to_string())
            .collect();
        prop_assert_eq!(plunged, expected);
    }
}
