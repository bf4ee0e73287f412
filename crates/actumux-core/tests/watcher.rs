//! Change watcher diff, notification and movement-signal behavior

mod common;

use std::sync::{Arc, Mutex};

use actumux_core::broker::Broker;
use actumux_core::notify::{NotificationEvent, NotificationSink, Severity};
use actumux_core::watcher::{ChangeWatcher, MovementSignal};
use common::Script;
use pretty_assertions::assert_eq;

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<NotificationEvent>>>);

impl RecordingSink {
    fn events(&self) -> Vec<NotificationEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &NotificationEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

#[derive(Clone, Default)]
struct RecordingSignal(Arc<Mutex<Vec<bool>>>);

impl RecordingSignal {
    fn edges(&self) -> Vec<bool> {
        self.0.lock().unwrap().clone()
    }
}

impl MovementSignal for RecordingSignal {
    fn set_moving(&self, moving: bool) {
        self.0.lock().unwrap().push(moving);
    }
}

fn watcher_rig() -> (ChangeWatcher, Script, RecordingSink, RecordingSignal) {
    let script = Script::new();
    let broker = Arc::new(Broker::new(script.link()));
    let sink = RecordingSink::default();
    let signal = RecordingSignal::default();
    let mut watcher = ChangeWatcher::new(broker);
    watcher.add_sink(Box::new(sink.clone()));
    watcher.set_movement_signal(Box::new(signal.clone()));
    (watcher, script, sink, signal)
}

#[test]
fn test_one_notification_per_distinct_transition() {
    let (mut watcher, script, sink, _signal) = watcher_rig();

    script.push_reply("0,0,100,100,0,0,1,2000");
    script.push_reply("0,0,100,100,0,0,1,2000");
    script.push_reply("2,0,150,100,0,0,1,1980");
    for _ in 0..3 {
        watcher.poll_once();
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].text, "Stopped");
    assert_eq!(events[1].text, "Moving east");
    assert_eq!(events[1].target, 150);
    assert_eq!(events[1].position, 100);
    assert_eq!(events[1].severity, Severity::Info);
}

#[test]
fn test_free_memory_changes_are_not_reported() {
    let (mut watcher, script, sink, _signal) = watcher_rig();

    script.push_reply("0,0,100,100,0,0,1,2000");
    script.push_reply("0,0,100,100,0,0,1,1850");
    watcher.poll_once();
    watcher.poll_once();

    assert_eq!(sink.events().len(), 1);
}

#[test]
fn test_error_status_notifies_with_alert_severity() {
    let (mut watcher, script, sink, _signal) = watcher_rig();

    script.push_reply("0,4,150,100,0,0,1,1980");
    watcher.poll_once();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].text, "Not moving (no pulses)");
    assert_eq!(events[0].severity, Severity::Alert);
}

#[test]
fn test_memory_reset_after_err_cycle() {
    let (mut watcher, script, sink, _signal) = watcher_rig();

    script.push_reply("0,0,100,100,0,0,1,2000");
    watcher.poll_once();
    script.push_fault(); // this cycle sees ERR
    watcher.poll_once();
    // Same tuple as before the fault: must be reported again, not
    // silently swallowed
    script.push_reply("0,0,100,100,0,0,1,2000");
    watcher.poll_once();

    assert_eq!(sink.events().len(), 2);
}

#[test]
fn test_malformed_status_is_non_fatal_and_resets_memory() {
    let (mut watcher, script, sink, _signal) = watcher_rig();

    script.push_reply("0,0,100,100,0,0,1,2000");
    script.push_reply("not,a,valid,status");
    script.push_reply("0,0,100,100,0,0,1,2000");
    for _ in 0..3 {
        watcher.poll_once();
    }

    assert_eq!(sink.events().len(), 2);
}

#[test]
fn test_movement_signal_set_and_cleared_with_tolerance() {
    let (mut watcher, script, _sink, signal) = watcher_rig();

    // Stopped at target: no signal yet
    script.push_reply("0,0,100,100,0,0,1,2000");
    watcher.poll_once();
    assert_eq!(signal.edges(), Vec::<bool>::new());

    // Starts moving: signal asserted once
    script.push_reply("2,0,150,110,0,0,1,2000");
    watcher.poll_once();
    script.push_reply("2,0,150,130,0,0,1,2000");
    watcher.poll_once();
    assert_eq!(signal.edges(), vec![true]);

    // Stopped but outside the tolerance band: still moving
    script.push_reply("0,0,150,140,0,0,1,2000");
    watcher.poll_once();
    assert_eq!(signal.edges(), vec![true]);

    // Settled within +/-5 of the target: signal cleared
    script.push_reply("0,0,150,148,0,0,1,2000");
    watcher.poll_once();
    assert_eq!(signal.edges(), vec![true, false]);
}

#[test]
fn test_extreme_positions_do_not_panic_the_settle_check() {
    let (mut watcher, script, _sink, signal) = watcher_rig();

    script.push_reply("2,0,150,110,0,0,1,2000");
    watcher.poll_once();
    assert_eq!(signal.edges(), vec![true]);

    // Parseable but adversarial extremes: the position/target distance
    // does not fit in i64
    script.push_reply(&format!("0,0,{},{},0,0,1,2000", i64::MAX, i64::MIN));
    watcher.poll_once();

    // Far outside the tolerance band, so still moving
    assert_eq!(signal.edges(), vec![true]);
}

#[test]
fn test_watcher_scenario_stopped_then_moving_east() {
    let (mut watcher, script, sink, _signal) = watcher_rig();

    script.push_reply("0,0,100,100,0,0,1,2000");
    script.push_reply("2,0,150,100,0,0,1,1980");
    watcher.poll_once();
    watcher.poll_once();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    let moving = &events[1];
    assert_eq!(moving.text, "Moving east");
    assert_eq!(moving.target, 150);
    assert_eq!(moving.position, 100);
}
