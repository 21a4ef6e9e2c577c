//! Scheduler loop: pulse events, heartbeats, publish-failure policy.

use crate::mock_board::{BoardCall, MockBoard, PULSE_TOPIC, STATUS_TOPIC, config, context};

use flowmeter::config::PublishFailurePolicy;
use flowmeter::events::Event;
use flowmeter::scheduler::Scheduler;

#[test]
fn scenario_1_and_2_debounced_edges_become_one_pulse_event() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();
    board.clear_calls();

    for t in [10_000, 10_030, 10_060, 10_120] {
        ctx.on_edge(t);
    }
    board.now_ms = 10_200;
    sched.run_once(&mut board).unwrap();

    let pulses = board.published_on(PULSE_TOPIC);
    assert_eq!(pulses.len(), 1);
    let event = &pulses[0];
    assert_eq!(event["controller_id"], "water_meter_controller_001");
    assert_eq!(event["meter_name"], "Cold water");
    assert_eq!(event["pulse_count"], 3);
    assert_eq!(event["liters"], 30.0);
    assert_eq!(event["timestamp"], 10_200);
    assert_eq!(ctx.pulses.tally().pending, 0);
    assert_eq!(ctx.pulses.total(), 3);
}

#[test]
fn scenario_3_heartbeat_without_pulses_reports_unchanged_total() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();

    ctx.on_edge(1_000);
    ctx.on_edge(2_000);
    sched.run_once(&mut board).unwrap();
    board.clear_calls();

    // 30 s pass with no pulses; the timer raises the flag.
    board.now_ms += 30_000;
    ctx.on_heartbeat_tick();
    sched.run_once(&mut board).unwrap();

    let published = board.published();
    assert_eq!(published.len(), 1);
    let (topic, status) = &published[0];
    assert_eq!(topic, STATUS_TOPIC);
    assert_eq!(status["status"], "online");
    assert_eq!(status["total_pulses"], 2);
    assert_eq!(status["total_liters"], 20.0);
    assert_eq!(status["ip_address"], "192.168.12.77");
    assert_eq!(status["rssi"], -58);
    assert_eq!(status["free_heap"], 180_000);
    assert_eq!(status["firmware_version"], "1.0.0");
    assert!(!ctx.events.is_pending(Event::HeartbeatDue));
}

#[test]
fn uptime_is_seconds_since_boot() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 5_000).unwrap();
    let mut board = MockBoard::new();
    board.now_ms = 5_000;
    sched.run_once(&mut board).unwrap();
    board.clear_calls();

    board.now_ms = 65_500;
    ctx.on_heartbeat_tick();
    sched.run_once(&mut board).unwrap();

    let status = &board.published_on(STATUS_TOPIC)[0];
    assert_eq!(status["uptime"], 60);
    assert_eq!(status["timestamp"], 65_500);
}

#[test]
fn heartbeat_never_consumes_pending() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();

    ctx.on_edge(1_000);
    ctx.events.clear(Event::PulseDue);
    ctx.on_heartbeat_tick();
    sched.run_once(&mut board).unwrap();

    assert_eq!(ctx.pulses.tally().pending, 1);
}

#[test]
fn no_pulse_event_without_pending_pulses() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();

    ctx.events.raise(Event::PulseDue);
    sched.run_once(&mut board).unwrap();

    assert!(board.published_on(PULSE_TOPIC).is_empty());
    assert!(!ctx.events.is_pending(Event::PulseDue));
}

#[test]
fn discarded_pulses_are_gone_for_good() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();

    ctx.on_edge(1_000);
    ctx.on_edge(2_000);
    board.refuse_publish = true;
    sched.run_once(&mut board).unwrap();
    board.refuse_publish = false;
    ctx.on_edge(3_000);
    sched.run_once(&mut board).unwrap();

    let pulses = board.published_on(PULSE_TOPIC);
    assert_eq!(pulses.len(), 1);
    assert_eq!(pulses[0]["pulse_count"], 1);
    assert_eq!(ctx.pulses.total(), 3);
}

#[test]
fn requeued_pulses_ride_along_with_the_next_event() {
    let cfg = flowmeter::config::DeviceConfig {
        publish_failure: PublishFailurePolicy::Requeue,
        ..config()
    };
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();

    ctx.on_edge(1_000);
    ctx.on_edge(2_000);
    board.refuse_publish = true;
    sched.run_once(&mut board).unwrap();
    board.refuse_publish = false;
    sched.run_once(&mut board).unwrap();

    let pulses = board.published_on(PULSE_TOPIC);
    assert_eq!(pulses.len(), 1);
    assert_eq!(pulses[0]["pulse_count"], 2);
    assert_eq!(pulses[0]["liters"], 20.0);
    assert_eq!(ctx.pulses.total(), 2);
}

#[test]
fn every_pass_ends_with_the_loop_yield() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();
    sched.run_once(&mut board).unwrap();

    assert_eq!(board.calls.last(), Some(&BoardCall::Delay(10)));
    assert_eq!(board.count(|c| *c == BoardCall::Delay(10)), 2);
}
