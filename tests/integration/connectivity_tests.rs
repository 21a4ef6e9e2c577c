//! Connection lifecycle: join budget, session retry, reconnect behaviour.

use crate::mock_board::{BoardCall, COMMAND_TOPIC, MockBoard, STATUS_TOPIC, config, context};

use flowmeter::app::connectivity::ConnectionState;
use flowmeter::app::ports::NetworkError;
use flowmeter::error::Error;
use flowmeter::events::Event;
use flowmeter::scheduler::Scheduler;

fn connected_board(sched: &mut Scheduler<'_>) -> MockBoard {
    let mut board = MockBoard::new();
    sched.run_once(&mut board).unwrap();
    assert_eq!(sched.link().state(), ConnectionState::Connected);
    board.clear_calls();
    board
}

#[test]
fn cold_boot_joins_connects_subscribes_then_heartbeats() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();

    sched.run_once(&mut board).unwrap();

    assert_eq!(
        board.calls[..3],
        [
            BoardCall::Join,
            BoardCall::Connect("water_meter_controller_001".into()),
            BoardCall::Subscribe(COMMAND_TOPIC.into()),
        ]
    );
    assert!(matches!(&board.calls[3], BoardCall::Publish { topic, .. } if topic == STATUS_TOPIC));
    assert_eq!(sched.link().sessions(), 1);
}

#[test]
fn join_exhaustion_restarts_device() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    board.join_failures = u32::MAX;

    let err = sched.run_once(&mut board).unwrap_err();

    assert_eq!(err, Error::Join(NetworkError::ConnectionFailed));
    assert!(!err.is_recoverable());
    assert_eq!(board.count(|c| *c == BoardCall::Join), 20);
    assert_eq!(board.count(|c| *c == BoardCall::Delay(500)), 19);
    assert_eq!(board.restarts(), 1);
    assert_eq!(board.calls.last(), Some(&BoardCall::Restart));
    assert_eq!(sched.link().state(), ConnectionState::Disconnected);
    assert!(board.published().is_empty());
}

#[test]
fn join_recovers_within_budget() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    board.join_failures = 19;

    sched.run_once(&mut board).unwrap();

    assert_eq!(board.count(|c| *c == BoardCall::Join), 20);
    assert_eq!(board.restarts(), 0);
    assert!(sched.link().is_connected());
}

#[test]
fn session_failures_retry_with_fixed_delay_without_restart() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = MockBoard::new();
    board.connect_failures = 7;

    sched.run_once(&mut board).unwrap();

    assert_eq!(board.count(|c| matches!(c, BoardCall::Connect(_))), 8);
    assert_eq!(board.count(|c| *c == BoardCall::Delay(5000)), 7);
    assert_eq!(board.restarts(), 0);
    assert_eq!(board.published_on(STATUS_TOPIC).len(), 1);
}

#[test]
fn scenario_4_session_drop_reconnects_after_two_failures() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = connected_board(&mut sched);

    board.drop_session();
    board.connect_failures = 2;
    sched.run_once(&mut board).unwrap();

    let client = || BoardCall::Connect("water_meter_controller_001".into());
    assert_eq!(
        board.calls[..6],
        [
            client(),
            BoardCall::Delay(5000),
            client(),
            BoardCall::Delay(5000),
            client(),
            BoardCall::Subscribe(COMMAND_TOPIC.into()),
        ]
    );
    assert_eq!(board.count(|c| matches!(c, BoardCall::Subscribe(_))), 1);
    assert_eq!(board.published_on(STATUS_TOPIC).len(), 1);
    assert_eq!(board.published().len(), 1);
    assert_eq!(sched.link().sessions(), 2);

    // Next pass is steady state: no reconnect effects repeat.
    board.clear_calls();
    sched.run_once(&mut board).unwrap();
    assert_eq!(board.calls, [BoardCall::Delay(10)]);
}

#[test]
fn network_loss_rejoins_before_session() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = connected_board(&mut sched);

    board.drop_network();
    sched.run_once(&mut board).unwrap();

    assert_eq!(board.calls[0], BoardCall::Join);
    assert!(matches!(board.calls[1], BoardCall::Connect(_)));
    assert!(sched.link().is_connected());
}

#[test]
fn heartbeat_is_first_message_after_reconnect() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = connected_board(&mut sched);

    board.drop_session();
    // Pulses and a heartbeat tick land while the link is down.
    ctx.on_edge(1_000);
    ctx.on_edge(2_000);
    ctx.on_heartbeat_tick();
    board.inject_command(br#"{"command":"status"}"#);
    sched.run_once(&mut board).unwrap();

    let published = board.published();
    assert_eq!(published[0].0, STATUS_TOPIC);
    assert_eq!(published[0].1["total_pulses"], 2);
    assert!(published.iter().skip(1).any(|(t, _)| t.contains("/pulse/")));
}

#[test]
fn heartbeat_tick_during_outage_yields_one_status() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = connected_board(&mut sched);

    board.drop_session();
    board.connect_failures = 7;
    ctx.on_heartbeat_tick();
    sched.run_once(&mut board).unwrap();

    assert_eq!(board.published_on(STATUS_TOPIC).len(), 1);
    assert!(!ctx.events.is_pending(Event::HeartbeatDue));

    // The next tick is reported normally.
    board.clear_calls();
    ctx.on_heartbeat_tick();
    sched.run_once(&mut board).unwrap();
    assert_eq!(board.published_on(STATUS_TOPIC).len(), 1);
}

#[test]
fn network_loss_during_session_retries_falls_back_to_join() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = connected_board(&mut sched);

    board.drop_session();
    board.lose_network_on_connect = true;
    sched.run_once(&mut board).unwrap();

    let client = || BoardCall::Connect("water_meter_controller_001".into());
    assert_eq!(board.calls[..3], [client(), BoardCall::Join, client()]);
    assert_eq!(board.count(|c| matches!(c, BoardCall::Connect(_))), 2);
    assert_eq!(board.restarts(), 0);
    assert!(sched.link().is_connected());
}

#[test]
fn network_that_never_returns_exhausts_join_budget() {
    let cfg = config();
    let ctx = context(&cfg);
    let mut sched = Scheduler::from_config(&cfg, &ctx, 0).unwrap();
    let mut board = connected_board(&mut sched);

    board.drop_session();
    board.lose_network_on_connect = true;
    board.join_failures = u32::MAX;
    let err = sched.run_once(&mut board).unwrap_err();

    assert!(matches!(err, Error::Join(_)));
    assert_eq!(board.count(|c| *c == BoardCall::Join), cfg.wifi_join_attempts as usize);
    assert_eq!(board.count(|c| matches!(c, BoardCall::Connect(_))), 1);
    assert_eq!(board.restarts(), 1);
    assert!(!sched.link().is_connected());
}
