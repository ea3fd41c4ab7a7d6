use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use padel_scoreboard::bridge::{ChannelLauncher, CrossWindowBridge};
use padel_scoreboard::console::Console;
use padel_scoreboard::control::{
    ControlCommand, ControlDelta, ControlState, NoticeKind, apply_delta, spawn_control_worker,
};
use padel_scoreboard::dispatch::ActionDispatcher;
use padel_scoreboard::fake_remote::FakeScoreboard;
use padel_scoreboard::remote::RemoteError;
use padel_scoreboard::snapshot::{DisplayConfig, MatchStateSnapshot, Team, TeamPair};
use padel_scoreboard::store::MatchStateStore;

#[test]
fn store_keeps_last_good_snapshot_on_fetch_failure() {
    let fake = Arc::new(FakeScoreboard::with_state(MatchStateSnapshot {
        points: TeamPair::new(1, 1),
        ..MatchStateSnapshot::default()
    }));
    let console = Console::new();
    let mut store = MatchStateStore::new(fake.clone(), console.clone());

    let first = store.fetch();
    assert_eq!(first.points, TeamPair::new(1, 1));
    assert!(store.last_error().is_none());

    fake.fail_next_fetch(RemoteError::Decode("invalid snapshot json".to_string()));
    let second = store.fetch();
    assert_eq!(second, first);
    assert_eq!(store.current(), first);
    assert!(store.last_error().is_some());
    assert!(console.contains("Snapshot fetch error"));

    store.fetch();
    assert!(store.last_error().is_none());
}

#[test]
fn worker_runs_commands_in_order_and_closes_display_on_shutdown() {
    let fake = Arc::new(FakeScoreboard::in_memory());
    let console = Console::new();
    let (launcher, hosts) = ChannelLauncher::new();
    let bridge = CrossWindowBridge::new(Box::new(launcher), None, console.clone());
    let store = MatchStateStore::new(fake.clone(), console.clone());
    let dispatcher = ActionDispatcher::new(
        fake.clone(),
        store,
        bridge,
        DisplayConfig::default(),
        console.clone(),
    );

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let worker = spawn_control_worker(dispatcher, console, Duration::from_secs(60), tx, cmd_rx);

    cmd_tx.send(ControlCommand::OpenSpectator).expect("send");
    cmd_tx.send(ControlCommand::ScorePoint(Team::A)).expect("send");
    cmd_tx.send(ControlCommand::ScorePoint(Team::A)).expect("send");
    cmd_tx.send(ControlCommand::ScorePoint(Team::B)).expect("send");
    cmd_tx.send(ControlCommand::Finalize).expect("send");
    cmd_tx.send(ControlCommand::ScorePoint(Team::B)).expect("send");
    cmd_tx.send(ControlCommand::Shutdown).expect("send");
    worker.join().expect("worker exits");

    let display = hosts.try_recv().expect("display launched");
    assert!(display.is_closed(), "shutdown closes the display");
    assert_eq!(display.inbox.try_iter().count(), 4);

    let deltas: Vec<ControlDelta> = rx.try_iter().collect();
    let last_snapshot = deltas.iter().rev().find_map(|delta| match delta {
        ControlDelta::Snapshot(snap) => Some(snap.clone()),
        _ => None,
    });
    let final_state = fake.state();
    assert_eq!(final_state.points, TeamPair::new(2, 1));
    assert!(final_state.terminado);
    let snap = last_snapshot.expect("worker reported a snapshot");
    assert_eq!(snap.points, TeamPair::new(2, 1));
    assert!(deltas.iter().any(|delta| matches!(
        delta,
        ControlDelta::ActionFailed { message, .. } if message == "match already finished"
    )));
}

#[test]
fn unreachable_resource_raises_one_notice_per_outage() {
    let fake = Arc::new(FakeScoreboard::with_state(MatchStateSnapshot {
        points: TeamPair::new(2, 0),
        ..MatchStateSnapshot::default()
    }));
    let console = Console::new();
    let (launcher, _hosts) = ChannelLauncher::new();
    let bridge = CrossWindowBridge::new(Box::new(launcher), None, console.clone());
    let mut store = MatchStateStore::new(fake.clone(), console.clone());
    store.fetch();
    let dispatcher = ActionDispatcher::new(
        fake.clone(),
        store,
        bridge,
        DisplayConfig::default(),
        console.clone(),
    );

    fake.fail_next_fetch(RemoteError::Transport("connection refused".to_string()));
    fake.fail_next_fetch(RemoteError::Transport("connection refused".to_string()));
    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let worker = spawn_control_worker(dispatcher, console, Duration::from_secs(60), tx, cmd_rx);
    cmd_tx.send(ControlCommand::Refresh).expect("send");
    cmd_tx.send(ControlCommand::Shutdown).expect("send");
    worker.join().expect("worker exits");

    let deltas: Vec<ControlDelta> = rx.try_iter().collect();
    let outages = deltas
        .iter()
        .filter(|delta| matches!(delta, ControlDelta::FetchFailed(_)))
        .count();
    assert_eq!(outages, 1, "second failure in a row stays quiet");

    let mut state = ControlState::new(DisplayConfig::default(), 6);
    for delta in deltas {
        apply_delta(&mut state, delta);
    }
    assert_eq!(state.snapshot.points, TeamPair::new(2, 0));
    assert!(state.stale.is_some());
    let notice = state.notice.as_ref().expect("outage notice shown");
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("connection refused"));
    state.dismiss_notice();
    assert!(state.notice.is_none());
}
