use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use padel_scoreboard::bootstrap::{BootstrapPayload, MemoryBootstrap};
use padel_scoreboard::bridge::{
    BridgeMessage, ChannelLauncher, CrossWindowBridge, decode_line, encode_line,
    read_bridge_messages,
};
use padel_scoreboard::console::Console;
use padel_scoreboard::dispatch::ActionDispatcher;
use padel_scoreboard::fake_remote::FakeScoreboard;
use padel_scoreboard::format::ScoreboardView;
use padel_scoreboard::remote::{RemoteError, ScoreboardApi};
use padel_scoreboard::snapshot::{DisplayConfig, MatchStateSnapshot, Team, TeamPair};
use padel_scoreboard::spectator::{SpectatorPhase, SpectatorSync, SyncEffect};
use padel_scoreboard::store::MatchStateStore;

fn sync() -> SpectatorSync {
    SpectatorSync::new(DisplayConfig::default(), Duration::from_secs(15), Console::new())
}

fn live_sync(api: &FakeScoreboard) -> SpectatorSync {
    let mut sync = sync();
    assert_eq!(sync.start(None), SyncEffect::Fetch);
    sync.on_fetched(api.fetch_snapshot());
    sync
}

fn push(snapshot: MatchStateSnapshot, fresh_match: bool) -> BridgeMessage {
    BridgeMessage::Snapshot {
        snapshot,
        config: DisplayConfig::default(),
        fresh_match,
    }
}

fn mid_match() -> MatchStateSnapshot {
    MatchStateSnapshot {
        points: TeamPair::new(2, 1),
        games: TeamPair::new(3, 2),
        sets: vec![TeamPair::new(6, 4), TeamPair::new(3, 2)],
        ..MatchStateSnapshot::default()
    }
}

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn startup_always_fetches_even_with_bootstrap() {
    let config = DisplayConfig {
        team_a: "Lola / Marta".to_string(),
        ..DisplayConfig::default()
    };
    let stale = mid_match();
    let mut sync = sync();

    let effect = sync.start(Some(BootstrapPayload::new(stale.clone(), config.clone())));
    assert_eq!(effect, SyncEffect::Fetch);
    assert_eq!(sync.phase(), SpectatorPhase::Bootstrapping);
    assert_eq!(sync.snapshot(), &stale);
    assert_eq!(sync.config(), &config);

    let remote = MatchStateSnapshot {
        points: TeamPair::new(3, 1),
        ..stale
    };
    sync.on_fetched(Ok(remote.clone()));
    assert_eq!(sync.phase(), SpectatorPhase::Live);
    assert_eq!(sync.snapshot(), &remote);
    assert_eq!(sync.config(), &config, "fetch does not touch display config");
}

#[test]
fn startup_without_bootstrap_goes_live_even_if_fetch_fails() {
    let mut sync = sync();
    assert_eq!(sync.start(None), SyncEffect::Fetch);
    sync.on_fetched(Err(RemoteError::Transport("offline".to_string())));
    assert_eq!(sync.phase(), SpectatorPhase::Live);
    assert_eq!(sync.snapshot(), &MatchStateSnapshot::default());
}

#[test]
fn push_replaces_snapshot_and_config_wholesale() {
    let fake = FakeScoreboard::with_state(mid_match());
    let mut sync = live_sync(&fake);

    let config = DisplayConfig {
        court_title: "Pista Central".to_string(),
        ..DisplayConfig::default()
    };
    let next = MatchStateSnapshot {
        points: TeamPair::new(0, 0),
        games: TeamPair::new(4, 2),
        ..mid_match()
    };
    let effect = sync.on_message(BridgeMessage::Snapshot {
        snapshot: next.clone(),
        config: config.clone(),
        fresh_match: false,
    });
    assert_eq!(effect, None);
    assert_eq!(sync.snapshot(), &next);
    assert_eq!(sync.config(), &config);
}

#[test]
fn refresh_request_triggers_one_fetch_and_no_clock_reset() {
    let fake = FakeScoreboard::with_state(mid_match());
    let mut sync = live_sync(&fake);
    let fetches = fake.fetch_count();
    let adoptions = sync.adoptions();
    let resets = sync.clock().resets();

    let t0 = Instant::now();
    sync.tick(t0);
    sync.tick(t0 + Duration::from_secs(4));

    fake.set_state(MatchStateSnapshot {
        points: TeamPair::new(3, 1),
        ..mid_match()
    });
    let effect = sync.on_message(BridgeMessage::Refresh);
    assert_eq!(effect, Some(SyncEffect::Fetch));
    sync.on_fetched(fake.fetch_snapshot());

    assert_eq!(fake.fetch_count(), fetches + 1);
    assert_eq!(sync.adoptions(), adoptions + 1);
    assert_eq!(sync.clock().resets(), resets);
    assert_eq!(sync.clock().seconds(), 4);
    assert_eq!(sync.snapshot().points, TeamPair::new(3, 1));
}

#[test]
fn clock_runs_until_match_ends() {
    let mut sync = sync();
    sync.start(None);
    sync.on_fetched(Ok(MatchStateSnapshot::default()));

    let t0 = Instant::now();
    sync.tick(t0);
    sync.tick(t0 + Duration::from_millis(900));
    assert_eq!(sync.view().clock, "0:00");
    sync.tick(t0 + Duration::from_millis(1_100));
    assert_eq!(sync.view().clock, "0:01");
    sync.tick(t0 + Duration::from_secs(65));
    assert_eq!(sync.view().clock, "1:05");

    let finished = MatchStateSnapshot {
        terminado: true,
        ..MatchStateSnapshot::default()
    };
    sync.on_message(push(finished, false));
    sync.tick(t0 + Duration::from_secs(300));
    assert_eq!(sync.view().clock, "1:05");
}

#[test]
fn zero_score_alone_never_resets_the_clock() {
    let mut sync = sync();
    sync.start(None);
    sync.on_fetched(Ok(MatchStateSnapshot::default()));

    let t0 = Instant::now();
    sync.tick(t0);
    sync.tick(t0 + Duration::from_secs(30));

    sync.on_message(push(MatchStateSnapshot::default(), false));
    sync.on_fetched(Ok(MatchStateSnapshot::default()));
    assert_eq!(sync.clock().resets(), 0);
    assert_eq!(sync.clock().seconds(), 30);
}

#[test]
fn fresh_match_push_resets_the_clock_once() {
    let mut sync = sync();
    sync.start(None);
    sync.on_fetched(Ok(mid_match()));

    let t0 = Instant::now();
    sync.tick(t0);
    sync.tick(t0 + Duration::from_secs(90));
    assert_eq!(sync.clock().seconds(), 90);

    sync.on_message(push(MatchStateSnapshot::default(), true));
    assert_eq!(sync.clock().resets(), 1);
    assert_eq!(sync.clock().seconds(), 0);

    sync.on_message(push(
        MatchStateSnapshot {
            points: TeamPair::new(1, 0),
            ..MatchStateSnapshot::default()
        },
        false,
    ));
    sync.tick(t0 + Duration::from_secs(91));
    sync.tick(t0 + Duration::from_secs(93));
    assert_eq!(sync.clock().resets(), 1);
    assert_eq!(sync.clock().seconds(), 2);
}

#[test]
fn own_poll_waits_for_the_interval() {
    let mut sync = sync();
    let t0 = Instant::now();
    sync.start(None);
    assert_eq!(sync.poll_due(t0), None, "not live yet");

    sync.on_fetched(Ok(MatchStateSnapshot::default()));
    assert_eq!(sync.poll_due(t0), None);
    assert_eq!(sync.poll_due(t0 + Duration::from_secs(10)), None);
    assert_eq!(sync.poll_due(t0 + Duration::from_secs(15)), Some(SyncEffect::Fetch));
    assert_eq!(sync.poll_due(t0 + Duration::from_secs(16)), None);
}

#[test]
fn pushed_snapshot_renders_like_direct_formatting() {
    let fake = Arc::new(FakeScoreboard::with_state(MatchStateSnapshot {
        points: TeamPair::new(3, 3),
        games: TeamPair::new(5, 4),
        sets: vec![TeamPair::new(4, 6), TeamPair::new(5, 4)],
        bola_de_oro: true,
        ..MatchStateSnapshot::default()
    }));
    let console = Console::new();
    let config = DisplayConfig {
        team_a: "Lola / Marta".to_string(),
        team_b: "Ana / Sara".to_string(),
        court_title: "Pista Central".to_string(),
        court_id: "3".to_string(),
        court_kind: "cristal".to_string(),
    };
    let (launcher, hosts) = ChannelLauncher::new();
    let bridge = CrossWindowBridge::new(
        Box::new(launcher),
        Some(Box::new(MemoryBootstrap::new())),
        console.clone(),
    );
    let store = MatchStateStore::new(fake.clone(), console.clone());
    let mut dispatcher =
        ActionDispatcher::new(fake.clone(), store, bridge, config.clone(), console);
    dispatcher.open_spectator().expect("open display");
    let display = hosts.try_recv().expect("display launched");

    let sent = dispatcher.score_point(Team::B).expect("point");
    let mut sync = sync();
    sync.start(None);
    sync.on_fetched(Err(RemoteError::Transport("display offline".to_string())));
    for msg in display.inbox.try_iter() {
        // Through the wire encoding as the display process would see it.
        let line = encode_line(&msg).expect("encode");
        sync.on_message(decode_line(&line).expect("decode"));
    }

    assert_eq!(sync.view(), ScoreboardView::build(&sent, &config, 0));
}

#[test]
fn reader_forwards_good_lines_and_skips_bad_ones() {
    let console = Console::new();
    let (tx, rx) = mpsc::channel();
    let raw = read_fixture("bridge_messages.jsonl");
    read_bridge_messages(Cursor::new(raw), tx, &console);

    let msgs: Vec<BridgeMessage> = rx.try_iter().collect();
    assert_eq!(msgs.len(), 3);
    match &msgs[0] {
        BridgeMessage::Snapshot {
            snapshot,
            config,
            fresh_match,
        } => {
            assert_eq!(snapshot.points, TeamPair::new(4, 3));
            assert_eq!(config.court_kind, "cristal");
            assert!(!fresh_match);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(msgs[1], BridgeMessage::Refresh);
    match &msgs[2] {
        BridgeMessage::Snapshot {
            snapshot,
            fresh_match,
            ..
        } => {
            assert_eq!(snapshot, &MatchStateSnapshot::default());
            assert!(fresh_match);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(console.contains("Skipping bridge line"));
}

#[test]
fn wire_tags_are_stable() {
    let refresh = encode_line(&BridgeMessage::Refresh).expect("encode");
    assert_eq!(refresh, r#"{"type":"refresh"}"#);

    let snap = encode_line(&push(MatchStateSnapshot::default(), true)).expect("encode");
    let value: serde_json::Value = serde_json::from_str(&snap).expect("json");
    assert_eq!(value["type"], "snapshot");
    assert_eq!(value["fresh_match"], true);
    assert_eq!(value["snapshot"]["points"]["B"], 0);
}
