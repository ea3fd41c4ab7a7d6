use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::console::Console;
use crate::dispatch::ActionDispatcher;
use crate::snapshot::{DisplayConfig, MatchStateSnapshot, Team};

const NOTICE_KEEP_SECS: u64 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    ScorePoint(Team),
    Reset,
    SetTieBreak(bool),
    SetGoldenPoint(bool),
    Finalize,
    OpenSpectator,
    CloseSpectator,
    Refresh,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlDelta {
    Snapshot(MatchStateSnapshot),
    Stale(Option<String>),
    /// The resource became unreachable; sent once per outage.
    FetchFailed(String),
    SpectatorOpen(bool),
    ActionFailed { action: String, message: String },
    Log(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Transient, dismissible message shown over the control panel.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ControlState {
    pub snapshot: MatchStateSnapshot,
    pub config: DisplayConfig,
    pub stale: Option<String>,
    pub spectator_open: bool,
    pub notice: Option<Notice>,
    pub logs: VecDeque<String>,
    pub tie_break_at: u32,
    pub help_overlay: bool,
}

impl ControlState {
    pub fn new(config: DisplayConfig, tie_break_at: u32) -> Self {
        Self {
            snapshot: MatchStateSnapshot::default(),
            config,
            stale: None,
            spectator_open: false,
            notice: None,
            logs: VecDeque::new(),
            tie_break_at,
            help_overlay: false,
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind,
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn clear_notice_if_older(&mut self, now: Instant) {
        let expired = self.notice.as_ref().is_some_and(|notice| {
            now.saturating_duration_since(notice.shown_at) >= Duration::from_secs(NOTICE_KEEP_SECS)
        });
        if expired {
            self.notice = None;
        }
    }
}

pub fn apply_delta(state: &mut ControlState, delta: ControlDelta) {
    match delta {
        ControlDelta::Snapshot(snapshot) => state.snapshot = snapshot,
        ControlDelta::Stale(reason) => state.stale = reason,
        ControlDelta::FetchFailed(reason) => {
            state.notify(NoticeKind::Error, format!("Could not refresh the match: {reason}"));
        }
        ControlDelta::SpectatorOpen(open) => state.spectator_open = open,
        ControlDelta::ActionFailed { action, message } => {
            state.push_log(format!("[WARN] {action}: {message}"));
            state.notify(NoticeKind::Error, format!("{action}: {message}"));
        }
        ControlDelta::Log(line) => state.push_log(line),
    }
}

/// Runs every remote call off the UI thread. Commands are handled in arrival
/// order; the loop also polls the resource every `poll_interval`. Dropping the
/// command sender (or sending `Shutdown`) closes any open display and ends the
/// thread.
pub fn spawn_control_worker(
    mut dispatcher: ActionDispatcher,
    console: Console,
    poll_interval: Duration,
    tx: Sender<ControlDelta>,
    cmd_rx: Receiver<ControlCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reported_error = None;
        dispatcher.poll();
        let _ = report(&mut dispatcher, &console, &tx, &mut reported_error);
        let mut last_poll = Instant::now();

        loop {
            match cmd_rx.recv_timeout(Duration::from_millis(200)) {
                Ok(ControlCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(cmd) => handle_command(&mut dispatcher, cmd, &tx),
                Err(RecvTimeoutError::Timeout) => {}
            }

            if last_poll.elapsed() >= poll_interval {
                dispatcher.poll();
                last_poll = Instant::now();
            }
            if report(&mut dispatcher, &console, &tx, &mut reported_error).is_err() {
                break;
            }
        }

        dispatcher.close_spectator();
        for line in console.drain() {
            let _ = tx.send(ControlDelta::Log(line));
        }
    })
}

pub fn handle_command(
    dispatcher: &mut ActionDispatcher,
    cmd: ControlCommand,
    tx: &Sender<ControlDelta>,
) {
    let (action, result) = match cmd {
        ControlCommand::ScorePoint(team) => {
            (format!("Point {}", team.key()), dispatcher.score_point(team))
        }
        ControlCommand::Reset => ("Reset".to_string(), dispatcher.reset()),
        ControlCommand::SetTieBreak(active) => {
            ("Tie-break".to_string(), dispatcher.set_tie_break(active))
        }
        ControlCommand::SetGoldenPoint(active) => {
            ("Golden point".to_string(), dispatcher.set_golden_point(active))
        }
        ControlCommand::Finalize => ("Finalize".to_string(), dispatcher.finalize()),
        ControlCommand::OpenSpectator => {
            if let Err(err) = dispatcher.open_spectator() {
                let _ = tx.send(ControlDelta::ActionFailed {
                    action: "Display".to_string(),
                    message: format!("{err:#}"),
                });
            }
            return;
        }
        ControlCommand::CloseSpectator => {
            dispatcher.close_spectator();
            return;
        }
        ControlCommand::Refresh => {
            dispatcher.poll();
            return;
        }
        ControlCommand::Shutdown => return,
    };

    if let Err(err) = result {
        let _ = tx.send(ControlDelta::ActionFailed {
            action,
            message: err.to_string(),
        });
    }
}

fn report(
    dispatcher: &mut ActionDispatcher,
    console: &Console,
    tx: &Sender<ControlDelta>,
    reported_error: &mut Option<String>,
) -> Result<(), ()> {
    let error = dispatcher.store().last_error().map(str::to_string);
    let outage = match (&error, reported_error.as_ref()) {
        (Some(reason), None) => Some(ControlDelta::FetchFailed(reason.clone())),
        _ => None,
    };
    *reported_error = error.clone();

    let deltas = [
        ControlDelta::Snapshot(dispatcher.current()),
        ControlDelta::Stale(error),
        ControlDelta::SpectatorOpen(dispatcher.spectator_open()),
    ];
    let logs = console.drain().into_iter().map(ControlDelta::Log);
    for delta in deltas.into_iter().chain(outage).chain(logs) {
        tx.send(delta).map_err(|_| ())?;
    }
    Ok(())
}
