use std::time::{Duration, Instant};

use crate::bootstrap::BootstrapPayload;
use crate::bridge::BridgeMessage;
use crate::console::Console;
use crate::format::ScoreboardView;
use crate::remote::RemoteError;
use crate::snapshot::{DisplayConfig, MatchStateSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectatorPhase {
    Bootstrapping,
    Live,
}

/// Work the host must perform on the sync's behalf; the result comes back via
/// [`SpectatorSync::on_fetched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEffect {
    Fetch,
}

/// Match time shown on the display. Counts whole seconds while running.
#[derive(Debug, Clone, Default)]
pub struct PresentationClock {
    elapsed: Duration,
    last_tick: Option<Instant>,
    resets: u32,
}

impl PresentationClock {
    pub fn tick(&mut self, now: Instant, running: bool) {
        if let Some(last) = self.last_tick {
            if running {
                self.elapsed += now.saturating_duration_since(last);
            }
        }
        self.last_tick = Some(now);
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.last_tick = None;
        self.resets += 1;
    }

    pub fn seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }
}

/// The display's mirror of the match. Never authoritative: every sync event
/// replaces the mirrored snapshot wholesale and the most recent one wins.
pub struct SpectatorSync {
    phase: SpectatorPhase,
    snapshot: MatchStateSnapshot,
    config: DisplayConfig,
    clock: PresentationClock,
    adoptions: usize,
    poll_interval: Duration,
    last_poll: Option<Instant>,
    console: Console,
}

impl SpectatorSync {
    pub fn new(config: DisplayConfig, poll_interval: Duration, console: Console) -> Self {
        Self {
            phase: SpectatorPhase::Bootstrapping,
            snapshot: MatchStateSnapshot::default(),
            config,
            clock: PresentationClock::default(),
            adoptions: 0,
            poll_interval,
            last_poll: None,
            console,
        }
    }

    /// Seeds from the bootstrap payload when there is one. The returned fetch must
    /// always be run: the payload can be stale or missing.
    pub fn start(&mut self, bootstrap: Option<BootstrapPayload>) -> SyncEffect {
        match bootstrap {
            Some(payload) => {
                self.snapshot = payload.snapshot.normalized();
                self.config = payload.config;
                self.adoptions += 1;
                self.console.info("Bootstrapped from saved state");
            }
            None => self.console.info("No bootstrap state; waiting for fetch"),
        }
        SyncEffect::Fetch
    }

    pub fn on_message(&mut self, msg: BridgeMessage) -> Option<SyncEffect> {
        match msg {
            BridgeMessage::Snapshot {
                snapshot,
                config,
                fresh_match,
            } => {
                self.snapshot = snapshot.normalized();
                self.config = config;
                self.adoptions += 1;
                if fresh_match {
                    self.clock.reset();
                }
                None
            }
            BridgeMessage::Refresh => Some(SyncEffect::Fetch),
        }
    }

    pub fn on_fetched(&mut self, result: Result<MatchStateSnapshot, RemoteError>) {
        match result {
            Ok(snapshot) => {
                self.snapshot = snapshot.normalized();
                self.adoptions += 1;
            }
            Err(err) => self.console.warn(format!("Display fetch error: {err}")),
        }
        if self.phase == SpectatorPhase::Bootstrapping {
            self.phase = SpectatorPhase::Live;
        }
    }

    pub fn tick(&mut self, now: Instant) {
        let running = !self.snapshot.terminado;
        self.clock.tick(now, running);
    }

    /// Own periodic pull, independent of anything the control side sends.
    pub fn poll_due(&mut self, now: Instant) -> Option<SyncEffect> {
        if self.phase != SpectatorPhase::Live {
            return None;
        }
        let Some(last) = self.last_poll else {
            // The startup fetch just ran; count from here.
            self.last_poll = Some(now);
            return None;
        };
        if now.saturating_duration_since(last) < self.poll_interval {
            return None;
        }
        self.last_poll = Some(now);
        Some(SyncEffect::Fetch)
    }

    pub fn view(&self) -> ScoreboardView {
        ScoreboardView::build(&self.snapshot, &self.config, self.clock.seconds())
    }

    pub fn phase(&self) -> SpectatorPhase {
        self.phase
    }

    pub fn snapshot(&self) -> &MatchStateSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn clock(&self) -> &PresentationClock {
        &self.clock
    }

    pub fn adoptions(&self) -> usize {
        self.adoptions
    }
}
