use anyhow::Result;
use thiserror::Error;

use crate::bridge::CrossWindowBridge;
use crate::console::Console;
use crate::remote::{RemoteError, SharedApi};
use crate::snapshot::{DisplayConfig, MatchStateSnapshot, Team};
use crate::store::MatchStateStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0}")]
    Rejected(String),
    #[error("Could not reach the scoring service. Try again.")]
    Transport,
}

impl From<RemoteError> for ActionError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected { message, .. } => ActionError::Rejected(message),
            RemoteError::Transport(_) | RemoteError::Decode(_) => ActionError::Transport,
        }
    }
}

pub fn scoring_enabled(snapshot: &MatchStateSnapshot) -> bool {
    !snapshot.terminado
}

pub fn golden_point_enabled(snapshot: &MatchStateSnapshot) -> bool {
    !snapshot.terminado
}

/// Whether the tie-break toggle makes sense right now: games level at the
/// threshold, or a tie-break already running that may need switching off.
pub fn tie_break_offered(snapshot: &MatchStateSnapshot, threshold: u32) -> bool {
    snapshot.tie_break || (snapshot.games.a == threshold && snapshot.games.b == threshold)
}

/// Issues scoring actions and adopts whatever the resource answers with.
///
/// Every success updates the store and pushes the result to an open display.
/// Failures leave local state alone and are never retried here.
pub struct ActionDispatcher {
    api: SharedApi,
    store: MatchStateStore,
    bridge: CrossWindowBridge,
    config: DisplayConfig,
    console: Console,
}

impl ActionDispatcher {
    pub fn new(
        api: SharedApi,
        store: MatchStateStore,
        bridge: CrossWindowBridge,
        config: DisplayConfig,
        console: Console,
    ) -> Self {
        Self {
            api,
            store,
            bridge,
            config,
            console,
        }
    }

    pub fn current(&self) -> MatchStateSnapshot {
        self.store.current()
    }

    pub fn store(&self) -> &MatchStateStore {
        &self.store
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DisplayConfig) {
        self.config = config;
        self.push(false);
    }

    pub fn score_point(&mut self, team: Team) -> Result<MatchStateSnapshot, ActionError> {
        let snapshot = self.api.score_point(team).map_err(|err| self.failed("point", err))?;
        self.store.adopt(snapshot);
        self.push(false);
        Ok(self.store.current())
    }

    pub fn reset(&mut self) -> Result<MatchStateSnapshot, ActionError> {
        let snapshot = self.api.reset().map_err(|err| self.failed("reset", err))?;
        self.store.adopt(snapshot);
        self.push(true);
        Ok(self.store.current())
    }

    pub fn set_tie_break(&mut self, active: bool) -> Result<MatchStateSnapshot, ActionError> {
        self.api
            .set_tie_break(active)
            .map_err(|err| self.failed("tie-break", err))?;
        Ok(self.refresh_after_ack())
    }

    pub fn set_golden_point(&mut self, active: bool) -> Result<MatchStateSnapshot, ActionError> {
        self.api
            .set_golden_point(active)
            .map_err(|err| self.failed("golden point", err))?;
        Ok(self.refresh_after_ack())
    }

    pub fn finalize(&mut self) -> Result<MatchStateSnapshot, ActionError> {
        self.api.finalize().map_err(|err| self.failed("finalize", err))?;
        Ok(self.refresh_after_ack())
    }

    /// Periodic refresh. Returns true when the snapshot changed and was pushed.
    pub fn poll(&mut self) -> bool {
        let before = self.store.current();
        let after = self.store.fetch();
        if after == before {
            return false;
        }
        self.push(false);
        true
    }

    pub fn open_spectator(&mut self) -> Result<bool> {
        let snapshot = self.store.current();
        self.bridge.open(&self.config, &snapshot)
    }

    pub fn close_spectator(&mut self) {
        self.bridge.close();
    }

    pub fn spectator_open(&mut self) -> bool {
        self.bridge.is_open()
    }

    fn refresh_after_ack(&mut self) -> MatchStateSnapshot {
        let snapshot = self.store.fetch();
        self.push(false);
        if self.store.last_error().is_some() {
            // The action landed but our copy may be stale; let the display pull.
            self.bridge.request_refresh();
        }
        snapshot
    }

    fn push(&mut self, fresh_match: bool) {
        let snapshot = self.store.current();
        self.bridge.push(&snapshot, &self.config, fresh_match);
    }

    fn failed(&self, action: &str, err: RemoteError) -> ActionError {
        self.console.warn(format!("Action {action} failed: {err}"));
        ActionError::from(err)
    }
}
