use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::remote::{RemoteError, ScoreboardApi};
use crate::snapshot::{MatchStateSnapshot, Team, parse_snapshot_json};

/// Offline stand-in for the scoring resource. Points only ever count up; there is
/// no game or set progression here.
///
/// When file-backed, every call re-reads the state file so a control process and a
/// display process observe the same match.
#[derive(Debug, Default)]
pub struct FakeScoreboard {
    state: Mutex<MatchStateSnapshot>,
    path: Option<PathBuf>,
    action_failures: Mutex<VecDeque<RemoteError>>,
    fetch_failures: Mutex<VecDeque<RemoteError>>,
    fetches: AtomicUsize,
    actions: AtomicUsize,
}

impl FakeScoreboard {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_state(snapshot: MatchStateSnapshot) -> Self {
        let fake = Self::default();
        fake.set_state(snapshot);
        fake
    }

    pub fn file_backed(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Self::default()
        }
    }

    pub fn set_state(&self, snapshot: MatchStateSnapshot) {
        self.update(|state| *state = snapshot.normalized());
    }

    pub fn state(&self) -> MatchStateSnapshot {
        self.load();
        self.state.lock().expect("fake state lock poisoned").clone()
    }

    /// Queues an error for the next scoring action.
    pub fn fail_next_action(&self, err: RemoteError) {
        self.action_failures
            .lock()
            .expect("fake failures lock poisoned")
            .push_back(err);
    }

    /// Queues an error for the next snapshot fetch.
    pub fn fail_next_fetch(&self, err: RemoteError) {
        self.fetch_failures
            .lock()
            .expect("fake failures lock poisoned")
            .push_back(err);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn action_count(&self) -> usize {
        self.actions.load(Ordering::SeqCst)
    }

    fn take_failure(queue: &Mutex<VecDeque<RemoteError>>) -> Result<(), RemoteError> {
        match queue
            .lock()
            .expect("fake failures lock poisoned")
            .pop_front()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn load(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let Ok(raw) = fs::read_to_string(path) else {
            return;
        };
        if let Ok(snapshot) = parse_snapshot_json(&raw) {
            *self.state.lock().expect("fake state lock poisoned") = snapshot;
        }
    }

    fn save(&self, snapshot: &MatchStateSnapshot) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let Ok(json) = serde_json::to_string(snapshot) else {
            return;
        };
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, path);
        }
    }

    fn update(&self, f: impl FnOnce(&mut MatchStateSnapshot)) -> MatchStateSnapshot {
        self.load();
        let mut state = self.state.lock().expect("fake state lock poisoned");
        f(&mut state);
        let out = state.clone();
        drop(state);
        self.save(&out);
        out
    }

    fn action(&self) -> Result<(), RemoteError> {
        self.actions.fetch_add(1, Ordering::SeqCst);
        Self::take_failure(&self.action_failures)
    }
}

impl ScoreboardApi for FakeScoreboard {
    fn fetch_snapshot(&self) -> Result<MatchStateSnapshot, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Self::take_failure(&self.fetch_failures)?;
        Ok(self.state())
    }

    fn score_point(&self, team: Team) -> Result<MatchStateSnapshot, RemoteError> {
        self.action()?;
        if self.state().terminado {
            return Err(RemoteError::Rejected {
                status: 409,
                message: "match already finished".to_string(),
            });
        }
        Ok(self.update(|state| match team {
            Team::A => state.points.a = state.points.a.saturating_add(1),
            Team::B => state.points.b = state.points.b.saturating_add(1),
        }))
    }

    fn reset(&self) -> Result<MatchStateSnapshot, RemoteError> {
        self.action()?;
        Ok(self.update(|state| *state = MatchStateSnapshot::default()))
    }

    fn set_tie_break(&self, active: bool) -> Result<(), RemoteError> {
        self.action()?;
        self.update(|state| state.tie_break = active);
        Ok(())
    }

    fn set_golden_point(&self, active: bool) -> Result<(), RemoteError> {
        self.action()?;
        self.update(|state| state.bola_de_oro = active);
        Ok(())
    }

    fn finalize(&self) -> Result<(), RemoteError> {
        self.action()?;
        self.update(|state| state.terminado = true);
        Ok(())
    }
}
