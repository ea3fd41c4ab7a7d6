use crate::console::Console;
use crate::remote::SharedApi;
use crate::snapshot::MatchStateSnapshot;

/// The control side's best-known snapshot.
pub struct MatchStateStore {
    api: SharedApi,
    current: MatchStateSnapshot,
    last_error: Option<String>,
    console: Console,
}

impl MatchStateStore {
    pub fn new(api: SharedApi, console: Console) -> Self {
        Self {
            api,
            current: MatchStateSnapshot::default(),
            last_error: None,
            console,
        }
    }

    /// Pulls the latest snapshot. Failures are logged and leave `current()` as it
    /// was; the returned value is always the store's snapshot after the attempt.
    pub fn fetch(&mut self) -> MatchStateSnapshot {
        match self.api.fetch_snapshot() {
            Ok(snapshot) => {
                self.current = snapshot.normalized();
                self.last_error = None;
            }
            Err(err) => {
                self.console.warn(format!("Snapshot fetch error: {err}"));
                self.last_error = Some(err.to_string());
            }
        }
        self.current.clone()
    }

    pub fn current(&self) -> MatchStateSnapshot {
        self.current.clone()
    }

    pub fn adopt(&mut self, snapshot: MatchStateSnapshot) {
        self.current = snapshot.normalized();
        self.last_error = None;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
