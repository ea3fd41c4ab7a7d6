use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::snapshot::{DisplayConfig, MatchStateSnapshot};

const BOOTSTRAP_VERSION: u32 = 1;
const CACHE_DIR: &str = "padel_scoreboard";

/// State handed to a display at startup. Written once when the display is
/// opened, read once when it starts; never kept in sync afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapPayload {
    pub version: u32,
    pub snapshot: MatchStateSnapshot,
    pub config: DisplayConfig,
    #[serde(default)]
    pub written_at: u64,
}

impl BootstrapPayload {
    pub fn new(snapshot: MatchStateSnapshot, config: DisplayConfig) -> Self {
        Self {
            version: BOOTSTRAP_VERSION,
            snapshot,
            config,
            written_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

pub trait BootstrapChannel: Send + Sync {
    fn write(&self, payload: &BootstrapPayload) -> Result<()>;
    fn read(&self) -> Result<Option<BootstrapPayload>>;
}

/// One JSON file per court under the user cache directory.
#[derive(Debug, Clone)]
pub struct FileBootstrap {
    path: PathBuf,
}

impl FileBootstrap {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location for `court_id`, or `None` when no cache directory can be
    /// resolved.
    pub fn for_court(court_id: &str) -> Option<Self> {
        let file = format!("spectator_{}.json", sanitize(court_id));
        cache_dir().map(|dir| Self::new(dir.join(file)))
    }

}

impl BootstrapChannel for FileBootstrap {
    fn write(&self, payload: &BootstrapPayload) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("create bootstrap dir")?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string(payload).context("serialize bootstrap")?;
        fs::write(&tmp, json).context("write bootstrap")?;
        fs::rename(&tmp, &self.path).context("swap bootstrap")?;
        Ok(())
    }

    fn read(&self) -> Result<Option<BootstrapPayload>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context("read bootstrap"),
        };
        let payload =
            serde_json::from_str::<BootstrapPayload>(&raw).context("invalid bootstrap json")?;
        if payload.version != BOOTSTRAP_VERSION {
            return Ok(None);
        }
        Ok(Some(BootstrapPayload {
            snapshot: payload.snapshot.normalized(),
            ..payload
        }))
    }
}

/// In-process channel, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryBootstrap {
    slot: Arc<Mutex<Option<BootstrapPayload>>>,
}

impl MemoryBootstrap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BootstrapChannel for MemoryBootstrap {
    fn write(&self, payload: &BootstrapPayload) -> Result<()> {
        *self.slot.lock().expect("bootstrap lock poisoned") = Some(payload.clone());
        Ok(())
    }

    fn read(&self) -> Result<Option<BootstrapPayload>> {
        Ok(self.slot.lock().expect("bootstrap lock poisoned").clone())
    }
}

pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub(crate) fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
