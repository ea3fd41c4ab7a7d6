use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::bootstrap::{cache_dir, sanitize};
use crate::fake_remote::FakeScoreboard;
use crate::remote::{HttpScoreboard, SharedApi};
use crate::snapshot::DisplayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Http,
    Fake,
}

#[derive(Debug, Clone)]
pub struct ScoreboardConfig {
    pub source: Source,
    pub api_base: String,
    pub api_token: Option<String>,
    pub poll_interval: Duration,
    pub spectator_poll_interval: Duration,
    pub tie_break_at: u32,
    pub display: DisplayConfig,
    pub spectator_tty: Option<String>,
    pub display_bin: Option<PathBuf>,
    pub fake_state: Option<PathBuf>,
}

impl ScoreboardConfig {
    /// Reads `.env.local`, `.env`, then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        let source = match env::var("SCOREBOARD_SOURCE")
            .unwrap_or_else(|_| "http".to_string())
            .to_lowercase()
            .as_str()
        {
            "fake" | "demo" => Source::Fake,
            _ => Source::Http,
        };
        let defaults = DisplayConfig::default();
        let display = DisplayConfig {
            team_a: string_env("SCOREBOARD_TEAM_A").unwrap_or(defaults.team_a),
            team_b: string_env("SCOREBOARD_TEAM_B").unwrap_or(defaults.team_b),
            court_title: string_env("SCOREBOARD_COURT_TITLE").unwrap_or(defaults.court_title),
            court_id: string_env("SCOREBOARD_COURT_ID").unwrap_or(defaults.court_id),
            court_kind: string_env("SCOREBOARD_COURT_KIND").unwrap_or(defaults.court_kind),
        };

        Self {
            source,
            api_base: string_env("SCOREBOARD_API_BASE")
                .unwrap_or_else(|| "http://127.0.0.1:8080/api".to_string()),
            api_token: string_env("SCOREBOARD_API_TOKEN"),
            poll_interval: Duration::from_secs(
                env::var("SCOREBOARD_POLL_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok())
                    .unwrap_or(5)
                    .max(1),
            ),
            spectator_poll_interval: Duration::from_secs(
                env::var("SCOREBOARD_SPECTATOR_POLL_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok())
                    .unwrap_or(15)
                    .max(2),
            ),
            tie_break_at: env::var("SCOREBOARD_TIE_BREAK_AT")
                .ok()
                .and_then(|val| val.parse::<u32>().ok())
                .unwrap_or(6)
                .clamp(1, 20),
            display,
            spectator_tty: string_env("SCOREBOARD_SPECTATOR_TTY"),
            display_bin: string_env("SCOREBOARD_DISPLAY_BIN").map(PathBuf::from),
            fake_state: string_env("SCOREBOARD_FAKE_STATE").map(PathBuf::from),
        }
    }

    pub fn api(&self) -> SharedApi {
        match self.source {
            Source::Http => Arc::new(HttpScoreboard::new(
                &self.api_base,
                &self.display.court_id,
                self.api_token.clone(),
            )),
            Source::Fake => {
                match self.fake_state_path() {
                    Some(path) => Arc::new(FakeScoreboard::file_backed(path)),
                    None => Arc::new(FakeScoreboard::in_memory()),
                }
            }
        }
    }

    /// Shared match file for the fake source, so both processes score one match.
    pub fn fake_state_path(&self) -> Option<PathBuf> {
        self.fake_state.clone().or_else(|| {
            let file = format!("fake_match_{}.json", sanitize(&self.display.court_id));
            cache_dir().map(|dir| dir.join(file))
        })
    }

    /// Explicit override, else `scoreboard_display` next to the running binary.
    pub fn display_program(&self) -> Result<PathBuf> {
        if let Some(bin) = self.display_bin.as_ref() {
            return Ok(bin.clone());
        }
        let exe = env::current_exe().context("resolve current executable")?;
        let dir = exe.parent().context("executable has no parent dir")?;
        Ok(dir.join(format!("scoreboard_display{}", env::consts::EXE_SUFFIX)))
    }
}

fn string_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
