use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::blocking::RequestBuilder;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::{Value, json};
use thiserror::Error;

use crate::http_client::http_client;
use crate::snapshot::{MatchStateSnapshot, Team, parse_snapshot_json};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// The authoritative match-state resource. Implementations are consumed only;
/// scoring rules live behind this boundary.
pub trait ScoreboardApi: Send + Sync {
    fn fetch_snapshot(&self) -> Result<MatchStateSnapshot, RemoteError>;
    fn score_point(&self, team: Team) -> Result<MatchStateSnapshot, RemoteError>;
    fn reset(&self) -> Result<MatchStateSnapshot, RemoteError>;
    fn set_tie_break(&self, active: bool) -> Result<(), RemoteError>;
    fn set_golden_point(&self, active: bool) -> Result<(), RemoteError>;
    fn finalize(&self) -> Result<(), RemoteError>;
}

pub type SharedApi = Arc<dyn ScoreboardApi>;

#[derive(Debug, Clone)]
pub struct HttpScoreboard {
    base: String,
    court_id: String,
    token: Option<String>,
}

impl HttpScoreboard {
    pub fn new(base: &str, court_id: &str, token: Option<String>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            court_id: court_id.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn resource_url(&self) -> String {
        format!("{}/courts/{}/match", self.base, self.court_id)
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{action}", self.resource_url())
    }

    fn prepare(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req
            .header(USER_AGENT, "padel_scoreboard")
            .header(ACCEPT, "application/json");
        match self.token.as_ref() {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }

    fn execute(&self, req: RequestBuilder) -> Result<String, RemoteError> {
        let resp = self
            .prepare(req)
            .send()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|err| RemoteError::Transport(format!("failed reading body: {err}")))?;
        if !status.is_success() {
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }
        Ok(body)
    }

    fn get_snapshot(&self) -> Result<MatchStateSnapshot, RemoteError> {
        let client = http_client().map_err(|err| RemoteError::Transport(err.to_string()))?;
        let body = self.execute(client.get(self.resource_url()))?;
        decode(&body)
    }

    fn post(&self, action: &str, payload: Option<Value>) -> Result<String, RemoteError> {
        let client = http_client().map_err(|err| RemoteError::Transport(err.to_string()))?;
        let mut req = client.post(self.endpoint(action));
        if let Some(payload) = payload {
            req = req.json(&payload);
        }
        self.execute(req)
    }
}

impl ScoreboardApi for HttpScoreboard {
    fn fetch_snapshot(&self) -> Result<MatchStateSnapshot, RemoteError> {
        self.get_snapshot()
    }

    fn score_point(&self, team: Team) -> Result<MatchStateSnapshot, RemoteError> {
        let body = self.post("point", Some(json!({ "team": team.key() })))?;
        decode(&body)
    }

    fn reset(&self) -> Result<MatchStateSnapshot, RemoteError> {
        let body = self.post("reset", None)?;
        decode(&body)
    }

    fn set_tie_break(&self, active: bool) -> Result<(), RemoteError> {
        self.post("tie-break", Some(json!({ "active": active })))
            .map(|_| ())
    }

    fn set_golden_point(&self, active: bool) -> Result<(), RemoteError> {
        self.post("golden-point", Some(json!({ "active": active })))
            .map(|_| ())
    }

    fn finalize(&self) -> Result<(), RemoteError> {
        self.post("finalize", None).map(|_| ())
    }
}

fn decode(body: &str) -> Result<MatchStateSnapshot, RemoteError> {
    parse_snapshot_json(body).map_err(|err| RemoteError::Decode(format!("{err:#}")))
}

/// Picks the human-readable reason out of an error body.
pub fn rejection_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(root) = serde_json::from_str::<Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = root.get(key).and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    return text.trim().to_string();
                }
            }
        }
    }
    if !trimmed.is_empty() && !trimmed.starts_with('{') && !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("http {}", status.as_u16()))
}
