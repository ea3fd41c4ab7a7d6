use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Team::A => "A",
            Team::B => "B",
        }
    }
}

/// Per-team counter pair. Serialized as `{"A": n, "B": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamPair {
    #[serde(rename = "A", default)]
    pub a: u32,
    #[serde(rename = "B", default)]
    pub b: u32,
}

impl TeamPair {
    pub fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::A => self.a,
            Team::B => self.b,
        }
    }
}

/// One point-in-time view of a match as reported by the scoring resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStateSnapshot {
    #[serde(default)]
    pub points: TeamPair,
    #[serde(default)]
    pub games: TeamPair,
    #[serde(default = "fresh_sets")]
    pub sets: Vec<TeamPair>,
    #[serde(default)]
    pub tie_break: bool,
    #[serde(default)]
    pub terminado: bool,
    #[serde(default)]
    pub bola_de_oro: bool,
}

impl Default for MatchStateSnapshot {
    fn default() -> Self {
        Self {
            points: TeamPair::default(),
            games: TeamPair::default(),
            sets: fresh_sets(),
            tie_break: false,
            terminado: false,
            bola_de_oro: false,
        }
    }
}

impl MatchStateSnapshot {
    /// Restores the non-empty `sets` invariant.
    pub fn normalized(mut self) -> Self {
        if self.sets.is_empty() {
            self.sets = fresh_sets();
        }
        self
    }

    pub fn current_set(&self) -> TeamPair {
        self.sets.last().copied().unwrap_or_default()
    }
}

fn fresh_sets() -> Vec<TeamPair> {
    vec![TeamPair::default()]
}

/// Presentation-only settings owned by the control side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub team_a: String,
    pub team_b: String,
    pub court_title: String,
    pub court_id: String,
    #[serde(default)]
    pub court_kind: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            team_a: "Pareja A".to_string(),
            team_b: "Pareja B".to_string(),
            court_title: "Pista 1".to_string(),
            court_id: "1".to_string(),
            court_kind: String::new(),
        }
    }
}

impl DisplayConfig {
    pub fn team_name(&self, team: Team) -> &str {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }
}

/// Decodes a snapshot body, substituting zero values for anything missing or
/// unusable. Only syntactically invalid JSON is an error.
pub fn parse_snapshot_json(raw: &str) -> Result<MatchStateSnapshot> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(MatchStateSnapshot::default());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid snapshot json")?;
    Ok(snapshot_from_value(&root))
}

pub fn snapshot_from_value(root: &Value) -> MatchStateSnapshot {
    let sets = root
        .get("sets")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(pair_from_value).collect::<Vec<_>>())
        .unwrap_or_default();

    MatchStateSnapshot {
        points: root.get("points").map(pair_from_value).unwrap_or_default(),
        games: root.get("games").map(pair_from_value).unwrap_or_default(),
        sets,
        tie_break: pick_bool(root, "tie_break"),
        terminado: pick_bool(root, "terminado"),
        bola_de_oro: pick_bool(root, "bola_de_oro"),
    }
    .normalized()
}

fn pair_from_value(value: &Value) -> TeamPair {
    TeamPair {
        a: pick_count(value, "A"),
        b: pick_count(value, "B"),
    }
}

fn pick_count(value: &Value, key: &str) -> u32 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u32>().unwrap_or(0),
        _ => 0,
    }
}

fn pick_bool(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}
