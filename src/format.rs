use crate::snapshot::{DisplayConfig, MatchStateSnapshot, Team, TeamPair};

pub fn point_label(n: u32, tie_break: bool) -> String {
    if tie_break {
        return n.to_string();
    }
    match n {
        0 => "0".to_string(),
        1 => "15".to_string(),
        2 => "30".to_string(),
        3 => "40".to_string(),
        4 => "AD".to_string(),
        other => other.to_string(),
    }
}

/// Sets where `team` is strictly ahead. Level entries (including an undecided
/// current set) count for nobody.
pub fn sets_won(sets: &[TeamPair], team: Team) -> usize {
    let other = team.other();
    sets.iter().filter(|set| set.get(team) > set.get(other)).count()
}

pub fn is_golden_point_moment(snapshot: &MatchStateSnapshot) -> bool {
    !snapshot.tie_break && snapshot.bola_de_oro && snapshot.points.a == 3 && snapshot.points.b == 3
}

pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamLine {
    pub name: String,
    pub point: String,
    pub games: String,
    pub sets_won: String,
    pub set_columns: Vec<String>,
}

/// Every string the scoreboard shows, derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardView {
    pub court_title: String,
    pub court_kind: String,
    pub a: TeamLine,
    pub b: TeamLine,
    pub golden_point: bool,
    pub tie_break: bool,
    pub finished: bool,
    pub clock: String,
}

impl ScoreboardView {
    pub fn build(snapshot: &MatchStateSnapshot, config: &DisplayConfig, elapsed_secs: u64) -> Self {
        Self {
            court_title: config.court_title.clone(),
            court_kind: config.court_kind.clone(),
            a: team_line(snapshot, config, Team::A),
            b: team_line(snapshot, config, Team::B),
            golden_point: is_golden_point_moment(snapshot),
            tie_break: snapshot.tie_break,
            finished: snapshot.terminado,
            clock: format_elapsed(elapsed_secs),
        }
    }

    pub fn line(&self, team: Team) -> &TeamLine {
        match team {
            Team::A => &self.a,
            Team::B => &self.b,
        }
    }

    /// One badge at most. `FINAL` outranks `TIE-BREAK`, which outranks
    /// `PUNTO DE ORO`; a finished match never shows the golden point badge even
    /// when `golden_point` is still set.
    pub fn status_badge(&self) -> Option<&'static str> {
        if self.finished {
            Some("FINAL")
        } else if self.tie_break {
            Some("TIE-BREAK")
        } else if self.golden_point {
            Some("PUNTO DE ORO")
        } else {
            None
        }
    }
}

fn team_line(snapshot: &MatchStateSnapshot, config: &DisplayConfig, team: Team) -> TeamLine {
    TeamLine {
        name: config.team_name(team).to_string(),
        point: point_label(snapshot.points.get(team), snapshot.tie_break),
        games: snapshot.games.get(team).to_string(),
        sets_won: sets_won(&snapshot.sets, team).to_string(),
        set_columns: snapshot
            .sets
            .iter()
            .map(|set| set.get(team).to_string())
            .collect(),
    }
}
