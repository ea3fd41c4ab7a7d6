use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

use crate::control::{ControlState, NoticeKind};
use crate::dispatch::{golden_point_enabled, scoring_enabled, tie_break_offered};
use crate::format::{ScoreboardView, TeamLine};
use crate::snapshot::Team;

pub fn render_scoreboard(frame: &mut Frame, area: Rect, view: &ScoreboardView, show_clock: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let mut title = view.court_title.clone();
    if !view.court_kind.is_empty() {
        title.push_str(&format!(" ({})", view.court_kind));
    }
    if show_clock {
        title.push_str(&format!("   {}", view.clock));
    }
    let header = Paragraph::new(title).style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(header, sections[0]);

    let set_count = view.a.set_columns.len().max(view.b.set_columns.len());
    let mut header_cells = vec![Cell::from("")];
    header_cells.extend((1..=set_count).map(|n| Cell::from(format!("S{n}"))));
    header_cells.extend(["Sets", "Games", "Pts"].into_iter().map(Cell::from));

    let mut widths = vec![Constraint::Min(12)];
    widths.extend(std::iter::repeat(Constraint::Length(4)).take(set_count));
    widths.extend([
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(5),
    ]);

    let rows = [Team::A, Team::B].map(|team| team_row(view.line(team), set_count));
    let table = Table::new(rows, widths)
        .header(Row::new(header_cells).style(Style::default().fg(Color::DarkGray)))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(table, sections[1]);

    if let Some(badge) = view.status_badge() {
        let style = if view.finished {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else if view.tie_break {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        };
        frame.render_widget(Paragraph::new(badge).style(style), sections[2]);
    }
}

fn team_row(line: &TeamLine, set_count: usize) -> Row<'static> {
    let mut cells = vec![Cell::from(line.name.clone())];
    for idx in 0..set_count {
        let games = line.set_columns.get(idx).cloned().unwrap_or_default();
        cells.push(Cell::from(games));
    }
    cells.push(Cell::from(line.sets_won.clone()));
    cells.push(Cell::from(line.games.clone()));
    cells.push(
        Cell::from(line.point.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
    );
    Row::new(cells)
}

/// Full-screen layout of the display binary.
pub fn render_display(frame: &mut Frame, view: &ScoreboardView, status: Option<&str>) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(1)])
        .split(area);

    let block = Block::default().borders(Borders::ALL).title(" MARCADOR ");
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);
    render_scoreboard(frame, inner, view, true);

    if let Some(status) = status {
        let line = Paragraph::new(status.to_string()).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(line, chunks[1]);
    }
}

pub fn render_control(frame: &mut Frame, state: &ControlState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(7),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let view = ScoreboardView::build(&state.snapshot, &state.config, 0);
    render_scoreboard(frame, chunks[1], &view, false);

    render_console(frame, chunks[2], state);

    let footer = Paragraph::new(footer_text(state)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if let Some(notice) = state.notice.as_ref() {
        let area = centered_rect(60, 5, frame.size());
        let (title, color) = match notice.kind {
            NoticeKind::Info => (" Info ", Color::Cyan),
            NoticeKind::Error => (" Error ", Color::Red),
        };
        let popup = Paragraph::new(format!("{}\n\nEsc to dismiss", notice.message))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .style(Style::default().fg(color)),
            );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }

    if state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &ControlState) -> String {
    let display = if state.spectator_open { "open" } else { "closed" };
    let mut line = format!(
        "PADEL CONTROL | {} | {} vs {} | Display: {display}",
        state.config.court_title, state.config.team_a, state.config.team_b
    );
    if state.stale.is_some() {
        line.push_str(" | STALE");
    }
    line
}

fn footer_text(state: &ControlState) -> String {
    let snapshot = &state.snapshot;
    let mut keys = Vec::new();
    if scoring_enabled(snapshot) {
        keys.push("a/b Point");
    }
    keys.push("r Reset");
    if tie_break_offered(snapshot, state.tie_break_at) {
        keys.push("t Tie-break");
    }
    if golden_point_enabled(snapshot) {
        keys.push("g Golden pt");
    }
    if !snapshot.terminado {
        keys.push("f Finalize");
    }
    keys.push(if state.spectator_open { "c Close display" } else { "o Open display" });
    keys.extend(["u Refresh", "? Help", "q Quit"]);
    keys.join(" | ")
}

fn render_console(frame: &mut Frame, area: Rect, state: &ControlState) {
    let block = Block::default().borders(Borders::TOP).title(" Console ");
    let visible = block.inner(area).height as usize;
    let skip = state.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(skip)
        .map(|line| {
            let style = if line.contains("[WARN]") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Line::styled(line.clone(), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(64, 14, area);
    let text = [
        "a / b   point for team A / B",
        "r       reset match",
        "t       toggle tie-break (games level at threshold)",
        "g       toggle golden point",
        "f       finalize match",
        "o / c   open / close spectator display",
        "u       refresh from scoring service",
        "Esc     dismiss notice",
        "q       quit (closes the display)",
    ]
    .join("\n");
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" Help "));
    frame.render_widget(Clear, popup);
    frame.render_widget(help, popup);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
