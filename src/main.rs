use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

use padel_scoreboard::bootstrap::{BootstrapChannel, FileBootstrap};
use padel_scoreboard::bridge::{CrossWindowBridge, ProcessLauncher};
use padel_scoreboard::config::ScoreboardConfig;
use padel_scoreboard::console::Console;
use padel_scoreboard::control::{
    ControlCommand, ControlDelta, ControlState, NoticeKind, apply_delta, spawn_control_worker,
};
use padel_scoreboard::dispatch::{
    ActionDispatcher, golden_point_enabled, scoring_enabled, tie_break_offered,
};
use padel_scoreboard::snapshot::Team;
use padel_scoreboard::store::MatchStateStore;
use padel_scoreboard::ui;

struct App {
    state: ControlState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ControlCommand>,
}

impl App {
    fn new(state: ControlState, cmd_tx: mpsc::Sender<ControlCommand>) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('a') | KeyCode::Char('A') => self.score(Team::A),
            KeyCode::Char('b') | KeyCode::Char('B') => self.score(Team::B),
            KeyCode::Char('r') | KeyCode::Char('R') => self.send(ControlCommand::Reset),
            KeyCode::Char('t') | KeyCode::Char('T') => {
                let snapshot = &self.state.snapshot;
                if tie_break_offered(snapshot, self.state.tie_break_at) {
                    self.send(ControlCommand::SetTieBreak(!snapshot.tie_break));
                } else {
                    let msg = format!(
                        "Tie-break is only available at {0}-{0} in games",
                        self.state.tie_break_at
                    );
                    self.state.notify(NoticeKind::Info, msg);
                }
            }
            KeyCode::Char('g') | KeyCode::Char('G') => {
                if golden_point_enabled(&self.state.snapshot) {
                    let active = !self.state.snapshot.bola_de_oro;
                    self.send(ControlCommand::SetGoldenPoint(active));
                } else {
                    self.state
                        .notify(NoticeKind::Info, "Match finished; golden point is locked");
                }
            }
            KeyCode::Char('f') | KeyCode::Char('F') => self.send(ControlCommand::Finalize),
            KeyCode::Char('o') | KeyCode::Char('O') => self.send(ControlCommand::OpenSpectator),
            KeyCode::Char('c') | KeyCode::Char('C') => self.send(ControlCommand::CloseSpectator),
            KeyCode::Char('u') | KeyCode::Char('U') => self.send(ControlCommand::Refresh),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => {
                self.state.dismiss_notice();
                self.state.help_overlay = false;
            }
            _ => {}
        }
    }

    // Scoring stays available while earlier actions are in flight; they queue.
    fn score(&mut self, team: Team) {
        if !scoring_enabled(&self.state.snapshot) {
            self.state
                .notify(NoticeKind::Info, "Match finished; scoring is disabled");
            return;
        }
        self.send(ControlCommand::ScorePoint(team));
    }

    fn send(&mut self, cmd: ControlCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.state.push_log("[WARN] Control worker stopped");
        }
    }
}

fn main() -> io::Result<()> {
    let config = ScoreboardConfig::load();
    let console = Console::new();

    let api = config.api();
    let store = MatchStateStore::new(api.clone(), console.clone());
    let launcher = match config.display_program() {
        Ok(program) => ProcessLauncher::new(program, config.spectator_tty.clone()),
        Err(err) => {
            console.warn(format!("Display binary not found: {err:#}"));
            ProcessLauncher::new("scoreboard_display".into(), config.spectator_tty.clone())
        }
    };
    let bootstrap = FileBootstrap::for_court(&config.display.court_id)
        .map(|channel| Box::new(channel) as Box<dyn BootstrapChannel>);
    let bridge = CrossWindowBridge::new(Box::new(launcher), bootstrap, console.clone());
    let dispatcher = ActionDispatcher::new(
        api,
        store,
        bridge,
        config.display.clone(),
        console.clone(),
    );

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let worker = spawn_control_worker(dispatcher, console, config.poll_interval, tx, cmd_rx);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let state = ControlState::new(config.display.clone(), config.tie_break_at);
    let mut app = App::new(state, cmd_tx);
    let res = run_app(&mut terminal, &mut app, &rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let _ = app.cmd_tx.send(ControlCommand::Shutdown);
    drop(app);
    let _ = worker.join();

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mpsc::Receiver<ControlDelta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.state.clear_notice_if_older(Instant::now());

        terminal.draw(|f| ui::render_control(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
