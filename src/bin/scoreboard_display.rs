use std::fs::OpenOptions;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::prelude::*;
use ratatui::{TerminalOptions, Viewport};

use padel_scoreboard::bootstrap::{BootstrapChannel, FileBootstrap};
use padel_scoreboard::bridge::{BridgeMessage, read_bridge_messages};
use padel_scoreboard::config::ScoreboardConfig;
use padel_scoreboard::console::Console;
use padel_scoreboard::remote::{RemoteError, SharedApi};
use padel_scoreboard::snapshot::MatchStateSnapshot;
use padel_scoreboard::spectator::{SpectatorPhase, SpectatorSync, SyncEffect};
use padel_scoreboard::ui;

type FetchResult = Result<MatchStateSnapshot, RemoteError>;

const DEFAULT_SIZE: (u16, u16) = (80, 14);

fn main() -> Result<()> {
    let config = ScoreboardConfig::load();
    let console = Console::new();
    let standalone = has_flag("--standalone");

    let (bridge_tx, bridge_rx) = mpsc::channel();
    if !standalone {
        let reader_console = console.clone();
        thread::spawn(move || {
            let stdin = io::stdin();
            read_bridge_messages(stdin.lock(), bridge_tx, &reader_console);
        });
    }

    let mut sync = SpectatorSync::new(
        config.display.clone(),
        config.spectator_poll_interval,
        console.clone(),
    );
    let api = config.api();
    let (fetch_tx, fetch_rx) = mpsc::channel();

    let bootstrap = match FileBootstrap::for_court(&config.display.court_id) {
        Some(channel) => channel.read().unwrap_or_else(|err| {
            console.warn(format!("Bootstrap unreadable: {err:#}"));
            None
        }),
        None => None,
    };
    match sync.start(bootstrap) {
        SyncEffect::Fetch => spawn_fetch(&api, &fetch_tx),
    }

    let mut loop_state = DisplayLoop {
        sync: &mut sync,
        api: &api,
        fetch_tx: &fetch_tx,
        fetch_rx: &fetch_rx,
        bridge_rx: &bridge_rx,
        console: &console,
        follow_control: !standalone,
    };

    match arg_value("--tty") {
        Some(tty) => {
            let mut device = OpenOptions::new()
                .write(true)
                .open(&tty)
                .with_context(|| format!("failed to open {tty}"))?;
            execute!(device, Clear(ClearType::All), Hide)?;
            let (width, height) = arg_value("--size")
                .and_then(|raw| parse_size(&raw))
                .unwrap_or(DEFAULT_SIZE);
            let mut terminal = Terminal::with_options(
                CrosstermBackend::new(device),
                TerminalOptions {
                    viewport: Viewport::Fixed(Rect::new(0, 0, width, height)),
                },
            )?;
            let res = loop_state.run(&mut terminal);
            execute!(terminal.backend_mut(), Show)?;
            res
        }
        None => {
            let mut stdout = io::stdout();
            execute!(stdout, EnterAlternateScreen, Hide)?;
            let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
            let res = loop_state.run(&mut terminal);
            execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
            Backend::flush(terminal.backend_mut())?;
            if let Err(err) = res.as_ref() {
                eprintln!("error: {err:#}");
            }
            res
        }
    }
}

struct DisplayLoop<'a> {
    sync: &'a mut SpectatorSync,
    api: &'a SharedApi,
    fetch_tx: &'a Sender<FetchResult>,
    fetch_rx: &'a Receiver<FetchResult>,
    bridge_rx: &'a Receiver<BridgeMessage>,
    console: &'a Console,
    follow_control: bool,
}

impl DisplayLoop<'_> {
    fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            // Pushes and fetch results are applied in arrival order.
            loop {
                match self.bridge_rx.try_recv() {
                    Ok(msg) => {
                        if let Some(SyncEffect::Fetch) = self.sync.on_message(msg) {
                            spawn_fetch(self.api, self.fetch_tx);
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if self.follow_control {
                            return Ok(());
                        }
                        break;
                    }
                }
            }
            while let Ok(result) = self.fetch_rx.try_recv() {
                self.sync.on_fetched(result);
            }

            let now = Instant::now();
            self.sync.tick(now);
            if let Some(SyncEffect::Fetch) = self.sync.poll_due(now) {
                spawn_fetch(self.api, self.fetch_tx);
            }

            let status = match self.sync.phase() {
                SpectatorPhase::Bootstrapping => Some("Connecting...".to_string()),
                SpectatorPhase::Live => self.console.last(),
            };
            let view = self.sync.view();
            terminal.draw(|f| ui::render_display(f, &view, status.as_deref()))?;

            thread::sleep(Duration::from_millis(250));
        }
    }
}

fn spawn_fetch(api: &SharedApi, tx: &Sender<FetchResult>) {
    let api = api.clone();
    let tx = tx.clone();
    thread::spawn(move || {
        let _ = tx.send(api.fetch_snapshot());
    });
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

fn parse_size(raw: &str) -> Option<(u16, u16)> {
    let (w, h) = raw.split_once('x')?;
    let width = w.trim().parse::<u16>().ok()?.clamp(40, 400);
    let height = h.trim().parse::<u16>().ok()?.clamp(8, 200);
    Some((width, height))
}
