use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::bootstrap::{BootstrapChannel, BootstrapPayload};
use crate::console::Console;
use crate::snapshot::{DisplayConfig, MatchStateSnapshot};

/// Control → display wire message, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
    Snapshot {
        snapshot: MatchStateSnapshot,
        config: DisplayConfig,
        /// Set only on the push that follows a reset; restarts the display clock.
        #[serde(default)]
        fresh_match: bool,
    },
    Refresh,
}

pub fn encode_line(msg: &BridgeMessage) -> Result<String> {
    serde_json::to_string(msg).context("serialize bridge message")
}

pub fn decode_line(line: &str) -> Result<BridgeMessage> {
    let msg = serde_json::from_str::<BridgeMessage>(line.trim()).context("invalid bridge message")?;
    Ok(match msg {
        BridgeMessage::Snapshot {
            snapshot,
            config,
            fresh_match,
        } => BridgeMessage::Snapshot {
            snapshot: snapshot.normalized(),
            config,
            fresh_match,
        },
        BridgeMessage::Refresh => BridgeMessage::Refresh,
    })
}

/// Display side: forwards every decodable line to `tx` until EOF or until the
/// receiver goes away. Bad lines are logged and skipped.
pub fn read_bridge_messages<R: BufRead>(reader: R, tx: Sender<BridgeMessage>, console: &Console) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                console.warn(format!("Bridge read error: {err}"));
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_line(&line) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(err) => console.warn(format!("Skipping bridge line: {err:#}")),
        }
    }
}

/// A handle on one display context. Liveness is re-checked before every send.
pub trait SpectatorLink: Send {
    fn is_live(&mut self) -> bool;
    fn send(&mut self, msg: &BridgeMessage) -> Result<()>;
    fn close(&mut self);
}

pub trait SpectatorLauncher: Send {
    fn launch(&mut self) -> Result<Box<dyn SpectatorLink>>;
}

pub struct CrossWindowBridge {
    launcher: Box<dyn SpectatorLauncher>,
    bootstrap: Option<Box<dyn BootstrapChannel>>,
    link: Option<Box<dyn SpectatorLink>>,
    console: Console,
}

impl CrossWindowBridge {
    pub fn new(
        launcher: Box<dyn SpectatorLauncher>,
        bootstrap: Option<Box<dyn BootstrapChannel>>,
        console: Console,
    ) -> Self {
        Self {
            launcher,
            bootstrap,
            link: None,
            console,
        }
    }

    pub fn is_open(&mut self) -> bool {
        let live = self.link.as_mut().is_some_and(|link| link.is_live());
        if !live {
            self.discard_link();
        }
        live
    }

    /// Returns `Ok(true)` when a new display was launched. An already open display
    /// just receives the current state.
    pub fn open(&mut self, config: &DisplayConfig, snapshot: &MatchStateSnapshot) -> Result<bool> {
        if self.is_open() {
            self.push(snapshot, config, false);
            return Ok(false);
        }

        if let Some(bootstrap) = self.bootstrap.as_ref() {
            let payload = BootstrapPayload::new(snapshot.clone(), config.clone());
            if let Err(err) = bootstrap.write(&payload) {
                self.console.warn(format!("Bootstrap write failed: {err:#}"));
            }
        }

        let link = self.launcher.launch().context("failed to open spectator display")?;
        self.link = Some(link);
        self.console.info("Spectator display opened");
        Ok(true)
    }

    /// Fire-and-forget. Dropped silently when no display is reachable.
    pub fn push(
        &mut self,
        snapshot: &MatchStateSnapshot,
        config: &DisplayConfig,
        fresh_match: bool,
    ) {
        self.deliver(BridgeMessage::Snapshot {
            snapshot: snapshot.clone(),
            config: config.clone(),
            fresh_match,
        });
    }

    pub fn request_refresh(&mut self) {
        self.deliver(BridgeMessage::Refresh);
    }

    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
            self.console.info("Spectator display closed");
        }
    }

    fn deliver(&mut self, msg: BridgeMessage) -> bool {
        let Some(link) = self.link.as_mut() else {
            return false;
        };
        let failure = if !link.is_live() {
            Some("display no longer reachable".to_string())
        } else {
            link.send(&msg).err().map(|err| format!("{err:#}"))
        };
        match failure {
            None => true,
            Some(reason) => {
                self.console.info(format!("Spectator push dropped: {reason}"));
                self.discard_link();
                false
            }
        }
    }

    fn discard_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
    }
}

impl Drop for CrossWindowBridge {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawns the `scoreboard_display` binary on its own terminal device and feeds it
/// over stdin.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    tty: Option<String>,
}

impl ProcessLauncher {
    pub fn new(program: PathBuf, tty: Option<String>) -> Self {
        Self { program, tty }
    }
}

impl SpectatorLauncher for ProcessLauncher {
    fn launch(&mut self) -> Result<Box<dyn SpectatorLink>> {
        let Some(tty) = self.tty.as_ref() else {
            bail!("set SCOREBOARD_SPECTATOR_TTY to the terminal device the display should use");
        };
        let mut child = Command::new(&self.program)
            .arg("--tty")
            .arg(tty)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("display stdin unavailable"))?;
        Ok(Box::new(ProcessLink {
            child,
            stdin: Some(stdin),
        }))
    }
}

struct ProcessLink {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl SpectatorLink for ProcessLink {
    fn is_live(&mut self) -> bool {
        self.stdin.is_some() && matches!(self.child.try_wait(), Ok(None))
    }

    fn send(&mut self, msg: &BridgeMessage) -> Result<()> {
        let line = encode_line(msg)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("display stdin closed"))?;
        let written = writeln!(stdin, "{line}").and_then(|_| stdin.flush());
        if let Err(err) = written {
            self.stdin = None;
            return Err(err).context("write to display");
        }
        Ok(())
    }

    fn close(&mut self) {
        // EOF asks the display to exit on its own before we force it.
        drop(self.stdin.take());
        let deadline = Instant::now() + Duration::from_millis(300);
        while Instant::now() < deadline {
            if !matches!(self.child.try_wait(), Ok(None)) {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for ProcessLink {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            self.close();
        }
    }
}

/// The receiving half of an in-process display.
pub struct ChannelSpectator {
    pub inbox: Receiver<BridgeMessage>,
    closed: Arc<AtomicBool>,
}

impl ChannelSpectator {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Display-initiated close, as when a user shuts the window.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Launches displays that live in the same process, handing each receiving half
/// to whoever holds the paired receiver.
pub struct ChannelLauncher {
    hosts: Sender<ChannelSpectator>,
}

impl ChannelLauncher {
    pub fn new() -> (Self, Receiver<ChannelSpectator>) {
        let (hosts, rx) = mpsc::channel();
        (Self { hosts }, rx)
    }
}

impl SpectatorLauncher for ChannelLauncher {
    fn launch(&mut self) -> Result<Box<dyn SpectatorLink>> {
        let (tx, inbox) = mpsc::channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.hosts
            .send(ChannelSpectator {
                inbox,
                closed: closed.clone(),
            })
            .map_err(|_| anyhow!("no display host listening"))?;
        Ok(Box::new(ChannelLink { tx, closed }))
    }
}

struct ChannelLink {
    tx: Sender<BridgeMessage>,
    closed: Arc<AtomicBool>,
}

impl SpectatorLink for ChannelLink {
    fn is_live(&mut self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn send(&mut self, msg: &BridgeMessage) -> Result<()> {
        self.tx.send(msg.clone()).map_err(|_| {
            self.closed.store(true, Ordering::SeqCst);
            anyhow!("display inbox dropped")
        })
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
