use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Local;

const MAX_LINES: usize = 200;

/// Shared log ring rendered by the console pane.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.push(format!("[INFO] {}", msg.as_ref()));
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.push(format!("[WARN] {}", msg.as_ref()));
    }

    pub fn push(&self, line: impl Into<String>) {
        let stamped = format!("{} {}", Local::now().format("%H:%M:%S"), line.into());
        let mut lines = self.lines.lock().expect("console lock poisoned");
        lines.push_back(stamped);
        while lines.len() > MAX_LINES {
            lines.pop_front();
        }
    }

    pub fn last(&self) -> Option<String> {
        self.lines
            .lock()
            .expect("console lock poisoned")
            .back()
            .cloned()
    }

    /// Removes and returns everything logged so far.
    pub fn drain(&self) -> Vec<String> {
        self.lines
            .lock()
            .expect("console lock poisoned")
            .drain(..)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .expect("console lock poisoned")
            .iter()
            .any(|line| line.contains(needle))
    }
}
