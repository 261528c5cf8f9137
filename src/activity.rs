//! The user-facing activity log shown in the window and saved on request.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default)]
pub struct ActivityLog {
    lines: Vec<String>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a timestamped line. Every entry also goes to the tracing log.
    pub fn push(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        info!(target: "activity", "{text}");
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.lines.push(format!("[{ts}] {text}"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn contents(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.contents())
            .with_context(|| format!("writing log to {}", path.display()))
    }
}
