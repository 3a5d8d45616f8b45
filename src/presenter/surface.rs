//! Presentation surface port and the terminal implementation.

use std::fmt::Write as _;
use std::io::{self, Write};

use super::projection::{FileEntry, Projection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message outside the projection itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Anything that can render the presenter's output.
///
/// Calls are synchronous and must not block for long; they may be made while
/// the presenter holds its publish lock.
#[cfg_attr(test, mockall::automock)]
pub trait PresentationSurface: Send + Sync {
    /// Replace everything shown with `projection`.
    fn publish(&self, projection: &Projection);

    /// Set the commit message text channel.
    fn set_message(&self, text: &str);

    fn notify(&self, notice: Notice);
}

/// Prints projections and messages to the terminal.
///
/// Projections and commit messages go to stdout, notices to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSurface {
    json: bool,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print projections as JSON instead of grouped lists.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl PresentationSurface for TerminalSurface {
    fn publish(&self, projection: &Projection) {
        let text = if self.json {
            match serde_json::to_string_pretty(projection) {
                Ok(json) => format!("{json}\n"),
                Err(e) => {
                    tracing::warn!("Failed to serialize projection: {}", e);
                    return;
                }
            }
        } else {
            render(projection)
        };

        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn set_message(&self, text: &str) {
        if !text.is_empty() {
            println!("{text}");
        }
    }

    fn notify(&self, notice: Notice) {
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("{prefix}: {}", notice.text);
    }
}

/// Grouped, counted listing of a projection.
pub fn render(projection: &Projection) -> String {
    if projection.is_empty() {
        return "No changes\n".to_string();
    }

    let mut out = String::new();
    render_group(&mut out, "Staged Changes", &projection.staged);
    render_group(&mut out, "Changes", &projection.unstaged);
    out
}

fn render_group(out: &mut String, title: &str, entries: &[FileEntry]) {
    if entries.is_empty() {
        return;
    }

    let _ = writeln!(out, "{title} ({})", entries.len());
    for entry in entries {
        if entry.path == "." {
            let _ = writeln!(out, "  {} {}", entry.glyph, entry.name);
        } else {
            let _ = writeln!(out, "  {} {}  {}", entry.glyph, entry.name, entry.path);
        }
    }
}
