//! Ordered, append-only record of session-visible output.

use crossterm::style::Color;

/// How a log entry should be styled when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
    Combat,
    Story,
}

impl Severity {
    /// Stable lowercase label, used by scripts to pick a severity.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Combat => "combat",
            Severity::Story => "story",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "success" => Some(Severity::Success),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            "combat" => Some(Severity::Combat),
            "story" => Some(Severity::Story),
            _ => None,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Severity::Info => Color::Cyan,
            Severity::Success => Color::Green,
            Severity::Warning => Color::DarkYellow,
            Severity::Error => Color::Red,
            Severity::Combat => Color::Magenta,
            Severity::Story => Color::Reset,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

/// The session event log. Entries are only ever appended, so their order
/// matches the order in which commands produced them.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    rendered: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.entries.push(LogEntry {
            severity,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries appended since the previous call. The session loop uses this
    /// to print exactly the new output after each input event.
    pub fn take_unrendered(&mut self) -> &[LogEntry] {
        let start = self.rendered;
        self.rendered = self.entries.len();
        &self.entries[start..]
    }
}
