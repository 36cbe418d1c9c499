//! User-facing progress reporting.
//!
//! The orchestrator never prints directly; it reports through a [`Reporter`].
//! Colour is decided by an explicit [`Presentation`] value handed to whoever
//! renders, never by a process-wide switch.

use cairn_core::{StackEvent, StackStatus};
use colored::Colorize;
use std::sync::Mutex;

/// Presentation settings for report lines and diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub colorize: bool,
}

impl Presentation {
    pub fn plain() -> Self {
        Self { colorize: false }
    }

    pub fn colored() -> Self {
        Self { colorize: true }
    }

    pub(crate) fn green(&self, text: &str) -> String {
        if self.colorize {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn red(&self, text: &str) -> String {
        if self.colorize {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn yellow(&self, text: &str) -> String {
        if self.colorize {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn bold(&self, text: &str) -> String {
        if self.colorize {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// Colour an event line by its resource status.
    pub fn event_line(&self, event: &StackEvent) -> String {
        let line = event.to_string();
        let status: StackStatus = event.status();
        if status.is_failure() {
            self.red(&line)
        } else if status.is_in_progress() {
            self.yellow(&line)
        } else if status.is_terminal() {
            self.green(&line)
        } else {
            line
        }
    }
}

impl Default for Presentation {
    fn default() -> Self {
        Self::colored()
    }
}

/// Kind of a status notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Success,
    Skipped,
    Failure,
}

pub trait Reporter: Send + Sync {
    /// A one-line status notice.
    fn notice(&self, kind: Notice, message: &str);

    /// A stack event, forwarded as soon as it arrives.
    fn event(&self, event: &StackEvent);

    /// Free-form output: templates, outputs, rendered diffs.
    fn text(&self, text: &str);
}

/// Prints to stdout.
pub struct StdoutReporter {
    presentation: Presentation,
}

impl StdoutReporter {
    pub fn new(presentation: Presentation) -> Self {
        Self { presentation }
    }
}

impl Reporter for StdoutReporter {
    fn notice(&self, kind: Notice, message: &str) {
        let line = match kind {
            Notice::Info => self.presentation.bold(message),
            Notice::Success => self.presentation.green(message),
            Notice::Skipped => self.presentation.yellow(message),
            Notice::Failure => self.presentation.red(message),
        };
        println!("{}", line);
    }

    fn event(&self, event: &StackEvent) {
        println!("{}", self.presentation.event_line(event));
    }

    fn text(&self, text: &str) {
        println!("{}", text);
    }
}

/// One line captured by [`MemoryReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Notice(Notice, String),
    Event(StackEvent),
    Text(String),
}

impl ReportLine {
    pub fn text(&self) -> String {
        match self {
            ReportLine::Notice(_, message) => message.clone(),
            ReportLine::Event(event) => event.to_string(),
            ReportLine::Text(text) => text.clone(),
        }
    }
}

/// Keeps report lines in memory, uncoloured. Used to capture output for
/// callers that post-process it and in tests.
#[derive(Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<ReportLine>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ReportLine> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// All captured lines joined with newlines.
    pub fn output(&self) -> String {
        self.lines()
            .iter()
            .map(ReportLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn notices(&self, kind: Notice) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportLine::Notice(k, message) if k == kind => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<StackEvent> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ReportLine::Event(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn push(&self, line: ReportLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl Reporter for MemoryReporter {
    fn notice(&self, kind: Notice, message: &str) {
        self.push(ReportLine::Notice(kind, message.to_string()));
    }

    fn event(&self, event: &StackEvent) {
        self.push(ReportLine::Event(event.clone()));
    }

    fn text(&self, text: &str) {
        self.push(ReportLine::Text(text.to_string()));
    }
}
