//! Human-readable rendering of a [`StructuredDiff`].

use crate::report::Presentation;
use cairn_core::{Change, DiffEntry, StructuredDiff};

pub const NO_DIFFERENCES: &str = "✔ No differences detected.";

/// Renders diffs; content is identical with and without colour.
pub struct DiffPresenter {
    presentation: Presentation,
}

impl DiffPresenter {
    pub fn new(presentation: Presentation) -> Self {
        Self { presentation }
    }

    pub fn render(&self, diff: &StructuredDiff) -> String {
        if diff.is_empty() {
            return NO_DIFFERENCES.to_string();
        }

        let mut lines = Vec::new();
        self.section(&mut lines, "Parameters", &diff.parameters);
        self.section(&mut lines, "Template", &diff.template);
        lines.join("\n")
    }

    fn section(&self, lines: &mut Vec<String>, title: &str, entries: &[DiffEntry]) {
        if entries.is_empty() {
            return;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(self.presentation.bold(&format!("{} ({}):", title, entries.len())));
        for entry in entries {
            lines.push(self.entry(entry));
        }
    }

    fn entry(&self, entry: &DiffEntry) -> String {
        let path = if entry.path.is_empty() {
            "(entire template)"
        } else {
            entry.path.as_str()
        };
        match &entry.change {
            Change::Added { value } => self.presentation.green(&format!("  + {}: {}", path, value)),
            Change::Removed { value } => self.presentation.red(&format!("  - {}: {}", path, value)),
            Change::Modified { from, to } => {
                self.presentation.yellow(&format!("  ~ {}: {} -> {}", path, from, to))
            }
        }
    }
}
