//! Stack events, outputs and status as reported by the provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One resource-level progress event for a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub timestamp: DateTime<Utc>,
    pub logical_resource_id: String,
    pub resource_type: String,
    pub resource_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StackEvent {
    pub fn status(&self) -> StackStatus {
        StackStatus::new(self.resource_status.clone())
    }
}

impl fmt::Display for StackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S %Z"),
            self.logical_resource_id,
            self.resource_type,
            self.resource_status
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " - {}", reason)?;
        }
        Ok(())
    }
}

/// A named value exported by a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
}

impl fmt::Display for StackOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.key, self.value)?;
        if let Some(description) = &self.description {
            write!(f, " - {}", description)?;
        }
        Ok(())
    }
}

/// Provider status symbol such as `CREATE_COMPLETE` or `UPDATE_IN_PROGRESS`.
///
/// The orchestrator never validates transitions; these helpers only serve
/// adapters waiting on a terminal state and reporters choosing a colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackStatus(String);

impl StackStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_in_progress(&self) -> bool {
        self.0.ends_with("_IN_PROGRESS")
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_progress() && (self.0.ends_with("_COMPLETE") || self.0.ends_with("_FAILED"))
    }

    /// Failed or rolled back. `ROLLBACK_COMPLETE` is terminal but a failure.
    pub fn is_failure(&self) -> bool {
        self.0.ends_with("_FAILED") || self.0.contains("ROLLBACK")
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Three-way answer for listings that depend on the stack existing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing<T> {
    StackAbsent,
    Empty,
    Items(Vec<T>),
}

impl<T> Listing<T> {
    /// Classify a provider answer where `None` means the stack is absent.
    pub fn from_remote(items: Option<Vec<T>>) -> Self {
        match items {
            None => Listing::StackAbsent,
            Some(items) if items.is_empty() => Listing::Empty,
            Some(items) => Listing::Items(items),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Listing::Items(items) => items,
            _ => &[],
        }
    }
}
