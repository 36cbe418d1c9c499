use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// Configuration types loaded from cairn.yaml
pub mod config;
pub mod diff;
pub mod error;
pub mod event;

pub use config::{CairnConfig, ConfigError, StackConfig, StackDefinition, TemplateConfig};
pub use diff::{Change, DiffEntry, StructuredDiff};
pub use error::{GenerationError, ResolutionError, StackError};
pub use event::{Listing, StackEvent, StackOutput, StackStatus};

/// Resolved parameter map handed to template generation and the remote provider.
pub type ResolvedParameters = BTreeMap<String, String>;

/// Names a stack both locally (config) and remotely (provider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackIdentity {
    local_name: String,
    remote_name: String,
    region: Option<String>,
}

impl StackIdentity {
    /// Remote name defaults to the local name when no override is given.
    pub fn new(
        local_name: impl Into<String>,
        remote_name: Option<String>,
        region: Option<String>,
    ) -> Self {
        let local_name = local_name.into();
        let remote_name = remote_name.unwrap_or_else(|| local_name.clone());
        Self {
            local_name,
            remote_name,
            region,
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Copy of this identity targeting another region.
    pub fn with_region(&self, region: Option<String>) -> Self {
        Self {
            region,
            ..self.clone()
        }
    }

    /// "in region eu-west-1" / "in default region", used in action notices.
    pub fn region_text(&self) -> String {
        match &self.region {
            Some(region) => format!("in region {}", region),
            None => "in default region".to_string(),
        }
    }
}

/// Whether a template must be generated per invocation or is used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSourceKind {
    /// A generator script rendered with the resolved parameters.
    Dynamic,
    /// A finished document referenced by path or URL.
    Static,
}

/// Where a stack's template comes from. The kind is fixed at config load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSource {
    pub location: String,
    pub kind: TemplateSourceKind,
}

impl TemplateSource {
    pub fn dynamic(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind: TemplateSourceKind::Dynamic,
        }
    }

    pub fn static_document(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind: TemplateSourceKind::Static,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == TemplateSourceKind::Dynamic
    }
}

/// The single template reference carried by a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateRef {
    Body(String),
    Url(String),
}

impl TemplateRef {
    pub fn as_str(&self) -> &str {
        match self {
            TemplateRef::Body(body) => body,
            TemplateRef::Url(url) => url,
        }
    }
}

/// Output of the template generator adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTemplate {
    pub template: TemplateRef,
    /// Parameter names the document declares. `None` means unknown, so every
    /// resolved parameter is forwarded.
    pub declared_parameters: Option<BTreeSet<String>>,
}

/// One key/value pair forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Provider-facing request assembled by `generate` and consumed by one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfnOptions {
    pub template: TemplateRef,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl CfnOptions {
    /// Parameters as a map, for diffing against deployed values.
    pub fn parameter_map(&self) -> ResolvedParameters {
        self.parameters
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }
}

/// Mutating actions the orchestrator can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackAction {
    Create,
    Update,
    Delete,
    Recreate,
}

impl StackAction {
    /// Capitalized verb used at the start of report lines.
    pub fn title(self) -> &'static str {
        match self {
            StackAction::Create => "Create",
            StackAction::Update => "Update",
            StackAction::Delete => "Delete",
            StackAction::Recreate => "Recreate",
        }
    }

    /// Whether a successful run is followed by an outputs listing.
    pub fn shows_outputs(self) -> bool {
        matches!(self, StackAction::Create | StackAction::Update)
    }
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackAction::Create => "create",
            StackAction::Update => "update",
            StackAction::Delete => "delete",
            StackAction::Recreate => "recreate",
        };
        f.write_str(name)
    }
}

/// Outcome of a mutating action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum ActionResult {
    Succeeded,
    /// The provider reported nothing to change.
    NoChange,
    Failed(String),
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Succeeded)
    }
}
