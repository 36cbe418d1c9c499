//! Error taxonomy for stack operations.
//!
//! Resolution and generation errors abort an operation before any remote
//! mutation is issued. Action failures are raised only after the remote
//! action has run to a terminal state.

use crate::StackAction;
use thiserror::Error;

/// A parameter reference expression could not be evaluated.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The referenced stack does not exist.
    #[error("cannot resolve '{reference}': stack '{stack}' does not exist")]
    StackNotFound { reference: String, stack: String },

    /// The referenced stack exists but has no such output.
    #[error("cannot resolve '{reference}': stack '{stack}' has no output '{output}'")]
    OutputNotFound {
        reference: String,
        stack: String,
        output: String,
    },

    /// An `env://` reference names an unset variable.
    #[error("cannot resolve '{reference}': environment variable '{name}' is not set")]
    EnvironmentNotSet { reference: String, name: String },

    /// An `env://` reference names a variable whose value is not valid Unicode.
    #[error("cannot resolve '{reference}': environment variable '{name}' is not valid unicode")]
    EnvironmentNotUnicode { reference: String, name: String },

    /// The reference uses a scheme nobody resolves.
    #[error("cannot resolve '{reference}': unsupported scheme '{scheme}'")]
    UnsupportedScheme { reference: String, scheme: String },

    /// The expression is not of the form `${scheme://...}`.
    #[error("malformed parameter reference '{reference}'")]
    Malformed { reference: String },

    /// Looking up the referenced stack failed remotely.
    #[error("cannot resolve '{reference}': {source:#}")]
    Remote {
        reference: String,
        #[source]
        source: anyhow::Error,
    },
}

/// The templating collaborator failed or produced something unusable.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The generator process could not be started.
    #[error("failed to start template generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The generator ran and reported failure.
    #[error("template generator failed for '{template}': {message}")]
    CollaboratorFailed { template: String, message: String },

    /// The generator output does not parse as a document.
    #[error("template generated from '{template}' is not a well-formed document: {source}")]
    MalformedDocument {
        template: String,
        #[source]
        source: serde_json::Error,
    },

    /// The parameter side-channel could not be written.
    #[error("failed to prepare template parameters: {0}")]
    SideChannel(#[from] std::io::Error),

    /// Parameters could not be serialized for the generator.
    #[error("failed to serialize template parameters: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// The document could not be rendered back to text.
    #[error("failed to render template document: {0}")]
    Render(#[from] serde_json::Error),
}

/// Errors surfaced by the stack orchestrator.
#[derive(Debug, Error)]
pub enum StackError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The provider reported failure for a mutating action.
    #[error("{} stack '{stack}' failed: {reason}", .action.title())]
    ActionFailed {
        action: StackAction,
        stack: String,
        reason: String,
    },

    /// A read-only provider call failed.
    #[error("remote call for stack '{stack}' failed: {source:#}")]
    Remote {
        stack: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StackError {
    pub fn remote(stack: &str, source: anyhow::Error) -> Self {
        Self::Remote {
            stack: stack.to_string(),
            source,
        }
    }

    pub fn is_action_failure(&self) -> bool {
        matches!(self, StackError::ActionFailed { .. })
    }
}
