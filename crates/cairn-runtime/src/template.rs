//! Template generation.
//!
//! Static sources are passed through as a URL/path reference. Dynamic sources
//! are rendered by a [`TemplateRenderer`] with the resolved parameters as its
//! only external input; the rendered document's top-level `Parameters` keys
//! are the names the template declares.

use async_trait::async_trait;
use cairn_core::config::{PARAMS_PLACEHOLDER, TEMPLATE_PLACEHOLDER};
use cairn_core::{
    GeneratedTemplate, GenerationError, ResolvedParameters, TemplateRef, TemplateSource,
    TemplateSourceKind,
};
use serde_json::Value;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;

/// The external templating collaborator.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render the generator script at `script` with `params` into a document.
    async fn render(&self, script: &str, params: &ResolvedParameters) -> Result<Value, GenerationError>;
}

/// Turns a template source plus parameters into a [`GeneratedTemplate`].
#[derive(Clone)]
pub struct TemplateGenerator {
    renderer: Arc<dyn TemplateRenderer>,
}

impl TemplateGenerator {
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { renderer }
    }

    /// `pretty` only changes formatting: both forms parse to the same value.
    pub async fn generate(
        &self,
        source: &TemplateSource,
        params: &ResolvedParameters,
        pretty: bool,
    ) -> Result<GeneratedTemplate, GenerationError> {
        match source.kind {
            TemplateSourceKind::Static => Ok(GeneratedTemplate {
                template: TemplateRef::Url(source.location.clone()),
                declared_parameters: None,
            }),
            TemplateSourceKind::Dynamic => {
                let document = self.renderer.render(&source.location, params).await?;
                if !document.is_object() {
                    return Err(GenerationError::MalformedDocument {
                        template: source.location.clone(),
                        source: serde::de::Error::custom("template document must be a JSON object"),
                    });
                }

                let declared: BTreeSet<String> = document
                    .get("Parameters")
                    .and_then(Value::as_object)
                    .map(|p| p.keys().cloned().collect())
                    .unwrap_or_default();

                let body = if pretty {
                    serde_json::to_string_pretty(&document)?
                } else {
                    serde_json::to_string(&document)?
                };

                tracing::debug!(
                    template = %source.location,
                    declared = declared.len(),
                    bytes = body.len(),
                    "Generated template"
                );

                Ok(GeneratedTemplate {
                    template: TemplateRef::Body(body),
                    declared_parameters: Some(declared),
                })
            }
        }
    }
}

/// Parameters written to a YAML file that lives exactly as long as this value.
pub struct ParamsFile {
    file: NamedTempFile,
}

impl ParamsFile {
    pub fn write(params: &ResolvedParameters) -> Result<Self, GenerationError> {
        let mut file = tempfile::Builder::new()
            .prefix("cairn")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(serde_yaml::to_string(params)?.as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Runs an external generator command, e.g. `cfndsl {template} -y {params}`.
///
/// The command reads parameters from a side-channel file and prints a JSON
/// document on stdout. The file is removed when rendering returns, whether it
/// succeeded or not.
pub struct CommandRenderer {
    command: Vec<String>,
}

impl CommandRenderer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl TemplateRenderer for CommandRenderer {
    async fn render(&self, script: &str, params: &ResolvedParameters) -> Result<Value, GenerationError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(GenerationError::CollaboratorFailed {
                template: script.to_string(),
                message: "no generator command configured".to_string(),
            });
        };

        let params_file = ParamsFile::write(params)?;
        let params_path = params_file.path().to_string_lossy().into_owned();
        let args: Vec<String> = args
            .iter()
            .map(|arg| {
                arg.replace(TEMPLATE_PLACEHOLDER, script)
                    .replace(PARAMS_PLACEHOLDER, &params_path)
            })
            .collect();

        tracing::debug!(program = %program, args = ?args, "Running template generator");

        let output = Command::new(program)
            .args(&args)
            .output()
            .await
            .map_err(|source| GenerationError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("generator exited with {}", output.status)
            } else {
                stderr
            };
            return Err(GenerationError::CollaboratorFailed {
                template: script.to_string(),
                message,
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| GenerationError::MalformedDocument {
            template: script.to_string(),
            source,
        })
    }
}
