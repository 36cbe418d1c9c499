//! Configuration types for cairn.
//!
//! A single YAML document (conventionally `cairn.yaml`) declares templates and,
//! under each template, the stacks deployed from it:
//!
//! ```yaml
//! templates:
//!   web:
//!     template_file: web.rb
//!     stacks:
//!       prod:
//!         default_region: ap-southeast-2
//!         params:
//!           AppName: MyApp
//! ```
//!
//! Each stack's local name is `<template>-<stack key>`; `stack_name` overrides
//! the name used against the provider.

pub mod stack;

use crate::{StackIdentity, TemplateSource, TemplateSourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use stack::{StackConfig, StackDefinition, TemplateConfig};

/// Placeholder replaced by the generator script path.
pub const TEMPLATE_PLACEHOLDER: &str = "{template}";
/// Placeholder replaced by the parameter side-channel file path.
pub const PARAMS_PLACEHOLDER: &str = "{params}";

/// Complete cairn configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CairnConfig {
    /// Command used to render dynamic templates, with `{template}` and
    /// `{params}` placeholders. Defaults to cfndsl.
    #[serde(default)]
    pub generator: Option<Vec<String>>,

    /// Templates keyed by template name.
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,

    /// Directory relative template paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Stack '{0}' is not defined in the configuration")]
    UnknownStack(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CairnConfig {
    /// Load configuration from a YAML file. Relative template paths are
    /// resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from an in-memory YAML structure.
    pub fn from_value(value: serde_yaml::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, template) in &self.templates {
            if template.template_file.trim().is_empty() {
                return Err(ConfigError::Config(format!(
                    "template '{}' has an empty template_file",
                    name
                )));
            }
        }
        if let Some(generator) = &self.generator {
            if generator.is_empty() {
                return Err(ConfigError::Config(
                    "generator must name a program".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Look up a template by name.
    pub fn template(&self, name: &str) -> Option<&TemplateConfig> {
        self.templates.get(name)
    }

    /// Generator argv, falling back to `cfndsl {template} -y {params}`.
    pub fn generator_command(&self) -> Vec<String> {
        self.generator.clone().unwrap_or_else(|| {
            vec![
                "cfndsl".to_string(),
                TEMPLATE_PLACEHOLDER.to_string(),
                "-y".to_string(),
                PARAMS_PLACEHOLDER.to_string(),
            ]
        })
    }

    /// Every configured stack, ordered by template then stack key.
    pub fn stacks(&self) -> Vec<StackDefinition> {
        self.templates
            .iter()
            .flat_map(|(template_name, template)| {
                template.stacks.iter().map(move |(stack_key, stack)| {
                    self.definition(template_name, template, stack_key, stack)
                })
            })
            .collect()
    }

    /// Local names of every configured stack.
    pub fn stack_names(&self) -> Vec<String> {
        self.stacks()
            .into_iter()
            .map(|s| s.identity.local_name().to_string())
            .collect()
    }

    /// Find a stack by its local name (`<template>-<stack key>`).
    pub fn stack(&self, local_name: &str) -> Result<StackDefinition, ConfigError> {
        self.stacks()
            .into_iter()
            .find(|s| s.identity.local_name() == local_name)
            .ok_or_else(|| ConfigError::UnknownStack(local_name.to_string()))
    }

    fn definition(
        &self,
        template_name: &str,
        template: &TemplateConfig,
        stack_key: &str,
        stack: &StackConfig,
    ) -> StackDefinition {
        let local_name = format!("{}-{}", template_name, stack_key);
        let identity = StackIdentity::new(
            local_name,
            stack.stack_name.clone(),
            stack.default_region.clone(),
        );

        let kind = template
            .template_kind
            .unwrap_or_else(|| classify_template(&template.template_file));
        let location = self.resolve_location(&template.template_file);
        let source = TemplateSource { location, kind };

        let capabilities = stack
            .capabilities
            .clone()
            .unwrap_or_else(|| template.capabilities.clone());

        StackDefinition {
            template_name: template_name.to_string(),
            stack_key: stack_key.to_string(),
            identity,
            source,
            params: stack.params.clone(),
            capabilities,
        }
    }

    fn resolve_location(&self, location: &str) -> String {
        if is_url(location) {
            return location.to_string();
        }
        let path = Path::new(location);
        match &self.base_dir {
            Some(base) if path.is_relative() && !base.as_os_str().is_empty() => {
                base.join(path).to_string_lossy().into_owned()
            }
            _ => location.to_string(),
        }
    }
}

/// Classify a template location once, at load time. URLs and finished
/// documents are static; anything else is treated as a generator script.
pub fn classify_template(location: &str) -> TemplateSourceKind {
    if is_url(location) {
        return TemplateSourceKind::Static;
    }
    match Path::new(location).extension().and_then(|e| e.to_str()) {
        Some("json" | "yaml" | "yml" | "template") => TemplateSourceKind::Static,
        _ => TemplateSourceKind::Dynamic,
    }
}

fn is_url(location: &str) -> bool {
    location.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const CONFIG: &str = r#"
templates:
  web:
    template_file: web.rb
    capabilities: [CAPABILITY_IAM]
    stacks:
      dev: {}
      prod:
        stack_name: legacy-web
        default_region: ap-southeast-2
        capabilities: [CAPABILITY_NAMED_IAM]
        params:
          AppName: MyApp
          Port: 8080
          Public: true
  app:
    template_file: https://s3.amazonaws.com/bucket/app.json
    stacks:
      dev:
"#;

    #[test]
    fn lists_every_stack_by_local_name() {
        let config = CairnConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.stack_names(), vec!["app-dev", "web-dev", "web-prod"]);
    }

    #[test]
    fn stack_name_overrides_remote_name_only() {
        let config = CairnConfig::from_yaml(CONFIG).unwrap();
        let prod = config.stack("web-prod").unwrap();
        assert_eq!(prod.identity.local_name(), "web-prod");
        assert_eq!(prod.identity.remote_name(), "legacy-web");
        assert_eq!(prod.identity.region(), Some("ap-southeast-2"));

        let dev = config.stack("web-dev").unwrap();
        assert_eq!(dev.identity.remote_name(), "web-dev");
        assert_eq!(dev.identity.region(), None);
    }

    #[test]
    fn scalar_params_are_stringified() {
        let config = CairnConfig::from_yaml(CONFIG).unwrap();
        let prod = config.stack("web-prod").unwrap();
        assert_eq!(prod.params.get("AppName").map(String::as_str), Some("MyApp"));
        assert_eq!(prod.params.get("Port").map(String::as_str), Some("8080"));
        assert_eq!(prod.params.get("Public").map(String::as_str), Some("true"));
    }

    #[test]
    fn capabilities_fall_back_to_template() {
        let config = CairnConfig::from_yaml(CONFIG).unwrap();
        assert_eq!(config.stack("web-dev").unwrap().capabilities, vec!["CAPABILITY_IAM"]);
        assert_eq!(
            config.stack("web-prod").unwrap().capabilities,
            vec!["CAPABILITY_NAMED_IAM"]
        );
        assert!(config.stack("app-dev").unwrap().capabilities.is_empty());
    }

    #[test]
    fn template_kind_is_decided_at_load() {
        let config = CairnConfig::from_yaml(CONFIG).unwrap();
        assert!(config.stack("web-dev").unwrap().source.is_dynamic());
        assert!(!config.stack("app-dev").unwrap().source.is_dynamic());

        assert_eq!(classify_template("stack.json"), TemplateSourceKind::Static);
        assert_eq!(classify_template("stack.yml"), TemplateSourceKind::Static);
        assert_eq!(classify_template("stack.rb"), TemplateSourceKind::Dynamic);
    }

    #[test]
    fn explicit_template_kind_wins() {
        let config = CairnConfig::from_yaml(
            r#"
templates:
  web:
    template_file: web.json
    template_kind: dynamic
    stacks:
      prod: {}
"#,
        )
        .unwrap();
        assert!(config.stack("web-prod").unwrap().source.is_dynamic());
    }

    #[test]
    fn unknown_stack_is_an_error() {
        let config = CairnConfig::from_yaml(CONFIG).unwrap();
        let err = config.stack("web-staging").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStack(name) if name == "web-staging"));
    }

    #[test]
    fn nested_param_values_are_rejected() {
        let err = CairnConfig::from_yaml(
            r#"
templates:
  web:
    template_file: web.rb
    stacks:
      prod:
        params:
          Subnets: [a, b]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Subnets"));
    }

    #[test]
    fn relative_paths_resolve_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cairn.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = CairnConfig::from_file(&path).unwrap();
        let web = config.stack("web-dev").unwrap();
        assert_eq!(
            web.source.location,
            dir.path().join("web.rb").to_string_lossy()
        );
        let app = config.stack("app-dev").unwrap();
        assert_eq!(app.source.location, "https://s3.amazonaws.com/bucket/app.json");
    }

    #[test]
    fn in_memory_structure_and_default_generator() {
        let value: serde_yaml::Value = serde_yaml::from_str(CONFIG).unwrap();
        let config = CairnConfig::from_value(value).unwrap();
        assert!(config.template("web").is_some());
        assert!(config.template("db").is_none());
        assert_eq!(config.generator_command(), vec!["cfndsl", "{template}", "-y", "{params}"]);
    }
}
