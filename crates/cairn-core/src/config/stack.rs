//! Template and stack entries of the configuration document.

use crate::{ResolvedParameters, StackIdentity, TemplateSource, TemplateSourceKind};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A template and the stacks deployed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Generator script, local document, or document URL.
    pub template_file: String,

    /// Overrides load-time classification of `template_file`.
    #[serde(default)]
    pub template_kind: Option<TemplateSourceKind>,

    /// Capabilities inherited by stacks that do not declare their own.
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Stacks keyed by stack key. An empty entry (`prod:`) is allowed.
    #[serde(default, deserialize_with = "deserialize_stacks")]
    pub stacks: BTreeMap<String, StackConfig>,
}

/// User-authored settings for one stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    /// Name used against the provider instead of `<template>-<key>`.
    #[serde(default)]
    pub stack_name: Option<String>,

    /// Parameter values. Scalars are accepted and stringified.
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: ResolvedParameters,

    #[serde(default)]
    pub capabilities: Option<Vec<String>>,

    #[serde(default)]
    pub default_region: Option<String>,
}

/// A fully resolved stack entry: identity, template source and settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    pub template_name: String,
    pub stack_key: String,
    pub identity: StackIdentity,
    pub source: TemplateSource,
    pub params: ResolvedParameters,
    pub capabilities: Vec<String>,
}

impl StackDefinition {
    /// Same definition deployed to another region.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.identity = self.identity.with_region(region);
        self
    }
}

fn deserialize_stacks<'de, D>(deserializer: D) -> Result<BTreeMap<String, StackConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<StackConfig>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, stack)| (key, stack.unwrap_or_default()))
        .collect())
}

fn deserialize_params<'de, D>(deserializer: D) -> Result<ResolvedParameters, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_yaml::Value>> = Option::deserialize(deserializer)?;
    let mut params = ResolvedParameters::new();
    for (key, value) in raw.unwrap_or_default() {
        let value = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Null => String::new(),
            _ => {
                return Err(serde::de::Error::custom(format!(
                    "parameter '{}' must be a scalar value",
                    key
                )));
            }
        };
        params.insert(key, value);
    }
    Ok(params)
}
