//! JSON shapes of `aws cloudformation` responses and request arguments.

use cairn_core::{CfnOptions, ResolvedParameters, StackEvent, StackOutput, TemplateRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use serde_yaml::Value as YamlValue;
use serde_yaml::value::TaggedValue;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeStacks {
    #[serde(default)]
    pub stacks: Vec<Stack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Stack {
    pub stack_id: String,
    pub stack_name: String,
    pub stack_status: String,
    #[serde(default)]
    pub parameters: Vec<StackParameter>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

impl Stack {
    pub fn parameter_map(&self) -> ResolvedParameters {
        self.parameters
            .iter()
            .map(|p| {
                (
                    p.parameter_key.clone(),
                    p.parameter_value.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn stack_outputs(&self) -> Vec<StackOutput> {
        self.outputs.iter().cloned().map(Output::into_output).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackParameter {
    pub parameter_key: String,
    #[serde(default)]
    pub parameter_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Output {
    pub output_key: String,
    pub output_value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub export_name: Option<String>,
}

impl Output {
    fn into_output(self) -> StackOutput {
        StackOutput {
            key: self.output_key,
            value: self.output_value,
            description: self.description,
            export_name: self.export_name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeStackEvents {
    #[serde(default)]
    pub stack_events: Vec<EventRecord>,
}

impl DescribeStackEvents {
    /// The service lists newest first.
    pub fn chronological(self) -> Vec<EventRecord> {
        let mut events = self.stack_events;
        events.reverse();
        events
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EventRecord {
    pub event_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub resource_type: String,
    pub timestamp: DateTime<Utc>,
    pub resource_status: String,
    #[serde(default)]
    pub resource_status_reason: Option<String>,
}

impl EventRecord {
    pub fn to_event(&self) -> StackEvent {
        StackEvent {
            timestamp: self.timestamp,
            logical_resource_id: self.logical_resource_id.clone(),
            resource_type: self.resource_type.clone(),
            resource_status: self.resource_status.clone(),
            reason: self.resource_status_reason.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StackIdResponse {
    pub stack_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct GetTemplate {
    pub template_body: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterArg<'a> {
    parameter_key: &'a str,
    parameter_value: &'a str,
}

pub(crate) fn is_url(location: &str) -> bool {
    location.starts_with("https://") || location.starts_with("http://")
}

/// `--template-url` for remote documents, `--template-body` otherwise. Local
/// files go through the CLI's `file://` loader.
pub(crate) fn template_args(template: &TemplateRef) -> Vec<String> {
    match template {
        TemplateRef::Body(body) => vec!["--template-body".to_string(), body.clone()],
        TemplateRef::Url(url) if is_url(url) => vec!["--template-url".to_string(), url.clone()],
        TemplateRef::Url(path) => vec![
            "--template-body".to_string(),
            format!("file://{}", path.trim_start_matches("file://")),
        ],
    }
}

pub(crate) fn stack_args(options: &CfnOptions) -> anyhow::Result<Vec<String>> {
    let mut args = template_args(&options.template);
    if !options.parameters.is_empty() {
        let parameters: Vec<ParameterArg<'_>> = options
            .parameters
            .iter()
            .map(|p| ParameterArg {
                parameter_key: &p.key,
                parameter_value: &p.value,
            })
            .collect();
        args.push("--parameters".to_string());
        args.push(serde_json::to_string(&parameters)?);
    }
    if !options.capabilities.is_empty() {
        args.push("--capabilities".to_string());
        args.extend(options.capabilities.iter().cloned());
    }
    Ok(args)
}

/// Parse a deployed or local template; YAML is a superset of JSON. Short-form
/// intrinsics (`!Ref`, `!Sub`, `!GetAtt` ...) become their long JSON form.
pub(crate) fn parse_document(text: &str) -> anyhow::Result<Value> {
    to_json(serde_yaml::from_str(text)?)
}

fn to_json(value: YamlValue) -> anyhow::Result<Value> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => serde_json::to_value(&n)?,
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => {
            Value::Array(items.into_iter().map(to_json).collect::<anyhow::Result<_>>()?)
        }
        YamlValue::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(mapping_key(key)?, to_json(value)?);
            }
            Value::Object(object)
        }
        YamlValue::Tagged(tagged) => intrinsic(*tagged)?,
    })
}

fn mapping_key(key: YamlValue) -> anyhow::Result<String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        other => anyhow::bail!("unsupported mapping key in template: {:?}", other),
    }
}

fn intrinsic(tagged: TaggedValue) -> anyhow::Result<Value> {
    let tag = tagged.tag.to_string();
    let name = tag.trim_start_matches('!');
    let value = to_json(tagged.value)?;
    let (key, value) = match (name, value) {
        ("Ref" | "Condition", value) => (name.to_string(), value),
        // `!GetAtt Resource.Attribute` is the string form of a two-element list.
        ("GetAtt", Value::String(path)) => {
            let value = match path.split_once('.') {
                Some((resource, attribute)) => json!([resource, attribute]),
                None => Value::String(path),
            };
            ("Fn::GetAtt".to_string(), value)
        }
        (other, value) => (format!("Fn::{}", other), value),
    };
    let mut object = Map::new();
    object.insert(key, value);
    Ok(Value::Object(object))
}

pub(crate) fn is_missing_stack(stderr: &str) -> bool {
    stderr.contains("does not exist")
}

pub(crate) fn is_no_updates(stderr: &str) -> bool {
    stderr.contains("No updates are to be performed")
}

pub(crate) fn is_validation_error(stderr: &str) -> bool {
    stderr.contains("(ValidationError)")
}
