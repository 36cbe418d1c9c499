//! Test doubles for orchestrator tests: a scripted remote client, a provider
//! handing out scripted clients by stack name, and an in-memory renderer.

#![allow(dead_code)]

use async_trait::async_trait;
use cairn_core::{
    ActionResult, CfnOptions, GenerationError, ResolvedParameters, StackDefinition, StackEvent,
    StackIdentity, StackOutput, StructuredDiff, TemplateSource,
};
use cairn_runtime::{
    EventCallback, MemoryReporter, Presentation, RemoteStackClient, StackClientProvider,
    StackOrchestrator, TemplateGenerator, TemplateRenderer,
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Every call the orchestrator made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Exists,
    Status,
    CurrentTemplate,
    Create(CfnOptions),
    Update(CfnOptions),
    Delete,
    Validate(CfnOptions),
    Diff(CfnOptions),
    Outputs,
    Events,
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Update(_) | Call::Delete)
    }
}

pub struct State {
    exists: bool,
    status: String,
    template: Option<String>,
    outputs: Vec<StackOutput>,
    events: Vec<StackEvent>,
    create_result: ActionResult,
    update_result: ActionResult,
    delete_result: ActionResult,
    action_error: Option<String>,
    action_events: Vec<StackEvent>,
    valid: bool,
    diff: StructuredDiff,
    calls: Vec<Call>,
    created_while_present: bool,
}

/// Scripted provider stub. With `read_only`, any mutating call panics.
pub struct ScriptedClient {
    state: Mutex<State>,
    read_only: bool,
}

impl ScriptedClient {
    pub fn absent() -> Self {
        Self {
            state: Mutex::new(State {
                exists: false,
                status: String::new(),
                template: None,
                outputs: Vec::new(),
                events: Vec::new(),
                create_result: ActionResult::Succeeded,
                update_result: ActionResult::Succeeded,
                delete_result: ActionResult::Succeeded,
                action_error: None,
                action_events: Vec::new(),
                valid: true,
                diff: StructuredDiff::default(),
                calls: Vec::new(),
                created_while_present: false,
            }),
            read_only: false,
        }
    }

    pub fn present(status: &str) -> Self {
        let client = Self::absent();
        client.with(|s| {
            s.exists = true;
            s.status = status.to_string();
            s.template = Some("{\"Resources\":{}}".to_string());
        });
        client
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn with_outputs(self, outputs: Vec<StackOutput>) -> Self {
        self.with(|s| s.outputs = outputs);
        self
    }

    pub fn with_events(self, events: Vec<StackEvent>) -> Self {
        self.with(|s| s.events = events);
        self
    }

    pub fn with_action_events(self, events: Vec<StackEvent>) -> Self {
        self.with(|s| s.action_events = events);
        self
    }

    pub fn with_update_result(self, result: ActionResult) -> Self {
        self.with(|s| s.update_result = result);
        self
    }

    pub fn with_create_result(self, result: ActionResult) -> Self {
        self.with(|s| s.create_result = result);
        self
    }

    pub fn with_delete_result(self, result: ActionResult) -> Self {
        self.with(|s| s.delete_result = result);
        self
    }

    pub fn with_action_error(self, message: &str) -> Self {
        self.with(|s| s.action_error = Some(message.to_string()));
        self
    }

    pub fn with_validity(self, valid: bool) -> Self {
        self.with(|s| s.valid = valid);
        self
    }

    pub fn with_diff(self, diff: StructuredDiff) -> Self {
        self.with(|s| s.diff = diff);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn created_while_present(&self) -> bool {
        self.state.lock().unwrap().created_while_present
    }

    fn record(&self, call: Call) {
        if self.read_only && call.is_mutation() {
            panic!("read-only operation issued a mutating call: {:?}", call);
        }
        self.state.lock().unwrap().calls.push(call);
    }

    fn emit(&self, on_event: EventCallback<'_>) {
        let events = self.state.lock().unwrap().action_events.clone();
        for event in &events {
            on_event(event);
        }
    }

    fn action_error(&self) -> Option<anyhow::Error> {
        self.state
            .lock()
            .unwrap()
            .action_error
            .as_ref()
            .map(|m| anyhow::anyhow!(m.clone()))
    }
}

#[async_trait]
impl RemoteStackClient for ScriptedClient {
    async fn exists(&self) -> anyhow::Result<bool> {
        self.record(Call::Exists);
        Ok(self.state.lock().unwrap().exists)
    }

    async fn status(&self) -> anyhow::Result<Option<String>> {
        self.record(Call::Status);
        let s = self.state.lock().unwrap();
        Ok(s.exists.then(|| s.status.clone()))
    }

    async fn current_template(&self) -> anyhow::Result<Option<String>> {
        self.record(Call::CurrentTemplate);
        let s = self.state.lock().unwrap();
        Ok(if s.exists { s.template.clone() } else { None })
    }

    async fn create(&self, options: &CfnOptions, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult> {
        self.record(Call::Create(options.clone()));
        self.emit(on_event);
        if let Some(err) = self.action_error() {
            return Err(err);
        }
        let mut s = self.state.lock().unwrap();
        if s.exists {
            s.created_while_present = true;
        }
        if s.create_result.is_success() {
            s.exists = true;
            s.status = "CREATE_COMPLETE".to_string();
        }
        Ok(s.create_result.clone())
    }

    async fn update(&self, options: &CfnOptions, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult> {
        self.record(Call::Update(options.clone()));
        self.emit(on_event);
        if let Some(err) = self.action_error() {
            return Err(err);
        }
        Ok(self.state.lock().unwrap().update_result.clone())
    }

    async fn delete(&self, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult> {
        self.record(Call::Delete);
        // Simulate the remote operation taking a while before it settles.
        tokio::task::yield_now().await;
        self.emit(on_event);
        if let Some(err) = self.action_error() {
            return Err(err);
        }
        let mut s = self.state.lock().unwrap();
        if !s.exists {
            return Ok(ActionResult::NoChange);
        }
        if s.delete_result.is_success() {
            s.exists = false;
        }
        Ok(s.delete_result.clone())
    }

    async fn validate(&self, options: &CfnOptions) -> anyhow::Result<bool> {
        self.record(Call::Validate(options.clone()));
        Ok(self.state.lock().unwrap().valid)
    }

    async fn diff(&self, options: &CfnOptions) -> anyhow::Result<StructuredDiff> {
        self.record(Call::Diff(options.clone()));
        Ok(self.state.lock().unwrap().diff.clone())
    }

    async fn outputs(&self) -> anyhow::Result<Option<Vec<StackOutput>>> {
        self.record(Call::Outputs);
        let s = self.state.lock().unwrap();
        Ok(s.exists.then(|| s.outputs.clone()))
    }

    async fn events(&self) -> anyhow::Result<Option<Vec<StackEvent>>> {
        self.record(Call::Events);
        let s = self.state.lock().unwrap();
        Ok(s.exists.then(|| s.events.clone()))
    }
}

/// Hands out scripted clients by remote stack name; unknown stacks are absent.
#[derive(Default)]
pub struct ScriptedProvider {
    clients: BTreeMap<String, Arc<ScriptedClient>>,
}

impl ScriptedProvider {
    pub fn with_stack(mut self, name: &str, client: ScriptedClient) -> Self {
        self.clients.insert(name.to_string(), Arc::new(client));
        self
    }

    pub fn stack(&self, name: &str) -> Arc<ScriptedClient> {
        self.clients
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no scripted stack '{}'", name))
    }
}

impl StackClientProvider for ScriptedProvider {
    fn client(&self, remote_name: &str, _region: Option<&str>) -> Arc<dyn RemoteStackClient> {
        match self.clients.get(remote_name) {
            Some(client) => client.clone(),
            None => Arc::new(ScriptedClient::absent()),
        }
    }
}

/// Renders the Elastic Beanstalk application template used across tests.
/// It declares `AppName` and uses it as the application name.
pub struct BeanstalkRenderer;

#[async_trait]
impl TemplateRenderer for BeanstalkRenderer {
    async fn render(&self, _script: &str, params: &ResolvedParameters) -> Result<Value, GenerationError> {
        let app_name = params.get("AppName").cloned().unwrap_or_default();
        Ok(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Parameters": {"AppName": {"Type": "String"}},
            "Resources": {
                "EBApp": {
                    "Type": "AWS::ElasticBeanstalk::Application",
                    "Properties": {"ApplicationName": app_name}
                }
            }
        }))
    }
}

/// Renders the end-to-end template: no declared parameters section, the
/// application name baked in from the side-channel parameters.
pub struct InlineRenderer;

#[async_trait]
impl TemplateRenderer for InlineRenderer {
    async fn render(&self, _script: &str, params: &ResolvedParameters) -> Result<Value, GenerationError> {
        Ok(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Resources": {
                "EBApp": {
                    "Type": "AWS::ElasticBeanstalk::Application",
                    "Properties": {"ApplicationName": params.get("AppName").cloned().unwrap_or_default()}
                }
            }
        }))
    }
}

/// A templating collaborator that always fails.
pub struct FailingRenderer;

#[async_trait]
impl TemplateRenderer for FailingRenderer {
    async fn render(&self, script: &str, _params: &ResolvedParameters) -> Result<Value, GenerationError> {
        Err(GenerationError::CollaboratorFailed {
            template: script.to_string(),
            message: "undefined method `ElasticBeanstalk_Application'".to_string(),
        })
    }
}

pub fn definition(source: TemplateSource, params: &[(&str, &str)]) -> StackDefinition {
    StackDefinition {
        template_name: "web".to_string(),
        stack_key: "prod".to_string(),
        identity: StackIdentity::new("web-prod", None, None),
        source,
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        capabilities: vec!["CAPABILITY_IAM".to_string()],
    }
}

pub fn build_orchestrator(
    definition: StackDefinition,
    provider: Arc<ScriptedProvider>,
    renderer: Arc<dyn TemplateRenderer>,
) -> (StackOrchestrator, Arc<MemoryReporter>) {
    let reporter = Arc::new(MemoryReporter::new());
    let orchestrator = StackOrchestrator::new(
        definition,
        provider,
        TemplateGenerator::new(renderer),
        reporter.clone(),
        Presentation::plain(),
    );
    (orchestrator, reporter)
}

pub fn overrides(pairs: &[(&str, &str)]) -> ResolvedParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn event(minute: u32, logical_id: &str, status: &str) -> StackEvent {
    StackEvent {
        timestamp: Utc.with_ymd_and_hms(2016, 7, 21, 15, minute, 0).unwrap(),
        logical_resource_id: logical_id.to_string(),
        resource_type: "AWS::ElasticBeanstalk::Application".to_string(),
        resource_status: status.to_string(),
        reason: None,
    }
}

pub fn output(key: &str, value: &str) -> StackOutput {
    StackOutput {
        key: key.to_string(),
        value: value.to_string(),
        description: None,
        export_name: None,
    }
}
