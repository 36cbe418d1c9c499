//! `RemoteStackClient` over the `aws cloudformation` command line.
//!
//! Every call spawns the CLI with `--output json` and parses its response.
//! Mutating calls poll the stack until it reaches a terminal status, handing
//! each new event to the caller as soon as it shows up.

use async_trait::async_trait;
use cairn_core::{
    ActionResult, CfnOptions, ResolvedParameters, StackEvent, StackOutput, StackStatus,
    StructuredDiff, TemplateRef,
};
use cairn_runtime::{EventCallback, RemoteStackClient, StackClientProvider};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

mod wire;

use wire::{DescribeStackEvents, DescribeStacks, GetTemplate, Stack, StackIdResponse};

#[derive(Debug, Clone)]
pub struct AwsCliOptions {
    /// Program plus leading arguments, e.g. `["aws"]` or
    /// `["aws-vault", "exec", "prod", "--", "aws"]`.
    pub command: Vec<String>,
    pub profile: Option<String>,
    pub poll_interval: Duration,
}

impl Default for AwsCliOptions {
    fn default() -> Self {
        Self {
            command: vec!["aws".to_string()],
            profile: None,
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Hands out one CLI-backed client per stack and region.
pub struct AwsCliProvider {
    options: AwsCliOptions,
}

impl AwsCliProvider {
    pub fn new(options: AwsCliOptions) -> Self {
        Self { options }
    }
}

impl StackClientProvider for AwsCliProvider {
    fn client(&self, remote_name: &str, region: Option<&str>) -> Arc<dyn RemoteStackClient> {
        Arc::new(AwsCliStackClient::new(
            remote_name,
            region.map(str::to_string),
            self.options.clone(),
        ))
    }
}

/// Result of one CLI invocation. A non-zero exit is not an `Err` here: most
/// callers need to look at the service's message first.
enum CliOutput {
    Success(Vec<u8>),
    Failure(String),
}

pub struct AwsCliStackClient {
    stack_name: String,
    region: Option<String>,
    options: AwsCliOptions,
}

impl AwsCliStackClient {
    pub fn new(stack_name: impl Into<String>, region: Option<String>, options: AwsCliOptions) -> Self {
        Self {
            stack_name: stack_name.into(),
            region,
            options,
        }
    }

    async fn run(&self, operation: &str, args: &[String]) -> anyhow::Result<CliOutput> {
        let Some((program, leading)) = self.options.command.split_first() else {
            anyhow::bail!("no aws command configured");
        };

        let mut command = Command::new(program);
        command
            .args(leading)
            .arg("cloudformation")
            .arg(operation)
            .args(args)
            .args(["--output", "json"]);
        if let Some(region) = &self.region {
            command.args(["--region", region.as_str()]);
        }
        if let Some(profile) = &self.options.profile {
            command.args(["--profile", profile.as_str()]);
        }

        tracing::debug!(stack = %self.stack_name, operation, "Calling aws cloudformation");

        let output = command
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", program, e))?;

        if output.status.success() {
            Ok(CliOutput::Success(output.stdout))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(stack = %self.stack_name, operation, stderr = %stderr, "aws cloudformation failed");
            Ok(CliOutput::Failure(stderr))
        }
    }

    /// Run and parse a response; a missing stack answers `None`.
    async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        args: &[String],
    ) -> anyhow::Result<Option<T>> {
        match self.run(operation, args).await? {
            CliOutput::Success(stdout) => Ok(Some(parse(operation, &stdout)?)),
            CliOutput::Failure(stderr) if wire::is_missing_stack(&stderr) => Ok(None),
            CliOutput::Failure(stderr) => Err(anyhow::anyhow!("{} failed: {}", operation, stderr)),
        }
    }

    async fn describe(&self, stack: &str) -> anyhow::Result<Option<Stack>> {
        let response: Option<DescribeStacks> = self
            .query("describe-stacks", &["--stack-name".to_string(), stack.to_string()])
            .await?;
        Ok(response.and_then(|r| r.stacks.into_iter().next()))
    }

    async fn event_records(&self, stack: &str) -> anyhow::Result<Option<Vec<wire::EventRecord>>> {
        let response: Option<DescribeStackEvents> = self
            .query(
                "describe-stack-events",
                &["--stack-name".to_string(), stack.to_string()],
            )
            .await?;
        Ok(response.map(DescribeStackEvents::chronological))
    }

    async fn seen_event_ids(&self, stack: &str) -> anyhow::Result<HashSet<String>> {
        Ok(self
            .event_records(stack)
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.event_id)
            .collect())
    }

    async fn emit_new_events(
        &self,
        stack: &str,
        seen: &mut HashSet<String>,
        on_event: EventCallback<'_>,
    ) -> anyhow::Result<()> {
        for record in self.event_records(stack).await?.unwrap_or_default() {
            if seen.insert(record.event_id.clone()) {
                on_event(&record.to_event());
            }
        }
        Ok(())
    }

    /// Poll `stack_id` until its status is terminal, streaming events on the way.
    async fn wait(
        &self,
        stack_id: &str,
        mut seen: HashSet<String>,
        on_event: EventCallback<'_>,
        expected: &str,
    ) -> anyhow::Result<ActionResult> {
        loop {
            tokio::time::sleep(self.options.poll_interval).await;
            self.emit_new_events(stack_id, &mut seen, on_event).await?;

            let status = match self.describe(stack_id).await? {
                Some(stack) => {
                    tracing::debug!(stack = %stack.stack_name, status = %stack.stack_status, "Polled stack status");
                    StackStatus::new(stack.stack_status)
                }
                // Only a deleted stack can vanish while we wait on it.
                None if expected == "DELETE_COMPLETE" => StackStatus::new(expected),
                None => anyhow::bail!("stack '{}' disappeared while waiting", self.stack_name),
            };

            if status.is_terminal() {
                // Events written between the last poll and the final status.
                self.emit_new_events(stack_id, &mut seen, on_event).await?;
                return Ok(if status.as_str() == expected {
                    ActionResult::Succeeded
                } else {
                    ActionResult::Failed(status.to_string())
                });
            }
        }
    }

    fn name_args(&self, options: &CfnOptions) -> anyhow::Result<Vec<String>> {
        let mut args = vec!["--stack-name".to_string(), self.stack_name.clone()];
        args.extend(wire::stack_args(options)?);
        Ok(args)
    }

    async fn proposed_document(&self, template: &TemplateRef) -> anyhow::Result<Value> {
        match template {
            TemplateRef::Body(body) => wire::parse_document(body),
            TemplateRef::Url(url) if wire::is_url(url) => {
                anyhow::bail!("cannot diff against remote template URL {}", url)
            }
            TemplateRef::Url(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read template {}: {}", path, e))?;
                wire::parse_document(&text)
            }
        }
    }

    async fn current_document(&self) -> anyhow::Result<Option<Value>> {
        let response: Option<GetTemplate> = self
            .query("get-template", &["--stack-name".to_string(), self.stack_name.clone()])
            .await?;
        match response.map(|r| r.template_body) {
            Some(Value::String(text)) => Ok(Some(wire::parse_document(&text)?)),
            other => Ok(other),
        }
    }
}

fn parse<T: DeserializeOwned>(operation: &str, stdout: &[u8]) -> anyhow::Result<T> {
    serde_json::from_slice(stdout)
        .map_err(|e| anyhow::anyhow!("Unexpected {} response: {}", operation, e))
}

#[async_trait]
impl RemoteStackClient for AwsCliStackClient {
    async fn exists(&self) -> anyhow::Result<bool> {
        Ok(self.describe(&self.stack_name).await?.is_some())
    }

    async fn status(&self) -> anyhow::Result<Option<String>> {
        Ok(self
            .describe(&self.stack_name)
            .await?
            .map(|stack| stack.stack_status))
    }

    async fn current_template(&self) -> anyhow::Result<Option<String>> {
        let response: Option<GetTemplate> = self
            .query("get-template", &["--stack-name".to_string(), self.stack_name.clone()])
            .await?;
        match response.map(|r| r.template_body) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(document) => Ok(Some(serde_json::to_string_pretty(&document)?)),
        }
    }

    async fn create(&self, options: &CfnOptions, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult> {
        let args = self.name_args(options)?;
        let created: StackIdResponse = match self.run("create-stack", &args).await? {
            CliOutput::Success(stdout) => parse("create-stack", &stdout)?,
            CliOutput::Failure(stderr) => anyhow::bail!(stderr),
        };
        tracing::info!(stack = %self.stack_name, stack_id = %created.stack_id, "Stack creation started");
        self.wait(&created.stack_id, HashSet::new(), on_event, "CREATE_COMPLETE")
            .await
    }

    async fn update(&self, options: &CfnOptions, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult> {
        let seen = self.seen_event_ids(&self.stack_name).await?;
        let args = self.name_args(options)?;
        let updated: StackIdResponse = match self.run("update-stack", &args).await? {
            CliOutput::Success(stdout) => parse("update-stack", &stdout)?,
            CliOutput::Failure(stderr) if wire::is_no_updates(&stderr) => {
                return Ok(ActionResult::NoChange);
            }
            CliOutput::Failure(stderr) => anyhow::bail!(stderr),
        };
        tracing::info!(stack = %self.stack_name, stack_id = %updated.stack_id, "Stack update started");
        self.wait(&updated.stack_id, seen, on_event, "UPDATE_COMPLETE")
            .await
    }

    async fn delete(&self, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult> {
        // Deleted stacks are only reachable by id once the name is released.
        let Some(stack) = self.describe(&self.stack_name).await? else {
            return Ok(ActionResult::NoChange);
        };
        let seen = self.seen_event_ids(&stack.stack_id).await?;
        let args = ["--stack-name".to_string(), stack.stack_id.clone()];
        if let CliOutput::Failure(stderr) = self.run("delete-stack", &args).await? {
            anyhow::bail!(stderr);
        }
        tracing::info!(stack = %self.stack_name, stack_id = %stack.stack_id, "Stack deletion started");
        self.wait(&stack.stack_id, seen, on_event, "DELETE_COMPLETE")
            .await
    }

    async fn validate(&self, options: &CfnOptions) -> anyhow::Result<bool> {
        let args = wire::template_args(&options.template);
        match self.run("validate-template", &args).await? {
            CliOutput::Success(_) => Ok(true),
            CliOutput::Failure(stderr) if wire::is_validation_error(&stderr) => {
                tracing::warn!(stack = %self.stack_name, reason = %stderr, "Template rejected");
                Ok(false)
            }
            CliOutput::Failure(stderr) => anyhow::bail!(stderr),
        }
    }

    async fn diff(&self, options: &CfnOptions) -> anyhow::Result<StructuredDiff> {
        let proposed = self.proposed_document(&options.template).await?;
        let (current, current_params) = match self.describe(&self.stack_name).await? {
            Some(stack) => (self.current_document().await?, stack.parameter_map()),
            None => (None, ResolvedParameters::new()),
        };
        Ok(StructuredDiff::compute(
            current.as_ref(),
            &current_params,
            &proposed,
            &options.parameter_map(),
        ))
    }

    async fn outputs(&self) -> anyhow::Result<Option<Vec<StackOutput>>> {
        Ok(self
            .describe(&self.stack_name)
            .await?
            .map(|stack| stack.stack_outputs()))
    }

    async fn events(&self) -> anyhow::Result<Option<Vec<StackEvent>>> {
        Ok(self
            .event_records(&self.stack_name)
            .await?
            .map(|records| records.iter().map(wire::EventRecord::to_event).collect()))
    }
}
