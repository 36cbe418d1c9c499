use crate::client::{EventCallback, RemoteStackClient, StackClientProvider};
use crate::diff::DiffPresenter;
use crate::params::ParameterResolver;
use crate::report::{Notice, Presentation, Reporter};
use crate::template::TemplateGenerator;
use cairn_core::{
    ActionResult, CfnOptions, Listing, Parameter, ResolvedParameters, StackAction,
    StackDefinition, StackError, StackEvent, StackIdentity, StackOutput, StructuredDiff,
    TemplateRef,
};
use std::sync::Arc;

/// One mutating action together with the request it needs.
#[derive(Debug, Clone, Copy)]
enum ActionRequest<'a> {
    Create(&'a CfnOptions),
    Update(&'a CfnOptions),
    Delete,
    Recreate(&'a CfnOptions),
}

impl ActionRequest<'_> {
    fn action(&self) -> StackAction {
        match self {
            ActionRequest::Create(_) => StackAction::Create,
            ActionRequest::Update(_) => StackAction::Update,
            ActionRequest::Delete => StackAction::Delete,
            ActionRequest::Recreate(_) => StackAction::Recreate,
        }
    }
}

/// Drives one configured stack through the remote provider.
///
/// Remote state is never owned here: every operation asks the client, and
/// only existence feeds the create-vs-update decision. Each operation runs to
/// completion, including the remote action's event stream, before returning.
pub struct StackOrchestrator {
    definition: StackDefinition,
    client: Arc<dyn RemoteStackClient>,
    provider: Arc<dyn StackClientProvider>,
    generator: TemplateGenerator,
    reporter: Arc<dyn Reporter>,
    presentation: Presentation,
}

impl StackOrchestrator {
    pub fn new(
        definition: StackDefinition,
        provider: Arc<dyn StackClientProvider>,
        generator: TemplateGenerator,
        reporter: Arc<dyn Reporter>,
        presentation: Presentation,
    ) -> Self {
        let client = provider.client(
            definition.identity.remote_name(),
            definition.identity.region(),
        );
        Self {
            definition,
            client,
            provider,
            generator,
            reporter,
            presentation,
        }
    }

    pub fn identity(&self) -> &StackIdentity {
        &self.definition.identity
    }

    fn name(&self) -> &str {
        self.definition.identity.remote_name()
    }

    /// Resolve parameters, generate the template and assemble the request.
    ///
    /// For generated templates only the parameters the document declares are
    /// forwarded; static templates receive every resolved parameter.
    pub async fn generate(
        &self,
        overrides: &ResolvedParameters,
        pretty: bool,
    ) -> Result<CfnOptions, StackError> {
        let resolver = ParameterResolver::new(self.provider.as_ref(), self.identity().region());
        let params = resolver.resolve(&self.definition.params, overrides).await?;

        let generated = self
            .generator
            .generate(&self.definition.source, &params, pretty)
            .await?;

        let parameters: Vec<Parameter> = params
            .into_iter()
            .filter(|(key, _)| match &generated.declared_parameters {
                Some(declared) => declared.contains(key),
                None => true,
            })
            .map(|(key, value)| Parameter { key, value })
            .collect();

        Ok(CfnOptions {
            template: generated.template,
            parameters,
            capabilities: self.definition.capabilities.clone(),
        })
    }

    /// Create the stack if it is absent, update it otherwise.
    pub async fn apply(
        &self,
        overrides: &ResolvedParameters,
        pretty: bool,
    ) -> Result<ActionResult, StackError> {
        let options = self.generate(overrides, pretty).await?;
        let exists = self.client.exists().await.map_err(|e| self.remote(e))?;
        let request = if exists {
            ActionRequest::Update(&options)
        } else {
            ActionRequest::Create(&options)
        };
        self.invoke(request).await
    }

    /// Delete the stack. Deleting an absent stack is reported as skipped.
    pub async fn delete(&self) -> Result<ActionResult, StackError> {
        self.invoke(ActionRequest::Delete).await
    }

    /// Delete then create, reported as a single action.
    pub async fn recreate(
        &self,
        overrides: &ResolvedParameters,
        pretty: bool,
    ) -> Result<ActionResult, StackError> {
        let options = self.generate(overrides, pretty).await?;
        self.invoke(ActionRequest::Recreate(&options)).await
    }

    /// Report the diff between the proposed and deployed stack. Read-only.
    pub async fn diff(&self, overrides: &ResolvedParameters) -> Result<StructuredDiff, StackError> {
        let options = self.generate(overrides, false).await?;
        let diff = self.client.diff(&options).await.map_err(|e| self.remote(e))?;
        self.reporter
            .text(&DiffPresenter::new(self.presentation).render(&diff));
        Ok(diff)
    }

    /// Ask the provider to validate the proposed template. Read-only.
    pub async fn validate(&self, overrides: &ResolvedParameters) -> Result<bool, StackError> {
        let options = self.generate(overrides, false).await?;
        let valid = self
            .client
            .validate(&options)
            .await
            .map_err(|e| self.remote(e))?;
        if valid {
            self.reporter.notice(
                Notice::Success,
                &format!("Template for stack '{}' is valid", self.name()),
            );
        } else {
            self.reporter.notice(
                Notice::Failure,
                &format!("Template for stack '{}' is invalid", self.name()),
            );
        }
        Ok(valid)
    }

    pub async fn events(&self) -> Result<Listing<StackEvent>, StackError> {
        let events = self.client.events().await.map_err(|e| self.remote(e))?;
        let listing = Listing::from_remote(events);
        match &listing {
            Listing::StackAbsent => self.report_absent(),
            Listing::Empty => self
                .reporter
                .notice(Notice::Info, &format!("Stack '{}' has no events", self.name())),
            Listing::Items(events) => {
                self.reporter
                    .notice(Notice::Info, &format!("Events for stack '{}'", self.name()));
                for event in events {
                    self.reporter.event(event);
                }
            }
        }
        Ok(listing)
    }

    pub async fn outputs(&self) -> Result<Listing<StackOutput>, StackError> {
        let outputs = self.client.outputs().await.map_err(|e| self.remote(e))?;
        let listing = Listing::from_remote(outputs);
        match &listing {
            Listing::StackAbsent => self.report_absent(),
            Listing::Empty => self
                .reporter
                .notice(Notice::Info, &format!("Stack '{}' has no outputs", self.name())),
            Listing::Items(outputs) => {
                self.reporter
                    .notice(Notice::Info, &format!("Outputs for stack '{}'", self.name()));
                for output in outputs {
                    self.reporter.text(&output.to_string());
                }
            }
        }
        Ok(listing)
    }

    /// Current status symbol, `None` when the stack does not exist.
    pub async fn status(&self) -> Result<Option<String>, StackError> {
        let status = self.client.status().await.map_err(|e| self.remote(e))?;
        match &status {
            Some(status) => self.reporter.text(status),
            None => self.report_absent(),
        }
        Ok(status)
    }

    /// Render the proposed template. Read-only.
    pub async fn show(
        &self,
        overrides: &ResolvedParameters,
        pretty: bool,
    ) -> Result<TemplateRef, StackError> {
        let options = self.generate(overrides, pretty).await?;
        self.reporter.text(options.template.as_str());
        Ok(options.template)
    }

    /// Render the deployed template, `None` when the stack does not exist.
    pub async fn show_current(&self) -> Result<Option<String>, StackError> {
        let template = self
            .client
            .current_template()
            .await
            .map_err(|e| self.remote(e))?;
        match &template {
            Some(template) => self.reporter.text(template),
            None => self.report_absent(),
        }
        Ok(template)
    }

    async fn invoke(&self, request: ActionRequest<'_>) -> Result<ActionResult, StackError> {
        let action = request.action();
        let identity = self.identity();
        self.reporter.notice(
            Notice::Info,
            &format!(
                "{} stack '{}' {}",
                action.title(),
                identity.remote_name(),
                identity.region_text()
            ),
        );
        tracing::info!(
            stack = %identity.remote_name(),
            region = ?identity.region(),
            action = %action,
            "Starting stack action"
        );

        let reporter = self.reporter.clone();
        let on_event = move |event: &StackEvent| reporter.event(event);

        // A client error is a failed action, but only once the call returned:
        // the remote operation is never interrupted.
        let result = match self.dispatch(request, &on_event).await {
            Ok(result) => result,
            Err(err) => ActionResult::Failed(format!("{:#}", err)),
        };

        match &result {
            ActionResult::Succeeded => {
                tracing::info!(stack = %identity.remote_name(), action = %action, "Stack action succeeded");
                self.reporter.notice(
                    Notice::Success,
                    &format!(
                        "{} stack '{}' completed successfully",
                        action.title(),
                        identity.remote_name()
                    ),
                );
                if action.shows_outputs() {
                    self.display_outputs().await;
                }
            }
            ActionResult::NoChange => {
                tracing::info!(stack = %identity.remote_name(), action = %action, "Stack action skipped");
                let why = match action {
                    StackAction::Delete => "stack does not exist",
                    _ => "template has not changed",
                };
                self.reporter.notice(
                    Notice::Skipped,
                    &format!(
                        "{} stack '{}' skipped as {}",
                        action.title(),
                        identity.remote_name(),
                        why
                    ),
                );
            }
            ActionResult::Failed(reason) => {
                tracing::warn!(stack = %identity.remote_name(), action = %action, reason = %reason, "Stack action failed");
                return Err(StackError::ActionFailed {
                    action,
                    stack: identity.remote_name().to_string(),
                    reason: reason.clone(),
                });
            }
        }

        Ok(result)
    }

    async fn dispatch(
        &self,
        request: ActionRequest<'_>,
        on_event: EventCallback<'_>,
    ) -> anyhow::Result<ActionResult> {
        match request {
            ActionRequest::Create(options) => self.client.create(options, on_event).await,
            ActionRequest::Update(options) => self.client.update(options, on_event).await,
            ActionRequest::Delete => self.client.delete(on_event).await,
            ActionRequest::Recreate(options) => {
                // Create starts only after delete reached a terminal state.
                if let ActionResult::Failed(reason) = self.client.delete(on_event).await? {
                    return Ok(ActionResult::Failed(format!("delete failed: {}", reason)));
                }
                self.client.create(options, on_event).await
            }
        }
    }

    async fn display_outputs(&self) {
        match self.client.outputs().await {
            Ok(Some(outputs)) if !outputs.is_empty() => {
                self.reporter.notice(Notice::Info, "Stack outputs");
                for output in outputs {
                    self.reporter.text(&output.to_string());
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(stack = %self.name(), error = %err, "Failed to fetch stack outputs");
            }
        }
    }

    fn report_absent(&self) {
        self.reporter
            .notice(Notice::Info, &format!("Stack '{}' does not exist", self.name()));
    }

    fn remote(&self, source: anyhow::Error) -> StackError {
        StackError::remote(self.name(), source)
    }
}
