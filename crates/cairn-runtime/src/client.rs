use async_trait::async_trait;
use cairn_core::{ActionResult, CfnOptions, StackEvent, StackOutput, StructuredDiff};
use std::sync::Arc;

/// Receives each event as the provider reports it, while an action runs.
pub type EventCallback<'a> = &'a (dyn Fn(&StackEvent) + Send + Sync);

/// Capability boundary around the remote provisioning service, bound to one
/// named stack in one region.
///
/// Mutating calls return only once the remote operation reached a terminal
/// state. `ActionResult::NoChange` means the provider had nothing to do; an
/// `Err` is classified as a failure by the caller.
#[async_trait]
pub trait RemoteStackClient: Send + Sync {
    async fn exists(&self) -> anyhow::Result<bool>;

    /// Current status symbol, `None` when the stack does not exist.
    async fn status(&self) -> anyhow::Result<Option<String>>;

    /// Currently deployed template document, `None` when absent.
    async fn current_template(&self) -> anyhow::Result<Option<String>>;

    async fn create(
        &self,
        options: &CfnOptions,
        on_event: EventCallback<'_>,
    ) -> anyhow::Result<ActionResult>;

    async fn update(
        &self,
        options: &CfnOptions,
        on_event: EventCallback<'_>,
    ) -> anyhow::Result<ActionResult>;

    /// Deleting an absent stack answers `NoChange`.
    async fn delete(&self, on_event: EventCallback<'_>) -> anyhow::Result<ActionResult>;

    async fn validate(&self, options: &CfnOptions) -> anyhow::Result<bool>;

    /// Structural diff of `options` against the deployed template and parameters.
    async fn diff(&self, options: &CfnOptions) -> anyhow::Result<StructuredDiff>;

    async fn outputs(&self) -> anyhow::Result<Option<Vec<StackOutput>>>;

    /// Events in chronological order, `None` when the stack does not exist.
    async fn events(&self) -> anyhow::Result<Option<Vec<StackEvent>>>;
}

/// Builds clients for arbitrary stacks: the orchestrated stack itself and the
/// stacks its parameters reference.
pub trait StackClientProvider: Send + Sync {
    fn client(&self, remote_name: &str, region: Option<&str>) -> Arc<dyn RemoteStackClient>;
}
