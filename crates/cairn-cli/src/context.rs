use anyhow::Context as _;
use cairn_adapter_aws::{AwsCliOptions, AwsCliProvider};
use cairn_core::CairnConfig;
use cairn_runtime::{
    CommandRenderer, Presentation, StackClientProvider, StackOrchestrator, StdoutReporter,
    TemplateGenerator,
};
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs: loaded configuration plus the collaborators
/// built from it.
pub struct Context {
    config: CairnConfig,
    region: Option<String>,
    presentation: Presentation,
    provider: Arc<dyn StackClientProvider>,
}

impl Context {
    pub fn load(
        file: &Path,
        region: Option<String>,
        colorize: bool,
        aws: AwsCliOptions,
    ) -> anyhow::Result<Self> {
        let config = CairnConfig::from_file(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;
        Ok(Self::new(config, region, colorize, Arc::new(AwsCliProvider::new(aws))))
    }

    pub fn new(
        config: CairnConfig,
        region: Option<String>,
        colorize: bool,
        provider: Arc<dyn StackClientProvider>,
    ) -> Self {
        Self {
            config,
            region,
            presentation: Presentation { colorize },
            provider,
        }
    }

    pub fn config(&self) -> &CairnConfig {
        &self.config
    }

    /// Orchestrator for a configured stack. A `--region` given on the command
    /// line wins over the stack's configured default region.
    pub fn orchestrator(&self, stack: &str) -> anyhow::Result<StackOrchestrator> {
        let mut definition = self.config.stack(stack)?;
        if self.region.is_some() {
            definition = definition.with_region(self.region.clone());
        }
        tracing::debug!(stack = %stack, source = %definition.source.location, "Loaded stack definition");

        let generator = TemplateGenerator::new(Arc::new(CommandRenderer::new(
            self.config.generator_command(),
        )));
        Ok(StackOrchestrator::new(
            definition,
            self.provider.clone(),
            generator,
            Arc::new(StdoutReporter::new(self.presentation)),
            self.presentation,
        ))
    }
}
