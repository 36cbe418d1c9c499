//! Stack orchestration engine.
//!
//! The [`orchestrator::StackOrchestrator`] resolves parameters, generates the
//! template, decides which remote action to take and classifies its outcome.
//! Everything remote goes through [`client::RemoteStackClient`]; everything
//! user-facing goes through [`report::Reporter`].

pub mod client;
pub mod diff;
pub mod orchestrator;
pub mod params;
pub mod report;
pub mod template;

pub use client::{EventCallback, RemoteStackClient, StackClientProvider};
pub use diff::DiffPresenter;
pub use orchestrator::StackOrchestrator;
pub use params::ParameterResolver;
pub use report::{MemoryReporter, Notice, Presentation, Reporter, StdoutReporter};
pub use template::{CommandRenderer, TemplateGenerator, TemplateRenderer};
