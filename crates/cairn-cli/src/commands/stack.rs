//! Per-stack commands. Each one builds an orchestrator for the named stack and
//! runs a single operation; the orchestrator reports progress itself.

use clap::Args;
use cairn_core::ResolvedParameters;

use crate::context::Context;

#[derive(Args, Debug)]
pub struct StackArgs {
    /// Local stack name, `<template>-<stack>`
    pub stack: String,
}

/// A stack plus parameter overrides; enough to resolve and generate.
#[derive(Args, Debug)]
pub struct OverrideArgs {
    /// Local stack name, `<template>-<stack>`
    pub stack: String,

    /// Parameter overrides as KEY=VALUE
    #[arg(value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

impl OverrideArgs {
    fn overrides(&self) -> ResolvedParameters {
        self.params.iter().cloned().collect()
    }
}

/// Commands that send or print the generated template also take `--pretty`.
#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub target: OverrideArgs,

    /// Pretty-print the generated template
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

/// Parse one `KEY=VALUE` override. The value may itself contain `=`.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        Some(_) => Err(format!("parameter '{}' has an empty name", raw)),
        None => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

pub async fn apply(ctx: &Context, args: &TemplateArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.target.stack)?
        .apply(&args.target.overrides(), args.pretty)
        .await?;
    Ok(())
}

pub async fn delete(ctx: &Context, args: &StackArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.stack)?.delete().await?;
    Ok(())
}

pub async fn recreate(ctx: &Context, args: &TemplateArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.target.stack)?
        .recreate(&args.target.overrides(), args.pretty)
        .await?;
    Ok(())
}

pub async fn diff(ctx: &Context, args: &OverrideArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.stack)?.diff(&args.overrides()).await?;
    Ok(())
}

pub async fn validate(ctx: &Context, args: &OverrideArgs) -> anyhow::Result<()> {
    let valid = ctx
        .orchestrator(&args.stack)?
        .validate(&args.overrides())
        .await?;
    if !valid {
        anyhow::bail!("template for stack '{}' failed validation", args.stack);
    }
    Ok(())
}

pub async fn show(ctx: &Context, args: &TemplateArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.target.stack)?
        .show(&args.target.overrides(), args.pretty)
        .await?;
    Ok(())
}

pub async fn show_current(ctx: &Context, args: &StackArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.stack)?.show_current().await?;
    Ok(())
}

pub async fn status(ctx: &Context, args: &StackArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.stack)?.status().await?;
    Ok(())
}

pub async fn outputs(ctx: &Context, args: &StackArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.stack)?.outputs().await?;
    Ok(())
}

pub async fn events(ctx: &Context, args: &StackArgs) -> anyhow::Result<()> {
    ctx.orchestrator(&args.stack)?.events().await?;
    Ok(())
}
