use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

use commands::stack::{OverrideArgs, StackArgs, TemplateArgs};
use context::Context;

#[derive(Parser, Debug)]
#[command(name = "cairn", version, about = "Deploy declarative infrastructure stacks")]
struct Cli {
    /// Stack configuration file
    #[arg(short, long, global = true, default_value = "cairn.yaml")]
    file: PathBuf,

    /// Region for every stack, overriding configured defaults
    #[arg(long, global = true)]
    region: Option<String>,

    /// Disable coloured output
    #[arg(
        long,
        global = true,
        env = "CAIRN_NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    no_color: bool,

    /// aws CLI profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Seconds between status polls while an action runs
    #[arg(long, global = true, default_value_t = 5)]
    poll_interval: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured stacks
    List,

    /// Create the stack, or update it when it already exists
    Apply(TemplateArgs),

    /// Delete the stack
    Delete(StackArgs),

    /// Delete the stack, then create it again
    Recreate(TemplateArgs),

    /// Show differences between the proposed and the deployed stack
    Diff(OverrideArgs),

    /// Validate the proposed template
    Validate(OverrideArgs),

    /// Print the proposed template
    Show(TemplateArgs),

    /// Print the deployed template
    ShowCurrent(StackArgs),

    /// Print the stack status
    Status(StackArgs),

    /// List stack outputs
    Outputs(StackArgs),

    /// List stack events
    Events(StackArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reports go to stdout; diagnostics stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let aws = cairn_adapter_aws::AwsCliOptions {
        profile: cli.profile.clone(),
        poll_interval: Duration::from_secs(cli.poll_interval),
        ..Default::default()
    };
    let ctx = Context::load(&cli.file, cli.region.clone(), !cli.no_color, aws)?;

    match cli.cmd {
        Command::List => commands::list::run(&ctx),
        Command::Apply(args) => commands::stack::apply(&ctx, &args).await?,
        Command::Delete(args) => commands::stack::delete(&ctx, &args).await?,
        Command::Recreate(args) => commands::stack::recreate(&ctx, &args).await?,
        Command::Diff(args) => commands::stack::diff(&ctx, &args).await?,
        Command::Validate(args) => commands::stack::validate(&ctx, &args).await?,
        Command::Show(args) => commands::stack::show(&ctx, &args).await?,
        Command::ShowCurrent(args) => commands::stack::show_current(&ctx, &args).await?,
        Command::Status(args) => commands::stack::status(&ctx, &args).await?,
        Command::Outputs(args) => commands::stack::outputs(&ctx, &args).await?,
        Command::Events(args) => commands::stack::events(&ctx, &args).await?,
    }

    Ok(())
}
