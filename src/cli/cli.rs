//! Main CLI application structure

use clap::Parser;
use feedcheck::{Bootstrap, FeedError, HostContext, TracingSink};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::commands::{check, sources, Commands};
use crate::cli::error::{CliError, CliResult};

/// feedcheck CLI - find packages that still need to be pushed to package feeds
#[derive(Debug, Parser)]
#[command(name = "feedcheck")]
#[command(version = feedcheck::VERSION)]
#[command(about = "feedcheck - find packages that still need to be pushed to package feeds")]
#[command(long_about = "feedcheck queries package feeds for a set of projects at a target version \
                         and reports which packages are already published and which must be pushed.\n\n\
                         Settings are read from feedcheck.toml in the working directory and its parents, \
                         then from the user config directory.\n\n\
                         Examples:\n\
                           feedcheck check -t 1.4.0 -p Contoso.Core -p Contoso.Web -f internal\n\
                           feedcheck check -t 1.4.0 -p Contoso.Core -f nuget=https://api.nuget.org/v3/index.json --json\n\
                           feedcheck sources")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory settings are discovered from (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> CliResult<()> {
        feedcheck::init_logging(self.verbose);

        let sink = Arc::new(TracingSink);
        let host = match self.working_dir {
            Some(dir) => HostContext::new(sink, dir),
            None => HostContext::from_current_dir(sink)?,
        };

        let bootstrap = Bootstrap::new();
        bootstrap.ensure_initialized(&host)?;
        let context = bootstrap
            .context()
            .ok_or_else(|| CliError::Config("Registry context was not initialized".to_string()))?;

        let cancel = context.cancellation().clone();
        let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

        let command = self.command;
        let result = run_until_canceled(&cancel, async move {
            match command {
                Commands::Check(args) => check::execute_check(context, args).await,
                Commands::Sources(args) => sources::execute_sources(&context, args).await,
            }
        })
        .await;

        watcher.abort();
        result
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Received Ctrl+C, canceling");
    cancel.cancel();
}

/// Run `command` unless `cancel` fires first; in-flight requests are dropped
async fn run_until_canceled<F>(cancel: &CancellationToken, command: F) -> CliResult<()>
where
    F: Future<Output = CliResult<()>>,
{
    tokio::select! {
        result = command => result,
        _ = cancel.cancelled() => Err(CliError::Feed(FeedError::Canceled)),
    }
}
