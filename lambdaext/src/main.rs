//! lambdaext - Minimal AWS Lambda external extension
//!
//! Registers with the Extensions API, then logs every INVOKE it receives
//! until the platform sends SHUTDOWN.

mod config;
mod extension;

use std::path::PathBuf;

use clap::Parser;
use lambdaext_client::{ApiConfig, ExtensionsApiClient};
use lambdaext_runtime::EventLoop;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::extension::LoggingExtension;

#[derive(Parser, Debug)]
#[command(name = "lambdaext")]
#[command(about = "Minimal AWS Lambda external extension", long_about = None)]
struct Args {
    /// Name to register under (defaults to the executable's file name)
    name: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long, env = "LAMBDAEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LAMBDAEXT_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(name) = args.name {
        config.extension_name = Some(name);
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lambdaext={0},lambdaext_client={0},lambdaext_runtime={0}",
                    config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let name = config.extension_name();
    info!(
        extension = %name,
        runtime_api = %config.runtime_api,
        events = ?config.events,
        "Starting lambdaext"
    );

    let client = ExtensionsApiClient::new(&ApiConfig::new(config.runtime_api.as_str()))?;
    let summary = EventLoop::new(client, name.as_str())
        .with_events(config.events.clone())
        .run(LoggingExtension::new(name.as_str()))
        .await?;

    info!(
        extension_id = %summary.extension_id,
        invocations = summary.stats.invocations,
        failed_invocations = summary.stats.failed_invocations,
        rejected_events = summary.stats.rejected_events,
        poll_errors = summary.stats.poll_errors,
        "Extension stopped"
    );

    Ok(())
}
