use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hearth_gateway::api::{ApiServer, ApiState};
use hearth_gateway::{
    Config, DeviceApiClient, DeviceDirectory, DirectorySource, HomeGraphClient, Notifier,
    StateStore,
};

/// Hearth - smart-home fulfillment gateway
#[derive(Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "HEARTH_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(long, env = "HEARTH_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,hearth_gateway=info",
        1 => "info,hearth_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let device_api = config.device_api_base.as_deref().map(|base| {
        let api = DeviceApiClient::new(base);
        match &config.sprinkler_url {
            Some(url) => api.with_sprinkler_url(url),
            None => api,
        }
    });

    let source = match &device_api {
        Some(api) => DirectorySource::Remote(api.clone()),
        None => DirectorySource::Static(config.devices_file.clone()),
    };
    let directory = DeviceDirectory::new(source);

    // Cold-start load; SYNC retries a failed remote fetch per call
    if let Err(e) = directory.refresh().await {
        tracing::error!(error = %e, "initial directory load failed");
    }

    let store = StateStore::new();
    let homegraph = HomeGraphClient::from_config(&config.homegraph);
    if homegraph.is_none() {
        tracing::warn!("no platform credential configured");
        tracing::warn!("report state and request sync will be unavailable");
    }

    let _notifier = Notifier::new(
        store.clone(),
        homegraph.clone(),
        config.agent_user_id.clone(),
    )
    .spawn();

    let state = Arc::new(ApiState {
        directory,
        store,
        homegraph,
        device_api,
        agent_user_id: config.agent_user_id.clone(),
    });

    tracing::info!(port = config.port, "starting hearth gateway");
    ApiServer::new(state, config.port).run().await?;

    Ok(())
}
