use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use keeper_client::{bootstrap, config, Cli, ServerClient};
use keeper_common::{init_logging, Context};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "keeper-client exited with error");
            eprintln!("keeper-client: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(&cli, |key| std::env::var(key).ok())
        .context("failed to load configuration")?;

    init_logging(config.log_level, config.log_format).context("failed to initialize logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), server = %config.server_address, "keeper-client starting");

    let root = Context::background();
    tokio::spawn(cancel_on_shutdown(root.clone()));

    let client = ServerClient::new(config.server_address.clone())
        .context("failed to create http client")?;

    let info = bootstrap::run(&root, &client, &config.retry)
        .await
        .with_context(|| format!("server {} is not reachable", config.server_address))?;

    info!(example = %info.example, platforms = info.os.len(), "connected to keeper server");
    Ok(())
}

async fn cancel_on_shutdown(ctx: Context) {
    shutdown_signal().await;
    info!("shutdown requested");
    ctx.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            error!(error = %err, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
