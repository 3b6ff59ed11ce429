//! ircdenoise - IRC relay that hides presence churn from idle users.

use anyhow::Context as _;
use clap::{CommandFactory, Parser};
use clap::error::ErrorKind;
use tracing::{info, warn};

use ircdenoise::config::{Cli, Config};
use ircdenoise::network::Gateway;
use ircdenoise::telemetry::{self, DumpFlag};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbosity());

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
    };

    info!(
        server = %config.server,
        listen = %config.listen,
        arm_window_secs = config.denoise.arm_window.as_secs(),
        respawn = config.respawn,
        "Starting ircdenoise"
    );

    let dump = DumpFlag::new();
    telemetry::spawn_dump_listener(dump.clone()).context("failed to install SIGUSR1 handler")?;

    let gateway = Gateway::bind(config, dump).await?;
    gateway.run(shutdown_signal()).await?;

    info!("Exiting");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            },
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await.ok();
                info!("received ctrl-c, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received ctrl-c, shutting down");
    }
}
