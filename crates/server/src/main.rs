mod api;
mod cli;
mod router;
mod startup;
mod state;
mod uploads;

use clap::Parser;
use docqa_core::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn load_config(cli: &Cli) -> Config {
    docqa_core::config::load_dotenv();
    let mut config = Config::from_env();
    cli.apply_overrides(&mut config);
    config
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();

    let state = startup::build_app_state(config)?;
    let _sweeper = startup::spawn_background(&state, config);
    let app = router::build_router(state, &config.server, config.storage.max_upload_bytes)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli);

    match &cli.command {
        None | Some(Command::Serve) => serve(&config).await?,
        Some(Command::CheckEnv) => cli::check_env(&config),
        Some(Command::Probe { question, context }) => cli::probe(&config, question, context).await?,
    }

    Ok(())
}
