//! `citizend` - CLI for citizen-registry
//!
//! Runs the HTTP server and offers a few maintenance commands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use citizen_registry::cli::{Cli, Command, ConfigCommand, ServeCommand};
use citizen_registry::{api, init_logging, CitizenStore, Config, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd).await,
        Command::Stats(stats_cmd) => handle_stats(&config, stats_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: &ServeCommand) -> Result<()> {
    cmd.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let database_path = config.database_path();
    let store = SqliteStore::open(&database_path)
        .with_context(|| format!("failed to open database {}", database_path.display()))?;
    info!(
        "Using {} store with {} records",
        store.name(),
        store.count().context("failed to count records")?
    );

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let app = api::router(Arc::new(store), &config.server);
    api::serve(listener, app, shutdown_signal())
        .await
        .context("server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
    }
}

fn handle_stats(config: &Config, json: bool) -> Result<()> {
    let database_path = config.database_path();
    let store = SqliteStore::open(&database_path)
        .with_context(|| format!("failed to open database {}", database_path.display()))?;
    let count = store.count()?;

    if json {
        let stats = serde_json::json!({
            "database_path": database_path,
            "records": count,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("citizend stats");
        println!("--------------");
        println!("Database:      {}", database_path.display());
        println!("Records:       {count}");
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!("  Port:               {}", config.server.port);
                println!("  Legacy routes:      {}", config.server.legacy_routes);
                println!("  Max body (bytes):   {}", config.server.max_body_bytes);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => anyhow::bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
