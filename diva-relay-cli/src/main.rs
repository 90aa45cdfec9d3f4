//! CLI entry point for diva-relay

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use diva_relay_channels::ChannelManager;
use diva_relay_core::bus::MessageBus;
use diva_relay_core::config::{Config, ConfigLoader};
use diva_relay_core::logging::init_logging;
use diva_relay_gateway::{run_server, AppState, EchoAgent};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

#[derive(Parser)]
#[command(name = "diva-relay")]
#[command(about = "Request/reply relay between HTTP callers and an agent message bus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Run the HTTP gateway
    Gateway {
        /// Address to bind, overrides gateway.host
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides gateway.port
        #[arg(short, long)]
        port: Option<u16>,
        /// Answer every message with an echo instead of waiting for an agent
        #[arg(long)]
        echo: bool,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Init { force } => run_init(&config_loader, force),
        Commands::Gateway { host, port, echo } => {
            run_gateway(&config_loader, host, port, echo).await
        }
        Commands::Status => run_status(&config_loader),
    }
}

/// Write the default configuration
fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "{} {}",
            style("Config already exists:").yellow(),
            config_path.display()
        );
        println!("Use {} to overwrite it.", style("--force").cyan());
        return Ok(());
    }

    loader.save(&Config::default())?;

    println!(
        "{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nYou can now run:");
    println!(
        "  {} - Start the gateway",
        style("diva-relay gateway").cyan()
    );
    println!(
        "  {} - Start the gateway with a built-in echo agent",
        style("diva-relay gateway --echo").cyan()
    );

    Ok(())
}

/// Run the HTTP gateway until Ctrl+C
async fn run_gateway(
    loader: &ConfigLoader,
    host: Option<String>,
    port: Option<u16>,
    echo: bool,
) -> Result<()> {
    let mut config = loader.load()?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let _log_guard = init_logging(&config.logging);
    let addr = resolve_addr(&config.gateway.host, config.gateway.port).await?;

    println!("{}", style("Starting Diva Relay Gateway...").bold().cyan());
    println!("Listening on: http://{}", addr);
    println!(
        "Reply timeout: {}s",
        config.channels.http.timeout_secs
    );

    let bus = MessageBus::new();
    let channel_manager = Arc::new(ChannelManager::new(config.clone(), bus.clone()));

    if let Err(e) = channel_manager.initialize().await {
        error!("Failed to initialize channels: {}", e);
    }
    channel_manager.start_all().await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let echo_handle = if echo {
        println!("{}", style("Echo agent enabled.").dim());
        let agent = EchoAgent::new(bus.clone());
        Some(tokio::spawn(agent.run(shutdown_tx.subscribe())))
    } else {
        None
    };

    let state = AppState::new(Arc::clone(&channel_manager));
    let mut server_handle = tokio::spawn(run_server(state, addr, shutdown_tx.subscribe()));

    println!(
        "\n{}",
        style("Gateway is running. Press Ctrl+C to stop.").green()
    );

    let server_exit = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("\n{}", style("Shutting down...").yellow());
            None
        }
        result = &mut server_handle => Some(result),
    };

    let _ = shutdown_tx.send(());
    if let Err(e) = channel_manager.stop_all().await {
        error!("Failed to stop channels: {}", e);
    }
    if let Some(handle) = echo_handle {
        let _ = handle.await;
    }

    // The server only exits on its own when binding or serving failed
    match server_exit {
        Some(result) => result??,
        None => server_handle.await??,
    }

    println!("{}", style("Gateway stopped.").green());
    Ok(())
}

async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {}:{}", host, port))?
        .next()
        .with_context(|| format!("No address found for {}:{}", host, port))
}

/// Print configuration and channel information
fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("Diva Relay Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    let file_status = if loader.config_path().exists() {
        style("present").green()
    } else {
        style("missing, using defaults").yellow()
    };
    println!("  Config file: {}", file_status);
    println!("  Log directory: {}", config.logging.dir);
    println!();

    println!("{}", style("Gateway:").bold());
    println!("  Address: {}:{}", config.gateway.host, config.gateway.port);
    println!();

    println!("{}", style("Channels:").bold());
    let http = &config.channels.http;
    let status = if http.enabled {
        style("enabled").green()
    } else {
        style("disabled").dim()
    };
    println!("  HTTP: {}", status);
    if http.enabled {
        println!("    Timeout: {}s", http.timeout_secs);
        if http.allow_from.is_empty() {
            println!("    Allowed senders: everyone");
        } else {
            println!("    Allowed senders: {}", http.allow_from.join(", "));
        }
    }

    Ok(())
}
