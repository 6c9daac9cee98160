//! Picobridge — serial JSON tool bridge for Pico-class boards.
//!
//! Usage:
//!   picobridge serve          Serve requests over a serial device
//!   picobridge stdio          Serve requests over stdin/stdout
//!   picobridge tools          List the builtin tool set

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use picobridge::bridge::{run_bridge, ByteTransport, SerialTransport, StdioTransport};
use picobridge::config::{self, BridgeConfig};
use picobridge::dispatch::Dispatcher;
use picobridge::hardware::SimBoard;
use picobridge::registry::ToolRegistry;
use picobridge::tools::register_builtins;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "picobridge")]
#[command(version = "0.1.0")]
#[command(about = "Serial JSON tool bridge for Pico-class boards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to picobridge home directory (default ~/.picobridge).
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve requests over a serial device.
    Serve {
        /// Serial device path (overrides config).
        #[arg(long)]
        device: Option<String>,

        /// Baud rate (overrides config).
        #[arg(long)]
        baud: Option<u32>,
    },

    /// Serve requests over stdin/stdout (host emulation).
    Stdio,

    /// List the builtin tool set and parameter schemas.
    Tools,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve home directory and load config before logging starts; the
    // config carries the fallback log level.
    let home_dir = match &cli.home {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let config_path = home_dir.join("picobridge.toml");
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging: env filter, then CLI flag, then config file.
    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if !config_path.exists() {
        tracing::debug!("no config at {}, using defaults", config_path.display());
    }

    match cli.command {
        Commands::Serve { device, baud } => cmd_serve(cfg, device, baud).await,
        Commands::Stdio => cmd_stdio(cfg).await,
        Commands::Tools => cmd_tools(&cfg),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve(mut cfg: BridgeConfig, device: Option<String>, baud: Option<u32>) -> Result<()> {
    if let Some(device) = device {
        cfg.serial_device = device;
    }
    if let Some(baud) = baud {
        cfg.baud_rate = baud;
    }

    let poll = Duration::from_millis(cfg.poll_interval_ms);
    let device = cfg.resolve_path(&cfg.serial_device);
    let transport = SerialTransport::open(&device, cfg.baud_rate, poll)
        .with_context(|| format!("Failed to open serial device {device}"))?;

    eprintln!(
        "{} Serving '{}' on {} @ {} baud",
        ">>>".green().bold(),
        cfg.board_name,
        device,
        cfg.baud_rate,
    );

    serve(Box::new(transport), cfg).await
}

async fn cmd_stdio(cfg: BridgeConfig) -> Result<()> {
    let poll = Duration::from_millis(cfg.poll_interval_ms);
    let transport = StdioTransport::new(poll);
    serve(Box::new(transport), cfg).await
}

fn cmd_tools(cfg: &BridgeConfig) -> Result<()> {
    let mut registry = ToolRegistry::new(cfg.duplicate_policy);
    register_builtins(&mut registry).context("Failed to register builtin tools")?;

    println!();
    println!("{}", "=== Builtin tools ===".bold());
    println!();
    for name in registry.list() {
        let descriptor = registry
            .lookup(name)
            .context("registry listed a name it cannot resolve")?;
        let params: Vec<String> = descriptor
            .params
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}:{}", p.name, p.ty)
                } else {
                    match &p.default {
                        Some(d) => format!("[{}:{}={}]", p.name, p.ty, d),
                        None => format!("[{}:{}]", p.name, p.ty),
                    }
                }
            })
            .collect();
        println!("  {:<18} {}", name.bold(), params.join(" ").dimmed());
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run the bridge loop on a blocking task with signal-driven shutdown.
async fn serve(mut transport: Box<dyn ByteTransport>, cfg: BridgeConfig) -> Result<()> {
    let board = SimBoard::new(&cfg.board_name);
    let mut dispatcher =
        Dispatcher::new(Box::new(board), cfg).context("Failed to initialize dispatcher")?;

    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let mut handle = tokio::task::spawn_blocking(move || {
        run_bridge(transport.as_mut(), &mut dispatcher, loop_cancel)
    });

    tokio::select! {
        joined = &mut handle => joined.context("bridge task join failed")?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{} Shutting down gracefully...", "<<<".red().bold());
            cancel.cancel();
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(joined) => joined.context("bridge task join failed")?,
                Err(_) => {
                    warn!("bridge loop did not stop within {:?}", SHUTDOWN_TIMEOUT);
                    Ok(())
                }
            }
        }
    }
}
