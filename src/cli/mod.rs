//! Command-line interface for par-remote.
//!
//! Subcommands cover the pieces that run without a UI: a standalone TCP
//! relay and gateway address management.

use crate::host::{ConfigGatewayStore, GatewayAddress, GatewayConfigStore, TcpRelay};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use par_remote_config::{Config, LogLevel};
use std::path::PathBuf;

/// par-remote - multi-protocol remote desktop session layer
#[derive(Parser, Debug)]
#[command(name = "par-remote")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.config/par-remote/config.yaml
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set debug log level (overrides config and RUST_LOG)
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Off => LogLevel::Off,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a loopback TCP relay to a remote host until Ctrl+C
    Relay {
        /// Target as HOST:PORT
        #[arg(long, value_name = "HOST:PORT")]
        target: String,

        /// Local address to listen on
        #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:0")]
        bind: String,
    },

    /// Show or change the gateway address
    Gateway {
        #[command(subcommand)]
        action: GatewayAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum GatewayAction {
    /// Print the configured gateway address
    Show,
    /// Set the gateway address
    Set {
        /// New address as HOST:PORT
        address: String,
    },
}

impl Cli {
    /// Load the config this invocation refers to, with its path
    pub fn load_config(&self) -> Result<(Config, PathBuf)> {
        match &self.config {
            Some(path) => {
                let config = Config::load_from(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?;
                Ok((config, path.clone()))
            }
            None => Ok((Config::load()?, Config::config_path())),
        }
    }
}

/// Execute a parsed command. Returns the process exit code.
pub async fn run(cli: Cli, config: Config, config_path: PathBuf) -> Result<i32> {
    match cli.command {
        Commands::Relay { target, bind } => run_relay(&target, &bind).await,
        Commands::Gateway { action } => {
            let store = ConfigGatewayStore::new(config, config_path);
            match action {
                GatewayAction::Show => {
                    let address = store.gateway_address().await?;
                    println!("{address}");
                }
                GatewayAction::Set { address } => {
                    let address: GatewayAddress = address.parse()?;
                    store.set_gateway_address(address.clone()).await?;
                    println!("Gateway set to {address}");
                }
            }
            Ok(0)
        }
    }
}

async fn run_relay(target: &str, bind: &str) -> Result<i32> {
    // Validates the target before binding anything
    let parsed: GatewayAddress = target
        .parse()
        .with_context(|| format!("invalid relay target '{target}'"))?;
    let relay = TcpRelay::bind_on(bind, parsed.to_string())
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local = relay.local_addr()?;
    println!("Relaying {local} -> {parsed} (Ctrl+C to stop)");
    log::info!("Standalone relay {} -> {}", local, parsed);

    let stats = relay.stats();
    tokio::select! {
        _ = relay.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl+C")?;
        }
    }

    use std::sync::atomic::Ordering;
    println!(
        "Relay stopped: {} connections, {} bytes up, {} bytes down",
        stats.connections_accepted.load(Ordering::Relaxed),
        stats.bytes_up.load(Ordering::Relaxed),
        stats.bytes_down.load(Ordering::Relaxed),
    );
    Ok(0)
}
