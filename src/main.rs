use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{scan, serve, ServeParams};
use pulsecast::config::Config;

#[derive(Parser)]
#[command(
    name = "pulsecast",
    version,
    about = "Relay research insights to live WebSocket viewers",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to PULSECAST_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Scan timer period in milliseconds
        #[arg(long)]
        scan_interval_ms: Option<u64>,

        /// Origin allowed to open live connections
        #[arg(long)]
        allowed_origin: Option<String>,
    },

    /// Fetch insights once and print them
    Scan {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config file is read, so only the
    // environment can influence it
    let logging = Config::from_env()
        .map(|config| config.logging)
        .unwrap_or_default();
    let format = cli.log_format.as_deref().unwrap_or(&logging.format);
    setup_tracing(format, &logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            scan_interval_ms,
            allowed_origin,
        } => {
            tracing::info!(
                config = ?config,
                host = ?host,
                port = ?port,
                "Starting serve command"
            );
            serve(ServeParams {
                config,
                host,
                port,
                scan_interval_ms,
                allowed_origin,
            })
            .await?;
        }

        Commands::Scan { config } => {
            tracing::info!(config = ?config, "Starting scan command");
            scan(config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "pulsecast=debug,tower_http=debug,info".to_string()
    } else {
        format!("pulsecast={level},warn")
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
