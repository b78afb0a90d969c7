use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use funnelpulse::config::AppConfig;
use funnelpulse::report::{self, RunSummary};

#[derive(Parser)]
#[command(
    name = "funnelpulse",
    about = "Real-time e-commerce funnel analytics with rolling anomaly detection",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $FUNNELPULSE_CONFIG, then ./funnelpulse.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (synthetic stream + ingest loop + API server)
    Serve {
        /// Bind address (overrides api.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the synthetic stream for a fixed time and print a summary
    Simulate {
        /// Run length in seconds
        #[arg(long, default_value = "30")]
        seconds: u64,

        /// Events per second (overrides simulation.events_per_second)
        #[arg(long)]
        rate: Option<f64>,

        /// RNG seed for reproducible traffic
        #[arg(long)]
        seed: Option<u64>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Replay a JSON-lines event file on event time
    Replay {
        /// Path to the event file
        #[arg(long)]
        file: PathBuf,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", report::format_summary(summary));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.api.bind = bind;
            }
            init_tracing(&config);
            tracing::info!(bind = %config.api.bind, "Starting funnelpulse daemon");
            funnelpulse::serve(&config).await?;
        }
        Commands::Simulate {
            seconds,
            rate,
            seed,
            json,
        } => {
            if let Some(rate) = rate {
                config.simulation.events_per_second = rate;
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            config.validate()?;
            init_tracing(&config);
            let summary = funnelpulse::simulate(&config, Duration::from_secs(seconds), !json).await?;
            print_summary(&summary, json)?;
        }
        Commands::Replay { file, json } => {
            init_tracing(&config);
            let summary = funnelpulse::replay(&config, &file)?;
            print_summary(&summary, json)?;
        }
    }

    Ok(())
}
