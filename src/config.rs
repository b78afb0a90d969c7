//! TOML configuration for funnelpulse.
//!
//! Layered model: an explicit `--config` path wins, then the path in the
//! `FUNNELPULSE_CONFIG` environment variable, then `./funnelpulse.toml`, then
//! compiled-in defaults. Every section is optional.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::aggregator::TimeBasis;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "FUNNELPULSE_CONFIG";

/// Config file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "funnelpulse.toml";

/// Accepted range for `simulation.events_per_second`.
pub const MIN_EVENTS_PER_SECOND: f64 = 0.001;
pub const MAX_EVENTS_PER_SECOND: f64 = 100_000.0;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the funnelpulse process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try the environment override, then the local file, then defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "FUNNELPULSE_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.window.window_seconds > 0, "window.window_seconds must be > 0");
        ensure!(self.history.capacity > 0, "history.capacity must be > 0");
        ensure!(
            self.detector.anomaly_threshold > 0.0,
            "detector.anomaly_threshold must be > 0"
        );
        ensure!(
            self.detector.high_severity_z >= self.detector.anomaly_threshold,
            "detector.high_severity_z must be >= detector.anomaly_threshold"
        );
        ensure!(
            self.detector.baseline_window >= 2,
            "detector.baseline_window must be >= 2"
        );
        let rate = self.simulation.events_per_second;
        ensure!(
            rate.is_finite() && (MIN_EVENTS_PER_SECOND..=MAX_EVENTS_PER_SECOND).contains(&rate),
            "simulation.events_per_second must be between {MIN_EVENTS_PER_SECOND} and {MAX_EVENTS_PER_SECOND}, got {rate}"
        );
        ensure!(
            self.simulation.channel_capacity > 0,
            "simulation.channel_capacity must be > 0"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Trailing window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window length `W` in seconds.
    pub window_seconds: u64,
    /// What "now" means when ageing events out.
    pub time_basis: TimeBasis,
}

impl WindowConfig {
    pub fn span(&self) -> TimeDelta {
        TimeDelta::seconds(self.window_seconds as i64)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            time_basis: TimeBasis::WallClock,
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Snapshot history ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum snapshots retained (1440 = 24h at one per minute).
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 1440 }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Rolling z-score detector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Alert when z-score is strictly above this.
    pub anomaly_threshold: f64,
    /// Above this z-score an alert is `high` rather than `medium`.
    pub high_severity_z: f64,
    /// History entries required before any alert can fire.
    pub minimum_history: usize,
    /// Most recent history entries used for the baseline.
    pub baseline_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 2.0,
            high_severity_z: 3.0,
            minimum_history: 30,
            baseline_window: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Pending alert queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Undrained alerts kept before the oldest are dropped.
    pub max_pending: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { max_pending: 1000 }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Synthetic event stream and ingest loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Synthetic production rate.
    pub events_per_second: f64,
    /// Fixed RNG seed; random when unset.
    pub seed: Option<u64>,
    /// Concurrently open browsing sessions the generator draws from.
    pub session_pool: usize,
    /// Bound of the producer -> consumer channel.
    pub channel_capacity: usize,
    /// Wall-clock eviction tick.
    pub tick_millis: u64,
    /// Seconds between status lines in `simulate`.
    pub status_every_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            events_per_second: 5.0,
            seed: None,
            session_pool: 200,
            channel_capacity: 1024,
            tick_millis: 1000,
            status_every_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// HTTP API listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
