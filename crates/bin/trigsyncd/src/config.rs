//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `trigsync.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use trigsync_app::wait::Timing;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Polling cadence for the synchronization engines.
    pub sync: SyncConfig,
    /// Demo surface settings.
    pub surface: SurfaceConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Engine polling configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between wait-probe attempts, in milliseconds.
    pub poll_interval_ms: u64,
    /// Upper bound on each wait, in milliseconds.
    pub wait_timeout_ms: u64,
}

/// Demo surface configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Simulated visibility lag for surface mutations, in milliseconds.
    pub latency_ms: u64,
    /// Event vocabulary offered by the creation dialog.
    pub events: Vec<String>,
}

impl Config {
    /// Load configuration from `trigsync.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("trigsync.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TRIGSYNC_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("TRIGSYNC_POLL_INTERVAL_MS") {
            if let Ok(ms) = val.parse() {
                self.sync.poll_interval_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("TRIGSYNC_WAIT_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.sync.wait_timeout_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("TRIGSYNC_SURFACE_LATENCY_MS") {
            if let Ok(ms) = val.parse() {
                self.surface.latency_ms = ms;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.sync.wait_timeout_ms < self.sync.poll_interval_ms {
            return Err(ConfigError::Validation(
                "wait_timeout_ms must be at least poll_interval_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// The engines' polling cadence.
    #[must_use]
    pub fn timing(&self) -> Timing {
        Timing::from_millis(self.sync.poll_interval_ms, self.sync.wait_timeout_ms)
    }

    /// Simulated surface latency.
    #[must_use]
    pub fn surface_latency(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.surface.latency_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "trigsyncd=info,trigsync=info".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            wait_timeout_ms: 3_000,
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            latency_ms: 50,
            events: [
                "PlayerJoined",
                "PlayerLeft",
                "PlayerDied",
                "PlayerChat",
                "BlockBroken",
                "BlockPlaced",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
