use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use captioner_core::devices::{parse_device_list, DeviceId};
use captioner_core::error::CoreError;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    /// The `DEVICES` list is malformed.
    #[error("DEVICES is invalid: {0}")]
    Devices(#[source] CoreError),
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development on a single
/// CPU worker.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `8001`).
    pub port: u16,
    /// One worker is started per device, in this order.
    pub devices: Vec<DeviceId>,
    /// Idle delay of the control loop between ticks.
    pub tick_interval: Duration,
    /// Restart crashed workers with exponential backoff.
    pub worker_restart: bool,
    /// Upper bound on each progress stage of the dummy engine.
    pub engine_step_delay: Duration,
    /// Optional JSON-lines log file, written alongside stdout.
    pub log_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `HOST`                 | `127.0.0.1` |
    /// | `PORT`                 | `8001`      |
    /// | `DEVICES`              | `cpu`       |
    /// | `TICK_INTERVAL_MS`     | `10`        |
    /// | `WORKER_RESTART`       | `true`      |
    /// | `ENGINE_STEP_DELAY_MS` | `1000`      |
    /// | `LOG_FILE`             | unset       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".into());
        let port: u16 = parse_var(&lookup, "PORT", "8001", "a valid port number")?;

        let devices = lookup("DEVICES").unwrap_or_else(|| "cpu".into());
        let devices = parse_device_list(&devices).map_err(ConfigError::Devices)?;

        let tick_interval_ms: u64 =
            parse_var(&lookup, "TICK_INTERVAL_MS", "10", "a number of milliseconds")?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "TICK_INTERVAL_MS",
                expected: "greater than zero",
                value: tick_interval_ms.to_string(),
            });
        }

        let worker_restart: bool =
            parse_var(&lookup, "WORKER_RESTART", "true", "`true` or `false`")?;
        let engine_step_delay_ms: u64 =
            parse_var(&lookup, "ENGINE_STEP_DELAY_MS", "1000", "a number of milliseconds")?;

        let log_file = lookup("LOG_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            devices,
            tick_interval: Duration::from_millis(tick_interval_ms),
            worker_restart,
            engine_step_delay: Duration::from_millis(engine_step_delay_ms),
            log_file,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = lookup(var).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value,
    })
}
