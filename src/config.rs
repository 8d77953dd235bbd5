//! TOML-based service configuration and preset definitions.

use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::frame::parse_duration;

/// Prefix of the environment variables that override the TOML file.
pub const ENV_PREFIX: &str = "FORECAST_BENCH_";

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults matching the `seasonal_naive` preset. Load from
/// TOML with [`ServiceConfig::from_toml_file`] or use
/// [`ServiceConfig::seasonal_naive`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// HTTP listener settings for `serve`.
    #[serde(default)]
    pub server: ServerConfig,
    /// Which reference model to serve.
    #[serde(default)]
    pub model: ModelConfig,
    /// Target server for `predict`.
    #[serde(default)]
    pub client: ClientConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (an IP literal).
    pub host: String,
    pub port: u16,
    /// Largest accepted `/predict` body, in MiB.
    pub max_body_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_mb: 64,
        }
    }
}

impl ServerConfig {
    /// Socket address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| ConfigError {
            field: "server.host".into(),
            message: format!("must be an IP address, got \"{}\"", self.host),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.max_body_mb.saturating_mul(1024 * 1024)
    }
}

/// Reference model parameters.
///
/// Durations use pandas-style offsets (`1D`, `7D`, `12h`, `15min`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Model kind: `"seasonal_naive"` or `"weekly_profile"`.
    pub kind: String,
    /// Season repeated by the seasonal naive model.
    pub season: String,
    /// Minimum history advance between two refits of a recalibrated model.
    pub recalibration_period: String,
    /// Trailing window a weekly profile is fitted on.
    pub calibration_window: String,
    pub author_name: String,
    pub author_email: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: "seasonal_naive".to_string(),
            season: "1D".to_string(),
            recalibration_period: "7D".to_string(),
            calibration_window: "28D".to_string(),
            author_name: "forecast-bench".to_string(),
            author_email: "forecast-bench@localhost".to_string(),
        }
    }
}

impl ModelConfig {
    /// Available model kinds.
    pub const KINDS: &[&str] = &["seasonal_naive", "weekly_profile"];

    pub fn season(&self) -> Result<TimeDelta, ConfigError> {
        duration_field("model.season", &self.season)
    }

    pub fn recalibration_period(&self) -> Result<TimeDelta, ConfigError> {
        duration_field("model.recalibration_period", &self.recalibration_period)
    }

    pub fn calibration_window(&self) -> Result<TimeDelta, ConfigError> {
        duration_field("model.calibration_window", &self.calibration_window)
    }
}

fn duration_field(field: &str, value: &str) -> Result<TimeDelta, ConfigError> {
    parse_duration(value).map_err(|_| ConfigError {
        field: field.into(),
        message: format!("must be a positive duration like \"1D\" or \"12h\", got \"{value}\""),
    })
}

/// Where the `predict` command sends requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Use HTTPS.
    pub secure: bool,
    /// Request timeout; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            secure: false,
            timeout_secs: None,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"model.season"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl ServiceConfig {
    /// Seasonal naive model repeating the previous day.
    pub fn seasonal_naive() -> Self {
        Self::default()
    }

    /// Weekly profile refitted every week on the trailing eight weeks.
    pub fn weekly_profile() -> Self {
        Self {
            model: ModelConfig {
                kind: "weekly_profile".to_string(),
                calibration_window: "56D".to_string(),
                ..ModelConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["seasonal_naive", "weekly_profile"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "seasonal_naive" => Ok(Self::seasonal_naive()),
            "weekly_profile" => Ok(Self::weekly_profile()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Applies `FORECAST_BENCH_*` overrides read through `lookup`.
    ///
    /// Recognized keys: `MODEL`, `SEASON`, `RECALIBRATION_PERIOD`,
    /// `CALIBRATION_WINDOW`, `HOST` and `PORT` (the last two apply to the
    /// server listener). Returns parse errors for malformed values.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut errors = Vec::new();

        if let Some(kind) = var("MODEL") {
            self.model.kind = kind;
        }
        if let Some(season) = var("SEASON") {
            self.model.season = season;
        }
        if let Some(period) = var("RECALIBRATION_PERIOD") {
            self.model.recalibration_period = period;
        }
        if let Some(window) = var("CALIBRATION_WINDOW") {
            self.model.calibration_window = window;
        }
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => errors.push(ConfigError {
                    field: format!("{ENV_PREFIX}PORT"),
                    message: format!("must be a port number, got \"{port}\""),
                }),
            }
        }
        errors
    }

    /// [`ServiceConfig::apply_env_overrides`] against the process environment.
    pub fn apply_process_env(&mut self) -> Vec<ConfigError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let srv = &self.server;
        if let Err(e) = srv.socket_addr() {
            errors.push(e);
        }
        if srv.max_body_mb == 0 {
            errors.push(ConfigError {
                field: "server.max_body_mb".into(),
                message: "must be > 0".into(),
            });
        }

        let m = &self.model;
        if !ModelConfig::KINDS.contains(&m.kind.as_str()) {
            errors.push(ConfigError {
                field: "model.kind".into(),
                message: format!(
                    "must be one of {}, got \"{}\"",
                    ModelConfig::KINDS.join(", "),
                    m.kind
                ),
            });
        }
        errors.extend(m.season().err());
        errors.extend(m.recalibration_period().err());
        errors.extend(m.calibration_window().err());
        if m.author_name.trim().is_empty() {
            errors.push(ConfigError {
                field: "model.author_name".into(),
                message: "must not be empty".into(),
            });
        }

        let c = &self.client;
        if c.host.trim().is_empty() {
            errors.push(ConfigError {
                field: "client.host".into(),
                message: "must not be empty".into(),
            });
        }
        if c.timeout_secs == Some(0) {
            errors.push(ConfigError {
                field: "client.timeout_secs".into(),
                message: "must be > 0 when set".into(),
            });
        }

        errors
    }
}
