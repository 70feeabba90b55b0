//! Application configuration
//!
//! One TOML file, every section optional:
//!
//! ```toml
//! [mqtt]
//! broker_address = "broker.local"
//! port = 1883
//! data_topic = "ppg/data"
//!
//! [storage]
//! path = "measures.json"
//!
//! [pipeline]
//! chebyshev_band = { low_hz = 0.5, high_hz = 8.0 }
//! gate = { lower = -2.0, upper = 5.0 }
//!
//! [sensor_parameters]
//! default = "0x1F;0x03;0x00"
//! samples4_freq800 = "0x1F;0x03;0x4C"
//! ```
//!
//! `PPGGUARD_MQTT_BROKER`, `PPGGUARD_MQTT_PORT`, `PPGGUARD_MQTT_USERNAME`,
//! `PPGGUARD_MQTT_PASSWORD` and `PPGGUARD_STORAGE_PATH` override the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ppgguard_core::{PipelineConfig, SensorConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default broker port
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default store file
pub const DEFAULT_STORAGE_PATH: &str = "measures.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Broker connection and topic names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_address: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub command_topic: String,
    pub request_measure_topic: String,
    pub request_ir_measure_topic: String,
    pub sensor_setup_topic: String,
    pub data_topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_address: "localhost".into(),
            port: DEFAULT_MQTT_PORT,
            client_id: "ppgguard-ingest".into(),
            keep_alive_secs: 30,
            username: None,
            password: None,
            command_topic: "prototype_esp/command".into(),
            request_measure_topic: "prototype_esp/request_measure".into(),
            request_ir_measure_topic: "prototype_esp/request_ir_measure".into(),
            sensor_setup_topic: "prototype_esp/sensor_setup".into(),
            data_topic: "prototype_esp/data".into(),
        }
    }
}

impl MqttConfig {
    /// Defaults pointed at `broker_address`
    pub fn new(broker_address: impl Into<String>) -> Self {
        Self {
            broker_address: broker_address.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn data_topic(mut self, topic: impl Into<String>) -> Self {
        self.data_topic = topic.into();
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.broker_address must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("mqtt.port must be non-zero".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mqtt.client_id must not be empty".to_string(),
            ));
        }
        let topics = [
            ("command_topic", &self.command_topic),
            ("request_measure_topic", &self.request_measure_topic),
            ("request_ir_measure_topic", &self.request_ir_measure_topic),
            ("sensor_setup_topic", &self.sensor_setup_topic),
            ("data_topic", &self.data_topic),
        ];
        for (name, topic) in topics {
            if topic.is_empty() || topic.contains(|c| c == '+' || c == '#') {
                return Err(ConfigError::Validation(format!(
                    "mqtt.{name} must be a non-empty topic without wildcards"
                )));
            }
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::Validation(
                "mqtt.password requires mqtt.username".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where accepted measurements are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORAGE_PATH),
        }
    }
}

/// Setup payload sent to the device for each sensor configuration
///
/// Keyed by short parameter names (`default`, `samples4_freq800`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorParameters(BTreeMap<String, String>);

impl SensorParameters {
    /// Parameter key of a configuration
    pub fn key(config: SensorConfig) -> &'static str {
        match config {
            SensorConfig::Default => "default",
            SensorConfig::Hz800Avg4 => "samples4_freq800",
            SensorConfig::Hz1000Avg8 => "samples8_freq1000",
            SensorConfig::Hz1600Avg8 => "samples8_freq1600",
            SensorConfig::Hz1600Avg16 => "samples16_freq1600",
        }
    }

    /// Setup payload for a configuration, if configured
    pub fn setup_payload(&self, config: SensorConfig) -> Option<&str> {
        self.0.get(Self::key(config)).map(String::as_str)
    }

    /// Set the setup payload for a configuration
    pub fn insert(&mut self, config: SensorConfig, payload: impl Into<String>) {
        self.0.insert(Self::key(config).to_string(), payload.into());
    }

    /// Configurations with a setup payload
    pub fn configured(&self) -> Vec<SensorConfig> {
        SensorConfig::ALL
            .into_iter()
            .filter(|c| self.setup_payload(*c).is_some())
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for key in self.0.keys() {
            if !SensorConfig::ALL.iter().any(|c| Self::key(*c) == key) {
                return Err(ConfigError::Validation(format!(
                    "sensor_parameters.{key} is not a known sensor configuration"
                )));
            }
        }
        Ok(())
    }
}

/// Whole application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub sensor_parameters: SensorParameters,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn apply_env_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("PPGGUARD_MQTT_BROKER") {
            self.mqtt.broker_address = val;
        }
        if let Some(val) = var("PPGGUARD_MQTT_PORT") {
            self.mqtt.port = val.parse().map_err(|_| {
                ConfigError::Validation("Invalid PPGGUARD_MQTT_PORT".to_string())
            })?;
        }
        if let Some(val) = var("PPGGUARD_MQTT_USERNAME") {
            self.mqtt.username = Some(val);
        }
        if let Some(val) = var("PPGGUARD_MQTT_PASSWORD") {
            self.mqtt.password = Some(val);
        }
        if let Some(val) = var("PPGGUARD_STORAGE_PATH") {
            self.storage.path = PathBuf::from(val);
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mqtt.validate()?;

        if self.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.path must not be empty".to_string(),
            ));
        }

        let filters = &self.pipeline.filters;
        if filters.chebyshev_order == 0 || filters.chebyshev_order % 2 != 0 {
            return Err(ConfigError::Validation(
                "pipeline.chebyshev_order must be even and positive".to_string(),
            ));
        }
        let bands = std::iter::once(("chebyshev_band", filters.chebyshev_band))
            .chain(filters.fourier_band.map(|b| ("fourier_band", b)));
        for (name, band) in bands {
            if !ascending(0.0, band.low_hz) || !strictly_ascending(band.low_hz, band.high_hz) {
                return Err(ConfigError::Validation(format!(
                    "pipeline.{name} must satisfy 0 <= low_hz < high_hz"
                )));
            }
        }
        if filters.moving_average_window == Some(0) {
            return Err(ConfigError::Validation(
                "pipeline.moving_average_window must be positive".to_string(),
            ));
        }

        let gate = &self.pipeline.gate;
        if !strictly_ascending(gate.lower, gate.upper) {
            return Err(ConfigError::Validation(
                "pipeline.gate.lower must be below pipeline.gate.upper".to_string(),
            ));
        }
        if gate.channels.is_empty() {
            return Err(ConfigError::Validation(
                "pipeline.gate.channels must name at least one channel".to_string(),
            ));
        }

        self.sensor_parameters.validate()
    }
}

fn ascending(lo: f64, hi: f64) -> bool {
    lo.partial_cmp(&hi).is_some_and(|o| o.is_le())
}

fn strictly_ascending(lo: f64, hi: f64) -> bool {
    lo.partial_cmp(&hi).is_some_and(|o| o.is_lt())
}
