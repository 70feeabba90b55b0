//! Transport connectors for PPGGuard
//!
//! ## Overview
//!
//! The core pipeline never does I/O. This crate owns the edges:
//!
//! - [`mqtt`]: the device link. Subscribes to the data topic, publishes
//!   measurement requests and sensor setup payloads.
//! - [`file`]: capture logs, one payload per line, for replaying recorded
//!   sessions without a device.
//! - [`ingest`]: feeds payloads from either source through the pipeline into a
//!   store, logging and dropping failures.
//! - [`config`]: the TOML application configuration.
//!
//! ## Topics
//!
//! | Topic                      | Direction     | Payload                     |
//! |----------------------------|---------------|-----------------------------|
//! | `command_topic`            | host → device | free-form command           |
//! | `request_measure_topic`    | host → device | measurement request         |
//! | `request_ir_measure_topic` | host → device | IR-only measurement request |
//! | `sensor_setup_topic`       | host → device | sensor parameter string     |
//! | `data_topic`               | device → host | measurement payload         |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "mqtt")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use ppgguard_connectors::{config::MqttConfig, ingest::IngestService, mqtt::MqttConnector};
//! use ppgguard_core::{Pipeline, PipelineConfig};
//! use ppgguard_store::InMemoryStore;
//!
//! let mut mqtt = MqttConnector::new(MqttConfig::new("broker.local"));
//! mqtt.subscribe_data().await?;
//! mqtt.request_measure().await?;
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let mut service = IngestService::new(pipeline, InMemoryStore::new());
//! let payload = mqtt.next_payload().await?;
//! service.handle(&payload);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod file;
pub mod ingest;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use config::{AppConfig, ConfigError, MqttConfig};
pub use file::CaptureLog;
pub use ingest::{IngestService, IngestStats};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConnector, MqttError, QoS};

use std::path::PathBuf;
use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Timed out after {0} s waiting for the device")]
    Timeout(u64),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] ppgguard_store::StoreError),

    #[cfg(feature = "mqtt")]
    #[error(transparent)]
    Mqtt(#[from] MqttError),
}

/// Result type for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Async message transport
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    type Error;

    /// Publish a payload
    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Messages handed to the transport
    pub messages_sent: u64,
    /// Messages the transport refused
    pub messages_failed: u64,
    /// Payloads received on the data topic
    pub messages_received: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Number of reconnections
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}
