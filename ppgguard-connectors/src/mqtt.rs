//! MQTT connector
//!
//! Device link over a broker. Outbound: measurement requests and sensor setup
//! payloads. Inbound: measurement payloads on the data topic.
//!
//! The connection is driven by polling: nothing is sent or received until
//! [`MqttConnector::next_payload`] runs the event loop.

use std::time::Duration;

use rumqttc::{AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Packet};
use thiserror::Error;

use crate::config::MqttConfig;
use crate::{AsyncConnector, ConnectionStats};

pub use rumqttc::QoS;

/// Payload asking the device for a red + IR measurement
pub const MEASURE_REQUEST: &str = "new_measure";

/// Payload asking the device for an IR-only measurement
pub const IR_MEASURE_REQUEST: &str = "new_ir_measure";

/// Capacity of the outbound request queue
const REQUEST_QUEUE_CAPACITY: usize = 16;

/// MQTT failures
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("MQTT client error: {0}")]
    Client(#[from] ClientError),

    #[error("MQTT connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Payload on '{topic}' is not UTF-8")]
    InvalidPayload { topic: String },
}

/// Broker client bound to the configured topics
pub struct MqttConnector {
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
    connected: bool,
    stats: ConnectionStats,
}

impl MqttConnector {
    /// Client for `config`; connects lazily on first poll
    pub fn new(config: MqttConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(options(&config), REQUEST_QUEUE_CAPACITY);
        Self {
            client,
            eventloop,
            config,
            connected: false,
            stats: ConnectionStats::default(),
        }
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Subscribe to the data topic
    pub async fn subscribe_data(&mut self) -> Result<(), MqttError> {
        self.client
            .subscribe(self.config.data_topic.clone(), QoS::AtLeastOnce)
            .await?;
        log::info!("Subscribed to '{}'", self.config.data_topic);
        Ok(())
    }

    /// Ask the device for a red + IR measurement
    pub async fn request_measure(&mut self) -> Result<(), MqttError> {
        let topic = self.config.request_measure_topic.clone();
        self.send(&topic, MEASURE_REQUEST.as_bytes()).await
    }

    /// Ask the device for an IR-only measurement
    pub async fn request_ir_measure(&mut self) -> Result<(), MqttError> {
        let topic = self.config.request_ir_measure_topic.clone();
        self.send(&topic, IR_MEASURE_REQUEST.as_bytes()).await
    }

    /// Send a sensor setup payload
    pub async fn configure_sensor(&mut self, setup: &str) -> Result<(), MqttError> {
        let topic = self.config.sensor_setup_topic.clone();
        self.send(&topic, setup.as_bytes()).await
    }

    /// Publish a free-form command on the command topic
    ///
    /// Firmware without the dedicated request topics listens here for
    /// [`MEASURE_REQUEST`].
    pub async fn send_command(&mut self, command: &str) -> Result<(), MqttError> {
        let topic = self.config.command_topic.clone();
        self.send(&topic, command.as_bytes()).await
    }

    /// Drive the connection until a payload arrives on the data topic
    pub async fn next_payload(&mut self) -> Result<String, MqttError> {
        loop {
            let event = match self.eventloop.poll().await {
                Ok(event) => event,
                Err(e) => {
                    if self.connected {
                        self.stats.reconnections += 1;
                    }
                    self.connected = false;
                    self.stats.last_error = Some(e.to_string());
                    return Err(e.into());
                }
            };

            match event {
                Event::Incoming(Packet::ConnAck(_)) => {
                    log::debug!(
                        "Connected to {}:{}",
                        self.config.broker_address,
                        self.config.port
                    );
                    self.connected = true;
                }
                Event::Incoming(Packet::Publish(publish))
                    if publish.topic == self.config.data_topic =>
                {
                    self.stats.messages_received += 1;
                    return String::from_utf8(publish.payload.to_vec())
                        .map_err(|_| MqttError::InvalidPayload {
                            topic: publish.topic,
                        });
                }
                Event::Incoming(Packet::Disconnect) => self.connected = false,
                _ => {}
            }
        }
    }

    async fn publish(&mut self, topic: &str, data: &[u8]) -> Result<(), MqttError> {
        match self
            .client
            .publish(topic, QoS::AtLeastOnce, false, data.to_vec())
            .await
        {
            Ok(()) => {
                self.stats.messages_sent += 1;
                self.stats.bytes_sent += data.len() as u64;
                log::debug!("Queued {} byte(s) for '{}'", data.len(), topic);
                Ok(())
            }
            Err(e) => {
                self.stats.messages_failed += 1;
                self.stats.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

fn options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        config.client_id.clone(),
        config.broker_address.clone(),
        config.port,
    );
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(true);
    if let Some(username) = &config.username {
        options.set_credentials(
            username.clone(),
            config.password.clone().unwrap_or_default(),
        );
    }
    options
}

#[async_trait::async_trait]
impl AsyncConnector for MqttConnector {
    type Error = MqttError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.publish(topic, data).await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }
}
