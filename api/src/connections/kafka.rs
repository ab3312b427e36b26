use domain::dtos::KafkaConnectionParams;
use rdkafka::{
    consumer::{BaseConsumer, Consumer},
    ClientConfig,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::utils::internal_error;

#[derive(Debug, Clone)]
pub struct KafkaProbe {
    timeout: Duration,
}

fn client_config(params: &KafkaConnectionParams, timeout: Duration) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", params.brokers.join(","))
        .set("socket.timeout.ms", timeout.as_millis().to_string());

    if let Some(protocol) = &params.security_protocol {
        config.set("security.protocol", protocol);
    }
    if let Some(mechanism) = &params.sasl_mechanism {
        config.set("sasl.mechanisms", mechanism);
    }
    if let Some(username) = &params.username {
        config.set("sasl.username", username);
    }
    if let Some(password) = &params.password {
        config.set("sasl.password", password);
    }

    config
}

impl KafkaProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Fetches cluster metadata and returns the non-internal topic names.
    pub async fn topics(&self, params: &KafkaConnectionParams) -> Result<Vec<String>> {
        if params.brokers.iter().all(|broker| broker.trim().is_empty()) {
            return Err(ApiError::bad_request("at least one broker is required"));
        }

        let config = client_config(params, self.timeout);
        let timeout = self.timeout;
        debug!("Fetching Kafka metadata from {:?}", params.brokers);

        // librdkafka blocks while it waits for the brokers.
        let topics = tokio::task::spawn_blocking(move || {
            let consumer: BaseConsumer = config.create()?;
            let metadata = consumer.fetch_metadata(None, timeout)?;

            Ok::<_, rdkafka::error::KafkaError>(
                metadata
                    .topics()
                    .iter()
                    .map(|topic| topic.name().to_string())
                    .filter(|name| !name.starts_with("__"))
                    .collect::<Vec<String>>(),
            )
        })
        .await
        .map_err(internal_error)?
        .map_err(|error| {
            warn!("Kafka metadata fetch failed: {error}");
            ApiError::bad_request(format!("failed to connect to Kafka: {error}"))
        })?;

        Ok(topics)
    }
}
