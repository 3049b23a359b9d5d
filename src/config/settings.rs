use std::time::Duration;

use ::config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use super::engine::{
    PubSubConfig, DEFAULT_DRAIN_TIMEOUT, DEFAULT_INBOX_CAPACITY, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_TOPIC_CAPACITY,
};
use crate::pubsub::DEFAULT_SLOT_BASELINE;

/// Environment-backed settings, e.g. `INPUBSUB_QUEUE_CAPACITY=512`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub topic_capacity: usize,
    pub queue_capacity: usize,
    pub slot_baseline: usize,
    pub inbox_capacity: usize,
    pub drain_timeout_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix("INPUBSUB")
    }

    pub fn load_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .set_default("topic_capacity", DEFAULT_TOPIC_CAPACITY as u64)?
            .set_default("queue_capacity", DEFAULT_QUEUE_CAPACITY as u64)?
            .set_default("slot_baseline", DEFAULT_SLOT_BASELINE as u64)?
            .set_default("inbox_capacity", DEFAULT_INBOX_CAPACITY as u64)?
            .set_default(
                "drain_timeout_ms",
                u64::try_from(DEFAULT_DRAIN_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            )?
            .add_source(Environment::with_prefix(prefix).try_parsing(true))
            .build()?;

        cfg.try_deserialize()
    }

    /// Converts to an engine config, checking it on the way.
    pub fn into_config(self) -> Result<PubSubConfig, ConfigError> {
        let config = PubSubConfig {
            topic_capacity: self.topic_capacity,
            queue_capacity: self.queue_capacity,
            slot_baseline: self.slot_baseline,
            inbox_capacity: self.inbox_capacity,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        };
        config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}
