use std::time::Duration;

use crate::{pubsub::DEFAULT_SLOT_BASELINE, PubSubError, PubSubResult};

pub const DEFAULT_TOPIC_CAPACITY: usize = 100_000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_INBOX_CAPACITY: usize = 1;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubSubConfig {
    /// Maximum number of live topics.
    pub topic_capacity: usize,
    /// Capacity of every subscriber queue.
    pub queue_capacity: usize,
    /// Initial slot capacity and floor of the shrink policy.
    pub slot_baseline: usize,
    /// Buffered requests the coordinator inbox accepts before callers wait.
    pub inbox_capacity: usize,
    /// Upper bound on applying queued requests during shutdown.
    pub drain_timeout: Duration,
}

#[derive(Debug, Default)]
pub struct PubSubConfigBuilder {
    topic_capacity: Option<usize>,
    queue_capacity: Option<usize>,
    slot_baseline: Option<usize>,
    inbox_capacity: Option<usize>,
    drain_timeout: Option<Duration>,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl PubSubConfig {
    pub fn builder() -> PubSubConfigBuilder {
        PubSubConfigBuilder::default()
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> PubSubResult<()> {
        let zero = [
            ("topic_capacity", self.topic_capacity),
            ("queue_capacity", self.queue_capacity),
            ("slot_baseline", self.slot_baseline),
            ("inbox_capacity", self.inbox_capacity),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        match zero {
            Some((name, _)) => Err(PubSubError::InvalidConfig(format!(
                "{name} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}

impl PubSubConfigBuilder {
    pub fn topic_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.topic_capacity = Some(capacity);
        self
    }

    pub fn queue_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn slot_baseline(
        mut self,
        baseline: usize,
    ) -> Self {
        self.slot_baseline = Some(baseline);
        self
    }

    pub fn inbox_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.inbox_capacity = Some(capacity);
        self
    }

    pub fn drain_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> PubSubConfig {
        let default = PubSubConfig::default();
        PubSubConfig {
            topic_capacity: self.topic_capacity.unwrap_or(default.topic_capacity),
            queue_capacity: self.queue_capacity.unwrap_or(default.queue_capacity),
            slot_baseline: self.slot_baseline.unwrap_or(default.slot_baseline),
            inbox_capacity: self.inbox_capacity.unwrap_or(default.inbox_capacity),
            drain_timeout: self.drain_timeout.unwrap_or(default.drain_timeout),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            topic_capacity: DEFAULT_TOPIC_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            slot_baseline: DEFAULT_SLOT_BASELINE,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
