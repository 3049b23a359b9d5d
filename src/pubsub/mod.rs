//! Publish–subscribe engine.
//!
//! - `broker`: the public [`PubSub`] handle.
//! - `coordinator` (private): the task that owns the registry and applies
//!   every request in inbox order.
//! - `hash`: FNV-1/32 topic hashing.
//! - `registry` (private): topic → subscriber lists, shrink policy.
//! - `stats`: engine counters.
//! - `subscriber`: the consumer-side queue handle.

pub mod broker;
mod coordinator;
pub mod hash;
mod registry;
pub mod stats;
pub mod subscriber;

pub use broker::PubSub;
pub use hash::{fnv1_32, FnvBuildHasher, FnvHasher};
pub use registry::{downscale_capacity, DEFAULT_SLOT_BASELINE};
pub use stats::StatsSnapshot;
pub use subscriber::{Subscriber, SubscriberId};
