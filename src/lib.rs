//! In-process, topic-based publish/subscribe.
//!
//! ```no_run
//! use inpubsub::PubSub;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), inpubsub::PubSubError> {
//! let ps = PubSub::new();
//! let mut sub = ps.subscribe("t1").await?;
//!
//! ps.publish("t1", "hi").await?;
//! assert_eq!(sub.read().await, Some("hi"));
//!
//! ps.shutdown().await?;
//! # Ok(())
//! # }
//! ```

/// Engine settings: builder and environment loading.
pub mod config;
/// Error types.
pub mod error;
/// `tracing` subscriber setup for binaries.
pub mod logging;
/// The engine: handle, coordinator, registry, subscribers.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use self::config::{PubSubConfig, PubSubConfigBuilder, Settings};
pub use error::{PubSubError, PubSubResult, TryReadError};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use pubsub::{fnv1_32, PubSub, StatsSnapshot, Subscriber, SubscriberId};
