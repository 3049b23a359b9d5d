//! Engine configuration: programmatic builder and environment loading.

pub mod engine;
pub mod settings;

pub use engine::{PubSubConfig, PubSubConfigBuilder};
pub use settings::Settings;
