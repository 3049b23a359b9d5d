use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::pubsub::SubscriberId;

pub type PubSubResult<T> = Result<T, PubSubError>;

/// Errors surfaced by the [`PubSub`](crate::PubSub) handle.
///
/// Most degenerate inputs (empty topic, unknown topic, repeated subscribe)
/// are silent no-ops and never reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PubSubError {
    #[error("pubsub engine is closed")]
    Closed,

    #[error("topic capacity exceeded (limit {capacity})")]
    TopicCapacityExceeded { capacity: usize },

    #[error("subscriber {0} is not registered with this engine")]
    UnknownSubscriber(SubscriberId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Ошибка неблокирующего чтения из очереди подписчика.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryReadError {
    #[error("no messages available")]
    Empty,

    #[error("subscriber queue is closed")]
    Closed,
}

// === Conversions ===

impl<T> From<mpsc::error::SendError<T>> for PubSubError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        PubSubError::Closed
    }
}

impl From<oneshot::error::RecvError> for PubSubError {
    fn from(_: oneshot::error::RecvError) -> Self {
        PubSubError::Closed
    }
}

impl From<mpsc::error::TryRecvError> for TryReadError {
    fn from(err: mpsc::error::TryRecvError) -> Self {
        match err {
            mpsc::error::TryRecvError::Empty => TryReadError::Empty,
            mpsc::error::TryRecvError::Disconnected => TryReadError::Closed,
        }
    }
}
