use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use tokio::sync::mpsc;

use crate::TryReadError;

/// Process-wide counter, so handles from two engines never share an id.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a subscriber queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Consumer side of a subscription: a bounded message queue.
///
/// One handle can be attached to several topics (see
/// [`PubSub::add_subscribe`](crate::PubSub::add_subscribe)); every message
/// published to any of them lands in the same queue, in delivery order.
///
/// The queue ends (`read` returns `None`) once the engine has stopped and
/// every buffered message has been read. Dropping the handle abandons the
/// subscription; the engine forgets it on its next delivery attempt.
pub struct Subscriber<T> {
    id: SubscriberId,
    rx: mpsc::Receiver<T>,
}

impl<T> Subscriber<T> {
    pub(crate) fn new(
        id: SubscriberId,
        rx: mpsc::Receiver<T>,
    ) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next message.
    ///
    /// # Returns
    /// - `Some(message)` in publish order
    /// - `None` when the engine is gone and the queue is drained
    pub async fn read(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Blocking variant of [`read`](Self::read) for plain threads.
    ///
    /// Panics when called from inside an async context, like
    /// `tokio::sync::mpsc::Receiver::blocking_recv`.
    pub fn blocking_read(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }

    /// Takes a message if one is already queued.
    pub fn try_read(&mut self) -> Result<T, TryReadError> {
        self.rx.try_recv().map_err(Into::into)
    }

    /// Number of messages waiting in the queue.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// `true` once the engine dropped its side of the queue.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("queued", &self.rx.len())
            .finish()
    }
}
