use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::error;

use super::{
    coordinator::{Command, Coordinator},
    stats::{Stats, StatsSnapshot},
    Subscriber,
};
use crate::{PubSubConfig, PubSubError, PubSubResult};

/// In-process publish/subscribe engine.
///
/// Supports:
/// - Exact-topic subscriptions with a bounded queue per subscriber
/// - Attaching one subscriber to several topics
/// - Backpressure: delivery waits for room in a full queue
/// - Shrinking of per-topic storage after unsubscribes
/// - Explicit shutdown that drains queued requests
///
/// The handle is cheap to clone; all clones talk to the same coordinator
/// task, which applies every request in the order it entered the inbox.
/// The empty topic is reserved and every operation treats it as a no-op.
pub struct PubSub<T> {
    inbox: mpsc::Sender<Command<T>>,
    stop: Arc<watch::Sender<bool>>,
    stats: Arc<Stats>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<T> PubSub<T>
where
    T: Clone + Send + 'static,
{
    /// Starts an engine with default settings.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new() -> Self {
        Self::spawn(&PubSubConfig::default())
    }

    /// Starts an engine with `config`.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start(config: PubSubConfig) -> PubSubResult<Self> {
        config.validate()?;
        Ok(Self::spawn(&config))
    }

    fn spawn(config: &PubSubConfig) -> Self {
        let (inbox, rx) = mpsc::channel(config.inbox_capacity);
        let (stop, stop_rx) = watch::channel(false);
        let stats = Arc::new(Stats::default());
        let worker = Coordinator::new(config, rx, stop_rx, Arc::clone(&stats)).spawn();

        Self {
            inbox,
            stop: Arc::new(stop),
            stats,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Creates a subscriber attached to `topic`.
    ///
    /// An empty topic yields a subscriber attached to nothing, which can
    /// still be attached later through [`add_subscribe`](Self::add_subscribe).
    pub async fn subscribe(
        &self,
        topic: &str,
    ) -> PubSubResult<Subscriber<T>> {
        self.request(|reply| Command::Subscribe {
            topic: topic.to_owned(),
            reply,
        })
        .await?
    }

    /// Attaches an existing subscriber to one more topic.
    ///
    /// Returns `Ok(false)` when nothing changed (empty topic, already
    /// attached).
    pub async fn add_subscribe(
        &self,
        subscriber: &Subscriber<T>,
        topic: &str,
    ) -> PubSubResult<bool> {
        if topic.is_empty() {
            return Ok(false);
        }
        self.request(|reply| Command::AddSubscribe {
            id: subscriber.id(),
            topic: topic.to_owned(),
            reply,
        })
        .await?
    }

    /// Detaches a subscriber from `topic`.
    ///
    /// Messages already queued stay readable. Returns `Ok(false)` when the
    /// subscriber was not on the topic.
    pub async fn unsubscribe(
        &self,
        topic: &str,
        subscriber: &Subscriber<T>,
    ) -> PubSubResult<bool> {
        if topic.is_empty() {
            return Ok(false);
        }
        self.request(|reply| Command::Unsubscribe {
            id: subscriber.id(),
            topic: topic.to_owned(),
            reply,
        })
        .await
    }

    /// Hands `message` over for delivery to every subscriber of `topic`.
    ///
    /// Returns once the coordinator accepted the request; delivery happens
    /// afterwards. Publishing to a topic nobody subscribed to is a no-op.
    pub async fn publish(
        &self,
        topic: &str,
        message: T,
    ) -> PubSubResult<()> {
        if topic.is_empty() {
            return Ok(());
        }
        self.inbox
            .send(Command::Publish {
                topic: topic.to_owned(),
                message,
            })
            .await?;
        Stats::bump(&self.stats.published, 1);
        Ok(())
    }

    /// Number of subscribers currently attached to `topic`.
    pub async fn subscriber_count(
        &self,
        topic: &str,
    ) -> PubSubResult<usize> {
        self.request(|reply| Command::SubscriberCount {
            topic: topic.to_owned(),
            reply,
        })
        .await
    }

    /// Topics that currently have at least one subscriber.
    pub async fn topics(&self) -> PubSubResult<Vec<String>> {
        self.request(|reply| Command::Topics { reply }).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// `true` once the engine stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    /// Stops the engine.
    ///
    /// Requests already queued are applied, then every subscriber queue is
    /// closed so readers see the end of their stream after the buffered
    /// messages. Draining, including a delivery stalled on a full queue,
    /// is bounded by the configured drain timeout. Later calls on any clone
    /// return [`PubSubError::Closed`].
    pub async fn shutdown(&self) -> PubSubResult<()> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PubSubError::Closed)?;

        self.stop.send_replace(true);
        if let Err(e) = worker.await {
            error!("pubsub coordinator task failed: {e}");
        }
        Ok(())
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> Command<T>,
    ) -> PubSubResult<R> {
        let (reply, rx) = oneshot::channel();
        self.inbox.send(build(reply)).await?;
        Ok(rx.await?)
    }
}

impl<T> Clone for PubSub<T> {
    fn clone(&self) -> Self {
        Self {
            inbox: self.inbox.clone(),
            stop: Arc::clone(&self.stop),
            stats: Arc::clone(&self.stats),
            worker: Arc::clone(&self.worker),
        }
    }
}

impl<T> Default for PubSub<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PubSub<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("closed", &self.inbox.is_closed())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
