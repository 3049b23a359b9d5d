use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{timeout_at, Instant},
};
use tracing::{debug, info, trace, warn};

use super::{registry::Registry, stats::Stats, Subscriber, SubscriberId};
use crate::{PubSubConfig, PubSubResult};

/// A request for the coordinator.
///
/// Every effect on the registry travels through this type, so the order in
/// which requests enter the inbox is the order in which they apply.
pub(crate) enum Command<T> {
    Subscribe {
        topic: String,
        reply: oneshot::Sender<PubSubResult<Subscriber<T>>>,
    },
    AddSubscribe {
        id: SubscriberId,
        topic: String,
        reply: oneshot::Sender<PubSubResult<bool>>,
    },
    Unsubscribe {
        id: SubscriberId,
        topic: String,
        reply: oneshot::Sender<bool>,
    },
    Publish {
        topic: String,
        message: T,
    },
    SubscriberCount {
        topic: String,
        reply: oneshot::Sender<usize>,
    },
    Topics {
        reply: oneshot::Sender<Vec<String>>,
    },
}

/// Stand-in deadline for drain timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Result of waiting for room in a subscriber queue.
enum Reserve<'a, T> {
    Ready(mpsc::Permit<'a, T>),
    Closed,
    TimedOut,
}

/// Shutdown state as seen by the coordinator.
struct Lifecycle {
    stop: watch::Receiver<bool>,
    drain_timeout: Duration,
    /// Set once a stop was observed; nothing is applied past it.
    deadline: Option<Instant>,
}

impl Lifecycle {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn begin_drain(&mut self) -> Instant {
        let drain_timeout = self.drain_timeout;
        *self.deadline.get_or_insert_with(|| {
            let now = Instant::now();
            now.checked_add(drain_timeout).unwrap_or(now + FAR_FUTURE)
        })
    }

    /// Resolves on `shutdown()` or once every engine handle is gone.
    async fn stop_requested(&mut self) {
        let _ = self.stop.wait_for(|stop| *stop).await;
    }

    /// Waits for room in `tx`.
    ///
    /// Before a stop this waits as long as the subscriber needs; after it,
    /// no longer than the drain deadline.
    async fn reserve<'a, T>(
        &mut self,
        tx: &'a mpsc::Sender<T>,
    ) -> Reserve<'a, T> {
        if self.deadline.is_none() {
            tokio::select! {
                biased;
                permit = tx.reserve() => {
                    return permit.map_or(Reserve::Closed, Reserve::Ready);
                }
                _ = self.stop_requested() => {}
            }
        }

        let deadline = self.begin_drain();
        match timeout_at(deadline, tx.reserve()).await {
            Ok(Ok(permit)) => Reserve::Ready(permit),
            Ok(Err(_)) => Reserve::Closed,
            Err(_) => Reserve::TimedOut,
        }
    }
}

/// Single owner of the registry.
///
/// Applies one request at a time. Shrink checks scheduled by a removal are
/// applied before the next request is taken from the inbox.
pub(crate) struct Coordinator<T> {
    registry: Registry<T>,
    inbox: mpsc::Receiver<Command<T>>,
    pending_shrinks: VecDeque<Arc<str>>,
    stats: Arc<Stats>,
    life: Lifecycle,
    queue_capacity: usize,
}

impl<T> Coordinator<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new(
        config: &PubSubConfig,
        inbox: mpsc::Receiver<Command<T>>,
        stop: watch::Receiver<bool>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            registry: Registry::new(config.topic_capacity, config.slot_baseline),
            inbox,
            pending_shrinks: VecDeque::new(),
            stats,
            life: Lifecycle {
                stop,
                drain_timeout: config.drain_timeout,
                deadline: None,
            },
            queue_capacity: config.queue_capacity,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!(
            queue_capacity = self.queue_capacity,
            drain_timeout = ?self.life.drain_timeout,
            "pubsub coordinator started"
        );

        loop {
            self.apply_pending_shrinks();

            if self.life.expired() {
                warn!(
                    drain_timeout = ?self.life.drain_timeout,
                    "drain deadline passed; remaining requests dropped"
                );
                break;
            }

            let command = match self.life.deadline {
                Some(deadline) => {
                    self.inbox.close();
                    match timeout_at(deadline, self.inbox.recv()).await {
                        Ok(Some(command)) => command,
                        Ok(None) => {
                            debug!("inbox drained");
                            break;
                        }
                        // reported by `expired` on the next turn
                        Err(_) => continue,
                    }
                }
                None => {
                    tokio::select! {
                        biased;
                        _ = self.life.stop_requested() => {
                            self.life.begin_drain();
                            debug!("stop requested; draining inbox");
                            continue;
                        }
                        command = self.inbox.recv() => match command {
                            Some(command) => command,
                            None => break,
                        },
                    }
                }
            };

            self.handle(command).await;
        }

        self.registry.clear();
        info!("pubsub coordinator stopped");
    }

    async fn handle(
        &mut self,
        command: Command<T>,
    ) {
        match command {
            Command::Subscribe { topic, reply } => {
                let _ = reply.send(self.subscribe(&topic));
            }
            Command::AddSubscribe { id, topic, reply } => {
                let _ = reply.send(self.registry.attach(&topic, id));
            }
            Command::Unsubscribe { id, topic, reply } => {
                let removed = self.registry.detach(&topic, id);
                if removed {
                    self.pending_shrinks.push_back(Arc::from(topic));
                }
                let _ = reply.send(removed);
            }
            Command::Publish { topic, message } => self.deliver(&topic, message).await,
            Command::SubscriberCount { topic, reply } => {
                let _ = reply.send(self.registry.subscriber_count(&topic));
            }
            Command::Topics { reply } => {
                let _ = reply.send(self.registry.topics());
            }
        }
    }

    fn subscribe(
        &mut self,
        topic: &str,
    ) -> PubSubResult<Subscriber<T>> {
        let id = SubscriberId::next();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.registry.register(id, tx);

        match self.registry.attach(topic, id) {
            Ok(_) => Ok(Subscriber::new(id, rx)),
            Err(err) => {
                self.registry.reap(id);
                Err(err)
            }
        }
    }

    /// Writes `message` into every queue on `topic`, in slot order.
    ///
    /// A full queue makes this wait; nothing else is applied meanwhile.
    async fn deliver(
        &mut self,
        topic: &str,
        message: T,
    ) {
        let Some(slot) = self.registry.slot(topic) else {
            Stats::bump(&self.stats.unrouted, 1);
            trace!(topic, "publish to topic without subscribers");
            return;
        };

        let mut delivered = 0u64;
        let mut abandoned = Vec::new();
        for entry in slot.entries() {
            match self.life.reserve(&entry.tx).await {
                Reserve::Ready(permit) => {
                    permit.send(message.clone());
                    delivered += 1;
                }
                Reserve::Closed => abandoned.push(entry.id),
                Reserve::TimedOut => {
                    warn!(topic, delivered, "delivery cut short by drain deadline");
                    break;
                }
            }
        }
        Stats::bump(&self.stats.delivered, delivered);

        for id in abandoned {
            let topics = self.registry.reap(id);
            debug!(subscriber = %id, topics = topics.len(), "abandoned subscriber reaped");
            self.pending_shrinks.extend(topics);
            Stats::bump(&self.stats.reaped, 1);
        }
    }

    fn apply_pending_shrinks(&mut self) {
        while let Some(topic) = self.pending_shrinks.pop_front() {
            if self.registry.downscale(&topic).is_some() {
                Stats::bump(&self.stats.shrinks, 1);
            }
        }
    }
}
