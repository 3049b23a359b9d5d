use std::sync::atomic::{AtomicU64, Ordering};

/// Engine counters, shared between the public handle and the coordinator.
#[derive(Debug, Default)]
pub(crate) struct Stats {
    /// Publish requests accepted by the inbox.
    pub(crate) published: AtomicU64,
    /// Messages written into subscriber queues.
    pub(crate) delivered: AtomicU64,
    /// Publishes that found no subscriber for their topic.
    pub(crate) unrouted: AtomicU64,
    /// Subscribers forgotten because their handle was dropped.
    pub(crate) reaped: AtomicU64,
    /// Slot reallocations done by the shrink policy.
    pub(crate) shrinks: AtomicU64,
}

impl Stats {
    #[inline]
    pub(crate) fn bump(
        counter: &AtomicU64,
        by: u64,
    ) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
            shrinks: self.shrinks.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub published: u64,
    pub delivered: u64,
    pub unrouted: u64,
    pub reaped: u64,
    pub shrinks: u64,
}
