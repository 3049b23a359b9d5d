use std::{collections::HashMap, sync::Arc};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{hash::FnvBuildHasher, SubscriberId};
use crate::{PubSubError, PubSubResult};

/// Smallest capacity a slot is created with and shrunk back to.
pub const DEFAULT_SLOT_BASELINE: usize = 100;

/// Returns the capacity a slot should be reallocated to, if any.
///
/// A slot is shrunk only when its capacity is above `baseline` and fewer
/// than half of its capacity is occupied. The new capacity is the first
/// value of `baseline`, `baseline*2`, `baseline*2*3`, `baseline*2*3*4`, ...
/// that fits `len`.
pub fn downscale_capacity(
    len: usize,
    capacity: usize,
    baseline: usize,
) -> Option<usize> {
    if capacity <= baseline || len.saturating_mul(2) >= capacity {
        return None;
    }

    let mut target = baseline;
    let mut factor = 2;
    while target < len {
        target = target.saturating_mul(factor);
        factor += 1;
    }

    (target < capacity).then_some(target)
}

/// One subscriber's place in a topic's list.
pub(crate) struct SlotEntry<T> {
    pub(crate) id: SubscriberId,
    pub(crate) tx: mpsc::Sender<T>,
}

/// Subscriber list of a single topic, in attach order.
pub(crate) struct Slot<T> {
    entries: Vec<SlotEntry<T>>,
}

impl<T> Slot<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn entries(&self) -> &[SlotEntry<T>] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

/// Per-subscriber bookkeeping: its queue sender and, for every topic it is
/// attached to, its index inside that topic's slot.
struct Membership<T> {
    tx: mpsc::Sender<T>,
    positions: HashMap<Arc<str>, usize, FnvBuildHasher>,
}

/// Topic → subscribers table.
///
/// Owned by the coordinator task; nothing else touches it, so it carries no
/// locks of its own.
pub(crate) struct Registry<T> {
    slots: HashMap<Arc<str>, Slot<T>, FnvBuildHasher>,
    members: HashMap<SubscriberId, Membership<T>>,
    topic_capacity: usize,
    baseline: usize,
    /// Member count that triggers the next sweep of abandoned handles.
    sweep_at: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Own methods
////////////////////////////////////////////////////////////////////////////////

impl<T> Registry<T> {
    pub(crate) fn new(
        topic_capacity: usize,
        baseline: usize,
    ) -> Self {
        Self {
            slots: HashMap::default(),
            members: HashMap::new(),
            topic_capacity,
            baseline,
            sweep_at: baseline.max(1),
        }
    }

    /// Records a freshly created subscriber queue.
    ///
    /// Handles dropped before they were ever attached to a topic are never
    /// seen by delivery, so they are swept here once the member table has
    /// doubled since the previous sweep.
    pub(crate) fn register(
        &mut self,
        id: SubscriberId,
        tx: mpsc::Sender<T>,
    ) {
        if self.members.len() >= self.sweep_at {
            self.sweep_abandoned();
            self.sweep_at = (self.members.len() * 2).max(self.baseline.max(1));
        }

        self.members.insert(
            id,
            Membership {
                tx,
                positions: HashMap::default(),
            },
        );
    }

    /// Attaches `id` to `topic`.
    ///
    /// Returns `Ok(false)` without touching anything when the topic is empty
    /// or the subscriber already holds the topic.
    pub(crate) fn attach(
        &mut self,
        topic: &str,
        id: SubscriberId,
    ) -> PubSubResult<bool> {
        if topic.is_empty() {
            return Ok(false);
        }

        let member = self
            .members
            .get_mut(&id)
            .ok_or(PubSubError::UnknownSubscriber(id))?;
        if member.positions.contains_key(topic) {
            return Ok(false);
        }

        let key = match self.slots.get_key_value(topic) {
            Some((key, _)) => key.clone(),
            None => {
                if self.slots.len() >= self.topic_capacity {
                    warn!(
                        topic,
                        capacity = self.topic_capacity,
                        "topic capacity exceeded"
                    );
                    return Err(PubSubError::TopicCapacityExceeded {
                        capacity: self.topic_capacity,
                    });
                }
                let key: Arc<str> = Arc::from(topic);
                self.slots
                    .insert(key.clone(), Slot::with_capacity(self.baseline));
                key
            }
        };

        let Some(slot) = self.slots.get_mut(&key) else {
            return Ok(false);
        };
        let position = slot.entries.len();
        slot.entries.push(SlotEntry {
            id,
            tx: member.tx.clone(),
        });
        member.positions.insert(key, position);

        debug!(topic, subscriber = %id, position, "subscriber attached");
        Ok(true)
    }

    /// Splices `id` out of `topic`'s slot.
    ///
    /// Entries behind the removed one shift down by one; their recorded
    /// positions are rewritten so every member's map stays exact. A slot
    /// left empty is dropped from the table.
    pub(crate) fn detach(
        &mut self,
        topic: &str,
        id: SubscriberId,
    ) -> bool {
        if topic.is_empty() {
            return false;
        }
        let Some(position) = self
            .members
            .get_mut(&id)
            .and_then(|member| member.positions.remove(topic))
        else {
            return false;
        };
        let Some(slot) = self.slots.get_mut(topic) else {
            return false;
        };

        slot.entries.remove(position);
        for (index, entry) in slot.entries.iter().enumerate().skip(position) {
            if let Some(pos) = self
                .members
                .get_mut(&entry.id)
                .and_then(|member| member.positions.get_mut(topic))
            {
                *pos = index;
            }
        }

        if slot.entries.is_empty() {
            self.slots.remove(topic);
        }

        debug!(topic, subscriber = %id, position, "subscriber detached");
        true
    }

    /// Forgets a subscriber entirely, detaching it from every topic.
    ///
    /// Returns the topics it was removed from.
    pub(crate) fn reap(
        &mut self,
        id: SubscriberId,
    ) -> Vec<Arc<str>> {
        let topics: Vec<Arc<str>> = match self.members.get(&id) {
            Some(member) => member.positions.keys().cloned().collect(),
            None => return Vec::new(),
        };
        for topic in &topics {
            self.detach(topic, id);
        }
        self.members.remove(&id);
        topics
    }

    /// Applies the shrink policy to `topic`'s slot.
    ///
    /// Returns the new capacity when the slot was reallocated.
    pub(crate) fn downscale(
        &mut self,
        topic: &str,
    ) -> Option<usize> {
        let slot = self.slots.get_mut(topic)?;
        let target = downscale_capacity(slot.len(), slot.capacity(), self.baseline)?;

        let before = slot.capacity();
        let mut entries = Vec::with_capacity(target);
        entries.append(&mut slot.entries);
        slot.entries = entries;

        debug!(topic, before, after = slot.capacity(), "slot downscaled");
        Some(slot.capacity())
    }

    pub(crate) fn slot(
        &self,
        topic: &str,
    ) -> Option<&Slot<T>> {
        if topic.is_empty() {
            return None;
        }
        self.slots.get(topic)
    }

    pub(crate) fn subscriber_count(
        &self,
        topic: &str,
    ) -> usize {
        self.slot(topic).map_or(0, Slot::len)
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.slots.keys().map(|topic| topic.to_string()).collect()
    }

    #[cfg(test)]
    pub(crate) fn topic_count(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn member_count(&self) -> usize {
        self.members.len()
    }

    #[cfg(test)]
    pub(crate) fn is_member(
        &self,
        id: SubscriberId,
    ) -> bool {
        self.members.contains_key(&id)
    }

    /// Drops every slot and member, closing all subscriber queues.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.members.clear();
    }

    fn sweep_abandoned(&mut self) {
        let abandoned: Vec<SubscriberId> = self
            .members
            .iter()
            .filter(|(_, member)| member.tx.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for id in abandoned {
            self.reap(id);
        }
    }
}
