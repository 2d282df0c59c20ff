use crate::{tip::Tip, TipSelCounters};
use async_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};
use tangle_core::warn;

/// Statistics of a single tip selection run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TipSelStats {
    pub duration: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TipSelectionEvent {
    TipAdded(Tip),
    TipRemoved(Tip),
    TipSelPerformed(TipSelStats),
}

/// Fans tip selector events out to subscribers.
///
/// Events are queued on bounded channels and never delivered synchronously, so a
/// subscriber may freely call the tip selector while handling them. A subscriber
/// which does not keep up loses events instead of stalling tip maintenance.
pub(crate) struct EventBroadcaster {
    subscribers: RwLock<Vec<Sender<TipSelectionEvent>>>,
    counters: Arc<TipSelCounters>,
}

impl EventBroadcaster {
    pub(crate) fn new(counters: Arc<TipSelCounters>) -> Self {
        Self { subscribers: RwLock::new(Vec::new()), counters }
    }

    pub(crate) fn subscribe(&self, capacity: usize) -> Receiver<TipSelectionEvent> {
        let (sender, receiver) = bounded(capacity.max(1));
        self.subscribers.write().push(sender);
        receiver
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub(crate) fn emit(&self, event: TipSelectionEvent) {
        let mut has_closed = false;
        {
            let subscribers = self.subscribers.read();
            if subscribers.is_empty() {
                return;
            }
            for subscriber in subscribers.iter() {
                match subscriber.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.counters.dropped_events.fetch_add(1, Ordering::Relaxed);
                        warn!("tip selection event subscriber is lagging, dropping event");
                    }
                    Err(TrySendError::Closed(_)) => has_closed = true,
                }
            }
        }
        if has_closed {
            self.subscribers.write().retain(|subscriber| !subscriber.is_closed());
        }
    }
}
