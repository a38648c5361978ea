//! Event bus for stale-path notification.
//!
//! A broadcast channel fans each published [`ChangeEvent`] out to every
//! subscription; subscriptions filter on their topic set (generated paths)
//! at the receiving side. Publishing never blocks: a slow subscriber lags
//! and loses the oldest events rather than stalling the publisher. Lossy
//! delivery is acceptable here; the authoritative state is always
//! re-derivable by re-resolving a path.
//!
//! Subscriptions only observe events published after they were created.

use tokio::sync::broadcast;

use crate::types::ChangeEvent;

/// Default per-bus channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Topic-keyed fan-out bus for change events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Never blocks; an event with no subscribers is
    /// silently dropped. Returns the number of subscriptions it reached.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events for a set of generated paths. All topics share
    /// one delivery channel.
    pub fn subscribe<I, S>(&self, topics: I) -> Subscription
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Subscription {
            topics: topics.into_iter().map(Into::into).collect(),
            rx: Some(self.tx.subscribe()),
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A subscription to one or more generated paths.
pub struct Subscription {
    topics: Vec<String>,
    rx: Option<broadcast::Receiver<ChangeEvent>>,
}

impl Subscription {
    /// The topics this subscription delivers.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Receive the next event for one of this subscription's topics,
    /// waiting if necessary.
    ///
    /// Returns `None` once the subscription is closed or the bus is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if self.topics.iter().any(|t| t == &event.path) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "change subscription lagged behind");
                }
            }
        }
    }

    /// Receive without blocking. Returns `None` when no matching event is
    /// queued or the subscription is closed.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    if self.topics.iter().any(|t| t == &event.path) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "change subscription lagged behind");
                }
            }
        }
    }

    /// Close the subscription. Idempotent; pending and future events are
    /// discarded.
    pub fn close(&mut self) {
        self.rx = None;
    }

    /// True once [`Subscription::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topics", &self.topics)
            .field("closed", &self.rx.is_none())
            .finish()
    }
}
