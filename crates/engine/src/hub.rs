use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use common::HubEvent;

/// Per-client buffer. A client that falls this far behind misses events.
pub const CLIENT_BUFFER: usize = 10;

type Clients = HashMap<u64, mpsc::Sender<HubEvent>>;

/// Publish/subscribe fan-out of live events, keyed by subject (a bot id or a
/// symbol).
///
/// Subjects are created lazily on first subscribe or publish and kept for the
/// life of the process. Publishing never waits: each client has a bounded
/// channel and an event that does not fit is dropped for that client only.
/// Clone-able via internal Arc.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subjects: RwLock<HashMap<String, Clients>>,
    next_id: AtomicU64,
}

/// One live client. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    subject: String,
    rx: mpsc::Receiver<HubEvent>,
    hub: EventHub,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next event for this client, `None` once the hub side is gone.
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.subject, self.id);
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client on `subject`.
    pub fn subscribe(&self, subject: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subjects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(subject.to_string())
            .or_default()
            .insert(id, tx);
        debug!(subject, client = id, "hub client subscribed");
        Subscription {
            id,
            subject: subject.to_string(),
            rx,
            hub: self.clone(),
        }
    }

    pub fn unsubscribe(&self, subject: &str, id: u64) {
        let mut subjects = self.inner.subjects.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(clients) = subjects.get_mut(subject) {
            if clients.remove(&id).is_some() {
                debug!(subject, client = id, "hub client unsubscribed");
            }
        }
    }

    /// Deliver `event` to every client of `subject` without blocking.
    /// Returns the number of clients that accepted it; 0 with no subscribers.
    pub fn publish(&self, subject: &str, event: &HubEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let subjects = self.inner.subjects.read().unwrap_or_else(PoisonError::into_inner);
            let Some(clients) = subjects.get(subject) else {
                drop(subjects);
                self.ensure_subject(subject);
                return 0;
            };
            for (id, tx) in clients {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(subject, client = id, "hub client buffer full, event dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }
        if !closed.is_empty() {
            let mut subjects = self.inner.subjects.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(clients) = subjects.get_mut(subject) {
                for id in closed {
                    clients.remove(&id);
                }
            }
        }
        delivered
    }

    /// Current number of clients on `subject`.
    pub fn client_count(&self, subject: &str) -> usize {
        self.inner
            .subjects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject)
            .map_or(0, HashMap::len)
    }

    pub fn has_subject(&self, subject: &str) -> bool {
        self.inner
            .subjects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(subject)
    }

    fn ensure_subject(&self, subject: &str) {
        self.inner
            .subjects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(subject.to_string())
            .or_default();
    }
}
