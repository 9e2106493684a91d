use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub type ClientId = u64;

/// Connected clients and the time of the last command any of them sent.
///
/// Delivery is best effort: a client whose channel is closed is dropped from
/// the registry instead of failing the broadcast.
pub struct ClientHub {
    clients: Mutex<HashMap<ClientId, UnboundedSender<String>>>,
    next_id: AtomicU64,
    last_activity: Mutex<Instant>,
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientHub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, UnboundedSender<String>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, sink: UnboundedSender<String>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients().insert(id, sink);
        id
    }

    pub fn unregister(&self, id: ClientId) {
        self.clients().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn broadcast(&self, message: &str) {
        self.deliver(None, message);
    }

    pub fn broadcast_except(&self, origin: ClientId, message: &str) {
        self.deliver(Some(origin), message);
    }

    fn deliver(&self, skip: Option<ClientId>, message: &str) {
        self.clients().retain(|id, sink| {
            if Some(*id) == skip {
                return true;
            }
            let alive = sink.send(message.to_string()).is_ok();
            if !alive {
                debug!("Dropping disconnected client {id}");
            }
            alive
        });
    }

    pub fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
