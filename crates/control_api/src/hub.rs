use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

struct Subscriber<E> {
    tx: mpsc::UnboundedSender<E>,
    rooms: HashSet<String>,
}

/// Registry of connected subscribers and the named rooms they joined.
///
/// Room emission walks a snapshot of the membership taken under the lock, so a
/// join or leave racing with an emit either sees the event or not, never half.
pub struct RoomHub<E> {
    subscribers: Mutex<HashMap<SubscriberId, Subscriber<E>>>,
}

impl<E> Default for RoomHub<E> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }
}

impl<E: Clone> RoomHub<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self) -> (SubscriberId, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId::new();
        self.subscribers.lock().await.insert(
            id,
            Subscriber {
                tx,
                rooms: HashSet::new(),
            },
        );
        (id, rx)
    }

    /// Drops the subscriber from every room it was in.
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().await.remove(&id).is_some()
    }

    pub async fn join(&self, id: SubscriberId, room: &str) -> bool {
        let mut guard = self.subscribers.lock().await;
        match guard.get_mut(&id) {
            Some(subscriber) => {
                subscriber.rooms.insert(room.to_string());
                true
            }
            None => false,
        }
    }

    pub async fn leave(&self, id: SubscriberId, room: &str) -> bool {
        let mut guard = self.subscribers.lock().await;
        guard
            .get_mut(&id)
            .map(|subscriber| subscriber.rooms.remove(room))
            .unwrap_or(false)
    }

    pub async fn rooms_of(&self, id: SubscriberId) -> Vec<String> {
        let guard = self.subscribers.lock().await;
        let mut rooms: Vec<String> = guard
            .get(&id)
            .map(|subscriber| subscriber.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub async fn member_count(&self, room: &str) -> usize {
        let guard = self.subscribers.lock().await;
        guard.values().filter(|s| s.rooms.contains(room)).count()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Returns how many subscribers the event was handed to.
    pub async fn emit_to_room(&self, room: &str, event: E) -> usize {
        let targets: Vec<mpsc::UnboundedSender<E>> = {
            let guard = self.subscribers.lock().await;
            guard
                .values()
                .filter(|s| s.rooms.contains(room))
                .map(|s| s.tx.clone())
                .collect()
        };
        deliver(targets, event)
    }

    pub async fn emit_all(&self, event: E) -> usize {
        let targets: Vec<mpsc::UnboundedSender<E>> = {
            let guard = self.subscribers.lock().await;
            guard.values().map(|s| s.tx.clone()).collect()
        };
        deliver(targets, event)
    }

    pub async fn emit_to(&self, id: SubscriberId, event: E) -> bool {
        let target = {
            let guard = self.subscribers.lock().await;
            guard.get(&id).map(|s| s.tx.clone())
        };
        match target {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

fn deliver<E: Clone>(targets: Vec<mpsc::UnboundedSender<E>>, event: E) -> usize {
    targets
        .into_iter()
        .filter(|tx| tx.send(event.clone()).is_ok())
        .count()
}
