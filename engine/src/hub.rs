//! Snapshot fan-out for document store implementations.
//!
//! A store registers one listener per live subscription and calls
//! [`SnapshotHub::publish`] with the collection's current contents after every
//! write. The hub filters the contents per listener and sends a new snapshot
//! only when that listener's view actually changed.
//!
//! Callers must publish in write order (e.g. while still holding the lock that
//! serialized the write) for subscribers to observe snapshots in order.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::error::SubscriptionError;
use crate::snapshot::{Snapshot, SnapshotReceiver, SnapshotSender};
use crate::{CollectionHandle, Document};

/// A registered subscriber.
#[derive(Debug)]
struct Listener {
    handle: CollectionHandle,
    sender: SnapshotSender,
    /// Documents in the last delivered snapshot
    last: Vec<Document>,
}

/// Registry of live subscribers, keyed by an internal listener id.
#[derive(Debug, Default)]
pub struct SnapshotHub {
    listeners: DashMap<u64, Listener>,
    next_id: AtomicU64,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and immediately deliver its initial snapshot.
    pub fn register(&self, handle: CollectionHandle, current: &[Document]) -> SnapshotReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        let initial = matching(&handle, current);

        // The receiver is still in hand, so this send cannot fail
        let _ = sender.send(Ok(Snapshot::new(initial.clone())));

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            listener = id,
            collection = %handle.collection,
            documents = initial.len(),
            "Snapshot listener registered"
        );
        self.listeners.insert(
            id,
            Listener {
                handle,
                sender,
                last: initial,
            },
        );

        receiver
    }

    /// Push the current contents of `collection` to its subscribers.
    ///
    /// Returns the number of subscribers that received a new snapshot.
    /// Subscribers whose receiver was dropped are pruned.
    pub fn publish(&self, collection: &str, current: &[Document]) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for mut entry in self.listeners.iter_mut() {
            let id = *entry.key();
            let listener = entry.value_mut();
            if listener.handle.collection != collection {
                continue;
            }

            let documents = matching(&listener.handle, current);
            if documents == listener.last {
                continue;
            }

            if listener
                .sender
                .send(Ok(Snapshot::new(documents.clone())))
                .is_err()
            {
                closed.push(id);
                continue;
            }
            listener.last = documents;
            delivered += 1;
        }

        for id in closed {
            self.listeners.remove(&id);
            tracing::debug!(listener = id, "Pruned closed snapshot listener");
        }

        delivered
    }

    /// Terminate every subscription on `collection` with an error.
    pub fn fail(&self, collection: &str, error: SubscriptionError) -> usize {
        let ids: Vec<u64> = self
            .listeners
            .iter()
            .filter(|entry| entry.handle.collection == collection)
            .map(|entry| *entry.key())
            .collect();

        let mut notified = 0;
        for id in ids {
            if let Some((_, listener)) = self.listeners.remove(&id) {
                if listener.sender.send(Err(error.clone())).is_ok() {
                    notified += 1;
                }
            }
        }

        tracing::warn!(
            collection = %collection,
            notified,
            error = %error,
            "Terminated subscriptions"
        );
        notified
    }

    /// Number of subscribers that are still listening.
    pub fn listener_count(&self) -> usize {
        self.listeners.retain(|_, listener| !listener.sender.is_closed());
        self.listeners.len()
    }
}

fn matching(handle: &CollectionHandle, current: &[Document]) -> Vec<Document> {
    current
        .iter()
        .filter(|doc| handle.matches(doc))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{field, Fields};
    use crate::StoreError;

    fn event(id: &str, favorite: bool) -> Document {
        let mut fields = Fields::new();
        fields.insert(field::TITLE.into(), id.into());
        fields.insert(field::IS_FAVORITE.into(), favorite.into());
        Document::new(id, fields)
    }

    fn ids(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.ids().collect()
    }

    #[test]
    fn initial_snapshot_is_filtered() {
        let hub = SnapshotHub::new();
        let docs = vec![event("a", true), event("b", false)];

        let mut rx = hub.register(CollectionHandle::favorites(), &docs);
        let snapshot = rx.try_recv().unwrap().unwrap();
        assert_eq!(ids(&snapshot), vec!["a"]);
    }

    #[test]
    fn publish_only_on_change() {
        let hub = SnapshotHub::new();
        let mut docs = vec![event("a", true), event("b", false)];
        let mut rx = hub.register(CollectionHandle::favorites(), &docs);
        rx.try_recv().unwrap().unwrap();

        // Change outside the filtered set: nothing delivered
        docs.push(event("c", false));
        assert_eq!(hub.publish("events", &docs), 0);
        assert!(rx.try_recv().is_err());

        // b becomes a favorite: delivered
        docs[1] = event("b", true);
        assert_eq!(hub.publish("events", &docs), 1);
        let snapshot = rx.try_recv().unwrap().unwrap();
        assert_eq!(ids(&snapshot), vec!["a", "b"]);
    }

    #[test]
    fn publish_ignores_other_collections() {
        let hub = SnapshotHub::new();
        let mut rx = hub.register(CollectionHandle::events(), &[]);
        rx.try_recv().unwrap().unwrap();

        assert_eq!(hub.publish("notes", &[event("a", false)]), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let hub = SnapshotHub::new();
        let rx = hub.register(CollectionHandle::events(), &[]);
        assert_eq!(hub.listener_count(), 1);

        drop(rx);
        assert_eq!(hub.publish("events", &[event("a", false)]), 0);
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn fail_terminates_listeners() {
        let hub = SnapshotHub::new();
        let mut rx = hub.register(CollectionHandle::events(), &[]);
        rx.try_recv().unwrap().unwrap();

        let error = SubscriptionError::Store(StoreError::Unavailable("down".into()));
        assert_eq!(hub.fail("events", error.clone()), 1);
        assert_eq!(rx.try_recv().unwrap(), Err(error));
        assert_eq!(hub.listener_count(), 0);
    }
}
