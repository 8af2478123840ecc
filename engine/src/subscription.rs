//! Live subscriptions on filtered collections.
//!
//! The [`SubscriptionManager`] opens provider subscriptions and hands back a
//! push stream of snapshots, or feeds them straight into a [`SharedView`].
//!
//! # Guarantees
//!
//! - At most one live subscription per [`CollectionHandle`]: subscribing again
//!   to the same handle tears the previous subscription down first.
//! - [`SubscriptionManager::unsubscribe`] is idempotent. Once it returns, no
//!   further snapshot is yielded by the stream or applied to the view, even if
//!   one was already buffered.
//! - An error ends the stream. Nothing is retried; resubscribing is the
//!   caller's decision.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::SubscriptionError;
use crate::snapshot::{SnapshotEvent, SnapshotReceiver};
use crate::store::DocumentStore;
use crate::view::SharedView;
use crate::CollectionHandle;

/// Identifier of a live subscription.
pub type SubscriptionId = String;

/// Push stream of snapshots for one subscription.
///
/// Yields the initial snapshot, then one snapshot per change. Ends after an
/// error item or once the subscription is closed.
#[derive(Debug)]
pub struct SnapshotStream {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
    closed: Arc<AtomicBool>,
    finished: bool,
}

impl SnapshotStream {
    /// The id to pass to [`SubscriptionManager::unsubscribe`].
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the next snapshot.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        if self.finished || self.closed.load(Ordering::Acquire) {
            return None;
        }

        let event = self.receiver.recv().await;

        // Suppress anything that raced with unsubscribe
        if self.closed.load(Ordering::Acquire) {
            self.finished = true;
            return None;
        }
        match event {
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            Some(Ok(snapshot)) => Some(Ok(snapshot)),
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// A registered live subscription.
#[derive(Debug)]
struct LiveSubscription {
    handle: CollectionHandle,
    closed: Arc<AtomicBool>,
    task: JoinHandle<()>,
    /// View fed by this subscription, if any
    view: Option<SharedView>,
}

/// Opens and closes live subscriptions against a document store.
pub struct SubscriptionManager {
    store: Arc<dyn DocumentStore>,
    live: Arc<DashMap<SubscriptionId, LiveSubscription>>,
}

impl SubscriptionManager {
    /// Create a manager over an explicitly provided store.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            live: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe to a handle and receive its snapshots as a stream.
    pub async fn subscribe(
        &self,
        handle: CollectionHandle,
    ) -> Result<SnapshotStream, SubscriptionError> {
        self.close_existing(&handle).await;

        let upstream = self.store.subscribe(&handle).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let closed = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::unbounded_channel();

        let (ready, gate) = oneshot::channel();
        let feed = forward(upstream, sender, id.clone(), Arc::clone(&self.live));
        let task = tokio::spawn(async move {
            if gate.await.is_ok() {
                feed.await;
            }
        });
        self.register(id.clone(), handle, Arc::clone(&closed), task, None);
        let _ = ready.send(());

        Ok(SnapshotStream {
            id,
            receiver,
            closed,
            finished: false,
        })
    }

    /// Subscribe to a handle and apply every snapshot to `view`.
    ///
    /// Each snapshot goes through [`LocalViewState::replace`], so it
    /// supersedes any speculative state. Subscription errors are logged and
    /// end the feed.
    ///
    /// [`LocalViewState::replace`]: crate::LocalViewState::replace
    pub async fn sync_into(
        &self,
        handle: CollectionHandle,
        view: SharedView,
    ) -> Result<SubscriptionId, SubscriptionError> {
        self.close_existing(&handle).await;

        let upstream = self.store.subscribe(&handle).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let closed = Arc::new(AtomicBool::new(false));

        let (ready, gate) = oneshot::channel();
        let feed = feed_view(
            upstream,
            Arc::clone(&view),
            Arc::clone(&closed),
            id.clone(),
            Arc::clone(&self.live),
        );
        let task = tokio::spawn(async move {
            if gate.await.is_ok() {
                feed.await;
            }
        });
        self.register(id.clone(), handle, closed, task, Some(view));
        let _ = ready.send(());

        Ok(id)
    }

    /// Close a subscription. Unknown or already closed ids are ignored.
    ///
    /// Returns whether a live subscription was closed.
    pub async fn unsubscribe(&self, id: &str) -> bool {
        let Some((_, subscription)) = self.live.remove(id) else {
            return false;
        };

        subscription.closed.store(true, Ordering::Release);
        subscription.task.abort();

        // Wait out an apply that was already in progress
        if let Some(view) = &subscription.view {
            drop(view.lock().await);
        }

        tracing::debug!(
            subscription_id = %id,
            collection = %subscription.handle.collection,
            "Subscription closed"
        );
        true
    }

    /// Close every live subscription.
    pub async fn unsubscribe_all(&self) {
        let ids: Vec<SubscriptionId> = self.live.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.unsubscribe(&id).await;
        }
    }

    /// Number of live subscriptions.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Whether `id` is still live.
    pub fn is_live(&self, id: &str) -> bool {
        self.live.contains_key(id)
    }

    /// Record a subscription as live.
    ///
    /// Its task must not start before this returns, otherwise a feed that
    /// ends at once would remove the entry before it exists.
    fn register(
        &self,
        id: SubscriptionId,
        handle: CollectionHandle,
        closed: Arc<AtomicBool>,
        task: JoinHandle<()>,
        view: Option<SharedView>,
    ) {
        tracing::debug!(
            subscription_id = %id,
            collection = %handle.collection,
            filter = ?handle.filter,
            "Subscription opened"
        );
        self.live.insert(
            id,
            LiveSubscription {
                handle,
                closed,
                task,
                view,
            },
        );
    }

    async fn close_existing(&self, handle: &CollectionHandle) {
        let existing: Vec<SubscriptionId> = self
            .live
            .iter()
            .filter(|entry| entry.handle == *handle)
            .map(|entry| entry.key().clone())
            .collect();

        for id in existing {
            tracing::warn!(
                subscription_id = %id,
                collection = %handle.collection,
                "Replacing live subscription for the same handle"
            );
            self.unsubscribe(&id).await;
        }
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        for entry in self.live.iter() {
            entry.closed.store(true, Ordering::Release);
            entry.task.abort();
        }
    }
}

/// Relay provider snapshots to a stream consumer.
async fn forward(
    mut upstream: SnapshotReceiver,
    sender: mpsc::UnboundedSender<SnapshotEvent>,
    id: SubscriptionId,
    live: Arc<DashMap<SubscriptionId, LiveSubscription>>,
) {
    loop {
        let event = upstream
            .recv()
            .await
            .unwrap_or(Err(SubscriptionError::Closed));

        let terminal = event.is_err();
        if let Err(e) = &event {
            tracing::error!(subscription_id = %id, error = %e, "Subscription failed");
        }
        if sender.send(event).is_err() || terminal {
            break;
        }
    }
    live.remove(&id);
}

/// Apply provider snapshots to a shared view until closed or failed.
async fn feed_view(
    mut upstream: SnapshotReceiver,
    view: SharedView,
    closed: Arc<AtomicBool>,
    id: SubscriptionId,
    live: Arc<DashMap<SubscriptionId, LiveSubscription>>,
) {
    loop {
        match upstream.recv().await {
            Some(Ok(snapshot)) => {
                let mut view = view.lock().await;
                if closed.load(Ordering::Acquire) {
                    break;
                }
                tracing::debug!(
                    subscription_id = %id,
                    documents = snapshot.len(),
                    "Applying snapshot"
                );
                view.replace(snapshot.documents);
            }
            Some(Err(e)) => {
                tracing::error!(subscription_id = %id, error = %e, "Subscription failed");
                break;
            }
            None => {
                tracing::error!(
                    subscription_id = %id,
                    error = %SubscriptionError::Closed,
                    "Subscription failed"
                );
                break;
            }
        }
    }
    live.remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{field, Fields, EVENTS_COLLECTION};
    use crate::store::MemoryDocumentStore;
    use crate::{Document, LocalViewState};

    fn event(id: &str, favorite: bool) -> Document {
        let mut fields = Fields::new();
        fields.insert(field::TITLE.into(), id.into());
        fields.insert(field::IS_FAVORITE.into(), favorite.into());
        Document::new(id, fields)
    }

    #[tokio::test]
    async fn stream_delivers_initial_and_updates() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert(EVENTS_COLLECTION, event("a", false)).await;
        let manager = SubscriptionManager::new(store.clone());

        let mut stream = manager.subscribe(CollectionHandle::events()).await.unwrap();
        let initial = stream.next().await.unwrap().unwrap();
        assert_eq!(initial.ids().collect::<Vec<_>>(), vec!["a"]);

        store.insert(EVENTS_COLLECTION, event("b", false)).await;
        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next.ids().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_final() {
        let store = Arc::new(MemoryDocumentStore::new());
        let manager = SubscriptionManager::new(store.clone());

        let mut stream = manager.subscribe(CollectionHandle::events()).await.unwrap();
        let id = stream.id().to_string();
        assert_eq!(manager.live_count(), 1);

        // A snapshot is buffered but not yet consumed
        store.insert(EVENTS_COLLECTION, event("a", false)).await;

        assert!(manager.unsubscribe(&id).await);
        assert!(!manager.unsubscribe(&id).await);
        assert_eq!(manager.live_count(), 0);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn same_handle_replaces_previous() {
        let store = Arc::new(MemoryDocumentStore::new());
        let manager = SubscriptionManager::new(store);

        let mut first = manager.subscribe(CollectionHandle::events()).await.unwrap();
        let second = manager.subscribe(CollectionHandle::events()).await.unwrap();
        let favorites = manager
            .subscribe(CollectionHandle::favorites())
            .await
            .unwrap();

        assert!(!manager.is_live(first.id()));
        assert!(manager.is_live(second.id()));
        assert!(manager.is_live(favorites.id()));
        assert!(first.next().await.is_none());
    }

    #[tokio::test]
    async fn sync_into_replaces_view() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.insert(EVENTS_COLLECTION, event("a", true)).await;
        let manager = SubscriptionManager::new(store.clone());
        let view = LocalViewState::shared();

        let id = manager
            .sync_into(CollectionHandle::favorites(), Arc::clone(&view))
            .await
            .unwrap();

        tokio::task::yield_now().await;
        store.insert(EVENTS_COLLECTION, event("b", true)).await;

        // Wait for the feed task to catch up
        for _ in 0..100 {
            if view.lock().await.len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(view.lock().await.len(), 2);

        manager.unsubscribe(&id).await;
        store.insert(EVENTS_COLLECTION, event("c", true)).await;
        tokio::task::yield_now().await;
        assert_eq!(view.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn dropping_manager_releases_provider() {
        let store = Arc::new(MemoryDocumentStore::new());
        let manager = SubscriptionManager::new(store.clone());
        let _stream = manager.subscribe(CollectionHandle::events()).await.unwrap();

        drop(manager);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        store.insert(EVENTS_COLLECTION, event("a", false)).await;
        assert_eq!(store.subscriber_count(), 0);
    }
}
