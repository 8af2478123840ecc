//! Document store provider contract and an in-memory implementation.
//!
//! The client never talks to a concrete backend; it is handed an
//! `Arc<dyn DocumentStore>` at construction time. [`MemoryDocumentStore`]
//! implements the contract in-process and is used by tests and by the
//! server's in-memory mode.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::hub::SnapshotHub;
use crate::snapshot::SnapshotReceiver;
use crate::{CollectionHandle, CollectionName, Document, DocumentId, Fields};

/// A hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live subscription on a filtered collection.
    ///
    /// The receiver yields a full snapshot immediately, then a new full
    /// snapshot whenever the filtered contents change. An error item ends the
    /// stream. Dropping the receiver ends the subscription.
    async fn subscribe(&self, handle: &CollectionHandle) -> Result<SnapshotReceiver, StoreError>;

    /// Create a document with a store-assigned id.
    async fn add_document(&self, collection: &str, fields: Fields)
        -> Result<DocumentId, StoreError>;

    /// Merge `fields` into an existing document. Other fields are untouched.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Point-read a document.
    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<Document>, StoreError>;

    /// One-shot read of every document matching a handle.
    async fn get_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>, StoreError>;
}

/// In-process document store.
///
/// Collections keep insertion order. Every write publishes to the snapshot hub
/// while the collection lock is held, so subscribers see writes in order.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<CollectionName, Vec<Document>>>,
    hub: SnapshotHub,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a document under a caller-chosen id.
    ///
    /// Used to seed fixtures and to simulate writes from other clients.
    pub async fn insert(&self, collection: &str, doc: Document) {
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
        self.hub.publish(collection, docs);
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.hub.listener_count()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn subscribe(&self, handle: &CollectionHandle) -> Result<SnapshotReceiver, StoreError> {
        let collections = self.collections.lock().await;
        let current = collections
            .get(&handle.collection)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(self.hub.register(handle.clone(), current))
    }

    async fn add_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        docs.push(Document::new(id.clone(), fields));
        self.hub.publish(collection, docs);

        tracing::debug!(collection = %collection, document_id = %id, "Document added");
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        *doc = doc.with_fields(&fields);
        self.hub.publish(collection, docs);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        if let Some(docs) = collections.get_mut(collection) {
            let before = docs.len();
            docs.retain(|d| d.id != id);
            if docs.len() != before {
                self.hub.publish(collection, docs);
            }
        }
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn get_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(&handle.collection)
            .map(|docs| docs.iter().filter(|d| handle.matches(d)).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{field, EVENTS_COLLECTION};
    use crate::EventDraft;

    fn event_fields(title: &str, favorite: bool) -> Fields {
        let mut fields = EventDraft::new(title, "desc", "12-12-2026").to_fields();
        fields.insert(field::CREATED_BY.into(), "uid-1".into());
        fields.insert(field::IS_FAVORITE.into(), favorite.into());
        fields
    }

    #[tokio::test]
    async fn add_get_update_delete() {
        let store = MemoryDocumentStore::new();
        let id = store
            .add_document(EVENTS_COLLECTION, event_fields("Meetup", false))
            .await
            .unwrap();

        let doc = store
            .get_document(EVENTS_COLLECTION, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.title(), Some("Meetup"));

        let mut changes = Fields::new();
        changes.insert(field::IS_FAVORITE.into(), true.into());
        store
            .update_document(EVENTS_COLLECTION, &id, changes)
            .await
            .unwrap();
        let doc = store
            .get_document(EVENTS_COLLECTION, &id)
            .await
            .unwrap()
            .unwrap();
        assert!(doc.is_favorite());
        assert_eq!(doc.title(), Some("Meetup"));

        store.delete_document(EVENTS_COLLECTION, &id).await.unwrap();
        assert!(store
            .get_document(EVENTS_COLLECTION, &id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_missing_document() {
        let store = MemoryDocumentStore::new();
        let result = store
            .update_document(EVENTS_COLLECTION, "nope", Fields::new())
            .await;
        assert_eq!(result, Err(StoreError::NotFound("nope".into())));
    }

    #[tokio::test]
    async fn delete_missing_document_succeeds() {
        let store = MemoryDocumentStore::new();
        assert!(store.delete_document(EVENTS_COLLECTION, "nope").await.is_ok());
    }

    #[tokio::test]
    async fn subscription_follows_writes() {
        let store = MemoryDocumentStore::new();
        let mut rx = store.subscribe(&CollectionHandle::events()).await.unwrap();
        assert!(rx.recv().await.unwrap().unwrap().is_empty());

        let id = store
            .add_document(EVENTS_COLLECTION, event_fields("Meetup", false))
            .await
            .unwrap();
        let snapshot = rx.recv().await.unwrap().unwrap();
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), vec![id.as_str()]);

        store.delete_document(EVENTS_COLLECTION, &id).await.unwrap();
        assert!(rx.recv().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_shot_query_is_filtered() {
        let store = MemoryDocumentStore::new();
        store
            .add_document(EVENTS_COLLECTION, event_fields("A", true))
            .await
            .unwrap();
        store
            .add_document(EVENTS_COLLECTION, event_fields("B", false))
            .await
            .unwrap();

        let favorites = store
            .get_documents(&CollectionHandle::favorites())
            .await
            .unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].title(), Some("A"));
        assert_eq!(store.len(EVENTS_COLLECTION).await, 2);
    }

    #[tokio::test]
    async fn insert_overwrites() {
        let store = MemoryDocumentStore::new();
        store
            .insert(EVENTS_COLLECTION, Document::new("e1", event_fields("A", false)))
            .await;
        store
            .insert(EVENTS_COLLECTION, Document::new("e1", event_fields("B", false)))
            .await;

        assert_eq!(store.len(EVENTS_COLLECTION).await, 1);
        let doc = store
            .get_document(EVENTS_COLLECTION, "e1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.title(), Some("B"));
    }
}
