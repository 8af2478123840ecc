//! Provider wrappers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use eventdeck_engine::document::field;
use eventdeck_engine::{
    AuthError, AuthProvider, CollectionHandle, Document, DocumentId, DocumentStore, EventDraft,
    Fields, Identity, LocalViewState, MemoryAuthProvider, MemoryDocumentStore, SharedView,
    SnapshotReceiver, StoreError, SubscriptionError,
};
use tokio::sync::{mpsc, Mutex, Notify, Semaphore};

pub fn event(id: &str, owner: &str, favorite: bool) -> Document {
    let mut fields = EventDraft::new(format!("Event {id}"), "desc", "12-12-2026").to_fields();
    fields.insert(field::CREATED_BY.into(), owner.into());
    fields.insert(field::IS_FAVORITE.into(), favorite.into());
    Document::new(id, fields)
}

pub fn with_favorite(doc: &Document, favorite: bool) -> Document {
    let mut changes = Fields::new();
    changes.insert(field::IS_FAVORITE.into(), favorite.into());
    doc.with_fields(&changes)
}

/// Poll until `check` holds for the view, yielding to spawned feed tasks.
pub async fn settle(view: &SharedView, check: impl Fn(&LocalViewState) -> bool) {
    for _ in 0..200 {
        if check(&*view.lock().await) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("view never settled: {:?}", view.lock().await.all());
}

/// Counts provider calls and fails writes on demand.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryDocumentStore,
    pub adds: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn subscribe(&self, handle: &CollectionHandle) -> Result<SnapshotReceiver, StoreError> {
        self.inner.subscribe(handle).await
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.add_document(collection, fields).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_document(collection, id).await
    }

    async fn get_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_documents(handle).await
    }
}

/// Holds every update until the test opens the gate, then resolves it with
/// the configured outcome.
pub struct GatedStore {
    pub inner: MemoryDocumentStore,
    entered: Notify,
    gate: Semaphore,
    outcome: Mutex<Option<StoreError>>,
}

impl GatedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryDocumentStore::new(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
            outcome: Mutex::new(None),
        })
    }

    /// Wait until an update is parked at the gate.
    pub async fn update_started(&self) {
        self.entered.notified().await;
    }

    /// Let one parked update through, failing it with `error` if given.
    pub async fn release(&self, error: Option<StoreError>) {
        *self.outcome.lock().await = error;
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn subscribe(&self, handle: &CollectionHandle) -> Result<SnapshotReceiver, StoreError> {
        self.inner.subscribe(handle).await
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        self.inner.add_document(collection, fields).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.entered.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("gate closed".into()))?;
        permit.forget();

        if let Some(error) = self.outcome.lock().await.take() {
            return Err(error);
        }
        self.inner.update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(collection, id).await
    }

    async fn get_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>, StoreError> {
        self.inner.get_documents(handle).await
    }
}

/// Hands out feeds that have already failed.
#[derive(Default)]
pub struct FailingFeedStore {
    pub inner: MemoryDocumentStore,
    pub subscribes: AtomicUsize,
}

impl FailingFeedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingFeedStore {
    async fn subscribe(&self, _handle: &CollectionHandle) -> Result<SnapshotReceiver, StoreError> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Err(SubscriptionError::Store(StoreError::Unavailable(
            "feed dropped".into(),
        ))));
        Ok(receiver)
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        self.inner.add_document(collection, fields).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.inner.update_document(collection, id, fields).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete_document(collection, id).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(collection, id).await
    }

    async fn get_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>, StoreError> {
        self.inner.get_documents(handle).await
    }
}

/// Counts calls that reach the auth provider.
#[derive(Default)]
pub struct RecordingAuth {
    pub inner: MemoryAuthProvider,
    pub calls: AtomicUsize,
}

impl RecordingAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for RecordingAuth {
    async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.register(email, password).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.authenticate(email, password).await
    }

    async fn sign_out(&self) {
        self.inner.sign_out().await
    }

    async fn current_identity(&self) -> Option<Identity> {
        self.inner.current_identity().await
    }
}
