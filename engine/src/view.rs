//! Local view state - the client's current belief about a collection.
//!
//! The view is an ordered list of documents, at most one per id, rebuilt from
//! every snapshot a subscription delivers. Between snapshots it can carry
//! speculative changes made by optimistic mutations.
//!
//! # Reconciliation
//!
//! [`LocalViewState::replace`] is the authoritative reconciliation point: it
//! overwrites everything, including speculative changes. A rollback that
//! arrives after a snapshot has superseded its speculation is skipped, so a
//! late failure never overwrites state the server has already confirmed.

use crate::{Document, DocumentId, Fields};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A view shared between a subscription feed and a mutation coordinator.
///
/// The lock is held only for synchronous edits, never across a remote call.
pub type SharedView = Arc<Mutex<LocalViewState>>;

/// Bookkeeping for one pending speculative change.
#[derive(Debug, Clone, PartialEq)]
struct Speculation {
    /// Field names the speculation introduced that the document did not have
    added: Vec<String>,
}

/// In-memory ordered view of a remote collection.
#[derive(Debug, Clone, Default)]
pub struct LocalViewState {
    documents: Vec<Document>,
    pending: HashMap<DocumentId, Speculation>,
    /// Number of snapshots applied so far
    generation: u64,
}

impl LocalViewState {
    /// Create an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty view wrapped for sharing.
    pub fn shared() -> SharedView {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Overwrite the view with an authoritative snapshot.
    ///
    /// All pending speculation is discarded: ids present in the snapshot take
    /// the snapshot's values, ids absent from it have left the view. If the
    /// snapshot repeats an id, the last occurrence wins at the first position.
    pub fn replace(&mut self, snapshot: impl IntoIterator<Item = Document>) {
        let mut documents: Vec<Document> = Vec::new();
        let mut index: HashMap<DocumentId, usize> = HashMap::new();

        for doc in snapshot {
            match index.get(&doc.id) {
                Some(&i) => documents[i] = doc,
                None => {
                    index.insert(doc.id.clone(), documents.len());
                    documents.push(doc);
                }
            }
        }

        if !self.pending.is_empty() {
            tracing::debug!(
                superseded = self.pending.len(),
                "Snapshot superseded speculative changes"
            );
        }

        self.documents = documents;
        self.pending.clear();
        self.generation += 1;
    }

    /// Count of snapshots applied. Lets a caller tell whether a snapshot
    /// landed while it was waiting on a remote write.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply field changes to one document ahead of server confirmation.
    ///
    /// Returns the prior values of the changed fields, which is what
    /// [`revert_speculative`](Self::revert_speculative) needs to undo the
    /// change. Returns `None` if the document is not in the view.
    pub fn apply_speculative(&mut self, id: &str, changes: &Fields) -> Option<Fields> {
        let pos = self.position(id)?;
        let current = &self.documents[pos];

        let prior = current.project(changes.keys());
        let added: Vec<String> = changes
            .keys()
            .filter(|name| !current.fields.contains_key(*name))
            .cloned()
            .collect();

        let updated = current.with_fields(changes);
        self.documents[pos] = updated;
        self.pending.insert(id.to_string(), Speculation { added });

        Some(prior)
    }

    /// Undo a speculative change by reapplying its prior values.
    ///
    /// Only takes effect while the speculation is still pending. Returns
    /// `false` if a snapshot superseded it or the document left the view.
    pub fn revert_speculative(&mut self, id: &str, prior: &Fields) -> bool {
        let Some(speculation) = self.pending.remove(id) else {
            return false;
        };
        let Some(pos) = self.position(id) else {
            return false;
        };

        let mut reverted = self.documents[pos].with_fields(prior);
        for name in &speculation.added {
            reverted.fields.remove(name);
        }
        self.documents[pos] = reverted;
        true
    }

    /// Drop the pending marker after the remote write succeeded.
    ///
    /// The speculative values stay until the next snapshot confirms or
    /// corrects them.
    pub fn resolve_speculative(&mut self, id: &str) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Remove a document immediately (optimistic delete).
    ///
    /// A later snapshot that still contains the id puts it back.
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let pos = self.position(id)?;
        self.pending.remove(id);
        Some(self.documents.remove(pos))
    }

    /// Re-append a previously removed document. No-op if the id is present.
    pub fn restore(&mut self, doc: Document) -> bool {
        if self.position(&doc.id).is_some() {
            return false;
        }
        self.documents.push(doc);
        true
    }

    /// All documents in view order.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    /// Get a document by id.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Whether a speculative change is pending for `id`.
    pub fn is_speculative(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of pending speculative changes.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }
}
