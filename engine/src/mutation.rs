//! Optimistic mutations against a live view.
//!
//! A [`MutationCoordinator`] pairs one shared view with the document store and
//! the auth provider. Favorite toggles and deletes edit the view before the
//! remote write is issued; creates and edits go straight to the store and
//! show up through the next snapshot.
//!
//! # Lifecycle
//!
//! Each optimistic operation walks a [`Mutation`] through
//! `Idle -> Speculating -> Confirmed | RolledBack`; creates and edits skip
//! straight from `Idle` to `Confirmed`. A failed toggle reverts
//! only while its speculation is still pending: once a snapshot has landed,
//! the snapshot's values stand.
//!
//! # Ownership
//!
//! Editing and deleting are limited to the document's creator. Documents
//! created while signed out carry the `anonymous` creator and are owned by
//! nobody. Favorites can be toggled by anyone.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::auth::AuthProvider;
use crate::document::{field, ANONYMOUS};
use crate::error::{Error, Result, StoreError};
use crate::store::DocumentStore;
use crate::validation::validate_event;
use crate::view::SharedView;
use crate::{CollectionHandle, CollectionName, Document, DocumentId, EventDraft, Fields};

/// Which optimistic operation a [`Mutation`] tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ToggleFavorite,
    RemoveFavorite,
    Delete,
    Create,
    Update,
}

/// Where a mutation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    /// Nothing applied yet, or the user declined
    Idle,
    /// The view shows the change; the remote write is in flight
    Speculating,
    /// The remote write succeeded
    Confirmed,
    /// The remote write failed and the view was put back
    RolledBack,
}

impl MutationState {
    fn can_become(self, next: MutationState) -> bool {
        matches!(
            (self, next),
            (MutationState::Idle, MutationState::Speculating)
                | (MutationState::Idle, MutationState::Confirmed)
                | (MutationState::Speculating, MutationState::Confirmed)
                | (MutationState::Speculating, MutationState::RolledBack)
        )
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationState::Idle => "idle",
            MutationState::Speculating => "speculating",
            MutationState::Confirmed => "confirmed",
            MutationState::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// One optimistic operation on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    pub kind: MutationKind,
    pub document_id: DocumentId,
    state: MutationState,
}

impl Mutation {
    pub fn new(kind: MutationKind, document_id: impl Into<DocumentId>) -> Self {
        Self {
            kind,
            document_id: document_id.into(),
            state: MutationState::Idle,
        }
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Whether the remote write went through.
    pub fn is_confirmed(&self) -> bool {
        self.state == MutationState::Confirmed
    }

    fn advance(&mut self, next: MutationState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid mutation transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(
            kind = ?self.kind,
            document_id = %self.document_id,
            from = %self.state,
            to = %next,
            "Mutation transition"
        );
        self.state = next;
    }
}

/// A yes/no question put to the user before a destructive change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt {
    pub title: &'static str,
    pub message: &'static str,
}

/// Asked before deleting an event.
pub const DELETE_PROMPT: Prompt = Prompt {
    title: "Confirm Delete",
    message: "Are you sure you want to delete this event?",
};

/// Asked before removing an event from favorites.
pub const REMOVE_FAVORITE_PROMPT: Prompt = Prompt {
    title: "Remove Favorite",
    message: "Are you sure you want to remove this from favorites?",
};

/// Source of user confirmation.
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &Prompt) -> bool;
}

/// A fixed answer, for callers that already asked.
#[async_trait]
impl Confirm for bool {
    async fn confirm(&self, _prompt: &Prompt) -> bool {
        *self
    }
}

/// Runs mutations for one view.
#[derive(Clone)]
pub struct MutationCoordinator {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    view: SharedView,
    collection: CollectionName,
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        view: SharedView,
        collection: impl Into<CollectionName>,
    ) -> Self {
        Self {
            store,
            auth,
            view,
            collection: collection.into(),
        }
    }

    /// The view this coordinator edits.
    pub fn view(&self) -> &SharedView {
        &self.view
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Flip a document's favorite flag.
    ///
    /// The view shows the new value at once. If the store rejects the write,
    /// the old value is put back (unless a snapshot got there first) and the
    /// store's error is returned.
    pub async fn toggle_favorite(&self, id: &str) -> Result<Mutation> {
        let mut mutation = Mutation::new(MutationKind::ToggleFavorite, id);

        let (changes, prior) = {
            let mut view = self.view.lock().await;
            let current = view
                .get(id)
                .ok_or_else(|| Error::DocumentNotInView(id.to_string()))?
                .is_favorite();

            let changes = favorite_fields(!current);
            let prior = view
                .apply_speculative(id, &changes)
                .ok_or_else(|| Error::DocumentNotInView(id.to_string()))?;
            (changes, prior)
        };
        mutation.advance(MutationState::Speculating);

        match self
            .store
            .update_document(&self.collection, id, changes)
            .await
        {
            Ok(()) => {
                self.view.lock().await.resolve_speculative(id);
                mutation.advance(MutationState::Confirmed);
                Ok(mutation)
            }
            Err(err) => {
                let reverted = self.view.lock().await.revert_speculative(id, &prior);
                mutation.advance(MutationState::RolledBack);
                tracing::warn!(
                    document_id = %id,
                    reverted,
                    error = %err,
                    "Favorite toggle failed"
                );
                Err(err.into())
            }
        }
    }

    /// Delete a document after confirmation.
    ///
    /// The document leaves the view before the remote call. A failed delete
    /// is reported but not undone locally; the next snapshot still lists the
    /// document and brings it back.
    pub async fn delete_document(&self, id: &str, confirm: &dyn Confirm) -> Result<Mutation> {
        let mut mutation = Mutation::new(MutationKind::Delete, id);

        let doc = self.view_document(id).await?;
        self.ensure_owner(&doc).await?;

        if !confirm.confirm(&DELETE_PROMPT).await {
            tracing::debug!(document_id = %id, "Delete declined");
            return Ok(mutation);
        }

        self.view.lock().await.remove(id);
        mutation.advance(MutationState::Speculating);

        if let Err(err) = self.store.delete_document(&self.collection, id).await {
            tracing::warn!(
                document_id = %id,
                error = %err,
                "Delete failed; waiting for next snapshot"
            );
            return Err(err.into());
        }

        mutation.advance(MutationState::Confirmed);
        Ok(mutation)
    }

    /// Take a document off the favorites list after confirmation.
    ///
    /// The document leaves the view at once. If the store rejects the write
    /// and no snapshot has arrived since, it is appended back.
    pub async fn remove_favorite(&self, id: &str, confirm: &dyn Confirm) -> Result<Mutation> {
        let mut mutation = Mutation::new(MutationKind::RemoveFavorite, id);

        self.view_document(id).await?;
        if !confirm.confirm(&REMOVE_FAVORITE_PROMPT).await {
            tracing::debug!(document_id = %id, "Remove favorite declined");
            return Ok(mutation);
        }

        let (removed, generation) = {
            let mut view = self.view.lock().await;
            let removed = view
                .remove(id)
                .ok_or_else(|| Error::DocumentNotInView(id.to_string()))?;
            (removed, view.generation())
        };
        mutation.advance(MutationState::Speculating);

        match self
            .store
            .update_document(&self.collection, id, favorite_fields(false))
            .await
        {
            Ok(()) => {
                mutation.advance(MutationState::Confirmed);
                Ok(mutation)
            }
            Err(err) => {
                let restored = {
                    let mut view = self.view.lock().await;
                    view.generation() == generation && view.restore(removed)
                };
                mutation.advance(MutationState::RolledBack);
                tracing::warn!(
                    document_id = %id,
                    restored,
                    error = %err,
                    "Remove favorite failed"
                );
                Err(err.into())
            }
        }
    }

    /// Create an event owned by the signed-in user.
    ///
    /// The draft is validated and trimmed first. New events start
    /// un-favorited; when nobody is signed in they are attributed to
    /// `anonymous`. The view is not touched: the event appears with the next
    /// snapshot. The returned mutation carries the new document's id.
    pub async fn create_document(&self, draft: &EventDraft) -> Result<Mutation> {
        let draft = validate_event(draft)?;
        let creator = self
            .auth
            .current_identity()
            .await
            .map(|identity| identity.uid)
            .unwrap_or_else(|| ANONYMOUS.to_string());

        let mut fields = draft.to_fields();
        fields.insert(field::CREATED_BY.into(), creator.clone().into());
        fields.insert(field::IS_FAVORITE.into(), false.into());

        let id = self.store.add_document(&self.collection, fields).await?;
        let mut mutation = Mutation::new(MutationKind::Create, id);
        mutation.advance(MutationState::Confirmed);
        tracing::info!(
            document_id = %mutation.document_id,
            created_by = %creator,
            "Event created"
        );
        Ok(mutation)
    }

    /// Overwrite an event's title, description and date.
    ///
    /// The favorite flag and creator are left alone.
    pub async fn update_document(&self, id: &str, draft: &EventDraft) -> Result<Mutation> {
        let draft = validate_event(draft)?;

        let doc = match self.load_document(id).await? {
            Some(doc) => doc,
            None => return Err(StoreError::NotFound(id.to_string()).into()),
        };
        self.ensure_owner(&doc).await?;

        self.store
            .update_document(&self.collection, id, draft.to_fields())
            .await?;
        let mut mutation = Mutation::new(MutationKind::Update, id);
        mutation.advance(MutationState::Confirmed);
        tracing::info!(document_id = %id, "Event updated");
        Ok(mutation)
    }

    /// Read a document, preferring the local view.
    pub async fn load_document(&self, id: &str) -> Result<Option<Document>> {
        if let Some(doc) = self.view.lock().await.get(id).cloned() {
            return Ok(Some(doc));
        }
        Ok(self.store.get_document(&self.collection, id).await?)
    }

    /// Replace the view with a one-shot read of `handle`.
    ///
    /// Returns the number of documents now in view.
    pub async fn refresh(&self, handle: &CollectionHandle) -> Result<usize> {
        let documents = self.store.get_documents(handle).await?;
        let mut view = self.view.lock().await;
        view.replace(documents);
        Ok(view.len())
    }

    async fn view_document(&self, id: &str) -> Result<Document> {
        self.view
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DocumentNotInView(id.to_string()))
    }

    async fn ensure_owner(&self, doc: &Document) -> Result<()> {
        let uid = self.auth.current_identity().await.map(|identity| identity.uid);
        match (uid.as_deref(), doc.created_by()) {
            (Some(uid), Some(owner)) if uid == owner && owner != ANONYMOUS => Ok(()),
            _ => {
                tracing::debug!(
                    document_id = %doc.id,
                    owner = ?doc.created_by(),
                    "Rejected change to a document owned by someone else"
                );
                Err(Error::NotOwner(doc.id.clone()))
            }
        }
    }
}

fn favorite_fields(value: bool) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field::IS_FAVORITE.into(), value.into());
    fields
}
