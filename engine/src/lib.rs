//! # EventDeck Engine
//!
//! Live collection sync and optimistic mutations for the EventDeck client.
//!
//! The engine keeps a locally rendered view of a remote document collection
//! in step with a push-based subscription, and lets the user act on that view
//! without waiting for the network.
//!
//! ## Design Principles
//!
//! - **Snapshot wins**: every delivered snapshot overwrites local state,
//!   including changes that are still in flight
//! - **Explicit providers**: the auth service and the document store are
//!   passed in as trait objects, never looked up globally
//! - **Validate first**: malformed input never reaches the network
//!
//! ## Core Concepts
//!
//! ### Documents and handles
//!
//! A [`Document`] is an id plus string and boolean [`Fields`]. A
//! [`CollectionHandle`] names a collection and an optional [`Filter`]; it is
//! what a subscription is opened on.
//!
//! ### Subscriptions
//!
//! The [`SubscriptionManager`] turns a provider subscription into a stream of
//! full [`Snapshot`]s, or feeds them straight into a [`SharedView`].
//!
//! ### Local view
//!
//! [`LocalViewState`] is the ordered list the UI renders. Snapshots replace
//! it wholesale; mutations may edit it speculatively in between.
//!
//! ### Mutations
//!
//! The [`MutationCoordinator`] toggles favorites and deletes optimistically,
//! rolling back on failure, and creates and edits events after validation.
//! Edits and deletes are limited to the event's creator.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use eventdeck_engine::{
//!     DashboardScope, EventDraft, EventsClient, MemoryAuthProvider, MemoryDocumentStore,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> eventdeck_engine::Result<()> {
//! // 1. Wire the client to its providers
//! let store = Arc::new(MemoryDocumentStore::new());
//! let auth = Arc::new(MemoryAuthProvider::new());
//! let client = EventsClient::new(auth, store.clone());
//!
//! // 2. Sign up and open the dashboard on our own events
//! let identity = client.session().register("ana@example.com", "secret1").await?;
//! client.open_dashboard(DashboardScope::Mine).await?;
//!
//! // 3. Create an event; it reaches the view with the next snapshot
//! let draft = EventDraft::new("Meetup", "Team sync", "12-12-2026");
//! let id = client.dashboard().create_document(&draft).await?.document_id;
//!
//! let doc = client.dashboard().load_document(&id).await?.unwrap();
//! assert_eq!(doc.created_by(), Some(identity.uid.as_str()));
//! assert!(!doc.is_favorite());
//! # Ok(())
//! # }
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module exposes [`LocalViewState`] and form validation to the
//! mobile shell through C-compatible functions. All data is exchanged as JSON
//! strings.

pub mod auth;
pub mod client;
pub mod document;
pub mod error;
pub mod ffi;
pub mod filter;
pub mod hub;
pub mod mutation;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod subscription;
pub mod validation;
pub mod view;

// Re-export main types at crate root
pub use auth::{AuthProvider, Identity, MemoryAuthProvider};
pub use client::{EventsClient, Screen};
pub use document::{Document, EventDraft, FieldValue, Fields, ANONYMOUS, EVENTS_COLLECTION};
pub use error::{
    AuthError, Error, Result, SchemaError, StoreError, SubscriptionError, ValidationError,
};
pub use filter::{CollectionHandle, DashboardScope, Filter};
pub use hub::SnapshotHub;
pub use mutation::{Confirm, Mutation, MutationCoordinator, MutationKind, MutationState, Prompt};
pub use schema::{CollectionSchema, FieldDef, FieldType, Schema};
pub use session::Session;
pub use snapshot::{Snapshot, SnapshotEvent, SnapshotReceiver, SnapshotSender};
pub use store::{DocumentStore, MemoryDocumentStore};
pub use subscription::{SnapshotStream, SubscriptionId, SubscriptionManager};
pub use validation::{validate_credentials, validate_event, CredentialMode, Credentials};
pub use view::{LocalViewState, SharedView};

/// Type aliases for clarity
pub type DocumentId = String;
pub type CollectionName = String;
