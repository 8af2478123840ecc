//! Snapshots delivered by live subscriptions.
//!
//! A snapshot is a complete, ordered restatement of every document matching a
//! subscription's filter. Subscribers never receive deltas; each delivery
//! replaces the previous one.

use crate::error::SubscriptionError;
use crate::Document;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One full delivery of a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Matching documents in delivery order
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Ids in delivery order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.id.as_str())
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }
}

impl From<Vec<Document>> for Snapshot {
    fn from(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

/// Item of a snapshot stream. An `Err` is always the last item.
pub type SnapshotEvent = Result<Snapshot, SubscriptionError>;

/// Sending half used by providers.
pub type SnapshotSender = mpsc::UnboundedSender<SnapshotEvent>;

/// Receiving half handed out by providers.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<SnapshotEvent>;
