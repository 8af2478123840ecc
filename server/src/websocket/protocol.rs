//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded, tagged by `type`, and use snake_case for
//! field names. Documents inside messages keep their own camelCase fields.

use eventdeck_engine::{CollectionHandle, Document, Filter, Snapshot};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a live subscription. Reusing an id replaces that subscription.
    Subscribe {
        /// Client-chosen id echoed on every related server message
        subscription_id: String,
        collection: String,
        /// Defaults to every document in the collection
        #[serde(default)]
        filter: Filter,
    },

    /// Close a live subscription.
    Unsubscribe { subscription_id: String },

    /// Keep-alive ping.
    Ping,
}

impl ClientMessage {
    pub fn subscribe(subscription_id: impl Into<String>, handle: CollectionHandle) -> Self {
        ClientMessage::Subscribe {
            subscription_id: subscription_id.into(),
            collection: handle.collection,
            filter: handle.filter,
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The subscription is live; its first snapshot follows.
    Subscribed { subscription_id: String },

    /// Full contents of a subscription's filtered collection.
    Snapshot {
        subscription_id: String,
        documents: Vec<Document>,
    },

    /// The subscription failed and is closed.
    SubscriptionError {
        subscription_id: String,
        message: String,
    },

    /// No further snapshots follow for this id.
    Unsubscribed { subscription_id: String },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn snapshot(subscription_id: impl Into<String>, snapshot: Snapshot) -> Self {
        ServerMessage::Snapshot {
            subscription_id: subscription_id.into(),
            documents: snapshot.documents,
        }
    }

    pub fn subscription_error(
        subscription_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ServerMessage::SubscriptionError {
            subscription_id: subscription_id.into(),
            message: message.into(),
        }
    }
}
