//! WebSocket handler for live collection snapshots.
//!
//! Each connection owns its subscriptions. A subscription is a task that
//! forwards the store's snapshots for one handle to the connection until the
//! client unsubscribes, the store ends it, or the socket closes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use eventdeck_engine::{CollectionHandle, DocumentStore, Filter, Schema, SnapshotReceiver};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

/// Subscriptions and message dispatch for one connection.
pub struct WsSession {
    conn_id: String,
    store: Arc<dyn DocumentStore>,
    schema: Arc<Schema>,
    conn_manager: Arc<ConnectionManager>,
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl WsSession {
    pub fn new(
        conn_id: String,
        store: Arc<dyn DocumentStore>,
        schema: Arc<Schema>,
        conn_manager: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            conn_id,
            store,
            schema,
            conn_manager,
            subscriptions: HashMap::new(),
        }
    }

    /// Number of open subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .values()
            .filter(|task| !task.is_finished())
            .count()
    }

    fn send(&self, message: ServerMessage) {
        self.conn_manager.send_to(&self.conn_id, message);
    }

    /// Process one text frame.
    pub async fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => self.send(ServerMessage::error(format!(
                "Invalid message format: {}",
                e
            ))),
        }
    }

    pub async fn handle(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::Subscribe {
                subscription_id,
                collection,
                filter,
            } => self.subscribe(subscription_id, collection, filter).await,
            ClientMessage::Unsubscribe { subscription_id } => {
                self.unsubscribe(&subscription_id).await;
                self.send(ServerMessage::Unsubscribed { subscription_id });
            }
            ClientMessage::Ping => self.send(ServerMessage::Pong),
        }
    }

    async fn subscribe(&mut self, subscription_id: String, collection: String, filter: Filter) {
        if self.unsubscribe(&subscription_id).await {
            tracing::warn!(
                conn_id = %self.conn_id,
                subscription_id = %subscription_id,
                "Replacing live subscription"
            );
        }

        if let Err(e) = self.schema.collection(&collection) {
            self.send(ServerMessage::subscription_error(subscription_id, e.to_string()));
            return;
        }

        let handle = CollectionHandle::new(collection, filter);
        let upstream = match self.store.subscribe(&handle).await {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::error!(subscription_id = %subscription_id, "Subscribe failed: {}", e);
                self.send(ServerMessage::subscription_error(subscription_id, e.to_string()));
                return;
            }
        };

        self.send(ServerMessage::Subscribed {
            subscription_id: subscription_id.clone(),
        });

        let task = tokio::spawn(forward_snapshots(
            upstream,
            subscription_id.clone(),
            self.conn_id.clone(),
            Arc::clone(&self.conn_manager),
        ));
        tracing::debug!(
            conn_id = %self.conn_id,
            subscription_id = %subscription_id,
            collection = %handle.collection,
            "Subscription opened"
        );
        self.subscriptions.insert(subscription_id, task);
    }

    /// Stop a subscription and wait until its task can no longer send.
    async fn unsubscribe(&mut self, subscription_id: &str) -> bool {
        let Some(task) = self.subscriptions.remove(subscription_id) else {
            return false;
        };
        let was_live = !task.is_finished();
        task.abort();
        let _ = task.await;
        was_live
    }

    /// Stop every subscription.
    pub async fn close(&mut self) {
        let ids: Vec<String> = self.subscriptions.keys().cloned().collect();
        for id in ids {
            self.unsubscribe(&id).await;
        }
    }
}

async fn forward_snapshots(
    mut upstream: SnapshotReceiver,
    subscription_id: String,
    conn_id: String,
    conn_manager: Arc<ConnectionManager>,
) {
    while let Some(event) = upstream.recv().await {
        let message = match event {
            Ok(snapshot) => ServerMessage::snapshot(subscription_id.clone(), snapshot),
            Err(e) => {
                tracing::error!(subscription_id = %subscription_id, "Subscription failed: {}", e);
                conn_manager.send_to(
                    &conn_id,
                    ServerMessage::subscription_error(subscription_id.clone(), e.to_string()),
                );
                return;
            }
        };
        if !conn_manager.send_to(&conn_id, message) {
            return;
        }
    }
}

/// Handle an established WebSocket connection.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task to forward outgoing messages
/// 3. Processes incoming messages in a loop
/// 4. Closes subscriptions and cleans up on disconnect
pub async fn handle_websocket_connection(
    socket: WebSocket,
    store: Arc<dyn DocumentStore>,
    schema: Arc<Schema>,
    conn_manager: Arc<ConnectionManager>,
    uid: Option<String>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = conn_manager.register(uid, tx);

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    let mut session = WsSession::new(
        conn_id.clone(),
        store,
        schema,
        Arc::clone(&conn_manager),
    );

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Binary(_)) => {
                session.send(ServerMessage::error("Binary messages not supported"));
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    session.close().await;
    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}
