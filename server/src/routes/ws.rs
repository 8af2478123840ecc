//! WebSocket upgrade route.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::MaybeAuthUser;
use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws - Upgrade to a live snapshot connection.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: MaybeAuthUser,
) -> Response {
    let uid = user.uid().map(str::to_string);
    ws.on_upgrade(move |socket| {
        handle_websocket_connection(
            socket,
            state.documents,
            state.schema,
            state.conn_manager,
            uid,
        )
    })
}
