//! Request handlers for accounts, documents and live subscriptions.

mod auth;
mod documents;
mod websocket;

pub use auth::*;
pub use documents::*;
pub use websocket::*;
