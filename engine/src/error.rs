//! Error types for the EventDeck engine.
//!
//! Errors are split by where they originate: local validation, the
//! authentication provider, the document store, and live subscriptions.
//! [`Error`] wraps all of them for the client-facing operations.

use crate::DocumentId;
use thiserror::Error;

/// Local input errors. Raised before any network call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field")]
    MissingRequiredField,

    #[error("bad date format")]
    BadDateFormat,

    #[error("missing email or password")]
    MissingCredentials,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

/// Errors reported by an authentication provider.
///
/// These reach the user verbatim; the engine never rewrites them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("email already in use: {0}")]
    EmailInUse(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not signed in")]
    NotSignedIn,

    #[error("auth provider error: {0}")]
    Provider(String),
}

/// Errors reported by a document store provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store error: {0}")]
    Provider(String),
}

/// Errors that terminate a live subscription.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("subscription closed by provider")]
    Closed,

    #[error("subscription failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while checking a wire payload against a collection schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("type mismatch for field '{field}': expected {expected}")]
    TypeMismatch { field: String, expected: String },
}

/// All errors surfaced by client operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("document {0} is not owned by the current user")]
    NotOwner(DocumentId),

    #[error("document not in view: {0}")]
    DocumentNotInView(DocumentId),
}

impl Error {
    /// Whether this error was raised locally, before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
