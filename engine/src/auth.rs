//! Authentication provider contract and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::AuthError;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user id, recorded as `createdBy` on documents
    pub uid: String,
    pub email: String,
}

/// A hosted authentication service.
///
/// Implementations keep the current sign-in state; `register` and
/// `authenticate` both sign the new identity in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self);

    async fn current_identity(&self) -> Option<Identity>;
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryAuthState {
    accounts: HashMap<String, Account>,
    current: Option<Identity>,
}

/// In-process auth emulator.
///
/// Accounts live in memory for the lifetime of the value. Intended for tests
/// and local development only.
#[derive(Debug, Default)]
pub struct MemoryAuthProvider {
    state: Mutex<MemoryAuthState>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut state = self.state.lock().await;
        let key = email.to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(AuthError::EmailInUse(email.to_string()));
        }

        let identity = Identity {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
        };
        state.accounts.insert(
            key,
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        state.current = Some(identity.clone());

        tracing::debug!(uid = %identity.uid, "Account registered");
        Ok(identity)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let mut state = self.state.lock().await;
        let identity = match state.accounts.get(&email.to_lowercase()) {
            Some(account) if account.password == password => account.identity.clone(),
            _ => return Err(AuthError::InvalidCredentials),
        };
        state.current = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) {
        self.state.lock().await.current = None;
    }

    async fn current_identity(&self) -> Option<Identity> {
        self.state.lock().await.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_signs_in() {
        let auth = MemoryAuthProvider::new();
        let identity = auth.register("ana@example.com", "secret1").await.unwrap();
        assert_eq!(auth.current_identity().await, Some(identity));
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let auth = MemoryAuthProvider::new();
        auth.register("ana@example.com", "secret1").await.unwrap();
        let err = auth
            .register("ANA@example.com", "secret2")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::EmailInUse("ANA@example.com".into()));
        assert_eq!(auth.account_count().await, 1);
    }

    #[tokio::test]
    async fn authenticate_and_sign_out() {
        let auth = MemoryAuthProvider::new();
        let registered = auth.register("ana@example.com", "secret1").await.unwrap();
        auth.sign_out().await;
        assert!(auth.current_identity().await.is_none());

        let err = auth
            .authenticate("ana@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(auth.current_identity().await.is_none());

        let identity = auth
            .authenticate("ana@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(identity, registered);
    }
}
