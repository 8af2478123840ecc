//! Account session: form validation in front of the auth provider.

use std::sync::Arc;

use crate::auth::{AuthProvider, Identity};
use crate::error::Result;
use crate::validation::{validate_credentials, CredentialMode};

/// Sign-in state for one client.
///
/// Credentials are checked locally first; only well-formed input reaches the
/// provider, and provider errors are returned unchanged.
#[derive(Clone)]
pub struct Session {
    auth: Arc<dyn AuthProvider>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth }
    }

    /// Create an account and sign it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<Identity> {
        let credentials = validate_credentials(email, password, CredentialMode::Register)?;
        let identity = self
            .auth
            .register(&credentials.email, &credentials.password)
            .await?;
        tracing::info!(uid = %identity.uid, "Registered");
        Ok(identity)
    }

    /// Sign in to an existing account.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        let credentials = validate_credentials(email, password, CredentialMode::SignIn)?;
        let identity = self
            .auth
            .authenticate(&credentials.email, &credentials.password)
            .await?;
        tracing::info!(uid = %identity.uid, "Signed in");
        Ok(identity)
    }

    pub async fn sign_out(&self) {
        self.auth.sign_out().await;
        tracing::info!("Signed out");
    }

    pub async fn current_identity(&self) -> Option<Identity> {
        self.auth.current_identity().await
    }

    /// Uid of the signed-in user, if any.
    pub async fn current_uid(&self) -> Option<String> {
        self.current_identity().await.map(|identity| identity.uid)
    }
}
