//! Account handlers.

use eventdeck_engine::{validate_credentials, CredentialMode};
use serde::{Deserialize, Serialize};

use crate::auth::{Account, AccountStore};
use crate::error::Result;

/// Email and password as typed into the account form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub uid: String,
    pub email: String,
    /// Bearer token for subsequent requests
    pub token: String,
}

async fn open_session(accounts: &dyn AccountStore, account: Account) -> Result<SessionResponse> {
    let token = accounts.open_session(&account.uid).await?;
    Ok(SessionResponse {
        uid: account.uid,
        email: account.email,
        token,
    })
}

/// Create an account and sign it in.
pub async fn handle_register(
    accounts: &dyn AccountStore,
    request: CredentialsRequest,
) -> Result<SessionResponse> {
    let credentials =
        validate_credentials(&request.email, &request.password, CredentialMode::Register)?;

    let account = accounts
        .create(&credentials.email, &credentials.password)
        .await?;
    tracing::info!(uid = %account.uid, "Account registered");

    open_session(accounts, account).await
}

/// Check credentials and start a session.
pub async fn handle_sign_in(
    accounts: &dyn AccountStore,
    request: CredentialsRequest,
) -> Result<SessionResponse> {
    let credentials =
        validate_credentials(&request.email, &request.password, CredentialMode::SignIn)?;

    let account = accounts
        .verify(&credentials.email, &credentials.password)
        .await
        .inspect_err(|_| tracing::debug!("Sign-in rejected"))?;
    tracing::info!(uid = %account.uid, "Signed in");

    open_session(accounts, account).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryAccounts;
    use crate::error::AppError;

    fn request(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_sign_in() {
        let accounts = MemoryAccounts::new();
        let registered = handle_register(&accounts, request(" ana@example.com ", "secret1"))
            .await
            .unwrap();
        assert_eq!(registered.email, "ana@example.com");

        let signed_in = handle_sign_in(&accounts, request("ana@example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(signed_in.uid, registered.uid);
        assert_ne!(signed_in.token, registered.token);
        assert_eq!(accounts.session_count(), 2);
    }

    #[tokio::test]
    async fn short_password_never_creates_an_account() {
        let accounts = MemoryAccounts::new();
        let result = handle_register(&accounts, request("ana@example.com", "abc")).await;
        assert!(matches!(
            result,
            Err(AppError::Engine(eventdeck_engine::Error::Validation(_)))
        ));
        assert!(handle_sign_in(&accounts, request("ana@example.com", "abc"))
            .await
            .is_err());
        assert_eq!(accounts.session_count(), 0);
    }
}
