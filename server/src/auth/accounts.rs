//! Account and session storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use eventdeck_engine::{AuthError, Identity};
use serde::Serialize;

use super::PasswordHash;
use crate::error::Result;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

/// Persistent accounts plus bearer-token sessions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account. Fails with [`AuthError::EmailInUse`] for a taken email.
    async fn create(&self, email: &str, password: &str) -> Result<Account>;

    /// Check credentials. Fails with [`AuthError::InvalidCredentials`].
    async fn verify(&self, email: &str, password: &str) -> Result<Account>;

    /// Start a session for `uid` and return its bearer token.
    async fn open_session(&self, uid: &str) -> Result<String>;

    /// Look up the account behind a bearer token.
    async fn resolve_session(&self, token: &str) -> Result<Option<Account>>;

    /// End a session. Unknown tokens are ignored.
    async fn close_session(&self, token: &str) -> Result<()>;
}

/// New random identifier for uids and tokens.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug)]
struct StoredAccount {
    account: Account,
    password: PasswordHash,
}

/// Accounts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryAccounts {
    by_email: DashMap<String, StoredAccount>,
    /// uid -> email
    emails: DashMap<String, String>,
    /// token -> uid
    sessions: DashMap<String, String>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn create(&self, email: &str, password: &str) -> Result<Account> {
        match self.by_email.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AuthError::EmailInUse(email.to_string()).into()),
            Entry::Vacant(slot) => {
                let account = Account {
                    uid: new_id(),
                    email: email.to_string(),
                    created_at: Utc::now(),
                };
                self.emails.insert(account.uid.clone(), account.email.clone());
                slot.insert(StoredAccount {
                    account: account.clone(),
                    password: PasswordHash::generate(password),
                });
                Ok(account)
            }
        }
    }

    async fn verify(&self, email: &str, password: &str) -> Result<Account> {
        match self.by_email.get(email) {
            Some(stored) if stored.password.verify(password) => Ok(stored.account.clone()),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    async fn open_session(&self, uid: &str) -> Result<String> {
        let token = new_id();
        self.sessions.insert(token.clone(), uid.to_string());
        Ok(token)
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<Account>> {
        let Some(uid) = self.sessions.get(token).map(|uid| uid.clone()) else {
            return Ok(None);
        };
        let Some(email) = self.emails.get(&uid).map(|email| email.clone()) else {
            return Ok(None);
        };
        Ok(self
            .by_email
            .get(&email)
            .map(|stored| stored.account.clone()))
    }

    async fn close_session(&self, token: &str) -> Result<()> {
        self.sessions.remove(token);
        Ok(())
    }
}
