//! Database operations for the accounts and sessions tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventdeck_engine::AuthError;
use sqlx::{PgPool, Row};

use crate::auth::{new_id, Account, AccountStore, PasswordHash};
use crate::error::Result;

/// A stored account row from the database.
#[derive(Debug)]
struct StoredAccount {
    uid: String,
    email: String,
    password_hash: Vec<u8>,
    salt: Vec<u8>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredAccount {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredAccount {
            uid: row.try_get("uid")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            salt: row.try_get("salt")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl StoredAccount {
    fn to_account(&self) -> Account {
        Account {
            uid: self.uid.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    fn password(&self) -> PasswordHash {
        PasswordHash {
            salt: self.salt.clone(),
            hash: self.password_hash.clone(),
        }
    }
}

/// Accounts persisted in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccounts {
    async fn create(&self, email: &str, password: &str) -> Result<Account> {
        let uid = new_id();
        let password = PasswordHash::generate(password);

        let inserted = sqlx::query(
            r#"
            INSERT INTO accounts (uid, email, password_hash, salt)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(&uid)
        .bind(email)
        .bind(&password.hash)
        .bind(&password.salt)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(Account {
                uid,
                email: email.to_string(),
                created_at: row.try_get("created_at")?,
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuthError::EmailInUse(email.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn verify(&self, email: &str, password: &str) -> Result<Account> {
        let stored: Option<StoredAccount> = sqlx::query_as(
            r#"
            SELECT uid, email, password_hash, salt, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match stored {
            Some(stored) if stored.password().verify(password) => Ok(stored.to_account()),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    async fn open_session(&self, uid: &str) -> Result<String> {
        let token = new_id();
        sqlx::query("INSERT INTO sessions (token, uid) VALUES ($1, $2)")
            .bind(&token)
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    async fn resolve_session(&self, token: &str) -> Result<Option<Account>> {
        let stored: Option<StoredAccount> = sqlx::query_as(
            r#"
            SELECT a.uid, a.email, a.password_hash, a.salt, a.created_at
            FROM sessions s
            JOIN accounts a ON a.uid = s.uid
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stored.map(|stored| stored.to_account()))
    }

    async fn close_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
