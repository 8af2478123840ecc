//! Authentication extractors.
//!
//! Requests carry `Authorization: Bearer <token>`, where the token was issued
//! by sign-in or registration and is resolved against the account store.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::Account;
use crate::error::AppError;
use crate::AppState;

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The bearer token the request was made with
    pub token: String,
    pub account: Account,
}

impl AuthUser {
    pub fn uid(&self) -> &str {
        &self.account.uid
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| AppError::Unauthorized)?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Unauthorized),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AppError::Unauthorized)?;

        match state.accounts.resolve_session(token).await? {
            Some(account) => Ok(AuthUser {
                token: token.to_string(),
                account,
            }),
            None => {
                tracing::debug!("Rejected unknown bearer token");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Optional authenticated user.
///
/// A missing header yields `None`; a malformed or unknown token is still
/// rejected.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn uid(&self) -> Option<&str> {
        self.0.as_ref().map(AuthUser::uid)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.contains_key(AUTHORIZATION) {
            AuthUser::from_request_parts(parts, state)
                .await
                .map(|user| MaybeAuthUser(Some(user)))
        } else {
            Ok(MaybeAuthUser(None))
        }
    }
}
