//! Account routes.

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};

use crate::auth::{Account, AuthUser};
use crate::error::Result;
use crate::handlers::{handle_register, handle_sign_in, CredentialsRequest, SessionResponse};
use crate::AppState;

/// Create account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/signin", post(sign_in_handler))
        .route("/auth/signout", post(sign_out_handler))
        .route("/auth/me", get(me_handler))
}

/// POST /auth/register - Create an account and sign in.
async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let session = handle_register(state.accounts.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/signin - Start a session.
async fn sign_in_handler(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    let session = handle_sign_in(state.accounts.as_ref(), request).await?;
    Ok(Json(session))
}

/// POST /auth/signout - End the caller's session.
async fn sign_out_handler(State(state): State<AppState>, user: AuthUser) -> Result<StatusCode> {
    state.accounts.close_session(&user.token).await?;
    tracing::info!(uid = %user.uid(), "Signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me - The signed-in account.
async fn me_handler(user: AuthUser) -> Json<Account> {
    Json(user.account)
}
