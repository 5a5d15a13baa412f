use axum::{
    extract::{Json, State},
    http::header,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::{expired_cookie, session_cookie, AdminAuth, ADMIN_TOKEN_COOKIE};
use crate::errors::ApiError;
use crate::handlers::common::{success_response, validate_input};
use crate::services::customers::LoginInput;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let session = state.services.customers.admin_login(payload).await?;
    let cookie = session_cookie(
        ADMIN_TOKEN_COOKIE,
        &session.token.token,
        session.token.expires_in,
        state.config.is_production(),
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        success_response(serde_json::json!({
            "admin": session.admin,
            "token": session.token.token,
            "expires_in": session.token.expires_in,
        })),
    ))
}

async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = expired_cookie(ADMIN_TOKEN_COOKIE, state.config.is_production());
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        success_response(serde_json::json!({ "logged_out": true })),
    )
}

async fn me(
    State(state): State<Arc<AppState>>,
    AdminAuth(admin): AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.services.customers.admin_me(admin.id).await?;
    Ok(success_response(profile))
}
