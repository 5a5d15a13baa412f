//! Storefront account endpoints: registration, login/logout, and the
//! signed-in customer's own profile.

use axum::{
    extract::{Json, State},
    http::header,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::{expired_cookie, session_cookie, CustomerAuth, CUSTOMER_TOKEN_COOKIE};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, validate_input};
use crate::services::customers::{
    CustomerSession, LoginInput, RegisterCustomerInput, UpdateProfileInput,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).patch(update_profile))
}

/// New accounts start `pending`; the session cookie is issued right
/// away so the applicant can watch their review status.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCustomerInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let session = state.services.customers.register(payload).await?;
    Ok(session_response(&state, session, true))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let session = state.services.customers.login(payload).await?;
    Ok(session_response(&state, session, false))
}

async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = expired_cookie(CUSTOMER_TOKEN_COOKIE, state.config.is_production());
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        success_response(serde_json::json!({ "logged_out": true })),
    )
}

async fn me(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.services.customers.me(customer.id).await?;
    Ok(success_response(profile))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    CustomerAuth(customer): CustomerAuth,
    Json(payload): Json<UpdateProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let profile = state
        .services
        .customers
        .update_profile(customer.id, payload)
        .await?;
    Ok(success_response(profile))
}

/// Session token travels both in the HttpOnly cookie (browser clients)
/// and in the body (API clients using the bearer header).
fn session_response(
    state: &AppState,
    session: CustomerSession,
    created: bool,
) -> impl IntoResponse {
    let cookie = session_cookie(
        CUSTOMER_TOKEN_COOKIE,
        &session.token.token,
        session.token.expires_in,
        state.config.is_production(),
    );
    let body = serde_json::json!({
        "customer": session.customer,
        "token": session.token.token,
        "expires_in": session.token.expires_in,
    });
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        if created {
            created_response(body)
        } else {
            success_response(body)
        },
    )
}
