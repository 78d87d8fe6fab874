use askama::Template;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;
use tower_sessions::Session;

use crate::handlers::redirect_to;
use crate::models::{Role, UserProfile};
use crate::session::{load_access_token, store_login, teardown};
use crate::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

#[derive(Template)]
#[template(path = "partials/form_error.html")]
pub struct FormErrorTemplate {
    pub message: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret<String>,
}

pub async fn login_page() -> impl IntoResponse {
    LoginTemplate {}
}

fn landing_page(user: Option<&UserProfile>) -> &'static str {
    match user.map(|u| u.role) {
        Some(Role::Admin) => "/admin",
        Some(Role::Partner) => "/partner/inquiries",
        _ => "/dashboard",
    }
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(payload): Form<LoginRequest>,
) -> Result<Response, AppError> {
    let email = payload.email.trim();
    let login = match state.api.login(email, &payload.password).await {
        Ok(login) => login,
        Err(e) => {
            tracing::warn!(email = %email, error = %e, "Login failed");
            let message = if e.is_auth_failure() {
                "Invalid email or password".to_string()
            } else {
                e.user_message()
            };
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                FormErrorTemplate { message },
            )
                .into_response());
        }
    };

    let user = match login.user {
        Some(user) => Some(user),
        None => match state.api.me(&login.token).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Could not load profile after login");
                None
            }
        },
    };

    store_login(&session, &login.token, user.as_ref()).await?;
    if let Some(user) = &user {
        tracing::info!(user_id = %user.id, role = ?user.role, "User logged in");
    }

    Ok(redirect_to(&headers, landing_page(user.as_ref())))
}

/// Revoke upstream when possible; the local session goes regardless.
pub async fn logout_handler(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = load_access_token(&session).await? {
        if let Err(e) = state.api.logout(&token).await {
            tracing::error!(error = %e, "Failed to revoke token during logout");
        } else {
            tracing::info!("Token revoked successfully");
        }
    }

    teardown(&session, &state).await;
    Ok(redirect_to(&headers, "/"))
}
