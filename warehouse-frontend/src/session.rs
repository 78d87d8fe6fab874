//! Server-side session context.
//!
//! The bearer token lives under one key, [`ACCESS_TOKEN_KEY`]. Sessions written
//! by older builds stored it under one of [`LEGACY_TOKEN_KEYS`]; the first
//! read moves it to the canonical key and deletes the old entries.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use std::fmt;
use tower_sessions::Session;

use crate::handlers::redirect_to;
use crate::models::{Role, UserProfile};
use crate::AppState;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const LEGACY_TOKEN_KEYS: [&str; 4] = ["token", "authToken", "adminToken", "partnerToken"];
const USER_KEY: &str = "user";
const CLIENT_KEY: &str = "client_key";

/// A session ends after this long without a request. Per-session registries
/// use the same window.
pub const SESSION_IDLE_SECS: u64 = 24 * 60 * 60;

/// Bearer token for the marketplace API.
pub struct AccessToken(Secret<String>);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Secret::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

pub fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("session store error: {}", err))
}

/// Read the token, migrating a legacy key on the way.
pub async fn load_access_token(session: &Session) -> Result<Option<AccessToken>, AppError> {
    let mut token = session
        .get::<String>(ACCESS_TOKEN_KEY)
        .await
        .map_err(session_error)?
        .filter(|t| !t.is_empty());

    let mut migrated = false;
    for key in LEGACY_TOKEN_KEYS {
        let legacy = session.remove::<String>(key).await.map_err(session_error)?;
        if token.is_none() {
            if let Some(value) = legacy.filter(|t| !t.is_empty()) {
                tracing::info!(legacy_key = key, "Migrating session token to canonical key");
                token = Some(value);
                migrated = true;
            }
        }
    }

    if migrated {
        if let Some(value) = &token {
            session
                .insert(ACCESS_TOKEN_KEY, value)
                .await
                .map_err(session_error)?;
        }
    }

    Ok(token.map(AccessToken::new))
}

pub async fn store_login(
    session: &Session,
    token: &AccessToken,
    user: Option<&UserProfile>,
) -> Result<(), AppError> {
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(ACCESS_TOKEN_KEY, token.expose())
        .await
        .map_err(session_error)?;
    if let Some(user) = user {
        store_user(session, user).await?;
    }
    Ok(())
}

pub async fn store_user(session: &Session, user: &UserProfile) -> Result<(), AppError> {
    session.insert(USER_KEY, user).await.map_err(session_error)
}

pub async fn cached_user(session: &Session) -> Result<Option<UserProfile>, AppError> {
    session.get(USER_KEY).await.map_err(session_error)
}

/// Stable per-session key for the feed, debounce and in-flight registries.
pub async fn client_key(session: &Session) -> Result<String, AppError> {
    if let Some(key) = session
        .get::<String>(CLIENT_KEY)
        .await
        .map_err(session_error)?
    {
        return Ok(key);
    }
    let key = uuid::Uuid::new_v4().to_string();
    session
        .insert(CLIENT_KEY, &key)
        .await
        .map_err(session_error)?;
    Ok(key)
}

/// Drop everything held for this session, here and in shared registries.
pub async fn teardown(session: &Session, state: &AppState) {
    if let Ok(Some(key)) = session.get::<String>(CLIENT_KEY).await {
        state.feeds.remove(&key);
        state.suggestions.forget(&key);
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
}

/// Tear the session down and send the browser home.
pub async fn expire(session: &Session, state: &AppState, headers: &HeaderMap) -> Response {
    tracing::info!("Marketplace API rejected session token, logging out");
    teardown(session, state).await;
    redirect_to(headers, "/")
}

/// A request with a valid session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub token: AccessToken,
    pub profile: UserProfile,
    pub client_key: String,
    pub session: Session,
}

#[derive(Debug)]
pub enum AuthRejection {
    /// No token in the session.
    Login(HeaderMap),
    /// Token refused upstream; session already torn down.
    Expired(HeaderMap),
    WrongRole(HeaderMap),
    Internal(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Login(headers) => redirect_to(&headers, "/login"),
            AuthRejection::Expired(headers) | AuthRejection::WrongRole(headers) => {
                redirect_to(&headers, "/")
            }
            AuthRejection::Internal(err) => err.into_response(),
        }
    }
}

impl From<AppError> for AuthRejection {
    fn from(err: AppError) -> Self {
        AuthRejection::Internal(err)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::InternalError(anyhow::anyhow!(msg)))?;

        let Some(token) = load_access_token(&session).await? else {
            return Err(AuthRejection::Login(parts.headers.clone()));
        };

        let profile = match cached_user(&session).await? {
            Some(profile) => profile,
            None => match state.api.me(&token).await {
                Ok(profile) => {
                    store_user(&session, &profile).await?;
                    profile
                }
                Err(e) if e.is_auth_failure() => {
                    teardown(&session, state).await;
                    return Err(AuthRejection::Expired(parts.headers.clone()));
                }
                Err(e) => return Err(AuthRejection::Internal(e.into())),
            },
        };

        let client_key = client_key(&session).await?;
        Ok(AuthUser {
            token,
            profile,
            client_key,
            session,
        })
    }
}

/// [`AuthUser`] whose role is admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.profile.role != Role::Admin {
            tracing::warn!(user_id = %user.profile.id, "Non-admin requested admin view");
            return Err(AuthRejection::WrongRole(parts.headers.clone()));
        }
        Ok(AdminUser(user))
    }
}

/// [`AuthUser`] whose role is partner (admins may act as partners).
#[derive(Debug, Clone)]
pub struct PartnerUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for PartnerUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !matches!(user.profile.role, Role::Partner | Role::Admin) {
            tracing::warn!(user_id = %user.profile.id, "Non-partner requested partner view");
            return Err(AuthRejection::WrongRole(parts.headers.clone()));
        }
        Ok(PartnerUser(user))
    }
}
