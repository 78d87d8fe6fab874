use anyhow::anyhow;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;

use crate::error::ApiError;
use crate::handlers::is_htmx;
use crate::handlers::views::{banner_view, BannerView, BoardScope, BoardView};
use crate::manage::{BoardFilter, BookingBoard};
use crate::models::{Banner, BookingStats, ProfileUpdate, RecordKey, RecordStatus, RecordType};
use crate::services::inflight::record_key;
use crate::session::{expire, store_user, AuthUser};
use crate::AppState;

#[derive(Template)]
#[template(path = "partials/board.html")]
pub struct BoardTemplate {
    pub board: BoardView,
    pub banner: Option<BannerView>,
}

pub struct StatsView {
    pub total: u64,
    pub inquiries: u64,
    pub confirmed: u64,
    pub pending: u64,
    pub amount_paid: String,
}

impl From<&BookingStats> for StatsView {
    fn from(stats: &BookingStats) -> Self {
        Self {
            total: stats.total,
            inquiries: stats.inquiries,
            confirmed: stats.confirmed,
            pending: stats.pending,
            amount_paid: stats.amount_paid.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub name: String,
    pub initials: String,
    pub email: String,
    pub phone: String,
    pub company_name: String,
    pub stats: StatsView,
    pub board: BoardView,
    pub banner: Option<BannerView>,
}

#[derive(Template)]
#[template(path = "partials/banner.html")]
pub struct BannerTemplate {
    pub banner: Option<BannerView>,
}

/// Row status change, posted from a board. The filter fields carry the
/// board's current filter so the re-rendered fragment keeps it.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub filter_status: Option<String>,
    #[serde(default)]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl StatusForm {
    pub fn status(&self) -> Result<RecordStatus, AppError> {
        let record_type = RecordType::parse(&self.record_type).ok_or_else(|| {
            AppError::BadRequest(anyhow!("unknown record type '{}'", self.record_type))
        })?;
        RecordStatus::parse(record_type, &self.status).map_err(|e| AppError::BadRequest(anyhow!(e)))
    }

    pub fn filter(&self) -> BoardFilter {
        BoardFilter {
            status: self.filter_status.clone(),
            kind: self.filter_type.clone(),
            q: self.q.clone(),
            page: None,
        }
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Query(filter): Query<BoardFilter>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    let (bookings, stats) = tokio::join!(
        state.api.user_bookings(&user.token),
        state.api.user_booking_stats(&user.token)
    );

    let auth_failed = [bookings.as_ref().err(), stats.as_ref().err()]
        .into_iter()
        .flatten()
        .any(ApiError::is_auth_failure);
    if auth_failed {
        return Ok(expire(&user.session, &state, &headers).await);
    }

    let mut banner = None;
    let board = match bookings {
        Ok(page) => BookingBoard::new(page.records, page.total),
        Err(e) => {
            tracing::warn!(user_id = %user.profile.id, error = %e, "Failed to load bookings");
            banner = Some(Banner::error(ui, e.user_message()));
            BookingBoard::new(Vec::new(), 0)
        }
    }
    .with_filter(filter);
    let stats = stats.unwrap_or_else(|e| {
        tracing::warn!(user_id = %user.profile.id, error = %e, "Failed to load booking stats");
        BookingStats::default()
    });

    let board = BoardView::new(&board, BoardScope::User, ui);
    let banner = banner_view(banner.as_ref());
    if is_htmx(&headers) {
        return Ok(BoardTemplate { board, banner }.into_response());
    }

    let profile = &user.profile;
    Ok(DashboardTemplate {
        name: profile.display_name(),
        initials: profile.initials(),
        email: profile.email.clone(),
        phone: profile.phone.clone().unwrap_or_default(),
        company_name: profile.company_name.clone().unwrap_or_default(),
        stats: StatsView::from(&stats),
        board,
        banner,
    }
    .into_response())
}

/// `POST /dashboard/bookings/:id/status`: optimistic update of the user's own
/// record. A failed call restores the previous status and flags the row.
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    let status = form.status()?;
    let key = RecordKey::new(status.record_type(), id.as_str());
    let Some(_guard) = state.inflight.try_acquire(record_key(&key)) else {
        return Err(AppError::Conflict(anyhow!("booking {} is already being updated", key)));
    };

    let page = match state.api.user_bookings(&user.token).await {
        Ok(page) => page,
        Err(e) if e.is_auth_failure() => return Ok(expire(&user.session, &state, &headers).await),
        Err(e) => return Err(e.into()),
    };
    let mut board = BookingBoard::new(page.records, page.total).with_filter(form.filter());
    let change = board.begin_status_change(&id, status)?;

    let banner = match state
        .api
        .update_user_booking_status(&user.token, &id, status)
        .await
    {
        Ok(()) => {
            board.confirm(change);
            Banner::success(ui, format!("Status updated to {}", status))
        }
        Err(e) if e.is_auth_failure() => {
            board.rollback(change);
            return Ok(expire(&user.session, &state, &headers).await);
        }
        Err(e) => {
            board.rollback(change);
            Banner::error(ui, e.user_message())
        }
    };

    Ok(BoardTemplate {
        board: BoardView::new(&board, BoardScope::User, ui),
        banner: Some(BannerView::from(&banner)),
    }
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, rename = "companyName")]
    pub company_name: String,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        let present = |value: String| {
            let value = value.trim().to_string();
            (!value.is_empty()).then_some(value)
        };
        ProfileUpdate {
            name: present(form.name),
            phone: present(form.phone),
            company_name: present(form.company_name),
        }
    }
}

/// `POST /profile`
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    let update = ProfileUpdate::from(form);

    let banner = match state
        .api
        .update_user(&user.token, &user.profile.id, &update)
        .await
    {
        Ok(updated) => {
            let profile = updated.unwrap_or_else(|| {
                let mut profile = user.profile.clone();
                if let Some(name) = &update.name {
                    profile.name = name.clone();
                }
                if update.phone.is_some() {
                    profile.phone = update.phone.clone();
                }
                if update.company_name.is_some() {
                    profile.company_name = update.company_name.clone();
                }
                profile
            });
            store_user(&user.session, &profile).await?;
            tracing::info!(user_id = %profile.id, "Profile updated");
            Banner::success(ui, "Profile updated")
        }
        Err(e) if e.is_auth_failure() => return Ok(expire(&user.session, &state, &headers).await),
        Err(e) => {
            tracing::warn!(user_id = %user.profile.id, error = %e, "Profile update failed");
            Banner::error(ui, e.user_message())
        }
    };

    Ok(BannerTemplate {
        banner: Some(BannerView::from(&banner)),
    }
    .into_response())
}
