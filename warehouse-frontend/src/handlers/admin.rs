use anyhow::anyhow;
use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;

use crate::handlers::dashboard::{BannerTemplate, BoardTemplate, StatusForm};
use crate::handlers::is_htmx;
use crate::handlers::views::{banner_view, BannerView, BoardScope, BoardView};
use crate::manage::{BoardFilter, BookingBoard};
use crate::models::{Banner, RecordKey, RecordStatus, RecordType};
use crate::services::inflight::record_key;
use crate::services::{BookingPage, InFlightGuard};
use crate::session::{expire, AdminUser, AuthUser};
use crate::AppState;

/// Word the admin types to confirm a deletion.
pub const DELETE_CONFIRMATION: &str = "DELETE";

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub name: String,
    pub board: BoardView,
    pub banner: Option<BannerView>,
}

enum Loaded {
    Page(BookingPage),
    Expired(Response),
}

async fn load_bookings(
    state: &AppState,
    user: &AuthUser,
    headers: &HeaderMap,
) -> Result<Loaded, AppError> {
    match state.api.admin_bookings(&user.token).await {
        Ok(page) => Ok(Loaded::Page(page)),
        Err(e) if e.is_auth_failure() => Ok(Loaded::Expired(
            expire(&user.session, state, headers).await,
        )),
        Err(e) => Err(e.into()),
    }
}

fn board_fragment(board: &BookingBoard, state: &AppState, banner: &Banner) -> Response {
    BoardTemplate {
        board: BoardView::new(board, BoardScope::Admin, &state.settings.ui),
        banner: Some(BannerView::from(banner)),
    }
    .into_response()
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    headers: HeaderMap,
    Query(filter): Query<BoardFilter>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    let mut banner = None;
    let board = match state.api.admin_bookings(&user.token).await {
        Ok(page) => BookingBoard::new(page.records, page.total),
        Err(e) if e.is_auth_failure() => return Ok(expire(&user.session, &state, &headers).await),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load admin bookings");
            banner = Some(Banner::error(ui, e.user_message()));
            BookingBoard::new(Vec::new(), 0)
        }
    }
    .with_filter(filter);

    let board = BoardView::new(&board, BoardScope::Admin, ui);
    let banner = banner_view(banner.as_ref());
    if is_htmx(&headers) {
        return Ok(BoardTemplate { board, banner }.into_response());
    }
    Ok(AdminTemplate {
        name: user.profile.display_name(),
        board,
        banner,
    }
    .into_response())
}

/// `POST /admin/bookings/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
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

    let page = match load_bookings(&state, &user, &headers).await? {
        Loaded::Page(page) => page,
        Loaded::Expired(response) => return Ok(response),
    };
    let mut board = BookingBoard::new(page.records, page.total).with_filter(form.filter());
    let change = board.begin_status_change(&id, status)?;

    let banner = match state.api.admin_update_status(&user.token, &id, status).await {
        Ok(()) => {
            board.confirm(change);
            tracing::info!(booking = %key, status = %status, "Admin updated booking status");
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
    Ok(board_fragment(&board, &state, &banner))
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub confirm: String,
    /// Type of the row the form belongs to. Ids repeat across types.
    #[serde(default, rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub filter_status: Option<String>,
    #[serde(default)]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

/// `POST /admin/bookings/:id/delete`. The record leaves the board at once and
/// is put back in place if the API refuses.
pub async fn delete_booking(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    if form.confirm.trim() != DELETE_CONFIRMATION {
        let banner = Banner::error(
            ui,
            format!("Type {} to confirm the deletion", DELETE_CONFIRMATION),
        );
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            [("HX-Retarget", "#board-banner"), ("HX-Reswap", "innerHTML")],
            BannerTemplate {
                banner: Some(BannerView::from(&banner)),
            },
        )
            .into_response());
    }

    let record_type = RecordType::parse(&form.record_type).ok_or_else(|| {
        AppError::BadRequest(anyhow!("unknown record type '{}'", form.record_type))
    })?;
    let key = RecordKey::new(record_type, id);
    let Some(_guard) = state.inflight.try_acquire(record_key(&key)) else {
        return Err(AppError::Conflict(anyhow!("booking {} is already being updated", key)));
    };

    let page = match load_bookings(&state, &user, &headers).await? {
        Loaded::Page(page) => page,
        Loaded::Expired(response) => return Ok(response),
    };
    let filter = BoardFilter {
        status: form.filter_status,
        kind: form.filter_type,
        q: form.q,
        page: None,
    };
    let mut board = BookingBoard::new(page.records, page.total).with_filter(filter);
    let pending = board.begin_delete(&key)?;

    let banner = match state
        .api
        .admin_delete_booking(&user.token, &key.id, key.record_type)
        .await
    {
        Ok(()) => {
            board.confirm_delete(pending);
            tracing::info!(booking = %key, "Admin deleted booking");
            Banner::success(ui, "Record deleted")
        }
        Err(e) if e.is_auth_failure() => {
            board.restore(pending);
            return Ok(expire(&user.session, &state, &headers).await);
        }
        Err(e) => {
            board.restore(pending);
            tracing::warn!(booking = %key, error = %e, "Admin delete failed");
            Banner::error(ui, e.user_message())
        }
    };
    Ok(board_fragment(&board, &state, &banner))
}

/// Bulk status form. `ids` repeats once per selected row, each value either
/// `type:id` or a bare id of the form's `type`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BulkForm {
    pub ids: Vec<String>,
    pub status: String,
    pub record_type: String,
    pub filter: BoardFilter,
}

impl BulkForm {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = BulkForm::default();
        for (name, value) in pairs {
            let value = value.trim().to_string();
            match name.as_str() {
                "ids" | "ids[]" if !value.is_empty() && !form.ids.contains(&value) => {
                    form.ids.push(value)
                }
                "status" => form.status = value,
                "type" => form.record_type = value,
                "filter_status" => form.filter.status = Some(value),
                "filter_type" => form.filter.kind = Some(value),
                "q" => form.filter.q = Some(value),
                _ => {}
            }
        }
        form
    }

    fn status(&self) -> Result<RecordStatus, AppError> {
        let record_type = RecordType::parse(&self.record_type).ok_or_else(|| {
            AppError::BadRequest(anyhow!("unknown record type '{}'", self.record_type))
        })?;
        RecordStatus::parse(record_type, &self.status).map_err(|e| AppError::BadRequest(anyhow!(e)))
    }

    /// Selected records, deduplicated. A malformed `type:id` is rejected
    /// rather than guessed.
    fn keys(&self, record_type: RecordType) -> Result<Vec<RecordKey>, AppError> {
        let mut keys: Vec<RecordKey> = Vec::with_capacity(self.ids.len());
        for value in &self.ids {
            let key = if value.contains(':') {
                RecordKey::parse(value)
                    .ok_or_else(|| AppError::BadRequest(anyhow!("malformed record '{}'", value)))?
            } else {
                RecordKey::new(record_type, value.as_str())
            };
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// `POST /admin/bookings/bulk-status`: one status for several records of the
/// same type, applied and reverted together.
pub async fn bulk_status(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    headers: HeaderMap,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    let form = BulkForm::from_pairs(pairs);
    let status = form.status()?;
    let keys = form.keys(status.record_type())?;
    if keys.is_empty() {
        return Err(AppError::Unprocessable("Select at least one record".to_string()));
    }

    let guards: Option<Vec<InFlightGuard>> = keys
        .iter()
        .map(|key| state.inflight.try_acquire(record_key(key)))
        .collect();
    let Some(_guards) = guards else {
        return Err(AppError::Conflict(anyhow!(
            "one of the selected records is already being updated"
        )));
    };

    let page = match load_bookings(&state, &user, &headers).await? {
        Loaded::Page(page) => page,
        Loaded::Expired(response) => return Ok(response),
    };
    let mut board = BookingBoard::new(page.records, page.total).with_filter(form.filter.clone());
    let changes = board.begin_bulk_change(&keys, status)?;
    let ids: Vec<String> = keys.into_iter().map(|key| key.id).collect();

    let banner = match state
        .api
        .admin_bulk_update(&user.token, &ids, status)
        .await
    {
        Ok(()) => {
            let count = changes.len();
            for change in changes {
                board.confirm(change);
            }
            tracing::info!(count, status = %status, "Admin bulk-updated bookings");
            Banner::success(ui, format!("{} records updated to {}", count, status))
        }
        Err(e) => {
            for change in changes {
                board.rollback(change);
            }
            if e.is_auth_failure() {
                return Ok(expire(&user.session, &state, &headers).await);
            }
            Banner::error(ui, e.user_message())
        }
    };
    Ok(board_fragment(&board, &state, &banner))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn bulk_form_collects_repeated_ids() {
        let form = BulkForm::from_pairs(pairs(&[
            ("ids", "b1"),
            ("ids", "b2"),
            ("ids", "b1"),
            ("ids", " "),
            ("status", "resolved"),
            ("type", "inquiry"),
            ("q", "acme"),
        ]));
        assert_eq!(form.ids, vec!["b1", "b2"]);
        assert_eq!(form.filter.q.as_deref(), Some("acme"));
        assert_eq!(form.status().unwrap().as_str(), "resolved");
    }

    #[test]
    fn bulk_form_keys_keep_row_types() {
        let form = BulkForm::from_pairs(pairs(&[
            ("ids", "confirmed:5"),
            ("ids", "7"),
            ("ids", "confirmed:7"),
            ("status", "completed"),
            ("type", "confirmed"),
        ]));
        let keys = form.keys(RecordType::Confirmed).unwrap();
        assert_eq!(
            keys,
            vec![
                RecordKey::new(RecordType::Confirmed, "5"),
                RecordKey::new(RecordType::Confirmed, "7"),
            ]
        );

        let form = BulkForm::from_pairs(pairs(&[("ids", "refund:5"), ("status", "completed"), ("type", "confirmed")]));
        assert!(form.keys(RecordType::Confirmed).is_err());
    }

    #[test]
    fn bulk_form_rejects_status_from_other_vocabulary() {
        let form = BulkForm::from_pairs(pairs(&[("ids", "b1"), ("status", "active"), ("type", "inquiry")]));
        assert!(form.status().is_err());
    }
}
