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

use crate::handlers::is_htmx;
use crate::handlers::views::{banner_view, BannerView, PartnerRowView};
use crate::models::{Banner, PartnerInquiry, PartnerInquiryStatus};
use crate::services::inflight::partner_inquiry_key;
use crate::services::InquiryScope;
use crate::session::{expire, PartnerUser};
use crate::AppState;

#[derive(Template)]
#[template(path = "partials/partner_list.html")]
pub struct PartnerListTemplate {
    pub scope: &'static str,
    pub rows: Vec<PartnerRowView>,
    pub banner: Option<BannerView>,
}

#[derive(Template)]
#[template(path = "partner.html")]
pub struct PartnerTemplate {
    pub name: String,
    pub scope: &'static str,
    pub rows: Vec<PartnerRowView>,
    pub banner: Option<BannerView>,
}

fn scope_name(scope: InquiryScope) -> &'static str {
    match scope {
        InquiryScope::Assigned => "assigned",
        InquiryScope::Unallocated => "unallocated",
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PartnerQuery {
    pub scope: Option<String>,
    pub status: Option<String>,
}

fn visible_rows(
    inquiries: &[PartnerInquiry],
    status: Option<PartnerInquiryStatus>,
    failed: Option<&str>,
    state: &AppState,
) -> Vec<PartnerRowView> {
    inquiries
        .iter()
        .filter(|inquiry| status.map_or(true, |s| inquiry.status == s))
        .map(|inquiry| {
            PartnerRowView::new(inquiry, failed == Some(inquiry.id.as_str()), &state.settings.ui)
        })
        .collect()
}

/// `GET /partner/inquiries?scope=assigned|unallocated&status=`
pub async fn inquiries(
    State(state): State<AppState>,
    PartnerUser(user): PartnerUser,
    headers: HeaderMap,
    Query(query): Query<PartnerQuery>,
) -> Result<Response, AppError> {
    let scope = InquiryScope::parse(query.scope.as_deref());
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| s.parse::<PartnerInquiryStatus>().ok());

    let mut banner = None;
    let inquiries = match state.api.partner_inquiries(&user.token, scope).await {
        Ok(inquiries) => inquiries,
        Err(e) if e.is_auth_failure() => return Ok(expire(&user.session, &state, &headers).await),
        Err(e) => {
            tracing::warn!(error = %e, scope = scope_name(scope), "Failed to load partner inquiries");
            banner = Some(Banner::error(&state.settings.ui, e.user_message()));
            Vec::new()
        }
    };

    let rows = visible_rows(&inquiries, status, None, &state);
    let banner = banner_view(banner.as_ref());
    if is_htmx(&headers) {
        return Ok(PartnerListTemplate {
            scope: scope_name(scope),
            rows,
            banner,
        }
        .into_response());
    }
    Ok(PartnerTemplate {
        name: user.profile.display_name(),
        scope: scope_name(scope),
        rows,
        banner,
    }
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct PartnerStatusForm {
    pub status: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// `POST /partner/inquiries/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    PartnerUser(user): PartnerUser,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<PartnerStatusForm>,
) -> Result<Response, AppError> {
    let ui = &state.settings.ui;
    let status: PartnerInquiryStatus = form
        .status
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow!(e)))?;
    let scope = InquiryScope::parse(form.scope.as_deref());
    let Some(_guard) = state.inflight.try_acquire(partner_inquiry_key(&id)) else {
        return Err(AppError::Conflict(anyhow!("inquiry {} is already being updated", id)));
    };

    let mut inquiries = match state.api.partner_inquiries(&user.token, scope).await {
        Ok(inquiries) => inquiries,
        Err(e) if e.is_auth_failure() => return Ok(expire(&user.session, &state, &headers).await),
        Err(e) => return Err(e.into()),
    };
    let Some(index) = inquiries.iter().position(|inquiry| inquiry.id == id) else {
        return Err(AppError::NotFound(anyhow!("inquiry {} not found", id)));
    };
    let previous = std::mem::replace(&mut inquiries[index].status, status);

    let (banner, failed) = match state
        .api
        .update_partner_inquiry_status(&user.token, &id, status)
        .await
    {
        Ok(()) => (
            Banner::success(ui, format!("Inquiry marked {}", status.label())),
            None,
        ),
        Err(e) if e.is_auth_failure() => return Ok(expire(&user.session, &state, &headers).await),
        Err(e) => {
            tracing::warn!(inquiry_id = %id, error = %e, "Partner status update failed");
            inquiries[index].status = previous;
            (Banner::error(ui, e.user_message()), Some(id.as_str()))
        }
    };

    Ok(PartnerListTemplate {
        scope: scope_name(scope),
        rows: visible_rows(&inquiries, None, failed, &state),
        banner: Some(BannerView::from(&banner)),
    }
    .into_response())
}
