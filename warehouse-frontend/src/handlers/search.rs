use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use service_core::error::AppError;
use tower_sessions::Session;

use crate::handlers::app::IndexTemplate;
use crate::handlers::views::{FilterForm, ResultsView};
use crate::handlers::{is_htmx, redirect_to};
use crate::models::{Filter, FilterParams};
use crate::search::{FeedUpdate, SuggestionList};
use crate::services::inflight::view_key;
use crate::session::{client_key, expire, load_access_token};
use crate::AppState;

#[derive(Template)]
#[template(path = "partials/results.html")]
pub struct ResultsTemplate {
    pub results: ResultsView,
}

pub struct SuggestionView {
    pub label: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "partials/suggestions.html")]
pub struct SuggestionsTemplate {
    pub items: Vec<SuggestionView>,
    pub open: bool,
}

impl From<SuggestionList> for SuggestionsTemplate {
    fn from(list: SuggestionList) -> Self {
        Self {
            open: list.is_open(),
            items: list
                .items
                .into_iter()
                .map(|label| SuggestionView {
                    href: format!("/warehouses?location={}", urlencoding::encode(&label)),
                    label,
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "warehouse.html")]
pub struct WarehouseTemplate {
    pub id: String,
}

/// `GET /warehouses`: listing fragment (or the full search page without HTMX).
///
/// Responses overtaken by a newer request from the same session answer 204
/// so the browser keeps the newer results.
pub async fn warehouses(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Query(params): Query<FilterParams>,
) -> Result<Response, AppError> {
    let key = client_key(&session).await?;
    let token = load_access_token(&session).await?;
    let filter = Filter::from_params(&params);
    let page = params.page();

    let mut ticket = state
        .feeds
        .begin(&key, |feed| feed.sync(filter, page, token.is_none()));
    // A refetch always asks for a lower page, so this ends.
    let snapshot = loop {
        let auth = if ticket.public { None } else { token.as_ref() };
        let outcome = state.api.list_warehouses(&ticket.query, auth).await;

        if matches!(&outcome, Err(e) if e.is_auth_failure()) {
            return Ok(expire(&session, &state, &headers).await);
        }

        match state.feeds.settle(&key, &ticket, outcome) {
            FeedUpdate::Ready(snapshot) => break snapshot,
            FeedUpdate::Superseded => {
                tracing::debug!(
                    generation = ticket.generation(),
                    "Dropped superseded listing response"
                );
                return Ok(StatusCode::NO_CONTENT.into_response());
            }
            FeedUpdate::Refetch(next) => ticket = next,
        }
    };

    let results = ResultsView::new(&snapshot);
    if is_htmx(&headers) {
        return Ok(ResultsTemplate { results }.into_response());
    }
    Ok(IndexTemplate {
        filter: FilterForm::from(&snapshot.filter),
        fetch_all: snapshot.filter.fetch_all,
        results,
        loaded: true,
    }
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    #[serde(default, alias = "location")]
    pub query: String,
}

/// `GET /cities/suggest`: debounced per session. A keystroke overtaken by a
/// later one answers 204 without calling the API.
pub async fn city_suggestions(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CityQuery>,
) -> Result<Response, AppError> {
    let query = params.query.trim();
    if !SuggestionList::wants_lookup(query) {
        return Ok(SuggestionsTemplate::from(SuggestionList::closed(query)).into_response());
    }

    let key = client_key(&session).await?;
    if !state.suggestions.settle(&key).await {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let list = match state.api.city_suggestions(query).await {
        Ok(cities) => SuggestionList::from_results(query, cities),
        Err(e) => {
            tracing::warn!(error = %e, "City suggestion lookup failed");
            SuggestionList::closed(query)
        }
    };
    Ok(SuggestionsTemplate::from(list).into_response())
}

/// `POST /warehouses/:id/view`: record the view, then navigate to the
/// details page whatever the outcome. Repeat clicks while the first is
/// pending are ignored.
pub async fn view_details(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let key = client_key(&session).await?;
    let Some(_guard) = state.inflight.try_acquire(view_key(&key, &id)) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let token = load_access_token(&session).await?;

    match state.api.track_view(&id, token.as_ref()).await {
        Ok(()) => tracing::debug!(warehouse_id = %id, "View recorded"),
        Err(e) => tracing::warn!(warehouse_id = %id, error = %e, "Failed to record view"),
    }

    Ok(redirect_to(
        &headers,
        &format!("/warehouses/{}", urlencoding::encode(&id)),
    ))
}

pub async fn warehouse_details(Path(id): Path<String>) -> impl IntoResponse {
    WarehouseTemplate { id }
}
