use askama::Template;
use axum::{extract::State, response::IntoResponse};

use crate::handlers::views::{FilterForm, ResultsView};
use crate::models::Filter;
use crate::AppState;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub filter: FilterForm,
    pub fetch_all: bool,
    pub results: ResultsView,
    pub loaded: bool,
}

/// Landing page. Results load through the search fragment once the page is up.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    IndexTemplate {
        filter: FilterForm::from(&Filter::default()),
        fetch_all: false,
        results: ResultsView::empty(state.settings.ui.page_size),
        loaded: false,
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
