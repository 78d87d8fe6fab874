pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod manage;
pub mod middleware;
pub mod models;
pub mod search;
pub mod services;
pub mod session;
pub mod startup;
pub mod text;
pub mod widgets;

use config::Settings;
use search::{Debouncer, SearchFeeds};
use services::{InFlight, MarketplaceClient};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state: the API client plus per-session registries.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub api: Arc<MarketplaceClient>,
    pub feeds: Arc<SearchFeeds>,
    pub suggestions: Arc<Debouncer>,
    pub inflight: Arc<InFlight>,
}

impl AppState {
    pub fn new(settings: Settings, api: MarketplaceClient) -> Self {
        Self {
            feeds: Arc::new(SearchFeeds::new(
                settings.ui.page_size,
                Duration::from_secs(session::SESSION_IDLE_SECS),
            )),
            suggestions: Arc::new(Debouncer::new(settings.ui.suggestion_debounce())),
            inflight: Arc::new(InFlight::new()),
            api: Arc::new(api),
            settings: Arc::new(settings),
        }
    }
}
