use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::handlers::{admin, app, auth, dashboard, filters, inquiry, metrics, partner, search};
use crate::middleware::metrics_middleware;
use crate::session::SESSION_IDLE_SECS;
use crate::AppState;

/// Room for the text parts that travel with an attachment.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.settings.server.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(SESSION_IDLE_SECS as i64)));
    let body_limit = state.settings.ui.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(app::index))
        .route("/health", get(app::health_check))
        .route("/metrics", get(metrics::metrics))
        // Search
        .route("/warehouses", get(search::warehouses))
        .route("/warehouses/:id", get(search::warehouse_details))
        .route("/warehouses/:id/view", post(search::view_details))
        .route("/cities/suggest", get(search::city_suggestions))
        .route("/filters/range", get(filters::range_drag))
        // Inquiry form
        .route(
            "/contact",
            get(inquiry::contact_page).post(inquiry::submit_contact),
        )
        .route(
            "/contact/details",
            get(inquiry::details_page).post(inquiry::submit_details),
        )
        .route("/contact/fields", get(inquiry::type_fields))
        // Account
        .route("/login", get(auth::login_page).post(auth::login_handler))
        .route("/logout", get(auth::logout_handler).post(auth::logout_handler))
        .route("/profile", post(dashboard::update_profile))
        // Booking management
        .route("/dashboard", get(dashboard::dashboard))
        .route(
            "/dashboard/bookings/:id/status",
            post(dashboard::update_status),
        )
        .route("/admin", get(admin::admin_dashboard))
        .route("/admin/bookings/bulk-status", post(admin::bulk_status))
        .route("/admin/bookings/:id/status", post(admin::update_status))
        .route("/admin/bookings/:id/delete", post(admin::delete_booking))
        .route("/partner/inquiries", get(partner::inquiries))
        .route(
            "/partner/inquiries/:id/status",
            post(partner::update_status),
        )
        .route_layer(from_fn(metrics_middleware))
        .nest_service("/static", ServeDir::new("warehouse-frontend/static"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
