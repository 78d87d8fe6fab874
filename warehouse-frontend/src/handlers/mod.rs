pub mod admin;
pub mod app;
pub mod auth;
pub mod dashboard;
pub mod filters;
pub mod inquiry;
pub mod metrics;
pub mod partner;
pub mod search;
pub mod views;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};

pub const HX_REQUEST: &str = "hx-request";
pub const HX_REDIRECT: &str = "hx-redirect";

pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true")
}

/// HTMX requests get `HX-Redirect`; plain navigation gets a 303.
pub fn redirect_to(headers: &HeaderMap, location: &str) -> Response {
    if is_htmx(headers) {
        match HeaderValue::from_str(location) {
            Ok(value) => {
                let mut response = StatusCode::OK.into_response();
                response.headers_mut().insert(HX_REDIRECT, value);
                response
            }
            Err(_) => Redirect::to("/").into_response(),
        }
    } else {
        Redirect::to(location).into_response()
    }
}
