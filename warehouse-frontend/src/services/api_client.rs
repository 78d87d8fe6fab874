//! Client for the marketplace REST API.
//!
//! Every authenticated operation takes the caller's [`AccessToken`]
//! explicitly. Responses use the envelope `{ success, data, total, message }`;
//! `success: false` surfaces as [`ApiError::Rejected`] and 401/403 as
//! [`ApiError::Unauthorized`].

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use service_core::observability::{TracedClientExt, TracedRequest};
use std::borrow::Cow;
use std::time::Duration;

use crate::config::BackendSettings;
use crate::error::ApiError;
use crate::models::booking::records_from_raw;
use crate::models::inquiry::inquiries_from_raw;
use crate::models::{
    BookingRecord, BookingStats, ListingQuery, PartnerInquiry, PartnerInquiryStatus,
    ProfileUpdate, RawBooking, RecordStatus, RecordType, UserProfile, Warehouse,
};
use crate::services::metrics::record_backend_request;
use crate::session::AccessToken;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default, alias = "user")]
    data: Option<T>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    pagination: Option<PageMeta>,
}

impl<T> Envelope<T> {
    fn total(&self) -> Option<u64> {
        self.total
            .or_else(|| self.pagination.as_ref().and_then(|p| p.total))
    }

    fn require_data(self, endpoint: &str) -> Result<T, ApiError> {
        self.data
            .ok_or_else(|| ApiError::Rejected(format!("{} returned no data", endpoint)))
    }
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default)]
    total: Option<u64>,
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub items: Vec<Warehouse>,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingPage {
    pub records: Vec<BookingRecord>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InquiryScope {
    #[default]
    Assigned,
    Unallocated,
}

impl InquiryScope {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("unallocated") => InquiryScope::Unallocated,
            _ => InquiryScope::Assigned,
        }
    }
}

#[derive(Debug)]
pub struct LoginSession {
    pub token: AccessToken,
    pub user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct LoginPayload {
    #[serde(alias = "access_token", alias = "accessToken")]
    token: String,
    #[serde(default)]
    user: Option<UserProfile>,
}

/// City suggestions arrive either as plain names or as `{ city, state }` rows.
#[derive(Deserialize)]
#[serde(untagged)]
enum CityRow {
    Name(String),
    Place {
        #[serde(alias = "name")]
        city: String,
        #[serde(default)]
        state: Option<String>,
    },
}

impl CityRow {
    fn into_label(self) -> String {
        match self {
            CityRow::Name(name) => name,
            CityRow::Place {
                city,
                state: Some(state),
            } if !state.is_empty() => format!("{}, {}", city, state),
            CityRow::Place { city, .. } => city,
        }
    }
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    record_type: Option<&'a str>,
}

#[derive(Serialize)]
struct BulkStatusBody<'a> {
    ids: &'a [String],
    status: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
}

/// Escape `id` into a single path segment. Dot segments are refused since
/// URL normalisation resolves them even when the rest is escaped.
fn id_segment(id: &str) -> Result<Cow<'_, str>, ApiError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ApiError::InvalidId(id.to_string()));
    }
    Ok(urlencoding::encode(id))
}

pub struct MarketplaceClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl MarketplaceClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, ApiError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            timeout: settings.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send `request` and decode the envelope, recording the outcome under
    /// `endpoint`.
    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: TracedRequest,
    ) -> Result<Envelope<T>, ApiError> {
        let value = self.execute_value(endpoint, request).await?;
        serde_json::from_value(value).map_err(|e| {
            record_backend_request(endpoint, "decode");
            ApiError::from(e)
        })
    }

    async fn execute_value(
        &self,
        endpoint: &'static str,
        request: TracedRequest,
    ) -> Result<serde_json::Value, ApiError> {
        let result = self.send_checked(request.timeout(self.timeout)).await;
        match &result {
            Ok(_) => record_backend_request(endpoint, "ok"),
            Err(e) => {
                record_backend_request(endpoint, e.outcome());
                tracing::debug!(endpoint, error = %e, "Marketplace API call failed");
            }
        }
        result
    }

    async fn send_checked(&self, request: TracedRequest) -> Result<serde_json::Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized(status));
        }

        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                message: error_message(&body),
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }

        let value: serde_json::Value = serde_json::from_slice(&body)?;
        if value.get("success") == Some(&serde_json::Value::Bool(false)) {
            let message = value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(ApiError::Rejected(message));
        }
        Ok(value)
    }

    /// `GET /api/public/warehouses` or, with a token, `GET /api/warehouses`.
    pub async fn list_warehouses(
        &self,
        query: &ListingQuery,
        token: Option<&AccessToken>,
    ) -> Result<Listing, ApiError> {
        let path = match token {
            Some(_) => "/api/warehouses",
            None => "/api/public/warehouses",
        };
        let envelope: Envelope<Vec<Warehouse>> = self
            .execute(
                "list_warehouses",
                self.client
                    .traced_get(&self.url(path))
                    .query(query)
                    .bearer_auth_opt(token.map(AccessToken::expose)),
            )
            .await?;

        let total = envelope.total();
        let items = envelope.require_data("list_warehouses")?;
        Ok(Listing {
            total: total.unwrap_or(items.len() as u64),
            items,
        })
    }

    pub async fn track_view(
        &self,
        warehouse_id: &str,
        token: Option<&AccessToken>,
    ) -> Result<(), ApiError> {
        let id = id_segment(warehouse_id)?;
        let path = match token {
            Some(_) => format!("/api/warehouses/{}/view", id),
            None => format!("/api/public/warehouses/{}/view", id),
        };
        self.execute::<serde_json::Value>(
            "track_view",
            self.client
                .traced_post(&self.url(&path))
                .bearer_auth_opt(token.map(AccessToken::expose)),
        )
        .await
        .map(|_| ())
    }

    pub async fn submit_inquiry(&self, form: reqwest::multipart::Form) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(
            "submit_inquiry",
            self.client
                .traced_post(&self.url("/api/public/inquiries"))
                .multipart(form),
        )
        .await
        .map(|_| ())
    }

    pub async fn city_suggestions(&self, query: &str) -> Result<Vec<String>, ApiError> {
        let envelope: Envelope<Vec<CityRow>> = self
            .execute(
                "city_suggestions",
                self.client
                    .traced_get(&self.url("/api/cities"))
                    .query(&[("query", query)]),
            )
            .await?;
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(CityRow::into_label)
            .collect())
    }

    pub async fn user_bookings(&self, token: &AccessToken) -> Result<BookingPage, ApiError> {
        self.booking_page("user_bookings", "/api/bookings", token)
            .await
    }

    pub async fn user_booking_stats(&self, token: &AccessToken) -> Result<BookingStats, ApiError> {
        let envelope: Envelope<BookingStats> = self
            .execute(
                "user_booking_stats",
                self.client
                    .traced_get(&self.url("/api/bookings/stats"))
                    .bearer_auth_opt(Some(token.expose())),
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn update_user_booking_status(
        &self,
        token: &AccessToken,
        booking_id: &str,
        status: RecordStatus,
    ) -> Result<(), ApiError> {
        let body = StatusBody {
            status: status.as_str(),
            record_type: Some(status.record_type().as_str()),
        };
        self.execute::<serde_json::Value>(
            "update_user_booking_status",
            self.client
                .traced_put(&self.url(&format!("/api/bookings/{}/status", id_segment(booking_id)?)))
                .bearer_auth_opt(Some(token.expose()))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    pub async fn admin_bookings(&self, token: &AccessToken) -> Result<BookingPage, ApiError> {
        self.booking_page("admin_bookings", "/admin/bookings", token)
            .await
    }

    pub async fn admin_booking(
        &self,
        token: &AccessToken,
        booking_id: &str,
    ) -> Result<BookingRecord, ApiError> {
        let envelope: Envelope<RawBooking> = self
            .execute(
                "admin_booking",
                self.client
                    .traced_get(&self.url(&format!("/admin/bookings/{}", id_segment(booking_id)?)))
                    .bearer_auth_opt(Some(token.expose())),
            )
            .await?;
        let raw = envelope.require_data("admin_booking")?;
        BookingRecord::try_from(raw).map_err(|e| ApiError::Rejected(e.to_string()))
    }

    pub async fn admin_update_status(
        &self,
        token: &AccessToken,
        booking_id: &str,
        status: RecordStatus,
    ) -> Result<(), ApiError> {
        let body = StatusBody {
            status: status.as_str(),
            record_type: Some(status.record_type().as_str()),
        };
        self.execute::<serde_json::Value>(
            "admin_update_status",
            self.client
                .traced_put(&self.url(&format!("/admin/bookings/{}/status", id_segment(booking_id)?)))
                .bearer_auth_opt(Some(token.expose()))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    pub async fn admin_delete_booking(
        &self,
        token: &AccessToken,
        booking_id: &str,
        record_type: RecordType,
    ) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(
            "admin_delete_booking",
            self.client
                .traced_delete(&self.url(&format!("/admin/bookings/{}", id_segment(booking_id)?)))
                .query(&[("type", record_type.as_str())])
                .bearer_auth_opt(Some(token.expose())),
        )
        .await
        .map(|_| ())
    }

    /// Records of one type only; the API applies one status vocabulary per call.
    pub async fn admin_bulk_update(
        &self,
        token: &AccessToken,
        ids: &[String],
        status: RecordStatus,
    ) -> Result<(), ApiError> {
        let body = BulkStatusBody {
            ids,
            status: status.as_str(),
            record_type: status.record_type().as_str(),
        };
        self.execute::<serde_json::Value>(
            "admin_bulk_update",
            self.client
                .traced_put(&self.url("/admin/bookings/bulk-update"))
                .bearer_auth_opt(Some(token.expose()))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    pub async fn partner_inquiries(
        &self,
        token: &AccessToken,
        scope: InquiryScope,
    ) -> Result<Vec<PartnerInquiry>, ApiError> {
        let path = match scope {
            InquiryScope::Assigned => "/api/partner/inquiries",
            InquiryScope::Unallocated => "/api/partner/inquiries/unallocated",
        };
        let envelope: Envelope<Vec<serde_json::Value>> = self
            .execute(
                "partner_inquiries",
                self.client
                    .traced_get(&self.url(path))
                    .bearer_auth_opt(Some(token.expose())),
            )
            .await?;
        Ok(inquiries_from_raw(envelope.data.unwrap_or_default()))
    }

    pub async fn update_partner_inquiry_status(
        &self,
        token: &AccessToken,
        inquiry_id: &str,
        status: PartnerInquiryStatus,
    ) -> Result<(), ApiError> {
        let body = StatusBody {
            status: status.as_str(),
            record_type: None,
        };
        self.execute::<serde_json::Value>(
            "update_partner_inquiry_status",
            self.client
                .traced_put(&self.url(&format!(
                    "/api/partner/inquiries/{}/status",
                    id_segment(inquiry_id)?
                )))
                .bearer_auth_opt(Some(token.expose()))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    pub async fn me(&self, token: &AccessToken) -> Result<UserProfile, ApiError> {
        let envelope: Envelope<UserProfile> = self
            .execute(
                "me",
                self.client
                    .traced_get(&self.url("/me"))
                    .bearer_auth_opt(Some(token.expose())),
            )
            .await?;
        envelope.require_data("me")
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(
        &self,
        email: &str,
        password: &Secret<String>,
    ) -> Result<LoginSession, ApiError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let value = self
            .execute_value(
                "login",
                self.client
                    .traced_post(&self.url("/auth/login"))
                    .json(&body),
            )
            .await?;

        // The token sits either in `data` or at the top level.
        let payload = value
            .get("data")
            .filter(|data| data.get("token").is_some() || data.get("access_token").is_some())
            .cloned()
            .unwrap_or(value);
        let payload: LoginPayload = serde_json::from_value(payload)?;
        Ok(LoginSession {
            token: AccessToken::new(payload.token),
            user: payload.user,
        })
    }

    pub async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(
            "logout",
            self.client
                .traced_post(&self.url("/auth/logout"))
                .bearer_auth_opt(Some(token.expose())),
        )
        .await
        .map(|_| ())
    }

    pub async fn update_user(
        &self,
        token: &AccessToken,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, ApiError> {
        let envelope: Envelope<UserProfile> = self
            .execute(
                "update_user",
                self.client
                    .traced_put(&self.url(&format!("/api/users/{}", id_segment(user_id)?)))
                    .bearer_auth_opt(Some(token.expose()))
                    .json(update),
            )
            .await?;
        Ok(envelope.data)
    }

    async fn booking_page(
        &self,
        endpoint: &'static str,
        path: &str,
        token: &AccessToken,
    ) -> Result<BookingPage, ApiError> {
        let envelope: Envelope<Vec<RawBooking>> = self
            .execute(
                endpoint,
                self.client
                    .traced_get(&self.url(path))
                    .bearer_auth_opt(Some(token.expose())),
            )
            .await?;
        let total = envelope.total();
        let records = records_from_raw(envelope.data.unwrap_or_default());
        Ok(BookingPage {
            total: total.unwrap_or(records.len() as u64),
            records,
        })
    }
}

/// Pull `message` or `error` out of an error body, falling back to raw text.
fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(default, alias = "error")]
        message: Option<String>,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(m) }) => m,
        _ => String::from_utf8_lossy(body).chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_stay_inside_their_path_segment() {
        assert_eq!(
            id_segment("../../admin/bookings/1").unwrap(),
            "..%2F..%2Fadmin%2Fbookings%2F1"
        );
        assert_eq!(id_segment("wh 7?x=1#y").unwrap(), "wh%207%3Fx%3D1%23y");
        assert_eq!(id_segment("64f1c0ab").unwrap(), "64f1c0ab");
        for id in ["", ".", ".."] {
            assert!(matches!(id_segment(id), Err(ApiError::InvalidId(_))));
        }
    }

    #[test]
    fn envelope_total_falls_back_to_pagination() {
        let envelope: Envelope<Vec<Warehouse>> = serde_json::from_value(serde_json::json!({
            "success": true,
            "data": [],
            "pagination": { "total": 42 }
        }))
        .unwrap();
        assert_eq!(envelope.total(), Some(42));
    }

    #[test]
    fn user_field_is_accepted_as_data() {
        let envelope: Envelope<UserProfile> = serde_json::from_value(serde_json::json!({
            "user": { "id": "u1", "email": "a@b.in", "role": "admin" }
        }))
        .unwrap();
        assert_eq!(envelope.data.unwrap().id, "u1");
    }

    #[test]
    fn city_rows_accept_both_shapes() {
        let rows: Vec<CityRow> = serde_json::from_value(serde_json::json!([
            "Pune",
            { "city": "Bhiwandi", "state": "Maharashtra" },
            { "name": "Hosur" }
        ]))
        .unwrap();
        let labels: Vec<String> = rows.into_iter().map(CityRow::into_label).collect();
        assert_eq!(labels, vec!["Pune", "Bhiwandi, Maharashtra", "Hosur"]);
    }

    #[test]
    fn error_message_prefers_json_field() {
        assert_eq!(error_message(br#"{"error":"Booking not found"}"#), "Booking not found");
        assert_eq!(error_message(b"Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn inquiry_scope_parses_unallocated() {
        assert_eq!(InquiryScope::parse(Some("unallocated")), InquiryScope::Unallocated);
        assert_eq!(InquiryScope::parse(None), InquiryScope::Assigned);
    }
}
