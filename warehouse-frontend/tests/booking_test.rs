mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{admin_user, booking_records, customer_user, partner_user, TestApp};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const SLOW_BACKEND: Duration = Duration::from_millis(500);
const HEAD_START: Duration = Duration::from_millis(100);

async fn admin_login() -> TestApp {
    let mut app = TestApp::spawn().await;
    let login = app.login_as("tok-admin", admin_user()).await;
    assert_eq!(login.status, StatusCode::SEE_OTHER);
    assert_eq!(login.location(), Some("/admin"));
    app
}

fn admin_listing(records: Value) -> ResponseTemplate {
    let total = records.as_array().map_or(0, Vec::len);
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": records,
        "total": total
    }))
}

async fn admin_app_with(records: Value) -> TestApp {
    let app = admin_login().await;
    Mock::given(method("GET"))
        .and(path("/admin/bookings"))
        .and(header("authorization", "Bearer tok-admin"))
        .respond_with(admin_listing(records))
        .mount(&app.backend)
        .await;
    app
}

async fn admin_app() -> TestApp {
    admin_app_with(booking_records()).await
}

/// An inquiry and a paid booking that share id 5.
fn colliding_records() -> Value {
    json!([
        { "id": 5, "type": "inquiry", "status": "pending", "fullName": "Inquiry Person" },
        {
            "id": 5, "type": "confirmed", "status": "active", "fullName": "Paid Customer",
            "is_paid": true, "amount_paid": 100000
        }
    ])
}

#[tokio::test]
async fn login_failure_shows_inline_error() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/login", "email=someone%40example.in&password=wrong")
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Invalid email or password"));
}

#[tokio::test]
async fn login_lands_each_role_on_its_page() {
    let mut app = TestApp::spawn().await;
    let response = app.login_as("tok-user", customer_user()).await;
    assert_eq!(response.location(), Some("/dashboard"));

    let mut app = TestApp::spawn().await;
    let response = app.login_as("tok-partner", partner_user()).await;
    assert_eq!(response.location(), Some("/partner/inquiries"));
}

#[tokio::test]
async fn protected_pages_redirect_anonymous_visitors_to_login() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/dashboard").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/login"));
}

#[tokio::test]
async fn admin_page_rejects_customers() {
    let mut app = TestApp::spawn().await;
    app.login_as("tok-user", customer_user()).await;

    let response = app.get("/admin").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn admin_board_lists_records() {
    let mut app = admin_app().await;

    let response = app.get("/admin").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Ravi Kumar"));
    assert!(response.body.contains("Meera Shah"));
    assert!(response.body.contains("<dt>Total</dt><dd>2</dd>"));
}

#[tokio::test]
async fn confirmed_delete_removes_record() {
    let mut app = admin_app().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/bookings/b1"))
        .and(query_param("type", "inquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/b1/delete", "confirm=DELETE&type=inquiry")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("Ravi Kumar"));
    assert!(response.body.contains("Meera Shah"));
    assert!(response.body.contains("Record deleted"));
    assert!(response.body.contains("<dt>Total</dt><dd>1</dd>"));
}

#[tokio::test]
async fn failed_delete_restores_record() {
    let mut app = admin_app().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/bookings/b1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "Cannot delete this record" })),
        )
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/b1/delete", "confirm=DELETE&type=inquiry")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Ravi Kumar"));
    assert!(response.body.contains("Cannot delete this record"));
    assert!(response.body.contains("<dt>Total</dt><dd>2</dd>"));
}

#[tokio::test]
async fn delete_without_confirmation_never_reaches_api() {
    let mut app = admin_app().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/bookings/b1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/b1/delete", "confirm=delete")
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.header("hx-retarget"), Some("#board-banner"));
    assert!(response.body.contains("Type DELETE to confirm the deletion"));
}

#[tokio::test]
async fn status_update_confirms_on_success() {
    let mut app = admin_app().await;
    Mock::given(method("PUT"))
        .and(path("/admin/bookings/b1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/b1/status", "status=resolved&type=inquiry")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Status updated to resolved"));
    assert!(!response.body.contains("sync-failed"));
}

#[tokio::test]
async fn status_update_rolls_back_and_marks_row_on_failure() {
    let mut app = admin_app().await;
    Mock::given(method("PUT"))
        .and(path("/admin/bookings/b1/status"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/b1/status", "status=resolved&type=inquiry")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(r#"class="sync-failed""#));
    assert!(response.body.contains("Retry"));
}

#[tokio::test]
async fn status_from_wrong_vocabulary_is_rejected() {
    let mut app = admin_app().await;

    let response = app
        .htmx_post_form("/admin/bookings/b1/status", "status=active&type=inquiry")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_token_ends_session() {
    let mut app = TestApp::spawn().await;
    app.login_as("tok-user", customer_user()).await;
    Mock::given(method("GET"))
        .and(path("/api/bookings"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookings/stats"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.backend)
        .await;

    let response = app.get("/dashboard").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));

    let again = app.get("/dashboard").await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert_eq!(again.location(), Some("/login"));
}

#[tokio::test]
async fn partner_messages_are_normalized_for_display() {
    let mut app = TestApp::spawn().await;
    app.login_as("tok-partner", partner_user()).await;
    Mock::given(method("GET"))
        .and(path("/api/partner/inquiries/unallocated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{
                "_id": "q1",
                "fullName": "Kiran Mehta",
                "status": "pending",
                "message": "GET /uploads/foo HTTP/1.1"
            }]
        })))
        .mount(&app.backend)
        .await;

    let response = app.htmx_get("/partner/inquiries?scope=unallocated").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Kiran Mehta"));
    assert!(response.body.contains("the stored text contains server log data"));
    assert!(!response.body.contains("HTTP/1.1"));
}

#[tokio::test]
async fn deleted_record_stays_gone_after_reload() {
    let mut app = admin_login().await;
    Mock::given(method("GET"))
        .and(path("/admin/bookings"))
        .respond_with(admin_listing(booking_records()))
        .up_to_n_times(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/bookings"))
        .respond_with(admin_listing(json!([booking_records()[1].clone()])))
        .mount(&app.backend)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/bookings/b1"))
        .and(query_param("type", "inquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let deleted = app
        .htmx_post_form("/admin/bookings/b1/delete", "confirm=DELETE&type=inquiry")
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert!(!deleted.body.contains("Ravi Kumar"));

    let reloaded = app.get("/admin").await;
    assert_eq!(reloaded.status, StatusCode::OK);
    assert!(!reloaded.body.contains("Ravi Kumar"));
    assert!(reloaded.body.contains("Meera Shah"));
    assert!(reloaded.body.contains("<dt>Total</dt><dd>1</dd>"));
}

#[tokio::test]
async fn delete_targets_the_posted_record_type() {
    let mut app = admin_app_with(colliding_records()).await;
    Mock::given(method("DELETE"))
        .and(path("/admin/bookings/5"))
        .and(query_param("type", "confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/bookings/5"))
        .and(query_param("type", "inquiry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/5/delete", "confirm=DELETE&type=confirmed")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("Paid Customer"));
    assert!(response.body.contains("Inquiry Person"));
}

#[tokio::test]
async fn status_update_targets_the_posted_record_type() {
    let mut app = admin_app_with(colliding_records()).await;
    Mock::given(method("PUT"))
        .and(path("/admin/bookings/5/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .htmx_post_form("/admin/bookings/5/status", "status=completed&type=confirmed")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Status updated to completed"));
    assert!(response.body.contains(r#"value="confirmed:5""#));
    assert!(response.body.contains(r#"value="inquiry:5""#));
}

#[tokio::test]
async fn delete_with_mismatched_type_is_refused() {
    let mut app = admin_app().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&app.backend)
        .await;

    let wrong_type = app
        .htmx_post_form("/admin/bookings/b1/delete", "confirm=DELETE&type=confirmed")
        .await;
    assert_eq!(wrong_type.status, StatusCode::UNPROCESSABLE_ENTITY);

    let no_type = app
        .htmx_post_form("/admin/bookings/b1/delete", "confirm=DELETE")
        .await;
    assert_eq!(no_type.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_mutation_of_a_busy_record_conflicts() {
    let app = admin_app().await;
    Mock::given(method("PUT"))
        .and(path("/admin/bookings/b1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true }))
                .set_delay(SLOW_BACKEND),
        )
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&app.backend)
        .await;

    let (first, second) = tokio::join!(
        app.htmx_post_form_alongside("/admin/bookings/b1/status", "status=resolved&type=inquiry"),
        async {
            tokio::time::sleep(HEAD_START).await;
            app.htmx_post_form_alongside("/admin/bookings/b1/delete", "confirm=DELETE&type=inquiry")
                .await
        }
    );

    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("Status updated to resolved"));
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn partner_list_survives_irregular_rows() {
    let mut app = TestApp::spawn().await;
    app.login_as("tok-partner", partner_user()).await;
    Mock::given(method("GET"))
        .and(path("/api/partner/inquiries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                { "_id": "q1", "fullName": "Kiran Mehta", "status": "pending", "message": null },
                { "_id": "q2", "fullName": "Odd Status", "status": "escalated" },
                { "_id": "q3", "fullName": "Anil Joshi", "status": "completed", "message": "Call after 5pm" }
            ]
        })))
        .mount(&app.backend)
        .await;

    let response = app.htmx_get("/partner/inquiries").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Kiran Mehta"));
    assert!(response.body.contains("Anil Joshi"));
    assert!(response.body.contains("Call after 5pm"));
    assert!(!response.body.contains("Odd Status"));
}
