mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const WAREHOUSE_TYPE: &str = "Warehouse+Availability+Inquiry";
const FULFILLMENT_TYPE: &str = "Full-Service+Fulfillment+Inquiry";

#[tokio::test]
async fn invalid_contact_details_are_reported_per_field() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/contact",
            "fullName=Asha+Rao&email=not-an-email&phoneNumber=12345&companyName=Rao+Logistics",
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Enter a valid email address"));
    assert!(response.body.contains("Phone number must be exactly 10 digits"));
    assert!(!response.body.contains("Company name is required"));
    assert!(response.body.contains(r#"value="Asha Rao""#));
}

#[tokio::test]
async fn details_step_requires_confirmed_contact() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/contact/details").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/contact"));
}

#[tokio::test]
async fn valid_contact_moves_to_details_step() {
    let mut app = TestApp::spawn().await;

    let response = app.confirm_contact().await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/contact/details"));

    let details = app.get("/contact/details").await;
    assert_eq!(details.status, StatusCode::OK);
    assert!(details.body.contains("What do you need, Asha Rao?"));
}

#[tokio::test]
async fn conditional_fields_follow_type_and_keep_values_across_switches() {
    let mut app = TestApp::spawn().await;
    app.confirm_contact().await;

    let fields = app
        .htmx_get(&format!("/contact/fields?inquiryType={}", WAREHOUSE_TYPE))
        .await;
    assert_eq!(fields.status, StatusCode::OK);
    assert!(fields.body.contains(r#"name="preferredLocation""#));
    assert!(!fields.body.contains(r#"name="industryOther""#));

    let fields = app
        .htmx_get(&format!(
            "/contact/fields?inquiryType={}&industryType=Others&preferredLocation=Pune",
            WAREHOUSE_TYPE
        ))
        .await;
    assert!(fields.body.contains(r#"name="industryOther""#));

    let fields = app
        .htmx_get(&format!(
            "/contact/fields?inquiryType={}&industryType=Others&preferredLocation=Pune",
            FULFILLMENT_TYPE
        ))
        .await;
    assert!(fields.body.contains(r#"name="monthlyOrders""#));
    assert!(!fields.body.contains(r#"name="preferredLocation""#));

    let fields = app
        .htmx_get(&format!("/contact/fields?inquiryType={}", WAREHOUSE_TYPE))
        .await;
    assert!(fields.body.contains(r#"name="industryOther""#));
    assert!(fields.body.contains(r#"value="Pune""#));
}

#[tokio::test]
async fn missing_consent_blocks_submission() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/public/inquiries"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.backend)
        .await;
    app.confirm_contact().await;

    let response = app
        .post_multipart(
            "/contact/details",
            &[
                ("inquiryType", "Warehouse Availability Inquiry"),
                ("preferredLocation", "Pune"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("Please confirm we may contact you"));
}

#[tokio::test]
async fn successful_submission_thanks_visitor_and_clears_draft() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/public/inquiries"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&app.backend)
        .await;
    app.confirm_contact().await;

    let response = app
        .post_multipart(
            "/contact/details",
            &[
                ("inquiryType", "Warehouse Availability Inquiry"),
                ("preferredLocation", "Pune"),
                ("message", "Need space from next month"),
                ("consent", "true"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Thank you, Asha Rao"));

    let restart = app.get("/contact/details").await;
    assert_eq!(restart.status, StatusCode::SEE_OTHER);
    assert_eq!(restart.location(), Some("/contact"));
}

#[tokio::test]
async fn failed_submission_keeps_what_was_typed() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/public/inquiries"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "Inquiry service down" })),
        )
        .mount(&app.backend)
        .await;
    app.confirm_contact().await;

    let response = app
        .post_multipart(
            "/contact/details",
            &[
                ("inquiryType", "Warehouse Availability Inquiry"),
                ("preferredLocation", "Pune"),
                ("consent", "true"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Inquiry service down"));
    assert!(response.body.contains(r#"value="Pune""#));
    assert!(response.body.contains("What do you need, Asha Rao?"));
}

#[tokio::test]
async fn second_submission_while_first_is_pending_conflicts() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/api/public/inquiries"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "success": true }))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&app.backend)
        .await;
    app.confirm_contact().await;

    let fields = [
        ("inquiryType", "Warehouse Availability Inquiry"),
        ("preferredLocation", "Pune"),
        ("consent", "true"),
    ];
    let (first, second) = tokio::join!(
        app.post_multipart_alongside("/contact/details", &fields),
        async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            app.post_multipart_alongside("/contact/details", &fields).await
        }
    );

    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("Thank you, Asha Rao"));
    assert_eq!(second.status, StatusCode::CONFLICT);
}
