#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use warehouse_frontend::config::{
    BackendSettings, ServerSettings, Settings, TelemetrySettings, UiSettings,
};
use warehouse_frontend::services::MarketplaceClient;
use warehouse_frontend::startup::build_router;
use warehouse_frontend::AppState;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOUNDARY: &str = "warehouse-test-boundary";

/// One browser: a router over a mocked marketplace API plus the session
/// cookie it was handed.
pub struct TestApp {
    pub router: Router,
    pub backend: MockServer,
    cookie: Option<String>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let backend = MockServer::start().await;
        let settings = Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                secure_cookies: false,
            },
            backend: BackendSettings {
                url: backend.uri(),
                request_timeout_secs: 5,
            },
            ui: UiSettings {
                suggestion_debounce_ms: 0,
                ..UiSettings::default()
            },
            telemetry: TelemetrySettings::default(),
        };
        let api = MarketplaceClient::new(&settings.backend).expect("Failed to build client");
        let router = build_router(AppState::new(settings, api));

        Self {
            router,
            backend,
            cookie: None,
        }
    }

    pub async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let response = self.send_alongside(builder, body).await;
        if let Some(set_cookie) = response.header(header::SET_COOKIE.as_str()) {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    /// Send with the current cookie but without taking a new one, so several
    /// requests from this browser can be in flight at once.
    pub async fn send_alongside(
        &self,
        builder: axum::http::request::Builder,
        body: Body,
    ) -> TestResponse {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let request = builder.body(body).expect("Failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn htmx_get_alongside(&self, uri: &str) -> TestResponse {
        self.send_alongside(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("HX-Request", "true"),
            Body::empty(),
        )
        .await
    }

    pub async fn htmx_post_form_alongside(&self, uri: &str, body: &str) -> TestResponse {
        self.send_alongside(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("HX-Request", "true")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn post_multipart_alongside(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send_alongside(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                ),
            Body::from(multipart_body(fields)),
        )
        .await
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(uri), Body::empty())
            .await
    }

    pub async fn htmx_get(&mut self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("HX-Request", "true"),
            Body::empty(),
        )
        .await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn htmx_post_form(&mut self, uri: &str, body: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("HX-Request", "true")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn post_multipart(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                ),
            Body::from(multipart_body(fields)),
        )
        .await
    }

    /// Log in through `/login` against a mocked `/auth/login` answering with
    /// `user`.
    pub async fn login_as(&mut self, token: &str, user: Value) -> TestResponse {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "token": token, "user": user }
            })))
            .mount(&self.backend)
            .await;

        self.post_form("/login", "email=someone%40example.in&password=secret")
            .await
    }

    /// Step one of the inquiry form with valid contact details.
    pub async fn confirm_contact(&mut self) -> TestResponse {
        self.post_form(
            "/contact",
            "fullName=Asha+Rao&email=asha%40example.in&phoneNumber=9876543210&companyName=Rao+Logistics",
        )
        .await
    }
}

pub fn multipart_body(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body
}

pub fn warehouse(id: usize) -> Value {
    json!({
        "_id": format!("w{}", id),
        "name": format!("Warehouse {}", id),
        "city": "Pune",
        "state": "Maharashtra",
        "build_up_area": 12000,
        "rent": 125000,
        "warehouse_type": "Dry storage",
        "images": []
    })
}

pub fn admin_user() -> Value {
    json!({ "id": "a1", "name": "Admin", "email": "admin@example.in", "role": "admin" })
}

pub fn customer_user() -> Value {
    json!({ "id": "u1", "name": "Asha Rao", "email": "asha@example.in", "role": "user" })
}

pub fn partner_user() -> Value {
    json!({ "id": "p1", "name": "Kiran Partner", "email": "kiran@example.in", "role": "partner" })
}

pub fn booking_records() -> Value {
    json!([
        {
            "_id": "b1",
            "fullName": "Ravi Kumar",
            "email": "ravi@example.in",
            "phoneNumber": "9000000001",
            "companyName": "Kumar Traders",
            "type": "inquiry",
            "status": "pending",
            "message": "Need 5000 sq ft in Pune"
        },
        {
            "_id": "b2",
            "fullName": "Meera Shah",
            "email": "meera@example.in",
            "phoneNumber": "9000000002",
            "companyName": "Shah Foods",
            "type": "confirmed",
            "status": "active",
            "is_paid": true,
            "booking_number": "BK-1002"
        }
    ])
}
