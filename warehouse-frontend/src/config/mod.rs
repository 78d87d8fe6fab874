use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Set to true behind HTTPS so the session cookie is marked `Secure`.
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BackendSettings {
    /// Base URL of the marketplace REST API (e.g., http://api:5000).
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_request_timeout_secs() -> u64 {
    15
}

#[derive(Deserialize, Clone, Debug)]
pub struct UiSettings {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_suggestion_debounce_ms")]
    pub suggestion_debounce_ms: u64,
    #[serde(default = "default_success_banner_ms")]
    pub success_banner_ms: u64,
    #[serde(default = "default_error_banner_ms")]
    pub error_banner_ms: u64,
    /// Display cap applied by the message normalizer.
    #[serde(default = "default_message_max_len")]
    pub message_max_len: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl UiSettings {
    pub fn suggestion_debounce(&self) -> Duration {
        Duration::from_millis(self.suggestion_debounce_ms)
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            suggestion_debounce_ms: default_suggestion_debounce_ms(),
            success_banner_ms: default_success_banner_ms(),
            error_banner_ms: default_error_banner_ms(),
            message_max_len: default_message_max_len(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_page_size() -> u32 {
    8
}

fn default_suggestion_debounce_ms() -> u64 {
    300
}

fn default_success_banner_ms() -> u64 {
    3000
}

fn default_error_banner_ms() -> u64 {
    5000
}

fn default_message_max_len() -> usize {
    200
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP gRPC endpoint (e.g., http://tempo:4317). Tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    service_core::config::load_layered("warehouse-frontend")
}
