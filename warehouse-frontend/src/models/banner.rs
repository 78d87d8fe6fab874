use serde::Serialize;

use crate::config::UiSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
}

/// Dismissible status message. The page script hides it after `dismiss_after_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    pub dismiss_after_ms: u64,
}

impl Banner {
    pub fn success(ui: &UiSettings, message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            dismiss_after_ms: ui.success_banner_ms,
        }
    }

    pub fn error(ui: &UiSettings, message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            dismiss_after_ms: ui.error_banner_ms,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.kind {
            BannerKind::Success => "banner banner-success",
            BannerKind::Error => "banner banner-error",
        }
    }
}
