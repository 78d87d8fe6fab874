//! Partner inquiries: leads routed to a warehouse owner's dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::de::{lenient_datetime, null_as_empty, string_or_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerInquiryStatus {
    Pending,
    InProgress,
    Completed,
}

impl PartnerInquiryStatus {
    pub const ALL: [PartnerInquiryStatus; 3] = [
        PartnerInquiryStatus::Pending,
        PartnerInquiryStatus::InProgress,
        PartnerInquiryStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PartnerInquiryStatus::Pending => "pending",
            PartnerInquiryStatus::InProgress => "in_progress",
            PartnerInquiryStatus::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PartnerInquiryStatus::Pending => "Pending",
            PartnerInquiryStatus::InProgress => "In progress",
            PartnerInquiryStatus::Completed => "Completed",
        }
    }
}

impl FromStr for PartnerInquiryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartnerInquiryStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown partner inquiry status '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerInquiry {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "fullName", deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, alias = "phoneNumber", deserialize_with = "null_as_empty")]
    pub phone_number: String,
    #[serde(default, alias = "companyName", deserialize_with = "null_as_empty")]
    pub company_name: String,
    #[serde(default, alias = "inquiryType", deserialize_with = "null_as_empty")]
    pub inquiry_type: String,
    #[serde(default = "default_status")]
    pub status: PartnerInquiryStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "createdAt", deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt", deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> PartnerInquiryStatus {
    PartnerInquiryStatus::Pending
}

/// Decode each row on its own; a row that does not fit is logged and
/// skipped instead of failing the whole list.
pub fn inquiries_from_raw(rows: Vec<serde_json::Value>) -> Vec<PartnerInquiry> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row
                .get("_id")
                .or_else(|| row.get("id"))
                .map(ToString::to_string)
                .unwrap_or_default();
            match serde_json::from_value::<PartnerInquiry>(row) {
                Ok(inquiry) => Some(inquiry),
                Err(e) => {
                    tracing::warn!(inquiry_id = %id, error = %e, "Skipping undecodable partner inquiry");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_payload() {
        let inquiry: PartnerInquiry = serde_json::from_value(json!({
            "_id": "65f0",
            "fullName": "Meera Shah",
            "phoneNumber": "9876543210",
            "companyName": "Shah Cold Chain",
            "inquiryType": "Short-Term Storage Inquiry",
            "status": "in_progress",
            "createdAt": "2024-05-02T08:00:00Z"
        }))
        .unwrap();

        assert_eq!(inquiry.id, "65f0");
        assert_eq!(inquiry.status, PartnerInquiryStatus::InProgress);
        assert!(inquiry.created_at.is_some());
    }

    #[test]
    fn bad_rows_are_skipped_and_null_text_is_empty() {
        let inquiries = inquiries_from_raw(vec![
            json!({ "_id": "q1", "fullName": "Kiran", "message": null, "email": null }),
            json!({ "_id": "q2", "status": "escalated" }),
            json!({ "fullName": "No id" }),
            json!({ "_id": 7, "status": "completed", "message": "Call after 5pm" }),
        ]);

        let ids: Vec<&str> = inquiries.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "7"]);
        assert_eq!(inquiries[0].message, None);
        assert_eq!(inquiries[0].email, "");
        assert_eq!(inquiries[1].message.as_deref(), Some("Call after 5pm"));
    }

    #[test]
    fn parses_status_values() {
        assert_eq!("completed".parse::<PartnerInquiryStatus>(), Ok(PartnerInquiryStatus::Completed));
        assert!("contacted".parse::<PartnerInquiryStatus>().is_err());
    }
}
