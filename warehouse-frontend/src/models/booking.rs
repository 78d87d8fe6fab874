//! Booking-management records.
//!
//! The API returns inquiries and paid bookings from one endpoint in one
//! loosely typed shape. They are split here into a sum type so each kind
//! carries its own status vocabulary and a status of one kind can never be
//! sent for a record of the other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::de::{lenient_datetime, lenient_paise, string_or_number};
use super::money::Paise;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("unknown {kind} status '{value}'")]
    Unknown { kind: RecordType, value: String },
}

/// Status of a booking-management inquiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Pending,
    Contacted,
    Resolved,
}

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 3] = [
        InquiryStatus::Pending,
        InquiryStatus::Contacted,
        InquiryStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::Contacted => "contacted",
            InquiryStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for InquiryStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InquiryStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StatusError::Unknown {
                kind: RecordType::Inquiry,
                value: s.to_string(),
            })
    }
}

/// Status of a paid booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Confirmed,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StatusError::Unknown {
                kind: RecordType::Confirmed,
                value: s.to_string(),
            })
    }
}

/// The `type` discriminant the API routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Inquiry,
    Confirmed,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Inquiry => "inquiry",
            RecordType::Confirmed => "confirmed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inquiry" => Some(RecordType::Inquiry),
            "confirmed" => Some(RecordType::Confirmed),
            _ => None,
        }
    }

    /// Status values offered for records of this type.
    pub fn status_options(self) -> Vec<&'static str> {
        match self {
            RecordType::Inquiry => InquiryStatus::ALL.iter().map(|s| s.as_str()).collect(),
            RecordType::Confirmed => BookingStatus::ALL.iter().map(|s| s.as_str()).collect(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inquiries and confirmed bookings live in separate backend collections, so
/// an id is only unique within its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub record_type: RecordType,
    pub id: String,
}

impl RecordKey {
    pub fn new(record_type: RecordType, id: impl Into<String>) -> Self {
        Self {
            record_type,
            id: id.into(),
        }
    }

    /// Parse the `type:id` form used by bulk selection checkboxes.
    pub fn parse(value: &str) -> Option<Self> {
        let (record_type, id) = value.trim().split_once(':')?;
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self::new(RecordType::parse(record_type)?, id))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record_type, self.id)
    }
}

/// A status value tied to the record type it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    Inquiry(InquiryStatus),
    Confirmed(BookingStatus),
}

impl RecordStatus {
    /// Parse `value` in the vocabulary of `record_type`.
    pub fn parse(record_type: RecordType, value: &str) -> Result<Self, StatusError> {
        match record_type {
            RecordType::Inquiry => value.parse().map(RecordStatus::Inquiry),
            RecordType::Confirmed => value.parse().map(RecordStatus::Confirmed),
        }
    }

    pub fn record_type(self) -> RecordType {
        match self {
            RecordStatus::Inquiry(_) => RecordType::Inquiry,
            RecordStatus::Confirmed(_) => RecordType::Confirmed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Inquiry(s) => s.as_str(),
            RecordStatus::Confirmed(s) => s.as_str(),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRef {
    /// Filled from `id` or `_id`, whichever the API sent.
    #[serde(default, skip_deserializing)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    pub amount_paid: Paise,
    pub booking_number: Option<String>,
    pub payment_method: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub warehouse: Option<WarehouseRef>,
    pub owner: Option<OwnerRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    Inquiry {
        status: InquiryStatus,
    },
    Confirmed {
        status: BookingStatus,
        payment: PaymentDetails,
    },
}

/// One row of a user's or admin's booking list.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRecord {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub company_name: String,
    pub inquiry_type: String,
    pub message: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub kind: RecordKind,
}

impl BookingRecord {
    pub fn record_type(&self) -> RecordType {
        match self.kind {
            RecordKind::Inquiry { .. } => RecordType::Inquiry,
            RecordKind::Confirmed { .. } => RecordType::Confirmed,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.record_type(), self.id.clone())
    }

    pub fn status(&self) -> RecordStatus {
        match &self.kind {
            RecordKind::Inquiry { status } => RecordStatus::Inquiry(*status),
            RecordKind::Confirmed { status, .. } => RecordStatus::Confirmed(*status),
        }
    }

    /// Replace the status. Rejects a status from the other vocabulary.
    pub fn set_status(&mut self, new_status: RecordStatus) -> Result<RecordStatus, RecordStatus> {
        let previous = self.status();
        match (&mut self.kind, new_status) {
            (RecordKind::Inquiry { status }, RecordStatus::Inquiry(s)) => *status = s,
            (RecordKind::Confirmed { status, .. }, RecordStatus::Confirmed(s)) => *status = s,
            _ => return Err(new_status),
        }
        Ok(previous)
    }

    pub fn payment(&self) -> Option<&PaymentDetails> {
        match &self.kind {
            RecordKind::Confirmed { payment, .. } => Some(payment),
            RecordKind::Inquiry { .. } => None,
        }
    }

    pub fn amount_paid(&self) -> Paise {
        self.payment().map(|p| p.amount_paid).unwrap_or_default()
    }

    pub fn warehouse_name(&self) -> &str {
        self.payment()
            .and_then(|p| p.warehouse.as_ref())
            .map(|w| w.name.as_str())
            .unwrap_or("")
    }

    /// Case-insensitive match over the fields the list search covers.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let booking_number = self
            .payment()
            .and_then(|p| p.booking_number.as_deref())
            .unwrap_or("");
        [
            self.full_name.as_str(),
            self.email.as_str(),
            self.company_name.as_str(),
            booking_number,
            self.warehouse_name(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Wire shape of a booking-list row.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBooking {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "fullName", alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "phoneNumber", alias = "phone")]
    pub phone_number: String,
    #[serde(default, alias = "companyName")]
    pub company_name: String,
    #[serde(default, alias = "inquiryType")]
    pub inquiry_type: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub record_type: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, deserialize_with = "lenient_paise")]
    pub amount_paid: Paise,
    #[serde(default)]
    pub booking_number: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "createdAt", deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt", deserialize_with = "lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub warehouse: Option<serde_json::Value>,
    #[serde(default)]
    pub owner: Option<OwnerRef>,
}

impl RawBooking {
    fn record_type(&self) -> RecordType {
        let tagged = self.record_type.as_deref().and_then(RecordType::parse);
        match tagged {
            Some(t) => t,
            None if self.is_paid => RecordType::Confirmed,
            None => RecordType::Inquiry,
        }
    }
}

impl TryFrom<RawBooking> for BookingRecord {
    type Error = StatusError;

    fn try_from(raw: RawBooking) -> Result<Self, Self::Error> {
        let record_type = raw.record_type();
        let kind = match record_type {
            RecordType::Inquiry => RecordKind::Inquiry {
                status: match raw.status.as_deref() {
                    Some(s) if !s.trim().is_empty() => s.parse()?,
                    _ => InquiryStatus::Pending,
                },
            },
            RecordType::Confirmed => RecordKind::Confirmed {
                status: match raw.status.as_deref() {
                    Some(s) if !s.trim().is_empty() => s.parse()?,
                    _ => BookingStatus::Confirmed,
                },
                payment: PaymentDetails {
                    amount_paid: raw.amount_paid,
                    booking_number: raw.booking_number,
                    payment_method: raw.payment_method,
                    razorpay_payment_id: raw.razorpay_payment_id,
                    payment_date: raw.payment_date,
                    warehouse: raw.warehouse.map(warehouse_ref),
                    owner: raw.owner,
                },
            },
        };

        Ok(BookingRecord {
            id: raw.id,
            full_name: raw.full_name,
            email: raw.email,
            phone_number: raw.phone_number,
            company_name: raw.company_name,
            inquiry_type: raw.inquiry_type,
            message: raw.message.unwrap_or_default(),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            kind,
        })
    }
}

/// The API embeds either a populated warehouse object or just its id.
fn warehouse_ref(value: serde_json::Value) -> WarehouseRef {
    match value {
        serde_json::Value::String(id) => WarehouseRef {
            id: Some(id),
            ..WarehouseRef::default()
        },
        serde_json::Value::Number(n) => WarehouseRef {
            id: Some(n.to_string()),
            ..WarehouseRef::default()
        },
        other => {
            let id = other
                .get("id")
                .or_else(|| other.get("_id"))
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    v => v.to_string(),
                });
            let mut warehouse: WarehouseRef = serde_json::from_value(other).unwrap_or_default();
            warehouse.id = id;
            warehouse
        }
    }
}

/// Convert a fetched page, dropping rows whose status is outside their vocabulary.
pub fn records_from_raw(rows: Vec<RawBooking>) -> Vec<BookingRecord> {
    rows.into_iter()
        .filter_map(|raw| {
            let id = raw.id.clone();
            match BookingRecord::try_from(raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(booking_id = %id, error = %e, "Skipping booking with invalid status");
                    None
                }
            }
        })
        .collect()
}

/// `GET /api/bookings/stats`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingStats {
    #[serde(default, alias = "totalBookings", alias = "total_bookings")]
    pub total: u64,
    #[serde(default, alias = "totalInquiries", alias = "total_inquiries")]
    pub inquiries: u64,
    #[serde(default, alias = "confirmedBookings", alias = "confirmed_bookings")]
    pub confirmed: u64,
    #[serde(default, alias = "pendingInquiries", alias = "pending_inquiries")]
    pub pending: u64,
    #[serde(default, alias = "totalSpent", alias = "total_spent", deserialize_with = "lenient_paise")]
    pub amount_paid: Paise,
}
