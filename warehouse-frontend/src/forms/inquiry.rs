//! Two-step inquiry form.
//!
//! Step 1 collects contact details and is validated before anything is sent.
//! Step 2 selects an inquiry type, whose field set is derived from the draft
//! on every render by [`FieldSet::for_type`]. Values typed under one type are
//! kept in the draft when the visitor switches to another, but only the
//! active type's fields are submitted.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::FieldErrors;
use crate::error::ApiError;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{10}$").expect("valid phone regex"));

/// Companion select value that reveals a free-text "please specify" input.
pub const OTHERS: &str = "Others";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InquiryType {
    WarehouseAvailability,
    AiAnalytics,
    ShortTermStorage,
    Fulfillment,
}

impl InquiryType {
    pub const ALL: [InquiryType; 4] = [
        InquiryType::WarehouseAvailability,
        InquiryType::AiAnalytics,
        InquiryType::ShortTermStorage,
        InquiryType::Fulfillment,
    ];

    /// Label sent to the API as `inquiryType`.
    pub fn label(self) -> &'static str {
        match self {
            InquiryType::WarehouseAvailability => "Warehouse Availability Inquiry",
            InquiryType::AiAnalytics => "AI & Predictive Analytics Inquiry",
            InquiryType::ShortTermStorage => "Short-Term Storage Inquiry",
            InquiryType::Fulfillment => "Full-Service Fulfillment Inquiry",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        InquiryType::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for InquiryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[serde(default)]
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(regex(path = *EMAIL_PATTERN, message = "Enter a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(regex(path = *PHONE_PATTERN, message = "Phone number must be exactly 10 digits"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,
}

impl ContactDetails {
    pub fn trimmed(self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
        }
    }

    /// Validate with errors keyed by form field name.
    pub fn check(&self) -> Result<(), FieldErrors> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let mut fields = FieldErrors::new();
        for (field, message) in FieldErrors::from(errors).iter() {
            fields.insert(form_field_name(field), message);
        }
        Err(fields)
    }
}

fn form_field_name(field: &str) -> &str {
    match field {
        "full_name" => "fullName",
        "phone_number" => "phoneNumber",
        "company_name" => "companyName",
        other => other,
    }
}

/// Superset of the type-specific fields across all inquiry types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeFields {
    pub preferred_location: String,
    pub space_required: String,
    pub industry_type: String,
    pub industry_other: String,
    pub storage_duration: String,
    pub move_in_date: String,

    pub current_wms: String,
    pub wms_other: String,
    pub analytics_goals: Vec<String>,
    pub data_volume: String,

    pub goods_type: String,
    pub goods_other: String,
    pub storage_start_date: String,
    pub storage_duration_weeks: String,
    pub pallet_count: String,

    pub monthly_orders: String,
    pub sales_channels: Vec<String>,
    pub channel_other: String,
    pub services_needed: Vec<String>,
}

impl TypeFields {
    /// Apply one submitted `name=value` pair. Array fields accumulate.
    /// Returns `false` for names that are not type fields.
    pub fn apply(&mut self, name: &str, value: String) -> bool {
        let value = value.trim().to_string();
        match name {
            "preferredLocation" => self.preferred_location = value,
            "spaceRequired" => self.space_required = value,
            "industryType" => self.industry_type = value,
            "industryOther" => self.industry_other = value,
            "storageDuration" => self.storage_duration = value,
            "moveInDate" => self.move_in_date = value,
            "currentWms" => self.current_wms = value,
            "wmsOther" => self.wms_other = value,
            "analyticsGoals" | "analyticsGoals[]" => push_unique(&mut self.analytics_goals, value),
            "dataVolume" => self.data_volume = value,
            "goodsType" => self.goods_type = value,
            "goodsOther" => self.goods_other = value,
            "storageStartDate" => self.storage_start_date = value,
            "storageDurationWeeks" => self.storage_duration_weeks = value,
            "palletCount" => self.pallet_count = value,
            "monthlyOrders" => self.monthly_orders = value,
            "salesChannels" | "salesChannels[]" => push_unique(&mut self.sales_channels, value),
            "channelOther" => self.channel_other = value,
            "servicesNeeded" | "servicesNeeded[]" => push_unique(&mut self.services_needed, value),
            _ => return false,
        }
        true
    }

    /// Copy the fields of `inquiry_type` from `posted`, leaving every other
    /// type's values untouched.
    pub fn merge_for_type(&mut self, inquiry_type: InquiryType, posted: TypeFields) {
        match inquiry_type {
            InquiryType::WarehouseAvailability => {
                self.preferred_location = posted.preferred_location;
                self.space_required = posted.space_required;
                self.industry_type = posted.industry_type;
                self.industry_other = posted.industry_other;
                self.storage_duration = posted.storage_duration;
                self.move_in_date = posted.move_in_date;
            }
            InquiryType::AiAnalytics => {
                self.current_wms = posted.current_wms;
                self.wms_other = posted.wms_other;
                self.analytics_goals = posted.analytics_goals;
                self.data_volume = posted.data_volume;
            }
            InquiryType::ShortTermStorage => {
                self.goods_type = posted.goods_type;
                self.goods_other = posted.goods_other;
                self.storage_start_date = posted.storage_start_date;
                self.storage_duration_weeks = posted.storage_duration_weeks;
                self.pallet_count = posted.pallet_count;
            }
            InquiryType::Fulfillment => {
                self.monthly_orders = posted.monthly_orders;
                self.sales_channels = posted.sales_channels;
                self.channel_other = posted.channel_other;
                self.services_needed = posted.services_needed;
            }
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

/// Everything the visitor has entered so far. Stored in the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryDraft {
    pub contact: ContactDetails,
    /// Set once step 1 has passed validation.
    pub contact_confirmed: bool,
    pub inquiry_type: Option<InquiryType>,
    pub fields: TypeFields,
    pub message: String,
    pub consent: bool,
}

impl InquiryDraft {
    pub const SESSION_KEY: &'static str = "inquiry_draft";

    /// Validate and store step 1. On failure the draft keeps the typed values
    /// so the form can be re-rendered with them.
    pub fn submit_contact(&mut self, contact: ContactDetails) -> Result<(), FieldErrors> {
        self.contact = contact.trimmed();
        self.contact_confirmed = false;
        self.contact.check()?;
        self.contact_confirmed = true;
        Ok(())
    }

    /// Fold a step-2 post into the draft and check it is submittable.
    pub fn submit_details(&mut self, form: &StepTwoForm) -> Result<InquiryType, FieldErrors> {
        let inquiry_type = form.inquiry_type.as_deref().and_then(InquiryType::from_label);
        if let Some(t) = inquiry_type {
            self.inquiry_type = Some(t);
            self.fields.merge_for_type(t, form.fields.clone());
        }
        self.message = form.message.trim().to_string();
        self.consent = form.consent;

        let mut errors = FieldErrors::new();
        if !self.contact_confirmed {
            errors.insert("contact", "Please complete your contact details first");
        }
        if inquiry_type.is_none() {
            errors.insert("inquiryType", "Please select an inquiry type");
        }
        if !form.consent {
            errors.insert("consent", "Please confirm we may contact you");
        }
        errors.into_result()?;
        inquiry_type.ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.insert("inquiryType", "Please select an inquiry type");
            errors
        })
    }

    /// Text parts of the submission, in order. Array fields repeat their name.
    pub fn parts(&self, inquiry_type: InquiryType) -> Vec<(&'static str, String)> {
        let mut parts = vec![
            ("fullName", self.contact.full_name.clone()),
            ("email", self.contact.email.clone()),
            ("phoneNumber", self.contact.phone_number.clone()),
            ("companyName", self.contact.company_name.clone()),
            ("inquiryType", inquiry_type.label().to_string()),
        ];
        for field in FieldSet::for_type(inquiry_type, self).fields {
            for value in field.values {
                if !value.is_empty() {
                    parts.push((field.name, value));
                }
            }
        }
        if !self.message.is_empty() {
            parts.push(("message", self.message.clone()));
        }
        parts.push(("consent", self.consent.to_string()));
        parts
    }

    pub fn to_multipart(
        &self,
        inquiry_type: InquiryType,
        attachment: Option<Attachment>,
    ) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.parts(inquiry_type) {
            form = form.text(name, value);
        }
        if let Some(file) = attachment {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)
                .map_err(|e| ApiError::Attachment(e.to_string()))?;
            form = form.part("attachment", part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A parsed step-2 post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepTwoForm {
    pub inquiry_type: Option<String>,
    pub fields: TypeFields,
    pub message: String,
    pub consent: bool,
    pub attachment: Option<Attachment>,
}

impl StepTwoForm {
    /// Apply one text field of the post.
    pub fn apply(&mut self, name: &str, value: String) {
        match name {
            "inquiryType" => {
                self.inquiry_type = Some(value.trim().to_string()).filter(|v| !v.is_empty())
            }
            "message" => self.message = value,
            "consent" => self.consent = matches!(value.trim(), "true" | "on" | "1" | "yes"),
            other => {
                if !self.fields.apply(other, value) {
                    tracing::debug!(field = other, "Ignoring unknown inquiry form field");
                }
            }
        }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut form = StepTwoForm::default();
        for (name, value) in pairs {
            form.apply(&name, value);
        }
        form
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Text,
    Number,
    Date,
    Select,
    Checkboxes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub control: Control,
    pub options: &'static [&'static str],
    /// Current values; one entry for scalar controls.
    pub values: Vec<String>,
}

impl FieldSpec {
    fn scalar(
        name: &'static str,
        label: &'static str,
        control: Control,
        value: &str,
    ) -> Self {
        Self {
            name,
            label,
            control,
            options: &[],
            values: vec![value.to_string()],
        }
    }

    fn select(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
        value: &str,
    ) -> Self {
        Self {
            options,
            ..Self::scalar(name, label, Control::Select, value)
        }
    }

    fn checkboxes(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
        values: &[String],
    ) -> Self {
        Self {
            name,
            label,
            control: Control::Checkboxes,
            options,
            values: values.to_vec(),
        }
    }

    pub fn value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or("")
    }

    pub fn is_selected(&self, option: &str) -> bool {
        self.values.iter().any(|v| v == option)
    }

    pub fn input_type(&self) -> &'static str {
        match self.control {
            Control::Number => "number",
            Control::Date => "date",
            _ => "text",
        }
    }

    pub fn is_select(&self) -> bool {
        self.control == Control::Select
    }

    pub fn is_checkboxes(&self) -> bool {
        self.control == Control::Checkboxes
    }
}

pub const INDUSTRY_TYPES: &[&str] = &[
    "E-commerce",
    "Retail",
    "FMCG",
    "Pharmaceuticals",
    "Automotive",
    "Electronics",
    OTHERS,
];
pub const STORAGE_DURATIONS: &[&str] = &["1-3 months", "3-6 months", "6-12 months", "12+ months"];
pub const WMS_OPTIONS: &[&str] = &["None", "SAP", "Oracle", "Unicommerce", "Increff", OTHERS];
pub const ANALYTICS_GOALS: &[&str] = &[
    "Demand forecasting",
    "Inventory optimisation",
    "Space utilisation",
    "Labour planning",
];
pub const DATA_VOLUMES: &[&str] = &["Under 1,000 SKUs", "1,000-10,000 SKUs", "Over 10,000 SKUs"];
pub const GOODS_TYPES: &[&str] = &[
    "General merchandise",
    "Perishables",
    "Electronics",
    "Furniture",
    OTHERS,
];
pub const SALES_CHANNELS: &[&str] = &["Own website", "Amazon", "Flipkart", "Retail stores", OTHERS];
pub const SERVICES: &[&str] = &[
    "Pick and pack",
    "Kitting",
    "Returns processing",
    "Last-mile delivery",
    "COD handling",
];

/// The inputs shown for one inquiry type, filled from the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    pub inquiry_type: InquiryType,
    pub fields: Vec<FieldSpec>,
}

impl FieldSet {
    pub fn for_type(inquiry_type: InquiryType, draft: &InquiryDraft) -> Self {
        let f = &draft.fields;
        let mut fields = Vec::new();
        match inquiry_type {
            InquiryType::WarehouseAvailability => {
                fields.push(FieldSpec::scalar(
                    "preferredLocation",
                    "Preferred location",
                    Control::Text,
                    &f.preferred_location,
                ));
                fields.push(FieldSpec::scalar(
                    "spaceRequired",
                    "Space required (sq ft)",
                    Control::Number,
                    &f.space_required,
                ));
                fields.push(FieldSpec::select(
                    "industryType",
                    "Industry",
                    INDUSTRY_TYPES,
                    &f.industry_type,
                ));
                if f.industry_type == OTHERS {
                    fields.push(FieldSpec::scalar(
                        "industryOther",
                        "Please specify your industry",
                        Control::Text,
                        &f.industry_other,
                    ));
                }
                fields.push(FieldSpec::select(
                    "storageDuration",
                    "Storage duration",
                    STORAGE_DURATIONS,
                    &f.storage_duration,
                ));
                fields.push(FieldSpec::scalar(
                    "moveInDate",
                    "Move-in date",
                    Control::Date,
                    &f.move_in_date,
                ));
            }
            InquiryType::AiAnalytics => {
                fields.push(FieldSpec::select(
                    "currentWms",
                    "Current WMS",
                    WMS_OPTIONS,
                    &f.current_wms,
                ));
                if f.current_wms == OTHERS {
                    fields.push(FieldSpec::scalar(
                        "wmsOther",
                        "Please specify your WMS",
                        Control::Text,
                        &f.wms_other,
                    ));
                }
                fields.push(FieldSpec::checkboxes(
                    "analyticsGoals",
                    "Analytics goals",
                    ANALYTICS_GOALS,
                    &f.analytics_goals,
                ));
                fields.push(FieldSpec::select(
                    "dataVolume",
                    "Data volume",
                    DATA_VOLUMES,
                    &f.data_volume,
                ));
            }
            InquiryType::ShortTermStorage => {
                fields.push(FieldSpec::select(
                    "goodsType",
                    "Type of goods",
                    GOODS_TYPES,
                    &f.goods_type,
                ));
                if f.goods_type == OTHERS {
                    fields.push(FieldSpec::scalar(
                        "goodsOther",
                        "Please specify the goods",
                        Control::Text,
                        &f.goods_other,
                    ));
                }
                fields.push(FieldSpec::scalar(
                    "storageStartDate",
                    "Storage start date",
                    Control::Date,
                    &f.storage_start_date,
                ));
                fields.push(FieldSpec::scalar(
                    "storageDurationWeeks",
                    "Duration (weeks)",
                    Control::Number,
                    &f.storage_duration_weeks,
                ));
                fields.push(FieldSpec::scalar(
                    "palletCount",
                    "Number of pallets",
                    Control::Number,
                    &f.pallet_count,
                ));
            }
            InquiryType::Fulfillment => {
                fields.push(FieldSpec::scalar(
                    "monthlyOrders",
                    "Monthly orders",
                    Control::Number,
                    &f.monthly_orders,
                ));
                fields.push(FieldSpec::checkboxes(
                    "salesChannels",
                    "Sales channels",
                    SALES_CHANNELS,
                    &f.sales_channels,
                ));
                if f.sales_channels.iter().any(|c| c == OTHERS) {
                    fields.push(FieldSpec::scalar(
                        "channelOther",
                        "Please specify other channels",
                        Control::Text,
                        &f.channel_other,
                    ));
                }
                fields.push(FieldSpec::checkboxes(
                    "servicesNeeded",
                    "Services needed",
                    SERVICES,
                    &f.services_needed,
                ));
            }
        }
        Self {
            inquiry_type,
            fields,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(email: &str, phone: &str) -> ContactDetails {
        ContactDetails {
            full_name: " Anita Desai ".to_string(),
            email: email.to_string(),
            phone_number: phone.to_string(),
            company_name: "Desai Traders".to_string(),
        }
    }

    fn confirmed_draft() -> InquiryDraft {
        let mut draft = InquiryDraft::default();
        draft
            .submit_contact(contact("anita@desai.in", "9876543210"))
            .unwrap();
        draft
    }

    #[test]
    fn step_one_reports_each_invalid_field() {
        let mut draft = InquiryDraft::default();
        let errors = draft
            .submit_contact(contact("anita@", "98765"))
            .unwrap_err();

        assert!(errors.has("email"));
        assert!(errors.has("phoneNumber"));
        assert!(!errors.has("fullName"));
        assert_eq!(errors.len(), 2);
        assert!(!draft.contact_confirmed);
        assert_eq!(draft.contact.full_name, "Anita Desai");

        draft
            .submit_contact(contact("anita@desai.in", "9876543210"))
            .unwrap();
        assert!(draft.contact_confirmed);
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let errors = ContactDetails {
            full_name: "   ".to_string(),
            ..contact("a@b.co", "0123456789")
        }
        .trimmed()
        .check()
        .unwrap_err();
        assert_eq!(errors.get("fullName"), Some("Full name is required"));
    }

    #[test]
    fn others_reveals_specify_input() {
        let mut draft = confirmed_draft();
        let names = FieldSet::for_type(InquiryType::WarehouseAvailability, &draft).names();
        assert!(!names.contains(&"industryOther"));

        draft.fields.industry_type = OTHERS.to_string();
        let names = FieldSet::for_type(InquiryType::WarehouseAvailability, &draft).names();
        assert!(names.contains(&"industryOther"));
    }

    #[test]
    fn switching_type_shows_new_branch() {
        let draft = confirmed_draft();
        let names = FieldSet::for_type(InquiryType::Fulfillment, &draft).names();
        assert_eq!(names, vec!["monthlyOrders", "salesChannels", "servicesNeeded"]);
        assert!(!names.contains(&"preferredLocation"));
    }

    #[test]
    fn step_two_requires_type_and_consent() {
        let mut draft = confirmed_draft();
        let errors = draft
            .submit_details(&StepTwoForm::default())
            .unwrap_err();
        assert!(errors.has("inquiryType"));
        assert!(errors.has("consent"));

        let form = StepTwoForm::from_pairs([
            ("inquiryType".to_string(), "Short-Term Storage Inquiry".to_string()),
            ("consent".to_string(), "on".to_string()),
            ("palletCount".to_string(), "40".to_string()),
        ]);
        assert_eq!(draft.submit_details(&form), Ok(InquiryType::ShortTermStorage));
        assert_eq!(draft.fields.pallet_count, "40");
    }

    #[test]
    fn only_active_type_fields_are_submitted() {
        let mut draft = confirmed_draft();
        let warehouse = StepTwoForm::from_pairs([
            ("inquiryType".to_string(), InquiryType::WarehouseAvailability.label().to_string()),
            ("preferredLocation".to_string(), "Bhiwandi".to_string()),
            ("consent".to_string(), "true".to_string()),
        ]);
        draft.submit_details(&warehouse).unwrap();

        let fulfillment = StepTwoForm::from_pairs([
            ("inquiryType".to_string(), InquiryType::Fulfillment.label().to_string()),
            ("salesChannels".to_string(), "Amazon".to_string()),
            ("salesChannels".to_string(), "Flipkart".to_string()),
            ("consent".to_string(), "true".to_string()),
        ]);
        let active = draft.submit_details(&fulfillment).unwrap();

        // The earlier branch survives in the draft but is not sent.
        assert_eq!(draft.fields.preferred_location, "Bhiwandi");
        let parts = draft.parts(active);
        assert!(parts.iter().all(|(name, _)| *name != "preferredLocation"));

        let channels: Vec<&str> = parts
            .iter()
            .filter(|(name, _)| *name == "salesChannels")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(channels, vec!["Amazon", "Flipkart"]);
        assert!(parts.contains(&("inquiryType", "Full-Service Fulfillment Inquiry".to_string())));
        assert!(parts.contains(&("consent", "true".to_string())));
    }

    #[test]
    fn hidden_other_input_is_not_submitted() {
        let mut draft = confirmed_draft();
        draft.fields.industry_type = "Retail".to_string();
        draft.fields.industry_other = "Toys".to_string();
        let parts = draft.parts(InquiryType::WarehouseAvailability);
        assert!(parts.iter().all(|(name, _)| *name != "industryOther"));
    }

    #[test]
    fn multipart_accepts_attachment() {
        let draft = confirmed_draft();
        let attachment = Attachment {
            file_name: "layout.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        };
        assert!(draft
            .to_multipart(InquiryType::AiAnalytics, Some(attachment))
            .is_ok());

        let bad = Attachment {
            file_name: "x".to_string(),
            content_type: "not a mime".to_string(),
            bytes: Vec::new(),
        };
        assert!(matches!(
            draft.to_multipart(InquiryType::AiAnalytics, Some(bad)),
            Err(ApiError::Attachment(_))
        ));
    }

    #[test]
    fn type_labels_round_trip() {
        for t in InquiryType::ALL {
            assert_eq!(InquiryType::from_label(t.label()), Some(t));
        }
        assert_eq!(InquiryType::from_label("General"), None);
    }
}
