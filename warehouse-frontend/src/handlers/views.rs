//! Flat view models handed to templates.

use crate::config::UiSettings;
use crate::forms::{FieldSet, FieldSpec, InquiryDraft, InquiryType};
use crate::manage::{BoardRow, BoardSummary, BookingBoard};
use crate::models::filter::number_param;
use crate::models::{
    Banner, Filter, Pagination, Paise, PartnerInquiry, PartnerInquiryStatus, RangeTrack,
    RecordType, Warehouse,
};
use crate::search::FeedSnapshot;
use crate::text::normalize_message;

pub struct PageLinkView {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

pub struct PagerView {
    pub previous_href: String,
    pub previous_disabled: bool,
    pub next_href: String,
    pub next_disabled: bool,
    pub numbers: Vec<PageLinkView>,
    pub page: u32,
    pub pages: u32,
}

impl PagerView {
    pub fn new(pagination: &Pagination, base: &str, query: &str) -> Self {
        let href = |page: u32| {
            if query.is_empty() {
                format!("{}?page={}", base, page)
            } else {
                format!("{}?{}&page={}", base, query, page)
            }
        };
        let nav = pagination.nav();
        Self {
            previous_href: nav.previous.map(&href).unwrap_or_default(),
            previous_disabled: nav.previous_disabled(),
            next_href: nav.next.map(&href).unwrap_or_default(),
            next_disabled: nav.next_disabled(),
            numbers: nav
                .numbers
                .iter()
                .map(|link| PageLinkView {
                    number: link.number,
                    href: href(link.number),
                    current: link.current,
                })
                .collect(),
            page: pagination.page,
            pages: pagination.pages,
        }
    }
}

pub struct WarehouseCard {
    pub id: String,
    pub name: String,
    pub location: String,
    pub area: String,
    pub rent: String,
    pub warehouse_type: String,
    pub image: String,
    pub has_image: bool,
}

impl From<&Warehouse> for WarehouseCard {
    fn from(w: &Warehouse) -> Self {
        Self {
            id: w.id.clone(),
            name: w.name.clone(),
            location: w.location(),
            area: format!("{:.0} sq ft", w.build_up_area),
            rent: Paise((w.rent * 100.0).round() as i64).to_string(),
            warehouse_type: w.warehouse_type.clone(),
            image: w.cover_image().unwrap_or_default().to_string(),
            has_image: w.cover_image().is_some(),
        }
    }
}

/// One two-handle slider. The number inputs stay blank until a range is
/// chosen, so an untouched slider does not filter; `lo_value`/`hi_value`
/// always hold the handle positions.
pub struct RangeView {
    pub track: &'static str,
    pub legend: &'static str,
    pub min_name: &'static str,
    pub max_name: &'static str,
    pub min: String,
    pub max: String,
    pub step: String,
    pub lo: String,
    pub hi: String,
    pub lo_value: String,
    pub hi_value: String,
    pub lo_pct: String,
    pub hi_pct: String,
}

impl RangeView {
    pub fn new(track: RangeTrack, value: Option<(f64, f64)>) -> Self {
        let (min, max, step) = track.bounds();
        let (min_name, max_name) = track.param_names();
        let selector = track.selector(value);
        let (lo, hi) = selector.values();
        let chosen = |v: f64| value.map(|_| number_param(v)).unwrap_or_default();
        Self {
            track: track.as_str(),
            legend: match track {
                RangeTrack::Size => "Size (sq ft)",
                RangeTrack::Budget => "Monthly budget (₹)",
            },
            min_name,
            max_name,
            min: number_param(min),
            max: number_param(max),
            step: number_param(step),
            lo: chosen(lo),
            hi: chosen(hi),
            lo_value: number_param(lo),
            hi_value: number_param(hi),
            lo_pct: format!("{:.2}", selector.percent(lo)),
            hi_pct: format!("{:.2}", selector.percent(hi)),
        }
    }
}

/// Filter values as the search form shows them.
pub struct FilterForm {
    pub location: String,
    pub ranges: Vec<RangeView>,
    pub warehouse_type: String,
}

impl From<&Filter> for FilterForm {
    fn from(filter: &Filter) -> Self {
        Self {
            location: filter.location.clone().unwrap_or_default(),
            ranges: [RangeTrack::Size, RangeTrack::Budget]
                .into_iter()
                .map(|track| RangeView::new(track, track.range_of(filter)))
                .collect(),
            warehouse_type: filter.storage_type.clone().unwrap_or_default(),
        }
    }
}

pub struct ResultsView {
    pub cards: Vec<WarehouseCard>,
    pub total: u64,
    pub is_empty: bool,
    pub pager: PagerView,
}

impl ResultsView {
    pub fn empty(limit: u32) -> Self {
        Self {
            cards: Vec::new(),
            total: 0,
            is_empty: true,
            pager: PagerView::new(&Pagination::empty(limit), "/warehouses", ""),
        }
    }

    pub fn new(snapshot: &FeedSnapshot) -> Self {
        Self {
            cards: snapshot.items.iter().map(WarehouseCard::from).collect(),
            total: snapshot.pagination.total,
            is_empty: snapshot.items.is_empty(),
            pager: PagerView::new(
                &snapshot.pagination,
                "/warehouses",
                &snapshot.filter.to_link_query(),
            ),
        }
    }
}

pub struct OptionView {
    pub value: &'static str,
    pub selected: bool,
}

pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub is_select: bool,
    pub is_checkboxes: bool,
    pub value: String,
    pub options: Vec<OptionView>,
}

impl From<&FieldSpec> for FieldView {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            name: spec.name,
            label: spec.label,
            input_type: spec.input_type(),
            is_select: spec.is_select(),
            is_checkboxes: spec.is_checkboxes(),
            value: spec.value().to_string(),
            options: spec
                .options
                .iter()
                .map(|option| OptionView {
                    value: *option,
                    selected: spec.is_selected(option),
                })
                .collect(),
        }
    }
}

pub struct TypeOptionView {
    pub label: &'static str,
    pub selected: bool,
}

pub fn type_options(selected: Option<InquiryType>) -> Vec<TypeOptionView> {
    InquiryType::ALL
        .into_iter()
        .map(|t| TypeOptionView {
            label: t.label(),
            selected: selected == Some(t),
        })
        .collect()
}

pub fn field_views(draft: &InquiryDraft) -> Vec<FieldView> {
    draft
        .inquiry_type
        .map(|t| {
            FieldSet::for_type(t, draft)
                .fields
                .iter()
                .map(FieldView::from)
                .collect()
        })
        .unwrap_or_default()
}

pub struct BannerView {
    pub class: &'static str,
    pub message: String,
    pub dismiss_ms: u64,
}

impl From<&Banner> for BannerView {
    fn from(banner: &Banner) -> Self {
        Self {
            class: banner.css_class(),
            message: banner.message.clone(),
            dismiss_ms: banner.dismiss_after_ms,
        }
    }
}

pub fn banner_view(banner: Option<&Banner>) -> Option<BannerView> {
    banner.map(BannerView::from)
}

pub struct MessageView {
    pub text: String,
    pub unavailable: bool,
}

pub fn message_view(raw: &str, ui: &UiSettings) -> MessageView {
    let normalized = normalize_message(raw, ui.message_max_len);
    MessageView {
        unavailable: normalized.is_unavailable(),
        text: normalized.text,
    }
}

pub struct StatusOptionView {
    pub value: &'static str,
    pub selected: bool,
}

pub struct BookingRowView {
    pub id: String,
    /// `id` escaped for use as a path segment.
    pub path_id: String,
    /// `type:id`, the bulk selection value.
    pub key: String,
    pub record_type: &'static str,
    pub is_confirmed: bool,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub company_name: String,
    pub inquiry_type: String,
    pub status: &'static str,
    pub status_options: Vec<StatusOptionView>,
    pub booking_number: String,
    pub warehouse_name: String,
    pub amount_paid: String,
    pub created_at: String,
    pub message: MessageView,
    pub sync_failed: bool,
}

impl BookingRowView {
    pub fn new(row: &BoardRow, ui: &UiSettings) -> Self {
        let record = &row.record;
        let record_type = record.record_type();
        let status = record.status().as_str();
        Self {
            id: record.id.clone(),
            path_id: urlencoding::encode(&record.id).into_owned(),
            key: record.key().to_string(),
            record_type: record_type.as_str(),
            is_confirmed: record_type == RecordType::Confirmed,
            full_name: record.full_name.clone(),
            email: record.email.clone(),
            phone_number: record.phone_number.clone(),
            company_name: record.company_name.clone(),
            inquiry_type: record.inquiry_type.clone(),
            status,
            status_options: record_type
                .status_options()
                .into_iter()
                .map(|value| StatusOptionView {
                    value,
                    selected: value == status,
                })
                .collect(),
            booking_number: record
                .payment()
                .and_then(|p| p.booking_number.clone())
                .unwrap_or_default(),
            warehouse_name: record.warehouse_name().to_string(),
            amount_paid: record.amount_paid().to_string(),
            created_at: record
                .created_at
                .map(|t| t.format("%d %b %Y").to_string())
                .unwrap_or_default(),
            message: message_view(&record.message, ui),
            sync_failed: row.sync_failed,
        }
    }
}

pub struct StatusCountView {
    pub label: String,
    pub count: usize,
}

pub struct SummaryView {
    pub total: u64,
    pub inquiries: usize,
    pub confirmed: usize,
    pub revenue: String,
    pub by_status: Vec<StatusCountView>,
}

impl From<&BoardSummary> for SummaryView {
    fn from(summary: &BoardSummary) -> Self {
        Self {
            total: summary.total,
            inquiries: summary.inquiries,
            confirmed: summary.confirmed,
            revenue: summary.revenue.to_string(),
            by_status: summary
                .by_status
                .iter()
                .map(|c| StatusCountView {
                    label: format!("{} / {}", c.record_type.as_str(), c.status),
                    count: c.count,
                })
                .collect(),
        }
    }
}

/// Where a board's row actions post to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardScope {
    User,
    Admin,
}

impl BoardScope {
    pub fn action_base(self) -> &'static str {
        match self {
            BoardScope::User => "/dashboard/bookings",
            BoardScope::Admin => "/admin/bookings",
        }
    }

    pub fn page_path(self) -> &'static str {
        match self {
            BoardScope::User => "/dashboard",
            BoardScope::Admin => "/admin",
        }
    }
}

pub struct BoardView {
    pub rows: Vec<BookingRowView>,
    pub summary: SummaryView,
    pub pager: PagerView,
    pub action_base: &'static str,
    pub page_path: &'static str,
    pub can_delete: bool,
    pub is_empty: bool,
    pub filter_status: String,
    pub filter_type: String,
    pub filter_q: String,
}

impl BoardView {
    pub fn new(board: &BookingBoard, scope: BoardScope, ui: &UiSettings) -> Self {
        let (rows, pagination) = board.page(ui.page_size);
        let filter = board.filter();
        let filter_status = filter.status.clone().unwrap_or_default();
        let filter_type = filter.kind.clone().unwrap_or_default();
        let filter_q = filter.q.clone().unwrap_or_default();

        let mut query: Vec<String> = Vec::new();
        for (key, value) in [("status", &filter_status), ("type", &filter_type), ("q", &filter_q)] {
            if !value.is_empty() {
                query.push(format!("{}={}", key, urlencoding::encode(value)));
            }
        }

        Self {
            is_empty: rows.is_empty(),
            rows: rows.iter().map(|row| BookingRowView::new(row, ui)).collect(),
            summary: SummaryView::from(&board.summary()),
            pager: PagerView::new(&pagination, scope.page_path(), &query.join("&")),
            action_base: scope.action_base(),
            page_path: scope.page_path(),
            can_delete: scope == BoardScope::Admin,
            filter_status,
            filter_type,
            filter_q,
        }
    }
}

pub struct PartnerRowView {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub company_name: String,
    pub inquiry_type: String,
    pub status_label: &'static str,
    pub status_options: Vec<StatusOptionView>,
    pub message: MessageView,
    pub created_at: String,
    pub sync_failed: bool,
}

impl PartnerRowView {
    pub fn new(inquiry: &PartnerInquiry, sync_failed: bool, ui: &UiSettings) -> Self {
        Self {
            id: inquiry.id.clone(),
            full_name: inquiry.full_name.clone(),
            email: inquiry.email.clone(),
            phone_number: inquiry.phone_number.clone(),
            company_name: inquiry.company_name.clone(),
            inquiry_type: inquiry.inquiry_type.clone(),
            status_label: inquiry.status.label(),
            status_options: PartnerInquiryStatus::ALL
                .into_iter()
                .map(|status| StatusOptionView {
                    value: status.as_str(),
                    selected: status == inquiry.status,
                })
                .collect(),
            message: message_view(inquiry.message.as_deref().unwrap_or_default(), ui),
            created_at: inquiry
                .created_at
                .map(|t| t.format("%d %b %Y").to_string())
                .unwrap_or_default(),
            sync_failed,
        }
    }
}
