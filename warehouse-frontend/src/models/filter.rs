//! Search filter: what the user committed with "Apply".

use serde::{Deserialize, Serialize};

use crate::widgets::RangeSelector;

/// Size slider track: square feet.
pub const SIZE_TRACK: (f64, f64, f64) = (500.0, 20000.0, 100.0);
/// Budget slider track: monthly rent in rupees.
pub const BUDGET_TRACK: (f64, f64, f64) = (0.0, 10_000_000.0, 1.0);
/// Page size used when the caller asks for every result at once.
pub const FETCH_ALL_LIMIT: u32 = 1000;

/// The two slider-backed ranges of the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeTrack {
    Size,
    Budget,
}

impl RangeTrack {
    pub fn as_str(self) -> &'static str {
        match self {
            RangeTrack::Size => "size",
            RangeTrack::Budget => "budget",
        }
    }

    /// `(min, max, step)` of the track.
    pub fn bounds(self) -> (f64, f64, f64) {
        match self {
            RangeTrack::Size => SIZE_TRACK,
            RangeTrack::Budget => BUDGET_TRACK,
        }
    }

    /// Query parameter names of the low and high ends.
    pub fn param_names(self) -> (&'static str, &'static str) {
        match self {
            RangeTrack::Size => ("min_size", "max_size"),
            RangeTrack::Budget => ("min_rent", "max_rent"),
        }
    }

    /// A selector on this track holding `value`, or the whole track.
    pub fn selector(self, value: Option<(f64, f64)>) -> RangeSelector {
        let (min, max, step) = self.bounds();
        RangeSelector::with_value(min, max, step, value.unwrap_or((min, max)))
    }

    /// This track's pair in `filter`.
    pub fn range_of(self, filter: &Filter) -> Option<(f64, f64)> {
        match self {
            RangeTrack::Size => filter.size_range,
            RangeTrack::Budget => filter.budget_range,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub location: Option<String>,
    pub size_range: Option<(f64, f64)>,
    pub budget_range: Option<(f64, f64)>,
    pub storage_type: Option<String>,
    pub fetch_all: bool,
}

/// Raw query-string form of a [`Filter`] (`/warehouses?location=..&min_size=..`).
///
/// Every field is text so empty form inputs parse instead of rejecting the
/// request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub location: Option<String>,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub min_rent: Option<String>,
    pub max_rent: Option<String>,
    pub warehouse_type: Option<String>,
    pub fetch_all: Option<String>,
    pub page: Option<String>,
}

impl FilterParams {
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }
}

impl Filter {
    /// Build the committed filter from query parameters.
    ///
    /// A range with only one end set is completed with the track bound, and
    /// every pair is normalised through the slider so `lo <= hi` holds.
    pub fn from_params(params: &FilterParams) -> Self {
        Self {
            location: non_empty(params.location.as_deref()),
            size_range: range_from(&params.min_size, &params.max_size, SIZE_TRACK),
            budget_range: range_from(&params.min_rent, &params.max_rent, BUDGET_TRACK),
            storage_type: non_empty(params.warehouse_type.as_deref()),
            fetch_all: matches!(
                params.fetch_all.as_deref().map(str::trim),
                Some("true") | Some("1") | Some("on")
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.size_range.is_none()
            && self.budget_range.is_none()
            && self.storage_type.is_none()
    }

    /// Query sent to the listing endpoint for `page`.
    pub fn to_query(&self, page: u32, limit: u32) -> ListingQuery {
        let (page, limit) = if self.fetch_all {
            (1, FETCH_ALL_LIMIT)
        } else {
            (page.max(1), limit.max(1))
        };
        ListingQuery {
            page,
            limit,
            location: self.location.clone(),
            min_size: self.size_range.map(|(lo, _)| number_param(lo)),
            max_size: self.size_range.map(|(_, hi)| number_param(hi)),
            min_rent: self.budget_range.map(|(lo, _)| number_param(lo)),
            max_rent: self.budget_range.map(|(_, hi)| number_param(hi)),
            warehouse_type: self.storage_type.clone(),
        }
    }

    /// Query string that reproduces this filter in a page link.
    pub fn to_link_query(&self) -> String {
        let query = self.to_query(1, 1);
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(v) = query.location {
            pairs.push(("location", v));
        }
        if let Some(v) = query.min_size {
            pairs.push(("min_size", v));
        }
        if let Some(v) = query.max_size {
            pairs.push(("max_size", v));
        }
        if let Some(v) = query.min_rent {
            pairs.push(("min_rent", v));
        }
        if let Some(v) = query.max_rent {
            pairs.push(("max_rent", v));
        }
        if let Some(v) = query.warehouse_type {
            pairs.push(("warehouse_type", v));
        }
        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Query parameters of `GET /api/(public/)warehouses`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_type: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number(value: &Option<String>) -> Option<f64> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn range_from(
    lo: &Option<String>,
    hi: &Option<String>,
    (min, max, step): (f64, f64, f64),
) -> Option<(f64, f64)> {
    let pair = match (parse_number(lo), parse_number(hi)) {
        (None, None) => return None,
        (Some(lo), None) => (lo, max),
        (None, Some(hi)) => (min, hi),
        (Some(lo), Some(hi)) => (lo, hi),
    };
    Some(RangeSelector::new(min, max, step).clamp_pair(pair))
}

pub(crate) fn number_param(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}
