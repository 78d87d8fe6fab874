use anyhow::anyhow;
use askama::Template;
use axum::extract::Query;
use serde::Deserialize;
use service_core::error::AppError;

use crate::handlers::views::RangeView;
use crate::models::RangeTrack;
use crate::widgets::Handle;

#[derive(Template)]
#[template(path = "partials/range.html")]
pub struct RangeTemplate {
    pub range: RangeView,
}

/// One finished pointer drag on a slider: where it started and ended on a
/// rail `width` pixels wide, plus the pair it started from.
#[derive(Debug, Deserialize)]
pub struct RangeDragQuery {
    pub track: RangeTrack,
    pub handle: Handle,
    pub start_x: f64,
    pub x: f64,
    pub width: f64,
    #[serde(default)]
    pub lo: Option<f64>,
    #[serde(default)]
    pub hi: Option<f64>,
}

/// `GET /filters/range`: replay a drag and answer the slider with the
/// step-quantised, ordered pair.
pub async fn range_drag(Query(query): Query<RangeDragQuery>) -> Result<RangeTemplate, AppError> {
    let inputs = [query.start_x, query.x, query.width];
    let pair = query.lo.zip(query.hi);
    if inputs.iter().any(|v| !v.is_finite())
        || pair.is_some_and(|(lo, hi)| !lo.is_finite() || !hi.is_finite())
    {
        return Err(AppError::BadRequest(anyhow!("slider positions must be finite numbers")));
    }

    let mut selector = query.track.selector(pair);
    let drag = selector.begin_drag(query.handle, query.start_x, query.width);
    drag.move_to(&mut selector, query.x);
    let value = drag.end(&mut selector);
    tracing::debug!(track = query.track.as_str(), lo = value.0, hi = value.1, "Range dragged");

    Ok(RangeTemplate {
        range: RangeView::new(query.track, Some(value)),
    })
}
