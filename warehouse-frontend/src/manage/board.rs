//! Optimistic booking board.
//!
//! A status change or delete is applied to the board first and yields a
//! pending token. The caller then confirms it once the API agrees, or rolls
//! it back. A rolled-back status change marks its row `sync_failed` so the
//! view can offer a retry instead of silently showing stale data.

use serde::Deserialize;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::{
    BookingRecord, BookingStatus, InquiryStatus, Pagination, Paise, RecordKey, RecordStatus,
    RecordType,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("booking {0} is not on the board")]
    NotFound(String),

    #[error("booking {id} is a {actual} record, not {expected}")]
    WrongKind {
        id: String,
        expected: RecordType,
        actual: RecordType,
    },
}

impl From<BoardError> for AppError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(err)),
            BoardError::WrongKind { .. } => AppError::Unprocessable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub record: BookingRecord,
    pub sync_failed: bool,
}

/// Independent list filters. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoardFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl BoardFilter {
    fn status(&self) -> Option<&str> {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn kind(&self) -> Option<RecordType> {
        self.kind.as_deref().and_then(RecordType::parse)
    }

    fn text(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }

    fn matches(&self, record: &BookingRecord) -> bool {
        self.kind().map_or(true, |kind| record.record_type() == kind)
            && self
                .status()
                .map_or(true, |status| record.status().as_str().eq_ignore_ascii_case(status))
            && record.matches_text(self.text())
    }
}

#[derive(Debug, PartialEq)]
#[must_use = "confirm or roll back the change"]
pub struct PendingChange {
    key: RecordKey,
    previous: RecordStatus,
    next: RecordStatus,
}

impl PendingChange {
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn status(&self) -> RecordStatus {
        self.next
    }
}

#[derive(Debug, PartialEq)]
#[must_use = "confirm or restore the deletion"]
pub struct PendingDelete {
    index: usize,
    row: BoardRow,
}

impl PendingDelete {
    pub fn record(&self) -> &BookingRecord {
        &self.row.record
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub record_type: RecordType,
    pub status: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub total: u64,
    pub inquiries: usize,
    pub confirmed: usize,
    pub by_status: Vec<StatusCount>,
    pub revenue: Paise,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingBoard {
    rows: Vec<BoardRow>,
    total: u64,
    filter: BoardFilter,
}

impl BookingBoard {
    pub fn new(records: Vec<BookingRecord>, total: u64) -> Self {
        Self {
            total: total.max(records.len() as u64),
            rows: records
                .into_iter()
                .map(|record| BoardRow {
                    record,
                    sync_failed: false,
                })
                .collect(),
            filter: BoardFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: BoardFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn filter(&self) -> &BoardFilter {
        &self.filter
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &RecordKey) -> Option<&BoardRow> {
        self.position(key).ok().map(|index| &self.rows[index])
    }

    pub fn visible(&self) -> Vec<&BoardRow> {
        self.rows
            .iter()
            .filter(|row| self.filter.matches(&row.record))
            .collect()
    }

    /// One page of the visible rows.
    pub fn page(&self, limit: u32) -> (Vec<&BoardRow>, Pagination) {
        let visible = self.visible();
        let pagination = Pagination::new(
            self.filter.page.unwrap_or(1),
            limit,
            visible.len() as u64,
        );
        let start = ((pagination.page - 1) * pagination.limit) as usize;
        let rows = visible
            .into_iter()
            .skip(start)
            .take(pagination.limit as usize)
            .collect();
        (rows, pagination)
    }

    /// Index of the row with this id and type. An id that is only on the
    /// board under the other type is a `WrongKind`.
    fn position(&self, key: &RecordKey) -> Result<usize, BoardError> {
        if let Some(index) = self.rows.iter().position(|row| row.record.key() == *key) {
            return Ok(index);
        }
        match self.rows.iter().find(|row| row.record.id == key.id) {
            Some(row) => Err(BoardError::WrongKind {
                id: key.id.clone(),
                expected: key.record_type,
                actual: row.record.record_type(),
            }),
            None => Err(BoardError::NotFound(key.id.clone())),
        }
    }

    /// Change the status of record `id` of the type `status` belongs to.
    pub fn begin_status_change(
        &mut self,
        id: &str,
        status: RecordStatus,
    ) -> Result<PendingChange, BoardError> {
        let key = RecordKey::new(status.record_type(), id);
        let index = self.position(&key)?;
        let row = &mut self.rows[index];
        let previous = row
            .record
            .set_status(status)
            .map_err(|rejected| BoardError::WrongKind {
                id: id.to_string(),
                expected: rejected.record_type(),
                actual: row.record.record_type(),
            })?;
        row.sync_failed = false;
        Ok(PendingChange {
            key,
            previous,
            next: status,
        })
    }

    /// Apply one status to several records of the same kind. Nothing changes
    /// unless every key is on the board and of that kind.
    pub fn begin_bulk_change(
        &mut self,
        keys: &[RecordKey],
        status: RecordStatus,
    ) -> Result<Vec<PendingChange>, BoardError> {
        for key in keys {
            self.position(key)?;
            if key.record_type != status.record_type() {
                return Err(BoardError::WrongKind {
                    id: key.id.clone(),
                    expected: status.record_type(),
                    actual: key.record_type,
                });
            }
        }
        keys.iter()
            .map(|key| self.begin_status_change(&key.id, status))
            .collect()
    }

    pub fn confirm(&mut self, change: PendingChange) {
        tracing::debug!(booking = %change.key, status = %change.next, "Status change confirmed");
    }

    pub fn rollback(&mut self, change: PendingChange) {
        let Some(row) = self
            .rows
            .iter_mut()
            .find(|row| row.record.key() == change.key)
        else {
            return;
        };
        if row.record.set_status(change.previous).is_ok() {
            row.sync_failed = true;
        }
        tracing::warn!(
            booking = %change.key,
            attempted = %change.next,
            restored = %change.previous,
            "Status change rolled back"
        );
    }

    pub fn begin_delete(&mut self, key: &RecordKey) -> Result<PendingDelete, BoardError> {
        let index = self.position(key)?;
        let row = self.rows.remove(index);
        self.total = self.total.saturating_sub(1);
        Ok(PendingDelete { index, row })
    }

    pub fn confirm_delete(&mut self, pending: PendingDelete) {
        tracing::debug!(booking = %pending.row.record.key(), "Deletion confirmed");
    }

    /// Put a deleted row back where it was.
    pub fn restore(&mut self, pending: PendingDelete) {
        let index = pending.index.min(self.rows.len());
        self.rows.insert(index, pending.row);
        self.total += 1;
    }

    pub fn summary(&self) -> BoardSummary {
        let count = |status: RecordStatus| {
            self.rows
                .iter()
                .filter(|row| row.record.status() == status)
                .count()
        };
        let by_status = InquiryStatus::ALL
            .into_iter()
            .map(RecordStatus::Inquiry)
            .chain(BookingStatus::ALL.into_iter().map(RecordStatus::Confirmed))
            .map(|status| StatusCount {
                record_type: status.record_type(),
                status: status.as_str(),
                count: count(status),
            })
            .collect();
        let inquiries = self
            .rows
            .iter()
            .filter(|row| row.record.record_type() == RecordType::Inquiry)
            .count();

        BoardSummary {
            total: self.total,
            inquiries,
            confirmed: self.rows.len() - inquiries,
            by_status,
            revenue: self.rows.iter().map(|row| row.record.amount_paid()).sum(),
        }
    }
}
