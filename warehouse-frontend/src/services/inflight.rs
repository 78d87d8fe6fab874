//! Keys for work that must not run twice at once: a form submission per
//! session, a mutation per record, a view-tracking call per session and
//! warehouse.
//!
//! Booking records are keyed by type and id, since an inquiry and a confirmed
//! booking may share an id.
//!
//! The guard releases its key on drop, so a request that errors or whose
//! client disconnects (axum drops the handler future) frees the key too.

use dashmap::DashMap;
use std::sync::Arc;

use crate::models::RecordKey;

#[derive(Debug, Default)]
pub struct InFlight {
    keys: DashMap<String, ()>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. `None` while another guard for the same key is alive.
    pub fn try_acquire(self: &Arc<Self>, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        match self.keys.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    registry: Arc::clone(self),
                    key,
                })
            }
        }
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[must_use = "the key is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<InFlight>,
    key: String,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.keys.remove(&self.key);
    }
}

pub fn submit_key(session_key: &str) -> String {
    format!("submit:{}", session_key)
}

pub fn record_key(record: &RecordKey) -> String {
    format!("record:{}", record)
}

pub fn partner_inquiry_key(inquiry_id: &str) -> String {
    format!("partner-inquiry:{}", inquiry_id)
}

pub fn view_key(session_key: &str, warehouse_id: &str) -> String {
    format!("view:{}:{}", session_key, warehouse_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::RecordType;

    fn confirmed(id: &str) -> RecordKey {
        RecordKey::new(RecordType::Confirmed, id)
    }

    #[test]
    fn second_acquire_fails_until_release() {
        let inflight = Arc::new(InFlight::new());

        let guard = inflight.try_acquire(record_key(&confirmed("b1"))).unwrap();
        assert!(inflight.try_acquire(record_key(&confirmed("b1"))).is_none());
        assert!(inflight.try_acquire(record_key(&confirmed("b2"))).is_some());
        assert!(inflight.is_busy("record:confirmed:b1"));

        drop(guard);
        assert!(!inflight.is_busy("record:confirmed:b1"));
        assert!(inflight.try_acquire(record_key(&confirmed("b1"))).is_some());
    }

    #[test]
    fn records_sharing_an_id_do_not_block_each_other() {
        let inflight = Arc::new(InFlight::new());
        let _confirmed = inflight.try_acquire(record_key(&confirmed("5"))).unwrap();
        let inquiry = RecordKey::new(RecordType::Inquiry, "5");
        assert!(inflight.try_acquire(record_key(&inquiry)).is_some());
        assert!(inflight.try_acquire(partner_inquiry_key("5")).is_some());
    }

    #[tokio::test]
    async fn cancelled_task_releases_its_key() {
        let inflight = Arc::new(InFlight::new());
        let registry = Arc::clone(&inflight);

        let task = tokio::spawn(async move {
            let _guard = registry.try_acquire(submit_key("s1")).unwrap();
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        while !inflight.is_busy("submit:s1") {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        assert!(inflight.is_empty());
    }
}
