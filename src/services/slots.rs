use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};

use crate::errors::BookingError;
use crate::models::ClassSelection;
use crate::store::RecordStore;

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Issues monotonically increasing tokens for availability fetches. Month
/// fetches are not cancelled when superseded, so a snapshot may resolve after
/// a newer one was requested; callers apply a snapshot only while its token is
/// still current (last request wins).
#[derive(Debug, Default)]
pub struct RequestSequence {
    current: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.current == token
    }
}

/// Remaining seats per date for one (activity, timeslot, month), as reported
/// by the remote aggregation. Dates absent from the map are unavailable.
/// Rebuilt whenever the timeslot or displayed month changes; stale after a
/// commit, which re-fetches per date instead.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    pub activity_id: i64,
    pub timeslot_id: i64,
    pub month_start: NaiveDate,
    pub seq: u64,
    remaining: BTreeMap<NaiveDate, u32>,
}

impl SlotSnapshot {
    pub fn remaining_on(&self, date: NaiveDate) -> u32 {
        self.remaining.get(&date).copied().unwrap_or(0)
    }

    /// A calendar cell is selectable iff the date is today or later, the
    /// remaining seats cover the party, and no other class of the same
    /// booking already uses this (date, timeslot).
    pub fn selectable(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        party_size: u32,
        used: &[ClassSelection],
    ) -> bool {
        if date < today {
            return false;
        }
        if party_size == 0 || self.remaining_on(date) < party_size {
            return false;
        }
        !used
            .iter()
            .any(|c| c.date == date && c.timeslot_id == self.timeslot_id)
    }

    pub fn selectable_dates(
        &self,
        today: NaiveDate,
        party_size: u32,
        used: &[ClassSelection],
    ) -> Vec<NaiveDate> {
        self.remaining
            .keys()
            .copied()
            .filter(|d| self.selectable(*d, today, party_size, used))
            .collect()
    }
}

/// Activity-side availability engine: turns the range aggregation RPC into
/// month snapshots.
pub struct SlotEngine {
    store: Arc<dyn RecordStore>,
}

impl SlotEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetches one calendar month of remaining-seat figures. A failed or
    /// malformed response is an error, never "available"; negative figures
    /// clamp to zero.
    pub async fn fetch_month(
        &self,
        activity_id: i64,
        timeslot_id: i64,
        month: NaiveDate,
        seq: u64,
    ) -> Result<SlotSnapshot, BookingError> {
        let from = month_start(month);
        let to = month_end(month);

        let rows = self
            .store
            .slot_availability_for_range(activity_id, timeslot_id, from, to)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, activity_id, timeslot_id, "slot availability fetch failed");
                BookingError::RemoteFetch(e.to_string())
            })?;

        let mut remaining = BTreeMap::new();
        for row in rows {
            if row.date < from || row.date > to {
                continue;
            }
            remaining.insert(row.date, row.remaining_seats.max(0) as u32);
        }

        Ok(SlotSnapshot {
            activity_id,
            timeslot_id,
            month_start: from,
            seq,
            remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timeslot;
    use crate::store::memory::MemoryStore;
    use chrono::NaiveTime;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn store_with_slot() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_timeslot(Timeslot {
            id: 10,
            activity_id: 3,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
        });
        store
    }

    #[tokio::test]
    async fn test_snapshot_reflects_remote_figures() {
        let store = store_with_slot();
        store.set_remaining(10, date("2025-07-01"), 2);
        store.set_remaining(10, date("2025-07-02"), 0);

        let engine = SlotEngine::new(store);
        let snap = engine.fetch_month(3, 10, date("2025-07-15"), 1).await.unwrap();

        assert_eq!(snap.remaining_on(date("2025-07-01")), 2);
        assert_eq!(snap.remaining_on(date("2025-07-02")), 0);
        // No data means unavailable.
        assert_eq!(snap.remaining_on(date("2025-07-03")), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_remote_fetch_error() {
        let store = store_with_slot();
        store.fail_availability(true);
        let engine = SlotEngine::new(store);
        let err = engine.fetch_month(3, 10, date("2025-07-01"), 1).await.unwrap_err();
        assert!(matches!(err, BookingError::RemoteFetch(_)));
    }

    #[tokio::test]
    async fn test_party_size_gates_selectability() {
        let store = store_with_slot();
        store.set_remaining(10, date("2025-07-01"), 2);
        let engine = SlotEngine::new(store);
        let snap = engine.fetch_month(3, 10, date("2025-07-01"), 1).await.unwrap();

        let today = date("2025-06-01");
        assert!(!snap.selectable(date("2025-07-01"), today, 3, &[]));
        assert!(snap.selectable(date("2025-07-01"), today, 2, &[]));
    }

    #[tokio::test]
    async fn test_past_dates_are_not_selectable() {
        let store = store_with_slot();
        store.set_remaining(10, date("2025-07-01"), 5);
        let engine = SlotEngine::new(store);
        let snap = engine.fetch_month(3, 10, date("2025-07-01"), 1).await.unwrap();

        assert!(!snap.selectable(date("2025-07-01"), date("2025-07-02"), 1, &[]));
        // Today itself is selectable.
        assert!(snap.selectable(date("2025-07-01"), date("2025-07-01"), 1, &[]));
    }

    #[tokio::test]
    async fn test_slot_used_by_other_class_is_not_selectable() {
        let store = store_with_slot();
        store.set_remaining(10, date("2025-07-01"), 5);
        let engine = SlotEngine::new(store);
        let snap = engine.fetch_month(3, 10, date("2025-07-01"), 1).await.unwrap();

        let used = vec![ClassSelection {
            date: date("2025-07-01"),
            timeslot_id: 10,
        }];
        assert!(!snap.selectable(date("2025-07-01"), date("2025-06-01"), 1, &used));

        // Same date, different timeslot does not collide.
        let other_slot = vec![ClassSelection {
            date: date("2025-07-01"),
            timeslot_id: 11,
        }];
        assert!(snap.selectable(date("2025-07-01"), date("2025-06-01"), 1, &other_slot));
    }

    #[tokio::test]
    async fn test_selectable_dates_enumerates_open_cells() {
        let store = store_with_slot();
        store.set_remaining(10, date("2025-07-01"), 2);
        store.set_remaining(10, date("2025-07-02"), 1);
        store.set_remaining(10, date("2025-07-03"), 4);
        let engine = SlotEngine::new(store);
        let snap = engine.fetch_month(3, 10, date("2025-07-01"), 1).await.unwrap();

        let used = vec![ClassSelection {
            date: date("2025-07-03"),
            timeslot_id: 10,
        }];
        let dates = snap.selectable_dates(date("2025-07-01"), 2, &used);
        assert_eq!(dates, vec![date("2025-07-01")]);
    }

    #[test]
    fn test_request_sequence_supersedes_older_tokens() {
        let mut seq = RequestSequence::new();
        let first = seq.begin();
        assert!(seq.is_current(first));
        let second = seq.begin();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_start(date("2025-07-15")), date("2025-07-01"));
        assert_eq!(month_end(date("2025-07-15")), date("2025-07-31"));
        assert_eq!(month_end(date("2024-02-10")), date("2024-02-29"));
        assert_eq!(month_end(date("2025-12-05")), date("2025-12-31"));
    }
}
