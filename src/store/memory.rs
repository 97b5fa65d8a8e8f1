use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::RecordStore;
use crate::models::{
    Accommodation, Activity, ClassBookingRow, DailyRemaining, NewReservation, Pack, Reservation,
    Timeslot, TimeslotRemaining,
};

#[derive(Default)]
struct Inner {
    accommodations: Vec<Accommodation>,
    reservations: Vec<Reservation>,
    next_reservation_id: i64,
    activities: Vec<Activity>,
    packs: Vec<Pack>,
    timeslots: Vec<Timeslot>,
    /// Remaining seats per (timeslot, date), as the hosted aggregation would
    /// report them. Dates with no entry are unavailable.
    remaining: HashMap<(i64, NaiveDate), u32>,
    class_bookings: Vec<ClassBookingRow>,
    fail_availability: bool,
}

/// In-memory stand-in for the hosted store, used by tests. Class-booking
/// inserts decrement the seeded remaining-seat figures so commit scenarios
/// behave like the real aggregate view.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_accommodation(&self, accommodation: Accommodation) {
        self.inner.lock().unwrap().accommodations.push(accommodation);
    }

    pub fn add_reservation(&self, reservation: Reservation) {
        self.inner.lock().unwrap().reservations.push(reservation);
    }

    pub fn add_activity(&self, activity: Activity) {
        self.inner.lock().unwrap().activities.push(activity);
    }

    pub fn add_pack(&self, pack: Pack) {
        self.inner.lock().unwrap().packs.push(pack);
    }

    pub fn add_timeslot(&self, timeslot: Timeslot) {
        self.inner.lock().unwrap().timeslots.push(timeslot);
    }

    pub fn set_remaining(&self, timeslot_id: i64, date: NaiveDate, seats: u32) {
        self.inner
            .lock()
            .unwrap()
            .remaining
            .insert((timeslot_id, date), seats);
    }

    /// Make every availability call fail, for remote-failure paths.
    pub fn fail_availability(&self, fail: bool) {
        self.inner.lock().unwrap().fail_availability = fail;
    }

    pub fn reservations(&self) -> Vec<Reservation> {
        self.inner.lock().unwrap().reservations.clone()
    }

    pub fn class_bookings(&self) -> Vec<ClassBookingRow> {
        self.inner.lock().unwrap().class_bookings.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn accommodation(&self, id: i64) -> anyhow::Result<Option<Accommodation>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accommodations.iter().find(|a| a.id == id).cloned())
    }

    async fn reservations_for(&self, accommodation_id: i64) -> anyhow::Result<Vec<Reservation>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Reservation> = inner
            .reservations
            .iter()
            .filter(|r| r.accommodation_id == accommodation_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.check_in);
        Ok(rows)
    }

    async fn insert_reservation(&self, row: &NewReservation) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_reservation_id += 1;
        let id = inner.next_reservation_id;
        inner.reservations.push(Reservation {
            id,
            user_id: row.user_id,
            accommodation_id: row.accommodation_id,
            check_in: row.check_in,
            check_out: row.check_out,
            party_size: row.party_size,
        });
        Ok(())
    }

    async fn pack(&self, id: i64) -> anyhow::Result<Option<Pack>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.packs.iter().find(|p| p.id == id).cloned())
    }

    async fn activity(&self, id: i64) -> anyhow::Result<Option<Activity>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.activities.iter().find(|a| a.id == id).cloned())
    }

    async fn timeslots_for(&self, activity_id: i64) -> anyhow::Result<Vec<Timeslot>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Timeslot> = inner
            .timeslots
            .iter()
            .filter(|t| t.activity_id == activity_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.start_time);
        Ok(rows)
    }

    async fn slot_availability_for_range(
        &self,
        _activity_id: i64,
        timeslot_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyRemaining>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_availability {
            anyhow::bail!("availability aggregation unavailable");
        }
        let mut rows: Vec<DailyRemaining> = inner
            .remaining
            .iter()
            .filter(|((slot, date), _)| *slot == timeslot_id && *date >= from && *date <= to)
            .map(|((_, date), seats)| DailyRemaining {
                date: *date,
                remaining_seats: *seats as i64,
            })
            .collect();
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    async fn slot_availability_for_date(
        &self,
        activity_id: i64,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<TimeslotRemaining>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_availability {
            anyhow::bail!("availability aggregation unavailable");
        }
        let rows = inner
            .timeslots
            .iter()
            .filter(|t| t.activity_id == activity_id)
            .filter_map(|t| {
                inner
                    .remaining
                    .get(&(t.id, date))
                    .map(|seats| TimeslotRemaining {
                        timeslot_id: t.id,
                        remaining_seats: *seats as i64,
                    })
            })
            .collect();
        Ok(rows)
    }

    async fn insert_class_bookings(&self, rows: &[ClassBookingRow]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for row in rows {
            let key = (row.timeslot_id, row.date);
            if let Some(seats) = inner.remaining.get_mut(&key) {
                *seats = seats.saturating_sub(row.party_size);
            }
        }
        inner.class_bookings.extend_from_slice(rows);
        Ok(())
    }
}
