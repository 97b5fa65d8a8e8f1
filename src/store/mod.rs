pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{
    Accommodation, Activity, ClassBookingRow, DailyRemaining, NewReservation, Pack, Reservation,
    Timeslot, TimeslotRemaining,
};

/// Access to the hosted record store. The engines only ever see this trait, so
/// tests substitute [`memory::MemoryStore`] for the real
/// [`supabase::SupabaseStore`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn accommodation(&self, id: i64) -> anyhow::Result<Option<Accommodation>>;

    async fn reservations_for(&self, accommodation_id: i64) -> anyhow::Result<Vec<Reservation>>;

    async fn insert_reservation(&self, row: &NewReservation) -> anyhow::Result<()>;

    async fn pack(&self, id: i64) -> anyhow::Result<Option<Pack>>;

    async fn activity(&self, id: i64) -> anyhow::Result<Option<Activity>>;

    /// Timeslots of an activity, ordered by start time.
    async fn timeslots_for(&self, activity_id: i64) -> anyhow::Result<Vec<Timeslot>>;

    /// Remaining seats per date for one (activity, timeslot) over an inclusive
    /// date range. Dates with no row are unavailable, not full-capacity.
    async fn slot_availability_for_range(
        &self,
        activity_id: i64,
        timeslot_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<DailyRemaining>>;

    /// Remaining seats per timeslot of one activity on a single date.
    async fn slot_availability_for_date(
        &self,
        activity_id: i64,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<TimeslotRemaining>>;

    /// One batch insert for the whole pack booking; all-or-nothing from the
    /// caller's perspective.
    async fn insert_class_bookings(&self, rows: &[ClassBookingRow]) -> anyhow::Result<()>;
}
