use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the range aggregation RPC: remaining seats for a (timeslot, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRemaining {
    pub date: NaiveDate,
    pub remaining_seats: i64,
}

/// One row of the per-date aggregation RPC used at final confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeslotRemaining {
    pub timeslot_id: i64,
    pub remaining_seats: i64,
}

/// A saved class within an in-progress pack booking. No two classes in the
/// same booking may hold an identical (date, timeslot) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSelection {
    pub date: NaiveDate,
    pub timeslot_id: i64,
}

/// Batch-insert row for one confirmed class of a pack booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassBookingRow {
    pub user_id: Uuid,
    pub pack_id: i64,
    pub timeslot_id: i64,
    pub date: NaiveDate,
    pub party_size: u32,
}
