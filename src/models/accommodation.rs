use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accommodation {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Price per person per night.
    pub price_per_night: Option<f64>,
    /// Maximum simultaneous party size across all bookings on a given night.
    pub capacity: u32,
}

/// A committed stay. Occupies every night in [check_in, check_out); the
/// check-out date itself is free for same-day turnover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub user_id: Uuid,
    pub accommodation_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub party_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub user_id: Uuid,
    pub accommodation_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub party_size: u32,
}
