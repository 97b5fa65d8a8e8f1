pub mod accommodation;
pub mod activity;
pub mod booking;

pub use accommodation::{Accommodation, NewReservation, Reservation};
pub use activity::{Activity, Pack, Timeslot};
pub use booking::{ClassBookingRow, ClassSelection, DailyRemaining, TimeslotRemaining};
