pub mod accommodation;
pub mod calendar;
pub mod occupancy;
pub mod slots;
pub mod wizard;
