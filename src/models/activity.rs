use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Maximum participants per timeslot per day.
    pub capacity: u32,
    pub price: Option<f64>,
}

/// A fixed recurring time-of-day window for an activity, shared across dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeslot {
    pub id: i64,
    pub activity_id: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Timeslot {
    pub fn label(&self) -> String {
        format!(
            "{:02}:{:02}\u{2013}{:02}:{:02}",
            self.start_time.hour(),
            self.start_time.minute(),
            self.end_time.hour(),
            self.end_time.minute()
        )
    }
}

/// A bundle of N classes of the same activity sold as one booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pack {
    pub id: i64,
    pub activity_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub class_count: u32,
    pub price: Option<f64>,
}

impl Pack {
    /// Number of classes the wizard walks through, floored at one.
    pub fn effective_class_count(&self) -> usize {
        self.class_count.max(1) as usize
    }
}
