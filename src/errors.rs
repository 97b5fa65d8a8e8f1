use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid selection: {0}")]
    Validation(String),

    #[error("slot {timeslot_id} on {date} is already used by another class in this booking")]
    DuplicateClassSlot { date: NaiveDate, timeslot_id: i64 },

    #[error("capacity exceeded on {conflict_date}")]
    AvailabilityConflict {
        conflict_date: NaiveDate,
        /// Nearest check-in that fits the same trip length, if one exists
        /// within the lookahead window.
        suggested_check_in: Option<NaiveDate>,
    },

    #[error("availability fetch failed: {0}")]
    RemoteFetch(String),

    #[error("class {class_index} is no longer available on {date}: {remaining} seats left")]
    CommitRejected {
        class_index: usize,
        date: NaiveDate,
        remaining: u32,
    },

    #[error("commit failed: {0}")]
    CommitFailed(String),

    #[error("no active session")]
    Unauthorized,
}
