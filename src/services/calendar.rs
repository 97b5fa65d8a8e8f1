use std::collections::BTreeSet;

use chrono::{Datelike, Duration, Months, NaiveDate};

/// The selected range. `to` is only ever set while `from` is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Two-month date-range picker state, Monday-first. Consumers render the
/// cell grids and feed clicks back through [`RangeCalendar::pick`].
pub struct RangeCalendar {
    base_month: NaiveDate,
    range: DateRange,
    disabled: BTreeSet<NaiveDate>,
    min_date: NaiveDate,
}

fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn add_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    };
    shifted.unwrap_or(date)
}

impl RangeCalendar {
    /// Opens on the month containing `today`; the minimum selectable date
    /// defaults to today.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            base_month: start_of_month(today),
            range: DateRange::default(),
            disabled: BTreeSet::new(),
            min_date: today,
        }
    }

    pub fn with_min_date(mut self, min_date: NaiveDate) -> Self {
        self.min_date = min_date;
        self
    }

    pub fn set_disabled_dates(&mut self, disabled: BTreeSet<NaiveDate>) {
        self.disabled = disabled;
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Left and right month of the view (base and base + 1).
    pub fn months(&self) -> (NaiveDate, NaiveDate) {
        (self.base_month, add_months(self.base_month, 1))
    }

    pub fn is_disabled(&self, date: NaiveDate) -> bool {
        date < self.min_date || self.disabled.contains(&date)
    }

    /// Day cells for one month in a Monday-first grid; leading `None`s pad
    /// the first week.
    pub fn month_cells(&self, month: NaiveDate) -> Vec<Option<NaiveDate>> {
        let first = start_of_month(month);
        let leading = first.weekday().num_days_from_monday() as usize;
        let next_month = add_months(first, 1);

        let mut cells: Vec<Option<NaiveDate>> = vec![None; leading];
        let mut day = first;
        while day < next_month {
            cells.push(Some(day));
            day += Duration::days(1);
        }
        cells
    }

    /// Shifts the displayed months without touching the selected range.
    pub fn shift_month(&mut self, delta: i32) {
        self.base_month = start_of_month(add_months(self.base_month, delta));
    }

    /// Selection protocol: a click on a disabled day is ignored; with no
    /// `from`, or with a full range, the click restarts the range; a day at
    /// or before `from` restarts from there; a later day completes the range
    /// unless a disabled day lies strictly between.
    pub fn pick(&mut self, date: NaiveDate) {
        if self.is_disabled(date) {
            return;
        }

        let from = match self.range.from {
            Some(from) if self.range.to.is_none() => from,
            _ => {
                self.range = DateRange {
                    from: Some(date),
                    to: None,
                };
                return;
            }
        };

        if date <= from {
            self.range = DateRange {
                from: Some(date),
                to: None,
            };
            return;
        }

        let mut day = from + Duration::days(1);
        while day < date {
            if self.is_disabled(day) {
                return;
            }
            day += Duration::days(1);
        }
        self.range.to = Some(date);
    }
}
