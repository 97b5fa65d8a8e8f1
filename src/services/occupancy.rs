use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};

use crate::models::Reservation;

/// How far forward the suggestion search shifts a conflicting window before
/// giving up.
pub const MAX_LOOKAHEAD_DAYS: i64 = 365;

pub type OccupancyMap = BTreeMap<NaiveDate, u32>;

/// Outcome of checking a candidate stay against the occupancy map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeCheck {
    /// Earliest night where the candidate would overflow capacity.
    pub conflict: Option<NaiveDate>,
    /// Smallest forward shift of the same trip length that clears the
    /// conflict, if any exists within [`MAX_LOOKAHEAD_DAYS`].
    pub suggested_check_in: Option<NaiveDate>,
}

impl RangeCheck {
    pub fn ok() -> Self {
        Self {
            conflict: None,
            suggested_check_in: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.conflict.is_none()
    }
}

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Cumulative party size per occupied night across all reservations. Each
/// reservation occupies [check_in, check_out); inverted ranges and empty
/// parties contribute nothing.
pub fn build_occupancy(reservations: &[Reservation]) -> OccupancyMap {
    let mut occupancy = OccupancyMap::new();
    for reservation in reservations {
        if reservation.party_size == 0 {
            continue;
        }
        let mut date = reservation.check_in;
        while date < reservation.check_out {
            *occupancy.entry(date).or_insert(0) += reservation.party_size;
            date += Duration::days(1);
        }
    }
    occupancy
}

/// Dates that are full before counting the current visitor at all. These go
/// straight to the calendar as unselectable, whatever the party size.
/// A zero capacity means the capacity is unknown and disables nothing.
pub fn hard_disabled_dates(occupancy: &OccupancyMap, capacity: u32) -> BTreeSet<NaiveDate> {
    if capacity == 0 {
        return BTreeSet::new();
    }
    occupancy
        .iter()
        .filter(|(_, booked)| **booked >= capacity)
        .map(|(date, _)| *date)
        .collect()
}

fn window_fits(
    occupancy: &OccupancyMap,
    capacity: u32,
    check_in: NaiveDate,
    nights: i64,
    party_size: u32,
) -> Option<NaiveDate> {
    for offset in 0..nights {
        let date = check_in + Duration::days(offset);
        let booked = occupancy.get(&date).copied().unwrap_or(0);
        if booked + party_size > capacity {
            return Some(date);
        }
    }
    None
}

/// Checks every night of the candidate window against capacity and, on
/// conflict, searches forward for the nearest check-in that fits the same
/// trip length. Zero or negative trip lengths short-circuit to "no conflict";
/// the caller rejects those separately. A zero capacity means the capacity
/// is unknown and nothing is checked, matching [`hard_disabled_dates`].
pub fn find_conflict(
    occupancy: &OccupancyMap,
    capacity: u32,
    check_in: NaiveDate,
    check_out: NaiveDate,
    party_size: u32,
) -> RangeCheck {
    let nights = nights_between(check_in, check_out);
    if nights <= 0 || capacity == 0 {
        return RangeCheck::ok();
    }

    let conflict = match window_fits(occupancy, capacity, check_in, nights, party_size) {
        Some(date) => date,
        None => return RangeCheck::ok(),
    };

    for shift in 1..=MAX_LOOKAHEAD_DAYS {
        let candidate = check_in + Duration::days(shift);
        if window_fits(occupancy, capacity, candidate, nights, party_size).is_none() {
            return RangeCheck {
                conflict: Some(conflict),
                suggested_check_in: Some(candidate),
            };
        }
    }

    RangeCheck {
        conflict: Some(conflict),
        suggested_check_in: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn reservation(check_in: &str, check_out: &str, party_size: u32) -> Reservation {
        Reservation {
            id: 1,
            user_id: Uuid::new_v4(),
            accommodation_id: 7,
            check_in: date(check_in),
            check_out: date(check_out),
            party_size,
        }
    }

    #[test]
    fn test_occupancy_covers_nights_but_not_checkout() {
        let occ = build_occupancy(&[reservation("2025-06-10", "2025-06-13", 3)]);
        assert_eq!(occ.get(&date("2025-06-10")), Some(&3));
        assert_eq!(occ.get(&date("2025-06-11")), Some(&3));
        assert_eq!(occ.get(&date("2025-06-12")), Some(&3));
        assert_eq!(occ.get(&date("2025-06-13")), None);
    }

    #[test]
    fn test_occupancy_accumulates_overlapping_reservations() {
        let occ = build_occupancy(&[
            reservation("2025-06-10", "2025-06-12", 2),
            reservation("2025-06-11", "2025-06-14", 1),
        ]);
        assert_eq!(occ.get(&date("2025-06-10")), Some(&2));
        assert_eq!(occ.get(&date("2025-06-11")), Some(&3));
        assert_eq!(occ.get(&date("2025-06-12")), Some(&1));
    }

    #[test]
    fn test_occupancy_build_is_idempotent() {
        let rows = vec![
            reservation("2025-06-10", "2025-06-13", 3),
            reservation("2025-06-12", "2025-06-15", 2),
        ];
        assert_eq!(build_occupancy(&rows), build_occupancy(&rows));
    }

    #[test]
    fn test_occupancy_ignores_empty_party_and_inverted_range() {
        let occ = build_occupancy(&[
            reservation("2025-06-10", "2025-06-12", 0),
            reservation("2025-06-15", "2025-06-12", 4),
        ]);
        assert!(occ.is_empty());
    }

    #[test]
    fn test_round_trip_raises_each_night_by_party_size() {
        let existing = vec![reservation("2025-06-10", "2025-06-12", 2)];
        let before = build_occupancy(&existing);

        let mut committed = existing.clone();
        committed.push(reservation("2025-06-11", "2025-06-14", 3));
        let after = build_occupancy(&committed);

        for day in ["2025-06-11", "2025-06-12", "2025-06-13"] {
            let d = date(day);
            let was = before.get(&d).copied().unwrap_or(0);
            assert_eq!(after.get(&d).copied().unwrap_or(0), was + 3);
        }
        assert_eq!(
            after.get(&date("2025-06-10")),
            before.get(&date("2025-06-10"))
        );
    }

    #[test]
    fn test_conflict_reports_earliest_failing_night() {
        // Capacity 4, 3 guests already on nights Jun 10-12.
        let occ = build_occupancy(&[reservation("2025-06-10", "2025-06-13", 3)]);
        let check = find_conflict(&occ, 4, date("2025-06-11"), date("2025-06-14"), 2);
        assert_eq!(check.conflict, Some(date("2025-06-11")));
    }

    #[test]
    fn test_exact_capacity_fit_is_not_a_conflict() {
        let occ = build_occupancy(&[reservation("2025-06-10", "2025-06-13", 3)]);
        let check = find_conflict(&occ, 4, date("2025-06-11"), date("2025-06-14"), 1);
        assert!(check.is_ok());
    }

    #[test]
    fn test_suggestion_is_smallest_clearing_shift() {
        // Nights 10-12 carry 3 guests; the first 3-night window with room for
        // 2 more starts on the 13th.
        let occ = build_occupancy(&[reservation("2025-06-10", "2025-06-13", 3)]);
        let check = find_conflict(&occ, 4, date("2025-06-11"), date("2025-06-14"), 2);
        assert_eq!(check.suggested_check_in, Some(date("2025-06-13")));
    }

    #[test]
    fn test_no_suggestion_when_lookahead_exhausted() {
        let mut rows = Vec::new();
        let mut day = date("2025-06-01");
        // Fill well past the lookahead horizon.
        for _ in 0..(MAX_LOOKAHEAD_DAYS + 40) {
            rows.push(Reservation {
                id: 1,
                user_id: Uuid::new_v4(),
                accommodation_id: 7,
                check_in: day,
                check_out: day + Duration::days(1),
                party_size: 2,
            });
            day += Duration::days(1);
        }
        let occ = build_occupancy(&rows);
        let check = find_conflict(&occ, 2, date("2025-06-05"), date("2025-06-07"), 1);
        assert_eq!(check.conflict, Some(date("2025-06-05")));
        assert_eq!(check.suggested_check_in, None);
    }

    #[test]
    fn test_zero_length_range_short_circuits() {
        let occ = build_occupancy(&[reservation("2025-06-10", "2025-06-13", 3)]);
        let same_day = find_conflict(&occ, 1, date("2025-06-11"), date("2025-06-11"), 5);
        assert!(same_day.is_ok());
        let inverted = find_conflict(&occ, 1, date("2025-06-14"), date("2025-06-11"), 5);
        assert!(inverted.is_ok());
    }

    #[test]
    fn test_unknown_capacity_checks_nothing() {
        let check = find_conflict(
            &OccupancyMap::new(),
            0,
            date("2025-06-11"),
            date("2025-06-14"),
            1,
        );
        assert!(check.is_ok());

        // Same convention with existing occupancy on the nights.
        let occ = build_occupancy(&[reservation("2025-06-10", "2025-06-13", 3)]);
        assert!(find_conflict(&occ, 0, date("2025-06-11"), date("2025-06-14"), 2).is_ok());
    }

    #[test]
    fn test_hard_disabled_dates() {
        let occ = build_occupancy(&[
            reservation("2025-06-10", "2025-06-12", 4),
            reservation("2025-06-12", "2025-06-13", 2),
        ]);
        let hard = hard_disabled_dates(&occ, 4);
        assert!(hard.contains(&date("2025-06-10")));
        assert!(hard.contains(&date("2025-06-11")));
        assert!(!hard.contains(&date("2025-06-12")));
        assert!(hard_disabled_dates(&occ, 0).is_empty());
    }

    #[test]
    fn test_nights_between() {
        assert_eq!(nights_between(date("2025-06-11"), date("2025-06-14")), 3);
        assert_eq!(nights_between(date("2025-06-11"), date("2025-06-11")), 0);
        assert_eq!(nights_between(date("2025-06-14"), date("2025-06-11")), -3);
    }
}
