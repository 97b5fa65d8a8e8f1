use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::errors::BookingError;
use crate::models::{Accommodation, NewReservation};
use crate::services::occupancy::{
    build_occupancy, find_conflict, hard_disabled_dates, nights_between, OccupancyMap, RangeCheck,
};
use crate::store::RecordStore;

/// A candidate stay as entered by the visitor.
#[derive(Debug, Clone, Copy)]
pub struct StayRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub party_size: u32,
}

impl StayRequest {
    pub fn nights(&self) -> i64 {
        nights_between(self.check_in, self.check_out)
    }

    /// Same trip length, starting from a suggested check-in instead.
    pub fn shifted_to(&self, check_in: NaiveDate) -> StayRequest {
        StayRequest {
            check_in,
            check_out: check_in + Duration::days(self.nights()),
            party_size: self.party_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StayQuote {
    pub nights: i64,
    pub total: f64,
}

/// Occupancy snapshot for one accommodation, rebuilt from the store on every
/// load and safe to re-check on each selection change.
pub struct AvailabilityView {
    pub accommodation: Accommodation,
    occupancy: OccupancyMap,
    hard_disabled: BTreeSet<NaiveDate>,
}

impl AvailabilityView {
    /// Dates already at capacity before counting this visitor; the calendar
    /// renders them unselectable regardless of party size.
    pub fn hard_disabled_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.hard_disabled
    }

    pub fn occupancy_on(&self, date: NaiveDate) -> u32 {
        self.occupancy.get(&date).copied().unwrap_or(0)
    }

    /// Capacity check only; does not validate the request shape.
    pub fn check(&self, stay: &StayRequest) -> RangeCheck {
        find_conflict(
            &self.occupancy,
            self.accommodation.capacity,
            stay.check_in,
            stay.check_out,
            stay.party_size,
        )
    }

    pub fn validate(&self, stay: &StayRequest) -> Result<(), BookingError> {
        if stay.party_size == 0 {
            return Err(BookingError::Validation(
                "party size must be at least one".to_string(),
            ));
        }
        let capacity = self.accommodation.capacity;
        if capacity > 0 && stay.party_size > capacity {
            return Err(BookingError::Validation(format!(
                "party of {} exceeds the accommodation capacity of {capacity}",
                stay.party_size
            )));
        }
        if stay.nights() <= 0 {
            return Err(BookingError::Validation(
                "check-out must be after check-in".to_string(),
            ));
        }

        let check = self.check(stay);
        match check.conflict {
            None => Ok(()),
            Some(conflict_date) => Err(BookingError::AvailabilityConflict {
                conflict_date,
                suggested_check_in: check.suggested_check_in,
            }),
        }
    }

    /// Price per person per night × nights × party. None when the
    /// accommodation has no price or the range is empty.
    pub fn quote(&self, stay: &StayRequest) -> Option<StayQuote> {
        let nights = stay.nights();
        if nights <= 0 {
            return None;
        }
        self.accommodation.price_per_night.map(|price| StayQuote {
            nights,
            total: price * nights as f64 * stay.party_size.max(1) as f64,
        })
    }
}

/// Accommodation-side availability engine. Pure over its loaded view; the
/// store is only touched on load and on reserve.
pub struct AccommodationEngine {
    store: Arc<dyn RecordStore>,
}

impl AccommodationEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn availability(
        &self,
        accommodation_id: i64,
    ) -> Result<AvailabilityView, BookingError> {
        let accommodation = self
            .store
            .accommodation(accommodation_id)
            .await
            .map_err(|e| BookingError::RemoteFetch(e.to_string()))?
            .ok_or_else(|| BookingError::NotFound(format!("accommodation {accommodation_id}")))?;

        let reservations = self
            .store
            .reservations_for(accommodation_id)
            .await
            .map_err(|e| BookingError::RemoteFetch(e.to_string()))?;

        let occupancy = build_occupancy(&reservations);
        let hard_disabled = hard_disabled_dates(&occupancy, accommodation.capacity);
        tracing::debug!(
            accommodation_id,
            reservations = reservations.len(),
            occupied_dates = occupancy.len(),
            "built occupancy snapshot"
        );

        Ok(AvailabilityView {
            accommodation,
            occupancy,
            hard_disabled,
        })
    }

    /// Final step of the flow: re-load the reservation set, re-validate the
    /// candidate against fresh figures, then insert. Best effort only; the
    /// interactive check earlier is advisory and a race between this check
    /// and the insert is accepted.
    pub async fn reserve(
        &self,
        user_id: Option<Uuid>,
        accommodation_id: i64,
        stay: &StayRequest,
    ) -> Result<(), BookingError> {
        let user_id = user_id.ok_or(BookingError::Unauthorized)?;

        let view = self.availability(accommodation_id).await?;
        view.validate(stay)?;

        let row = NewReservation {
            user_id,
            accommodation_id,
            check_in: stay.check_in,
            check_out: stay.check_out,
            party_size: stay.party_size,
        };
        self.store
            .insert_reservation(&row)
            .await
            .map_err(|e| BookingError::CommitFailed(e.to_string()))?;

        tracing::info!(
            accommodation_id,
            check_in = %stay.check_in,
            nights = stay.nights(),
            party_size = stay.party_size,
            "reservation committed"
        );
        Ok(())
    }
}
