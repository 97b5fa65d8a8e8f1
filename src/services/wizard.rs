use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::BookingError;
use crate::models::{Activity, ClassBookingRow, ClassSelection, Pack, Timeslot};
use crate::services::slots::SlotSnapshot;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Picking the class at this index; the date selector stays disabled
    /// until a timeslot is chosen.
    SelectingClass(usize),
    /// Every class has a saved (date, timeslot); confirm is reachable.
    AllClassesFilled,
}

/// Result of a party-size change: the clamped value, and the draft date that
/// had to be dropped because it no longer has enough seats, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartySizeChange {
    pub party_size: u32,
    pub cleared_date: Option<NaiveDate>,
}

/// Step wizard over a multi-class pack booking. Selections are advisory until
/// [`PackWizard::confirm`], which re-validates every class against fresh
/// remote figures and commits the whole booking in one batch.
pub struct PackWizard {
    store: Arc<dyn RecordStore>,
    pack: Pack,
    activity: Activity,
    timeslots: Vec<Timeslot>,
    classes: Vec<Option<ClassSelection>>,
    state: WizardState,
    party_size: u32,
    draft_timeslot: Option<i64>,
    draft_date: Option<NaiveDate>,
}

impl PackWizard {
    pub async fn load(store: Arc<dyn RecordStore>, pack_id: i64) -> Result<Self, BookingError> {
        let pack = store
            .pack(pack_id)
            .await
            .map_err(|e| BookingError::RemoteFetch(e.to_string()))?
            .ok_or_else(|| BookingError::NotFound(format!("pack {pack_id}")))?;

        let activity = store
            .activity(pack.activity_id)
            .await
            .map_err(|e| BookingError::RemoteFetch(e.to_string()))?
            .ok_or_else(|| BookingError::NotFound(format!("activity {}", pack.activity_id)))?;

        let timeslots = store
            .timeslots_for(activity.id)
            .await
            .map_err(|e| BookingError::RemoteFetch(e.to_string()))?;

        let class_count = pack.effective_class_count();
        tracing::debug!(pack_id, class_count, activity_id = activity.id, "loaded pack wizard");

        Ok(Self {
            store,
            pack,
            activity,
            timeslots,
            classes: vec![None; class_count],
            state: WizardState::SelectingClass(0),
            party_size: 1,
            draft_timeslot: None,
            draft_date: None,
        })
    }

    pub fn pack(&self) -> &Pack {
        &self.pack
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn timeslots(&self) -> &[Timeslot] {
        &self.timeslots
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    pub fn class(&self, index: usize) -> Option<ClassSelection> {
        self.classes.get(index).copied().flatten()
    }

    pub fn draft_timeslot(&self) -> Option<i64> {
        self.draft_timeslot
    }

    pub fn draft_date(&self) -> Option<NaiveDate> {
        self.draft_date
    }

    /// Saved selections of every class except `skip`, for collision checks.
    fn selections_except(&self, skip: usize) -> Vec<ClassSelection> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .filter_map(|(_, c)| *c)
            .collect()
    }

    fn editing_index(&self) -> Result<usize, BookingError> {
        match self.state {
            WizardState::SelectingClass(i) => Ok(i),
            WizardState::AllClassesFilled => Err(BookingError::Validation(
                "no class is being edited".to_string(),
            )),
        }
    }

    pub fn choose_timeslot(&mut self, timeslot_id: i64) -> Result<(), BookingError> {
        self.editing_index()?;
        if !self.timeslots.iter().any(|t| t.id == timeslot_id) {
            return Err(BookingError::Validation(format!(
                "timeslot {timeslot_id} does not belong to this activity"
            )));
        }
        if self.draft_timeslot != Some(timeslot_id) {
            // A new timeslot invalidates any date picked under the old one.
            self.draft_date = None;
        }
        self.draft_timeslot = Some(timeslot_id);
        Ok(())
    }

    /// Picks a date for the class being edited. Requires a timeslot chosen
    /// first and a snapshot for exactly that timeslot and this activity.
    pub fn choose_date(
        &mut self,
        date: NaiveDate,
        snapshot: &SlotSnapshot,
        today: NaiveDate,
    ) -> Result<(), BookingError> {
        let index = self.editing_index()?;
        let timeslot_id = self.draft_timeslot.ok_or_else(|| {
            BookingError::Validation("choose a timeslot before picking a date".to_string())
        })?;
        if snapshot.activity_id != self.activity.id || snapshot.timeslot_id != timeslot_id {
            return Err(BookingError::Validation(
                "availability snapshot does not match the chosen timeslot".to_string(),
            ));
        }

        let used = self.selections_except(index);
        if used
            .iter()
            .any(|c| c.date == date && c.timeslot_id == timeslot_id)
        {
            return Err(BookingError::DuplicateClassSlot { date, timeslot_id });
        }
        if date < today {
            return Err(BookingError::Validation(
                "that date is in the past".to_string(),
            ));
        }
        let remaining = snapshot.remaining_on(date);
        if remaining < self.party_size {
            return Err(BookingError::Validation(format!(
                "only {remaining} seats left on {date}"
            )));
        }

        self.draft_date = Some(date);
        Ok(())
    }

    /// Clamps to [1, activity capacity] and re-checks an already drafted date
    /// against the new size; a date that no longer fits is cleared and
    /// reported so the caller can explain it.
    pub fn set_party_size(
        &mut self,
        requested: u32,
        snapshot: Option<&SlotSnapshot>,
    ) -> PartySizeChange {
        let mut party_size = requested.max(1);
        if self.activity.capacity > 0 {
            party_size = party_size.min(self.activity.capacity);
        }
        self.party_size = party_size;

        let mut cleared_date = None;
        if let (Some(date), Some(snapshot)) = (self.draft_date, snapshot) {
            if Some(snapshot.timeslot_id) == self.draft_timeslot
                && snapshot.remaining_on(date) < party_size
            {
                self.draft_date = None;
                cleared_date = Some(date);
            }
        }

        PartySizeChange {
            party_size,
            cleared_date,
        }
    }

    /// Saves the draft as the class being edited and advances the wizard. A
    /// duplicate (date, timeslot) against another class is rejected without
    /// mutating anything.
    pub fn save_current(&mut self) -> Result<WizardState, BookingError> {
        let index = self.editing_index()?;
        let (timeslot_id, date) = match (self.draft_timeslot, self.draft_date) {
            (Some(slot), Some(date)) => (slot, date),
            _ => {
                return Err(BookingError::Validation(
                    "select a timeslot and a date before saving".to_string(),
                ))
            }
        };

        if self
            .selections_except(index)
            .iter()
            .any(|c| c.date == date && c.timeslot_id == timeslot_id)
        {
            return Err(BookingError::DuplicateClassSlot { date, timeslot_id });
        }

        self.classes[index] = Some(ClassSelection { date, timeslot_id });
        self.draft_timeslot = None;
        self.draft_date = None;

        // Move to the next class still missing a selection; with none left
        // the booking is ready to confirm.
        let next = (index + 1..self.classes.len())
            .chain(0..index)
            .find(|i| self.classes[*i].is_none());
        self.state = match next {
            Some(i) => WizardState::SelectingClass(i),
            None => WizardState::AllClassesFilled,
        };
        Ok(self.state)
    }

    /// Reopens a class for editing, restoring its saved selection as the
    /// draft. The other classes keep their selections.
    pub fn edit_class(&mut self, index: usize) -> Result<(), BookingError> {
        if index >= self.classes.len() {
            return Err(BookingError::Validation(format!(
                "class {index} does not exist"
            )));
        }
        let saved = self.classes[index];
        self.draft_timeslot = saved.map(|c| c.timeslot_id);
        self.draft_date = saved.map(|c| c.date);
        self.state = WizardState::SelectingClass(index);
        Ok(())
    }

    /// Final commit: re-fetches remaining seats for every distinct date in
    /// the booking, rechecks each class against the fresh figures and the
    /// final party size, then inserts all rows in one batch. Any failure
    /// aborts the whole commit; the wizard keeps its selections either way.
    pub async fn confirm(&self, user_id: Option<Uuid>) -> Result<(), BookingError> {
        if self.state != WizardState::AllClassesFilled {
            return Err(BookingError::Validation(
                "some classes are still unselected".to_string(),
            ));
        }
        let user_id = user_id.ok_or(BookingError::Unauthorized)?;

        let selections: Vec<ClassSelection> = self.classes.iter().filter_map(|c| *c).collect();

        let distinct_dates: BTreeSet<NaiveDate> = selections.iter().map(|c| c.date).collect();
        let mut fresh: HashMap<(NaiveDate, i64), u32> = HashMap::new();
        for date in distinct_dates {
            let rows = self
                .store
                .slot_availability_for_date(self.activity.id, date)
                .await
                .map_err(|e| BookingError::RemoteFetch(e.to_string()))?;
            for row in rows {
                fresh.insert((date, row.timeslot_id), row.remaining_seats.max(0) as u32);
            }
        }

        for (class_index, selection) in selections.iter().enumerate() {
            let remaining = fresh
                .get(&(selection.date, selection.timeslot_id))
                .copied()
                .unwrap_or(0);
            if remaining < self.party_size {
                tracing::warn!(
                    class_index,
                    date = %selection.date,
                    remaining,
                    party_size = self.party_size,
                    "class no longer available at confirmation"
                );
                return Err(BookingError::CommitRejected {
                    class_index,
                    date: selection.date,
                    remaining,
                });
            }
        }

        let rows: Vec<ClassBookingRow> = selections
            .iter()
            .map(|selection| ClassBookingRow {
                user_id,
                pack_id: self.pack.id,
                timeslot_id: selection.timeslot_id,
                date: selection.date,
                party_size: self.party_size,
            })
            .collect();

        self.store
            .insert_class_bookings(&rows)
            .await
            .map_err(|e| BookingError::CommitFailed(e.to_string()))?;

        tracing::info!(
            pack_id = self.pack.id,
            classes = rows.len(),
            party_size = self.party_size,
            "pack booking committed"
        );
        Ok(())
    }
}
