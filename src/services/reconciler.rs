//! Inline row editing with minimal-diff commits.
//!
//! Each row keeps the last record the store acknowledged (the baseline) and
//! the user's working copy. Only fields that differ are sent, and whatever
//! the store returns becomes the new baseline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::{AppError, ValidationError};
use crate::models::booking::set_booking_field;
use crate::models::{Booking, BookingField, BookingPatch, FieldValue};
use crate::services::store::BookingStore;

#[derive(Debug, Clone)]
struct RowEdit {
    baseline: Booking,
    working: Booking,
    in_flight: bool,
    last_error: Option<String>,
}

impl RowEdit {
    fn new(booking: &Booking) -> Self {
        Self {
            baseline: booking.clone(),
            working: booking.clone(),
            in_flight: false,
            last_error: None,
        }
    }

    fn is_dirty(&self) -> bool {
        self.baseline != self.working
    }

    fn view(&self) -> RowView {
        RowView {
            profit: self.working.profit(),
            profit_percent: self.working.profit_percent(),
            dirty: self.is_dirty(),
            saving: self.in_flight,
            error: self.last_error.clone(),
            working: self.working.clone(),
        }
    }
}

/// What a row should display right now.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub working: Booking,
    pub profit: f64,
    pub profit_percent: f64,
    pub dirty: bool,
    pub saving: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Nothing differed from the baseline; no request was made.
    Unchanged,
    /// The store accepted the change and returned this record.
    Saved(Booking),
}

type Rows = Mutex<HashMap<String, RowEdit>>;

/// Clears the in-flight flag if the commit future is dropped before the
/// store answers. A settled commit clears it while applying the result.
struct InFlight<'a> {
    rows: &'a Rows,
    id: &'a str,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(row) = rows.get_mut(self.id) {
            row.in_flight = false;
        }
    }
}

pub struct Reconciler {
    store: Arc<dyn BookingStore>,
    rows: Rows,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self {
            store,
            rows: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RowEdit>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts editing `booking`. A row that already holds unsaved edits keeps
    /// them; a clean row takes `booking` as its new baseline.
    pub fn begin_edit(&self, booking: &Booking) -> RowView {
        let mut rows = self.lock();
        let row = rows
            .entry(booking.id.clone())
            .and_modify(|row| {
                if !row.is_dirty() && !row.in_flight {
                    *row = RowEdit::new(booking);
                }
            })
            .or_insert_with(|| RowEdit::new(booking));
        row.view()
    }

    pub fn set_field(
        &self,
        id: &str,
        field: BookingField,
        value: impl Into<FieldValue>,
    ) -> Result<RowView, ValidationError> {
        let mut rows = self.lock();
        let row = rows
            .get_mut(id)
            .ok_or_else(|| ValidationError::NotEditing(id.to_string()))?;
        set_booking_field(&mut row.working, field, value.into())?;
        Ok(row.view())
    }

    pub fn view(&self, id: &str) -> Option<RowView> {
        self.lock().get(id).map(RowEdit::view)
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.lock().get(id).is_some_and(RowEdit::is_dirty)
    }

    pub fn is_saving(&self, id: &str) -> bool {
        self.lock().get(id).is_some_and(|row| row.in_flight)
    }

    pub fn dirty_rows(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, row)| row.is_dirty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn diff(&self, id: &str) -> Option<BookingPatch> {
        self.lock()
            .get(id)
            .map(|row| BookingPatch::diff(&row.baseline, &row.working))
    }

    /// Sends the changed fields of row `id`. On failure the working copy is
    /// kept so nothing the user typed is lost.
    pub async fn commit(&self, id: &str) -> Result<CommitOutcome, AppError> {
        let (patch, submitted) = {
            let mut rows = self.lock();
            let row = rows
                .get_mut(id)
                .ok_or_else(|| ValidationError::NotEditing(id.to_string()))?;
            if row.in_flight {
                return Err(ValidationError::CommitInFlight(id.to_string()).into());
            }
            let patch = BookingPatch::diff(&row.baseline, &row.working);
            if patch.is_empty() {
                return Ok(CommitOutcome::Unchanged);
            }
            patch.validate()?;
            row.in_flight = true;
            (patch, row.working.clone())
        };
        let mut guard = InFlight {
            rows: &self.rows,
            id,
            settled: false,
        };

        tracing::debug!(booking_id = %id, fields = ?patch.changed_fields(), "committing booking edit");
        let result = self.store.update_booking(id, &patch).await;

        let mut rows = self.lock();
        guard.settled = true;
        let row = rows.get_mut(id).map(|row| {
            row.in_flight = false;
            row
        });
        match result {
            Ok(saved) => {
                tracing::info!(booking_id = %id, "booking edit saved");
                if let Some(row) = row {
                    row.baseline = saved.clone();
                    // edits typed while the request was out stay pending
                    if row.working == submitted {
                        row.working = saved.clone();
                    }
                    row.last_error = None;
                }
                Ok(CommitOutcome::Saved(saved))
            }
            Err(e) => {
                tracing::warn!(booking_id = %id, error = %e, "booking edit failed");
                if let Some(row) = row {
                    row.last_error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Throws away the working copy and returns the baseline.
    pub fn cancel_edit(&self, id: &str) -> Option<Booking> {
        self.lock().remove(id).map(|row| row.baseline)
    }
}
