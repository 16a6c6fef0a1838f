//! The paginated booking view and the mutations that keep it consistent.
//!
//! Each `load` takes a sequence number before it goes to the store. Once a
//! response for sequence N has been applied, any response for a lower
//! sequence is dropped, whatever order they arrive in.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, BookingStatus, ListQuery, NewBooking};
use crate::services::store::BookingStore;
use crate::services::transitions::{plan_transition, TransitionAction, TransitionRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    pub items: Vec<Booking>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub query: ListQuery,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Debug)]
struct Window {
    items: Vec<Booking>,
    page: u32,
    total_pages: u32,
    total_items: u64,
    query: ListQuery,
    error: Option<String>,
    in_flight: u32,
    applied_seq: u64,
}

impl Window {
    fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            items: self.items.clone(),
            page: self.page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            query: self.query.clone(),
            error: self.error.clone(),
            loading: self.in_flight > 0,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|b| b.id == id)
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.items.remove(idx);
                self.total_items = self.total_items.saturating_sub(1);
                true
            }
            None => false,
        }
    }
}

/// Gives back the loading count if the load future is dropped before the
/// store answers.
struct Loading<'a> {
    window: &'a Mutex<Window>,
    settled: bool,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
            window.in_flight = window.in_flight.saturating_sub(1);
        }
    }
}

pub struct BookingList {
    store: Arc<dyn BookingStore>,
    window: Mutex<Window>,
    next_seq: AtomicU64,
    disposed: AtomicBool,
}

impl BookingList {
    pub fn new(store: Arc<dyn BookingStore>, query: ListQuery) -> Self {
        Self {
            store,
            window: Mutex::new(Window {
                items: Vec::new(),
                page: query.page.max(1),
                total_pages: 1,
                total_items: 0,
                query,
                error: None,
                in_flight: 0,
                applied_seq: 0,
            }),
            next_seq: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.lock().snapshot()
    }

    pub fn query(&self) -> ListQuery {
        self.lock().query.clone()
    }

    pub fn get(&self, id: &str) -> Option<Booking> {
        let window = self.lock();
        window.position(id).map(|idx| window.items[idx].clone())
    }

    /// Stops any further result from touching this view. Requests already
    /// in flight complete but their results are discarded.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        tracing::debug!("booking list disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Fetches one page. On failure the current window stays as it was and
    /// the message is recorded in [`ListSnapshot::error`].
    pub async fn load(&self, query: ListQuery) -> Result<ListSnapshot, AppError> {
        query.validate()?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().in_flight += 1;
        let mut loading = Loading {
            window: &self.window,
            settled: false,
        };

        tracing::debug!(seq, page = query.page, status = ?query.status, "loading bookings");
        let result = self.store.list_bookings(&query).await;

        let mut window = self.lock();
        window.in_flight = window.in_flight.saturating_sub(1);
        loading.settled = true;

        if self.is_disposed() {
            tracing::debug!(seq, "discarding response for disposed list");
            return Err(AppError::StaleResponse { seq });
        }
        if seq < window.applied_seq {
            tracing::debug!(seq, applied = window.applied_seq, "discarding stale page response");
            return Err(AppError::StaleResponse { seq });
        }
        window.applied_seq = seq;

        match result {
            Ok(page) => {
                tracing::info!(
                    seq,
                    page = page.page,
                    total_pages = page.total_pages,
                    count = page.items.len(),
                    "bookings loaded"
                );
                window.items = page.items;
                window.page = page.page;
                window.total_pages = page.total_pages;
                window.total_items = page.total_items;
                window.query = query.at_page(page.page);
                window.error = None;
                Ok(window.snapshot())
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "failed to load bookings");
                window.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn reload(&self) -> Result<ListSnapshot, AppError> {
        let query = self.query();
        self.load(query).await
    }

    pub async fn next_page(&self) -> Result<ListSnapshot, AppError> {
        let (query, page, total_pages) = {
            let window = self.lock();
            (window.query.clone(), window.page, window.total_pages)
        };
        if page >= total_pages {
            return Ok(self.snapshot());
        }
        self.load(query.at_page(page + 1)).await
    }

    pub async fn prev_page(&self) -> Result<ListSnapshot, AppError> {
        let (query, page) = {
            let window = self.lock();
            (window.query.clone(), window.page)
        };
        if page <= 1 {
            return Ok(self.snapshot());
        }
        self.load(query.at_page(page - 1)).await
    }

    /// Puts a freshly created booking at the head of the window. A later
    /// load settles its real position. Returns false when the booking does
    /// not belong to the filtered view.
    pub fn apply_created(&self, booking: Booking) -> bool {
        if self.is_disposed() {
            return false;
        }
        let mut window = self.lock();
        if window.query.status.is_some_and(|s| s != booking.status) {
            return false;
        }
        window.items.insert(0, booking);
        window.total_items += 1;
        true
    }

    /// Merges `patch` into the booking with `id`. Returns false when the
    /// booking is not in the window.
    pub fn apply_updated(&self, id: &str, patch: &BookingPatch) -> bool {
        if self.is_disposed() {
            return false;
        }
        let mut window = self.lock();
        match window.position(id) {
            Some(idx) => {
                patch.apply_to(&mut window.items[idx]);
                true
            }
            None => false,
        }
    }

    /// Replaces the local copy with the store's record. The record is dropped
    /// instead when it no longer matches the status filter.
    pub fn apply_saved(&self, booking: Booking) -> bool {
        if self.is_disposed() {
            return false;
        }
        let mut window = self.lock();
        let Some(idx) = window.position(&booking.id) else {
            return false;
        };
        if window.query.status.is_some_and(|s| s != booking.status) {
            window.remove(&booking.id);
        } else {
            window.items[idx] = booking;
        }
        true
    }

    /// Removes the booking when `new_status` leaves the filtered view,
    /// otherwise updates its status in place.
    pub fn apply_status_changed(
        &self,
        id: &str,
        new_status: BookingStatus,
        filter_status: Option<BookingStatus>,
    ) -> bool {
        if self.is_disposed() {
            return false;
        }
        let mut window = self.lock();
        if filter_status.is_some_and(|f| f != new_status) {
            return window.remove(id);
        }
        match window.position(id) {
            Some(idx) => {
                window.items[idx].status = new_status;
                true
            }
            None => false,
        }
    }

    pub fn apply_deleted(&self, id: &str) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.lock().remove(id)
    }

    pub async fn create(&self, booking: NewBooking) -> Result<Booking, AppError> {
        let booking = booking.prepared(Utc::now());
        booking.validate()?;

        let created = self.store.create_booking(&booking).await?;
        tracing::info!(booking_id = %created.id, car_reg_no = %created.car_reg_no, "booking created");
        self.apply_created(created.clone());
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &BookingPatch) -> Result<Booking, AppError> {
        patch.validate()?;
        let updated = self.store.update_booking(id, patch).await?;
        tracing::info!(booking_id = %id, fields = ?patch.changed_fields(), "booking updated");
        self.apply_saved(updated.clone());
        Ok(updated)
    }

    /// Moves a booking along its lifecycle. The precondition is checked
    /// locally first; the store's answer decides the outcome.
    pub async fn transition(&self, id: &str, action: TransitionAction) -> Result<Booking, AppError> {
        let request = TransitionRequest::new(id, action)?;

        let current = match self.get(&request.booking_id) {
            Some(b) => b.status,
            None => self.store.get_booking(&request.booking_id).await?.status,
        };
        let target = plan_transition(current, request.action)?;

        let booking = self.store.update_status(&request.booking_id, target).await?;
        tracing::info!(
            booking_id = %request.booking_id,
            from = %current,
            to = %booking.status,
            "booking status changed"
        );

        let filter = self.lock().query.status;
        self.apply_status_changed(&booking.id, booking.status, filter);
        self.apply_saved(booking.clone());
        Ok(booking)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.store.delete_booking(id).await?;
        tracing::info!(booking_id = %id, "booking deleted");
        self.apply_deleted(id);
        Ok(())
    }
}
