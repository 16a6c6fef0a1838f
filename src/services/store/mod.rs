pub mod http;
pub mod wire;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, BookingStatus, ListQuery, NewBooking, NewUpsell, Page, Upsell};

/// The booking store of record. Every record handed back is already
/// normalised and is authoritative over any local copy.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn list_bookings(&self, query: &ListQuery) -> Result<Page<Booking>, AppError>;

    async fn get_booking(&self, id: &str) -> Result<Booking, AppError>;

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, AppError>;

    async fn update_booking(&self, id: &str, patch: &BookingPatch) -> Result<Booking, AppError>;

    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<Booking, AppError>;

    async fn delete_booking(&self, id: &str) -> Result<(), AppError>;

    async fn list_upsells(&self, booking_id: &str) -> Result<Vec<Upsell>, AppError>;

    async fn create_upsell(&self, booking_id: &str, upsell: &NewUpsell) -> Result<Upsell, AppError>;
}
