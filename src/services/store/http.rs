use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::wire::{BookingEnvelope, ErrorBody, ListEnvelope, UpsellEnvelope, UpsellListEnvelope};
use super::BookingStore;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{Booking, BookingPatch, BookingStatus, ListQuery, NewBooking, NewUpsell, Page, Upsell};
use crate::session::Session;

/// Booking store reached over HTTP + JSON with a bearer credential taken
/// from the shared [`Session`].
pub struct HttpBookingStore {
    base_url: String,
    session: Arc<Session>,
    client: reqwest::Client,
}

impl HttpBookingStore {
    pub fn new(base_url: &str, session: Arc<Session>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            client,
        })
    }

    pub fn from_config(config: &AppConfig, session: Arc<Session>) -> Result<Self, AppError> {
        Self::new(&config.api_url, session, config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T, AppError> {
        let token = self.session.token().ok_or(AppError::Authentication)?;

        let resp = req.bearer_auth(token).send().await.map_err(|e| {
            tracing::warn!(error = %e, request = what, "booking store unreachable");
            AppError::from(e)
        })?;

        let status = resp.status();
        let body = resp.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(request = what, "booking store rejected credential");
            self.session.clear();
            return Err(AppError::Authentication);
        }

        if !status.is_success() {
            let message = ErrorBody::from_bytes(&body);
            tracing::warn!(request = what, %status, error = %message, "booking store error");
            return Err(AppError::Store(message));
        }

        let body: &[u8] = if body.is_empty() { b"null" } else { &body[..] };
        serde_json::from_slice(body)
            .map_err(|e| AppError::store(format!("invalid {what} response: {e}")))
    }
}

#[async_trait]
impl BookingStore for HttpBookingStore {
    async fn list_bookings(&self, query: &ListQuery) -> Result<Page<Booking>, AppError> {
        let req = self.client.get(self.url("/bookings")).query(&query.to_params());
        let envelope: ListEnvelope = self.send(req, "list bookings").await?;
        Ok(envelope.into_page())
    }

    async fn get_booking(&self, id: &str) -> Result<Booking, AppError> {
        let req = self.client.get(self.url(&format!("/bookings/{id}")));
        let envelope: BookingEnvelope = self.send(req, "get booking").await?;
        envelope.into_booking()
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, AppError> {
        let req = self.client.post(self.url("/bookings")).json(booking);
        let envelope: BookingEnvelope = self.send(req, "create booking").await?;
        envelope.into_booking()
    }

    async fn update_booking(&self, id: &str, patch: &BookingPatch) -> Result<Booking, AppError> {
        let req = self
            .client
            .patch(self.url(&format!("/bookings/{id}")))
            .json(patch);
        let envelope: BookingEnvelope = self.send(req, "update booking").await?;
        envelope.into_booking()
    }

    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<Booking, AppError> {
        let req = self
            .client
            .patch(self.url(&format!("/bookings/status/{id}")))
            .json(&json!({ "status": status.as_str() }));
        let envelope: BookingEnvelope = self.send(req, "update booking status").await?;
        envelope.into_booking()
    }

    async fn delete_booking(&self, id: &str) -> Result<(), AppError> {
        let req = self.client.delete(self.url(&format!("/bookings/{id}")));
        let _: serde_json::Value = self.send(req, "delete booking").await?;
        Ok(())
    }

    async fn list_upsells(&self, booking_id: &str) -> Result<Vec<Upsell>, AppError> {
        let req = self
            .client
            .get(self.url(&format!("/upsell/booking/{booking_id}")));
        let envelope: UpsellListEnvelope = self.send(req, "list upsells").await?;
        Ok(envelope.into_upsells(booking_id))
    }

    async fn create_upsell(&self, booking_id: &str, upsell: &NewUpsell) -> Result<Upsell, AppError> {
        let req = self
            .client
            .post(self.url(&format!("/upsell/booking/{booking_id}")))
            .json(upsell);
        let envelope: UpsellEnvelope = self.send(req, "create upsell").await?;
        envelope.into_upsell(booking_id)
    }
}
