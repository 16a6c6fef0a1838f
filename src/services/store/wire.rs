//! JSON shapes returned by the booking store and their normalisation into
//! the domain models. Nothing past this module sees the raw shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::errors::AppError;
use crate::models::{normalize_id, parse_num, Booking, BookingStatus, EntityRef, Page, Upsell};
use crate::session::SessionUser;

fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(d)? {
        Some(Raw::Num(n)) => n,
        Some(Raw::Text(s)) => parse_num(&s),
        Some(Raw::Other(_)) | None => 0.0,
    })
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(lenient_text(d)?.and_then(|s| {
        DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }))
}

/// Service, part or booking reference: a bare id or a populated object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawRef {
    Id(String),
    Object {
        #[serde(rename = "_id", default)]
        mongo_id: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(rename = "partName", default)]
        part_name: Option<String>,
    },
    Other(serde_json::Value),
}

impl RawRef {
    pub fn into_ref(self) -> Option<EntityRef> {
        match self {
            RawRef::Id(id) if !id.trim().is_empty() => Some(EntityRef {
                label: id.clone(),
                id,
            }),
            RawRef::Object {
                mongo_id,
                id,
                name,
                part_name,
            } => {
                let id = normalize_id(mongo_id, id)?;
                let label = name.or(part_name).unwrap_or_else(|| id.clone());
                Some(EntityRef { id, label })
            }
            _ => None,
        }
    }
}

fn into_refs(raw: Option<Vec<RawRef>>) -> Vec<EntityRef> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(RawRef::into_ref)
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBooking {
    #[serde(rename = "_id", default, deserialize_with = "lenient_text")]
    mongo_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    car_reg_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    vehicle_reg_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    make_model: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    client_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    owner_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    client_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    owner_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    owner_number: Option<String>,
    #[serde(default)]
    services: Option<Vec<RawRef>>,
    #[serde(default, deserialize_with = "lenient_text")]
    remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    booking_price: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    labour_cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    parts_cost: f64,
    #[serde(default, deserialize_with = "lenient_time")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    pre_booking_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    scheduled_arrival_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_time")]
    arrived_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_text")]
    status: Option<String>,
}

impl TryFrom<RawBooking> for Booking {
    type Error = AppError;

    fn try_from(raw: RawBooking) -> Result<Self, Self::Error> {
        let id = normalize_id(raw.mongo_id, raw.id)
            .ok_or_else(|| AppError::store("booking record has no identifier"))?;
        let status = match raw.status.as_deref() {
            None => BookingStatus::Pending,
            Some(s) => BookingStatus::parse(s).unwrap_or_else(|| {
                tracing::warn!(booking_id = %id, status = s, "unknown booking status, treating as pending");
                BookingStatus::Pending
            }),
        };

        Ok(Booking {
            car_reg_no: raw.car_reg_no.or(raw.vehicle_reg_no).unwrap_or_default(),
            make_model: raw.make_model.unwrap_or_default(),
            client_name: raw.client_name.or(raw.owner_name).unwrap_or_default(),
            client_address: raw.client_address.or(raw.owner_address).unwrap_or_default(),
            phone_number: raw.phone_number.or(raw.owner_number).unwrap_or_default(),
            services: into_refs(raw.services),
            remarks: raw.remarks.unwrap_or_default(),
            booking_price: raw.booking_price,
            labour_cost: raw.labour_cost,
            parts_cost: raw.parts_cost,
            created_at: raw.created_at.or(raw.pre_booking_date),
            scheduled_arrival: raw.scheduled_arrival_date,
            arrived_at: raw.arrived_at,
            status,
            id,
        })
    }
}

fn into_bookings(raw: Vec<RawBooking>) -> Vec<Booking> {
    raw.into_iter()
        .filter_map(|r| match Booking::try_from(r) {
            Ok(b) => Some(b),
            Err(e) => {
                tracing::warn!(error = %e, "dropping booking record");
                None
            }
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPagination {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    #[serde(default)]
    data: Option<Vec<RawBooking>>,
    #[serde(default)]
    items: Option<Vec<RawBooking>>,
    #[serde(default)]
    pagination: Option<RawPagination>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    total_items: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope {
    Bare(Vec<RawBooking>),
    Paged(RawPage),
}

impl ListEnvelope {
    pub fn into_page(self) -> Page<Booking> {
        let raw = match self {
            ListEnvelope::Bare(items) => RawPage {
                data: Some(items),
                items: None,
                pagination: None,
                page: None,
                total_pages: None,
                total_items: None,
            },
            ListEnvelope::Paged(page) => page,
        };
        let pagination = raw.pagination.unwrap_or_default();
        let items = into_bookings(raw.data.or(raw.items).unwrap_or_default());

        Page {
            total_items: pagination
                .total
                .or(raw.total_items)
                .unwrap_or(items.len() as u64),
            page: pagination.page.or(raw.page).unwrap_or(1).max(1),
            total_pages: pagination.total_pages.or(raw.total_pages).unwrap_or(1).max(1),
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BookingEnvelope {
    Wrapped { booking: RawBooking },
    Data { data: RawBooking },
    Bare(RawBooking),
}

impl BookingEnvelope {
    pub fn into_booking(self) -> Result<Booking, AppError> {
        match self {
            BookingEnvelope::Wrapped { booking } => booking.try_into(),
            BookingEnvelope::Data { data } => data.try_into(),
            BookingEnvelope::Bare(raw) => raw.try_into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUpsell {
    #[serde(rename = "_id", default, deserialize_with = "lenient_text")]
    mongo_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(default)]
    booking: Option<RawRef>,
    #[serde(default)]
    services: Option<Vec<RawRef>>,
    #[serde(default)]
    parts: Option<Vec<RawRef>>,
    #[serde(default, deserialize_with = "lenient_amount")]
    labour_cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    parts_cost: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    upsell_price: f64,
}

impl RawUpsell {
    pub fn into_upsell(self, booking_id: &str) -> Result<Upsell, AppError> {
        let id = normalize_id(self.mongo_id, self.id)
            .ok_or_else(|| AppError::store("upsell record has no identifier"))?;
        Ok(Upsell {
            id,
            booking_id: self
                .booking
                .and_then(RawRef::into_ref)
                .map(|r| r.id)
                .unwrap_or_else(|| booking_id.to_string()),
            services: into_refs(self.services),
            parts: into_refs(self.parts),
            labour_cost: self.labour_cost,
            parts_cost: self.parts_cost,
            upsell_price: self.upsell_price,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpsellListEnvelope {
    Bare(Vec<RawUpsell>),
    Wrapped { upsells: Vec<RawUpsell> },
    Data { data: Vec<RawUpsell> },
}

impl UpsellListEnvelope {
    pub fn into_upsells(self, booking_id: &str) -> Vec<Upsell> {
        let raw = match self {
            UpsellListEnvelope::Bare(v)
            | UpsellListEnvelope::Wrapped { upsells: v }
            | UpsellListEnvelope::Data { data: v } => v,
        };
        raw.into_iter()
            .filter_map(|r| match r.into_upsell(booking_id) {
                Ok(u) => Some(u),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping upsell record");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpsellEnvelope {
    Wrapped { upsell: RawUpsell },
    Data { data: RawUpsell },
    Bare(RawUpsell),
}

impl UpsellEnvelope {
    pub fn into_upsell(self, booking_id: &str) -> Result<Upsell, AppError> {
        match self {
            UpsellEnvelope::Wrapped { upsell } => upsell.into_upsell(booking_id),
            UpsellEnvelope::Data { data } => data.into_upsell(booking_id),
            UpsellEnvelope::Bare(raw) => raw.into_upsell(booking_id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    /// The store's own message, or the generic fallback.
    pub fn from_bytes(body: &[u8]) -> String {
        serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "request failed".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<SessionUser>,
}
