use serde::{Serialize, Serializer};

use crate::errors::ValidationError;
use crate::models::booking::join_labels;
use crate::models::pricing::compute_profit;
use crate::models::{Booking, EntityRef};

/// Extra work sold on an arrived booking. It never changes the booking's own
/// stored prices.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsell {
    pub id: String,
    pub booking_id: String,
    pub services: Vec<EntityRef>,
    pub parts: Vec<EntityRef>,
    pub labour_cost: f64,
    pub parts_cost: f64,
    pub upsell_price: f64,
}

impl Upsell {
    pub fn profit(&self) -> f64 {
        compute_profit(self.upsell_price, self.labour_cost, self.parts_cost)
    }
}

fn serialize_ref_id<S: Serializer>(r: &EntityRef, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&r.id)
}

fn serialize_opt_ref_id<S: Serializer>(r: &Option<EntityRef>, s: S) -> Result<S::Ok, S::Error> {
    match r {
        Some(r) => s.serialize_str(&r.id),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUpsell {
    #[serde(rename = "serviceId", serialize_with = "serialize_ref_id")]
    pub service: EntityRef,
    #[serde(
        rename = "partId",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_ref_id"
    )]
    pub part: Option<EntityRef>,
    pub parts_cost: f64,
    pub labour_cost: f64,
    pub upsell_price: f64,
    #[serde(skip)]
    price_overridden: bool,
}

impl NewUpsell {
    pub fn new(service: EntityRef) -> Self {
        Self {
            service,
            ..Default::default()
        }
    }

    pub fn with_part(mut self, part: EntityRef) -> Self {
        self.part = Some(part);
        self
    }

    /// Sets the costs; the price follows parts + labour until it has been
    /// set explicitly.
    pub fn with_costs(mut self, parts_cost: f64, labour_cost: f64) -> Self {
        self.parts_cost = parts_cost;
        self.labour_cost = labour_cost;
        if !self.price_overridden {
            self.upsell_price = parts_cost + labour_cost;
        }
        self
    }

    pub fn with_price(mut self, upsell_price: f64) -> Self {
        self.upsell_price = upsell_price;
        self.price_overridden = true;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service.id.trim().is_empty() {
            return Err(ValidationError::MissingField(vec!["serviceId"]));
        }
        for (field, value) in [
            ("partsCost", self.parts_cost),
            ("labourCost", self.labour_cost),
            ("upsellPrice", self.upsell_price),
        ] {
            if value < 0.0 {
                return Err(ValidationError::NegativeAmount(field));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalsRow {
    pub kind: &'static str,
    pub services: String,
    pub parts: String,
    pub parts_cost: f64,
    pub labour_cost: f64,
    pub price: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingTotals {
    pub rows: Vec<TotalsRow>,
    pub total: TotalsRow,
}

impl BookingTotals {
    pub fn compute(booking: &Booking, upsells: &[Upsell]) -> Self {
        let mut rows = vec![TotalsRow {
            kind: "Booking",
            services: booking.service_labels(),
            parts: "-".to_string(),
            parts_cost: booking.parts_cost,
            labour_cost: booking.labour_cost,
            price: booking.booking_price,
            profit: booking.profit(),
        }];
        rows.extend(upsells.iter().map(|u| TotalsRow {
            kind: "Upsell",
            services: join_labels(&u.services),
            parts: join_labels(&u.parts),
            parts_cost: u.parts_cost,
            labour_cost: u.labour_cost,
            price: u.upsell_price,
            profit: u.profit(),
        }));

        let parts_cost: f64 = rows.iter().map(|r| r.parts_cost).sum();
        let labour_cost: f64 = rows.iter().map(|r| r.labour_cost).sum();
        let price: f64 = rows.iter().map(|r| r.price).sum();
        let total = TotalsRow {
            kind: "Total",
            services: booking.service_labels(),
            parts: "-".to_string(),
            parts_cost,
            labour_cost,
            price,
            profit: compute_profit(price, labour_cost, parts_cost),
        };

        Self { rows, total }
    }
}
