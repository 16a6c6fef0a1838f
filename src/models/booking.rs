use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::ValidationError;
use crate::models::pricing::{compute_profit, compute_profit_percent, parse_num};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub car_reg_no: String,
    pub make_model: String,
    pub client_name: String,
    pub client_address: String,
    pub phone_number: String,
    pub services: Vec<EntityRef>,
    pub remarks: String,
    pub booking_price: f64,
    pub labour_cost: f64,
    pub parts_cost: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub status: BookingStatus,
}

impl Booking {
    pub fn profit(&self) -> f64 {
        compute_profit(self.booking_price, self.labour_cost, self.parts_cost)
    }

    pub fn profit_percent(&self) -> f64 {
        compute_profit_percent(self.booking_price, self.labour_cost, self.parts_cost)
    }

    pub fn service_labels(&self) -> String {
        join_labels(&self.services)
    }

    /// One-line description used in lists and confirmations.
    pub fn summary(&self) -> String {
        format!(
            "{} - {} - {} ({})",
            self.car_reg_no, self.make_model, self.client_name, self.status
        )
    }
}

/// A reference to a service or part, always `{id, label}` once it is past
/// the store boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub label: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

pub fn join_labels(refs: &[EntityRef]) -> String {
    if refs.is_empty() {
        return "-".to_string();
    }
    refs.iter()
        .map(|r| r.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks the store's canonical identifier (`_id`), falling back to `id`.
/// Blank values count as absent.
pub fn normalize_id(canonical: Option<String>, alternate: Option<String>) -> Option<String> {
    canonical
        .filter(|s| !s.trim().is_empty())
        .or_else(|| alternate.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Arrived,
    #[serde(alias = "completed")]
    Complete,
    #[serde(alias = "cancelled")]
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Arrived => "arrived",
            BookingStatus::Complete => "complete",
            BookingStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "arrived" => Some(BookingStatus::Arrived),
            "complete" | "completed" => Some(BookingStatus::Complete),
            "canceled" | "cancelled" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Complete | BookingStatus::Canceled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_ref_ids<S: Serializer>(refs: &[EntityRef], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(refs.iter().map(|r| r.id.as_str()))
}

fn serialize_opt_ref_ids<S: Serializer>(
    refs: &Option<Vec<EntityRef>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match refs {
        Some(refs) => serialize_ref_ids(refs, s),
        None => s.serialize_none(),
    }
}

fn valid_phone(phone: &str) -> bool {
    phone.chars().filter(char::is_ascii_digit).count() >= 7
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value < 0.0 {
        return Err(ValidationError::NegativeAmount(field));
    }
    Ok(())
}

/// Payload submitted by the booking form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub car_reg_no: String,
    pub make_model: String,
    pub client_name: String,
    pub client_address: String,
    pub phone_number: String,
    #[serde(serialize_with = "serialize_ref_ids")]
    pub services: Vec<EntityRef>,
    pub remarks: String,
    #[serde(rename = "scheduledArrivalDate")]
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub booking_price: f64,
    pub labour_cost: f64,
    pub parts_cost: f64,
}

impl NewBooking {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("carRegNo", &self.car_reg_no),
            ("makeModel", &self.make_model),
            ("clientName", &self.client_name),
            ("clientAddress", &self.client_address),
            ("phoneNumber", &self.phone_number),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingField(missing));
        }
        if !valid_phone(&self.phone_number) {
            return Err(ValidationError::InvalidPhone);
        }
        check_amount("bookingPrice", self.booking_price)?;
        check_amount("labourCost", self.labour_cost)?;
        check_amount("partsCost", self.parts_cost)?;
        Ok(())
    }

    /// Trims text fields, fills remarks from the selected services and
    /// defaults the scheduled arrival to `now`.
    pub fn prepared(mut self, now: DateTime<Utc>) -> Self {
        for field in [
            &mut self.car_reg_no,
            &mut self.make_model,
            &mut self.client_name,
            &mut self.client_address,
            &mut self.phone_number,
        ] {
            *field = field.trim().to_string();
        }
        if self.remarks.trim().is_empty() && !self.services.is_empty() {
            self.remarks = self
                .services
                .iter()
                .map(|s| s.label.as_str())
                .collect::<Vec<_>>()
                .join(", ");
        }
        if self.scheduled_arrival.is_none() {
            self.scheduled_arrival = Some(now);
        }
        self
    }
}

/// Partial update: only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub car_reg_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_ref_ids"
    )]
    pub services: Option<Vec<EntityRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(
        rename = "scheduledArrivalDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_arrival: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labour_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts_cost: Option<f64>,
}

impl BookingPatch {
    /// Field-level difference: every field of `working` that differs from
    /// `baseline`.
    pub fn diff(baseline: &Booking, working: &Booking) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            car_reg_no: changed(&baseline.car_reg_no, &working.car_reg_no),
            make_model: changed(&baseline.make_model, &working.make_model),
            client_name: changed(&baseline.client_name, &working.client_name),
            client_address: changed(&baseline.client_address, &working.client_address),
            phone_number: changed(&baseline.phone_number, &working.phone_number),
            services: changed(&baseline.services, &working.services),
            remarks: changed(&baseline.remarks, &working.remarks),
            scheduled_arrival: changed(&baseline.scheduled_arrival, &working.scheduled_arrival),
            booking_price: changed(&baseline.booking_price, &working.booking_price),
            labour_cost: changed(&baseline.labour_cost, &working.labour_cost),
            parts_cost: changed(&baseline.parts_cost, &working.parts_cost),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == BookingPatch::default()
    }

    /// Names of the fields carried by this patch, in wire spelling.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        let flags = [
            ("carRegNo", self.car_reg_no.is_some()),
            ("makeModel", self.make_model.is_some()),
            ("clientName", self.client_name.is_some()),
            ("clientAddress", self.client_address.is_some()),
            ("phoneNumber", self.phone_number.is_some()),
            ("services", self.services.is_some()),
            ("remarks", self.remarks.is_some()),
            ("scheduledArrivalDate", self.scheduled_arrival.is_some()),
            ("bookingPrice", self.booking_price.is_some()),
            ("labourCost", self.labour_cost.is_some()),
            ("partsCost", self.parts_cost.is_some()),
        ];
        for (name, set) in flags {
            if set {
                out.push(name);
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let text = [
            ("carRegNo", &self.car_reg_no),
            ("makeModel", &self.make_model),
            ("clientName", &self.client_name),
            ("clientAddress", &self.client_address),
            ("phoneNumber", &self.phone_number),
        ];
        let blank: Vec<&'static str> = text
            .iter()
            .filter(|(_, v)| v.as_deref().is_some_and(|s| s.trim().is_empty()))
            .map(|(k, _)| *k)
            .collect();
        if !blank.is_empty() {
            return Err(ValidationError::MissingField(blank));
        }
        if let Some(phone) = &self.phone_number {
            if !valid_phone(phone) {
                return Err(ValidationError::InvalidPhone);
            }
        }
        for (field, value) in [
            ("bookingPrice", self.booking_price),
            ("labourCost", self.labour_cost),
            ("partsCost", self.parts_cost),
        ] {
            if let Some(v) = value {
                check_amount(field, v)?;
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, booking: &mut Booking) {
        if let Some(v) = &self.car_reg_no {
            booking.car_reg_no = v.clone();
        }
        if let Some(v) = &self.make_model {
            booking.make_model = v.clone();
        }
        if let Some(v) = &self.client_name {
            booking.client_name = v.clone();
        }
        if let Some(v) = &self.client_address {
            booking.client_address = v.clone();
        }
        if let Some(v) = &self.phone_number {
            booking.phone_number = v.clone();
        }
        if let Some(v) = &self.services {
            booking.services = v.clone();
        }
        if let Some(v) = &self.remarks {
            booking.remarks = v.clone();
        }
        if let Some(v) = self.scheduled_arrival {
            booking.scheduled_arrival = v;
        }
        if let Some(v) = self.booking_price {
            booking.booking_price = v;
        }
        if let Some(v) = self.labour_cost {
            booking.labour_cost = v;
        }
        if let Some(v) = self.parts_cost {
            booking.parts_cost = v;
        }
    }
}

/// Inline-editable booking fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingField {
    CarRegNo,
    MakeModel,
    ClientName,
    ClientAddress,
    PhoneNumber,
    Services,
    Remarks,
    ScheduledArrival,
    BookingPrice,
    LabourCost,
    PartsCost,
}

impl BookingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingField::CarRegNo => "carRegNo",
            BookingField::MakeModel => "makeModel",
            BookingField::ClientName => "clientName",
            BookingField::ClientAddress => "clientAddress",
            BookingField::PhoneNumber => "phoneNumber",
            BookingField::Services => "services",
            BookingField::Remarks => "remarks",
            BookingField::ScheduledArrival => "scheduledArrivalDate",
            BookingField::BookingPrice => "bookingPrice",
            BookingField::LabourCost => "labourCost",
            BookingField::PartsCost => "partsCost",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Amount(f64),
    Date(Option<DateTime<Utc>>),
    Services(Vec<EntityRef>),
}

impl FieldValue {
    /// Interprets raw text typed into an inline cell. Amounts follow the
    /// parse-to-zero policy; dates accept `YYYY-MM-DD` or RFC 3339, empty
    /// clears the date.
    pub fn from_input(field: BookingField, input: &str) -> Result<Self, ValidationError> {
        match field {
            BookingField::BookingPrice | BookingField::LabourCost | BookingField::PartsCost => {
                Ok(FieldValue::Amount(parse_num(input)))
            }
            BookingField::ScheduledArrival => parse_date_input(input).map(FieldValue::Date),
            BookingField::Services => Err(ValidationError::FieldType {
                field: field.as_str(),
            }),
            _ => Ok(FieldValue::Text(input.to_string())),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Amount(v)
    }
}

impl From<Vec<EntityRef>> for FieldValue {
    fn from(v: Vec<EntityRef>) -> Self {
        FieldValue::Services(v)
    }
}

fn parse_date_input(input: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Some(dt.and_utc()))
        .ok_or_else(|| ValidationError::InvalidDate(input.to_string()))
}

/// Writes `value` into `field` of `booking`.
pub fn set_booking_field(
    booking: &mut Booking,
    field: BookingField,
    value: FieldValue,
) -> Result<(), ValidationError> {
    let mismatch = || ValidationError::FieldType {
        field: field.as_str(),
    };
    match (field, value) {
        (BookingField::CarRegNo, FieldValue::Text(v)) => booking.car_reg_no = v,
        (BookingField::MakeModel, FieldValue::Text(v)) => booking.make_model = v,
        (BookingField::ClientName, FieldValue::Text(v)) => booking.client_name = v,
        (BookingField::ClientAddress, FieldValue::Text(v)) => booking.client_address = v,
        (BookingField::PhoneNumber, FieldValue::Text(v)) => booking.phone_number = v,
        (BookingField::Remarks, FieldValue::Text(v)) => booking.remarks = v,
        (BookingField::Services, FieldValue::Services(v)) => booking.services = v,
        (BookingField::ScheduledArrival, FieldValue::Date(v)) => booking.scheduled_arrival = v,
        (BookingField::BookingPrice, FieldValue::Amount(v)) => booking.booking_price = v,
        (BookingField::LabourCost, FieldValue::Amount(v)) => booking.labour_cost = v,
        (BookingField::PartsCost, FieldValue::Amount(v)) => booking.parts_cost = v,
        _ => return Err(mismatch()),
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_booking(id: &str, status: BookingStatus) -> Booking {
    Booking {
        id: id.to_string(),
        car_reg_no: "ABC-123".to_string(),
        make_model: "Ford Focus".to_string(),
        client_name: "Jane Doe".to_string(),
        client_address: "1 High Street".to_string(),
        phone_number: "07700 900123".to_string(),
        services: vec![EntityRef::new("svc-1", "MOT")],
        remarks: "MOT".to_string(),
        booking_price: 100.0,
        labour_cost: 20.0,
        parts_cost: 10.0,
        created_at: None,
        scheduled_arrival: None,
        arrived_at: None,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_booking() -> NewBooking {
        NewBooking {
            car_reg_no: " ABC-123 ".to_string(),
            make_model: "Ford Focus".to_string(),
            client_name: "Jane Doe".to_string(),
            client_address: "1 High Street".to_string(),
            phone_number: "07700 900123".to_string(),
            services: vec![EntityRef::new("svc-1", "MOT"), EntityRef::new("svc-2", "Oil")],
            booking_price: 100.0,
            labour_cost: 20.0,
            parts_cost: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_id_prefers_canonical() {
        assert_eq!(
            normalize_id(Some("a1".into()), Some("b2".into())),
            Some("a1".to_string())
        );
        assert_eq!(normalize_id(None, Some("b2".into())), Some("b2".to_string()));
        assert_eq!(normalize_id(Some("  ".into()), Some("b2".into())), Some("b2".to_string()));
        assert_eq!(normalize_id(None, None), None);
    }

    #[test]
    fn test_status_parse_accepts_alternate_spellings() {
        assert_eq!(BookingStatus::parse("completed"), Some(BookingStatus::Complete));
        assert_eq!(BookingStatus::parse("Cancelled"), Some(BookingStatus::Canceled));
        assert_eq!(BookingStatus::parse("arrived"), Some(BookingStatus::Arrived));
        assert_eq!(BookingStatus::parse("lost"), None);
    }

    #[test]
    fn test_status_serde_aliases() {
        let s: BookingStatus = serde_json::from_str(r#""completed""#).unwrap();
        assert_eq!(s, BookingStatus::Complete);
        assert_eq!(serde_json::to_string(&BookingStatus::Canceled).unwrap(), r#""canceled""#);
    }

    #[test]
    fn test_new_booking_validation_missing_fields() {
        let mut b = new_booking();
        b.car_reg_no = "  ".to_string();
        b.client_address.clear();
        let err = b.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField(vec!["carRegNo", "clientAddress"])
        );
    }

    #[test]
    fn test_new_booking_validation_phone_and_amounts() {
        let mut b = new_booking();
        b.phone_number = "12-34".to_string();
        assert_eq!(b.validate().unwrap_err(), ValidationError::InvalidPhone);

        let mut b = new_booking();
        b.labour_cost = -1.0;
        assert_eq!(
            b.validate().unwrap_err(),
            ValidationError::NegativeAmount("labourCost")
        );
        assert!(new_booking().validate().is_ok());
    }

    #[test]
    fn test_prepared_fills_defaults() {
        let now = Utc::now();
        let b = new_booking().prepared(now);
        assert_eq!(b.car_reg_no, "ABC-123");
        assert_eq!(b.remarks, "MOT, Oil");
        assert_eq!(b.scheduled_arrival, Some(now));
    }

    #[test]
    fn test_new_booking_serializes_service_ids() {
        let json = serde_json::to_value(new_booking()).unwrap();
        assert_eq!(json["services"], serde_json::json!(["svc-1", "svc-2"]));
        assert_eq!(json["carRegNo"], " ABC-123 ");
        assert_eq!(json["bookingPrice"], 100.0);
    }

    #[test]
    fn test_patch_diff_only_changed_fields() {
        let base = sample_booking("b1", BookingStatus::Pending);
        let mut work = base.clone();
        work.client_name = "John Doe".to_string();
        work.parts_cost = 15.0;

        let patch = BookingPatch::diff(&base, &work);
        assert_eq!(patch.changed_fields(), vec!["clientName", "partsCost"]);

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"clientName": "John Doe", "partsCost": 15.0}));
        assert!(BookingPatch::diff(&base, &base).is_empty());
    }

    #[test]
    fn test_patch_clearing_date_serializes_null() {
        let mut base = sample_booking("b1", BookingStatus::Pending);
        base.scheduled_arrival = Some(Utc::now());
        let mut work = base.clone();
        work.scheduled_arrival = None;
        let json = serde_json::to_value(BookingPatch::diff(&base, &work)).unwrap();
        assert_eq!(json, serde_json::json!({"scheduledArrivalDate": null}));
    }

    #[test]
    fn test_patch_validation() {
        let patch = BookingPatch {
            booking_price: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(
            patch.validate().unwrap_err(),
            ValidationError::NegativeAmount("bookingPrice")
        );
        let patch = BookingPatch {
            client_name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(ValidationError::MissingField(_))));
    }

    #[test]
    fn test_apply_patch_merges_fields() {
        let mut b = sample_booking("b1", BookingStatus::Pending);
        let patch = BookingPatch {
            make_model: Some("VW Golf".to_string()),
            labour_cost: Some(50.0),
            ..Default::default()
        };
        patch.apply_to(&mut b);
        assert_eq!(b.make_model, "VW Golf");
        assert_eq!(b.labour_cost, 50.0);
        assert_eq!(b.car_reg_no, "ABC-123");
    }

    #[test]
    fn test_field_value_from_input() {
        assert_eq!(
            FieldValue::from_input(BookingField::BookingPrice, "abc").unwrap(),
            FieldValue::Amount(0.0)
        );
        assert_eq!(
            FieldValue::from_input(BookingField::ScheduledArrival, "").unwrap(),
            FieldValue::Date(None)
        );
        let FieldValue::Date(Some(dt)) =
            FieldValue::from_input(BookingField::ScheduledArrival, "2025-06-16").unwrap()
        else {
            panic!("expected a date");
        };
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-06-16");
        assert!(FieldValue::from_input(BookingField::ScheduledArrival, "16/06").is_err());
    }

    #[test]
    fn test_set_field_rejects_mismatched_value() {
        let mut b = sample_booking("b1", BookingStatus::Pending);
        let err = set_booking_field(&mut b, BookingField::BookingPrice, "12".into()).unwrap_err();
        assert_eq!(err, ValidationError::FieldType { field: "bookingPrice" });
        set_booking_field(&mut b, BookingField::BookingPrice, 12.5_f64.into()).unwrap();
        assert_eq!(b.booking_price, 12.5);
    }

    #[test]
    fn test_summary_and_labels() {
        let b = sample_booking("b1", BookingStatus::Arrived);
        assert_eq!(b.summary(), "ABC-123 - Ford Focus - Jane Doe (arrived)");
        assert_eq!(b.service_labels(), "MOT");
        assert_eq!(join_labels(&[]), "-");
    }
}
