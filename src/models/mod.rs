pub mod booking;
pub mod page;
pub mod pricing;
pub mod upsell;

pub use booking::{
    normalize_id, Booking, BookingField, BookingPatch, BookingStatus, EntityRef, FieldValue,
    NewBooking,
};
pub use page::{ListQuery, Page, SortDir, SortKey};
pub use pricing::{compute_profit, compute_profit_percent, format_amount, format_percent, parse_num};
pub use upsell::{BookingTotals, NewUpsell, TotalsRow, Upsell};
