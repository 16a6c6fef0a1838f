use crate::errors::{AppError, ValidationError};
use crate::models::{Booking, BookingStatus, BookingTotals, NewUpsell, Upsell};
use crate::services::store::BookingStore;

/// Records an upsell against an arrived booking.
pub async fn add_upsell(
    store: &dyn BookingStore,
    booking: &Booking,
    upsell: &NewUpsell,
) -> Result<Upsell, AppError> {
    if booking.status != BookingStatus::Arrived {
        return Err(ValidationError::UpsellNotAllowed(booking.status).into());
    }
    upsell.validate()?;

    let created = store.create_upsell(&booking.id, upsell).await?;
    tracing::info!(
        booking_id = %booking.id,
        upsell_id = %created.id,
        price = created.upsell_price,
        "upsell added"
    );
    Ok(created)
}

/// Fetches the booking's upsells and builds the totals table.
pub async fn booking_totals(
    store: &dyn BookingStore,
    booking: &Booking,
) -> Result<(Vec<Upsell>, BookingTotals), AppError> {
    let upsells = store.list_upsells(&booking.id).await?;
    let totals = BookingTotals::compute(booking, &upsells);
    Ok((upsells, totals))
}
