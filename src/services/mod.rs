pub mod auth;
pub mod bookings;
pub mod reconciler;
pub mod store;
pub mod transitions;
pub mod upsells;
