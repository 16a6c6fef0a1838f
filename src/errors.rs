use crate::models::BookingStatus;
use crate::services::transitions::TransitionAction;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("authentication required")]
    Authentication,

    #[error("{0}")]
    Store(String),

    /// Response for request `seq` arrived after a newer one was applied, or
    /// after the owning view was disposed.
    #[error("stale response discarded (request #{seq})")]
    StaleResponse { seq: u64 },
}

impl AppError {
    pub fn store(message: impl Into<String>) -> Self {
        AppError::Store(message.into())
    }

    /// Stale responses are an internal signal and never shown to the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, AppError::StaleResponse { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Store("request timed out".to_string())
        } else {
            AppError::Store(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("please fill: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),

    #[error("please enter a valid phone number")]
    InvalidPhone,

    #[error("{0} must not be negative")]
    NegativeAmount(&'static str),

    #[error("page and page size must be at least 1")]
    InvalidPage,

    #[error("invalid transition request: {0}")]
    InvalidTransitionRequest(String),

    #[error("cannot {action} a booking that is {from}")]
    IllegalTransition {
        from: BookingStatus,
        action: TransitionAction,
    },

    #[error("a save is already in progress for booking {0}")]
    CommitInFlight(String),

    #[error("booking {0} is not being edited")]
    NotEditing(String),

    #[error("{field} does not accept that kind of value")]
    FieldType { field: &'static str },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("upsells can only be added to arrived bookings (booking is {0})")]
    UpsellNotAllowed(BookingStatus),
}
