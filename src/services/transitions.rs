//! Booking lifecycle rules.
//!
//! `pending -> arrived -> complete`, with `cancel` allowed from either
//! non-terminal state. The store has the final say; these checks only keep
//! obviously invalid requests off the network.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::models::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    MarkArrived,
    Complete,
    Cancel,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::MarkArrived => "mark arrived",
            TransitionAction::Complete => "complete",
            TransitionAction::Cancel => "cancel",
        }
    }

    pub fn target(&self) -> BookingStatus {
        match self {
            TransitionAction::MarkArrived => BookingStatus::Arrived,
            TransitionAction::Complete => BookingStatus::Complete,
            TransitionAction::Cancel => BookingStatus::Canceled,
        }
    }

    /// The action that leads to `status`. `pending` is never a target.
    pub fn for_target(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Pending => None,
            BookingStatus::Arrived => Some(TransitionAction::MarkArrived),
            BookingStatus::Complete => Some(TransitionAction::Complete),
            BookingStatus::Canceled => Some(TransitionAction::Cancel),
        }
    }

    /// Accepts either an action name or a target status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "mark arrived" | "arrive" | "car in" => Some(TransitionAction::MarkArrived),
            "check out" | "checkout" | "car out" => Some(TransitionAction::Complete),
            "cancel" => Some(TransitionAction::Cancel),
            other => BookingStatus::parse(other).and_then(Self::for_target),
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `(booking id, action)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub booking_id: String,
    pub action: TransitionAction,
}

impl TransitionRequest {
    pub fn new(booking_id: &str, action: TransitionAction) -> Result<Self, ValidationError> {
        let booking_id = booking_id.trim();
        if booking_id.is_empty() {
            return Err(ValidationError::InvalidTransitionRequest(
                "booking id is required".to_string(),
            ));
        }
        Ok(Self {
            booking_id: booking_id.to_string(),
            action,
        })
    }

    /// Builds a request from loosely typed input such as CLI arguments.
    pub fn parse(booking_id: &str, target: Option<&str>) -> Result<Self, ValidationError> {
        let target = target.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            ValidationError::InvalidTransitionRequest("target status is required".to_string())
        })?;
        let action = TransitionAction::parse(target).ok_or_else(|| {
            ValidationError::InvalidTransitionRequest(format!("unknown target status: {target}"))
        })?;
        Self::new(booking_id, action)
    }
}

/// Checks `action` against the booking's current status and returns the
/// status the store should move it to.
pub fn plan_transition(
    current: BookingStatus,
    action: TransitionAction,
) -> Result<BookingStatus, ValidationError> {
    let allowed = match action {
        TransitionAction::MarkArrived => current == BookingStatus::Pending,
        TransitionAction::Complete => current == BookingStatus::Arrived,
        TransitionAction::Cancel => !current.is_terminal(),
    };
    if !allowed {
        return Err(ValidationError::IllegalTransition {
            from: current,
            action,
        });
    }
    Ok(action.target())
}

/// Actions a UI may offer for a booking in `status`.
pub fn available_actions(status: BookingStatus) -> Vec<TransitionAction> {
    [
        TransitionAction::MarkArrived,
        TransitionAction::Complete,
        TransitionAction::Cancel,
    ]
    .into_iter()
    .filter(|a| plan_transition(status, *a).is_ok())
    .collect()
}
