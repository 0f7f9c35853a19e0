//! Status enums for orders.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How an order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// Card payment through a hosted checkout session.
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Card => write!(f, "card"),
        }
    }
}

/// Coarse order lifecycle state.
///
/// The backend only reports `isPaid` and `isDelivered`; this folds them into
/// one value for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentState {
    /// Card order whose payment has not been captured.
    AwaitingPayment,
    /// Paid (or cash) order not yet delivered.
    AwaitingDelivery,
    /// Delivered.
    Delivered,
}

impl FulfillmentState {
    /// Derive the state from the backend's flags.
    #[must_use]
    pub const fn from_flags(method: PaymentMethod, is_paid: bool, is_delivered: bool) -> Self {
        if is_delivered {
            Self::Delivered
        } else if !is_paid && matches!(method, PaymentMethod::Card) {
            Self::AwaitingPayment
        } else {
            Self::AwaitingDelivery
        }
    }
}

impl fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingPayment => write!(f, "awaiting payment"),
            Self::AwaitingDelivery => write!(f, "awaiting delivery"),
            Self::Delivered => write!(f, "delivered"),
        }
    }
}
