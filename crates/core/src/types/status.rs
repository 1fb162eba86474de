//! Status enums and the order state machine.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Staff move orders through [`OrderStatus::allowed_transitions`]. `Delivered`
/// is only reachable from `PickedUp` through a driver's delivery confirmation,
/// and `Refunded` only through an approved refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Declined,
    Ready,
    PickedUp,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [Self; 8] = [
        Self::Pending,
        Self::Accepted,
        Self::Declined,
        Self::Ready,
        Self::PickedUp,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Names of the statuses for which `keep` holds, in declaration order.
    #[must_use]
    pub fn names_where(keep: impl Fn(Self) -> bool) -> Vec<&'static str> {
        Self::ALL
            .into_iter()
            .filter(|status| keep(*status))
            .map(Self::as_str)
            .collect()
    }

    /// Statuses staff may move an order to from `self`.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Declined],
            Self::Accepted => &[Self::Ready, Self::Cancelled],
            Self::Ready => &[Self::PickedUp],
            Self::Declined
            | Self::PickedUp
            | Self::Delivered
            | Self::Cancelled
            | Self::Refunded => &[],
        }
    }

    /// Whether staff may move an order from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// The placer may cancel only before the cafe starts preparing.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Payment is accepted while the order is still open.
    #[must_use]
    pub const fn is_payable(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// A driver can be attached once the cafe has accepted the order.
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        matches!(self, Self::Accepted | Self::Ready)
    }

    /// Orders that count toward revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        matches!(self, Self::Accepted | Self::Ready | Self::PickedUp)
    }

    /// Orders whose food never reached the customer.
    #[must_use]
    pub const fn is_voided(self) -> bool {
        matches!(self, Self::Declined | Self::Cancelled | Self::Refunded)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Ready => "READY",
            Self::PickedUp => "PICKED_UP",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Paid,
    Failed,
    Refunded,
}

/// Availability of a driver, as of their latest location record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "driver_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    #[default]
    Idle,
    Occupied,
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Occupied => "OCCUPIED",
        })
    }
}

/// Review status of a refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "refund_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        })
    }
}

/// The period a calorie goal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "goal_period", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}
