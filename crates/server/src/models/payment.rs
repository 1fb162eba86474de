//! Payments and refund requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cafe_calories_core::{OrderId, PaymentId, PaymentStatus, RefundRequestId, RefundStatus};

/// Payment provider recorded for mock settlements.
pub const MOCK_PROVIDER: &str = "MOCK";

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub provider: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub id: RefundRequestId,
    pub order_id: OrderId,
    pub reason: String,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
