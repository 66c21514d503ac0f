use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::tracking::TrackingParameters;

/// Order lifecycle status in the attribution service's vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    WaitingPayment,
    Paid,
    Refunded,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub country: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProduct {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub price_in_cents: i64,
}

/// All commission figures are integer minor units.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub total_price_in_cents: i64,
    pub gateway_fee_in_cents: i64,
    pub user_commission_in_cents: i64,
    pub currency: String,
}

/// Outbound order event in the attribution service's wire schema.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionOrder {
    pub order_id: String,
    pub platform: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub approved_date: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub customer: OrderCustomer,
    pub products: Vec<OrderProduct>,
    pub tracking_parameters: TrackingParameters,
    pub commission: Commission,
}
