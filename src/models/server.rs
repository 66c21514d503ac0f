use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::tracking::TrackingParameters;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CheckoutCustomer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub cpf: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CheckoutItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

/// Storefront checkout payload. The address block is carried opaquely; this
/// service never inspects it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositRequest {
    pub customer: CheckoutCustomer,
    #[serde(default)]
    pub address: Option<serde_json::Value>,
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub tracking_params: Option<TrackingParameters>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixPayload {
    pub qrcode: String,
    pub qr_code_base64: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepositResponse {
    pub success: bool,
    pub order_id: String,
    pub transaction_id: String,
    pub pix: PixPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub transaction_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}
