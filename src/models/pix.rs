use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::tracking::TrackingParameters;

#[derive(Clone, Debug)]
pub struct Payer {
    pub name: String,
    pub email: String,
    pub document: String,
    pub phone: String,
}

/// Outbound deposit creation request. Amount is in major units (reais);
/// the gateway wire contract takes decimal amounts.
#[derive(Clone, Debug)]
pub struct DepositRequest {
    pub amount: f64,
    pub payer: Payer,
    pub postback_url: String,
    pub tracking: TrackingParameters,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayErrorKind {
    MissingCredentials,
    Network,
    Api,
    Parse,
}

impl GatewayErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayErrorKind::MissingCredentials => "missing_credentials",
            GatewayErrorKind::Network => "network_error",
            GatewayErrorKind::Api => "api_error",
            GatewayErrorKind::Parse => "parse_error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        GatewayError {
            kind,
            message: message.into(),
        }
    }
}

/// Result of a deposit creation attempt. Gateway failures are data, not
/// errors; callers branch on the variant.
#[derive(Clone, Debug)]
pub enum DepositOutcome {
    Approved {
        transaction_id: String,
        qr_code: String,
        qr_code_image: Option<String>,
        expires_at: DateTime<Utc>,
    },
    Rejected(GatewayError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixStatus {
    Pending,
    Paid,
    Expired,
    Cancelled,
}

impl PixStatus {
    /// Maps the gateway's status vocabulary onto the fixed four-value set.
    /// Anything unrecognized (or absent) degrades to pending.
    pub fn from_gateway(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("paid") | Some("approved") | Some("completed") | Some("confirmed") => {
                PixStatus::Paid
            }
            Some("expired") => PixStatus::Expired,
            Some("cancelled") | Some("canceled") | Some("refused") | Some("refunded") => {
                PixStatus::Cancelled
            }
            _ => PixStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PixStatus::Pending => "pending",
            PixStatus::Paid => "paid",
            PixStatus::Expired => "expired",
            PixStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatusOutcome {
    pub transaction_id: String,
    pub status: PixStatus,
    pub amount: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Normalized projection of a `payment_received` webhook payload.
#[derive(Clone, Debug)]
pub struct ReceivedPayment {
    pub transaction_id: String,
    pub raw_status: Option<String>,
    pub amount: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payer_name: Option<String>,
    pub payer_document: Option<String>,
}
