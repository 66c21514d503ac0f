use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};

use crate::models::pix::{
    DepositOutcome, DepositRequest, GatewayError, GatewayErrorKind, PixStatus, ReceivedPayment,
    StatusOutcome,
};
use crate::repositories::pix::PixGateway;
use crate::utils::{digits_only, normalize_phone};

/// The gateway's responses are inconsistently cased across its own
/// endpoints, so every logical field is read through an ordered candidate
/// list.
const TRANSACTION_ID_FIELDS: &[&str] = &[
    "id_transaction",
    "idTransaction",
    "transaction_id",
    "transactionId",
    "txid",
    "id",
];
const QR_CODE_FIELDS: &[&str] = &[
    "qr_code",
    "qrcode",
    "qrCode",
    "pix_code",
    "payment_code",
    "paymentCode",
];
const QR_IMAGE_FIELDS: &[&str] = &[
    "qr_code_image",
    "qrcode_image",
    "qr_code_base64",
    "qrCodeBase64",
    "base64",
];
const EXPIRY_FIELDS: &[&str] = &["expires_at", "expiresAt", "expiration", "due_date"];
const STATUS_FIELDS: &[&str] = &["status", "status_transaction", "statusTransaction"];
const AMOUNT_FIELDS: &[&str] = &["amount", "value"];
const PAID_AT_FIELDS: &[&str] = &["paid_at", "paidAt", "payment_date", "date"];
const PAYER_NAME_FIELDS: &[&str] = &["payer_name", "payerName", "debtor_name", "name"];
const PAYER_DOCUMENT_FIELDS: &[&str] = &[
    "payer_document",
    "payerDocument",
    "debtor_document_number",
    "document",
];
const ERROR_CODE_FIELDS: &[&str] = &["error_code", "errorCode", "code"];
const ERROR_MESSAGE_FIELDS: &[&str] = &["message", "error", "msg"];

const DEFAULT_EXPIRY_MINUTES: i64 = 30;

pub struct TrexPayApi {
    url: String,
    token: String,
    secret: String,
    client: reqwest::Client,
}

impl TrexPayApi {
    pub fn new(url: String, token: String, secret: String) -> Self {
        TrexPayApi {
            url,
            token,
            secret,
            client: reqwest::Client::new(),
        }
    }

    fn deposit_payload(&self, request: &DepositRequest) -> Value {
        let mut payload = Map::new();
        payload.insert("token".into(), Value::from(self.token.as_str()));
        payload.insert("secret".into(), Value::from(self.secret.as_str()));
        payload.insert(
            "postback".into(),
            Value::from(request.postback_url.as_str()),
        );
        payload.insert("amount".into(), Value::from(request.amount));
        payload.insert(
            "debtor_name".into(),
            Value::from(request.payer.name.as_str()),
        );
        payload.insert("email".into(), Value::from(request.payer.email.as_str()));
        payload.insert(
            "debtor_document_number".into(),
            Value::from(digits_only(&request.payer.document)),
        );
        payload.insert(
            "phone".into(),
            Value::from(normalize_phone(&request.payer.phone)),
        );
        payload.insert("method_pay".into(), Value::from("pix"));

        // Absent tracking fields are omitted, never sent as null.
        let tracking = &request.tracking;
        let optional = [
            ("src", &tracking.src),
            ("sck", &tracking.sck),
            ("utm_source", &tracking.utm_source),
            ("utm_medium", &tracking.utm_medium),
            ("utm_campaign", &tracking.utm_campaign),
            ("utm_content", &tracking.utm_content),
            ("utm_term", &tracking.utm_term),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                payload.insert(key.into(), Value::from(v.as_str()));
            }
        }

        Value::Object(payload)
    }
}

#[async_trait]
impl PixGateway for TrexPayApi {
    async fn create_deposit(&self, request: DepositRequest) -> DepositOutcome {
        if self.token.trim().is_empty() || self.secret.trim().is_empty() {
            return DepositOutcome::Rejected(GatewayError::new(
                GatewayErrorKind::MissingCredentials,
                "gateway token or secret is not configured",
            ));
        }

        let payload = self.deposit_payload(&request);
        let response = match self
            .client
            .post(format!("{}/deposit", self.url))
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::error!("TrexPay deposit request failed: {}", e);
                return DepositOutcome::Rejected(GatewayError::new(
                    GatewayErrorKind::Network,
                    e.to_string(),
                ));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                log::error!("TrexPay deposit body read failed: {}", e);
                return DepositOutcome::Rejected(GatewayError::new(
                    GatewayErrorKind::Network,
                    e.to_string(),
                ));
            }
        };

        let body: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(_) => {
                log::error!(
                    "TrexPay deposit returned non-JSON body (http {}): {}",
                    status,
                    text
                );
                return DepositOutcome::Rejected(GatewayError::new(
                    GatewayErrorKind::Parse,
                    format!("gateway returned a non-JSON response (http {})", status),
                ));
            }
        };

        if !status.is_success() {
            let code = pick_string(&body, ERROR_CODE_FIELDS)
                .unwrap_or_else(|| status.as_u16().to_string());
            let message = pick_string(&body, ERROR_MESSAGE_FIELDS)
                .unwrap_or_else(|| "gateway rejected the deposit".to_string());
            log::error!("TrexPay deposit rejected: {} - {}", code, message);
            return DepositOutcome::Rejected(GatewayError::new(
                GatewayErrorKind::Api,
                format!("{}: {}", code, message),
            ));
        }

        deposit_from_body(&body)
    }

    async fn get_status(&self, transaction_id: &str) -> Result<StatusOutcome, GatewayError> {
        let payload = serde_json::json!({
            "token": self.token,
            "secret": self.secret,
            "id_transaction": transaction_id,
        });

        let response = self
            .client
            .post(format!("{}/consult-status-transaction", self.url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::new(GatewayErrorKind::Network, e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::new(GatewayErrorKind::Parse, e.to_string()))?;

        if !status.is_success() {
            let message = pick_string(&body, ERROR_MESSAGE_FIELDS)
                .unwrap_or_else(|| format!("gateway status query failed (http {})", status));
            return Err(GatewayError::new(GatewayErrorKind::Api, message));
        }

        let root = response_root(&body);
        Ok(StatusOutcome {
            transaction_id: transaction_id.to_string(),
            status: PixStatus::from_gateway(pick_string(root, STATUS_FIELDS).as_deref()),
            amount: pick_f64(root, AMOUNT_FIELDS),
            paid_at: pick_datetime(root, PAID_AT_FIELDS),
        })
    }
}

/// Projects a `payment_received` webhook payload into a normalized record.
/// Pure field mapping: the caller has already checked the event tag.
pub fn interpret_received_payment(payload: &Value) -> ReceivedPayment {
    let root = response_root(payload);
    ReceivedPayment {
        transaction_id: pick_string(root, TRANSACTION_ID_FIELDS).unwrap_or_default(),
        raw_status: pick_string(root, STATUS_FIELDS),
        amount: pick_f64(root, AMOUNT_FIELDS),
        paid_at: pick_datetime(root, PAID_AT_FIELDS),
        payer_name: pick_string(root, PAYER_NAME_FIELDS),
        payer_document: pick_string(root, PAYER_DOCUMENT_FIELDS),
    }
}

/// Success bodies arrive either flat or nested under `data`.
fn response_root(body: &Value) -> &Value {
    match body.get("data") {
        Some(data) if data.is_object() => data,
        _ => body,
    }
}

fn deposit_from_body(body: &Value) -> DepositOutcome {
    let root = response_root(body);

    let transaction_id = match pick_string(root, TRANSACTION_ID_FIELDS) {
        Some(id) => id,
        None => {
            return DepositOutcome::Rejected(GatewayError::new(
                GatewayErrorKind::Parse,
                "gateway response is missing the transaction id",
            ));
        }
    };
    let qr_code = match pick_string(root, QR_CODE_FIELDS) {
        Some(code) => code,
        None => {
            return DepositOutcome::Rejected(GatewayError::new(
                GatewayErrorKind::Parse,
                "gateway response is missing the payment code",
            ));
        }
    };

    DepositOutcome::Approved {
        transaction_id,
        qr_code,
        qr_code_image: pick_string(root, QR_IMAGE_FIELDS),
        expires_at: pick_datetime(root, EXPIRY_FIELDS)
            .unwrap_or_else(|| Utc::now() + Duration::minutes(DEFAULT_EXPIRY_MINUTES)),
    }
}

/// First non-null candidate, stringified. Numeric ids are accepted; the
/// gateway has been seen returning both.
fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

fn pick_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match value.get(key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(parsed) = s.parse::<f64>() {
                    return Some(parsed);
                }
            }
            _ => continue,
        }
    }
    None
}

fn pick_datetime(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    for key in keys {
        if let Some(Value::String(s)) = value.get(key) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
                return Some(parsed.with_timezone(&Utc));
            }
        }
    }
    None
}
