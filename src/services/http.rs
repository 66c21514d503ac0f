use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::pix::{PixServiceRequest, WebhookOutcome};
use super::ServiceError;
use crate::models::pix::PixStatus;
use crate::models::server::{
    CreateDepositRequest, CreateDepositResponse, PixPayload, StatusQuery, StatusResponse,
};

/// Signature header candidates, checked in order. The body-embedded
/// `signature` field is the final fallback.
const SIGNATURE_HEADERS: &[&str] = &["x-trexpay-signature", "x-signature", "signature"];

#[derive(Clone)]
struct AppState {
    pix_channel: mpsc::Sender<PixServiceRequest>,
}

/// Returns the list of validation problems; empty means acceptable.
pub fn validate_checkout(req: &CreateDepositRequest) -> Vec<String> {
    let mut problems = Vec::new();
    if req.customer.name.trim().is_empty() {
        problems.push("customer.name is required".to_string());
    }
    if req.customer.email.trim().is_empty() {
        problems.push("customer.email is required".to_string());
    }
    if req.customer.cpf.trim().is_empty() {
        problems.push("customer.cpf is required".to_string());
    }
    if req.customer.phone.trim().is_empty() {
        problems.push("customer.phone is required".to_string());
    }
    if req.items.is_empty() {
        problems.push("at least one item is required".to_string());
    }
    if req.total <= 0.0 {
        problems.push("total must be positive".to_string());
    }
    problems
}

async fn create_deposit(
    State(state): State<AppState>,
    Json(req): Json<CreateDepositRequest>,
) -> impl IntoResponse {
    let problems = validate_checkout(&req);
    if !problems.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "validation_error", "details": problems})),
        );
    }

    let (response_tx, response_rx) = oneshot::channel();
    if let Err(e) = state
        .pix_channel
        .send(PixServiceRequest::CreateDeposit {
            checkout: req,
            response: response_tx,
        })
        .await
    {
        log::error!("Pix service unavailable: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal_error", "details": "service unavailable"})),
        );
    }

    match response_rx.await {
        Ok(Ok(created)) => {
            let body = CreateDepositResponse {
                success: true,
                order_id: created.order_id,
                transaction_id: created.transaction_id,
                pix: PixPayload {
                    qrcode: created.qr_code,
                    qr_code_base64: created.qr_code_image,
                    expires_at: created.expires_at,
                },
            };
            (StatusCode::OK, Json(json!(body)))
        }
        Ok(Err(ServiceError::Gateway { code, message })) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": code, "details": message})),
        ),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal_error", "details": e.to_string()})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal_error", "details": e.to_string()})),
        ),
    }
}

async fn deposit_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    let transaction_id = match query.transaction_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "transactionId query parameter is required"})),
            );
        }
    };

    let (response_tx, response_rx) = oneshot::channel();
    let sent = state
        .pix_channel
        .send(PixServiceRequest::QueryStatus {
            transaction_id: transaction_id.clone(),
            response: response_tx,
        })
        .await;

    // Always 200 with success:true; failed lookups degrade to pending and a
    // caller must treat pending as possibly meaning "status unknown".
    let outcome = match sent {
        Ok(()) => response_rx.await.ok(),
        Err(e) => {
            log::error!("Pix service unavailable: {}", e);
            None
        }
    };

    let body = match outcome {
        Some(outcome) => StatusResponse {
            success: true,
            transaction_id: outcome.transaction_id,
            status: outcome.status.as_str().to_string(),
            amount: outcome.amount,
            paid_at: outcome.paid_at,
        },
        None => StatusResponse {
            success: true,
            transaction_id,
            status: PixStatus::Pending.as_str().to_string(),
            amount: None,
            paid_at: None,
        },
    };

    (StatusCode::OK, Json(json!(body)))
}

async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let payload: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Webhook body is not valid JSON: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid webhook payload"})),
            );
        }
    };

    let signature = extract_signature(&headers, &payload);

    let (response_tx, response_rx) = oneshot::channel();
    if let Err(e) = state
        .pix_channel
        .send(PixServiceRequest::Webhook {
            payload,
            signature,
            response: response_tx,
        })
        .await
    {
        log::error!("Pix service unavailable: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal_error"})),
        );
    }

    match response_rx.await {
        Ok(WebhookOutcome::Accepted) => (StatusCode::OK, Json(json!({"success": true}))),
        Ok(WebhookOutcome::InvalidSignature) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid signature"})),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("internal_error: {}", e)})),
        ),
    }
}

fn extract_signature(headers: &HeaderMap, payload: &Value) -> Option<String> {
    for name in SIGNATURE_HEADERS {
        if let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    payload
        .get("signature")
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub async fn start_http_server(
    port: u16,
    pix_channel: mpsc::Sender<PixServiceRequest>,
) -> Result<(), anyhow::Error> {
    let app_state = AppState { pix_channel };

    let app = Router::new()
        .route("/pix/create", post(create_deposit))
        .route("/pix/status", get(deposit_status))
        .route("/webhook/gateway", post(gateway_webhook))
        .route("/health", get(|| async { "OK" }))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    println!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
