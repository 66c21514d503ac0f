use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use pix_bridge::models::attribution::OrderStatus;
use pix_bridge::models::pix::{
    DepositOutcome, DepositRequest, GatewayError, GatewayErrorKind, PixStatus, StatusOutcome,
};
use pix_bridge::models::server::{CheckoutCustomer, CheckoutItem, CreateDepositRequest};
use pix_bridge::models::tracking::TrackingParameters;
use pix_bridge::repositories::pix::PixGateway;
use pix_bridge::repositories::tracking::{InMemoryTrackingStore, TrackingStore};
use pix_bridge::services::attribution::AttributionServiceRequest;
use pix_bridge::services::pix::{PixRequestHandler, PixServiceRequest, WebhookOutcome};
use pix_bridge::services::RequestHandler;
use pix_bridge::utils::signature;

const MOCK_TRANSACTION_ID: &str = "trx_mock_1";

enum StatusBehavior {
    Paid,
    Unreachable,
}

struct MockGateway {
    status: StatusBehavior,
}

#[async_trait]
impl PixGateway for MockGateway {
    async fn create_deposit(&self, request: DepositRequest) -> DepositOutcome {
        assert!(request.amount > 0.0);
        DepositOutcome::Approved {
            transaction_id: MOCK_TRANSACTION_ID.to_string(),
            qr_code: "00020126580014br.gov.bcb.pix".to_string(),
            qr_code_image: Some("iVBORw0KGgo=".to_string()),
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    async fn get_status(&self, transaction_id: &str) -> Result<StatusOutcome, GatewayError> {
        match self.status {
            StatusBehavior::Paid => Ok(StatusOutcome {
                transaction_id: transaction_id.to_string(),
                status: PixStatus::Paid,
                amount: Some(49.90),
                paid_at: Some(Utc::now()),
            }),
            StatusBehavior::Unreachable => Err(GatewayError::new(
                GatewayErrorKind::Network,
                "connection refused",
            )),
        }
    }
}

struct Harness {
    handler: PixRequestHandler,
    attribution_rx: mpsc::Receiver<AttributionServiceRequest>,
    tracking: Arc<InMemoryTrackingStore>,
}

fn harness(status: StatusBehavior, webhook_secret: Option<&str>) -> Harness {
    let (attribution_tx, attribution_rx) = mpsc::channel(16);
    let tracking = Arc::new(InMemoryTrackingStore::new());
    let handler = PixRequestHandler::new(
        Arc::new(MockGateway { status }),
        tracking.clone(),
        attribution_tx,
        "https://shop.example.com/webhook/gateway".to_string(),
        webhook_secret.map(str::to_string),
    );
    Harness {
        handler,
        attribution_rx,
        tracking,
    }
}

fn checkout() -> CreateDepositRequest {
    CreateDepositRequest {
        customer: CheckoutCustomer {
            name: "Maria Souza".into(),
            email: "maria@example.com".into(),
            cpf: "123.456.789-09".into(),
            phone: "(11) 98765-4321".into(),
        },
        address: None,
        items: vec![CheckoutItem {
            id: "sku-1".into(),
            name: "Curso de Violão".into(),
            price: 49.90,
            quantity: 1,
        }],
        total: 49.90,
        shipping: 0.0,
        tracking_params: Some(TrackingParameters {
            utm_source: Some("facebook".into()),
            utm_campaign: Some("lancamento".into()),
            ..Default::default()
        }),
    }
}

fn paid_webhook_payload() -> Value {
    json!({
        "event": "payment_received",
        "id_transaction": MOCK_TRANSACTION_ID,
        "status": "paid",
        "amount": 49.90,
        "paid_at": "2026-08-29T15:30:00Z",
        "payer_name": "Maria Souza",
    })
}

#[tokio::test]
async fn checkout_creation_returns_pix_payload_and_fires_waiting_payment() {
    let mut h = harness(StatusBehavior::Paid, None);

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::CreateDeposit {
            checkout: checkout(),
            response: tx,
        })
        .await;

    let created = rx.await.unwrap().expect("deposit should be approved");
    assert!(!created.qr_code.is_empty());
    assert_eq!(created.transaction_id, MOCK_TRANSACTION_ID);
    assert!(created.expires_at >= Utc::now() + Duration::minutes(29));

    // The snapshot is stored under both the local and the gateway id.
    assert!(h.tracking.get(&created.order_id).is_some());
    assert_eq!(
        h.tracking.get(MOCK_TRANSACTION_ID),
        h.tracking.get(&created.order_id)
    );

    let AttributionServiceRequest::OrderEvent { order } =
        h.attribution_rx.try_recv().expect("one attribution event");
    assert_eq!(order.status, OrderStatus::WaitingPayment);
    assert_eq!(order.order_id, created.order_id);
    assert_eq!(order.commission.total_price_in_cents, 4990);
    assert_eq!(order.products.len(), 1);
    assert_eq!(order.products[0].price_in_cents, 4990);
    assert_eq!(
        order.tracking_parameters.utm_source.as_deref(),
        Some("facebook")
    );
    assert!(h.attribution_rx.try_recv().is_err());
}

#[tokio::test]
async fn status_query_reports_paid() {
    let h = harness(StatusBehavior::Paid, None);

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::QueryStatus {
            transaction_id: MOCK_TRANSACTION_ID.to_string(),
            response: tx,
        })
        .await;

    let outcome = rx.await.unwrap();
    assert_eq!(outcome.status, PixStatus::Paid);
    assert_eq!(outcome.amount, Some(49.90));
}

#[tokio::test]
async fn unreachable_gateway_degrades_status_to_pending() {
    let h = harness(StatusBehavior::Unreachable, None);

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::QueryStatus {
            transaction_id: MOCK_TRANSACTION_ID.to_string(),
            response: tx,
        })
        .await;

    let outcome = rx.await.unwrap();
    assert_eq!(outcome.status, PixStatus::Pending);
    assert!(outcome.amount.is_none());
}

#[tokio::test]
async fn paid_webhook_with_valid_signature_forwards_one_paid_event() {
    let mut h = harness(StatusBehavior::Paid, Some("topsecret"));
    h.tracking.save(
        MOCK_TRANSACTION_ID,
        TrackingParameters {
            utm_source: Some("facebook".into()),
            ..Default::default()
        },
    );

    let payload = paid_webhook_payload();
    let sig = signature::sign(&payload, "topsecret").unwrap();

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::Webhook {
            payload,
            signature: Some(sig),
            response: tx,
        })
        .await;

    assert_eq!(rx.await.unwrap(), WebhookOutcome::Accepted);

    let AttributionServiceRequest::OrderEvent { order } =
        h.attribution_rx.try_recv().expect("one attribution event");
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.order_id, MOCK_TRANSACTION_ID);
    assert_eq!(order.commission.total_price_in_cents, 4990);
    assert_eq!(
        order.tracking_parameters.utm_source.as_deref(),
        Some("facebook")
    );
    assert!(h.attribution_rx.try_recv().is_err(), "exactly one event");
}

#[tokio::test]
async fn webhook_with_wrong_signature_is_rejected_without_forwarding() {
    let mut h = harness(StatusBehavior::Paid, Some("topsecret"));

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::Webhook {
            payload: paid_webhook_payload(),
            signature: Some("sha256=deadbeef".to_string()),
            response: tx,
        })
        .await;

    assert_eq!(rx.await.unwrap(), WebhookOutcome::InvalidSignature);
    assert!(h.attribution_rx.try_recv().is_err());
}

#[tokio::test]
async fn webhook_without_signature_or_secret_is_processed() {
    let mut h = harness(StatusBehavior::Paid, None);
    h.tracking
        .save(MOCK_TRANSACTION_ID, TrackingParameters::default());

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::Webhook {
            payload: paid_webhook_payload(),
            signature: None,
            response: tx,
        })
        .await;

    assert_eq!(rx.await.unwrap(), WebhookOutcome::Accepted);
    assert!(h.attribution_rx.try_recv().is_ok());
}

#[tokio::test]
async fn body_embedded_signature_verifies_over_stripped_payload() {
    let mut h = harness(StatusBehavior::Paid, Some("topsecret"));

    let mut payload = paid_webhook_payload();
    let sig = signature::sign(&payload, "topsecret").unwrap();
    payload
        .as_object_mut()
        .unwrap()
        .insert("signature".into(), Value::String(sig.clone()));

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::Webhook {
            payload,
            signature: Some(sig),
            response: tx,
        })
        .await;

    assert_eq!(rx.await.unwrap(), WebhookOutcome::Accepted);
    assert!(h.attribution_rx.try_recv().is_ok());
}

#[tokio::test]
async fn unrecognized_webhook_event_is_acknowledged_and_ignored() {
    let mut h = harness(StatusBehavior::Paid, None);

    let (tx, rx) = oneshot::channel();
    h.handler
        .handle_request(PixServiceRequest::Webhook {
            payload: json!({"event": "chargeback_opened", "id_transaction": "trx_9"}),
            signature: None,
            response: tx,
        })
        .await;

    assert_eq!(rx.await.unwrap(), WebhookOutcome::Accepted);
    assert!(h.attribution_rx.try_recv().is_err());
}
