use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use super::attribution::AttributionServiceRequest;
use super::RequestHandler;
use super::Service;
use super::ServiceError;

use crate::models::attribution::{
    AttributionOrder, Commission, OrderCustomer, OrderProduct, OrderStatus,
};
use crate::models::pix::{DepositOutcome, DepositRequest, Payer, PixStatus, StatusOutcome};
use crate::models::server::CreateDepositRequest;
use crate::models::tracking::TrackingParameters;
use crate::repositories::pix::trexpay::interpret_received_payment;
use crate::repositories::pix::PixGateway;
use crate::repositories::tracking::TrackingStore;
use crate::utils::money::to_cents;
use crate::utils::{digits_only, new_order_id, normalize_phone};

const PLATFORM: &str = "pix-bridge";
const CURRENCY: &str = "BRL";

#[derive(Clone, Debug)]
pub struct CreatedCheckout {
    pub order_id: String,
    pub transaction_id: String,
    pub qr_code: String,
    pub qr_code_image: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    Accepted,
    InvalidSignature,
}

pub enum PixServiceRequest {
    CreateDeposit {
        checkout: CreateDepositRequest,
        response: oneshot::Sender<Result<CreatedCheckout, ServiceError>>,
    },
    QueryStatus {
        transaction_id: String,
        response: oneshot::Sender<StatusOutcome>,
    },
    Webhook {
        payload: Value,
        signature: Option<String>,
        response: oneshot::Sender<WebhookOutcome>,
    },
}

pub struct PixService;

impl PixService {
    pub fn new() -> Self {
        PixService
    }
}

impl Default for PixService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<PixServiceRequest, PixRequestHandler> for PixService {}

#[derive(Clone)]
pub struct PixRequestHandler {
    gateway: Arc<dyn PixGateway>,
    tracking: Arc<dyn TrackingStore>,
    attribution_channel: mpsc::Sender<AttributionServiceRequest>,
    postback_url: String,
    webhook_secret: Option<String>,
}

impl PixRequestHandler {
    pub fn new(
        gateway: Arc<dyn PixGateway>,
        tracking: Arc<dyn TrackingStore>,
        attribution_channel: mpsc::Sender<AttributionServiceRequest>,
        postback_url: String,
        webhook_secret: Option<String>,
    ) -> Self {
        PixRequestHandler {
            gateway,
            tracking,
            attribution_channel,
            postback_url,
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
        }
    }

    async fn create_deposit(
        &self,
        checkout: CreateDepositRequest,
    ) -> Result<CreatedCheckout, ServiceError> {
        let order_id = new_order_id();
        let tracking = checkout.tracking_params.clone().unwrap_or_default();

        // Saved under the local id first; the gateway id is not known yet.
        self.tracking.save(&order_id, tracking.clone());

        let outcome = self
            .gateway
            .create_deposit(DepositRequest {
                amount: checkout.total,
                payer: Payer {
                    name: checkout.customer.name.clone(),
                    email: checkout.customer.email.clone(),
                    document: checkout.customer.cpf.clone(),
                    phone: checkout.customer.phone.clone(),
                },
                postback_url: self.postback_url.clone(),
                tracking: tracking.clone(),
            })
            .await;

        let created = match outcome {
            DepositOutcome::Approved {
                transaction_id,
                qr_code,
                qr_code_image,
                expires_at,
            } => CreatedCheckout {
                order_id: order_id.clone(),
                transaction_id,
                qr_code,
                qr_code_image,
                expires_at,
            },
            DepositOutcome::Rejected(e) => {
                log::error!("Deposit creation rejected for {}: {}", order_id, e.message);
                return Err(ServiceError::Gateway {
                    code: e.kind.code().to_string(),
                    message: e.message,
                });
            }
        };

        // Bridge the id gap: the webhook will only know the gateway id.
        self.tracking
            .save(&created.transaction_id, tracking.clone());

        let order = waiting_payment_order(&order_id, &checkout, tracking);
        self.forward_attribution(order).await;

        Ok(created)
    }

    async fn query_status(&self, transaction_id: String) -> StatusOutcome {
        match self.gateway.get_status(&transaction_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Degrades to pending; the storefront never sees "unknown".
                log::error!("Status query failed for {}: {}", transaction_id, e.message);
                StatusOutcome {
                    transaction_id,
                    status: PixStatus::Pending,
                    amount: None,
                    paid_at: None,
                }
            }
        }
    }

    async fn webhook(&self, payload: Value, signature: Option<String>) -> WebhookOutcome {
        match (&self.webhook_secret, &signature) {
            (Some(secret), Some(supplied)) => {
                // A body-embedded signature cannot have signed itself.
                let mut signed = payload.clone();
                if let Some(object) = signed.as_object_mut() {
                    object.remove("signature");
                }
                if !crate::utils::signature::verify(&signed, supplied, secret) {
                    log::warn!("Webhook rejected: signature mismatch");
                    return WebhookOutcome::InvalidSignature;
                }
            }
            (Some(_), None) => {
                log::warn!("Webhook rejected: secret configured but no signature supplied");
                return WebhookOutcome::InvalidSignature;
            }
            (None, _) => {
                log::warn!("Webhook signature verification skipped: no secret configured");
            }
        }

        match event_tag(&payload).as_deref() {
            Some("payment_received") => self.handle_received_payment(&payload).await,
            Some("payment_sent") => {
                log::info!("Ignoring payment_sent webhook");
            }
            other => {
                log::info!("Ignoring unrecognized webhook event: {:?}", other);
            }
        }

        WebhookOutcome::Accepted
    }

    async fn handle_received_payment(&self, payload: &Value) {
        let received = interpret_received_payment(payload);
        let status = PixStatus::from_gateway(received.raw_status.as_deref());
        if status != PixStatus::Paid {
            log::info!(
                "payment_received for {} with status {}, nothing to forward",
                received.transaction_id,
                status.as_str()
            );
            return;
        }

        let tracking = match self.tracking.get(&received.transaction_id) {
            Some(params) => params,
            None => {
                log::warn!(
                    "No tracking parameters stored for {}, forwarding without them",
                    received.transaction_id
                );
                TrackingParameters::default()
            }
        };

        let amount_cents = to_cents(received.amount.unwrap_or(0.0));
        let order = AttributionOrder {
            order_id: received.transaction_id.clone(),
            platform: PLATFORM.to_string(),
            payment_method: "pix".to_string(),
            status: OrderStatus::Paid,
            created_at: None,
            approved_date: Some(received.paid_at.unwrap_or_else(Utc::now)),
            refunded_at: None,
            customer: OrderCustomer {
                name: received.payer_name.clone().unwrap_or_default(),
                email: String::new(),
                phone: None,
                document: received.payer_document.as_deref().map(digits_only),
                country: "BR".to_string(),
            },
            products: vec![OrderProduct {
                id: received.transaction_id.clone(),
                name: "Pagamento PIX".to_string(),
                quantity: 1,
                price_in_cents: amount_cents,
            }],
            tracking_parameters: tracking,
            commission: Commission {
                total_price_in_cents: amount_cents,
                gateway_fee_in_cents: 0,
                user_commission_in_cents: amount_cents,
                currency: CURRENCY.to_string(),
            },
        };

        self.forward_attribution(order).await;
    }

    /// Channel send only; delivery failures surface in the attribution
    /// service's own logs and never touch the primary flow.
    async fn forward_attribution(&self, order: AttributionOrder) {
        if let Err(e) = self
            .attribution_channel
            .send(AttributionServiceRequest::OrderEvent { order })
            .await
        {
            log::warn!("Could not queue attribution event: {}", e);
        }
    }
}

#[async_trait]
impl RequestHandler<PixServiceRequest> for PixRequestHandler {
    async fn handle_request(&self, request: PixServiceRequest) {
        match request {
            PixServiceRequest::CreateDeposit { checkout, response } => {
                let _ = response.send(self.create_deposit(checkout).await);
            }
            PixServiceRequest::QueryStatus {
                transaction_id,
                response,
            } => {
                let _ = response.send(self.query_status(transaction_id).await);
            }
            PixServiceRequest::Webhook {
                payload,
                signature,
                response,
            } => {
                let _ = response.send(self.webhook(payload, signature).await);
            }
        }
    }
}

fn waiting_payment_order(
    order_id: &str,
    checkout: &CreateDepositRequest,
    tracking: TrackingParameters,
) -> AttributionOrder {
    let total_cents = to_cents(checkout.total);
    AttributionOrder {
        order_id: order_id.to_string(),
        platform: PLATFORM.to_string(),
        payment_method: "pix".to_string(),
        status: OrderStatus::WaitingPayment,
        created_at: Some(Utc::now()),
        approved_date: None,
        refunded_at: None,
        customer: OrderCustomer {
            name: checkout.customer.name.clone(),
            email: checkout.customer.email.clone(),
            phone: Some(normalize_phone(&checkout.customer.phone)),
            document: Some(digits_only(&checkout.customer.cpf)),
            country: "BR".to_string(),
        },
        products: checkout
            .items
            .iter()
            .map(|item| OrderProduct {
                id: item.id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                price_in_cents: to_cents(item.price),
            })
            .collect(),
        tracking_parameters: tracking,
        commission: Commission {
            total_price_in_cents: total_cents,
            gateway_fee_in_cents: 0,
            user_commission_in_cents: total_cents,
            currency: CURRENCY.to_string(),
        },
    }
}

/// Event names arrive in several shapes (`payment_received`,
/// `payment.received`, upper case); normalize before matching.
fn event_tag(payload: &Value) -> Option<String> {
    let raw = payload
        .get("event")
        .or_else(|| payload.get("type"))?
        .as_str()?;
    Some(raw.trim().to_ascii_lowercase().replace(['.', '-'], "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_tag_normalizes_shapes() {
        assert_eq!(
            event_tag(&json!({"event": "payment_received"})).as_deref(),
            Some("payment_received")
        );
        assert_eq!(
            event_tag(&json!({"event": "PAYMENT.RECEIVED"})).as_deref(),
            Some("payment_received")
        );
        assert_eq!(
            event_tag(&json!({"type": "payment-sent"})).as_deref(),
            Some("payment_sent")
        );
        assert_eq!(event_tag(&json!({"event": 7})), None);
        assert_eq!(event_tag(&json!({})), None);
    }
}
