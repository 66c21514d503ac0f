use async_trait::async_trait;
use std::sync::Arc;

use super::RequestHandler;
use super::Service;

use crate::models::attribution::AttributionOrder;
use crate::repositories::attribution::AttributionApi;

/// No reply channel on purpose: attribution forwarding is a best-effort
/// side channel and can never hold up a payment flow.
pub enum AttributionServiceRequest {
    OrderEvent { order: AttributionOrder },
}

pub struct AttributionService;

impl AttributionService {
    pub fn new() -> Self {
        AttributionService
    }
}

impl Default for AttributionService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<AttributionServiceRequest, AttributionRequestHandler> for AttributionService {}

#[derive(Clone)]
pub struct AttributionRequestHandler {
    api: Arc<AttributionApi>,
}

impl AttributionRequestHandler {
    pub fn new(api: AttributionApi) -> Self {
        AttributionRequestHandler { api: Arc::new(api) }
    }
}

#[async_trait]
impl RequestHandler<AttributionServiceRequest> for AttributionRequestHandler {
    async fn handle_request(&self, request: AttributionServiceRequest) {
        match request {
            AttributionServiceRequest::OrderEvent { order } => {
                match self.api.send_order(&order).await {
                    Ok(()) => log::info!(
                        "Forwarded attribution event for order {} ({:?})",
                        order.order_id,
                        order.status
                    ),
                    // Swallowed: a lost attribution event is acceptable,
                    // a blocked payment is not.
                    Err(e) => log::warn!(
                        "Attribution forwarding failed for order {}: {}",
                        order.order_id,
                        e
                    ),
                }
            }
        }
    }
}
