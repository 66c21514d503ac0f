use async_trait::async_trait;

use crate::models::pix::{DepositOutcome, DepositRequest, GatewayError, StatusOutcome};

pub mod trexpay;

/// Outbound PIX gateway operations. The production implementation is
/// [`trexpay::TrexPayApi`]; tests substitute their own.
#[async_trait]
pub trait PixGateway: Send + Sync {
    /// Creates a deposit. Gateway-side failures come back as
    /// `DepositOutcome::Rejected`, never as a panic or propagated error.
    async fn create_deposit(&self, request: DepositRequest) -> DepositOutcome;

    /// Queries the current status of a transaction. Callers map `Err` to a
    /// pending outcome; an unknown status never reaches the storefront.
    async fn get_status(&self, transaction_id: &str) -> Result<StatusOutcome, GatewayError>;
}
