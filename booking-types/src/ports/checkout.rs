//! Hosted checkout provider port.

use crate::domain::{BookingMetadata, Currency, Service};

/// Error type for checkout operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Payment provider error: {0}")]
    Provider(String),
}

/// Everything the provider needs to host a payment page for one booking.
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub service: Service,
    pub currency: Currency,
    /// Shown under the line item, e.g. `2024-06-01 14:00`
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BookingMetadata,
}

/// A created hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Port trait for hosted checkout providers.
#[async_trait::async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Creates a one-item payment session whose metadata must be echoed back
    /// unmodified in the completion event.
    async fn create_session(
        &self,
        req: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;
}
