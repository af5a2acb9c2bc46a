//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ReservationDetails, ReservationId, ReservationStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Checkout DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to start a hosted checkout for a booking.
///
/// Fields are optional on the wire so that missing ones are reported as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    #[schema(example = "spa")]
    pub service_id: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default)]
    #[schema(example = "2024-06-01")]
    pub date: Option<String>,
    /// Wall-clock time, `HH:MM`
    #[serde(default)]
    #[schema(example = "14:00")]
    pub time: Option<String>,
}

impl CheckoutRequest {
    pub fn new(
        service_id: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            service_id: Some(service_id.into()),
            date: Some(date.into()),
            time: Some(time.into()),
        }
    }

    /// Returns `(service_id, date, time)` when all three are present and non-empty.
    pub fn required_fields(&self) -> Option<(&str, &str, &str)> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        Some((
            present(&self.service_id)?,
            present(&self.date)?,
            present(&self.time)?,
        ))
    }
}

/// Hosted checkout the customer should be redirected to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    #[schema(example = "cs_test_a1b2c3")]
    pub session_id: String,
    #[schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1b2c3")]
    pub url: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// One row of the admin reservation listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationView {
    pub id: ReservationId,
    #[schema(example = "Hanako")]
    pub customer_name: String,
    #[schema(example = "hanako@example.com")]
    pub customer_email: String,
    #[schema(example = "Head Spa")]
    pub service_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ReservationDetails> for ReservationView {
    fn from(details: ReservationDetails) -> Self {
        let customer_name = details.user.display_name().to_string();
        let r = details.reservation;
        Self {
            id: r.id,
            customer_name,
            customer_email: details.user.email,
            service_name: details.service.name,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
            stripe_session_id: r.stripe_session_id,
            created_at: r.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_uses_camel_case() {
        let req: CheckoutRequest = serde_json::from_str(
            r#"{"serviceId": "spa", "date": "2024-06-01", "time": "14:00"}"#,
        )
        .unwrap();
        assert_eq!(req.required_fields(), Some(("spa", "2024-06-01", "14:00")));
    }

    #[test]
    fn test_checkout_request_missing_or_blank_fields() {
        let req: CheckoutRequest =
            serde_json::from_str(r#"{"serviceId": "spa", "date": "2024-06-01"}"#).unwrap();
        assert_eq!(req.required_fields(), None);

        let req = CheckoutRequest::new("spa", " ", "14:00");
        assert_eq!(req.required_fields(), None);
    }

    #[test]
    fn test_checkout_response_shape() {
        let body = serde_json::to_value(CheckoutResponse {
            session_id: "cs_1".into(),
            url: "https://pay.example/cs_1".into(),
        })
        .unwrap();
        assert_eq!(body["sessionId"], "cs_1");
        assert_eq!(body["url"], "https://pay.example/cs_1");
    }
}
