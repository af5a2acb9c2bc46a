//! Payment provider events and the booking metadata they carry.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::service::ServiceId;
use super::user::UserId;
use crate::error::DomainError;

/// Event type emitted when a hosted checkout is paid.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Metadata keys attached at checkout and echoed back in the completion event.
pub mod keys {
    pub const USER_ID: &str = "userId";
    pub const SERVICE_ID: &str = "serviceId";
    pub const RESERVATION_DATE: &str = "reservationDate";
    pub const SERVICE_DURATION: &str = "serviceDuration";
}

/// Generic provider event envelope.
///
/// Only the fields the receiver needs are typed; `data.object` stays raw JSON
/// until the event type is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl ProviderEvent {
    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }

    /// Interprets `data.object` as a checkout session.
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, serde_json::Error> {
        CheckoutSessionObject::deserialize(&self.data.object)
    }
}

/// The checkout session object carried by a completion event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Booking details that round-trip through the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingMetadata {
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub reservation_date: DateTime<Utc>,
    pub service_duration: i64,
}

impl BookingMetadata {
    /// Flattens into the provider's string key/value metadata.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (keys::USER_ID, self.user_id.to_string()),
            (keys::SERVICE_ID, self.service_id.to_string()),
            (
                keys::RESERVATION_DATE,
                self.reservation_date
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            (keys::SERVICE_DURATION, self.service_duration.to_string()),
        ]
    }

    /// Reads booking details back from event metadata.
    ///
    /// Every key must be present and non-empty; the date must be RFC 3339 and
    /// the duration a positive integer number of minutes.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, DomainError> {
        let field = |key: &'static str| {
            metadata
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or(DomainError::MissingMetadata(key))
        };

        let user_id = field(keys::USER_ID)?;
        let service_id = field(keys::SERVICE_ID)?;
        let reservation_date = field(keys::RESERVATION_DATE)?;
        let service_duration = field(keys::SERVICE_DURATION)?;

        let reservation_date = DateTime::parse_from_rfc3339(reservation_date)
            .map_err(|e| DomainError::InvalidDate(format!("{reservation_date}: {e}")))?
            .with_timezone(&Utc);

        let service_duration: i64 = service_duration.parse().map_err(|_| {
            DomainError::ValidationError(format!("serviceDuration is not a number: {service_duration}"))
        })?;
        if service_duration <= 0 {
            return Err(DomainError::InvalidDuration(service_duration));
        }

        Ok(Self {
            user_id: UserId::from(user_id),
            service_id: ServiceId::from(service_id),
            reservation_date,
            service_duration,
        })
    }
}
