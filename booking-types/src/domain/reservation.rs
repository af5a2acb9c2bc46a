//! Reservation domain model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::service::{Service, ServiceId};
use super::user::{User, UserId};
use crate::error::DomainError;

/// Unique identifier for a Reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random ReservationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ReservationId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReservationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
    #[default]
    Pending,
}

impl AsRef<str> for ReservationStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::Pending => "PENDING",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            "PENDING" => Ok(Self::Pending),
            other => Err(DomainError::UnknownVariant {
                kind: "reservation status",
                value: other.to_string(),
            }),
        }
    }
}

/// A booked time slot for one user and one service.
///
/// `end_time` is always derived from `start_time` plus the service duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Payment provider checkout session that paid for this reservation
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a confirmed reservation for a completed checkout session.
    pub fn confirmed(
        user_id: UserId,
        service_id: ServiceId,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
        stripe_session_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        if duration_minutes <= 0 {
            return Err(DomainError::InvalidDuration(duration_minutes));
        }
        let end_time = Duration::try_minutes(duration_minutes)
            .and_then(|d| start_time.checked_add_signed(d))
            .ok_or(DomainError::InvalidDuration(duration_minutes))?;

        Ok(Self {
            id: ReservationId::new(),
            user_id,
            service_id,
            start_time,
            end_time,
            status: ReservationStatus::Confirmed,
            stripe_session_id: Some(stripe_session_id.into()),
            created_at: Utc::now(),
        })
    }

    /// Reconstructs a reservation from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ReservationId,
        user_id: UserId,
        service_id: ServiceId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: ReservationStatus,
        stripe_session_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            service_id,
            start_time,
            end_time,
            status,
            stripe_session_id,
            created_at,
        }
    }

    /// Length of the booked slot in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Result of inserting a reservation keyed by its checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationInsert {
    /// A new row was written.
    Created(Reservation),
    /// A reservation for the same checkout session already existed.
    AlreadyRecorded(Reservation),
}

/// A reservation joined with its customer and service, for the admin listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub user: User,
    pub service: Service,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_confirmed_reservation_derives_end_time() {
        let reservation = Reservation::confirmed(
            UserId::from("u1"),
            ServiceId::from("cut"),
            at("2024-05-01T10:00:00Z"),
            60,
            "cs_test_123",
        )
        .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.start_time, at("2024-05-01T10:00:00Z"));
        assert_eq!(reservation.end_time, at("2024-05-01T11:00:00Z"));
        assert_eq!(reservation.duration_minutes(), 60);
        assert_eq!(reservation.stripe_session_id.as_deref(), Some("cs_test_123"));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let result = Reservation::confirmed(
            UserId::from("u1"),
            ServiceId::from("cut"),
            at("2024-05-01T10:00:00Z"),
            0,
            "cs_test_123",
        );
        assert!(matches!(result, Err(DomainError::InvalidDuration(0))));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "CANCELLED".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Cancelled
        );
        assert!("DONE".parse::<ReservationStatus>().is_err());
    }
}
