use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Step of webhook processing that failed after the event was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Lookup,
    MaterializeService,
    InsertReservation,
    Notify,
}

impl AsRef<str> for FailureStage {
    fn as_ref(&self) -> &str {
        match self {
            Self::Lookup => "lookup",
            Self::MaterializeService => "materialize_service",
            Self::InsertReservation => "insert_reservation",
            Self::Notify => "notify",
        }
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for FailureStage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lookup" => Ok(Self::Lookup),
            "materialize_service" => Ok(Self::MaterializeService),
            "insert_reservation" => Ok(Self::InsertReservation),
            "notify" => Ok(Self::Notify),
            other => Err(DomainError::UnknownVariant {
                kind: "failure stage",
                value: other.to_string(),
            }),
        }
    }
}

/// A provider event whose processing failed after it was acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeadLetter {
    pub id: Uuid,
    pub event_id: String,
    pub event_type: String,
    pub stage: FailureStage,
    pub error: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        stage: FailureStage,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: event_id.into(),
            event_type: event_type.into(),
            stage,
            error: error.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}
