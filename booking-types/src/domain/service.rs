//! Bookable service (reference data).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::money::{Currency, Money};
use crate::error::DomainError;

/// Identifier of a bookable service, e.g. `cut`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "cut")]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ServiceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A service customers can book.
///
/// Immutable once created; rows come from seeding or are materialized
/// from the [`ServiceCatalog`](super::ServiceCatalog) on first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: ServiceId,
    #[schema(example = "Hair Cut")]
    pub name: String,
    /// Price in the smallest currency unit
    #[schema(example = 5000)]
    pub price: i64,
    /// Duration in minutes
    #[schema(example = 60)]
    pub duration: i32,
}

impl Service {
    /// Creates a service after validating its fields.
    ///
    /// # Validation
    /// - Name cannot be empty
    /// - Price cannot be negative
    /// - Duration must be positive
    pub fn new(
        id: impl Into<ServiceId>,
        name: impl Into<String>,
        price: i64,
        duration: i32,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Service name cannot be empty".into(),
            ));
        }
        if price < 0 {
            return Err(DomainError::NegativeAmount);
        }
        if duration <= 0 {
            return Err(DomainError::InvalidDuration(duration.into()));
        }

        Ok(Self {
            id: id.into(),
            name,
            price,
            duration,
        })
    }

    /// Price as money in the given currency.
    pub fn price_in(&self, currency: Currency) -> Result<Money, DomainError> {
        Money::new(self.price, currency)
    }
}
