//! Fallback service catalog.
//!
//! Checkout and the payment webhook both need to resolve a service that may
//! not have been seeded into storage yet. Both read from one catalog built at
//! process start and injected into the application service.

use std::collections::BTreeMap;

use super::service::{Service, ServiceId};

/// Known services keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCatalog {
    services: BTreeMap<ServiceId, Service>,
}

impl ServiceCatalog {
    /// Builds a catalog from a list of services; later duplicates win.
    pub fn new(services: impl IntoIterator<Item = Service>) -> Self {
        Self {
            services: services
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
        }
    }

    pub fn get(&self, id: &ServiceId) -> Option<&Service> {
        self.services.get(id)
    }

    pub fn contains(&self, id: &ServiceId) -> bool {
        self.services.contains_key(id)
    }

    /// All services ordered by id.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl Default for ServiceCatalog {
    /// The salon's standard menu.
    fn default() -> Self {
        let menu = [
            ("cut", "Hair Cut", 5000, 60),
            ("color", "Coloring", 8000, 90),
            ("spa", "Head Spa", 4000, 45),
        ];

        Self::new(menu.into_iter().map(|(id, name, price, duration)| Service {
            id: ServiceId::from(id),
            name: name.to_string(),
            price,
            duration,
        }))
    }
}
