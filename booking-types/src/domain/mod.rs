//! Domain models for the reservation service.

pub mod catalog;
pub mod dead_letter;
pub mod event;
pub mod money;
pub mod reservation;
pub mod service;
pub mod user;

pub use catalog::ServiceCatalog;
pub use dead_letter::{DeadLetter, FailureStage};
pub use event::{BookingMetadata, CHECKOUT_SESSION_COMPLETED, CheckoutSessionObject, ProviderEvent};
pub use money::{Currency, Money};
pub use reservation::{
    Reservation, ReservationDetails, ReservationId, ReservationInsert, ReservationStatus,
};
pub use service::{Service, ServiceId};
pub use user::{Role, User, UserId};
