//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod checkout;
mod notifier;
mod repository;

pub use checkout::{CheckoutGateway, CheckoutSession, CheckoutSessionRequest, GatewayError};
pub use notifier::{Notification, NotificationField, Notifier, NotifyError};
pub use repository::BookingRepository;
