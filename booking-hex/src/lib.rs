//! # Booking Hex
//!
//! Application service layer and adapters for the reservation service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (checkout, payment confirmation, admin reads)
//! - `inbound/` - HTTP adapter (Axum server)
//! - `outbound/` - Payment provider and chat webhook clients
//!
//! The service is generic over `R: BookingRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod outbound;
pub mod service;


pub use service::{BookingService, BookingSettings, NotificationStatus, WebhookOutcome};
