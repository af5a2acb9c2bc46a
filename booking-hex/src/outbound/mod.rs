//! Outbound Adapters
//!
//! HTTP clients for the payment provider and the chat webhook, implementing
//! the `CheckoutGateway` and `Notifier` ports.

pub mod slack;
pub mod stripe;

pub use slack::SlackNotifier;
pub use stripe::StripeCheckout;
