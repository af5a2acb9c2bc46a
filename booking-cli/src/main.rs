//! Booking CLI
//!
//! Command-line interface for the reservation API, plus helpers for driving
//! the webhook and the chat notifier during local development.

use anyhow::Result;
use chrono::{FixedOffset, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use booking_client::BookingClient;
use booking_hex::outbound::SlackNotifier;
use booking_hex::service::{booking_start, confirmation_notification};
use booking_repo::security::signature_header;
use booking_types::domain::CHECKOUT_SESSION_COMPLETED;
use booking_types::domain::event::keys;
use booking_types::{
    Currency, Money, Notifier, ServiceCatalog, ServiceId, User,
};

#[derive(Parser)]
#[command(name = "booking")]
#[command(author, version, about = "Reservation API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the reservation API
    #[arg(long, env = "BOOKING_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Session token for authenticated routes
    #[arg(long, env = "BOOKING_SESSION_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// List bookable services
    Services,
    /// Start a hosted checkout and print the redirect URL
    Checkout {
        /// Service id (cut, color, spa)
        #[arg(long)]
        service: String,
        /// Date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Time, HH:MM
        #[arg(long)]
        time: String,
    },
    /// List all reservations (admin)
    Reservations,
    /// List failed webhook events (admin)
    DeadLetters {
        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Payment event helpers
    Event {
        #[command(subcommand)]
        action: EventCommands,
    },
    /// Send a sample confirmation to the chat webhook
    SlackTest {
        #[arg(long, env = "SLACK_WEBHOOK_URL")]
        webhook_url: String,
        #[arg(long, default_value = "Test Customer")]
        name: String,
        #[arg(long, default_value = "test@example.com")]
        email: String,
        #[arg(long, default_value = "cut")]
        service: String,
        #[arg(long, default_value = "2024-06-01")]
        date: String,
        #[arg(long, default_value = "14:00")]
        time: String,
        #[arg(long, env = "BOOKING_UTC_OFFSET", default_value = "+00:00")]
        offset: FixedOffset,
        #[arg(long, env = "CHECKOUT_CURRENCY", default_value = "jpy")]
        currency: Currency,
    },
}

#[derive(Subcommand)]
enum EventCommands {
    /// Post a completed-checkout event to the webhook endpoint
    Simulate {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "cut")]
        service: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: String,
        #[arg(long, env = "BOOKING_UTC_OFFSET", default_value = "+00:00")]
        offset: FixedOffset,
        /// Checkout session id; generated when omitted
        #[arg(long)]
        session_id: Option<String>,
        /// Amount paid in minor units; defaults to the service price
        #[arg(long)]
        amount: Option<i64>,
        #[arg(long, env = "CHECKOUT_CURRENCY", default_value = "jpy")]
        currency: Currency,
        /// Signs the body when set
        #[arg(long, env = "STRIPE_WEBHOOK_SECRET")]
        secret: Option<String>,
        /// Print the event instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Parameters of a simulated completed checkout.
struct SimulatedCheckout<'a> {
    session_id: &'a str,
    user: &'a str,
    service: &'a str,
    date: &'a str,
    time: &'a str,
    offset: FixedOffset,
    amount: Option<i64>,
    currency: Currency,
}

/// Builds a completed-checkout event the way the payment provider would send it.
fn simulated_event(checkout: &SimulatedCheckout<'_>) -> Result<Value> {
    let catalog = ServiceCatalog::default();
    let service = catalog
        .get(&ServiceId::new(checkout.service))
        .ok_or_else(|| anyhow::anyhow!("Unknown service: {}", checkout.service))?;
    let start = booking_start(checkout.date, checkout.time, checkout.offset)?;

    Ok(json!({
        "id": format!("evt_{}", uuid::Uuid::new_v4().simple()),
        "type": CHECKOUT_SESSION_COMPLETED,
        "data": {
            "object": {
                "id": checkout.session_id,
                "amount_total": checkout.amount.unwrap_or(service.price),
                "currency": checkout.currency.provider_code(),
                "metadata": {
                    (keys::USER_ID): checkout.user,
                    (keys::SERVICE_ID): service.id.as_str(),
                    (keys::RESERVATION_DATE): start.to_rfc3339_opts(SecondsFormat::Millis, true),
                    (keys::SERVICE_DURATION): service.duration.to_string(),
                },
            }
        }
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = BookingClient::new(&cli.api_url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Services => {
            let services = client.list_services().await?;
            println!("{}", serde_json::to_string_pretty(&services)?);
        }

        Commands::Checkout {
            service,
            date,
            time,
        } => {
            let session = client.create_checkout(&service, &date, &time).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }

        Commands::Reservations => {
            let reservations = client.list_reservations().await?;
            println!("{}", serde_json::to_string_pretty(&reservations)?);
        }

        Commands::DeadLetters { limit } => {
            let letters = client.list_dead_letters(limit).await?;
            println!("{}", serde_json::to_string_pretty(&letters)?);
        }

        Commands::Event { action } => match action {
            EventCommands::Simulate {
                user,
                service,
                date,
                time,
                offset,
                session_id,
                amount,
                currency,
                secret,
                dry_run,
            } => {
                let session_id = session_id
                    .unwrap_or_else(|| format!("cs_test_{}", uuid::Uuid::new_v4().simple()));
                let event = simulated_event(&SimulatedCheckout {
                    session_id: &session_id,
                    user: &user,
                    service: &service,
                    date: &date,
                    time: &time,
                    offset,
                    amount,
                    currency,
                })?;
                let body = serde_json::to_string(&event)?;

                if dry_run {
                    println!("{}", serde_json::to_string_pretty(&event)?);
                    return Ok(());
                }

                let signature = secret
                    .map(|s| signature_header(body.as_bytes(), Utc::now().timestamp(), &s));
                let ack = client.send_event(body, signature.as_deref()).await?;
                println!("✓ Event for {} delivered: {}", session_id, serde_json::to_string(&ack)?);
            }
        },

        Commands::SlackTest {
            webhook_url,
            name,
            email,
            service,
            date,
            time,
            offset,
            currency,
        } => {
            let catalog = ServiceCatalog::default();
            let service = catalog
                .get(&ServiceId::new(service.as_str()))
                .ok_or_else(|| anyhow::anyhow!("Unknown service: {}", service))?;
            let start = booking_start(&date, &time, offset)?;
            let user = User::new("slack-test", Some(name), email);
            let amount = Money::new(service.price, currency)?;

            let notification = confirmation_notification(&user, &service.name, start, amount, offset);
            SlackNotifier::new(&webhook_url)?.send(&notification).await?;
            println!("✓ Test notification sent");
        }
    }

    Ok(())
}
