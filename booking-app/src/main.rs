//! # Booking Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize logging and, when configured, OpenTelemetry export
//! - Initialize the repository adapter and the provider clients
//! - Create the booking service
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_hex::inbound::{HttpServer, WebhookVerification};
use booking_hex::outbound::{SlackNotifier, StripeCheckout};
use booking_hex::{BookingService, BookingSettings};
use booking_repo::build_repo;
use booking_types::ServiceCatalog;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("booking-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;

    // Export spans only when a collector is configured
    let (telemetry, otel_provider) = match &config.otlp_endpoint {
        Some(_) => {
            let (tracer, provider) = init_tracer()?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking_app=debug,booking_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!("Starting booking server on port {}", config.port);
    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!("Exporting traces to {}", endpoint);
    }

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!("Using {} database", repo.backend());

    let settings = BookingSettings {
        currency: config.currency,
        booking_offset: config.booking_offset,
        public_base_url: config.public_base_url.clone(),
    };
    let mut service = BookingService::new(repo, ServiceCatalog::default(), settings);

    match &config.stripe_secret_key {
        Some(key) => {
            let checkout = StripeCheckout::new(&config.stripe_api_base, key)?;
            service = service.with_checkout(Arc::new(checkout));
        }
        None => tracing::warn!("STRIPE_SECRET_KEY is not set; checkout requests will fail with 503"),
    }

    match &config.slack_webhook_url {
        Some(url) => service = service.with_notifier(Arc::new(SlackNotifier::new(url)?)),
        None => tracing::info!("SLACK_WEBHOOK_URL is not set; confirmations will not be announced"),
    }

    if config.seed_services {
        let count = service.seed_catalog().await?;
        tracing::info!("Seeded {} catalog services", count);
    }

    let webhook = match &config.stripe_webhook_secret {
        Some(secret) => WebhookVerification::signed(secret.clone(), config.webhook_tolerance_secs),
        None => {
            tracing::warn!(
                "STRIPE_WEBHOOK_SECRET is not set; webhook signature verification is DISABLED"
            );
            WebhookVerification::default()
        }
    };

    // Create and run the HTTP server
    let server = HttpServer::with_rate_limit(service, webhook, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }
    Ok(())
}
