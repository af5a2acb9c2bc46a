//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use booking_types::BookingRepository;

use super::auth::auth_middleware;
use super::handlers::{self, AppState, WebhookVerification};
use super::rate_limit::{RateLimiterState, rate_limit_middleware};
use crate::BookingService;

/// HTTP Server for the Reservation API.
pub struct HttpServer<R: BookingRepository> {
    state: Arc<AppState<R>>,
    rate_limiter: Arc<RateLimiterState>,
}

impl<R: BookingRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: BookingService<R>, webhook: WebhookVerification) -> Self {
        Self {
            state: Arc::new(AppState { service, webhook }),
            rate_limiter: Arc::new(RateLimiterState::default()), // 100 req/min default
        }
    }

    /// Creates a new HTTP server with custom rate limiting.
    pub fn with_rate_limit(
        service: BookingService<R>,
        webhook: WebhookVerification,
        requests_per_minute: u32,
    ) -> Self {
        use std::time::Duration;
        Self {
            state: Arc::new(AppState { service, webhook }),
            rate_limiter: Arc::new(RateLimiterState::new(
                requests_per_minute,
                Duration::from_secs(60),
            )),
        }
    }

    /// Builds the Axum router with all routes.
    ///
    /// Session auth and rate limiting wrap only the customer and admin routes;
    /// the webhook is authenticated by its signature instead.
    pub fn router(&self) -> Router {
        let protected = Router::new()
            .route("/api/checkout", post(handlers::create_checkout::<R>))
            .route(
                "/api/admin/reservations",
                get(handlers::list_reservations::<R>),
            )
            .route(
                "/api/admin/dead-letters",
                get(handlers::list_dead_letters::<R>),
            )
            .route_layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .route("/api/services", get(handlers::list_services::<R>))
            .route(
                "/api/webhook",
                post(handlers::receive_webhook::<R>).get(handlers::webhook_status),
            )
            .merge(protected)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
