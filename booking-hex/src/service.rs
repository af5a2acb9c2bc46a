//! Booking Application Service
//!
//! Orchestrates checkout creation and payment confirmation through the
//! repository, checkout and notifier ports.
//! Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use tracing::{error, info, warn};

use booking_types::{
    AppError, BookingMetadata, BookingRepository, CheckoutRequest, CheckoutResponse,
    CheckoutGateway, CheckoutSessionObject, CheckoutSessionRequest, Currency, DeadLetter,
    DomainError, FailureStage, GatewayError, Money, Notification, Notifier, ProviderEvent,
    Reservation, ReservationInsert, ReservationView, Service, ServiceCatalog, ServiceId, User,
};

/// Header (and plain-text fallback) of the booking confirmation message.
pub const CONFIRMATION_HEADER: &str = "🎉 New Reservation Confirmed!";

/// Process-wide booking settings.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    /// Currency of catalog prices and hosted checkouts
    pub currency: Currency,
    /// Offset anchoring customer wall-clock times and formatting notification dates
    pub booking_offset: FixedOffset,
    /// Origin the customer is sent back to after checkout
    pub public_base_url: String,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            currency: Currency::JPY,
            booking_offset: Utc.fix(),
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// What happened to the confirmation message of a new reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    /// No notifier configured
    Skipped,
    Failed(String),
}

/// Result of processing one parsed provider event.
///
/// Every variant is acknowledged to the provider with `{received: true}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a completed checkout
    Ignored { event_type: String },
    /// Completed checkout without usable booking metadata
    Dropped { reason: String },
    /// The session already produced a reservation
    Duplicate { session_id: String },
    Confirmed {
        reservation: Reservation,
        notification: NotificationStatus,
    },
    /// A downstream step failed; the event was dead-lettered
    Failed { stage: FailureStage, error: String },
}

impl WebhookOutcome {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored { .. } => "ignored",
            WebhookOutcome::Dropped { .. } => "dropped",
            WebhookOutcome::Duplicate { .. } => "duplicate",
            WebhookOutcome::Confirmed { .. } => "confirmed",
            WebhookOutcome::Failed { .. } => "failed",
        }
    }
}

/// Application service for bookings.
///
/// Generic over `R: BookingRepository` - the adapter is injected at compile time.
/// The checkout provider and the notifier are optional and injected at runtime;
/// without them checkout answers 503 and confirmations are not announced.
pub struct BookingService<R: BookingRepository> {
    repo: R,
    catalog: ServiceCatalog,
    checkout: Option<Arc<dyn CheckoutGateway>>,
    notifier: Option<Arc<dyn Notifier>>,
    settings: BookingSettings,
}

impl<R: BookingRepository> BookingService<R> {
    /// Creates a new booking service with the given repository and catalog.
    pub fn new(repo: R, catalog: ServiceCatalog, settings: BookingSettings) -> Self {
        Self {
            repo,
            catalog,
            checkout: None,
            notifier: None,
            settings,
        }
    }

    pub fn with_checkout(mut self, checkout: Arc<dyn CheckoutGateway>) -> Self {
        self.checkout = Some(checkout);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists stored services, or the catalog when storage has none.
    pub async fn list_services(&self) -> Result<Vec<Service>, AppError> {
        let stored = self.repo.list_services().await?;
        if !stored.is_empty() {
            return Ok(stored);
        }
        Ok(self.catalog.services().cloned().collect())
    }

    /// Upserts every catalog service; returns how many were written.
    pub async fn seed_catalog(&self) -> Result<usize, AppError> {
        for service in self.catalog.services() {
            self.repo.upsert_service(service).await?;
        }
        Ok(self.catalog.len())
    }

    /// Storage first, then the catalog.
    async fn resolve_service(&self, id: &ServiceId) -> Result<Option<Service>, AppError> {
        if let Some(service) = self.repo.get_service(id).await? {
            return Ok(Some(service));
        }
        Ok(self.catalog.get(id).cloned())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Checkout
    // ─────────────────────────────────────────────────────────────────────────────

    /// Starts a hosted checkout for `user`. Nothing is persisted locally.
    #[tracing::instrument(skip(self, user, req), fields(user_id = %user.id))]
    pub async fn create_checkout(
        &self,
        user: &User,
        req: CheckoutRequest,
    ) -> Result<CheckoutResponse, AppError> {
        let (service_id, date, time) = req
            .required_fields()
            .ok_or_else(|| AppError::BadRequest("Missing required fields".into()))?;

        let start = booking_start(date, time, self.settings.booking_offset)?;

        let service = self
            .resolve_service(&ServiceId::from(service_id))
            .await?
            .ok_or_else(|| AppError::NotFound("Service not found".into()))?;

        let checkout = self.checkout.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Payment provider is not configured".into())
        })?;

        let base = self.settings.public_base_url.trim_end_matches('/');
        let metadata = BookingMetadata {
            user_id: user.id.clone(),
            service_id: service.id.clone(),
            reservation_date: start,
            service_duration: service.duration.into(),
        };
        let request = CheckoutSessionRequest {
            service,
            currency: self.settings.currency,
            description: format!("{} {}", date, time),
            success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", base),
            cancel_url: format!("{}/book", base),
            metadata,
        };

        let session = checkout
            .create_session(request)
            .await
            .map_err(|e| match e {
                GatewayError::NotConfigured => AppError::ServiceUnavailable(e.to_string()),
                GatewayError::Provider(msg) => {
                    error!(error = %msg, "checkout session creation failed");
                    AppError::BadGateway(msg)
                }
            })?;

        info!(session_id = %session.id, start = %start, "checkout session created");

        Ok(CheckoutResponse {
            session_id: session.id,
            url: session.url,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment events
    // ─────────────────────────────────────────────────────────────────────────────

    /// Materializes a confirmed reservation from a completed checkout event.
    ///
    /// Never fails: downstream errors become a `Failed` outcome (or a failed
    /// notification status) and are written to the dead-letter log.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_payment_event(&self, event: ProviderEvent) -> WebhookOutcome {
        if !event.is_checkout_completed() {
            info!("ignoring unhandled event type");
            return WebhookOutcome::Ignored {
                event_type: event.event_type,
            };
        }

        let session = match event.checkout_session() {
            Ok(session) => session,
            Err(e) => {
                let reason = format!("malformed checkout session: {}", e);
                warn!(%reason, "dropping event");
                return WebhookOutcome::Dropped { reason };
            }
        };

        let metadata = match BookingMetadata::from_metadata(&session.metadata) {
            Ok(metadata) => metadata,
            Err(e) => {
                let reason = e.to_string();
                warn!(session_id = %session.id, %reason, "dropping event without booking metadata");
                return WebhookOutcome::Dropped { reason };
            }
        };

        // Built first so a dropped event leaves nothing behind in storage
        let reservation = match Reservation::confirmed(
            metadata.user_id,
            metadata.service_id,
            metadata.reservation_date,
            metadata.service_duration,
            session.id.clone(),
        ) {
            Ok(reservation) => reservation,
            Err(e) => {
                let reason = e.to_string();
                warn!(session_id = %session.id, %reason, "dropping event with unusable booking window");
                return WebhookOutcome::Dropped { reason };
            }
        };

        let service = match self.ensure_service(&reservation.service_id).await {
            Ok(service) => service,
            Err((stage, error)) => return self.fail(&event, stage, error).await,
        };

        let reservation = match self.repo.create_reservation(reservation).await {
            Ok(ReservationInsert::Created(reservation)) => reservation,
            Ok(ReservationInsert::AlreadyRecorded(existing)) => {
                info!(session_id = %session.id, reservation_id = %existing.id, "duplicate delivery, reservation already recorded");
                return WebhookOutcome::Duplicate {
                    session_id: session.id,
                };
            }
            Err(e) => {
                return self
                    .fail(&event, FailureStage::InsertReservation, e.to_string())
                    .await;
            }
        };

        info!(
            reservation_id = %reservation.id,
            user_id = %reservation.user_id,
            service_id = %reservation.service_id,
            start = %reservation.start_time,
            "reservation confirmed"
        );

        let notification = self
            .notify_confirmed(&reservation, service.as_ref(), &session)
            .await;
        if let NotificationStatus::Failed(error) = &notification {
            self.dead_letter(&event, FailureStage::Notify, error.clone())
                .await;
        }

        WebhookOutcome::Confirmed {
            reservation,
            notification,
        }
    }

    /// Makes sure the service row exists before the reservation insert.
    ///
    /// Returns `None` when the id is unknown to both storage and catalog; the
    /// insert is still attempted so the store reports the broken reference.
    async fn ensure_service(
        &self,
        id: &ServiceId,
    ) -> Result<Option<Service>, (FailureStage, String)> {
        let stored = self
            .repo
            .get_service(id)
            .await
            .map_err(|e| (FailureStage::Lookup, e.to_string()))?;
        if stored.is_some() {
            return Ok(stored);
        }

        let Some(service) = self.catalog.get(id) else {
            warn!(service_id = %id, "service unknown to storage and catalog");
            return Ok(None);
        };

        self.repo
            .upsert_service(service)
            .await
            .map_err(|e| (FailureStage::MaterializeService, e.to_string()))?;
        info!(service_id = %id, "materialized service from catalog");

        Ok(Some(service.clone()))
    }

    async fn notify_confirmed(
        &self,
        reservation: &Reservation,
        service: Option<&Service>,
        session: &CheckoutSessionObject,
    ) -> NotificationStatus {
        let Some(notifier) = &self.notifier else {
            return NotificationStatus::Skipped;
        };

        let notification = match self.build_confirmation(reservation, service, session).await {
            Ok(notification) => notification,
            Err(e) => return NotificationStatus::Failed(e),
        };

        match notifier.send(&notification).await {
            Ok(()) => {
                info!(reservation_id = %reservation.id, "confirmation notification sent");
                NotificationStatus::Sent
            }
            Err(e) => NotificationStatus::Failed(e.to_string()),
        }
    }

    async fn build_confirmation(
        &self,
        reservation: &Reservation,
        service: Option<&Service>,
        session: &CheckoutSessionObject,
    ) -> Result<Notification, String> {
        let user = self
            .repo
            .get_user(&reservation.user_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("user {} not found", reservation.user_id))?;

        let service_name = service
            .map(|s| s.name.clone())
            .unwrap_or_else(|| reservation.service_id.to_string());

        // Amount actually paid, falling back to the list price
        let amount = session
            .amount_total
            .or(service.map(|s| s.price))
            .unwrap_or_default();
        let amount = paid_amount(amount, session.currency.as_deref(), self.settings.currency)?;

        Ok(confirmation_notification(
            &user,
            &service_name,
            reservation.start_time,
            amount,
            self.settings.booking_offset,
        ))
    }

    async fn fail(&self, event: &ProviderEvent, stage: FailureStage, error: String) -> WebhookOutcome {
        self.dead_letter(event, stage, error.clone()).await;
        WebhookOutcome::Failed { stage, error }
    }

    async fn dead_letter(&self, event: &ProviderEvent, stage: FailureStage, error: String) {
        error!(%stage, %error, "payment event processing failed");

        let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        let letter = DeadLetter::new(&event.id, &event.event_type, stage, error, payload);
        if let Err(e) = self.repo.record_dead_letter(&letter).await {
            error!(error = %e, dead_letter_id = %letter.id, "failed to record dead letter");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists all reservations, newest first.
    pub async fn list_reservations(&self) -> Result<Vec<ReservationView>, AppError> {
        let details = self.repo.list_reservations().await?;
        Ok(details.into_iter().map(ReservationView::from).collect())
    }

    /// Lists dead-lettered events, newest first.
    pub async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, AppError> {
        if limit <= 0 {
            return Err(AppError::BadRequest("limit must be positive".into()));
        }
        self.repo.list_dead_letters(limit).await.map_err(Into::into)
    }
}

/// Anchors a customer's `YYYY-MM-DD` + `HH:MM` in the booking offset.
pub fn booking_start(
    date: &str,
    time: &str,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, DomainError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| DomainError::InvalidDate(date.to_string()))?;
    let clock = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| DomainError::InvalidTime(time.to_string()))?;

    offset
        .from_local_datetime(&day.and_time(clock))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| DomainError::InvalidDate(format!("{} {}", date, time)))
}

/// Renders the paid amount in the session's currency.
///
/// Currencies without local formatting rules are shown as raw minor units
/// followed by the ISO code, e.g. `123456 INR`.
fn paid_amount(amount: i64, currency: Option<&str>, fallback: Currency) -> Result<String, String> {
    let currency = match currency.map(str::trim).filter(|c| !c.is_empty()) {
        None => fallback,
        Some(code) => match code.parse::<Currency>() {
            Ok(currency) => currency,
            Err(_) => return Ok(format!("{} {}", amount, code.to_ascii_uppercase())),
        },
    };
    Money::new(amount, currency)
        .map(|money| money.to_string())
        .map_err(|e: DomainError| e.to_string())
}

/// Builds the chat message announcing a confirmed reservation.
pub fn confirmation_notification(
    user: &User,
    service_name: &str,
    start: DateTime<Utc>,
    amount: impl std::fmt::Display,
    offset: FixedOffset,
) -> Notification {
    let date = start.with_timezone(&offset).format("%Y/%m/%d %H:%M");

    Notification::new(CONFIRMATION_HEADER)
        .field(
            "Customer",
            format!("{} ({})", user.display_name(), user.email),
        )
        .field("Service", service_name)
        .field("Date", date.to_string())
        .field("Amount", amount.to_string())
}
