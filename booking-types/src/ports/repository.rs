//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait.

use chrono::{DateTime, Utc};

use crate::domain::{
    DeadLetter, Reservation, ReservationDetails, ReservationInsert, Service, ServiceId, User,
    UserId,
};
use crate::error::RepoError;

/// The persistence gateway for reservations and their reference data.
///
/// The webhook sequence (service upsert, reservation insert) is deliberately
/// made of independent calls; only the reservation insert is keyed for
/// idempotency, by its checkout session id.
#[async_trait::async_trait]
pub trait BookingRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a service by id.
    async fn get_service(&self, id: &ServiceId) -> Result<Option<Service>, RepoError>;

    /// Lists stored services ordered by id.
    async fn list_services(&self) -> Result<Vec<Service>, RepoError>;

    /// Inserts the service, or overwrites name/price/duration if it exists.
    async fn upsert_service(&self, service: &Service) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Users & sessions (written by the auth provider; exposed for seeding/tests)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a user by id.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepoError>;

    /// Inserts or updates a user.
    async fn upsert_user(&self, user: &User) -> Result<(), RepoError>;

    /// Issues a session for the user and returns the raw token (only shown once).
    async fn create_session(
        &self,
        user_id: &UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, RepoError>;

    /// Resolves the user owning an unexpired session with the given token hash.
    async fn find_session_user(&self, token_hash: &str) -> Result<Option<User>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Reservations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts a reservation unless one already exists for its checkout session.
    async fn create_reservation(
        &self,
        reservation: Reservation,
    ) -> Result<ReservationInsert, RepoError>;

    /// Finds the reservation paid by a checkout session.
    async fn find_reservation_by_session(
        &self,
        stripe_session_id: &str,
    ) -> Result<Option<Reservation>, RepoError>;

    /// Lists all reservations with customer and service, newest first.
    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Dead letters
    // ─────────────────────────────────────────────────────────────────────────────

    /// Records an event whose processing failed after acknowledgement.
    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), RepoError>;

    /// Lists dead letters, newest first.
    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, RepoError>;
}
