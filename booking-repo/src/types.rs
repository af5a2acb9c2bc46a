//! Database row structs shared by the SQLite and PostgreSQL adapters.
//!
//! Identifiers are stored as TEXT in both backends. Timestamps decode to
//! `DateTime<Utc>` from SQLite TEXT and from PostgreSQL TIMESTAMPTZ alike.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use booking_types::{
    DeadLetter, RepoError, Reservation, ReservationDetails, ReservationId, Service, User,
};

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(e.to_string())
}

/// Service row from database.
#[derive(FromRow)]
pub struct DbService {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub duration: i32,
}

impl DbService {
    pub fn into_domain(self) -> Service {
        Service {
            id: self.id.into(),
            name: self.name,
            price: self.price,
            duration: self.duration,
        }
    }
}

/// User row from database.
#[derive(FromRow)]
pub struct DbUser {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
}

impl DbUser {
    pub fn into_domain(self) -> Result<User, RepoError> {
        let role = self.role.parse()?;
        Ok(User::new(self.id, self.name, self.email).with_role(role))
    }
}

/// A session joined with its user.
#[derive(FromRow)]
pub struct DbSessionUser {
    pub expires_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub user: DbUser,
}

/// Reservation row from database.
#[derive(FromRow)]
pub struct DbReservation {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DbReservation {
    pub fn into_domain(self) -> Result<Reservation, RepoError> {
        let id: ReservationId = self.id.parse().map_err(db_err)?;
        let status = self.status.parse()?;

        Ok(Reservation::from_parts(
            id,
            self.user_id.into(),
            self.service_id.into(),
            self.start_time,
            self.end_time,
            status,
            self.stripe_session_id,
            self.created_at,
        ))
    }
}

/// Reservation joined with user and service for the admin listing.
#[derive(FromRow)]
pub struct DbReservationDetails {
    #[sqlx(flatten)]
    pub reservation: DbReservation,
    pub user_name: Option<String>,
    pub user_email: String,
    pub user_role: String,
    pub service_name: String,
    pub service_price: i64,
    pub service_duration: i32,
}

impl DbReservationDetails {
    pub fn into_domain(self) -> Result<ReservationDetails, RepoError> {
        let reservation = self.reservation.into_domain()?;
        let user = DbUser {
            id: reservation.user_id.to_string(),
            name: self.user_name,
            email: self.user_email,
            role: self.user_role,
        }
        .into_domain()?;
        let service = DbService {
            id: reservation.service_id.to_string(),
            name: self.service_name,
            price: self.service_price,
            duration: self.service_duration,
        }
        .into_domain();

        Ok(ReservationDetails {
            reservation,
            user,
            service,
        })
    }
}

/// Dead letter row from database.
#[derive(FromRow)]
pub struct DbDeadLetter {
    pub id: String,
    pub event_id: String,
    pub event_type: String,
    pub stage: String,
    pub error: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl DbDeadLetter {
    pub fn into_domain(self) -> Result<DeadLetter, RepoError> {
        Ok(DeadLetter {
            id: uuid::Uuid::parse_str(&self.id).map_err(db_err)?,
            event_id: self.event_id,
            event_type: self.event_type,
            stage: self.stage.parse()?,
            error: self.error,
            payload: serde_json::from_str(&self.payload).map_err(db_err)?,
            created_at: self.created_at,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared column lists
// ─────────────────────────────────────────────────────────────────────────────

pub const RESERVATION_COLUMNS: &str =
    "id, user_id, service_id, start_time, end_time, status, stripe_session_id, created_at";

pub const RESERVATION_DETAILS_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.service_id, r.start_time, r.end_time, r.status,
           r.stripe_session_id, r.created_at,
           u.name AS user_name, u.email AS user_email, u.role AS user_role,
           s.name AS service_name, s.price AS service_price, s.duration AS service_duration
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    JOIN services s ON s.id = r.service_id
    ORDER BY r.created_at DESC
"#;
