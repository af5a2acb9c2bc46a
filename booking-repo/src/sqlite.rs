//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use booking_types::{
    BookingRepository, DeadLetter, RepoError, Reservation, ReservationDetails, ReservationInsert,
    Service, ServiceId, User, UserId,
};

use crate::security::{generate_session_token, hash_session_token};
use crate::types::{
    DbDeadLetter, DbReservation, DbReservationDetails, DbService, DbSessionUser, DbUser,
    RESERVATION_COLUMNS, RESERVATION_DETAILS_SELECT,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

const MIGRATIONS: [(&str, &str); 2] = [
    ("0001", include_str!("../migrations/0001_create_tables.sql")),
    ("0002", include_str!("../migrations/0002_create_dead_letters.sql")),
];

/// Runs all database migrations, one statement at a time.
async fn run_migrations(pool: &SqlitePool) -> Result<(), anyhow::Error> {
    for (name, sql) in MIGRATIONS {
        for statement in sql.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt)
                    .execute(pool)
                    .await
                    .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
            }
        }
    }
    Ok(())
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BookingRepository for SqliteRepo {
    async fn get_service(&self, id: &ServiceId) -> Result<Option<Service>, RepoError> {
        let row: Option<DbService> =
            sqlx::query_as(r#"SELECT id, name, price, duration FROM services WHERE id = ?"#)
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(DbService::into_domain))
    }

    async fn list_services(&self) -> Result<Vec<Service>, RepoError> {
        let rows: Vec<DbService> =
            sqlx::query_as(r#"SELECT id, name, price, duration FROM services ORDER BY id"#)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(rows.into_iter().map(DbService::into_domain).collect())
    }

    async fn upsert_service(&self, service: &Service) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO services (id, name, price, duration) VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name, price = excluded.price, duration = excluded.duration"#,
        )
        .bind(service.id.as_str())
        .bind(&service.name)
        .bind(service.price)
        .bind(service.duration)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> =
            sqlx::query_as(r#"SELECT id, name, email, role FROM users WHERE id = ?"#)
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn upsert_user(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO users (id, name, email, role) VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email, role = excluded.role"#,
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_ref())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn create_session(
        &self,
        user_id: &UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, RepoError> {
        let token = generate_session_token();

        sqlx::query(r#"INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)"#)
            .bind(hash_session_token(&token))
            .bind(user_id.as_str())
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(token)
    }

    async fn find_session_user(&self, token_hash: &str) -> Result<Option<User>, RepoError> {
        let row: Option<DbSessionUser> = sqlx::query_as(
            r#"SELECT s.expires_at, u.id, u.name, u.email, u.role
               FROM sessions s JOIN users u ON u.id = s.user_id
               WHERE s.token_hash = ?"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) if row.expires_at > Utc::now() => row.user.into_domain().map(Some),
            _ => Ok(None),
        }
    }

    async fn create_reservation(
        &self,
        reservation: Reservation,
    ) -> Result<ReservationInsert, RepoError> {
        let result = sqlx::query(
            r#"INSERT INTO reservations (id, user_id, service_id, start_time, end_time, status, stripe_session_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(stripe_session_id) DO NOTHING"#,
        )
        .bind(reservation.id.to_string())
        .bind(reservation.user_id.as_str())
        .bind(reservation.service_id.as_str())
        .bind(reservation.start_time)
        .bind(reservation.end_time)
        .bind(reservation.status.as_ref())
        .bind(&reservation.stripe_session_id)
        .bind(reservation.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 1 {
            return Ok(ReservationInsert::Created(reservation));
        }

        let session_id = reservation
            .stripe_session_id
            .as_deref()
            .ok_or_else(|| RepoError::Conflict("reservation id already exists".into()))?;
        let existing = self
            .find_reservation_by_session(session_id)
            .await?
            .ok_or(RepoError::NotFound)?;

        Ok(ReservationInsert::AlreadyRecorded(existing))
    }

    async fn find_reservation_by_session(
        &self,
        stripe_session_id: &str,
    ) -> Result<Option<Reservation>, RepoError> {
        let sql = format!(
            "SELECT {} FROM reservations WHERE stripe_session_id = ?",
            RESERVATION_COLUMNS
        );
        let row: Option<DbReservation> = sqlx::query_as(&sql)
            .bind(stripe_session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(DbReservation::into_domain).transpose()
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>, RepoError> {
        let rows: Vec<DbReservationDetails> = sqlx::query_as(RESERVATION_DETAILS_SELECT)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(DbReservationDetails::into_domain)
            .collect()
    }

    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO dead_letters (id, event_id, event_type, stage, error, payload, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(letter.id.to_string())
        .bind(&letter.event_id)
        .bind(&letter.event_type)
        .bind(letter.stage.as_ref())
        .bind(&letter.error)
        .bind(letter.payload.to_string())
        .bind(letter.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, RepoError> {
        let rows: Vec<DbDeadLetter> = sqlx::query_as(
            r#"SELECT id, event_id, event_type, stage, error, payload, created_at
               FROM dead_letters ORDER BY created_at DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbDeadLetter::into_domain).collect()
    }
}
