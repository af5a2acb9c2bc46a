//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use booking_types::{
        BookingRepository, DeadLetter, FailureStage, Reservation, ReservationInsert,
        ReservationStatus, Role, Service, ServiceCatalog, ServiceId, User, UserId,
    };

    use crate::SqliteRepo;
    use crate::security::hash_session_token;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    async fn seed_customer(repo: &SqliteRepo) -> User {
        let user = User::new("u1", Some("Hanako".to_string()), "hanako@example.com");
        repo.upsert_user(&user).await.unwrap();
        repo.upsert_service(ServiceCatalog::default().get(&"cut".into()).unwrap())
            .await
            .unwrap();
        user
    }

    fn reservation(session_id: &str) -> Reservation {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 5, 0, 0).unwrap();
        Reservation::confirmed("u1".into(), "cut".into(), start, 60, session_id.to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_service_overwrites_existing() {
        let repo = setup_repo().await;

        repo.upsert_service(&Service::new("spa", "Old Spa", 1000, 30).unwrap())
            .await
            .unwrap();
        repo.upsert_service(&Service::new("spa", "Head Spa", 4000, 45).unwrap())
            .await
            .unwrap();

        let fetched = repo.get_service(&"spa".into()).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Head Spa");
        assert_eq!(fetched.price, 4000);
        assert_eq!(fetched.duration, 45);
        assert_eq!(repo.list_services().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_service_not_found() {
        let repo = setup_repo().await;

        let result = repo.get_service(&ServiceId::new("nope")).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_user_roundtrip_keeps_role() {
        let repo = setup_repo().await;
        let admin = User::new("a1", None, "owner@example.com").with_role(Role::Admin);

        repo.upsert_user(&admin).await.unwrap();

        let fetched = repo.get_user(&UserId::new("a1")).await.unwrap().unwrap();
        assert!(fetched.is_admin());
        assert_eq!(fetched.name, None);
    }

    #[tokio::test]
    async fn test_session_lookup_by_token_hash() {
        let repo = setup_repo().await;
        let user = seed_customer(&repo).await;

        let token = repo
            .create_session(&user.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let found = repo
            .find_session_user(&hash_session_token(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);

        // The raw token is never stored
        assert!(repo.find_session_user(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let repo = setup_repo().await;
        let user = seed_customer(&repo).await;

        let token = repo
            .create_session(&user.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let found = repo
            .find_session_user(&hash_session_token(&token))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_create_reservation_is_idempotent_per_session() {
        let repo = setup_repo().await;
        seed_customer(&repo).await;

        let first = repo.create_reservation(reservation("cs_1")).await.unwrap();
        let ReservationInsert::Created(created) = first else {
            panic!("expected a new reservation");
        };
        assert_eq!(created.status, ReservationStatus::Confirmed);

        let second = repo.create_reservation(reservation("cs_1")).await.unwrap();
        let ReservationInsert::AlreadyRecorded(existing) = second else {
            panic!("expected the existing reservation");
        };
        assert_eq!(existing.id, created.id);
        assert_eq!(repo.list_reservations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reservation_requires_existing_service() {
        let repo = setup_repo().await;
        seed_customer(&repo).await;

        let start = Utc.with_ymd_and_hms(2024, 6, 1, 5, 0, 0).unwrap();
        let orphan =
            Reservation::confirmed("u1".into(), "spa".into(), start, 45, "cs_2").unwrap();

        assert!(repo.create_reservation(orphan).await.is_err());
    }

    #[tokio::test]
    async fn test_find_reservation_by_session() {
        let repo = setup_repo().await;
        seed_customer(&repo).await;
        repo.create_reservation(reservation("cs_3")).await.unwrap();

        let found = repo
            .find_reservation_by_session("cs_3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.duration_minutes(), 60);
        assert_eq!(found.stripe_session_id.as_deref(), Some("cs_3"));

        assert!(
            repo.find_reservation_by_session("cs_missing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_list_reservations_joins_user_and_service() {
        let repo = setup_repo().await;
        seed_customer(&repo).await;
        repo.create_reservation(reservation("cs_a")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.create_reservation(reservation("cs_b")).await.unwrap();

        let listed = repo.list_reservations().await.unwrap();

        assert_eq!(listed.len(), 2);
        // Newest first
        assert_eq!(
            listed[0].reservation.stripe_session_id.as_deref(),
            Some("cs_b")
        );
        assert_eq!(listed[0].user.email, "hanako@example.com");
        assert_eq!(listed[0].service.name, "Hair Cut");
    }

    #[tokio::test]
    async fn test_dead_letters_roundtrip() {
        let repo = setup_repo().await;
        let payload = json!({"id": "evt_1", "type": "checkout.session.completed"});
        let letter = DeadLetter::new(
            "evt_1",
            "checkout.session.completed",
            FailureStage::InsertReservation,
            "database is locked",
            payload.clone(),
        );

        repo.record_dead_letter(&letter).await.unwrap();

        let listed = repo.list_dead_letters(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, letter.id);
        assert_eq!(listed[0].stage, FailureStage::InsertReservation);
        assert_eq!(listed[0].payload, payload);
        assert!(repo.list_dead_letters(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("data/booking.db").display());

        let repo = SqliteRepo::new(&url).await.unwrap();
        seed_customer(&repo).await;
        drop(repo);

        // Migrations are re-applied on open without touching existing rows
        let reopened = SqliteRepo::new(&url).await.unwrap();
        let services = reopened.list_services().await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].id.as_str(), "cut");
    }
}
