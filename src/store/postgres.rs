use async_trait::async_trait;
use sqlx::PgPool;

use crate::config::RegistrationPolicy;
use crate::models::{
    CreateEvent, Event, NewUser, Participation, PublicUser, RegistrationOutcome, UpdateEvent,
    User,
};
use crate::store::{EventStore, UserStore};
use crate::utils::error::AppError;

const EVENT_COLUMNS: &str =
    "id, title, description, date, time, location, image_url, created_by, status";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, name, email, password_hash",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Email already exists".to_string()),
            other => other,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events"))
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn list_events_by_owner(&self, owner_id: i32) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE created_by = $1"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_registered_events(&self, user_id: i32) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT e.id, e.title, e.description, e.date, e.time, e.location, e.image_url, \
                    e.created_by, e.status \
             FROM event_participants ep \
             JOIN events e ON ep.event_id = e.id \
             WHERE ep.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn find_event(&self, event_id: i32) -> Result<Option<Event>, AppError> {
        let event =
            sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(event)
    }

    async fn find_owned_event(
        &self,
        event_id: i32,
        owner_id: i32,
    ) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND created_by = $2"
        ))
        .bind(event_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn create_event(&self, owner_id: i32, event: &CreateEvent) -> Result<Event, AppError> {
        let created = sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events (title, description, date, time, location, image_url, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.location)
        .bind(&event.image_url)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_owned_event(
        &self,
        event_id: i32,
        owner_id: i32,
        update: &UpdateEvent,
    ) -> Result<Option<Event>, AppError> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET title = $1, description = $2, date = $3, time = $4, \
                    location = $5, image_url = $6, status = $7 \
             WHERE id = $8 AND created_by = $9 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.date)
        .bind(update.time)
        .bind(&update.location)
        .bind(&update.image_url)
        .bind(update.status)
        .bind(event_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_owned_event(&self, event_id: i32, owner_id: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND created_by = $2")
            .bind(event_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn register_participant(
        &self,
        event_id: i32,
        user_id: i32,
        policy: RegistrationPolicy,
    ) -> Result<RegistrationOutcome, AppError> {
        const RETURNING: &str = "RETURNING id, event_id, user_id, registration_date, status";

        let participation = if policy.allows_duplicates() {
            sqlx::query_as::<_, Participation>(&format!(
                "INSERT INTO event_participants (event_id, user_id) VALUES ($1, $2) {RETURNING}"
            ))
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
        } else {
            // The lock serializes registrations for the same (event, user) pair
            // until commit, so the NOT EXISTS below sees any row a concurrent
            // caller inserted.
            let mut tx = self.pool.begin().await?;
            sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
                .bind(event_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;

            let row = sqlx::query_as::<_, Participation>(&format!(
                "INSERT INTO event_participants (event_id, user_id) \
                 SELECT $1, $2 WHERE NOT EXISTS ( \
                     SELECT 1 FROM event_participants \
                     WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled' \
                 ) {RETURNING}"
            ))
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

            tx.commit().await?;
            row
        };

        Ok(match participation {
            Some(row) => RegistrationOutcome::Registered(row),
            None => RegistrationOutcome::AlreadyRegistered,
        })
    }

    async fn list_participants(&self, event_id: i32) -> Result<Vec<PublicUser>, AppError> {
        let users = sqlx::query_as::<_, PublicUser>(
            "SELECT users.id, users.name, users.email \
             FROM event_participants \
             JOIN users ON event_participants.user_id = users.id \
             WHERE event_participants.event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

// These run against a real server: `DATABASE_URL=postgres://... cargo test -- --ignored`.
// `sqlx::test` creates a scratch database per test and applies `migrations/`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventStatus;
    use chrono::{NaiveDate, NaiveTime};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn meetup() -> CreateEvent {
        CreateEvent {
            title: "Meetup".into(),
            description: Some("Monthly meetup".into()),
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            location: Some("Hall A".into()),
            image_url: None,
        }
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_duplicate_email_is_conflict(pool: PgPool) {
        let store = PgStore::new(pool);
        let first = store.create_user(new_user("a@example.com")).await.unwrap();

        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == "Email already exists"));

        let found = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_create_returns_server_defaults(pool: PgPool) {
        let store = PgStore::new(pool);
        let created = store.create_event(7, &meetup()).await.unwrap();

        assert_eq!(created.created_by, 7);
        assert_eq!(created.status, EventStatus::Upcoming);
        assert_eq!(store.find_event(created.id).await.unwrap(), Some(created.clone()));
        assert_eq!(store.list_events_by_owner(7).await.unwrap(), vec![created]);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_update_is_scoped_to_owner(pool: PgPool) {
        let store = PgStore::new(pool);
        let event = store.create_event(1, &meetup()).await.unwrap();
        let update = UpdateEvent {
            title: "Renamed".into(),
            description: None,
            date: event.date,
            time: event.time,
            location: None,
            image_url: None,
            status: EventStatus::Cancelled,
        };

        assert!(store.update_owned_event(event.id, 2, &update).await.unwrap().is_none());
        assert_eq!(store.find_event(event.id).await.unwrap(), Some(event.clone()));

        let updated = store.update_owned_event(event.id, 1, &update).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.status, EventStatus::Cancelled);
        assert_eq!(updated.description, None);
        assert_eq!(updated.created_by, 1);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_delete_leaves_participations(pool: PgPool) {
        let store = PgStore::new(pool);
        let owner = store.create_user(new_user("owner@example.com")).await.unwrap();
        let guest = store.create_user(new_user("guest@example.com")).await.unwrap();
        let event = store.create_event(owner.id, &meetup()).await.unwrap();

        store
            .register_participant(event.id, guest.id, RegistrationPolicy::AllowDuplicates)
            .await
            .unwrap();
        assert_eq!(store.list_registered_events(guest.id).await.unwrap().len(), 1);

        assert_eq!(store.delete_owned_event(event.id, guest.id).await.unwrap(), 0);
        assert_eq!(store.delete_owned_event(event.id, owner.id).await.unwrap(), 1);

        assert!(store.list_registered_events(guest.id).await.unwrap().is_empty());
        assert_eq!(
            store.list_participants(event.id).await.unwrap(),
            vec![PublicUser::from(guest)]
        );
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_participants_join_exposes_public_fields(pool: PgPool) {
        let store = PgStore::new(pool);
        let owner = store.create_user(new_user("owner@example.com")).await.unwrap();
        let guest = store.create_user(new_user("guest@example.com")).await.unwrap();
        let event = store.create_event(owner.id, &meetup()).await.unwrap();

        for _ in 0..2 {
            store
                .register_participant(event.id, guest.id, RegistrationPolicy::AllowDuplicates)
                .await
                .unwrap();
        }

        let participants = store.list_participants(event.id).await.unwrap();
        assert_eq!(participants, vec![PublicUser::from(guest.clone()); 2]);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_concurrent_registrations_insert_once(pool: PgPool) {
        let store = PgStore::new(pool);

        for policy in [RegistrationPolicy::Idempotent, RegistrationPolicy::Reject] {
            let event_id = match policy {
                RegistrationPolicy::Idempotent => 10,
                _ => 20,
            };
            let (a, b) = tokio::join!(
                store.register_participant(event_id, 3, policy),
                store.register_participant(event_id, 3, policy),
            );

            let registered = [a.unwrap(), b.unwrap()]
                .iter()
                .filter(|outcome| matches!(outcome, RegistrationOutcome::Registered(_)))
                .count();
            assert_eq!(registered, 1, "{policy:?}");
        }

        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_participants WHERE user_id = 3",
        )
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert_eq!(rows, 2);
    }
}
