use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::RegistrationPolicy;
use crate::models::{
    CreateEvent, Event, EventStatus, NewUser, ParticipantStatus, Participation, PublicUser,
    RegistrationOutcome, UpdateEvent, User,
};
use crate::store::{EventStore, UserStore};
use crate::utils::error::AppError;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    events: BTreeMap<i32, Event>,
    participants: Vec<Participation>,
    next_user_id: i32,
    next_event_id: i32,
    next_participation_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// In-process store with the same observable rules as the Postgres schema:
/// unique emails, generated ids, no foreign keys and no cascade on delete.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let id = next_id(&mut tables.next_user_id);
        let stored = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
        };
        tables.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.events.values().cloned().collect())
    }

    async fn list_events_by_owner(&self, owner_id: i32) -> Result<Vec<Event>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .values()
            .filter(|e| e.created_by == owner_id)
            .cloned()
            .collect())
    }

    async fn list_registered_events(&self, user_id: i32) -> Result<Vec<Event>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| tables.events.get(&p.event_id).cloned())
            .collect())
    }

    async fn find_event(&self, event_id: i32) -> Result<Option<Event>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.events.get(&event_id).cloned())
    }

    async fn find_owned_event(
        &self,
        event_id: i32,
        owner_id: i32,
    ) -> Result<Option<Event>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .get(&event_id)
            .filter(|e| e.created_by == owner_id)
            .cloned())
    }

    async fn create_event(&self, owner_id: i32, event: &CreateEvent) -> Result<Event, AppError> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_event_id);
        let stored = Event {
            id,
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date,
            time: event.time,
            location: event.location.clone(),
            image_url: event.image_url.clone(),
            created_by: owner_id,
            status: EventStatus::default(),
        };
        tables.events.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_owned_event(
        &self,
        event_id: i32,
        owner_id: i32,
        update: &UpdateEvent,
    ) -> Result<Option<Event>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables
            .events
            .get_mut(&event_id)
            .filter(|e| e.created_by == owner_id)
        else {
            return Ok(None);
        };

        event.title = update.title.clone();
        event.description = update.description.clone();
        event.date = update.date;
        event.time = update.time;
        event.location = update.location.clone();
        event.image_url = update.image_url.clone();
        event.status = update.status;
        Ok(Some(event.clone()))
    }

    async fn delete_owned_event(&self, event_id: i32, owner_id: i32) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .events
            .get(&event_id)
            .is_some_and(|e| e.created_by == owner_id);
        if owned {
            tables.events.remove(&event_id);
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn register_participant(
        &self,
        event_id: i32,
        user_id: i32,
        policy: RegistrationPolicy,
    ) -> Result<RegistrationOutcome, AppError> {
        let mut tables = self.tables.write().await;
        if !policy.allows_duplicates() {
            let active = tables.participants.iter().any(|p| {
                p.event_id == event_id
                    && p.user_id == user_id
                    && p.status != ParticipantStatus::Cancelled
            });
            if active {
                return Ok(RegistrationOutcome::AlreadyRegistered);
            }
        }

        let participation = Participation {
            id: next_id(&mut tables.next_participation_id),
            event_id,
            user_id,
            registration_date: Utc::now(),
            status: ParticipantStatus::default(),
        };
        tables.participants.push(participation.clone());
        Ok(RegistrationOutcome::Registered(participation))
    }

    async fn list_participants(&self, event_id: i32) -> Result<Vec<PublicUser>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .iter()
            .filter(|p| p.event_id == event_id)
            .filter_map(|p| tables.users.get(&p.user_id).cloned().map(PublicUser::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "someone".into(),
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    fn meetup() -> CreateEvent {
        CreateEvent {
            title: "Meetup".into(),
            description: None,
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            location: Some("Hall A".into()),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_and_keeps_first_row() {
        let store = MemoryStore::new();
        let first = store.create_user(new_user("a@example.com")).await.unwrap();

        let err = store.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let found = store.find_user_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_delete_does_not_cascade_to_participations() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("o@example.com")).await.unwrap();
        let guest = store.create_user(new_user("g@example.com")).await.unwrap();
        let event = store.create_event(owner.id, &meetup()).await.unwrap();

        store
            .register_participant(event.id, guest.id, RegistrationPolicy::AllowDuplicates)
            .await
            .unwrap();
        assert_eq!(store.delete_owned_event(event.id, owner.id).await.unwrap(), 1);
        assert_eq!(store.delete_owned_event(event.id, owner.id).await.unwrap(), 0);

        // The join drops the dangling row but the participation itself remains.
        assert!(store.list_registered_events(guest.id).await.unwrap().is_empty());
        assert_eq!(store.list_participants(event.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_registration_policies() {
        let store = MemoryStore::new();

        for _ in 0..2 {
            let outcome = store
                .register_participant(1, 2, RegistrationPolicy::AllowDuplicates)
                .await
                .unwrap();
            assert!(matches!(outcome, RegistrationOutcome::Registered(_)));
        }

        let outcome = store
            .register_participant(1, 2, RegistrationPolicy::Idempotent)
            .await
            .unwrap();
        assert!(matches!(outcome, RegistrationOutcome::AlreadyRegistered));

        let outcome = store
            .register_participant(5, 2, RegistrationPolicy::Reject)
            .await
            .unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Registered(_)));
    }

    #[tokio::test]
    async fn test_update_requires_matching_owner() {
        let store = MemoryStore::new();
        let event = store.create_event(1, &meetup()).await.unwrap();
        let update = UpdateEvent {
            title: "Renamed".into(),
            description: None,
            date: event.date,
            time: event.time,
            location: None,
            image_url: None,
            status: EventStatus::Completed,
        };

        assert!(store.update_owned_event(event.id, 2, &update).await.unwrap().is_none());
        assert_eq!(store.find_event(event.id).await.unwrap().unwrap(), event);

        let updated = store.update_owned_event(event.id, 1, &update).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.location, None);
        assert_eq!(updated.created_by, 1);
    }
}
