//! Persistence seam.
//!
//! Handlers talk to the credential and event tables only through these
//! traits. [`PgStore`] is the production backend; [`MemoryStore`] keeps the
//! same contract in process for tests and database-less development.
//!
//! Every method is a single statement against the store, except the
//! non-duplicate registration policies, which run in one short transaction.

use async_trait::async_trait;

use crate::config::RegistrationPolicy;
use crate::models::{
    CreateEvent, Event, NewUser, PublicUser, RegistrationOutcome, UpdateEvent, User,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`AppError::Conflict`] (answered as 400) when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>, AppError>;

    async fn list_events_by_owner(&self, owner_id: i32) -> Result<Vec<Event>, AppError>;

    /// Events joined through the caller's participations, one entry per row.
    async fn list_registered_events(&self, user_id: i32) -> Result<Vec<Event>, AppError>;

    async fn find_event(&self, event_id: i32) -> Result<Option<Event>, AppError>;

    /// `None` when the event is missing or owned by someone else.
    async fn find_owned_event(&self, event_id: i32, owner_id: i32)
        -> Result<Option<Event>, AppError>;

    /// Inserts and returns the stored row, server defaults included.
    async fn create_event(&self, owner_id: i32, event: &CreateEvent) -> Result<Event, AppError>;

    /// Replaces all mutable columns where both id and owner match.
    /// `None` when nothing matched.
    async fn update_owned_event(
        &self,
        event_id: i32,
        owner_id: i32,
        update: &UpdateEvent,
    ) -> Result<Option<Event>, AppError>;

    /// Returns the number of rows removed. Participations are left in place.
    async fn delete_owned_event(&self, event_id: i32, owner_id: i32) -> Result<u64, AppError>;

    /// Event existence is not checked.
    ///
    /// Unless `policy` allows duplicates, concurrent calls for the same
    /// `(event_id, user_id)` are serialized: at most one of them returns
    /// [`RegistrationOutcome::Registered`] while an active row exists.
    async fn register_participant(
        &self,
        event_id: i32,
        user_id: i32,
        policy: RegistrationPolicy,
    ) -> Result<RegistrationOutcome, AppError>;

    async fn list_participants(&self, event_id: i32) -> Result<Vec<PublicUser>, AppError>;
}
