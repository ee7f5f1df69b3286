use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "participant_status", rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Registered,
    Cancelled,
    Attended,
}

/// A user's registration for an event.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participation {
    pub id: i32,
    pub event_id: i32,
    pub user_id: i32,
    pub registration_date: DateTime<Utc>,
    pub status: ParticipantStatus,
}

#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Registered(Participation),
    /// An active participation already existed and nothing was inserted.
    AlreadyRegistered,
}
