pub mod event;
pub mod participant;
pub mod user;

pub use event::{CreateEvent, Event, EventStatus, UpdateEvent};
pub use participant::{ParticipantStatus, Participation, RegistrationOutcome};
pub use user::{LoginRequest, NewUser, PublicUser, RegisterUser, User};
