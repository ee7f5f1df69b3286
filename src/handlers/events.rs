use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::auth::AuthUser;
use crate::config::RegistrationPolicy;
use crate::models::{CreateEvent, Event, RegistrationOutcome, UpdateEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::{empty_success, success, with_event};

/// Ownership gate: a fresh read of the event, filtered by owner.
/// A missing event and someone else's event are indistinguishable.
async fn require_owner(
    state: &AppState,
    event_id: i32,
    user_id: i32,
    action: &str,
) -> Result<Event, AppError> {
    state
        .events
        .find_owned_event(event_id, user_id)
        .await?
        .ok_or_else(|| AppError::Forbidden(format!("You are not authorized to {action} this event")))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list_events().await?;
    Ok(success(events))
}

pub async fn my_events(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Response, AppError> {
    let events = state.events.list_events_by_owner(claims.id).await?;
    Ok(success(events))
}

pub async fn my_registrations(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Response, AppError> {
    let events = state.events.list_registered_events(claims.id).await?;
    Ok(success(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i32>,
) -> Result<Response, AppError> {
    let event = state
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(success(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(input): ApiJson<CreateEvent>,
) -> Result<Response, AppError> {
    let event = state.events.create_event(claims.id, &input).await?;

    tracing::info!(event_id = event.id, owner = claims.id, "Event created");
    Ok(with_event(StatusCode::CREATED, "Event created successfully", event))
}

pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiPath(event_id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateEvent>,
) -> Result<Response, AppError> {
    // The owner predicate lives in the UPDATE itself, so there is no window
    // between the check and the write.
    let event = state
        .events
        .update_owned_event(event_id, claims.id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("You are not authorized to update this event".to_string())
        })?;

    tracing::info!(event_id, owner = claims.id, status = ?event.status, "Event updated");
    Ok(with_event(StatusCode::OK, "Event updated successfully", event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiPath(event_id): ApiPath<i32>,
) -> Result<Response, AppError> {
    require_owner(&state, event_id, claims.id, "delete").await?;

    // Zero rows here means a concurrent delete won; the outcome is the same.
    let removed = state.events.delete_owned_event(event_id, claims.id).await?;

    tracing::info!(event_id, owner = claims.id, removed, "Event deleted");
    Ok(empty_success("Event deleted successfully"))
}

pub async fn register_for_event(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiPath(event_id): ApiPath<i32>,
) -> Result<Response, AppError> {
    let policy = state.registration_policy;
    let outcome = state
        .events
        .register_participant(event_id, claims.id, policy)
        .await?;

    match (outcome, policy) {
        (RegistrationOutcome::Registered(participation), _) => {
            tracing::info!(
                event_id,
                user_id = claims.id,
                participation_id = participation.id,
                "Registered for event"
            );
            Ok((StatusCode::OK, "Registered for event successfully").into_response())
        }
        (RegistrationOutcome::AlreadyRegistered, RegistrationPolicy::Reject) => Err(
            AppError::Conflict("Already registered for this event".to_string()),
        ),
        (RegistrationOutcome::AlreadyRegistered, _) => {
            Ok((StatusCode::OK, "Already registered for event").into_response())
        }
    }
}

pub async fn list_participants(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiPath(event_id): ApiPath<i32>,
) -> Result<Response, AppError> {
    require_owner(&state, event_id, claims.id, "view participants of").await?;

    let participants = state.events.list_participants(event_id).await?;
    Ok(success(participants))
}
