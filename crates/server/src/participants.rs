//! Participants API endpoints

use api_types::participant::{
    ParticipantCreated, ParticipantNew, ParticipantView, ParticipantsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(trip_id): Path<String>,
) -> Result<Json<ParticipantsResponse>, ServerError> {
    let trip = state
        .engine
        .trip_snapshot(Some(&trip_id), None, &user.username)?;

    let participants = trip
        .roster()
        .into_iter()
        .map(|participant| ParticipantView {
            id: participant.id,
            name: participant.name,
        })
        .collect();

    Ok(Json(ParticipantsResponse { participants }))
}

pub async fn add(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(trip_id): Path<String>,
    Json(payload): Json<ParticipantNew>,
) -> Result<Json<ParticipantCreated>, ServerError> {
    let id = state
        .engine
        .add_participant(&trip_id, &payload.name, &user.username)
        .await?;

    Ok(Json(ParticipantCreated { id }))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path((trip_id, participant_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_participant(&trip_id, participant_id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
