//! Trips API endpoints

use api_types::trip::{TripCreated, TripGet, TripNew, TripView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState, user};

fn to_engine_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Eur => engine::Currency::Eur,
    }
}

fn to_api_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
    }
}

pub async fn trip_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TripNew>,
) -> Result<Json<TripCreated>, ServerError> {
    let currency = payload.currency.map(to_engine_currency);
    let id = state
        .engine
        .new_trip(&payload.name, &user.username, currency)
        .await?;

    Ok(Json(TripCreated { id }))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TripGet>,
) -> Result<Json<TripView>, ServerError> {
    let trip = state
        .engine
        .trip_snapshot(payload.id.as_deref(), payload.name, &user.username)?;

    Ok(Json(TripView {
        id: trip.id,
        name: trip.name,
        currency: to_api_currency(trip.currency),
    }))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_trip(&trip_id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
