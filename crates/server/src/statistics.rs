//! Trip statistics endpoint

use api_types::stats::{TripStatistic, TripStatsGet};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState, user};

fn to_api_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
    }
}

pub async fn get_stats(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TripStatsGet>,
) -> Result<Json<TripStatistic>, ServerError> {
    let (currency, total_spent_minor, expense_count) = state
        .engine
        .trip_statistics(&payload.trip_id, &user.username)
        .await?;

    Ok(Json(TripStatistic {
        currency: to_api_currency(currency),
        total_spent_minor,
        expense_count,
    }))
}
