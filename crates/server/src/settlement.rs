//! Settlement API endpoint
//!
//! The result is computed fresh from the current roster and expense log on
//! every request; nothing is persisted. Amounts are raw minor units; the
//! consumer formats them.

use api_types::settlement::{NetPaymentView, SettlementGet, SettlementResponse};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState, user};

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementGet>,
) -> Result<Json<SettlementResponse>, ServerError> {
    let result = state
        .engine
        .settlement(&payload.trip_id, &user.username)
        .await?;

    Ok(Json(SettlementResponse {
        total_spent_minor: result.total_spent.cents(),
        payments: result
            .net_payments
            .into_iter()
            .map(|payment| NetPaymentView {
                from: payment.from,
                to: payment.to,
                amount_minor: payment.amount.cents(),
            })
            .collect(),
    }))
}
