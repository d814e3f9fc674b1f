//! Expenses API endpoints

use api_types::expense::{
    ExpenseCreated, ExpenseDelete, ExpenseList, ExpenseListResponse, ExpenseNew, ExpenseUpdate,
    ExpenseView, SplitEntrySpec, SplitSpec,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{FixedOffset, Utc};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn to_engine_split(split: SplitSpec) -> engine::Split {
    fn entries(specs: Vec<SplitEntrySpec>) -> Vec<engine::SplitEntry> {
        specs
            .into_iter()
            .map(|spec| engine::SplitEntry {
                name: spec.name,
                weight: spec.weight,
            })
            .collect()
    }

    match split {
        SplitSpec::Equal { sharers } => engine::Split::Equal { sharers },
        SplitSpec::Percent { entries: specs } => engine::Split::Weighted {
            mode: engine::WeightedMode::Percent,
            entries: entries(specs),
        },
        SplitSpec::Exact { entries: specs } => engine::Split::Weighted {
            mode: engine::WeightedMode::Exact,
            entries: entries(specs),
        },
    }
}

fn to_api_split(split: engine::Split) -> SplitSpec {
    fn specs(entries: Vec<engine::SplitEntry>) -> Vec<SplitEntrySpec> {
        entries
            .into_iter()
            .map(|entry| SplitEntrySpec {
                name: entry.name,
                weight: entry.weight,
            })
            .collect()
    }

    match split {
        engine::Split::Equal { sharers } => SplitSpec::Equal { sharers },
        engine::Split::Weighted {
            mode: engine::WeightedMode::Percent,
            entries,
        } => SplitSpec::Percent {
            entries: specs(entries),
        },
        engine::Split::Weighted {
            mode: engine::WeightedMode::Exact,
            entries,
        } => SplitSpec::Exact {
            entries: specs(entries),
        },
    }
}

fn expense_view(expense: engine::Expense, utc: FixedOffset) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        title: expense.title,
        amount_minor: expense.amount.cents(),
        payer: expense.payer_name,
        category: expense.category,
        split: to_api_split(expense.split),
        occurred_at: expense.occurred_at.with_timezone(&utc),
        created_by: expense.created_by,
    }
}

fn utc_offset() -> Result<FixedOffset, ServerError> {
    FixedOffset::east_opt(0).ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))
}

pub async fn expense_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseCreated>, ServerError> {
    let id = state
        .engine
        .new_expense(
            &payload.trip_id,
            &payload.title,
            payload.amount_minor,
            &payload.payer,
            payload.category.as_deref(),
            to_engine_split(payload.split),
            payload.occurred_at.with_timezone(&Utc),
            &user.username,
        )
        .await?;

    Ok(Json(ExpenseCreated { id }))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseList>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(50);
    let filter = engine::ExpenseListFilter {
        from: payload.from.map(|dt| dt.with_timezone(&Utc)),
        to: payload.to.map(|dt| dt.with_timezone(&Utc)),
        payer: payload.payer,
    };

    let (items, next_cursor) = state
        .engine
        .list_expenses_page(
            &payload.trip_id,
            &user.username,
            limit,
            payload.cursor.as_deref(),
            &filter,
        )
        .await?;

    let utc = utc_offset()?;
    let expenses = items
        .into_iter()
        .map(|expense| expense_view(expense, utc))
        .collect();

    Ok(Json(ExpenseListResponse {
        expenses,
        next_cursor,
    }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_expense(
            &payload.trip_id,
            expense_id,
            &payload.title,
            payload.amount_minor,
            &payload.payer,
            payload.category.as_deref(),
            to_engine_split(payload.split),
            payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
            &user.username,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseDelete>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_expense(&payload.trip_id, expense_id, &user.username)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
