use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{EngineError, ResultEngine, expense_shares, expenses, expenses::Expense};

use super::Engine;

/// Filters for listing expenses.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, only expenses paid by this (normalized) name.
    pub payer: Option<String>,
}

fn validate_list_filter(filter: &ExpenseListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExpensesCursor {
    occurred_at: DateTime<Utc>,
    expense_id: String,
}

impl ExpensesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid expenses cursor".to_string()))
    }
}

impl Engine {
    /// Lists a trip's most recent expenses (first page only).
    pub async fn list_expenses(
        &self,
        trip_id: &str,
        user_id: &str,
        limit: u64,
        filter: &ExpenseListFilter,
    ) -> ResultEngine<Vec<Expense>> {
        let (items, _next) = self
            .list_expenses_page(trip_id, user_id, limit, None, filter)
            .await?;
        Ok(items)
    }

    /// Lists a trip's expenses with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`; the
    /// returned cursor is opaque to callers.
    pub async fn list_expenses_page(
        &self,
        trip_id: &str,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &ExpenseListFilter,
    ) -> ResultEngine<(Vec<Expense>, Option<String>)> {
        self.require_trip(trip_id, user_id)?;
        validate_list_filter(filter)?;

        let limit_plus_one = limit.saturating_add(1);
        let mut query = expenses::Entity::find()
            .filter(expenses::Column::TripId.eq(trip_id.to_string()))
            .order_by_desc(expenses::Column::OccurredAt)
            .order_by_desc(expenses::Column::Id)
            .limit(limit_plus_one);

        if let Some(cursor) = cursor {
            let cursor = ExpensesCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(expenses::Column::OccurredAt.lt(cursor.occurred_at))
                    .add(
                        Condition::all()
                            .add(expenses::Column::OccurredAt.eq(cursor.occurred_at))
                            .add(expenses::Column::Id.lt(cursor.expense_id)),
                    ),
            );
        }
        if let Some(from) = filter.from {
            query = query.filter(expenses::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(expenses::Column::OccurredAt.lt(to));
        }
        if let Some(payer) = &filter.payer {
            query = query.filter(expenses::Column::PayerName.eq(payer.clone()));
        }

        let rows: Vec<expenses::Model> = query.all(&self.database).await?;
        let has_more = rows.len() > limit as usize;

        let mut out: Vec<Expense> = Vec::with_capacity(rows.len().min(limit as usize));
        for model in rows.into_iter().take(limit as usize) {
            let shares = expense_shares::Entity::find()
                .filter(expense_shares::Column::ExpenseId.eq(model.id.clone()))
                .order_by_asc(expense_shares::Column::Position)
                .all(&self.database)
                .await?;
            out.push(Expense::from_models(model, shares)?);
        }

        let next_cursor = out.last().map(|expense| ExpensesCursor {
            occurred_at: expense.occurred_at,
            expense_id: expense.id.to_string(),
        });
        let next_cursor = if has_more {
            next_cursor.map(|c| c.encode()).transpose()?
        } else {
            None
        };

        Ok((out, next_cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = ExpensesCursor {
            occurred_at: Utc::now(),
            expense_id: "abc".to_string(),
        };
        let encoded = cursor.encode().unwrap();
        let decoded = ExpensesCursor::decode(&encoded).unwrap();
        assert_eq!(decoded.expense_id, cursor.expense_id);
        assert_eq!(decoded.occurred_at, cursor.occurred_at);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            ExpensesCursor::decode("not a cursor"),
            Err(EngineError::InvalidCursor(_))
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let now = Utc::now();
        let filter = ExpenseListFilter {
            from: Some(now),
            to: Some(now),
            payer: None,
        };
        assert!(validate_list_filter(&filter).is_err());
    }
}
