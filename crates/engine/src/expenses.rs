//! Expense primitives.
//!
//! An `Expense` is a single recorded cost with a payer and a sharing policy.
//! The sharing policy is a tagged union (`Split`): either an equal split over
//! a plain list of sharers, or a weighted split whose entries carry
//! percentage basis points (`Percent`) or absolute minor units (`Exact`).
//! The settlement code resolves every variant to a uniform
//! `(participant, share)` list before netting, so nothing downstream branches
//! on the shape again.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, MoneyCents, ResultEngine, participants};

use super::expense_shares;

/// The stored tag naming how an expense is divided among its sharers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    Equal,
    Percent,
    Exact,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percent => "percent",
            Self::Exact => "exact",
        }
    }
}

impl TryFrom<&str> for SplitMode {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "percent" => Ok(Self::Percent),
            "exact" => Ok(Self::Exact),
            other => Err(EngineError::InvalidSplit(format!(
                "unrecognized split mode: {other}"
            ))),
        }
    }
}

/// Weight interpretation for a weighted split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightedMode {
    /// Weights are hundredths of a percent (10_000 = 100%).
    Percent,
    /// Weights are absolute minor units, used as-is.
    Exact,
}

/// One `(participant, weight)` entry of a weighted split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub name: String,
    pub weight: i64,
}

/// How an expense's cost is divided among sharers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Split {
    /// Every sharer owes an equal share of the amount.
    Equal { sharers: Vec<String> },
    /// Each entry carries its own weight; see [`WeightedMode`].
    Weighted {
        mode: WeightedMode,
        entries: Vec<SplitEntry>,
    },
}

impl Split {
    pub fn mode(&self) -> SplitMode {
        match self {
            Split::Equal { .. } => SplitMode::Equal,
            Split::Weighted {
                mode: WeightedMode::Percent,
                ..
            } => SplitMode::Percent,
            Split::Weighted {
                mode: WeightedMode::Exact,
                ..
            } => SplitMode::Exact,
        }
    }

    /// All participant names referenced by the split, in list order.
    pub fn sharer_names(&self) -> Vec<&str> {
        match self {
            Split::Equal { sharers } => sharers.iter().map(String::as_str).collect(),
            Split::Weighted { entries, .. } => {
                entries.iter().map(|entry| entry.name.as_str()).collect()
            }
        }
    }

    /// Returns the split with every referenced name normalized the same way
    /// roster names are.
    #[must_use]
    pub fn normalized(self) -> Split {
        match self {
            Split::Equal { sharers } => Split::Equal {
                sharers: sharers
                    .iter()
                    .map(|name| participants::normalize_name(name))
                    .collect(),
            },
            Split::Weighted { mode, entries } => Split::Weighted {
                mode,
                entries: entries
                    .into_iter()
                    .map(|entry| SplitEntry {
                        name: participants::normalize_name(&entry.name),
                        weight: entry.weight,
                    })
                    .collect(),
            },
        }
    }

    /// Shape validation applied at expense-creation time.
    ///
    /// Weighted weights are not required to sum to 100% or to the expense
    /// amount; the per-entry weight is the source of truth.
    pub fn validate(&self) -> ResultEngine<()> {
        match self {
            Split::Equal { sharers } => {
                if sharers.is_empty() {
                    return Err(EngineError::InvalidSplit(
                        "equal split needs at least one sharer".to_string(),
                    ));
                }
            }
            Split::Weighted { entries, .. } => {
                if entries.is_empty() {
                    return Err(EngineError::InvalidSplit(
                        "weighted split needs at least one entry".to_string(),
                    ));
                }
                if let Some(entry) = entries.iter().find(|entry| entry.weight < 0) {
                    return Err(EngineError::InvalidSplit(format!(
                        "negative weight for \"{}\"",
                        entry.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rebuilds a split from its stored tag and share rows (ordered by
    /// position).
    pub fn from_rows(mode: SplitMode, rows: &[expense_shares::Model]) -> ResultEngine<Split> {
        match mode {
            SplitMode::Equal => Ok(Split::Equal {
                sharers: rows
                    .iter()
                    .map(|row| row.participant_name.clone())
                    .collect(),
            }),
            SplitMode::Percent | SplitMode::Exact => {
                let entries = rows
                    .iter()
                    .map(|row| {
                        let weight = row.weight.ok_or_else(|| {
                            EngineError::InvalidSplit(format!(
                                "share row {} is missing its weight",
                                row.id
                            ))
                        })?;
                        Ok(SplitEntry {
                            name: row.participant_name.clone(),
                            weight,
                        })
                    })
                    .collect::<ResultEngine<Vec<_>>>()?;
                let mode = match mode {
                    SplitMode::Percent => WeightedMode::Percent,
                    _ => WeightedMode::Exact,
                };
                Ok(Split::Weighted { mode, entries })
            }
        }
    }
}

/// A single recorded cost within a trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub trip_id: String,
    pub title: String,
    pub amount: MoneyCents,
    pub currency: Currency,
    /// Payer by roster name. May dangle after a participant deletion.
    pub payer_name: String,
    /// Free-text label; not used by settlement.
    pub category: Option<String>,
    pub split: Split,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
}

impl Expense {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trip_id: String,
        title: String,
        amount: MoneyCents,
        currency: Currency,
        payer_name: String,
        category: Option<String>,
        split: Split,
        occurred_at: DateTime<Utc>,
        created_by: String,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let split = split.normalized();
        split.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            trip_id,
            title,
            amount,
            currency,
            payer_name: participants::normalize_name(&payer_name),
            category,
            split,
            occurred_at,
            created_by,
        })
    }

    /// Produces the share rows backing this expense's split, positioned in
    /// list order so an equal split's remainder distribution survives a
    /// round-trip through storage.
    pub fn share_models(&self) -> Vec<expense_shares::ActiveModel> {
        let rows: Vec<(&str, Option<i64>)> = match &self.split {
            Split::Equal { sharers } => {
                sharers.iter().map(|name| (name.as_str(), None)).collect()
            }
            Split::Weighted { entries, .. } => entries
                .iter()
                .map(|entry| (entry.name.as_str(), Some(entry.weight)))
                .collect(),
        };

        rows.into_iter()
            .enumerate()
            .map(|(position, (name, weight))| expense_shares::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                expense_id: ActiveValue::Set(self.id.to_string()),
                position: ActiveValue::Set(position as i32),
                participant_name: ActiveValue::Set(name.to_string()),
                weight: ActiveValue::Set(weight),
            })
            .collect()
    }

    /// Reassembles an expense from its row plus its share rows (ordered by
    /// position).
    pub fn from_models(
        model: Model,
        shares: Vec<expense_shares::Model>,
    ) -> ResultEngine<Self> {
        let mode = SplitMode::try_from(model.split_mode.as_str())?;
        let split = Split::from_rows(mode, &shares)?;

        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("expense not exists".to_string()))?,
            trip_id: model.trip_id,
            title: model.title,
            amount: MoneyCents::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            payer_name: model.payer_name,
            category: model.category,
            split,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_id: String,
    pub title: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payer_name: String,
    pub category: Option<String>,
    pub split_mode: String,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id"
    )]
    Trips,
    #[sea_orm(has_many = "super::expense_shares::Entity")]
    ExpenseShares,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl Related<super::expense_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseShares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            trip_id: ActiveValue::Set(expense.trip_id.clone()),
            title: ActiveValue::Set(expense.title.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            payer_name: ActiveValue::Set(expense.payer_name.clone()),
            category: ActiveValue::Set(expense.category.clone()),
            split_mode: ActiveValue::Set(expense.split.mode().as_str().to_string()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            created_by: ActiveValue::Set(expense.created_by.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_mode_tag_round_trips() {
        for mode in [SplitMode::Equal, SplitMode::Percent, SplitMode::Exact] {
            assert_eq!(SplitMode::try_from(mode.as_str()).unwrap(), mode);
        }
    }

    #[test]
    fn unrecognized_split_mode_fails_fast() {
        assert!(matches!(
            SplitMode::try_from("shares"),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn empty_splits_are_rejected() {
        assert!(
            Split::Equal {
                sharers: Vec::new()
            }
            .validate()
            .is_err()
        );
        assert!(
            Split::Weighted {
                mode: WeightedMode::Percent,
                entries: Vec::new()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn negative_weight_is_rejected() {
        let split = Split::Weighted {
            mode: WeightedMode::Exact,
            entries: vec![SplitEntry {
                name: "Bob".to_string(),
                weight: -10,
            }],
        };
        assert!(matches!(
            split.validate(),
            Err(EngineError::InvalidSplit(_))
        ));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let result = Expense::new(
            "trip".to_string(),
            "Dinner".to_string(),
            MoneyCents::ZERO,
            Currency::Eur,
            "Alice".to_string(),
            None,
            Split::Equal {
                sharers: vec!["Alice".to_string()],
            },
            chrono::Utc::now(),
            "alice".to_string(),
        );
        assert_eq!(
            result.unwrap_err(),
            EngineError::InvalidAmount("amount_minor must be > 0".to_string())
        );
    }
}
