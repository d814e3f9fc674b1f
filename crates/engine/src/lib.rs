use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use uuid::Uuid;

pub use currency::Currency;
pub use error::EngineError;
pub use expenses::{Expense, Split, SplitEntry, SplitMode, WeightedMode};
pub use list::ExpenseListFilter;
pub use money::MoneyCents;
pub use participants::Participant;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*};
pub use settlement::{
    NetPayment, SETTLEMENT_EPSILON_MINOR, SettlementResult, compute_settlement,
};
pub use trips::Trip;

mod currency;
mod error;
mod expense_shares;
mod expenses;
mod list;
mod money;
mod participants;
mod settlement;
mod trips;

pub(crate) type ResultEngine<T> = Result<T, EngineError>;

/// Stateful facade over trips, rosters and expenses.
///
/// Rosters are cached in memory and kept in step with storage on every
/// mutation; expenses live in storage only and are read as a snapshot per
/// computation, so concurrent settlement calls need no coordination.
#[derive(Debug)]
pub struct Engine {
    trips: RwLock<HashMap<String, Trip>>,
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn read_trips(&self) -> RwLockReadGuard<'_, HashMap<String, Trip>> {
        self.trips.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_trips(&self) -> RwLockWriteGuard<'_, HashMap<String, Trip>> {
        self.trips.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ownership check; unknown trips and foreign trips are indistinguishable
    /// to the caller.
    fn require_trip(&self, trip_id: &str, user_id: &str) -> ResultEngine<()> {
        let trips = self.read_trips();
        match trips.get(trip_id) {
            Some(trip) if trip.user_id == user_id => Ok(()),
            _ => Err(EngineError::KeyNotFound("trip not exists".to_string())),
        }
    }

    /// Returns a snapshot of a user trip, by id or name.
    pub fn trip_snapshot(
        &self,
        trip_id: Option<&str>,
        trip_name: Option<String>,
        user_id: &str,
    ) -> ResultEngine<Trip> {
        if trip_id.is_none() && trip_name.is_none() {
            return Err(EngineError::KeyNotFound(
                "missing trip id or name".to_string(),
            ));
        }

        let trips = self.read_trips();
        let trip = match (trip_id, trip_name) {
            (Some(id), _) => trips.get(id).filter(|trip| trip.user_id == user_id),
            (None, Some(name)) => trips
                .values()
                .find(|trip| trip.name == name && trip.user_id == user_id),
            (None, None) => None,
        };

        trip.cloned()
            .ok_or_else(|| EngineError::KeyNotFound("trip not exists".to_string()))
    }

    /// Add a new trip.
    pub async fn new_trip(
        &self,
        name: &str,
        user_id: &str,
        currency: Option<Currency>,
    ) -> ResultEngine<String> {
        let mut new_trip = Trip::new(name.to_string(), user_id);
        new_trip.currency = currency.unwrap_or_default();
        let new_trip_id = new_trip.id.clone();
        let trip_model: trips::ActiveModel = (&new_trip).into();

        trip_model.insert(&self.database).await?;
        self.write_trips().insert(new_trip_id.clone(), new_trip);
        Ok(new_trip_id)
    }

    /// Delete a trip together with its roster, expenses and share rows.
    pub async fn delete_trip(&self, trip_id: &str, user_id: &str) -> ResultEngine<()> {
        self.require_trip(trip_id, user_id)?;

        let db_tx = self.database.begin().await?;
        let expense_ids: Vec<String> = expenses::Entity::find()
            .filter(expenses::Column::TripId.eq(trip_id.to_string()))
            .all(&db_tx)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        if !expense_ids.is_empty() {
            expense_shares::Entity::delete_many()
                .filter(expense_shares::Column::ExpenseId.is_in(expense_ids))
                .exec(&db_tx)
                .await?;
        }
        expenses::Entity::delete_many()
            .filter(expenses::Column::TripId.eq(trip_id.to_string()))
            .exec(&db_tx)
            .await?;
        participants::Entity::delete_many()
            .filter(participants::Column::TripId.eq(trip_id.to_string()))
            .exec(&db_tx)
            .await?;
        trips::Entity::delete_by_id(trip_id.to_string())
            .exec(&db_tx)
            .await?;
        db_tx.commit().await?;

        self.write_trips().remove(trip_id);
        Ok(())
    }

    /// Add a participant to a trip's roster.
    pub async fn add_participant(
        &self,
        trip_id: &str,
        name: &str,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let (id, model) = {
            let mut trips = self.write_trips();
            let trip = match trips.get_mut(trip_id) {
                Some(trip) if trip.user_id == user_id => trip,
                _ => return Err(EngineError::KeyNotFound("trip not exists".to_string())),
            };
            trip.add_participant(name)?
        };

        if let Err(err) = model.insert(&self.database).await {
            // Roll the roster back so memory and storage stay in step.
            if let Some(trip) = self.write_trips().get_mut(trip_id) {
                trip.participants.remove(&id);
            }
            return Err(err.into());
        }
        Ok(id)
    }

    /// Remove a participant from a trip's roster.
    ///
    /// Stored expenses are left untouched: their amounts keep counting toward
    /// the trip total, while their debt contribution ends here.
    pub async fn remove_participant(
        &self,
        trip_id: &str,
        participant_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        let model = {
            let mut trips = self.write_trips();
            let trip = match trips.get_mut(trip_id) {
                Some(trip) if trip.user_id == user_id => trip,
                _ => return Err(EngineError::KeyNotFound("trip not exists".to_string())),
            };
            trip.remove_participant(&participant_id)?
        };

        model.delete(&self.database).await?;
        Ok(())
    }

    /// Log a new expense.
    ///
    /// The payer and every sharer must be on the roster *now*; references only
    /// go stale through later participant deletion.
    #[allow(clippy::too_many_arguments)]
    pub async fn new_expense(
        &self,
        trip_id: &str,
        title: &str,
        amount_minor: i64,
        payer_name: &str,
        category: Option<&str>,
        split: Split,
        occurred_at: DateTime<Utc>,
        user_id: &str,
    ) -> ResultEngine<Uuid> {
        let expense = {
            let trips = self.read_trips();
            let trip = trips
                .get(trip_id)
                .filter(|trip| trip.user_id == user_id)
                .ok_or_else(|| EngineError::KeyNotFound("trip not exists".to_string()))?;

            let expense = Expense::new(
                trip_id.to_string(),
                title.to_string(),
                MoneyCents::new(amount_minor),
                trip.currency,
                payer_name.to_string(),
                category.map(str::to_string),
                split,
                occurred_at,
                user_id.to_string(),
            )?;
            if !trip.has_participant(&expense.payer_name) {
                return Err(EngineError::KeyNotFound(format!(
                    "payer \"{}\" is not a participant",
                    expense.payer_name
                )));
            }
            for name in expense.split.sharer_names() {
                if !trip.has_participant(name) {
                    return Err(EngineError::KeyNotFound(format!(
                        "sharer \"{name}\" is not a participant"
                    )));
                }
            }
            expense
        };

        let db_tx = self.database.begin().await?;
        expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
        for share in expense.share_models() {
            share.insert(&db_tx).await?;
        }
        db_tx.commit().await?;

        Ok(expense.id)
    }

    /// Return a single expense with its split.
    pub async fn expense(
        &self,
        trip_id: &str,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Expense> {
        self.require_trip(trip_id, user_id)?;

        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.database)
            .await?
            .filter(|model| model.trip_id == trip_id)
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        let shares = expense_shares::Entity::find()
            .filter(expense_shares::Column::ExpenseId.eq(model.id.clone()))
            .order_by_asc(expense_shares::Column::Position)
            .all(&self.database)
            .await?;

        Expense::from_models(model, shares)
    }

    /// Replaces an expense wholesale: title, amount, payer, category, split.
    ///
    /// A split cannot be patched field-by-field without desyncing the stored
    /// weights from the amount, so updates always carry the full new shape.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_expense(
        &self,
        trip_id: &str,
        expense_id: Uuid,
        title: &str,
        amount_minor: i64,
        payer_name: &str,
        category: Option<&str>,
        split: Split,
        occurred_at: Option<DateTime<Utc>>,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.require_trip(trip_id, user_id)?;

        let db_tx = self.database.begin().await?;
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&db_tx)
            .await?
            .filter(|model| model.trip_id == trip_id)
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

        let mut replacement = {
            let trips = self.read_trips();
            let trip = trips
                .get(trip_id)
                .filter(|trip| trip.user_id == user_id)
                .ok_or_else(|| EngineError::KeyNotFound("trip not exists".to_string()))?;

            let replacement = Expense::new(
                trip_id.to_string(),
                title.to_string(),
                MoneyCents::new(amount_minor),
                trip.currency,
                payer_name.to_string(),
                category.map(str::to_string),
                split,
                occurred_at.unwrap_or(model.occurred_at),
                model.created_by.clone(),
            )?;
            if !trip.has_participant(&replacement.payer_name) {
                return Err(EngineError::KeyNotFound(format!(
                    "payer \"{}\" is not a participant",
                    replacement.payer_name
                )));
            }
            for name in replacement.split.sharer_names() {
                if !trip.has_participant(name) {
                    return Err(EngineError::KeyNotFound(format!(
                        "sharer \"{name}\" is not a participant"
                    )));
                }
            }
            replacement
        };
        replacement.id = expense_id;

        let update = expenses::ActiveModel {
            id: ActiveValue::Set(model.id.clone()),
            title: ActiveValue::Set(replacement.title.clone()),
            amount_minor: ActiveValue::Set(replacement.amount.cents()),
            payer_name: ActiveValue::Set(replacement.payer_name.clone()),
            category: ActiveValue::Set(replacement.category.clone()),
            split_mode: ActiveValue::Set(replacement.split.mode().as_str().to_string()),
            occurred_at: ActiveValue::Set(replacement.occurred_at),
            ..Default::default()
        };
        update.update(&db_tx).await?;

        expense_shares::Entity::delete_many()
            .filter(expense_shares::Column::ExpenseId.eq(model.id))
            .exec(&db_tx)
            .await?;
        for share in replacement.share_models() {
            share.insert(&db_tx).await?;
        }
        db_tx.commit().await?;

        Ok(())
    }

    /// Delete an expense and its share rows.
    pub async fn delete_expense(
        &self,
        trip_id: &str,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.require_trip(trip_id, user_id)?;

        let db_tx = self.database.begin().await?;
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&db_tx)
            .await?
            .filter(|model| model.trip_id == trip_id)
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

        expense_shares::Entity::delete_many()
            .filter(expense_shares::Column::ExpenseId.eq(model.id.clone()))
            .exec(&db_tx)
            .await?;
        expenses::Entity::delete_by_id(model.id).exec(&db_tx).await?;
        db_tx.commit().await?;

        Ok(())
    }

    /// Computes the settlement for one trip: who owes whom, after netting.
    ///
    /// Works on a snapshot (the roster sorted by name plus the expense log
    /// as stored right now) and never persists the result.
    pub async fn settlement(
        &self,
        trip_id: &str,
        user_id: &str,
    ) -> ResultEngine<SettlementResult> {
        let roster = {
            let trips = self.read_trips();
            let trip = trips
                .get(trip_id)
                .filter(|trip| trip.user_id == user_id)
                .ok_or_else(|| EngineError::KeyNotFound("trip not exists".to_string()))?;
            trip.roster()
        };

        let models = expenses::Entity::find()
            .filter(expenses::Column::TripId.eq(trip_id.to_string()))
            .order_by_asc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::Id)
            .all(&self.database)
            .await?;

        let mut trip_expenses = Vec::with_capacity(models.len());
        for model in models {
            let shares = expense_shares::Entity::find()
                .filter(expense_shares::Column::ExpenseId.eq(model.id.clone()))
                .order_by_asc(expense_shares::Column::Position)
                .all(&self.database)
                .await?;
            trip_expenses.push(Expense::from_models(model, shares)?);
        }

        compute_settlement(&roster, &trip_expenses)
    }

    /// Returns trip totals: `(currency, total_spent_minor, expense_count)`.
    ///
    /// The total covers every logged expense, including those whose payer has
    /// since left the roster.
    pub async fn trip_statistics(
        &self,
        trip_id: &str,
        user_id: &str,
    ) -> ResultEngine<(Currency, i64, i64)> {
        let currency = {
            let trips = self.read_trips();
            let trip = trips
                .get(trip_id)
                .filter(|trip| trip.user_id == user_id)
                .ok_or_else(|| EngineError::KeyNotFound("trip not exists".to_string()))?;
            trip.currency
        };

        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS total, COUNT(*) AS count \
             FROM expenses \
             WHERE trip_id = ?",
            vec![trip_id.into()],
        );
        let row = self.database.query_one(stmt).await?;
        let total: i64 = row
            .as_ref()
            .and_then(|r| r.try_get("", "total").ok())
            .unwrap_or(0);
        let count: i64 = row
            .as_ref()
            .and_then(|r| r.try_get("", "count").ok())
            .unwrap_or(0);

        Ok((currency, total, count))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`, loading every trip and its roster from storage.
    pub async fn build(self) -> ResultEngine<Engine> {
        let mut trips_map = HashMap::new();

        let trip_models: Vec<trips::Model> = trips::Entity::find().all(&self.database).await?;
        for trip_model in trip_models {
            let currency = Currency::try_from(trip_model.currency.as_str()).unwrap_or_default();

            let participant_models: Vec<participants::Model> = participants::Entity::find()
                .filter(participants::Column::TripId.eq(trip_model.id.clone()))
                .all(&self.database)
                .await?;
            let mut roster = HashMap::new();
            for participant_model in participant_models {
                let participant = Participant::try_from(participant_model)?;
                roster.insert(participant.id, participant);
            }

            trips_map.insert(
                trip_model.id.clone(),
                Trip {
                    id: trip_model.id,
                    name: trip_model.name,
                    participants: roster,
                    user_id: trip_model.user_id,
                    currency,
                },
            );
        }

        Ok(Engine {
            trips: RwLock::new(trips_map),
            database: self.database,
        })
    }
}
