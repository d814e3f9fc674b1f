//! The `Trip` holds the participant roster of one shared outing. The user
//! can own multiple trips.

use sea_orm::{ActiveValue, prelude::*};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    Currency, ResultEngine, error::EngineError, participants, participants::Participant,
};

/// A named collection of participants and expenses, owned by one user.
///
/// Expenses are not cached here; they live in storage and are read as a
/// snapshot per computation.
#[derive(Clone, Debug)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub participants: HashMap<Uuid, Participant>,
    pub user_id: String,
    pub currency: Currency,
}

impl Trip {
    pub fn new(name: String, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            participants: HashMap::new(),
            user_id: user_id.to_string(),
            currency: Currency::Eur,
        }
    }

    /// Adds a participant with a unique (case-sensitive, NFC-normalized)
    /// name, returning the id and the row to persist.
    pub fn add_participant(
        &mut self,
        name: &str,
    ) -> ResultEngine<(Uuid, participants::ActiveModel)> {
        let participant = Participant::new(name)?;
        if self
            .participants
            .values()
            .any(|existing| existing.name == participant.name)
        {
            return Err(EngineError::ExistingKey(participant.name));
        }

        let mut model: participants::ActiveModel = (&participant).into();
        model.trip_id = ActiveValue::Set(self.id.clone());
        let id = participant.id;
        self.participants.insert(id, participant);

        Ok((id, model))
    }

    /// Removes a participant from the roster, returning the row to delete.
    ///
    /// Stored expenses referencing the name are left as they are; the
    /// settlement computation treats the stale references as inert.
    pub fn remove_participant(
        &mut self,
        participant_id: &Uuid,
    ) -> ResultEngine<participants::ActiveModel> {
        match self.participants.remove(participant_id) {
            Some(participant) => {
                let mut model: participants::ActiveModel = (&participant).into();
                model.trip_id = ActiveValue::Set(self.id.clone());
                Ok(model)
            }
            None => Err(EngineError::KeyNotFound(participant_id.to_string())),
        }
    }

    /// Returns `true` if `name` (already normalized) is on the roster.
    pub fn has_participant(&self, name: &str) -> bool {
        self.participants
            .values()
            .any(|participant| participant.name == name)
    }

    /// The roster sorted by name.
    ///
    /// Names are unique per trip, so this order is total and stable; the
    /// settlement computation uses it to make repeated runs byte-identical.
    pub fn roster(&self) -> Vec<Participant> {
        let mut roster: Vec<Participant> = self.participants.values().cloned().collect();
        roster.sort_by(|a, b| a.name.cmp(&b.name));
        roster
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Trip> for ActiveModel {
    fn from(value: &Trip) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_with_two() -> (Uuid, Trip) {
        let mut trip = Trip::new(String::from("Weekend"), "foo");
        let (alice_id, _) = trip.add_participant("Alice").unwrap();
        trip.add_participant("Bob").unwrap();
        (alice_id, trip)
    }

    #[test]
    fn add_participants() {
        let (_, trip) = trip_with_two();
        assert_eq!(trip.participants.len(), 2);
        assert!(trip.has_participant("Alice"));
        assert!(trip.has_participant("Bob"));
    }

    #[test]
    #[should_panic(expected = "ExistingKey(\"Alice\")")]
    fn fail_add_duplicate_name() {
        let (_, mut trip) = trip_with_two();
        trip.add_participant("Alice").unwrap();
    }

    #[test]
    #[should_panic(expected = "ExistingKey(\"Alice\")")]
    fn fail_add_duplicate_after_normalization() {
        let (_, mut trip) = trip_with_two();
        trip.add_participant("  Alice ").unwrap();
    }

    #[test]
    fn remove_participant() {
        let (alice_id, mut trip) = trip_with_two();
        trip.remove_participant(&alice_id).unwrap();
        assert!(!trip.has_participant("Alice"));
        assert_eq!(trip.participants.len(), 1);
    }

    #[test]
    #[should_panic(expected = "KeyNotFound")]
    fn fail_remove_unknown_participant() {
        let (_, mut trip) = trip_with_two();
        trip.remove_participant(&Uuid::new_v4()).unwrap();
    }

    #[test]
    fn roster_is_sorted_by_name() {
        let mut trip = Trip::new(String::from("Weekend"), "foo");
        trip.add_participant("Carol").unwrap();
        trip.add_participant("Alice").unwrap();
        trip.add_participant("Bob").unwrap();

        let names: Vec<String> = trip.roster().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }
}
