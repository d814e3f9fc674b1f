//! Trip participants.
//!
//! A participant is a named party who can pay for or share in expenses
//! within one trip. Participants are *not* users: a trip owner logs expenses
//! on behalf of everyone on the roster.
//!
//! Deleting a participant never rewrites stored expenses. Expense rows keep
//! whatever name they were created with; the settlement computation excludes
//! names that are no longer on the roster.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::EngineError;

/// NFC-normalizes and trims a participant name.
///
/// Uniqueness within a trip is case-sensitive but must not depend on the
/// byte-level encoding of visually identical input, so every name entering
/// the engine passes through here first.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().nfc().collect()
}

/// A named party within one trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
}

impl Participant {
    /// Creates a participant with a fresh id and a normalized name.
    pub fn new(name: &str) -> Result<Self, EngineError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(EngineError::InvalidName(
                "participant name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_id: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trips::Entity",
        from = "Column::TripId",
        to = "super::trips::Column::Id"
    )]
    Trips,
}

impl Related<super::trips::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Participant> for ActiveModel {
    fn from(participant: &Participant) -> Self {
        Self {
            id: ActiveValue::Set(participant.id.to_string()),
            // The owning trip sets this before insertion.
            trip_id: ActiveValue::NotSet,
            name: ActiveValue::Set(participant.name.clone()),
        }
    }
}

impl TryFrom<Model> for Participant {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("participant not exists".to_string()))?,
            name: model.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_composes() {
        assert_eq!(normalize_name("  Alice "), "Alice");
        // decomposed e + combining acute collapses to the composed form
        assert_eq!(normalize_name("Re\u{0301}my"), "R\u{e9}my");
    }

    #[test]
    fn names_stay_case_sensitive() {
        assert_ne!(normalize_name("alice"), normalize_name("Alice"));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            Participant::new("   "),
            Err(EngineError::InvalidName(_))
        ));
    }
}
