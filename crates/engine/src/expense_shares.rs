//! Share rows backing an expense's split.
//!
//! One row per sharer, positioned in list order. `weight` is `NULL` for
//! equal splits, percentage basis points for percent splits and minor units
//! for exact splits; the interpretation lives in the expense's `split_mode`
//! tag. Rows reference participants by name on purpose: a participant
//! deletion leaves them untouched.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expense_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub position: i32,
    pub participant_name: String,
    pub weight: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
