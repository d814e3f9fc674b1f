//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Romana:
//!
//! - `users`: authentication
//! - `trips`: expense groups owned by users
//! - `participants`: the roster of one trip (names, not users)
//! - `expenses`: recorded costs with a payer and a split-mode tag
//! - `expense_shares`: per-sharer rows of one expense's split
//!
//! `expenses.payer_name` and `expense_shares.participant_name` carry no
//! foreign key to `participants` on purpose: participant deletion must leave
//! stored expenses untouched.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Trips {
    Table,
    Id,
    Name,
    UserId,
    Currency,
}

#[derive(Iden)]
enum Participants {
    Table,
    Id,
    TripId,
    Name,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    TripId,
    Title,
    AmountMinor,
    Currency,
    PayerName,
    Category,
    SplitMode,
    OccurredAt,
    CreatedBy,
}

#[derive(Iden)]
enum ExpenseShares {
    Table,
    Id,
    ExpenseId,
    Position,
    ParticipantName,
    Weight,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Trips
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Trips::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trips::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Trips::Name).string().not_null())
                    .col(ColumnDef::new(Trips::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Trips::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-trips-user_id")
                            .from(Trips::Table, Trips::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Participants
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Participants::TripId).string().not_null())
                    .col(ColumnDef::new(Participants::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-participants-trip_id")
                            .from(Participants::Table, Participants::TripId)
                            .to(Trips::Table, Trips::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-participants-trip_id-name-unique")
                    .table(Participants::Table)
                    .col(Participants::TripId)
                    .col(Participants::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::TripId).string().not_null())
                    .col(ColumnDef::new(Expenses::Title).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Expenses::Currency)
                            .string()
                            .not_null()
                            .default("EUR"),
                    )
                    .col(ColumnDef::new(Expenses::PayerName).string().not_null())
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(ColumnDef::new(Expenses::SplitMode).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-trip_id")
                            .from(Expenses::Table, Expenses::TripId)
                            .to(Trips::Table, Trips::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-trip_id-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::TripId)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Expense shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseShares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExpenseShares::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseShares::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseShares::ParticipantName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseShares::Weight).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_shares-expense_id")
                            .from(ExpenseShares::Table, ExpenseShares::ExpenseId)
                            .to(Expenses::Table, Expenses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_shares-expense_id")
                    .table(ExpenseShares::Table)
                    .col(ExpenseShares::ExpenseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExpenseShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trips::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
