use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
}

pub mod trip {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripNew {
        pub name: String,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripCreated {
        pub id: String,
    }

    /// Lookup request; one of `id` or `name` must be set.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripGet {
        pub id: Option<String>,
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripView {
        pub id: String,
        pub name: String,
        pub currency: Currency,
    }
}

pub mod participant {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub id: Uuid,
        pub name: String,
    }

    /// Response body for listing a trip's roster, sorted by name.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantsResponse {
        pub participants: Vec<ParticipantView>,
    }
}

pub mod expense {
    use super::*;

    /// One weighted-split entry.
    ///
    /// `weight` is in hundredths of a percent (basis points) for `percent`
    /// splits and in minor units for `exact` splits.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SplitEntrySpec {
        pub name: String,
        pub weight: i64,
    }

    /// The sharing policy of an expense, tagged by `mode`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(tag = "mode", rename_all = "snake_case")]
    pub enum SplitSpec {
        Equal { sharers: Vec<String> },
        Percent { entries: Vec<SplitEntrySpec> },
        Exact { entries: Vec<SplitEntrySpec> },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub trip_id: String,
        pub title: String,
        pub amount_minor: i64,
        pub payer: String,
        pub category: Option<String>,
        pub split: SplitSpec,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }

    /// Full replacement of an expense; splits cannot be patched
    /// field-by-field without desyncing weights from the amount.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub trip_id: String,
        pub title: String,
        pub amount_minor: i64,
        pub payer: String,
        pub category: Option<String>,
        pub split: SplitSpec,
        /// If absent, the stored timestamp is kept.
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseDelete {
        pub trip_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseList {
        pub trip_id: String,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub payer: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub title: String,
        pub amount_minor: i64,
        pub payer: String,
        pub category: Option<String>,
        pub split: SplitSpec,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
        pub created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementGet {
        pub trip_id: String,
    }

    /// One directional payment after netting. Amounts are raw minor units;
    /// currency formatting belongs to the client.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct NetPaymentView {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementResponse {
        pub total_spent_minor: i64,
        pub payments: Vec<NetPaymentView>,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripStatsGet {
        pub trip_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TripStatistic {
        pub currency: Currency,
        pub total_spent_minor: i64,
        pub expense_count: i64,
    }
}
