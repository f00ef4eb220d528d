use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod category {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub title: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod transaction {
    use super::*;

    use crate::category::CategoryView;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Outcome,
    }

    /// A monetary value as sent by clients: either a JSON number (`12.5`) or
    /// a decimal string (`"12.50"`).
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum AmountInput {
        Number(serde_json::Number),
        Text(String),
    }

    impl AmountInput {
        /// Returns the value as decimal text, left unvalidated.
        pub fn to_text(&self) -> String {
            match self {
                Self::Number(number) => number.to_string(),
                Self::Text(text) => text.clone(),
            }
        }
    }

    /// Body of `POST /transactions`.
    ///
    /// `kind` is kept as free text: unknown kinds are rejected by the ledger
    /// with a dedicated error instead of a deserialization failure.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub title: String,
        pub value: AmountInput,
        #[serde(rename = "type")]
        pub kind: String,
        pub category: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub title: String,
        /// Value in cents, never negative.
        pub value_minor: i64,
        #[serde(rename = "type")]
        pub kind: TransactionKind,
        pub category: CategoryView,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BalanceView {
        pub income_minor: i64,
        pub outcome_minor: i64,
        pub total_minor: i64,
    }

    /// Response of `GET /transactions`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub balance: BalanceView,
    }

    /// Response of `POST /transactions/import`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionImportResponse {
        pub transactions: Vec<TransactionView>,
    }
}
