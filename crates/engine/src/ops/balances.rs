use sea_orm::{ConnectionTrait, DbErr, Statement};
use serde::{Deserialize, Serialize};

use crate::{EngineError, EntryKind, MoneyCents, ResultEngine};

use super::Engine;

/// Ledger totals over every committed entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub income: MoneyCents,
    pub outcome: MoneyCents,
    /// `income - outcome`.
    pub total: MoneyCents,
}

impl Balance {
    /// Returns the balance with one more entry recorded.
    ///
    /// Per-kind sums must stay within `i64` for the store to keep adding them
    /// up, so a value that would push either sum past it is rejected.
    pub(crate) fn with_entry(self, kind: EntryKind, value: MoneyCents) -> ResultEngine<Balance> {
        let (income, outcome) = match kind {
            EntryKind::Income => (self.income.checked_add(value), Some(self.outcome)),
            EntryKind::Outcome => (Some(self.income), self.outcome.checked_add(value)),
        };
        match (income, outcome, kind.apply(self.total, value)) {
            (Some(income), Some(outcome), Some(total)) => Ok(Balance {
                income,
                outcome,
                total,
            }),
            _ => Err(EngineError::InvalidValue(format!(
                "{value} would overflow the ledger {} total",
                kind.as_str()
            ))),
        }
    }
}

impl Engine {
    /// Returns the per-kind sums and the signed total of the ledger.
    pub async fn balance(&self) -> ResultEngine<Balance> {
        ledger_balance(&self.database).await
    }

    /// Returns income minus outcome over every committed entry.
    pub async fn current_balance(&self) -> ResultEngine<MoneyCents> {
        Ok(self.balance().await?.total)
    }
}

/// Computes the balance on `db`, which may be an open transaction so the
/// caller sees its own uncommitted writes and nothing else.
pub(super) async fn ledger_balance<C: ConnectionTrait>(db: &C) -> ResultEngine<Balance> {
    let income = sum_by_kind(db, EntryKind::Income).await?;
    let outcome = sum_by_kind(db, EntryKind::Outcome).await?;
    let total = income
        .checked_sub(outcome)
        .ok_or_else(|| DbErr::Custom(format!("balance {income} - {outcome} out of range")))?;
    Ok(Balance {
        income,
        outcome,
        total,
    })
}

async fn sum_by_kind<C: ConnectionTrait>(db: &C, kind: EntryKind) -> ResultEngine<MoneyCents> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        "SELECT COALESCE(SUM(value), 0) AS sum FROM entries WHERE kind = ?",
        vec![kind.as_str().into()],
    );
    let row = db.query_one(stmt).await?;
    let sum: i64 = match row {
        Some(row) => row.try_get("", "sum")?,
        None => 0,
    };
    Ok(MoneyCents::new(sum))
}
