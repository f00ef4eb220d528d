use chrono::Utc;
use sea_orm::{ActiveModelTrait, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CreateEntryCmd, EngineError, Entry, EntryKind, MoneyCents, ResultEngine, categories, entries,
};

use super::{Engine, balances::ledger_balance, categories::resolve_one, with_tx};

const ENTRY_NOT_FOUND: &str = "transaction";

/// Malformed ids are reported exactly like absent ones.
fn parse_entry_id(id: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| EngineError::NotFound(ENTRY_NOT_FOUND.to_string()))
}

impl Engine {
    /// Creates one entry.
    ///
    /// Validation runs in this order and stops at the first failure:
    /// 1. `kind` must be `income` or `outcome` ([`EngineError::InvalidKind`])
    /// 2. `value` must be a non-negative decimal ([`EngineError::InvalidValue`])
    /// 3. an outcome must not exceed the current balance
    ///    ([`EngineError::InsufficientFunds`])
    ///
    /// A value that would push the income or outcome sum past `i64` is also
    /// an [`EngineError::InvalidValue`].
    ///
    /// Only then is the category resolved and the entry written. The balance
    /// check, the category resolution and the insert share one transaction
    /// under the ledger write lock, so a failure leaves nothing behind.
    pub async fn create_entry(&self, cmd: CreateEntryCmd) -> ResultEngine<Entry> {
        let kind = EntryKind::try_from(cmd.kind.as_str())?;
        let value = MoneyCents::parse_entry_value(&cmd.value)?;

        let _ledger = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            let before = ledger_balance(&db_tx).await?;
            if kind == EntryKind::Outcome && value > before.total {
                return Err(EngineError::InsufficientFunds(format!(
                    "outcome of {value} exceeds the available {}",
                    before.total
                )));
            }
            before.with_entry(kind, value)?;

            let category = resolve_one(&db_tx, &cmd.category).await?;
            let entry = Entry::new(cmd.title, value, kind, category, Utc::now());
            entries::ActiveModel::from(&entry).insert(&db_tx).await?;

            tracing::info!(
                id = %entry.id,
                kind = kind.as_str(),
                value = %entry.value,
                category = %entry.category.title,
                "created entry"
            );
            Ok(entry)
        })
    }

    /// Removes one entry. Its category is kept even if nothing references it
    /// anymore.
    pub async fn remove_entry(&self, id: &str) -> ResultEngine<()> {
        let id = parse_entry_id(id)?;

        let _ledger = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            let model = entries::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(ENTRY_NOT_FOUND.to_string()))?;
            model.delete(&db_tx).await?;

            tracing::info!(%id, "removed entry");
            Ok(())
        })
    }

    /// Looks up one entry with its category.
    pub async fn entry(&self, id: &str) -> ResultEngine<Entry> {
        let id = parse_entry_id(id)?;
        let (model, category) = entries::Entity::find_by_id(id)
            .find_also_related(categories::Entity)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(ENTRY_NOT_FOUND.to_string()))?;
        let category = category
            .ok_or_else(|| DbErr::RecordNotFound(format!("category of entry {id}")))?;
        Entry::try_from((model, category))
    }

    /// Lists every entry with its category, oldest first.
    pub async fn list_entries(&self) -> ResultEngine<Vec<Entry>> {
        let rows = entries::Entity::find()
            .find_also_related(categories::Entity)
            .order_by_asc(entries::Column::CreatedAt)
            .all(&self.database)
            .await?;

        rows.into_iter()
            .map(|(model, category)| {
                let category = category.ok_or_else(|| {
                    DbErr::RecordNotFound(format!("category of entry {}", model.id))
                })?;
                Entry::try_from((model, category))
            })
            .collect()
    }
}
