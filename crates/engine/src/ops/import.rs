use chrono::Utc;
use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    BalanceCheck, EngineError, Entry, EntryKind, ImportPolicy, ImportRow, MoneyCents,
    ResultEngine, StagedSource, decode_rows, entries,
};

use super::{CHUNK_ROWS, Engine, balances::ledger_balance, categories::resolve_many, with_tx};

struct Candidate {
    title: String,
    value: MoneyCents,
    kind: EntryKind,
    category: String,
}

/// Prefixes a row-level error with its 1-based position in the batch.
fn at_row(line: usize, err: EngineError) -> EngineError {
    match err {
        EngineError::InvalidKind(msg) => EngineError::InvalidKind(format!("row {line}: {msg}")),
        EngineError::InvalidValue(msg) => EngineError::InvalidValue(format!("row {line}: {msg}")),
        other => other,
    }
}

/// Turns a decoded row into something storable.
///
/// Row strictness is the decoder's business; this only rejects what an entry
/// cannot hold at all.
fn candidate(index: usize, row: ImportRow) -> ResultEngine<Candidate> {
    let line = index + 1;
    let kind = EntryKind::try_from(row.kind.as_str()).map_err(|err| at_row(line, err))?;
    let value = MoneyCents::parse_entry_value(&row.value).map_err(|err| at_row(line, err))?;
    Ok(Candidate {
        title: row.title,
        value,
        kind,
        category: row.category,
    })
}

impl Engine {
    /// Merges a batch of rows into the ledger.
    ///
    /// All distinct category titles are resolved in a single pass, then every
    /// row becomes an entry and the batch is written at once. The returned
    /// entries follow the input order. The whole batch commits or nothing
    /// does.
    pub async fn reconcile(
        &self,
        rows: Vec<ImportRow>,
        policy: ImportPolicy,
    ) -> ResultEngine<Vec<Entry>> {
        let candidates = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| candidate(index, row))
            .collect::<ResultEngine<Vec<_>>>()?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let _ledger = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            let enforce = policy.balance_check == BalanceCheck::Enforce;
            let mut running = ledger_balance(&db_tx).await?;
            for (index, candidate) in candidates.iter().enumerate() {
                let line = index + 1;
                running = running
                    .with_entry(candidate.kind, candidate.value)
                    .map_err(|err| at_row(line, err))?;
                if enforce && running.total.is_negative() {
                    return Err(EngineError::InsufficientFunds(format!(
                        "row {line} would bring the balance to {}",
                        running.total
                    )));
                }
            }

            let resolved =
                resolve_many(&db_tx, candidates.iter().map(|c| c.category.as_str())).await?;

            let now = Utc::now();
            let mut batch = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let category = resolved
                    .get(&candidate.category)
                    .cloned()
                    .ok_or_else(|| {
                        DbErr::RecordNotFound(format!("category \"{}\"", candidate.category))
                    })?;
                batch.push(Entry::new(
                    candidate.title,
                    candidate.value,
                    candidate.kind,
                    category,
                    now,
                ));
            }

            for chunk in batch.chunks(CHUNK_ROWS) {
                entries::Entity::insert_many(chunk.iter().map(entries::ActiveModel::from))
                    .exec_without_returning(&db_tx)
                    .await?;
            }

            tracing::info!(
                entries = batch.len(),
                categories = resolved.len(),
                new_categories = resolved.created(),
                "reconciled import"
            );
            Ok(batch)
        })
    }

    /// Decodes a staged CSV source, reconciles its rows and releases the
    /// source once the entries are committed.
    ///
    /// A failed release is logged; it does not undo the import.
    pub async fn import_csv<S>(&self, source: S, policy: ImportPolicy) -> ResultEngine<Vec<Entry>>
    where
        S: StagedSource + Send,
    {
        let rows = {
            let reader = source.reader().map_err(|err| {
                EngineError::InvalidImport(format!("failed to open source: {err}"))
            })?;
            decode_rows(reader)?
        };

        let imported = self.reconcile(rows, policy).await?;

        if let Err(err) = source.release().await {
            tracing::warn!("failed to release import source: {err}");
        }
        Ok(imported)
    }
}
