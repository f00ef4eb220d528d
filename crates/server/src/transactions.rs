//! Transactions API endpoints

use api_types::{
    category::CategoryView,
    transaction::{
        BalanceView, TransactionImportResponse, TransactionKind as ApiKind,
        TransactionListResponse, TransactionNew, TransactionView,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use engine::{CreateEntryCmd, ImportPolicy};

use crate::{ServerError, server::ServerState, upload::StagedFile};

const UPLOAD_FIELD: &str = "file";

fn map_kind(kind: engine::EntryKind) -> ApiKind {
    match kind {
        engine::EntryKind::Income => ApiKind::Income,
        engine::EntryKind::Outcome => ApiKind::Outcome,
    }
}

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        title: category.title,
        created_at: category.created_at,
        updated_at: category.updated_at,
    }
}

fn map_entry(entry: engine::Entry) -> TransactionView {
    TransactionView {
        id: entry.id,
        title: entry.title,
        value_minor: entry.value.cents(),
        kind: map_kind(entry.kind),
        category: map_category(entry.category),
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    }
}

fn map_balance(balance: engine::Balance) -> BalanceView {
    BalanceView {
        income_minor: balance.income.cents(),
        outcome_minor: balance.outcome.cents(),
        total_minor: balance.total.cents(),
    }
}

pub async fn list(
    State(state): State<ServerState>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let transactions = state
        .engine
        .list_entries()
        .await?
        .into_iter()
        .map(map_entry)
        .collect();
    let balance = state.engine.balance().await?;

    Ok(Json(TransactionListResponse {
        transactions,
        balance: map_balance(balance),
    }))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let cmd = CreateEntryCmd::new(
        payload.title,
        payload.value.to_text(),
        payload.kind,
        payload.category,
    );
    let entry = state.engine.create_entry(cmd).await?;

    Ok((StatusCode::CREATED, Json(map_entry(entry))))
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.remove_entry(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stages the uploaded `file` field and imports it.
///
/// The staged file is released by the ledger after a successful import and
/// discarded here when the import fails.
pub async fn import(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<TransactionImportResponse>), ServerError> {
    let mut staged = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::Generic(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ServerError::Generic(format!("failed to read upload: {err}")))?;
        let file = StagedFile::stage(&state.upload_dir, &file_name, &bytes)
            .await
            .map_err(|err| {
                tracing::error!("failed to stage upload: {err}");
                ServerError::Generic("failed to store upload".to_string())
            })?;
        staged = Some(file);
        break;
    }

    let staged = staged.ok_or_else(|| {
        ServerError::Generic(format!("missing \"{UPLOAD_FIELD}\" field"))
    })?;
    let staged_path = staged.path().to_path_buf();

    match state
        .engine
        .import_csv(staged, ImportPolicy::default())
        .await
    {
        Ok(entries) => Ok((
            StatusCode::CREATED,
            Json(TransactionImportResponse {
                transactions: entries.into_iter().map(map_entry).collect(),
            }),
        )),
        Err(err) => {
            StagedFile::discard(&staged_path).await;
            Err(err.into())
        }
    }
}
