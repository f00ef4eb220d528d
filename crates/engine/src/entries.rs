//! Ledger entries.
//!
//! An [`Entry`] is a single income or outcome record. Values are stored as
//! non-negative integer cents; the sign is carried by [`EntryKind`].

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Category, EngineError, MoneyCents, ResultEngine, categories};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Outcome,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Outcome => "outcome",
        }
    }

    /// Applies an entry of this kind to a running balance, `None` on overflow.
    pub(crate) fn apply(self, balance: MoneyCents, value: MoneyCents) -> Option<MoneyCents> {
        match self {
            Self::Income => balance.checked_add(value),
            Self::Outcome => balance.checked_sub(value),
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "outcome" => Ok(Self::Outcome),
            other => Err(EngineError::InvalidKind(format!(
                "\"{other}\" is neither income nor outcome"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub value: MoneyCents,
    pub kind: EntryKind,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub(crate) fn new(
        title: impl Into<String>,
        value: MoneyCents,
        kind: EntryKind,
        category: Category,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            value,
            kind,
            category,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub value: i64,
    pub kind: String,
    pub category_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<(Model, categories::Model)> for Entry {
    type Error = EngineError;

    fn try_from((model, category): (Model, categories::Model)) -> ResultEngine<Self> {
        if model.value < 0 {
            return Err(EngineError::InvalidValue(format!(
                "stored entry {} has a negative value",
                model.id
            )));
        }
        Ok(Self {
            id: model.id,
            title: model.title,
            value: MoneyCents::new(model.value),
            kind: EntryKind::try_from(model.kind.as_str())?,
            category: category.into(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Entry> for ActiveModel {
    fn from(entry: &Entry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id),
            title: ActiveValue::Set(entry.title.clone()),
            value: ActiveValue::Set(entry.value.cents()),
            kind: ActiveValue::Set(entry.kind.as_str().to_string()),
            category_id: ActiveValue::Set(entry.category.id),
            created_at: ActiveValue::Set(entry.created_at),
            updated_at: ActiveValue::Set(entry.updated_at),
        }
    }
}
