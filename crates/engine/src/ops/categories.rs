use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};

use crate::{Category, ResultEngine, categories};

use super::{CHUNK_ROWS, Engine, with_tx};

/// Result of one resolution pass: every requested title mapped to exactly
/// one category, in order of first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedCategories {
    ordered: Vec<Category>,
    by_title: HashMap<String, usize>,
    created: usize,
}

impl ResolvedCategories {
    pub fn get(&self, title: &str) -> Option<&Category> {
        self.by_title.get(title).map(|&idx| &self.ordered[idx])
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Number of categories inserted by this pass.
    pub fn created(&self) -> usize {
        self.created
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.ordered.iter()
    }

    pub fn into_vec(self) -> Vec<Category> {
        self.ordered
    }
}

impl Engine {
    /// Returns the category titled exactly `title`, creating it if absent.
    pub async fn resolve_category(&self, title: &str) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            resolve_one(&db_tx, title).await
        })
    }

    /// Resolves every distinct title in one pass: bulk lookups, then bulk
    /// inserts of the missing titles, a chunk of titles per statement.
    pub async fn resolve_categories<I, S>(&self, titles: I) -> ResultEngine<ResolvedCategories>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        with_tx!(self, |db_tx| {
            resolve_many(&db_tx, titles).await
        })
    }

    /// Lists every category ordered by title.
    pub async fn list_categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .order_by_asc(categories::Column::Title)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }
}

pub(super) async fn resolve_one(db_tx: &DatabaseTransaction, title: &str) -> ResultEngine<Category> {
    let resolved = resolve_many(db_tx, [title]).await?;
    resolved
        .into_vec()
        .into_iter()
        .next()
        .ok_or_else(|| DbErr::RecordNotFound(format!("category \"{title}\"")).into())
}

async fn find_by_titles(
    db_tx: &DatabaseTransaction,
    titles: &[String],
) -> ResultEngine<Vec<(String, Category)>> {
    let models = categories::Entity::find()
        .filter(categories::Column::Title.is_in(titles.iter().map(String::as_str)))
        .all(db_tx)
        .await?;
    Ok(models
        .into_iter()
        .map(|model| (model.title.clone(), Category::from(model)))
        .collect())
}

/// Find-or-create for a set of titles.
///
/// Missing titles are inserted chunk by chunk with
/// `ON CONFLICT (title) DO NOTHING` and then read back, so a title created
/// concurrently by another writer is reused instead of duplicated.
pub(super) async fn resolve_many<I, S>(
    db_tx: &DatabaseTransaction,
    titles: I,
) -> ResultEngine<ResolvedCategories>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let distinct: Vec<String> = titles
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .filter(|t| seen.insert(t.clone()))
        .collect();
    if distinct.is_empty() {
        return Ok(ResolvedCategories::default());
    }

    let mut found = HashMap::with_capacity(distinct.len());
    for chunk in distinct.chunks(CHUNK_ROWS) {
        found.extend(find_by_titles(db_tx, chunk).await?);
    }

    let missing: Vec<String> = distinct
        .iter()
        .filter(|title| !found.contains_key(*title))
        .cloned()
        .collect();
    let mut created = 0;
    let now = Utc::now();
    for chunk in missing.chunks(CHUNK_ROWS) {
        let active_models = chunk
            .iter()
            .map(|title| categories::ActiveModel::from(&Category::new(title.as_str(), now)));
        let inserted = categories::Entity::insert_many(active_models)
            .on_conflict(
                OnConflict::column(categories::Column::Title)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;
        created += usize::try_from(inserted).unwrap_or(usize::MAX);
        found.extend(find_by_titles(db_tx, chunk).await?);
    }

    let mut resolved = ResolvedCategories {
        created,
        ..Default::default()
    };
    for title in distinct {
        let category = found
            .remove(&title)
            .ok_or_else(|| DbErr::RecordNotFound(format!("category \"{title}\"")))?;
        resolved.by_title.insert(title, resolved.ordered.len());
        resolved.ordered.push(category);
    }

    tracing::debug!(
        titles = resolved.len(),
        created = resolved.created,
        "resolved categories"
    );
    Ok(resolved)
}
