//! PostgreSQL implementation of the redirect repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{NewRedirect, PublishState, RedirectEntry, RedirectPatch};
use crate::domain::listing::{ListFilter, ListQuery, SearchFilter, SortField};
use crate::domain::repositories::{BatchInsert, RedirectRepository};
use crate::error::AppError;

/// Advisory lock key serializing registry writers (`pg_advisory_xact_lock`).
const REGISTRY_LOCK_KEY: i64 = 0x5245_4449_5245_4354;

/// Rows per `INSERT` statement; keeps bind parameters under the protocol limit.
const INSERT_CHUNK: usize = 1000;

const SELECT_COLUMNS: &str =
    "SELECT id, old_url, new_url, referer, comment, hits, published, created_date FROM redirect_links";

#[derive(Debug, FromRow)]
struct RedirectRow {
    id: i64,
    old_url: String,
    new_url: String,
    referer: Option<String>,
    comment: Option<String>,
    hits: i64,
    published: i16,
    created_date: DateTime<Utc>,
}

impl TryFrom<RedirectRow> for RedirectEntry {
    type Error = AppError;

    fn try_from(row: RedirectRow) -> Result<Self, Self::Error> {
        let published = PublishState::try_from(row.published).map_err(|e| {
            AppError::store(
                "Stored entry has an invalid state",
                json!({ "id": row.id, "reason": e.to_string() }),
            )
        })?;

        Ok(RedirectEntry {
            id: row.id,
            old_url: row.old_url,
            new_url: row.new_url,
            referer: row.referer,
            comment: row.comment,
            hits: row.hits,
            published,
            created_date: row.created_date,
        })
    }
}

fn into_entries(rows: Vec<RedirectRow>) -> Result<Vec<RedirectEntry>, AppError> {
    rows.into_iter().map(RedirectEntry::try_from).collect()
}

/// Appends the `WHERE` clause for a listing filter.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    let states: Vec<i16> = filter.state.states().into_iter().map(i16::from).collect();
    qb.push(" WHERE published = ANY(").push_bind(states).push(")");

    match &filter.search {
        SearchFilter::Any => {}
        SearchFilter::Id(id) => {
            qb.push(" AND id = ").push_bind(*id);
        }
        SearchFilter::InvalidId(_) => {
            qb.push(" AND FALSE");
        }
        SearchFilter::Text(_) => {
            let pattern = filter.search.like_pattern().unwrap_or_default();
            qb.push(" AND (old_url ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR new_url ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR comment ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR referer ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// PostgreSQL repository for redirect entries.
///
/// Listing queries are assembled with [`QueryBuilder`]; every user-supplied value is
/// bound, and ordering columns come from a fixed allow-list.
pub struct PgRedirectRepository {
    pool: Arc<PgPool>,
}

impl PgRedirectRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedirectRepository for PgRedirectRepository {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RedirectEntry>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        push_filter(&mut qb, &query.filter);

        qb.push(" ORDER BY ")
            .push(query.ordering.field.column())
            .push(" ")
            .push(query.ordering.direction.as_sql());
        if query.ordering.field != SortField::Id {
            qb.push(", id ASC");
        }

        qb.push(" LIMIT ")
            .push_bind(query.page.limit())
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        let rows = qb
            .build_query_as::<RedirectRow>()
            .fetch_all(self.pool.as_ref())
            .await?;

        into_entries(rows)
    }

    async fn count(&self, filter: &ListFilter) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM redirect_links");
        push_filter(&mut qb, filter);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectEntry>, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(RedirectEntry::try_from).transpose()
    }

    async fn find_by_old_url(&self, old_url: &str) -> Result<Option<RedirectEntry>, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(&format!(
            "{SELECT_COLUMNS} WHERE old_url = $1 ORDER BY id LIMIT 1"
        ))
        .bind(old_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(RedirectEntry::try_from).transpose()
    }

    async fn find_existing(&self, old_urls: &[String]) -> Result<Vec<String>, AppError> {
        if old_urls.is_empty() {
            return Ok(Vec::new());
        }

        let existing = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT old_url FROM redirect_links WHERE old_url = ANY($1)",
        )
        .bind(old_urls)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(existing)
    }

    async fn insert_batch(&self, batch: Vec<NewRedirect>) -> Result<BatchInsert, AppError> {
        if batch.is_empty() {
            return Ok(BatchInsert::default());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REGISTRY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let urls: Vec<String> = batch.iter().map(|n| n.old_url.clone()).collect();
        let existing: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT old_url FROM redirect_links WHERE old_url = ANY($1)",
        )
        .bind(&urls)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        let (fresh, taken): (Vec<NewRedirect>, Vec<NewRedirect>) = batch
            .into_iter()
            .partition(|n| !existing.contains(&n.old_url));

        let mut inserted = 0;
        for chunk in fresh.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO redirect_links (old_url, new_url, referer, comment, hits, published, created_date) ",
            );
            qb.push_values(chunk, |mut row, n| {
                row.push_bind(n.old_url.clone())
                    .push_bind(n.new_url.clone())
                    .push_bind(n.referer.clone())
                    .push_bind(n.comment.clone())
                    .push_bind(0_i64)
                    .push_bind(n.published.as_i16())
                    .push_bind(n.created_date);
            });

            inserted += qb.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        Ok(BatchInsert {
            inserted,
            conflicts: taken.into_iter().map(|n| n.old_url).collect(),
        })
    }

    async fn update(
        &self,
        id: i64,
        patch: RedirectPatch,
    ) -> Result<Option<RedirectEntry>, AppError> {
        if patch.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE redirect_links SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(new_url) = patch.new_url {
                set.push("new_url = ").push_bind_unseparated(new_url);
            }
            if let Some(published) = patch.published {
                set.push("published = ")
                    .push_bind_unseparated(published.as_i16());
            }
            if let Some(comment) = patch.comment {
                set.push("comment = ").push_bind_unseparated(comment);
            }
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING id, old_url, new_url, referer, comment, hits, published, created_date");

        let row = qb
            .build_query_as::<RedirectRow>()
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(RedirectEntry::try_from).transpose()
    }

    async fn increment_hits(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE redirect_links SET hits = hits + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM redirect_links WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_disabled(&self) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REGISTRY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM redirect_links WHERE published = $1")
            .bind(PublishState::Disabled.as_i16())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
