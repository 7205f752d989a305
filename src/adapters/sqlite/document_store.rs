//! SQLite-backed document store.
//!
//! Every collection shares the `documents` table. Point lookups on `_id` are
//! answered by the primary key; other filters are evaluated in process with
//! the same matcher the memory store uses.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

use super::{create_pool, create_test_pool, migrate, DatabaseError, PoolConfig};
use crate::adapters::{resolve_insert_id, row_stream};
use crate::domain::errors::{CodecError, StoreError, StoreResult};
use crate::domain::models::{
    apply_pipeline, select, Document, Filter, ReplaceResult, Sort, Stage, ID_FIELD,
};
use crate::domain::ports::{DocumentCollection, DocumentStore, DocumentStream};

#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Wrap a pool whose schema is already migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `database_url` and migrate it.
    pub async fn connect(
        database_url: &str,
        config: Option<PoolConfig>,
    ) -> Result<Self, DatabaseError> {
        let pool = create_pool(database_url, config).await?;
        migrate(&pool).await?;
        debug!(database_url, "sqlite document store ready");
        Ok(Self::new(pool))
    }

    /// Migrated in-memory store, for tests.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let pool = create_test_pool().await?;
        migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn sqlite_collection(&self, name: &str) -> SqliteCollection {
        SqliteCollection {
            name: name.to_string(),
            pool: self.pool.clone(),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(self.sqlite_collection(name))
    }

    async fn collection_names(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT collection FROM documents ORDER BY collection")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteCollection {
    name: String,
    pool: SqlitePool,
}

/// A stored row: its `_id` and the parsed body, or why the body is unreadable.
type Row = (String, StoreResult<Document>);

impl SqliteCollection {
    /// Rows that could match `filter`, in `_id` order. Each body is parsed
    /// on its own so one corrupt row does not hide the others.
    async fn candidates(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        filter: &Filter,
    ) -> StoreResult<Vec<Row>> {
        let rows: Vec<(String, String)> = match filter.id_equality() {
            Some(id) => {
                sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? AND id = ?")
                    .bind(&self.name)
                    .bind(id)
                    .fetch_all(&mut **tx)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")
                    .bind(&self.name)
                    .fetch_all(&mut **tx)
                    .await?
            }
        };
        Ok(rows
            .into_iter()
            .map(|(id, body)| {
                let doc = parse_body(&id, &body);
                (id, doc)
            })
            .collect())
    }

    /// Readable documents matching `filter`, plus one error per unreadable
    /// row. A field filter cannot be evaluated against an unreadable body, so
    /// those rows are reported only for `Filter::All` and `_id` lookups.
    async fn matching(&self, filter: &Filter) -> StoreResult<(Vec<Document>, Vec<StoreError>)> {
        let mut tx = self.pool.begin().await?;
        let rows = self.candidates(&mut tx, filter).await?;
        tx.commit().await?;

        let report_unreadable = matches!(filter, Filter::All) || filter.id_equality().is_some();
        let mut docs = Vec::new();
        let mut unreadable = Vec::new();
        for (id, row) in rows {
            match row {
                Ok(doc) if filter.matches(&doc) => docs.push(doc),
                Ok(_) => {}
                Err(e) => {
                    warn!(collection = %self.name, id = %id, error = %e, "unreadable document body");
                    if report_unreadable {
                        unreadable.push(e);
                    }
                }
            }
        }
        Ok((docs, unreadable))
    }

    /// First readable document matching `filter`.
    async fn first_match(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .candidates(tx, filter)
            .await?
            .into_iter()
            .filter_map(|(_, row)| row.ok())
            .find(|doc| filter.matches(doc)))
    }

    async fn id_exists(&self, tx: &mut Transaction<'_, Sqlite>, id: &str) -> StoreResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM documents WHERE collection = ? AND id = ?")
                .bind(&self.name)
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(row.is_some())
    }

    async fn write_row(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        doc: &Document,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (collection, id) DO UPDATE
             SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(&self.name)
        .bind(id)
        .bind(encode_body(doc)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn parse_body(id: &str, body: &str) -> StoreResult<Document> {
    serde_json::from_str(body).map_err(|e| {
        CodecError::Deserialize(format!("unreadable body for _id {id}: {e}")).into()
    })
}

fn encode_body(doc: &Document) -> StoreResult<String> {
    serde_json::to_string(doc).map_err(|e| CodecError::Serialize(e.to_string()).into())
}

/// Readable documents first, then one `Err` item per unreadable row.
fn with_unreadable(docs: Vec<Document>, unreadable: Vec<StoreError>) -> Vec<StoreResult<Document>> {
    docs.into_iter()
        .map(Ok)
        .chain(unreadable.into_iter().map(Err))
        .collect()
}

fn duplicate(collection: &str, id: &str) -> StoreError {
    StoreError::Query(format!("duplicate _id {id} in collection {collection}"))
}

#[async_trait]
impl DocumentCollection for SqliteCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: Filter, sort: Option<Sort>, limit: Option<usize>) -> DocumentStream {
        let this = self.clone();
        row_stream(async move {
            let (docs, unreadable) = this.matching(&filter).await?;
            let mut rows = with_unreadable(select(docs, &Filter::All, sort.as_ref(), None), unreadable);
            if let Some(limit) = limit {
                rows.truncate(limit);
            }
            Ok(rows)
        })
    }

    async fn replace_one(
        &self,
        filter: Filter,
        mut doc: Document,
        upsert: bool,
    ) -> StoreResult<ReplaceResult> {
        let mut tx = self.pool.begin().await?;
        let existing = self.first_match(&mut tx, &filter).await?;

        let result = match existing {
            Some(current) => {
                let id = resolve_insert_id(&current, None);
                doc.insert(ID_FIELD.to_string(), id.clone().into());
                let modified = current != doc;
                self.write_row(&mut tx, &id, &doc).await?;
                ReplaceResult::matched(modified)
            }
            None if upsert => {
                let id = resolve_insert_id(&doc, Some(&filter));
                if self.id_exists(&mut tx, &id).await? {
                    return Err(duplicate(&self.name, &id));
                }
                doc.insert(ID_FIELD.to_string(), id.clone().into());
                self.write_row(&mut tx, &id, &doc).await?;
                ReplaceResult::upserted(id)
            }
            None => ReplaceResult::unmatched(),
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn insert_one(&self, mut doc: Document) -> StoreResult<String> {
        let id = resolve_insert_id(&doc, None);
        doc.insert(ID_FIELD.to_string(), id.clone().into());
        let body = encode_body(&doc)?;

        let inserted = sqlx::query(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(&self.name)
        .bind(&id)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(duplicate(&self.name, &id));
        }
        Ok(id)
    }

    async fn find_one_and_delete(&self, filter: Filter) -> StoreResult<Option<Document>> {
        let mut tx = self.pool.begin().await?;
        let target = self.first_match(&mut tx, &filter).await?;

        if let Some(doc) = &target {
            let id = resolve_insert_id(doc, None);
            sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(&self.name)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(target)
    }

    async fn count(&self, filter: Filter) -> StoreResult<u64> {
        if matches!(filter, Filter::All) {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM documents WHERE collection = ?")
                    .bind(&self.name)
                    .fetch_one(&self.pool)
                    .await?;
            return Ok(u64::try_from(count).unwrap_or_default());
        }
        Ok(self.matching(&filter).await?.0.len() as u64)
    }

    fn aggregate(&self, stages: Vec<Stage>) -> DocumentStream {
        let this = self.clone();
        row_stream(async move {
            let (docs, unreadable) = this.matching(&Filter::All).await?;
            Ok(with_unreadable(apply_pipeline(docs, &stages), unreadable))
        })
    }
}
