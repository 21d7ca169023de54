//! SQLite-backed document store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, QueryBuilder, Sqlite};
use tokio::sync::Mutex;

use crate::memory::new_document_id;
use crate::{
    AccessRules, AuthContext, Document, DocumentStore, DocumentWrite, Fields, Query, StoreError,
    StoreResult,
};

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    fields TEXT NOT NULL,
    create_time TEXT NOT NULL,
    update_time TEXT NOT NULL,
    UNIQUE (collection, id)
)";

/// Database row for a document
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    fields: String,
    create_time: String,
    update_time: String,
}

impl DocumentRow {
    fn into_document(self) -> StoreResult<Document> {
        let fields: Fields = serde_json::from_str(&self.fields)?;
        Ok(Document {
            create_time: parse_time(&self.id, &self.create_time)?,
            update_time: parse_time(&self.id, &self.update_time)?,
            id: self.id,
            fields,
        })
    }
}

fn parse_time(id: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::InvalidDocument(format!("{}: bad timestamp {:?}: {}", id, value, e))
        })
}

/// JSON path addressing a top-level field.
fn field_path(field: &str) -> String {
    format!("$.\"{}\"", field)
}

/// Document store persisted in a single SQLite table.
///
/// Fields are stored as a JSON object per document. Equality filters run in
/// SQL through `json_extract`, in insertion order. Writes are serialized so a
/// read-check-write never races another writer for the database lock.
pub struct SqliteDocumentStore {
    pool: Pool<Sqlite>,
    rules: AccessRules,
    write_lock: Mutex<()>,
}

impl SqliteDocumentStore {
    /// Wraps an existing pool. Call [`init`](Self::init) before use.
    pub fn new(pool: Pool<Sqlite>, rules: AccessRules) -> Self {
        Self {
            pool,
            rules,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens `url`, creating the database file if needed, and initializes the schema.
    pub async fn connect(url: &str, rules: AccessRules) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to an in-memory database is a separate database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(pool, rules);
        store.init().await?;
        Ok(store)
    }

    /// Creates the documents table if it does not exist.
    pub async fn init(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::debug!("Document schema ready");
        Ok(())
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add(
        &self,
        auth: &AuthContext,
        collection: &str,
        write: DocumentWrite,
    ) -> StoreResult<Document> {
        self.rules.check_create(collection, auth, &write)?;

        let now = Utc::now();
        let document = Document {
            id: new_document_id(),
            fields: write.resolve(now),
            create_time: now,
            update_time: now,
        };

        let guard = self.write_lock.lock().await;
        sqlx::query(
            "INSERT INTO documents (collection, id, fields, create_time, update_time)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(&document.id)
        .bind(serde_json::to_string(&document.fields)?)
        .bind(document.create_time.to_rfc3339())
        .bind(document.update_time.to_rfc3339())
        .execute(&self.pool)
        .await?;
        drop(guard);

        tracing::debug!(collection = %collection, id = %document.id, "Document created");
        Ok(document)
    }

    async fn get(
        &self,
        auth: &AuthContext,
        collection: &str,
        id: &str,
    ) -> StoreResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, fields, create_time, update_time
             FROM documents
             WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(document) = row.map(DocumentRow::into_document).transpose()? else {
            return Ok(None);
        };

        self.rules.check_read(collection, auth, &document.fields)?;
        Ok(Some(document))
    }

    async fn query(&self, auth: &AuthContext, query: &Query) -> StoreResult<Vec<Document>> {
        self.rules.check_query(auth, query)?;

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, fields, create_time, update_time FROM documents WHERE collection = ",
        );
        builder.push_bind(&query.collection);
        for filter in &query.filters {
            // NULL never compares equal in SQL; those filters are left to `matches`.
            if filter.value.is_null() {
                continue;
            }
            builder
                .push(" AND json_extract(fields, ")
                .push_bind(field_path(&filter.field))
                .push(") = json_extract(")
                .push_bind(serde_json::to_string(&filter.value)?)
                .push(", '$')");
        }
        builder.push(" ORDER BY seq ASC");

        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut documents = Vec::new();
        for row in rows {
            let document = row.into_document()?;
            if query.matches(&document.fields) {
                documents.push(document);
            }
        }

        Ok(documents)
    }

    async fn update(
        &self,
        auth: &AuthContext,
        collection: &str,
        id: &str,
        write: DocumentWrite,
    ) -> StoreResult<Document> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, fields, create_time, update_time
             FROM documents
             WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut document = row
            .ok_or_else(|| StoreError::not_found(collection, id))?
            .into_document()?;

        self.rules
            .check_update(collection, auth, &document.fields, &write)?;

        let now = Utc::now();
        document.fields.extend(write.resolve(now));
        document.update_time = now;

        sqlx::query(
            "UPDATE documents SET fields = ?, update_time = ?
             WHERE collection = ? AND id = ?",
        )
        .bind(serde_json::to_string(&document.fields)?)
        .bind(document.update_time.to_rfc3339())
        .bind(collection)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(collection = %collection, id = %id, "Document updated");
        Ok(document)
    }

    async fn delete(&self, auth: &AuthContext, collection: &str, id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, fields, create_time, update_time
             FROM documents
             WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(());
        };
        let document = row.into_document()?;
        self.rules
            .check_delete(collection, auth, &document.fields)?;

        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(collection = %collection, id = %id, "Document deleted");
        Ok(())
    }
}
