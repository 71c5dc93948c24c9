use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};

use super::{
    Collection, Document, DocumentStore, ID_FIELD, Predicate, StoreError, StoreResult, UniqueKey,
    Update, apply_updates,
};

/// Schema for the single JSONB document table. `unique_key` is NULL for
/// documents without a uniqueness constraint; NULLs never collide.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        unique_key TEXT,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS documents_unique_key
        ON documents (collection, unique_key)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS documents_body
        ON documents USING GIN (body jsonb_path_ops)
    "#,
];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
                StoreError::Corrupt(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// PostgresDocumentStore
///
/// Document store backed by one Postgres table of JSONB bodies.
/// Top-level equality filters are pushed down as `body @> $2` containment;
/// the remaining predicate is evaluated in process on the returned rows.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the document table and indexes if they are missing. Safe to call at every startup.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn body(row: &PgRow) -> StoreResult<Document> {
    let Json(value): Json<Value> = row.try_get("body")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Corrupt(format!("non-object body: {}", other))),
    }
}

fn document_id(doc: &Document) -> StoreResult<String> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Corrupt("document is missing a string _id".into()))
}

fn containment(filter: &Predicate) -> Json<Value> {
    Json(Value::Object(filter.equality_conjuncts()))
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find(&self, collection: Collection, filter: &Predicate) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 ORDER BY created_at, id",
        )
        .bind(collection.name())
        .bind(containment(filter))
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let doc = body(row)?;
            if filter.matches(&doc) {
                out.push(doc);
            }
        }
        Ok(out)
    }

    /// Fully pushed-down filters (id lookups, relation keys) fetch a single row;
    /// anything else falls back to `find`.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>> {
        if !filter.is_containment_only() {
            return Ok(self.find(collection, filter).await?.into_iter().next());
        }

        let row = sqlx::query(
            r#"SELECT body FROM documents
               WHERE collection = $1 AND body @> $2
               ORDER BY created_at, id
               LIMIT 1"#,
        )
        .bind(collection.name())
        .bind(containment(filter))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(body).transpose()
    }

    async fn insert(&self, collection: Collection, doc: Document) -> StoreResult<Document> {
        let id = document_id(&doc)?;
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(&id)
            .bind(Json(Value::Object(doc.clone())))
            .execute(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Relies on `ON CONFLICT DO NOTHING` against the unique index: zero rows
    /// affected means another writer already holds the key.
    async fn insert_unique(
        &self,
        collection: Collection,
        key: &UniqueKey,
        doc: Document,
    ) -> StoreResult<Document> {
        let id = document_id(&doc)?;
        let fingerprint = key.fingerprint();
        let result = sqlx::query(
            r#"INSERT INTO documents (collection, id, unique_key, body)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (collection, unique_key) DO NOTHING"#,
        )
        .bind(collection.name())
        .bind(&id)
        .bind(&fingerprint)
        .bind(Json(Value::Object(doc.clone())))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "{} already holds {}",
                collection, fingerprint
            )));
        }
        Ok(doc)
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Candidate rows are locked with `FOR UPDATE`, so a concurrent caller
    /// blocks until this transaction commits and then no longer sees the row.
    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Predicate,
    ) -> StoreResult<Option<Document>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"SELECT id, body FROM documents
               WHERE collection = $1 AND body @> $2
               ORDER BY created_at, id
               FOR UPDATE"#,
        )
        .bind(collection.name())
        .bind(containment(filter))
        .fetch_all(&mut *tx)
        .await?;

        let mut victim = None;
        for row in &rows {
            let doc = body(row)?;
            if filter.matches(&doc) {
                let id: String = row.try_get("id")?;
                victim = Some((id, doc));
                break;
            }
        }

        let Some((id, doc)) = victim else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(doc))
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        updates: &[Update],
    ) -> StoreResult<Option<Document>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let mut doc = body(&row)?;
        apply_updates(&mut doc, updates);

        sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .bind(Json(Value::Object(doc.clone())))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(doc))
    }
}
