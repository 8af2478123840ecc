//! Database operations for the documents table.
//!
//! Writes that go through this store are serialized, and after each one the
//! collection's current contents are published to live subscribers.

use async_trait::async_trait;
use eventdeck_engine::{
    CollectionHandle, Document, DocumentId, DocumentStore, Fields, SnapshotHub, SnapshotReceiver,
    StoreError, SubscriptionError,
};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;

/// A stored document row from the database.
#[derive(Debug)]
struct StoredDocument {
    id: String,
    fields: Json<Fields>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            id: row.try_get("id")?,
            fields: row.try_get("fields")?,
        })
    }
}

impl StoredDocument {
    fn into_document(self) -> Document {
        Document::new(self.id, self.fields.0)
    }
}

fn store_error(e: sqlx::Error) -> StoreError {
    tracing::error!("Document store error: {:?}", e);
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Provider(other.to_string()),
    }
}

/// Document store backed by PostgreSQL.
#[derive(Debug)]
pub struct PgDocumentStore {
    pool: PgPool,
    hub: SnapshotHub,
    /// Serializes write-then-publish
    writes: Mutex<()>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            hub: SnapshotHub::new(),
            writes: Mutex::new(()),
        }
    }

    /// Load a collection in insertion order.
    async fn load(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<StoredDocument> = sqlx::query_as(
            r#"
            SELECT id, fields
            FROM documents
            WHERE collection = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(StoredDocument::into_document).collect())
    }

    /// Reload a collection after a committed write and push it out.
    async fn publish(&self, collection: &str) {
        let loaded = self.load(collection).await;
        deliver(&self.hub, collection, loaded);
    }
}

/// Hand a reloaded collection to its listeners.
///
/// The write is already committed, so a failed reload never fails it.
/// Listeners are ended instead and resubscribe to read the new state.
fn deliver(hub: &SnapshotHub, collection: &str, loaded: Result<Vec<Document>, StoreError>) {
    match loaded {
        Ok(current) => {
            let delivered = hub.publish(collection, &current);
            tracing::trace!(collection = %collection, delivered, "Published snapshot");
        }
        Err(e) => {
            let closed = hub.fail(collection, SubscriptionError::Store(e.clone()));
            tracing::warn!(
                collection = %collection,
                closed,
                error = %e,
                "Reload after write failed, subscribers closed"
            );
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn subscribe(&self, handle: &CollectionHandle) -> Result<SnapshotReceiver, StoreError> {
        let _guard = self.writes.lock().await;
        let current = self.load(&handle.collection).await?;
        Ok(self.hub.register(handle.clone(), &current))
    }

    async fn add_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let _guard = self.writes.lock().await;

        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        tracing::debug!(collection = %collection, document_id = %id, "Document added");
        self.publish(collection).await;
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;

        // Top-level JSONB merge: given fields replace, others are untouched
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET fields = fields || $3
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&fields))
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.publish(collection).await;
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let _guard = self.writes.lock().await;

        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() > 0 {
            self.publish(collection).await;
        }
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<StoredDocument> =
            sqlx::query_as("SELECT id, fields FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;

        Ok(row.map(StoredDocument::into_document))
    }

    async fn get_documents(&self, handle: &CollectionHandle) -> Result<Vec<Document>, StoreError> {
        let docs = self.load(&handle.collection).await?;
        Ok(docs.into_iter().filter(|d| handle.matches(d)).collect())
    }
}
