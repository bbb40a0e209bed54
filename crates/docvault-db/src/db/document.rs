use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docvault_core::{AppError, DocumentRecord, DocumentState, DocumentVersion, StorageVendor};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repository::{
    lock_conflict, version_conflict, DocumentChange, DocumentRepository, VersionWrite,
};

const DOCUMENT_COLUMNS: &str = r#"
    id, org_id, document_name, alternate_document_name, extension, size_in_bytes,
    document_path, storage_vendor, is_versioned_file, permissions, custom_metadata,
    initiator_user_id, state, current_version_id, lock_version, is_deleted,
    created_at, updated_at
"#;

const VERSION_COLUMNS: &str = r#"
    id, document_id, version_number, document_path, size_in_bytes, content_hash,
    created_by, created_at
"#;

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    org_id: Uuid,
    document_name: String,
    alternate_document_name: Option<String>,
    extension: String,
    size_in_bytes: i64,
    document_path: Option<String>,
    storage_vendor: StorageVendor,
    is_versioned_file: bool,
    permissions: JsonValue,
    custom_metadata: JsonValue,
    initiator_user_id: Option<Uuid>,
    state: DocumentState,
    current_version_id: Option<Uuid>,
    lock_version: i64,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_record(self) -> DocumentRecord {
        DocumentRecord {
            id: self.id,
            org_id: self.org_id,
            document_name: self.document_name,
            alternate_document_name: self.alternate_document_name,
            extension: self.extension,
            size_in_bytes: self.size_in_bytes,
            document_path: self.document_path,
            storage_vendor: self.storage_vendor,
            is_versioned_file: self.is_versioned_file,
            permissions: self.permissions,
            custom_metadata: self.custom_metadata,
            initiator_user_id: self.initiator_user_id,
            state: self.state,
            current_version_id: self.current_version_id,
            lock_version: self.lock_version,
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DocumentVersionRow {
    id: Uuid,
    document_id: Uuid,
    version_number: i32,
    document_path: String,
    size_in_bytes: i64,
    content_hash: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl DocumentVersionRow {
    fn into_version(self) -> DocumentVersion {
        DocumentVersion {
            id: self.id,
            document_id: self.document_id,
            version_number: self.version_number,
            document_path: self.document_path,
            size_in_bytes: self.size_in_bytes,
            content_hash: self.content_hash,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Postgres-backed document record store.
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_version(
        tx: &mut Transaction<'_, Postgres>,
        document_id: Uuid,
        write: &VersionWrite,
    ) -> Result<(), AppError> {
        let version = write.version();
        let sql = match write {
            VersionWrite::Append(_) => {
                r#"
                INSERT INTO document_versions (
                    id, document_id, version_number, document_path, size_in_bytes,
                    content_hash, created_by, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#
            }
            VersionWrite::Replace(_) => {
                r#"
                INSERT INTO document_versions (
                    id, document_id, version_number, document_path, size_in_bytes,
                    content_hash, created_by, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    document_path = EXCLUDED.document_path,
                    size_in_bytes = EXCLUDED.size_in_bytes,
                    content_hash = EXCLUDED.content_hash,
                    created_by = EXCLUDED.created_by,
                    created_at = EXCLUDED.created_at
                "#
            }
        };

        let result = sqlx::query(sql)
            .bind(version.id)
            .bind(document_id)
            .bind(version.version_number)
            .bind(&version.document_path)
            .bind(version.size_in_bytes)
            .bind(&version.content_hash)
            .bind(version.created_by)
            .bind(version.created_at)
            .execute(&mut **tx)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(version_conflict(document_id, version.version_number))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "documents", db.record_id = %record.id))]
    async fn insert(&self, record: &DocumentRecord) -> Result<DocumentRecord, AppError> {
        let sql = format!(
            r#"
            INSERT INTO documents (
                id, org_id, document_name, alternate_document_name, extension,
                size_in_bytes, document_path, storage_vendor, is_versioned_file,
                permissions, custom_metadata, initiator_user_id, state,
                current_version_id, lock_version, is_deleted, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, DocumentRow>(&sql)
            .bind(record.id)
            .bind(record.org_id)
            .bind(&record.document_name)
            .bind(&record.alternate_document_name)
            .bind(&record.extension)
            .bind(record.size_in_bytes)
            .bind(&record.document_path)
            .bind(record.storage_vendor)
            .bind(record.is_versioned_file)
            .bind(&record.permissions)
            .bind(&record.custom_metadata)
            .bind(record.initiator_user_id)
            .bind(record.state)
            .bind(record.current_version_id)
            .bind(record.lock_version)
            .bind(record.is_deleted)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Document {} already exists", record.id))
                } else {
                    e.into()
                }
            })?;

        Ok(row.into_record())
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn get(&self, org_id: Uuid, id: Uuid) -> Result<Option<DocumentRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM documents WHERE id = $1 AND org_id = $2 AND is_deleted = FALSE",
            DOCUMENT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, DocumentRow>(&sql)
            .bind(id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(DocumentRow::into_record))
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %id))]
    async fn get_including_deleted(
        &self,
        org_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM documents WHERE id = $1 AND org_id = $2",
            DOCUMENT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, DocumentRow>(&sql)
            .bind(id)
            .bind(org_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(DocumentRow::into_record))
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_versions", db.record_id = %document_id))]
    async fn list_versions(
        &self,
        org_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<DocumentVersion>, AppError> {
        // Join on documents so a foreign org sees an empty list.
        let sql = format!(
            r#"
            SELECT {}
            FROM document_versions v
            WHERE v.document_id = $1
              AND EXISTS (SELECT 1 FROM documents d WHERE d.id = $1 AND d.org_id = $2)
            ORDER BY v.version_number ASC
            "#,
            VERSION_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, DocumentVersionRow>(&sql)
            .bind(document_id)
            .bind(org_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(DocumentVersionRow::into_version).collect())
    }

    #[tracing::instrument(
        skip(self, change),
        fields(
            db.table = "documents",
            db.record_id = %change.record.id,
            expected_lock_version = change.expected_lock_version
        )
    )]
    async fn commit(&self, change: DocumentChange) -> Result<DocumentRecord, AppError> {
        let record = &change.record;
        let mut tx = self.pool.begin().await?;

        if let Some(write) = &change.version {
            Self::write_version(&mut tx, record.id, write).await?;
        }

        let sql = format!(
            r#"
            UPDATE documents
            SET document_path = $4,
                size_in_bytes = $5,
                state = $6,
                current_version_id = $7,
                is_deleted = $8,
                lock_version = lock_version + 1,
                updated_at = NOW()
            WHERE id = $1 AND org_id = $2 AND is_deleted = FALSE AND lock_version = $3
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, DocumentRow>(&sql)
            .bind(record.id)
            .bind(record.org_id)
            .bind(change.expected_lock_version)
            .bind(&record.document_path)
            .bind(record.size_in_bytes)
            .bind(record.state)
            .bind(record.current_version_id)
            .bind(record.is_deleted)
            .fetch_optional(&mut *tx)
            .await?;

        match row {
            Some(row) => {
                tx.commit().await?;
                Ok(row.into_record())
            }
            None => {
                // Dropping the transaction rolls back the version write.
                let live: Option<(i64,)> = sqlx::query_as(
                    "SELECT lock_version FROM documents WHERE id = $1 AND org_id = $2 AND is_deleted = FALSE",
                )
                .bind(record.id)
                .bind(record.org_id)
                .fetch_optional(&mut *tx)
                .await?;

                match live {
                    Some(_) => {
                        tracing::debug!(document_id = %record.id, "Lock version mismatch");
                        Err(lock_conflict(record.id))
                    }
                    None => Err(AppError::document_not_found(record.id)),
                }
            }
        }
    }
}
