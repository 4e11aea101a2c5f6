//! libSQL document store (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding JSON documents keyed
//! by `(collection, doc_id)`. Callers hand it a fully-built value and get back
//! success or failure; the store never inspects document contents.
//!
//! **Access rules:**
//! - publishing commands: read-write via [`Storage::open`]
//! - query commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use curriculum_shared::{CurriculumError, Result};
use libsql::{Connection, Database, params};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Metadata of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMeta {
    pub collection: String,
    pub doc_id: String,
    /// SHA-256 of the stored JSON body, hex encoded.
    pub content_hash: String,
    /// Build that produced the body, if the writer supplied one.
    pub build_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A document body together with its metadata.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub meta: DocumentMeta,
    pub body: serde_json::Value,
}

/// Outcome of [`Storage::put_document`].
#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub meta: DocumentMeta,
    /// False when the previous body had the same content hash.
    pub changed: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CurriculumError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CurriculumError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CurriculumError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CurriculumError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Document operations
    // -----------------------------------------------------------------------

    /// Insert or replace the document at `(collection, doc_id)`.
    pub async fn put_document(
        &self,
        collection: &str,
        doc_id: &str,
        body: &serde_json::Value,
        build_id: Option<&str>,
    ) -> Result<WriteReceipt> {
        self.check_writable()?;

        let body_json = serde_json::to_string(body)?;
        let content_hash = content_hash(&body_json);
        let previous = self.get_meta(collection, doc_id).await?;
        let now = Utc::now();

        self.conn
            .execute(
                "INSERT INTO documents (collection, doc_id, body_json, content_hash, build_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(collection, doc_id) DO UPDATE SET
                   body_json = excluded.body_json,
                   content_hash = excluded.content_hash,
                   build_id = excluded.build_id,
                   updated_at = excluded.updated_at",
                params![
                    collection,
                    doc_id,
                    body_json.as_str(),
                    content_hash.as_str(),
                    build_id,
                    now.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        let changed = previous.is_none_or(|meta| meta.content_hash != content_hash);
        tracing::debug!(collection, doc_id, changed, "document written");

        Ok(WriteReceipt {
            meta: DocumentMeta {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
                content_hash,
                build_id: build_id.map(String::from),
                updated_at: now,
            },
            changed,
        })
    }

    /// Get a document with its metadata.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<StoredDocument>> {
        let mut rows = self
            .conn
            .query(
                "SELECT collection, doc_id, content_hash, build_id, updated_at, body_json
                 FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
            )
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let meta = row_to_meta(&row)?;
                let body_json: String = row
                    .get(5)
                    .map_err(|e| CurriculumError::Storage(e.to_string()))?;
                let body = serde_json::from_str(&body_json)?;
                Ok(Some(StoredDocument { meta, body }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(CurriculumError::Storage(e.to_string())),
        }
    }

    /// List document metadata in a collection, ordered by id.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<DocumentMeta>> {
        let mut rows = self
            .conn
            .query(
                "SELECT collection, doc_id, content_hash, build_id, updated_at
                 FROM documents WHERE collection = ?1 ORDER BY doc_id",
                params![collection],
            )
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?
        {
            results.push(row_to_meta(&row)?);
        }
        Ok(results)
    }

    /// Delete a document. Returns whether anything was removed.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
            )
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;
        Ok(affected > 0)
    }

    async fn get_meta(&self, collection: &str, doc_id: &str) -> Result<Option<DocumentMeta>> {
        let mut rows = self
            .conn
            .query(
                "SELECT collection, doc_id, content_hash, build_id, updated_at
                 FROM documents WHERE collection = ?1 AND doc_id = ?2",
                params![collection, doc_id],
            )
            .await
            .map_err(|e| CurriculumError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_meta(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CurriculumError::Storage(e.to_string())),
        }
    }
}

/// Hex-encoded SHA-256 of a serialized body.
fn content_hash(body_json: &str) -> String {
    format!("{:x}", Sha256::digest(body_json.as_bytes()))
}

/// Convert the leading metadata columns of a row to a [`DocumentMeta`].
fn row_to_meta(row: &libsql::Row) -> Result<DocumentMeta> {
    Ok(DocumentMeta {
        collection: row
            .get::<String>(0)
            .map_err(|e| CurriculumError::Storage(e.to_string()))?,
        doc_id: row
            .get::<String>(1)
            .map_err(|e| CurriculumError::Storage(e.to_string()))?,
        content_hash: row
            .get::<String>(2)
            .map_err(|e| CurriculumError::Storage(e.to_string()))?,
        build_id: row.get::<String>(3).ok(),
        updated_at: {
            let s: String = row
                .get(4)
                .map_err(|e| CurriculumError::Storage(e.to_string()))?;
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CurriculumError::Storage(format!("invalid date: {e}")))?
        },
    })
}
