//! SQLite-backed vector store.
//!
//! One `records` table keyed by `(collection, key)` holds text, metadata and
//! the raw f32 embedding bytes. Search is a brute-force cosine scan over the
//! collection, which is fine for the record counts a local store sees.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use skein_llm::SharedEmbedder;
use tracing::{debug, info};
use zerocopy::IntoBytes;

use super::{MetadataFilter, VectorStore, passes, prepare_record, rank};
use crate::error::{MemoryError, Result};
use crate::types::{MemoryRecord, Metadata};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

/// Vector store backed by a single SQLite database.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    embedder: SharedEmbedder,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("embedder", &self.embedder.name())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl SqliteVectorStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>, embedder: SharedEmbedder) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| MemoryError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
            embedder,
        };
        store.initialize()?;

        info!("Vector store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory(embedder: SharedEmbedder) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            embedder,
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL REFERENCES collections(name),
                key TEXT NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!("Initialized vector store schema (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Create the collection on first use and check its dimensionality.
    fn ensure_collection(&self, conn: &Connection, collection: &str) -> Result<()> {
        let expected = self.embedder.dimensions();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(dims) if dims as usize != expected => Err(MemoryError::InvalidData(format!(
                "collection '{}' holds {}-dim embeddings but embedder '{}' produces {}",
                collection,
                dims,
                self.embedder.name(),
                expected
            ))),
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    "INSERT INTO collections (name, dimensions, created_at) VALUES (?1, ?2, ?3)",
                    params![collection, expected as i64, chrono::Utc::now().to_rfc3339()],
                )?;
                debug!(collection, dimensions = expected, "Created collection");
                Ok(())
            }
        }
    }

    fn load_rows(
        conn: &Connection,
        collection: &str,
        filter: Option<&MetadataFilter>,
        with_embedding: bool,
    ) -> Result<Vec<MemoryRecord>> {
        let mut stmt = conn.prepare(
            "SELECT key, text, embedding, metadata FROM records WHERE collection = ?1 ORDER BY key",
        )?;
        let mut rows = stmt.query(params![collection])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let record = row_to_record(row, with_embedding)?;
            if passes(filter, &record.metadata) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>, with_embedding: bool) -> Result<MemoryRecord> {
    let key: String = row.get(0)?;
    let text: String = row.get(1)?;
    let metadata_json: String = row.get(3)?;
    let metadata: Metadata = serde_json::from_str(&metadata_json)?;

    let embedding = if with_embedding {
        let blob: Vec<u8> = row.get(2)?;
        bytes_to_embedding(&blob)
    } else {
        Vec::new()
    };

    Ok(MemoryRecord {
        key,
        text,
        embedding,
        metadata,
        relevance: None,
    })
}

/// Decode native-endian f32 bytes written via `IntoBytes::as_bytes`.
fn bytes_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// VectorStore
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> Result<String> {
        let record = prepare_record(self.embedder.as_ref(), collection, record).await?;
        let metadata = serde_json::to_string(&record.metadata)?;

        let conn = self.conn.lock();
        self.ensure_collection(&conn, collection)?;
        conn.execute(
            r#"
            INSERT INTO records (collection, key, text, embedding, metadata, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (collection, key) DO UPDATE SET
                text = excluded.text,
                embedding = excluded.embedding,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            "#,
            params![
                collection,
                record.key,
                record.text,
                record.embedding.as_bytes(),
                metadata,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        debug!(collection, key = %record.key, "Upserted record");
        Ok(record.key)
    }

    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
        min_relevance: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<MemoryRecord>> {
        let query = self.embedder.embed(query).await?;
        let candidates = {
            let conn = self.conn.lock();
            Self::load_rows(&conn, collection, filter, true)?
        };
        Ok(rank(candidates, &query, limit, min_relevance))
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> Result<Option<MemoryRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT key, text, embedding, metadata FROM records WHERE collection = ?1 AND key = ?2",
        )?;
        let mut rows = stmt.query(params![collection, key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row, with_embedding)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, collection: &str, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        Ok(rows > 0)
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&MetadataFilter>,
        with_embedding: bool,
    ) -> Result<Vec<MemoryRecord>> {
        let conn = self.conn.lock();
        Self::load_rows(&conn, collection, filter, with_embedding)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn count(&self, collection: &str, filter: Option<&MetadataFilter>) -> Result<usize> {
        if filter.is_some() {
            return Ok(self.list(collection, filter, false).await?.len());
        }
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
