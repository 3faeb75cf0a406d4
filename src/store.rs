//! Knowledge store over SQLite: chunk rows plus their embedding vectors.
//!
//! The store holds exactly one corpus at a time. [`Store::reset`] wipes it
//! before every ingestion run (full-replace, never merge), [`Store::add`]
//! embeds and persists a batch of chunks, and [`Store::retrieve`] returns the
//! most similar stored chunks for a query by brute-force cosine similarity
//! over the stored vectors.
//!
//! Retrieval against a store containing no chunks is a distinct failure
//! ([`StoreError::Uninitialized`]), never a silent empty result, so the
//! boundary layer can tell callers to ingest first.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::embedding::{self, EmbeddingProvider};
use crate::models::Chunk;

/// Store-level failure distinct from generic errors so callers can map it to
/// an actionable message.
#[derive(Debug)]
pub enum StoreError {
    /// No chunks have been ingested into the store.
    Uninitialized,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Uninitialized => {
                write!(f, "knowledge store is empty; ingest URLs or documents first")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Handle to the chunk/vector tables.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    top_k: i64,
    batch_size: usize,
}

impl Store {
    /// Open (or create) the SQLite database at `path` and ensure the
    /// schema exists. Idempotent; the parent directory is created first.
    pub async fn open(path: &Path, top_k: i64, batch_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            top_k,
            batch_size,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                added_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunk_vectors (
                chunk_id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                FOREIGN KEY (chunk_id) REFERENCES chunks(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Discard every stored chunk and vector. Called at the start of each
    /// ingestion run: the store only ever holds the latest corpus.
    pub async fn reset(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunk_vectors")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Embed and persist a batch of chunks. No-op on empty input.
    /// Returns the number of chunks stored.
    pub async fn add(
        &self,
        embedder: &dyn EmbeddingProvider,
        chunks: &[Chunk],
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut stored = 0usize;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed(&texts).await?;

            let mut tx = self.pool.begin().await?;
            for (chunk, vec) in batch.iter().zip(vectors.iter()) {
                let blob = embedding::vec_to_blob(vec);
                sqlx::query(
                    "INSERT INTO chunks (id, source, chunk_index, text, added_at) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&chunk.id)
                .bind(&chunk.source)
                .bind(chunk.chunk_index)
                .bind(&chunk.text)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query("INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?, ?)")
                    .bind(&chunk.id)
                    .bind(&blob)
                    .execute(&mut *tx)
                    .await?;

                stored += 1;
            }
            tx.commit().await?;
        }

        debug!(stored, "chunks stored");
        Ok(stored)
    }

    /// Return the `top_k` stored chunks most similar to `query`, best first.
    ///
    /// Fails with [`StoreError::Uninitialized`] when the store holds no
    /// chunks at all.
    pub async fn retrieve(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
    ) -> Result<Vec<Chunk>> {
        if self.chunk_count().await? == 0 {
            return Err(StoreError::Uninitialized.into());
        }

        let query_vec = embedding::embed_query(embedder, query).await?;

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.source, c.chunk_index, c.text, v.embedding
            FROM chunks c
            JOIN chunk_vectors v ON v.chunk_id = c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, Chunk)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = embedding::blob_to_vec(&blob);
                let similarity = embedding::cosine_similarity(&query_vec, &vec);
                (
                    similarity,
                    Chunk {
                        id: row.get("id"),
                        source: row.get("source"),
                        chunk_index: row.get("chunk_index"),
                        text: row.get("text"),
                    },
                )
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_k as usize);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }

    pub async fn chunk_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
