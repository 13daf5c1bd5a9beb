//! SQLite-backed vector store for document chunks.
//!
//! Embeddings are stored as little-endian f32 BLOBs and scored in process
//! with cosine similarity. Scans follow rowid order, so equal scores keep
//! insertion order after the stable sort.

use crate::types::{Chunk, IndexStats, RetrievalHit};
use docqa_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// Trait for vector store backends.
///
/// Implementations must support:
/// - Upserting chunks with embeddings
/// - Searching for similar vectors (top-k)
/// - Collecting statistics
/// - Clearing the store
pub trait VectorStore: Send + Sync {
    /// Insert or update a chunk with its embedding.
    ///
    /// A chunk whose embedding dimension differs from the store's fixed
    /// dimension is a configuration error.
    fn upsert(&self, chunk: &Chunk) -> AppResult<()>;

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns hits ordered by descending similarity; `k` larger than the
    /// store clamps silently.
    fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<RetrievalHit>>;

    /// Get statistics about the store.
    fn stats(&self) -> AppResult<IndexStats>;

    /// Remove all chunks.
    fn clear(&self) -> AppResult<()>;
}

/// SQLite-backed implementation.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    dimensions: usize,
}

impl SqliteVectorStore {
    /// Open (or create) a store at the given path.
    pub fn open(db_path: &Path, dimensions: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create index directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open vector store: {}", e)))?;

        Self::with_connection(conn, dimensions)
    }

    /// Open an in-memory store, for tests and ephemeral sessions.
    pub fn open_in_memory(dimensions: usize) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open in-memory store: {}", e)))?;

        Self::with_connection(conn, dimensions)
    }

    fn with_connection(conn: Connection, dimensions: usize) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be non-zero".to_string(),
            ));
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source_file TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_file);
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized vector store ({} dimensions)", dimensions);

        Ok(Self {
            conn: Mutex::new(conn),
            dimensions,
        })
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VectorStore for SqliteVectorStore {
    fn upsert(&self, chunk: &Chunk) -> AppResult<()> {
        if chunk.embedding.len() != self.dimensions {
            return Err(AppError::Config(format!(
                "Embedding dimension mismatch: chunk '{}' has {}, store expects {}",
                chunk.id,
                chunk.embedding.len(),
                self.dimensions
            )));
        }

        let embedding_bytes = embedding_to_bytes(&chunk.embedding);

        let conn = self.lock_conn();
        conn.execute(
            "INSERT OR REPLACE INTO chunks (id, source_file, chunk_index, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chunk.id,
                chunk.source_file,
                chunk.chunk_index as i64,
                chunk.text,
                embedding_bytes,
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to insert chunk: {}", e)))?;

        Ok(())
    }

    fn search(&self, query_embedding: &[f32], k: usize) -> AppResult<Vec<RetrievalHit>> {
        if query_embedding.len() != self.dimensions {
            return Err(AppError::Config(format!(
                "Query embedding dimension mismatch: got {}, store expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let conn = self.lock_conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, source_file, chunk_index, text, embedding FROM chunks ORDER BY rowid",
            )
            .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

        let chunks_iter = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let embedding = bytes_to_embedding(&embedding_bytes)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

                Ok(Chunk {
                    id: row.get(0)?,
                    source_file: row.get(1)?,
                    chunk_index: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    embedding,
                })
            })
            .map_err(|e| AppError::Store(format!("Failed to query chunks: {}", e)))?;

        let mut results: Vec<RetrievalHit> = Vec::new();
        for chunk in chunks_iter {
            let chunk =
                chunk.map_err(|e| AppError::Store(format!("Failed to read chunk row: {}", e)))?;
            let score = cosine_similarity(query_embedding, &chunk.embedding);
            results.push(RetrievalHit { chunk, score });
        }

        // Stable sort keeps rowid order for equal scores
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        results.truncate(k);

        tracing::debug!("Retrieved {} chunks (requested top-{})", results.len(), k);

        Ok(results)
    }

    fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.lock_conn();

        let chunk_count: u32 = conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Store(format!("Failed to count chunks: {}", e)))?;

        let doc_count: u32 = conn
            .query_row("SELECT COUNT(DISTINCT source_file) FROM chunks", [], |row| {
                row.get::<_, i64>(0).map(|v| v as u32)
            })
            .map_err(|e| AppError::Store(format!("Failed to count documents: {}", e)))?;

        Ok(IndexStats {
            chunk_count,
            doc_count,
        })
    }

    fn clear(&self) -> AppResult<()> {
        let conn = self.lock_conn();
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| AppError::Store(format!("Failed to clear chunks: {}", e)))?;

        tracing::info!("Cleared vector store");
        Ok(())
    }
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store("Invalid embedding bytes length".to_string()));
    }

    let mut embedding = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        embedding.push(value);
    }

    Ok(embedding)
}

/// Cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with(source: &str, index: u32, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk::new(source, index, text).with_embedding(embedding)
    }

    #[test]
    fn test_upsert_and_search() {
        let store = SqliteVectorStore::open_in_memory(3).unwrap();

        store
            .upsert(&chunk_with("a.txt", 0, "first", vec![1.0, 0.0, 0.0]))
            .unwrap();
        store
            .upsert(&chunk_with("a.txt", 1, "second", vec![0.0, 1.0, 0.0]))
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "first");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_ordering_descending() {
        let store = SqliteVectorStore::open_in_memory(2).unwrap();

        // Unit vectors [s, sqrt(1 - s^2)] score exactly s against [1, 0]
        store
            .upsert(&chunk_with("a.txt", 0, "mid", vec![0.5, 0.866025]))
            .unwrap();
        store
            .upsert(&chunk_with("a.txt", 1, "best", vec![0.9, 0.435890]))
            .unwrap();
        store
            .upsert(&chunk_with("a.txt", 2, "second", vec![0.7, 0.714143]))
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "best");
        assert_eq!(hits[1].chunk.text, "second");
        assert!((hits[0].score - 0.9).abs() < 1e-3);
        assert!((hits[1].score - 0.7).abs() < 1e-3);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let store = SqliteVectorStore::open_in_memory(2).unwrap();

        store
            .upsert(&chunk_with("a.txt", 0, "earlier", vec![1.0, 0.0]))
            .unwrap();
        store
            .upsert(&chunk_with("a.txt", 1, "later", vec![1.0, 0.0]))
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk.text, "earlier");
        assert_eq!(hits[1].chunk.text, "later");
    }

    #[test]
    fn test_search_clamps_k() {
        let store = SqliteVectorStore::open_in_memory(2).unwrap();

        for i in 0..5 {
            store
                .upsert(&chunk_with("a.txt", i, "text", vec![1.0, i as f32]))
                .unwrap();
        }

        let hits = store.search(&[1.0, 0.0], 100).unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_upsert_dimension_mismatch() {
        let store = SqliteVectorStore::open_in_memory(3).unwrap();
        let result = store.upsert(&chunk_with("a.txt", 0, "bad", vec![1.0, 0.0]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let store = SqliteVectorStore::open_in_memory(3).unwrap();
        let result = store.search(&[1.0, 0.0], 2);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_upsert_replaces_same_id() {
        let store = SqliteVectorStore::open_in_memory(2).unwrap();

        store
            .upsert(&chunk_with("a.txt", 0, "old", vec![1.0, 0.0]))
            .unwrap();
        store
            .upsert(&chunk_with("a.txt", 0, "new", vec![1.0, 0.0]))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.chunk_count, 1);

        let hits = store.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].chunk.text, "new");
    }

    #[test]
    fn test_stats_and_clear() {
        let store = SqliteVectorStore::open_in_memory(2).unwrap();

        store
            .upsert(&chunk_with("a.txt", 0, "x", vec![1.0, 0.0]))
            .unwrap();
        store
            .upsert(&chunk_with("b.txt", 0, "y", vec![0.0, 1.0]))
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.chunk_count, 2);
        assert_eq!(stats.doc_count, 2);

        store.clear().unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.chunk_count, 0);
        assert_eq!(stats.doc_count, 0);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let store = SqliteVectorStore::open(&path, 2).unwrap();
        store
            .upsert(&chunk_with("a.txt", 0, "persisted", vec![1.0, 0.0]))
            .unwrap();
        drop(store);

        let reopened = SqliteVectorStore::open(&path, 2).unwrap();
        assert_eq!(reopened.stats().unwrap().chunk_count, 1);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
