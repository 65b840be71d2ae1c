//! Persistent vector index
//!
//! SQLite-backed nearest-neighbor index over chunk embeddings. Embeddings
//! are stored as little-endian f32 BLOBs and scanned exactly in Rust; the
//! corpus is a fixed set of report chunks, small enough that an exact cosine
//! scan beats maintaining an ANN structure.

use crate::error::Result;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identity of one retrieved chunk: originating document plus position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_file: String,
    pub chunk_index: i64,
}

/// Result of a nearest-neighbor query: parallel vectors in ascending
/// distance order (best match first)
#[derive(Debug, Clone, Default)]
pub struct IndexQueryResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<SourceRef>,
    pub distances: Vec<f32>,
}

/// Vector index handle, scoped to one named collection
pub struct VectorIndex {
    conn: Connection,
    collection: String,
}

impl VectorIndex {
    /// Open the index at path, creating the schema if necessary
    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let index = Self {
            conn,
            collection: collection.into(),
        };
        index.ensure_schema()?;
        Ok(index)
    }

    /// Open an in-memory index (for testing)
    pub fn open_in_memory(collection: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let index = Self {
            conn,
            collection: collection.into(),
        };
        index.ensure_schema()?;
        Ok(index)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                source_file TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE(collection, source_file, chunk_index)
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection);",
        )?;
        Ok(())
    }

    /// Insert or replace one chunk with its embedding
    ///
    /// Write path for the ingestion pipeline; the query path never mutates.
    pub fn insert_chunk(
        &self,
        source_file: &str,
        chunk_index: i64,
        text: &str,
        embedding: &[f32],
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO chunks
                (collection, source_file, chunk_index, text, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.collection,
                source_file,
                chunk_index,
                text,
                embedding_to_bytes(embedding),
                now
            ],
        )?;
        Ok(())
    }

    /// Query the n_results nearest neighbors by cosine distance
    ///
    /// Returns parallel documents/metadatas/distances vectors ordered by
    /// ascending distance (lower = more relevant).
    pub fn query(&self, embedding: &[f32], n_results: usize) -> Result<IndexQueryResult> {
        let mut stmt = self.conn.prepare(
            "SELECT source_file, chunk_index, text, embedding
             FROM chunks WHERE collection = ?1",
        )?;

        let mut scored: Vec<(SourceRef, String, f32)> = stmt
            .query_map(params![self.collection], |row| {
                let source_file: String = row.get(0)?;
                let chunk_index: i64 = row.get(1)?;
                let text: String = row.get(2)?;
                let embedding_bytes: Vec<u8> = row.get(3)?;
                Ok((source_file, chunk_index, text, embedding_bytes))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(source_file, chunk_index, text, bytes)| {
                let stored = bytes_to_embedding(&bytes);
                let distance = 1.0 - cosine_similarity(embedding, &stored);
                (
                    SourceRef {
                        source_file,
                        chunk_index,
                    },
                    text,
                    distance,
                )
            })
            .collect();

        scored.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        let mut result = IndexQueryResult::default();
        for (meta, text, distance) in scored {
            result.documents.push(text);
            result.metadatas.push(meta);
            result.distances.push(distance);
        }
        Ok(result)
    }

    /// Number of chunks in this collection
    pub fn len(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Whether this collection has no chunks
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Collection name this handle is scoped to
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// Convert f32 embedding to bytes for storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_roundtrip() {
        let original = vec![1.0f32, 2.0, 3.0, -1.5];
        let bytes = embedding_to_bytes(&original);
        let restored = bytes_to_embedding(&bytes);
        assert_eq!(original, restored);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![0.5f32, -0.25, 1.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_query_orders_by_ascending_distance() {
        let index = VectorIndex::open_in_memory("test").unwrap();
        index.insert_chunk("far.pdf", 0, "far text", &[0.0, 1.0]).unwrap();
        index
            .insert_chunk("near.pdf", 1, "near text", &[1.0, 0.05])
            .unwrap();
        index
            .insert_chunk("exact.pdf", 2, "exact text", &[1.0, 0.0])
            .unwrap();

        let result = index.query(&[1.0, 0.0], 4).unwrap();
        assert_eq!(result.documents.len(), 3);
        assert_eq!(result.metadatas[0].source_file, "exact.pdf");
        assert_eq!(result.metadatas[1].source_file, "near.pdf");
        assert_eq!(result.metadatas[2].source_file, "far.pdf");
        assert!(result.distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_query_truncates_to_n_results() {
        let index = VectorIndex::open_in_memory("test").unwrap();
        for i in 0..10 {
            index
                .insert_chunk("doc.pdf", i, "text", &[1.0, i as f32 * 0.1])
                .unwrap();
        }
        let result = index.query(&[1.0, 0.0], 4).unwrap();
        assert_eq!(result.documents.len(), 4);
        assert_eq!(result.metadatas.len(), 4);
        assert_eq!(result.distances.len(), 4);
    }

    #[test]
    fn test_collections_are_isolated() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("index.sqlite");

        let a = VectorIndex::open(&path, "a").unwrap();
        a.insert_chunk("doc.pdf", 0, "text a", &[1.0, 0.0]).unwrap();

        let b = VectorIndex::open(&path, "b").unwrap();
        b.insert_chunk("doc.pdf", 0, "text b", &[1.0, 0.0]).unwrap();

        assert_eq!(a.len().unwrap(), 1);
        let result = a.query(&[1.0, 0.0], 4).unwrap();
        assert_eq!(result.documents, vec!["text a".to_string()]);
    }

    #[test]
    fn test_insert_chunk_replaces_on_conflict() {
        let index = VectorIndex::open_in_memory("test").unwrap();
        index.insert_chunk("doc.pdf", 0, "old", &[1.0, 0.0]).unwrap();
        index.insert_chunk("doc.pdf", 0, "new", &[1.0, 0.0]).unwrap();
        assert_eq!(index.len().unwrap(), 1);
        let result = index.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(result.documents[0], "new");
    }
}
