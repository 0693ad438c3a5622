//! SQLite-backed vector index for regulation chunks.
//!
//! Writes (ingestion) go through a read-write connection opened per call.
//! Searches open their own read-only connection, so any number of
//! concurrent queries can read the index without sharing a handle.

use crate::types::{IndexStats, IndexedChunk, Passage, RegulationCount, SearchFilter};
use chrono::{DateTime, Utc};
use reglens_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, Row, Transaction};
use std::path::{Path, PathBuf};

/// Handle to an on-disk similarity index.
#[derive(Debug, Clone)]
pub struct SqliteIndex {
    path: PathBuf,
}

impl SqliteIndex {
    /// Open (and create if needed) the index at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Retrieval(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                regulation TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                ingested_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_regulation ON chunks(regulation);
            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
            "#,
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Initialized SQLite index at {:?}", path);

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Open an existing index without creating it.
    pub fn open_existing(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Retrieval(format!(
                "No index at {:?}. Run 'reglens ingest' first.",
                path
            )));
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_connection(&self) -> AppResult<Connection> {
        Connection::open(&self.path)
            .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))
    }

    fn read_connection(&self) -> AppResult<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))
    }

    /// Insert or replace chunks in a single transaction.
    pub fn upsert_chunks(&self, chunks: &[IndexedChunk]) -> AppResult<usize> {
        let mut conn = self.write_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Retrieval(format!("Failed to begin transaction: {}", e)))?;

        insert_chunks(&tx, chunks)?;

        tx.commit()
            .map_err(|e| AppError::Retrieval(format!("Failed to commit chunks: {}", e)))?;

        Ok(chunks.len())
    }

    /// Swap a source document's chunks for `chunks` in one transaction.
    ///
    /// Every chunk must belong to `source`. On any failure the previous
    /// chunks stay in place.
    pub fn replace_source(&self, source: &str, chunks: &[IndexedChunk]) -> AppResult<usize> {
        let mut conn = self.write_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Retrieval(format!("Failed to begin transaction: {}", e)))?;

        let removed = tx
            .execute("DELETE FROM chunks WHERE source = ?1", params![source])
            .map_err(|e| AppError::Retrieval(format!("Failed to delete source: {}", e)))?;
        if let Some(stray) = chunks.iter().find(|c| c.source != source) {
            return Err(AppError::Retrieval(format!(
                "Chunk {} belongs to {}, not {}",
                stray.id, stray.source, source
            )));
        }

        insert_chunks(&tx, chunks)?;

        tx.commit()
            .map_err(|e| AppError::Retrieval(format!("Failed to commit chunks: {}", e)))?;

        tracing::debug!(
            "Replaced {} chunks of {} with {}",
            removed,
            source,
            chunks.len()
        );

        Ok(chunks.len())
    }

    /// Query the index for the top-k chunks most similar to `query_embedding`.
    ///
    /// With a filter only chunks whose regulation equals the filter value are
    /// considered. Equal scores keep insertion order.
    pub fn query(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<Vec<Passage>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.read_connection()?;

        let (sql, args): (&str, Vec<&dyn rusqlite::ToSql>) = match filter {
            Some(f) => (
                "SELECT regulation, source, page, text, embedding FROM chunks
                 WHERE regulation = ?1 ORDER BY rowid",
                vec![&f.regulation as &dyn rusqlite::ToSql],
            ),
            None => (
                "SELECT regulation, source, page, text, embedding FROM chunks ORDER BY rowid",
                vec![],
            ),
        };

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(args.as_slice(), |row| scored_passage(row, query_embedding))
            .map_err(|e| AppError::Retrieval(format!("Failed to query chunks: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            match row {
                Ok(passage) => results.push(passage),
                Err(e) => tracing::warn!("Skipping unreadable chunk: {}", e),
            }
        }

        // Stable sort keeps insertion order among equal scores
        results.sort_by(|a: &Passage, b: &Passage| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{}, filter: {:?})",
            results.len(),
            top_k,
            filter.map(|f| f.regulation.as_str())
        );

        Ok(results)
    }

    /// Get statistics for the index.
    pub fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.read_connection()?;

        let count = |sql: &str| -> AppResult<u64> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|v| v as u64)
                .map_err(|e| AppError::Retrieval(format!("Failed to count chunks: {}", e)))
        };

        let chunks_count = count("SELECT COUNT(*) FROM chunks")?;
        let sources_count = count("SELECT COUNT(DISTINCT source) FROM chunks")?;

        let mut stmt = conn
            .prepare(
                "SELECT regulation, COUNT(*) FROM chunks GROUP BY regulation ORDER BY regulation",
            )
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare stats: {}", e)))?;

        let by_regulation = stmt
            .query_map([], |row| {
                Ok(RegulationCount {
                    regulation: row.get(0)?,
                    chunks: row.get::<_, i64>(1)? as u64,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| AppError::Retrieval(format!("Failed to read stats: {}", e)))?;

        let last_ingested_at = conn
            .query_row("SELECT MAX(ingested_at) FROM chunks", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .map_err(|e| AppError::Retrieval(format!("Failed to read stats: {}", e)))?
            .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
            .map(|ts| ts.with_timezone(&Utc));

        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(IndexStats {
            sources_count,
            chunks_count,
            by_regulation,
            db_size_bytes,
            last_ingested_at,
        })
    }

    /// Reset the index (delete all chunks).
    pub fn reset(&self) -> AppResult<()> {
        let conn = self.write_connection()?;
        conn.execute("DELETE FROM chunks", [])
            .map_err(|e| AppError::Retrieval(format!("Failed to delete chunks: {}", e)))?;

        tracing::info!("Reset similarity index");
        Ok(())
    }
}

/// Map a row to a passage scored against `query_embedding`.
fn insert_chunks(tx: &Transaction<'_>, chunks: &[IndexedChunk]) -> AppResult<()> {
    let ingested_at = Utc::now().to_rfc3339();
    let mut stmt = tx
        .prepare(
            "INSERT OR REPLACE INTO chunks (id, regulation, source, page, position, text, embedding, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to prepare insert: {}", e)))?;

    for chunk in chunks {
        stmt.execute(params![
            chunk.id,
            chunk.regulation,
            chunk.source,
            chunk.page as i64,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(&chunk.embedding),
            ingested_at,
        ])
        .map_err(|e| AppError::Retrieval(format!("Failed to insert chunk: {}", e)))?;
    }

    Ok(())
}

fn scored_passage(row: &Row<'_>, query_embedding: &[f32]) -> rusqlite::Result<Passage> {
    let embedding_bytes: Vec<u8> = row.get(4)?;
    let embedding = bytes_to_embedding(&embedding_bytes).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Blob,
            "invalid embedding bytes length".into(),
        )
    })?;

    let passage = Passage::new(
        row.get::<_, String>(3)?,
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, i64>(2)? as u32,
    );

    Ok(passage.with_score(cosine_similarity(query_embedding, &embedding)))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Calculate cosine similarity between two vectors.
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
    use tempfile::TempDir;

    fn chunk(id: &str, regulation: &str, page: u32, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            id: id.to_string(),
            regulation: regulation.to_string(),
            source: format!("{}.txt", regulation),
            page,
            position: 0,
            text: format!("text of {}", id),
            embedding,
        }
    }

    fn seeded_index(temp: &TempDir) -> SqliteIndex {
        let index = SqliteIndex::open(&temp.path().join("index.sqlite")).unwrap();
        index
            .upsert_chunks(&[
                chunk("a", "SR 11-7", 3, vec![1.0, 0.0, 0.0]),
                chunk("b", "NIST AI RMF", 7, vec![0.9, 0.1, 0.0]),
                chunk("c", "SR 11-7", 4, vec![0.0, 1.0, 0.0]),
                chunk("d", "NIST AI RMF", 8, vec![1.0, 0.0, 0.0]),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_open_creates_table() {
        let temp = TempDir::new().unwrap();
        let index = SqliteIndex::open(&temp.path().join("nested/index.sqlite")).unwrap();
        assert!(index.path().exists());
        assert_eq!(index.stats().unwrap().chunks_count, 0);
    }

    #[test]
    fn test_open_existing_requires_file() {
        let temp = TempDir::new().unwrap();
        let err = SqliteIndex::open_existing(&temp.path().join("missing.sqlite")).unwrap_err();
        assert!(err.is_capability_failure());
    }

    #[test]
    fn test_query_ranks_by_similarity() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        let results = index.query(&[1.0, 0.0, 0.0], 3, None).unwrap();
        assert_eq!(results.len(), 3);
        // a and d tie at 1.0; insertion order decides
        assert_eq!(results[0].content, "text of a");
        assert_eq!(results[1].content, "text of d");
        assert_eq!(results[2].content, "text of b");
        assert!(results[0].score.unwrap() >= results[2].score.unwrap());
    }

    #[test]
    fn test_query_with_regulation_filter() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        let filter = SearchFilter::regulation("SR 11-7");
        let results = index.query(&[1.0, 0.0, 0.0], 5, Some(&filter)).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.regulation() == "SR 11-7"));
        assert_eq!(results[0].page(), 3);
    }

    #[test]
    fn test_query_filter_without_matches() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        let filter = SearchFilter::regulation("ISO 42001");
        assert!(index.query(&[1.0, 0.0, 0.0], 5, Some(&filter)).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);
        index
            .upsert_chunks(&[chunk("a", "SR 11-7", 3, vec![0.0, 0.0, 1.0])])
            .unwrap();

        assert_eq!(index.stats().unwrap().chunks_count, 4);
    }

    #[test]
    fn test_stats_by_regulation() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        let stats = index.stats().unwrap();
        assert_eq!(stats.chunks_count, 4);
        assert_eq!(stats.sources_count, 2);
        assert_eq!(
            stats.by_regulation,
            vec![
                RegulationCount {
                    regulation: "NIST AI RMF".to_string(),
                    chunks: 2
                },
                RegulationCount {
                    regulation: "SR 11-7".to_string(),
                    chunks: 2
                },
            ]
        );
        assert!(stats.last_ingested_at.is_some());
    }

    #[test]
    fn test_empty_replace_and_reset() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        assert_eq!(index.replace_source("SR 11-7.txt", &[]).unwrap(), 0);
        assert_eq!(index.stats().unwrap().chunks_count, 2);

        index.reset().unwrap();
        let stats = index.stats().unwrap();
        assert_eq!(stats.chunks_count, 0);
        assert!(stats.last_ingested_at.is_none());
    }

    #[test]
    fn test_replace_source_swaps_chunks() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        let replacement = chunk("e", "SR 11-7", 9, vec![0.0, 0.0, 1.0]);
        assert_eq!(index.replace_source("SR 11-7.txt", &[replacement]).unwrap(), 1);

        let filter = SearchFilter::regulation("SR 11-7");
        let passages = index.query(&[0.0, 0.0, 1.0], 10, Some(&filter)).unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].page(), 9);
        assert_eq!(index.stats().unwrap().chunks_count, 3);
    }

    #[test]
    fn test_failed_replace_keeps_previous_chunks() {
        let temp = TempDir::new().unwrap();
        let index = seeded_index(&temp);

        let stray = chunk("e", "NIST AI RMF", 1, vec![0.0, 0.0, 1.0]);
        assert!(index.replace_source("SR 11-7.txt", &[stray]).is_err());

        let filter = SearchFilter::regulation("SR 11-7");
        let passages = index.query(&[1.0, 0.0, 0.0], 10, Some(&filter)).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(index.stats().unwrap().chunks_count, 4);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_embedding_bytes() {
        let bytes = embedding_to_bytes(&[0.5, -1.25]);
        assert_eq!(bytes_to_embedding(&bytes), Some(vec![0.5, -1.25]));
        assert_eq!(bytes_to_embedding(&[0, 1, 2]), None);
    }
}
