//! Retrieval type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A retrieved unit of regulatory text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Full text content
    pub content: String,

    /// Where the text came from
    pub metadata: PassageMetadata,

    /// Similarity to the query, when produced by a ranked search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Provenance of a passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    /// Canonical regulation name, or "Unknown"
    pub regulation: String,

    /// Source document identifier (file name)
    pub source: String,

    /// Page number within the source document (0-based)
    pub page: u32,
}

impl Passage {
    pub fn new(
        content: impl Into<String>,
        regulation: impl Into<String>,
        source: impl Into<String>,
        page: u32,
    ) -> Self {
        Self {
            content: content.into(),
            metadata: PassageMetadata {
                regulation: regulation.into(),
                source: source.into(),
                page,
            },
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn regulation(&self) -> &str {
        &self.metadata.regulation
    }

    pub fn page(&self) -> u32 {
        self.metadata.page
    }
}

/// Exact-match metadata filter for a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilter {
    pub regulation: String,
}

impl SearchFilter {
    pub fn regulation(name: impl Into<String>) -> Self {
        Self {
            regulation: name.into(),
        }
    }
}

/// A chunk ready to be stored in the index.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Content-hash identifier
    pub id: String,
    pub regulation: String,
    pub source: String,
    pub page: u32,
    /// Position of the chunk within its page
    pub position: u32,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCandidate {
    pub position: u32,
    pub text: String,
}

/// Chunk count for one regulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationCount {
    pub regulation: String,
    pub chunks: u64,
}

/// Statistics for the similarity index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub sources_count: u64,
    pub chunks_count: u64,
    /// Chunk counts per regulation, sorted by name
    pub by_regulation: Vec<RegulationCount>,
    pub db_size_bytes: u64,
    pub last_ingested_at: Option<DateTime<Utc>>,
}

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between chunks in characters
    pub chunk_overlap: usize,

    /// Clear the index before ingesting
    pub reset: bool,
}

/// Per-document outcome of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedDocument {
    pub source: String,
    pub regulation: String,
    pub pages: u32,
    pub chunks: u32,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub documents: Vec<IngestedDocument>,
    pub chunks_count: u32,
    pub bytes_processed: u64,
    pub duration_secs: f64,
}
