//! Offline ingestion of regulation text into the similarity index.
//!
//! Documents are plain text (`.txt` / `.md`) with pages separated by form
//! feeds, the layout text extraction tools produce. Every chunk is tagged
//! with the catalog regulation matching its file name. Ingestion writes the
//! index and must not run while a server is answering from it.

use crate::catalog::RegulationCatalog;
use crate::chunker;
use crate::embeddings::EmbeddingProvider;
use crate::index::SqliteIndex;
use crate::types::{IndexedChunk, IngestOptions, IngestStats, IngestedDocument};
use reglens_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Ingest a file or every supported file under a directory.
pub async fn ingest_path(
    path: &Path,
    index: &SqliteIndex,
    embedder: &dyn EmbeddingProvider,
    catalog: &RegulationCatalog,
    options: &IngestOptions,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    if !path.exists() {
        return Err(AppError::Config(format!(
            "Ingestion path does not exist: {:?}",
            path
        )));
    }

    if options.reset {
        tracing::info!("Resetting index before ingestion");
        index.reset()?;
    }

    let files = collect_files(path);
    let root = if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    };
    tracing::info!("Ingesting {} documents from {:?}", files.len(), path);

    let mut stats = IngestStats::default();

    for file in files {
        let text = match std::fs::read_to_string(&file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", file, e);
                continue;
            }
        };

        let source = source_name(root, &file);
        let document =
            ingest_document(&file, source, &text, index, embedder, catalog, options).await?;
        stats.chunks_count += document.chunks;
        stats.bytes_processed += text.len() as u64;
        stats.documents.push(document);
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingestion completed: {} documents, {} chunks, {} bytes in {:.2}s",
        stats.documents.len(),
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Supported files under `path`, sorted for a stable ingestion order.
fn collect_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort();
    files
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Path of `file` relative to the ingestion root, with `/` separators.
fn source_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        file.to_string_lossy().to_string()
    } else {
        parts.join("/")
    }
}

async fn ingest_document(
    file: &Path,
    source: String,
    text: &str,
    index: &SqliteIndex,
    embedder: &dyn EmbeddingProvider,
    catalog: &RegulationCatalog,
    options: &IngestOptions,
) -> AppResult<IngestedDocument> {
    // Tag by file name so folder names never pick the regulation
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source.clone());
    let regulation = catalog.tag_source(&file_name).to_string();

    tracing::debug!("Processing {} as {}", source, regulation);

    let pages = chunker::split_pages(text);

    let mut chunks = Vec::new();
    for (page, page_text) in pages.iter().enumerate() {
        for candidate in chunker::chunk_text(page_text, options.chunk_size, options.chunk_overlap) {
            chunks.push(IndexedChunk {
                id: chunk_id(&source, page as u32, candidate.position, &candidate.text),
                regulation: regulation.clone(),
                source: source.clone(),
                page: page as u32,
                position: candidate.position,
                text: candidate.text,
                embedding: Vec::new(),
            });
        }
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != chunks.len() {
        return Err(AppError::Retrieval(format!(
            "Embedding provider returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }
    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }

    // Re-ingesting a document replaces its previous chunks
    index.replace_source(&source, &chunks)?;

    if regulation == crate::catalog::UNKNOWN_REGULATION {
        tracing::warn!("{} matched no catalog regulation", source);
    }

    Ok(IngestedDocument {
        source,
        regulation,
        pages: pages.len() as u32,
        chunks: chunks.len() as u32,
    })
}

/// Content-hash identifier of a chunk.
fn chunk_id(source: &str, page: u32, position: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(position.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::types::SearchFilter;
    use tempfile::TempDir;

    fn options(reset: bool) -> IngestOptions {
        IngestOptions {
            chunk_size: 800,
            chunk_overlap: 200,
            reset,
        }
    }

    fn write_corpus(dir: &Path) {
        std::fs::write(
            dir.join("SR1107a1.txt"),
            "Cover page\u{000C}Model documentation should be detailed.\u{000C}Validation is ongoing.",
        )
        .unwrap();
        std::fs::write(dir.join("nist.ai.100-1.md"), "Govern, map, measure, manage.").unwrap();
        std::fs::write(dir.join("notes.txt"), "Internal meeting notes.").unwrap();
        std::fs::write(dir.join("scan.pdf"), "%PDF-1.7").unwrap();
    }

    #[tokio::test]
    async fn test_ingest_directory_tags_pages_and_regulations() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let index = SqliteIndex::open(&temp.path().join(".reglens/index.sqlite")).unwrap();
        let catalog = RegulationCatalog::builtin().unwrap();

        let stats = ingest_path(
            temp.path(),
            &index,
            &TrigramProvider::new(64),
            &catalog,
            &options(false),
        )
        .await
        .unwrap();

        assert_eq!(stats.documents.len(), 3);
        assert_eq!(stats.chunks_count, 5);

        let sr = stats
            .documents
            .iter()
            .find(|d| d.source == "SR1107a1.txt")
            .unwrap();
        assert_eq!(sr.regulation, "SR 11-7");
        assert_eq!(sr.pages, 3);

        let notes = stats.documents.iter().find(|d| d.source == "notes.txt").unwrap();
        assert_eq!(notes.regulation, "Unknown");

        let filter = SearchFilter::regulation("SR 11-7");
        let passages = index.query(&vec![0.0; 64], 10, Some(&filter)).unwrap();
        let mut pages: Vec<u32> = passages.iter().map(|p| p.page()).collect();
        pages.sort();
        assert_eq!(pages, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_reingest_replaces_document() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let index = SqliteIndex::open(&temp.path().join(".reglens/index.sqlite")).unwrap();
        let catalog = RegulationCatalog::builtin().unwrap();
        let embedder = TrigramProvider::new(64);

        ingest_path(temp.path(), &index, &embedder, &catalog, &options(false))
            .await
            .unwrap();
        std::fs::write(temp.path().join("SR1107a1.txt"), "Only one page now.").unwrap();
        ingest_path(
            &temp.path().join("SR1107a1.txt"),
            &index,
            &embedder,
            &catalog,
            &options(false),
        )
        .await
        .unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.chunks_count, 3);
    }

    #[tokio::test]
    async fn test_same_file_name_in_different_folders() {
        let temp = TempDir::new().unwrap();
        for folder in ["2011", "2021"] {
            let dir = temp.path().join("corpus").join(folder);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("SR1107a1.txt"), format!("Guidance issued in {}.", folder))
                .unwrap();
        }
        let index = SqliteIndex::open(&temp.path().join(".reglens/index.sqlite")).unwrap();
        let catalog = RegulationCatalog::builtin().unwrap();

        let stats = ingest_path(
            &temp.path().join("corpus"),
            &index,
            &TrigramProvider::new(64),
            &catalog,
            &options(false),
        )
        .await
        .unwrap();

        let sources: Vec<&str> = stats.documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["2011/SR1107a1.txt", "2021/SR1107a1.txt"]);
        assert!(stats.documents.iter().all(|d| d.regulation == "SR 11-7"));
        assert_eq!(index.stats().unwrap().chunks_count, 2);
    }

    #[test]
    fn test_source_name_is_relative_to_root() {
        let root = Path::new("/data/regs");
        assert_eq!(source_name(root, &root.join("sr/SR1107a1.txt")), "sr/SR1107a1.txt");
        assert_eq!(source_name(root, &root.join("notes.txt")), "notes.txt");
    }

    #[tokio::test]
    async fn test_reset_clears_index() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());
        let index = SqliteIndex::open(&temp.path().join(".reglens/index.sqlite")).unwrap();
        let catalog = RegulationCatalog::builtin().unwrap();
        let embedder = TrigramProvider::new(64);

        ingest_path(temp.path(), &index, &embedder, &catalog, &options(false))
            .await
            .unwrap();
        ingest_path(
            &temp.path().join("notes.txt"),
            &index,
            &embedder,
            &catalog,
            &options(true),
        )
        .await
        .unwrap();

        assert_eq!(index.stats().unwrap().chunks_count, 1);
    }

    #[tokio::test]
    async fn test_missing_path() {
        let temp = TempDir::new().unwrap();
        let index = SqliteIndex::open(&temp.path().join("index.sqlite")).unwrap();
        let result = ingest_path(
            &temp.path().join("nope"),
            &index,
            &TrigramProvider::new(8),
            &RegulationCatalog::builtin().unwrap(),
            &options(false),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_id_is_stable_and_distinct() {
        let a = chunk_id("sr1107.txt", 1, 0, "text");
        assert_eq!(a, chunk_id("sr1107.txt", 1, 0, "text"));
        assert_ne!(a, chunk_id("sr1107.txt", 2, 0, "text"));
        assert_eq!(a.len(), 64);
    }
}
