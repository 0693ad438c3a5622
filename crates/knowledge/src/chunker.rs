//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Page separator emitted by text extraction tools.
pub const PAGE_BREAK: char = '\u{000C}';

/// Split a document into pages on form feeds.
///
/// Page numbers are the 0-based indices into the returned vector, so blank
/// pages are kept to preserve numbering.
pub fn split_pages(text: &str) -> Vec<&str> {
    text.split(PAGE_BREAK).collect()
}

/// Chunk text into overlapping segments.
///
/// Sizes are measured in bytes and every cut is moved back to a UTF-8
/// boundary. Chunks are trimmed; whitespace-only chunks are skipped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkCandidate> {
    if text.trim().is_empty() || chunk_size == 0 {
        return vec![];
    }

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            break;
        }

        let chunk = text[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(ChunkCandidate {
                position,
                text: chunk.to_string(),
            });
            position += 1;
        }

        if end == text.len() {
            break;
        }

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_keeps_blank_pages() {
        let pages = split_pages("one\u{000C}\u{000C}three");
        assert_eq!(pages, vec!["one", "", "three"]);
    }

    #[test]
    fn test_split_pages_without_breaks() {
        assert_eq!(split_pages("single page"), vec!["single page"]);
    }

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 200, 50);

        // starts at 0, 150, ..., 900; the last chunk is the 100-byte tail
        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[6].text.len(), 100);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text(&text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_short_text_single_chunk() {
        let chunks = chunk_text("  Model documentation.  ", 800, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Model documentation.");
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 100, 10).is_empty());
        assert!(chunk_text(" \n\t ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text(&text, 50, 10);

        let first_tail = &chunks[0].text[40..];
        let second_head = &chunks[1].text[..10];
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn test_chunk_text_utf8_boundaries() {
        let text = "é".repeat(300);
        let chunks = chunk_text(&text, 101, 20);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }
}
