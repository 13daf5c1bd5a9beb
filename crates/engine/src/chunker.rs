//! Text chunking with configurable size and overlap.

use crate::types::Chunk;

/// Chunk text into overlapping character windows.
///
/// Character-based, UTF-8 boundary safe. A window never splits a
/// multi-byte character.
pub fn chunk_text(source_file: &str, text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut chunk_index = 0u32;
    let mut start = 0;

    while start < text.len() {
        // Find valid UTF-8 boundary for end position
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let window = text[start..end].trim();
        if !window.is_empty() {
            chunks.push(Chunk::new(source_file, chunk_index, window));
            chunk_index += 1;
        }

        // Move forward by (chunk_size - overlap)
        let step = if chunk_size > overlap {
            chunk_size - overlap
        } else {
            chunk_size
        };

        // Find valid UTF-8 boundary for next start position
        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        source_file,
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
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text("doc.txt", &text, 200, 50);

        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[0].source_file, "doc.txt");
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("doc.txt", &text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_empty() {
        let chunks = chunk_text("doc.txt", "", 100, 10);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunk_text_overlap_carries_content() {
        let text = "abcdefghij".repeat(20);
        let chunks = chunk_text("doc.txt", &text, 50, 10);

        assert!(chunks.len() >= 2);
        // The last 10 chars of the first window reappear at the start of
        // the second window
        let first_tail: String = chunks[0].text.chars().rev().take(10).collect();
        let second_head: String = chunks[1].text.chars().take(10).collect();
        let first_tail: String = first_tail.chars().rev().collect();
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn test_chunk_text_multibyte_boundary() {
        // 3-byte chars; a window edge falling mid-char must back off
        let text = "é".repeat(400);
        let chunks = chunk_text("doc.txt", &text, 500, 50);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn test_chunk_text_shorter_than_window() {
        let chunks = chunk_text("doc.txt", "short text", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text");
    }
}
