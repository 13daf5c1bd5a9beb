//! Core types for the query and answer engine.

use serde::{Deserialize, Serialize};

/// A chunk of extracted document text with its embedding.
///
/// Immutable once stored; owned by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier ("{source_file}:{chunk_index}")
    pub id: String,

    /// Originating file, relative to the indexed root where possible
    pub source_file: String,

    /// Position of this chunk within the source file
    pub chunk_index: u32,

    /// Chunk text content
    pub text: String,

    /// Embedding vector; dimension fixed per embedding model
    pub embedding: Vec<f32>,
}

impl Chunk {
    pub fn new(source_file: impl Into<String>, chunk_index: u32, text: impl Into<String>) -> Self {
        let source_file = source_file.into();
        Self {
            id: format!("{}:{}", source_file, chunk_index),
            source_file,
            chunk_index,
            text: text.into(),
            embedding: Vec::new(),
        }
    }

    /// Attach an embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// A chunk returned from similarity search with its score.
///
/// Results are ordered by descending similarity; ties keep insertion order.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
}

/// Which corpus a query addresses. Part of the cache key and analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryMode {
    Pdf,
    Csv,
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryMode::Pdf => write!(f, "pdf"),
            QueryMode::Csv => write!(f, "csv"),
        }
    }
}

/// Vector index statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total chunks in the store
    pub chunk_count: u32,

    /// Distinct source files represented
    pub doc_count: u32,
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexReport {
    pub files_indexed: u32,
    pub chunks_indexed: u32,

    /// Files that could not be read; reported, never fatal
    pub files_failed: Vec<String>,
}

/// A source citation attached to a grounded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_file: String,
    pub chunk_index: u32,
    pub score: f32,
}

/// Answer to a document question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfAnswer {
    /// Generated answer text
    pub answer: String,

    /// Chunks the answer was grounded on, in rank order
    pub sources: Vec<SourceRef>,

    /// Whether this answer was served from the query cache
    pub from_cache: bool,
}

/// Result rows from an executed SQL statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,

    /// Rows returned (after the ceiling was applied)
    pub row_count: usize,

    /// True when the row ceiling cut the result short
    pub truncated: bool,
}

/// Answer to a tabular question: either executed rows or a terminal
/// rejection from the validation state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CsvAnswer {
    Rows {
        rows: TableRows,
        /// The validated SQL that produced the rows
        sql: String,
        from_cache: bool,
    },
    Rejected {
        /// Human-readable rejection reason
        reason: String,
        /// The candidate statement that was rejected (post-cleanup)
        sql: String,
    },
}

impl CsvAnswer {
    /// Whether this answer carries executed rows.
    pub fn is_rows(&self) -> bool {
        matches!(self, CsvAnswer::Rows { .. })
    }
}
