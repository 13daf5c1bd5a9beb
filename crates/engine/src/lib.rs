//! docqa Engine Library
//!
//! The query and answer engine over extracted documents and CSV tables:
//! - Chunking, embedding, and a SQLite-backed vector store
//! - Retrieval-augmented answer pipeline
//! - Natural-language-to-SQL pipeline with static validation
//! - In-process query cache keyed by normalized-query fingerprints
//! - Append-only feedback log with derived analytics
//! - The `QaSession` facade the CLI drives

pub mod analytics;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod indexing;
pub mod rag;
pub mod session;
pub mod sql;
pub mod store;
pub mod types;

pub use analytics::{AnalyticsSummary, FeedbackLog, ModeStats, QueryOutcome, Vote};
pub use cache::{CacheKey, QueryCache};
pub use config::EngineConfig;
pub use rag::NO_DOCUMENTS_ANSWER;
pub use session::QaSession;
pub use sql::{RejectionReason, SqliteTabularStore, TabularStore};
pub use store::{SqliteVectorStore, VectorStore};
pub use types::{
    Chunk, CsvAnswer, IndexReport, IndexStats, PdfAnswer, QueryMode, RetrievalHit, SourceRef,
    TableRows,
};
