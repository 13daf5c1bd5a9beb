//! Document indexing: read, chunk, embed, upsert.

use crate::chunker::chunk_text;
use crate::config::EngineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::IndexReport;
use docqa_core::AppResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extensions picked up when walking a directory. Explicit file
/// arguments are indexed regardless of extension.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "text"];

/// Indexes extracted document text into the vector store.
pub struct Indexer {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: EngineConfig,
}

impl Indexer {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            embeddings,
            store,
            config,
        }
    }

    /// Index files and directories.
    ///
    /// Directories are walked recursively for text files. A file that
    /// fails to read is reported in the result and skipped; a chunk
    /// whose embedding fails is stored with a zero vector so the file
    /// still lands in the index.
    pub async fn index_documents(&self, paths: &[PathBuf]) -> AppResult<IndexReport> {
        let mut report = IndexReport::default();

        for path in collect_files(paths) {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let chunks_added = self.index_text(&path, &text).await?;
                    if chunks_added > 0 {
                        report.files_indexed += 1;
                        report.chunks_indexed += chunks_added;
                    }
                }
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    report.files_failed.push(path.display().to_string());
                }
            }
        }

        info!(
            "Indexed {} files ({} chunks, {} failed)",
            report.files_indexed,
            report.chunks_indexed,
            report.files_failed.len()
        );

        Ok(report)
    }

    async fn index_text(&self, path: &Path, text: &str) -> AppResult<u32> {
        let source_file = path.display().to_string();
        let chunks = chunk_text(
            &source_file,
            text,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );

        let mut stored = 0u32;
        for chunk in chunks {
            let embedding = match self.embeddings.embed(&chunk.text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!(
                        "Embedding failed for chunk {}, storing zero vector: {}",
                        chunk.id, e
                    );
                    vec![0.0; self.embeddings.dimensions()]
                }
            };

            self.store.upsert(&chunk.with_embedding(embedding))?;
            stored += 1;
        }

        Ok(stored)
    }
}

/// Expand path arguments: files pass through, directories are walked for
/// text files in a stable order.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut walked: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                })
                .collect();
            walked.sort();
            files.extend(walked);
        } else {
            files.push(path.clone());
        }
    }

    files
}
