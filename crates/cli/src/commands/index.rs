//! Index command handler.

use super::open_session;
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Index extracted document text into the vector store
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Files or directories of extracted text to index
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear the existing index first
    #[arg(long)]
    pub clear: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Indexing {} path(s)", self.paths.len());

        let session = open_session(config)?;

        if self.clear {
            session.clear_index()?;
        }

        let report = session.index_documents(&self.paths).await?;

        if self.json {
            let output = serde_json::json!({
                "filesIndexed": report.files_indexed,
                "chunksIndexed": report.chunks_indexed,
                "filesFailed": report.files_failed,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} files ({} chunks)",
                report.files_indexed, report.chunks_indexed
            );
            for failed in &report.files_failed {
                println!("  skipped (unreadable): {}", failed);
            }
        }

        Ok(())
    }
}
