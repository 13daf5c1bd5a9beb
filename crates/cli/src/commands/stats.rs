//! Stats command handler.

use super::open_session;
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};

/// Show vector index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let session = open_session(config)?;
        let stats = session.index_stats()?;

        if self.json {
            let output = serde_json::json!({
                "documents": stats.doc_count,
                "chunks": stats.chunk_count,
                "indexPath": config.index_path(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Index: {}", config.index_path().display());
            println!("  Documents: {}", stats.doc_count);
            println!("  Chunks:    {}", stats.chunk_count);
        }

        Ok(())
    }
}
