//! Load command handler.

use super::open_session;
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

/// Load a CSV file and show its inferred schema
#[derive(Args, Debug)]
pub struct LoadCommand {
    /// CSV file to load
    pub csv: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LoadCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let session = open_session(config)?;
        let table = session.load_csv(&self.csv)?;
        let schema = session.table_schema(&table)?;

        if self.json {
            let columns: Vec<serde_json::Value> = schema
                .iter()
                .map(|(name, ty)| serde_json::json!({ "name": name, "type": ty }))
                .collect();
            let output = serde_json::json!({
                "table": table,
                "columns": columns,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Loaded table '{}'", table);
            for (name, ty) in &schema {
                println!("  {} {}", name, ty);
            }
        }

        Ok(())
    }
}
