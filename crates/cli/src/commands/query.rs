//! Query command handler.
//!
//! Loads a CSV table and answers questions against it via generated SQL.

use super::{open_session, print_analytics, VoteArg};
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_engine::{CsvAnswer, QueryMode, TableRows};
use std::path::PathBuf;

/// Ask questions about a CSV table via generated SQL
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// CSV file to load
    #[arg(long)]
    pub csv: PathBuf,

    /// Questions to answer, in order
    #[arg(required = true)]
    pub questions: Vec<String>,

    /// Vote on the last answer
    #[arg(long, value_enum)]
    pub vote: Option<VoteArg>,

    /// Print session analytics after answering
    #[arg(long)]
    pub analytics: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let session = open_session(config)?;
        let table = session.load_csv(&self.csv)?;

        tracing::info!("Loaded table '{}' from {}", table, self.csv.display());

        for question in &self.questions {
            let answer = session.answer_csv_question(question, &table).await?;

            if self.json {
                println!("{}", serde_json::to_string_pretty(&answer_json(question, &answer))?);
            } else {
                print_answer(question, &answer);
            }
        }

        if let Some(vote) = self.vote {
            if let Some(last) = self.questions.last() {
                session.submit_feedback(last, QueryMode::Csv, vote.into());
            }
        }

        if self.analytics {
            print_analytics(&session);
        }

        Ok(())
    }
}

fn answer_json(question: &str, answer: &CsvAnswer) -> serde_json::Value {
    match answer {
        CsvAnswer::Rows {
            rows,
            sql,
            from_cache,
        } => serde_json::json!({
            "question": question,
            "sql": sql,
            "fromCache": from_cache,
            "columns": rows.columns,
            "rows": rows.rows,
            "truncated": rows.truncated,
        }),
        CsvAnswer::Rejected { reason, sql } => serde_json::json!({
            "question": question,
            "rejected": reason,
            "sql": sql,
        }),
    }
}

fn print_answer(question: &str, answer: &CsvAnswer) {
    println!("Q: {}", question);
    match answer {
        CsvAnswer::Rows {
            rows,
            sql,
            from_cache,
        } => {
            println!("SQL: {}", sql);
            if *from_cache {
                println!("(cached)");
            }
            print_rows(rows);
        }
        CsvAnswer::Rejected { reason, sql } => {
            println!("Rejected: {}", reason);
            if !sql.is_empty() {
                println!("Candidate: {}", sql);
            }
        }
    }
    println!();
}

fn print_rows(rows: &TableRows) {
    println!("{}", rows.columns.join(" | "));
    for row in &rows.rows {
        println!("{}", row.join(" | "));
    }
    if rows.truncated {
        println!("... ({} rows shown, result truncated)", rows.row_count);
    }
}
