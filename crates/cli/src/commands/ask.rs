//! Ask command handler.
//!
//! Answers one or more document questions in a single session, so
//! repeated questions demonstrate the query cache and the `--analytics`
//! flag has something to summarize.

use super::{open_session, print_analytics, VoteArg};
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_engine::QueryMode;

/// Ask questions about the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Questions to answer, in order
    #[arg(required = true)]
    pub questions: Vec<String>,

    /// Number of chunks to retrieve per question
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

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

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let session = open_session(config)?;

        for question in &self.questions {
            let answer = session.answer_pdf_question(question, self.top_k).await?;

            if self.json {
                let output = serde_json::json!({
                    "question": question,
                    "answer": answer.answer,
                    "fromCache": answer.from_cache,
                    "sources": answer.sources,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("Q: {}", question);
                println!("{}", answer.answer);
                if answer.from_cache {
                    println!("(cached)");
                }
                if !answer.sources.is_empty() {
                    println!("Sources:");
                    for source in &answer.sources {
                        println!(
                            "  {} (chunk {}) score {:.3}",
                            source.source_file, source.chunk_index, source.score
                        );
                    }
                }
                println!();
            }
        }

        if let Some(vote) = self.vote {
            if let Some(last) = self.questions.last() {
                session.submit_feedback(last, QueryMode::Pdf, vote.into());
            }
        }

        if self.analytics {
            print_analytics(&session);
        }

        Ok(())
    }
}
