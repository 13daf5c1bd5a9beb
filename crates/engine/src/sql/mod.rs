//! Natural-language-to-SQL pipeline.
//!
//! Translates a question about a loaded table into a single SQL statement,
//! walks the candidate through syntax and safety validation, and executes
//! it with a row ceiling. Rejection at any validation step is terminal:
//! a rejected candidate is never executed.

pub mod tabular;
pub mod validate;

pub use tabular::{SqliteTabularStore, StatementCheck, TabularStore};
pub use validate::RejectionReason;

use crate::config::EngineConfig;
use crate::types::TableRows;
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{sql_generation, vars, PromptTemplate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Terminal result of the pipeline.
#[derive(Debug, Clone)]
pub enum SqlOutcome {
    Executed { rows: TableRows, sql: String },
    Rejected { reason: RejectionReason, sql: String },
}

/// The NL-to-SQL pipeline.
pub struct SqlPipeline {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn TabularStore>,
    template: PromptTemplate,
    config: EngineConfig,
}

impl SqlPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn TabularStore>,
        config: EngineConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            llm,
            store,
            template: sql_generation()?,
            config,
        })
    }

    /// Answer a question against a loaded table.
    ///
    /// Remote generation failures propagate as errors; validation
    /// rejections are ordinary `SqlOutcome::Rejected` results.
    pub async fn run(&self, question: &str, table: &str) -> AppResult<SqlOutcome> {
        // The target table must exist before we spend a generation call
        if !self.store.tables()?.iter().any(|t| t == table) {
            return Ok(SqlOutcome::Rejected {
                reason: RejectionReason::UnknownTable(table.to_string()),
                sql: String::new(),
            });
        }

        let sql = self.generate_sql(question, table).await?;
        debug!("Generated SQL candidate: {}", sql);

        Ok(self.validate_and_execute(&sql))
    }

    /// Call the generation capability and clean its output.
    async fn generate_sql(&self, question: &str, table: &str) -> AppResult<String> {
        let schema = self.format_schema(table)?;
        let sample = self.format_sample(table)?;

        let prompt = self.template.render(&vars(&[
            ("question", question),
            ("table", table),
            ("schema", &schema),
            ("sample", &sample),
        ]))?;

        let request = LlmRequest::new(prompt, &self.config.generation.model)
            .with_temperature(self.config.generation.sql_temperature)
            .with_max_tokens(self.config.generation.sql_max_tokens);

        let timeout_secs = self.config.generation.timeout_secs;
        let response = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.llm.complete(&request),
        )
        .await
        .map_err(|_| AppError::GenerationTimeout(timeout_secs))??;

        Ok(validate::strip_formatting(&response.content))
    }

    /// Run a cleaned candidate through the validation state machine and,
    /// if it survives, execute it.
    fn validate_and_execute(&self, sql: &str) -> SqlOutcome {
        let rejected = |reason: RejectionReason| SqlOutcome::Rejected {
            reason,
            sql: sql.to_string(),
        };

        // One statement only
        let statements = validate::split_statements(sql);
        if statements.len() > 1 {
            return rejected(RejectionReason::MultipleStatements);
        }
        let statement = match statements.into_iter().next() {
            Some(s) => s,
            None => return rejected(RejectionReason::SyntaxError("Empty statement".to_string())),
        };

        // Syntax check via the engine's parser; a missing table is held
        // back so the safety check reports write attempts first
        let deferred_missing_table = match self.store.check_statement(&statement) {
            Ok(StatementCheck::Ok) => None,
            Ok(StatementCheck::MissingTable(table)) => Some(table),
            Ok(StatementCheck::ParseError(message)) => {
                return rejected(RejectionReason::SyntaxError(message));
            }
            Err(e) => return rejected(RejectionReason::ExecutionError(e.to_string())),
        };

        // Safety check
        if let Err(reason) = validate::check_safety(&statement) {
            return rejected(reason);
        }

        if let Some(table) = deferred_missing_table {
            return rejected(RejectionReason::UnknownTable(table));
        }

        // Execute with the row ceiling
        match self.store.execute(&statement, self.config.max_result_rows) {
            Ok(rows) => {
                info!("Executed generated SQL ({} rows)", rows.row_count);
                SqlOutcome::Executed {
                    rows,
                    sql: statement,
                }
            }
            Err(e) => rejected(RejectionReason::ExecutionError(e.to_string())),
        }
    }

    fn format_schema(&self, table: &str) -> AppResult<String> {
        let schema = self.store.schema(table)?;
        Ok(schema
            .iter()
            .map(|(col, ty)| format!("{} {}", col, ty))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn format_sample(&self, table: &str) -> AppResult<String> {
        let sample = self.store.sample(table, self.config.sample_rows)?;
        let mut lines = vec![sample.columns.join(", ")];
        for row in &sample.rows {
            lines.push(row.join(", "));
        }
        Ok(lines.join("\n"))
    }
}
