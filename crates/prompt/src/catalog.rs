//! Built-in prompt templates.
//!
//! The two prompts the engine ships with: a grounded-answer prompt for
//! document questions and a SQL generation prompt for tabular questions.
//! Both are constructed through [`PromptTemplate`] so slot mistakes fail
//! loudly rather than producing half-rendered prompts.

use crate::template::PromptTemplate;
use docqa_core::AppResult;

const GROUNDED_ANSWER_BODY: &str = "\
You are a helpful assistant answering questions about a set of documents.

Use ONLY the context below to answer the question. Do not use outside
knowledge. If the context does not contain enough information to answer,
say so explicitly instead of guessing.

Context:
{{context}}

Question: {{question}}

Answer:";

const SQL_GENERATION_BODY: &str = "\
You are a SQL generator for SQLite. Given a table schema, sample rows,
and a question, produce exactly one SELECT statement that answers the
question.

Rules:
- Output ONLY the SQL statement, no prose, no explanation, no code fences.
- Exactly one statement. Never more than one.
- Read-only: SELECT only.
- Query the table named {{table}}.

Schema:
{{schema}}

Sample rows:
{{sample}}

Question: {{question}}

SQL:";

/// Prompt used to answer a question from retrieved document context.
///
/// Required slots: `question`, `context`.
pub fn grounded_answer() -> AppResult<PromptTemplate> {
    PromptTemplate::new("rag.answer", GROUNDED_ANSWER_BODY, &["question", "context"])
}

/// Prompt used to translate a natural-language question into SQL.
///
/// Required slots: `question`, `table`, `schema`, `sample`.
pub fn sql_generation() -> AppResult<PromptTemplate> {
    PromptTemplate::new(
        "sql.generate",
        SQL_GENERATION_BODY,
        &["question", "table", "schema", "sample"],
    )
}
