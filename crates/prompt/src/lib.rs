//! docqa Prompt Library
//!
//! Structured prompt templates:
//! - `PromptTemplate` with named slots, validated at construction
//! - Handlebars rendering with escaping disabled
//! - Built-in grounded-answer and SQL generation prompts

pub mod catalog;
pub mod template;

pub use catalog::{grounded_answer, sql_generation};
pub use template::{vars, PromptTemplate};
