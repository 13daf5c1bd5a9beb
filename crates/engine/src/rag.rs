//! Retrieval-augmented answer pipeline.
//!
//! Embeds the question, retrieves the nearest chunks, assembles a bounded
//! context, and asks the generation capability for an answer grounded in
//! that context alone.

use crate::config::EngineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::{RetrievalHit, SourceRef};
use docqa_core::{AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest};
use docqa_prompt::{grounded_answer, vars, PromptTemplate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Answer given when the vector store holds no chunks. A recognized
/// response, not an error.
pub const NO_DOCUMENTS_ANSWER: &str =
    "No documents have been indexed yet. Index some documents and ask again.";

/// The retrieval-augmented answer pipeline.
pub struct RagPipeline {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    template: PromptTemplate,
    config: EngineConfig,
}

impl RagPipeline {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
        config: EngineConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            embeddings,
            store,
            llm,
            template: grounded_answer()?,
            config,
        })
    }

    /// Answer a question from the indexed documents.
    ///
    /// Embedding failure degrades to a zero query vector rather than
    /// aborting; generation failure propagates once, with no retry.
    pub async fn run(&self, question: &str, top_k: usize) -> AppResult<(String, Vec<SourceRef>)> {
        if self.store.stats()?.chunk_count == 0 {
            return Ok((NO_DOCUMENTS_ANSWER.to_string(), vec![]));
        }

        let query_embedding = match self.embeddings.embed(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding failed, degrading to zero vector: {}", e);
                vec![0.0; self.embeddings.dimensions()]
            }
        };

        let hits = self.store.search(&query_embedding, top_k)?;
        debug!("Retrieved {} chunks for question", hits.len());

        let context = assemble_context(&hits, self.config.max_context_chars);
        let sources: Vec<SourceRef> = hits
            .iter()
            .take(context.chunks_used)
            .map(|hit| SourceRef {
                source_file: hit.chunk.source_file.clone(),
                chunk_index: hit.chunk.chunk_index,
                score: hit.score,
            })
            .collect();

        let prompt = self.template.render(&vars(&[
            ("question", question),
            ("context", &context.text),
        ]))?;

        let request = LlmRequest::new(prompt, &self.config.generation.model)
            .with_temperature(self.config.generation.answer_temperature)
            .with_max_tokens(self.config.generation.answer_max_tokens);

        let timeout_secs = self.config.generation.timeout_secs;
        let response = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.llm.complete(&request),
        )
        .await
        .map_err(|_| AppError::GenerationTimeout(timeout_secs))??;

        Ok((response.content.trim().to_string(), sources))
    }
}

struct AssembledContext {
    text: String,
    chunks_used: usize,
}

/// Join hits into a tagged context, stopping before the character budget
/// is exceeded. Hits arrive in rank order, so the lowest-ranked are the
/// ones dropped. The top hit is always included.
fn assemble_context(hits: &[RetrievalHit], max_chars: usize) -> AssembledContext {
    let mut text = String::new();
    let mut chunks_used = 0;

    for hit in hits {
        let block = format!(
            "[{} (chunk {})]\n{}",
            hit.chunk.source_file, hit.chunk.chunk_index, hit.chunk.text
        );

        let separator = if text.is_empty() { 0 } else { 2 };
        if chunks_used > 0 && text.len() + separator + block.len() > max_chars {
            break;
        }

        if chunks_used > 0 {
            text.push_str("\n\n");
        }
        text.push_str(&block);
        chunks_used += 1;
    }

    AssembledContext { text, chunks_used }
}
