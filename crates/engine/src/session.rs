//! Session facade over the engine.
//!
//! `QaSession` owns the capabilities (embedding, generation), the stores,
//! the query cache, and the feedback log, and exposes the operations the
//! CLI calls. All caching and analytics bookkeeping lives here so the
//! pipelines stay pure.

use crate::analytics::{AnalyticsSummary, FeedbackLog, QueryOutcome, Vote};
use crate::cache::{CacheKey, QueryCache};
use crate::config::EngineConfig;
use crate::embeddings::{self, EmbeddingProvider};
use crate::indexing::Indexer;
use crate::rag::RagPipeline;
use crate::sql::{SqlOutcome, SqlPipeline, SqliteTabularStore, TabularStore};
use crate::store::{SqliteVectorStore, VectorStore};
use crate::types::{CsvAnswer, IndexReport, IndexStats, PdfAnswer, QueryMode, TableRows};
use docqa_core::AppResult;
use docqa_llm::LlmClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Cached payload: a full document answer or executed rows plus the SQL
/// that produced them.
#[derive(Debug, Clone)]
enum CachedPayload {
    Pdf(PdfAnswer),
    Csv { rows: TableRows, sql: String },
}

/// One question-answering session.
pub struct QaSession {
    config: EngineConfig,
    tabular: Arc<SqliteTabularStore>,
    vector_store: Arc<dyn VectorStore>,
    indexer: Indexer,
    rag: RagPipeline,
    sql: SqlPipeline,
    cache: QueryCache<CachedPayload>,
    feedback: FeedbackLog,
}

impl QaSession {
    /// Open a session, creating providers from configuration.
    ///
    /// `index_path` of `None` keeps the vector index in memory.
    pub fn open(config: EngineConfig, index_path: Option<&Path>) -> AppResult<Self> {
        let embeddings = embeddings::create_provider(&config.embedding)?;
        let llm = docqa_llm::create_client(
            &config.generation.provider,
            config.generation.endpoint.as_deref(),
            config.generation.timeout_secs,
        )?;

        let vector_store: Arc<dyn VectorStore> = match index_path {
            Some(path) => Arc::new(SqliteVectorStore::open(path, config.embedding.dimensions)?),
            None => Arc::new(SqliteVectorStore::open_in_memory(
                config.embedding.dimensions,
            )?),
        };

        Self::with_components(config, embeddings, vector_store, llm)
    }

    /// Assemble a session from pre-built components. Used by tests and
    /// anywhere a capability needs substituting.
    pub fn with_components(
        config: EngineConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let tabular = Arc::new(SqliteTabularStore::new()?);

        let indexer = Indexer::new(embeddings.clone(), vector_store.clone(), config.clone());
        let rag = RagPipeline::new(
            embeddings,
            vector_store.clone(),
            llm.clone(),
            config.clone(),
        )?;
        let sql = SqlPipeline::new(llm, tabular.clone(), config.clone())?;

        Ok(Self {
            config,
            tabular,
            vector_store,
            indexer,
            rag,
            sql,
            cache: QueryCache::new(),
            feedback: FeedbackLog::new(),
        })
    }

    // --- Indexing and ingestion -----------------------------------------

    /// Index extracted document text files into the vector store.
    pub async fn index_documents(&self, paths: &[PathBuf]) -> AppResult<IndexReport> {
        self.indexer.index_documents(paths).await
    }

    /// Load a CSV file into the tabular store; returns the table name.
    pub fn load_csv(&self, path: &Path) -> AppResult<String> {
        self.tabular.load_csv(path)
    }

    /// Names of loaded tables.
    pub fn tables(&self) -> AppResult<Vec<String>> {
        TabularStore::tables(self.tabular.as_ref())
    }

    /// Column names and types for a loaded table.
    pub fn table_schema(&self, name: &str) -> AppResult<Vec<(String, String)>> {
        self.tabular.schema(name)
    }

    // --- Question answering ---------------------------------------------

    /// Answer a question from the indexed documents.
    pub async fn answer_pdf_question(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> AppResult<PdfAnswer> {
        let top_k = top_k.unwrap_or(self.config.default_top_k);
        let key = CacheKey::pdf(question, top_k);
        let started = Instant::now();

        if let Some(CachedPayload::Pdf(mut answer)) = self.cache.get(&key) {
            answer.from_cache = true;
            self.feedback.record(
                question,
                QueryMode::Pdf,
                QueryOutcome::Success,
                true,
                elapsed_ms(started),
            );
            return Ok(answer);
        }

        let result = self.rag.run(question, top_k).await;
        let latency = elapsed_ms(started);

        match result {
            Ok((answer, sources)) => {
                let answer = PdfAnswer {
                    answer,
                    sources,
                    from_cache: false,
                };
                // The empty-index answer is never cached; indexing during
                // the session must make the same question answerable
                if answer.answer != crate::rag::NO_DOCUMENTS_ANSWER {
                    self.cache.put(key, CachedPayload::Pdf(answer.clone()));
                }
                self.feedback.record(
                    question,
                    QueryMode::Pdf,
                    QueryOutcome::Success,
                    false,
                    latency,
                );
                Ok(answer)
            }
            Err(e) => {
                self.feedback.record(
                    question,
                    QueryMode::Pdf,
                    QueryOutcome::Failed(e.to_string()),
                    false,
                    latency,
                );
                Err(e)
            }
        }
    }

    /// Answer a question about a loaded table via generated SQL.
    pub async fn answer_csv_question(&self, question: &str, table: &str) -> AppResult<CsvAnswer> {
        let key = CacheKey::csv(question, table);
        let started = Instant::now();

        if let Some(CachedPayload::Csv { rows, sql }) = self.cache.get(&key) {
            self.feedback.record(
                question,
                QueryMode::Csv,
                QueryOutcome::Success,
                true,
                elapsed_ms(started),
            );
            return Ok(CsvAnswer::Rows {
                rows,
                sql,
                from_cache: true,
            });
        }

        let result = self.sql.run(question, table).await;
        let latency = elapsed_ms(started);

        match result {
            Ok(SqlOutcome::Executed { rows, sql }) => {
                self.cache.put(
                    key,
                    CachedPayload::Csv {
                        rows: rows.clone(),
                        sql: sql.clone(),
                    },
                );
                self.feedback.record(
                    question,
                    QueryMode::Csv,
                    QueryOutcome::Success,
                    false,
                    latency,
                );
                Ok(CsvAnswer::Rows {
                    rows,
                    sql,
                    from_cache: false,
                })
            }
            Ok(SqlOutcome::Rejected { reason, sql }) => {
                self.feedback.record(
                    question,
                    QueryMode::Csv,
                    QueryOutcome::Rejected(reason.label().to_string()),
                    false,
                    latency,
                );
                Ok(CsvAnswer::Rejected {
                    reason: reason.to_string(),
                    sql,
                })
            }
            Err(e) => {
                self.feedback.record(
                    question,
                    QueryMode::Csv,
                    QueryOutcome::Failed(e.to_string()),
                    false,
                    latency,
                );
                Err(e)
            }
        }
    }

    // --- Feedback and analytics -----------------------------------------

    /// Vote on the most recent answer to a query. Returns the updated
    /// record id, if any matched.
    pub fn submit_feedback(&self, query: &str, mode: QueryMode, vote: Vote) -> Option<u64> {
        let id = self.feedback.vote_latest(query, mode, vote);
        if id.is_none() {
            warn!("Feedback for unknown query: {}", query);
        }
        id
    }

    /// Aggregate analytics, recomputed from the log.
    pub fn analytics_summary(&self) -> AnalyticsSummary {
        self.feedback.summary()
    }

    // --- Maintenance ----------------------------------------------------

    /// Vector index statistics.
    pub fn index_stats(&self) -> AppResult<IndexStats> {
        self.vector_store.stats()
    }

    /// Remove every chunk from the vector index.
    pub fn clear_index(&self) -> AppResult<()> {
        self.vector_store.clear()
    }

    /// Number of cached query results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached query results.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::embeddings::MockProvider;
    use docqa_llm::MockLlmClient;

    const DIMS: usize = 384;

    fn mock_config() -> EngineConfig {
        EngineConfig {
            embedding: EmbeddingConfig {
                provider: "mock".to_string(),
                model: "trigram-v1".to_string(),
                dimensions: DIMS,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn session_with_mock_llm() -> (QaSession, Arc<MockLlmClient>) {
        let llm = Arc::new(MockLlmClient::new());
        let session = QaSession::with_components(
            mock_config(),
            Arc::new(MockProvider::new(DIMS)),
            Arc::new(SqliteVectorStore::open_in_memory(DIMS).unwrap()),
            llm.clone(),
        )
        .unwrap();
        (session, llm)
    }

    async fn index_fixture(session: &QaSession) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("policy.txt");
        std::fs::write(&file, "Refunds are issued within thirty days of purchase.").unwrap();
        session.index_documents(&[file]).await.unwrap();
    }

    fn load_orders(session: &QaSession) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "id,total\n1,10\n2,20\n").unwrap();
        session.load_csv(&path).unwrap();
    }

    #[tokio::test]
    async fn test_pdf_miss_then_hit() {
        let (session, llm) = session_with_mock_llm();
        index_fixture(&session).await;
        llm.push_text("Thirty days.");

        let first = session
            .answer_pdf_question("what is the refund window?", None)
            .await
            .unwrap();
        assert!(!first.from_cache);

        let second = session
            .answer_pdf_question("what is the refund window?", None)
            .await
            .unwrap();
        assert!(second.from_cache);
        assert_eq!(second.answer, first.answer);

        // One generation call total
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pdf_cache_normalization_invariant() {
        let (session, llm) = session_with_mock_llm();
        index_fixture(&session).await;
        llm.push_text("Thirty days.");

        session
            .answer_pdf_question("What is the Refund Window?", None)
            .await
            .unwrap();

        let hit = session
            .answer_pdf_question("  what is   the refund window? ", None)
            .await
            .unwrap();
        assert!(hit.from_cache);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pdf_different_top_k_misses() {
        let (session, llm) = session_with_mock_llm();
        index_fixture(&session).await;
        llm.push_text("answer one");
        llm.push_text("answer two");

        session
            .answer_pdf_question("same question", Some(1))
            .await
            .unwrap();
        let other = session
            .answer_pdf_question("same question", Some(2))
            .await
            .unwrap();

        assert!(!other.from_cache);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_csv_miss_then_hit() {
        let (session, llm) = session_with_mock_llm();
        load_orders(&session);
        llm.push_text("SELECT SUM(total) FROM orders");

        let first = session
            .answer_csv_question("total revenue", "orders")
            .await
            .unwrap();
        match &first {
            CsvAnswer::Rows { rows, from_cache, .. } => {
                assert!(!from_cache);
                assert_eq!(rows.rows[0][0], "30");
            }
            CsvAnswer::Rejected { reason, .. } => panic!("rejected: {}", reason),
        }

        let second = session
            .answer_csv_question("total revenue", "orders")
            .await
            .unwrap();
        match second {
            CsvAnswer::Rows { from_cache, .. } => assert!(from_cache),
            CsvAnswer::Rejected { reason, .. } => panic!("rejected: {}", reason),
        }
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_csv_rejection_not_cached() {
        let (session, llm) = session_with_mock_llm();
        load_orders(&session);
        llm.push_text("DROP TABLE orders");
        llm.push_text("SELECT COUNT(*) FROM orders");

        let rejected = session
            .answer_csv_question("count orders", "orders")
            .await
            .unwrap();
        assert!(!rejected.is_rows());
        assert_eq!(session.cache_len(), 0);

        // Same question again reaches the model and succeeds
        let retried = session
            .answer_csv_question("count orders", "orders")
            .await
            .unwrap();
        assert!(retried.is_rows());
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_analytics_three_queries_one_hit_one_upvote() {
        let (session, llm) = session_with_mock_llm();
        index_fixture(&session).await;
        load_orders(&session);
        llm.push_text("Thirty days.");
        llm.push_text("SELECT COUNT(*) FROM orders");

        session
            .answer_pdf_question("refund window?", None)
            .await
            .unwrap();
        session
            .answer_pdf_question("refund window?", None)
            .await
            .unwrap();
        session
            .answer_csv_question("how many orders", "orders")
            .await
            .unwrap();

        session.submit_feedback("refund window?", QueryMode::Pdf, Vote::Up);

        let summary = session.analytics_summary();
        assert_eq!(summary.total_queries, 3);
        assert!((summary.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.up_votes, 1);
        assert_eq!(summary.down_votes, 0);
        assert_eq!(summary.pdf.queries, 2);
        assert_eq!(summary.csv.queries, 1);
    }

    #[tokio::test]
    async fn test_empty_index_answer_not_cached() {
        use crate::rag::NO_DOCUMENTS_ANSWER;

        let (session, llm) = session_with_mock_llm();
        llm.push_text("Thirty days.");

        let before = session
            .answer_pdf_question("what is the refund window?", None)
            .await
            .unwrap();
        assert_eq!(before.answer, NO_DOCUMENTS_ANSWER);
        assert_eq!(session.cache_len(), 0);

        // Indexing mid-session makes the same question answerable
        index_fixture(&session).await;
        let after = session
            .answer_pdf_question("what is the refund window?", None)
            .await
            .unwrap();
        assert!(!after.from_cache);
        assert_eq!(after.answer, "Thirty days.");
    }

    #[tokio::test]
    async fn test_feedback_unknown_query() {
        let (session, _) = session_with_mock_llm();
        assert!(session
            .submit_feedback("never asked", QueryMode::Pdf, Vote::Up)
            .is_none());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_fresh_answer() {
        let (session, llm) = session_with_mock_llm();
        index_fixture(&session).await;
        llm.push_text("first");
        llm.push_text("second");

        session.answer_pdf_question("q", None).await.unwrap();
        assert_eq!(session.cache_len(), 1);

        session.clear_cache();
        assert_eq!(session.cache_len(), 0);

        let fresh = session.answer_pdf_question("q", None).await.unwrap();
        assert!(!fresh.from_cache);
        assert_eq!(fresh.answer, "second");
    }

    #[tokio::test]
    async fn test_index_stats_and_clear() {
        let (session, _) = session_with_mock_llm();
        index_fixture(&session).await;

        let stats = session.index_stats().unwrap();
        assert_eq!(stats.doc_count, 1);
        assert!(stats.chunk_count >= 1);

        session.clear_index().unwrap();
        assert_eq!(session.index_stats().unwrap().chunk_count, 0);
    }

    #[tokio::test]
    async fn test_failed_generation_recorded_in_analytics() {
        use docqa_llm::MockReply;

        let (session, llm) = session_with_mock_llm();
        index_fixture(&session).await;
        llm.push_reply(MockReply::Unavailable("down".to_string()));

        let result = session.answer_pdf_question("q", None).await;
        assert!(result.is_err());

        let summary = session.analytics_summary();
        assert_eq!(summary.total_queries, 1);
        assert_eq!(summary.pdf.successes, 0);
    }
}
