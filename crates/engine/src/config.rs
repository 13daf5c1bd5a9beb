//! Engine configuration.
//!
//! Tunables for the retrieval and SQL pipelines, derived from the
//! application configuration plus engine-specific defaults.

use docqa_core::AppConfig;

/// Embedding capability settings.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Provider identifier ("ollama", "mock")
    pub provider: String,

    /// Model identifier (e.g., "nomic-embed-text")
    pub model: String,

    /// Embedding vector dimension; fixed per model
    pub dimensions: usize,

    /// Optional custom endpoint URL
    pub endpoint: Option<String>,

    /// Bounded per-request timeout
    pub timeout_secs: u64,

    /// Bounded retry count before the caller's fallback applies
    pub retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: None,
            timeout_secs: 30,
            retries: 2,
        }
    }
}

/// Generation capability settings.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Provider identifier ("ollama", "mock")
    pub provider: String,

    /// Model identifier (e.g., "llama3.2")
    pub model: String,

    /// Optional custom endpoint URL
    pub endpoint: Option<String>,

    /// Bounded per-request timeout
    pub timeout_secs: u64,

    /// Sampling temperature for grounded answers
    pub answer_temperature: f32,

    /// Token ceiling for grounded answers
    pub answer_max_tokens: u32,

    /// Sampling temperature for SQL generation (lower than answers)
    pub sql_temperature: f32,

    /// Token ceiling for SQL generation
    pub sql_max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            endpoint: None,
            timeout_secs: 60,
            answer_temperature: 0.3,
            answer_max_tokens: 1024,
            sql_temperature: 0.1,
            sql_max_tokens: 500,
        }
    }
}

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,

    /// Chunk window size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Context budget for assembled retrieval context
    pub max_context_chars: usize,

    /// Default number of chunks to retrieve
    pub default_top_k: usize,

    /// Row ceiling applied when executing generated SQL
    pub max_result_rows: usize,

    /// Number of sample rows shown to the SQL generation prompt
    pub sample_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            chunk_size: 500,
            chunk_overlap: 50,
            max_context_chars: 8000,
            default_top_k: 4,
            max_result_rows: 500,
            sample_rows: 3,
        }
    }
}

impl EngineConfig {
    /// Derive engine configuration from the application configuration.
    pub fn from_app_config(app: &AppConfig) -> Self {
        let mut config = Self::default();

        config.embedding.provider = app.embedding_provider.clone();
        config.embedding.model = app.embedding_model.clone();
        config.embedding.dimensions = app.embedding_dimensions;
        config.embedding.endpoint = app.endpoint.clone();

        config.generation.provider = app.provider.clone();
        config.generation.model = app.model.clone();
        config.generation.endpoint = app.endpoint.clone();

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.generation.answer_temperature, 0.3);
        assert_eq!(config.generation.sql_temperature, 0.1);
        assert_eq!(config.max_result_rows, 500);
    }

    #[test]
    fn test_from_app_config() {
        let mut app = AppConfig::default();
        app.embedding_provider = "mock".to_string();
        app.embedding_dimensions = 384;
        app.provider = "mock".to_string();

        let config = EngineConfig::from_app_config(&app);
        assert_eq!(config.embedding.provider, "mock");
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.generation.provider, "mock");
    }
}
