//! Generation provider factory.
//!
//! Creates generation clients based on application configuration.

use crate::client::LlmClient;
use crate::providers::{MockLlmClient, OllamaClient};
use docqa_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a generation client for the named provider.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "mock")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout_secs` - Bounded request timeout applied to every call
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout_secs: u64,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            let client = OllamaClient::with_base_url(base_url, timeout_secs)?;
            Ok(Arc::new(client))
        }
        "mock" => Ok(Arc::new(MockLlmClient::new())),
        _ => Err(AppError::Config(format!(
            "Unknown provider: {}. Supported: ollama, mock",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, 30);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), 30);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_mock_client() {
        let client = create_client("mock", None, 30);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().provider_name(), "mock");
    }

    #[test]
    fn test_unknown_provider() {
        let result = create_client("unknown", None, 30);
        assert!(result.is_err());
    }
}
