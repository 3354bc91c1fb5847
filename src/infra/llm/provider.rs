use crate::domain::ProviderError;

use super::BuiltPrompt;

pub trait LlmProvider: std::fmt::Debug + Send + Sync {
    fn provider_id(&self) -> &str;

    fn supports_model(&self, model_id: &str) -> bool;

    /// Issues exactly one completion request and returns the raw reply
    /// text. No internal retries; candidate fallback belongs to the
    /// orchestrator. A missing credential must be reported without any
    /// network I/O.
    fn complete(&self, model_id: &str, prompt: &BuiltPrompt) -> Result<String, ProviderError>;
}
