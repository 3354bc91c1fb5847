mod env;
mod gemini;
mod normalizer;
mod openrouter;
mod prompt_builder;
mod provider;
mod provider_registry;
mod response_parsing;
pub mod schema_validator;

pub use gemini::GeminiProvider;
pub use normalizer::ResponseNormalizer;
pub use openrouter::OpenRouterProvider;
pub use prompt_builder::{BuiltPrompt, PromptBuilder};
pub use provider::LlmProvider;
pub use provider_registry::ProviderRegistry;
