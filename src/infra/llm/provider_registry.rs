use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::ProviderError;

use super::LlmProvider;

/// Maps provider identifiers to provider implementations so the
/// orchestrator can resolve a fallback candidate without branching on
/// provider names.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, provider: P) -> Result<(), ProviderError>
    where
        P: LlmProvider + 'static,
    {
        self.register_shared(Arc::new(provider))
    }

    pub fn register_shared(&mut self, provider: Arc<dyn LlmProvider>) -> Result<(), ProviderError> {
        let provider_id = provider.provider_id().trim();
        if provider_id.is_empty() {
            return Err(ProviderError::validation("provider_id must not be empty"));
        }
        if self.providers.contains_key(provider_id) {
            return Err(ProviderError::validation(format!(
                "provider '{provider_id}' is already registered"
            )));
        }

        self.providers.insert(provider_id.to_string(), provider);
        Ok(())
    }

    pub fn resolve(
        &self,
        provider_id: &str,
        model_id: &str,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider_id = provider_id.trim();
        if provider_id.is_empty() {
            return Err(ProviderError::validation("provider_id must not be empty"));
        }

        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(ProviderError::validation("model_id must not be empty"));
        }

        let provider = self.providers.get(provider_id).ok_or_else(|| {
            ProviderError::validation(format!("provider '{provider_id}' is not registered"))
        })?;

        if !provider.supports_model(model_id) {
            return Err(ProviderError::validation(format!(
                "model '{model_id}' is not supported by provider '{provider_id}'"
            )));
        }

        Ok(Arc::clone(provider))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderRegistry;
    use crate::domain::ProviderError;
    use crate::infra::llm::{BuiltPrompt, LlmProvider};

    #[derive(Debug)]
    struct FakeProvider {
        provider_id: &'static str,
        supported_models: &'static [&'static str],
    }

    impl LlmProvider for FakeProvider {
        fn provider_id(&self) -> &str {
            self.provider_id
        }

        fn supports_model(&self, model_id: &str) -> bool {
            self.supported_models.contains(&model_id)
        }

        fn complete(
            &self,
            _model_id: &str,
            _prompt: &BuiltPrompt,
        ) -> Result<String, ProviderError> {
            Ok(r#"[{"id":1,"question":"Q","options":["a","b","c","d"],"answer":"B","explanation":""}]"#.to_string())
        }
    }

    fn prompt() -> BuiltPrompt {
        BuiltPrompt {
            system: "system".to_string(),
            user: "user".to_string(),
        }
    }

    #[test]
    fn register_and_resolve_provider_for_model() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(FakeProvider {
                provider_id: "gemini",
                supported_models: &["gemini-2.0-flash"],
            })
            .expect("provider registration should succeed");

        let provider = registry
            .resolve("gemini", "gemini-2.0-flash")
            .expect("provider should resolve");
        let text = provider
            .complete("gemini-2.0-flash", &prompt())
            .expect("provider should complete");

        assert!(text.contains("\"answer\":\"B\""));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_rejects_unknown_provider() {
        let registry = ProviderRegistry::new();
        let error = registry
            .resolve("openrouter", "google/gemini-2.0-flash-exp:free")
            .expect_err("unknown provider should fail");

        assert!(matches!(
            error,
            ProviderError::Validation { message } if message == "provider 'openrouter' is not registered"
        ));
    }

    #[test]
    fn resolve_rejects_unsupported_model() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(FakeProvider {
                provider_id: "gemini",
                supported_models: &["gemini-2.0-flash"],
            })
            .expect("provider registration should succeed");

        let error = registry
            .resolve("gemini", "gemini-1.0-ultra")
            .expect_err("unsupported model should fail");

        assert!(matches!(
            error,
            ProviderError::Validation { message }
            if message == "model 'gemini-1.0-ultra' is not supported by provider 'gemini'"
        ));
    }

    #[test]
    fn register_rejects_duplicate_provider() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(FakeProvider {
                provider_id: "gemini",
                supported_models: &["gemini-2.0-flash"],
            })
            .expect("first registration should succeed");

        let error = registry
            .register(FakeProvider {
                provider_id: "gemini",
                supported_models: &["gemini-2.5-pro"],
            })
            .expect_err("duplicate registration should fail");

        assert!(matches!(
            error,
            ProviderError::Validation { message }
            if message == "provider 'gemini' is already registered"
        ));
    }
}
