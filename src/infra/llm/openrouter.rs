use std::collections::BTreeSet;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ProviderError;

use super::LlmProvider;
use super::env::{
    read_bool_env, read_env_var, read_optional_api_key, read_timeout_from_env,
    resolve_timeout_with_global_fallback,
};
use super::prompt_builder::BuiltPrompt;
use super::response_parsing::truncate_message;

const PROVIDER_ID: &str = "openrouter";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const ENV_API_KEY: &str = "QUIZMASTER_OPENROUTER_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "OPENROUTER_API_KEY";
const ENV_BASE_URL: &str = "QUIZMASTER_OPENROUTER_BASE_URL";
const ENV_MODELS: &str = "QUIZMASTER_OPENROUTER_MODELS";
const ENV_FETCH_MODELS: &str = "QUIZMASTER_OPENROUTER_FETCH_MODELS";
const ENV_TIMEOUT_SECS: &str = "QUIZMASTER_OPENROUTER_TIMEOUT_SECS";
const ENV_GLOBAL_TIMEOUT_SECS: &str = "QUIZMASTER_LLM_TIMEOUT_SECS";

const MISSING_KEY_MESSAGE: &str =
    "OpenRouter API key is not set (set QUIZMASTER_OPENROUTER_API_KEY or OPENROUTER_API_KEY)";

const DEFAULT_SUPPORTED_MODELS: &[&str] = &["google/gemini-2.0-flash-exp:free"];

/// Aggregator gateway exposing third-party models behind the uniform
/// chat-completions interface.
#[derive(Debug)]
pub struct OpenRouterProvider {
    api_key: Option<String>,
    api_base_url: String,
    client: Client,
    supported_models: BTreeSet<String>,
}

impl OpenRouterProvider {
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(
            Some(api_key.into()),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            default_supported_models(),
        )
    }

    /// A missing key is reported per call, not at construction, so the
    /// orchestrator can still fall through this candidate cleanly.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = read_optional_api_key(ENV_API_KEY, ENV_API_KEY_FALLBACK)?;
        let api_base_url =
            read_env_var(ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let supported_models = match read_env_var(ENV_MODELS)? {
            Some(value) => parse_supported_models(&value)?,
            None => default_supported_models(),
        };
        let provider_timeout = read_timeout_from_env(ENV_TIMEOUT_SECS)?;
        let timeout = resolve_timeout_with_global_fallback(
            provider_timeout,
            || read_timeout_from_env(ENV_GLOBAL_TIMEOUT_SECS),
            DEFAULT_TIMEOUT,
        )?;

        let mut provider = Self::with_config(api_key, api_base_url, timeout, supported_models)?;

        if read_bool_env(ENV_FETCH_MODELS)? {
            provider.refresh_models()?;
        }

        Ok(provider)
    }

    pub fn with_config(
        api_key: Option<String>,
        api_base_url: impl Into<String>,
        timeout: Duration,
        supported_models: Vec<String>,
    ) -> Result<Self, ProviderError> {
        if let Some(api_key) = &api_key
            && api_key.trim().is_empty()
        {
            return Err(ProviderError::validation(
                "OpenRouter API key must not be blank when provided",
            ));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(ProviderError::validation(
                "OpenRouter API base URL must not be empty",
            ));
        }

        let supported_models = normalize_supported_models(supported_models)?;

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            ProviderError::internal(format!("failed to create OpenRouter HTTP client: {err}"))
        })?;

        Ok(Self {
            api_key,
            api_base_url,
            client,
            supported_models,
        })
    }

    pub fn refresh_models(&mut self) -> Result<(), ProviderError> {
        self.supported_models = self.fetch_supported_models()?;
        Ok(())
    }

    pub fn supported_models(&self) -> Vec<String> {
        self.supported_models.iter().cloned().collect()
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn require_api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::missing_credential(MISSING_KEY_MESSAGE))
    }

    fn endpoint_url(&self) -> String {
        build_v1_url(&self.api_base_url, "chat/completions")
    }

    fn models_endpoint_url(&self) -> String {
        build_v1_url(&self.api_base_url, "models")
    }

    fn fetch_supported_models(&self) -> Result<BTreeSet<String>, ProviderError> {
        let api_key = self.require_api_key()?;
        let response = self
            .client
            .get(self.models_endpoint_url())
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        let decoded: OpenRouterModelsResponse =
            serde_json::from_str(&response_body).map_err(|err| {
                ProviderError::invalid_response(format!(
                    "OpenRouter models response decode failed: {err}"
                ))
            })?;

        let models = decoded
            .data
            .into_iter()
            .map(|model| model.id)
            .collect::<Vec<_>>();
        let normalized = models
            .into_iter()
            .filter_map(|model| non_empty_owned(&model))
            .collect::<BTreeSet<_>>();

        if normalized.is_empty() {
            return Err(ProviderError::invalid_response(
                "OpenRouter models response did not include any model IDs",
            ));
        }

        Ok(normalized)
    }

    fn build_request_payload(model_id: &str, prompt: &BuiltPrompt) -> ChatCompletionsRequest {
        ChatCompletionsRequest {
            model: model_id.to_string(),
            messages: vec![
                ChatMessageRequest {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessageRequest {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
        }
    }
}

impl LlmProvider for OpenRouterProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn supports_model(&self, model_id: &str) -> bool {
        let model_id = model_id.trim();
        !model_id.is_empty() && self.supported_models.contains(model_id)
    }

    fn complete(&self, model_id: &str, prompt: &BuiltPrompt) -> Result<String, ProviderError> {
        let api_key = self.require_api_key()?;
        let payload = Self::build_request_payload(model_id, prompt);

        let response = self
            .client
            .post(self.endpoint_url())
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        let response_body = response.text().map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_http_error(status, &response_body));
        }

        extract_reply_text(&response_body)
    }
}

fn extract_reply_text(response_body: &str) -> Result<String, ProviderError> {
    let response: ChatCompletionsResponse = serde_json::from_str(response_body).map_err(|err| {
        ProviderError::invalid_response(format!("OpenRouter response decode failed: {err}"))
    })?;

    let reply = response
        .choices
        .iter()
        .find_map(ChatChoice::extract_text)
        .ok_or(ProviderError::EmptyResponse)?;

    Ok(reply)
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessageRequest>,
}

#[derive(Debug, Serialize)]
struct ChatMessageRequest {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

impl ChatChoice {
    fn extract_text(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().and_then(non_empty_owned) {
            return Some(text);
        }

        let content = self.message.as_ref()?.content.as_ref()?;
        extract_message_content(content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterModelsResponse {
    #[serde(default)]
    data: Vec<OpenRouterModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterModelInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OpenRouterErrorEnvelope {
    #[serde(default)]
    error: Option<OpenRouterErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<Value>,
}

fn extract_message_content(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => non_empty_owned(text),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(extract_content_part_text)
                .collect::<String>();
            non_empty_owned(&joined)
        }
        _ => None,
    }
}

fn extract_content_part_text(part: &Value) -> Option<String> {
    match part {
        Value::String(text) => Some(text.to_string()),
        Value::Object(map) => map
            .get("text")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned),
        _ => None,
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed_error = serde_json::from_str::<OpenRouterErrorEnvelope>(body).ok();
    let error_type = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .and_then(|detail| detail.error_type.as_deref());
    let error_code = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .and_then(|detail| detail.code.as_ref())
        .and_then(Value::as_str);

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || matches!(error_type, Some("authentication_error"))
        || matches!(
            error_code,
            Some("invalid_api_key" | "invalid_authentication")
        )
    {
        return ProviderError::Auth;
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || matches!(error_type, Some("rate_limit_error" | "insufficient_quota"))
        || matches!(
            error_code,
            Some("rate_limit_exceeded" | "insufficient_quota")
        )
    {
        return ProviderError::RateLimited;
    }

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
        || matches!(error_type, Some("timeout" | "server_timeout"))
        || matches!(error_code, Some("request_timeout"))
    {
        return ProviderError::Timeout;
    }

    let message = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .map(|detail| detail.message.clone())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| truncate_message(body));

    ProviderError::Transport {
        message: format!("OpenRouter API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout;
    }

    ProviderError::Transport {
        message: format!("OpenRouter transport error: {error}"),
    }
}

fn non_empty_owned(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn default_supported_models() -> Vec<String> {
    DEFAULT_SUPPORTED_MODELS
        .iter()
        .map(|model| (*model).to_string())
        .collect()
}

fn normalize_supported_models(models: Vec<String>) -> Result<BTreeSet<String>, ProviderError> {
    let normalized = models
        .into_iter()
        .filter_map(|model| non_empty_owned(&model))
        .collect::<BTreeSet<_>>();

    if normalized.is_empty() {
        return Err(ProviderError::validation(
            "OpenRouter supported models must not be empty",
        ));
    }

    Ok(normalized)
}

fn parse_supported_models(value: &str) -> Result<Vec<String>, ProviderError> {
    let models = value
        .split(',')
        .filter_map(non_empty_owned)
        .collect::<Vec<_>>();

    if models.is_empty() {
        return Err(ProviderError::validation(
            "QUIZMASTER_OPENROUTER_MODELS must include at least one model ID",
        ));
    }

    Ok(models)
}

fn build_v1_url(api_base_url: &str, endpoint_path: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let endpoint_path = endpoint_path.trim_start_matches('/');

    if base.ends_with("/v1") {
        format!("{base}/{endpoint_path}")
    } else {
        format!("{base}/v1/{endpoint_path}")
    }
}
