use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::ProviderError;

use super::LlmProvider;
use super::env::{
    read_optional_api_key, read_env_var, read_timeout_from_env,
    resolve_timeout_with_global_fallback,
};
use super::prompt_builder::BuiltPrompt;
use super::response_parsing::truncate_message;

const PROVIDER_ID: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const JSON_RESPONSE_MIME_TYPE: &str = "application/json";

const ENV_API_KEY: &str = "QUIZMASTER_GEMINI_API_KEY";
const ENV_API_KEY_FALLBACK: &str = "GEMINI_API_KEY";
const ENV_BASE_URL: &str = "QUIZMASTER_GEMINI_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "QUIZMASTER_GEMINI_TIMEOUT_SECS";
const ENV_GLOBAL_TIMEOUT_SECS: &str = "QUIZMASTER_LLM_TIMEOUT_SECS";

const MISSING_KEY_MESSAGE: &str =
    "Gemini API key is not set (set QUIZMASTER_GEMINI_API_KEY or GEMINI_API_KEY)";

/// First-party Google Generative Language endpoint. Requests JSON
/// output via the response MIME type hint; the reply text still passes
/// through the normalizer like any other candidate's.
#[derive(Debug)]
pub struct GeminiProvider {
    api_key: Option<String>,
    api_base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(Some(api_key.into()), DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// A missing key is not a construction failure: the provider stays
    /// registered and reports `MissingCredential` per call, which the
    /// orchestrator recovers from by moving to the next candidate.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = read_optional_api_key(ENV_API_KEY, ENV_API_KEY_FALLBACK)?;
        let api_base_url = read_env_var(ENV_BASE_URL)?.unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let provider_timeout = read_timeout_from_env(ENV_TIMEOUT_SECS)?;
        let timeout = resolve_timeout_with_global_fallback(
            provider_timeout,
            || read_timeout_from_env(ENV_GLOBAL_TIMEOUT_SECS),
            DEFAULT_TIMEOUT,
        )?;
        Self::with_config(api_key, api_base_url, timeout)
    }

    pub fn with_config(
        api_key: Option<String>,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if let Some(api_key) = &api_key
            && api_key.trim().is_empty()
        {
            return Err(ProviderError::validation(
                "Gemini API key must not be blank when provided",
            ));
        }

        let api_base_url = api_base_url.into();
        if api_base_url.trim().is_empty() {
            return Err(ProviderError::validation(
                "Gemini API base URL must not be empty",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|err| {
            ProviderError::internal(format!("failed to create Gemini HTTP client: {err}"))
        })?;

        Ok(Self {
            api_key,
            api_base_url,
            client,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint_url(&self, model_id: &str) -> String {
        format!(
            "{}/v1beta/models/{model_id}:generateContent",
            self.api_base_url.trim_end_matches('/')
        )
    }

    fn build_request_payload(prompt: &BuiltPrompt) -> GeminiGenerateContentRequest {
        GeminiGenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: prompt.system.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.user.clone(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: JSON_RESPONSE_MIME_TYPE.to_string(),
            },
        }
    }
}

impl LlmProvider for GeminiProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn supports_model(&self, model_id: &str) -> bool {
        let model_id = model_id.trim();
        !model_id.is_empty() && model_id.starts_with("gemini-")
    }

    fn complete(&self, model_id: &str, prompt: &BuiltPrompt) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::missing_credential(MISSING_KEY_MESSAGE))?;

        let payload = Self::build_request_payload(prompt);
        let response = self
            .client
            .post(self.endpoint_url(model_id))
            .header("x-goog-api-key", api_key)
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
    let response: GeminiGenerateContentResponse =
        serde_json::from_str(response_body).map_err(|err| {
            ProviderError::invalid_response(format!("Gemini response decode failed: {err}"))
        })?;

    let joined_text = response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .map(|part| part.text.as_str())
        .collect::<Vec<_>>()
        .join("");

    if joined_text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(joined_text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiGenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    #[serde(default)]
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed_error = serde_json::from_str::<GeminiErrorEnvelope>(body).ok();
    let grpc_status = parsed_error
        .as_ref()
        .and_then(|envelope| envelope.error.as_ref())
        .and_then(|detail| detail.status.as_deref());

    if matches!(grpc_status, Some("UNAUTHENTICATED" | "PERMISSION_DENIED"))
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return ProviderError::Auth;
    }
    if matches!(grpc_status, Some("RESOURCE_EXHAUSTED")) || status == StatusCode::TOO_MANY_REQUESTS
    {
        return ProviderError::RateLimited;
    }
    if matches!(grpc_status, Some("DEADLINE_EXCEEDED"))
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::GATEWAY_TIMEOUT
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
        message: format!("Gemini API returned HTTP {status}: {message}"),
    }
}

fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout;
    }
    ProviderError::Transport {
        message: format!("Gemini transport error: {error}"),
    }
}
