use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorCategory {
    UserActionRequired,
    TemporaryFailure,
    InternalFailure,
}

/// Failure of a single provider call or of normalizing its output.
/// These never escape the orchestrator: each one drives continuation
/// to the next fallback candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("provider credential is missing: {message}")]
    MissingCredential { message: String },
    #[error("provider authentication failed")]
    Auth,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider request timed out")]
    Timeout,
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("provider returned an invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("provider transport failed: {message}")]
    Transport { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ProviderError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ProviderErrorCategory {
        match self {
            Self::Validation { .. } | Self::MissingCredential { .. } | Self::Auth => {
                ProviderErrorCategory::UserActionRequired
            }
            Self::RateLimited | Self::Timeout | Self::EmptyResponse | Self::Transport { .. } => {
                ProviderErrorCategory::TemporaryFailure
            }
            Self::InvalidResponse { .. } | Self::Internal { .. } => {
                ProviderErrorCategory::InternalFailure
            }
        }
    }

    pub fn is_recoverable_by_fallback(&self) -> bool {
        // Every per-candidate failure except programmer error is a
        // reason to try the next candidate rather than abort.
        !matches!(self, Self::Internal { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => {
                format!("Please review the quiz request settings: {message}")
            }
            Self::MissingCredential { message } => {
                format!("A provider API key is not configured: {message}")
            }
            Self::Auth => {
                "Authentication failed. Check your provider API key and configuration.".to_string()
            }
            Self::RateLimited => {
                "The provider is rate limiting requests. Please retry in a moment.".to_string()
            }
            Self::Timeout => "The provider did not respond in time. Please retry.".to_string(),
            Self::EmptyResponse => "The provider returned an empty reply.".to_string(),
            Self::InvalidResponse { message } => {
                format!("The provider returned an invalid response format: {message}")
            }
            Self::Transport { message } => {
                format!("Could not reach the provider service: {message}")
            }
            Self::Internal { message } => {
                format!("An internal error occurred while generating: {message}")
            }
        }
    }
}

/// Terminal outcome of a quiz request. Surfaced to the caller as a
/// plain descriptive message, never as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("quiz request is invalid: {message}")]
    InvalidRequest { message: String },
    #[error("all provider candidates failed: {detail}")]
    AllProvidersExhausted { detail: String },
}

impl QuizError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest { message } => {
                format!("Please correct the quiz request: {message}")
            }
            Self::AllProvidersExhausted { detail } => format!(
                "Could not generate a quiz: every configured provider failed. {detail}"
            ),
        }
    }
}
