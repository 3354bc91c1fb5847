use crate::domain::Question;
use crate::domain::ProviderError;

use super::response_parsing::extract_json_array;
use super::schema_validator::QuestionListSchemaValidator;

/// Converts raw provider text into a validated question list.
///
/// Policy: strict at batch level. One malformed entry rejects the whole
/// reply; a partially valid batch is never surfaced. All failures
/// resolve to `None` so nothing throws past this boundary.
pub struct ResponseNormalizer {
    validator: QuestionListSchemaValidator,
}

impl ResponseNormalizer {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            validator: QuestionListSchemaValidator::new()?,
        })
    }

    pub fn normalize(&self, raw: &str) -> Option<Vec<Question>> {
        match self.try_normalize(raw) {
            Ok(questions) => Some(questions),
            Err(error) => {
                log::debug!("response normalization failed: {error}");
                None
            }
        }
    }

    /// Same as `normalize` but keeps the failure reason, so the
    /// orchestrator can record it against the candidate that produced
    /// the text.
    pub fn try_normalize(&self, raw: &str) -> Result<Vec<Question>, ProviderError> {
        let payload = extract_json_array(raw).ok_or_else(|| {
            ProviderError::invalid_response("reply did not include a JSON array")
        })?;
        self.validator.validate_response_json(payload)
    }
}
