use jsonschema::JSONSchema;
use serde_json::Value;

use crate::domain::{ProviderError, Question};

pub const QUESTION_LIST_JSON_SCHEMA: &str = r#"
{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "array",
  "minItems": 1,
  "items": {
    "type": "object",
    "additionalProperties": false,
    "required": ["id", "question", "options", "answer", "explanation"],
    "properties": {
      "id": {
        "type": "integer",
        "minimum": 1
      },
      "question": {
        "type": "string",
        "minLength": 1
      },
      "options": {
        "type": "array",
        "minItems": 4,
        "maxItems": 4,
        "items": {
          "type": "string",
          "minLength": 1
        }
      },
      "answer": {
        "type": "string",
        "enum": ["A", "B", "C", "D"]
      },
      "explanation": {
        "type": "string"
      }
    }
  }
}
"#;

pub struct QuestionListSchemaValidator {
    compiled_schema: JSONSchema,
}

impl QuestionListSchemaValidator {
    pub fn new() -> Result<Self, ProviderError> {
        let schema: Value = serde_json::from_str(QUESTION_LIST_JSON_SCHEMA).map_err(|err| {
            ProviderError::internal(format!("invalid built-in question schema: {err}"))
        })?;
        let compiled_schema = JSONSchema::compile(&schema).map_err(|err| {
            ProviderError::internal(format!("failed to compile question schema: {err}"))
        })?;
        Ok(Self { compiled_schema })
    }

    pub fn validate_response_json(
        &self,
        response_json: &str,
    ) -> Result<Vec<Question>, ProviderError> {
        let json_value: Value = serde_json::from_str(response_json).map_err(|err| {
            ProviderError::invalid_response(format!("response JSON decode failed: {err}"))
        })?;
        self.validate_response_value(json_value)
    }

    pub fn validate_response_value(
        &self,
        response: Value,
    ) -> Result<Vec<Question>, ProviderError> {
        self.compiled_schema
            .validate(&response)
            .map_err(schema_validation_error)?;

        let questions: Vec<Question> = serde_json::from_value(response).map_err(|err| {
            ProviderError::invalid_response(format!(
                "response JSON did not match the question list contract: {err}"
            ))
        })?;

        // Keep domain-level rules as a second gate so validation behavior is centralized.
        for question in &questions {
            question.validate().map_err(|err| match err {
                ProviderError::Validation { message } => ProviderError::invalid_response(message),
                other => other,
            })?;
        }

        Ok(questions)
    }
}

fn schema_validation_error<'a, I>(errors: I) -> ProviderError
where
    I: IntoIterator<Item = jsonschema::ValidationError<'a>>,
{
    let details = errors
        .into_iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    ProviderError::invalid_response(format!("response schema validation failed: {details}"))
}
