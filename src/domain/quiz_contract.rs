use serde::{Deserialize, Serialize};

use super::ProviderError;

pub const MIN_QUESTION_COUNT: u8 = 5;
pub const MAX_QUESTION_COUNT: u8 = 20;

// UPSC has run preliminary examinations since 1979; anything outside
// this window is a typo, not a paper.
const MIN_EXAM_YEAR: u16 = 1979;
const MAX_EXAM_YEAR: u16 = 2100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.provider.trim().is_empty() {
            return Err(ProviderError::validation("model provider must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(ProviderError::validation("model name must not be empty"));
        }
        Ok(())
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Mode-specific request fields. Which optional filter is meaningful is
/// decided by the variant, not by loosely typed extras.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QuizMode {
    Practice {
        #[serde(default)]
        subtopic: Option<String>,
    },
    PreviousYear {
        year: u16,
    },
}

impl QuizMode {
    pub fn validate(&self) -> Result<(), ProviderError> {
        match self {
            Self::Practice { subtopic } => {
                if let Some(subtopic) = subtopic
                    && subtopic.trim().is_empty()
                {
                    return Err(ProviderError::validation(
                        "subtopic must not be blank when provided",
                    ));
                }
                Ok(())
            }
            Self::PreviousYear { year } => {
                if !(MIN_EXAM_YEAR..=MAX_EXAM_YEAR).contains(year) {
                    return Err(ProviderError::validation(format!(
                        "year must be in {MIN_EXAM_YEAR}..={MAX_EXAM_YEAR} (got {year})"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// One user submission. Built entirely from user input and immutable
/// once constructed; a new request always replaces the prior quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    #[serde(flatten)]
    pub mode: QuizMode,
    pub language: String,
    pub question_count: u8,
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
}

impl QuizRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        self.mode.validate()?;
        if self.language.trim().is_empty() {
            return Err(ProviderError::validation("language must not be empty"));
        }
        if !(MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&self.question_count) {
            return Err(ProviderError::validation(format!(
                "question_count must be in {MIN_QUESTION_COUNT}..={MAX_QUESTION_COUNT} (got {})",
                self.question_count
            )));
        }
        if self.subject.trim().is_empty() {
            return Err(ProviderError::validation("subject must not be empty"));
        }
        if let Some(topic) = &self.topic
            && topic.trim().is_empty()
        {
            return Err(ProviderError::validation(
                "topic must not be blank when provided",
            ));
        }
        Ok(())
    }
}

/// Correct-option key. The type restricts the answer to the four valid
/// letters, so the option index can never fall outside 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerKey {
    A,
    B,
    C,
    D,
}

impl AnswerKey {
    pub fn option_index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub question: String,
    pub options: Vec<String>,
    pub answer: AnswerKey,
    pub explanation: String,
}

impl Question {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.question.trim().is_empty() {
            return Err(ProviderError::validation(format!(
                "question {} text must not be empty",
                self.id
            )));
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(ProviderError::validation(format!(
                "question {} must have exactly {OPTIONS_PER_QUESTION} options (got {})",
                self.id,
                self.options.len()
            )));
        }
        if self.options.iter().any(|option| option.trim().is_empty()) {
            return Err(ProviderError::validation(format!(
                "question {} options must not be blank",
                self.id
            )));
        }
        Ok(())
    }

    /// Text of the correct option. Safe to index because `validate`
    /// pins the option count and `AnswerKey` pins the index range.
    pub fn correct_option(&self) -> &str {
        &self.options[self.answer.option_index()]
    }
}

/// Final pipeline output. `verified` records whether the second-stage
/// review succeeded; a quiz shorter than the requested count is a
/// degraded-but-valid result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
    pub verified: bool,
}

impl Quiz {
    pub fn unverified(questions: Vec<Question>) -> Self {
        Self {
            questions,
            verified: false,
        }
    }

    pub fn verified(questions: Vec<Question>) -> Self {
        Self {
            questions,
            verified: true,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.questions.is_empty() {
            return Err(ProviderError::validation(
                "quiz must contain at least one question",
            ));
        }
        for question in &self.questions {
            question.validate()?;
        }
        Ok(())
    }
}
