mod errors;
mod quiz_contract;

pub use errors::{ProviderError, ProviderErrorCategory, QuizError};
pub use quiz_contract::{AnswerKey, ModelRef, Question, Quiz, QuizMode, QuizRequest};
