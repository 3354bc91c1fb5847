use crate::domain::{ProviderError, Question, QuizMode, QuizRequest};

use super::schema_validator::QUESTION_LIST_JSON_SCHEMA;

const SYSTEM_PROMPT: &str = "You are a UPSC Prelims question setter. Follow all constraints and output strict JSON only.";

const GENERAL_TOPIC: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
}

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build_generation(request: &QuizRequest) -> BuiltPrompt {
        let mode = mode_name(&request.mode);
        let mode_template = mode_template(&request.mode);
        let details = render_details(request);

        let user = format!(
            "Act as a UPSC Prelims question expert and compose a quiz.

Quiz mode: {mode}
Mode-specific instruction:
{mode_template}

Question filters:
{details}

Language: {language}. Write every question, option, and explanation in this language.

Generate exactly {count} multiple-choice questions of strictly UPSC Prelims standard.

{json_contract}
Each array element must be an object with keys: id, question, options (exactly 4 strings), answer (one of \"A\", \"B\", \"C\", \"D\"), explanation.

Question list JSON schema:
{schema}",
            language = request.language,
            count = request.question_count,
            json_contract = json_output_contract(),
            schema = QUESTION_LIST_JSON_SCHEMA,
        );

        BuiltPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }

    pub fn build_verification(
        request: &QuizRequest,
        questions: &[Question],
    ) -> Result<BuiltPrompt, ProviderError> {
        let questions_json = serde_json::to_string_pretty(questions).map_err(|err| {
            ProviderError::internal(format!("failed to serialize questions for review: {err}"))
        })?;

        let user = format!(
            "Review the UPSC Prelims question set below for factual accuracy, for exactly one \
correct answer per question, and for {language} language conformance. Correct any entry that \
fails these checks and leave the rest unchanged.

{json_contract}
The array must keep the same schema as the input:
{schema}

Question set to review:
{questions_json}",
            language = request.language,
            json_contract = json_output_contract(),
            schema = QUESTION_LIST_JSON_SCHEMA,
        );

        Ok(BuiltPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        })
    }
}

fn mode_name(mode: &QuizMode) -> &'static str {
    match mode {
        QuizMode::Practice { .. } => "practice",
        QuizMode::PreviousYear { .. } => "previous_year",
    }
}

fn mode_template(mode: &QuizMode) -> &'static str {
    match mode {
        QuizMode::Practice { .. } => {
            "Create fresh practice questions that test conceptual understanding of the subject \
and topic. Mirror the analytical style of recent UPSC Prelims papers; avoid trivia recall."
        }
        QuizMode::PreviousYear { .. } => {
            "Reproduce questions as they were actually asked in the specified year's UPSC \
Prelims paper for this subject. Keep the original framing, difficulty, and option style."
        }
    }
}

fn json_output_contract() -> &'static str {
    "Return exactly one JSON array and nothing else. Do not output markdown fences, prose, comments, or trailing text."
}

fn render_details(request: &QuizRequest) -> String {
    let topic = request
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
        .unwrap_or(GENERAL_TOPIC);

    let mut details = format!("- subject: {}\n- topic: {topic}", request.subject.trim());

    match &request.mode {
        QuizMode::Practice { subtopic } => {
            let subtopic = subtopic
                .as_deref()
                .map(str::trim)
                .filter(|subtopic| !subtopic.is_empty())
                .unwrap_or(GENERAL_TOPIC);
            details.push_str(&format!("\n- subtopic: {subtopic}"));
        }
        QuizMode::PreviousYear { year } => {
            details.push_str(&format!("\n- year: {year}"));
        }
    }

    details
}
