use std::time::Duration;

use mockito::{Matcher, Server};
use quizmaster::app::{FallbackPolicy, QuizService};
use quizmaster::domain::{AnswerKey, ModelRef, ProviderError, QuizError, QuizMode, QuizRequest};
use quizmaster::infra::llm::schema_validator::QuestionListSchemaValidator;
use quizmaster::infra::llm::{
    GeminiProvider, LlmProvider, OpenRouterProvider, PromptBuilder, ProviderRegistry,
    ResponseNormalizer,
};
use serde_json::json;

fn practice_request() -> QuizRequest {
    QuizRequest {
        mode: QuizMode::Practice {
            subtopic: Some("Fundamental Rights".to_string()),
        },
        language: "English".to_string(),
        question_count: 5,
        subject: "Polity".to_string(),
        topic: Some("Indian Constitution".to_string()),
    }
}

fn questions_payload_json(ids: &[u32]) -> String {
    let entries = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "question": format!("Which article covers case {id}?"),
                "options": ["Article 14", "Article 19", "Article 21", "Article 32"],
                "answer": "C",
                "explanation": format!("Article 21 is the relevant provision for case {id}.")
            })
        })
        .collect::<Vec<_>>();
    serde_json::to_string(&entries).expect("fixture should serialize")
}

fn gemini_reply_body(reply_text: &str) -> String {
    json!({
        "candidates": [
            {
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": reply_text }
                    ]
                }
            }
        ]
    })
    .to_string()
}

fn openrouter_reply_body(reply_text: &str) -> String {
    json!({
        "id": "gen-01",
        "choices": [
            {
                "message": {
                    "role": "assistant",
                    "content": reply_text
                }
            }
        ]
    })
    .to_string()
}

#[test]
fn schema_contract_accepts_valid_question_array() {
    let validator = QuestionListSchemaValidator::new().expect("schema should compile");

    let questions = validator
        .validate_response_json(&questions_payload_json(&[1, 2]))
        .expect("valid payload should satisfy the schema contract");

    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].answer, AnswerKey::C);
    assert_eq!(questions[0].correct_option(), "Article 21");
}

#[test]
fn gemini_complete_succeeds_through_http_mock() {
    let mut server = Server::new();
    let fenced_reply = format!(
        "Here is your quiz:\n```json\n{}\n```\nGood luck!",
        questions_payload_json(&[1, 2, 3, 4, 5])
    );
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_header(
            "content-type",
            Matcher::Regex("application/json.*".to_string()),
        )
        .match_body(Matcher::Regex(
            "\"responseMimeType\"\\s*:\\s*\"application/json\"".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_reply_body(&fenced_reply))
        .create();

    let provider =
        GeminiProvider::with_config(Some("test-key".to_string()), server.url(), Duration::from_secs(2))
            .expect("provider should build");
    let prompt = PromptBuilder::build_generation(&practice_request());

    let raw = provider
        .complete("gemini-2.0-flash", &prompt)
        .expect("mocked response should parse");
    let questions = ResponseNormalizer::new()
        .expect("normalizer should build")
        .try_normalize(&raw)
        .expect("fenced reply should normalize");

    mock.assert();
    assert_eq!(questions.len(), 5);
    for question in &questions {
        question.validate().expect("question should be valid");
    }
}

#[test]
fn gemini_maps_rate_limit_http_error() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#)
        .create();

    let provider =
        GeminiProvider::with_config(Some("test-key".to_string()), server.url(), Duration::from_secs(2))
            .expect("provider should build");
    let prompt = PromptBuilder::build_generation(&practice_request());

    let error = provider
        .complete("gemini-2.0-flash", &prompt)
        .expect_err("429 should map to rate-limited error");

    mock.assert();
    assert!(matches!(error, ProviderError::RateLimited));
}

#[test]
fn openrouter_complete_succeeds_through_http_mock() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Regex(
            "\"model\"\\s*:\\s*\"google/gemini-2.0-flash-exp:free\"".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openrouter_reply_body(&questions_payload_json(&[1, 2, 3, 4, 5])))
        .create();

    let provider = OpenRouterProvider::with_config(
        Some("test-key".to_string()),
        server.url(),
        Duration::from_secs(2),
        vec!["google/gemini-2.0-flash-exp:free".to_string()],
    )
    .expect("provider should build");
    let prompt = PromptBuilder::build_generation(&practice_request());

    let raw = provider
        .complete("google/gemini-2.0-flash-exp:free", &prompt)
        .expect("mocked response should parse");

    mock.assert();
    assert!(raw.contains("Article 21"));
}

#[test]
fn openrouter_maps_auth_http_error() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":"invalid_api_key","message":"bad key"}}"#)
        .create();

    let provider = OpenRouterProvider::with_config(
        Some("test-key".to_string()),
        server.url(),
        Duration::from_secs(2),
        vec!["google/gemini-2.0-flash-exp:free".to_string()],
    )
    .expect("provider should build");
    let prompt = PromptBuilder::build_generation(&practice_request());

    let error = provider
        .complete("google/gemini-2.0-flash-exp:free", &prompt)
        .expect_err("401 should map to auth error");

    mock.assert();
    assert!(matches!(error, ProviderError::Auth));
}

#[test]
fn provider_registry_resolves_by_provider_and_model() {
    let provider = GeminiProvider::from_api_key("test-key").expect("provider should build");
    let mut registry = ProviderRegistry::new();
    registry
        .register(provider)
        .expect("provider registration should succeed");

    let resolved = registry
        .resolve("gemini", "gemini-2.0-flash")
        .expect("registered provider should resolve");

    assert_eq!(resolved.provider_id(), "gemini");
    assert!(
        registry.resolve("gemini", "gpt-5.2").is_err(),
        "unsupported model should not resolve"
    );
}

fn pipeline_service(
    gemini_url: &str,
    openrouter_url: &str,
    verification_enabled: bool,
) -> QuizService {
    let gemini =
        GeminiProvider::with_config(Some("g-key".to_string()), gemini_url, Duration::from_secs(2))
            .expect("gemini provider should build");
    let openrouter = OpenRouterProvider::with_config(
        Some("or-key".to_string()),
        openrouter_url,
        Duration::from_secs(2),
        vec!["google/gemini-2.0-flash-exp:free".to_string()],
    )
    .expect("openrouter provider should build");

    let mut registry = ProviderRegistry::new();
    registry
        .register(gemini)
        .expect("gemini registration should succeed");
    registry
        .register(openrouter)
        .expect("openrouter registration should succeed");

    QuizService::with_policy(
        registry,
        vec![
            ModelRef::new("gemini", "gemini-2.0-flash"),
            ModelRef::new("openrouter", "google/gemini-2.0-flash-exp:free"),
        ],
        FallbackPolicy {
            attempt_pause: Duration::ZERO,
            verification_enabled,
        },
    )
    .expect("service construction should succeed")
}

#[test]
fn pipeline_falls_back_to_openrouter_when_gemini_is_unavailable() {
    let mut gemini_server = Server::new();
    let gemini_mock = gemini_server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .with_status(503)
        .with_body(r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#)
        .expect(2)
        .create();

    let mut openrouter_server = Server::new();
    let openrouter_mock = openrouter_server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openrouter_reply_body(&questions_payload_json(&[1, 2, 3, 4, 5])))
        .expect(2)
        .create();

    let service = pipeline_service(&gemini_server.url(), &openrouter_server.url(), true);

    let quiz = service
        .generate_quiz(practice_request())
        .expect("fallback candidate should carry both stages");

    gemini_mock.assert();
    openrouter_mock.assert();
    assert_eq!(quiz.len(), 5);
    assert!(quiz.verified);
}

#[test]
fn pipeline_degrades_to_unverified_when_verification_stage_fails() {
    let mut gemini_server = Server::new();
    // First call (generation) succeeds, second call (verification) fails.
    let generation_mock = gemini_server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_body(Matcher::Regex("Generate exactly 5".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gemini_reply_body(&questions_payload_json(&[1, 2, 3, 4, 5])))
        .create();
    let verification_mock = gemini_server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_body(Matcher::Regex("Review the UPSC Prelims question set".to_string()))
        .with_status(503)
        .with_body(r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#)
        .create();

    let mut openrouter_server = Server::new();
    // The verification attempt lands here after Gemini fails, and fails too.
    let openrouter_mock = openrouter_server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body(r#"{"error":{"message":"internal"}}"#)
        .create();

    let service = pipeline_service(&gemini_server.url(), &openrouter_server.url(), true);

    let quiz = service
        .generate_quiz(practice_request())
        .expect("verification failure must not discard the generated quiz");

    generation_mock.assert();
    verification_mock.assert();
    openrouter_mock.assert();
    assert_eq!(quiz.len(), 5);
    assert!(!quiz.verified);
}

#[test]
fn pipeline_returns_terminal_error_when_every_candidate_fails() {
    let mut gemini_server = Server::new();
    let gemini_mock = gemini_server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .with_status(403)
        .with_body(r#"{"error":{"code":403,"message":"key revoked","status":"PERMISSION_DENIED"}}"#)
        .create();

    let mut openrouter_server = Server::new();
    let openrouter_mock = openrouter_server
        .mock("POST", "/v1/chat/completions")
        .with_status(408)
        .with_body(r#"{"error":{"code":"request_timeout","message":"timed out"}}"#)
        .create();

    let service = pipeline_service(&gemini_server.url(), &openrouter_server.url(), false);

    let error = service
        .generate_quiz(practice_request())
        .expect_err("both candidates failing should be terminal");

    gemini_mock.assert();
    openrouter_mock.assert();
    assert!(matches!(
        &error,
        QuizError::AllProvidersExhausted { detail }
        if detail.contains("gemini/gemini-2.0-flash")
            && detail.contains("openrouter/google/gemini-2.0-flash-exp:free")
    ));
}

#[test]
fn pipeline_skips_candidate_with_missing_credential_without_network_io() {
    // No Gemini server at all: a keyless provider must fail before any
    // request is built, so an unroutable base URL is never contacted.
    let gemini = GeminiProvider::with_config(None, "http://192.0.2.1:9", Duration::from_secs(2))
        .expect("keyless provider should build");

    let mut openrouter_server = Server::new();
    let openrouter_mock = openrouter_server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openrouter_reply_body(&questions_payload_json(&[1, 2, 3, 4, 5])))
        .create();
    let openrouter = OpenRouterProvider::with_config(
        Some("or-key".to_string()),
        openrouter_server.url(),
        Duration::from_secs(2),
        vec!["google/gemini-2.0-flash-exp:free".to_string()],
    )
    .expect("openrouter provider should build");

    let mut registry = ProviderRegistry::new();
    registry
        .register(gemini)
        .expect("gemini registration should succeed");
    registry
        .register(openrouter)
        .expect("openrouter registration should succeed");
    let service = QuizService::with_policy(
        registry,
        vec![
            ModelRef::new("gemini", "gemini-2.0-flash"),
            ModelRef::new("openrouter", "google/gemini-2.0-flash-exp:free"),
        ],
        FallbackPolicy {
            attempt_pause: Duration::ZERO,
            verification_enabled: false,
        },
    )
    .expect("service construction should succeed");

    let quiz = service
        .generate_quiz(practice_request())
        .expect("keyless primary should fall through to the gateway");

    openrouter_mock.assert();
    assert_eq!(quiz.len(), 5);
}
