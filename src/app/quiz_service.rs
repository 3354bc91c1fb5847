use std::thread;
use std::time::Duration;

use crate::domain::{ModelRef, ProviderError, Question, Quiz, QuizError, QuizRequest};
use crate::infra::llm::{BuiltPrompt, PromptBuilder, ProviderRegistry, ResponseNormalizer};

const MAX_ATTEMPT_PAUSE: Duration = Duration::from_secs(1);
const DEFAULT_ATTEMPT_PAUSE: Duration = Duration::from_millis(250);

/// How the orchestrator walks its candidate list. The pause keeps the
/// pipeline from hammering providers back to back; it is bounded so a
/// misconfiguration cannot stall the calling flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub attempt_pause: Duration,
    pub verification_enabled: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            attempt_pause: DEFAULT_ATTEMPT_PAUSE,
            verification_enabled: true,
        }
    }
}

impl FallbackPolicy {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.attempt_pause > MAX_ATTEMPT_PAUSE {
            return Err(ProviderError::validation(format!(
                "attempt_pause must be at most {}ms (got {}ms)",
                MAX_ATTEMPT_PAUSE.as_millis(),
                self.attempt_pause.as_millis()
            )));
        }
        Ok(())
    }
}

/// Two-stage quiz pipeline: drive the ordered candidate list for the
/// generation stage, then (best effort) for a verification stage that
/// reviews the generated set. Every per-candidate failure is recovered
/// locally; only exhaustion of the whole list is terminal.
pub struct QuizService {
    registry: ProviderRegistry,
    candidates: Vec<ModelRef>,
    normalizer: ResponseNormalizer,
    policy: FallbackPolicy,
}

impl QuizService {
    pub fn new(
        registry: ProviderRegistry,
        candidates: Vec<ModelRef>,
    ) -> Result<Self, ProviderError> {
        Self::with_policy(registry, candidates, FallbackPolicy::default())
    }

    pub fn with_policy(
        registry: ProviderRegistry,
        candidates: Vec<ModelRef>,
        policy: FallbackPolicy,
    ) -> Result<Self, ProviderError> {
        if candidates.is_empty() {
            return Err(ProviderError::validation(
                "candidate list must not be empty",
            ));
        }
        for candidate in &candidates {
            candidate.validate()?;
        }
        policy.validate()?;

        Ok(Self {
            registry,
            candidates,
            normalizer: ResponseNormalizer::new()?,
            policy,
        })
    }

    pub fn candidates(&self) -> &[ModelRef] {
        &self.candidates
    }

    /// Sole upward entry point. Returns a `Quiz` (possibly shorter than
    /// requested, possibly unverified) or a terminal error suitable for
    /// direct display.
    pub fn generate_quiz(&self, request: QuizRequest) -> Result<Quiz, QuizError> {
        request.validate().map_err(|error| match error {
            ProviderError::Validation { message } => QuizError::invalid_request(message),
            other => QuizError::invalid_request(other.to_string()),
        })?;

        let generation_prompt = PromptBuilder::build_generation(&request);
        let questions = self
            .run_stage("generation", &generation_prompt)
            .map_err(|attempts| QuizError::AllProvidersExhausted {
                detail: render_attempts(&attempts),
            })?;

        if !self.policy.verification_enabled {
            return Ok(Quiz::unverified(questions));
        }

        // Verification is best effort: any failure here degrades to the
        // stage-one result instead of discarding it.
        let verification_prompt = match PromptBuilder::build_verification(&request, &questions) {
            Ok(prompt) => prompt,
            Err(error) => {
                log::warn!("verification prompt could not be built: {error}");
                return Ok(Quiz::unverified(questions));
            }
        };

        match self.run_stage("verification", &verification_prompt) {
            Ok(verified) => Ok(Quiz::verified(verified)),
            Err(attempts) => {
                log::warn!(
                    "verification failed on all candidates ({}); returning unverified quiz",
                    render_attempts(&attempts)
                );
                Ok(Quiz::unverified(questions))
            }
        }
    }

    /// Walks the candidate list in order and returns the first reply
    /// that normalizes into a valid question list, or every recorded
    /// failure when the list is exhausted. Attempts are sequential so
    /// candidate ordering stays deterministic.
    fn run_stage(
        &self,
        stage: &str,
        prompt: &BuiltPrompt,
    ) -> Result<Vec<Question>, Vec<(ModelRef, ProviderError)>> {
        let mut attempts = Vec::new();

        for candidate in &self.candidates {
            if !attempts.is_empty() && !self.policy.attempt_pause.is_zero() {
                thread::sleep(self.policy.attempt_pause);
            }

            log::debug!("{stage} stage: trying candidate {candidate}");
            match self.attempt_candidate(candidate, prompt) {
                Ok(questions) => {
                    log::debug!(
                        "{stage} stage: candidate {candidate} produced {} questions",
                        questions.len()
                    );
                    return Ok(questions);
                }
                Err(error) => {
                    log::warn!("{stage} stage: candidate {candidate} failed: {error}");
                    attempts.push((candidate.clone(), error));
                }
            }
        }

        Err(attempts)
    }

    fn attempt_candidate(
        &self,
        candidate: &ModelRef,
        prompt: &BuiltPrompt,
    ) -> Result<Vec<Question>, ProviderError> {
        let provider = self
            .registry
            .resolve(&candidate.provider, &candidate.model)?;
        let raw = provider.complete(candidate.model.trim(), prompt)?;
        self.normalizer.try_normalize(&raw)
    }
}

fn render_attempts(attempts: &[(ModelRef, ProviderError)]) -> String {
    attempts
        .iter()
        .map(|(candidate, error)| format!("{candidate}: {error}"))
        .collect::<Vec<_>>()
        .join("; ")
}
