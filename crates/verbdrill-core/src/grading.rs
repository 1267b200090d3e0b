//! Answer grading.
//!
//! A submission is checked deterministically first (expand → normalize →
//! membership). Only on a mismatch is the equivalence oracle consulted, and
//! any oracle failure degrades to the deterministic verdict.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DrillError, Result};
use crate::model::{AttemptKey, ExerciseDirection, Grade, GradeMethod, Verb};
use crate::normalize::{normalize, normalized_variants};
use crate::traits::{EquivalenceOracle, JudgeRequest, RecordStore};

pub const CORRECT_FEEDBACK: &str = "Correct!";
pub const MALFORMED_TENSE_FEEDBACK: &str =
    "Please provide both past tense and past participle separated by a comma.";
pub const HINT_USED_FEEDBACK: &str =
    "You got a hint for this exercise; this attempt will not count as correct.";

/// Outcome of the deterministic comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// The normalized answer equals a normalized reference variant.
    Match,
    /// No match; the oracle may still accept it.
    Mismatch,
    /// No match and the answer is final (tense forms are exact).
    Rejected,
    /// The answer does not have the required shape.
    Malformed,
    /// The verb has no reference for this direction.
    NoReference,
}

/// Compare an answer against a verb without side effects.
pub fn assess(verb: &Verb, direction: ExerciseDirection, raw_answer: &str) -> Assessment {
    match direction {
        ExerciseDirection::VerbToMeaning => {
            membership(&normalized_variants(&verb.meanings), raw_answer)
        }
        ExerciseDirection::MeaningToVerb => {
            membership(&normalized_variants(&[verb.infinitive.as_str()]), raw_answer)
        }
        ExerciseDirection::TenseProduction => {
            let Some((past, participle)) = verb.tense_forms() else {
                return Assessment::NoReference;
            };
            let parts: Vec<&str> = raw_answer.split(',').collect();
            let [user_past, user_participle] = parts.as_slice() else {
                return Assessment::Malformed;
            };
            let user_past = normalize(user_past);
            let user_participle = normalize(user_participle);
            if user_past.is_empty() || user_participle.is_empty() {
                return Assessment::Malformed;
            }
            if user_past == normalize(past) && user_participle == normalize(participle) {
                Assessment::Match
            } else {
                Assessment::Rejected
            }
        }
    }
}

fn membership(
    variants: &std::collections::HashSet<String>,
    raw_answer: &str,
) -> Assessment {
    let answer = normalize(raw_answer);
    if !answer.is_empty() && variants.contains(&answer) {
        Assessment::Match
    } else {
        Assessment::Mismatch
    }
}

/// The reference answer shown to the learner.
pub fn canonical_answer(verb: &Verb, direction: ExerciseDirection) -> String {
    match direction {
        ExerciseDirection::VerbToMeaning => verb.joined_meanings(),
        ExerciseDirection::MeaningToVerb => verb.infinitive.clone(),
        ExerciseDirection::TenseProduction => match verb.tense_forms() {
            Some((past, participle)) => format!("{past}, {participle}"),
            None => String::new(),
        },
    }
}

/// Description of the expected answer for the oracle.
pub fn reference_description(verb: &Verb, direction: ExerciseDirection) -> String {
    match direction {
        ExerciseDirection::VerbToMeaning => format!(
            "the Norwegian verb \"{}\", whose acceptable English meanings are: {}",
            verb.infinitive,
            verb.meaning_variants().join(", ")
        ),
        ExerciseDirection::MeaningToVerb => format!(
            "the English meaning \"{}\", whose Norwegian verb is \"{}\"",
            verb.joined_meanings(),
            verb.infinitive
        ),
        ExerciseDirection::TenseProduction => format!(
            "the past tense and past participle of \"{}\": {}",
            verb.infinitive,
            canonical_answer(verb, direction)
        ),
    }
}

fn incorrect_feedback(verb: &Verb, canonical: &str) -> String {
    let mut feedback = format!("Incorrect. The correct answer is: {canonical}");
    if let Some(mnemonic) = verb.mnemonic.as_deref().filter(|m| !m.trim().is_empty()) {
        feedback.push_str(&format!(" Mnemonic: {mnemonic}"));
    }
    feedback
}

/// Grades submissions and records the outcome.
pub struct Grader {
    store: Arc<dyn RecordStore>,
    oracle: Option<Arc<dyn EquivalenceOracle>>,
    oracle_timeout: Duration,
}

impl Grader {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            oracle: None,
            oracle_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn EquivalenceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Grade a submission for `user_id` and update their attempt record.
    pub async fn grade(
        &self,
        user_id: Uuid,
        verb_id: &str,
        raw_answer: &str,
        direction: ExerciseDirection,
    ) -> Result<Grade> {
        let verb = self
            .store
            .find_verb(verb_id)
            .await?
            .ok_or_else(|| DrillError::VerbNotFound {
                id: verb_id.to_string(),
            })?;

        let now = Utc::now();
        let hint_used = self.store.hint_marker_active(user_id, verb_id, now).await?;

        let canonical = canonical_answer(&verb, direction);
        let grade = if hint_used {
            Grade {
                is_correct: false,
                feedback: format!("{HINT_USED_FEEDBACK} The correct answer is: {canonical}"),
                canonical_answer: canonical,
                method: GradeMethod::HintUsed,
            }
        } else {
            self.evaluate(&verb, direction, raw_answer, canonical).await
        };

        let key = AttemptKey {
            user_id,
            verb_id: verb.id.clone(),
            direction,
        };
        let record = self.store.record_attempt(&key, grade.is_correct, now).await?;
        if hint_used {
            self.store.clear_hint_marker(user_id, verb_id).await?;
        }

        info!(
            verb = %verb.id,
            %direction,
            correct = grade.is_correct,
            method = ?grade.method,
            total = record.total_attempts,
            "attempt recorded"
        );
        Ok(grade)
    }

    async fn evaluate(
        &self,
        verb: &Verb,
        direction: ExerciseDirection,
        raw_answer: &str,
        canonical: String,
    ) -> Grade {
        let assessment = assess(verb, direction, raw_answer);
        let (is_correct, method) = match assessment {
            Assessment::Match => {
                debug!(verb = %verb.id, "deterministic match");
                (true, GradeMethod::Exact)
            }
            Assessment::Mismatch => {
                if self.consult_oracle(verb, direction, raw_answer).await {
                    (true, GradeMethod::Oracle)
                } else {
                    (false, GradeMethod::Mismatch)
                }
            }
            Assessment::Rejected | Assessment::NoReference => (false, GradeMethod::Mismatch),
            Assessment::Malformed => (false, GradeMethod::Malformed),
        };

        let feedback = match assessment {
            _ if is_correct => CORRECT_FEEDBACK.to_string(),
            Assessment::Malformed => MALFORMED_TENSE_FEEDBACK.to_string(),
            Assessment::NoReference => format!(
                "No past tense forms are recorded for \"{}\".",
                verb.infinitive
            ),
            _ => incorrect_feedback(verb, &canonical),
        };

        Grade {
            is_correct,
            canonical_answer: canonical,
            feedback,
            method,
        }
    }

    /// Ask the oracle, treating every failure as a rejection.
    async fn consult_oracle(
        &self,
        verb: &Verb,
        direction: ExerciseDirection,
        raw_answer: &str,
    ) -> bool {
        let Some(oracle) = &self.oracle else {
            return false;
        };
        if raw_answer.trim().is_empty() {
            return false;
        }

        let request = JudgeRequest {
            user_answer: raw_answer.to_string(),
            reference: reference_description(verb, direction),
            direction,
        };

        match tokio::time::timeout(self.oracle_timeout, oracle.judge(&request)).await {
            Ok(Ok(response)) => {
                debug!(
                    oracle = oracle.name(),
                    reply = %response.reply,
                    latency_ms = response.latency_ms,
                    "oracle verdict"
                );
                response.accepted()
            }
            Ok(Err(e)) => {
                warn!(oracle = oracle.name(), "oracle unavailable, using deterministic verdict: {e:#}");
                false
            }
            Err(_) => {
                warn!(
                    oracle = oracle.name(),
                    "oracle timed out after {:?}, using deterministic verdict",
                    self.oracle_timeout
                );
                false
            }
        }
    }
}
