//! Collaborator traits: the record store and the language-model oracles.
//!
//! The store is implemented in [`crate::store`]; the oracles live in the
//! `verbdrill-oracle` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AttemptFilter, AttemptKey, AttemptRecord, ExerciseDirection, Identity, User, Verb};

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// Persistent storage for verbs, users, attempt records, and hint markers.
///
/// `record_attempt` must be atomic per key: concurrent calls for the same
/// (user, verb, direction) never lose an increment.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Find a verb by id.
    async fn find_verb(&self, id: &str) -> anyhow::Result<Option<Verb>>;

    /// All verbs, ordered by id.
    async fn list_verbs(&self) -> anyhow::Result<Vec<Verb>>;

    async fn count_verbs(&self) -> anyhow::Result<usize>;

    /// Insert or replace verbs by id.
    async fn upsert_verbs(&self, verbs: &[Verb]) -> anyhow::Result<()>;

    /// Find the user for an identity, creating it if absent. Email and name
    /// are refreshed from the identity on every call.
    async fn upsert_user(&self, identity: &Identity) -> anyhow::Result<User>;

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    async fn find_attempts(&self, filter: &AttemptFilter) -> anyhow::Result<Vec<AttemptRecord>>;

    /// Create-or-increment the record for `key` and return its new state.
    async fn record_attempt(
        &self,
        key: &AttemptKey,
        correct: bool,
        at: DateTime<Utc>,
    ) -> anyhow::Result<AttemptRecord>;

    /// Mark that `user` saw a hint for `verb_id`, valid until `expires_at`.
    async fn set_hint_marker(
        &self,
        user_id: Uuid,
        verb_id: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Whether an unexpired hint marker exists. Expired markers read as absent.
    async fn hint_marker_active(
        &self,
        user_id: Uuid,
        verb_id: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// Remove the hint marker if present.
    async fn clear_hint_marker(&self, user_id: Uuid, verb_id: &str) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Equivalence oracle
// ---------------------------------------------------------------------------

/// Judges whether a free-form answer means the same as the reference.
#[async_trait]
pub trait EquivalenceOracle: Send + Sync {
    /// Backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Ask the oracle for a verdict. The reply text is interpreted with
    /// [`reply_is_yes`].
    async fn judge(&self, request: &JudgeRequest) -> anyhow::Result<JudgeResponse>;
}

/// A semantic-equivalence question for the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// The answer exactly as the learner typed it.
    pub user_answer: String,
    /// Human-readable description of what was expected.
    pub reference: String,
    pub direction: ExerciseDirection,
}

impl JudgeRequest {
    /// System prompt sent alongside [`JudgeRequest::prompt`].
    pub fn system_prompt(&self) -> String {
        let task = match self.direction {
            ExerciseDirection::VerbToMeaning => {
                "The user is translating a Norwegian verb into English."
            }
            ExerciseDirection::MeaningToVerb => {
                "The user is translating an English meaning into a Norwegian verb."
            }
            ExerciseDirection::TenseProduction => {
                "The user is giving the past tense forms of a Norwegian verb."
            }
        };
        format!(
            "You are a Norwegian language expert. Evaluate if the user's answer is semantically correct. {task} Respond with only \"yes\" or \"no\"."
        )
    }

    /// User prompt for the oracle.
    pub fn prompt(&self) -> String {
        format!(
            "Is \"{}\" a valid answer for {}? Consider synonyms, alternative phrasings, and common variations. Answer only with \"yes\" or \"no\".",
            self.user_answer, self.reference
        )
    }
}

/// The oracle's raw reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResponse {
    pub reply: String,
    /// Model that produced the reply.
    pub model: String,
    pub latency_ms: u64,
}

impl JudgeResponse {
    pub fn accepted(&self) -> bool {
        reply_is_yes(&self.reply)
    }
}

/// A reply counts as acceptance when it contains "yes" in any case.
pub fn reply_is_yes(reply: &str) -> bool {
    reply.to_lowercase().contains("yes")
}

// ---------------------------------------------------------------------------
// Hint writer
// ---------------------------------------------------------------------------

/// Writes a short study aid for a verb.
#[async_trait]
pub trait HintWriter: Send + Sync {
    fn name(&self) -> &str;

    /// Produce explanation, example sentence, and mnemonic text.
    async fn write_hint(&self, verb: &Verb) -> anyhow::Result<String>;
}

/// System prompt for hint generation.
pub const HINT_SYSTEM_PROMPT: &str =
    "You are an expert language tutor who provides helpful context.";

/// Build the hint prompt for a verb.
pub fn hint_prompt(verb: &Verb) -> String {
    format!(
        "Provide a concise explanation, an example sentence, and a mnemonic to help a student remember \
the Norwegian verb '{}'. The common English meanings are: {}.\n\
Format your response exactly like this, with exactly one line break between sections:\n\
Concise Explanation: [Your explanation here]\n\
Example Sentence: [Your example sentence here]\n\
Mnemonic: [Your mnemonic here]\n\
Keep each section brief and clear.",
        verb.infinitive,
        verb.joined_meanings()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_detection_is_case_insensitive() {
        assert!(reply_is_yes("Yes."));
        assert!(reply_is_yes("  YES"));
        assert!(reply_is_yes("yes, that works"));
        assert!(!reply_is_yes("No."));
        assert!(!reply_is_yes(""));
    }

    #[test]
    fn judge_prompt_quotes_the_answer() {
        let request = JudgeRequest {
            user_answer: "consume food".into(),
            reference: "the English meanings: eat, have a meal".into(),
            direction: ExerciseDirection::VerbToMeaning,
        };
        let prompt = request.prompt();
        assert!(prompt.contains("\"consume food\""));
        assert!(prompt.contains("eat, have a meal"));
        assert!(request.system_prompt().contains("into English"));
    }

    #[test]
    fn hint_prompt_names_the_verb() {
        let verb = Verb::from_meaning_str("spise", "spise", "eat").unwrap();
        let prompt = hint_prompt(&verb);
        assert!(prompt.contains("'spise'"));
        assert!(prompt.contains("meanings are: eat."));
        assert!(prompt.contains("Mnemonic:"));
    }
}
