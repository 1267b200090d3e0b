//! Core data model types for verbdrill.
//!
//! Verbs are the drill items, attempt records hold per-user counters for a
//! single (verb, direction) pair, and users are keyed by the subject id of
//! whatever authenticated them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::expand;

/// A Norwegian verb drill item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verb {
    /// Unique identifier for this verb.
    pub id: String,
    /// The Norwegian infinitive (e.g. "å spise" or "spise").
    pub infinitive: String,
    /// Acceptable English glosses in order. The first is canonical.
    /// Each entry may hold several slash-separated synonyms.
    pub meanings: Vec<String>,
    /// Past tense (preteritum), if known.
    #[serde(default)]
    pub past: Option<String>,
    /// Past participle (perfektum partisipp), if known.
    #[serde(default)]
    pub past_participle: Option<String>,
    /// Free-text memory aid.
    #[serde(default)]
    pub mnemonic: Option<String>,
}

impl Verb {
    /// Build a verb from a comma-delimited meaning string.
    ///
    /// Returns `None` when the string holds no non-empty meaning.
    pub fn from_meaning_str(id: &str, infinitive: &str, meanings: &str) -> Option<Self> {
        let meanings = parse_meanings(meanings);
        if meanings.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            infinitive: infinitive.to_string(),
            meanings,
            past: None,
            past_participle: None,
            mnemonic: None,
        })
    }

    pub fn with_tenses(mut self, past: &str, past_participle: &str) -> Self {
        self.past = Some(past.to_string());
        self.past_participle = Some(past_participle.to_string());
        self
    }

    pub fn with_mnemonic(mut self, mnemonic: &str) -> Self {
        self.mnemonic = Some(mnemonic.to_string());
        self
    }

    /// The canonical English gloss shown as feedback.
    pub fn canonical_meaning(&self) -> &str {
        self.meanings.first().map(String::as_str).unwrap_or_default()
    }

    /// All meanings joined for display ("run/jog, sprint").
    pub fn joined_meanings(&self) -> String {
        self.meanings.join(", ")
    }

    /// Every acceptable English variant after synonym expansion.
    pub fn meaning_variants(&self) -> Vec<String> {
        let mut variants: Vec<String> = expand(&self.meanings).into_iter().collect();
        variants.sort();
        variants
    }

    /// Both tense forms, when the verb has them.
    pub fn tense_forms(&self) -> Option<(&str, &str)> {
        match (&self.past, &self.past_participle) {
            (Some(past), Some(participle))
                if !past.trim().is_empty() && !participle.trim().is_empty() =>
            {
                Some((past.as_str(), participle.as_str()))
            }
            _ => None,
        }
    }
}

/// Split a delimited meaning string into trimmed, non-empty meanings.
pub fn parse_meanings(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Which way an exercise asks the user to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExerciseDirection {
    /// Norwegian verb shown, English meaning expected.
    #[serde(rename = "nor-to-eng")]
    VerbToMeaning,
    /// English meaning shown, Norwegian verb expected.
    #[serde(rename = "eng-to-nor")]
    MeaningToVerb,
    /// Norwegian verb shown, "past, past participle" expected.
    #[serde(rename = "tenses")]
    TenseProduction,
}

impl ExerciseDirection {
    pub const ALL: [ExerciseDirection; 3] = [
        ExerciseDirection::VerbToMeaning,
        ExerciseDirection::MeaningToVerb,
        ExerciseDirection::TenseProduction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseDirection::VerbToMeaning => "nor-to-eng",
            ExerciseDirection::MeaningToVerb => "eng-to-nor",
            ExerciseDirection::TenseProduction => "tenses",
        }
    }
}

impl fmt::Display for ExerciseDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nor-to-eng" | "verb-to-meaning" => Ok(ExerciseDirection::VerbToMeaning),
            "eng-to-nor" | "meaning-to-verb" => Ok(ExerciseDirection::MeaningToVerb),
            "tenses" | "tense" => Ok(ExerciseDirection::TenseProduction),
            other => Err(format!("unknown exercise direction: {other}")),
        }
    }
}

/// Unique key of an attempt record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    pub user_id: Uuid,
    pub verb_id: String,
    pub direction: ExerciseDirection,
}

/// Per-user practice counters for one verb in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub user_id: Uuid,
    pub verb_id: String,
    pub direction: ExerciseDirection,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn key(&self) -> AttemptKey {
        AttemptKey {
            user_id: self.user_id,
            verb_id: self.verb_id.clone(),
            direction: self.direction,
        }
    }

    /// Fraction of correct attempts in `0.0..=1.0`, or `None` when untried.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_attempts == 0 {
            None
        } else {
            Some(self.correct_attempts as f64 / self.total_attempts as f64)
        }
    }

    /// At least three correct answers at 80% accuracy or better.
    pub fn is_mastered(&self) -> bool {
        self.correct_attempts >= 3 && self.accuracy().is_some_and(|a| a >= 0.8)
    }
}

/// Filter for attempt record queries.
#[derive(Debug, Clone, Default)]
pub struct AttemptFilter {
    pub user_id: Option<Uuid>,
    pub verb_id: Option<String>,
    pub direction: Option<ExerciseDirection>,
}

impl AttemptFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn direction(mut self, direction: ExerciseDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn verb(mut self, verb_id: &str) -> Self {
        self.verb_id = Some(verb_id.to_string());
        self
    }

    pub fn matches(&self, record: &AttemptRecord) -> bool {
        self.user_id.is_none_or(|u| u == record.user_id)
            && self
                .verb_id
                .as_deref()
                .is_none_or(|v| v == record.verb_id)
            && self.direction.is_none_or(|d| d == record.direction)
    }
}

/// What an authentication layer knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject id from the identity provider.
    pub subject_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            email: None,
            display_name: None,
        }
    }
}

/// A learner, created lazily on the first authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// External subject id; the unique lookup key.
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The item handed to a learner by `next_exercise`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub verb: Verb,
    pub direction: ExerciseDirection,
    /// The learner's existing record for this verb and direction.
    #[serde(default)]
    pub progress: Option<AttemptRecord>,
}

impl Exercise {
    /// The text shown to the learner.
    pub fn prompt(&self) -> String {
        match self.direction {
            ExerciseDirection::VerbToMeaning => {
                format!("What does \"{}\" mean in English?", self.verb.infinitive)
            }
            ExerciseDirection::MeaningToVerb => {
                format!(
                    "What is the Norwegian verb for \"{}\"?",
                    self.verb.canonical_meaning()
                )
            }
            ExerciseDirection::TenseProduction => format!(
                "Give the past tense and past participle of \"{}\" (comma-separated).",
                self.verb.infinitive
            ),
        }
    }
}

/// How a grading verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeMethod {
    /// Normalized answer matched a reference variant.
    Exact,
    /// The equivalence oracle accepted the answer.
    Oracle,
    /// No match and the oracle rejected, failed, or was not consulted.
    Mismatch,
    /// The answer did not have the required shape.
    Malformed,
    /// A hint was shown for this verb, so the attempt cannot count.
    HintUsed,
}

/// The result of grading one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub is_correct: bool,
    /// Reference answer as shown to the learner.
    pub canonical_answer: String,
    pub feedback: String,
    pub method: GradeMethod,
}

/// One row of the vocabulary listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub verb: Verb,
    /// The learner's records across all directions.
    pub progress: Vec<AttemptRecord>,
}

impl VocabularyEntry {
    /// Accuracy across all directions, or `None` when untested.
    pub fn accuracy(&self) -> Option<f64> {
        let total: u32 = self.progress.iter().map(|p| p.total_attempts).sum();
        let correct: u32 = self.progress.iter().map(|p| p.correct_attempts).sum();
        if total == 0 {
            None
        } else {
            Some(correct as f64 / total as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(correct: u32, total: u32) -> AttemptRecord {
        AttemptRecord {
            user_id: Uuid::nil(),
            verb_id: "spise".into(),
            direction: ExerciseDirection::VerbToMeaning,
            total_attempts: total,
            correct_attempts: correct,
            last_attempt_at: Utc::now(),
        }
    }

    #[test]
    fn direction_display_and_parse() {
        assert_eq!(ExerciseDirection::VerbToMeaning.to_string(), "nor-to-eng");
        assert_eq!(
            "eng-to-nor".parse::<ExerciseDirection>().unwrap(),
            ExerciseDirection::MeaningToVerb
        );
        assert_eq!(
            "Tenses".parse::<ExerciseDirection>().unwrap(),
            ExerciseDirection::TenseProduction
        );
        assert!("random".parse::<ExerciseDirection>().is_err());
    }

    #[test]
    fn direction_serializes_to_wire_names() {
        let json = serde_json::to_string(&ExerciseDirection::TenseProduction).unwrap();
        assert_eq!(json, "\"tenses\"");
    }

    #[test]
    fn meaning_string_parsing() {
        assert_eq!(
            parse_meanings(" eat , have a meal,, "),
            vec!["eat".to_string(), "have a meal".to_string()]
        );
        assert!(parse_meanings(" , ").is_empty());
        assert!(Verb::from_meaning_str("x", "x", "  ").is_none());
    }

    #[test]
    fn canonical_and_variants() {
        let verb = Verb::from_meaning_str("løpe", "løpe", "run/jog, sprint").unwrap();
        assert_eq!(verb.canonical_meaning(), "run/jog");
        assert_eq!(verb.joined_meanings(), "run/jog, sprint");
        assert_eq!(verb.meaning_variants(), vec!["jog", "run", "sprint"]);
    }

    #[test]
    fn tense_forms_require_both() {
        let verb = Verb::from_meaning_str("gå", "gå", "walk").unwrap();
        assert!(verb.tense_forms().is_none());
        let verb = verb.with_tenses("gikk", "gått");
        assert_eq!(verb.tense_forms(), Some(("gikk", "gått")));
    }

    #[test]
    fn mastery_boundary() {
        assert!(!record(3, 4).is_mastered());
        assert!(record(4, 5).is_mastered());
        assert!(!record(2, 2).is_mastered());
        assert!(!record(0, 0).is_mastered());
    }

    #[test]
    fn filter_matching() {
        let r = record(1, 1);
        assert!(AttemptFilter::for_user(Uuid::nil()).matches(&r));
        assert!(!AttemptFilter::for_user(Uuid::nil())
            .direction(ExerciseDirection::TenseProduction)
            .matches(&r));
        assert!(!AttemptFilter::default().verb("gå").matches(&r));
    }
}
