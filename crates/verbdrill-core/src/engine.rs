//! The drill engine.
//!
//! Ties the record store, grader, selector, and optional hint writer
//! together behind the four learner-facing operations. Every operation takes
//! the caller's identity; `None` means the request was not authenticated.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DrillError, Result};
use crate::grading::Grader;
use crate::hint::{fallback_hint, tidy_hint, NO_CONTEXT_HINT};
use crate::model::{
    AttemptFilter, Exercise, ExerciseDirection, Grade, Identity, User, Verb, VocabularyEntry,
};
use crate::selector::{random_direction, SelectorConfig, VerbSelector};
use crate::statistics::{compute_progress_stats, ProgressStats};
use crate::traits::{EquivalenceOracle, HintWriter, RecordStore};

/// Configuration for the drill engine.
#[derive(Debug, Clone)]
pub struct DrillEngineConfig {
    pub selector: SelectorConfig,
    /// How long a hint counts against the next submission for that verb.
    pub hint_ttl: Duration,
    /// Upper bound on a single oracle call.
    pub oracle_timeout: Duration,
}

impl Default for DrillEngineConfig {
    fn default() -> Self {
        Self {
            selector: SelectorConfig::default(),
            hint_ttl: Duration::from_secs(3600),
            oracle_timeout: Duration::from_secs(10),
        }
    }
}

/// The central drill engine.
pub struct DrillEngine {
    store: Arc<dyn RecordStore>,
    grader: Grader,
    selector: VerbSelector,
    hint_writer: Option<Arc<dyn HintWriter>>,
    config: DrillEngineConfig,
}

impl DrillEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: DrillEngineConfig) -> Self {
        Self {
            grader: Grader::new(Arc::clone(&store)).with_oracle_timeout(config.oracle_timeout),
            selector: VerbSelector::new(config.selector.clone()),
            store,
            hint_writer: None,
            config,
        }
    }

    /// Use `oracle` for answers that fail the deterministic check.
    pub fn with_oracle(mut self, oracle: Arc<dyn EquivalenceOracle>) -> Self {
        self.grader = self.grader.with_oracle(oracle);
        self
    }

    pub fn with_hint_writer(mut self, writer: Arc<dyn HintWriter>) -> Self {
        self.hint_writer = Some(writer);
        self
    }

    pub fn config(&self) -> &DrillEngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Load verbs into the store, replacing existing verbs with the same id.
    pub async fn seed(&self, verbs: &[Verb]) -> Result<()> {
        self.store.upsert_verbs(verbs).await?;
        info!(count = verbs.len(), "verbs seeded");
        Ok(())
    }

    /// Resolve the caller to a user, creating one on first sight.
    pub async fn authenticate(&self, caller: Option<&Identity>) -> Result<User> {
        let identity = caller.ok_or(DrillError::NotAuthenticated)?;
        if identity.subject_id.trim().is_empty() {
            return Err(DrillError::NotAuthenticated);
        }
        Ok(self.store.upsert_user(identity).await?)
    }

    /// Choose the next exercise for the caller.
    ///
    /// With no `direction`, one is picked at random.
    pub async fn next_exercise(
        &self,
        caller: Option<&Identity>,
        direction: Option<ExerciseDirection>,
    ) -> Result<Exercise> {
        let user = self.authenticate(caller).await?;
        let direction = direction.unwrap_or_else(|| random_direction(&mut rand::rng()));

        let filter = AttemptFilter::for_user(user.id);
        let (verbs, records) = futures::try_join!(
            self.store.list_verbs(),
            self.store.find_attempts(&filter),
        )?;

        let verb = self
            .selector
            .select(&verbs, &records, direction, &mut rand::rng())?
            .clone();
        let progress = records
            .into_iter()
            .find(|r| r.verb_id == verb.id && r.direction == direction);

        debug!(verb = %verb.id, %direction, "exercise selected");
        Ok(Exercise {
            verb,
            direction,
            progress,
        })
    }

    /// Grade an answer and update the caller's attempt record.
    pub async fn submit_answer(
        &self,
        caller: Option<&Identity>,
        verb_id: &str,
        raw_answer: &str,
        direction: ExerciseDirection,
    ) -> Result<Grade> {
        let user = self.authenticate(caller).await?;
        self.grader
            .grade(user.id, verb_id, raw_answer, direction)
            .await
    }

    /// Progress statistics for the caller.
    pub async fn progress_stats(&self, caller: Option<&Identity>) -> Result<ProgressStats> {
        let user = self.authenticate(caller).await?;
        self.progress_stats_for_user(user.id).await
    }

    /// Progress statistics for a known user id.
    pub async fn progress_stats_for_user(&self, user_id: Uuid) -> Result<ProgressStats> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(DrillError::UserNotFound {
                id: user_id.to_string(),
            });
        }

        let filter = AttemptFilter::for_user(user_id);
        let (records, total_verbs) = futures::try_join!(
            self.store.find_attempts(&filter),
            self.store.count_verbs(),
        )?;
        Ok(compute_progress_stats(&records, total_verbs))
    }

    /// A study hint for a verb.
    ///
    /// Marks the verb as hinted so the caller's next submission for it is
    /// graded incorrect. `direction` only shapes the fallback text.
    pub async fn hint(
        &self,
        caller: Option<&Identity>,
        verb_id: &str,
        direction: Option<ExerciseDirection>,
    ) -> Result<String> {
        let user = self.authenticate(caller).await?;
        let verb = self
            .store
            .find_verb(verb_id)
            .await?
            .ok_or_else(|| DrillError::VerbNotFound {
                id: verb_id.to_string(),
            })?;

        let ttl = chrono::Duration::from_std(self.config.hint_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        self.store
            .set_hint_marker(user.id, &verb.id, Utc::now() + ttl)
            .await?;

        let text = match &self.hint_writer {
            Some(writer) => match writer.write_hint(&verb).await {
                Ok(text) if !text.trim().is_empty() => tidy_hint(&text),
                Ok(_) => NO_CONTEXT_HINT.to_string(),
                Err(e) => {
                    warn!(writer = writer.name(), verb = %verb.id, "hint generation failed: {e:#}");
                    NO_CONTEXT_HINT.to_string()
                }
            },
            None => fallback_hint(
                &verb,
                direction.unwrap_or(ExerciseDirection::VerbToMeaning),
            ),
        };

        info!(verb = %verb.id, "hint issued");
        Ok(text)
    }

    /// Every verb with the caller's records, weakest first.
    ///
    /// Untested verbs come last, in id order.
    pub async fn vocabulary(&self, caller: Option<&Identity>) -> Result<Vec<VocabularyEntry>> {
        let user = self.authenticate(caller).await?;
        let filter = AttemptFilter::for_user(user.id);
        let (verbs, records) = futures::try_join!(
            self.store.list_verbs(),
            self.store.find_attempts(&filter),
        )?;

        let mut entries: Vec<VocabularyEntry> = verbs
            .into_iter()
            .map(|verb| {
                let mut progress: Vec<_> = records
                    .iter()
                    .filter(|r| r.verb_id == verb.id)
                    .cloned()
                    .collect();
                progress.sort_by_key(|r| r.direction);
                VocabularyEntry { verb, progress }
            })
            .collect();

        entries.sort_by(|a, b| match (a.accuracy(), b.accuracy()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    use async_trait::async_trait;

    use super::*;
    use crate::model::GradeMethod;
    use crate::store::MemoryStore;

    fn verbs() -> Vec<Verb> {
        vec![
            Verb::from_meaning_str("spise", "å spise", "eat, have a meal")
                .unwrap()
                .with_tenses("spiste", "spist")
                .with_mnemonic("Spice up your food."),
            Verb::from_meaning_str("løpe", "løpe", "run/jog")
                .unwrap()
                .with_tenses("løp", "løpt"),
            Verb::from_meaning_str("være", "være", "be").unwrap(),
        ]
    }

    async fn engine() -> DrillEngine {
        let engine = DrillEngine::new(Arc::new(MemoryStore::new()), DrillEngineConfig::default());
        engine.seed(&verbs()).await.unwrap();
        engine
    }

    fn alice() -> Identity {
        Identity {
            subject_id: "sub-alice".into(),
            email: Some("alice@example.com".into()),
            display_name: None,
        }
    }

    struct ScriptedWriter {
        reply: Option<&'static str>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl HintWriter for ScriptedWriter {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn write_hint(&self, _verb: &Verb) -> anyhow::Result<String> {
            self.calls.fetch_add(1, AtomicOrdering::Relaxed);
            self.reply
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("backend down"))
        }
    }

    #[tokio::test]
    async fn unauthenticated_calls_are_denied() {
        let engine = engine().await;
        let err = engine.next_exercise(None, None).await.unwrap_err();
        assert!(err.is_access_denied());
        assert!(engine
            .submit_answer(None, "spise", "eat", ExerciseDirection::VerbToMeaning)
            .await
            .unwrap_err()
            .is_access_denied());
        assert!(engine.progress_stats(None).await.is_err());
        assert!(engine.hint(None, "spise", None).await.is_err());
        assert!(engine
            .next_exercise(Some(&Identity::new("  ")), None)
            .await
            .unwrap_err()
            .is_access_denied());
    }

    #[tokio::test]
    async fn next_exercise_respects_direction() {
        let engine = engine().await;
        for _ in 0..20 {
            let exercise = engine
                .next_exercise(Some(&alice()), Some(ExerciseDirection::TenseProduction))
                .await
                .unwrap();
            assert_eq!(exercise.direction, ExerciseDirection::TenseProduction);
            assert_ne!(exercise.verb.id, "være");
            assert!(exercise.progress.is_none());
        }
    }

    #[tokio::test]
    async fn next_exercise_on_empty_corpus_fails() {
        let engine = DrillEngine::new(Arc::new(MemoryStore::new()), DrillEngineConfig::default());
        let err = engine
            .next_exercise(Some(&alice()), Some(ExerciseDirection::VerbToMeaning))
            .await
            .unwrap_err();
        assert!(matches!(err, DrillError::EmptyCorpus { .. }));
    }

    #[tokio::test]
    async fn exercise_carries_existing_progress() {
        let store = Arc::new(MemoryStore::new());
        let engine = DrillEngine::new(store, DrillEngineConfig::default());
        engine
            .seed(&[Verb::from_meaning_str("gå", "gå", "walk").unwrap()])
            .await
            .unwrap();
        engine
            .submit_answer(Some(&alice()), "gå", "walk", ExerciseDirection::VerbToMeaning)
            .await
            .unwrap();

        let exercise = engine
            .next_exercise(Some(&alice()), Some(ExerciseDirection::VerbToMeaning))
            .await
            .unwrap();
        let progress = exercise.progress.unwrap();
        assert_eq!(progress.total_attempts, 1);
        assert_eq!(progress.correct_attempts, 1);
    }

    #[tokio::test]
    async fn submit_and_stats() {
        let engine = engine().await;
        let identity = alice();
        let caller = Some(&identity);

        for _ in 0..4 {
            let grade = engine
                .submit_answer(caller, "spise", "To eat.", ExerciseDirection::VerbToMeaning)
                .await
                .unwrap();
            assert!(grade.is_correct);
        }
        let grade = engine
            .submit_answer(caller, "spise", "drink", ExerciseDirection::VerbToMeaning)
            .await
            .unwrap();
        assert!(!grade.is_correct);
        assert!(grade.feedback.contains("eat, have a meal"));
        assert!(grade.feedback.contains("Spice up your food."));

        let stats = engine.progress_stats(caller).await.unwrap();
        assert_eq!(stats.total_verbs, 3);
        assert_eq!(stats.verb_to_meaning.total_attempts, 5);
        assert_eq!(stats.verb_to_meaning.mastered_verbs, 1);
        assert!((stats.verb_to_meaning.accuracy - 80.0).abs() < 1e-9);
        assert!((stats.verb_to_meaning.mastery_percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_verb_is_not_found() {
        let engine = engine().await;
        let err = engine
            .submit_answer(Some(&alice()), "nope", "x", ExerciseDirection::VerbToMeaning)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(engine
            .hint(Some(&alice()), "nope", None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn stats_for_unknown_user() {
        let engine = engine().await;
        let err = engine
            .progress_stats_for_user(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, DrillError::UserNotFound { .. }));
    }

    #[tokio::test]
    async fn hint_forces_next_answer_incorrect() {
        let engine = engine().await;
        let caller = alice();

        let text = engine.hint(Some(&caller), "spise", None).await.unwrap();
        assert_eq!(text, "Spice up your food.");

        let grade = engine
            .submit_answer(Some(&caller), "spise", "eat", ExerciseDirection::VerbToMeaning)
            .await
            .unwrap();
        assert!(!grade.is_correct);
        assert_eq!(grade.method, GradeMethod::HintUsed);

        let grade = engine
            .submit_answer(Some(&caller), "spise", "eat", ExerciseDirection::VerbToMeaning)
            .await
            .unwrap();
        assert!(grade.is_correct);
    }

    #[tokio::test]
    async fn hint_writer_output_is_tidied() {
        let writer = Arc::new(ScriptedWriter {
            reply: Some("Concise Explanation: To run.\n\nExample Sentence: Jeg løper. Mnemonic: Leap."),
            calls: AtomicU32::new(0),
        });
        let engine = engine().await.with_hint_writer(writer.clone());

        let text = engine.hint(Some(&alice()), "løpe", None).await.unwrap();
        assert_eq!(
            text,
            "Concise Explanation: To run.\nExample Sentence: Jeg løper.\nMnemonic: Leap."
        );
        assert_eq!(writer.calls.load(AtomicOrdering::Relaxed), 1);
    }

    #[tokio::test]
    async fn failing_hint_writer_falls_back() {
        let writer = Arc::new(ScriptedWriter {
            reply: None,
            calls: AtomicU32::new(0),
        });
        let engine = engine().await.with_hint_writer(writer);
        let text = engine.hint(Some(&alice()), "løpe", None).await.unwrap();
        assert_eq!(text, NO_CONTEXT_HINT);
    }

    #[tokio::test]
    async fn vocabulary_sorts_weakest_first() {
        let engine = engine().await;
        let caller = alice();
        let d = ExerciseDirection::VerbToMeaning;

        engine.submit_answer(Some(&caller), "spise", "eat", d).await.unwrap();
        engine.submit_answer(Some(&caller), "løpe", "walk", d).await.unwrap();

        let vocab = engine.vocabulary(Some(&caller)).await.unwrap();
        let ids: Vec<&str> = vocab.iter().map(|e| e.verb.id.as_str()).collect();
        assert_eq!(ids, vec!["løpe", "spise", "være"]);
        assert_eq!(vocab[0].accuracy(), Some(0.0));
        assert!(vocab[2].progress.is_empty());
    }
}
