//! Adaptive verb selection.
//!
//! Two policies are available, chosen by configuration:
//!
//! - **least-practiced**: rank verbs by how many attempt records the learner
//!   has for them (ties broken by total attempts), keep the `pool_size`
//!   least practiced, and pick one of those at random.
//! - **tiered**: pick at random from untested verbs, else from verbs below
//!   the accuracy threshold, else from the whole corpus.
//!
//! Whether records count per direction or across all directions is the
//! `scope` setting.

use std::collections::HashMap;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DrillError, Result};
use crate::model::{AttemptRecord, ExerciseDirection, Verb};

/// Which selection algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    LeastPracticed,
    Tiered,
}

/// Which of the learner's records count as practice for a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PracticeScope {
    /// Only records for the requested direction.
    Direction,
    /// Records in any direction.
    AllDirections,
}

/// Selector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_policy")]
    pub policy: SelectionPolicy,
    /// Size of the least-practiced pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_scope")]
    pub scope: PracticeScope,
    /// Tiered policy: accuracy below this needs improvement.
    #[serde(default = "default_needs_improvement_below")]
    pub needs_improvement_below: f64,
}

fn default_policy() -> SelectionPolicy {
    SelectionPolicy::LeastPracticed
}
fn default_pool_size() -> usize {
    10
}
fn default_scope() -> PracticeScope {
    PracticeScope::Direction
}
fn default_needs_improvement_below() -> f64 {
    0.7
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            pool_size: default_pool_size(),
            scope: default_scope(),
            needs_improvement_below: default_needs_improvement_below(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Practice {
    records: u32,
    attempts: u32,
    correct: u32,
}

impl Practice {
    fn accuracy(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(self.correct as f64 / self.attempts as f64)
        }
    }
}

/// Chooses the next verb for a learner.
#[derive(Debug, Clone, Default)]
pub struct VerbSelector {
    config: SelectorConfig,
}

impl VerbSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Pick a verb from `verbs` given the learner's `records`.
    ///
    /// Tense exercises only consider verbs with both tense forms. Fails with
    /// [`DrillError::EmptyCorpus`] when nothing is eligible.
    pub fn select<'a, R: Rng + ?Sized>(
        &self,
        verbs: &'a [Verb],
        records: &[AttemptRecord],
        direction: ExerciseDirection,
        rng: &mut R,
    ) -> Result<&'a Verb> {
        let eligible: Vec<&Verb> = verbs
            .iter()
            .filter(|v| direction != ExerciseDirection::TenseProduction || v.tense_forms().is_some())
            .collect();
        if eligible.is_empty() {
            return Err(DrillError::EmptyCorpus { direction });
        }

        let practice = self.practice_by_verb(records, direction);
        let chosen = match self.config.policy {
            SelectionPolicy::LeastPracticed => {
                let mut ranked = eligible.clone();
                ranked.sort_by_key(|v| {
                    let p = practice.get(v.id.as_str()).copied().unwrap_or_default();
                    (p.records, p.attempts)
                });
                ranked.truncate(self.config.pool_size.max(1));
                ranked.choose(rng).copied()
            }
            SelectionPolicy::Tiered => {
                let (untested, needs_improvement): (Vec<&Verb>, Vec<&Verb>) = {
                    let mut untested = Vec::new();
                    let mut needs = Vec::new();
                    for verb in &eligible {
                        match practice.get(verb.id.as_str()).and_then(Practice::accuracy) {
                            None => untested.push(*verb),
                            Some(a) if a < self.config.needs_improvement_below => {
                                needs.push(*verb)
                            }
                            Some(_) => {}
                        }
                    }
                    (untested, needs)
                };
                if !untested.is_empty() {
                    untested.choose(rng).copied()
                } else if !needs_improvement.is_empty() {
                    needs_improvement.choose(rng).copied()
                } else {
                    eligible.choose(rng).copied()
                }
            }
        };

        chosen.ok_or(DrillError::EmptyCorpus { direction })
    }

    fn practice_by_verb<'r>(
        &self,
        records: &'r [AttemptRecord],
        direction: ExerciseDirection,
    ) -> HashMap<&'r str, Practice> {
        let mut practice: HashMap<&str, Practice> = HashMap::new();
        for record in records {
            if self.config.scope == PracticeScope::Direction && record.direction != direction {
                continue;
            }
            let entry = practice.entry(record.verb_id.as_str()).or_default();
            entry.records += 1;
            entry.attempts += record.total_attempts;
            entry.correct += record.correct_attempts;
        }
        practice
    }
}

/// Pick an exercise direction uniformly at random.
pub fn random_direction<R: Rng + ?Sized>(rng: &mut R) -> ExerciseDirection {
    ExerciseDirection::ALL[rng.random_range(0..ExerciseDirection::ALL.len())]
}
