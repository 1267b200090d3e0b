//! Progress aggregation.
//!
//! Folds attempt records into accuracy, mastery, and coverage figures, per
//! exercise direction and as an overall rollup.
//!
//! Mastery percentage is `mastered_verbs / total_verb_count * 100`.

use serde::{Deserialize, Serialize};

use crate::model::{AttemptRecord, ExerciseDirection};

/// Statistics for one slice of attempt records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of records (distinct verbs) in the slice.
    pub verbs_attempted: usize,
    pub total_attempts: u64,
    pub total_correct: u64,
    /// Percentage of correct attempts, `0.0..=100.0`.
    pub accuracy: f64,
    pub mastered_verbs: usize,
    /// Percentage of the whole corpus mastered, `0.0..=100.0`.
    pub mastery_percentage: f64,
}

/// Per-direction statistics plus the overall rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total_verbs: usize,
    pub verb_to_meaning: Stats,
    pub meaning_to_verb: Stats,
    pub tenses: Stats,
    pub overall: Stats,
}

impl ProgressStats {
    pub fn for_direction(&self, direction: ExerciseDirection) -> &Stats {
        match direction {
            ExerciseDirection::VerbToMeaning => &self.verb_to_meaning,
            ExerciseDirection::MeaningToVerb => &self.meaning_to_verb,
            ExerciseDirection::TenseProduction => &self.tenses,
        }
    }
}

/// Aggregate a slice of records against a corpus of `total_verb_count` verbs.
pub fn aggregate<'a, I>(records: I, total_verb_count: usize) -> Stats
where
    I: IntoIterator<Item = &'a AttemptRecord>,
{
    let mut stats = Stats::default();
    for record in records {
        stats.verbs_attempted += 1;
        stats.total_attempts += u64::from(record.total_attempts);
        stats.total_correct += u64::from(record.correct_attempts);
        if record.is_mastered() {
            stats.mastered_verbs += 1;
        }
    }

    stats.accuracy = if stats.total_attempts > 0 {
        stats.total_correct as f64 / stats.total_attempts as f64 * 100.0
    } else {
        0.0
    };
    stats.mastery_percentage = if total_verb_count > 0 && stats.verbs_attempted > 0 {
        stats.mastered_verbs as f64 / total_verb_count as f64 * 100.0
    } else {
        0.0
    };
    stats
}

/// Aggregate a learner's records per direction and overall.
///
/// The overall rollup takes the maximum of `verbs_attempted` and
/// `mastered_verbs` across directions and the mean of `accuracy` and
/// `mastery_percentage`. Attempt totals are summed.
pub fn compute_progress_stats(records: &[AttemptRecord], total_verb_count: usize) -> ProgressStats {
    let per_direction = |direction: ExerciseDirection| {
        aggregate(
            records.iter().filter(|r| r.direction == direction),
            total_verb_count,
        )
    };

    let verb_to_meaning = per_direction(ExerciseDirection::VerbToMeaning);
    let meaning_to_verb = per_direction(ExerciseDirection::MeaningToVerb);
    let tenses = per_direction(ExerciseDirection::TenseProduction);

    let all = [&verb_to_meaning, &meaning_to_verb, &tenses];
    let n = all.len() as f64;
    let overall = Stats {
        verbs_attempted: all.iter().map(|s| s.verbs_attempted).max().unwrap_or(0),
        total_attempts: all.iter().map(|s| s.total_attempts).sum(),
        total_correct: all.iter().map(|s| s.total_correct).sum(),
        accuracy: all.iter().map(|s| s.accuracy).sum::<f64>() / n,
        mastered_verbs: all.iter().map(|s| s.mastered_verbs).max().unwrap_or(0),
        mastery_percentage: all.iter().map(|s| s.mastery_percentage).sum::<f64>() / n,
    };

    ProgressStats {
        total_verbs: total_verb_count,
        verb_to_meaning,
        meaning_to_verb,
        tenses,
        overall,
    }
}
