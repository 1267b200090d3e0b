use criterion::{black_box, criterion_group, criterion_main, Criterion};

use verbdrill_core::grading::assess;
use verbdrill_core::model::{ExerciseDirection, Verb};
use verbdrill_core::normalize::{expand, normalize};

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    group.bench_function("short", |b| b.iter(|| normalize(black_box("Kjøre."))));

    group.bench_function("marker_and_punctuation", |b| {
        b.iter(|| normalize(black_box("  To (quickly) run, jog; or sprint!  ")))
    });

    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let meanings = vec![
        "run/jog/sprint".to_string(),
        "hurry/rush".to_string(),
        "flow".to_string(),
    ];
    c.bench_function("expand_three_meanings", |b| {
        b.iter(|| expand(black_box(&meanings)))
    });
}

fn bench_assess(c: &mut Criterion) {
    let verb = Verb::from_meaning_str("løpe", "å løpe", "run/jog/sprint, hurry/rush, flow")
        .expect("bench verb")
        .with_tenses("løp", "løpt");

    let mut group = c.benchmark_group("assess");
    group.bench_function("meaning_match", |b| {
        b.iter(|| {
            assess(
                &verb,
                ExerciseDirection::VerbToMeaning,
                black_box("To hurry."),
            )
        })
    });
    group.bench_function("tense_pair", |b| {
        b.iter(|| {
            assess(
                &verb,
                ExerciseDirection::TenseProduction,
                black_box("løp, løpt"),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_expand, bench_assess);
criterion_main!(benches);
