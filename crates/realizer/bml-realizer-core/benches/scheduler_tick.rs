use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bml_realizer::{Config, Scheduler};
use bml_test_fixtures::blocks;

const TICK: f32 = 1.0 / 60.0;

fn loaded_scheduler(copies: usize) -> Scheduler {
    let greeting = blocks::json("greeting").expect("greeting fixture");
    let utterance = blocks::json("speech-with-gesture").expect("speech fixture");
    let mut s = Scheduler::new(Config::default());
    s.set_target("user", [0.3, 1.5, 1.0]);
    for i in 0..copies {
        let now = i as f32 * 0.5;
        s.submit_json(&greeting, now).expect("greeting submits");
        s.submit_json(&utterance, now).expect("utterance submits");
    }
    s
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_tick");
    for copies in [1usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(copies), &copies, |b, &copies| {
            b.iter_batched(
                || loaded_scheduler(copies),
                |mut s| {
                    for i in 0..120 {
                        let frame = s.tick(i as f32 * TICK);
                        black_box(frame.channels.len());
                    }
                    s
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_submit(c: &mut Criterion) {
    let greeting = blocks::json("greeting").expect("greeting fixture");
    c.bench_function("submit_greeting", |b| {
        b.iter_batched(
            Scheduler::default,
            |mut s| {
                black_box(s.submit_json(&greeting, 0.0).expect("greeting submits"));
                s
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_tick, bench_submit);
criterion_main!(benches);
