//! Microbenchmarks for the reactive hot paths: triggering writes, cached
//! memo reads, and effect re-runs (cleanup + re-track).

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use reflex_core::{Effect, Memo, Signal};

fn signal_write_fanout(c: &mut Criterion) {
    let signal = Signal::new(0i64);
    let _effects: Vec<Effect<()>> = (0..10)
        .map(|_| {
            let signal = signal.clone();
            Effect::new(move || {
                black_box(signal.get());
            })
        })
        .collect();

    c.bench_function("signal_set_10_subscribers", |b| {
        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            signal.set(n);
        });
    });
}

fn memo_cached_read(c: &mut Criterion) {
    let signal = Signal::new(3i64);
    let memo = {
        let signal = signal.clone();
        Memo::new(move || signal.get() * 2)
    };
    memo.get();

    c.bench_function("memo_get_cached", |b| b.iter(|| black_box(memo.get())));
}

fn effect_rerun(c: &mut Criterion) {
    let signal = Signal::new(0i64);
    let effect = {
        let signal = signal.clone();
        Effect::new(move || {
            black_box(signal.get());
        })
    };

    c.bench_function("effect_rerun_with_cleanup", |b| b.iter(|| effect.run()));
}

criterion_group!(benches, signal_write_fanout, memo_cached_read, effect_rerun);
criterion_main!(benches);
