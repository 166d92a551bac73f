//! Alignment hot path: each cycle re-aligns the window hypothesis against
//! the tentative suffix, so the LCS cost is paid once per cadence tick.

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use sotto::{Stitcher, Token};
use std::hint::black_box;

const TOLERANCE: f64 = 0.2;

/// A window hypothesis of `n` evenly spaced tokens, start times shifted by
/// `jitter` to mimic re-decode wobble.
fn hypothesis(n: usize, jitter: f64) -> Vec<Token> {
    (0..n)
        .map(|i| {
            let start = i as f64 * 0.3 + jitter;
            Token::new(format!("word{i}"), start, start + 0.28, 0.9)
        })
        .collect()
}

/// Same hypothesis with the trailing quarter re-heard as different words,
/// the shape of a model changing its mind about the newest audio.
fn flickered(n: usize, jitter: f64) -> Vec<Token> {
    let mut tokens = hypothesis(n, jitter);
    let tail = n - n / 4;
    for (i, token) in tokens.iter_mut().enumerate().skip(tail) {
        token.text = format!("alt{i}");
    }
    tokens
}

/// Stitcher holding one prior cycle's output, the steady-state input to
/// every alignment.
fn seeded(n: usize) -> Stitcher {
    let mut stitcher = Stitcher::new(2, TOLERANCE);
    stitcher.apply(hypothesis(n, 0.0));
    stitcher
}

fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("stitcher_alignment");

    for &n in &[8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::new("matched", n), &n, |b, &n| {
            b.iter_batched(
                || (seeded(n), hypothesis(n, 0.05)),
                |(mut stitcher, hypothesis)| black_box(stitcher.apply(hypothesis)),
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("flickered_tail", n), &n, |b, &n| {
            b.iter_batched(
                || (seeded(n), flickered(n, 0.05)),
                |(mut stitcher, hypothesis)| black_box(stitcher.apply(hypothesis)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_alignment);
criterion_main!(benches);
