//! Performance benchmarks for guarded execution.
//!
//! Tracks the overhead the retry layer adds around a command:
//! - Retry classification per failed attempt
//! - Unwrapping of wrapped failures
//! - Full attempt loops with immediate retries

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tether_core::{root_cause, CommandError, CommandIdentity, RuntimeFailure};
use tether_exec::{classify, execute_with_retries};
use tether_testing::{
    scripted::{self, Outcome},
    ScriptedFactory,
};
use tokio::runtime::Runtime;

fn wrapped_failure() -> CommandError {
    CommandError::attempt(
        CommandIdentity::new("broker", "publish"),
        2,
        CommandError::runtime_caused_by(
            RuntimeFailure::Timeout,
            "publish request timed out",
            std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out"),
        ),
    )
}

/// Benchmarks the retry decision for a failed attempt.
fn bench_classification(c: &mut Criterion) {
    let error = wrapped_failure();

    c.bench_function("classify_failed_attempt", |b| {
        b.iter(|| classify(black_box(&error), black_box(2), black_box(3)));
    });
}

/// Benchmarks stripping both wrapper layers.
fn bench_unwrapping(c: &mut Criterion) {
    let error = wrapped_failure();

    c.bench_function("root_cause", |b| {
        b.iter(|| root_cause(black_box(error.clone())));
    });
}

/// Benchmarks attempt loops that succeed after a number of timeouts.
fn bench_attempt_loop(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("attempt_loop");

    for failures in [0u32, 1, 4] {
        group.bench_with_input(
            BenchmarkId::new("failures_before_success", failures),
            &failures,
            |b, &failures| {
                b.iter(|| {
                    let outcomes = (0..failures)
                        .map(|_| Outcome::Fail(scripted::timeout()))
                        .chain([Outcome::Succeed(())]);
                    let factory = ScriptedFactory::new(outcomes);

                    rt.block_on(execute_with_retries(factory.factory(), failures + 1))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_classification, bench_unwrapping, bench_attempt_loop);
criterion_main!(benches);
