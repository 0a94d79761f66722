//! Benchmarks for the timebase crate.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use openstimulus_timebase::Timebase;
use openstimulus_timebase::testing::ScriptedCounters;
use openstimulus_timebase::{TimebaseConfig, WaitTuningConfig};

fn os_timebase() -> Timebase {
    match Timebase::new() {
        Ok(tb) => tb,
        Err(err) => panic!("timebase init failed on this host: {err}"),
    }
}

fn bench_read_seconds(c: &mut Criterion) {
    let clock = os_timebase();

    c.bench_function("read_seconds", |b| {
        b.iter(|| {
            black_box(clock.read_seconds());
        });
    });
}

fn bench_read_adjusted(c: &mut Criterion) {
    let clock = os_timebase();
    clock.set_adjustment_factor(1.000_01);

    c.bench_function("read_adjusted_seconds", |b| {
        b.iter(|| {
            black_box(clock.read_adjusted_seconds());
        });
    });
}

fn bench_read_after_fault(c: &mut Criterion) {
    // The fallback path skips the high-res query and the checks.
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = match Timebase::with_source(
        TimebaseConfig::default(),
        WaitTuningConfig::default(),
        Box::new(counters),
    ) {
        Ok(tb) => tb,
        Err(err) => panic!("timebase init failed: {err}"),
    };

    handle.advance(0.5);
    let _ = clock.read_seconds();
    handle.shift_high_res(1.0);
    let _ = clock.read_seconds();
    assert!(clock.health().timer_faulty);

    c.bench_function("read_seconds_fallback", |b| {
        b.iter(|| {
            black_box(clock.read_seconds());
        });
    });
}

fn bench_wait_until_spin_only(c: &mut Criterion) {
    let clock = os_timebase();

    // 100µs deadlines sit entirely in the busy-spin stage.
    c.bench_function("wait_until_100us", |b| {
        b.iter(|| {
            let deadline = clock.read_adjusted_seconds() + 0.000_1;
            clock.wait_until(deadline);
        });
    });
}

criterion_group!(
    benches,
    bench_read_seconds,
    bench_read_adjusted,
    bench_read_after_fault,
    bench_wait_until_spin_only
);
criterion_main!(benches);
