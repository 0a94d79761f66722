//! Fault-injection suites driving the clock through scripted counter
//! anomalies, exercising the public degradation contract end to end.

use openstimulus_timebase::testing::ScriptedCounters;
use openstimulus_timebase::{Timebase, TimebaseConfig, TimebaseError, WaitTuningConfig};

fn scripted_timebase(counters: ScriptedCounters) -> Timebase {
    match Timebase::with_source(
        TimebaseConfig::default(),
        WaitTuningConfig::default(),
        Box::new(counters),
    ) {
        Ok(tb) => tb,
        Err(err) => panic!("timebase init failed: {err}"),
    }
}

#[test]
fn test_fault_persists_for_process_lifetime() {
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    handle.advance(0.5);
    let _ = clock.read_seconds();

    handle.shift_high_res(0.300);
    let _ = clock.read_seconds();
    assert!(clock.health().timer_faulty);

    // Undo the anomaly entirely: the counter now looks healthy again.
    handle.shift_high_res(-0.300);

    // A thousand healthy-looking reads later the fallback formula is still
    // in force: reads advance with the tick counter, and the faulty flag
    // never clears.
    let mut prev = clock.read_seconds();
    for _ in 0..1_000 {
        handle.advance(0.001);
        let now = clock.read_seconds();
        assert!(now >= prev);
        prev = now;
    }
    assert!(clock.health().timer_faulty);

    let t1 = clock.read_seconds();
    handle.advance(0.100);
    let t2 = clock.read_seconds();
    assert!(
        (t2 - t1 - 0.100).abs() < 0.005,
        "fallback no longer tracking ticks: {}",
        t2 - t1
    );
}

#[test]
fn test_transition_is_continuous() {
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    handle.advance(2.0);
    let before = clock.read_seconds();

    handle.advance(0.002);
    handle.shift_high_res(5.0);
    let after = clock.read_seconds();

    assert!(clock.health().timer_faulty);
    // The 5s anomaly must not appear in the returned series; only the
    // scripted 2ms (plus read costs) may.
    assert!(after >= before);
    assert!(
        after - before < 0.010,
        "jump leaked into the time series: {}",
        after - before
    );
}

#[test]
fn test_reads_stay_monotonic_across_backwards_fault() {
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    handle.advance(1.0);
    let before = clock.read_seconds();

    handle.shift_high_res(-0.050);
    let at_transition = clock.read_seconds();
    assert!(clock.health().timer_faulty);
    assert!(
        at_transition >= before,
        "backwards anomaly leaked: {before} -> {at_transition}"
    );

    handle.advance(0.010);
    let after = clock.read_seconds();
    assert!(after >= at_transition);
}

#[test]
fn test_throttled_counter_faulted_at_checkpoint() {
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    let _ = clock.read_seconds();

    // 20% slowdown, caught by the >=1s lag checkpoint even though each
    // individual read-to-read delta stays inside the jump slack.
    handle.set_high_res_rate(0.8);
    for _ in 0..20 {
        handle.advance(0.100);
        let _ = clock.read_seconds();
    }

    assert!(clock.health().timer_faulty);
}

#[test]
fn test_mild_drift_tolerated() {
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    let _ = clock.read_seconds();

    // 100ppm drift sits inside the 200ppm allowance: never faulted.
    handle.set_high_res_rate(1.000_1);
    for _ in 0..30 {
        handle.advance(0.250);
        let _ = clock.read_seconds();
    }

    assert!(!clock.health().timer_faulty);
}

#[test]
fn test_wait_engine_survives_fault_transition() {
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    handle.advance(1.0);
    let _ = clock.read_seconds();
    handle.shift_high_res(0.300);
    let _ = clock.read_seconds();
    assert!(clock.health().timer_faulty);

    // Deadline waits keep working on the fallback timebase.
    let deadline = clock.read_adjusted_seconds() + 0.050;
    clock.wait_until(deadline);
    assert!(clock.read_adjusted_seconds() >= deadline);
}

#[test]
fn test_uptime_wraparound_refusal() {
    let counters = ScriptedCounters::new()
        .with_rollover_horizon(3600.0 * 24.0 * 48.0)
        .starting_at(3600.0 * 24.0 * 48.5);

    let result = Timebase::with_source(
        TimebaseConfig::default(),
        WaitTuningConfig::default(),
        Box::new(counters),
    );
    assert_eq!(result.err(), Some(TimebaseError::UptimeExceeded));
}

#[test]
fn test_machine_without_high_res_counter() {
    let counters = ScriptedCounters::new().without_high_res();
    let handle = counters.handle();
    let clock = scripted_timebase(counters);

    assert!(clock.high_res_frequency_hz().is_none());

    let t1 = clock.read_seconds();
    handle.advance(0.123);
    let t2 = clock.read_seconds();

    // Millisecond resolution, but correct and monotonic.
    assert!((t2 - t1 - 0.123).abs() < 0.005);
    assert!(!clock.health().timer_faulty);
    assert!(clock.map_ticks_to_seconds(1_000_000).is_none());
}

#[test]
fn test_degraded_scheduling_widens_initial_threshold() {
    let counters = ScriptedCounters::new().with_prepare_trouble();
    let clock = scripted_timebase(counters);

    assert!(clock.health().scheduling_trouble);
    assert!((clock.sleep_wait_threshold_secs() - 0.010).abs() < 1e-9);
}

#[test]
fn test_threshold_adaptation_visible_through_public_api() {
    let counters = ScriptedCounters::new().with_sleep_excess(0.004);
    let clock = scripted_timebase(counters);

    for _ in 0..6 {
        clock.wait_for_seconds(0.010);
    }

    let stats = clock.wait_stats();
    assert_eq!(stats.missed_waits, 6);
    assert_eq!(stats.threshold_raises, 1);
    assert!((clock.sleep_wait_threshold_secs() - 0.008).abs() < 1e-9);
}

#[test]
fn test_custom_thresholds_respected() {
    // A paranoid configuration: any forward jump over 50ms faults.
    let config = TimebaseConfig::new()
        .with_jump_slack(0.050)
        .with_drift_tolerance_ppm(0.0);
    let counters = ScriptedCounters::new();
    let handle = counters.handle();
    let clock = match Timebase::with_source(config, WaitTuningConfig::default(), Box::new(counters))
    {
        Ok(tb) => tb,
        Err(err) => panic!("timebase init failed: {err}"),
    };

    handle.advance(0.5);
    let _ = clock.read_seconds();
    handle.shift_high_res(0.080);
    let _ = clock.read_seconds();

    assert!(clock.health().timer_faulty);
}
