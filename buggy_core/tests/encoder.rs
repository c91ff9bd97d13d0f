use std::sync::Arc;

use buggy_core::encoder::{EdgeSample, EncoderState, QuadratureEncoder, rate_rev_s};
use buggy_traits::{Channel, EdgeSink};
use rstest::rstest;

/// Drive `state` through `edges` quadrature edges spaced `spacing_us` apart.
fn pulse_train(state: &EncoderState, start_us: u64, edges: u64, spacing_us: u64, forward: bool) {
    const SEQ: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];
    let mut phase = 0usize;
    for i in 1..=edges {
        let next = if forward { (phase + 1) % 4 } else { (phase + 3) % 4 };
        let channel = if SEQ[next].0 != SEQ[phase].0 {
            Channel::A
        } else {
            Channel::B
        };
        state.on_edge(channel, SEQ[next].0, SEQ[next].1, start_us + i * spacing_us);
        phase = next;
    }
}

#[rstest]
// slow train: 100 edges at 100 µs; interval path
#[case(100, 100, 1_000_000.0 / (1024.0 * 100.0))]
// fast train: 5000 edges at 2 µs over 10 ms; count path
#[case(5_000, 2, 5_000.0 * 1_000_000.0 / (1024.0 * 10_000.0))]
fn synthetic_train_reproduces_rate(#[case] edges: u64, #[case] spacing: u64, #[case] expected: f32) {
    let state = Arc::new(EncoderState::new());
    let mut enc = QuadratureEncoder::new(state.clone(), 256, true);
    enc.start(0);
    pulse_train(&state, 0, edges, spacing, true);
    let rate = enc.sync(10_000);
    assert!(
        (rate - expected).abs() < expected * 1e-3,
        "rate {rate} expected {expected}"
    );
    assert_eq!(enc.latest(), rate);
}

#[test]
fn reverse_train_is_negative() {
    let state = Arc::new(EncoderState::new());
    let mut enc = QuadratureEncoder::new(state.clone(), 256, true);
    enc.start(0);
    pulse_train(&state, 0, 100, 100, false);
    assert!(enc.sync(10_000) < 0.0);
}

#[rstest]
#[case(true, true, 1.0)]
#[case(true, false, -1.0)]
#[case(false, true, -1.0)]
#[case(false, false, 1.0)]
fn clockwise_mount_reads_forward_as_positive(
    #[case] clockwise: bool,
    #[case] forward: bool,
    #[case] sign: f32,
) {
    let state = Arc::new(EncoderState::new());
    let mut enc = QuadratureEncoder::new(state.clone(), 256, clockwise);
    enc.start(0);
    pulse_train(&state, 0, 100, 100, forward);
    let rate = enc.sync(10_000);
    assert!(rate * sign > 0.0, "rate {rate} for clockwise={clockwise} forward={forward}");
}

#[rstest]
#[case(0)]
#[case(1)]
fn one_pulse_or_less_is_zero(#[case] edges: u64) {
    let state = Arc::new(EncoderState::new());
    let mut enc = QuadratureEncoder::new(state.clone(), 256, true);
    enc.start(0);
    pulse_train(&state, 0, edges, 500, true);
    assert_eq!(enc.sync(10_000), 0.0);
}

#[test]
fn sync_resets_count_between_calls() {
    let state = Arc::new(EncoderState::new());
    let mut enc = QuadratureEncoder::new(state.clone(), 256, true);
    enc.start(0);
    pulse_train(&state, 0, 100, 100, true);
    assert!(enc.sync(10_000) > 0.0);
    assert_eq!(state.peek().count, 0);
    // no new edges: stopped
    assert_eq!(enc.sync(20_000), 0.0);
}

#[test]
fn rate_policy_picks_formula_by_count_versus_interval() {
    let fast = EdgeSample {
        count: 50,
        interval_us: 40,
        sense: 1,
    };
    // count path: 50 / (1024 * 0.01 s)
    assert!((rate_rev_s(fast, 10_000, 1024) - 4.8828125).abs() < 1e-4);
    let slow = EdgeSample {
        count: 10,
        interval_us: 1_000,
        sense: -1,
    };
    // interval path: -1 / (1024 * 0.001 s)
    assert!((rate_rev_s(slow, 10_000, 1024) + 0.9765625).abs() < 1e-4);
}
