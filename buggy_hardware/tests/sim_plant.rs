use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use buggy_hardware::{PlantParams, SimPlant, SimulatedMotors};
use buggy_traits::{Channel, EdgeSink, Motors};
use rstest::rstest;

/// Net signed edge count using the forward-order rule.
#[derive(Default)]
struct NetCount(AtomicI64);

impl EdgeSink for NetCount {
    fn on_edge(&self, channel: Channel, a: bool, b: bool, _now_us: u64) {
        let forward = match channel {
            Channel::A => a == b,
            Channel::B => a != b,
        };
        self.0.fetch_add(if forward { 1 } else { -1 }, Ordering::Relaxed);
    }
}

fn run(params: PlantParams, cmd: (i32, i32), ms: u64) -> (i64, i64, SimPlant) {
    let mut motors = SimulatedMotors::new(params.command_limit);
    let left = Arc::new(NetCount::default());
    let right = Arc::new(NetCount::default());
    let mut plant = SimPlant::new(params, motors.levels(), left.clone(), right.clone());
    motors.set(cmd.0, cmd.1).unwrap();
    plant.advance(0);
    for t in 1..=ms {
        plant.advance(t * 1_000);
    }
    (
        left.0.load(Ordering::Relaxed),
        right.0.load(Ordering::Relaxed),
        plant,
    )
}

#[rstest]
#[case(127, 1)]
#[case(-127, -1)]
fn edge_direction_follows_command(#[case] cmd: i32, #[case] sign: i64) {
    let params = PlantParams {
        right_clockwise: true,
        ..PlantParams::default()
    };
    let (l, r, _) = run(params, (cmd, cmd), 500);
    assert!(l * sign > 0, "left net {l}");
    assert!(r * sign > 0, "right net {r}");
}

#[test]
fn mirrored_right_encoder_counts_backwards() {
    let (l, r, _) = run(PlantParams::default(), (127, 127), 500);
    assert!(l > 0);
    assert!(r < 0);
    assert!((l + r).abs() <= 2, "mirror should be symmetric: {l} vs {r}");
}

#[test]
fn steady_state_count_matches_speed() {
    // settle first, then measure one second at full speed
    let params = PlantParams {
        time_constant_s: 0.01,
        right_clockwise: true,
        ..PlantParams::default()
    };
    let (l_half, _, _) = run(params.clone(), (127, 127), 500);
    let (l_full, _, plant) = run(params, (127, 127), 1_500);
    let per_second = l_full - l_half;
    let expected = (6.0 * 4.0 * 256.0) as i64;
    assert!((per_second - expected).abs() < expected / 50, "{per_second} vs {expected}");
    assert!(plant.vehicle_mps() > 1.2);
}

#[test]
fn zero_command_emits_nothing() {
    let (l, r, plant) = run(PlantParams::default(), (0, 0), 200);
    assert_eq!((l, r), (0, 0));
    assert_eq!(plant.vehicle_mps(), 0.0);
}
