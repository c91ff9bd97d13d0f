use std::sync::Arc;

use buggy_core::error::BuildError;
use buggy_core::mocks::{NullMotors, NullTransport};
use buggy_core::{ControlCfg, DynVehicle, EncoderCfg, EncoderState, Encoders};
use rstest::rstest;

fn encoders() -> Encoders {
    Encoders::new(
        &EncoderCfg::default(),
        Arc::new(EncoderState::new()),
        Arc::new(EncoderState::new()),
    )
}

fn expect_build_error(err: &eyre::Report) -> &BuildError {
    err.downcast_ref::<BuildError>()
        .unwrap_or_else(|| panic!("expected BuildError, got: {err:?}"))
}

#[rstest]
fn missing_transport_is_named_first() {
    let err = DynVehicle::builder()
        .with_motors(NullMotors::default())
        .try_build()
        .expect_err("should fail with MissingTransport");
    assert!(matches!(expect_build_error(&err), BuildError::MissingTransport));
}

#[rstest]
fn missing_motors() {
    let err = DynVehicle::builder()
        .with_transport(NullTransport)
        .with_encoders(encoders())
        .try_build()
        .expect_err("should fail with MissingMotors");
    assert!(matches!(expect_build_error(&err), BuildError::MissingMotors));
}

#[rstest]
fn missing_encoders() {
    let err = DynVehicle::builder()
        .with_transport(NullTransport)
        .with_motors(NullMotors::default())
        .try_build()
        .expect_err("should fail with MissingEncoders");
    assert!(matches!(expect_build_error(&err), BuildError::MissingEncoders));
}

#[rstest]
#[case::zero_ppr(EncoderCfg { ppr: 0, ..EncoderCfg::default() }, ControlCfg::default(), "ppr must be > 0")]
#[case::zero_wheel(EncoderCfg { wheel_diameter_m: 0.0, ..EncoderCfg::default() }, ControlCfg::default(), "wheel diameter must be > 0")]
#[case::zero_max_speed(EncoderCfg::default(), ControlCfg { max_speed_mps: 0.0, ..ControlCfg::default() }, "max speed must be > 0")]
#[case::negative_slip(EncoderCfg::default(), ControlCfg { slip_tolerance_mps: -0.1, ..ControlCfg::default() }, "slip tolerance must be >= 0")]
fn invalid_settings_are_rejected(
    #[case] encoder: EncoderCfg,
    #[case] control: ControlCfg,
    #[case] msg: &str,
) {
    let err = DynVehicle::builder()
        .with_transport(NullTransport)
        .with_motors(NullMotors::default())
        .with_encoders(encoders())
        .with_encoder_cfg(encoder)
        .with_control(control)
        .build()
        .expect_err("invalid settings");
    match expect_build_error(&err) {
        BuildError::InvalidConfig(m) => assert_eq!(*m, msg),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[rstest]
fn complete_builder_builds() {
    let vehicle = DynVehicle::builder()
        .with_transport(NullTransport)
        .with_motors(NullMotors::default())
        .with_encoders(encoders())
        .build()
        .expect("complete builder");
    assert_eq!(vehicle.commander().name(), "null");
    assert_eq!(vehicle.drive().stop_reason(), None);
}
