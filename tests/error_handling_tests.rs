//! Error handling tests for all modules


use gaze_estimation::{
    app::LandmarkTrack,
    config::{Config, SolverConfig},
    error::{Error, Result},
    geometry::FrameSize,
    pnp::create_solver,
    utils::safe_cast::*,
};
use std::path::PathBuf;

#[test]
fn test_error_messages() {
    let err = Error::LandmarkCount { expected: 6, actual: 4 };
    assert_eq!(err.to_string(), "Expected 6 landmarks, got 4");

    let err = Error::MissingResource(PathBuf::from("track.yaml"));
    assert!(err.to_string().contains("track.yaml"));

    let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_zero_frame_size() {
    assert!(matches!(FrameSize::new(0, 480), Err(Error::InvalidInput(_))));
    assert!(matches!(FrameSize::new(640, 0), Err(Error::InvalidInput(_))));
}

#[test]
fn test_solver_creation_errors() {
    let config = SolverConfig {
        backend: "p3p".to_string(),
        ..SolverConfig::default()
    };
    match create_solver(&config) {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("p3p")),
        Err(e) => panic!("Expected ConfigError, got {e}"),
        Ok(_) => panic!("Expected ConfigError"),
    }

    // Backend names are case-insensitive
    let config = SolverConfig {
        backend: "Iterative".to_string(),
        ..SolverConfig::default()
    };
    assert!(create_solver(&config).is_ok());
}

#[test]
fn test_track_errors() {
    assert!(matches!(
        LandmarkTrack::from_file("definitely/not/here.yaml"),
        Err(Error::MissingResource(_))
    ));

    let path = test_helpers::temp_file("malformed-track.yaml", "frame_size: [640]\nframes: 3\n");
    let result = LandmarkTrack::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_config_errors() -> Result<()> {
    let path = test_helpers::temp_file("bad-config.yaml", "solver:\n  tolerance: -1.0\n");
    let config = Config::from_file(&path)?;
    std::fs::remove_file(&path)?;
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    Ok(())
}

#[test]
fn test_safe_cast_edges() {
    assert!(usize_to_i32(usize::MAX).is_err());
    assert!(u32_to_i32(u32::MAX).is_err());
    assert_eq!(f64_to_i32_clamp(f64::NAN, -5, 5), -5);
    assert_eq!(f64_to_i32_clamp(1e300, -5, 5), 5);
    assert_eq!(f64_to_i32_clamp(2.6, -5, 5), 3);
}
