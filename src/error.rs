//! Error types for the gaze estimation library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A landmark shape does not carry the expected number of points
    #[error("Expected {expected} landmarks, got {actual}")]
    LandmarkCount {
        /// Number of points the caller must supply
        expected: usize,
        /// Number of points actually supplied
        actual: usize,
    },

    /// Point correspondences do not determine a pose (collinear, coincident, ...)
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The `PnP` solver did not produce a usable pose
    #[error("Solver failure: {0}")]
    SolverFailure(String),

    /// A required file (model, landmark track, ...) does not exist
    #[error("Missing resource: {}", .0.display())]
    MissingResource(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::LandmarkCount { expected: 6, actual: 4 };
        assert_eq!(err.to_string(), "Expected 6 landmarks, got 4");

        let err = Error::MissingResource(PathBuf::from("data/track.yaml"));
        assert_eq!(err.to_string(), "Missing resource: data/track.yaml");

        let err = Error::DegenerateGeometry("collinear points".to_string());
        assert!(err.to_string().contains("collinear"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
