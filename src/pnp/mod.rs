//! Perspective-n-Point solvers.
//!
//! A solver recovers the rigid transform that maps model points onto their
//! observed projections under a known, distortion-free camera.

/// Pure-Rust DLT + Levenberg-Marquardt solver
pub mod iterative;

/// Solver backed by `OpenCV`'s `solvePnP`
#[cfg(feature = "opencv")]
pub mod opencv_pnp;

use crate::{
    camera::CameraIntrinsics,
    config::SolverConfig,
    geometry::{Point2D, Point3D},
    pose_estimation::PoseEstimate,
    Error, Result,
};

pub use iterative::IterativePnp;

/// Trait for all `PnP` solvers
pub trait PnpSolver: Send + Sync {
    /// Find the pose minimizing reprojection error of `object_points` onto
    /// `image_points`, which correspond by position.
    ///
    /// # Errors
    ///
    /// Returns an error if the correspondences are malformed or do not
    /// determine a pose
    fn solve(
        &self,
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
    ) -> Result<PoseEstimate>;

    /// Get solver name
    fn name(&self) -> &str;
}

/// Root-mean-square pixel distance between `image_points` and the model
/// projected through `pose`
#[must_use]
pub fn reprojection_rms(
    object_points: &[Point3D],
    image_points: &[Point2D],
    camera: &CameraIntrinsics,
    pose: &PoseEstimate,
) -> f64 {
    if object_points.is_empty() {
        return 0.0;
    }
    let sum: f64 = object_points
        .iter()
        .zip(image_points)
        .map(|(object, image)| camera.project(pose, *object).distance(image).powi(2))
        .sum();
    (sum / object_points.len() as f64).sqrt()
}

/// Reject a pose that reprojects worse than `max_rms_error` pixels
///
/// # Errors
///
/// Returns [`Error::SolverFailure`] when the bound is exceeded or the error is not finite
pub fn check_reprojection(rms: f64, max_rms_error: f64) -> Result<()> {
    if rms.is_finite() && rms <= max_rms_error {
        Ok(())
    } else {
        Err(Error::SolverFailure(format!(
            "Reprojection error {rms:.2} px exceeds {max_rms_error:.2} px"
        )))
    }
}

/// Create a solver from configuration
///
/// # Errors
///
/// Returns an error if the backend name is unknown or was not compiled in
pub fn create_solver(config: &SolverConfig) -> Result<Box<dyn PnpSolver>> {
    match config.backend.to_lowercase().as_str() {
        "iterative" => Ok(Box::new(IterativePnp::new(
            config.max_iterations,
            config.tolerance,
            config.max_rms_error,
        ))),
        #[cfg(feature = "opencv")]
        "opencv" => Ok(Box::new(opencv_pnp::OpenCvPnp::new(config.max_rms_error))),
        #[cfg(not(feature = "opencv"))]
        "opencv" => Err(Error::ConfigError(
            "The opencv solver requires building with the `opencv` feature".to_string(),
        )),
        other => Err(Error::ConfigError(format!("Unknown solver backend: {other}"))),
    }
}
