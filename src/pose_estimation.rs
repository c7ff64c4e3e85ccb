//! Head pose from 2D landmarks: `PnP` against the canonical face model,
//! plus the projected nose direction used for drawing.

use crate::{
    camera::CameraIntrinsics,
    constants::NOSE_DIRECTION_DEPTH,
    euler::{self, EulerAngles},
    face_model::{CanonicalFaceModel, LandmarkRole, LandmarkSet},
    geometry::{Point2D, Point3D},
    pnp::{IterativePnp, PnpSolver},
    Result,
};
use nalgebra::{Matrix3, Vector3};

/// Rigid transform from model space to camera space, as returned by `PnP`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEstimate {
    /// Axis-angle rotation (direction is the axis, norm the angle in radians)
    pub rotation_vector: Vector3<f64>,
    /// Translation in model units (millimeters)
    pub translation_vector: Vector3<f64>,
}

impl PoseEstimate {
    /// Create a pose from rotation and translation vectors
    #[must_use]
    pub const fn new(rotation_vector: Vector3<f64>, translation_vector: Vector3<f64>) -> Self {
        Self {
            rotation_vector,
            translation_vector,
        }
    }

    /// Whether every component is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.rotation_vector.iter().chain(self.translation_vector.iter()).all(|v| v.is_finite())
    }

    /// Rotation matrix of this pose
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        euler::rotation_matrix(&self.rotation_vector)
    }

    /// Euler angles of this pose
    #[must_use]
    pub fn euler_angles(&self) -> EulerAngles {
        euler::decompose(&self.rotation_matrix())
    }
}

/// A solved pose plus the geometry needed to draw it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Solver output
    pub estimate: PoseEstimate,
    /// Nose tip in the image
    pub nose_tip: Point2D,
    /// Image projection of a point 1000 mm in front of the nose along the model Z axis
    pub nose_direction: Point2D,
}

/// Head pose estimator using `PnP` against the canonical face model
pub struct PoseEstimator {
    solver: Box<dyn PnpSolver>,
    model: &'static CanonicalFaceModel,
}

impl Default for PoseEstimator {
    fn default() -> Self {
        Self::new(Box::new(IterativePnp::default()))
    }
}

impl PoseEstimator {
    /// Create a pose estimator around a solver
    #[must_use]
    pub fn new(solver: Box<dyn PnpSolver>) -> Self {
        log::info!("Initializing PoseEstimator with {} solver", solver.name());
        Self {
            solver,
            model: CanonicalFaceModel::get(),
        }
    }

    /// Name of the underlying solver
    #[must_use]
    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Estimate head pose from six landmarks
    ///
    /// # Errors
    ///
    /// Returns an error if the solver cannot determine a pose. No fallback pose
    /// is substituted.
    pub fn estimate_pose(&self, landmarks: &LandmarkSet, camera: &CameraIntrinsics) -> Result<HeadPose> {
        let estimate = self
            .solver
            .solve(self.model.points(), landmarks.points(), camera)?;

        let nose_direction = camera.project(&estimate, Point3D::new(0.0, 0.0, NOSE_DIRECTION_DEPTH));
        log::trace!(
            "rvec={:?} tvec={:?}",
            estimate.rotation_vector.as_slice(),
            estimate.translation_vector.as_slice()
        );

        Ok(HeadPose {
            estimate,
            nose_tip: landmarks[LandmarkRole::NoseTip],
            nose_direction,
        })
    }
}
