//! Iterative `PnP`: a linear Direct Linear Transform estimate, polished by
//! Levenberg-Marquardt minimization of pixel reprojection error.
//!
//! With only six correspondences and noisy landmarks the linear estimate can
//! land in the wrong basin, up to a half turn away from the best pose. The
//! refinement is therefore started from the linear rotation, from that
//! rotation composed with half turns about each axis, and from the frontal
//! and upright orientations; the lowest-cost result wins.

use super::{check_reprojection, reprojection_rms, PnpSolver};
use crate::{
    camera::CameraIntrinsics,
    constants::{
        DEFAULT_MAX_REPROJECTION_RMS, DEFAULT_SOLVER_MAX_ITERATIONS, DEFAULT_SOLVER_TOLERANCE,
        DLT_RANK_THRESHOLD, EPSILON, JACOBIAN_STEP,
    },
    geometry::{Point2D, Point3D},
    pose_estimation::PoseEstimate,
    Error, Result,
};
use nalgebra::{DMatrix, DVector, Matrix3, Matrix3x4, Rotation3, UnitQuaternion, Vector3, Vector6};
use std::f64::consts::PI;

/// DLT needs six correspondences to pin down the 11 degrees of freedom of a
/// projection matrix.
const MIN_CORRESPONDENCES: usize = 6;

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e12;

/// Pure-Rust `PnP` solver
#[derive(Debug, Clone)]
pub struct IterativePnp {
    max_iterations: usize,
    tolerance: f64,
    max_rms_error: f64,
}

impl Default for IterativePnp {
    fn default() -> Self {
        Self::new(
            DEFAULT_SOLVER_MAX_ITERATIONS,
            DEFAULT_SOLVER_TOLERANCE,
            DEFAULT_MAX_REPROJECTION_RMS,
        )
    }
}

impl IterativePnp {
    /// Create a solver with the given refinement limits.
    ///
    /// `tolerance` is the relative cost decrease (or relative step length)
    /// below which refinement stops. Poses reprojecting worse than
    /// `max_rms_error` pixels are rejected.
    #[must_use]
    pub fn new(max_iterations: usize, tolerance: f64, max_rms_error: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            max_rms_error,
        }
    }

    /// Reject correspondences no solver can use
    pub(crate) fn check_correspondences(object_points: &[Point3D], image_points: &[Point2D]) -> Result<()> {
        if object_points.len() != image_points.len() {
            return Err(Error::InvalidInput(format!(
                "Got {} object points but {} image points",
                object_points.len(),
                image_points.len()
            )));
        }
        if object_points.len() < MIN_CORRESPONDENCES {
            return Err(Error::InvalidInput(format!(
                "At least {MIN_CORRESPONDENCES} correspondences are required, got {}",
                object_points.len()
            )));
        }
        if !image_points.iter().all(Point2D::is_finite) {
            return Err(Error::InvalidInput("Image points must be finite".to_string()));
        }
        Ok(())
    }

    /// Linear pose estimate from the Direct Linear Transform.
    ///
    /// Image points are normalized with the inverse camera matrix and model
    /// points are centered and scaled to unit mean distance before solving, so
    /// the 12-vector in the null space of the system is the projection matrix
    /// `[R | t]` up to scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the correspondences leave the projection matrix
    /// underdetermined
    pub fn linear_estimate(
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
    ) -> Result<PoseEstimate> {
        Self::check_correspondences(object_points, image_points)?;

        let n = object_points.len();
        let count = n as f64;
        let centroid = object_points.iter().map(Point3D::to_vector).sum::<Vector3<f64>>() / count;
        let scale = object_points
            .iter()
            .map(|p| (p.to_vector() - centroid).norm())
            .sum::<f64>()
            / count;
        if scale < EPSILON {
            return Err(Error::DegenerateGeometry("Object points are coincident".to_string()));
        }

        let mut system = DMatrix::<f64>::zeros(2 * n, 12);
        for (i, (object, image)) in object_points.iter().zip(image_points).enumerate() {
            let p = (object.to_vector() - centroid) / scale;
            let q = camera.normalize(*image);
            let row = 2 * i;
            for (k, value) in [p.x, p.y, p.z, 1.0].into_iter().enumerate() {
                system[(row, k)] = value;
                system[(row + 1, 4 + k)] = value;
                system[(row, 8 + k)] = -q.x * value;
                system[(row + 1, 8 + k)] = -q.y * value;
            }
        }

        let svd = system.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| Error::SolverFailure("DLT decomposition failed".to_string()))?;
        let sigma = &svd.singular_values;
        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&a, &b| sigma[a].total_cmp(&sigma[b]));
        let (smallest, second, largest) = (order[0], order[1], order[order.len() - 1]);
        log::trace!("DLT singular values: {}", sigma.transpose());

        if sigma[second] <= DLT_RANK_THRESHOLD * sigma[largest] {
            return Err(Error::DegenerateGeometry(
                "Correspondences do not determine a unique projection (collinear or coplanar points?)"
                    .to_string(),
            ));
        }

        let mut projection = Matrix3x4::from_fn(|r, c| v_t[(smallest, r * 4 + c)]);
        // The null vector has arbitrary sign; pick the one with the model in front of the camera.
        if projection[(2, 3)] < 0.0 {
            projection = -projection;
        }

        let m: Matrix3<f64> = projection.fixed_view::<3, 3>(0, 0).into_owned();
        let svd = m.svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => return Err(Error::SolverFailure("Rotation decomposition failed".to_string())),
        };
        let lambda = svd.singular_values.sum() / 3.0;
        if lambda < EPSILON {
            return Err(Error::DegenerateGeometry("Projection matrix has no rotation part".to_string()));
        }

        let mut rotation = u * v_t;
        if rotation.determinant() < 0.0 {
            let weakest = svd.singular_values.imin();
            let mut flip = Vector3::repeat(1.0);
            flip[weakest] = -1.0;
            rotation = u * Matrix3::from_diagonal(&flip) * v_t;
        }

        let translation = projection.column(3).into_owned() * (scale / lambda) - rotation * centroid;

        Ok(PoseEstimate::new(
            rotation_vector_of(&Rotation3::from_matrix_unchecked(rotation)),
            translation,
        ))
    }

    /// Least-squares translation placing the model, rotated by `rotation`,
    /// onto the observed rays
    fn translation_for(
        rotation: &Rotation3<f64>,
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
    ) -> Option<Vector3<f64>> {
        let mut normal = Matrix3::<f64>::zeros();
        let mut rhs = Vector3::<f64>::zeros();
        for (object, image) in object_points.iter().zip(image_points) {
            let p = rotation * object.to_vector();
            let q = camera.normalize(*image);
            // tx - u·tz = u·pz - px and ty - v·tz = v·pz - py
            for (row, b) in [
                (Vector3::new(1.0, 0.0, -q.x), q.x * p.z - p.x),
                (Vector3::new(0.0, 1.0, -q.y), q.y * p.z - p.y),
            ] {
                normal += row * row.transpose();
                rhs += row * b;
            }
        }
        normal.cholesky().map(|c| c.solve(&rhs))
    }

    /// Starting poses for refinement, the linear estimate first
    fn starting_poses(
        linear: PoseEstimate,
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
    ) -> Vec<PoseEstimate> {
        let base = Rotation3::new(linear.rotation_vector);
        let half_turns = [Vector3::x_axis(), Vector3::y_axis(), Vector3::z_axis()]
            .map(|axis| Rotation3::from_axis_angle(&axis, PI));

        let mut rotations = Vec::with_capacity(2 * half_turns.len() + 2);
        for turn in &half_turns {
            rotations.push(base * turn);
            rotations.push(turn * base);
        }
        // Frontal and upright faces
        rotations.push(Rotation3::identity());
        rotations.push(half_turns[0]);

        std::iter::once(linear)
            .chain(rotations.into_iter().filter_map(|rotation| {
                Self::translation_for(&rotation, object_points, image_points, camera)
                    .map(|t| PoseEstimate::new(rotation_vector_of(&rotation), t))
            }))
            .collect()
    }

    fn pose_from_params(params: &Vector6<f64>) -> PoseEstimate {
        PoseEstimate::new(
            Vector3::new(params[0], params[1], params[2]),
            Vector3::new(params[3], params[4], params[5]),
        )
    }

    fn params_from_pose(pose: &PoseEstimate) -> Vector6<f64> {
        let r = pose.rotation_vector;
        let t = pose.translation_vector;
        Vector6::new(r.x, r.y, r.z, t.x, t.y, t.z)
    }

    fn residuals(
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
        params: &Vector6<f64>,
    ) -> DVector<f64> {
        let pose = Self::pose_from_params(params);
        DVector::from_iterator(
            2 * object_points.len(),
            object_points.iter().zip(image_points).flat_map(|(object, image)| {
                let projected = camera.project(&pose, *object);
                [projected.x - image.x, projected.y - image.y]
            }),
        )
    }

    fn jacobian(
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
        params: &Vector6<f64>,
    ) -> DMatrix<f64> {
        let mut jacobian = DMatrix::<f64>::zeros(2 * object_points.len(), 6);
        for k in 0..6 {
            let step = JACOBIAN_STEP * params[k].abs().max(1.0);
            let mut forward = *params;
            forward[k] += step;
            let mut backward = *params;
            backward[k] -= step;
            let column = (Self::residuals(object_points, image_points, camera, &forward)
                - Self::residuals(object_points, image_points, camera, &backward))
                / (2.0 * step);
            jacobian.set_column(k, &column);
        }
        jacobian
    }

    /// Polish a pose by Levenberg-Marquardt on the reprojection error
    #[must_use]
    pub fn refine(
        &self,
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
        initial: PoseEstimate,
    ) -> PoseEstimate {
        let mut params = Self::params_from_pose(&initial);
        let mut residual = Self::residuals(object_points, image_points, camera, &params);
        let mut cost = residual.norm_squared();
        let mut damping = INITIAL_DAMPING;

        'outer: for iteration in 0..self.max_iterations {
            if cost <= EPSILON {
                break;
            }

            let jacobian = Self::jacobian(object_points, image_points, camera, &params);
            let jacobian_t = jacobian.transpose();
            let gradient = &jacobian_t * &residual;
            let hessian = &jacobian_t * &jacobian;
            let rhs = -gradient;

            loop {
                if damping > MAX_DAMPING {
                    break 'outer;
                }

                let mut damped = hessian.clone();
                for d in 0..6 {
                    damped[(d, d)] += damping * hessian[(d, d)].max(EPSILON);
                }
                let Some(cholesky) = damped.cholesky() else {
                    damping *= 10.0;
                    continue;
                };

                let step = cholesky.solve(&rhs);
                let candidate = params + Vector6::from_column_slice(step.as_slice());
                let candidate_residual = Self::residuals(object_points, image_points, camera, &candidate);
                let candidate_cost = candidate_residual.norm_squared();

                if candidate_cost.is_finite() && candidate_cost < cost {
                    let converged = cost - candidate_cost <= self.tolerance * cost
                        || step.norm() <= self.tolerance * (params.norm() + self.tolerance);
                    params = wrap_rotation(candidate);
                    residual = candidate_residual;
                    cost = candidate_cost;
                    damping = (damping / 10.0).max(EPSILON);
                    log::trace!("LM iteration {iteration}: cost={cost:.6e} damping={damping:.1e}");
                    if converged {
                        break 'outer;
                    }
                    break;
                }

                damping *= 10.0;
            }
        }

        Self::pose_from_params(&params)
    }
}

impl PnpSolver for IterativePnp {
    fn solve(
        &self,
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
    ) -> Result<PoseEstimate> {
        let linear = Self::linear_estimate(object_points, image_points, camera)?;

        let mut best: Option<(f64, PoseEstimate)> = None;
        for initial in Self::starting_poses(linear, object_points, image_points, camera) {
            let pose = self.refine(object_points, image_points, camera, initial);
            if !pose.is_finite() || !in_front_of_camera(object_points, &pose) {
                continue;
            }
            let rms = reprojection_rms(object_points, image_points, camera, &pose);
            log::trace!("start {:?} refined to rms={rms:.3}", initial.rotation_vector.as_slice());
            if rms.is_finite() && best.as_ref().map_or(true, |(best_rms, _)| rms < *best_rms) {
                best = Some((rms, pose));
            }
        }

        let Some((rms, pose)) = best else {
            return Err(Error::SolverFailure(
                "No refined pose places the model in front of the camera".to_string(),
            ));
        };
        log::debug!("PnP solved with reprojection rms {rms:.3} px");
        check_reprojection(rms, self.max_rms_error)?;

        Ok(pose)
    }

    fn name(&self) -> &str {
        "IterativePnp"
    }
}

/// Axis-angle vector of a rotation, taken through a unit quaternion so the
/// axis stays well conditioned near a half turn
fn rotation_vector_of(rotation: &Rotation3<f64>) -> Vector3<f64> {
    UnitQuaternion::from_rotation_matrix(rotation).scaled_axis()
}

/// Re-express the rotation part of LM parameters with an angle of at most π
fn wrap_rotation(params: Vector6<f64>) -> Vector6<f64> {
    let r = Vector3::new(params[0], params[1], params[2]);
    let wrapped = UnitQuaternion::from_scaled_axis(r).scaled_axis();
    Vector6::new(wrapped.x, wrapped.y, wrapped.z, params[3], params[4], params[5])
}

fn in_front_of_camera(object_points: &[Point3D], pose: &PoseEstimate) -> bool {
    let rotation = Rotation3::new(pose.rotation_vector);
    object_points
        .iter()
        .all(|p| (rotation * p.to_vector() + pose.translation_vector).z > 0.0)
}
