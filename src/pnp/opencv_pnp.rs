//! `solvePnP` from `OpenCV` behind the [`PnpSolver`] trait.

use super::{check_reprojection, reprojection_rms, IterativePnp, PnpSolver};
use crate::{
    camera::CameraIntrinsics,
    constants::DEFAULT_MAX_REPROJECTION_RMS,
    geometry::{Point2D, Point3D},
    pose_estimation::PoseEstimate,
    utils::safe_cast::usize_to_i32,
    Error, Result,
};
use nalgebra::Vector3;
use opencv::{
    calib3d,
    core::{Mat, CV_64F},
    prelude::*,
};

/// `OpenCV`'s iterative `PnP` solver
#[derive(Debug, Clone, Copy)]
pub struct OpenCvPnp {
    max_rms_error: f64,
}

impl Default for OpenCvPnp {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REPROJECTION_RMS)
    }
}

impl OpenCvPnp {
    /// Create a solver rejecting poses that reproject worse than
    /// `max_rms_error` pixels
    #[must_use]
    pub const fn new(max_rms_error: f64) -> Self {
        Self { max_rms_error }
    }

    fn camera_matrix(camera: &CameraIntrinsics) -> Result<Mat> {
        let mut camera_matrix = Mat::zeros(3, 3, CV_64F)?.to_mat()?;
        for (idx, &value) in camera.matrix().transpose().iter().enumerate() {
            *camera_matrix.at_2d_mut::<f64>(usize_to_i32(idx / 3)?, usize_to_i32(idx % 3)?)? = value;
        }
        Ok(camera_matrix)
    }

    fn read_vector(mat: &Mat) -> Result<Vector3<f64>> {
        Ok(Vector3::new(
            *mat.at_2d::<f64>(0, 0)?,
            *mat.at_2d::<f64>(1, 0)?,
            *mat.at_2d::<f64>(2, 0)?,
        ))
    }
}

impl PnpSolver for OpenCvPnp {
    fn solve(
        &self,
        object_points: &[Point3D],
        image_points: &[Point2D],
        camera: &CameraIntrinsics,
    ) -> Result<PoseEstimate> {
        IterativePnp::check_correspondences(object_points, image_points)?;

        let rows = usize_to_i32(object_points.len())?;
        let mut object_mat = Mat::zeros(rows, 3, CV_64F)?.to_mat()?;
        let mut image_mat = Mat::zeros(rows, 2, CV_64F)?.to_mat()?;
        for (i, (object, image)) in object_points.iter().zip(image_points).enumerate() {
            let row = usize_to_i32(i)?;
            *object_mat.at_2d_mut::<f64>(row, 0)? = object.x;
            *object_mat.at_2d_mut::<f64>(row, 1)? = object.y;
            *object_mat.at_2d_mut::<f64>(row, 2)? = object.z;
            *image_mat.at_2d_mut::<f64>(row, 0)? = image.x;
            *image_mat.at_2d_mut::<f64>(row, 1)? = image.y;
        }

        // Assume no lens distortion
        let dist_coeffs = Mat::zeros(4, 1, CV_64F)?.to_mat()?;
        let mut rvec = Mat::default();
        let mut tvec = Mat::default();

        let solved = calib3d::solve_pnp(
            &object_mat,
            &image_mat,
            &Self::camera_matrix(camera)?,
            &dist_coeffs,
            &mut rvec,
            &mut tvec,
            false,
            calib3d::SOLVEPNP_ITERATIVE,
        )?;
        if !solved {
            return Err(Error::SolverFailure("solvePnP did not find a pose".to_string()));
        }

        let pose = PoseEstimate::new(Self::read_vector(&rvec)?, Self::read_vector(&tvec)?);
        if !pose.is_finite() {
            return Err(Error::SolverFailure("solvePnP produced a non-finite pose".to_string()));
        }
        check_reprojection(
            reprojection_rms(object_points, image_points, camera, &pose),
            self.max_rms_error,
        )?;
        Ok(pose)
    }

    fn name(&self) -> &str {
        "OpenCvPnp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{face_model::CanonicalFaceModel, geometry::FrameSize};

    #[test]
    fn test_agrees_with_projection() {
        let camera = CameraIntrinsics::from_frame_size(FrameSize::new(640, 480).unwrap());
        let truth = PoseEstimate::new(
            Vector3::new(std::f64::consts::PI, 0.1, 0.0),
            Vector3::new(20.0, -10.0, 2500.0),
        );
        let model = CanonicalFaceModel::get().points();
        let image: Vec<Point2D> = model.iter().map(|p| camera.project(&truth, *p)).collect();

        let pose = OpenCvPnp::default().solve(model, &image, &camera).unwrap();
        for (p, observed) in model.iter().zip(&image) {
            assert!(camera.project(&pose, *p).distance(observed) < 1e-3);
        }
    }

    #[test]
    fn test_rejects_too_few_points() {
        let camera = CameraIntrinsics::from_frame_size(FrameSize::new(640, 480).unwrap());
        let model = CanonicalFaceModel::get().points();
        let image = vec![Point2D::new(1.0, 1.0); 3];
        assert!(OpenCvPnp::default().solve(&model[..3], &image, &camera).is_err());
    }
}
