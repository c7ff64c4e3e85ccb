//! Approximate pinhole camera model derived from frame dimensions alone.

use crate::{
    constants::CAMERA_CENTER_FACTOR,
    geometry::{FrameSize, Point2D, Point3D},
    pose_estimation::PoseEstimate,
};
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Intrinsic parameters of an uncalibrated camera.
///
/// The focal length is approximated by the frame width and the principal point
/// sits at the frame center. Lens distortion is assumed to be zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    focal_length: f64,
    center: Point2D,
    size: FrameSize,
}

impl CameraIntrinsics {
    /// Build the intrinsics for frames of the given size
    #[must_use]
    pub fn from_frame_size(size: FrameSize) -> Self {
        // Integer halving: the principal point lands on a whole pixel.
        let center = Point2D::new(
            f64::from(size.width() / CAMERA_CENTER_FACTOR),
            f64::from(size.height() / CAMERA_CENTER_FACTOR),
        );
        Self {
            focal_length: f64::from(size.width()),
            center,
            size,
        }
    }

    /// Focal length in pixels
    #[must_use]
    pub const fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Principal point in pixels
    #[must_use]
    pub const fn center(&self) -> Point2D {
        self.center
    }

    /// Frame size these intrinsics were derived from
    #[must_use]
    pub const fn frame_size(&self) -> FrameSize {
        self.size
    }

    /// The 3x3 camera matrix
    #[rustfmt::skip]
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        let f = self.focal_length;
        Matrix3::new(
            f,   0.0, self.center.x,
            0.0, f,   self.center.y,
            0.0, 0.0, 1.0,
        )
    }

    /// Map a pixel to normalized image coordinates (inverse camera matrix)
    #[must_use]
    pub fn normalize(&self, pixel: Point2D) -> Point2D {
        Point2D::new(
            (pixel.x - self.center.x) / self.focal_length,
            (pixel.y - self.center.y) / self.focal_length,
        )
    }

    /// Project a camera-space point onto the image plane
    #[must_use]
    pub fn project_camera_point(&self, p: &Vector3<f64>) -> Point2D {
        Point2D::new(
            self.focal_length * p.x / p.z + self.center.x,
            self.focal_length * p.y / p.z + self.center.y,
        )
    }

    /// Project a model-space point through a pose onto the image plane
    #[must_use]
    pub fn project(&self, pose: &PoseEstimate, point: Point3D) -> Point2D {
        let rotation = Rotation3::new(pose.rotation_vector);
        let camera_point = rotation * point.to_vector() + pose.translation_vector;
        self.project_camera_point(&camera_point)
    }
}

/// Remembers the intrinsics for the last frame size seen.
///
/// Frame size is constant for a stream, so this recomputes at most once per
/// stream in practice.
#[derive(Debug, Default)]
pub struct IntrinsicsCache {
    current: Option<CameraIntrinsics>,
}

impl IntrinsicsCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intrinsics for the given frame size, recomputed when the size changes
    pub fn get(&mut self, size: FrameSize) -> CameraIntrinsics {
        match self.current {
            Some(intrinsics) if intrinsics.frame_size() == size => intrinsics,
            _ => {
                log::debug!("Computing camera intrinsics for {size} frames");
                let intrinsics = CameraIntrinsics::from_frame_size(size);
                self.current = Some(intrinsics);
                intrinsics
            }
        }
    }
}
