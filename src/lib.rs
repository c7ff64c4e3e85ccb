//! Gaze estimation library: decides whether a face is looking at the camera.
//!
//! Given six 2D facial landmarks per face and the frame size, the library:
//! 1. Builds an approximate pinhole camera from the frame size
//! 2. Solves the Perspective-n-Point problem against a canonical 3D face model
//! 3. Decomposes the head rotation into yaw, pitch and roll
//! 4. Classifies the face as looking at the camera when head yaw and pitch
//!    fall inside a fixed window
//!
//! Landmark detection is outside this crate; frames of detected landmarks
//! are supplied through a [`app::FrameSource`], such as a recorded
//! [`app::LandmarkTrack`].
//!
//! # Examples
//!
//! ## Single Face
//!
//! ```no_run
//! use gaze_estimation::{
//!     camera::CameraIntrinsics,
//!     face_model::LandmarkSet,
//!     gaze::GazeClassifier,
//!     geometry::{FrameSize, Point2D},
//!     pose_estimation::PoseEstimator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let camera = CameraIntrinsics::from_frame_size(FrameSize::new(640, 480)?);
//!
//! // Nose tip, chin, eye corners, mouth corners
//! let landmarks = LandmarkSet::new([
//!     Point2D::new(359.0, 391.0),
//!     Point2D::new(399.0, 561.0),
//!     Point2D::new(337.0, 297.0),
//!     Point2D::new(513.0, 301.0),
//!     Point2D::new(345.0, 465.0),
//!     Point2D::new(453.0, 469.0),
//! ]);
//!
//! let pose = PoseEstimator::default().estimate_pose(&landmarks, &camera)?;
//! let gaze = GazeClassifier::new().classify(&pose.estimate.euler_angles());
//! println!("yaw={:.1} pitch={:.1} looking={}", gaze.yaw_deg, gaze.pitch_deg, gaze.looking);
//! # Ok(())
//! # }
//! ```
//!
//! ## Replaying a Landmark Track
//!
//! ```no_run
//! use gaze_estimation::{app::{GazeApp, LandmarkTrack}, config::Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let track = LandmarkTrack::from_file("track.yaml")?;
//! let mut app = GazeApp::new(&Config::default(), Box::new(track.into_source()))?;
//!
//! let summary = app.run(|report| {
//!     for face in report.faces.iter().filter(|f| f.is_looking()) {
//!         println!("frame {} face {} is looking", report.frame, face.face);
//!     }
//!     Ok(())
//! })?;
//! println!("{} of {} faces looking", summary.looking, summary.faces);
//! # Ok(())
//! # }
//! ```

/// Points and frame dimensions
pub mod geometry;

/// Pinhole camera approximation from frame size
pub mod camera;

/// Canonical 3D face model and 2D landmark sets
pub mod face_model;

/// Perspective-n-Point solvers
pub mod pnp;

/// Head pose estimation from landmarks
pub mod pose_estimation;

/// Rotation matrix to Euler angle decomposition
pub mod euler;

/// Looking-at-camera classification from head angles
pub mod gaze;

/// Annotation directives for processed faces
pub mod overlay;

/// Per-face and per-frame processing
pub mod pipeline;

/// Drawing overlays onto `OpenCV` images
#[cfg(feature = "opencv")]
pub mod render;

/// Utility functions for coordinate conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
