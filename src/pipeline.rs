//! Per-face and per-frame composition of the pose and gaze stages.

use crate::{
    app::Frame,
    camera::IntrinsicsCache,
    config::Config,
    euler::EulerAngles,
    face_model::LandmarkSet,
    gaze::{GazeClassifier, GazeState},
    geometry::FrameSize,
    overlay::Overlay,
    pnp::create_solver,
    pose_estimation::{HeadPose, PoseEstimator},
    Result,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Everything derived from one face in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnalysis {
    /// Landmarks the pose was solved from
    pub landmarks: LandmarkSet,
    /// Solved pose
    pub pose: HeadPose,
    /// Decomposed rotation
    pub angles: EulerAngles,
    /// Classification; `None` when the angles are not finite
    pub gaze: Option<GazeState>,
    /// What to draw
    pub overlay: Overlay,
}

/// Serializable outcome for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceReport {
    /// Index of the face within its frame
    pub face: usize,
    /// Classification, if the pose was determined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze: Option<GazeState>,
    /// Rotation vector, if the solver succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_vector: Option<[f64; 3]>,
    /// Translation vector, if the solver succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_vector: Option<[f64; 3]>,
    /// Why the face was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FaceReport {
    fn analyzed(face: usize, analysis: &FaceAnalysis) -> Self {
        let estimate = &analysis.pose.estimate;
        Self {
            face,
            gaze: analysis.gaze,
            rotation_vector: Some(estimate.rotation_vector.into()),
            translation_vector: Some(estimate.translation_vector.into()),
            error: None,
        }
    }

    fn rejected(face: usize, error: String) -> Self {
        Self {
            face,
            gaze: None,
            rotation_vector: None,
            translation_vector: None,
            error: Some(error),
        }
    }

    /// Whether this face was classified as looking
    #[must_use]
    pub fn is_looking(&self) -> bool {
        self.gaze.is_some_and(|g| g.looking)
    }
}

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Frame index within the stream
    pub frame: u64,
    /// One record per detected face
    pub faces: Vec<FaceReport>,
    /// Overlays for the faces that were analysed
    #[serde(skip)]
    pub overlays: Vec<Overlay>,
}

/// The landmark-to-gaze pipeline
pub struct GazePipeline {
    estimator: PoseEstimator,
    classifier: GazeClassifier,
    intrinsics: IntrinsicsCache,
}

impl Default for GazePipeline {
    fn default() -> Self {
        Self::new(PoseEstimator::default())
    }
}

impl GazePipeline {
    /// Create a pipeline around a pose estimator
    #[must_use]
    pub fn new(estimator: PoseEstimator) -> Self {
        Self {
            estimator,
            classifier: GazeClassifier::new(),
            intrinsics: IntrinsicsCache::new(),
        }
    }

    /// Create a pipeline with the solver named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the solver backend is unavailable
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(PoseEstimator::new(create_solver(&config.solver)?)))
    }

    /// Run pose estimation and classification for one face
    ///
    /// # Errors
    ///
    /// Returns an error if the pose cannot be solved
    pub fn analyze_face(&mut self, size: FrameSize, landmarks: &LandmarkSet) -> Result<FaceAnalysis> {
        let camera = self.intrinsics.get(size);
        let pose = self.estimator.estimate_pose(landmarks, &camera)?;
        let angles = pose.estimate.euler_angles();

        let gaze = if angles.is_finite() {
            Some(self.classifier.classify(&angles))
        } else {
            warn!("Pose angles are not finite, treating pose as undetermined");
            None
        };

        let overlay = Overlay::new(landmarks, &pose, gaze.as_ref());

        Ok(FaceAnalysis {
            landmarks: *landmarks,
            pose,
            angles,
            gaze,
            overlay,
        })
    }

    /// Process every face of a frame.
    ///
    /// Faces with malformed landmarks or an unsolvable pose are logged and
    /// recorded as rejected; they never abort the frame.
    pub fn process_frame(&mut self, frame: &Frame) -> FrameReport {
        let mut faces = Vec::with_capacity(frame.faces.len());
        let mut overlays = Vec::new();

        for (i, shape) in frame.faces.iter().enumerate() {
            let outcome =
                LandmarkSet::from_shape(shape).and_then(|landmarks| self.analyze_face(frame.size, &landmarks));

            match outcome {
                Ok(analysis) => {
                    if let Some(gaze) = &analysis.gaze {
                        debug!(
                            "frame {} face {}: yaw={:.2} pitch={:.2} looking={}",
                            frame.index, i, gaze.yaw_deg, gaze.pitch_deg, gaze.looking
                        );
                    }
                    faces.push(FaceReport::analyzed(i, &analysis));
                    overlays.push(analysis.overlay);
                }
                Err(e) => {
                    warn!("frame {} face {}: skipped ({})", frame.index, i, e);
                    faces.push(FaceReport::rejected(i, e.to_string()));
                }
            }
        }

        FrameReport {
            frame: frame.index,
            faces,
            overlays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::CameraIntrinsics,
        face_model::CanonicalFaceModel,
        geometry::Point2D,
        pose_estimation::PoseEstimate,
    };
    use nalgebra::Vector3;

    fn size() -> FrameSize {
        FrameSize::new(640, 480).unwrap()
    }

    fn shape_for(pose: &PoseEstimate) -> Vec<Point2D> {
        let camera = CameraIntrinsics::from_frame_size(size());
        CanonicalFaceModel::get()
            .points()
            .iter()
            .map(|p| camera.project(pose, *p))
            .collect()
    }

    #[test]
    fn test_analyze_zero_rotation() {
        let truth = PoseEstimate::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 3000.0));
        let landmarks = LandmarkSet::from_shape(&shape_for(&truth)).unwrap();
        let analysis = GazePipeline::default().analyze_face(size(), &landmarks).unwrap();

        assert!(analysis.angles.yaw.abs() < 1e-6);
        assert!(analysis.angles.pitch.abs() < 1e-6);
        assert!(analysis.angles.roll.abs() < 1e-6);
        let gaze = analysis.gaze.unwrap();
        assert!(gaze.looking);
        assert_eq!(analysis.overlay.label, Some(crate::constants::LOOKING_LABEL));
    }

    #[test]
    fn test_process_frame_skips_bad_faces() {
        let good = shape_for(&PoseEstimate::new(
            Vector3::new(std::f64::consts::PI, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 3000.0),
        ));
        let frame = Frame {
            index: 4,
            size: size(),
            faces: vec![good, vec![Point2D::new(1.0, 2.0); 3], vec![Point2D::new(320.0, 240.0); 6]],
        };

        let report = GazePipeline::default().process_frame(&frame);
        assert_eq!(report.frame, 4);
        assert_eq!(report.faces.len(), 3);
        assert_eq!(report.overlays.len(), 1);

        assert!(report.faces[0].is_looking());
        assert!(report.faces[0].error.is_none());
        assert!(report.faces[1].error.as_deref().unwrap().contains("Expected 6 landmarks"));
        assert!(report.faces[2].error.is_some());
        assert!(!report.faces[2].is_looking());
    }

    #[test]
    fn test_turned_face_not_looking() {
        let turned = shape_for(&PoseEstimate::new(
            (nalgebra::Rotation3::from_euler_angles(0.0, 0.7, 0.0)
                * nalgebra::Rotation3::from_euler_angles(std::f64::consts::PI, 0.0, 0.0))
            .scaled_axis(),
            Vector3::new(0.0, 0.0, 3000.0),
        ));
        let landmarks = LandmarkSet::from_shape(&turned).unwrap();
        let analysis = GazePipeline::default().analyze_face(size(), &landmarks).unwrap();
        let gaze = analysis.gaze.unwrap();
        assert!(!gaze.looking);
        assert!((gaze.yaw_deg.abs() - 0.7f64.to_degrees()).abs() < 1e-3);
    }
}
