//! Annotation directives for a processed face.

use crate::{
    face_model::LandmarkSet,
    gaze::GazeState,
    geometry::{FrameSize, Point2D},
    pose_estimation::HeadPose,
    utils::safe_cast::{f64_to_i32_clamp, u32_to_i32},
    Result,
};

/// Pixel coordinates further off-frame than this are clamped
const PIXEL_LIMIT: i32 = 1 << 20;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Create a color from its channels
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Landmark markers
pub const MARKER_COLOR: Color = Color::rgb(255, 0, 0);
/// Nose direction line
pub const DIRECTION_COLOR: Color = Color::rgb(0, 0, 255);
/// Label text
pub const LABEL_COLOR: Color = Color::rgb(255, 0, 255);

/// What to draw for one face
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Landmark positions to mark with circles
    pub markers: Vec<Point2D>,
    /// Nose direction line, from the nose tip outwards
    pub direction: (Point2D, Point2D),
    /// Text to draw at the bottom-left of the frame
    pub label: Option<&'static str>,
}

impl Overlay {
    /// Build the overlay for a face.
    ///
    /// `gaze` is `None` when the pose was undetermined; no label is drawn then.
    #[must_use]
    pub fn new(landmarks: &LandmarkSet, pose: &HeadPose, gaze: Option<&GazeState>) -> Self {
        Self {
            markers: landmarks.points().to_vec(),
            direction: (pose.nose_tip, pose.nose_direction),
            label: gaze.and_then(GazeState::label),
        }
    }

    /// Marker centers in whole pixels
    #[must_use]
    pub fn pixel_markers(&self) -> Vec<(i32, i32)> {
        self.markers.iter().map(to_pixel).collect()
    }

    /// Direction line endpoints in whole pixels
    #[must_use]
    pub fn pixel_direction(&self) -> ((i32, i32), (i32, i32)) {
        (to_pixel(&self.direction.0), to_pixel(&self.direction.1))
    }

    /// Baseline-left origin for the label so it sits at the bottom-left corner
    ///
    /// # Errors
    ///
    /// Returns an error if the frame height does not fit in `i32`
    pub fn label_origin(size: FrameSize, baseline: i32) -> Result<(i32, i32)> {
        Ok((1, u32_to_i32(size.height())? - baseline))
    }
}

fn to_pixel(p: &Point2D) -> (i32, i32) {
    (
        f64_to_i32_clamp(p.x, -PIXEL_LIMIT, PIXEL_LIMIT),
        f64_to_i32_clamp(p.y, -PIXEL_LIMIT, PIXEL_LIMIT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::LOOKING_LABEL, pose_estimation::PoseEstimate};
    use nalgebra::Vector3;

    fn pose(direction: Point2D) -> HeadPose {
        HeadPose {
            estimate: PoseEstimate::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1000.0)),
            nose_tip: Point2D::new(100.0, 120.0),
            nose_direction: direction,
        }
    }

    fn landmarks() -> LandmarkSet {
        LandmarkSet::new([
            Point2D::new(100.0, 120.0),
            Point2D::new(100.4, 180.6),
            Point2D::new(70.0, 90.0),
            Point2D::new(130.0, 90.0),
            Point2D::new(85.0, 150.0),
            Point2D::new(115.0, 150.0),
        ])
    }

    #[test]
    fn test_overlay_with_looking_label() {
        let gaze = GazeState {
            looking: true,
            yaw_deg: 1.0,
            pitch_deg: -2.0,
            roll_deg: 0.0,
        };
        let overlay = Overlay::new(&landmarks(), &pose(Point2D::new(110.0, 125.0)), Some(&gaze));
        assert_eq!(overlay.markers.len(), 6);
        assert_eq!(overlay.label, Some(LOOKING_LABEL));
        assert_eq!(overlay.pixel_markers()[1], (100, 181));
        assert_eq!(overlay.pixel_direction(), ((100, 120), (110, 125)));
    }

    #[test]
    fn test_overlay_without_label() {
        let gaze = GazeState {
            looking: false,
            yaw_deg: 40.0,
            pitch_deg: 0.0,
            roll_deg: 0.0,
        };
        let overlay = Overlay::new(&landmarks(), &pose(Point2D::new(0.0, 0.0)), Some(&gaze));
        assert!(overlay.label.is_none());
        let overlay = Overlay::new(&landmarks(), &pose(Point2D::new(0.0, 0.0)), None);
        assert!(overlay.label.is_none());
    }

    #[test]
    fn test_far_direction_is_clamped() {
        let overlay = Overlay::new(&landmarks(), &pose(Point2D::new(1e12, f64::NAN)), None);
        let (_, end) = overlay.pixel_direction();
        assert_eq!(end, (PIXEL_LIMIT, -PIXEL_LIMIT));
    }

    #[test]
    fn test_label_origin() {
        let size = FrameSize::new(640, 480).unwrap();
        assert_eq!(Overlay::label_origin(size, 6).unwrap(), (1, 474));
    }
}
