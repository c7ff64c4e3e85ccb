//! Drawing overlays onto `OpenCV` frames.

use crate::{
    config::OverlayConfig,
    geometry::FrameSize,
    overlay::{Color, Overlay, DIRECTION_COLOR, LABEL_COLOR, MARKER_COLOR},
    Error, Result,
};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, FONT_HERSHEY_DUPLEX, LINE_8},
    prelude::*,
};

const TEXT_THICKNESS: i32 = 1;

/// `OpenCV` images are BGR
fn to_scalar(color: Color) -> Scalar {
    Scalar::new(f64::from(color.b), f64::from(color.g), f64::from(color.r), 0.0)
}

fn frame_size(image: &Mat) -> Result<FrameSize> {
    let width = u32::try_from(image.cols()).map_err(|_| Error::InvalidInput("Negative image width".to_string()))?;
    let height = u32::try_from(image.rows()).map_err(|_| Error::InvalidInput("Negative image height".to_string()))?;
    FrameSize::new(width, height)
}

/// Draw landmark markers, the nose direction line and the label, if any
///
/// # Errors
///
/// Returns an error if the image is empty or an `OpenCV` call fails
pub fn draw_overlay(image: &mut Mat, overlay: &Overlay, style: &OverlayConfig) -> Result<()> {
    let size = frame_size(image)?;

    for (x, y) in overlay.pixel_markers() {
        imgproc::circle(
            image,
            Point::new(x, y),
            style.marker_radius,
            to_scalar(MARKER_COLOR),
            -1,
            LINE_8,
            0,
        )?;
    }

    let (start, end) = overlay.pixel_direction();
    imgproc::line(
        image,
        Point::new(start.0, start.1),
        Point::new(end.0, end.1),
        to_scalar(DIRECTION_COLOR),
        style.line_thickness,
        LINE_8,
        0,
    )?;

    if let Some(label) = overlay.label {
        let mut baseline = 0;
        imgproc::get_text_size(label, FONT_HERSHEY_DUPLEX, style.font_scale, TEXT_THICKNESS, &mut baseline)?;
        let (x, y) = Overlay::label_origin(size, baseline)?;
        imgproc::put_text(
            image,
            label,
            Point::new(x, y),
            FONT_HERSHEY_DUPLEX,
            style.font_scale,
            to_scalar(LABEL_COLOR),
            TEXT_THICKNESS,
            LINE_8,
            false,
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{face_model::LandmarkSet, geometry::Point2D, pose_estimation::{HeadPose, PoseEstimate}};
    use nalgebra::Vector3;
    use opencv::core::{Vec3b, CV_8UC3};

    #[test]
    fn test_draws_marker_and_line() {
        let mut image = Mat::zeros(120, 160, CV_8UC3).unwrap().to_mat().unwrap();
        let landmarks = LandmarkSet::new([Point2D::new(40.0, 40.0); 6]);
        let pose = HeadPose {
            estimate: PoseEstimate::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1000.0)),
            nose_tip: Point2D::new(80.0, 60.0),
            nose_direction: Point2D::new(120.0, 60.0),
        };
        let overlay = Overlay::new(&landmarks, &pose, None);
        draw_overlay(&mut image, &overlay, &OverlayConfig::default()).unwrap();

        let marker = *image.at_2d::<Vec3b>(40, 40).unwrap();
        assert_eq!(marker[2], 255);
        let line = *image.at_2d::<Vec3b>(60, 100).unwrap();
        assert_eq!(line[0], 255);
        let corner = *image.at_2d::<Vec3b>(0, 159).unwrap();
        assert_eq!(corner[0], 0);
    }
}
