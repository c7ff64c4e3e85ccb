//! Looking-at-camera classification from Euler angles.
//!
//! The decomposer reports rotations about the camera axes. For a face the
//! rotation about the camera's vertical (Y) axis is turning the head left or
//! right and the rotation about the horizontal (X) axis is nodding, so head
//! yaw comes from the decomposer's `pitch` and head pitch from its `roll`.
//! Head pitch is then folded by `sign(p)·180 − p`: an upright face sits near
//! ±180° about X because the model's Y axis points up while image Y points
//! down, and the fold brings it back around 0°.

use crate::{
    constants::{LOOKING_LABEL, LOOKING_PITCH_LIMIT_DEG, LOOKING_YAW_LIMIT_DEG, PITCH_FOLD_DEADBAND_DEG},
    euler::EulerAngles,
};
use serde::{Deserialize, Serialize};

/// `-1`, `0` or `1` according to the sign of `x`; zero stays zero
#[must_use]
pub fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Fold a head pitch in degrees: `sign(p)·180 − p`, except near zero.
///
/// Unlike the literal formula, which only leaves an exact `0.0` in place,
/// any pitch within [`PITCH_FOLD_DEADBAND_DEG`] of zero is returned
/// unchanged. Solver round-off around an unrotated pose would otherwise
/// fold to ±180°. Outside the dead band the formula applies as written.
#[must_use]
pub fn fold_pitch(pitch_deg: f64) -> f64 {
    if pitch_deg.abs() <= PITCH_FOLD_DEADBAND_DEG {
        return pitch_deg;
    }
    sign(pitch_deg) * 180.0 - pitch_deg
}

/// Per-face classification result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeState {
    /// Whether the head faces the camera
    pub looking: bool,
    /// Head yaw in degrees
    pub yaw_deg: f64,
    /// Head pitch in degrees, after folding
    pub pitch_deg: f64,
    /// Head roll in degrees (not used for classification)
    pub roll_deg: f64,
}

impl GazeState {
    /// Text to draw on the frame, if any
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.looking.then_some(LOOKING_LABEL)
    }
}

/// Threshold classifier for the looking decision
#[derive(Debug, Clone, Copy, Default)]
pub struct GazeClassifier;

impl GazeClassifier {
    /// Create a classifier
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classify decomposed angles
    #[must_use]
    pub fn classify(&self, angles: &EulerAngles) -> GazeState {
        let yaw_deg = angles.pitch.to_degrees();
        let pitch_deg = fold_pitch(angles.roll.to_degrees());
        let roll_deg = angles.yaw.to_degrees();

        GazeState {
            looking: self.classify_degrees(yaw_deg, pitch_deg),
            yaw_deg,
            pitch_deg,
            roll_deg,
        }
    }

    /// Inclusive window test on head yaw and folded head pitch, in degrees.
    ///
    /// Non-finite input is never looking.
    #[must_use]
    pub fn classify_degrees(&self, yaw_deg: f64, pitch_deg: f64) -> bool {
        (-LOOKING_YAW_LIMIT_DEG..=LOOKING_YAW_LIMIT_DEG).contains(&yaw_deg)
            && (-LOOKING_PITCH_LIMIT_DEG..=LOOKING_PITCH_LIMIT_DEG).contains(&pitch_deg)
    }
}
