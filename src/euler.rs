//! Rotation matrix to Euler angle decomposition.
//!
//! Angles follow the Z-Y-X composition `R = Rz(yaw) · Ry(pitch) · Rx(roll)`
//! about the camera axes, so `m20 = -sin(pitch)`.

use nalgebra::{Matrix3, Rotation3, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};

/// Yaw, pitch and roll in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation about the camera Z axis
    pub yaw: f64,
    /// Rotation about the camera Y axis
    pub pitch: f64,
    /// Rotation about the camera X axis
    pub roll: f64,
}

impl EulerAngles {
    /// Create a new set of angles
    #[must_use]
    pub const fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Whether all three angles are finite.
    ///
    /// Non-finite angles mean the pose is undetermined.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }

    /// The rotation matrix these angles describe
    #[must_use]
    pub fn to_rotation_matrix(&self) -> Matrix3<f64> {
        Rotation3::from_euler_angles(self.roll, self.pitch, self.yaw).into_inner()
    }
}

/// Both decompositions of a non-degenerate rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerSolutions {
    /// Solution with `|pitch| <= π/2`; the one [`decompose`] returns
    pub primary: EulerAngles,
    /// Solution with `pitch' = π - pitch`
    pub alternate: EulerAngles,
}

impl EulerSolutions {
    /// Pick the candidate closest to a previous estimate
    #[must_use]
    pub fn closest_to(&self, previous: &EulerAngles) -> EulerAngles {
        let distance = |a: &EulerAngles| {
            angle_difference(a.yaw, previous.yaw).abs()
                + angle_difference(a.pitch, previous.pitch).abs()
                + angle_difference(a.roll, previous.roll).abs()
        };
        if distance(&self.alternate) < distance(&self.primary) {
            self.alternate
        } else {
            self.primary
        }
    }
}

/// Signed difference of two angles, wrapped to `(-π, π]`
fn angle_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(2.0 * PI);
    if d > PI {
        d - 2.0 * PI
    } else {
        d
    }
}

/// Convert an axis-angle rotation vector into a rotation matrix (Rodrigues)
#[must_use]
pub fn rotation_matrix(rotation_vector: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*rotation_vector).into_inner()
}

/// Compute both Euler decompositions of a rotation matrix.
///
/// In gimbal lock (`|m20| >= 1`) yaw and roll are not separable; yaw is set
/// to zero, the combined rotation is attributed to roll, and both solutions
/// are identical. Near the lock the division by `cos(pitch)` is unguarded and
/// may yield infinite components.
#[must_use]
pub fn decompose_all(r: &Matrix3<f64>) -> EulerSolutions {
    let m00 = r[(0, 0)];
    let m01 = r[(0, 1)];
    let m02 = r[(0, 2)];
    let m10 = r[(1, 0)];
    let m20 = r[(2, 0)];
    let m21 = r[(2, 1)];
    let m22 = r[(2, 2)];

    // >= absorbs floating-point overshoot past 1
    if m20.abs() >= 1.0 {
        let locked = if m20 < 0.0 {
            EulerAngles::new(0.0, FRAC_PI_2, m01.atan2(m02))
        } else {
            EulerAngles::new(0.0, -FRAC_PI_2, (-m01).atan2(-m02))
        };
        return EulerSolutions {
            primary: locked,
            alternate: locked,
        };
    }

    let solve = |pitch: f64| {
        let c = pitch.cos();
        EulerAngles {
            yaw: (m10 / c).atan2(m00 / c),
            pitch,
            roll: (m21 / c).atan2(m22 / c),
        }
    };

    let pitch = -m20.asin();
    EulerSolutions {
        primary: solve(pitch),
        alternate: solve(PI - pitch),
    }
}

/// Decompose a rotation matrix into yaw, pitch and roll.
///
/// Always returns the primary solution (`pitch = -asin(m20)`); orientations
/// near or beyond ±90° pitch are therefore folded back into that range.
#[must_use]
pub fn decompose(r: &Matrix3<f64>) -> EulerAngles {
    decompose_all(r).primary
}
