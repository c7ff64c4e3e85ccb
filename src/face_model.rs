//! Canonical 3D face model and the matching 2D landmark set.
//!
//! Pose solving pairs model points with image points by position, so both
//! sides share the role order defined by [`LandmarkRole`].

use crate::{
    constants::{NUM_POSE_LANDMARKS, NUM_SHAPE_LANDMARKS, SHAPE_68_POSE_INDICES},
    geometry::{Point2D, Point3D},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Semantic role of each pose landmark, in correspondence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandmarkRole {
    /// Tip of the nose
    NoseTip,
    /// Bottom of the chin
    Chin,
    /// Outer corner of the left eye
    LeftEyeOuterCorner,
    /// Outer corner of the right eye
    RightEyeOuterCorner,
    /// Left corner of the mouth
    LeftMouthCorner,
    /// Right corner of the mouth
    RightMouthCorner,
}

impl LandmarkRole {
    /// All roles in correspondence order
    pub const ALL: [Self; NUM_POSE_LANDMARKS] = [
        Self::NoseTip,
        Self::Chin,
        Self::LeftEyeOuterCorner,
        Self::RightEyeOuterCorner,
        Self::LeftMouthCorner,
        Self::RightMouthCorner,
    ];

    /// Position of this role in a landmark set
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Generic adult face, millimeters, nose tip at the origin
const CANONICAL_POINTS: [Point3D; NUM_POSE_LANDMARKS] = [
    Point3D::new(0.0, 0.0, 0.0),
    Point3D::new(0.0, -330.0, -65.0),
    Point3D::new(-225.0, 170.0, -135.0),
    Point3D::new(225.0, 170.0, -135.0),
    Point3D::new(-150.0, -150.0, -125.0),
    Point3D::new(150.0, -150.0, -125.0),
];

/// Fixed reference geometry used as the world points for pose solving
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalFaceModel {
    points: [Point3D; NUM_POSE_LANDMARKS],
}

/// The process-wide model instance
pub static CANONICAL_FACE_MODEL: CanonicalFaceModel = CanonicalFaceModel {
    points: CANONICAL_POINTS,
};

impl CanonicalFaceModel {
    /// The shared canonical model
    #[must_use]
    pub fn get() -> &'static Self {
        &CANONICAL_FACE_MODEL
    }

    /// Model points in role order
    #[must_use]
    pub fn points(&self) -> &[Point3D; NUM_POSE_LANDMARKS] {
        &self.points
    }
}

impl Index<LandmarkRole> for CanonicalFaceModel {
    type Output = Point3D;

    fn index(&self, role: LandmarkRole) -> &Point3D {
        &self.points[role.index()]
    }
}

/// Six detected image points in [`LandmarkRole`] order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: [Point2D; NUM_POSE_LANDMARKS],
}

impl LandmarkSet {
    /// Create a landmark set from points already in role order
    #[must_use]
    pub const fn new(points: [Point2D; NUM_POSE_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Create a landmark set from a slice of exactly six points in role order
    ///
    /// # Errors
    ///
    /// Returns an error if the slice does not hold exactly six points
    pub fn from_slice(points: &[Point2D]) -> Result<Self> {
        let points: [Point2D; NUM_POSE_LANDMARKS] =
            points.try_into().map_err(|_| Error::LandmarkCount {
                expected: NUM_POSE_LANDMARKS,
                actual: points.len(),
            })?;
        Ok(Self::new(points))
    }

    /// Extract the pose landmarks from a detector shape.
    ///
    /// Accepts either the six pose points in role order or a full 68-point
    /// iBUG 300-W shape (nose tip 30, chin 8, eye corners 36/45, mouth corners
    /// 48/54).
    ///
    /// # Errors
    ///
    /// Returns an error if the shape has any other number of points or a
    /// selected point is not finite
    pub fn from_shape(shape: &[Point2D]) -> Result<Self> {
        let set = match shape.len() {
            NUM_POSE_LANDMARKS => Self::from_slice(shape)?,
            NUM_SHAPE_LANDMARKS => Self::new(SHAPE_68_POSE_INDICES.map(|i| shape[i])),
            actual => {
                return Err(Error::LandmarkCount {
                    expected: NUM_POSE_LANDMARKS,
                    actual,
                })
            }
        };

        if let Some(role) = LandmarkRole::ALL.iter().find(|role| !set[**role].is_finite()) {
            return Err(Error::InvalidInput(format!("Landmark {role:?} is not finite")));
        }

        Ok(set)
    }

    /// Points in role order
    #[must_use]
    pub fn points(&self) -> &[Point2D; NUM_POSE_LANDMARKS] {
        &self.points
    }
}

impl Index<LandmarkRole> for LandmarkSet {
    type Output = Point2D;

    fn index(&self, role: LandmarkRole) -> &Point2D {
        &self.points[role.index()]
    }
}
