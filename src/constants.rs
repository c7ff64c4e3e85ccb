//! Constants used throughout the application

/// Number of landmarks used for pose solving
pub const NUM_POSE_LANDMARKS: usize = 6;

/// Number of landmarks in a full iBUG 300-W face shape
pub const NUM_SHAPE_LANDMARKS: usize = 68;

/// Indices of the pose landmarks within a 68-point shape, in role order
pub const SHAPE_68_POSE_INDICES: [usize; NUM_POSE_LANDMARKS] = [30, 8, 36, 45, 48, 54];

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: u32 = 2;

/// Depth of the model-space point projected for the nose direction line (mm)
pub const NOSE_DIRECTION_DEPTH: f64 = 1000.0;

/// Head yaw window for the looking decision (degrees, inclusive)
pub const LOOKING_YAW_LIMIT_DEG: f64 = 25.0;

/// Head pitch window for the looking decision (degrees, inclusive)
pub const LOOKING_PITCH_LIMIT_DEG: f64 = 15.0;

/// Label drawn when the subject looks at the camera
pub const LOOKING_LABEL: &str = "LOOKING!!!";

/// Default Levenberg-Marquardt iteration cap
pub const DEFAULT_SOLVER_MAX_ITERATIONS: usize = 50;

/// Default relative convergence tolerance for the solver
pub const DEFAULT_SOLVER_TOLERANCE: f64 = 1e-10;

/// Default bound on the RMS reprojection error of an accepted pose (pixels)
pub const DEFAULT_MAX_REPROJECTION_RMS: f64 = 20.0;

/// Smallest acceptable ratio of the second-smallest to the largest DLT singular value
pub const DLT_RANK_THRESHOLD: f64 = 1e-6;

/// Step used for finite-difference Jacobians
pub const JACOBIAN_STEP: f64 = 1e-6;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;

/// Head pitch magnitudes at or below this are treated as zero before folding (degrees)
pub const PITCH_FOLD_DEADBAND_DEG: f64 = 1e-3;
