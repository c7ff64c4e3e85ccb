//! Configuration management for the gaze estimation application

use crate::{
    constants::{DEFAULT_MAX_REPROJECTION_RMS, DEFAULT_SOLVER_MAX_ITERATIONS, DEFAULT_SOLVER_TOLERANCE},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `PnP` solver configuration
    pub solver: SolverConfig,

    /// Overlay drawing configuration
    pub overlay: OverlayConfig,

    /// Input configuration
    pub input: InputConfig,

    /// Output configuration
    pub output: OutputConfig,
}

/// `PnP` solver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver backend (iterative, opencv)
    pub backend: String,

    /// Maximum Levenberg-Marquardt iterations
    pub max_iterations: usize,

    /// Relative convergence tolerance
    pub tolerance: f64,

    /// Poses whose RMS reprojection error exceeds this many pixels are rejected
    pub max_rms_error: f64,
}

/// Overlay drawing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Radius of the landmark marker circles in pixels
    pub marker_radius: i32,

    /// Thickness of the nose direction line in pixels
    pub line_thickness: i32,

    /// Scale of the label font
    pub font_scale: f64,
}

/// Input parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Landmark track to replay
    pub landmarks: Option<PathBuf>,

    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

/// Output parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the YAML run report
    pub report: Option<PathBuf>,

    /// Print `yaw=... pitch=...` for every analysed face
    pub print_angles: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: "iterative".to_string(),
            max_iterations: DEFAULT_SOLVER_MAX_ITERATIONS,
            tolerance: DEFAULT_SOLVER_TOLERANCE,
            max_rms_error: DEFAULT_MAX_REPROJECTION_RMS,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            marker_radius: 3,
            line_thickness: 2,
            font_scale: 1.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report: None,
            print_angles: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.solver.max_iterations == 0 {
            return Err(Error::ConfigError(
                "Solver max_iterations must be greater than 0".to_string(),
            ));
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return Err(Error::ConfigError(
                "Solver tolerance must be a positive number".to_string(),
            ));
        }
        if !(self.solver.max_rms_error.is_finite() && self.solver.max_rms_error > 0.0) {
            return Err(Error::ConfigError(
                "Solver max_rms_error must be a positive number".to_string(),
            ));
        }
        if !matches!(self.solver.backend.to_lowercase().as_str(), "iterative" | "opencv") {
            return Err(Error::ConfigError(format!(
                "Unknown solver backend: {}",
                self.solver.backend
            )));
        }

        if self.overlay.marker_radius <= 0 || self.overlay.line_thickness <= 0 {
            return Err(Error::ConfigError(
                "Overlay marker radius and line thickness must be positive".to_string(),
            ));
        }
        if !(self.overlay.font_scale.is_finite() && self.overlay.font_scale > 0.0) {
            return Err(Error::ConfigError("Overlay font scale must be positive".to_string()));
        }

        if self.input.max_frames == Some(0) {
            return Err(Error::ConfigError("max_frames must be greater than 0".to_string()));
        }

        if let Some(path) = &self.input.landmarks {
            if !path.exists() {
                return Err(Error::MissingResource(path.clone()));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Estimation Configuration

# PnP solver
solver:
  backend: "iterative"
  max_iterations: 50
  tolerance: 1.0e-10
  max_rms_error: 20.0

# Overlay drawing
overlay:
  marker_radius: 3
  line_thickness: 2
  font_scale: 1.0

# Input
input:
  landmarks: null
  max_frames: null

# Output
output:
  report: null
  print_angles: true
"#;
