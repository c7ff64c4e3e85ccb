//! Main application module for gaze estimation.

use crate::{
    config::Config,
    geometry::{FrameSize, Point2D},
    pipeline::{FrameReport, GazePipeline},
    Error, Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

/// One frame's worth of detected face shapes
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in the stream, starting at 0
    pub index: u64,
    /// Frame dimensions
    pub size: FrameSize,
    /// One landmark shape (6 or 68 points) per detected face
    pub faces: Vec<Vec<Point2D>>,
}

/// Anything that yields frames of landmark shapes
pub trait FrameSource {
    /// Next frame, or `None` at the end of the stream
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to produce a frame
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Faces detected in one recorded frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFrame {
    /// Landmark shapes, one per face
    #[serde(default)]
    pub faces: Vec<Vec<Point2D>>,
}

/// A recorded sequence of landmark detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkTrack {
    /// Size of every frame in the track
    pub frame_size: FrameSize,
    /// Frames in stream order
    #[serde(default)]
    pub frames: Vec<TrackFrame>,
}

impl LandmarkTrack {
    /// Load a track from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        info!("Loading landmark track from {}", path.display());
        let content = std::fs::read_to_string(path)?;

        Self::from_yaml(&content)
    }

    /// Parse a track from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid track
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse landmark track: {e}")))
    }

    /// Turn the track into a frame source
    #[must_use]
    pub fn into_source(self) -> TrackSource {
        TrackSource {
            size: self.frame_size,
            frames: self.frames.into_iter(),
            next_index: 0,
        }
    }
}

/// Replays a [`LandmarkTrack`] frame by frame
#[derive(Debug)]
pub struct TrackSource {
    size: FrameSize,
    frames: std::vec::IntoIter<TrackFrame>,
    next_index: u64,
}

impl FrameSource for TrackSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(frame) = self.frames.next() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;

        Ok(Some(Frame {
            index,
            size: self.size,
            faces: frame.faces,
        }))
    }
}

/// Totals over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Frames processed
    pub frames: u64,
    /// Faces seen
    pub faces: u64,
    /// Faces with a determined pose
    pub analyzed: u64,
    /// Faces classified as looking at the camera
    pub looking: u64,
    /// Faces whose pose could not be determined
    pub undetermined: u64,
    /// Faces skipped because of bad landmarks or solver failure
    pub rejected: u64,
}

impl RunSummary {
    /// Fold one frame into the totals
    pub fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        for face in &report.faces {
            self.faces += 1;
            if face.error.is_some() {
                self.rejected += 1;
            } else if face.gaze.is_none() {
                self.undetermined += 1;
            } else {
                self.analyzed += 1;
                if face.is_looking() {
                    self.looking += 1;
                }
            }
        }
    }
}

/// Everything a run produced, as written to the report file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Totals
    pub summary: RunSummary,
    /// Per-frame results
    pub frames: Vec<FrameReport>,
}

impl RunReport {
    /// Write the report as YAML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::InvalidInput(format!("Failed to serialize report: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Main application struct
pub struct GazeApp {
    pipeline: GazePipeline,
    source: Box<dyn FrameSource>,
    max_frames: Option<u64>,
    stop: Arc<AtomicBool>,
}

impl GazeApp {
    /// Create a new gaze estimation application
    ///
    /// # Errors
    ///
    /// Returns an error if the configured solver cannot be created
    pub fn new(config: &Config, source: Box<dyn FrameSource>) -> Result<Self> {
        info!("Initializing gaze estimation application");
        Ok(Self::with_pipeline(
            GazePipeline::from_config(config)?,
            source,
            config.input.max_frames,
        ))
    }

    /// Create an application around an existing pipeline
    #[must_use]
    pub fn with_pipeline(pipeline: GazePipeline, source: Box<dyn FrameSource>, max_frames: Option<u64>) -> Self {
        Self {
            pipeline,
            source,
            max_frames,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the run after the current frame when set
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run the main application loop, handing every frame report to `on_frame`
    ///
    /// # Errors
    ///
    /// Returns an error if the source or the callback fails
    pub fn run<F>(&mut self, mut on_frame: F) -> Result<RunSummary>
    where
        F: FnMut(&FrameReport) -> Result<()>,
    {
        info!("Starting main application loop");

        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("Stop requested");
                break;
            }
            if self.max_frames.is_some_and(|max| summary.frames >= max) {
                info!("Frame limit of {} reached", summary.frames);
                break;
            }

            let Some(frame) = self.source.next_frame()? else {
                info!("End of landmark stream reached");
                break;
            };
            debug!("Processing frame {} with {} faces", frame.index, frame.faces.len());

            let report = self.pipeline.process_frame(&frame);
            summary.record(&report);
            on_frame(&report)?;
        }

        info!(
            "Processed {} frames ({} faces, {} looking) in {:.2?}",
            summary.frames,
            summary.faces,
            summary.looking,
            start_time.elapsed()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r"
frame_size: { width: 640, height: 480 }
frames:
  - faces: []
  - faces:
      - [[1.0, 2.0], [3.0, 4.0]]
  - {}
";

    #[test]
    fn test_parse_track() {
        let track = LandmarkTrack::from_yaml(TRACK).unwrap();
        assert_eq!(track.frame_size, FrameSize::new(640, 480).unwrap());
        assert_eq!(track.frames.len(), 3);
        assert_eq!(track.frames[1].faces[0][1], Point2D::new(3.0, 4.0));
        assert!(track.frames[2].faces.is_empty());
    }

    #[test]
    fn test_track_rejects_zero_size() {
        let result = LandmarkTrack::from_yaml("frame_size: { width: 0, height: 480 }\n");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_missing_track_file() {
        assert!(matches!(
            LandmarkTrack::from_file("no/such/track.yaml"),
            Err(Error::MissingResource(_))
        ));
    }

    #[test]
    fn test_source_numbers_frames() {
        let mut source = LandmarkTrack::from_yaml(TRACK).unwrap().into_source();
        let indices: Vec<u64> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_run_counts_rejected_faces() {
        let source = LandmarkTrack::from_yaml(TRACK).unwrap().into_source();
        let mut app = GazeApp::new(&Config::default(), Box::new(source)).unwrap();
        let mut seen = Vec::new();
        let summary = app
            .run(|report| {
                seen.push(report.frame);
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.faces, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.analyzed, 0);
    }

    #[test]
    fn test_run_honours_frame_limit() {
        let source = LandmarkTrack::from_yaml(TRACK).unwrap().into_source();
        let mut app = GazeApp::with_pipeline(GazePipeline::default(), Box::new(source), Some(2));
        let summary = app.run(|_| Ok(())).unwrap();
        assert_eq!(summary.frames, 2);
    }

    #[test]
    fn test_stop_handle_ends_run() {
        let source = LandmarkTrack::from_yaml(TRACK).unwrap().into_source();
        let mut app = GazeApp::with_pipeline(GazePipeline::default(), Box::new(source), None);
        let stop = app.stop_handle();
        let summary = app
            .run(|_| {
                stop.store(true, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();
        assert_eq!(summary.frames, 1);
    }

    #[test]
    fn test_callback_error_aborts_run() {
        let source = LandmarkTrack::from_yaml(TRACK).unwrap().into_source();
        let mut app = GazeApp::with_pipeline(GazePipeline::default(), Box::new(source), None);
        let result = app.run(|_| Err(Error::InvalidInput("sink closed".to_string())));
        assert!(result.is_err());
    }
}
