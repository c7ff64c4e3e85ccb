//! Gaze estimation application: replays recorded landmarks and reports who looks at the camera.

use anyhow::{bail, Context, Result};
use clap::Parser;
use gaze_estimation::{
    app::{GazeApp, LandmarkTrack, RunReport},
    config::Config,
    constants::LOOKING_LABEL,
    pipeline::FrameReport,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Landmark track to replay (YAML)
    #[arg(short, long)]
    landmarks: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Write a YAML report of every frame to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// PnP solver backend (iterative, opencv)
    #[arg(short, long)]
    solver: Option<String>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Do not print per-face angles
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn print_frame(report: &FrameReport) {
    for face in &report.faces {
        let Some(gaze) = &face.gaze else {
            continue;
        };
        if gaze.looking {
            println!(
                "frame={} face={} yaw={:.2} pitch={:.2} {}",
                report.frame, face.face, gaze.yaw_deg, gaze.pitch_deg, LOOKING_LABEL
            );
        } else {
            println!(
                "frame={} face={} yaw={:.2} pitch={:.2}",
                report.frame, face.face, gaze.yaw_deg, gaze.pitch_deg
            );
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Gaze Estimation");

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        Config::default()
    };

    // Command line overrides the config file
    if let Some(landmarks) = args.landmarks {
        config.input.landmarks = Some(landmarks);
    }
    if let Some(output) = args.output {
        config.output.report = Some(output);
    }
    if let Some(solver) = args.solver {
        config.solver.backend = solver;
    }
    if let Some(max_frames) = args.max_frames {
        config.input.max_frames = Some(max_frames);
    }
    if args.quiet {
        config.output.print_angles = false;
    }
    config.validate().context("Invalid configuration")?;

    let Some(track_path) = &config.input.landmarks else {
        bail!("No landmark track given; pass --landmarks or set input.landmarks in the config");
    };
    let track = LandmarkTrack::from_file(track_path)
        .with_context(|| format!("Failed to load landmark track {}", track_path.display()))?;

    // Create and run application
    let mut app = GazeApp::new(&config, Box::new(track.into_source()))?;
    let keep_frames = config.output.report.is_some();
    let mut frames = Vec::new();

    let summary = app.run(|report| {
        if config.output.print_angles {
            print_frame(report);
        }
        if keep_frames {
            frames.push(report.clone());
        }
        Ok(())
    })?;

    println!(
        "frames={} faces={} looking={} undetermined={} rejected={}",
        summary.frames, summary.faces, summary.looking, summary.undetermined, summary.rejected
    );

    if let Some(path) = &config.output.report {
        RunReport { summary, frames }
            .write_to(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
