//! Benchmarks for pose solving, decomposition and classification

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gaze_estimation::{
    camera::CameraIntrinsics,
    euler::{decompose, rotation_matrix, EulerAngles},
    face_model::{CanonicalFaceModel, LandmarkSet},
    gaze::GazeClassifier,
    geometry::{FrameSize, Point2D},
    pipeline::GazePipeline,
    pnp::{IterativePnp, PnpSolver},
    pose_estimation::PoseEstimate,
    utils::safe_cast::*,
};
use nalgebra::{Rotation3, Vector3};

fn test_landmarks(camera: &CameraIntrinsics) -> Vec<Point2D> {
    let rotation = Rotation3::from_euler_angles(std::f64::consts::PI + 0.1, 0.2, 0.05);
    let pose = PoseEstimate::new(rotation.scaled_axis(), Vector3::new(40.0, -25.0, 2800.0));
    CanonicalFaceModel::get()
        .points()
        .iter()
        .map(|p| camera.project(&pose, *p))
        .collect()
}

fn benchmark_pose_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_estimation");

    let size = FrameSize::new(640, 480).expect("valid frame size");
    let camera = CameraIntrinsics::from_frame_size(size);
    let image_points = test_landmarks(&camera);
    let model = CanonicalFaceModel::get().points();
    let solver = IterativePnp::default();

    group.bench_function("linear_estimate", |b| {
        b.iter(|| {
            let pose = IterativePnp::linear_estimate(model, &image_points, &camera).expect("DLT failed");
            black_box(pose);
        });
    });

    group.bench_function("solve_iterative", |b| {
        b.iter(|| {
            let pose = solver.solve(model, &image_points, &camera).expect("Pose estimation failed");
            black_box(pose);
        });
    });

    let landmarks = LandmarkSet::from_slice(&image_points).expect("six landmarks");
    let mut pipeline = GazePipeline::default();
    group.bench_function("analyze_face", |b| {
        b.iter(|| {
            let analysis = pipeline.analyze_face(size, &landmarks).expect("analysis failed");
            black_box(analysis);
        });
    });

    group.finish();
}

fn benchmark_angles(c: &mut Criterion) {
    let mut group = c.benchmark_group("angles");

    let rotation_vector = Vector3::new(3.0, 0.2, -0.1);
    group.bench_function("rodrigues", |b| {
        b.iter(|| black_box(rotation_matrix(black_box(&rotation_vector))));
    });

    let r = rotation_matrix(&rotation_vector);
    group.bench_function("decompose", |b| {
        b.iter(|| black_box(decompose(black_box(&r))));
    });

    let classifier = GazeClassifier::new();
    let angles = EulerAngles::new(0.02, 0.3, 3.0);
    group.bench_function("classify", |b| {
        b.iter(|| black_box(classifier.classify(black_box(&angles))));
    });

    group.finish();
}

fn benchmark_utils(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils");

    group.bench_function("f64_to_i32_clamp", |b| {
        b.iter(|| {
            for i in 0..100 {
                black_box(f64_to_i32_clamp(black_box(f64::from(i) * 1.5), -1000, 1000));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_pose_estimation, benchmark_angles, benchmark_utils);
criterion_main!(benches);
