//! # Perception Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use image::{Rgb, RgbImage};
use nalgebra::Vector2;
use rover_lib::{
    decision::{DecisionMgr, DriveParams},
    per::{PerMgr, PerParams},
    state::RoverState,
};

fn perception_benchmark(c: &mut Criterion) {
    let params = PerParams::default();
    let per_mgr = PerMgr::new(params.clone()).unwrap();
    let decision_mgr = DecisionMgr::new(DriveParams::default()).unwrap();

    let mut state = RoverState::new(params.world_size, params.image_width, params.image_height);
    state.pos = Vector2::new(100.0, 100.0);

    // Bright ground in the lower half, dark rock face above, and a sample in the middle
    let image = RgbImage::from_fn(params.image_width, params.image_height, |x, y| {
        if (150..170).contains(&x) && (120..130).contains(&y) {
            Rgb([150, 140, 20])
        } else if y > 90 {
            Rgb([190, 180, 170])
        } else {
            Rgb([80, 60, 50])
        }
    });

    c.bench_function("per_step", |b| {
        b.iter(|| per_mgr.step(black_box(&mut state), black_box(&image)))
    });

    c.bench_function("per_and_decision_cycle", |b| {
        b.iter(|| {
            per_mgr.step(&mut state, black_box(&image)).unwrap();
            decision_mgr.step(&mut state)
        })
    });
}

criterion_group!(benches, perception_benchmark);
criterion_main!(benches);
