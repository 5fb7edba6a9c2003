//! # Profile Generation Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use profile_gen::{
    profile::{generate, generate_from_waypoints, GenOptions},
    spline::{flatten_profile, splines_from_waypoints},
    ProfileConfig, Waypoint,
};

fn envelope_benchmark(c: &mut Criterion) {
    // ---- Build a winding multi-waypoint path ----

    let config = ProfileConfig::default();

    // A slalom of waypoints, each heading swinging side to side, which keeps
    // the curvature derating busy and the envelope far from trivial
    let waypoints: Vec<Waypoint> = (0..12)
        .map(|i| {
            let x = i as f64 * 4.0;
            let y = if i % 2 == 0 { 0.0 } else { 3.0 };
            let swing = if i % 2 == 0 { -0.4 } else { 0.4 };
            Waypoint::new(x, y, -std::f64::consts::FRAC_PI_2 + swing, 2.0, 0.0, 0.0)
        })
        .collect();

    let splines = splines_from_waypoints(&waypoints).unwrap();
    let flat = flatten_profile(&splines, &config).unwrap();

    // Bench the quadratic envelope pass on its own
    c.bench_function("profile::generate", |b| {
        b.iter(|| generate(&flat, &config, &GenOptions::default()).unwrap())
    });

    // Bench the full pipeline including geometry
    c.bench_function("profile::generate_from_waypoints", |b| {
        b.iter(|| generate_from_waypoints(&waypoints, &config).unwrap())
    });
}

criterion_group!(benches, envelope_benchmark);
criterion_main!(benches);
