use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fence_core::{Calibration, ControllerBuilder, UnitConverter};
use fence_hardware::{SimAxis, SimGeometry};
use fence_traits::ManualClock;

fn calibration() -> Calibration {
    Calibration {
        distance_per_step: 0.01,
        left_travel_inches: 100.0,
        ..Calibration::default()
    }
}

fn sample_size(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // BENCH_SAMPLE_SIZE=10 cargo bench -p fence_core --bench step_loop
    let n = std::env::var("BENCH_SAMPLE_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(50);
    g.sample_size(n.max(10));
}

pub fn bench_full_travel(c: &mut Criterion) {
    let mut g = c.benchmark_group("step_loop");
    sample_size(&mut g);
    g.bench_function("sim_full_travel", |b| {
        b.iter_batched(
            || {
                let axis = SimAxis::new(SimGeometry::default(), 0);
                let (stepper, limits) = axis.split();
                ControllerBuilder::new()
                    .with_driver(stepper)
                    .with_limits(limits)
                    .with_calibration(calibration())
                    .with_clock(Arc::new(ManualClock::new()))
                    .build()
                    .expect("build controller")
            },
            |mut ctl| {
                let r = ctl.move_absolute(black_box(100.0)).expect("move");
                black_box(r.final_steps)
            },
            BatchSize::SmallInput,
        );
    });
    g.bench_function("sim_bounce", |b| {
        b.iter_batched(
            || {
                let axis = SimAxis::new(
                    SimGeometry {
                        left_trip: -40,
                        right_trip: 500,
                        release_steps: 120,
                    },
                    0,
                );
                let (stepper, limits) = axis.split();
                ControllerBuilder::new()
                    .with_driver(stepper)
                    .with_limits(limits)
                    .with_calibration(calibration())
                    .with_clock(Arc::new(ManualClock::new()))
                    .build()
                    .expect("build controller")
            },
            |mut ctl| black_box(ctl.move_absolute(50.0).expect("move").steps_issued),
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

pub fn bench_conversion(c: &mut Criterion) {
    let conv = UnitConverter::new(1600, 8, 0.000_739_2);
    c.bench_function("steps_from_inches", |b| {
        b.iter(|| {
            let mut acc = 0i64;
            for i in 0..1000 {
                acc = acc.wrapping_add(conv.steps_from_inches(black_box(f64::from(i) * 0.037)));
            }
            acc
        });
    });
}

criterion_group!(benches, bench_full_travel, bench_conversion);
criterion_main!(benches);
