//! # Update Controls Benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ctrl_lib::traj_ctrl::{TrajCtrl, Waypoint};

fn update_controls_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_controls");

    // The nearest waypoint searches scan the whole path, so the cost per frame
    // should scale with the number of waypoints.
    for num_waypoints in [10usize, 100, 1000, 10000].iter() {
        let waypoints: Vec<Waypoint> = (0..*num_waypoints)
            .map(|i| Waypoint::new(i as f64 * 0.5, (i as f64 * 0.01).sin(), 5.0))
            .collect();

        let mut traj_ctrl = TrajCtrl::new(waypoints);

        // Prime so the benched frames are all active
        traj_ctrl.update_values(0.0, 0.0, 0.0, 0.0, 0.0, 0);
        traj_ctrl.update_controls().unwrap();

        let mut frame = 1u64;

        group.bench_with_input(
            BenchmarkId::from_parameter(num_waypoints),
            num_waypoints,
            |b, _| {
                b.iter(|| {
                    traj_ctrl.update_values(2.0, 0.3, 0.05, 4.0, frame as f64 * 0.05, frame);
                    traj_ctrl.update_controls().unwrap();
                    frame += 1;
                    black_box(traj_ctrl.get_commands())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, update_controls_benchmark);
criterion_main!(benches);
