//! Benchmarks for the vehicle orchestrator's fixed tick (`SPEC_FULL.md`
//! §10.6): one full early + main + late cycle against a flat-ground stub,
//! plus the standalone brush tire and suspension hot paths it calls into.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gridtrack_dynamics::prelude::*;
use gridtrack_dynamics::raycast::test_support::FlatGround;
use gridtrack_dynamics::vehicle::suspension::SuspensionUnit;
use gridtrack_dynamics::vehicle::tire_model::{BrushTire, SlipState};

const DT: f32 = 1.0 / 240.0;

fn settled_vehicle() -> (Vehicle, FlatGround) {
    let config = VehicleConfig::passenger_car().unwrap();
    let rest_length = config.suspensions[CornerIndex::FrontLeft].rest_length;
    let mut vehicle = Vehicle::new(config).unwrap();
    vehicle.body_mut().position.z = rest_length * 1.3;
    let ground = FlatGround { height: 0.0 };

    let input = DriverInput::default();
    for _ in 0..480 {
        vehicle.on_early_fixed_tick(&input, &ground);
        vehicle.on_fixed_tick(DT, &input);
        vehicle.on_late_fixed_tick(DT);
    }
    (vehicle, ground)
}

fn tick_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixed_tick");

    group.bench_function("cruise_wot", |b| {
        let (mut vehicle, ground) = settled_vehicle();
        let input = DriverInput {
            throttle: 0.6,
            ..Default::default()
        };
        b.iter(|| {
            vehicle.on_early_fixed_tick(black_box(&input), &ground);
            vehicle.on_fixed_tick(DT, black_box(&input));
            vehicle.on_late_fixed_tick(DT);
        });
    });

    group.bench_function("steady_cornering", |b| {
        let (mut vehicle, ground) = settled_vehicle();
        let input = DriverInput {
            throttle: 0.3,
            steer: 0.2,
            ..Default::default()
        };
        b.iter(|| {
            vehicle.on_early_fixed_tick(black_box(&input), &ground);
            vehicle.on_fixed_tick(DT, black_box(&input));
            vehicle.on_late_fixed_tick(DT);
        });
    });

    group.bench_function("full_brake", |b| {
        let (mut vehicle, ground) = settled_vehicle();
        let input = DriverInput {
            brake: 1.0,
            ..Default::default()
        };
        b.iter(|| {
            vehicle.on_early_fixed_tick(black_box(&input), &ground);
            vehicle.on_fixed_tick(DT, black_box(&input));
            vehicle.on_late_fixed_tick(DT);
        });
    });

    group.finish();
}

fn tire_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tire_model");
    let tire = BrushTire::new(TireConfig::passenger_car());
    let radius = tire.config().radius;

    for load in [1000.0f32, 4000.0, 7000.0] {
        group.bench_with_input(BenchmarkId::new("combined_slip", load as u32), &load, |b, &load| {
            let slip = SlipState {
                longitudinal_velocity: 20.0,
                lateral_velocity: 1.5,
                wheel_angular_velocity: (21.0) / radius,
                vertical_load: load,
            };
            b.iter(|| tire.force(black_box(&slip)));
        });
    }

    group.finish();
}

fn suspension_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("suspension");

    group.bench_function("sample_and_resolve", |b| {
        let cfg = SuspensionConfig::passenger_car(true);
        let rest_length = cfg.rest_length;
        let mut unit = SuspensionUnit::new(CornerIndex::FrontLeft, cfg);
        let ground = FlatGround { height: 0.0 };
        let anchor = Point3::new(0.0, 0.0, rest_length * 0.5);
        let props = gridtrack_dynamics::rigid_body::MassProperties::from_box(
            1200.0,
            Vector3::new(1.8, 4.5, 1.2),
        )
        .unwrap();
        let body = RigidBody::new(props);

        b.iter(|| {
            unit.sample_contact(black_box(anchor), UnitQuaternion::identity(), &ground);
            unit.compute_axial_force(&body, anchor, UnitQuaternion::identity(), None)
        });
    });

    group.finish();
}

criterion_group!(benches, tick_benchmarks, tire_benchmarks, suspension_benchmarks);
criterion_main!(benches);
