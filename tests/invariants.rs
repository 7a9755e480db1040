//! Property tests for the eight cross-cutting invariants of `SPEC_FULL.md`
//! §8, exercised against the public API only.

use approx::assert_relative_eq;
use proptest::prelude::*;

use gridtrack_dynamics::prelude::*;
use gridtrack_dynamics::raycast::test_support::FlatGround;
use gridtrack_dynamics::rigid_body::MassProperties;
use gridtrack_dynamics::vehicle::suspension::SuspensionUnit;
use gridtrack_dynamics::vehicle::tire_model::{BrushTire, SlipState};

const DT: f32 = 1.0 / 240.0;

fn angular_velocity_strategy() -> impl Strategy<Value = Vector3<f32>> {
    (-20.0f32..20.0, -20.0f32..20.0, -20.0f32..20.0)
        .prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

proptest! {
    /// Invariant 1: the orientation quaternion never drifts off the unit
    /// sphere, however the body is spun, across many integration steps.
    #[test]
    fn quaternion_stays_unit_norm(omega in angular_velocity_strategy(), steps in 1u32..500) {
        let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.4)).unwrap();
        let mut body = RigidBody::new(props);
        body.angular_velocity = omega;

        for _ in 0..steps {
            RigidBodyIntegrator::semi_implicit_euler(&mut body, DT, Vector3::zeros());
        }

        prop_assert!((body.orientation.norm() - 1.0).abs() < 1e-4);
    }
}

proptest! {
    /// Invariant 2: the differential never creates or destroys torque — the
    /// split always sums back to the input, regardless of spin difference.
    #[test]
    fn differential_conserves_torque(
        total in -500.0f32..500.0,
        delta_omega in -200.0f32..200.0,
    ) {
        let diff = Differential::new(DifferentialConfig::street_lsd());
        let split = diff.split_torque(total, delta_omega, 0.0);
        prop_assert!((split.left + split.right - total).abs() < 1e-2);
    }
}

proptest! {
    /// Invariant 3: with the ground far out of raycast range, no corner is
    /// grounded, so no tire force can appear and lateral velocity never
    /// departs from its initial value under a steer input alone.
    #[test]
    fn airborne_vehicle_has_no_lateral_acceleration(steer in -0.5f32..0.5, ticks in 1u32..120) {
        let config = VehicleConfig::passenger_car().unwrap();
        let mut vehicle = Vehicle::new(config).unwrap();
        let ground = FlatGround { height: -10_000.0 };
        let input = DriverInput {
            steer,
            throttle: 0.3,
            ..Default::default()
        };

        for _ in 0..ticks {
            vehicle.on_early_fixed_tick(&input, &ground);
            vehicle.on_fixed_tick(DT, &input);
            vehicle.on_late_fixed_tick(DT);
        }

        let outputs = vehicle.outputs();
        prop_assert!(outputs.corners.iter().all(|(_, c)| !c.grounded));
        prop_assert!(outputs.linear_velocity.x.abs() < 1e-3);
        prop_assert_eq!(vehicle.rollback_count(), 0);
    }
}

proptest! {
    /// Invariant 4: compressed suspension length stays within
    /// `[0, rest_length + bump_stop_range]` and the resulting axial force is
    /// never negative, across the full plausible range of ride heights.
    #[test]
    fn suspension_travel_and_force_stay_bounded(height_fraction in -0.2f32..1.5) {
        let cfg = SuspensionConfig::passenger_car(true);
        let rest_length = cfg.rest_length;
        let bump_stop_range = cfg.bump_stop_range;
        let mut unit = SuspensionUnit::new(CornerIndex::FrontLeft, cfg);
        let ground = FlatGround { height: 0.0 };

        let anchor = Point3::new(0.0, 0.0, rest_length * height_fraction);
        unit.sample_contact(anchor, UnitQuaternion::identity(), &ground);

        let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.2)).unwrap();
        let body = RigidBody::new(props);
        let force = unit.compute_axial_force(&body, anchor, UnitQuaternion::identity(), None);

        prop_assert!(force >= 0.0);
        if unit.frame().grounded {
            let length = unit.frame().compressed_length;
            prop_assert!(length >= -1e-4 && length <= rest_length + bump_stop_range + 1e-4);
        }
    }
}

proptest! {
    /// Invariant 5: pure slip-ratio longitudinal force is antisymmetric —
    /// flipping the sign of slip flips the sign of the force, magnitude held.
    #[test]
    fn tire_longitudinal_force_is_antisymmetric_in_slip(
        kappa_velocity in 0.1f32..8.0,
        load in 500.0f32..8000.0,
    ) {
        let tire = BrushTire::new(TireConfig::passenger_car());
        let radius = tire.config().radius;
        let make_slip = |delta: f32| SlipState {
            longitudinal_velocity: 20.0,
            lateral_velocity: 0.0,
            wheel_angular_velocity: (20.0 + delta) / radius,
            vertical_load: load,
        };

        let positive = tire.force(&make_slip(kappa_velocity));
        let negative = tire.force(&make_slip(-kappa_velocity));
        prop_assert!((positive.longitudinal + negative.longitudinal).abs() < 1e-2);
    }
}

proptest! {
    /// Invariant 6: at a fixed, moderate slip, longitudinal force magnitude
    /// grows monotonically with vertical load up to the tire's reference max
    /// load (below the region where the contact patch half-length saturates).
    #[test]
    fn tire_force_grows_monotonically_with_load(low in 500.0f32..2000.0, step in 500.0f32..2000.0) {
        let tire = BrushTire::new(TireConfig::passenger_car());
        let radius = tire.config().radius;
        let slip_at = |load: f32| SlipState {
            longitudinal_velocity: 20.0,
            lateral_velocity: 0.5,
            wheel_angular_velocity: (21.0) / radius,
            vertical_load: load,
        };

        let mid = low + step;
        let high = mid + step;
        prop_assume!(high <= 6500.0);

        let f_low = tire.force(&slip_at(low)).longitudinal.abs();
        let f_mid = tire.force(&slip_at(mid)).longitudinal.abs();
        let f_high = tire.force(&slip_at(high)).longitudinal.abs();

        prop_assert!(f_low <= f_mid + 1e-2);
        prop_assert!(f_mid <= f_high + 1e-2);
    }
}

proptest! {
    /// Invariant 7: however extreme the combined slip, the resultant force
    /// magnitude never exceeds the peak friction coefficient times load by
    /// more than a small blending margin.
    #[test]
    fn tire_force_respects_friction_cap(
        kappa_velocity in -40.0f32..40.0,
        lateral_velocity in -20.0f32..20.0,
        load in 100.0f32..8000.0,
    ) {
        let cfg = TireConfig::passenger_car();
        let tire = BrushTire::new(cfg);
        let radius = cfg.radius;
        let slip = SlipState {
            longitudinal_velocity: 20.0,
            lateral_velocity,
            wheel_angular_velocity: (20.0 + kappa_velocity) / radius,
            vertical_load: load,
        };

        let force = tire.force(&slip);
        let cap = cfg.peak_friction_longitudinal.max(cfg.peak_friction_lateral) * load * 1.1;
        let magnitude = (force.longitudinal.powi(2) + force.lateral.powi(2)).sqrt();
        prop_assert!(magnitude <= cap, "{} exceeds cap {}", magnitude, cap);
    }
}

proptest! {
    /// Invariant 8: once settled on flat ground with no driver input, total
    /// kinetic energy never increases tick over tick — damping and rolling
    /// resistance only ever remove energy, they cannot inject it.
    #[test]
    fn kinetic_energy_is_non_increasing_once_grounded(settle_ticks in 200u32..600) {
        let config = VehicleConfig::passenger_car().unwrap();
        let rest_length = config.suspensions[CornerIndex::FrontLeft].rest_length;
        let mut vehicle = Vehicle::new(config).unwrap();
        vehicle.body_mut().position.z = rest_length * 1.2;
        let ground = FlatGround { height: 0.0 };
        let input = DriverInput::default();

        for _ in 0..settle_ticks {
            vehicle.on_early_fixed_tick(&input, &ground);
            vehicle.on_fixed_tick(DT, &input);
            vehicle.on_late_fixed_tick(DT);
        }

        let mut last_energy = vehicle.body().kinetic_energy();
        for _ in 0..240 {
            vehicle.on_early_fixed_tick(&input, &ground);
            vehicle.on_fixed_tick(DT, &input);
            vehicle.on_late_fixed_tick(DT);

            let energy = vehicle.body().kinetic_energy();
            prop_assert!(energy <= last_energy + 1e-3, "{} > {}", energy, last_energy);
            last_energy = energy;
        }
        prop_assert_eq!(vehicle.rollback_count(), 0);
    }
}

#[test]
fn kinetic_energy_sanity_smoke_check() {
    let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.2)).unwrap();
    let mut body = RigidBody::new(props);
    body.linear_velocity = Vector3::new(10.0, 0.0, 0.0);
    assert_relative_eq!(body.kinetic_energy(), 0.5 * 1200.0 * 100.0, epsilon = 1e-2);
}
