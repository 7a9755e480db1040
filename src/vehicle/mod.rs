//! The vehicle orchestrator: owns the chassis, four corners, engine, and
//! differential, and sequences one fixed tick through early/main/late
//! phases in the order §2 and §5 specify as a contract.

pub mod powertrain;
pub mod suspension;
pub mod tire_model;

pub use powertrain::{Engine, LaunchState};
pub use suspension::{ContactFrame, SuspensionUnit};
pub use tire_model::{BrushTire, SlipState, TireForce};

use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::error;

use crate::config::VehicleConfig;
use crate::corner::{CornerArena, CornerIndex};
use crate::drivetrain::Differential;
use crate::error::DynamicsResult;
use crate::raycast::RaycastBackend;
use crate::rigid_body::{MassProperties, RigidBody, RigidBodyIntegrator};
use crate::wheel::{WheelHub, WheelHubConfig};

/// Per variable-rate-frame driver input (`SPEC_FULL.md` §6 "Driver input
/// surface"). Deadzones and trigger remaps are the embedder's job; the core
/// only clamps into the documented ranges.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverInput {
    pub throttle: f32,
    pub brake: f32,
    pub steer: f32,
    pub upshift_edge: bool,
    pub downshift_edge: bool,
    pub handbrake: f32,
}

impl DriverInput {
    fn sanitized(self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            steer: self.steer.clamp(-1.0, 1.0),
            upshift_edge: self.upshift_edge,
            downshift_edge: self.downshift_edge,
            handbrake: self.handbrake.clamp(0.0, 1.0),
        }
    }
}

/// The gear-shift surface's latch state (`SPEC_FULL.md` §4.I). A button edge
/// latches a request; it is applied and cleared at the start of the next
/// fixed tick's main phase, clamped to `[1, N_gears]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GearShiftState {
    #[default]
    Idle,
    UpshiftRequested,
    DownshiftRequested,
}

/// Per-corner observable state for one fixed tick (`SPEC_FULL.md` §6
/// "Observable outputs").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerOutput {
    pub contact_point: Point3<f32>,
    pub surface_normal: Vector3<f32>,
    pub grounded: bool,
    pub suspension_force: f32,
    pub longitudinal_force: f32,
    pub lateral_force: f32,
    pub wheel_angular_velocity: f32,
    pub steer_angle: f32,
}

impl Default for CornerOutput {
    fn default() -> Self {
        Self {
            contact_point: Point3::origin(),
            surface_normal: Vector3::z(),
            grounded: false,
            suspension_force: 0.0,
            longitudinal_force: 0.0,
            lateral_force: 0.0,
            wheel_angular_velocity: 0.0,
            steer_angle: 0.0,
        }
    }
}

/// Engine telemetry for one fixed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOutput {
    pub rpm: f32,
    pub gear: usize,
    pub clutch: f32,
}

/// A full snapshot of what §6 calls Observable outputs: chassis state, the
/// four corners, and engine telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleOutputs {
    pub position: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    pub corners: CornerArena<CornerOutput>,
    pub engine: EngineOutput,
}

/// The coupled vehicle-dynamics core: one chassis, four ray-cast suspension
/// units, four brush tires, four wheel hubs, one engine, one differential.
/// Owns nothing about rendering, input polling, or asset loading — those are
/// the embedder's concern (`SPEC_FULL.md` §1).
pub struct Vehicle {
    config: VehicleConfig,
    body: RigidBody,
    suspensions: CornerArena<SuspensionUnit>,
    tires: CornerArena<BrushTire>,
    hubs: CornerArena<WheelHub>,
    hub_configs: CornerArena<WheelHubConfig>,
    engine: Engine,
    differential: Differential,
    gear_shift_state: GearShiftState,
    last_corner_outputs: CornerArena<CornerOutput>,
    rollback_count: u64,
    consecutive_rollbacks: u32,
    /// Multiplies `dt` on repeated numerical trouble (§7 "repeated
    /// occurrences throttle the fixed-step rate down"); `1.0` in steady
    /// state.
    step_rate_scale: f32,
}

const ROLLBACK_THROTTLE_STEP: f32 = 0.5;
const ROLLBACK_THROTTLE_FLOOR: f32 = 0.125;
const ROLLBACK_RECOVERY_STREAK: u32 = 120;

impl Vehicle {
    /// Builds a vehicle from a validated configuration. Construction cannot
    /// fail here because `VehicleConfig::validated` has already rejected
    /// every out-of-range parameter (§7 "Parameter out-of-range").
    pub fn new(config: VehicleConfig) -> DynamicsResult<Self> {
        let mass_props = MassProperties::from_box(config.body.mass, config.body.dimensions)?;
        let body = RigidBody::new(mass_props);

        let mut suspensions_init = [None, None, None, None];
        let mut tires_init = [None, None, None, None];
        let mut hubs_init = [None, None, None, None];
        let mut hub_configs_init = [None, None, None, None];
        for corner in CornerIndex::ALL {
            let susp_cfg = config.suspensions[corner];
            suspensions_init[corner.slot()] = Some(SuspensionUnit::new(corner, susp_cfg));
            tires_init[corner.slot()] = Some(BrushTire::new(config.tires[corner]));
            let hub_cfg = WheelHubConfig::from_suspension(&susp_cfg);
            hubs_init[corner.slot()] = Some(WheelHub::new(hub_cfg));
            hub_configs_init[corner.slot()] = Some(hub_cfg);
        }

        let suspensions = CornerArena::new(suspensions_init.map(Option::unwrap));
        let tires = CornerArena::new(tires_init.map(Option::unwrap));
        let hubs = CornerArena::new(hubs_init.map(Option::unwrap));
        let hub_configs = CornerArena::new(hub_configs_init.map(Option::unwrap));

        let engine = Engine::new(config.engine.clone());
        let differential = Differential::new(config.differential);

        Ok(Self {
            config,
            body,
            suspensions,
            tires,
            hubs,
            hub_configs,
            engine,
            differential,
            gear_shift_state: GearShiftState::Idle,
            last_corner_outputs: CornerArena::new([CornerOutput::default(); 4]),
            rollback_count: 0,
            consecutive_rollbacks: 0,
            step_rate_scale: 1.0,
        })
    }

    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    /// Mutable access to the chassis body, for embedder-side placement at
    /// scene load (position, orientation, initial velocity). Simulated
    /// quantities are otherwise written only from inside a fixed tick.
    pub fn body_mut(&mut self) -> &mut RigidBody {
        &mut self.body
    }

    pub fn rollback_count(&self) -> u64 {
        self.rollback_count
    }

    /// The scale currently applied to `dt` by the rollback throttle
    /// (`SPEC_FULL.md` §7 "repeated occurrences throttle the fixed-step
    /// rate down"). `1.0` means no throttling.
    pub fn step_rate_scale(&self) -> f32 {
        self.step_rate_scale
    }

    /// Latches a gear-shift request from a button edge; applied at the next
    /// `on_fixed_tick`.
    fn latch_gear_shift(&mut self, input: &DriverInput) {
        if self.gear_shift_state != GearShiftState::Idle {
            return;
        }
        if input.upshift_edge {
            self.gear_shift_state = GearShiftState::UpshiftRequested;
        } else if input.downshift_edge {
            self.gear_shift_state = GearShiftState::DownshiftRequested;
        }
    }

    /// Early phase (§2, §4.C): casts each corner's five rays and builds its
    /// contact frame. All four corners complete this before any force is
    /// applied (§5 ordering guarantee 1).
    pub fn on_early_fixed_tick<R: RaycastBackend>(&mut self, input: &DriverInput, raycast: &R) {
        let input = input.sanitized();
        self.latch_gear_shift(&input);

        for corner in CornerIndex::ALL {
            let susp_cfg = self.config.suspensions[corner];
            let unit = &mut self.suspensions[corner];
            unit.set_steer_angle(input.steer * susp_cfg.max_steer_angle);
            let anchor = self.body.position + self.body.orientation * susp_cfg.anchor_offset(corner);
            unit.sample_contact(anchor, self.body.orientation, raycast);
        }
    }

    /// Main phase (§2): engine RPM from current-tick wheel speeds (one-tick
    /// latency from integration, §5 ordering guarantee 2), drivetrain torque
    /// split, per-corner implicit wheel-speed integration against the brush
    /// tire, tire force applied before suspension force (§5 ordering
    /// guarantee 3), aero, then rigid-body integration with numerical
    /// rollback (§7 "Numerical").
    pub fn on_fixed_tick(&mut self, dt: f32, input: &DriverInput) {
        let input = input.sanitized();
        self.apply_latched_gear_shift();

        let dt = dt * self.step_rate_scale;
        let snapshot = self.body.snapshot();
        debug_assert_eq!(self.body.force_accum, Vector3::zeros());
        debug_assert_eq!(self.body.torque_accum, Vector3::zeros());

        let (left_corner, right_corner) = self.config.drivetrain_layout.driven_corners();
        let left_omega_rad_s = self.hubs[left_corner].angular_velocity;
        let right_omega_rad_s = self.hubs[right_corner].angular_velocity;
        let driven_radius = self.config.suspensions[left_corner].tire_radius;
        let driven_axle_angular_velocity =
            0.5 * (left_omega_rad_s + right_omega_rad_s) * driven_radius;

        self.engine.update(dt, input.throttle, driven_axle_angular_velocity);
        let total_drive_torque = self.engine.wheel_torque(input.throttle);
        let split = self
            .differential
            .split_torque(total_drive_torque, left_omega_rad_s, right_omega_rad_s);

        let mut corner_outputs = CornerArena::new([CornerOutput::default(); 4]);

        for corner in CornerIndex::ALL {
            let susp_cfg = self.config.suspensions[corner];
            let anchor = self.body.position + self.body.orientation * susp_cfg.anchor_offset(corner);
            let partner_displacement = if susp_cfg.anti_roll_stiffness > 0.0 {
                Some(self.suspensions[corner.axle_partner()].frame().displacement)
            } else {
                None
            };

            let axial_force =
                self.suspensions[corner]
                    .compute_axial_force(&self.body, anchor, self.body.orientation, partner_displacement);

            let frame = self.suspensions[corner].frame();
            let drive_torque = if corner == left_corner {
                split.left
            } else if corner == right_corner {
                split.right
            } else {
                0.0
            };
            let brake_capacity = self.brake_capacity(corner, input.brake, input.handbrake);

            let mut output = CornerOutput {
                contact_point: frame.contact_point,
                surface_normal: frame.surface_normal,
                grounded: frame.grounded,
                suspension_force: axial_force,
                steer_angle: self.suspensions[corner].steer_angle_value(),
                ..Default::default()
            };

            if frame.grounded {
                let contact_velocity = self.body.velocity_at(frame.contact_point);
                let (forward, lateral) = self.suspensions[corner].contact_basis(self.body.orientation);
                let longitudinal_velocity = contact_velocity.dot(&forward);
                let lateral_velocity = contact_velocity.dot(&lateral);

                let hub_out = self.hubs[corner].integrate_grounded(
                    &self.tires[corner],
                    dt,
                    drive_torque,
                    brake_capacity,
                    longitudinal_velocity,
                    lateral_velocity,
                    axial_force,
                );

                let world_force =
                    forward * hub_out.tire_force.longitudinal + lateral * hub_out.tire_force.lateral;
                self.body.add_force_at_point(world_force, frame.contact_point);
                let orientation = self.body.orientation;
                self.suspensions[corner].apply_to_body(&mut self.body, anchor, orientation);

                output.longitudinal_force = hub_out.tire_force.longitudinal;
                output.lateral_force = hub_out.tire_force.lateral;
                output.wheel_angular_velocity = hub_out.angular_velocity;
            } else {
                self.hubs[corner].integrate_airborne(
                    &self.hub_configs[corner],
                    dt,
                    drive_torque,
                    brake_capacity,
                );
                output.wheel_angular_velocity = self.hubs[corner].angular_velocity;
            }

            corner_outputs[corner] = output;
        }

        let aero_force = self.aero_force();
        self.body.add_force(aero_force);

        RigidBodyIntegrator::semi_implicit_euler(&mut self.body, dt, Vector3::new(0.0, 0.0, -self.config.body.gravity));

        if self.body.is_finite() {
            self.last_corner_outputs = corner_outputs;
            self.consecutive_rollbacks = 0;
            if self.step_rate_scale < 1.0 {
                self.step_rate_scale = (self.step_rate_scale * 1.01).min(1.0);
            }
        } else {
            self.rollback_count += 1;
            self.consecutive_rollbacks += 1;
            error!(
                rollback_count = self.rollback_count,
                consecutive = self.consecutive_rollbacks,
                "numerical instability detected mid-tick; rolling back to pre-tick snapshot"
            );
            self.body.restore(snapshot);
            if self.consecutive_rollbacks >= ROLLBACK_RECOVERY_STREAK {
                self.step_rate_scale = (self.step_rate_scale * ROLLBACK_THROTTLE_STEP).max(ROLLBACK_THROTTLE_FLOOR);
            }
        }
    }

    /// Late phase (§2): clears the transient, single-tick gear-shift latch.
    /// Per-corner telemetry (`last_corner_outputs`) is deliberately left
    /// intact for the variable-rate reader (§5, §6 "Observable outputs") —
    /// zeroing the ground-contact flag here, as a literal reading of §2's
    /// "clear contact flags" would suggest, would make every corner's state
    /// unobservable to a renderer reading between ticks. See `DESIGN.md`.
    pub fn on_late_fixed_tick(&mut self, _dt: f32) {
        self.gear_shift_state = GearShiftState::Idle;
    }

    fn apply_latched_gear_shift(&mut self) {
        match self.gear_shift_state {
            GearShiftState::Idle => {}
            GearShiftState::UpshiftRequested => {
                self.engine.request_upshift(self.config.engine.gear_ratios.len());
            }
            GearShiftState::DownshiftRequested => {
                self.engine.request_downshift();
            }
        }
    }

    fn brake_capacity(&self, corner: CornerIndex, brake: f32, handbrake: f32) -> f32 {
        let base = if corner.is_front() {
            self.config.braking.front_max_torque_nm
        } else {
            self.config.braking.rear_max_torque_nm
        };
        let hand = if !corner.is_front() {
            handbrake * self.config.braking.handbrake_max_torque_nm
        } else {
            0.0
        };
        brake * base + hand
    }

    /// Aerodynamic drag (opposing velocity) and downforce (along `-up`,
    /// i.e. toward the ground for a negative lift coefficient), applied to
    /// the body once per tick after all four corners (§2 main-phase order).
    fn aero_force(&self) -> Vector3<f32> {
        let v = self.body.linear_velocity;
        let speed = v.norm();
        if speed < 1e-6 {
            return Vector3::zeros();
        }
        let dynamic_pressure = 0.5 * self.config.body.air_density * speed * speed;
        let drag = -v.normalize() * dynamic_pressure * self.config.body.drag_coefficient * self.config.body.frontal_area;
        let up = self.body.orientation * Vector3::z();
        let downforce = up * dynamic_pressure * self.config.body.lift_coefficient * self.config.body.frontal_area;
        drag + downforce
    }

    /// A full snapshot of §6's Observable outputs, as of the most recently
    /// completed fixed tick.
    pub fn outputs(&self) -> VehicleOutputs {
        VehicleOutputs {
            position: self.body.position,
            orientation: self.body.orientation,
            linear_velocity: self.body.linear_velocity,
            angular_velocity: self.body.angular_velocity,
            corners: self.last_corner_outputs,
            engine: EngineOutput {
                rpm: self.engine.current_rpm,
                gear: self.engine.gear,
                clutch: self.engine.clutch,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VehicleConfig;
    use crate::raycast::test_support::FlatGround;

    fn vehicle_on_flat_ground(height: f32) -> Vehicle {
        let config = VehicleConfig::passenger_car().unwrap();
        let mut vehicle = Vehicle::new(config).unwrap();
        vehicle.body.position.z = height;
        vehicle
    }

    fn run_ticks(vehicle: &mut Vehicle, ground: &FlatGround, input: DriverInput, dt: f32, n: u32) {
        for _ in 0..n {
            vehicle.on_early_fixed_tick(&input, ground);
            vehicle.on_fixed_tick(dt, &input);
            vehicle.on_late_fixed_tick(dt);
        }
    }

    #[test]
    fn construction_from_passenger_car_preset_succeeds() {
        let config = VehicleConfig::passenger_car().unwrap();
        assert!(Vehicle::new(config).is_ok());
    }

    #[test]
    fn static_rest_settles_near_ride_height_with_negligible_velocity() {
        let ride_height = 0.14 + 0.32; // ride_height_target + tire_radius
        let mut vehicle = vehicle_on_flat_ground(ride_height * 1.3);
        let ground = FlatGround { height: 0.0 };
        let dt = 1.0 / 240.0;

        run_ticks(&mut vehicle, &ground, DriverInput::default(), dt, 480);

        assert!(vehicle.body().linear_velocity.norm() < 0.05);
        assert!(vehicle.body().angular_velocity.norm() < 0.05);
        assert_eq!(vehicle.rollback_count(), 0);
    }

    #[test]
    fn wide_open_throttle_accelerates_the_chassis_forward() {
        let mut vehicle = vehicle_on_flat_ground(0.14 + 0.32);
        let ground = FlatGround { height: 0.0 };
        let dt = 1.0 / 240.0;
        run_ticks(&mut vehicle, &ground, DriverInput::default(), dt, 120);

        let input = DriverInput {
            throttle: 1.0,
            ..Default::default()
        };
        run_ticks(&mut vehicle, &ground, input, dt, 480);

        assert!(vehicle.body().linear_velocity.y > 1.0);
    }

    #[test]
    fn quaternion_stays_unit_norm_across_many_driven_ticks() {
        let mut vehicle = vehicle_on_flat_ground(0.14 + 0.32);
        let ground = FlatGround { height: 0.0 };
        let dt = 1.0 / 240.0;
        let input = DriverInput {
            throttle: 0.6,
            steer: 0.3,
            ..Default::default()
        };
        run_ticks(&mut vehicle, &ground, input, dt, 600);

        assert!((vehicle.body().orientation.norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn airborne_vehicle_has_no_lateral_acceleration_from_tires() {
        let mut vehicle = vehicle_on_flat_ground(50.0);
        let ground = FlatGround { height: -1000.0 };
        let dt = 1.0 / 240.0;
        let input = DriverInput {
            steer: 1.0,
            throttle: 1.0,
            ..Default::default()
        };
        run_ticks(&mut vehicle, &ground, input, dt, 60);

        assert!(vehicle.body().linear_velocity.x.abs() < 1e-3);
    }

    #[test]
    fn upshift_edge_advances_gear_on_next_tick_only() {
        let mut vehicle = vehicle_on_flat_ground(0.14 + 0.32);
        let ground = FlatGround { height: 0.0 };
        let dt = 1.0 / 240.0;
        assert_eq!(vehicle.outputs().engine.gear, 1);

        let input = DriverInput {
            upshift_edge: true,
            ..Default::default()
        };
        vehicle.on_early_fixed_tick(&input, &ground);
        vehicle.on_fixed_tick(dt, &input);
        vehicle.on_late_fixed_tick(dt);
        assert_eq!(vehicle.outputs().engine.gear, 2);

        // The latch should not re-fire without a new edge.
        let idle = DriverInput::default();
        vehicle.on_early_fixed_tick(&idle, &ground);
        vehicle.on_fixed_tick(dt, &idle);
        vehicle.on_late_fixed_tick(dt);
        assert_eq!(vehicle.outputs().engine.gear, 2);
    }
}
