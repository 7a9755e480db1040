//! The chassis rigid body: 6-DOF state plus semi-implicit integration
//! (`SPEC_FULL.md` §3 "Chassis body", §4.B).

pub mod dynamics;

pub use dynamics::{MassProperties, RigidBodyIntegrator};

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A snapshot of everything the rollback path (`SPEC_FULL.md` §7 "Numerical")
/// needs to restore after a tick is aborted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodySnapshot {
    position: Point3<f32>,
    orientation: UnitQuaternion<f32>,
    linear_velocity: Vector3<f32>,
    angular_velocity: Vector3<f32>,
}

/// The chassis: a single 6-DOF rigid body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    /// World position (m).
    pub position: Point3<f32>,
    /// Orientation as a unit quaternion; the sole source of truth for
    /// attitude (`SPEC_FULL.md` §9 — Euler angles are display-only).
    pub orientation: UnitQuaternion<f32>,
    /// Linear velocity (m/s), world frame.
    pub linear_velocity: Vector3<f32>,
    /// Angular velocity (rad/s), world frame.
    pub angular_velocity: Vector3<f32>,
    /// Mass and inertia.
    pub mass_props: MassProperties,

    /// Force accumulator. Zero between ticks; summed in fixed order during
    /// the main phase (suspensions 0..3, tires 0..3, aero).
    pub(crate) force_accum: Vector3<f32>,
    /// Torque accumulator, same lifecycle as `force_accum`.
    pub(crate) torque_accum: Vector3<f32>,
}

impl RigidBody {
    /// Creates a chassis body at the origin, identity orientation, at rest.
    pub fn new(mass_props: MassProperties) -> Self {
        Self {
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            mass_props,
            force_accum: Vector3::zeros(),
            torque_accum: Vector3::zeros(),
        }
    }

    /// Adds a force at the center of mass.
    pub fn add_force(&mut self, force: Vector3<f32>) {
        self.force_accum += force;
    }

    /// Adds a force at a world-space point, splitting it into the linear
    /// contribution plus `τ += (p_world − p) × F`.
    pub fn add_force_at_point(&mut self, force: Vector3<f32>, point_world: Point3<f32>) {
        self.force_accum += force;
        let r = point_world - self.position;
        self.torque_accum += r.cross(&force);
    }

    /// Adds a torque about the center of mass.
    pub fn add_torque(&mut self, torque: Vector3<f32>) {
        self.torque_accum += torque;
    }

    /// `v + ω × (p_world − p)`.
    pub fn velocity_at(&self, point_world: Point3<f32>) -> Vector3<f32> {
        let r = point_world - self.position;
        self.linear_velocity + self.angular_velocity.cross(&r)
    }

    /// `I = R I_b Rᵀ`.
    pub fn world_inertia_tensor(&self) -> Matrix3<f32> {
        let r = self.orientation.to_rotation_matrix();
        r.matrix() * self.mass_props.inertia_tensor * r.matrix().transpose()
    }

    /// Inverse of [`RigidBody::world_inertia_tensor`].
    pub fn world_inverse_inertia_tensor(&self) -> Matrix3<f32> {
        let r = self.orientation.to_rotation_matrix();
        r.matrix() * self.mass_props.inverse_inertia_tensor * r.matrix().transpose()
    }

    /// Translational + rotational kinetic energy (J), used by the §8
    /// property 8 kinetic-energy-sanity test.
    pub fn kinetic_energy(&self) -> f32 {
        let translational = 0.5 * self.mass_props.mass * self.linear_velocity.norm_squared();
        let inertia_world = self.world_inertia_tensor();
        let rotational = 0.5
            * self
                .angular_velocity
                .dot(&(inertia_world * self.angular_velocity));
        translational + rotational
    }

    pub(crate) fn clear_accumulators(&mut self) {
        self.force_accum = Vector3::zeros();
        self.torque_accum = Vector3::zeros();
    }

    /// Captures the state needed to roll back a tick that went numerically
    /// unstable (`SPEC_FULL.md` §7).
    pub fn snapshot(&self) -> RigidBodySnapshot {
        RigidBodySnapshot {
            position: self.position,
            orientation: self.orientation,
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
        }
    }

    /// Restores a previously captured snapshot and clears accumulators, as
    /// if the aborted tick had never run.
    pub fn restore(&mut self, snapshot: RigidBodySnapshot) {
        self.position = snapshot.position;
        self.orientation = snapshot.orientation;
        self.linear_velocity = snapshot.linear_velocity;
        self.angular_velocity = snapshot.angular_velocity;
        self.clear_accumulators();
    }

    /// `true` if any of position, orientation, or velocities has gone
    /// non-finite — the trigger condition for a tick rollback.
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|v| v.is_finite())
            && self.orientation.into_inner().coords.iter().all(|v| v.is_finite())
            && self.linear_velocity.iter().all(|v| v.is_finite())
            && self.angular_velocity.iter().all(|v| v.is_finite())
    }
}
