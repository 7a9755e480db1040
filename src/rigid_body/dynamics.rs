//! Mass properties and the semi-implicit Euler integrator (`SPEC_FULL.md` §4.B).

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::RigidBody;
use crate::error::{DynamicsError, DynamicsResult};

/// Mass properties for the chassis rigid body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassProperties {
    /// Total mass (kg).
    pub mass: f32,
    /// Inverse mass (1/kg), cached for the hot path.
    pub inverse_mass: f32,
    /// Inertia tensor in body space (kg·m²).
    pub inertia_tensor: Matrix3<f32>,
    /// Inverse inertia tensor in body space.
    pub inverse_inertia_tensor: Matrix3<f32>,
}

impl MassProperties {
    /// Builds mass properties from an explicit tensor, validating positivity
    /// of mass and invertibility of the tensor (`SPEC_FULL.md` §10.2).
    pub fn new(mass: f32, inertia_tensor: Matrix3<f32>) -> DynamicsResult<Self> {
        if !(mass > 0.0) {
            return Err(DynamicsError::invalid_parameter(
                "mass",
                mass,
                "must be > 0",
            ));
        }

        let inverse_inertia_tensor = inertia_tensor.try_inverse().ok_or_else(|| {
            DynamicsError::invalid_parameter(
                "inertia_tensor",
                inertia_tensor.determinant(),
                "must be invertible (symmetric positive definite)",
            )
        })?;

        Ok(Self {
            mass,
            inverse_mass: 1.0 / mass,
            inertia_tensor,
            inverse_inertia_tensor,
        })
    }

    /// Approximates the chassis as a uniform box of the given half-extents,
    /// the same approximation the source engine derives from its box
    /// collider (`SPEC_FULL.md` §10.3).
    ///
    /// `dimensions` are full extents (width, length, height) along the
    /// body's local x/y/z axes.
    pub fn from_box(mass: f32, dimensions: Vector3<f32>) -> DynamicsResult<Self> {
        let w = dimensions.x;
        let l = dimensions.y;
        let h = dimensions.z;

        let ixx = (mass / 12.0) * (l * l + h * h);
        let iyy = (mass / 12.0) * (w * w + h * h);
        let izz = (mass / 12.0) * (w * w + l * l);

        Self::new(mass, Matrix3::from_diagonal(&Vector3::new(ixx, iyy, izz)))
    }
}

/// Stateless semi-implicit (symplectic) Euler integrator.
pub struct RigidBodyIntegrator;

impl RigidBodyIntegrator {
    /// Advances `body` by `dt`, applying `gravity` as a per-tick body force
    /// alongside whatever forces the caller has already accumulated.
    ///
    /// Order: `v ← v + (F_acc/m) dt`, `p ← p + v dt`; solve for `ω̇` from the
    /// accumulated torque against the world inverse inertia tensor,
    /// `ω ← ω + ω̇ dt`; update and renormalize the orientation quaternion;
    /// clear both accumulators.
    pub fn semi_implicit_euler(body: &mut RigidBody, dt: f32, gravity: Vector3<f32>) {
        body.force_accum += gravity * body.mass_props.mass;

        let acceleration = body.force_accum * body.mass_props.inverse_mass;
        body.linear_velocity += acceleration * dt;
        body.position += body.linear_velocity * dt;

        let inertia_world = body.world_inertia_tensor();
        let inverse_inertia_world = body.world_inverse_inertia_tensor();
        let gyroscopic = body.angular_velocity.cross(&(inertia_world * body.angular_velocity));
        let angular_acceleration = inverse_inertia_world * (body.torque_accum - gyroscopic);
        body.angular_velocity += angular_acceleration * dt;

        let omega_quat = Quaternion::new(
            0.0,
            body.angular_velocity.x,
            body.angular_velocity.y,
            body.angular_velocity.z,
        );
        let orientation_quat = body.orientation.into_inner();
        let dq = (omega_quat * orientation_quat) * 0.5;
        let integrated = Quaternion::new(
            orientation_quat.w + dq.w * dt,
            orientation_quat.i + dq.i * dt,
            orientation_quat.j + dq.j * dt,
            orientation_quat.k + dq.k * dt,
        );
        body.orientation = UnitQuaternion::from_quaternion(integrated);

        body.clear_accumulators();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_box_yields_positive_diagonal_inertia() {
        let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.4)).unwrap();
        assert!(props.inertia_tensor[(0, 0)] > 0.0);
        assert!(props.inertia_tensor[(1, 1)] > 0.0);
        assert!(props.inertia_tensor[(2, 2)] > 0.0);
        assert_relative_eq!(props.inverse_mass, 1.0 / 1200.0);
    }

    #[test]
    fn rejects_non_positive_mass() {
        assert!(MassProperties::from_box(0.0, Vector3::new(1.0, 1.0, 1.0)).is_err());
        assert!(MassProperties::from_box(-1.0, Vector3::new(1.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn free_fall_step_matches_gravity_times_dt() {
        let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.4)).unwrap();
        let mut body = RigidBody::new(props);
        let gravity = Vector3::new(0.0, 0.0, -9.81);
        let dt = 1.0 / 240.0;

        RigidBodyIntegrator::semi_implicit_euler(&mut body, dt, gravity);

        assert_relative_eq!(body.linear_velocity.z, gravity.z * dt, epsilon = 1e-6);
        assert!(body.position.z < 0.0);
    }

    #[test]
    fn integration_clears_accumulators() {
        let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.4)).unwrap();
        let mut body = RigidBody::new(props);
        body.add_force(Vector3::new(100.0, 0.0, 0.0));
        body.add_torque(Vector3::new(0.0, 0.0, 10.0));

        RigidBodyIntegrator::semi_implicit_euler(&mut body, 1.0 / 240.0, Vector3::zeros());

        assert_eq!(body.force_accum, Vector3::zeros());
        assert_eq!(body.torque_accum, Vector3::zeros());
    }

    #[test]
    fn quaternion_stays_unit_norm_after_many_steps() {
        let props = MassProperties::from_box(1200.0, Vector3::new(1.8, 4.5, 1.4)).unwrap();
        let mut body = RigidBody::new(props);
        body.angular_velocity = Vector3::new(0.3, 0.1, -0.2);

        for _ in 0..2000 {
            RigidBodyIntegrator::semi_implicit_euler(&mut body, 1.0 / 240.0, Vector3::zeros());
        }

        assert_relative_eq!(body.orientation.norm(), 1.0, epsilon = 1e-5);
    }
}
