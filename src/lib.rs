//! GridTrack Dynamics
//!
//! A real-time, physically based vehicle-dynamics core: a fixed-timestep
//! rigid-body integrator, a four-corner ray-cast suspension with bump stops
//! and an anti-roll bar, a combined-slip brush tire model, and an
//! engine+drivetrain+differential model that closes the loop from driver
//! inputs back through the wheels to the ground.
//!
//! Rendering, asset loading, input polling, window/context management, audio,
//! and the broad-phase collision library used for environment queries are
//! explicitly out of scope — the core consumes only a raycast query against
//! static geometry and a scheduler callback that invokes fixed-rate ticks.
//!
//! # Example
//!
//! ```rust,no_run
//! use gridtrack_dynamics::prelude::*;
//! use gridtrack_dynamics::raycast::test_support::FlatGround;
//!
//! let config = VehicleConfig::passenger_car().unwrap();
//! let mut vehicle = Vehicle::new(config).unwrap();
//! let ground = FlatGround { height: 0.0 };
//! let dt = 1.0 / 240.0;
//!
//! let input = DriverInput { throttle: 0.5, ..Default::default() };
//! vehicle.on_early_fixed_tick(&input, &ground);
//! vehicle.on_fixed_tick(dt, &input);
//! vehicle.on_late_fixed_tick(dt);
//!
//! let outputs = vehicle.outputs();
//! println!("speed = {} m/s", outputs.linear_velocity.norm());
//! ```
//!
//! # Physics equations
//!
//! ## Rigid body (semi-implicit Euler)
//!
//! ```text
//! v(t+dt) = v(t) + (F_acc/m) dt
//! p(t+dt) = p(t) + v(t+dt) dt
//! ω(t+dt) = ω(t) + I^-1 (τ_acc - ω x (I ω)) dt
//! q(t+dt) = normalize(q(t) + 0.5 (0, ω) ⊗ q(t) dt)
//! ```
//!
//! ## Brush tire model (combined slip)
//!
//! A rectangular contact patch of half-length `a` (load-scaled) and
//! half-width `b` carries a linear bristle shear `(C_x κ, C_y tan α)` across
//! an adhesion region and a friction-limited sliding region; see
//! [`vehicle::tire_model`].
//!
//! ## Differential
//!
//! ```text
//! T_L + T_R = T_total
//! T_lock = clamp(preload + ramp(T_total), -cap, cap)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod corner;
pub mod drivetrain;
pub mod error;
pub mod raycast;
pub mod rigid_body;
pub mod vehicle;
pub mod wheel;

/// Convenient re-exports of the crate's public surface.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::corner::{CornerArena, CornerIndex};
    pub use crate::drivetrain::{Differential, TorqueSplit};
    pub use crate::error::{DynamicsError, DynamicsResult};
    pub use crate::raycast::{RayHit, RaycastBackend};
    pub use crate::rigid_body::{MassProperties, RigidBody, RigidBodyIntegrator};
    pub use crate::vehicle::{DriverInput, Vehicle, VehicleOutputs};
    pub use crate::wheel::{WheelHub, WheelHubConfig};

    pub use nalgebra::{Point3, UnitQuaternion, Vector3};
}
