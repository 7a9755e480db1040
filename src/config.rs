//! Static parameter records (`SPEC_FULL.md` §3, §10.3).
//!
//! Every sub-config validates its own fields at construction time and
//! returns a [`DynamicsResult`] — parameter-out-of-range is a construction
//! failure with no runtime recovery (`SPEC_FULL.md` §7). Everything here is
//! `serde`-serializable so an embedder may load it from disk; this crate
//! performs no I/O of its own.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::corner::{CornerArena, CornerIndex};
use crate::error::{DynamicsError, DynamicsResult};

/// The fixed-step driver's time step. `SPEC_FULL.md` §5 names `1/240` s as
/// the session-constant example.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStepConfig {
    pub dt: f32,
}

impl Default for TimeStepConfig {
    fn default() -> Self {
        Self { dt: 1.0 / 240.0 }
    }
}

impl TimeStepConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        if !(self.dt > 0.0) {
            return Err(DynamicsError::invalid_parameter("dt", self.dt, "must be > 0"));
        }
        Ok(self)
    }
}

/// Chassis mass, box-inertia half-extents, and aerodynamic coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyConfig {
    pub mass: f32,
    /// Full box extents (width, length, height) used to derive the inertia
    /// tensor approximation (`SPEC_FULL.md` §10.3).
    pub dimensions: Vector3<f32>,
    pub drag_coefficient: f32,
    pub lift_coefficient: f32,
    pub frontal_area: f32,
    pub air_density: f32,
    pub gravity: f32,
}

impl Default for RigidBodyConfig {
    fn default() -> Self {
        Self {
            mass: 1200.0,
            dimensions: Vector3::new(1.8, 4.5, 1.2),
            drag_coefficient: 0.32,
            lift_coefficient: -0.3,
            frontal_area: 2.2,
            air_density: 1.225,
            gravity: 9.81,
        }
    }
}

impl RigidBodyConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        if !(self.mass > 0.0) {
            return Err(DynamicsError::invalid_parameter("mass", self.mass, "must be > 0"));
        }
        if self.dimensions.iter().any(|d| !(*d > 0.0)) {
            return Err(DynamicsError::invalid_parameter(
                "dimensions",
                self.dimensions,
                "all extents must be > 0",
            ));
        }
        Ok(self)
    }
}

/// The 2×2 {bump, rebound} × {low, high speed} damping coefficient table
/// (`SPEC_FULL.md` §3, §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DampingTable {
    pub bump_low: f32,
    pub bump_high: f32,
    pub rebound_low: f32,
    pub rebound_high: f32,
}

impl DampingTable {
    pub fn validated(self) -> DynamicsResult<Self> {
        for (name, v) in [
            ("bump_low", self.bump_low),
            ("bump_high", self.bump_high),
            ("rebound_low", self.rebound_low),
            ("rebound_high", self.rebound_high),
        ] {
            if v < 0.0 {
                return Err(DynamicsError::invalid_parameter(name, v, "must be >= 0"));
            }
        }
        Ok(self)
    }

    /// Selects the coefficient for a given relative velocity, positive
    /// `v_rel` meaning compression (bump).
    pub fn select(&self, v_rel: f32, threshold: f32) -> f32 {
        match (v_rel >= 0.0, v_rel.abs() > threshold) {
            (true, false) => self.bump_low,
            (true, true) => self.bump_high,
            (false, false) => self.rebound_low,
            (false, true) => self.rebound_high,
        }
    }
}

/// Static per-corner suspension parameters (`SPEC_FULL.md` §3 "Suspension
/// unit").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuspensionConfig {
    /// Anchor offset along the chassis forward axis, body frame (m).
    /// Positive for the front axle, negative for the rear.
    pub anchor_forward_offset: f32,
    /// Anchor offset from the centerline to this axle's track, body frame
    /// (m); the sign is applied by the orchestrator from
    /// [`CornerIndex::is_left`], so this is always `>= 0`.
    pub anchor_lateral_half_track: f32,
    /// Anchor offset along the chassis up axis, body frame (m).
    pub anchor_height_offset: f32,
    /// Unsprung mass at this corner (wheel, tire, hub, brake): kg. Used to
    /// derive the hub's rolling inertia `J = ½ m_w r_t²` (§3 "Wheel hub").
    pub unsprung_mass: f32,
    pub rest_length: f32,
    pub ride_height_target: f32,
    pub stiffness: f32,
    pub damping: DampingTable,
    pub damping_velocity_threshold: f32,
    pub bump_stop_stiffness: f32,
    pub bump_stop_range: f32,
    pub anti_roll_stiffness: f32,
    pub tire_radius: f32,
    pub tire_width: f32,
    pub max_steer_angle: f32,
}

impl SuspensionConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        if self.anchor_lateral_half_track < 0.0 {
            return Err(DynamicsError::invalid_parameter(
                "anchor_lateral_half_track",
                self.anchor_lateral_half_track,
                "must be >= 0",
            ));
        }
        if self.stiffness < 0.0 {
            return Err(DynamicsError::invalid_parameter(
                "stiffness",
                self.stiffness,
                "must be >= 0 (0 self-disables the unit)",
            ));
        }
        if !(self.rest_length > 0.0) {
            return Err(DynamicsError::invalid_parameter(
                "rest_length",
                self.rest_length,
                "must be > 0",
            ));
        }
        if !(self.unsprung_mass > 0.0) {
            return Err(DynamicsError::invalid_parameter(
                "unsprung_mass",
                self.unsprung_mass,
                "must be > 0",
            ));
        }
        if !(self.tire_radius > 0.0) {
            return Err(DynamicsError::invalid_parameter(
                "tire_radius",
                self.tire_radius,
                "must be > 0",
            ));
        }
        if self.bump_stop_range < 0.0 {
            return Err(DynamicsError::invalid_parameter(
                "bump_stop_range",
                self.bump_stop_range,
                "must be >= 0",
            ));
        }
        self.damping.validated()?;
        Ok(self)
    }

    /// Body-frame anchor offset from the chassis center of mass for the
    /// given corner; the lateral sign follows [`CornerIndex::is_left`].
    pub fn anchor_offset(&self, corner: CornerIndex) -> Vector3<f32> {
        let lateral = if corner.is_left() {
            -self.anchor_lateral_half_track
        } else {
            self.anchor_lateral_half_track
        };
        Vector3::new(lateral, self.anchor_forward_offset, self.anchor_height_offset)
    }

    /// A passenger-car preset, in the style of the teacher crate's
    /// `passenger_car()` suspension constructor.
    pub fn passenger_car(front: bool) -> Self {
        Self {
            anchor_forward_offset: if front { 1.35 } else { -1.35 },
            anchor_lateral_half_track: 0.75,
            anchor_height_offset: -0.05,
            unsprung_mass: 18.0,
            rest_length: 0.38,
            ride_height_target: 0.14,
            stiffness: if front { 32_000.0 } else { 28_000.0 },
            damping: DampingTable {
                bump_low: 1800.0,
                bump_high: 3200.0,
                rebound_low: 2600.0,
                rebound_high: 4500.0,
            },
            damping_velocity_threshold: 0.15,
            bump_stop_stiffness: 180_000.0,
            bump_stop_range: 0.03,
            anti_roll_stiffness: if front { 18_000.0 } else { 12_000.0 },
            tire_radius: 0.32,
            tire_width: 0.215,
            max_steer_angle: if front { 0.6 } else { 0.0 },
        }
    }
}

/// Static per-corner brush-tire parameters (`SPEC_FULL.md` §3 "Tire
/// parameters", §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TireConfig {
    pub radius: f32,
    pub reference_load: f32,
    pub longitudinal_stiffness_coefficient: f32,
    pub lateral_stiffness_coefficient: f32,
    pub longitudinal_load_exponent: f32,
    pub lateral_load_exponent: f32,
    pub peak_friction_longitudinal: f32,
    pub peak_friction_lateral: f32,
    pub sliding_friction_factor_longitudinal: f32,
    pub sliding_friction_factor_lateral: f32,
    pub falloff_exponent_longitudinal: f32,
    pub falloff_exponent_lateral: f32,
    pub contact_patch_half_width: f32,
    pub peak_contact_patch_half_length: f32,
    pub reference_max_load: f32,
    pub rolling_resistance_coefficient: f32,
}

impl TireConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        if !(self.radius > 0.0) {
            return Err(DynamicsError::invalid_parameter("radius", self.radius, "must be > 0"));
        }
        if !(self.reference_load > 0.0) {
            return Err(DynamicsError::invalid_parameter(
                "reference_load",
                self.reference_load,
                "must be > 0",
            ));
        }
        if !(self.contact_patch_half_width > 0.0) || !(self.peak_contact_patch_half_length > 0.0) {
            return Err(DynamicsError::invalid_parameter(
                "contact_patch dimensions",
                format!(
                    "b={} a_max={}",
                    self.contact_patch_half_width, self.peak_contact_patch_half_length
                ),
                "both must be > 0",
            ));
        }
        for (name, v) in [
            (
                "sliding_friction_factor_longitudinal",
                self.sliding_friction_factor_longitudinal,
            ),
            (
                "sliding_friction_factor_lateral",
                self.sliding_friction_factor_lateral,
            ),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(DynamicsError::invalid_parameter(name, v, "must be in (0, 1]"));
            }
        }
        Ok(self)
    }

    /// A street-performance tire preset.
    pub fn passenger_car() -> Self {
        Self {
            radius: 0.32,
            reference_load: 4000.0,
            longitudinal_stiffness_coefficient: 18.0,
            lateral_stiffness_coefficient: 15.0,
            longitudinal_load_exponent: 0.9,
            lateral_load_exponent: 0.85,
            peak_friction_longitudinal: 1.1,
            peak_friction_lateral: 1.0,
            sliding_friction_factor_longitudinal: 0.78,
            sliding_friction_factor_lateral: 0.75,
            falloff_exponent_longitudinal: 1.4,
            falloff_exponent_lateral: 1.4,
            contact_patch_half_width: 0.09,
            peak_contact_patch_half_length: 0.11,
            reference_max_load: 7000.0,
            rolling_resistance_coefficient: 0.012,
        }
    }
}

/// A piecewise-linear RPM → torque (Nm) control point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueCurvePoint {
    pub rpm: f32,
    pub torque_nm: f32,
}

/// Engine and auto-clutch parameters (`SPEC_FULL.md` §3 "Engine state",
/// §4.G).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub torque_curve: Vec<TorqueCurvePoint>,
    pub idle_rpm: f32,
    pub redline_rpm: f32,
    pub free_rev_rate: f32,
    pub decay_rate: f32,
    pub clutch_bite_start: f32,
    pub clutch_bite_end: f32,
    pub gear_ratios: Vec<f32>,
    pub final_drive: f32,
    pub drivetrain_efficiency: f32,
    pub engine_brake_coefficient: f32,
    pub engine_brake_throttle_threshold: f32,
}

impl EngineConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        if self.torque_curve.len() < 2 {
            return Err(DynamicsError::invalid_parameter(
                "torque_curve",
                self.torque_curve.len(),
                "must have at least two control points",
            ));
        }
        if !self
            .torque_curve
            .windows(2)
            .all(|w| w[0].rpm < w[1].rpm)
        {
            return Err(DynamicsError::invalid_parameter(
                "torque_curve",
                "unordered",
                "control points must be sorted by strictly increasing rpm",
            ));
        }
        if !(self.idle_rpm > 0.0) || !(self.redline_rpm > self.idle_rpm) {
            return Err(DynamicsError::invalid_parameter(
                "idle_rpm/redline_rpm",
                format!("{}/{}", self.idle_rpm, self.redline_rpm),
                "0 < idle_rpm < redline_rpm",
            ));
        }
        if !(self.clutch_bite_start <= self.clutch_bite_end) {
            return Err(DynamicsError::invalid_parameter(
                "clutch_bite_start/end",
                format!("{}/{}", self.clutch_bite_start, self.clutch_bite_end),
                "b0 must be <= b1",
            ));
        }
        if self.gear_ratios.is_empty() {
            return Err(DynamicsError::invalid_parameter(
                "gear_ratios",
                0,
                "must have at least one forward gear",
            ));
        }
        Ok(self)
    }

    /// A five-speed passenger-car preset.
    pub fn passenger_car() -> Self {
        Self {
            torque_curve: vec![
                TorqueCurvePoint { rpm: 800.0, torque_nm: 90.0 },
                TorqueCurvePoint { rpm: 2000.0, torque_nm: 170.0 },
                TorqueCurvePoint { rpm: 4000.0, torque_nm: 210.0 },
                TorqueCurvePoint { rpm: 5500.0, torque_nm: 205.0 },
                TorqueCurvePoint { rpm: 6500.0, torque_nm: 150.0 },
                TorqueCurvePoint { rpm: 7000.0, torque_nm: 90.0 },
            ],
            idle_rpm: 850.0,
            redline_rpm: 7000.0,
            free_rev_rate: 9000.0,
            decay_rate: 4000.0,
            clutch_bite_start: 0.15,
            clutch_bite_end: 0.45,
            gear_ratios: vec![3.45, 2.10, 1.45, 1.10, 0.85],
            final_drive: 3.9,
            drivetrain_efficiency: 0.92,
            engine_brake_coefficient: 45.0,
            engine_brake_throttle_threshold: 0.05,
        }
    }
}

/// Limited-slip differential parameters (`SPEC_FULL.md` §3 "Differential
/// parameters", §4.H).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialConfig {
    pub preload_nm: f32,
    pub ramp_drive_coefficient: f32,
    pub ramp_coast_coefficient: f32,
    pub viscous_coefficient: f32,
}

impl DifferentialConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        for (name, v) in [
            ("preload_nm", self.preload_nm),
            ("ramp_drive_coefficient", self.ramp_drive_coefficient),
            ("ramp_coast_coefficient", self.ramp_coast_coefficient),
            ("viscous_coefficient", self.viscous_coefficient),
        ] {
            if v < 0.0 {
                return Err(DynamicsError::invalid_parameter(name, v, "must be >= 0"));
            }
        }
        Ok(self)
    }

    /// An open differential (all LSD coefficients zero), taking the fast
    /// path in `Drivetrain::split_torque`.
    pub fn open() -> Self {
        Self {
            preload_nm: 0.0,
            ramp_drive_coefficient: 0.0,
            ramp_coast_coefficient: 0.0,
            viscous_coefficient: 0.0,
        }
    }

    /// A mild street LSD preset.
    pub fn street_lsd() -> Self {
        Self {
            preload_nm: 40.0,
            ramp_drive_coefficient: 0.35,
            ramp_coast_coefficient: 0.15,
            viscous_coefficient: 15.0,
        }
    }
}

/// Which axle the engine/differential pair drives. The data model (§3
/// "Differential parameters") names a single differential, so the
/// orchestrator supports one driven axle rather than per-axle differentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrivetrainLayout {
    FrontWheelDrive,
    RearWheelDrive,
}

impl DrivetrainLayout {
    /// The `(left, right)` driven corners for this layout.
    pub fn driven_corners(self) -> (CornerIndex, CornerIndex) {
        match self {
            DrivetrainLayout::FrontWheelDrive => (CornerIndex::FrontLeft, CornerIndex::FrontRight),
            DrivetrainLayout::RearWheelDrive => (CornerIndex::RearLeft, CornerIndex::RearRight),
        }
    }
}

/// Per-corner brake torque capacity at full pedal, plus the handbrake's
/// rear-only addition (`SPEC_FULL.md` §6 "Driver input surface").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrakingConfig {
    pub front_max_torque_nm: f32,
    pub rear_max_torque_nm: f32,
    pub handbrake_max_torque_nm: f32,
}

impl BrakingConfig {
    pub fn validated(self) -> DynamicsResult<Self> {
        for (name, v) in [
            ("front_max_torque_nm", self.front_max_torque_nm),
            ("rear_max_torque_nm", self.rear_max_torque_nm),
            ("handbrake_max_torque_nm", self.handbrake_max_torque_nm),
        ] {
            if v < 0.0 {
                return Err(DynamicsError::invalid_parameter(name, v, "must be >= 0"));
            }
        }
        Ok(self)
    }

    pub fn passenger_car() -> Self {
        Self {
            front_max_torque_nm: 2200.0,
            rear_max_torque_nm: 1400.0,
            handbrake_max_torque_nm: 900.0,
        }
    }
}

/// The complete static parameter record for one vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub time_step: TimeStepConfig,
    pub body: RigidBodyConfig,
    pub suspensions: CornerArena<SuspensionConfig>,
    pub tires: CornerArena<TireConfig>,
    pub engine: EngineConfig,
    pub differential: DifferentialConfig,
    pub drivetrain_layout: DrivetrainLayout,
    pub braking: BrakingConfig,
}

impl VehicleConfig {
    /// Validates every sub-config; the first failure is propagated.
    pub fn validated(self) -> DynamicsResult<Self> {
        let time_step = self.time_step.validated()?;
        let body = self.body.validated()?;
        let mut suspensions = self.suspensions;
        for (_, cfg) in suspensions.iter_mut() {
            *cfg = cfg.validated()?;
        }
        let mut tires = self.tires;
        for (_, cfg) in tires.iter_mut() {
            *cfg = cfg.validated()?;
        }
        let engine = self.engine.validated()?;
        let differential = self.differential.validated()?;
        let braking = self.braking.validated()?;
        Ok(Self {
            time_step,
            body,
            suspensions,
            tires,
            engine,
            differential,
            drivetrain_layout: self.drivetrain_layout,
            braking,
        })
    }

    /// A complete passenger-car preset: open differential, rear-wheel drive,
    /// symmetric corners within an axle.
    pub fn passenger_car() -> DynamicsResult<Self> {
        let mut suspensions = CornerArena::new([
            SuspensionConfig::passenger_car(true),
            SuspensionConfig::passenger_car(true),
            SuspensionConfig::passenger_car(false),
            SuspensionConfig::passenger_car(false),
        ]);
        for corner in [CornerIndex::FrontRight, CornerIndex::RearRight] {
            suspensions[corner] = suspensions[corner.axle_partner()];
        }

        let tires = CornerArena::new([TireConfig::passenger_car(); 4]);

        Self {
            time_step: TimeStepConfig::default(),
            body: RigidBodyConfig::default(),
            suspensions,
            tires,
            engine: EngineConfig::passenger_car(),
            differential: DifferentialConfig::open(),
            drivetrain_layout: DrivetrainLayout::RearWheelDrive,
            braking: BrakingConfig::passenger_car(),
        }
        .validated()
    }
}
