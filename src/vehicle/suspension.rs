//! Per-corner ray-cast suspension: spring, damper, bump stops, and the
//! anti-roll bar coupling (`SPEC_FULL.md` §4.C, §4.D).

use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::warn;

use crate::config::SuspensionConfig;
use crate::corner::CornerIndex;
use crate::raycast::RaycastBackend;
use crate::rigid_body::RigidBody;

/// The five downward ray offsets sampled at each corner, expressed as
/// `(forward_coefficient, right_coefficient)` multipliers on tire
/// width/radius (`SPEC_FULL.md` §4.C "Ray geometry").
const RAY_OFFSETS: [(f32, f32); 5] = [
    (0.0, 0.0),
    (0.4, 0.3),
    (0.4, -0.3),
    (-0.4, 0.3),
    (-0.4, -0.3),
];

/// Result of the early-phase raycast sampling for one corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactFrame {
    pub grounded: bool,
    pub contact_point: Point3<f32>,
    pub surface_normal: Vector3<f32>,
    pub compressed_length: f32,
    pub displacement: f32,
}

/// A single ray-cast corner: spring, damper, bump stops, and a possible
/// anti-roll partner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuspensionUnit {
    config: SuspensionConfig,
    corner: CornerIndex,
    steer_angle: f32,
    disabled: bool,
    warned: bool,
    frame: ContactFrame,
    /// Axial suspension force magnitude from the most recent main phase,
    /// also exposed as the tire's vertical load.
    pub axial_force: f32,
    display_lateral_offset: f32,
}

impl SuspensionUnit {
    pub fn new(corner: CornerIndex, config: SuspensionConfig) -> Self {
        let disabled = config.stiffness <= 0.0;
        Self {
            config,
            corner,
            steer_angle: 0.0,
            disabled,
            warned: false,
            frame: ContactFrame {
                grounded: false,
                contact_point: Point3::origin(),
                surface_normal: Vector3::z(),
                compressed_length: config.rest_length,
                displacement: 0.0,
            },
            axial_force: 0.0,
            display_lateral_offset: 0.0,
        }
    }

    pub fn config(&self) -> &SuspensionConfig {
        &self.config
    }

    pub fn frame(&self) -> ContactFrame {
        self.frame
    }

    pub fn set_steer_angle(&mut self, requested: f32) {
        self.steer_angle = requested.clamp(-self.config.max_steer_angle, self.config.max_steer_angle);
    }

    pub fn steer_angle_value(&self) -> f32 {
        self.steer_angle
    }

    /// Early phase: casts 5 rays from the anchor, averages hits into one
    /// contact frame. Anchor and orientation are the chassis's; `anchor`
    /// should already include the corner's local offset from the chassis
    /// origin, rotated into world space by the caller.
    pub fn sample_contact<R: RaycastBackend>(
        &mut self,
        anchor: Point3<f32>,
        chassis_orientation: UnitQuaternion<f32>,
        backend: &R,
    ) {
        if self.disabled {
            self.frame.grounded = false;
            return;
        }

        let up = chassis_orientation * Vector3::z();
        if !up.iter().all(|v| v.is_finite()) {
            // Degenerate anchor axis: hold the previous frame, force no
            // contact (`SPEC_FULL.md` §4.C "Failure handling").
            self.frame.grounded = false;
            return;
        }
        let steer_rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.steer_angle);
        let forward = chassis_orientation * steer_rotation * Vector3::y();
        let right = chassis_orientation * steer_rotation * Vector3::x();

        let max_len = self.config.rest_length + self.config.tire_radius;
        let mut hit_count = 0u32;
        let mut distance_sum = 0.0f32;
        let mut point_sum = Vector3::zeros();
        let mut normal_sum = Vector3::zeros();

        for (fwd_coeff, right_coeff) in RAY_OFFSETS {
            let offset = forward * (fwd_coeff * self.config.tire_width)
                + right * (right_coeff * self.config.tire_radius);
            let origin = anchor + offset;
            if let Some(hit) = backend.raycast(origin, -up, max_len) {
                hit_count += 1;
                distance_sum += hit.distance - self.config.tire_radius;
                point_sum += hit.point.coords;
                normal_sum += hit.normal;
            }
        }

        if hit_count == 0 {
            self.frame.grounded = false;
            self.frame.compressed_length = self.config.rest_length;
            return;
        }

        let n = hit_count as f32;
        let compressed_length = distance_sum / n;
        let contact_point = Point3::from(point_sum / n);
        let surface_normal = if normal_sum.norm() > 1e-9 {
            normal_sum.normalize()
        } else {
            Vector3::z()
        };
        let target = (self.config.ride_height_target + self.config.tire_radius)
            .clamp(0.0, self.config.rest_length);
        let displacement = target - compressed_length;

        self.frame = ContactFrame {
            grounded: true,
            contact_point,
            surface_normal,
            compressed_length,
            displacement,
        };
    }

    /// Main phase, first half: computes the axial spring + bump-stop +
    /// damping + anti-roll force magnitude and stores it as the tire's
    /// vertical load (`axial_force`), without yet touching the body.
    ///
    /// Ordering guarantee 3 (`SPEC_FULL.md` §5) requires the tire's force to
    /// be applied to the body before this corner's own suspension force is;
    /// splitting computation from application lets the orchestrator insert
    /// the tire step in between. `partner_displacement` is `None` when there
    /// is no anti-roll partner.
    pub fn compute_axial_force(
        &mut self,
        body: &RigidBody,
        anchor: Point3<f32>,
        chassis_orientation: UnitQuaternion<f32>,
        partner_displacement: Option<f32>,
    ) -> f32 {
        if self.disabled {
            if !self.warned {
                warn!(corner = ?self.corner, "suspension unit disabled: stiffness is zero");
                self.warned = true;
            }
            self.axial_force = 0.0;
            return 0.0;
        }
        if !self.frame.grounded {
            self.axial_force = 0.0;
            return 0.0;
        }

        let up = chassis_orientation * Vector3::z();
        let length = self.frame.compressed_length;
        let displacement = self.frame.displacement;

        let spring = if length >= 0.0 && length <= self.config.rest_length {
            (self.config.stiffness * displacement).max(0.0)
        } else {
            0.0
        };

        let mut bump = 0.0f32;
        if length < self.config.bump_stop_range {
            bump += self.config.bump_stop_stiffness * (self.config.bump_stop_range - length);
        }
        if length > self.config.rest_length
            && length - self.config.rest_length < self.config.bump_stop_range
        {
            bump += self.config.bump_stop_stiffness
                * (self.config.bump_stop_range - (length - self.config.rest_length));
        }

        let anchor_velocity = body.velocity_at(anchor);
        let v_rel = anchor_velocity.dot(&(-up));
        let damping_coefficient = self
            .config
            .damping
            .select(v_rel, self.config.damping_velocity_threshold);
        let damping_force = damping_coefficient * v_rel;

        let anti_roll = partner_displacement
            .map(|partner_delta| self.config.anti_roll_stiffness * (displacement - partner_delta))
            .unwrap_or(0.0);

        let axial_magnitude = spring + bump + damping_force + anti_roll;
        self.axial_force = axial_magnitude.max(0.0);
        self.axial_force
    }

    /// Main phase, second half: applies the force computed by
    /// [`Self::compute_axial_force`] to the body at the anchor. A no-op when
    /// disabled or airborne (`axial_force` is already zero in that case).
    pub fn apply_to_body(
        &self,
        body: &mut RigidBody,
        anchor: Point3<f32>,
        chassis_orientation: UnitQuaternion<f32>,
    ) {
        if self.axial_force == 0.0 {
            return;
        }
        let up = chassis_orientation * Vector3::z();
        body.add_force_at_point(up * self.axial_force, anchor);
    }

    /// The planar contact frame `{f̂, ŝ}` for the tire model (`SPEC_FULL.md`
    /// GLOSSARY): forward projected into the surface plane, lateral
    /// `ŝ = n̂_s × f̂`. Incorporates this corner's current steer angle.
    pub fn contact_basis(&self, chassis_orientation: UnitQuaternion<f32>) -> (Vector3<f32>, Vector3<f32>) {
        let steer_rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.steer_angle);
        let steered_forward = chassis_orientation * steer_rotation * Vector3::y();
        let normal = self.frame.surface_normal;

        let projected = steered_forward - normal * steered_forward.dot(&normal);
        let forward = if projected.norm() > 1e-9 {
            projected.normalize()
        } else {
            // Forward is parallel to the surface normal (near-vertical
            // contact); fall back to the chassis right axis to define a
            // stable basis rather than producing a zero vector.
            let fallback = chassis_orientation * Vector3::x();
            (fallback - normal * fallback.dot(&normal)).normalize()
        };
        let lateral = normal.cross(&forward);
        (forward, lateral)
    }

    /// The wheel's display position/orientation after forces are applied
    /// (§4.C "Wheel placement"); `alpha = 0.5` blends the lateral offset to
    /// avoid a visual snap across grounded/airborne transitions. This feeds
    /// only presentation, never the contact-frame or force math above.
    pub fn wheel_display_transform(
        &mut self,
        anchor: Point3<f32>,
        chassis_orientation: UnitQuaternion<f32>,
    ) -> (Point3<f32>, UnitQuaternion<f32>) {
        let up = chassis_orientation * Vector3::z();
        let length = self.frame.compressed_length.max(self.config.tire_radius);
        let target_offset = 0.0; // corners have no lateral creep target in this model
        self.display_lateral_offset += 0.5 * (target_offset - self.display_lateral_offset);

        let position = anchor - up * length;
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.steer_angle);
        (position, chassis_orientation * yaw)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
