//! Combined-slip brush tire model (`SPEC_FULL.md` §4.E).
//!
//! This is deliberately not a Pacejka Magic Formula fit: it integrates a
//! linear bristle shear stress across an adhesion region and a
//! friction-limited sliding region of a rectangular contact patch whose
//! half-length grows with vertical load.

use crate::config::TireConfig;

/// Slip state presented to the tire at one corner, in the contact plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlipState {
    /// Forward contact-patch velocity `V_x` (m/s).
    pub longitudinal_velocity: f32,
    /// Lateral contact-patch velocity `V_y` (m/s).
    pub lateral_velocity: f32,
    /// Wheel spin rate `ω_w` (rad/s).
    pub wheel_angular_velocity: f32,
    /// Vertical load `F_z` (N), always `>= 0`.
    pub vertical_load: f32,
}

/// Forces produced by the brush model, in the contact plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TireForce {
    /// Longitudinal force `F_x` (N), positive forward.
    pub longitudinal: f32,
    /// Lateral force `F_y` (N), positive along `ŝ`.
    pub lateral: f32,
}

/// A brush-model tire: load-sensitive bristle stiffness, a contact patch
/// whose half-length scales with load, and a friction-falloff sliding
/// region blended against the adhesion region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushTire {
    config: TireConfig,
}

impl BrushTire {
    pub fn new(config: TireConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TireConfig {
        &self.config
    }

    /// Slip ratio `κ = (V_wheel − V_x) / max(|V_x|, 0.5)`, clamped to
    /// `[−3, 3]`.
    pub fn slip_ratio(&self, slip: &SlipState) -> f32 {
        let wheel_speed = slip.wheel_angular_velocity * self.config.radius;
        let denom = slip.longitudinal_velocity.abs().max(0.5);
        ((wheel_speed - slip.longitudinal_velocity) / denom).clamp(-3.0, 3.0)
    }

    /// Slip angle surrogate `tan α = V_y / max(|V_x|, 1.0)`.
    pub fn slip_angle_tan(&self, slip: &SlipState) -> f32 {
        slip.lateral_velocity / slip.longitudinal_velocity.abs().max(1.0)
    }

    /// Evaluates the combined-slip brush model, returning `(0, 0)` on the
    /// degeneracies named in §4.E: non-positive load, or a shear magnitude
    /// too small to establish a slip direction.
    pub fn force(&self, slip: &SlipState) -> TireForce {
        let fz = slip.vertical_load;
        if !(fz > 0.0) {
            return TireForce::default();
        }

        let kappa = self.slip_ratio(slip);
        let tan_alpha = self.slip_angle_tan(slip);

        let c = &self.config;
        let cx = c.longitudinal_stiffness_coefficient
            * c.reference_load
            * (fz / c.reference_load).powf(c.longitudinal_load_exponent);
        let cy = c.lateral_stiffness_coefficient
            * c.reference_load
            * (fz / c.reference_load).powf(c.lateral_load_exponent);

        let a = c.peak_contact_patch_half_length * (fz / c.reference_max_load).clamp(0.0, 1.0);
        let b = c.contact_patch_half_width;
        if !(a > 0.0) {
            return TireForce::default();
        }

        let kx = cx / (2.0 * a * b);
        let ky = cy / (2.0 * a * b);
        let pressure = fz / (4.0 * a * b);

        let tx = kx * kappa;
        let ty = ky * tan_alpha;
        let shear_magnitude = (tx * tx + ty * ty).sqrt();
        if shear_magnitude < 1e-12 {
            return TireForce::default();
        }
        let (cos_dir, sin_dir) = (tx / shear_magnitude, ty / shear_magnitude);

        let peak_mu = ((c.peak_friction_longitudinal * cos_dir).powi(2)
            + (c.peak_friction_lateral * sin_dir).powi(2))
        .sqrt();

        let adhesion_slide_boundary =
            (2.0 * a * (peak_mu * pressure) / shear_magnitude - a).clamp(-a, a);
        let x_s = adhesion_slide_boundary;

        let adh_scale = (x_s + a).powi(2) / (4.0 * a);
        let f_x_adh = 2.0 * b * kx * kappa * adh_scale;
        let f_y_adh = 2.0 * b * ky * tan_alpha * adh_scale;

        let sliding_fraction = (a - x_s) / (2.0 * a);
        let mu_x_eff = c.sliding_friction_factor_longitudinal * c.peak_friction_longitudinal
            + (c.peak_friction_longitudinal
                - c.sliding_friction_factor_longitudinal * c.peak_friction_longitudinal)
                * (1.0 - sliding_fraction).powf(c.falloff_exponent_longitudinal);
        let mu_y_eff = c.sliding_friction_factor_lateral * c.peak_friction_lateral
            + (c.peak_friction_lateral
                - c.sliding_friction_factor_lateral * c.peak_friction_lateral)
                * (1.0 - sliding_fraction).powf(c.falloff_exponent_lateral);
        let mu_eff = ((mu_x_eff * cos_dir).powi(2) + (mu_y_eff * sin_dir).powi(2)).sqrt();

        let patch_sliding_length = a - x_s;
        let f_x_sl = 2.0 * b * mu_eff * pressure * cos_dir * patch_sliding_length;
        let f_y_sl = 2.0 * b * mu_eff * pressure * sin_dir * patch_sliding_length;

        TireForce {
            longitudinal: f_x_adh + f_x_sl,
            lateral: -(f_y_adh + f_y_sl),
        }
    }

    /// Resistive torque from tire rolling resistance, opposing the wheel's
    /// own spin direction. Kept out of [`Self::force`] deliberately: it is a
    /// hub-side dissipative torque, not a ground-reaction shear, and folding
    /// it into `F_x` would break the brush model's antisymmetry in slip
    /// (`SPEC_FULL.md` §8 invariant 5).
    pub fn rolling_resistance_torque(&self, vertical_load: f32, wheel_angular_velocity: f32) -> f32 {
        -self.config.rolling_resistance_coefficient
            * vertical_load
            * self.config.radius
            * wheel_angular_velocity.signum()
    }
}
