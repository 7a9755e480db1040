//! Wheel hub angular state: implicit wheel-speed integration, stick/creep
//! handling, airborne fallback (`SPEC_FULL.md` §3 "Wheel hub", §4.F).

use std::f32::consts::TAU;

use crate::vehicle::tire_model::{BrushTire, SlipState, TireForce};

/// Static hub parameters independent of the tire's own config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelHubConfig {
    pub rolling_inertia: f32,
    pub viscous_coefficient: f32,
    pub air_drag_multiplier: f32,
    pub static_friction_coefficient: f32,
}

impl Default for WheelHubConfig {
    fn default() -> Self {
        Self {
            rolling_inertia: 1.2,
            viscous_coefficient: 0.6,
            air_drag_multiplier: 2.0,
            static_friction_coefficient: 1.1,
        }
    }
}

impl WheelHubConfig {
    /// Derives `J = ½ m_w r_t²` from the corner's unsprung mass and tire
    /// radius, keeping the rest of the defaults (`SPEC_FULL.md` §3 "Wheel
    /// hub").
    pub fn from_suspension(suspension: &crate::config::SuspensionConfig) -> Self {
        Self {
            rolling_inertia: 0.5 * suspension.unsprung_mass * suspension.tire_radius.powi(2),
            ..Self::default()
        }
    }
}

/// Whether the hub is transmitting force through the brush model or
/// clamped into stick mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubMode {
    Rolling,
    Stuck,
}

/// Per-wheel angular state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelHub {
    config: WheelHubConfig,
    /// Spin rate (rad/s); sign follows rolling direction.
    pub angular_velocity: f32,
    /// Cumulative visual spin angle, kept modulo `2π`; display-only.
    pub visual_angle: f32,
    mode: HubMode,
}

/// Result of one hub update: the tire force actually transmitted and the
/// torque fed back to the road (for telemetry / debugging).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubUpdateOutput {
    pub tire_force: TireForce,
    pub angular_velocity: f32,
}

impl WheelHub {
    pub fn new(config: WheelHubConfig) -> Self {
        Self {
            config,
            angular_velocity: 0.0,
            visual_angle: 0.0,
            mode: HubMode::Rolling,
        }
    }

    /// Integrates one fixed tick while the corner is grounded, running the
    /// brush tire model and an implicit (Newton) solve for stiffness near
    /// lockup and slip reversal (§4.F), with a stick-mode clamp for
    /// near-zero speeds.
    #[allow(clippy::too_many_arguments)]
    pub fn integrate_grounded(
        &mut self,
        tire: &BrushTire,
        dt: f32,
        drive_torque: f32,
        brake_torque_capacity: f32,
        longitudinal_velocity: f32,
        lateral_velocity: f32,
        vertical_load: f32,
    ) -> HubUpdateOutput {
        let radius = tire.config().radius;
        let stick_candidate = longitudinal_velocity.abs() < 0.30
            && self.angular_velocity.abs() < 0.25;

        if stick_candidate {
            let applied_torque = drive_torque
                + Self::brake_torque_effective(
                    brake_torque_capacity,
                    longitudinal_velocity.signum(),
                );
            let static_budget = self.config.static_friction_coefficient * vertical_load * radius;
            if applied_torque.abs() <= static_budget {
                self.mode = HubMode::Stuck;
                self.angular_velocity = longitudinal_velocity / radius;
                self.advance_visual_angle(dt);
                let force = TireForce {
                    longitudinal: applied_torque / radius,
                    lateral: 0.0,
                };
                return HubUpdateOutput {
                    tire_force: force,
                    angular_velocity: self.angular_velocity,
                };
            }
        }

        // 2% hysteresis: once rolling, don't re-enter stick mode until
        // clearly below the threshold again.
        if self.mode == HubMode::Stuck && longitudinal_velocity.abs() < 0.30 * 1.02 {
            self.angular_velocity = longitudinal_velocity / radius;
        }
        self.mode = HubMode::Rolling;

        let brake_sign = if self.angular_velocity.abs() > 1e-3 {
            -self.angular_velocity.signum()
        } else {
            -longitudinal_velocity.signum()
        };
        let brake_torque = brake_torque_capacity.abs() * brake_sign;

        let prev_omega = self.angular_velocity;
        let mut omega = prev_omega;
        let mut last_force = tire.force(&SlipState {
            longitudinal_velocity,
            lateral_velocity,
            wheel_angular_velocity: omega,
            vertical_load,
        });

        let residual = |omega: f32, tire: &BrushTire| -> (f32, TireForce) {
            let force = tire.force(&SlipState {
                longitudinal_velocity,
                lateral_velocity,
                wheel_angular_velocity: omega,
                vertical_load,
            });
            let road_torque = -radius * force.longitudinal;
            let rolling_resistance = tire.rolling_resistance_torque(vertical_load, omega);
            let omega_dot = (drive_torque + brake_torque + road_torque + rolling_resistance
                - self.config.viscous_coefficient * omega)
                / self.config.rolling_inertia;
            (omega - prev_omega - dt * omega_dot, force)
        };

        for _ in 0..3 {
            let (g0, force0) = residual(omega, tire);
            last_force = force0;
            if g0.abs() < 1e-4 {
                break;
            }
            let h = 1e-3_f32.max(omega.abs() * 1e-4);
            let (g_plus, _) = residual(omega + h, tire);
            let (g_minus, _) = residual(omega - h, tire);
            let jacobian = (g_plus - g_minus) / (2.0 * h);
            if jacobian.abs() < 1e-9 {
                break;
            }
            let mut step = -g0 / jacobian;
            step = step.clamp(-20.0, 20.0);

            // Halving line search: accept the step only if it reduces |g|.
            let mut trial = step;
            for _ in 0..4 {
                let (g_trial, _) = residual(omega + trial, tire);
                if g_trial.abs() < g0.abs() {
                    break;
                }
                trial *= 0.5;
            }
            omega += trial;
            if trial.abs() < 1e-4 {
                break;
            }
        }

        self.angular_velocity = omega;
        self.advance_visual_angle(dt);

        HubUpdateOutput {
            tire_force: last_force,
            angular_velocity: omega,
        }
    }

    /// Integrates one fixed tick while the corner is airborne (§4.F
    /// "Airborne"): no tire contact, larger air drag, no stick mode.
    pub fn integrate_airborne(&mut self, config: &WheelHubConfig, dt: f32, drive_torque: f32, brake_torque_capacity: f32) {
        self.mode = HubMode::Rolling;
        let brake_sign = if self.angular_velocity.abs() > 1e-3 {
            -self.angular_velocity.signum()
        } else {
            0.0
        };
        let brake_torque = brake_torque_capacity.abs() * brake_sign;
        let air_drag = config.air_drag_multiplier * config.viscous_coefficient;
        let omega_dot =
            (drive_torque + brake_torque - air_drag * self.angular_velocity) / config.rolling_inertia;
        self.angular_velocity += omega_dot * dt;
        self.advance_visual_angle(dt);
    }

    fn brake_torque_effective(capacity: f32, opposing_sign: f32) -> f32 {
        -capacity.abs() * opposing_sign
    }

    fn advance_visual_angle(&mut self, dt: f32) {
        self.visual_angle = (self.visual_angle + self.angular_velocity * dt).rem_euclid(TAU);
    }
}
