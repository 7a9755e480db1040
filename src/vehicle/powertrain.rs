//! Torque-curve engine with idle governor, rev limiter, auto-clutch, and
//! engine braking (`SPEC_FULL.md` §3 "Engine state", §4.G).

use crate::config::EngineConfig;

/// The auto-clutch launch state machine (§4.G "Auto-clutch state machine").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    PreLaunch,
    Hold,
    Release,
}

const ANTI_STALL_ENGAGE_MARGIN: f32 = 150.0;
const ANTI_STALL_RELEASE_MARGIN: f32 = 50.0;
const OFF_THROTTLE_OPEN_SLIP_RPM: f32 = 800.0;
const OFF_THROTTLE_CLOSED_SLIP_RPM: f32 = 600.0;
const LAUNCH_THROTTLE_THRESHOLD: f32 = 0.15;
const DRIVEN_BLEND_RATE: f32 = 10.0;

/// The engine's running state, updated once per fixed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engine {
    config: EngineConfig,
    pub current_rpm: f32,
    free_rev_rpm: f32,
    pub gear: usize,
    pub clutch: f32,
    launch_state: LaunchState,
    anti_stall: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let idle = config.idle_rpm;
        Self {
            config,
            current_rpm: idle,
            free_rev_rpm: idle,
            gear: 1,
            clutch: 0.0,
            launch_state: LaunchState::PreLaunch,
            anti_stall: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn gear_ratio(&self) -> f32 {
        self.config.gear_ratios[self.gear.saturating_sub(1).min(self.config.gear_ratios.len() - 1)]
    }

    /// `RPM_tgt = ω_drive · 60/(2π) · gearRatio · finalDrive`.
    fn target_rpm(&self, driven_axle_angular_velocity: f32) -> f32 {
        let rpm_per_rad_per_s = 60.0 / std::f32::consts::TAU;
        driven_axle_angular_velocity * rpm_per_rad_per_s * self.gear_ratio() * self.config.final_drive
    }

    /// Updates RPM and the auto-clutch state machine for one fixed tick.
    /// `driven_axle_angular_velocity` is sampled at entry to the main phase,
    /// i.e. from the *current* tick's wheel speeds, giving one-tick latency
    /// from integration back to RPM (`SPEC_FULL.md` §5, ordering guarantee 2).
    pub fn update(&mut self, dt: f32, throttle: f32, driven_axle_angular_velocity: f32) {
        let throttle = throttle.clamp(0.0, 1.0);
        let target_rpm = self.target_rpm(driven_axle_angular_velocity);

        if throttle > 0.0 {
            self.free_rev_rpm += throttle * self.config.free_rev_rate * dt;
        } else {
            self.free_rev_rpm -= self.config.decay_rate * dt;
        }
        self.free_rev_rpm = self
            .free_rev_rpm
            .clamp(self.config.idle_rpm, self.config.redline_rpm);

        let driven_rpm = mix(self.current_rpm, target_rpm, (dt * DRIVEN_BLEND_RATE).min(1.0));

        self.update_launch_state(throttle, target_rpm);
        self.update_anti_stall(target_rpm);
        let off_throttle_clutch = self.off_throttle_clutch(throttle, target_rpm);
        self.clutch = if self.anti_stall {
            0.0
        } else if throttle > 0.0 {
            self.auto_clutch_engagement(target_rpm)
        } else {
            off_throttle_clutch
        };

        let beta = self.clutch_engagement_factor();
        self.current_rpm = mix(self.free_rev_rpm, driven_rpm, beta)
            .clamp(self.config.idle_rpm, self.config.redline_rpm);
    }

    fn update_launch_state(&mut self, throttle: f32, target_rpm: f32) {
        let release_start = self.config.idle_rpm + 400.0;
        self.launch_state = match self.launch_state {
            LaunchState::PreLaunch if throttle > LAUNCH_THROTTLE_THRESHOLD => LaunchState::Hold,
            LaunchState::Hold if target_rpm >= release_start => LaunchState::Release,
            other => other,
        };
    }

    fn update_anti_stall(&mut self, target_rpm: f32) {
        let engage_at = self.config.idle_rpm + ANTI_STALL_ENGAGE_MARGIN;
        let release_at = self.config.idle_rpm + ANTI_STALL_RELEASE_MARGIN;
        if self.current_rpm < engage_at && target_rpm < engage_at {
            self.anti_stall = true;
        } else if self.current_rpm > release_at || target_rpm > release_at {
            self.anti_stall = false;
        }
    }

    /// Release-phase bite-point ramp: blends from the clutch bite point to
    /// full engagement as `target_rpm` crosses a release band above idle.
    fn auto_clutch_engagement(&self, target_rpm: f32) -> f32 {
        match self.launch_state {
            LaunchState::PreLaunch => 0.0,
            LaunchState::Hold => self.config.clutch_bite_start,
            LaunchState::Release => {
                let release_start = self.config.idle_rpm + 400.0;
                let release_end = release_start + 1500.0;
                let t = ((target_rpm - release_start) / (release_end - release_start)).clamp(0.0, 1.0);
                mix(self.config.clutch_bite_start, 1.0, t)
            }
        }
    }

    /// Off-throttle clutch modulation by slip: engaged (transmitting engine
    /// braking) below the open-slip threshold, smoothly disengaging toward
    /// the closed-slip threshold.
    fn off_throttle_clutch(&self, throttle: f32, target_rpm: f32) -> f32 {
        if throttle > 0.0 {
            return self.clutch;
        }
        let slip = (self.current_rpm - target_rpm).abs();
        if slip <= OFF_THROTTLE_CLOSED_SLIP_RPM {
            1.0
        } else if slip >= OFF_THROTTLE_OPEN_SLIP_RPM {
            0.0
        } else {
            1.0 - (slip - OFF_THROTTLE_CLOSED_SLIP_RPM)
                / (OFF_THROTTLE_OPEN_SLIP_RPM - OFF_THROTTLE_CLOSED_SLIP_RPM)
        }
    }

    /// `β(clutch)`: linear ramp within `[b0, b1]`.
    fn clutch_engagement_factor(&self) -> f32 {
        let (b0, b1) = (self.config.clutch_bite_start, self.config.clutch_bite_end);
        if b1 <= b0 {
            return self.clutch;
        }
        ((self.clutch - b0) / (b1 - b0)).clamp(0.0, 1.0)
    }

    /// Samples the piecewise-linear torque curve at `currentRPM`, applies
    /// throttle, the redline cutoff, and engine braking, and scales by
    /// gear/final-drive/efficiency/clutch engagement (§4.G "Wheel torque
    /// output").
    pub fn wheel_torque(&self, throttle: f32) -> f32 {
        let throttle = throttle.clamp(0.0, 1.0);
        if self.current_rpm > self.config.redline_rpm {
            return 0.0;
        }

        let base_torque = self.sample_torque_curve(self.current_rpm) * throttle;

        let braking = if throttle < self.config.engine_brake_throttle_threshold {
            let norm = (self.current_rpm / self.config.redline_rpm).clamp(0.0, 1.0);
            -(norm * norm) * self.config.engine_brake_coefficient * self.gear_ratio()
        } else {
            0.0
        };

        (base_torque + braking)
            * self.gear_ratio()
            * self.config.final_drive
            * self.config.drivetrain_efficiency
            * self.clutch_engagement_factor()
    }

    fn sample_torque_curve(&self, rpm: f32) -> f32 {
        let curve = &self.config.torque_curve;
        if rpm <= curve[0].rpm {
            return curve[0].torque_nm;
        }
        if rpm >= curve[curve.len() - 1].rpm {
            return curve[curve.len() - 1].torque_nm;
        }
        for window in curve.windows(2) {
            let (lo, hi) = (window[0], window[1]);
            if rpm >= lo.rpm && rpm <= hi.rpm {
                let t = (rpm - lo.rpm) / (hi.rpm - lo.rpm);
                return mix(lo.torque_nm, hi.torque_nm, t);
            }
        }
        curve[curve.len() - 1].torque_nm
    }

    pub fn request_upshift(&mut self, max_gear: usize) {
        self.gear = (self.gear + 1).min(max_gear);
    }

    pub fn request_downshift(&mut self) {
        self.gear = self.gear.saturating_sub(1).max(1);
    }

    pub fn is_anti_stalling(&self) -> bool {
        self.anti_stall
    }
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_rpm_never_drops_below_idle() {
        let mut engine = Engine::new(EngineConfig::passenger_car());
        for _ in 0..600 {
            engine.update(1.0 / 240.0, 0.0, 0.0);
            assert!(engine.current_rpm >= engine.config().idle_rpm - 1e-3);
        }
    }

    #[test]
    fn anti_stall_forces_clutch_open_near_idle() {
        let mut engine = Engine::new(EngineConfig::passenger_car());
        for _ in 0..300 {
            engine.update(1.0 / 240.0, 0.0, 0.0);
        }
        assert!(engine.is_anti_stalling());
        assert_eq!(engine.clutch, 0.0);
    }

    #[test]
    fn wide_open_throttle_raises_rpm_over_time() {
        let mut engine = Engine::new(EngineConfig::passenger_car());
        let start = engine.current_rpm;
        for _ in 0..240 {
            engine.update(1.0 / 240.0, 1.0, 0.0);
        }
        assert!(engine.current_rpm > start);
    }

    #[test]
    fn torque_curve_is_saturated_at_endpoints() {
        let engine = Engine::new(EngineConfig::passenger_car());
        let curve = &engine.config().torque_curve;
        assert_eq!(engine.sample_torque_curve(100.0), curve[0].torque_nm);
        assert_eq!(
            engine.sample_torque_curve(20_000.0),
            curve[curve.len() - 1].torque_nm
        );
    }

    #[test]
    fn above_redline_wheel_torque_is_zero() {
        let mut engine = Engine::new(EngineConfig::passenger_car());
        engine.current_rpm = engine.config().redline_rpm + 500.0;
        assert_eq!(engine.wheel_torque(1.0), 0.0);
    }

    #[test]
    fn upshift_and_downshift_clamp_to_gear_range() {
        let mut engine = Engine::new(EngineConfig::passenger_car());
        let max_gear = engine.config().gear_ratios.len();
        for _ in 0..max_gear + 3 {
            engine.request_upshift(max_gear);
        }
        assert_eq!(engine.gear, max_gear);
        for _ in 0..max_gear + 3 {
            engine.request_downshift();
        }
        assert_eq!(engine.gear, 1);
    }
}
