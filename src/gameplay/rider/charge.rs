use crate::config::RiderPhysicsConfig;
use serde::Serialize;

const RAMP_EPSILON: f32 = 1.0e-4;

// `ratio` trails `charge / cap` through a first-order low-pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChargeState {
    pub pedaling: bool,
    pub charge: f32,
    pub ratio: f32,
}

impl ChargeState {
    pub fn update(
        &mut self,
        dt: f32,
        hold_active: bool,
        can_charge: bool,
        physics: &RiderPhysicsConfig,
    ) {
        let cap = physics.charge_cap_seconds.max(RAMP_EPSILON);
        self.pedaling = hold_active && can_charge;
        if self.pedaling {
            self.charge = (self.charge + dt).clamp(0.0, cap);
        }

        let target = (self.charge / cap).min(1.0);
        let blend = (dt * physics.charge_smoothing_rate).min(1.0);
        self.ratio = (self.ratio + (target - self.ratio) * blend).clamp(0.0, 1.0);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn pedal_acceleration(&self, physics: &RiderPhysicsConfig) -> f32 {
        let start = physics.pedal_ramp_start_seconds;
        let end = physics.pedal_ramp_end_seconds;

        if self.charge > end {
            physics.pedal_accel_max
        } else if self.charge > start {
            let blend = ((self.charge - start) / (end - start).max(RAMP_EPSILON)).clamp(0.0, 1.0);
            physics.pedal_accel_mid + (physics.pedal_accel_max - physics.pedal_accel_mid) * blend
        } else {
            physics.pedal_accel_min
        }
    }
}
