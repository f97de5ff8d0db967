use serde::Deserialize;

use super::{floor_at, order_pair, RiderFile};

const MIN_SPEED_FLOOR: f32 = 0.05;
const DIVISOR_FLOOR: f32 = 1.0e-4;
const CRASH_SCALE_FLOOR: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiderPhysicsConfig {
    pub gravity: f32,
    pub pedal_accel_min: f32,
    pub pedal_accel_mid: f32,
    pub pedal_accel_max: f32,
    pub pedal_ramp_start_seconds: f32,
    pub pedal_ramp_end_seconds: f32,
    pub rolling_friction: f32,
    pub air_drag: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub start_speed: f32,
    pub respawn_speed: f32,
    pub world_units_per_meter: f32,
    pub max_visible_jump_vy: f32,
    pub charge_cap_seconds: f32,
    pub charge_smoothing_rate: f32,
    pub min_jump_charge_ratio: f32,
    pub jump_base_impulse: f32,
    pub jump_charge_impulse: f32,
    pub flip_impulse: f32,
    pub airborne_pitch_damping: f32,
    pub upright_stiffness: f32,
    pub upright_damping: f32,
    pub crouch_bias_per_charge: f32,
    pub suspension_stiffness: f32,
    pub suspension_damping: f32,
    pub landing_suspension_impulse: f32,
    pub respawn_suspension_impulse: f32,
    pub superman_pose_delay_seconds: f32,
}

impl Default for RiderPhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 18.8,
            pedal_accel_min: 0.85,
            pedal_accel_mid: 1.75,
            pedal_accel_max: 2.85,
            pedal_ramp_start_seconds: 0.25,
            pedal_ramp_end_seconds: 1.05,
            rolling_friction: 0.16,
            air_drag: 0.045,
            min_speed: 0.55,
            max_speed: 18.0,
            start_speed: 4.2,
            respawn_speed: 5.6,
            world_units_per_meter: 4.0,
            max_visible_jump_vy: 14.0,
            charge_cap_seconds: 1.5,
            charge_smoothing_rate: 16.0,
            min_jump_charge_ratio: 0.04,
            jump_base_impulse: 6.4,
            jump_charge_impulse: 6.8,
            flip_impulse: 7.8,
            airborne_pitch_damping: 1.9,
            upright_stiffness: 23.0,
            upright_damping: 8.4,
            crouch_bias_per_charge: 0.18,
            suspension_stiffness: 26.0,
            suspension_damping: 9.4,
            landing_suspension_impulse: 1.8,
            respawn_suspension_impulse: 1.1,
            superman_pose_delay_seconds: 0.35,
        }
    }
}

impl RiderPhysicsConfig {
    pub(super) fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("gravity", self.gravity),
            ("pedal_accel_min", self.pedal_accel_min),
            ("pedal_accel_mid", self.pedal_accel_mid),
            ("pedal_accel_max", self.pedal_accel_max),
            ("pedal_ramp_start_seconds", self.pedal_ramp_start_seconds),
            ("pedal_ramp_end_seconds", self.pedal_ramp_end_seconds),
            ("rolling_friction", self.rolling_friction),
            ("air_drag", self.air_drag),
            ("min_speed", self.min_speed),
            ("max_speed", self.max_speed),
            ("start_speed", self.start_speed),
            ("respawn_speed", self.respawn_speed),
            ("world_units_per_meter", self.world_units_per_meter),
            ("max_visible_jump_vy", self.max_visible_jump_vy),
            ("charge_cap_seconds", self.charge_cap_seconds),
            ("charge_smoothing_rate", self.charge_smoothing_rate),
            ("min_jump_charge_ratio", self.min_jump_charge_ratio),
            ("jump_base_impulse", self.jump_base_impulse),
            ("jump_charge_impulse", self.jump_charge_impulse),
            ("flip_impulse", self.flip_impulse),
            ("airborne_pitch_damping", self.airborne_pitch_damping),
            ("upright_stiffness", self.upright_stiffness),
            ("upright_damping", self.upright_damping),
            ("crouch_bias_per_charge", self.crouch_bias_per_charge),
            ("suspension_stiffness", self.suspension_stiffness),
            ("suspension_damping", self.suspension_damping),
            ("landing_suspension_impulse", self.landing_suspension_impulse),
            ("respawn_suspension_impulse", self.respawn_suspension_impulse),
            ("superman_pose_delay_seconds", self.superman_pose_delay_seconds),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiderBodyConfig {
    pub wheel_radius: f32,
    pub wheel_base: f32,
    pub body_height: f32,
    pub com_height: f32,
}

impl Default for RiderBodyConfig {
    fn default() -> Self {
        Self {
            wheel_radius: 10.0,
            wheel_base: 38.0,
            body_height: 20.0,
            com_height: 24.0,
        }
    }
}

impl RiderBodyConfig {
    pub fn ground_offset(&self) -> f32 {
        self.wheel_radius + self.body_height
    }

    pub(super) fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("wheel_radius", self.wheel_radius),
            ("wheel_base", self.wheel_base),
            ("body_height", self.body_height),
            ("com_height", self.com_height),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    pub hard_crash_pitch: f32,
    pub hard_crash_angular: f32,
    pub recoverable_pitch: f32,
    pub recoverable_angular: f32,
    pub tip_threshold_seconds: f32,
    pub tip_decay_rate: f32,
    pub respawn_delay_seconds: f32,
    pub crash_flash_seconds: f32,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            hard_crash_pitch: 1.35,
            hard_crash_angular: 8.8,
            recoverable_pitch: 0.88,
            recoverable_angular: 6.4,
            tip_threshold_seconds: 0.28,
            tip_decay_rate: 2.0,
            respawn_delay_seconds: 0.22,
            crash_flash_seconds: 0.2,
        }
    }
}

impl CrashConfig {
    pub(super) fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("hard_crash_pitch", self.hard_crash_pitch),
            ("hard_crash_angular", self.hard_crash_angular),
            ("recoverable_pitch", self.recoverable_pitch),
            ("recoverable_angular", self.recoverable_angular),
            ("tip_threshold_seconds", self.tip_threshold_seconds),
            ("tip_decay_rate", self.tip_decay_rate),
            ("respawn_delay_seconds", self.respawn_delay_seconds),
            ("crash_flash_seconds", self.crash_flash_seconds),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LandingQualityConfig {
    pub perfect_max_pitch: f32,
    pub launch_uphill_slope: f32,
    pub peak_clearance: f32,
    pub descent_slope_min: f32,
    pub descent_slope_max: f32,
    pub travel_min: f32,
    pub travel_max: f32,
}

impl Default for LandingQualityConfig {
    fn default() -> Self {
        Self {
            perfect_max_pitch: 0.34,
            launch_uphill_slope: 0.04,
            peak_clearance: 4.0,
            descent_slope_min: 0.05,
            descent_slope_max: 0.9,
            travel_min: 24.0,
            travel_max: 260.0,
        }
    }
}

impl LandingQualityConfig {
    pub(super) fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("perfect_max_pitch", self.perfect_max_pitch),
            ("launch_uphill_slope", self.launch_uphill_slope),
            ("peak_clearance", self.peak_clearance),
            ("descent_slope_min", self.descent_slope_min),
            ("descent_slope_max", self.descent_slope_max),
            ("travel_min", self.travel_min),
            ("travel_max", self.travel_max),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub passive: PassiveScoreConfig,
    #[serde(default)]
    pub jump_bonus: JumpBonusConfig,
    #[serde(default)]
    pub combo: ComboConfig,
}

impl ScoringConfig {
    pub(super) fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("passive.ground_factor", self.passive.ground_factor),
            ("passive.air_factor", self.passive.air_factor),
            (
                "jump_bonus.min_air_time_seconds",
                self.jump_bonus.min_air_time_seconds,
            ),
            ("jump_bonus.height_norm", self.jump_bonus.height_norm),
            (
                "jump_bonus.air_time_norm_seconds",
                self.jump_bonus.air_time_norm_seconds,
            ),
            ("jump_bonus.height_weight", self.jump_bonus.height_weight),
            ("jump_bonus.air_time_weight", self.jump_bonus.air_time_weight),
            ("jump_bonus.exponent", self.jump_bonus.exponent),
            ("jump_bonus.scale", self.jump_bonus.scale),
            ("jump_bonus.min_bonus", self.jump_bonus.min_bonus),
            ("jump_bonus.max_bonus", self.jump_bonus.max_bonus),
            (
                "jump_bonus.perfect_multiplier",
                self.jump_bonus.perfect_multiplier,
            ),
            ("combo.grace_seconds", self.combo.grace_seconds),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PassiveScoreConfig {
    pub ground_factor: f32,
    pub air_factor: f32,
}

impl Default for PassiveScoreConfig {
    fn default() -> Self {
        Self {
            ground_factor: 1.2,
            air_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JumpBonusConfig {
    pub min_air_time_seconds: f32,
    pub height_norm: f32,
    pub air_time_norm_seconds: f32,
    pub height_weight: f32,
    pub air_time_weight: f32,
    pub exponent: f32,
    pub scale: f32,
    pub min_bonus: f32,
    pub max_bonus: f32,
    pub perfect_multiplier: f32,
}

impl Default for JumpBonusConfig {
    fn default() -> Self {
        Self {
            min_air_time_seconds: 0.3,
            height_norm: 24.0,
            air_time_norm_seconds: 1.2,
            height_weight: 0.55,
            air_time_weight: 0.45,
            exponent: 0.72,
            scale: 28.0,
            min_bonus: 10.0,
            max_bonus: 50.0,
            perfect_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    pub grace_seconds: f32,
    pub forfeit_on_crash: bool,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            grace_seconds: 2.5,
            forfeit_on_crash: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModeConfig {
    pub id: String,
    #[serde(default = "default_strength")]
    pub stabilization_strength: f32,
    #[serde(default = "default_strength")]
    pub crash_threshold_scale: f32,
    #[serde(default = "default_true")]
    pub air_charge: bool,
    #[serde(default = "default_true")]
    pub flip_on_ascent_press: bool,
    #[serde(default = "default_true")]
    pub tricks_enabled: bool,
    #[serde(default = "default_true")]
    pub combo_enabled: bool,
}

fn default_strength() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            id: "normal".to_string(),
            stabilization_strength: 1.0,
            crash_threshold_scale: 1.0,
            air_charge: true,
            flip_on_ascent_press: true,
            tricks_enabled: true,
            combo_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimulationConfig {
    pub physics: RiderPhysicsConfig,
    pub body: RiderBodyConfig,
    pub crash: CrashConfig,
    pub landing: LandingQualityConfig,
    pub scoring: ScoringConfig,
    pub mode: ModeConfig,
    pub checkpoint_spacing: f32,
}

impl SimulationConfig {
    pub fn from_parts(
        rider: &RiderFile,
        scoring: &ScoringConfig,
        mode: &ModeConfig,
        checkpoint_spacing: f32,
    ) -> Self {
        let mut crash = rider.crash.clone();
        let scale = mode.crash_threshold_scale.max(CRASH_SCALE_FLOOR);
        crash.hard_crash_pitch *= scale;
        crash.hard_crash_angular *= scale;
        crash.recoverable_pitch *= scale;
        crash.recoverable_angular *= scale;

        Self {
            physics: rider.physics.clone(),
            body: rider.body.clone(),
            crash,
            landing: rider.landing_quality.clone(),
            scoring: scoring.clone(),
            mode: mode.clone(),
            checkpoint_spacing,
        }
    }

    pub fn upright_stiffness(&self) -> f32 {
        self.physics.upright_stiffness * self.mode.stabilization_strength
    }

    pub fn upright_damping(&self) -> f32 {
        self.physics.upright_damping * self.mode.stabilization_strength
    }

    // One message per correction made.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut corrections = Vec::new();
        let c = &mut corrections;

        let physics = &mut self.physics;
        order_pair(
            "physics.min_speed/max_speed",
            &mut physics.min_speed,
            &mut physics.max_speed,
            c,
        );
        floor_at("physics.min_speed", &mut physics.min_speed, MIN_SPEED_FLOOR, c);
        floor_at(
            "physics.max_speed",
            &mut physics.max_speed,
            physics.min_speed,
            c,
        );
        clamp_into(
            "physics.start_speed",
            &mut physics.start_speed,
            physics.min_speed,
            physics.max_speed,
            c,
        );
        clamp_into(
            "physics.respawn_speed",
            &mut physics.respawn_speed,
            physics.min_speed,
            physics.max_speed,
            c,
        );
        order_pair(
            "physics.pedal_accel_min/pedal_accel_max",
            &mut physics.pedal_accel_min,
            &mut physics.pedal_accel_max,
            c,
        );
        clamp_into(
            "physics.pedal_accel_mid",
            &mut physics.pedal_accel_mid,
            physics.pedal_accel_min,
            physics.pedal_accel_max,
            c,
        );
        floor_at(
            "physics.pedal_ramp_start_seconds",
            &mut physics.pedal_ramp_start_seconds,
            0.0,
            c,
        );
        order_pair(
            "physics.pedal_ramp_start_seconds/pedal_ramp_end_seconds",
            &mut physics.pedal_ramp_start_seconds,
            &mut physics.pedal_ramp_end_seconds,
            c,
        );
        floor_at(
            "physics.charge_cap_seconds",
            &mut physics.charge_cap_seconds,
            DIVISOR_FLOOR,
            c,
        );
        floor_at(
            "physics.world_units_per_meter",
            &mut physics.world_units_per_meter,
            DIVISOR_FLOOR,
            c,
        );
        clamp_into(
            "physics.min_jump_charge_ratio",
            &mut physics.min_jump_charge_ratio,
            0.0,
            1.0,
            c,
        );
        for (label, value) in [
            ("physics.gravity", &mut physics.gravity),
            ("physics.rolling_friction", &mut physics.rolling_friction),
            ("physics.air_drag", &mut physics.air_drag),
            ("physics.max_visible_jump_vy", &mut physics.max_visible_jump_vy),
            ("physics.charge_smoothing_rate", &mut physics.charge_smoothing_rate),
            ("physics.jump_base_impulse", &mut physics.jump_base_impulse),
            ("physics.jump_charge_impulse", &mut physics.jump_charge_impulse),
            ("physics.flip_impulse", &mut physics.flip_impulse),
            (
                "physics.airborne_pitch_damping",
                &mut physics.airborne_pitch_damping,
            ),
            ("physics.upright_stiffness", &mut physics.upright_stiffness),
            ("physics.upright_damping", &mut physics.upright_damping),
            ("physics.crouch_bias_per_charge", &mut physics.crouch_bias_per_charge),
            ("physics.suspension_stiffness", &mut physics.suspension_stiffness),
            ("physics.suspension_damping", &mut physics.suspension_damping),
            (
                "physics.landing_suspension_impulse",
                &mut physics.landing_suspension_impulse,
            ),
            (
                "physics.respawn_suspension_impulse",
                &mut physics.respawn_suspension_impulse,
            ),
            (
                "physics.superman_pose_delay_seconds",
                &mut physics.superman_pose_delay_seconds,
            ),
        ] {
            floor_at(label, value, 0.0, c);
        }

        let body = &mut self.body;
        floor_at("body.wheel_base", &mut body.wheel_base, DIVISOR_FLOOR, c);
        floor_at("body.wheel_radius", &mut body.wheel_radius, 0.0, c);
        floor_at("body.body_height", &mut body.body_height, 0.0, c);
        floor_at("body.com_height", &mut body.com_height, 0.0, c);

        let crash = &mut self.crash;
        floor_at("crash.hard_crash_pitch", &mut crash.hard_crash_pitch, 0.0, c);
        floor_at(
            "crash.hard_crash_angular",
            &mut crash.hard_crash_angular,
            0.0,
            c,
        );
        cap_at(
            "crash.recoverable_pitch",
            &mut crash.recoverable_pitch,
            crash.hard_crash_pitch,
            c,
        );
        cap_at(
            "crash.recoverable_angular",
            &mut crash.recoverable_angular,
            crash.hard_crash_angular,
            c,
        );
        for (label, value) in [
            ("crash.recoverable_pitch", &mut crash.recoverable_pitch),
            ("crash.recoverable_angular", &mut crash.recoverable_angular),
            ("crash.tip_threshold_seconds", &mut crash.tip_threshold_seconds),
            ("crash.tip_decay_rate", &mut crash.tip_decay_rate),
            ("crash.respawn_delay_seconds", &mut crash.respawn_delay_seconds),
            ("crash.crash_flash_seconds", &mut crash.crash_flash_seconds),
        ] {
            floor_at(label, value, 0.0, c);
        }

        let landing = &mut self.landing;
        order_pair(
            "landing_quality.descent_slope_min/descent_slope_max",
            &mut landing.descent_slope_min,
            &mut landing.descent_slope_max,
            c,
        );
        order_pair(
            "landing_quality.travel_min/travel_max",
            &mut landing.travel_min,
            &mut landing.travel_max,
            c,
        );
        floor_at(
            "landing_quality.perfect_max_pitch",
            &mut landing.perfect_max_pitch,
            0.0,
            c,
        );
        floor_at(
            "landing_quality.peak_clearance",
            &mut landing.peak_clearance,
            0.0,
            c,
        );

        let bonus = &mut self.scoring.jump_bonus;
        order_pair(
            "jump_bonus.min_bonus/max_bonus",
            &mut bonus.min_bonus,
            &mut bonus.max_bonus,
            c,
        );
        for (label, value) in [
            ("jump_bonus.height_norm", &mut bonus.height_norm),
            (
                "jump_bonus.air_time_norm_seconds",
                &mut bonus.air_time_norm_seconds,
            ),
            ("jump_bonus.exponent", &mut bonus.exponent),
        ] {
            floor_at(label, value, DIVISOR_FLOOR, c);
        }
        for (label, value) in [
            ("jump_bonus.min_air_time_seconds", &mut bonus.min_air_time_seconds),
            ("jump_bonus.height_weight", &mut bonus.height_weight),
            ("jump_bonus.air_time_weight", &mut bonus.air_time_weight),
            ("jump_bonus.scale", &mut bonus.scale),
            ("jump_bonus.min_bonus", &mut bonus.min_bonus),
            ("jump_bonus.perfect_multiplier", &mut bonus.perfect_multiplier),
        ] {
            floor_at(label, value, 0.0, c);
        }
        floor_at(
            "jump_bonus.max_bonus",
            &mut bonus.max_bonus,
            bonus.min_bonus,
            c,
        );

        let passive = &mut self.scoring.passive;
        floor_at("passive.ground_factor", &mut passive.ground_factor, 0.0, c);
        floor_at("passive.air_factor", &mut passive.air_factor, 0.0, c);
        floor_at(
            "combo.grace_seconds",
            &mut self.scoring.combo.grace_seconds,
            0.0,
            c,
        );

        floor_at(
            "mode.stabilization_strength",
            &mut self.mode.stabilization_strength,
            0.0,
            c,
        );
        floor_at(
            "track.checkpoint_spacing",
            &mut self.checkpoint_spacing,
            0.0,
            c,
        );

        corrections
    }
}

fn clamp_into(label: &str, value: &mut f32, low: f32, high: f32, corrections: &mut Vec<String>) {
    let clamped = value.clamp(low, high);
    if clamped != *value {
        corrections.push(format!(
            "{label} {} clamped into [{low}, {high}]",
            *value
        ));
        *value = clamped;
    }
}

fn cap_at(label: &str, value: &mut f32, cap: f32, corrections: &mut Vec<String>) {
    if *value > cap {
        corrections.push(format!("{label} {} lowered to {cap}", *value));
        *value = cap;
    }
}
