use super::state::{RiderMode, RiderState};
use crate::config::SimulationConfig;
use crate::gameplay::terrain::TerrainField;
use serde::Serialize;
use std::f32::consts::{PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrashCause {
    LostBalance,
    HardImpact,
    FailedRecovery,
}

impl CrashCause {
    pub fn label(self) -> &'static str {
        match self {
            Self::LostBalance => "Lost balance",
            Self::HardImpact => "Hard impact",
            Self::FailedRecovery => "Could not recover",
        }
    }
}

// Wraps into `(-PI, PI]`; in-range values come back untouched.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    if angle > -PI && angle <= PI {
        return angle;
    }

    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

pub fn shortest_angle_delta_rad(current: f32, previous: f32) -> f32 {
    normalize_angle(current - previous)
}

pub fn apply_rolling_friction(vx: f32, amount: f32) -> f32 {
    if vx > amount {
        vx - amount
    } else if vx < -amount {
        vx + amount
    } else {
        0.0
    }
}

pub fn step_grounded(
    state: &mut RiderState,
    terrain: &TerrainField,
    config: &SimulationConfig,
    dt: f32,
) -> Option<CrashCause> {
    let physics = &config.physics;

    let slope = terrain.slope(state.world_x);
    state.vx += physics.gravity * slope / (1.0 + slope * slope).sqrt() * dt;

    state.charge.update(dt, state.hold_active, true, physics);
    if state.charge.pedaling {
        state.vx += state.charge.pedal_acceleration(physics) * dt;
    }

    state.vx = apply_rolling_friction(state.vx, physics.rolling_friction * dt);
    state.vx = state.vx.clamp(physics.min_speed, physics.max_speed);
    state.world_x += state.vx * dt * physics.world_units_per_meter;

    state.terrain_angle = terrain.angle(state.world_x);
    state.rider_y = terrain.height(state.world_x) - config.body.ground_offset();

    let crouch_bias = if state.charge.pedaling {
        state.charge.ratio * physics.crouch_bias_per_charge
    } else {
        0.0
    };
    let angle_error = normalize_angle(state.terrain_angle - crouch_bias - state.angle);
    let torque =
        angle_error * config.upright_stiffness() - state.angular_velocity * config.upright_damping();
    state.angular_velocity += torque * dt;
    state.angle += state.angular_velocity * dt;

    let pitch = normalize_angle(state.angle - state.terrain_angle);
    let com_offset = pitch.sin() * config.body.com_height;
    if com_offset.abs() > config.body.wheel_base * 0.5 {
        state.tip_timer += dt;
    } else {
        state.tip_timer = (state.tip_timer - dt * config.crash.tip_decay_rate).max(0.0);
    }

    if pitch.abs() > config.crash.hard_crash_pitch
        || state.tip_timer > config.crash.tip_threshold_seconds
    {
        return Some(CrashCause::LostBalance);
    }
    None
}

// True on ground contact, with `rider_y` clamped to the contact height.
pub fn step_airborne(
    state: &mut RiderState,
    terrain: &TerrainField,
    config: &SimulationConfig,
    dt: f32,
) -> bool {
    let physics = &config.physics;
    let RiderMode::Airborne(tracker) = &mut state.mode else {
        return false;
    };

    state.vy += physics.gravity * dt;
    state.descending = state.vy > 0.0;

    let can_charge = state.descending && config.mode.air_charge;
    state
        .charge
        .update(dt, state.hold_active, can_charge, physics);

    state.angular_velocity *= (1.0 - physics.airborne_pitch_damping * dt).max(0.0);
    state.angle += state.angular_velocity * dt;

    state.vx = (state.vx - physics.air_drag * dt).max(physics.min_speed);
    state.world_x += state.vx * dt * physics.world_units_per_meter;
    state.rider_y += state.vy * dt * physics.world_units_per_meter;

    let ground_y = terrain.height(state.world_x);
    tracker.air_time += dt;
    tracker.apex_y = tracker.apex_y.min(state.rider_y);
    tracker.highest_ground_y = tracker.highest_ground_y.min(ground_y);

    tracker.rotation_accum += shortest_angle_delta_rad(state.angle, tracker.previous_angle).abs();
    tracker.previous_angle = state.angle;
    while tracker.rotation_accum >= TAU {
        tracker.flips = tracker.flips.saturating_add(1);
        tracker.rotation_accum -= TAU;
    }

    if state.hold_active {
        tracker.hold_time += dt;
        if config.mode.tricks_enabled && tracker.hold_time >= physics.superman_pose_delay_seconds {
            tracker.superman_active = true;
            tracker.superman_used = true;
        }
    } else {
        tracker.hold_time = 0.0;
        tracker.superman_active = false;
    }

    let contact_y = ground_y - config.body.ground_offset();
    if state.rider_y >= contact_y {
        state.rider_y = contact_y;
        return true;
    }
    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{TerrainConfig, TerrainGenerator, WaveConfig};
    use crate::gameplay::rider::state::JumpTracker;

    const DT: f32 = 1.0 / 60.0;

    pub(crate) fn flat_terrain() -> TerrainField {
        sloped_terrain(0.0)
    }

    pub(crate) fn sloped_terrain(ramp_slope: f32) -> TerrainField {
        TerrainField::generate(&TerrainConfig {
            generator: TerrainGenerator::Waves,
            level_length: 10_000.0,
            ramp_slope,
            waves: Vec::new(),
            ..TerrainConfig::default()
        })
    }

    fn airborne_state(terrain: &TerrainField, config: &SimulationConfig, lift: f32) -> RiderState {
        let mut state = RiderState::grounded_at(100.0, 6.0, terrain, config);
        state.rider_y -= lift;
        state.mode = RiderMode::Airborne(JumpTracker::launch(&state, terrain));
        state
    }

    #[test]
    fn normalize_stays_in_half_open_range_and_is_idempotent() {
        let mut samples = vec![
            0.0,
            PI,
            -PI,
            TAU,
            -TAU,
            3.0 * PI,
            -3.0 * PI,
            PI + 1.0e-6,
            -PI - 1.0e-6,
            1.0e6,
            -1.0e6,
            f32::MIN_POSITIVE,
        ];
        samples.extend((-400..=400).map(|step| step as f32 * 0.137));

        for angle in samples {
            let once = normalize_angle(angle);
            assert!(once > -PI && once <= PI, "{angle} -> {once}");
            assert_eq!(normalize_angle(once).to_bits(), once.to_bits(), "{angle}");
        }
    }

    #[test]
    fn normalize_maps_minus_pi_to_pi() {
        assert_eq!(normalize_angle(-PI), PI);
        assert_eq!(normalize_angle(PI), PI);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
        assert_eq!(normalize_angle(f32::INFINITY), 0.0);
    }

    #[test]
    fn shortest_delta_crosses_the_wrap() {
        let delta = shortest_angle_delta_rad(-3.1, 3.1);
        assert!((delta - (TAU - 6.2)).abs() < 1.0e-4, "delta = {delta}");
    }

    #[test]
    fn friction_never_reverses_motion() {
        assert_eq!(apply_rolling_friction(0.05, 0.1), 0.0);
        assert_eq!(apply_rolling_friction(-0.05, 0.1), 0.0);
        assert!((apply_rolling_friction(1.0, 0.1) - 0.9).abs() < 1.0e-6);
        assert!((apply_rolling_friction(-1.0, 0.1) + 0.9).abs() < 1.0e-6);
    }

    #[test]
    fn grounded_speed_stays_within_bounds_on_extreme_slopes() {
        let config = SimulationConfig::default();
        for ramp in [-3.0, -0.4, 0.0, 0.4, 3.0] {
            let terrain = sloped_terrain(ramp);
            let mut state = RiderState::grounded_at(10.0, config.physics.start_speed, &terrain, &config);
            state.hold_active = ramp > 0.0;

            for _ in 0..600 {
                step_grounded(&mut state, &terrain, &config, DT);
                assert!(state.vx >= config.physics.min_speed, "ramp {ramp}: {}", state.vx);
                assert!(state.vx <= config.physics.max_speed, "ramp {ramp}: {}", state.vx);
            }
        }
    }

    #[test]
    fn downhill_accelerates_and_uphill_decelerates() {
        let config = SimulationConfig::default();
        let down = sloped_terrain(0.3);
        let up = sloped_terrain(-0.3);
        let mut on_down = RiderState::grounded_at(10.0, 6.0, &down, &config);
        let mut on_up = RiderState::grounded_at(10.0, 6.0, &up, &config);

        step_grounded(&mut on_down, &down, &config, DT);
        step_grounded(&mut on_up, &up, &config, DT);

        assert!(on_down.vx > 6.0);
        assert!(on_up.vx < 6.0);
    }

    #[test]
    fn grounded_rider_y_is_derived_from_terrain() {
        let config = SimulationConfig::default();
        let terrain = sloped_terrain(0.2);
        let mut state = RiderState::grounded_at(10.0, 6.0, &terrain, &config);
        state.rider_y = -999.0;

        step_grounded(&mut state, &terrain, &config, DT);

        let expected = terrain.height(state.world_x) - config.body.ground_offset();
        assert_eq!(state.rider_y, expected);
    }

    #[test]
    fn large_pitch_on_ground_loses_balance() {
        let config = SimulationConfig::default();
        let terrain = flat_terrain();
        let mut state = RiderState::grounded_at(10.0, 6.0, &terrain, &config);
        state.angle = 1.6;

        assert_eq!(
            step_grounded(&mut state, &terrain, &config, DT),
            Some(CrashCause::LostBalance)
        );
    }

    #[test]
    fn sustained_lean_trips_the_tip_timer() {
        let mut config = SimulationConfig::default();
        config.physics.upright_stiffness = 0.0;
        config.physics.upright_damping = 0.0;
        let terrain = flat_terrain();
        let mut state = RiderState::grounded_at(10.0, 6.0, &terrain, &config);
        state.angle = 1.0;

        let crash_step = (0..60)
            .find(|_| step_grounded(&mut state, &terrain, &config, DT).is_some())
            .expect("lean should eventually crash");

        assert!(crash_step >= 15, "crashed too early at step {crash_step}");
        assert!(crash_step <= 18, "crashed too late at step {crash_step}");
    }

    #[test]
    fn tip_timer_decays_when_upright() {
        let config = SimulationConfig::default();
        let terrain = flat_terrain();
        let mut state = RiderState::grounded_at(10.0, 6.0, &terrain, &config);
        state.tip_timer = 0.1;

        step_grounded(&mut state, &terrain, &config, DT);

        assert!((state.tip_timer - (0.1 - DT * 2.0)).abs() < 1.0e-6);
    }

    #[test]
    fn airborne_rider_falls_and_touches_down() {
        let config = SimulationConfig::default();
        let terrain = flat_terrain();
        let mut state = airborne_state(&terrain, &config, 20.0);

        let contact_step = (0..240)
            .find(|_| step_airborne(&mut state, &terrain, &config, DT))
            .expect("rider should land");

        assert!(contact_step > 0);
        assert!(state.descending);
        assert_eq!(
            state.rider_y,
            terrain.height(state.world_x) - config.body.ground_offset()
        );
    }

    #[test]
    fn air_charge_only_while_descending() {
        let config = SimulationConfig::default();
        let terrain = flat_terrain();
        let mut state = airborne_state(&terrain, &config, 40.0);
        state.vy = -8.0;
        state.hold_active = true;

        step_airborne(&mut state, &terrain, &config, DT);
        assert!(!state.charge.pedaling);
        assert_eq!(state.charge.charge, 0.0);

        state.vy = 2.0;
        step_airborne(&mut state, &terrain, &config, DT);
        assert!(state.charge.pedaling);
        assert!(state.charge.charge > 0.0);
    }

    #[test]
    fn full_rotation_counts_one_flip() {
        let mut config = SimulationConfig::default();
        config.physics.airborne_pitch_damping = 0.0;
        config.physics.gravity = 0.0;
        let terrain = flat_terrain();
        let mut state = airborne_state(&terrain, &config, 200.0);
        state.angular_velocity = 8.0;

        for _ in 0..60 {
            step_airborne(&mut state, &terrain, &config, DT);
        }

        let tracker = state.jump().expect("still airborne");
        assert_eq!(tracker.flips, 1);
        assert!(tracker.is_trick());
    }

    #[test]
    fn holding_in_air_enters_superman_pose() {
        let mut config = SimulationConfig::default();
        config.physics.gravity = 0.0;
        let terrain = flat_terrain();
        let mut state = airborne_state(&terrain, &config, 200.0);
        state.hold_active = true;

        for _ in 0..30 {
            step_airborne(&mut state, &terrain, &config, DT);
        }
        let tracker = *state.jump().expect("still airborne");
        assert!(tracker.superman_active);

        state.hold_active = false;
        step_airborne(&mut state, &terrain, &config, DT);
        let tracker = state.jump().expect("still airborne");
        assert!(!tracker.superman_active);
        assert!(tracker.superman_used);
    }
}
