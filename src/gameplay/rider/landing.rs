use super::physics::CrashCause;
use super::state::JumpTracker;
use crate::config::{CrashConfig, SimulationConfig};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingVerdict {
    Safe,
    FailedRecovery,
    HardCrash,
}

impl LandingVerdict {
    pub fn crash_cause(self) -> Option<CrashCause> {
        match self {
            Self::Safe => None,
            Self::FailedRecovery => Some(CrashCause::FailedRecovery),
            Self::HardCrash => Some(CrashCause::HardImpact),
        }
    }
}

// `pitch_delta` must already be normalized against the terrain angle.
pub fn classify(pitch_delta: f32, angular_velocity: f32, crash: &CrashConfig) -> LandingVerdict {
    let pitch = pitch_delta.abs();
    let spin = angular_velocity.abs();

    if pitch > crash.hard_crash_pitch || spin > crash.hard_crash_angular {
        return LandingVerdict::HardCrash;
    }
    if pitch > crash.recoverable_pitch && spin > crash.recoverable_angular {
        return LandingVerdict::FailedRecovery;
    }
    LandingVerdict::Safe
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LandingQuality {
    Good,
    Perfect,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandingReport {
    pub quality: LandingQuality,
    pub pitch_delta: f32,
    pub air_time: f32,
    pub peak_height: f32,
    pub travel: f32,
    pub flips: u32,
    pub superman_used: bool,
    pub trick: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Touchdown {
    pub x: f32,
    pub ground_y: f32,
    pub slope: f32,
    pub pitch_delta: f32,
}

pub fn grade_landing(
    jump: &JumpTracker,
    touchdown: &Touchdown,
    config: &SimulationConfig,
) -> LandingQuality {
    let band = &config.landing;
    let travel = touchdown.x - jump.launch_x;

    // y grows downward, so clearance is how far the crest sat above each end.
    let cleared_peak = jump.launch_ground_y - jump.highest_ground_y >= band.peak_clearance
        && touchdown.ground_y - jump.highest_ground_y >= band.peak_clearance;

    let perfect = config.mode.tricks_enabled
        && jump.launch_slope < -band.launch_uphill_slope
        && cleared_peak
        && (band.descent_slope_min..=band.descent_slope_max).contains(&touchdown.slope)
        && (band.travel_min..=band.travel_max).contains(&travel)
        && touchdown.pitch_delta.abs() < band.perfect_max_pitch
        && !jump.superman_active;

    if perfect {
        LandingQuality::Perfect
    } else {
        LandingQuality::Good
    }
}

pub fn build_report(
    jump: &JumpTracker,
    touchdown: &Touchdown,
    config: &SimulationConfig,
) -> LandingReport {
    LandingReport {
        quality: grade_landing(jump, touchdown, config),
        pitch_delta: touchdown.pitch_delta,
        air_time: jump.air_time,
        peak_height: jump.peak_height(),
        travel: touchdown.x - jump.launch_x,
        flips: jump.flips,
        superman_used: jump.superman_used,
        trick: config.mode.tricks_enabled && jump.is_trick(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1.0e-3;

    fn arching_jump() -> JumpTracker {
        JumpTracker {
            launch_x: 100.0,
            launch_y: 450.0,
            launch_ground_y: 480.0,
            launch_slope: -0.2,
            air_time: 1.1,
            apex_y: 420.0,
            highest_ground_y: 470.0,
            previous_angle: 0.0,
            rotation_accum: 0.0,
            flips: 0,
            hold_time: 0.0,
            superman_active: false,
            superman_used: false,
        }
    }

    fn clean_touchdown() -> Touchdown {
        Touchdown {
            x: 160.0,
            ground_y: 490.0,
            slope: 0.2,
            pitch_delta: 0.1,
        }
    }

    #[test]
    fn level_and_still_is_safe() {
        assert_eq!(classify(0.0, 0.0, &CrashConfig::default()), LandingVerdict::Safe);
    }

    #[test]
    fn big_offset_and_spin_is_a_hard_crash() {
        let verdict = classify(2.0, 10.0, &CrashConfig::default());
        assert_eq!(verdict, LandingVerdict::HardCrash);
        assert_eq!(verdict.crash_cause(), Some(CrashCause::HardImpact));
    }

    #[test]
    fn hard_pitch_threshold_is_monotonic() {
        let crash = CrashConfig::default();

        assert_eq!(
            classify(crash.hard_crash_pitch - EPS, 0.0, &crash),
            LandingVerdict::Safe
        );
        assert_eq!(
            classify(-(crash.hard_crash_pitch - EPS), 0.0, &crash),
            LandingVerdict::Safe
        );
        assert_eq!(
            classify(crash.hard_crash_pitch + EPS, 0.0, &crash),
            LandingVerdict::HardCrash
        );
        assert_eq!(
            classify(-(crash.hard_crash_pitch + EPS), 0.0, &crash),
            LandingVerdict::HardCrash
        );
    }

    #[test]
    fn hard_angular_threshold_alone_crashes() {
        let crash = CrashConfig::default();

        assert_eq!(
            classify(0.0, crash.hard_crash_angular - EPS, &crash),
            LandingVerdict::Safe
        );
        assert_eq!(
            classify(0.0, -(crash.hard_crash_angular + EPS), &crash),
            LandingVerdict::HardCrash
        );
    }

    #[test]
    fn recoverable_needs_both_tilt_and_spin() {
        let crash = CrashConfig::default();
        let tilt = crash.recoverable_pitch + 0.1;
        let spin = crash.recoverable_angular + 0.5;

        assert_eq!(classify(tilt, 0.0, &crash), LandingVerdict::Safe);
        assert_eq!(classify(0.0, spin, &crash), LandingVerdict::Safe);
        assert_eq!(classify(tilt, spin, &crash), LandingVerdict::FailedRecovery);
    }

    #[test]
    fn clean_arc_over_a_crest_is_perfect() {
        let quality = grade_landing(&arching_jump(), &clean_touchdown(), &SimulationConfig::default());
        assert_eq!(quality, LandingQuality::Perfect);
    }

    #[test]
    fn superman_pose_at_contact_denies_perfect() {
        let mut jump = arching_jump();
        jump.superman_active = true;
        jump.superman_used = true;

        let config = SimulationConfig::default();
        let report = build_report(&jump, &clean_touchdown(), &config);

        assert_eq!(report.quality, LandingQuality::Good);
        assert!(report.trick);
    }

    #[test]
    fn flat_launch_or_tilted_touchdown_is_only_good() {
        let config = SimulationConfig::default();

        let mut flat_launch = arching_jump();
        flat_launch.launch_slope = 0.0;
        assert_eq!(
            grade_landing(&flat_launch, &clean_touchdown(), &config),
            LandingQuality::Good
        );

        let tilted = Touchdown {
            pitch_delta: 0.5,
            ..clean_touchdown()
        };
        assert_eq!(grade_landing(&arching_jump(), &tilted, &config), LandingQuality::Good);

        let uphill = Touchdown {
            slope: -0.2,
            ..clean_touchdown()
        };
        assert_eq!(grade_landing(&arching_jump(), &uphill, &config), LandingQuality::Good);
    }

    #[test]
    fn no_crest_cleared_is_only_good() {
        let mut jump = arching_jump();
        jump.highest_ground_y = jump.launch_ground_y;

        assert_eq!(
            grade_landing(&jump, &clean_touchdown(), &SimulationConfig::default()),
            LandingQuality::Good
        );
    }

    #[test]
    fn tricks_disabled_mode_never_grades_perfect() {
        let mut config = SimulationConfig::default();
        config.mode.tricks_enabled = false;

        let mut jump = arching_jump();
        jump.flips = 2;
        let report = build_report(&jump, &clean_touchdown(), &config);

        assert_eq!(report.quality, LandingQuality::Good);
        assert!(!report.trick);
    }

    #[test]
    fn report_carries_jump_measurements() {
        let report = build_report(&arching_jump(), &clean_touchdown(), &SimulationConfig::default());

        assert_eq!(report.travel, 60.0);
        assert_eq!(report.peak_height, 30.0);
        assert_eq!(report.air_time, 1.1);
        assert!(!report.trick);
    }
}
