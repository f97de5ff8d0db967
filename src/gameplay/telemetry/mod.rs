use serde::Serialize;

const LOOK_AHEAD_BASE: f32 = 34.0;
const LOOK_AHEAD_PER_SPEED: f32 = 3.8;
const AIR_LIFT_BASE: f32 = 36.0;
const AIR_LIFT_PER_VY: f32 = 2.8;
const AIR_LIFT_MAX_EXTRA: f32 = 40.0;
const SPEED_ZOOM_START: f32 = 7.0;
const SPEED_ZOOM_PER_SPEED: f32 = 0.02;
const SPEED_ZOOM_MAX: f32 = 0.14;
const AIR_ZOOM: f32 = 0.06;
const CAMERA_X_EASE: f32 = 4.8;
const CAMERA_X_EASE_CRASHED: f32 = 3.8;
const CAMERA_Y_EASE: f32 = 4.2;
const CAMERA_ZOOM_EASE: f32 = 3.2;
const DISPLAY_SPEED_BLEND: f32 = 0.18;
const RUN_TIMER_MIN_SPEED: f32 = 2.2;
const RUN_TIMER_MIN_X: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraRig {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraInput {
    pub world_x: f32,
    pub rider_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub airborne: bool,
    pub crashed: bool,
    pub level_length: f32,
}

impl CameraRig {
    pub fn snap_to(&mut self, world_x: f32, rider_y: f32) {
        *self = Self {
            x: world_x,
            y: rider_y,
            zoom: 1.0,
        };
    }

    pub fn update(&mut self, input: &CameraInput, dt: f32) {
        let look_ahead = LOOK_AHEAD_BASE + input.vx * LOOK_AHEAD_PER_SPEED;
        let target_x = (input.world_x + look_ahead).min(input.level_length);
        let lift = if input.airborne {
            -AIR_LIFT_BASE - (input.vy.abs() * AIR_LIFT_PER_VY).min(AIR_LIFT_MAX_EXTRA)
        } else {
            0.0
        };
        let target_y = input.rider_y + lift;

        let speed_zoom = ((input.vx - SPEED_ZOOM_START) * SPEED_ZOOM_PER_SPEED).clamp(0.0, SPEED_ZOOM_MAX);
        let air_zoom = if input.airborne { AIR_ZOOM } else { 0.0 };
        let target_zoom = 1.0 - speed_zoom - air_zoom;

        let x_ease = if input.crashed {
            CAMERA_X_EASE_CRASHED
        } else {
            CAMERA_X_EASE
        };
        self.x += (target_x - self.x) * (dt * x_ease).min(1.0);
        self.y += (target_y - self.y) * (dt * CAMERA_Y_EASE).min(1.0);
        self.zoom += (target_zoom - self.zoom) * (dt * CAMERA_ZOOM_EASE).min(1.0);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunTimer {
    pub started: bool,
    pub finished: bool,
    pub elapsed: f32,
}

impl RunTimer {
    pub fn tick(&mut self, vx: f32, world_x: f32, dt: f32) {
        if !self.started && vx.abs() > RUN_TIMER_MIN_SPEED && world_x > RUN_TIMER_MIN_X {
            self.started = true;
        }
        if self.started && !self.finished {
            self.elapsed += dt;
        }
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RideTelemetry {
    pub camera: CameraRig,
    pub display_speed: f32,
    pub timer: RunTimer,
}

impl RideTelemetry {
    pub fn update(&mut self, input: &CameraInput, dt: f32) {
        self.camera.update(input, dt);
        self.display_speed += (input.vx - self.display_speed) * DISPLAY_SPEED_BLEND;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiderStatus {
    Ready,
    Respawning,
    #[serde(rename = "Air / Ascend")]
    AirAscend,
    #[serde(rename = "Air / Descend")]
    AirDescend,
    Pedaling,
    Coasting,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiderSnapshot {
    pub clock: f32,
    pub world_x: f32,
    pub rider_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
    pub angular_velocity: f32,
    pub terrain_angle: f32,
    pub airborne: bool,
    pub descending: bool,
    pub hold_active: bool,
    pub pedaling: bool,
    pub charge: f32,
    pub charge_ratio: f32,
    pub score: f32,
    pub combo: u32,
    pub pending_combo: f32,
    pub suspension: f32,
    pub crashed: bool,
    pub crash_flash: f32,
    pub respawn_timer: f32,
    pub superman: bool,
    pub checkpoint: Option<usize>,
    pub progress: f32,
    pub run_time: f32,
    pub display_speed: f32,
    pub camera: CameraRig,
    pub status: RiderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(vx: f32, airborne: bool) -> CameraInput {
        CameraInput {
            world_x: 100.0,
            rider_y: 400.0,
            vx,
            vy: if airborne { -10.0 } else { 0.0 },
            airborne,
            crashed: false,
            level_length: 760.0,
        }
    }

    #[test]
    fn camera_converges_on_look_ahead_target() {
        let mut rig = CameraRig::default();
        rig.snap_to(100.0, 400.0);

        for _ in 0..600 {
            rig.update(&input(5.0, false), 1.0 / 60.0);
        }

        assert!((rig.x - (100.0 + 34.0 + 5.0 * 3.8)).abs() < 1.0e-2);
        assert!((rig.y - 400.0).abs() < 1.0e-2);
        assert!((rig.zoom - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn airborne_camera_lifts_and_zooms_out() {
        let mut rig = CameraRig::default();
        rig.snap_to(100.0, 400.0);

        for _ in 0..600 {
            rig.update(&input(12.0, true), 1.0 / 60.0);
        }

        let lift = -36.0 - (10.0_f32 * 2.8).min(40.0);
        assert!((rig.y - (400.0 + lift)).abs() < 1.0e-2);
        let zoom = 1.0 - ((12.0 - 7.0) * 0.02_f32).min(0.14) - 0.06;
        assert!((rig.zoom - zoom).abs() < 1.0e-3);
    }

    #[test]
    fn look_ahead_is_capped_at_level_end() {
        let mut rig = CameraRig::default();
        let near_end = CameraInput {
            world_x: 750.0,
            ..input(18.0, false)
        };

        rig.update(&near_end, 1.0);

        assert_eq!(rig.x, 760.0);
    }

    #[test]
    fn run_timer_waits_for_motion() {
        let mut timer = RunTimer::default();

        timer.tick(1.0, 10.0, 0.5);
        timer.tick(4.0, 1.0, 0.5);
        assert!(!timer.started);

        timer.tick(4.0, 5.0, 0.5);
        assert!(timer.started);
        assert_eq!(timer.elapsed, 0.5);

        timer.finish();
        timer.tick(4.0, 50.0, 0.5);
        assert_eq!(timer.elapsed, 0.5);
    }

    #[test]
    fn status_serializes_as_its_display_label() {
        let labels = [
            (RiderStatus::Ready, "Ready"),
            (RiderStatus::Respawning, "Respawning"),
            (RiderStatus::AirAscend, "Air / Ascend"),
            (RiderStatus::AirDescend, "Air / Descend"),
            (RiderStatus::Pedaling, "Pedaling"),
            (RiderStatus::Coasting, "Coasting"),
            (RiderStatus::Finished, "Finished"),
        ];

        for (status, label) in labels {
            let value = serde_json::to_value(status).expect("status should serialize");
            assert_eq!(value, serde_json::Value::String(label.to_string()));
        }
    }

    #[test]
    fn display_speed_eases_toward_vx() {
        let mut telemetry = RideTelemetry::default();

        telemetry.update(&input(10.0, false), 1.0 / 60.0);

        assert!((telemetry.display_speed - 1.8).abs() < 1.0e-5);
    }
}
