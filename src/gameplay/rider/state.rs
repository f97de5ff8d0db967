use super::charge::ChargeState;
use crate::config::SimulationConfig;
use crate::gameplay::terrain::TerrainField;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpTracker {
    pub launch_x: f32,
    pub launch_y: f32,
    pub launch_ground_y: f32,
    pub launch_slope: f32,
    pub air_time: f32,
    // Smallest `rider_y` seen in flight; y grows downward.
    pub apex_y: f32,
    pub highest_ground_y: f32,
    pub previous_angle: f32,
    pub rotation_accum: f32,
    pub flips: u32,
    pub hold_time: f32,
    pub superman_active: bool,
    pub superman_used: bool,
}

impl JumpTracker {
    pub fn launch(state: &RiderState, terrain: &TerrainField) -> Self {
        let ground_y = terrain.height(state.world_x);
        Self {
            launch_x: state.world_x,
            launch_y: state.rider_y,
            launch_ground_y: ground_y,
            launch_slope: terrain.slope(state.world_x),
            air_time: 0.0,
            apex_y: state.rider_y,
            highest_ground_y: ground_y,
            previous_angle: state.angle,
            rotation_accum: 0.0,
            flips: 0,
            hold_time: 0.0,
            superman_active: false,
            superman_used: false,
        }
    }

    pub fn peak_height(&self) -> f32 {
        (self.launch_y - self.apex_y).max(0.0)
    }

    pub fn is_trick(&self) -> bool {
        self.flips > 0 || self.superman_used
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiderMode {
    Grounded,
    Airborne(JumpTracker),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SuspensionState {
    pub offset: f32,
    pub velocity: f32,
}

impl SuspensionState {
    pub fn step(&mut self, stiffness: f32, damping: f32, dt: f32) {
        self.velocity += (-self.offset * stiffness - self.velocity * damping) * dt;
        self.offset += self.velocity * dt;
    }

    pub fn kick(&mut self, impulse: f32) {
        self.velocity -= impulse;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiderState {
    pub world_x: f32,
    pub rider_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
    pub angular_velocity: f32,
    pub terrain_angle: f32,
    pub mode: RiderMode,
    pub hold_active: bool,
    pub descending: bool,
    pub charge: ChargeState,
    pub suspension: SuspensionState,
    pub tip_timer: f32,
}

impl RiderState {
    pub fn grounded_at(
        world_x: f32,
        vx: f32,
        terrain: &TerrainField,
        config: &SimulationConfig,
    ) -> Self {
        let terrain_angle = terrain.angle(world_x);
        Self {
            world_x,
            rider_y: terrain.height(world_x) - config.body.ground_offset(),
            vx,
            vy: 0.0,
            angle: terrain_angle,
            angular_velocity: 0.0,
            terrain_angle,
            mode: RiderMode::Grounded,
            hold_active: false,
            descending: false,
            charge: ChargeState::default(),
            suspension: SuspensionState::default(),
            tip_timer: 0.0,
        }
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self.mode, RiderMode::Airborne(_))
    }

    pub fn jump(&self) -> Option<&JumpTracker> {
        match &self.mode {
            RiderMode::Airborne(tracker) => Some(tracker),
            RiderMode::Grounded => None,
        }
    }

    pub fn release_input(&mut self) {
        self.hold_active = false;
        self.charge.reset();
    }
}
