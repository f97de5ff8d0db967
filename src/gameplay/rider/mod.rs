mod charge;
mod landing;
mod physics;
mod simulation;
mod state;

pub use landing::{LandingQuality, LandingReport};
pub use physics::CrashCause;
pub use simulation::{InputEdge, RiderSimulation, RunOutcome, RunResult, SimEvent};

use crate::config::GameConfig;
use crate::gameplay::checkpoints::Checkpoint;
use crate::gameplay::scoring::LandingAward;
use crate::gameplay::telemetry::RiderSnapshot;
use crate::gameplay::terrain::TerrainField;
use crate::states::GameState;
use bevy::prelude::*;
use std::sync::Arc;

pub struct RiderGameplayPlugin;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiderSystems {
    Input,
    Step,
    Publish,
}

impl Plugin for RiderGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RiderInputBindings>()
            .init_resource::<RiderTelemetry>()
            .add_message::<RiderSimEvent>()
            .add_message::<RiderLandingEvent>()
            .add_message::<RiderCrashEvent>()
            .add_message::<CheckpointReachedEvent>()
            .add_message::<RunFinishedEvent>()
            .configure_sets(
                Update,
                (RiderSystems::Input, RiderSystems::Step, RiderSystems::Publish).chain(),
            )
            .add_systems(
                OnEnter(GameState::InRun),
                start_rider_run.run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                (
                    read_rider_input.in_set(RiderSystems::Input),
                    step_rider_simulation.in_set(RiderSystems::Step),
                    publish_rider_telemetry.in_set(RiderSystems::Publish),
                )
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>)
                    .run_if(resource_exists::<RiderSimulation>),
            )
            .add_systems(
                Update,
                sync_simulation_with_config
                    .before(RiderSystems::Input)
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Resource, Debug, Clone)]
pub struct RiderInputBindings {
    pub keys: Vec<KeyCode>,
    pub mouse_buttons: Vec<MouseButton>,
}

impl Default for RiderInputBindings {
    fn default() -> Self {
        Self {
            keys: vec![KeyCode::Space, KeyCode::ArrowUp],
            mouse_buttons: vec![MouseButton::Left],
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct RiderTelemetry {
    pub snapshot: Option<RiderSnapshot>,
}

#[derive(Message, Debug, Clone)]
pub struct RiderSimEvent(pub SimEvent);

#[derive(Message, Debug, Clone, Copy)]
pub struct RiderLandingEvent {
    pub report: LandingReport,
    pub award: LandingAward,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct RiderCrashEvent {
    pub cause: CrashCause,
    pub world_x: f32,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct CheckpointReachedEvent {
    pub checkpoint: Checkpoint,
}

#[derive(Message, Debug, Clone, Copy)]
pub struct RunFinishedEvent {
    pub result: RunResult,
}

fn start_rider_run(
    mut commands: Commands,
    config: Res<GameConfig>,
    simulation: Option<ResMut<RiderSimulation>>,
) {
    let Some(sim_config) = config.default_simulation_config() else {
        error!(
            "Cannot start run: mode `{}` is not configured.",
            config.game.app.default_mode
        );
        return;
    };

    let checkpoints = match simulation {
        Some(mut simulation) => {
            if !simulation.terrain().matches_shape(&config.terrain.terrain) {
                simulation.replace_terrain(generate_terrain(&config));
            }
            simulation.apply_config(sim_config);
            simulation.reset_run();
            simulation.checkpoints().checkpoints().len()
        }
        None => {
            let mut simulation = RiderSimulation::new(sim_config, generate_terrain(&config));
            simulation.reset_run();
            let count = simulation.checkpoints().checkpoints().len();
            commands.insert_resource(simulation);
            count
        }
    };

    info!(
        "Run started in `{}` mode with {checkpoints} checkpoints.",
        config.game.app.default_mode
    );
}

fn generate_terrain(config: &GameConfig) -> Arc<TerrainField> {
    let terrain = TerrainField::generate(&config.terrain.terrain);
    info!(
        "Generated {:?} terrain: seed {}, length {}, {} segments.",
        terrain.config().generator,
        terrain.config().seed,
        terrain.level_length(),
        terrain.segments().len()
    );
    Arc::new(terrain)
}

// Merges every binding into one hold, so releasing one binding while another
// is still down does not end the press.
#[derive(Debug, Default)]
struct HoldLatch {
    held: bool,
}

impl HoldLatch {
    fn update(&mut self, held: bool, tapped: bool) -> [Option<InputEdge>; 2] {
        let start = (!self.held && (held || tapped)).then_some(InputEdge::PressStart);
        let end = ((self.held || tapped) && !held).then_some(InputEdge::PressEnd);
        self.held = held;
        [start, end]
    }
}

fn read_rider_input(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    bindings: Res<RiderInputBindings>,
    mut latch: Local<HoldLatch>,
    mut simulation: ResMut<RiderSimulation>,
) {
    let mut held = false;
    let mut tapped = false;

    if let Some(keyboard) = keyboard {
        held |= keyboard.any_pressed(bindings.keys.iter().copied());
        tapped |= keyboard.any_just_pressed(bindings.keys.iter().copied());
    }
    if let Some(mouse) = mouse {
        held |= mouse.any_pressed(bindings.mouse_buttons.iter().copied());
        tapped |= mouse.any_just_pressed(bindings.mouse_buttons.iter().copied());
    }

    for edge in latch.update(held, tapped).into_iter().flatten() {
        match edge {
            InputEdge::PressStart => simulation.press_start(),
            InputEdge::PressEnd => simulation.press_end(),
        }
    }
}

fn step_rider_simulation(
    time: Res<Time>,
    config: Res<GameConfig>,
    mut simulation: ResMut<RiderSimulation>,
    mut sim_events: MessageWriter<RiderSimEvent>,
    mut landing_events: MessageWriter<RiderLandingEvent>,
    mut crash_events: MessageWriter<RiderCrashEvent>,
    mut checkpoint_events: MessageWriter<CheckpointReachedEvent>,
    mut finished_events: MessageWriter<RunFinishedEvent>,
) {
    let dt = time.delta_secs().min(config.game.app.max_step_seconds);
    if dt <= 0.0 {
        return;
    }

    for event in simulation.step(dt) {
        match &event {
            SimEvent::Landed { report, award } => {
                landing_events.write(RiderLandingEvent {
                    report: *report,
                    award: *award,
                });
            }
            SimEvent::Crashed { cause, x } => {
                crash_events.write(RiderCrashEvent {
                    cause: *cause,
                    world_x: *x,
                });
            }
            SimEvent::CheckpointReached(checkpoint) => {
                checkpoint_events.write(CheckpointReachedEvent {
                    checkpoint: *checkpoint,
                });
            }
            SimEvent::RunFinished(result) => {
                finished_events.write(RunFinishedEvent { result: *result });
            }
            _ => {}
        }
        sim_events.write(RiderSimEvent(event));
    }
}

fn publish_rider_telemetry(
    simulation: Res<RiderSimulation>,
    mut telemetry: ResMut<RiderTelemetry>,
) {
    telemetry.snapshot = Some(simulation.snapshot());
}

fn sync_simulation_with_config(
    config: Res<GameConfig>,
    simulation: Option<ResMut<RiderSimulation>>,
) {
    if !config.is_changed() || config.is_added() {
        return;
    }
    let Some(mut simulation) = simulation else {
        return;
    };

    if !simulation.terrain().matches_shape(&config.terrain.terrain) {
        info!("Terrain options changed; regenerating terrain and restarting the run.");
        simulation.replace_terrain(generate_terrain(&config));
    }

    match config.default_simulation_config() {
        Some(sim_config) => simulation.apply_config(sim_config),
        None => warn!(
            "Mode `{}` is missing after reload; keeping previous tuning.",
            config.game.app.default_mode
        ),
    }
}
