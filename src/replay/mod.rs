use crate::config::{GameConfig, ReplayEdgeConfig, ReplayEdgeKind};
use crate::gameplay::rider::{
    InputEdge, RiderSimEvent, RiderSimulation, RiderSystems, RiderTelemetry, RunFinishedEvent,
    RunOutcome, RunResult, SimEvent,
};
use crate::gameplay::telemetry::RiderSnapshot;
use crate::states::GameState;
use bevy::app::AppExit;
use bevy::prelude::*;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ReplayPlugin;

impl Plugin for ReplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReplayRecorder>()
            .add_systems(OnEnter(GameState::InRun), reset_replay_recorder)
            .add_systems(
                Update,
                (
                    feed_replay_edges.in_set(RiderSystems::Input),
                    record_replay_step.after(RiderSystems::Publish),
                )
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<RiderSimulation>)
                    .run_if(replay_enabled),
            )
            .add_systems(
                OnEnter(GameState::Results),
                write_replay_trace.run_if(replay_enabled),
            );
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ReplayRecorder {
    cursor: usize,
    frames: Vec<RiderSnapshot>,
    events: Vec<SimEvent>,
    result: Option<RunResult>,
}

impl ReplayRecorder {
    // Expects `edges` in time order; config validation enforces it.
    pub fn due_edges<'a>(
        &mut self,
        edges: &'a [ReplayEdgeConfig],
        clock: f32,
    ) -> impl Iterator<Item = InputEdge> + 'a {
        let pending = &edges[self.cursor.min(edges.len())..];
        let due = pending
            .iter()
            .take_while(|edge| edge.at_seconds <= clock)
            .count();
        self.cursor += due;
        pending[..due].iter().map(|edge| match edge.edge {
            ReplayEdgeKind::Press => InputEdge::PressStart,
            ReplayEdgeKind::Release => InputEdge::PressEnd,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayTrace {
    pub mode: String,
    pub seed: u32,
    pub level_length: f32,
    pub result: Option<RunResult>,
    pub events: Vec<SimEvent>,
    pub frames: Vec<RiderSnapshot>,
}

#[derive(Debug)]
pub enum TraceError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to write trace `{}`: {source}", path.display())
            }
            Self::Serialize(source) => write!(f, "failed to serialize trace: {source}"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(source) => Some(source),
        }
    }
}

pub fn write_trace(path: &Path, trace: &ReplayTrace) -> Result<(), TraceError> {
    let json = serde_json::to_string_pretty(trace).map_err(TraceError::Serialize)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| TraceError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, json).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn replay_enabled(config: Option<Res<GameConfig>>) -> bool {
    config.is_some_and(|config| config.replay.replay.enabled)
}

fn reset_replay_recorder(mut recorder: ResMut<ReplayRecorder>) {
    *recorder = ReplayRecorder::default();
}

fn feed_replay_edges(
    config: Res<GameConfig>,
    mut recorder: ResMut<ReplayRecorder>,
    mut simulation: ResMut<RiderSimulation>,
) {
    let clock = simulation.clock();
    for edge in recorder.due_edges(&config.replay.replay.edges, clock) {
        simulation.push_input(edge);
    }
}

fn record_replay_step(
    config: Res<GameConfig>,
    telemetry: Res<RiderTelemetry>,
    mut sim_events: MessageReader<RiderSimEvent>,
    mut recorder: ResMut<ReplayRecorder>,
    mut simulation: ResMut<RiderSimulation>,
    mut finished_events: MessageWriter<RunFinishedEvent>,
) {
    for RiderSimEvent(event) in sim_events.read() {
        if let SimEvent::RunFinished(result) = event {
            recorder.result = Some(*result);
        }
        recorder.events.push(event.clone());
    }

    if let Some(snapshot) = &telemetry.snapshot {
        if recorder.frames.last() != Some(snapshot) {
            recorder.frames.push(snapshot.clone());
        }
    }

    let max_seconds = config.replay.replay.max_seconds;
    if simulation.clock() < max_seconds {
        return;
    }
    if let Some(result) = simulation.end_run(RunOutcome::Abandoned) {
        warn!("Replay hit its {max_seconds:.1}s limit; abandoning run.");
        recorder.result = Some(result);
        recorder.events.push(SimEvent::RunFinished(result));
        finished_events.write(RunFinishedEvent { result });
    }
}

fn write_replay_trace(
    config: Res<GameConfig>,
    recorder: Res<ReplayRecorder>,
    simulation: Option<Res<RiderSimulation>>,
    mut exit: MessageWriter<AppExit>,
) {
    let replay = &config.replay.replay;
    let (seed, level_length) = simulation
        .as_ref()
        .map(|simulation| {
            let terrain = simulation.terrain();
            (terrain.config().seed, terrain.level_length())
        })
        .unwrap_or((config.terrain.terrain.seed, config.terrain.terrain.level_length));

    let trace = ReplayTrace {
        mode: config.game.app.default_mode.clone(),
        seed,
        level_length,
        result: recorder.result,
        events: recorder.events.clone(),
        frames: recorder.frames.clone(),
    };

    match write_trace(Path::new(&replay.trace_path), &trace) {
        Ok(()) => info!(
            "Wrote replay trace with {} frames to {}.",
            trace.frames.len(),
            replay.trace_path
        ),
        Err(err) => error!("{err}"),
    }

    if replay.exit_on_finish {
        exit.write(AppExit::Success);
    }
}
