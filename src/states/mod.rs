use crate::config::GameConfig;
use crate::gameplay::rider::{
    CheckpointReachedEvent, CrashCause, LandingQuality, RiderCrashEvent, RiderLandingEvent,
    RiderSimEvent, RiderSimulation, RiderSystems, RunFinishedEvent, RunOutcome, SimEvent,
};
use crate::gameplay::scoring::LandingAward;
use bevy::app::AppExit;
use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    InRun,
    Results,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RunSummary>()
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(
                Update,
                boot_to_in_run
                    .run_if(in_state(GameState::Boot))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::InRun), enter_in_run)
            .add_systems(
                Update,
                (
                    in_run_controls.before(RiderSystems::Input),
                    (
                        update_run_summary_counters,
                        finish_run_on_event,
                    )
                        .chain()
                        .after(RiderSystems::Step),
                )
                    .run_if(in_state(GameState::InRun)),
            )
            .add_systems(OnEnter(GameState::Results), enter_results)
            .add_systems(
                Update,
                results_controls.run_if(in_state(GameState::Results)),
            );
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct RunSummary {
    pub outcome: Option<RunOutcome>,
    pub score: f32,
    pub run_time: f32,
    pub checkpoint: Option<usize>,
    pub landings: u32,
    pub perfect_landings: u32,
    pub flips: u32,
    pub best_combo: u32,
    pub jump_bonus: f32,
    pub crashes: u32,
    pub last_crash: Option<(CrashCause, f32)>,
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_in_run(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::InRun);
}

fn enter_in_run(mut run_summary: ResMut<RunSummary>) {
    *run_summary = RunSummary::default();
    info!("Entered state: InRun");
}

fn update_run_summary_counters(
    mut landing_events: MessageReader<RiderLandingEvent>,
    mut crash_events: MessageReader<RiderCrashEvent>,
    mut checkpoint_events: MessageReader<CheckpointReachedEvent>,
    mut sim_events: MessageReader<RiderSimEvent>,
    mut run_summary: ResMut<RunSummary>,
) {
    for event in landing_events.read() {
        run_summary.landings = run_summary.landings.saturating_add(1);
        run_summary.flips = run_summary.flips.saturating_add(event.report.flips);
        if event.report.quality == LandingQuality::Perfect {
            run_summary.perfect_landings = run_summary.perfect_landings.saturating_add(1);
        }
        run_summary.jump_bonus += match event.award {
            LandingAward::Paid(bonus) | LandingAward::Banked { bonus, .. } => bonus,
            LandingAward::None => 0.0,
        };
    }

    for event in crash_events.read() {
        run_summary.crashes = run_summary.crashes.saturating_add(1);
        run_summary.last_crash = Some((event.cause, event.world_x));
    }

    for event in checkpoint_events.read() {
        run_summary.checkpoint = Some(event.checkpoint.index);
    }

    for RiderSimEvent(event) in sim_events.read() {
        if let SimEvent::ComboPaid(payout) = event {
            run_summary.best_combo = run_summary.best_combo.max(payout.combo);
        }
    }
}

fn finish_run_on_event(
    mut finished_events: MessageReader<RunFinishedEvent>,
    mut run_summary: ResMut<RunSummary>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let Some(event) = finished_events.read().last() else {
        return;
    };

    run_summary.outcome = Some(event.result.outcome);
    run_summary.score = event.result.score;
    run_summary.run_time = event.result.run_time;
    run_summary.checkpoint = event.result.checkpoint;
    next_state.set(GameState::Results);
}

fn in_run_controls(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    simulation: Option<ResMut<RiderSimulation>>,
    mut finished_events: MessageWriter<RunFinishedEvent>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    if !keyboard.just_pressed(KeyCode::KeyR) {
        return;
    }
    let Some(mut simulation) = simulation else {
        return;
    };

    if let Some(result) = simulation.end_run(RunOutcome::Abandoned) {
        info!("Run abandoned at score {:.0}.", result.score);
        finished_events.write(RunFinishedEvent { result });
    }
}

fn enter_results(run_summary: Res<RunSummary>) {
    info!("Entered state: Results");

    let outcome = match run_summary.outcome {
        Some(RunOutcome::Completed) => "completed",
        Some(RunOutcome::Abandoned) => "abandoned",
        None => "ended",
    };
    let checkpoint = run_summary
        .checkpoint
        .map_or_else(|| "none".to_string(), |index| (index + 1).to_string());
    info!(
        "Run {outcome}: score {score:.0}, time {time:.2}s, checkpoint {checkpoint}, \
landings {landings} ({perfect} perfect), flips {flips}, best combo x{combo}, crashes {crashes}.",
        score = run_summary.score,
        time = run_summary.run_time,
        landings = run_summary.landings,
        perfect = run_summary.perfect_landings,
        flips = run_summary.flips,
        combo = run_summary.best_combo,
        crashes = run_summary.crashes,
    );
    info!("Jump bonus earned: {:.0}.", run_summary.jump_bonus);
    if let Some((cause, world_x)) = run_summary.last_crash {
        info!("Last crash: {} at x={world_x:.1}.", cause.label());
    }
}

fn results_controls(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };

    if keyboard.just_pressed(KeyCode::Space) {
        next_state.set(GameState::Boot);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
    }
}
