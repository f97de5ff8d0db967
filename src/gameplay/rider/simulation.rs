use super::landing::{build_report, classify, LandingReport, Touchdown};
use super::physics::{normalize_angle, step_airborne, step_grounded, CrashCause};
use super::state::{JumpTracker, RiderMode, RiderState};
use crate::config::SimulationConfig;
use crate::gameplay::checkpoints::{Checkpoint, CheckpointTrack};
use crate::gameplay::scoring::{ComboPayout, LandingAward, ScoreKeeper};
use crate::gameplay::telemetry::{CameraInput, RideTelemetry, RiderSnapshot, RiderStatus};
use crate::gameplay::terrain::TerrainField;
use bevy::prelude::*;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

const LANDING_CHARGE_STEP: f32 = 0.016;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputEdge {
    PressStart,
    PressEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunPhase {
    Ready,
    Riding,
    Crashed { respawn_timer: f32 },
    Finished(RunOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub score: f32,
    pub run_time: f32,
    pub checkpoint: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    Jumped { impulse: f32, charge_ratio: f32 },
    FlipImpulse { angular_velocity: f32 },
    Landed { report: LandingReport, award: LandingAward },
    Crashed { cause: CrashCause, x: f32 },
    Respawned { x: f32, checkpoint: Option<usize> },
    CheckpointReached(Checkpoint),
    ComboPaid(ComboPayout),
    RunFinished(RunResult),
}

#[derive(Resource, Debug, Clone)]
pub struct RiderSimulation {
    config: SimulationConfig,
    terrain: Arc<TerrainField>,
    state: RiderState,
    phase: RunPhase,
    checkpoints: CheckpointTrack,
    score: ScoreKeeper,
    telemetry: RideTelemetry,
    input: VecDeque<InputEdge>,
    crash_flash: f32,
    clock: f32,
}

impl RiderSimulation {
    pub fn new(mut config: SimulationConfig, terrain: Arc<TerrainField>) -> Self {
        log_corrections(config.sanitize());
        let state = start_state(&terrain, &config);
        let checkpoints = CheckpointTrack::build(&terrain, &config);
        let mut telemetry = RideTelemetry::default();
        telemetry.camera.snap_to(state.world_x, state.rider_y);

        Self {
            config,
            terrain,
            state,
            phase: RunPhase::Ready,
            checkpoints,
            score: ScoreKeeper::default(),
            telemetry,
            input: VecDeque::new(),
            crash_flash: 0.0,
            clock: 0.0,
        }
    }

    pub fn terrain(&self) -> &Arc<TerrainField> {
        &self.terrain
    }

    pub fn checkpoints(&self) -> &CheckpointTrack {
        &self.checkpoints
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, RunPhase::Riding | RunPhase::Crashed { .. })
    }

    pub fn reset_run(&mut self) {
        self.state = start_state(&self.terrain, &self.config);
        self.checkpoints.reset(&self.terrain, &self.config);
        self.score = ScoreKeeper::default();
        self.telemetry = RideTelemetry::default();
        self.telemetry
            .camera
            .snap_to(self.state.world_x, self.state.rider_y);
        self.input.clear();
        self.crash_flash = 0.0;
        self.clock = 0.0;
        self.phase = RunPhase::Riding;
    }

    // Only the first call on an active run produces a result.
    pub fn end_run(&mut self, outcome: RunOutcome) -> Option<RunResult> {
        self.state.release_input();
        self.input.clear();
        if !self.is_active() {
            return None;
        }

        match outcome {
            RunOutcome::Completed => {
                self.telemetry.timer.finish();
                self.score.pay_out();
            }
            RunOutcome::Abandoned => self.score.clear_combo(),
        }
        self.phase = RunPhase::Finished(outcome);

        Some(RunResult {
            outcome,
            score: self.score.score,
            run_time: self.telemetry.timer.elapsed,
            checkpoint: self.checkpoints.reached(),
        })
    }

    pub fn push_input(&mut self, edge: InputEdge) {
        self.input.push_back(edge);
    }

    pub fn press_start(&mut self) {
        self.push_input(InputEdge::PressStart);
    }

    pub fn press_end(&mut self) {
        self.push_input(InputEdge::PressEnd);
    }

    pub fn apply_config(&mut self, mut config: SimulationConfig) {
        log_corrections(config.sanitize());
        self.config = config;

        let reached = self.checkpoints.reached();
        let respawn = self.checkpoints.respawn();
        self.checkpoints = CheckpointTrack::build(&self.terrain, &self.config);
        if reached.is_some() {
            while self
                .checkpoints
                .update(respawn.x, respawn.speed, self.config.physics.min_speed)
                .is_some()
            {}
        }
    }

    pub fn replace_terrain(&mut self, terrain: Arc<TerrainField>) {
        self.terrain = terrain;
        self.checkpoints = CheckpointTrack::build(&self.terrain, &self.config);
        if self.is_active() {
            self.reset_run();
        } else {
            self.state = start_state(&self.terrain, &self.config);
        }
    }

    pub fn step(&mut self, dt: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if !(dt.is_finite() && dt > 0.0) {
            return events;
        }
        if !self.is_active() {
            self.input.clear();
            return events;
        }

        self.clock += dt;
        self.crash_flash = (self.crash_flash - dt).max(0.0);

        if let RunPhase::Crashed { respawn_timer } = self.phase {
            self.input.clear();
            self.update_telemetry(dt);
            let remaining = respawn_timer - dt;
            if remaining <= 0.0 {
                self.respawn(&mut events);
            } else {
                self.phase = RunPhase::Crashed {
                    respawn_timer: remaining,
                };
            }
            return events;
        }

        self.drain_input(&mut events);
        self.telemetry
            .timer
            .tick(self.state.vx, self.state.world_x, dt);

        match self.state.mode {
            RiderMode::Grounded => {
                if let Some(cause) = step_grounded(&mut self.state, &self.terrain, &self.config, dt)
                {
                    self.crash(cause, &mut events);
                }
            }
            RiderMode::Airborne(_) => {
                if step_airborne(&mut self.state, &self.terrain, &self.config, dt) {
                    self.resolve_landing(&mut events);
                }
            }
        }

        let level_length = self.terrain.level_length();
        if self.state.world_x >= level_length {
            self.state.world_x = level_length;
            if let Some(payout) = self.score.pay_out() {
                events.push(SimEvent::ComboPaid(payout));
            }
            if let Some(result) = self.end_run(RunOutcome::Completed) {
                info!(
                    "Run completed: score {:.0} in {:.2}s.",
                    result.score, result.run_time
                );
                events.push(SimEvent::RunFinished(result));
            }
            return events;
        }

        if let Some(checkpoint) = self.checkpoints.update(
            self.state.world_x,
            self.state.vx,
            self.config.physics.min_speed,
        ) {
            info!(
                "Checkpoint {} reached at x={:.1}.",
                checkpoint.index + 1,
                checkpoint.x
            );
            events.push(SimEvent::CheckpointReached(checkpoint));
        }

        let physics = &self.config.physics;
        self.state
            .suspension
            .step(physics.suspension_stiffness, physics.suspension_damping, dt);
        self.score.accrue_passive(
            &self.config.scoring,
            self.state.vx,
            dt,
            self.state.is_airborne(),
        );
        if let Some(payout) = self.score.tick(dt) {
            info!("Combo x{} paid {:.0}.", payout.combo, payout.amount);
            events.push(SimEvent::ComboPaid(payout));
        }
        self.update_telemetry(dt);

        events
    }

    pub fn snapshot(&self) -> RiderSnapshot {
        let state = &self.state;
        let respawn_timer = match self.phase {
            RunPhase::Crashed { respawn_timer } => respawn_timer,
            _ => 0.0,
        };

        RiderSnapshot {
            clock: self.clock,
            world_x: state.world_x,
            rider_y: state.rider_y,
            vx: state.vx,
            vy: state.vy,
            angle: state.angle,
            angular_velocity: state.angular_velocity,
            terrain_angle: state.terrain_angle,
            airborne: state.is_airborne(),
            descending: state.descending,
            hold_active: state.hold_active,
            pedaling: state.charge.pedaling,
            charge: state.charge.charge,
            charge_ratio: state.charge.ratio,
            score: self.score.score,
            combo: self.score.combo,
            pending_combo: self.score.pending,
            suspension: state.suspension.offset,
            crashed: matches!(self.phase, RunPhase::Crashed { .. }),
            crash_flash: self.crash_flash,
            respawn_timer,
            superman: state.jump().is_some_and(|jump| jump.superman_active),
            checkpoint: self.checkpoints.reached(),
            progress: (state.world_x / self.terrain.level_length()).clamp(0.0, 1.0),
            run_time: self.telemetry.timer.elapsed,
            display_speed: self.telemetry.display_speed,
            camera: self.telemetry.camera,
            status: self.status(),
        }
    }

    fn status(&self) -> RiderStatus {
        match self.phase {
            RunPhase::Ready => RiderStatus::Ready,
            RunPhase::Finished(_) => RiderStatus::Finished,
            RunPhase::Crashed { .. } => RiderStatus::Respawning,
            RunPhase::Riding => match self.state.mode {
                RiderMode::Airborne(_) if self.state.descending => RiderStatus::AirDescend,
                RiderMode::Airborne(_) => RiderStatus::AirAscend,
                RiderMode::Grounded if self.state.charge.pedaling => RiderStatus::Pedaling,
                RiderMode::Grounded => RiderStatus::Coasting,
            },
        }
    }

    fn drain_input(&mut self, events: &mut Vec<SimEvent>) {
        while let Some(edge) = self.input.pop_front() {
            match edge {
                InputEdge::PressStart => self.on_press_start(events),
                InputEdge::PressEnd => self.on_press_end(events),
            }
        }
    }

    fn on_press_start(&mut self, events: &mut Vec<SimEvent>) {
        if self.state.hold_active {
            return;
        }
        self.state.hold_active = true;

        if let RiderMode::Airborne(jump) = &mut self.state.mode {
            jump.hold_time = 0.0;
            if !self.state.descending && self.config.mode.flip_on_ascent_press {
                self.state.angular_velocity += self.config.physics.flip_impulse;
                events.push(SimEvent::FlipImpulse {
                    angular_velocity: self.state.angular_velocity,
                });
            }
        }
    }

    fn on_press_end(&mut self, events: &mut Vec<SimEvent>) {
        if !self.state.hold_active {
            return;
        }
        self.state.hold_active = false;

        if self.state.is_airborne() {
            self.state.charge.pedaling = false;
            return;
        }
        self.try_jump(events);
    }

    fn try_jump(&mut self, events: &mut Vec<SimEvent>) {
        let physics = &self.config.physics;
        let ratio = self.state.charge.ratio;
        if ratio <= physics.min_jump_charge_ratio {
            self.state.charge.reset();
            return;
        }

        let impulse = (physics.jump_base_impulse + physics.jump_charge_impulse * ratio)
            .min(physics.max_visible_jump_vy);
        let jump = JumpTracker::launch(&self.state, &self.terrain);

        self.state.mode = RiderMode::Airborne(jump);
        self.state.vy = -impulse;
        self.state.descending = false;
        self.state.tip_timer = 0.0;
        self.state.charge.reset();

        events.push(SimEvent::Jumped {
            impulse,
            charge_ratio: ratio,
        });
    }

    fn resolve_landing(&mut self, events: &mut Vec<SimEvent>) {
        let RiderMode::Airborne(jump) = self.state.mode else {
            return;
        };

        let x = self.state.world_x;
        let terrain_angle = self.terrain.angle(x);
        let pitch_delta = normalize_angle(self.state.angle - terrain_angle);
        let verdict = classify(pitch_delta, self.state.angular_velocity, &self.config.crash);

        if let Some(cause) = verdict.crash_cause() {
            self.crash(cause, events);
            return;
        }

        let physics = &self.config.physics;
        let state = &mut self.state;
        state.mode = RiderMode::Grounded;
        state.vy = 0.0;
        state.descending = false;
        state.terrain_angle = terrain_angle;
        state.rider_y = self.terrain.height(x) - self.config.body.ground_offset();
        state.tip_timer = 0.0;
        state.suspension.kick(physics.landing_suspension_impulse);
        if state.hold_active {
            state
                .charge
                .update(LANDING_CHARGE_STEP, true, true, physics);
        } else {
            state.charge.reset();
        }

        let touchdown = Touchdown {
            x,
            ground_y: self.terrain.height(x),
            slope: self.terrain.slope(x),
            pitch_delta,
        };
        let report = build_report(&jump, &touchdown, &self.config);
        let award = self
            .score
            .award_landing(&self.config.scoring, &self.config.mode, &report);

        info!(
            "Landed {:?}: {:.2}s air, {} flips, award {:?}.",
            report.quality, report.air_time, report.flips, award
        );
        events.push(SimEvent::Landed { report, award });
    }

    fn crash(&mut self, cause: CrashCause, events: &mut Vec<SimEvent>) {
        self.phase = RunPhase::Crashed {
            respawn_timer: self.config.crash.respawn_delay_seconds,
        };
        self.crash_flash = self.config.crash.crash_flash_seconds;

        let state = &mut self.state;
        state.mode = RiderMode::Grounded;
        state.hold_active = false;
        state.charge.pedaling = false;
        state.vy = 0.0;
        state.descending = false;
        self.input.clear();

        if let Some(payout) = self.score.on_crash(&self.config.scoring) {
            events.push(SimEvent::ComboPaid(payout));
        }

        info!("Rider crashed at x={:.1}: {}.", self.state.world_x, cause.label());
        events.push(SimEvent::Crashed {
            cause,
            x: self.state.world_x,
        });
    }

    fn respawn(&mut self, events: &mut Vec<SimEvent>) {
        let record = self.checkpoints.respawn();
        let physics = &self.config.physics;
        let mut suspension = self.state.suspension;
        suspension.kick(physics.respawn_suspension_impulse);

        self.state = RiderState {
            world_x: record.x,
            rider_y: record.y,
            vx: record.speed.clamp(physics.min_speed, physics.max_speed),
            vy: 0.0,
            angle: record.angle,
            angular_velocity: 0.0,
            terrain_angle: record.angle,
            mode: RiderMode::Grounded,
            hold_active: false,
            descending: false,
            charge: Default::default(),
            suspension,
            tip_timer: 0.0,
        };
        self.phase = RunPhase::Riding;

        let checkpoint = self.checkpoints.reached();
        info!("Respawned at x={:.1}.", record.x);
        events.push(SimEvent::Respawned {
            x: record.x,
            checkpoint,
        });
    }

    fn update_telemetry(&mut self, dt: f32) {
        let input = CameraInput {
            world_x: self.state.world_x,
            rider_y: self.state.rider_y,
            vx: self.state.vx,
            vy: self.state.vy,
            airborne: self.state.is_airborne(),
            crashed: matches!(self.phase, RunPhase::Crashed { .. }),
            level_length: self.terrain.level_length(),
        };
        self.telemetry.update(&input, dt);
    }
}

#[cfg(test)]
impl RiderSimulation {
    pub(crate) fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub(crate) fn state(&self) -> &RiderState {
        &self.state
    }

    pub(crate) fn phase(&self) -> RunPhase {
        self.phase
    }

    pub(crate) fn score(&self) -> &ScoreKeeper {
        &self.score
    }
}

fn start_state(terrain: &TerrainField, config: &SimulationConfig) -> RiderState {
    RiderState::grounded_at(0.0, config.physics.start_speed, terrain, config)
}

fn log_corrections(corrections: Vec<String>) {
    for correction in corrections {
        warn!("Simulation config corrected: {correction}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::gameplay::rider::physics::tests::{flat_terrain, sloped_terrain};

    const DT: f32 = 1.0 / 60.0;

    fn riding(terrain: TerrainField) -> RiderSimulation {
        let mut sim = RiderSimulation::new(SimulationConfig::default(), Arc::new(terrain));
        sim.reset_run();
        sim
    }

    fn lift_off(sim: &mut RiderSimulation, lift: f32, pitch_offset: f32, angular_velocity: f32) {
        sim.state.rider_y -= lift;
        sim.state.mode = RiderMode::Airborne(JumpTracker::launch(&sim.state, &sim.terrain));
        sim.state.angle = sim.state.terrain_angle + pitch_offset;
        sim.state.angular_velocity = angular_velocity;
        sim.state.vy = 0.0;
    }

    fn run_steps(sim: &mut RiderSimulation, steps: usize) -> Vec<SimEvent> {
        (0..steps).flat_map(|_| sim.step(DT)).collect()
    }

    #[test]
    fn full_charge_release_launches_with_combined_impulse() {
        let mut sim = riding(flat_terrain());
        let physics = sim.config().physics.clone();

        sim.press_start();
        run_steps(&mut sim, ((physics.charge_cap_seconds + 0.5) / DT) as usize);
        assert_eq!(sim.state().charge.charge, physics.charge_cap_seconds);
        assert!(sim.state().charge.ratio > 0.99);

        sim.press_end();
        let events = sim.step(DT);

        let impulse = events
            .iter()
            .find_map(|event| match event {
                SimEvent::Jumped { impulse, .. } => Some(*impulse),
                _ => None,
            })
            .expect("release should launch");
        let expected = physics.jump_base_impulse + physics.jump_charge_impulse;
        assert!((impulse - expected).abs() < 0.01, "impulse = {impulse}");
        assert!(sim.state().is_airborne());
        assert!(sim.state().vy < 0.0);
        assert_eq!(sim.state().charge.charge, 0.0);
    }

    #[test]
    fn tap_without_charge_does_not_jump() {
        let mut sim = riding(flat_terrain());

        sim.press_start();
        sim.press_end();
        let events = sim.step(DT);

        assert!(!events
            .iter()
            .any(|event| matches!(event, SimEvent::Jumped { .. })));
        assert!(!sim.state().is_airborne());
        assert_eq!(sim.state().charge.ratio, 0.0);
    }

    #[test]
    fn level_touchdown_is_safe() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 20.0, 0.0, 0.0);

        let events = run_steps(&mut sim, 120);

        assert!(events
            .iter()
            .any(|event| matches!(event, SimEvent::Landed { .. })));
        assert!(!sim.state().is_airborne());
        assert_eq!(sim.state().vy, 0.0);
        assert_eq!(sim.phase(), RunPhase::Riding);
    }

    #[test]
    fn tumbling_touchdown_crashes() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 0.0, 2.0, 10.0);

        let events = sim.step(DT);

        assert!(events.iter().any(|event| matches!(
            event,
            SimEvent::Crashed {
                cause: CrashCause::HardImpact,
                ..
            }
        )));
        assert!(matches!(sim.phase(), RunPhase::Crashed { .. }));
        assert!(!sim.state().hold_active);
        assert_eq!(sim.state().vy, 0.0);
    }

    #[test]
    fn wrapped_angle_does_not_cause_false_crash() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 0.0, 0.0, 0.0);
        sim.state.angle += 4.0 * std::f32::consts::TAU;

        let events = sim.step(DT);

        assert!(events
            .iter()
            .any(|event| matches!(event, SimEvent::Landed { .. })));
    }

    #[test]
    fn crash_respawns_at_record_after_delay() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 0.0, 2.0, 10.0);
        sim.step(DT);

        sim.press_start();
        let events = run_steps(&mut sim, 20);

        let respawned = events
            .iter()
            .any(|event| matches!(event, SimEvent::Respawned { .. }));
        assert!(respawned);
        assert_eq!(sim.phase(), RunPhase::Riding);
        assert!(!sim.state().hold_active, "edges during a crash are discarded");
        assert!(sim.state().world_x < 10.0);
    }

    #[test]
    fn respawn_restores_the_record_exactly() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 0.0, 2.0, 10.0);
        sim.step(DT);
        let record = sim.checkpoints().respawn();

        let steps = (sim.config().crash.respawn_delay_seconds / DT).ceil() as usize;
        let events = run_steps(&mut sim, steps);

        assert!(events
            .iter()
            .any(|event| matches!(event, SimEvent::Respawned { .. })));
        assert_eq!(sim.state().world_x, record.x);
        assert_eq!(sim.state().rider_y, record.y);
        assert_eq!(sim.state().angle, record.angle);
        assert_eq!(sim.state().vx, record.speed);
        assert_eq!(sim.state().angular_velocity, 0.0);
        assert_eq!(sim.state().charge.ratio, 0.0);
    }

    #[test]
    fn duplicate_press_fires_one_flip() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 60.0, 0.0, 0.0);
        sim.state.vy = -10.0;

        sim.press_start();
        sim.press_start();
        let events = sim.step(DT);

        let flips = events
            .iter()
            .filter(|event| matches!(event, SimEvent::FlipImpulse { .. }))
            .count();
        assert_eq!(flips, 1);
    }

    #[test]
    fn press_while_descending_does_not_flip() {
        let mut sim = riding(flat_terrain());
        lift_off(&mut sim, 60.0, 0.0, 0.0);
        sim.state.vy = 3.0;
        sim.state.descending = true;

        sim.press_start();
        let events = sim.step(DT);

        assert!(!events
            .iter()
            .any(|event| matches!(event, SimEvent::FlipImpulse { .. })));
    }

    #[test]
    fn end_run_is_idempotent_and_clears_input() {
        let mut sim = riding(flat_terrain());
        sim.press_start();
        run_steps(&mut sim, 30);
        sim.press_end();

        let first = sim.end_run(RunOutcome::Abandoned);
        let second = sim.end_run(RunOutcome::Abandoned);

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(!sim.state().hold_active);
        assert!(!sim.state().charge.pedaling);
        assert_eq!(sim.state().charge.charge, 0.0);
        assert_eq!(sim.phase(), RunPhase::Finished(RunOutcome::Abandoned));

        let before = sim.snapshot();
        assert!(sim.step(DT).is_empty());
        assert_eq!(sim.snapshot(), before);
    }

    #[test]
    fn reaching_level_end_completes_the_run() {
        let mut sim = riding(TerrainField::generate(&TerrainConfig {
            level_length: 60.0,
            ..flat_terrain().config().clone()
        }));

        let events = run_steps(&mut sim, 600);

        let result = events
            .iter()
            .find_map(|event| match event {
                SimEvent::RunFinished(result) => Some(*result),
                _ => None,
            })
            .expect("run should finish");
        assert_eq!(result.outcome, RunOutcome::Completed);
        assert_eq!(sim.state().world_x, 60.0);
        assert!(result.run_time > 0.0);
        assert_eq!(sim.phase(), RunPhase::Finished(RunOutcome::Completed));
    }

    #[test]
    fn score_never_decreases_while_riding() {
        let mut sim = riding(TerrainField::generate(&TerrainConfig::default()));
        let mut last = 0.0;

        for step in 0..1200 {
            match step % 90 {
                0 => sim.press_start(),
                50 => sim.press_end(),
                _ => {}
            }
            sim.step(DT);
            assert!(sim.score().score >= last);
            last = sim.score().score;
        }
    }

    #[test]
    fn grounded_speed_stays_in_bounds_for_scripted_input() {
        let mut sim = riding(TerrainField::generate(&TerrainConfig::default()));
        let physics = sim.config().physics.clone();

        for step in 0..2400 {
            match step % 75 {
                0 => sim.press_start(),
                40 => sim.press_end(),
                _ => {}
            }
            sim.step(DT);
            if sim.phase() == RunPhase::Riding && !sim.state().is_airborne() {
                let vx = sim.state().vx;
                assert!(vx >= physics.min_speed && vx <= physics.max_speed, "vx = {vx}");
            }
        }
    }

    #[test]
    fn identical_inputs_give_bit_identical_trajectories() {
        let terrain = Arc::new(TerrainField::generate(&TerrainConfig::default()));
        let mut a = RiderSimulation::new(SimulationConfig::default(), Arc::clone(&terrain));
        let mut b = RiderSimulation::new(SimulationConfig::default(), terrain);
        a.reset_run();
        b.reset_run();

        for step in 0..1800 {
            for sim in [&mut a, &mut b] {
                match step % 64 {
                    3 => sim.press_start(),
                    41 => sim.press_end(),
                    45 => sim.press_start(),
                    47 => sim.press_end(),
                    _ => {}
                }
            }
            let events_a = a.step(DT);
            let events_b = b.step(DT);
            assert_eq!(events_a, events_b);

            let (sa, sb) = (a.snapshot(), b.snapshot());
            assert_eq!(sa.world_x.to_bits(), sb.world_x.to_bits());
            assert_eq!(sa.rider_y.to_bits(), sb.rider_y.to_bits());
            assert_eq!(sa.angle.to_bits(), sb.angle.to_bits());
            assert_eq!(sa.score.to_bits(), sb.score.to_bits());
        }
    }

    #[test]
    fn crash_forfeits_banked_combo() {
        let mut sim = riding(flat_terrain());
        sim.score.combo = 2;
        sim.score.pending = 30.0;
        sim.score.combo_timer = 2.0;
        lift_off(&mut sim, 0.0, 2.0, 10.0);

        sim.step(DT);

        assert_eq!(sim.score().combo, 0);
        assert_eq!(sim.score().pending, 0.0);
    }

    #[test]
    fn uphill_crawl_never_stalls() {
        let mut sim = riding(sloped_terrain(-0.6));

        for _ in 0..240 {
            sim.step(DT);
            if sim.phase() == RunPhase::Riding {
                assert!(sim.state().vx >= sim.config().physics.min_speed);
            }
        }
        assert!(sim.state().world_x > 0.0);
    }

    #[test]
    fn replacing_terrain_restarts_an_active_run() {
        let mut sim = riding(flat_terrain());
        run_steps(&mut sim, 60);
        assert!(sim.state().world_x > 0.0);

        sim.replace_terrain(Arc::new(sloped_terrain(0.2)));

        assert_eq!(sim.state().world_x, 0.0);
        assert_eq!(sim.phase(), RunPhase::Riding);
        assert_eq!(sim.score().score, 0.0);
    }

    #[test]
    fn snapshot_status_tracks_phase_and_mode() {
        let mut sim = RiderSimulation::new(SimulationConfig::default(), Arc::new(flat_terrain()));
        assert_eq!(sim.snapshot().status, RiderStatus::Ready);

        sim.reset_run();
        sim.step(DT);
        assert_eq!(sim.snapshot().status, RiderStatus::Coasting);

        sim.press_start();
        sim.step(DT);
        assert_eq!(sim.snapshot().status, RiderStatus::Pedaling);

        lift_off(&mut sim, 60.0, 0.0, 0.0);
        sim.state.vy = -8.0;
        sim.step(DT);
        assert_eq!(sim.snapshot().status, RiderStatus::AirAscend);
    }

    fn jump_impulse(events: &[SimEvent]) -> Option<f32> {
        events.iter().find_map(|event| match event {
            SimEvent::Jumped { impulse, .. } => Some(*impulse),
            _ => None,
        })
    }

    #[test]
    fn one_and_a_half_second_hold_lands_just_under_full_impulse() {
        let mut sim = riding(flat_terrain());
        let physics = sim.config().physics.clone();
        let full = physics.jump_base_impulse + physics.jump_charge_impulse;

        sim.press_start();
        run_steps(&mut sim, 90);
        sim.press_end();
        let impulse = jump_impulse(&sim.step(DT)).expect("release should launch");

        // The smoothed ratio still trails the capped charge after exactly 1.5 s.
        assert!(impulse < full, "impulse = {impulse}");
        assert!((impulse - full).abs() < 0.25, "impulse = {impulse}");
    }

    #[test]
    fn completed_run_pays_out_the_pending_combo() {
        let mut sim = riding(flat_terrain());
        sim.score.score = 100.0;
        sim.score.combo = 2;
        sim.score.pending = 30.0;
        sim.score.combo_timer = 2.0;

        let result = sim
            .end_run(RunOutcome::Completed)
            .expect("active run should finish");

        assert_eq!(result.score, 160.0);
        assert_eq!(sim.score().score, 160.0);
        assert_eq!(sim.score().combo, 0);
        assert_eq!(sim.score().pending, 0.0);
    }

    #[test]
    fn abandoned_run_forfeits_the_pending_combo() {
        let mut sim = riding(flat_terrain());
        sim.score.score = 100.0;
        sim.score.combo = 2;
        sim.score.pending = 30.0;
        sim.score.combo_timer = 2.0;

        let result = sim
            .end_run(RunOutcome::Abandoned)
            .expect("active run should finish");

        assert_eq!(result.outcome, RunOutcome::Abandoned);
        assert_eq!(result.score, 100.0);
        assert_eq!(sim.score().combo, 0);
        assert_eq!(sim.score().pending, 0.0);
    }

    #[test]
    fn crash_after_a_checkpoint_respawns_there() {
        let mut sim = riding(flat_terrain());
        let spacing = sim.config().checkpoint_spacing;
        sim.state.world_x = spacing - 0.5;

        let events = run_steps(&mut sim, 30);
        assert!(events.iter().any(|event| matches!(
            event,
            SimEvent::CheckpointReached(checkpoint) if checkpoint.index == 0
        )));
        assert_eq!(sim.checkpoints().reached(), Some(0));

        lift_off(&mut sim, 0.0, 2.0, 10.0);
        let crash = sim.step(DT);
        assert!(crash
            .iter()
            .any(|event| matches!(event, SimEvent::Crashed { .. })));

        let steps = (sim.config().crash.respawn_delay_seconds / DT).ceil() as usize + 1;
        let events = run_steps(&mut sim, steps);

        let respawn = events
            .iter()
            .find_map(|event| match event {
                SimEvent::Respawned { x, checkpoint } => Some((*x, *checkpoint)),
                _ => None,
            })
            .expect("rider should respawn");
        assert_eq!(respawn, (spacing, Some(0)));
        assert!(sim.state().world_x >= spacing);
        assert!(sim.state().vx >= sim.config().physics.min_speed + 1.0);
    }
}
