mod simulation;

pub use simulation::{CrashConfig, ModeConfig, RiderPhysicsConfig, ScoringConfig, SimulationConfig};

use simulation::{LandingQualityConfig, RiderBodyConfig};

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::f32::consts::TAU;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = "config";
const SLOPE_PROBE_FLOOR: f32 = 1.0e-4;
const SEGMENT_LENGTH_FLOOR: f32 = 1.0;
const LEVEL_LENGTH_FLOOR: f32 = 1.0;
const LEVEL_LENGTH_CEILING: f32 = 1.0e6;

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(TimeUpdateStrategy::ManualDuration(config.fixed_step()));
    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Option<Res<ButtonInput<KeyCode>>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    let Some(keyboard) = keyboard else {
        return;
    };
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: {:?} terrain (seed {}, length {}), {} modes, default mode `{}`.",
        config.terrain.terrain.generator,
        config.terrain.terrain.seed,
        config.terrain.terrain.level_length,
        config.modes_by_id.len(),
        config.game.app.default_mode
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub rider: RiderFile,
    pub terrain: TerrainFile,
    pub scoring: ScoringConfig,
    pub modes: ModesFile,
    pub replay: ReplayFile,
    pub modes_by_id: HashMap<String, ModeConfig>,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let rider: RiderFile = read_toml(&config_dir.join("rider.toml"))?;
        let terrain: TerrainFile = read_toml(&config_dir.join("terrain.toml"))?;
        let scoring: ScoringConfig = read_toml(&config_dir.join("scoring.toml"))?;
        let modes: ModesFile = read_toml(&config_dir.join("modes.toml"))?;
        let replay: ReplayFile = read_toml(&config_dir.join("replay.toml"))?;

        Self::from_files(game, rider, terrain, scoring, modes, replay)
    }

    pub fn from_files(
        game: GameFile,
        rider: RiderFile,
        terrain: TerrainFile,
        scoring: ScoringConfig,
        modes: ModesFile,
        replay: ReplayFile,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            modes_by_id: to_index("modes.toml::modes", &modes.modes)?,
            game,
            rider,
            terrain,
            scoring,
            modes,
            replay,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.modes_by_id.contains_key(&self.game.app.default_mode) {
            return Err(ConfigError::Validation(format!(
                "game.toml::app.default_mode references unknown mode id `{}`",
                self.game.app.default_mode
            )));
        }

        if !(self.game.app.fixed_timestep_hz.is_finite() && self.game.app.fixed_timestep_hz > 0.0)
        {
            return Err(ConfigError::Validation(
                "game.toml::app.fixed_timestep_hz must be > 0".to_string(),
            ));
        }

        if !(self.game.app.max_step_seconds.is_finite() && self.game.app.max_step_seconds > 0.0) {
            return Err(ConfigError::Validation(
                "game.toml::app.max_step_seconds must be > 0".to_string(),
            ));
        }

        ensure_finite("game.toml::track", &self.game.track.named_values())?;
        ensure_finite("rider.toml::physics", &self.rider.physics.named_values())?;
        ensure_finite("rider.toml::body", &self.rider.body.named_values())?;
        ensure_finite("rider.toml::crash", &self.rider.crash.named_values())?;
        ensure_finite(
            "rider.toml::landing_quality",
            &self.rider.landing_quality.named_values(),
        )?;
        ensure_finite("scoring.toml", &self.scoring.named_values())?;
        ensure_finite("terrain.toml::terrain", &self.terrain.terrain.named_values())?;

        for (index, wave) in self.terrain.terrain.waves.iter().enumerate() {
            ensure_finite(
                &format!("terrain.toml::terrain.waves[{index}]"),
                &[
                    ("amplitude", wave.amplitude),
                    ("frequency", wave.frequency),
                    ("phase", wave.phase),
                ],
            )?;
        }

        for (index, mode) in self.modes.modes.iter().enumerate() {
            ensure_finite(
                &format!("modes.toml::modes[{index}]"),
                &[
                    ("stabilization_strength", mode.stabilization_strength),
                    ("crash_threshold_scale", mode.crash_threshold_scale),
                ],
            )?;
        }

        let mut previous_at = 0.0;
        for (index, edge) in self.replay.replay.edges.iter().enumerate() {
            if !edge.at_seconds.is_finite() || edge.at_seconds < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "replay.toml::replay.edges[{index}].at_seconds must be >= 0"
                )));
            }
            if edge.at_seconds < previous_at {
                return Err(ConfigError::Validation(format!(
                    "replay.toml::replay.edges[{index}].at_seconds ({}) is earlier than the edge before it ({previous_at}); edges must be listed in time order",
                    edge.at_seconds
                )));
            }
            previous_at = edge.at_seconds;
        }

        if self.replay.replay.enabled && self.replay.replay.trace_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "replay.toml::replay.trace_path cannot be empty when replay is enabled"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.game.app.fixed_timestep_hz)
    }

    // Not sanitized here; `apply_config` does that so corrections log once.
    pub fn simulation_config(&self, mode_id: &str) -> Option<SimulationConfig> {
        let mode = self.modes_by_id.get(mode_id)?;
        Some(SimulationConfig::from_parts(
            &self.rider,
            &self.scoring,
            mode,
            self.game.track.checkpoint_spacing,
        ))
    }

    pub fn default_simulation_config(&self) -> Option<SimulationConfig> {
        self.simulation_config(&self.game.app.default_mode)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

fn ensure_finite(label: &str, values: &[(&str, f32)]) -> Result<(), ConfigError> {
    for (name, value) in values {
        if !value.is_finite() {
            return Err(ConfigError::Validation(format!(
                "{label}.{name} must be a finite number (got {value})"
            )));
        }
    }
    Ok(())
}

trait HasId {
    fn id(&self) -> &str;
}

impl HasId for ModeConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    #[serde(default)]
    pub track: TrackConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub fixed_timestep_hz: f32,
    pub max_step_seconds: f32,
    pub default_mode: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub checkpoint_spacing: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            checkpoint_spacing: 160.0,
        }
    }
}

impl TrackConfig {
    fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![("checkpoint_spacing", self.checkpoint_spacing)]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiderFile {
    #[serde(default)]
    pub physics: RiderPhysicsConfig,
    #[serde(default)]
    pub body: RiderBodyConfig,
    #[serde(default)]
    pub crash: CrashConfig,
    #[serde(default)]
    pub landing_quality: LandingQualityConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerrainFile {
    pub terrain: TerrainConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainGenerator {
    Segments,
    Waves,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub generator: TerrainGenerator,
    pub seed: u32,
    pub level_length: f32,
    pub base_height: f32,
    pub slope_probe_distance: f32,
    pub min_segment_length: f32,
    pub max_segment_length: f32,
    pub downhill_max_segment_length: f32,
    pub steep_uphill_min_segment_length: f32,
    pub steep_uphill_max_segment_length: f32,
    pub elevation_limit: f32,
    pub wave_amplitude_min: f32,
    pub wave_amplitude_max: f32,
    pub wave_cycles_min: f32,
    pub wave_cycles_max: f32,
    pub ramp_slope: f32,
    pub waves: Vec<WaveConfig>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            generator: TerrainGenerator::Segments,
            seed: 1010,
            level_length: 760.0,
            base_height: 480.0,
            slope_probe_distance: 10.0,
            min_segment_length: 22.0,
            max_segment_length: 66.0,
            downhill_max_segment_length: 78.0,
            steep_uphill_min_segment_length: 34.0,
            steep_uphill_max_segment_length: 48.0,
            elevation_limit: 260.0,
            wave_amplitude_min: 12.0,
            wave_amplitude_max: 30.0,
            wave_cycles_min: 0.22,
            wave_cycles_max: 0.67,
            ramp_slope: 0.0,
            waves: vec![
                WaveConfig {
                    amplitude: 40.0,
                    frequency: 0.015,
                    phase: 0.0,
                },
                WaveConfig {
                    amplitude: 20.0,
                    frequency: 0.041,
                    phase: 1.3,
                },
            ],
        }
    }
}

impl TerrainConfig {
    fn named_values(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("level_length", self.level_length),
            ("base_height", self.base_height),
            ("slope_probe_distance", self.slope_probe_distance),
            ("min_segment_length", self.min_segment_length),
            ("max_segment_length", self.max_segment_length),
            ("downhill_max_segment_length", self.downhill_max_segment_length),
            (
                "steep_uphill_min_segment_length",
                self.steep_uphill_min_segment_length,
            ),
            (
                "steep_uphill_max_segment_length",
                self.steep_uphill_max_segment_length,
            ),
            ("elevation_limit", self.elevation_limit),
            ("wave_amplitude_min", self.wave_amplitude_min),
            ("wave_amplitude_max", self.wave_amplitude_max),
            ("wave_cycles_min", self.wave_cycles_min),
            ("wave_cycles_max", self.wave_cycles_max),
            ("ramp_slope", self.ramp_slope),
        ]
    }

    pub fn sanitize(&mut self) -> Vec<String> {
        let mut corrections = Vec::new();

        floor_at(
            "terrain.level_length",
            &mut self.level_length,
            LEVEL_LENGTH_FLOOR,
            &mut corrections,
        );
        if self.level_length > LEVEL_LENGTH_CEILING {
            corrections.push(format!(
                "terrain.level_length {} lowered to {LEVEL_LENGTH_CEILING}",
                self.level_length
            ));
            self.level_length = LEVEL_LENGTH_CEILING;
        }
        floor_at(
            "terrain.slope_probe_distance",
            &mut self.slope_probe_distance,
            SLOPE_PROBE_FLOOR,
            &mut corrections,
        );
        order_pair(
            "terrain.min_segment_length/max_segment_length",
            &mut self.min_segment_length,
            &mut self.max_segment_length,
            &mut corrections,
        );
        floor_at(
            "terrain.min_segment_length",
            &mut self.min_segment_length,
            SEGMENT_LENGTH_FLOOR,
            &mut corrections,
        );
        floor_at(
            "terrain.max_segment_length",
            &mut self.max_segment_length,
            self.min_segment_length,
            &mut corrections,
        );
        floor_at(
            "terrain.downhill_max_segment_length",
            &mut self.downhill_max_segment_length,
            self.min_segment_length,
            &mut corrections,
        );
        order_pair(
            "terrain.steep_uphill_min_segment_length/steep_uphill_max_segment_length",
            &mut self.steep_uphill_min_segment_length,
            &mut self.steep_uphill_max_segment_length,
            &mut corrections,
        );
        floor_at(
            "terrain.steep_uphill_min_segment_length",
            &mut self.steep_uphill_min_segment_length,
            SEGMENT_LENGTH_FLOOR,
            &mut corrections,
        );
        floor_at(
            "terrain.steep_uphill_max_segment_length",
            &mut self.steep_uphill_max_segment_length,
            self.steep_uphill_min_segment_length,
            &mut corrections,
        );
        floor_at(
            "terrain.elevation_limit",
            &mut self.elevation_limit,
            0.0,
            &mut corrections,
        );
        order_pair(
            "terrain.wave_amplitude_min/wave_amplitude_max",
            &mut self.wave_amplitude_min,
            &mut self.wave_amplitude_max,
            &mut corrections,
        );
        order_pair(
            "terrain.wave_cycles_min/wave_cycles_max",
            &mut self.wave_cycles_min,
            &mut self.wave_cycles_max,
            &mut corrections,
        );

        for (index, wave) in self.waves.iter_mut().enumerate() {
            if wave.frequency < 0.0 {
                corrections.push(format!(
                    "terrain.waves[{index}].frequency {} was negative; using its magnitude",
                    wave.frequency
                ));
                wave.frequency = wave.frequency.abs();
            }
            if wave.phase.abs() > TAU {
                wave.phase = wave.phase.rem_euclid(TAU);
            }
        }

        corrections
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WaveConfig {
    pub amplitude: f32,
    pub frequency: f32,
    #[serde(default)]
    pub phase: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModesFile {
    pub modes: Vec<ModeConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayFile {
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub enabled: bool,
    pub trace_path: String,
    pub max_seconds: f32,
    pub exit_on_finish: bool,
    pub edges: Vec<ReplayEdgeConfig>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            trace_path: "target/ridge_rider_trace.json".to_string(),
            max_seconds: 90.0,
            exit_on_finish: true,
            edges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEdgeKind {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReplayEdgeConfig {
    pub at_seconds: f32,
    pub edge: ReplayEdgeKind,
}

pub(crate) fn order_pair(label: &str, low: &mut f32, high: &mut f32, corrections: &mut Vec<String>) {
    if *low > *high {
        corrections.push(format!(
            "{label} was inverted ({} > {}); swapped",
            *low, *high
        ));
        std::mem::swap(low, high);
    }
}

pub(crate) fn floor_at(label: &str, value: &mut f32, floor: f32, corrections: &mut Vec<String>) {
    if *value < floor {
        corrections.push(format!("{label} {} raised to {floor}", *value));
        *value = floor;
    }
}

#[cfg(test)]
impl GameConfig {
    pub(crate) fn for_tests() -> Self {
        let normal = ModeConfig::default();
        Self::from_files(
            GameFile {
                app: AppConfig {
                    fixed_timestep_hz: 60.0,
                    max_step_seconds: 0.033,
                    default_mode: normal.id.clone(),
                },
                track: TrackConfig::default(),
            },
            RiderFile::default(),
            TerrainFile::default(),
            ScoringConfig::default(),
            ModesFile {
                modes: vec![normal],
            },
            ReplayFile::default(),
        )
        .expect("default test config should validate")
    }
}
