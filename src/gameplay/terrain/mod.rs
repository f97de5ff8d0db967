mod rng;

use rng::TrackRng;

use crate::config::{TerrainConfig, TerrainGenerator, WaveConfig};
use bevy::prelude::*;
use rand_core::SeedableRng;
use std::f32::consts::TAU;

const RANGE_EPSILON: f32 = 1.0e-4;
const DOWNHILL_EXTEND_SLOPE: f32 = 0.08;
const STEEP_UPHILL_SLOPE: f32 = -0.1;
const FLAT_SPREAD: f32 = 0.08;
const MIXED_SPREAD: f32 = 0.14;
const FLAT_WAVE_PATTERN: usize = 2;

// Smoothstep ramp between two elevations with a wave on top. Elevation grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSegment {
    pub start_x: f32,
    pub end_x: f32,
    pub start_elevation: f32,
    pub end_elevation: f32,
    pub wave_amplitude: f32,
    pub wave_cycles: f32,
    pub wave_phase: f32,
}

impl TerrainSegment {
    pub fn length(&self) -> f32 {
        (self.end_x - self.start_x).max(RANGE_EPSILON)
    }

    // The wave is taken relative to its chord so it vanishes at both ends.
    pub fn elevation_at(&self, x: f32) -> f32 {
        let t = ((x - self.start_x) / self.length()).clamp(0.0, 1.0);
        let smooth_t = t * t * (3.0 - 2.0 * t);
        let base = self.start_elevation + (self.end_elevation - self.start_elevation) * smooth_t;

        let wave = |u: f32| (u * self.wave_cycles * TAU + self.wave_phase).sin();
        let (w0, w1) = (wave(0.0), wave(1.0));
        let chord = w0 + (w1 - w0) * t;

        base + (wave(t) - chord) * self.wave_amplitude
    }
}

#[derive(Debug, Clone)]
enum TerrainShape {
    Waves(Vec<WaveConfig>),
    Segments(Vec<TerrainSegment>),
}

#[derive(Debug, Clone)]
pub struct TerrainField {
    config: TerrainConfig,
    shape: TerrainShape,
}

impl TerrainField {
    pub fn generate(config: &TerrainConfig) -> Self {
        let mut config = config.clone();
        for correction in config.sanitize() {
            warn!("Terrain config corrected: {correction}");
        }

        let shape = match config.generator {
            TerrainGenerator::Waves => TerrainShape::Waves(config.waves.clone()),
            TerrainGenerator::Segments => TerrainShape::Segments(build_segments(&config)),
        };

        Self { config, shape }
    }

    pub fn matches_shape(&self, config: &TerrainConfig) -> bool {
        let mut candidate = config.clone();
        candidate.sanitize();
        candidate == self.config
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn level_length(&self) -> f32 {
        self.config.level_length
    }

    pub fn segments(&self) -> &[TerrainSegment] {
        match &self.shape {
            TerrainShape::Segments(segments) => segments,
            TerrainShape::Waves(_) => &[],
        }
    }

    pub fn height(&self, x: f32) -> f32 {
        let x = self.clamp_x(x);
        let offset = match &self.shape {
            TerrainShape::Waves(waves) => {
                x * self.config.ramp_slope
                    + waves
                        .iter()
                        .map(|wave| (wave.frequency * x + wave.phase).sin() * wave.amplitude)
                        .sum::<f32>()
            }
            TerrainShape::Segments(segments) => segment_elevation(segments, x),
        };
        self.config.base_height + offset
    }

    // Positive means the ground drops ahead.
    pub fn slope(&self, x: f32) -> f32 {
        let d = self.config.slope_probe_distance.max(RANGE_EPSILON);
        (self.height(x + d) - self.height(x - d)) / (2.0 * d)
    }

    pub fn angle(&self, x: f32) -> f32 {
        self.slope(x).atan()
    }

    fn clamp_x(&self, x: f32) -> f32 {
        if x.is_nan() {
            return 0.0;
        }
        x.clamp(0.0, self.config.level_length)
    }
}

fn segment_elevation(segments: &[TerrainSegment], x: f32) -> f32 {
    if segments.is_empty() {
        return 0.0;
    }
    let index = segments
        .partition_point(|segment| segment.end_x < x)
        .min(segments.len() - 1);
    segments[index].elevation_at(x)
}

fn pick_slope(rng: &mut TrackRng, index: usize) -> f32 {
    match index % 6 {
        0 => (rng.next_f32() - 0.5) * FLAT_SPREAD,
        1 | 2 => 0.06 + rng.next_f32() * 0.1,
        3 | 4 => -(0.08 + rng.next_f32() * 0.12),
        _ => (rng.next_f32() - 0.5) * MIXED_SPREAD,
    }
}

fn build_segments(config: &TerrainConfig) -> Vec<TerrainSegment> {
    let mut rng = TrackRng::from_seed(config.seed.to_le_bytes());
    let mut segments = Vec::new();
    let mut x = 0.0_f32;
    let mut elevation = 0.0_f32;
    let mut index = 0_usize;

    while x < config.level_length {
        let slope = pick_slope(&mut rng, index);
        let (min_len, max_len) = if slope < STEEP_UPHILL_SLOPE {
            (
                config.steep_uphill_min_segment_length,
                config.steep_uphill_max_segment_length,
            )
        } else if slope > DOWNHILL_EXTEND_SLOPE {
            (config.min_segment_length, config.downhill_max_segment_length)
        } else {
            (config.min_segment_length, config.max_segment_length)
        };

        let candidate = min_len + rng.next_f32() * (max_len - min_len);
        let remaining = config.level_length - x;
        let (length, end_x) = if candidate >= remaining || x + candidate >= config.level_length {
            (remaining, config.level_length)
        } else {
            (candidate, x + candidate)
        };
        if end_x <= x {
            warn!("Terrain generation stalled at x = {x}; track ends early.");
            break;
        }

        let end_elevation = (elevation + slope * length)
            .clamp(-config.elevation_limit, config.elevation_limit);

        let wave_amplitude = if index % 4 == FLAT_WAVE_PATTERN {
            0.0
        } else {
            config.wave_amplitude_min
                + rng.next_f32() * (config.wave_amplitude_max - config.wave_amplitude_min)
        };
        let wave_cycles =
            config.wave_cycles_min + rng.next_f32() * (config.wave_cycles_max - config.wave_cycles_min);
        let wave_phase = rng.next_f32() * TAU;

        segments.push(TerrainSegment {
            start_x: x,
            end_x,
            start_elevation: elevation,
            end_elevation,
            wave_amplitude,
            wave_cycles,
            wave_phase,
        });

        x = end_x;
        elevation = end_elevation;
        index += 1;
    }

    segments
}
