use crate::config::SimulationConfig;
use crate::gameplay::terrain::TerrainField;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Checkpoint {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RespawnRecord {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointTrack {
    checkpoints: Vec<Checkpoint>,
    reached: Option<usize>,
    respawn: RespawnRecord,
}

impl CheckpointTrack {
    pub fn build(terrain: &TerrainField, config: &SimulationConfig) -> Self {
        let spacing = config.checkpoint_spacing;
        let count = if spacing > 0.0 {
            (terrain.level_length() / spacing).floor() as usize
        } else {
            0
        };

        let checkpoints = (0..count)
            .map(|index| {
                let x = (index + 1) as f32 * spacing;
                Checkpoint {
                    index,
                    x,
                    y: terrain.height(x) - config.body.ground_offset(),
                    angle: terrain.angle(x),
                }
            })
            .collect();

        Self {
            checkpoints,
            reached: None,
            respawn: start_record(terrain, config),
        }
    }

    pub fn reset(&mut self, terrain: &TerrainField, config: &SimulationConfig) {
        self.reached = None;
        self.respawn = start_record(terrain, config);
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn reached(&self) -> Option<usize> {
        self.reached
    }

    pub fn respawn(&self) -> RespawnRecord {
        self.respawn
    }

    // At most one checkpoint is taken per call.
    pub fn update(&mut self, world_x: f32, vx: f32, min_speed: f32) -> Option<Checkpoint> {
        let next_index = self.reached.map_or(0, |index| index + 1);
        let next = *self.checkpoints.get(next_index)?;
        if world_x < next.x {
            return None;
        }

        self.reached = Some(next_index);
        self.respawn = RespawnRecord {
            x: next.x,
            y: next.y,
            angle: next.angle,
            speed: (min_speed + 1.0).max(vx),
        };
        Some(next)
    }
}

fn start_record(terrain: &TerrainField, config: &SimulationConfig) -> RespawnRecord {
    RespawnRecord {
        x: 0.0,
        y: terrain.height(0.0) - config.body.ground_offset(),
        angle: terrain.angle(0.0),
        speed: config.physics.respawn_speed,
    }
}
