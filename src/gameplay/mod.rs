pub mod checkpoints;
pub mod rider;
pub mod scoring;
pub mod telemetry;
pub mod terrain;

use bevy::prelude::*;
use rider::RiderGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(RiderGameplayPlugin);
    }
}
