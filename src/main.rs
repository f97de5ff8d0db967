mod config;
mod gameplay;
mod replay;
mod states;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;
use config::ConfigPlugin;
use gameplay::GameplayPlugin;
use replay::ReplayPlugin;
use states::{GameState, GameStatePlugin};
use std::time::Duration;

fn main() {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)))
        .add_plugins(LogPlugin::default())
        .add_plugins(StatesPlugin)
        .add_plugins(ConfigPlugin)
        .add_plugins(GameplayPlugin)
        .add_plugins(ReplayPlugin)
        .init_state::<GameState>()
        .add_plugins(GameStatePlugin);

    app.run();
}
