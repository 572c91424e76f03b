//! The main game module for the bubble shooter.
//!
//! This module contains all the gameplay logic including:
//! - Square grid geometry and the occupancy set
//! - Bubble entities and colors
//! - The launcher and bubble motion
//! - Settling bubbles onto the grid
//! - Cluster detection and popping

mod bubble;
mod cell;
mod cluster;
mod config;
mod debug;
mod grid;
mod launcher;
mod motion;
mod settle;

use bevy::prelude::*;

use cell::{PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};
use config::GameConfig;
use grid::BubbleGrid;

pub(super) fn plugin(app: &mut App) {
    // The grid layout is fixed for the whole session.
    let config = GameConfig::load();
    app.insert_resource(BubbleGrid::new(config.grid));
    app.register_type::<GameConfig>();
    app.insert_resource(config);

    app.add_plugins((
        cell::plugin,
        grid::plugin,
        bubble::plugin,
        launcher::plugin,
        motion::plugin,
        settle::plugin,
        cluster::plugin,
        debug::plugin,
    ));

    app.add_systems(Startup, spawn_playfield);
}

/// Spawn the playfield background.
fn spawn_playfield(mut commands: Commands) {
    commands.spawn((
        Name::new("Playfield"),
        Sprite::from_color(
            Color::srgb(0.08, 0.09, 0.14),
            Vec2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT),
        ),
        Transform::from_xyz(0.0, 0.0, -1.0), // Z=-1 to be behind bubbles
    ));

    info!("Playfield spawned - bubble shooter ready!");
}
