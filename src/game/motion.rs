//! Motion - moving bubbles through the playfield.
//!
//! This is the physics stand-in the settle handler talks to: it integrates
//! velocity, bounces bubbles off the side and bottom walls, and reports
//! overlaps and ceiling hits as messages.

use bevy::prelude::*;
use std::collections::HashSet;

use super::{
    bubble::{BubbleAssets, BubbleColor, BubbleState, Velocity, spawn_moving_bubble},
    cell::{PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH},
    config::GameConfig,
    grid::BubbleGrid,
};
use crate::{AppSystems, PausableSystems};

pub(super) fn plugin(app: &mut App) {
    app.add_message::<FireBubble>();
    app.add_message::<BubblesCollided>();
    app.add_message::<BubbleHitCeiling>();

    app.add_systems(
        Update,
        (
            spawn_fired_bubbles,
            move_bubbles,
            check_world_bounds,
            check_overlaps,
        )
            .chain()
            .in_set(MotionSystems)
            .in_set(AppSystems::Update)
            .in_set(PausableSystems),
    );
}

/// System set for motion systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MotionSystems;

/// Message to launch a new bubble (world space).
#[derive(Message, Debug, Clone)]
pub struct FireBubble {
    pub position: Vec2,
    pub direction: Vec2,
    pub color: BubbleColor,
}

/// Message sent when a moving bubble touches another bubble.
#[derive(Message, Debug, Clone, Copy)]
pub struct BubblesCollided {
    /// The moving bubble that ran into something.
    pub first: Entity,
    /// What it ran into, moving or settled.
    pub second: Entity,
}

/// Message sent when a moving bubble reaches the top edge of the playfield.
#[derive(Message, Debug, Clone, Copy)]
pub struct BubbleHitCeiling {
    pub entity: Entity,
}

/// Bubbles overlap when their centres are closer than this fraction of a diameter.
const OVERLAP_FACTOR: f32 = 0.9;

/// Spawn a moving bubble for every fire message.
fn spawn_fired_bubbles(
    mut commands: Commands,
    mut fire_events: MessageReader<FireBubble>,
    config: Res<GameConfig>,
    assets: Res<BubbleAssets>,
) {
    for event in fire_events.read() {
        let velocity = event.direction.normalize_or_zero() * config.launcher.speed;
        spawn_moving_bubble(&mut commands, &assets, event.position, velocity, event.color);
        debug!("Fired {:?} bubble with velocity {:?}", event.color, velocity);
    }
}

/// Move bubbles based on their velocity.
fn move_bubbles(time: Res<Time>, mut query: Query<(&mut Transform, &Velocity, &BubbleState)>) {
    for (mut transform, velocity, state) in &mut query {
        if state.is_moving() {
            transform.translation += velocity.0.extend(0.0) * time.delta_secs();
        }
    }
}

/// Bounce off the side and bottom walls; report the ceiling.
fn check_world_bounds(
    grid: Res<BubbleGrid>,
    mut query: Query<(Entity, &mut Transform, &mut Velocity, &BubbleState)>,
    mut ceiling_events: MessageWriter<BubbleHitCeiling>,
) {
    let radius = grid.layout().bubble_radius();
    let left = -PLAYFIELD_WIDTH * 0.5;
    let right = PLAYFIELD_WIDTH * 0.5;
    let top = PLAYFIELD_HEIGHT * 0.5;
    let bottom = -PLAYFIELD_HEIGHT * 0.5;

    for (entity, mut transform, mut velocity, state) in &mut query {
        if !state.is_moving() {
            continue;
        }

        let pos = transform.translation;

        if pos.x - radius < left {
            transform.translation.x = left + radius;
            velocity.0.x = velocity.0.x.abs();
        }

        if pos.x + radius > right {
            transform.translation.x = right - radius;
            velocity.0.x = -velocity.0.x.abs();
        }

        if pos.y - radius < bottom {
            transform.translation.y = bottom + radius;
            velocity.0.y = velocity.0.y.abs();
        }

        if pos.y + radius > top {
            transform.translation.y = top - radius;
            ceiling_events.write(BubbleHitCeiling { entity });
        }
    }
}

/// Report moving bubbles that overlap any other bubble.
///
/// At most one collision per moving bubble per frame; a pair of moving
/// bubbles is only reported once.
fn check_overlaps(
    grid: Res<BubbleGrid>,
    query: Query<(Entity, &Transform, &BubbleState)>,
    mut collided_events: MessageWriter<BubblesCollided>,
) {
    let overlap_distance = grid.layout().bubble_radius() * 2.0 * OVERLAP_FACTOR;
    let mut involved = HashSet::new();

    for (entity, transform, state) in &query {
        if !state.is_moving() || involved.contains(&entity) {
            continue;
        }

        let pos = transform.translation.truncate();
        let hit = query.iter().find(|(other, other_transform, _)| {
            *other != entity
                && !involved.contains(other)
                && pos.distance(other_transform.translation.truncate()) < overlap_distance
        });

        if let Some((other, _, _)) = hit {
            involved.insert(entity);
            involved.insert(other);
            collided_events.write(BubblesCollided {
                first: entity,
                second: other,
            });
        }
    }
}
