//! Turning moving bubbles into settled grid bubbles.
//!
//! Listens for the collision and ceiling messages from the motion layer,
//! snaps each bubble involved to a free cell, and announces it with
//! [`BubbleSettled`] so cluster detection can run.

use bevy::prelude::*;

use super::{
    bubble::{Bubble, BubbleColor, BubbleState, Velocity},
    cell::{CellCoord, playfield_to_world, world_to_playfield},
    grid::{BubbleGrid, GridError, Occupant},
    motion::{BubbleHitCeiling, BubblesCollided, MotionSystems},
};
use crate::{AppSystems, PausableSystems};

pub(super) fn plugin(app: &mut App) {
    app.add_message::<BubbleSettled>();

    app.configure_sets(Update, SettleSystems.after(MotionSystems));

    app.add_systems(
        Update,
        settle_bubbles
            .in_set(SettleSystems)
            .in_set(AppSystems::Update)
            .in_set(PausableSystems),
    );
}

/// System set for the settle handler.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettleSystems;

/// Message sent once per bubble per collision event, after it sits on the grid.
#[derive(Message, Debug, Clone, Copy)]
pub struct BubbleSettled {
    pub entity: Entity,
    pub cell: CellCoord,
}

/// Pick a cell for a bubble at `position` (playfield space) and record it.
///
/// Snaps to the nearest cell; if that is off the grid or taken, the closest
/// free cell is used instead. Fails only when the grid is full.
pub fn snap_to_grid(
    grid: &mut BubbleGrid,
    entity: Entity,
    color: BubbleColor,
    position: Vec2,
) -> Result<CellCoord, GridError> {
    let target = grid.layout().nearest_cell(position);
    let cell = grid.free_cell_near(target)?;
    grid.place(cell, Occupant { entity, color })?;

    if cell != target {
        debug!("Nearest cell {} unavailable, settled at {} instead", target, cell);
    }

    Ok(cell)
}

/// Settle one bubble: stop it, snap it to the grid and move it onto its cell.
///
/// A bubble that already settled keeps its cell.
fn settle_bubble(
    grid: &mut BubbleGrid,
    entity: Entity,
    bubble: &Bubble,
    state: &mut BubbleState,
    transform: &mut Transform,
    velocity: &mut Velocity,
) -> Result<CellCoord, GridError> {
    if let BubbleState::Settled(cell) = *state {
        return Ok(cell);
    }

    velocity.0 = Vec2::ZERO;

    let position = world_to_playfield(transform.translation.truncate());
    let cell = snap_to_grid(grid, entity, bubble.color, position)?;

    let snapped = playfield_to_world(grid.layout().cell_to_position(cell));
    transform.translation = snapped.extend(transform.translation.z);
    *state = BubbleState::Settled(cell);

    info!("Bubble {:?} settled at {}", bubble.color, cell);

    Ok(cell)
}

/// Handle collision and ceiling messages.
///
/// Both bubbles of a collision get their own [`BubbleSettled`], so each one
/// triggers its own cluster check.
pub(super) fn settle_bubbles(
    mut commands: Commands,
    mut grid: ResMut<BubbleGrid>,
    mut collided_events: MessageReader<BubblesCollided>,
    mut ceiling_events: MessageReader<BubbleHitCeiling>,
    mut bubble_query: Query<(&Bubble, &mut BubbleState, &mut Transform, &mut Velocity)>,
    mut settled_events: MessageWriter<BubbleSettled>,
) {
    let mut settle = |entity: Entity, require_moving: bool| {
        let Ok((bubble, mut state, mut transform, mut velocity)) = bubble_query.get_mut(entity)
        else {
            debug!("Bubble {:?} is gone, nothing to settle", entity);
            return;
        };

        if require_moving && !state.is_moving() {
            return;
        }

        match settle_bubble(
            &mut grid,
            entity,
            bubble,
            &mut state,
            &mut transform,
            &mut velocity,
        ) {
            Ok(cell) => {
                settled_events.write(BubbleSettled { entity, cell });
            }
            Err(e) => {
                warn!("Could not settle bubble {:?}: {}", entity, e);
                commands.entity(entity).despawn();
            }
        }
    };

    for event in collided_events.read() {
        settle(event.first, false);
        settle(event.second, false);
    }

    for event in ceiling_events.read() {
        settle(event.entity, true);
    }
}
