//! Grid overlay.
//!
//! The grid lines are always drawn. Toggle the occupancy overlay with the
//! 'D' key: every settled bubble gets a ring in its color. Pops are logged.

use bevy::{color::palettes::css, input::common_conditions::input_just_pressed, prelude::*};

use super::{
    cell::{CellCoord, GridLayout, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH, playfield_to_world},
    cluster::{ClusterPopped, ClusterSystems},
    grid::BubbleGrid,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<DebugGridVisible>();

    // Toggle debug with 'D' key
    app.add_systems(Update, toggle_debug.run_if(input_just_pressed(KeyCode::KeyD)));

    app.add_systems(Update, (draw_grid_lines, draw_walls));
    app.add_systems(Update, draw_occupancy.run_if(debug_visible));
    app.add_systems(Update, log_popped_clusters.after(ClusterSystems));
}

/// Resource to track if the occupancy overlay is visible.
#[derive(Resource, Default)]
pub struct DebugGridVisible(pub bool);

fn debug_visible(debug: Res<DebugGridVisible>) -> bool {
    debug.0
}

fn toggle_debug(mut debug: ResMut<DebugGridVisible>) {
    debug.0 = !debug.0;
    let state = if debug.0 { "ON" } else { "OFF" };
    info!("Occupancy overlay: {}", state);
}

/// Endpoints of every grid line in playfield space: `rows + 1` horizontal
/// lines, then `columns + 1` vertical ones.
fn grid_lines(layout: &GridLayout) -> Vec<(Vec2, Vec2)> {
    let width = layout.columns as f32 * layout.cell_size;
    let height = layout.rows as f32 * layout.cell_size;
    let origin = Vec2::new(layout.offset_x, layout.offset_y);

    let horizontal = (0..=layout.rows).map(|row| {
        let y = row as f32 * layout.cell_size;
        (origin + Vec2::new(0.0, y), origin + Vec2::new(width, y))
    });
    let vertical = (0..=layout.columns).map(|column| {
        let x = column as f32 * layout.cell_size;
        (origin + Vec2::new(x, 0.0), origin + Vec2::new(x, height))
    });

    horizontal.chain(vertical).collect()
}

/// Draw the grid the bubbles snap to.
fn draw_grid_lines(mut gizmos: Gizmos, grid: Res<BubbleGrid>) {
    let color = css::WHITE.with_alpha(0.5);
    for (start, end) in grid_lines(grid.layout()) {
        gizmos.line_2d(playfield_to_world(start), playfield_to_world(end), color);
    }
}

/// Highlight occupied cells in their bubble's color.
fn draw_occupancy(mut gizmos: Gizmos, grid: Res<BubbleGrid>) {
    let layout = grid.layout();
    let radius = layout.bubble_radius();

    for (&coord, occupant) in grid.iter() {
        let center = playfield_to_world(layout.cell_to_position(coord));
        gizmos.circle_2d(
            Isometry2d::from_translation(center),
            radius,
            occupant.color.to_color(),
        );
    }

    // Mark the top-left cell so the grid origin is obvious.
    let origin = playfield_to_world(layout.cell_to_position(CellCoord::new(0, 0)));
    gizmos.cross_2d(Isometry2d::from_translation(origin), radius * 0.5, css::GOLD);
}

/// Report every popped cluster and what is left on the grid.
fn log_popped_clusters(mut popped_events: MessageReader<ClusterPopped>, grid: Res<BubbleGrid>) {
    let mut popped_any = false;
    for popped in popped_events.read() {
        debug!("{:?} cluster of {} popped from {:?}", popped.color, popped.count, popped.cells);
        popped_any = true;
    }

    if !popped_any {
        return;
    }
    if grid.is_empty() {
        info!("Grid cleared");
    } else {
        debug!("{} bubbles left on the grid", grid.len());
    }
}

/// Draw the playfield boundary.
fn draw_walls(mut gizmos: Gizmos) {
    gizmos.rect_2d(
        Isometry2d::IDENTITY,
        Vec2::new(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT),
        css::ORANGE.with_alpha(0.8),
    );
}
