//! The launcher at the bottom of the playfield.
//!
//! Left-click fires the loaded bubble toward the cursor. A new bubble with a
//! random color is loaded after a short reload delay.

use bevy::{prelude::*, window::PrimaryWindow};

use super::{
    bubble::{BubbleAssets, BubbleColor, load_bubble_assets},
    cell::{PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH, playfield_to_world},
    config::GameConfig,
    motion::FireBubble,
};
use crate::{AppSystems, PausableSystems};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Launcher>();
    app.register_type::<LoadedBubble>();

    app.add_systems(Startup, spawn_launcher.after(load_bubble_assets));

    app.add_systems(
        Update,
        (
            reload_launcher.in_set(AppSystems::TickTimers),
            handle_fire_input.in_set(AppSystems::RecordInput),
        )
            .in_set(PausableSystems),
    );
}

/// Distance of the launcher from the bottom edge of the playfield.
const LAUNCHER_MARGIN: f32 = 30.0;

/// Marker component for the launcher entity.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct Launcher;

/// The bubble waiting to be fired, if one is loaded.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct LoadedBubble(pub Option<BubbleColor>);

/// Counts down until the next bubble is loaded.
#[derive(Component, Debug, Clone)]
struct ReloadTimer(Timer);

/// Marker for the loaded bubble visual entity.
#[derive(Component)]
struct LoadedBubbleVisual;

/// Playfield position bubbles are launched from.
pub fn launcher_position() -> Vec2 {
    Vec2::new(PLAYFIELD_WIDTH * 0.5, PLAYFIELD_HEIGHT - LAUNCHER_MARGIN)
}

/// Unit vector from the launcher toward a target, if they differ.
fn aim_direction(from: Vec2, target: Vec2) -> Option<Vec2> {
    (target - from).try_normalize()
}

/// Spawn the launcher with its first bubble loaded.
fn spawn_launcher(mut commands: Commands, assets: Res<BubbleAssets>, config: Res<GameConfig>) {
    let world_pos = playfield_to_world(launcher_position());
    let color = BubbleColor::random();
    let cell_size = config.grid.cell_size;

    info!("Spawning launcher at {:?}", world_pos);

    let launcher = commands
        .spawn((
            Name::new("Launcher"),
            Launcher,
            LoadedBubble(Some(color)),
            ReloadTimer(Timer::from_seconds(
                config.launcher.reload_delay_secs,
                TimerMode::Once,
            )),
            Transform::from_translation(world_pos.extend(1.0)),
            Visibility::default(),
        ))
        .id();

    // Base/platform visual
    let base = commands
        .spawn((
            Name::new("Launcher Base"),
            Sprite {
                color: Color::srgb(0.3, 0.3, 0.35),
                custom_size: Some(Vec2::new(cell_size * 1.5, cell_size * 0.4)),
                ..default()
            },
            Transform::from_xyz(0.0, -cell_size * 0.6, -0.1),
        ))
        .id();
    commands.entity(launcher).add_child(base);

    spawn_loaded_visual(&mut commands, &assets, launcher, color);
}

fn spawn_loaded_visual(
    commands: &mut Commands,
    assets: &BubbleAssets,
    launcher: Entity,
    color: BubbleColor,
) {
    let visual = commands
        .spawn((
            Name::new("Loaded Bubble"),
            LoadedBubbleVisual,
            Transform::from_xyz(0.0, 0.0, 0.1),
            Mesh2d(assets.mesh.clone()),
            MeshMaterial2d(assets.material(color)),
        ))
        .id();
    commands.entity(launcher).add_child(visual);
}

/// Fire the loaded bubble toward the cursor on left-click.
fn handle_fire_input(
    mut commands: Commands,
    mouse_input: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform)>,
    mut launcher_query: Query<(&Transform, &mut LoadedBubble, &mut ReloadTimer), With<Launcher>>,
    visual_query: Query<Entity, With<LoadedBubbleVisual>>,
    mut fire_events: MessageWriter<FireBubble>,
) {
    if !mouse_input.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok((transform, mut loaded, mut reload)) = launcher_query.single_mut() else {
        return;
    };

    // Nothing to fire until the reload finishes.
    let Some(color) = loaded.0 else {
        return;
    };

    let Ok(window) = window_query.single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    // Get cursor position in world coordinates
    let Some(cursor_pos) = window
        .cursor_position()
        .and_then(|p| camera.viewport_to_world_2d(camera_transform, p).ok())
    else {
        return;
    };

    let position = transform.translation.truncate();
    let Some(direction) = aim_direction(position, cursor_pos) else {
        return;
    };

    fire_events.write(FireBubble {
        position,
        direction,
        color,
    });

    loaded.0 = None;
    reload.0.reset();
    for visual in &visual_query {
        commands.entity(visual).despawn();
    }
}

/// Load a new random bubble once the reload delay has passed.
fn reload_launcher(
    mut commands: Commands,
    time: Res<Time>,
    assets: Res<BubbleAssets>,
    mut launcher_query: Query<(Entity, &mut LoadedBubble, &mut ReloadTimer), With<Launcher>>,
) {
    let Ok((launcher, mut loaded, mut reload)) = launcher_query.single_mut() else {
        return;
    };

    if loaded.0.is_some() {
        return;
    }

    if reload.0.tick(time.delta()).just_finished() {
        let color = BubbleColor::random();
        loaded.0 = Some(color);
        spawn_loaded_visual(&mut commands, &assets, launcher, color);
        debug!("Loaded {:?} bubble", color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reload_app() -> (App, Entity) {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.insert_resource(BubbleAssets::empty());
        app.add_systems(Update, reload_launcher);

        let launcher = app
            .world_mut()
            .spawn((
                Launcher,
                LoadedBubble(None),
                ReloadTimer(Timer::from_seconds(0.25, TimerMode::Once)),
                Transform::default(),
            ))
            .id();
        (app, launcher)
    }

    fn advance(app: &mut App, secs: f32) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(secs));
        app.update();
    }

    fn visual_count(app: &mut App) -> usize {
        app.world_mut()
            .query_filtered::<Entity, With<LoadedBubbleVisual>>()
            .iter(app.world())
            .count()
    }

    #[test]
    fn test_reload_waits_for_delay() {
        let (mut app, launcher) = reload_app();

        advance(&mut app, 0.1);
        assert!(app.world().get::<LoadedBubble>(launcher).unwrap().0.is_none());
        assert_eq!(visual_count(&mut app), 0);

        advance(&mut app, 0.2);
        assert!(app.world().get::<LoadedBubble>(launcher).unwrap().0.is_some());
        assert_eq!(visual_count(&mut app), 1);
    }

    #[test]
    fn test_loaded_launcher_does_not_reload_again() {
        let (mut app, launcher) = reload_app();
        app.world_mut()
            .get_mut::<LoadedBubble>(launcher)
            .unwrap()
            .0 = Some(BubbleColor::Green);

        advance(&mut app, 1.0);

        assert_eq!(
            app.world().get::<LoadedBubble>(launcher).unwrap().0,
            Some(BubbleColor::Green)
        );
        assert_eq!(visual_count(&mut app), 0);
    }

    #[test]
    fn test_launcher_sits_at_bottom_centre() {
        assert_eq!(launcher_position(), Vec2::new(330.0, 450.0));
        assert_eq!(playfield_to_world(launcher_position()), Vec2::new(0.0, -210.0));
    }

    #[test]
    fn test_aim_direction_is_normalized() {
        let direction = aim_direction(Vec2::ZERO, Vec2::new(30.0, 40.0)).unwrap();
        assert!((direction - Vec2::new(0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn test_aim_at_launcher_itself_is_ignored() {
        assert!(aim_direction(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0)).is_none());
    }
}
