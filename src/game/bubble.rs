//! Bubble entities - the main game objects.
//!
//! A bubble is fired from the launcher in the `Moving` state, settles into
//! the grid exactly once, and is only ever removed by popping.

use bevy::prelude::*;
use rand::Rng;

use super::{cell::CellCoord, grid::BubbleGrid};

pub(super) fn plugin(app: &mut App) {
    app.register_type::<Bubble>();
    app.register_type::<BubbleColor>();
    app.register_type::<BubbleState>();
    app.register_type::<Velocity>();

    app.add_systems(Startup, load_bubble_assets);
}

/// The bubble palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Default)]
pub enum BubbleColor {
    #[default]
    Red,
    Blue,
    Green,
    Yellow,
}

impl BubbleColor {
    /// Every color in the palette.
    pub const ALL: [BubbleColor; 4] = [
        BubbleColor::Red,
        BubbleColor::Blue,
        BubbleColor::Green,
        BubbleColor::Yellow,
    ];

    /// Get the actual color for rendering.
    pub fn to_color(self) -> Color {
        match self {
            BubbleColor::Red => Color::srgb(0.9, 0.2, 0.2),
            BubbleColor::Blue => Color::srgb(0.2, 0.4, 0.9),
            BubbleColor::Green => Color::srgb(0.2, 0.8, 0.3),
            BubbleColor::Yellow => Color::srgb(0.95, 0.85, 0.2),
        }
    }

    /// Get a uniformly random bubble color.
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    /// Draw a color from the given rng.
    pub fn random_with(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A bubble entity and its color.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Bubble {
    pub color: BubbleColor,
}

/// Where a bubble is in its lifecycle.
///
/// `Moving -> Settled` happens once; nothing goes back to `Moving`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect, Default)]
#[reflect(Component)]
pub enum BubbleState {
    #[default]
    Moving,
    /// Immovable, parked on this cell.
    Settled(CellCoord),
}

impl BubbleState {
    pub fn is_moving(&self) -> bool {
        matches!(self, BubbleState::Moving)
    }
}

/// World-space velocity in pixels per second.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Velocity(pub Vec2);

/// Shared mesh and per-color materials for drawing bubbles.
#[derive(Resource)]
pub struct BubbleAssets {
    pub mesh: Handle<Mesh>,
    materials: [Handle<ColorMaterial>; 4],
}

impl BubbleAssets {
    pub fn material(&self, color: BubbleColor) -> Handle<ColorMaterial> {
        self.materials[color.index()].clone()
    }

    /// Assets with empty handles, for apps without a renderer.
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            mesh: Handle::default(),
            materials: std::array::from_fn(|_| Handle::default()),
        }
    }
}

/// Build the bubble mesh and materials - must run before anything spawns bubbles.
pub fn load_bubble_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    grid: Res<BubbleGrid>,
) {
    // Slightly smaller than the cell so neighbors don't touch.
    let radius = grid.layout().bubble_radius() * 0.95;
    let mesh = meshes.add(Circle::new(radius));
    let handles = BubbleColor::ALL
        .map(|color| materials.add(ColorMaterial::from_color(color.to_color())));

    commands.insert_resource(BubbleAssets {
        mesh,
        materials: handles,
    });
}

/// Spawn a moving bubble at a world position.
pub fn spawn_moving_bubble(
    commands: &mut Commands,
    assets: &BubbleAssets,
    position: Vec2,
    velocity: Vec2,
    color: BubbleColor,
) -> Entity {
    commands
        .spawn((
            Name::new(format!("Bubble {:?}", color)),
            Bubble { color },
            BubbleState::Moving,
            Velocity(velocity),
            Transform::from_translation(position.extend(0.0)),
            Mesh2d(assets.mesh.clone()),
            MeshMaterial2d(assets.material(color)),
        ))
        .id()
}
