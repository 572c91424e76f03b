//! Cluster detection - finding and popping matching bubbles.
//!
//! Flood fills over the four orthogonal neighbors to find the connected group
//! of same-colored bubbles around a freshly settled one. Groups of 3+ pop.

use bevy::prelude::*;
use std::collections::HashSet;

use super::{
    bubble::BubbleColor,
    cell::CellCoord,
    grid::BubbleGrid,
    settle::{BubbleSettled, SettleSystems},
};
use crate::{AppSystems, PausableSystems};

pub(super) fn plugin(app: &mut App) {
    app.add_message::<ClusterPopped>();

    app.configure_sets(Update, ClusterSystems.after(SettleSystems));

    app.add_systems(
        Update,
        pop_clusters
            .in_set(ClusterSystems)
            .in_set(AppSystems::Update)
            .in_set(PausableSystems),
    );
}

/// System set for cluster detection systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterSystems;

/// Minimum cluster size to pop (match-3).
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Message sent when a cluster is popped.
#[derive(Message, Debug, Clone)]
pub struct ClusterPopped {
    pub cells: Vec<CellCoord>,
    pub color: BubbleColor,
    pub count: usize,
}

/// A connected same-color group found by [`find_cluster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub color: BubbleColor,
    pub members: Vec<CellCoord>,
    /// How many distinct in-bounds cells the search touched.
    pub visited: usize,
}

/// Bubbles taken out of the grid by [`resolve_pop`].
#[derive(Debug, Clone)]
pub struct PoppedCluster {
    pub color: BubbleColor,
    pub bubbles: Vec<(CellCoord, Entity)>,
}

/// Find all connected bubbles sharing the color of the bubble at `start`.
///
/// Returns `None` when `start` holds no bubble. Uses an explicit stack, so
/// grid size never limits recursion depth.
pub fn find_cluster(grid: &BubbleGrid, start: CellCoord) -> Option<Cluster> {
    let layout = grid.layout();
    let color = grid.get(start)?.color;

    let mut members = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![start];

    while let Some(coord) = stack.pop() {
        if !layout.contains(coord) || !visited.insert(coord) {
            continue;
        }

        match grid.get(coord) {
            Some(occupant) if occupant.color == color => {
                members.push(coord);
                stack.extend(coord.neighbors());
            }
            _ => {}
        }
    }

    Some(Cluster {
        color,
        members,
        visited: visited.len(),
    })
}

/// Pop the cluster around `start` if it is big enough.
///
/// Every member is removed from the grid before returning; the caller owns
/// despawning the returned entities.
pub fn resolve_pop(grid: &mut BubbleGrid, start: CellCoord) -> Option<PoppedCluster> {
    let cluster = find_cluster(grid, start)?;
    debug!(
        "Cluster at {} has {} members, {} cells searched",
        start,
        cluster.members.len(),
        cluster.visited
    );
    if cluster.members.len() < MIN_CLUSTER_SIZE {
        return None;
    }

    let bubbles = cluster
        .members
        .iter()
        .filter_map(|&coord| grid.remove(coord).map(|occupant| (coord, occupant.entity)))
        .collect();

    Some(PoppedCluster {
        color: cluster.color,
        bubbles,
    })
}

/// Pop clusters around bubbles that just settled.
pub(super) fn pop_clusters(
    mut commands: Commands,
    mut grid: ResMut<BubbleGrid>,
    mut settled_events: MessageReader<BubbleSettled>,
    mut popped_events: MessageWriter<ClusterPopped>,
) {
    for event in settled_events.read() {
        // An earlier pop in this batch may already have taken this bubble.
        if grid.get(event.cell).map(|o| o.entity) != Some(event.entity) {
            debug!("Bubble {:?} already popped, skipping", event.entity);
            continue;
        }

        let Some(popped) = resolve_pop(&mut grid, event.cell) else {
            continue;
        };

        info!(
            "Popped cluster of {} {:?} bubbles at {}",
            popped.bubbles.len(),
            popped.color,
            event.cell
        );

        for &(_, entity) in &popped.bubbles {
            commands.entity(entity).despawn();
        }

        let cells: Vec<CellCoord> = popped.bubbles.iter().map(|&(coord, _)| coord).collect();
        popped_events.write(ClusterPopped {
            count: cells.len(),
            cells,
            color: popped.color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{cell::GridLayout, grid::Occupant};

    struct Fixture {
        world: World,
        grid: BubbleGrid,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                grid: BubbleGrid::default(),
            }
        }

        fn with_layout(layout: GridLayout) -> Self {
            Self {
                world: World::new(),
                grid: BubbleGrid::new(layout),
            }
        }

        fn put(&mut self, row: i32, column: i32, color: BubbleColor) -> Entity {
            let entity = self.world.spawn_empty().id();
            self.grid
                .place(CellCoord::new(row, column), Occupant { entity, color })
                .unwrap();
            entity
        }
    }

    #[test]
    fn test_three_in_a_row_pops_and_neighbor_remains() {
        let mut f = Fixture::new();
        f.put(2, 3, BubbleColor::Red);
        f.put(2, 4, BubbleColor::Red);
        f.put(2, 5, BubbleColor::Red);
        let blue = f.put(2, 6, BubbleColor::Blue);

        let popped = resolve_pop(&mut f.grid, CellCoord::new(2, 4)).unwrap();

        assert_eq!(popped.color, BubbleColor::Red);
        assert_eq!(popped.bubbles.len(), 3);
        for column in 3..=5 {
            assert!(!f.grid.is_occupied(CellCoord::new(2, column)));
        }
        assert_eq!(f.grid.get(CellCoord::new(2, 6)).map(|o| o.entity), Some(blue));
        assert_eq!(f.grid.len(), 1);
    }

    #[test]
    fn test_gap_breaks_group() {
        let mut f = Fixture::new();
        f.put(2, 3, BubbleColor::Red);
        f.put(2, 5, BubbleColor::Red);

        assert!(resolve_pop(&mut f.grid, CellCoord::new(2, 3)).is_none());
        assert!(resolve_pop(&mut f.grid, CellCoord::new(2, 5)).is_none());
        assert_eq!(f.grid.len(), 2);

        let cluster = find_cluster(&f.grid, CellCoord::new(2, 3)).unwrap();
        assert_eq!(cluster.members, vec![CellCoord::new(2, 3)]);
    }

    #[test]
    fn test_pair_never_pops() {
        let mut f = Fixture::new();
        f.put(0, 0, BubbleColor::Green);
        f.put(1, 0, BubbleColor::Green);

        assert!(resolve_pop(&mut f.grid, CellCoord::new(1, 0)).is_none());
        assert_eq!(f.grid.len(), 2);
    }

    #[test]
    fn test_l_shape_of_three_pops() {
        let mut f = Fixture::new();
        f.put(4, 4, BubbleColor::Yellow);
        f.put(5, 4, BubbleColor::Yellow);
        f.put(5, 5, BubbleColor::Yellow);

        let popped = resolve_pop(&mut f.grid, CellCoord::new(4, 4)).unwrap();
        assert_eq!(popped.bubbles.len(), 3);
        assert!(f.grid.is_empty());
    }

    #[test]
    fn test_diagonals_do_not_connect() {
        let mut f = Fixture::new();
        f.put(3, 3, BubbleColor::Blue);
        f.put(4, 4, BubbleColor::Blue);
        f.put(5, 5, BubbleColor::Blue);

        let cluster = find_cluster(&f.grid, CellCoord::new(4, 4)).unwrap();
        assert_eq!(cluster.members.len(), 1);
        assert!(resolve_pop(&mut f.grid, CellCoord::new(4, 4)).is_none());
    }

    #[test]
    fn test_other_color_neither_included_nor_blocking() {
        let mut f = Fixture::new();
        // Four reds in a square with a blue hanging off one corner.
        f.put(1, 1, BubbleColor::Red);
        f.put(1, 2, BubbleColor::Red);
        f.put(2, 1, BubbleColor::Red);
        f.put(2, 2, BubbleColor::Red);
        let blue = f.put(2, 3, BubbleColor::Blue);

        let cluster = find_cluster(&f.grid, CellCoord::new(1, 1)).unwrap();
        assert_eq!(cluster.members.len(), 4);
        assert!(!cluster.members.contains(&CellCoord::new(2, 3)));

        let popped = resolve_pop(&mut f.grid, CellCoord::new(1, 1)).unwrap();
        assert_eq!(popped.bubbles.len(), 4);
        assert_eq!(f.grid.len(), 1);
        assert_eq!(f.grid.get(CellCoord::new(2, 3)).map(|o| o.entity), Some(blue));
    }

    #[test]
    fn test_removed_bubbles_are_not_queryable() {
        let mut f = Fixture::new();
        let a = f.put(7, 0, BubbleColor::Red);
        let b = f.put(7, 1, BubbleColor::Red);
        let c = f.put(7, 2, BubbleColor::Red);

        let popped = resolve_pop(&mut f.grid, CellCoord::new(7, 2)).unwrap();

        let mut entities: Vec<Entity> = popped.bubbles.iter().map(|&(_, e)| e).collect();
        entities.sort();
        let mut expected = vec![a, b, c];
        expected.sort();
        assert_eq!(entities, expected);
        assert!(f.grid.iter().all(|(_, o)| !expected.contains(&o.entity)));
    }

    #[test]
    fn test_full_grid_visits_each_cell_once() {
        let layout = GridLayout {
            rows: 6,
            columns: 7,
            ..default()
        };
        let mut f = Fixture::with_layout(layout);
        for coord in layout.iter() {
            f.put(coord.row, coord.column, BubbleColor::Green);
        }

        let cluster = find_cluster(&f.grid, CellCoord::new(3, 3)).unwrap();

        assert_eq!(cluster.members.len(), layout.cell_count());
        assert_eq!(cluster.visited, layout.cell_count());
    }

    #[test]
    fn test_visited_bounded_by_grid_size() {
        let mut f = Fixture::new();
        // A ring of reds with a cycle in the adjacency graph.
        for (row, column) in [(1, 1), (1, 2), (1, 3), (2, 1), (2, 3), (3, 1), (3, 2), (3, 3)] {
            f.put(row, column, BubbleColor::Red);
        }

        let cluster = find_cluster(&f.grid, CellCoord::new(1, 1)).unwrap();

        assert_eq!(cluster.members.len(), 8);
        assert!(cluster.visited <= f.grid.layout().cell_count());
        // Each member is reported once despite the cycle.
        let unique: HashSet<CellCoord> = cluster.members.iter().copied().collect();
        assert_eq!(unique.len(), cluster.members.len());
    }

    #[test]
    fn test_empty_start_finds_nothing() {
        let f = Fixture::new();
        assert!(find_cluster(&f.grid, CellCoord::new(0, 0)).is_none());
        assert!(find_cluster(&f.grid, CellCoord::new(-3, 99)).is_none());
    }

    #[test]
    fn test_corner_cluster_ignores_out_of_bounds_neighbors() {
        let mut f = Fixture::new();
        f.put(0, 0, BubbleColor::Blue);
        f.put(0, 1, BubbleColor::Blue);
        f.put(1, 0, BubbleColor::Blue);

        let cluster = find_cluster(&f.grid, CellCoord::new(0, 0)).unwrap();
        assert_eq!(cluster.members.len(), 3);
        // Only in-bounds cells count as visited: the 3 members and their 3
        // empty in-bounds neighbors (0,2), (1,1), (2,0).
        assert_eq!(cluster.visited, 6);
    }
}
