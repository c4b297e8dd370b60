use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use grid::TilePos;

/// A* on the 8-connected grid with a Chebyshev heuristic and a hard explored-node cap. The cap is
/// a policy, not an optimisation, so it is never relaxed even when a path is known to exist just
/// beyond it.
pub struct AStar {
    node_cap: u32,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
struct Frontier {
    f_score: i32,
    insertion_order: u32,
    pos: TilePos,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the lowest f-score out first, and ties broken by
        // earliest insertion (first-found), so reverse both comparisons.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AStar {
    pub fn new(node_cap: u32) -> Self {
        Self { node_cap }
    }

    /// Finds a path from `from` to a tile satisfying `is_goal`, expanding neighbours via
    /// `neighbours` (expected to yield only passable tiles). Returns `None` if the cap is
    /// exceeded or the frontier is exhausted with no goal found. The returned path includes both
    /// endpoints.
    pub fn find_path(
        &self,
        from: TilePos,
        mut is_goal: impl FnMut(TilePos) -> bool,
        mut neighbours: impl FnMut(TilePos) -> Vec<TilePos>,
        mut heuristic: impl FnMut(TilePos) -> i32,
    ) -> Option<Vec<TilePos>> {
        if is_goal(from) {
            return Some(vec![from]);
        }

        let mut open = BinaryHeap::new();
        let mut came_from: HashMap<TilePos, TilePos> = HashMap::default();
        let mut g_score: HashMap<TilePos, i32> = HashMap::default();
        let mut insertion_counter = 0u32;

        g_score.insert(from, 0);
        open.push(Frontier {
            f_score: heuristic(from),
            insertion_order: insertion_counter,
            pos: from,
        });

        let mut explored = 0u32;

        while let Some(Frontier { pos: current, .. }) = open.pop() {
            if is_goal(current) {
                return Some(reconstruct_path(&came_from, current));
            }

            explored += 1;
            if explored > self.node_cap {
                return None;
            }

            let current_g = g_score[&current];
            for next in neighbours(current) {
                let tentative_g = current_g + 1;
                let better = match g_score.get(&next) {
                    Some(&existing) => tentative_g < existing,
                    None => true,
                };
                if better {
                    came_from.insert(next, current);
                    g_score.insert(next, tentative_g);
                    insertion_counter += 1;
                    open.push(Frontier {
                        f_score: tentative_g + heuristic(next),
                        insertion_order: insertion_counter,
                        pos: next,
                    });
                }
            }
        }

        None
    }
}

fn reconstruct_path(came_from: &HashMap<TilePos, TilePos>, mut current: TilePos) -> Vec<TilePos> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid::TileGrid;

    fn open_field_neighbours(pos: TilePos, bounds: &TileGrid<bool>) -> Vec<TilePos> {
        pos.neighbours8()
            .into_iter()
            .filter(|p| bounds.in_bounds(*p) && !bounds[*p])
            .collect()
    }

    #[test]
    fn finds_direct_path_in_open_field() {
        let bounds = TileGrid::<bool>::new(10, 10); // all false = all passable
        let astar = AStar::new(250);
        let from = TilePos::new(0, 0);
        let to = TilePos::new(5, 5);
        let path = astar
            .find_path(
                from,
                |p| p == to,
                |p| open_field_neighbours(p, &bounds),
                |p| p.chebyshev_distance(to),
            )
            .unwrap();
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        // chebyshev-optimal: 5 steps + start = 6 positions
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn respects_node_cap() {
        // a maze forcing a long detour: wall everything except a single-tile-wide spiral
        let mut bounds = TileGrid::<bool>::new(40, 40);
        for (pos, blocked) in bounds.iter_mut() {
            // block everything except a thin snake corridor along y=0 then a dead zigzag,
            // guaranteeing any route to the far corner requires far more than 250 expansions
            *blocked = !(pos.y == 0 || pos.x == 39);
        }
        let astar = AStar::new(5); // tiny cap to force failure deterministically
        let from = TilePos::new(0, 1);
        let to = TilePos::new(39, 39);
        let result = astar.find_path(
            from,
            |p| p == to,
            |p| open_field_neighbours(p, &bounds),
            |p| p.chebyshev_distance(to),
        );
        assert!(result.is_none());
    }

    #[test]
    fn no_path_when_goal_unreachable() {
        let mut bounds = TileGrid::<bool>::new(5, 5);
        // wall off column 2 entirely, splitting the grid
        for y in 0..5 {
            bounds[TilePos::new(2, y)] = true;
        }
        let astar = AStar::new(250);
        let result = astar.find_path(
            TilePos::new(0, 0),
            |p| p == TilePos::new(4, 4),
            |p| open_field_neighbours(p, &bounds),
            |p| p.chebyshev_distance(TilePos::new(4, 4)),
        );
        assert!(result.is_none());
    }
}
