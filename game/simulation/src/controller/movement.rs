use rand::Rng;

use ai::AStar;
use grid::{Direction, TilePos};

use crate::entity::{EntityId, Entity};
use crate::kind::Kind;
use crate::store::EntityStore;
use crate::world_grid::WorldGrid;

/// `getMoveTowards`: prefers the Chebyshev direction toward `to` (clamped into the map
/// rectangle by the caller beforehand), falling back to the direction minimizing Chebyshev
/// distance among enterable neighbours, then any enterable neighbour, then a random direction.
/// `avoid` is honoured unless every alternative is blocked.
pub fn get_move_towards(
    from: TilePos,
    to: TilePos,
    avoid: Option<Direction>,
    mut can_enter: impl FnMut(Direction) -> bool,
    rng: &mut impl Rng,
) -> Option<Direction> {
    if let Some(preferred) = Direction::from_delta(to.x - from.x, to.y - from.y) {
        if Some(preferred) != avoid && can_enter(preferred) {
            return Some(preferred);
        }
    }

    // fall back to whichever enterable neighbour (honouring `avoid` first) minimizes Chebyshev
    // distance to `to`
    let mut ranked: Vec<Direction> = Direction::ALL.into_iter().filter(|&d| Some(d) != avoid && can_enter(d)).collect();
    ranked.sort_by_key(|&d| from.translated(d).chebyshev_distance(to));
    if let Some(&best) = ranked.first() {
        return Some(best);
    }

    // `avoid` exhausted every alternative: allow it after all
    if let Some(dir) = avoid {
        if can_enter(dir) {
            return Some(dir);
        }
    }

    let any: Vec<Direction> = Direction::ALL.into_iter().filter(|&d| can_enter(d)).collect();
    if !any.is_empty() {
        return Some(any[rng.gen_range(0..any.len())]);
    }

    None
}

/// `findPath`: A* on the 8-connected grid, goal is `target` if passable else any passable
/// 8-neighbour of `target`. Returns `None` (the controller falls back to greedy movement) when the
/// 250-node cap is exceeded or no goal is reachable.
pub fn find_path(
    world: &WorldGrid,
    store: &EntityStore,
    agent_team: u32,
    from: TilePos,
    target: TilePos,
    node_cap: u32,
) -> Option<Vec<TilePos>> {
    let entity_kind = |id: EntityId| store.get(id).map(|e: &Entity| e.kind);
    let door_team = |id: EntityId| store.get(id).and_then(|e| e.team_id);

    let target_passable = world.is_passable(target, Some(agent_team), entity_kind);
    let goals: Vec<TilePos> = if target_passable {
        vec![target]
    } else {
        target
            .neighbours8()
            .into_iter()
            .filter(|&p| world.is_passable(p, Some(agent_team), entity_kind))
            .collect()
    };
    if goals.is_empty() {
        return None;
    }

    let astar = AStar::new(node_cap);
    astar.find_path(
        from,
        |p| goals.contains(&p),
        |p| {
            p.neighbours8()
                .into_iter()
                .filter(|&n| world.can_enter(p, n, agent_team, door_team, entity_kind))
                .collect()
        },
        |p| goals.iter().map(|&g| p.chebyshev_distance(g)).min().unwrap_or(0),
    )
}

/// Attempts to move `agent_id` one tile in `dir`; returns `true` if the position actually changed.
pub fn try_move(store: &mut EntityStore, world: &mut WorldGrid, agent_id: EntityId, dir: Direction) -> bool {
    let Some(agent) = store.get(agent_id) else {
        return false;
    };
    let from = agent.pos;
    let team = agent.team_id.unwrap_or(u32::MAX);
    let kind = agent.kind;
    let to = from.translated(dir);

    let entity_kind = |id: EntityId| store.get(id).map(|e| e.kind);
    let door_team = |id: EntityId| store.get(id).and_then(|e| e.team_id);
    if !world.can_enter(from, to, team, door_team, entity_kind) {
        return false;
    }

    if let Some(lantern_id) = world.blocking_at(to) {
        if store.get(lantern_id).map(|e| e.kind) == Some(Kind::Lantern) {
            if let Some(push_to) = world.lantern_push_target(from, to) {
                world.clear(to, Kind::Lantern);
                world.place(push_to, lantern_id, Kind::Lantern);
                if let Some(lantern) = store.get_mut(lantern_id) {
                    lantern.pos = push_to;
                }
            } else {
                return false;
            }
        }
    }

    world.clear(from, kind);
    world.place(to, agent_id, kind);
    if let Some(agent) = store.get_mut(agent_id) {
        agent.pos = to;
        agent.orientation = dir;
    }
    true
}
