use rand::Rng;

use common::newtype::Proportion;
use grid::TilePos;

use crate::entity::Entity;
use crate::kind::Kind;
use crate::store::EntityStore;
use crate::tint::TintKind;
use crate::world_grid::WorldGrid;

/// Per-spawner state the engine mutates each tick: a cooldown to the next spawn attempt
/// and the number of tumors this spawner currently has alive, capped locally.
#[derive(Clone, Debug)]
pub struct SpawnerState {
    pub cooldown: u32,
    pub cooldown_max: u32,
    pub tumor_cap: u32,
    pub tumors_spawned: u32,
}

impl SpawnerState {
    pub fn new(cooldown_max: u32, tumor_cap: u32) -> Self {
        Self {
            cooldown: cooldown_max,
            cooldown_max,
            tumor_cap,
            tumors_spawned: 0,
        }
    }
}

/// Runs the spawner/tumor phase for one spawner: on cooldown expiry, attempts to
/// spawn a Tumor on an empty adjacent tile and apply the frozen purple tint there. Tumors
/// passively re-extend the frozen tint on their own neighbourhood, freezing any occupants.
pub fn tick_spawner(
    store: &mut EntityStore,
    world: &mut WorldGrid,
    rng: &mut impl Rng,
    state: &mut SpawnerState,
    spawner_pos: TilePos,
    frozen_ticks: u32,
) {
    if state.cooldown > 0 {
        state.cooldown -= 1;
        return;
    }
    state.cooldown = state.cooldown_max;

    if state.tumors_spawned >= state.tumor_cap {
        return;
    }

    let mut candidates: Vec<TilePos> = spawner_pos
        .neighbours8()
        .into_iter()
        .filter(|&p| {
            world.is_valid_pos(p) && !world.terrain(p).is_blocked() && world.blocking_at(p).is_none()
        })
        .collect();
    if candidates.is_empty() {
        return;
    }
    candidates.sort_by_key(|p| (p.x, p.y)); // deterministic order before the seeded pick
    let chosen = candidates[rng.gen_range(0..candidates.len())];

    let mut tumor = store
        .try_recycle(Kind::Tumor)
        .unwrap_or_else(|| Entity::new(Kind::Tumor, chosen, 10));
    tumor.pos = chosen;
    tumor.hp = Proportion::full(10);
    let id = store.add(tumor);
    world.place(chosen, id, Kind::Tumor);
    if let Some(tint) = world.tint_mut(chosen) {
        tint.apply(TintKind::Frozen, frozen_ticks);
    }
    state.tumors_spawned += 1;
}

/// Tumors extend the frozen tint radius-1 around themselves every tick.
pub fn tick_tumor_freeze(world: &mut WorldGrid, tumor_pos: TilePos, frozen_ticks: u32) {
    for pos in tumor_pos.neighbours8().into_iter().chain([tumor_pos]) {
        if let Some(tint) = world.tint_mut(pos) {
            if !tint.is_frozen() {
                tint.apply(TintKind::Frozen, frozen_ticks);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn spawner_waits_out_its_cooldown() {
        let mut store = EntityStore::new(2);
        let mut world = WorldGrid::new(&Map { width: 20, height: 20, border: 2 });
        let mut rng = SmallRng::seed_from_u64(0);
        let mut state = SpawnerState::new(2, 10);

        tick_spawner(&mut store, &mut world, &mut rng, &mut state, TilePos::new(10, 10), 5);
        assert_eq!(store.of_kind(Kind::Tumor).count(), 0);
        tick_spawner(&mut store, &mut world, &mut rng, &mut state, TilePos::new(10, 10), 5);
        tick_spawner(&mut store, &mut world, &mut rng, &mut state, TilePos::new(10, 10), 5);
        assert_eq!(store.of_kind(Kind::Tumor).count(), 1);
    }

    #[test]
    fn tumor_cap_stops_further_spawns() {
        let mut store = EntityStore::new(2);
        let mut world = WorldGrid::new(&Map { width: 20, height: 20, border: 2 });
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = SpawnerState::new(1, 1);

        tick_spawner(&mut store, &mut world, &mut rng, &mut state, TilePos::new(10, 10), 5);
        tick_spawner(&mut store, &mut world, &mut rng, &mut state, TilePos::new(10, 10), 5);
        assert_eq!(store.of_kind(Kind::Tumor).count(), 1);
    }
}
