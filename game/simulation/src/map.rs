use rand::rngs::SmallRng;
use rand::Rng;

use config::SimConfig;
use grid::TilePos;

use crate::entity::Entity;
use crate::kind::Kind;
use crate::store::EntityStore;
use crate::terrain::Terrain;
use crate::world_grid::WorldGrid;

/// What a [`MapBuilder`] hands back to the engine: the populated grid plus each team's altar
/// position (the respawn anchor and spiral-search base for every agent on that team).
pub struct MapLayout {
    pub world: WorldGrid,
    pub team_altars: Vec<TilePos>,
}

/// The out-of-scope procedural map generator's stable boundary: terrain/biome painting,
/// river carving and structure-seeding heuristics live outside this crate. A real generator
/// implements this trait; [`DefaultMapBuilder`] is the minimal deterministic stand-in that makes
/// `reset()` produce a playable map without one.
pub trait MapBuilder {
    fn build(&self, rng: &mut SmallRng, cfg: &SimConfig, store: &mut EntityStore) -> MapLayout;
}

/// Walls the border, scatters a fixed density of resource nodes via the seeded RNG, and places
/// one Altar per team at rotationally-symmetric positions around the map centre. No biome
/// painting, no rivers: just enough to drive the bundled tests and runner.
pub struct DefaultMapBuilder {
    /// Resource nodes placed per 100 playable tiles.
    pub resource_density: u32,
}

impl Default for DefaultMapBuilder {
    fn default() -> Self {
        Self { resource_density: 4 }
    }
}

const RESOURCE_KINDS: [Kind; 4] = [Kind::Tree, Kind::Stone, Kind::Gold, Kind::Wheat];
const WILDLIFE_KINDS: [Kind; 3] = [Kind::Cow, Kind::Wolf, Kind::Bear];

impl DefaultMapBuilder {
    fn wall_border(&self, world: &mut WorldGrid, store: &mut EntityStore) {
        for y in 0..world.height() {
            for x in 0..world.width() {
                let pos = TilePos::new(x, y);
                if !world.is_playable(pos) {
                    let wall = Entity::new(Kind::Wall, pos, u32::MAX);
                    let id = store.add(wall);
                    world.place(pos, id, Kind::Wall);
                }
            }
        }
    }

    fn scatter_resources(&self, world: &mut WorldGrid, store: &mut EntityStore, rng: &mut SmallRng) {
        let playable_area = ((world.width() - 2) * (world.height() - 2)).max(0);
        let count = (playable_area as u32 * self.resource_density / 100) as usize;
        let mut placed = 0;
        let mut attempts = 0;
        while placed < count && attempts < count * 20 + 100 {
            attempts += 1;
            let x = rng.gen_range(0..world.width());
            let y = rng.gen_range(0..world.height());
            let pos = TilePos::new(x, y);
            if !world.is_playable(pos) || world.blocking_at(pos).is_some() || world.background_at(pos).is_some() {
                continue;
            }
            let kind = RESOURCE_KINDS[rng.gen_range(0..RESOURCE_KINDS.len())];
            let mut node = Entity::new(kind, pos, 1);
            node.inventory.add(resource_item(kind), 20, 20);
            let id = store.add(node);
            world.place(pos, id, kind);
            placed += 1;
        }
    }

    /// Scatters a handful of Magma deposits (the Gold->Bar smelting site) and wildlife (cows,
    /// wolves, bears) so the spawner/tumor and wildlife AI phases have something to act on in the
    /// bundled runner and integration tests, without this crate taking on real biome placement
    /// (still out of scope for this crate).
    fn scatter_magma_and_wildlife(&self, world: &mut WorldGrid, store: &mut EntityStore, rng: &mut SmallRng) {
        let playable_area = ((world.width() - 2) * (world.height() - 2)).max(0) as u32;
        let magma_count = (playable_area / 300).max(1);
        let wildlife_count = (playable_area / 150).max(2);

        let mut place_one = |kind: Kind, store: &mut EntityStore, world: &mut WorldGrid, rng: &mut SmallRng| {
            for _ in 0..40 {
                let x = rng.gen_range(0..world.width());
                let y = rng.gen_range(0..world.height());
                let pos = TilePos::new(x, y);
                if !world.is_playable(pos) || world.blocking_at(pos).is_some() || world.background_at(pos).is_some() {
                    continue;
                }
                let max_hp = if kind == Kind::Magma { 1 } else { 10 };
                let entity = Entity::new(kind, pos, max_hp);
                let id = store.add(entity);
                world.place(pos, id, kind);
                return;
            }
        };

        for _ in 0..magma_count {
            place_one(Kind::Magma, store, world, rng);
        }
        for i in 0..wildlife_count {
            let kind = WILDLIFE_KINDS[i as usize % WILDLIFE_KINDS.len()];
            place_one(kind, store, world, rng);
        }
    }

    /// Places a single enemy Spawner near the map centre so the spawner/tumor phase has an
    /// entity to drive in a default-built map (real spawner placement is a map-generation concern
    /// out of scope for this crate).
    fn place_spawner(&self, world: &mut WorldGrid, store: &mut EntityStore, rng: &mut SmallRng) {
        let centre = TilePos::new(world.width() / 2, world.height() / 2);
        for _ in 0..40 {
            let dx = rng.gen_range(-6..=6);
            let dy = rng.gen_range(-6..=6);
            let pos = world.clamp_to_playable(TilePos::new(centre.x + dx, centre.y + dy));
            if !world.is_playable(pos) || world.blocking_at(pos).is_some() {
                continue;
            }
            let spawner = Entity::new(Kind::Spawner, pos, 20);
            let id = store.add(spawner);
            world.place(pos, id, Kind::Spawner);
            return;
        }
    }

    /// Rotationally-symmetric team starting positions around the map centre, at a fixed offset
    /// from it so no two teams' altars can ever coincide.
    fn team_positions(&self, world: &WorldGrid, team_count: u32) -> Vec<TilePos> {
        let centre = TilePos::new(world.width() / 2, world.height() / 2);
        let radius = ((world.width().min(world.height())) / 2 - world.height().min(world.width()) / 8).max(4);
        (0..team_count)
            .map(|i| {
                let angle = std::f64::consts::TAU * (i as f64) / (team_count.max(1) as f64);
                let dx = (angle.cos() * radius as f64).round() as i32;
                let dy = (angle.sin() * radius as f64).round() as i32;
                world.clamp_to_playable(TilePos::new(centre.x + dx, centre.y + dy))
            })
            .collect()
    }
}

fn resource_item(kind: Kind) -> crate::inventory::ItemKey {
    use crate::inventory::ItemKey;
    match kind {
        Kind::Tree => ItemKey::Wood,
        Kind::Stone => ItemKey::Stone,
        Kind::Gold => ItemKey::Gold,
        Kind::Wheat => ItemKey::Wheat,
        _ => ItemKey::Wood,
    }
}

impl MapBuilder for DefaultMapBuilder {
    fn build(&self, rng: &mut SmallRng, cfg: &SimConfig, store: &mut EntityStore) -> MapLayout {
        let mut world = WorldGrid::new(&cfg.map);
        for y in 0..world.height() {
            for x in 0..world.width() {
                world.set_terrain(TilePos::new(x, y), Terrain::Grass);
            }
        }

        self.wall_border(&mut world, store);
        self.scatter_resources(&mut world, store, rng);
        self.scatter_magma_and_wildlife(&mut world, store, rng);
        self.place_spawner(&mut world, store, rng);

        let mut team_altars = Vec::with_capacity(cfg.teams.team_count as usize);
        for (team, pos) in self.team_positions(&world, cfg.teams.team_count).into_iter().enumerate() {
            let mut altar = Entity::new(Kind::Altar, pos, u32::MAX);
            altar.team_id = Some(team as u32);
            altar.hearts = cfg.economy.altar_hearts_target / 2;
            let id = store.add(altar);
            world.place(pos, id, Kind::Altar);
            team_altars.push(pos);
        }

        MapLayout { world, team_altars }
    }
}
