use grid::TilePos;

use crate::entity::Entity;
use crate::inventory::ItemKey;
use crate::kind::Kind;
use crate::world_grid::WorldGrid;

/// One named semantic layer of the observation tensor. `Item` covers the
/// "per-inventory-item" layers: the summed count of that item across whatever is sitting on a
/// tile (a resource node's remaining stock, a corpse's loot, ...).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Layer {
    /// 1 iff an agent of the observer's own team occupies the tile.
    Agent,
    /// The occupying agent's [`grid::Direction`] index + 1, or 0 if none.
    AgentOrientation,
    /// 1 iff *any* agent (any team) occupies the tile.
    ThingAgent,
    Wall,
    Magma,
    /// `teamId + 1` iff an Altar occupies the tile, else 0.
    Altar,
    AltarHearts,
    Tint,
    Item(ItemKey),
}

const FIXED_LAYERS: [Layer; 7] = [
    Layer::Agent,
    Layer::AgentOrientation,
    Layer::ThingAgent,
    Layer::Wall,
    Layer::Magma,
    Layer::Altar,
    Layer::AltarHearts,
];

const ITEM_LAYERS: [ItemKey; 15] = [
    ItemKey::Gold,
    ItemKey::Stone,
    ItemKey::Bar,
    ItemKey::Water,
    ItemKey::Wheat,
    ItemKey::Wood,
    ItemKey::Spear,
    ItemKey::Lantern,
    ItemKey::Armor,
    ItemKey::Bread,
    ItemKey::Fish,
    ItemKey::Plant,
    ItemKey::Meat,
    ItemKey::Relic,
    ItemKey::Hearts,
];

/// Total layer count: the fixed semantic layers, the Tint layer, and one layer per fixed item
/// key. Stable across reseeds.
pub const LAYER_COUNT: usize = FIXED_LAYERS.len() + 1 + ITEM_LAYERS.len();

fn layer_index(layer: Layer) -> usize {
    match layer {
        Layer::Tint => FIXED_LAYERS.len(),
        Layer::Item(key) => {
            let offset = ITEM_LAYERS.iter().position(|&k| k == key).unwrap_or(0);
            FIXED_LAYERS.len() + 1 + offset
        }
        other => FIXED_LAYERS
            .iter()
            .position(|&l| l == other)
            .expect("fixed layer not found"),
    }
}

/// Per-agent `[Layers, 2R+1, 2R+1]` observation slabs. Rebuilt wholesale once per tick per
/// live agent from current world state; see DESIGN.md for why this crate resolves "incremental
/// push" as an equivalent whole-window rebuild rather than wiring every mutation site.
pub struct ObservationBuffers {
    radius: i32,
    side: i32,
    windows: Vec<Vec<i32>>,
}

impl ObservationBuffers {
    pub fn new(max_agents: u32, radius: i32) -> Self {
        let side = radius * 2 + 1;
        let size = (side * side) as usize * LAYER_COUNT;
        Self {
            radius,
            side,
            windows: vec![vec![0; size]; max_agents as usize],
        }
    }

    pub fn window(&self, agent_id: u32) -> &[i32] {
        &self.windows[agent_id as usize]
    }

    pub fn side(&self) -> i32 {
        self.side
    }

    fn local_offset(&self, layer: Layer, lx: i32, ly: i32) -> usize {
        let plane = self.side * self.side;
        (layer_index(layer) as i32 * plane + ly * self.side + lx) as usize
    }

    /// Zeroes an agent's window, e.g. right after it dies.
    pub fn clear(&mut self, agent_id: u32) {
        self.windows[agent_id as usize].iter_mut().for_each(|v| *v = 0);
    }

    /// Recomputes the full window for `agent_id` centred on `centre`, reading world+entity
    /// state directly. `observer_team` distinguishes the `Agent` (own-team) layer from
    /// `ThingAgent` (any team).
    pub fn rebuild(
        &mut self,
        agent_id: u32,
        centre: TilePos,
        observer_team: u32,
        world: &WorldGrid,
        entity_at: impl Fn(TilePos, bool) -> Option<EntityLookup>,
    ) {
        let buf = &mut self.windows[agent_id as usize];
        buf.iter_mut().for_each(|v| *v = 0);

        for ly in 0..self.side {
            for lx in 0..self.side {
                let pos = TilePos::new(centre.x + lx - self.radius, centre.y + ly - self.radius);
                if !world.is_valid_pos(pos) {
                    continue;
                }

                if let Some(tint) = world.tint(pos) {
                    let code = tint.layer_code();
                    if code != 0 {
                        let off = ((layer_index(Layer::Tint)) as i32 * self.side * self.side
                            + ly * self.side
                            + lx) as usize;
                        buf[off] = code;
                    }
                }

                for blocking in [true, false] {
                    if let Some(lookup) = entity_at(pos, blocking) {
                        write_entity_layers(buf, self.side, lx, ly, observer_team, &lookup);
                    }
                }
            }
        }
    }
}

/// The subset of [`Entity`] fields the observation rebuild needs, decoupled from borrowing the
/// whole entity store while walking the grid.
pub struct EntityLookup {
    pub kind: Kind,
    pub team_id: Option<u32>,
    pub orientation_index: u8,
    pub hearts: u32,
    pub items: Vec<(ItemKey, u32)>,
}

impl EntityLookup {
    pub fn from_entity(e: &Entity) -> Self {
        Self {
            kind: e.kind,
            team_id: e.team_id,
            orientation_index: e.orientation as u8,
            hearts: e.hearts,
            items: e.inventory.iter().collect(),
        }
    }
}

fn write_entity_layers(
    buf: &mut [i32],
    side: i32,
    lx: i32,
    ly: i32,
    observer_team: u32,
    lookup: &EntityLookup,
) {
    let plane = side * side;
    let mut set = |layer: Layer, value: i32| {
        let off = (layer_index(layer) as i32 * plane + ly * side + lx) as usize;
        buf[off] = value;
    };

    if lookup.kind == Kind::Agent {
        set(Layer::ThingAgent, 1);
        if lookup.team_id == Some(observer_team) {
            set(Layer::Agent, 1);
            set(Layer::AgentOrientation, lookup.orientation_index as i32 + 1);
        }
    }
    if lookup.kind == Kind::Wall {
        set(Layer::Wall, 1);
    }
    if lookup.kind == Kind::Magma {
        set(Layer::Magma, 1);
    }
    if lookup.kind == Kind::Altar {
        set(Layer::Altar, lookup.team_id.map(|t| t as i32 + 1).unwrap_or(0));
        set(Layer::AltarHearts, lookup.hearts as i32);
    }
    for &(key, count) in &lookup.items {
        if ITEM_LAYERS.contains(&key) {
            set(Layer::Item(key), count as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    #[test]
    fn layer_indices_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for l in FIXED_LAYERS {
            assert!(seen.insert(layer_index(l)));
        }
        assert!(seen.insert(layer_index(Layer::Tint)));
        for key in ITEM_LAYERS {
            assert!(seen.insert(layer_index(Layer::Item(key))));
        }
        assert_eq!(seen.len(), LAYER_COUNT);
    }

    #[test]
    fn rebuild_centres_on_agent_and_respects_bounds() {
        let world = WorldGrid::new(&Map {
            width: 20,
            height: 20,
            border: 2,
        });
        let mut obs = ObservationBuffers::new(1, 2);
        obs.rebuild(0, TilePos::new(10, 10), 0, &world, |_, _| None);
        assert_eq!(obs.window(0).len(), LAYER_COUNT * 25);
    }

    #[test]
    fn clear_zeroes_the_window() {
        let mut obs = ObservationBuffers::new(1, 1);
        obs.windows[0][0] = 42;
        obs.clear(0);
        assert!(obs.window(0).iter().all(|&v| v == 0));
    }
}
