use ahash::AHashMap;

use common::newtype::Proportion;
use grid::{Direction, TilePos, DEAD_SENTINEL};

use crate::inventory::Inventory;
use crate::kind::Kind;

/// Combat/production category an agent or structure belongs to, used by the bonus-damage matrix
/// and the blacksmith attack/armor tier bonuses.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnitClass {
    Villager,
    Monk,
    Infantry,
    Archer,
    Cavalry,
    Siege,
}

impl UnitClass {
    /// The ranged-scan distance `combat::resolve_attack` uses for this class; `0` means melee
    /// (single forward tile, or the spear wedge if the unit is carrying one).
    pub fn base_range(self) -> u32 {
        match self {
            UnitClass::Archer => 4,
            UnitClass::Siege => 6,
            _ => 0,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Stance {
    #[default]
    Aggressive,
    Defensive,
    HoldGround,
    NoAttack,
}

/// A single slot in a building's production queue: the kind being trained/built and ticks left.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ProductionOrder {
    pub output: Kind,
    pub ticks_remaining: u32,
}

/// A stable handle into [`crate::store::EntityStore`]: a slot index plus a generation counter so
/// a handle pointing at a removed-and-reused slot is detectably stale — the generational-slot-map
/// pattern.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct EntityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// A uniform entity ("thing") record, tagged by [`Kind`]. Carries every attribute the core reads
/// across all kinds rather than branching into per-kind component sets.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub pos: TilePos,
    pub team_id: Option<u32>,
    pub kind: Kind,
    pub orientation: Direction,
    pub hp: Proportion<u32>,
    pub attack_damage: u32,
    /// 0 for melee units; > 0 is the scan distance for ranged attacks.
    pub base_range: u32,
    pub unit_class: Option<UnitClass>,
    /// Chebyshev radius of this entity's "tank aura" (ManAtArms/Knight), if any.
    pub tank_aura_radius: Option<i32>,
    pub stance: Stance,
    pub inventory: Inventory,
    pub cooldown: u32,
    /// HP-based construction progress for buildings; `value == max` means fully built.
    pub constructed: Proportion<u32>,
    pub rally_point: Option<TilePos>,
    pub production_queue: Vec<ProductionOrder>,
    /// Generic heart counter shared by Door and Altar.
    pub hearts: u32,
    pub agent_id: Option<u32>,
    pub home_altar: Option<TilePos>,
    pub embarked_unit_class: Option<UnitClass>,
    pub rally_target: Option<TilePos>,
    pub faith: u32,

    /// Back-index into [`crate::store::EntityStore::things`].
    pub(crate) things_index: u32,
    /// Back-index into this entity's per-kind bucket.
    pub(crate) kind_list_index: u32,
}

impl Entity {
    pub fn new(kind: Kind, pos: TilePos, max_hp: u32) -> Self {
        Self {
            id: EntityId {
                index: 0,
                generation: 0,
            },
            pos,
            team_id: None,
            kind,
            orientation: Direction::N,
            hp: Proportion::full(max_hp),
            attack_damage: 0,
            base_range: 0,
            unit_class: None,
            tank_aura_radius: None,
            stance: Stance::default(),
            inventory: Inventory::new(),
            cooldown: 0,
            constructed: Proportion::full(max_hp),
            rally_point: None,
            production_queue: Vec::new(),
            hearts: 0,
            agent_id: None,
            home_altar: None,
            embarked_unit_class: None,
            rally_target: None,
            faith: 0,
            things_index: 0,
            kind_list_index: 0,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.kind.blocks_movement()
    }

    pub fn is_alive(&self) -> bool {
        !self.hp.is_empty() && !self.pos.is_dead_sentinel()
    }

    pub fn is_fully_constructed(&self) -> bool {
        self.constructed.value() >= self.constructed.max()
    }

    /// Resets the mutable state of a recycled entity before it is respawned at a new position
    /// under `add`.
    pub fn reset_for_recycle(&mut self, pos: TilePos, team_id: Option<u32>) {
        self.pos = pos;
        self.team_id = team_id;
        self.hp = Proportion::full(self.hp.max());
        self.inventory.clear();
        self.cooldown = 0;
        self.hearts = 0;
    }
}

pub type KindBuckets = AHashMap<Kind, Vec<EntityId>>;

pub const DEAD_POS: TilePos = DEAD_SENTINEL;
