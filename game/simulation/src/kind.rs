use strum::EnumIter;

/// The tag on every entity ("thing") in the world: a flat enumeration rather than a
/// component-based taxonomy. The core dispatches on `Kind` directly (combat class,
/// blocking/background placement, recyclability) instead of composing traits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, EnumIter)]
pub enum Kind {
    Agent,

    // Terrain decoration / resource nodes
    Tree,
    Stump,
    Stone,
    Stalagmite,
    Gold,
    Wheat,
    Stubble,
    Bush,
    Cactus,
    Magma,
    Water,

    // Wildlife
    Cow,
    Bear,
    Wolf,

    // Death artifacts
    Corpse,
    Skeleton,

    // Enemy structures
    Spawner,
    Tumor,

    // Misc placeables
    Relic,
    Lantern,
    Barrel,
    Wall,
    Door,

    // Buildings
    Altar,
    TownCenter,
    Granary,
    LumberYard,
    Quarry,
    WeavingLoom,
    ClayOven,
    Blacksmith,
    Barracks,
    ArcheryRange,
    Stable,
    SiegeWorkshop,
    Outpost,
    Castle,
    House,
    Market,
    Storage,
}

impl Kind {
    /// Whether this kind occupies the `blocking` grid (movement-blocking) rather than the
    /// `background` overlay grid.
    pub fn blocks_movement(self) -> bool {
        use Kind::*;
        matches!(
            self,
            Agent
                | Tree
                | Stone
                | Stalagmite
                | Cactus
                | Cow
                | Bear
                | Wolf
                | Spawner
                | Tumor
                | Wall
                | Door
                | Altar
                | TownCenter
                | Granary
                | LumberYard
                | Quarry
                | WeavingLoom
                | ClayOven
                | Blacksmith
                | Barracks
                | ArcheryRange
                | Stable
                | SiegeWorkshop
                | Outpost
                | Castle
                | House
                | Market
                | Storage
                | Barrel
        )
    }

    /// Kinds whose instances are returned to a per-kind free pool on removal rather than dropped
    /// outright — cheap to mint and removed often enough that pooling them is worthwhile.
    pub fn is_recyclable(self) -> bool {
        matches!(self, Kind::Lantern | Kind::Tumor)
    }

    /// Whether this kind is a building (used by construction progress and the build menu).
    pub fn is_building(self) -> bool {
        use Kind::*;
        matches!(
            self,
            Altar
                | TownCenter
                | Granary
                | LumberYard
                | Quarry
                | WeavingLoom
                | ClayOven
                | Blacksmith
                | Barracks
                | ArcheryRange
                | Stable
                | SiegeWorkshop
                | Outpost
                | Castle
                | House
                | Market
                | Storage
        )
    }

    /// Whether this kind is a harvestable resource node with an exhausted conversion.
    pub fn exhausted_form(self) -> Option<Kind> {
        match self {
            Kind::Tree => Some(Kind::Stump),
            Kind::Wheat => Some(Kind::Stubble),
            // Stone/Stalagmite/Bush simply vanish when exhausted.
            Kind::Stone | Kind::Stalagmite | Kind::Bush => None,
            _ => None,
        }
    }

    pub fn is_resource_node(self) -> bool {
        matches!(
            self,
            Kind::Tree
                | Kind::Stone
                | Kind::Stalagmite
                | Kind::Gold
                | Kind::Wheat
                | Kind::Bush
                | Kind::Magma
        )
    }

    pub fn is_wildlife(self) -> bool {
        matches!(self, Kind::Cow | Kind::Bear | Kind::Wolf)
    }
}
