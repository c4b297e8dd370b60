use grid::TilePos;

use crate::entity::{Entity, EntityId, ProductionOrder, UnitClass};
use crate::inventory::ItemKey;
use crate::kind::Kind;
use crate::stockpile::{Resource, Stockpile};
use crate::store::EntityStore;
use crate::world_grid::WorldGrid;

/// What a building's `Use` dispatches to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UseKind {
    Altar,
    Oven,
    Loom,
    Blacksmith,
    Market,
    Dropoff,
    Storage,
    Train,
    Craft,
}

pub fn use_kind_for(kind: Kind) -> Option<UseKind> {
    match kind {
        Kind::Altar => Some(UseKind::Altar),
        Kind::ClayOven => Some(UseKind::Oven),
        Kind::WeavingLoom => Some(UseKind::Loom),
        Kind::Blacksmith => Some(UseKind::Blacksmith),
        Kind::Market => Some(UseKind::Market),
        Kind::Granary | Kind::LumberYard | Kind::Quarry => Some(UseKind::Dropoff),
        Kind::Storage => Some(UseKind::Storage),
        Kind::Barracks | Kind::ArcheryRange | Kind::Stable | Kind::SiegeWorkshop | Kind::TownCenter => {
            Some(UseKind::Train)
        }
        _ => None,
    }
}

/// The `UnitClass` a training building's completed `Agent` order should spawn as. `TownCenter`
/// produces the generic `Villager`; the three military production buildings produce their
/// matching combat class so the counter-bonus matrix and ranged scan in `combat.rs` apply to them.
pub fn unit_class_for_building(kind: Kind) -> UnitClass {
    match kind {
        Kind::Barracks => UnitClass::Infantry,
        Kind::ArcheryRange => UnitClass::Archer,
        Kind::Stable => UnitClass::Cavalry,
        Kind::SiegeWorkshop => UnitClass::Siege,
        _ => UnitClass::Villager,
    }
}

/// One build-menu entry: what it produces, its cost, and (for production buildings) the default
/// trainee and per-unit tick cost.
#[derive(Clone, Debug)]
pub struct BuildMenuEntry {
    pub kind: Kind,
    pub cost: Vec<(Resource, u32)>,
    pub build_ticks: u32,
    pub trains: Option<(Kind, u32)>,
}

/// The canonical town-plan build order `BuilderTownPlan` walks, cheapest/earliest first.
pub fn town_plan_order() -> Vec<BuildMenuEntry> {
    use Resource::*;
    vec![
        entry(Kind::TownCenter, &[(Wood, 100)], 40, None),
        entry(Kind::Granary, &[(Wood, 50)], 25, None),
        entry(Kind::LumberYard, &[(Wood, 50)], 25, None),
        entry(Kind::Quarry, &[(Wood, 50)], 25, None),
        entry(Kind::WeavingLoom, &[(Wood, 40)], 20, None),
        entry(Kind::ClayOven, &[(Wood, 40)], 20, None),
        entry(Kind::Blacksmith, &[(Wood, 60), (Stone, 20)], 30, None),
        entry(Kind::Barracks, &[(Wood, 80)], 35, Some((Kind::Agent, 20))),
        entry(Kind::ArcheryRange, &[(Wood, 80)], 35, Some((Kind::Agent, 20))),
        entry(Kind::Stable, &[(Wood, 90)], 35, Some((Kind::Agent, 25))),
        entry(Kind::SiegeWorkshop, &[(Wood, 120), (Stone, 60)], 50, Some((Kind::Agent, 40))),
        entry(Kind::Outpost, &[(Wood, 30), (Stone, 30)], 20, None),
        entry(Kind::Castle, &[(Stone, 200)], 80, None),
        entry(Kind::House, &[(Wood, 60)], 30, None),
    ]
}

fn entry(kind: Kind, cost: &[(Resource, u32)], build_ticks: u32, trains: Option<(Kind, u32)>) -> BuildMenuEntry {
    BuildMenuEntry {
        kind,
        cost: cost.to_vec(),
        build_ticks,
        trains,
    }
}

/// `Build(index)`: pays the menu entry's cost from `stockpile`, then places a not-yet-constructed
/// building at `pos` (construction progresses over subsequent ticks via its `constructed`
/// proportion, alongside the production queue for buildings that train units). Fails without
/// side effects if the tile isn't empty/buildable or the cost can't be paid.
pub fn place_building(
    store: &mut EntityStore,
    world: &mut WorldGrid,
    stockpile: &mut Stockpile,
    team: u32,
    pos: TilePos,
    menu_entry: &BuildMenuEntry,
) -> Option<EntityId> {
    if !world.is_valid_pos(pos) || !world.terrain(pos).is_buildable() || world.blocking_at(pos).is_some() {
        return None;
    }
    if !stockpile.try_withdraw(&menu_entry.cost) {
        return None;
    }

    let max_hp = menu_entry.build_ticks * 4;
    let mut building = Entity::new(menu_entry.kind, pos, max_hp);
    building.team_id = Some(team);
    // HP tracks construction progress as well as combat durability: a freshly placed
    // building starts at 0/max on both and is vulnerable until it reaches full HP.
    building.hp.sub(max_hp);
    building.constructed.sub(max_hp);
    let id = store.add(building);
    world.place(pos, id, menu_entry.kind);
    Some(id)
}

/// Advances a building's HP-based construction progress by one tick of builder effort.
/// Returns `true` once the building reaches full `constructed`.
pub fn advance_construction(store: &mut EntityStore, id: EntityId, progress_per_tick: u32) -> bool {
    let Some(building) = store.get_mut(id) else {
        return false;
    };
    building.constructed.add(progress_per_tick);
    building.hp.add(progress_per_tick);
    building.is_fully_constructed()
}

/// `Use` on a Train-capable building: withdraws the trainee's cost and enqueues it, failing
/// without side effects if the cost can't be paid.
pub fn enqueue_training(
    store: &mut EntityStore,
    stockpile: &mut Stockpile,
    building_id: EntityId,
    trains: (Kind, u32),
    cost: &[(Resource, u32)],
) -> bool {
    if !stockpile.try_withdraw(cost) {
        return false;
    }
    if let Some(building) = store.get_mut(building_id) {
        building.production_queue.push(ProductionOrder {
            output: trains.0,
            ticks_remaining: trains.1,
        });
        true
    } else {
        false
    }
}

/// Ticks every building's production queue by one, used in the per-tick construction/production
/// sub-phase. Returns the (building id, output kind) pairs that completed this tick.
pub fn advance_production(store: &mut EntityStore) -> Vec<(EntityId, Kind)> {
    let mut completed = Vec::new();
    let building_ids: Vec<EntityId> = store
        .iter()
        .filter(|e| e.kind.is_building())
        .map(|e| e.id)
        .collect();

    for id in building_ids {
        if let Some(building) = store.get_mut(id) {
            if let Some(order) = building.production_queue.first_mut() {
                if order.ticks_remaining > 0 {
                    order.ticks_remaining -= 1;
                }
                if order.ticks_remaining == 0 {
                    let output = order.output;
                    building.production_queue.remove(0);
                    completed.push((id, output));
                }
            }
        }
    }
    completed
}

/// Dropoff `Use`: every stockpile-resource item the agent carries and this building accepts is
/// added to the team stockpile. Returns the total units deposited.
pub fn dropoff(store: &mut EntityStore, stockpile: &mut Stockpile, agent_id: EntityId) -> u32 {
    let Some(agent) = store.get(agent_id) else {
        return 0;
    };
    let lines: Vec<(ItemKey, u32)> = agent.inventory.iter().collect();
    let mut deposited = 0;
    for (key, amount) in lines {
        if let Some(resource) = Stockpile::resource_for_item(key) {
            stockpile.add(resource, amount);
            deposited += amount;
            if let Some(agent) = store.get_mut(agent_id) {
                agent.inventory.remove(key, amount);
            }
        }
    }
    deposited
}

/// Storage `Use`: moves carried items into the building's own inventory, capped by
/// `barrel_capacity`.
pub fn store_in_barrel(store: &mut EntityStore, agent_id: EntityId, barrel_id: EntityId, barrel_capacity: u32) -> u32 {
    let Some(agent) = store.get(agent_id) else {
        return 0;
    };
    let lines: Vec<(ItemKey, u32)> = agent.inventory.iter().collect();
    let mut stored = 0;
    for (key, amount) in lines {
        let added = if let Some(barrel) = store.get_mut(barrel_id) {
            barrel.inventory.add(key, amount, barrel_capacity)
        } else {
            0
        };
        if added > 0 {
            if let Some(agent) = store.get_mut(agent_id) {
                agent.inventory.remove(key, added);
            }
            stored += added;
        }
    }
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    fn world() -> WorldGrid {
        WorldGrid::new(&Map {
            width: 20,
            height: 20,
            border: 2,
        })
    }

    #[test]
    fn place_building_fails_without_enough_stockpile() {
        let mut store = EntityStore::new(4);
        let mut world = world();
        let mut stockpile = Stockpile::default();
        let menu = town_plan_order();
        let result = place_building(&mut store, &mut world, &mut stockpile, 0, TilePos::new(5, 5), &menu[0]);
        assert!(result.is_none());
        assert_eq!(stockpile.get(Resource::Wood), 0);
    }

    #[test]
    fn place_building_withdraws_cost_and_occupies_tile() {
        let mut store = EntityStore::new(4);
        let mut world = world();
        let mut stockpile = Stockpile::default();
        stockpile.add(Resource::Wood, 200);
        let menu = town_plan_order();
        let id = place_building(&mut store, &mut world, &mut stockpile, 0, TilePos::new(5, 5), &menu[0]).unwrap();
        assert_eq!(stockpile.get(Resource::Wood), 100);
        assert_eq!(world.blocking_at(TilePos::new(5, 5)), Some(id));
    }

    #[test]
    fn construction_completes_once_hp_reaches_max() {
        let mut store = EntityStore::new(4);
        let mut building = Entity::new(Kind::Granary, TilePos::new(0, 0), 100);
        building.constructed.sub(100);
        let id = store.add(building);
        for _ in 0..4 {
            assert!(!advance_construction(&mut store, id, 20));
        }
        assert!(advance_construction(&mut store, id, 20));
    }

    #[test]
    fn dropoff_moves_food_items_into_team_stockpile() {
        let mut store = EntityStore::new(4);
        let mut agent = Entity::new(Kind::Agent, TilePos::new(0, 0), 10);
        agent.inventory.add(ItemKey::Wheat, 3, 20);
        agent.inventory.add(ItemKey::Armor, 1, 20); // not a stockpile resource
        let id = store.add(agent);
        let mut stockpile = Stockpile::default();
        let deposited = dropoff(&mut store, &mut stockpile, id);
        assert_eq!(deposited, 3);
        assert_eq!(stockpile.get(Resource::Food), 3);
        assert_eq!(store.get(id).unwrap().inventory.get(ItemKey::Armor), 1);
    }
}
