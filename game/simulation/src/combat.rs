use config::Combat as CombatConfig;
use config::Tints as TintsConfig;
use grid::{Direction, TilePos};

use crate::entity::{EntityId, UnitClass};
use crate::inventory::ItemKey;
use crate::kind::Kind;
use crate::store::EntityStore;
use crate::tint::TintKind;
use crate::upgrades::TeamUpgrades;
use crate::world_grid::WorldGrid;

/// `BonusDamageByClass[attacker][defender]`: the unit counter matrix — archer beats
/// infantry, cavalry beats archer, infantry beats cavalry, siege beats siege.
fn bonus_damage(attacker: UnitClass, defender: UnitClass) -> i32 {
    use UnitClass::*;
    match (attacker, defender) {
        (Archer, Infantry) => 2,
        (Cavalry, Archer) => 2,
        (Infantry, Cavalry) => 2,
        (Siege, Siege) => 3,
        _ => 0,
    }
}

#[derive(Debug, Clone)]
pub enum AttackOutcome {
    /// Unknown verb/arg-independent failure: no attacker, dead attacker, or on cooldown.
    Infeasible,
    Healed(EntityId),
    /// Every entity actually damaged, paired with whether that hit killed it.
    Hits(Vec<(EntityId, bool)>),
    NoTarget,
}

/// Resolves `Attack(dir)` for `attacker_id`, dispatching on `unit_class`: Monk heals,
/// ranged units scan up to `base_range`, a melee unit carrying a Spear strikes the 3-deep wedge,
/// everyone else hits the single forward neighbour.
pub fn resolve_attack(
    store: &mut EntityStore,
    world: &mut WorldGrid,
    cfg: &CombatConfig,
    tints: &TintsConfig,
    upgrades: &[TeamUpgrades],
    attacker_id: EntityId,
    dir: Direction,
) -> AttackOutcome {
    let Some(attacker) = store.get(attacker_id) else {
        return AttackOutcome::Infeasible;
    };
    if !attacker.is_alive() || attacker.cooldown > 0 {
        return AttackOutcome::Infeasible;
    }

    let attacker_pos = attacker.pos;
    let attacker_team = attacker.team_id;
    let attacker_class = attacker.unit_class;
    let attacker_damage = attacker.attack_damage.max(1);
    let base_range = attacker.base_range;
    let has_spear = attacker.inventory.get(ItemKey::Spear) > 0;

    if attacker_class == Some(UnitClass::Monk) {
        let target_pos = attacker_pos.translated(dir);
        let Some(target_id) = world.blocking_at(target_pos) else {
            return AttackOutcome::NoTarget;
        };
        let Some(target) = store.get_mut(target_id) else {
            return AttackOutcome::NoTarget;
        };
        if target.kind != Kind::Agent || target.team_id != attacker_team {
            return AttackOutcome::NoTarget;
        }
        target.hp.add(1);
        if let Some(tint) = world.tint_mut(target_pos) {
            tint.apply(TintKind::Heal, tints.heal_ticks);
        }
        return AttackOutcome::Healed(target_id);
    }

    let candidate_tiles: Vec<TilePos> = if base_range > 0 {
        (1..=base_range)
            .map(|d| attacker_pos.translated_by(dir, d as i32))
            .collect()
    } else if has_spear {
        let perps = dir.perpendiculars();
        (1..=3)
            .flat_map(|depth| {
                let forward = attacker_pos.translated_by(dir, depth);
                [forward, forward.translated(perps[0]), forward.translated(perps[1])]
            })
            .collect()
    } else {
        vec![attacker_pos.translated(dir)]
    };

    let mut hits = Vec::new();
    for pos in candidate_tiles {
        let Some(target_id) = world.blocking_at(pos) else {
            if base_range > 0 {
                // ranged scans stop at the first occupied tile; an empty tile keeps scanning
                continue;
            }
            continue;
        };
        let Some(target) = store.get(target_id) else {
            continue;
        };
        if target.team_id == attacker_team && target.team_id.is_some() {
            if base_range > 0 {
                break; // scan is stopped by a friendly blocker too
            }
            continue;
        }

        let killed = apply_damage(
            store,
            world,
            cfg,
            tints,
            upgrades,
            attacker_team,
            attacker_class,
            attacker_damage,
            target_id,
        );
        hits.push((target_id, killed));

        if base_range > 0 {
            break; // first valid target stops a ranged scan
        }
    }

    if hits.is_empty() {
        return AttackOutcome::NoTarget;
    }

    if has_spear && base_range == 0 {
        if let Some(attacker) = store.get_mut(attacker_id) {
            attacker.inventory.remove(ItemKey::Spear, 1);
        }
    }

    AttackOutcome::Hits(hits)
}

/// The unit-target damage pipeline, base damage through HP reduction. Returns whether the hit
/// killed the target. Structures, doors and altars are dispatched separately since they don't
/// carry `unit_class`/armor.
fn apply_damage(
    store: &mut EntityStore,
    world: &mut WorldGrid,
    cfg: &CombatConfig,
    tints: &TintsConfig,
    upgrades: &[TeamUpgrades],
    attacker_team: Option<u32>,
    attacker_class: Option<UnitClass>,
    base_damage: u32,
    target_id: EntityId,
) -> bool {
    let Some(target) = store.get(target_id) else {
        return false;
    };

    if target.kind.is_building() {
        return apply_structure_damage(store, world, cfg, upgrades, attacker_team, attacker_class, base_damage, target_id);
    }
    if target.kind == Kind::Door {
        apply_door_damage(store, attacker_team, base_damage, target_id);
        return false;
    }
    if target.kind == Kind::Altar {
        apply_altar_damage(store, attacker_team, base_damage, target_id);
        return false;
    }
    if target.kind != Kind::Agent {
        // wildlife and spawners/tumors: flat damage, no armor pipeline
        let mut dead = false;
        if let Some(t) = store.get_mut(target_id) {
            let absorbed = t.hp.sub(base_damage);
            dead = absorbed > 0 && t.hp.is_empty();
        }
        return dead;
    }

    let target_team = target.team_id;
    let target_class = target.unit_class;
    let target_pos = target.pos;

    let mut damage = base_damage as i32;
    if let (Some(team), Some(class)) = (attacker_team, attacker_class) {
        damage += upgrades
            .get(team as usize)
            .map(|u| u.blacksmith_attack_tier as i32)
            .unwrap_or(0);
        if let Some(t_class) = target_class {
            damage += bonus_damage(class, t_class);
        }
    }

    if has_tank_aura_nearby(store, target_team, target_pos, cfg) {
        damage = (damage + 1) / 2; // halve, rounding up
    }

    if let Some(team) = target_team {
        let armor_tier = upgrades
            .get(team as usize)
            .map(|u| u.blacksmith_armor_tier as i32)
            .unwrap_or(0);
        damage = (damage - armor_tier).max(0);
    }

    let mut dead = false;
    if let Some(t) = store.get_mut(target_id) {
        let inventory_armor = t.inventory.get(ItemKey::Armor);
        let absorbed_by_armor = (damage as u32).min(inventory_armor);
        if absorbed_by_armor > 0 {
            t.inventory.remove(ItemKey::Armor, absorbed_by_armor);
        }
        let remaining = (damage as u32).saturating_sub(absorbed_by_armor);
        if remaining > 0 {
            t.hp.sub(remaining);
        }
        dead = t.hp.is_empty();
    }

    if dead {
        kill_agent(store, world, tints, target_id);
    }
    dead
}

fn has_tank_aura_nearby(
    store: &EntityStore,
    team: Option<u32>,
    pos: TilePos,
    _cfg: &CombatConfig,
) -> bool {
    let Some(team) = team else { return false };
    store.of_kind(Kind::Agent).any(|e| {
        e.team_id == Some(team)
            && e.is_alive()
            && e
                .tank_aura_radius
                .is_some_and(|r| e.pos.chebyshev_distance(pos) <= r)
    })
}

fn apply_structure_damage(
    store: &mut EntityStore,
    world: &mut WorldGrid,
    cfg: &CombatConfig,
    upgrades: &[TeamUpgrades],
    attacker_team: Option<u32>,
    attacker_class: Option<UnitClass>,
    base_damage: u32,
    target_id: EntityId,
) -> bool {
    let mut damage = base_damage as f32;
    if attacker_class == Some(UnitClass::Siege) {
        damage *= cfg.siege_structure_multiplier;
        if let Some(team) = attacker_team {
            if upgrades.get(team as usize).is_some_and(|u| u.siege_engineers) {
                damage *= cfg.siege_engineers_bonus;
            }
        }
    }

    let Some(target) = store.get(target_id) else {
        return false;
    };
    let target_team = target.team_id;
    let reduction = target_team
        .and_then(|t| upgrades.get(t as usize))
        .map(|u| u.masonry_tier as i32 * cfg.masonry_reduction_per_tier)
        .unwrap_or(0);
    let final_damage = ((damage as i32 - reduction).max(1)) as u32;

    let mut destroyed = false;
    let pos = target.pos;
    let kind = target.kind;
    if let Some(t) = store.get_mut(target_id) {
        t.hp.sub(final_damage);
        destroyed = t.hp.is_empty();
    }

    if destroyed {
        world.clear(pos, kind);
        store.remove(target_id);
    }
    destroyed
}

fn apply_door_damage(store: &mut EntityStore, attacker_team: Option<u32>, base_damage: u32, door_id: EntityId) {
    let Some(door) = store.get_mut(door_id) else {
        return;
    };
    if door.team_id == attacker_team {
        return;
    }
    let absorbed = base_damage.min(door.hearts);
    door.hearts -= absorbed;
    if door.hearts == 0 {
        if let Some(team) = attacker_team {
            door.team_id = Some(team);
            door.hearts = 1;
        }
    }
}

fn apply_altar_damage(store: &mut EntityStore, attacker_team: Option<u32>, base_damage: u32, altar_id: EntityId) {
    let Some(altar) = store.get_mut(altar_id) else {
        return;
    };
    if altar.team_id == attacker_team {
        return;
    }
    let absorbed = base_damage.min(altar.hearts);
    altar.hearts -= absorbed;
    if altar.hearts == 0 {
        let old_team = altar.team_id;
        altar.team_id = attacker_team;
        altar.hearts = 1;

        // reassign every door formerly owned by the captured team to the new owner
        if let (Some(old_team), Some(new_team)) = (old_team, attacker_team) {
            let door_ids: Vec<_> = store.kind_ids(Kind::Door).to_vec();
            for id in door_ids {
                if let Some(door) = store.get_mut(id) {
                    if door.team_id == Some(old_team) {
                        door.team_id = Some(new_team);
                    }
                }
            }
        }
    }
}

/// Death-tint, observation clear, and corpse/skeleton drop for a slain agent. Returns the
/// tile the agent died on, for the caller to refresh observation layers.
pub fn kill_agent(
    store: &mut EntityStore,
    world: &mut WorldGrid,
    tints: &TintsConfig,
    agent_id: EntityId,
) -> Option<TilePos> {
    let Some(agent) = store.get(agent_id) else {
        return None;
    };
    if agent.kind != Kind::Agent || !agent.is_alive() {
        return None;
    }
    let pos = agent.pos;
    let team_id = agent.team_id;
    let inventory = agent.inventory.clone();
    let agent_slot = agent.agent_id;

    world.clear(pos, Kind::Agent);
    if let Some(tint) = world.tint_mut(pos) {
        tint.apply(TintKind::Death, tints.death_ticks);
    }

    let drop_kind = if inventory.is_empty() {
        Kind::Skeleton
    } else {
        Kind::Corpse
    };
    let mut drop = crate::entity::Entity::new(drop_kind, pos, 1);
    drop.team_id = team_id;
    drop.inventory = inventory;
    world.place(pos, store.add(drop), drop_kind);

    if let Some(agent) = store.get_mut(agent_id) {
        agent.hp = common::newtype::Proportion::new(0, agent.hp.max());
        agent.pos = crate::entity::DEAD_POS;
        agent.inventory.clear();
    }
    if let Some(slot) = agent_slot {
        store.set_terminated(slot, true);
    }

    Some(pos)
}

trait TranslatedBy {
    fn translated_by(self, dir: Direction, n: i32) -> Self;
}

impl TranslatedBy for TilePos {
    fn translated_by(self, dir: Direction, n: i32) -> Self {
        let (dx, dy) = dir.offset();
        TilePos::new(self.x + dx * n, self.y + dy * n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use config::Map;

    fn setup() -> (EntityStore, WorldGrid, CombatConfig, TintsConfig, Vec<TeamUpgrades>) {
        let store = EntityStore::new(8);
        let world = WorldGrid::new(&Map {
            width: 20,
            height: 20,
            border: 2,
        });
        (
            store,
            world,
            CombatConfig::default(),
            TintsConfig::default(),
            vec![TeamUpgrades::default(); 2],
        )
    }

    fn place_agent(
        store: &mut EntityStore,
        world: &mut WorldGrid,
        pos: TilePos,
        team: u32,
        agent_id: u32,
        class: UnitClass,
    ) -> EntityId {
        let mut e = Entity::new(Kind::Agent, pos, 10);
        e.team_id = Some(team);
        e.agent_id = Some(agent_id);
        e.unit_class = Some(class);
        e.attack_damage = 3;
        let id = store.add(e);
        world.place(pos, id, Kind::Agent);
        id
    }

    #[test]
    fn spear_wedge_hits_forward_and_laterals_at_depth_two() {
        let (mut store, mut world, cfg, tints, upgrades) = setup();
        let attacker = place_agent(&mut store, &mut world, TilePos::new(5, 5), 0, 0, UnitClass::Infantry);
        store.get_mut(attacker).unwrap().inventory.add(ItemKey::Spear, 1, 20);

        let e1 = place_agent(&mut store, &mut world, TilePos::new(6, 5), 1, 1, UnitClass::Infantry);
        let e2 = place_agent(&mut store, &mut world, TilePos::new(7, 4), 1, 2, UnitClass::Infantry);
        let e3 = place_agent(&mut store, &mut world, TilePos::new(7, 6), 1, 3, UnitClass::Infantry);

        let outcome = resolve_attack(&mut store, &mut world, &cfg, &tints, &upgrades, attacker, Direction::E);
        match outcome {
            AttackOutcome::Hits(hits) => {
                let ids: Vec<_> = hits.iter().map(|(id, _)| *id).collect();
                assert!(ids.contains(&e1));
                assert!(ids.contains(&e2));
                assert!(ids.contains(&e3));
            }
            other => panic!("expected hits, got {other:?}"),
        }
        assert_eq!(store.get(attacker).unwrap().inventory.get(ItemKey::Spear), 0);
    }

    #[test]
    fn monk_heals_without_damage() {
        let (mut store, mut world, cfg, tints, upgrades) = setup();
        let monk = place_agent(&mut store, &mut world, TilePos::new(2, 2), 0, 0, UnitClass::Monk);
        let ally = place_agent(&mut store, &mut world, TilePos::new(3, 2), 0, 1, UnitClass::Infantry);
        store.get_mut(ally).unwrap().hp.sub(5);

        let outcome = resolve_attack(&mut store, &mut world, &cfg, &tints, &upgrades, monk, Direction::E);
        assert!(matches!(outcome, AttackOutcome::Healed(_)));
        assert_eq!(store.get(ally).unwrap().hp.value(), 6);
    }

    #[test]
    fn killing_an_agent_drops_a_corpse_with_its_inventory() {
        let (mut store, mut world, cfg, tints, upgrades) = setup();
        let attacker = place_agent(&mut store, &mut world, TilePos::new(0, 0), 0, 0, UnitClass::Infantry);
        store.get_mut(attacker).unwrap().attack_damage = 100;
        let victim = place_agent(&mut store, &mut world, TilePos::new(1, 0), 1, 1, UnitClass::Infantry);
        store.get_mut(victim).unwrap().inventory.add(ItemKey::Wood, 2, 20);
        store.get_mut(victim).unwrap().inventory.add(ItemKey::Bread, 1, 20);

        resolve_attack(&mut store, &mut world, &cfg, &tints, &upgrades, attacker, Direction::E);

        assert!(store.is_terminated(1));
        let corpse_id = world.blocking_at(TilePos::new(1, 0));
        assert!(corpse_id.is_none()); // corpse is a background decoration, not blocking
        assert!(store.of_kind(Kind::Corpse).any(|c| c.pos == TilePos::new(1, 0)
            && c.inventory.get(ItemKey::Wood) == 2
            && c.inventory.get(ItemKey::Bread) == 1));

        let tint = world.tint(TilePos::new(1, 0)).expect("death tint applied to the death tile");
        assert_eq!(tint.kind(), Some(TintKind::Death));
    }
}
