//! The world-step engine and external interface: owns every piece of state the other modules
//! operate on (grid, entity store, stockpiles, observation buffers, per-agent controller state)
//! and sequences one tick in a fixed, deterministic order.

pub mod action;
pub mod combat;
pub mod construction;
pub mod controller;
pub mod entity;
pub mod error;
pub mod inventory;
pub mod kind;
pub mod map;
pub mod observation;
pub mod spawner;
pub mod stockpile;
pub mod store;
pub mod terrain;
pub mod tint;
pub mod upgrades;
pub mod wildlife;
pub mod world_grid;

use ahash::AHashMap;
use rand::rngs::SmallRng;
use rand::Rng;

use common::random::seeded_rng;
use config::SimConfig;
use grid::{Direction, TilePos};

use action::{Action, Verb};
use combat::AttackOutcome;
use construction::{town_plan_order, use_kind_for, UseKind};
use controller::{seed_role, AgentControllerState, DecideCtx};
use entity::{Entity, EntityId, UnitClass};
use error::{SimError, SimResult};
use inventory::ItemKey;
use kind::Kind;
use map::{DefaultMapBuilder, MapBuilder};
use observation::{EntityLookup, ObservationBuffers};
use spawner::SpawnerState;
use stockpile::{Resource, Stockpile};
use store::EntityStore;
use upgrades::TeamUpgrades;
use world_grid::WorldGrid;

/// A spawner's fixed cooldown/cap (a real map generator would vary these per spawner instance
/// rather than fixing them in the config schema).
const SPAWNER_COOLDOWN: u32 = 40;
const SPAWNER_TUMOR_CAP: u32 = 4;

/// What `step`/`step_scripted` hand back to the caller: per-agent reward accrued this tick
/// (then reset), the termination flag (sticky per-episode-for-that-slot), and a truncation flag
/// this crate never sets (no wall-clock/step-count cutoff is specified).
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub rewards: Vec<f32>,
    pub terminated: Vec<bool>,
    pub truncated: Vec<bool>,
    pub action_invalid: u64,
}

/// What `reset` hands back: nothing beyond confirming the episode boundary: callers read
/// observations via [`Engine::observation`].
#[derive(Debug, Clone, Default)]
pub struct ResetInfo {
    pub current_step: u64,
}

/// The deterministic, tick-based multi-team simulation. Holds every piece of engine-owned
/// state exclusively: the controller reads it through `&`/`&mut` borrows during its decide
/// phase and never holds state of its own beyond [`AgentControllerState`].
pub struct Engine {
    cfg: SimConfig,
    rng: SmallRng,
    world: WorldGrid,
    store: EntityStore,
    stockpiles: Vec<Stockpile>,
    upgrades: Vec<TeamUpgrades>,
    observations: ObservationBuffers,
    controller_states: Vec<Option<AgentControllerState>>,
    team_altars: Vec<TilePos>,
    spawner_states: AHashMap<EntityId, SpawnerState>,
    pending_actions: Vec<u16>,
    pending_rewards: Vec<f32>,
    action_invalid: u64,
    current_step: u64,
    has_reset: bool,
    map_builder: Box<dyn MapBuilder>,
}

impl Engine {
    pub fn new(cfg: SimConfig) -> Self {
        Self::with_map_builder(cfg, Box::new(DefaultMapBuilder::default()))
    }

    pub fn with_map_builder(cfg: SimConfig, map_builder: Box<dyn MapBuilder>) -> Self {
        let max_agents = cfg.teams.max_agents();
        let radius = cfg.observation.radius;
        Self {
            rng: seeded_rng(0),
            world: WorldGrid::new(&cfg.map),
            store: EntityStore::new(max_agents),
            stockpiles: vec![Stockpile::default(); cfg.teams.team_count as usize],
            upgrades: vec![TeamUpgrades::default(); cfg.teams.team_count as usize],
            observations: ObservationBuffers::new(max_agents, radius),
            controller_states: (0..max_agents).map(|_| None).collect(),
            team_altars: Vec::new(),
            spawner_states: AHashMap::default(),
            pending_actions: vec![0; max_agents as usize],
            pending_rewards: vec![0.0; max_agents as usize],
            action_invalid: 0,
            current_step: 0,
            has_reset: false,
            cfg,
            map_builder,
        }
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn stockpile(&self, team: u32) -> &Stockpile {
        &self.stockpiles[team as usize]
    }

    pub fn observation(&self, agent_id: u32) -> &[i32] {
        self.observations.window(agent_id)
    }

    pub fn is_terminated(&self, agent_id: u32) -> bool {
        self.store.is_terminated(agent_id)
    }

    pub fn agent_position(&self, agent_id: u32) -> Option<TilePos> {
        self.store.agent(agent_id).map(|e| e.pos)
    }

    fn team_of(&self, agent_id: u32) -> u32 {
        agent_id / self.cfg.teams.agents_per_team
    }

    /// Regenerates the map, reseeds the RNG, clears every team's stockpile, and (re)spawns every
    /// agent slot at its home altar.
    pub fn reset(&mut self, seed: u64) -> ResetInfo {
        common::info!("resetting engine"; "seed" => seed);
        self.rng = seeded_rng(seed);
        self.store = EntityStore::new(self.cfg.teams.max_agents());
        self.spawner_states.clear();
        self.action_invalid = 0;
        self.current_step = 0;

        let layout = self.map_builder.build(&mut self.rng, &self.cfg, &mut self.store);
        self.world = layout.world;
        self.team_altars = layout.team_altars;

        self.stockpiles = vec![Stockpile::default(); self.cfg.teams.team_count as usize];
        self.upgrades = vec![TeamUpgrades::default(); self.cfg.teams.team_count as usize];

        let spawner_ids: Vec<EntityId> = self.store.kind_ids(Kind::Spawner).to_vec();
        for id in spawner_ids {
            self.spawner_states.insert(id, SpawnerState::new(SPAWNER_COOLDOWN, SPAWNER_TUMOR_CAP));
        }

        let max_agents = self.cfg.teams.max_agents();
        self.controller_states = (0..max_agents).map(|_| None).collect();
        self.pending_actions = vec![0; max_agents as usize];
        self.pending_rewards = vec![0.0; max_agents as usize];

        for agent_id in 0..max_agents {
            self.spawn_agent(agent_id, true, Some(UnitClass::Villager));
        }

        self.rebuild_all_observations();
        ResetInfo { current_step: 0 }
    }

    /// Spawns (or respawns) `agent_id` at its home altar, creating its persistent controller
    /// state deterministically on first use. A dead agent's entity is never removed from the
    /// arena (§4.2: "agents never leave the agent list"), so every respawn after the first
    /// reuses that same entity in place rather than minting a new one; `unit_class_override`
    /// picks the class for a brand-new slot or a freshly trained unit, while a plain respawn
    /// (`None`) keeps whatever class the agent already had before it died.
    fn spawn_agent(&mut self, agent_id: u32, first_spawn: bool, unit_class_override: Option<UnitClass>) {
        let team = self.team_of(agent_id);
        let slot_in_team = agent_id % self.cfg.teams.agents_per_team;
        let altar_pos = self.team_altars.get(team as usize).copied().unwrap_or_default();
        let spawn_pos = self.find_free_tile_near(altar_pos);

        let existing_id = self.store.agent(agent_id).map(|e| e.id);
        let unit_class = unit_class_override
            .or_else(|| existing_id.and_then(|id| self.store.get(id)).and_then(|e| e.unit_class))
            .unwrap_or(UnitClass::Villager);

        if let Some(existing_id) = existing_id {
            if let Some(agent) = self.store.get_mut(existing_id) {
                agent.pos = spawn_pos;
                agent.team_id = Some(team);
                agent.hp = common::newtype::Proportion::full(self.cfg.combat.default_max_hp);
                agent.attack_damage = self.cfg.combat.default_attack_damage;
                agent.base_range = unit_class.base_range();
                agent.unit_class = Some(unit_class);
                agent.home_altar = Some(altar_pos);
                agent.inventory.clear();
                agent.cooldown = 0;
            }
            self.world.place(spawn_pos, existing_id, Kind::Agent);
        } else {
            let mut agent = Entity::new(Kind::Agent, spawn_pos, self.cfg.combat.default_max_hp);
            agent.team_id = Some(team);
            agent.agent_id = Some(agent_id);
            agent.attack_damage = self.cfg.combat.default_attack_damage;
            agent.base_range = unit_class.base_range();
            agent.unit_class = Some(unit_class);
            agent.home_altar = Some(altar_pos);
            let id = self.store.add(agent);
            self.world.place(spawn_pos, id, Kind::Agent);
        }
        self.store.set_terminated(agent_id, false);

        if first_spawn {
            let role = seed_role(slot_in_team, &mut self.rng);
            let clockwise = self.rng.gen_bool(0.5);
            self.controller_states[agent_id as usize] =
                Some(AgentControllerState::new(role, altar_pos, clockwise, &self.cfg.controller));
        } else if let Some(state) = &mut self.controller_states[agent_id as usize] {
            state.invalidate_path();
            state.reset_option();
        }
    }

    /// Finds an empty, unblocked playable tile at or near `pos`, expanding outward ring by ring.
    fn find_free_tile_near(&self, pos: TilePos) -> TilePos {
        if self.world.is_playable(pos) && self.world.blocking_at(pos).is_none() {
            return pos;
        }
        for radius in 1..16 {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = TilePos::new(pos.x + dx, pos.y + dy);
                    if self.world.is_playable(candidate) && self.world.blocking_at(candidate).is_none() {
                        return candidate;
                    }
                }
            }
        }
        pos
    }

    /// Writes the caller-supplied action stream for the next `step()` call. `actions` must
    /// have exactly `MaxAgents` entries.
    pub fn set_actions(&mut self, actions: &[u16]) -> SimResult<()> {
        if actions.len() != self.pending_actions.len() {
            return Err(SimError::ActionsArrayWrongLength {
                expected: self.pending_actions.len(),
                actual: actions.len(),
            });
        }
        self.pending_actions.copy_from_slice(actions);
        Ok(())
    }

    /// Runs one tick using whatever actions were last written via [`Engine::set_actions`]
    /// (defaulting to Noop for any agent never set) — the external pull-model entry point.
    pub fn step(&mut self) -> SimResult<StepOutput> {
        if !self.has_reset {
            return Err(SimError::StepBeforeReset);
        }
        let actions = self.pending_actions.clone();
        Ok(self.run_tick(|_engine, _agent_id| None, &actions))
    }

    /// Runs one tick driving every live agent through the scripted controller instead of
    /// caller-supplied actions. Used by the bundled runner and by tests exercising the controller
    /// end-to-end.
    pub fn step_scripted(&mut self) -> SimResult<StepOutput> {
        if !self.has_reset {
            return Err(SimError::StepBeforeReset);
        }
        let placeholder = self.pending_actions.clone();
        Ok(self.run_tick(Self::decide_scripted_action, &placeholder))
    }

    fn decide_scripted_action(&mut self, agent_id: u32) -> Option<(&'static str, Action)> {
        let eid = self.store.agent(agent_id)?.id;
        if !self.store.get(eid)?.is_alive() {
            return None;
        }
        let team = self.team_of(agent_id);
        let mut state = self.controller_states[agent_id as usize].take()?;
        let mut ctx = DecideCtx {
            world: &mut self.world,
            store: &mut self.store,
            stockpiles: &mut self.stockpiles,
            upgrades: &self.upgrades,
            cfg: &self.cfg,
            rng: &mut self.rng,
            agent_id: eid,
            team,
            state: &mut state,
        };
        let (name, action) = controller::decide_action(&mut ctx);
        self.controller_states[agent_id as usize] = Some(state);
        Some((name, action))
    }

    /// The shared tick body: marks `has_reset`, runs every sub-phase in the exact
    /// specified order, and returns the per-agent reward/termination vectors. `action_source`
    /// lets [`Engine::step`] and [`Engine::step_scripted`] share one pipeline while differing only
    /// in where an agent's action comes from.
    fn run_tick(
        &mut self,
        mut action_source: impl FnMut(&mut Engine, u32) -> Option<(&'static str, Action)>,
        fallback_raw_actions: &[u16],
    ) -> StepOutput {
        common::debug!("tick start"; "step" => self.current_step);
        self.has_reset = true;
        self.pending_rewards.iter_mut().for_each(|r| *r = 0.0);

        // 1. tint countdowns decay before any action this tick.
        self.world.decay_tints();

        // 2. cooldown timers (agent shields, building production gating) tick down uniformly.
        for e in self.store.iter_mut() {
            if e.cooldown > 0 {
                e.cooldown -= 1;
            }
        }

        // 3. emergency deaths from any carry-over zero-HP state.
        self.enforce_zero_hp_deaths();

        // 4. agent actions in ascending agentId order.
        let max_agents = self.cfg.teams.max_agents();
        for agent_id in 0..max_agents {
            if self.store.is_terminated(agent_id) {
                continue;
            }
            let Some(eid) = self.store.agent(agent_id).map(|e| e.id) else {
                continue;
            };
            if !self.store.get(eid).map(|e| e.is_alive()).unwrap_or(false) {
                continue;
            }

            let action = match action_source(self, agent_id) {
                Some((_name, action)) => action,
                None => action::decode(fallback_raw_actions[agent_id as usize]),
            };
            self.apply_action(eid, agent_id, action);
        }

        // 4.5. construction progress and building production queues.
        self.tick_construction_phase();

        // 5. wildlife AI, in kind order.
        self.tick_wildlife_phase();

        // 6. spawner/tumor phase.
        self.tick_spawner_phase();

        // 7. combat in phases 4-6 may have dropped HP to zero; enforce deaths again.
        self.enforce_zero_hp_deaths();

        // 8. population/respawn.
        self.tick_respawn_phase();

        // 9. observation refresh and step counter.
        self.rebuild_all_observations();
        self.current_step += 1;

        let terminated = (0..max_agents).map(|a| self.store.is_terminated(a)).collect();
        StepOutput {
            rewards: self.pending_rewards.clone(),
            terminated,
            truncated: vec![false; max_agents as usize],
            action_invalid: self.action_invalid,
        }
    }

    fn mark_invalid(&mut self) {
        self.action_invalid += 1;
    }

    /// Applies one decoded action for `agent_id`/`eid`, mutating grid/inventory/stockpile state
    /// and crediting `self.pending_rewards`.
    fn apply_action(&mut self, eid: EntityId, agent_id: u32, action: Action) {
        match action {
            Action::Noop => {}
            Action::Invalid => self.mark_invalid(),
            Action::Move(dir) => {
                if !controller::movement::try_move(&mut self.store, &mut self.world, eid, dir) {
                    self.mark_invalid();
                    if let Some(state) = &mut self.controller_states[agent_id as usize] {
                        state.oscillation.blacklist_direction(dir, self.cfg.controller.move_blacklist_ticks);
                    }
                }
            }
            Action::Attack(dir) => self.apply_attack(eid, agent_id, dir),
            Action::Use(dir) => self.apply_use(eid, agent_id, dir),
            Action::Give(dir) => self.apply_give(eid, dir),
            Action::PlaceLantern(dir) => self.apply_place_lantern(eid, dir),
            Action::Plant(is_wheat, dir) => self.apply_plant(eid, is_wheat, dir),
            Action::Build(index) => self.apply_build(eid, agent_id, index),
        }
    }

    fn apply_attack(&mut self, eid: EntityId, agent_id: u32, dir: Direction) {
        let outcome = combat::resolve_attack(
            &mut self.store,
            &mut self.world,
            &self.cfg.combat,
            &self.cfg.tints,
            &self.upgrades,
            eid,
            dir,
        );
        match outcome {
            AttackOutcome::Hits(hits) => {
                for (target_id, killed) in hits {
                    if killed {
                        let was_tumor = self.store.get(target_id).map(|e| e.kind) == Some(Kind::Tumor);
                        if was_tumor {
                            self.pending_rewards[agent_id as usize] += self.cfg.rewards.tumor_kill;
                        }
                    }
                }
                self.reap_dead_non_agents();
            }
            AttackOutcome::Healed(_) => {}
            AttackOutcome::NoTarget | AttackOutcome::Infeasible => self.mark_invalid(),
        }
    }

    /// Removes any non-agent, non-building entity whose HP has reached zero (wildlife, tumors,
    /// spawners struck down in combat): buildings and doors/altars are cleaned up inline by
    /// `combat::apply_structure_damage`/`apply_door_damage`/`apply_altar_damage`, and agents are
    /// handled separately by `enforce_zero_hp_deaths`, which drops a corpse/skeleton instead.
    fn reap_dead_non_agents(&mut self) {
        let dead: Vec<(EntityId, TilePos, Kind)> = self
            .store
            .iter()
            .filter(|e| e.kind != Kind::Agent && !e.kind.is_building() && e.kind != Kind::Door && e.hp.is_empty())
            .map(|e| (e.id, e.pos, e.kind))
            .collect();
        for (id, pos, kind) in dead {
            self.world.clear(pos, kind);
            self.store.remove(id);
            self.spawner_states.remove(&id);
        }
    }

    /// Use dispatch: buildings route through their `UseKind`; resource nodes transfer
    /// inventory up to the carry cap (Magma specially smelts carried Gold into Bar); an empty
    /// target tile falls back to the emergency self-heal the controller requests when carrying
    /// Bread.
    fn apply_use(&mut self, eid: EntityId, agent_id: u32, dir: Direction) {
        let Some(agent) = self.store.get(eid) else {
            return;
        };
        let pos = agent.pos;
        let team = agent.team_id;
        let target_pos = pos.translated(dir);

        // Resource nodes, Magma, and Corpses are background (non-blocking) occupants; only buildings/wildlife/agents/walls occupy `blocking`. Use must
        // check both layers to find what it's acting on.
        let target_id = self.world.blocking_at(target_pos).or_else(|| self.world.background_at(target_pos));
        if let Some(target_id) = target_id {
            let Some(target_kind) = self.store.get(target_id).map(|e| e.kind) else {
                self.mark_invalid();
                return;
            };
            if target_kind.is_building() {
                self.apply_use_building(eid, agent_id, team, target_id, target_kind);
            } else if target_kind.is_resource_node() {
                self.apply_harvest(eid, target_id, target_kind);
            } else if target_kind == Kind::Corpse {
                self.apply_loot_corpse(eid, target_id);
            } else {
                self.mark_invalid();
            }
            return;
        }

        // nothing blocking the target tile: the only defined empty-tile Use is eating carried
        // Bread for a direct self-heal.
        let bread = self.store.get(eid).map(|e| e.inventory.get(ItemKey::Bread)).unwrap_or(0);
        if bread == 0 {
            self.mark_invalid();
            return;
        }
        if let Some(agent) = self.store.get_mut(eid) {
            agent.inventory.remove(ItemKey::Bread, 1);
            agent.hp.add(self.cfg.combat.default_max_hp / 2);
        }
    }

    fn apply_use_building(
        &mut self,
        eid: EntityId,
        agent_id: u32,
        team: Option<u32>,
        building_id: EntityId,
        kind: Kind,
    ) {
        let Some(team) = team else {
            self.mark_invalid();
            return;
        };
        match use_kind_for(kind) {
            Some(UseKind::Altar) => {
                let bars = self.store.get(eid).map(|e| e.inventory.get(ItemKey::Bar)).unwrap_or(0);
                if bars == 0 {
                    self.mark_invalid();
                    return;
                }
                if let Some(agent) = self.store.get_mut(eid) {
                    agent.inventory.remove(ItemKey::Bar, 1);
                }
                if let Some(altar) = self.store.get_mut(building_id) {
                    altar.hearts += 1;
                }
            }
            Some(UseKind::Oven) => self.apply_craft(eid, ItemKey::Wheat, ItemKey::Bread),
            Some(UseKind::Loom) => self.apply_craft(eid, ItemKey::Wood, ItemKey::Armor),
            Some(UseKind::Blacksmith) => self.apply_craft(eid, ItemKey::Stone, ItemKey::Spear),
            Some(UseKind::Market) => {
                // resource exchange is out of this crate's scope; treated as a no-op infeasible
                // use.
                self.mark_invalid();
            }
            Some(UseKind::Dropoff) => {
                let deposited = construction::dropoff(&mut self.store, &mut self.stockpiles[team as usize], eid);
                if deposited > 0 {
                    self.pending_rewards[agent_id as usize] += self.cfg.rewards.dropoff_per_unit * deposited as f32;
                } else {
                    self.mark_invalid();
                }
            }
            Some(UseKind::Storage) => {
                let stored = construction::store_in_barrel(&mut self.store, eid, building_id, self.cfg.economy.max_inventory);
                if stored == 0 {
                    self.mark_invalid();
                }
            }
            Some(UseKind::Train) => {
                let Some((trains, cost)) = self.default_trainee_and_cost(kind) else {
                    self.mark_invalid();
                    return;
                };
                let ok = construction::enqueue_training(
                    &mut self.store,
                    &mut self.stockpiles[team as usize],
                    building_id,
                    trains,
                    &cost,
                );
                if !ok {
                    self.mark_invalid();
                }
            }
            Some(UseKind::Craft) | None => self.mark_invalid(),
        }
    }

    fn apply_craft(&mut self, eid: EntityId, input: ItemKey, output: ItemKey) {
        let Some(agent) = self.store.get_mut(eid) else {
            return;
        };
        if agent.inventory.remove(input, 1) == 0 {
            self.mark_invalid();
            return;
        }
        agent.inventory.add(output, 1, self.cfg.economy.max_inventory);
    }

    fn default_trainee_and_cost(&self, building_kind: Kind) -> Option<((Kind, u32), Vec<(Resource, u32)>)> {
        town_plan_order()
            .into_iter()
            .find(|entry| entry.kind == building_kind)
            .and_then(|entry| entry.trains.map(|trains| (trains, vec![(Resource::Food, 50)])))
    }

    /// Resource-node harvest: transfers up to `economy.carry_cap` from the node's
    /// inventory into the agent's, converting the node to its exhausted form (or removing it)
    /// once drained. Magma never holds inventory of its own; instead it smelts the agent's
    /// carried Gold into Bar 1:1, matching the Gold->Bar leg of the Villager economy loop.
    fn apply_harvest(&mut self, eid: EntityId, target_id: EntityId, kind: Kind) {
        if kind == Kind::Magma {
            let Some(agent) = self.store.get_mut(eid) else { return };
            if agent.inventory.remove(ItemKey::Gold, 1) == 0 {
                self.mark_invalid();
                return;
            }
            agent.inventory.add(ItemKey::Bar, 1, self.cfg.economy.max_inventory);
            return;
        }

        let item = resource_item_for(kind);
        let available = self.store.get(target_id).map(|e| e.inventory.get(item)).unwrap_or(0);
        if available == 0 {
            self.mark_invalid();
            return;
        }
        let take = available.min(self.cfg.economy.carry_cap);
        let Some(agent) = self.store.get_mut(eid) else { return };
        let added = agent.inventory.add(item, take, self.cfg.economy.max_inventory);
        if added == 0 {
            self.mark_invalid();
            return;
        }
        if let Some(node) = self.store.get_mut(target_id) {
            node.inventory.remove(item, added);
        }

        let remaining = self.store.get(target_id).map(|e| e.inventory.get(item)).unwrap_or(0);
        if remaining == 0 {
            let pos = self.store.get(target_id).map(|e| e.pos).unwrap_or_default();
            self.world.clear(pos, kind);
            self.store.remove(target_id);
            if let Some(exhausted) = kind.exhausted_form() {
                let stump = Entity::new(exhausted, pos, 1);
                let id = self.store.add(stump);
                self.world.place(pos, id, exhausted);
            }
        }
    }

    /// Use on a Corpse: loots its whole carried inventory
    /// into the agent's own, capped by `max_inventory`; the corpse vanishes once fully looted.
    fn apply_loot_corpse(&mut self, eid: EntityId, corpse_id: EntityId) {
        let Some(corpse) = self.store.get(corpse_id) else {
            return;
        };
        let lines: Vec<(ItemKey, u32)> = corpse.inventory.iter().collect();
        let mut looted = 0;
        for (key, amount) in lines {
            let added = self.store.get_mut(eid).map(|a| a.inventory.add(key, amount, self.cfg.economy.max_inventory)).unwrap_or(0);
            if added > 0 {
                if let Some(corpse) = self.store.get_mut(corpse_id) {
                    corpse.inventory.remove(key, added);
                }
                looted += added;
            }
        }
        if looted == 0 {
            self.mark_invalid();
            return;
        }
        let empty = self.store.get(corpse_id).map(|e| e.inventory.is_empty()).unwrap_or(true);
        if empty {
            if let Some(pos) = self.store.get(corpse_id).map(|e| e.pos) {
                self.world.clear(pos, Kind::Corpse);
            }
            self.store.remove(corpse_id);
        }
    }

    /// Give(dir): transfers Armor (priority) or Spear from the actor to an adjacent
    /// same-team agent that doesn't already carry one.
    fn apply_give(&mut self, eid: EntityId, dir: Direction) {
        let Some(agent) = self.store.get(eid) else { return };
        let pos = agent.pos;
        let team = agent.team_id;
        let target_pos = pos.translated(dir);
        let Some(target_id) = self.world.blocking_at(target_pos) else {
            self.mark_invalid();
            return;
        };
        let Some(target) = self.store.get(target_id) else {
            self.mark_invalid();
            return;
        };
        if target.kind != Kind::Agent || target.team_id != team {
            self.mark_invalid();
            return;
        }

        for key in [ItemKey::Armor, ItemKey::Spear] {
            let has_already = self.store.get(target_id).map(|e| e.inventory.get(key) > 0).unwrap_or(true);
            if has_already {
                continue;
            }
            let has_to_give = self.store.get(eid).map(|e| e.inventory.get(key) > 0).unwrap_or(false);
            if !has_to_give {
                continue;
            }
            if let Some(giver) = self.store.get_mut(eid) {
                giver.inventory.remove(key, 1);
            }
            if let Some(receiver) = self.store.get_mut(target_id) {
                receiver.inventory.add(key, 1, self.cfg.economy.max_inventory);
            }
            return;
        }
        self.mark_invalid();
    }

    /// PlaceLantern(dir): valid iff the target tile is empty, not water, not frozen, and
    /// no healthy team lantern lies within the configured minimum spacing.
    fn apply_place_lantern(&mut self, eid: EntityId, dir: Direction) {
        let Some(agent) = self.store.get(eid) else { return };
        let pos = agent.pos;
        let Some(team) = agent.team_id else {
            self.mark_invalid();
            return;
        };
        let target_pos = pos.translated(dir);

        if !self.world.is_valid_pos(target_pos)
            || self.world.terrain(target_pos).is_blocked()
            || self.world.is_frozen(target_pos)
            || self.world.blocking_at(target_pos).is_some()
            || self.world.background_at(target_pos).is_some()
        {
            self.mark_invalid();
            return;
        }

        let lanterns = self.store.of_kind(Kind::Lantern);
        let spacing_ok =
            self.world
                .lantern_spacing_ok(target_pos, team, self.cfg.economy.lantern_min_spacing, lanterns);
        if !spacing_ok {
            self.mark_invalid();
            return;
        }

        let mut lantern = self.store.try_recycle(Kind::Lantern).unwrap_or_else(|| Entity::new(Kind::Lantern, target_pos, 1));
        lantern.pos = target_pos;
        lantern.team_id = Some(team);
        let id = self.store.add(lantern);
        self.world.place(target_pos, id, Kind::Lantern);
    }

    /// Plant(arg): consumes one Wheat or Wood from inventory and spawns a Wheat node on an
    /// adjacent Fertile, empty, 4-cardinal tile.
    fn apply_plant(&mut self, eid: EntityId, is_wheat: bool, dir: Direction) {
        if !dir.is_cardinal() {
            self.mark_invalid();
            return;
        }
        let Some(agent) = self.store.get(eid) else { return };
        let pos = agent.pos;
        let target_pos = pos.translated(dir);
        if self.world.terrain(target_pos) != terrain::Terrain::Fertile || self.world.blocking_at(target_pos).is_some() {
            self.mark_invalid();
            return;
        }
        let item = if is_wheat { ItemKey::Wheat } else { ItemKey::Wood };
        let Some(agent) = self.store.get_mut(eid) else { return };
        if agent.inventory.remove(item, 1) == 0 {
            self.mark_invalid();
            return;
        }
        let mut wheat = Entity::new(Kind::Wheat, target_pos, 1);
        wheat.inventory.add(ItemKey::Wheat, self.cfg.economy.carry_cap, self.cfg.economy.max_inventory);
        let id = self.store.add(wheat);
        self.world.place(target_pos, id, Kind::Wheat);
    }

    /// Build(index): places the indexed build-menu entry adjacent to the agent if a
    /// buildable empty tile is available, withdrawing its cost from the team stockpile.
    fn apply_build(&mut self, eid: EntityId, agent_id: u32, index: u8) {
        let menu = town_plan_order();
        let Some(entry) = menu.get(index as usize) else {
            self.mark_invalid();
            return;
        };
        let Some(agent) = self.store.get(eid) else { return };
        let pos = agent.pos;
        let Some(team) = agent.team_id else {
            self.mark_invalid();
            return;
        };

        let build_pos = Direction::ALL.into_iter().map(|d| pos.translated(d)).find(|&p| {
            self.world.is_valid_pos(p) && self.world.terrain(p).is_buildable() && self.world.blocking_at(p).is_none()
        });
        let Some(build_pos) = build_pos else {
            self.mark_invalid();
            return;
        };

        let placed = construction::place_building(
            &mut self.store,
            &mut self.world,
            &mut self.stockpiles[team as usize],
            team,
            build_pos,
            entry,
        );
        if placed.is_none() {
            self.mark_invalid();
        }
        let _ = agent_id; // no reward is specified for construction itself
    }

    /// Any agent whose HP has reached zero (emergency carry-over, or combat resolved earlier this
    /// tick) becomes a corpse/skeleton per `combat::kill_agent`, its observation window is
    /// cleared, and the death reward is credited to its own slot.
    fn enforce_zero_hp_deaths(&mut self) {
        let dead_agent_ids: Vec<u32> = (0..self.cfg.teams.max_agents())
            .filter(|&a| !self.store.is_terminated(a))
            .filter(|&a| self.store.agent(a).map(|e| e.hp.is_empty()).unwrap_or(false))
            .collect();

        for agent_id in dead_agent_ids {
            let Some(eid) = self.store.agent(agent_id).map(|e| e.id) else {
                continue;
            };
            if combat::kill_agent(&mut self.store, &mut self.world, &self.cfg.tints, eid).is_some() {
                self.observations.clear(agent_id);
                self.pending_rewards[agent_id as usize] += self.cfg.rewards.death;
            }
        }
    }

    /// Population/respawn: any team under its population cap respawns one
    /// terminated agent slot per altar that still has hearts, consuming one heart per respawn.
    fn tick_respawn_phase(&mut self) {
        let team_count = self.cfg.teams.team_count;
        let agents_per_team = self.cfg.teams.agents_per_team;
        let cap = self.cfg.teams.population_cap;

        for team in 0..team_count {
            let alive = (0..agents_per_team)
                .map(|slot| team * agents_per_team + slot)
                .filter(|&a| !self.store.is_terminated(a))
                .count() as u32;
            if alive >= cap {
                continue;
            }

            let altar_id = self.store.kind_ids(Kind::Altar).iter().copied().find(|&id| {
                self.store.get(id).map(|e| e.team_id == Some(team) && e.hearts > 0).unwrap_or(false)
            });
            let Some(altar_id) = altar_id else { continue };

            let Some(slot) = (0..agents_per_team)
                .map(|slot| team * agents_per_team + slot)
                .find(|&a| self.store.is_terminated(a))
            else {
                continue;
            };

            if let Some(altar) = self.store.get_mut(altar_id) {
                altar.hearts -= 1;
            }
            self.spawn_agent(slot, false, None);
        }
    }

    /// Construction & production: every not-yet-complete building gains one tick of
    /// construction progress, and every building's production queue advances by one tick; a
    /// completed Agent order fills the trained team's next terminated slot (this engine's fixed
    /// `MaxAgents` roster has no room for population growth beyond it, so a trained unit reuses
    /// the respawn machinery instead of minting a new entity — see DESIGN.md).
    fn tick_construction_phase(&mut self) {
        let progress = self.cfg.economy.construction_progress_per_tick;
        let unfinished: Vec<EntityId> = self
            .store
            .iter()
            .filter(|e| e.kind.is_building() && !e.is_fully_constructed())
            .map(|e| e.id)
            .collect();
        for id in unfinished {
            construction::advance_construction(&mut self.store, id, progress);
        }

        for (building_id, output) in construction::advance_production(&mut self.store) {
            if output != Kind::Agent {
                continue;
            }
            let Some(building) = self.store.get(building_id) else {
                continue;
            };
            let Some(team) = building.team_id else {
                continue;
            };
            let trained_class = construction::unit_class_for_building(building.kind);
            let agents_per_team = self.cfg.teams.agents_per_team;
            let slot = (0..agents_per_team)
                .map(|s| team * agents_per_team + s)
                .find(|&a| self.store.is_terminated(a));
            if let Some(slot) = slot {
                self.spawn_agent(slot, false, Some(trained_class));
            }
        }
    }

    fn tick_wildlife_phase(&mut self) {
        for kind in [Kind::Cow, Kind::Wolf, Kind::Bear] {
            let ids: Vec<EntityId> = self.store.kind_ids(kind).to_vec();
            for id in ids {
                let Some(animal_pos) = self.store.get(id).map(|e| e.pos) else {
                    continue;
                };
                let nearest_agent = self
                    .store
                    .of_kind(Kind::Agent)
                    .filter(|e| e.is_alive())
                    .map(|e| e.pos)
                    .min_by_key(|&p| p.chebyshev_distance(animal_pos));
                wildlife::tick_wildlife(&mut self.store, &mut self.world, &mut self.rng, id, nearest_agent);
            }
        }
    }

    fn tick_spawner_phase(&mut self) {
        let spawner_ids: Vec<EntityId> = self.spawner_states.keys().copied().collect();
        for id in spawner_ids {
            let Some(pos) = self.store.get(id).map(|e| e.pos) else {
                self.spawner_states.remove(&id);
                continue;
            };
            let mut state = self.spawner_states.remove(&id).expect("just iterated this key");
            spawner::tick_spawner(&mut self.store, &mut self.world, &mut self.rng, &mut state, pos, self.cfg.tints.frozen_ticks);
            self.spawner_states.insert(id, state);
        }

        let tumor_ids: Vec<EntityId> = self.store.kind_ids(Kind::Tumor).to_vec();
        for id in tumor_ids {
            if let Some(pos) = self.store.get(id).map(|e| e.pos) {
                spawner::tick_tumor_freeze(&mut self.world, pos, self.cfg.tints.frozen_ticks);
            }
        }
    }

    fn rebuild_all_observations(&mut self) {
        for agent_id in 0..self.cfg.teams.max_agents() {
            let Some(agent) = self.store.agent(agent_id) else { continue };
            if !agent.is_alive() {
                continue;
            }
            let centre = agent.pos;
            let team = agent.team_id.unwrap_or(0);
            let world = &self.world;
            let store = &self.store;
            self.observations.rebuild(agent_id, centre, team, world, |pos, blocking| {
                let id = if blocking { world.blocking_at(pos) } else { world.background_at(pos) }?;
                store.get(id).map(EntityLookup::from_entity)
            });
        }
    }
}

fn resource_item_for(kind: Kind) -> ItemKey {
    match kind {
        Kind::Tree => ItemKey::Wood,
        Kind::Stone | Kind::Stalagmite => ItemKey::Stone,
        Kind::Gold => ItemKey::Gold,
        Kind::Wheat => ItemKey::Wheat,
        Kind::Bush => ItemKey::Plant,
        _ => ItemKey::Wood,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SimConfig;

    fn small_cfg() -> SimConfig {
        let mut cfg = SimConfig::default();
        cfg.map.width = 24;
        cfg.map.height = 24;
        cfg.map.border = 2;
        cfg.teams.team_count = 2;
        cfg.teams.agents_per_team = 2;
        cfg.teams.population_cap = 2;
        cfg
    }

    #[test]
    fn reset_spawns_every_agent_slot() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);
        for agent_id in 0..engine.cfg.teams.max_agents() {
            assert!(!engine.is_terminated(agent_id));
            assert!(engine.agent_position(agent_id).is_some());
        }
    }

    #[test]
    fn noop_every_tick_keeps_agents_frozen_in_place() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);
        let positions: Vec<_> = (0..engine.cfg.teams.max_agents())
            .map(|a| engine.agent_position(a).unwrap())
            .collect();

        let actions = vec![0u16; engine.cfg.teams.max_agents() as usize];
        engine.set_actions(&actions).unwrap();
        for _ in 0..5 {
            engine.step().unwrap();
        }

        for (a, pos) in positions.into_iter().enumerate() {
            assert_eq!(engine.agent_position(a as u32), Some(pos));
        }
    }

    #[test]
    fn step_before_reset_is_a_typed_error() {
        let mut engine = Engine::new(small_cfg());
        assert!(matches!(engine.step(), Err(SimError::StepBeforeReset)));
    }

    #[test]
    fn wrong_length_action_array_is_rejected() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);
        let err = engine.set_actions(&[0, 1, 2]).unwrap_err();
        assert!(matches!(err, SimError::ActionsArrayWrongLength { .. }));
    }

    #[test]
    fn scripted_controller_drives_a_whole_tick_without_panicking() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(42);
        for _ in 0..20 {
            engine.step_scripted().unwrap();
        }
    }

    #[test]
    fn invalid_verb_increments_the_invalid_counter_and_nothing_else() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);
        let mut actions = vec![0u16; engine.cfg.teams.max_agents() as usize];
        actions[0] = 9 << 8; // unknown verb
        engine.set_actions(&actions).unwrap();
        let before = engine.agent_position(0);
        let out = engine.step().unwrap();
        assert_eq!(out.action_invalid, 1);
        assert_eq!(engine.agent_position(0), before);
    }

    /// Re-homes agent 0 onto a known tile for a scenario test, clearing its old grid slot.
    fn relocate_agent(engine: &mut Engine, agent_id: u32, pos: TilePos) -> EntityId {
        let eid = engine.store.agent(agent_id).unwrap().id;
        let old_pos = engine.store.get(eid).unwrap().pos;
        engine.world.clear(old_pos, Kind::Agent);
        engine.store.get_mut(eid).unwrap().pos = pos;
        engine.world.place(pos, eid, Kind::Agent);
        eid
    }

    #[test]
    fn gather_food_loop_deposits_to_stockpile_and_rewards_agent() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);

        let agent_id = 0;
        let agent_pos = TilePos::new(10, 10);
        let agent_eid = relocate_agent(&mut engine, agent_id, agent_pos);

        let wheat_pos = agent_pos.translated(Direction::E);
        let mut wheat = Entity::new(Kind::Wheat, wheat_pos, 1);
        wheat.inventory.add(ItemKey::Wheat, 3, engine.cfg.economy.max_inventory);
        let wheat_id = engine.store.add(wheat);
        engine.world.place(wheat_pos, wheat_id, Kind::Wheat);

        let granary_pos = agent_pos.translated(Direction::W);
        let granary = Entity::new(Kind::Granary, granary_pos, 100);
        let granary_id = engine.store.add(granary);
        engine.world.place(granary_pos, granary_id, Kind::Granary);

        // harvest the wheat node
        engine.apply_use(agent_eid, agent_id, Direction::E);
        assert_eq!(engine.store.get(agent_eid).unwrap().inventory.get(ItemKey::Wheat), 3);
        assert!(engine.store.get(wheat_id).is_none());
        let stubble_id = engine.world.background_at(wheat_pos).expect("stubble replaces the exhausted node");
        assert_eq!(engine.store.get(stubble_id).unwrap().kind, Kind::Stubble);

        // walk back and deposit at the granary
        engine.apply_use(agent_eid, agent_id, Direction::W);
        assert_eq!(engine.store.get(agent_eid).unwrap().inventory.get(ItemKey::Wheat), 0);
        assert_eq!(engine.stockpile(0).get(Resource::Food), 3);
        assert!(engine.pending_rewards[agent_id as usize] > 0.0);

        assert_eq!(engine.store.get(granary_id).unwrap().kind, Kind::Granary);
    }

    #[test]
    fn heart_loop_depositing_a_bar_at_the_altar() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);

        let agent_id = 0;
        let agent_pos = TilePos::new(10, 10);
        let agent_eid = relocate_agent(&mut engine, agent_id, agent_pos);
        engine.store.get_mut(agent_eid).unwrap().inventory.add(ItemKey::Bar, 1, engine.cfg.economy.max_inventory);

        let altar_pos = agent_pos.translated(Direction::N);
        let mut altar = Entity::new(Kind::Altar, altar_pos, 100);
        altar.team_id = Some(0);
        altar.hearts = 9;
        let altar_id = engine.store.add(altar);
        engine.world.place(altar_pos, altar_id, Kind::Altar);

        engine.apply_use(agent_eid, agent_id, Direction::N);

        assert_eq!(engine.store.get(agent_eid).unwrap().inventory.get(ItemKey::Bar), 0);
        assert_eq!(engine.store.get(altar_id).unwrap().hearts, 10);
    }

    #[test]
    fn death_then_respawn_reuses_the_same_entity_instead_of_leaking_a_corpse_slot() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);

        let agent_id = 0;
        let eid_before = engine.store.agent(agent_id).unwrap().id;
        let things_before = engine.store.len();

        engine.store.get_mut(eid_before).unwrap().hp = common::newtype::Proportion::new(0, 10);
        engine.enforce_zero_hp_deaths();
        assert!(engine.is_terminated(agent_id));
        // a corpse/skeleton was dropped, so the arena grew by exactly one entity
        assert_eq!(engine.store.len(), things_before + 1);

        engine.tick_respawn_phase();
        assert!(!engine.is_terminated(agent_id));
        // respawn must not have minted a second Agent entity for this slot
        assert_eq!(engine.store.agent(agent_id).unwrap().id, eid_before);
        assert_eq!(
            engine.store.kind_ids(Kind::Agent).len() as u32,
            engine.cfg.teams.max_agents()
        );
    }

    #[test]
    fn trained_unit_gets_its_buildings_class_and_ranged_reach() {
        let mut engine = Engine::new(small_cfg());
        engine.reset(0);

        // free up a slot to train into and drop every team-0 agent's altar hearts to spare
        let agent_id = 1;
        let eid = engine.store.agent(agent_id).unwrap().id;
        engine.store.get_mut(eid).unwrap().hp = common::newtype::Proportion::new(0, 10);
        engine.enforce_zero_hp_deaths();
        assert!(engine.is_terminated(agent_id));

        let mut range = Entity::new(Kind::ArcheryRange, TilePos::new(3, 3), 100);
        range.team_id = Some(0);
        range.constructed = common::newtype::Proportion::full(100);
        range.production_queue.push(crate::entity::ProductionOrder {
            output: Kind::Agent,
            ticks_remaining: 1,
        });
        engine.store.add(range);

        engine.tick_construction_phase();

        assert!(!engine.is_terminated(agent_id));
        let trained = engine.store.agent(agent_id).unwrap();
        assert_eq!(trained.unit_class, Some(UnitClass::Archer));
        assert_eq!(trained.base_range, UnitClass::Archer.base_range());
    }
}
