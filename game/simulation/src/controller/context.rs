use rand::rngs::SmallRng;

use config::SimConfig;
use grid::TilePos;

use crate::entity::{Entity, EntityId, UnitClass};
use crate::kind::Kind;
use crate::stockpile::Stockpile;
use crate::store::EntityStore;
use crate::upgrades::TeamUpgrades;
use crate::world_grid::WorldGrid;

use super::state::AgentControllerState;

/// The blackboard a single agent's decision pipeline reads and mutates this tick. Built
/// fresh every tick from short-lived borrows of the engine's state; the agent's persistent state
/// (role, spiral, oscillation, cached path) lives in `AgentControllerState` instead, owned by the
/// engine across ticks.
pub struct DecideCtx<'a> {
    pub world: &'a mut WorldGrid,
    pub store: &'a mut EntityStore,
    pub stockpiles: &'a mut [Stockpile],
    pub upgrades: &'a [TeamUpgrades],
    pub cfg: &'a SimConfig,
    pub rng: &'a mut SmallRng,
    pub agent_id: EntityId,
    pub team: u32,
    /// This agent's persistent controller state (role, spiral, path cache, build lock). Owned by
    /// the engine across ticks; borrowed here for the duration of one `decide_action` call.
    pub state: &'a mut AgentControllerState,
}

impl<'a> DecideCtx<'a> {
    pub fn agent(&self) -> &Entity {
        self.store.get(self.agent_id).expect("decide called for a dead agent")
    }

    pub fn pos(&self) -> TilePos {
        self.agent().pos
    }

    /// Nearest live entity of `kind` (any team if `same_team_only` is false, else only this
    /// agent's team) to the agent's current position, within `max_radius` Chebyshev tiles.
    pub fn nearest(&self, kind: Kind, same_team_only: bool, max_radius: i32) -> Option<TilePos> {
        let pos = self.pos();
        let team = self.team;
        self.store
            .of_kind(kind)
            .filter(|e| e.is_alive())
            .filter(|e| !same_team_only || e.team_id == Some(team))
            .map(|e| e.pos)
            .filter(|&p| p.chebyshev_distance(pos) <= max_radius)
            .min_by_key(|&p| p.chebyshev_distance(pos))
    }

    /// Nearest live enemy agent within `max_radius`.
    pub fn nearest_enemy_agent(&self, max_radius: i32) -> Option<TilePos> {
        let pos = self.pos();
        let team = self.team;
        self.store
            .of_kind(Kind::Agent)
            .filter(|e| e.is_alive() && e.team_id != Some(team))
            .map(|e| e.pos)
            .filter(|&p| p.chebyshev_distance(pos) <= max_radius)
            .min_by_key(|&p| p.chebyshev_distance(pos))
    }

    pub fn team_has_building(&self, kind: Kind) -> bool {
        self.store.of_kind(kind).any(|e| e.team_id == Some(self.team))
    }

    pub fn team_agent_count(&self) -> usize {
        self.store
            .of_kind(Kind::Agent)
            .filter(|e| e.is_alive() && e.team_id == Some(self.team))
            .count()
    }

    pub fn home_altar_pos(&self) -> Option<TilePos> {
        self.agent().home_altar
    }

    pub fn unit_class(&self) -> Option<UnitClass> {
        self.agent().unit_class
    }

    pub fn stockpile(&self) -> &Stockpile {
        &self.stockpiles[self.team as usize]
    }

    pub fn stockpile_mut(&mut self) -> &mut Stockpile {
        &mut self.stockpiles[self.team as usize]
    }

    /// Walks one step toward `target`, maintaining the agent's cached A* plan. The cache is
    /// invalidated when the target changes or the agent's position has drifted off the planned
    /// sequence; a fresh plan is searched on invalidation, falling back to `getMoveTowards` when
    /// no plan is found.
    pub fn move_toward(&mut self, target: TilePos) -> crate::action::Action {
        let pos = self.pos();
        let team = self.team;

        let target_changed = self.state.planned_target != Some(target);
        let drifted = match self.state.planned_path.first() {
            Some(&head) => head != pos,
            None => true,
        };
        if target_changed || drifted {
            self.state.invalidate_path();
            self.state.planned_target = Some(target);
            if let Some(path) = super::movement::find_path(
                self.world,
                self.store,
                team,
                pos,
                target,
                self.cfg.controller.astar_node_cap,
            ) {
                self.state.planned_path = path;
            }
        }

        // drop the current position off the front of the cached plan, if present
        if self.state.planned_path.first() == Some(&pos) {
            self.state.planned_path.remove(0);
        }

        let next_hop = self.state.planned_path.first().copied();
        let dir = if let Some(next_hop) = next_hop {
            grid::Direction::from_delta(next_hop.x - pos.x, next_hop.y - pos.y)
        } else {
            None
        };

        let world = &*self.world;
        let store = &*self.store;
        let oscillation = &self.state.oscillation;
        let entity_kind = |id: EntityId| store.get(id).map(|e| e.kind);
        let door_team = |id: EntityId| store.get(id).and_then(|e| e.team_id);
        let dir = dir.or_else(|| {
            super::movement::get_move_towards(
                pos,
                target,
                None,
                |d| {
                    !oscillation.is_blacklisted(d)
                        && world.can_enter(pos, pos.translated(d), team, door_team, entity_kind)
                },
                self.rng,
            )
        });

        match dir {
            Some(dir) => crate::action::Action::Move(dir),
            None => crate::action::Action::Noop,
        }
    }
}
