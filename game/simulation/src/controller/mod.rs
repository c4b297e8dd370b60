pub mod builder;
pub mod context;
pub mod fighter;
pub mod gatherer;
pub mod movement;
pub mod state;

use ai::choose;
use grid::Direction;

use crate::action::Action;
use crate::construction::town_plan_order;
use crate::entity::UnitClass;
use crate::inventory::ItemKey;
use crate::kind::Kind;

use context::DecideCtx;
pub use state::{seed_role, AgentControllerState, Role};

/// Priority order for the attack-of-opportunity scan: a tumor outranks a spawner,
/// which outranks an ordinary enemy agent.
const OPPORTUNITY_PRIORITY: [OpportunityTarget; 3] = [
    OpportunityTarget::Kind(Kind::Tumor),
    OpportunityTarget::Kind(Kind::Spawner),
    OpportunityTarget::EnemyAgent,
];

enum OpportunityTarget {
    Kind(Kind),
    EnemyAgent,
}

/// First blocking entity along the ray `dir` from `pos`, up to `range` tiles — the same
/// first-blocker-stops-the-scan rule `combat::resolve_attack` itself applies, so a direction
/// returned here is guaranteed to actually land on its intended target.
fn first_blocker(ctx: &DecideCtx, dir: Direction, range: i32) -> Option<crate::entity::EntityId> {
    let pos = ctx.pos();
    (1..=range.max(1)).find_map(|d| ctx.world.blocking_at(pos.translated_by(dir, d)))
}

fn matches_opportunity(ctx: &DecideCtx, id: crate::entity::EntityId, target: &OpportunityTarget) -> bool {
    let Some(entity) = ctx.store.get(id) else {
        return false;
    };
    if !entity.is_alive() {
        return false;
    }
    match target {
        OpportunityTarget::Kind(kind) => entity.kind == *kind,
        OpportunityTarget::EnemyAgent => entity.kind == Kind::Agent && entity.team_id != Some(ctx.team),
    }
}

/// Scans all 8 directions for the highest-priority attackable target within this agent's reach
/// (melee: adjacent only; ranged: up to `base_range`).
fn attack_opportunity(ctx: &DecideCtx) -> Option<Direction> {
    let range = ctx.agent().base_range.max(1) as i32;
    for target in &OPPORTUNITY_PRIORITY {
        for dir in Direction::ALL {
            if let Some(id) = first_blocker(ctx, dir, range) {
                if matches_opportunity(ctx, id, target) {
                    return Some(dir);
                }
            }
        }
    }
    None
}

fn empty_adjacent(ctx: &DecideCtx) -> Option<Direction> {
    let pos = ctx.pos();
    Direction::ALL.into_iter().find(|&d| ctx.world.blocking_at(pos.translated(d)).is_none())
}

/// Emergency self-heal: below half health and carrying Bread, eat it by `Use`-ing
/// an empty adjacent tile. The engine's `Use` dispatch treats an empty-tile target specially:
/// when there's nothing there to use, it falls back to consuming carried Bread for a direct heal.
fn emergency_heal(ctx: &DecideCtx) -> Option<Action> {
    let hp = ctx.agent().hp;
    if hp.value() * 2 >= hp.max() {
        return None;
    }
    if ctx.agent().inventory.get(ItemKey::Bread) == 0 {
        return None;
    }
    empty_adjacent(ctx).map(Action::Use)
}

fn house_menu_index() -> u8 {
    town_plan_order()
        .iter()
        .position(|e| e.kind == Kind::House)
        .expect("town plan always lists a House entry") as u8
}

fn adjacent_buildable(ctx: &DecideCtx, pos: grid::TilePos) -> Option<Direction> {
    Direction::ALL.into_iter().find(|&d| {
        let n = pos.translated(d);
        ctx.world.is_valid_pos(n) && ctx.world.terrain(n).is_buildable() && ctx.world.blocking_at(n).is_none()
    })
}

/// Keeps population headroom open by building a House once the team is within
/// `controller.population_buffer` slots of its cap.
fn ensure_house(ctx: &mut DecideCtx) -> Option<Action> {
    let cap = ctx.cfg.teams.population_cap;
    let buffer = ctx.cfg.controller.population_buffer;
    if ctx.team_agent_count() as u32 + buffer < cap {
        return None;
    }
    if ctx.team_has_building(Kind::House) {
        return None;
    }
    let pos = ctx.pos();
    if adjacent_buildable(ctx, pos).is_some() {
        return Some(Action::Build(house_menu_index()));
    }
    let anchor = ctx.home_altar_pos().unwrap_or(pos);
    Some(ctx.move_toward(anchor))
}

/// The Gold→Bar→heart loop: restricted to `UnitClass::Villager` per the
/// resolved Open Question on `tryPrioritizeHearts`. Chases carried Gold to a Magma node to smelt
/// it into a Bar, then walks the Bar home to the team's Altar to convert it into a heart.
fn villager_gold_priority(ctx: &mut DecideCtx) -> Option<Action> {
    if ctx.unit_class() != Some(UnitClass::Villager) {
        return None;
    }

    const SEARCH_RADIUS: i32 = 20;

    let bars = ctx.agent().inventory.get(ItemKey::Bar);
    if bars > 0 {
        let altar = ctx.home_altar_pos()?;
        let pos = ctx.pos();
        return Some(if pos.chebyshev_distance(altar) <= 1 {
            let dir = Direction::from_delta(altar.x - pos.x, altar.y - pos.y).unwrap_or(Direction::N);
            Action::Use(dir)
        } else {
            ctx.move_toward(altar)
        });
    }

    let gold = ctx.agent().inventory.get(ItemKey::Gold);
    if gold > 0 {
        let magma = ctx.nearest(Kind::Magma, false, SEARCH_RADIUS)?;
        let pos = ctx.pos();
        return Some(if pos.chebyshev_distance(magma) <= 1 {
            let dir = Direction::from_delta(magma.x - pos.x, magma.y - pos.y).unwrap_or(Direction::N);
            Action::Use(dir)
        } else {
            ctx.move_toward(magma)
        });
    }

    None
}

/// Drives one tick of an already-entered escape: tries the current candidate direction, advancing
/// to the next one in the cycle (or exiting escape entirely once a whole cycle fails).
fn drive_escape(ctx: &mut DecideCtx) -> Action {
    let pos = ctx.pos();
    for _ in 0..4 {
        let Some(dir) = ctx.state.escape_candidate() else {
            break;
        };
        let can_enter = {
            let world = &*ctx.world;
            let store = &*ctx.store;
            let team = ctx.team;
            world.can_enter(pos, pos.translated(dir), team, |id| store.get(id).and_then(|e| e.team_id), |id| {
                store.get(id).map(|e| e.kind)
            })
        };
        if can_enter {
            let escaping = ctx.state.oscillation.tick_escape(false);
            if !matches!(escaping, ai::EscapeState::Escaping) {
                ctx.state.escape_dir = None;
            }
            return Action::Move(dir);
        }
        ctx.state.advance_escape_attempt();
    }

    // every candidate direction in this cycle was blocked: give up on escaping this tick
    ctx.state.escape_dir = None;
    ctx.state.oscillation.tick_escape(true);
    ctx.state.reset_option();
    Action::Noop
}

/// Top-level per-agent decision for one tick: anti-oscillation bookkeeping, then escape
/// handling, the attack-of-opportunity scan, emergency heal, the global Villager-only economy
/// priorities, and finally dispatch into the agent's role-specific options list.
pub fn decide_action(ctx: &mut DecideCtx) -> (&'static str, Action) {
    let pos = ctx.pos();
    ctx.state.oscillation.tick_blacklist();
    ctx.state.oscillation.record_position(pos);

    if ctx.state.oscillation.is_escaping() {
        return ("Escape", drive_escape(ctx));
    }

    let window = ctx.state.stuck_window(&ctx.cfg.controller);
    if ctx.state.oscillation.is_stuck(window, ctx.cfg.controller.stuck_distinct_threshold) {
        let ticks = ctx.cfg.controller.escape_ticks;
        let rng = &mut *ctx.rng;
        ctx.state.enter_escape(ticks, rng);
        ctx.state.reset_option();
        return ("Escape", drive_escape(ctx));
    }

    if let Some(dir) = attack_opportunity(ctx) {
        return ("AttackOpportunity", Action::Attack(dir));
    }

    if let Some(action) = emergency_heal(ctx) {
        return ("EmergencyHeal", action);
    }

    if let Some(action) = villager_gold_priority(ctx) {
        return ("VillagerGoldPriority", action);
    }

    if let Some(action) = ensure_house(ctx) {
        return ("EnsureHouse", action);
    }

    let options = match ctx.state.role {
        Role::Gatherer => gatherer::options(),
        Role::Builder => builder::options(),
        Role::Fighter => fighter::options(),
    };
    let current = ctx.state.current_option();
    // `choose` needs to own `current` for the duration of the call; re-borrow it fresh since
    // `ctx.state` is also borrowed by the option bodies it calls into.
    let mut current = *current;
    let (name, action) = choose(&options, &mut current, ctx);
    *ctx.state.current_option() = current;
    (name, action)
}
