use ai::{BoxedOpt, Opt};
use grid::Direction;

use crate::action::Action;
use crate::inventory::ItemKey;
use crate::kind::Kind;

use super::context::DecideCtx;

const SEARCH_RADIUS: i32 = 20;

fn carried_plantable(ctx: &DecideCtx) -> Option<ItemKey> {
    let agent = ctx.agent();
    if agent.inventory.get(ItemKey::Wheat) > 0 {
        Some(ItemKey::Wheat)
    } else if agent.inventory.get(ItemKey::Wood) > 0 {
        Some(ItemKey::Wood)
    } else {
        None
    }
}

fn fertile_neighbour(ctx: &DecideCtx) -> Option<Direction> {
    let pos = ctx.pos();
    for dir in Direction::CARDINAL {
        let n = pos.translated(dir);
        if ctx.world.terrain(n) == crate::terrain::Terrain::Fertile && ctx.world.blocking_at(n).is_none() {
            return Some(dir);
        }
    }
    None
}

/// *GathererPlant*: plants a carried Wheat or Wood onto an adjacent Fertile empty tile.
struct GathererPlant;
impl<'a> Opt<DecideCtx<'a>, Action> for GathererPlant {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        carried_plantable(ctx).is_some() && fertile_neighbour(ctx).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let item = carried_plantable(ctx);
        let dir = fertile_neighbour(ctx).unwrap_or(Direction::N);
        Action::Plant(item == Some(ItemKey::Wheat), dir)
    }
    fn name(&self) -> &'static str {
        "GathererPlant"
    }
}

/// *GathererHunt*: harvests Corpse > Cow > Bush, in that priority order.
struct GathererHunt;
impl GathererHunt {
    fn target(ctx: &DecideCtx) -> Option<grid::TilePos> {
        ctx.nearest(Kind::Corpse, false, SEARCH_RADIUS)
            .or_else(|| ctx.nearest(Kind::Cow, false, SEARCH_RADIUS))
            .or_else(|| ctx.nearest(Kind::Bush, false, SEARCH_RADIUS))
    }
}
impl<'a> Opt<DecideCtx<'a>, Action> for GathererHunt {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        Self::target(ctx).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let pos = ctx.pos();
        let Some(target) = Self::target(ctx) else {
            return Action::Noop;
        };
        if pos.chebyshev_distance(target) <= 1 {
            let dir = Direction::from_delta(target.x - pos.x, target.y - pos.y).unwrap_or(Direction::N);
            Action::Use(dir)
        } else {
            ctx.move_toward(target)
        }
    }
    fn name(&self) -> &'static str {
        "GathererHunt"
    }
}

/// Generic resource-node harvest: Tree, Stone, Gold, Stalagmite, Wheat. Walks to the nearest node
/// and `Use`s it once adjacent; falls through once the agent is at/over its carry cap.
struct GathererGather;
impl GathererGather {
    const KINDS: [Kind; 5] = [Kind::Tree, Kind::Stone, Kind::Gold, Kind::Stalagmite, Kind::Wheat];

    fn target(ctx: &DecideCtx) -> Option<grid::TilePos> {
        Self::KINDS
            .into_iter()
            .filter_map(|k| ctx.nearest(k, false, SEARCH_RADIUS))
            .min_by_key(|&p| p.chebyshev_distance(ctx.pos()))
    }
}
impl<'a> Opt<DecideCtx<'a>, Action> for GathererGather {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        ctx.agent().inventory.total() < ctx.cfg.economy.carry_cap && Self::target(ctx).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let pos = ctx.pos();
        let Some(target) = Self::target(ctx) else {
            return Action::Noop;
        };
        if pos.chebyshev_distance(target) <= 1 {
            let dir = Direction::from_delta(target.x - pos.x, target.y - pos.y).unwrap_or(Direction::N);
            Action::Use(dir)
        } else {
            ctx.move_toward(target)
        }
    }
    fn name(&self) -> &'static str {
        "GathererGather"
    }
}

/// Dropoff: once carrying anything dropoff-able, walk back to the nearest team dropoff building
/// (Granary/LumberYard/Quarry/Altar) and `Use` it.
struct GathererDropoff;
impl GathererDropoff {
    const BUILDINGS: [Kind; 3] = [Kind::Granary, Kind::LumberYard, Kind::Quarry];

    fn target(ctx: &DecideCtx) -> Option<grid::TilePos> {
        Self::BUILDINGS
            .into_iter()
            .filter_map(|k| ctx.nearest(k, true, SEARCH_RADIUS * 3))
            .min_by_key(|&p| p.chebyshev_distance(ctx.pos()))
            .or_else(|| ctx.home_altar_pos())
    }
}
impl<'a> Opt<DecideCtx<'a>, Action> for GathererDropoff {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        let inv = ctx.agent().inventory.total();
        inv > 0 && (inv >= ctx.cfg.economy.carry_cap || GathererGather::target(ctx).is_none()) && Self::target(ctx).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let pos = ctx.pos();
        let Some(target) = Self::target(ctx) else {
            return Action::Noop;
        };
        if pos.chebyshev_distance(target) <= 1 {
            let dir = Direction::from_delta(target.x - pos.x, target.y - pos.y).unwrap_or(Direction::N);
            Action::Use(dir)
        } else {
            ctx.move_toward(target)
        }
    }
    fn name(&self) -> &'static str {
        "GathererDropoff"
    }
}

/// Catch-all: nothing known to gather, nothing to drop off — advance the spiral search.
struct GathererWander;
impl<'a> Opt<DecideCtx<'a>, Action> for GathererWander {
    fn can_start(&self, _: &DecideCtx<'a>) -> bool {
        true
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let target = ctx.state.spiral.advance();
        ctx.move_toward(target)
    }
    fn name(&self) -> &'static str {
        "GathererWander"
    }
}

pub fn options<'a>() -> Vec<BoxedOpt<DecideCtx<'a>, Action>> {
    vec![
        Box::new(GathererPlant),
        Box::new(GathererHunt),
        Box::new(GathererGather),
        Box::new(GathererDropoff),
        Box::new(GathererWander),
    ]
}

/// The catch-all spiral-search wander, shared with the Builder role's own options list.
pub fn wander_opt<'a>() -> BoxedOpt<DecideCtx<'a>, Action> {
    Box::new(GathererWander)
}
