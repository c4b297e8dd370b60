use ai::{BoxedOpt, Opt};
use grid::{Direction, TilePos};

use crate::action::Action;
use crate::construction::town_plan_order;
use crate::kind::Kind;

use super::context::DecideCtx;

const ENGAGE_RADIUS: i32 = 20;
const DIVIDER_SEARCH_RADIUS: i32 = 6;

fn outpost_menu_index() -> u8 {
    town_plan_order()
        .iter()
        .position(|e| e.kind == Kind::Outpost)
        .expect("town plan always lists an Outpost entry") as u8
}

fn nearest_enemy_altar(ctx: &DecideCtx) -> Option<TilePos> {
    let pos = ctx.pos();
    let team = ctx.team;
    ctx.store
        .of_kind(Kind::Altar)
        .filter(|e| e.is_alive() && e.team_id != Some(team))
        .map(|e| e.pos)
        .min_by_key(|&p| p.chebyshev_distance(pos))
}

/// Midpoint between an agent's home altar and the nearest known enemy altar — the defensive
/// line an outpost should anchor.
fn divider_point(ctx: &DecideCtx) -> Option<TilePos> {
    let home = ctx.home_altar_pos()?;
    let enemy = nearest_enemy_altar(ctx)?;
    Some(TilePos::new(home.x + (enemy.x - home.x) / 2, home.y + (enemy.y - home.y) / 2))
}

fn adjacent_buildable(ctx: &DecideCtx, pos: TilePos) -> Option<Direction> {
    Direction::ALL.into_iter().find(|&d| {
        let n = pos.translated(d);
        ctx.world.is_valid_pos(n) && ctx.world.terrain(n).is_buildable() && ctx.world.blocking_at(n).is_none()
    })
}

/// *FighterBreakout*: if every 8-neighbour is blocked by a wall, door, spawner or tumor,
/// the agent is walled in — attack the first such obstacle rather than idling.
struct FighterBreakout;
impl FighterBreakout {
    fn trapped_direction(ctx: &DecideCtx) -> Option<Direction> {
        let pos = ctx.pos();
        let mut obstacle = None;
        for dir in Direction::ALL {
            let n = pos.translated(dir);
            let blocker_kind = ctx.world.blocking_at(n).and_then(|id| ctx.store.get(id)).map(|e| e.kind);
            match blocker_kind {
                Some(Kind::Wall) | Some(Kind::Door) | Some(Kind::Spawner) | Some(Kind::Tumor) => {
                    obstacle.get_or_insert(dir);
                }
                _ => return None,
            }
        }
        obstacle
    }
}
impl<'a> Opt<DecideCtx<'a>, Action> for FighterBreakout {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        Self::trapped_direction(ctx).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        match Self::trapped_direction(ctx) {
            Some(dir) => Action::Attack(dir),
            None => Action::Noop,
        }
    }
    fn name(&self) -> &'static str {
        "FighterBreakout"
    }
}

/// *FighterRetreat*: while `hp*3 <= maxHp`, path to the nearest friendly defensive
/// building instead of pressing the fight.
struct FighterRetreat;
impl FighterRetreat {
    fn target(ctx: &DecideCtx) -> Option<TilePos> {
        ctx.nearest(Kind::Outpost, true, DIVIDER_SEARCH_RADIUS * 4)
            .or_else(|| ctx.nearest(Kind::Castle, true, DIVIDER_SEARCH_RADIUS * 4))
            .or_else(|| ctx.nearest(Kind::TownCenter, true, DIVIDER_SEARCH_RADIUS * 4))
            .or_else(|| ctx.home_altar_pos())
    }
}
impl<'a> Opt<DecideCtx<'a>, Action> for FighterRetreat {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        let hp = ctx.agent().hp;
        hp.value() * 3 <= hp.max() && Self::target(ctx).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        match Self::target(ctx) {
            Some(target) => ctx.move_toward(target),
            None => Action::Noop,
        }
    }
    fn name(&self) -> &'static str {
        "FighterRetreat"
    }
}

/// *FighterEngage*: closes distance on the nearest enemy agent within `ENGAGE_RADIUS`. Actually
/// striking it, once adjacent or in range, is handled by the pipeline's attack-of-opportunity
/// scan, which runs before role dispatch.
struct FighterEngage;
impl<'a> Opt<DecideCtx<'a>, Action> for FighterEngage {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        ctx.nearest_enemy_agent(ENGAGE_RADIUS).is_some()
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        match ctx.nearest_enemy_agent(ENGAGE_RADIUS) {
            Some(target) => ctx.move_toward(target),
            None => Action::Noop,
        }
    }
    fn name(&self) -> &'static str {
        "FighterEngage"
    }
}

/// *FighterDividerDefense*: anchors an Outpost at the midpoint between the home altar and
/// the nearest known enemy altar, forming the start of a defensive line. This crate's build menu
/// has no standalone Wall/Door entries (see DESIGN.md), so the line is expressed as a chain of
/// Outposts rather than the reference wall-with-periodic-doors pattern.
struct FighterDividerDefense;
impl<'a> Opt<DecideCtx<'a>, Action> for FighterDividerDefense {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        let Some(point) = divider_point(ctx) else {
            return false;
        };
        ctx.nearest(Kind::Outpost, true, DIVIDER_SEARCH_RADIUS).is_none() && ctx.pos().chebyshev_distance(point) <= DIVIDER_SEARCH_RADIUS * 3
    }
    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let Some(point) = divider_point(ctx) else {
            return Action::Noop;
        };
        let pos = ctx.pos();
        if pos.chebyshev_distance(point) <= 1 {
            if adjacent_buildable(ctx, pos).is_some() {
                return Action::Build(outpost_menu_index());
            }
        }
        ctx.move_toward(point)
    }
    fn name(&self) -> &'static str {
        "FighterDividerDefense"
    }
}

pub fn options<'a>() -> Vec<BoxedOpt<DecideCtx<'a>, Action>> {
    vec![
        Box::new(FighterBreakout),
        Box::new(FighterRetreat),
        Box::new(FighterEngage),
        Box::new(FighterDividerDefense),
        Box::new(super::gatherer::wander_opt()),
    ]
}
