use ai::{BoxedOpt, Opt};
use grid::{Direction, TilePos};

use crate::action::Action;
use crate::construction::{town_plan_order, BuildMenuEntry};

use super::context::DecideCtx;

const ANCHOR_SEARCH_RADIUS: i32 = 8;

fn missing_entry(ctx: &DecideCtx) -> Option<(u8, BuildMenuEntry)> {
    town_plan_order()
        .into_iter()
        .enumerate()
        .find(|(_, entry)| !ctx.team_has_building(entry.kind))
        .map(|(i, entry)| (i as u8, entry))
}

fn adjacent_buildable(ctx: &DecideCtx, pos: TilePos) -> bool {
    Direction::ALL.into_iter().any(|d| {
        let n = pos.translated(d);
        ctx.world.is_valid_pos(n) && ctx.world.terrain(n).is_buildable() && ctx.world.blocking_at(n).is_none()
    })
}

/// `(buildPos, standPos)` search around `anchor`: `buildPos` is an empty buildable tile, `standPos`
/// is one of its empty passable 8-neighbours the builder can walk to and build from.
fn find_build_site(ctx: &DecideCtx, anchor: TilePos) -> Option<(TilePos, TilePos)> {
    for dy in -ANCHOR_SEARCH_RADIUS..=ANCHOR_SEARCH_RADIUS {
        for dx in -ANCHOR_SEARCH_RADIUS..=ANCHOR_SEARCH_RADIUS {
            let build_pos = TilePos::new(anchor.x + dx, anchor.y + dy);
            if !ctx.world.is_valid_pos(build_pos)
                || !ctx.world.terrain(build_pos).is_buildable()
                || ctx.world.blocking_at(build_pos).is_some()
            {
                continue;
            }
            if let Some(stand) = build_pos.neighbours8().into_iter().find(|&n| {
                ctx.world.is_valid_pos(n) && !ctx.world.terrain(n).is_blocked() && ctx.world.blocking_at(n).is_none()
            }) {
                return Some((build_pos, stand));
            }
        }
    }
    None
}

/// *BuilderTownPlan*: builds missing core buildings in the canonical order. Builds
/// immediately if already adjacent to a buildable empty tile (the engine places at the first such
/// neighbour it finds when it applies `Build`); otherwise walks to a found `(buildPos, standPos)`,
/// holding a build lock so the target doesn't thrash every tick.
struct BuilderTownPlan;
impl<'a> Opt<DecideCtx<'a>, Action> for BuilderTownPlan {
    fn can_start(&self, ctx: &DecideCtx<'a>) -> bool {
        missing_entry(ctx).is_some()
    }

    fn act(&self, ctx: &mut DecideCtx<'a>) -> Action {
        let Some((index, _entry)) = missing_entry(ctx) else {
            return Action::Noop;
        };
        let pos = ctx.pos();

        if adjacent_buildable(ctx, pos) {
            ctx.state.build_target = None;
            ctx.state.build_lock = 0;
            return Action::Build(index);
        }

        let stand_still_valid = ctx.state.build_target.is_some_and(|(build_pos, stand)| {
            ctx.world.blocking_at(build_pos).is_none() && ctx.world.blocking_at(stand).is_none()
        });

        if ctx.state.build_lock == 0 || !stand_still_valid {
            let anchor = ctx.home_altar_pos().unwrap_or(pos);
            ctx.state.build_target = find_build_site(ctx, anchor);
            ctx.state.build_lock = ctx.cfg.controller.build_lock_ticks;
        } else {
            ctx.state.build_lock -= 1;
        }

        match ctx.state.build_target {
            Some((_, stand)) => ctx.move_toward(stand),
            None => Action::Noop,
        }
    }

    fn name(&self) -> &'static str {
        "BuilderTownPlan"
    }
}

pub fn options<'a>() -> Vec<BoxedOpt<DecideCtx<'a>, Action>> {
    vec![Box::new(BuilderTownPlan), Box::new(super::gatherer::wander_opt())]
}
