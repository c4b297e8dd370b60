use config::Map as MapConfig;
use grid::{Direction, TileGrid, TilePos};

use crate::entity::{Entity, EntityId};
use crate::kind::Kind;
use crate::terrain::{Biome, Terrain};
use crate::tint::Tint;

/// The two overlaid spatial indices: `blocking` for movement-blocking entities, `background`
/// for decorative/overlay entities, plus the per-tile terrain/biome/tint layers. Cliff entities
/// (here: any blocking-kind doubling as decor) would take precedence over other background
/// occupants at the same tile; this crate does not model ramp/cliff kinds so the rule is a
/// no-op, noted in DESIGN.md.
pub struct WorldGrid {
    width: i32,
    height: i32,
    border: i32,
    blocking: TileGrid<Option<EntityId>>,
    background: TileGrid<Option<EntityId>>,
    terrain: TileGrid<Terrain>,
    biome: TileGrid<Biome>,
    tint: TileGrid<Tint>,
}

impl WorldGrid {
    pub fn new(cfg: &MapConfig) -> Self {
        Self {
            width: cfg.width,
            height: cfg.height,
            border: cfg.border,
            blocking: TileGrid::new(cfg.width, cfg.height),
            background: TileGrid::new(cfg.width, cfg.height),
            terrain: TileGrid::new(cfg.width, cfg.height),
            biome: TileGrid::new(cfg.width, cfg.height),
            tint: TileGrid::new(cfg.width, cfg.height),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_valid_pos(&self, pos: TilePos) -> bool {
        self.blocking.in_bounds(pos)
    }

    /// Snaps `pos` to the inner playable rectangle `[border, dim-border)`.
    pub fn clamp_to_playable(&self, pos: TilePos) -> TilePos {
        let clamp = |v: i32, dim: i32| v.clamp(self.border, dim - self.border - 1);
        TilePos::new(clamp(pos.x, self.width), clamp(pos.y, self.height))
    }

    pub fn is_playable(&self, pos: TilePos) -> bool {
        pos.x >= self.border
            && pos.y >= self.border
            && pos.x < self.width - self.border
            && pos.y < self.height - self.border
    }

    pub fn terrain(&self, pos: TilePos) -> Terrain {
        self.terrain.get(pos).copied().unwrap_or(Terrain::Water)
    }

    pub fn set_terrain(&mut self, pos: TilePos, terrain: Terrain) {
        if let Some(slot) = self.terrain.get_mut(pos) {
            *slot = terrain;
        }
    }

    pub fn biome(&self, pos: TilePos) -> Biome {
        self.biome.get(pos).copied().unwrap_or_default()
    }

    pub fn set_biome(&mut self, pos: TilePos, biome: Biome) {
        if let Some(slot) = self.biome.get_mut(pos) {
            *slot = biome;
        }
    }

    pub fn tint(&self, pos: TilePos) -> Option<&Tint> {
        self.tint.get(pos)
    }

    pub fn tint_mut(&mut self, pos: TilePos) -> Option<&mut Tint> {
        self.tint.get_mut(pos)
    }

    pub fn is_frozen(&self, pos: TilePos) -> bool {
        self.tint.get(pos).map(Tint::is_frozen).unwrap_or(false)
    }

    pub fn blocking_at(&self, pos: TilePos) -> Option<EntityId> {
        self.blocking.get(pos).copied().flatten()
    }

    pub fn background_at(&self, pos: TilePos) -> Option<EntityId> {
        self.background.get(pos).copied().flatten()
    }

    /// Places `id` (a blocking or background entity, per `kind`) at `pos`. Callers are
    /// responsible for clearing any previous position first.
    pub fn place(&mut self, pos: TilePos, id: EntityId, kind: Kind) {
        let grid = if kind.blocks_movement() {
            &mut self.blocking
        } else {
            &mut self.background
        };
        if let Some(slot) = grid.get_mut(pos) {
            *slot = Some(id);
        }
    }

    pub fn clear(&mut self, pos: TilePos, kind: Kind) {
        let grid = if kind.blocks_movement() {
            &mut self.blocking
        } else {
            &mut self.background
        };
        if let Some(slot) = grid.get_mut(pos) {
            *slot = None;
        }
    }

    /// Decrements every tile's tint countdown once; returns the tiles whose tint just
    /// expired, for observation-layer refresh.
    pub fn decay_tints(&mut self) -> Vec<TilePos> {
        let mut expired = Vec::new();
        for (pos, tint) in self.tint.iter_mut() {
            if tint.decay() {
                expired.push(pos);
            }
        }
        expired
    }

    /// The weaker passability check used by search heuristics: valid, terrain not
    /// blocked, not frozen, and the occupant (if any) is nil or a Lantern.
    pub fn is_passable(&self, pos: TilePos, door_team: Option<u32>, entity_of: impl Fn(EntityId) -> Option<Kind>) -> bool {
        if !self.is_valid_pos(pos) || self.terrain(pos).is_blocked() || self.is_frozen(pos) {
            return false;
        }
        match self.blocking_at(pos) {
            None => true,
            Some(id) => match entity_of(id) {
                Some(Kind::Lantern) => true,
                Some(Kind::Door) => door_team.is_some(),
                _ => false,
            },
        }
    }

    /// The full movement-legality check: `to` must be in bounds, terrain unblocked, not
    /// frozen, a door at `to` must be passable by `agent_team`, and the tile must be empty or
    /// contain a lantern that can be pushed aside while preserving the minimum spacing invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn can_enter(
        &self,
        from: TilePos,
        to: TilePos,
        agent_team: u32,
        door_team_of: impl Fn(EntityId) -> Option<u32>,
        kind_of: impl Fn(EntityId) -> Option<Kind>,
    ) -> bool {
        if !self.is_valid_pos(to) || self.terrain(to).is_blocked() || self.is_frozen(to) {
            return false;
        }
        match self.blocking_at(to) {
            None => true,
            Some(id) => match kind_of(id) {
                Some(Kind::Door) => door_team_of(id) == Some(agent_team),
                Some(Kind::Lantern) => self.lantern_push_target(from, to).is_some(),
                _ => false,
            },
        }
    }

    /// Finds a fallback tile to push a blocking lantern into, trying (in order) two tiles ahead
    /// of the mover, one tile ahead, then any free 8-neighbour of `to`. Returns `None` if
    /// no fallback is itself passable.
    pub fn lantern_push_target(&self, from: TilePos, to: TilePos) -> Option<TilePos> {
        let dir = Direction::from_delta(to.x - from.x, to.y - from.y)?;
        let two_ahead = to.translated(dir);
        let candidates = [two_ahead.translated(dir), two_ahead];
        for candidate in candidates {
            if self.is_valid_pos(candidate)
                && !self.terrain(candidate).is_blocked()
                && !self.is_frozen(candidate)
                && self.blocking_at(candidate).is_none()
            {
                return Some(candidate);
            }
        }
        to.neighbours8()
            .into_iter()
            .find(|&n| {
                self.is_valid_pos(n)
                    && !self.terrain(n).is_blocked()
                    && !self.is_frozen(n)
                    && self.blocking_at(n).is_none()
            })
    }

    /// True iff no other healthy lantern of `team` lies within `min_spacing` Chebyshev tiles of
    /// `pos` (the lantern-spacing invariant).
    pub fn lantern_spacing_ok<'a>(
        &self,
        pos: TilePos,
        team: u32,
        min_spacing: i32,
        lanterns: impl Iterator<Item = &'a Entity>,
    ) -> bool {
        lanterns
            .filter(|l| l.team_id == Some(team) && l.kind == Kind::Lantern)
            .all(|l| l.pos.chebyshev_distance(pos) >= min_spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    fn grid() -> WorldGrid {
        WorldGrid::new(&Map {
            width: 20,
            height: 20,
            border: 2,
        })
    }

    #[test]
    fn playable_rectangle_excludes_border() {
        let g = grid();
        assert!(!g.is_playable(TilePos::new(0, 0)));
        assert!(!g.is_playable(TilePos::new(1, 5)));
        assert!(g.is_playable(TilePos::new(2, 2)));
        assert!(g.is_playable(TilePos::new(17, 17)));
        assert!(!g.is_playable(TilePos::new(18, 5)));
    }

    #[test]
    fn clamp_snaps_into_playable_rect() {
        let g = grid();
        assert_eq!(g.clamp_to_playable(TilePos::new(-5, -5)), TilePos::new(2, 2));
        assert_eq!(g.clamp_to_playable(TilePos::new(100, 100)), TilePos::new(17, 17));
    }

    #[test]
    fn water_terrain_blocks_entry() {
        let mut g = grid();
        let to = TilePos::new(5, 5);
        g.set_terrain(to, Terrain::Water);
        let entered = g.can_enter(TilePos::new(4, 5), to, 0, |_| None, |_| None);
        assert!(!entered);
    }

    #[test]
    fn frozen_tile_is_impassable() {
        let mut g = grid();
        let to = TilePos::new(5, 5);
        g.tint_mut(to).unwrap().apply(crate::tint::TintKind::Frozen, 5);
        assert!(!g.can_enter(TilePos::new(4, 5), to, 0, |_| None, |_| None));
    }
}
