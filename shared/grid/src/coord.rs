use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A signed tile coordinate on the playable grid. `(-1, -1)` is the sentinel position for a dead
/// agent (see entity lifecycle).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

pub const DEAD_SENTINEL: TilePos = TilePos { x: -1, y: -1 };

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_dead_sentinel(self) -> bool {
        self == DEAD_SENTINEL
    }

    #[inline]
    pub fn chebyshev_distance(self, other: TilePos) -> i32 {
        common::chebyshev_distance((self.x, self.y), (other.x, other.y))
    }

    #[inline]
    pub fn manhattan_distance(self, other: TilePos) -> i32 {
        common::manhattan_distance((self.x, self.y), (other.x, other.y))
    }

    pub fn translated(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The 8 Chebyshev neighbours, in canonical N,NE,E,SE,S,SW,W,NW order.
    pub fn neighbours8(self) -> [Self; 8] {
        Direction::ALL.map(|d| self.translated(d))
    }

    /// The 4 cardinal (Manhattan) neighbours.
    pub fn neighbours4(self) -> [Self; 4] {
        [
            self.translated(Direction::N),
            self.translated(Direction::E),
            self.translated(Direction::S),
            self.translated(Direction::W),
        ]
    }
}

impl Display for TilePos {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The 8 compass directions an agent may face or move in, `arg`-indexed 0..8 for action encoding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, strum::EnumIter, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    NE = 1,
    E = 2,
    SE = 3,
    S = 4,
    SW = 5,
    W = 6,
    NW = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    pub const CARDINAL: [Direction; 4] = [Direction::N, Direction::E, Direction::S, Direction::W];

    pub fn from_arg(arg: u8) -> Option<Self> {
        Self::ALL.get(arg as usize).copied()
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
        }
    }

    pub fn is_cardinal(self) -> bool {
        matches!(self, Direction::N | Direction::E | Direction::S | Direction::W)
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self as usize + 4) % 8]
    }

    /// The two directions 90 degrees either side, used by the anti-oscillation escape routine.
    pub fn perpendiculars(self) -> [Self; 2] {
        [
            Self::ALL[(self as usize + 2) % 8],
            Self::ALL[(self as usize + 6) % 8],
        ]
    }

    /// Best-matching compass direction for a delta, used by `getMoveTowards`.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        if dx == 0 && dy == 0 {
            return None;
        }
        let sx = dx.signum();
        let sy = dy.signum();
        Self::ALL.iter().copied().find(|d| d.offset() == (sx, sy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involutive() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn chebyshev_neighbours_are_distance_one() {
        let origin = TilePos::new(5, 5);
        for n in origin.neighbours8() {
            assert_eq!(origin.chebyshev_distance(n), 1);
        }
    }

    #[test]
    fn from_delta_picks_nearest_compass_point() {
        assert_eq!(Direction::from_delta(5, 0), Some(Direction::E));
        assert_eq!(Direction::from_delta(-3, -3), Some(Direction::NW));
        assert_eq!(Direction::from_delta(0, 0), None);
    }
}
