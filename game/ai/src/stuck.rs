use std::collections::VecDeque;

use grid::{Direction, TilePos};

/// Per-agent anti-oscillation state: a ring of recent positions, a short-lived per-direction
/// blacklist for moves that failed to change position, and an escape-mode countdown.
///
/// An agent is stuck iff the number of distinct positions among the most recent `window` ring
/// entries is at or below `distinct_threshold`.
#[derive(Debug, Clone)]
pub struct OscillationTracker {
    ring: VecDeque<TilePos>,
    ring_size: usize,
    blacklist: Vec<(Direction, u32)>,
    escape_ticks_remaining: u32,
}

/// What the current tick's decision pipeline should do about movement, based on the tracker.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EscapeState {
    Normal,
    /// Still escaping; try this direction next (a random cardinal, then its perpendiculars, then
    /// its reverse, as the caller cycles through on repeated calls).
    Escaping,
}

impl OscillationTracker {
    pub fn new(ring_size: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(ring_size),
            ring_size,
            blacklist: Vec::new(),
            escape_ticks_remaining: 0,
        }
    }

    pub fn record_position(&mut self, pos: TilePos) {
        if self.ring.len() == self.ring_size {
            self.ring.pop_front();
        }
        self.ring.push_back(pos);
    }

    /// Blacklists `dir` for `ticks` ticks after a `Move` failed to change position.
    pub fn blacklist_direction(&mut self, dir: Direction, ticks: u32) {
        if let Some(entry) = self.blacklist.iter_mut().find(|(d, _)| *d == dir) {
            entry.1 = ticks;
        } else {
            self.blacklist.push((dir, ticks));
        }
    }

    pub fn is_blacklisted(&self, dir: Direction) -> bool {
        self.blacklist.iter().any(|(d, ticks)| *d == dir && *ticks > 0)
    }

    /// Decrements all blacklist countdowns by one tick; call once per tick.
    pub fn tick_blacklist(&mut self) {
        self.blacklist.retain_mut(|(_, ticks)| {
            *ticks = ticks.saturating_sub(1);
            *ticks > 0
        });
    }

    /// Whether the agent is stuck per the precise window/distinct-count contract.
    pub fn is_stuck(&self, window: usize, distinct_threshold: usize) -> bool {
        let take = window.min(self.ring.len());
        if take == 0 {
            return false;
        }
        let mut seen: Vec<TilePos> = Vec::with_capacity(take);
        for pos in self.ring.iter().rev().take(take) {
            if !seen.contains(pos) {
                seen.push(*pos);
            }
        }
        seen.len() <= distinct_threshold
    }

    pub fn enter_escape(&mut self, ticks: u32) {
        self.escape_ticks_remaining = ticks;
    }

    pub fn is_escaping(&self) -> bool {
        self.escape_ticks_remaining > 0
    }

    /// Consumes one tick of escape mode; returns `Escaping` if escape continues, `Normal` if
    /// escape mode has just ended (either by natural expiry or by the caller reporting every
    /// tried direction was blocked this tick).
    pub fn tick_escape(&mut self, all_directions_blocked: bool) -> EscapeState {
        if self.escape_ticks_remaining == 0 {
            return EscapeState::Normal;
        }
        if all_directions_blocked {
            self.escape_ticks_remaining = 0;
            return EscapeState::Normal;
        }
        self.escape_ticks_remaining -= 1;
        EscapeState::Escaping
    }

    pub fn clear_ring(&mut self) {
        self.ring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_oscillation_between_few_tiles() {
        let mut t = OscillationTracker::new(12);
        let a = TilePos::new(0, 0);
        let b = TilePos::new(1, 0);
        for i in 0..10 {
            t.record_position(if i % 2 == 0 { a } else { b });
        }
        assert!(t.is_stuck(10, 2));
    }

    #[test]
    fn not_stuck_when_exploring_new_tiles() {
        let mut t = OscillationTracker::new(12);
        for i in 0..10 {
            t.record_position(TilePos::new(i, 0));
        }
        assert!(!t.is_stuck(10, 2));
    }

    #[test]
    fn builder_uses_shorter_window() {
        let mut t = OscillationTracker::new(12);
        // 6 oscillating, then 4 varied positions further back that would bring distinct count up
        // if the full window were considered
        for i in 0..4 {
            t.record_position(TilePos::new(i + 100, 0));
        }
        let a = TilePos::new(0, 0);
        let b = TilePos::new(1, 0);
        for i in 0..6 {
            t.record_position(if i % 2 == 0 { a } else { b });
        }
        assert!(t.is_stuck(6, 2));
    }

    #[test]
    fn blacklist_expires() {
        let mut t = OscillationTracker::new(12);
        t.blacklist_direction(Direction::N, 2);
        assert!(t.is_blacklisted(Direction::N));
        t.tick_blacklist();
        assert!(t.is_blacklisted(Direction::N));
        t.tick_blacklist();
        assert!(!t.is_blacklisted(Direction::N));
    }

    #[test]
    fn escape_mode_ends_when_all_blocked() {
        let mut t = OscillationTracker::new(12);
        t.enter_escape(10);
        assert_eq!(t.tick_escape(false), EscapeState::Escaping);
        assert_eq!(t.tick_escape(true), EscapeState::Normal);
        assert!(!t.is_escaping());
    }
}
