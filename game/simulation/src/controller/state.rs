use rand::Rng;

use ai::{OscillationTracker, SpiralSearch};
use config::Controller as ControllerConfig;
use grid::{Direction, TilePos};

/// Which ordered options list an agent is dispatched to. Seeded deterministically on first
/// use: the first two agent slots per team are Gatherers, the next two Builders, the next two
/// Fighters, and any remaining slots are assigned randomly from the seeded engine RNG.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Role {
    Gatherer,
    Builder,
    Fighter,
}

/// Deterministic role seeding for `slot_in_team` (an agent's index within its own team, not its
/// global `agentId`).
pub fn seed_role(slot_in_team: u32, rng: &mut impl Rng) -> Role {
    match slot_in_team {
        0 | 1 => Role::Gatherer,
        2 | 3 => Role::Builder,
        4 | 5 => Role::Fighter,
        _ => match rng.gen_range(0..3) {
            0 => Role::Gatherer,
            1 => Role::Builder,
            _ => Role::Fighter,
        },
    }
}

/// Everything the controller remembers about one agent across ticks: its role, spiral search and
/// anti-oscillation state, a cached A* plan, and the builder's standing-spot lock.
/// `current_option` is the index into whichever role's options list
/// was last selected — owned here rather than by a short-lived blackboard, since the blackboard
/// itself is rebuilt fresh every tick (see `ai::choose`).
#[derive(Clone, Debug)]
pub struct AgentControllerState {
    pub role: Role,
    pub spiral: SpiralSearch,
    pub oscillation: OscillationTracker,
    pub planned_path: Vec<TilePos>,
    pub planned_target: Option<TilePos>,
    pub build_target: Option<(TilePos, TilePos)>,
    pub build_lock: u32,
    /// The direction the escape routine is currently trying: a random cardinal chosen on
    /// entering escape, then its perpendiculars, then its reverse, cycled tick by tick.
    pub escape_dir: Option<Direction>,
    escape_attempt: u8,
    current_option: Option<usize>,
}

impl AgentControllerState {
    pub fn new(role: Role, home_altar: TilePos, clockwise: bool, cfg: &ControllerConfig) -> Self {
        Self {
            role,
            spiral: SpiralSearch::new(home_altar, clockwise, cfg.spiral_max_arcs),
            oscillation: OscillationTracker::new(cfg.oscillation_ring_size),
            planned_path: Vec::new(),
            planned_target: None,
            build_target: None,
            build_lock: 0,
            escape_dir: None,
            escape_attempt: 0,
            current_option: None,
        }
    }

    /// Enters escape mode: picks a random cardinal as the first direction to try and
    /// resets the attempt cycle (cardinal, its two perpendiculars, then its reverse).
    pub fn enter_escape(&mut self, ticks: u32, rng: &mut impl Rng) {
        let cardinal = Direction::CARDINAL[rng.gen_range(0..4)];
        self.escape_dir = Some(cardinal);
        self.escape_attempt = 0;
        self.oscillation.enter_escape(ticks);
        self.invalidate_path();
    }

    /// The next direction to try in the current escape cycle: the chosen cardinal, then its two
    /// perpendiculars, then its reverse.
    pub fn escape_candidate(&self) -> Option<Direction> {
        let base = self.escape_dir?;
        Some(match self.escape_attempt {
            0 => base,
            1 => base.perpendiculars()[0],
            2 => base.perpendiculars()[1],
            _ => base.opposite(),
        })
    }

    /// Advances to the next candidate in the escape cycle, wrapping after the reverse attempt.
    pub fn advance_escape_attempt(&mut self) {
        self.escape_attempt = (self.escape_attempt + 1) % 4;
    }

    pub fn current_option(&mut self) -> &mut Option<usize> {
        &mut self.current_option
    }

    /// Clears the cached plan, invalidating it (target changed, drifted off-path, or
    /// declared stuck).
    pub fn invalidate_path(&mut self) {
        self.planned_path.clear();
        self.planned_target = None;
    }

    /// Forces the role dispatcher to rescan from the top of its options list next tick, e.g.
    /// after the anti-oscillation detector declares the agent stuck.
    pub fn reset_option(&mut self) {
        self.current_option = None;
    }

    pub fn stuck_window(&self, cfg: &ControllerConfig) -> usize {
        match self.role {
            Role::Builder => cfg.stuck_window_builder,
            _ => cfg.stuck_window_other,
        }
    }
}
