//! Generic scaffolding for the scripted decision controller: an ordered-options scheduler, an
//! A* planner with a hard node cap, an expanding-square spiral search, and anti-oscillation
//! tracking. Domain-specific roles and options live in `simulation::controller`.

mod astar;
mod option;
mod spiral;
mod stuck;

pub use astar::AStar;
pub use option::{choose, BoxedOpt, Opt};
pub use spiral::SpiralSearch;
pub use stuck::{EscapeState, OscillationTracker};
