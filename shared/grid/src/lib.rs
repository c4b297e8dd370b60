mod coord;
mod grid_impl;

pub use coord::{Direction, TilePos, DEAD_SENTINEL};
pub use grid_impl::TileGrid;
