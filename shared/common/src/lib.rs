pub use arrayvec::*;
pub use itertools::*;
pub use ordered_float::OrderedFloat;
pub use rand::prelude::*;
pub use smallvec::*;
pub use strum;
pub use thiserror::{self, Error};

pub use lazy_static::lazy_static;
pub use logging::{self, prelude::*};

pub use std::{
    error::Error,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::Hash,
};

pub mod newtype;
pub mod random;

pub type BoxedResult<T> = Result<T, Box<dyn Error>>;

/// Chebyshev (8-connected) distance between two grid coordinates.
#[inline]
pub fn chebyshev_distance(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

/// Manhattan (4-connected) distance, used for cardinal-adjacency checks (planting, doors).
#[inline]
pub fn manhattan_distance(a: (i32, i32), b: (i32, i32)) -> i32 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}
