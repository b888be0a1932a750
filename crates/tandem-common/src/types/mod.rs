mod color;
mod geometry;

pub use color::*;
pub use geometry::*;
