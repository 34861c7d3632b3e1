pub mod coastline;

pub use coastline::*;
