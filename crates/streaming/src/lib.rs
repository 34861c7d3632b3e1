pub mod cell;
pub mod fetch;
pub mod store;

pub use cell::*;
pub use fetch::*;
pub use store::*;
