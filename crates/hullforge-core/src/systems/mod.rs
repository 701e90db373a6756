//! Systems - per-tick passes over the vessel world

pub mod destruction;
pub mod physics;
pub mod propulsion;
pub mod resource_pool;

pub use destruction::*;
pub use physics::*;
pub use propulsion::*;
pub use resource_pool::*;
