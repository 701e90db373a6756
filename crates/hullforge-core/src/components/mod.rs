//! Component definitions.
//!
//! Plain data describing parts, their orientation, resources and control
//! input. Behavior that spans many parts lives in `systems` and `vessel`.

mod common;
mod control;
mod extension;
mod orientation;
mod part;
mod resource;

pub use common::*;
pub use control::*;
pub use extension::*;
pub use orientation::*;
pub use part::*;
pub use resource::*;
