//! Error types for misuse of the core API.
//!
//! Domain refusals (a part that does not fit, a pool that is full) are not
//! errors; they come back as `bool` or outcome enums. The types here cover
//! precondition violations: calls that are wrong no matter what the world
//! looks like. None of them leave partial mutations behind.

use glam::IVec2;
use thiserror::Error;

use crate::components::{PartId, ResourceId};

/// A call was made with arguments or in a state the operation does not accept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("field size must be non-negative, got {width}x{height}")]
    NegativeFieldSize { width: i32, height: i32 },

    #[error("field of {width}x{height} exceeds {limit} cells")]
    FieldTooLarge { width: i32, height: i32, limit: usize },

    #[error("rectangle [{start}, {end}) is not inside field of size {size}")]
    InvalidRect { start: IVec2, end: IVec2, size: IVec2 },

    #[error("part {0} is already oriented")]
    AlreadyOriented(PartId),

    #[error("part {0} is not oriented")]
    NotOriented(PartId),

    #[error("part {0} is already placed")]
    AlreadyPlaced(PartId),

    #[error("part {0} is not placed")]
    NotPlaced(PartId),

    #[error("part {0} is not part of this assembly")]
    UnknownPart(PartId),

    #[error("part {0} is already part of this assembly")]
    DuplicatePart(PartId),

    #[error("part {0} has been destroyed")]
    Destroyed(PartId),

    #[error("resource pool for `{0}` needs at least one member")]
    EmptyPool(ResourceId),

    #[error("part {part} does not relate to resource `{resource}`")]
    UnrelatedMember { part: PartId, resource: ResourceId },

    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f32 },

    #[error("mass must be non-negative, got {0}")]
    NegativeMass(f32),

    #[error("storage start amount {amount} does not fit stack {stack}")]
    StorageOverfilled { amount: f32, stack: f32 },

    #[error("unknown part config `{0}`")]
    UnknownConfig(String),

    #[error("no part is held")]
    NothingHeld,

    #[error("entity {0:?} is not a vessel")]
    UnknownVessel(hecs::Entity),
}
