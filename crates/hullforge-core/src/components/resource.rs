//! Resource identities, amounts and typed stacks.
//!
//! Two amount domains exist: continuous (`f32`, fluids and energy) and
//! discrete (`i32`, solid items). All stack and pool logic is written once
//! against [`Amount`].

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Catalog identifier of a resource type, e.g. `"fuel"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// What a stack or pool currently holds.
///
/// `Empty` is a distinct state, not a zero amount of the last resource:
/// an emptied container accepts any resource type again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceTag {
    #[default]
    Empty,
    Typed(ResourceId),
}

impl ResourceTag {
    pub fn id(&self) -> Option<&ResourceId> {
        match self {
            ResourceTag::Empty => None,
            ResourceTag::Typed(id) => Some(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResourceTag::Empty)
    }

    /// Whether something tagged `other` may be merged into this.
    pub fn accepts(&self, other: &ResourceTag) -> bool {
        match (self, other) {
            (ResourceTag::Empty, _) | (_, ResourceTag::Empty) => true,
            (ResourceTag::Typed(a), ResourceTag::Typed(b)) => a == b,
        }
    }
}

/// Numeric domain of a resource amount.
pub trait Amount:
    Copy + PartialOrd + fmt::Debug + fmt::Display + Add<Output = Self> + Sub<Output = Self> + Default
{
    const ZERO: Self;

    fn is_negative(self) -> bool {
        self < Self::ZERO
    }

    /// `self + other`, or `None` when the sum is not representable.
    fn checked_add(self, other: Self) -> Option<Self>;

    /// Lossy conversion for indicators and logging.
    fn to_f32(self) -> f32;
}

impl Amount for f32 {
    const ZERO: Self = 0.0;

    fn checked_add(self, other: Self) -> Option<Self> {
        let sum = self + other;
        sum.is_finite().then_some(sum)
    }

    fn to_f32(self) -> f32 {
        self
    }
}

impl Amount for i32 {
    const ZERO: Self = 0;

    fn checked_add(self, other: Self) -> Option<Self> {
        i32::checked_add(self, other)
    }

    fn to_f32(self) -> f32 {
        self as f32
    }
}

/// An amount of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stack<A> {
    pub tag: ResourceTag,
    pub amount: A,
}

/// Continuous stack (fuel, energy, coolant).
pub type FluidStack = Stack<f32>;
/// Discrete stack (ore, ammunition, crates).
pub type SolidStack = Stack<i32>;

impl<A: Amount> Stack<A> {
    pub fn new(id: impl Into<ResourceId>, amount: A) -> Self {
        Self {
            tag: ResourceTag::Typed(id.into()),
            amount,
        }
    }

    pub fn empty() -> Self {
        Self {
            tag: ResourceTag::Empty,
            amount: A::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_empty()
    }

    /// Combine two stacks. Mismatched types collapse to an empty stack,
    /// so callers check [`ResourceTag::accepts`] first.
    pub fn merged(&self, other: &Stack<A>) -> Stack<A> {
        let amount = self.amount + other.amount;
        match (&self.tag, &other.tag) {
            (ResourceTag::Typed(a), ResourceTag::Typed(b)) if a == b => Stack {
                tag: self.tag.clone(),
                amount,
            },
            (ResourceTag::Typed(_), ResourceTag::Empty) => Stack {
                tag: self.tag.clone(),
                amount,
            },
            (ResourceTag::Empty, ResourceTag::Typed(_)) => Stack {
                tag: other.tag.clone(),
                amount,
            },
            _ => Stack::empty(),
        }
    }
}

impl<A: Amount> fmt::Display for Stack<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            ResourceTag::Empty => write!(f, "{} (empty)", self.amount),
            ResourceTag::Typed(id) => write!(f, "{} {}", self.amount, id),
        }
    }
}

/// A per-second flow of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRate {
    pub resource: ResourceId,
    pub per_second: f32,
}

impl ResourceRate {
    pub fn new(resource: impl Into<ResourceId>, per_second: f32) -> Self {
        Self {
            resource: resource.into(),
            per_second,
        }
    }
}

/// Identity of one pooled resource system inside a vessel: the connected
/// group `index` of parts relating to `resource`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceSystemId {
    pub index: usize,
    pub resource: ResourceId,
}

impl ResourceSystemId {
    pub fn new(index: usize, resource: ResourceId) -> Self {
        Self { index, resource }
    }
}

impl fmt::Display for ResourceSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource, self.index)
    }
}

/// Sum rates per resource, keeping first-seen order.
pub fn total_rates<'a>(rates: impl IntoIterator<Item = &'a ResourceRate>) -> Vec<ResourceRate> {
    let mut totals: Vec<ResourceRate> = Vec::new();
    for rate in rates {
        match totals.iter_mut().find(|r| r.resource == rate.resource) {
            Some(total) => total.per_second += rate.per_second,
            None => totals.push(rate.clone()),
        }
    }
    totals
}
