//! Pooled resources shared across connected parts.
//!
//! Every vessel owns a [`ResourceNetwork`]: for each resource some part
//! relates to, the related parts are split into connected groups and each
//! group shares one [`ResourcePool`]. Storages are the backing store; a
//! pool sums them on construction and writes its amount back with
//! [`ResourceNetwork::distribute`] before the network is rebuilt.

use std::collections::BTreeMap;

use crate::assembly::Assembly;
use crate::catalog::PartCatalog;
use crate::components::{
    Amount, Part, PartExtension, PartId, ResourceId, ResourceRate, ResourceSystemId, ResourceTag,
    Stack, Storage,
};
use crate::error::PreconditionError;
use crate::graph;

/// Amount domains that have a storage extension backing them.
pub trait StorageAccess: Amount {
    fn storages(part: &Part) -> Vec<&Storage<Self>>;
    fn storages_mut(part: &mut Part) -> Vec<&mut Storage<Self>>;
}

impl StorageAccess for f32 {
    fn storages(part: &Part) -> Vec<&Storage<f32>> {
        part.extensions
            .iter()
            .filter_map(|e| match e {
                PartExtension::Storage(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn storages_mut(part: &mut Part) -> Vec<&mut Storage<f32>> {
        part.extensions
            .iter_mut()
            .filter_map(|e| match e {
                PartExtension::Storage(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl StorageAccess for i32 {
    fn storages(part: &Part) -> Vec<&Storage<i32>> {
        part.extensions
            .iter()
            .filter_map(|e| match e {
                PartExtension::SolidStorage(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn storages_mut(part: &mut Part) -> Vec<&mut Storage<i32>> {
        part.extensions
            .iter_mut()
            .filter_map(|e| match e {
                PartExtension::SolidStorage(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

fn rate_for(rates: &[ResourceRate], resource: &ResourceId) -> f32 {
    rates
        .iter()
        .filter(|r| &r.resource == resource)
        .map(|r| r.per_second)
        .sum()
}

/// One resource shared by a fixed set of parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePool<A> {
    id: ResourceSystemId,
    members: Vec<PartId>,
    held: ResourceTag,
    amount: A,
    capacity: A,
    consumption: f32,
    output: f32,
}

/// Continuous pool (fuel, power).
pub type FluidPool = ResourcePool<f32>;
/// Discrete pool (ore, ammunition).
pub type SolidPool = ResourcePool<i32>;

impl<A: StorageAccess> ResourcePool<A> {
    /// Build a pool over `members`, summing their storages of `id.resource`.
    ///
    /// Fails if `members` is empty, names a part not in `assembly`, or names
    /// a part that does not relate to the resource.
    pub fn new(
        id: ResourceSystemId,
        members: Vec<PartId>,
        assembly: &Assembly,
    ) -> Result<Self, PreconditionError> {
        if members.is_empty() {
            return Err(PreconditionError::EmptyPool(id.resource));
        }
        let mut amount = A::ZERO;
        let mut capacity = A::ZERO;
        let mut consumption = 0.0;
        let mut output = 0.0;
        for &member in &members {
            let part = assembly
                .part(member)
                .ok_or(PreconditionError::UnknownPart(member))?;
            if !part.relates_to(&id.resource) {
                return Err(PreconditionError::UnrelatedMember {
                    part: member,
                    resource: id.resource.clone(),
                });
            }
            for storage in A::storages(part) {
                match storage.resource() {
                    Some(r) if r == &id.resource => {
                        capacity = capacity + storage.stack;
                        amount = amount + storage.content.amount;
                    }
                    _ => {}
                }
            }
            for ext in &part.extensions {
                consumption += rate_for(ext.consumption(), &id.resource);
                output += rate_for(ext.output(), &id.resource);
            }
        }
        let held = if amount > A::ZERO {
            ResourceTag::Typed(id.resource.clone())
        } else {
            ResourceTag::Empty
        };
        Ok(Self {
            id,
            members,
            held,
            amount,
            capacity,
            consumption,
            output,
        })
    }

    pub fn id(&self) -> &ResourceSystemId {
        &self.id
    }

    pub fn resource(&self) -> &ResourceId {
        &self.id.resource
    }

    pub fn members(&self) -> &[PartId] {
        &self.members
    }

    pub fn amount(&self) -> A {
        self.amount
    }

    pub fn capacity(&self) -> A {
        self.capacity
    }

    /// Tag of what the pool holds; `Empty` whenever the amount is zero.
    pub fn held(&self) -> &ResourceTag {
        &self.held
    }

    /// Sum of the members' declared consumption of this resource, per second.
    pub fn consumption_rate(&self) -> f32 {
        self.consumption
    }

    pub fn output_rate(&self) -> f32 {
        self.output
    }

    /// Fraction of capacity in use, 0 for a pool with no storage.
    pub fn fill_level(&self) -> f32 {
        let capacity = self.capacity.to_f32();
        if capacity > 0.0 {
            self.amount.to_f32() / capacity
        } else {
            0.0
        }
    }

    pub fn has_space(&self, amount: A) -> bool {
        !amount.is_negative()
            && self
                .amount
                .checked_add(amount)
                .is_some_and(|total| total <= self.capacity)
    }

    pub fn has_resource(&self, amount: A) -> bool {
        if amount.is_negative() {
            return false;
        }
        amount <= A::ZERO || (!self.held.is_empty() && self.amount >= amount)
    }

    pub fn try_add(&mut self, amount: A) -> bool {
        if !self.has_space(amount) {
            return false;
        }
        self.amount = self.amount + amount;
        if self.amount > A::ZERO {
            self.held = ResourceTag::Typed(self.id.resource.clone());
        }
        true
    }

    pub fn try_remove(&mut self, amount: A) -> bool {
        if !self.has_resource(amount) {
            return false;
        }
        self.amount = self.amount - amount;
        if self.amount <= A::ZERO {
            self.amount = A::ZERO;
            self.held = ResourceTag::Empty;
        }
        true
    }

    /// Whether a stack could be merged in: the tags must agree and it must fit.
    pub fn has_space_for(&self, stack: &Stack<A>) -> bool {
        let own = ResourceTag::Typed(self.id.resource.clone());
        own.accepts(&stack.tag) && self.has_space(stack.amount)
    }

    pub fn try_add_stack(&mut self, stack: &Stack<A>) -> bool {
        self.has_space_for(stack) && self.try_add(stack.amount)
    }

    /// Write the pooled amount back into member storages in member order,
    /// filling each up to its stack.
    pub fn distribute(&self, assembly: &mut Assembly) {
        let mut remaining = self.amount;
        for &member in &self.members {
            let Some(part) = assembly.part_mut(member) else {
                continue;
            };
            for storage in A::storages_mut(part) {
                if storage.resource() != Some(&self.id.resource) {
                    continue;
                }
                remaining = storage.refill(&self.id.resource, remaining);
            }
        }
        if remaining > A::ZERO {
            log::warn!("Pool {} lost {} on write-back", self.id, remaining);
        }
    }
}

/// All pools of one vessel.
#[derive(Debug, Clone, Default)]
pub struct ResourceNetwork {
    fluid: BTreeMap<ResourceSystemId, FluidPool>,
    solid: BTreeMap<ResourceSystemId, SolidPool>,
}

impl ResourceNetwork {
    /// Group every placed part of `assembly` into pools and record the
    /// system ids on the parts.
    pub fn build(assembly: &mut Assembly, catalog: &PartCatalog) -> Self {
        let mut network = Self::default();
        let placed = assembly.placed_ids();

        let mut resources: Vec<ResourceId> = Vec::new();
        for part in assembly.parts_mut() {
            part.resource_systems.clear();
            if !part.is_placed() {
                continue;
            }
            for id in part.related_to() {
                if !resources.contains(&id) {
                    resources.push(id);
                }
            }
        }

        for resource in resources {
            let related: Vec<PartId> = placed
                .iter()
                .copied()
                .filter(|id| assembly.part(*id).is_some_and(|p| p.relates_to(&resource)))
                .collect();
            let groups = graph::split(&*assembly, &related);
            let discrete = catalog.is_discrete(&resource);
            for (index, members) in groups.into_iter().enumerate() {
                let sid = ResourceSystemId::new(index, resource.clone());
                let built = if discrete {
                    SolidPool::new(sid.clone(), members.clone(), assembly)
                        .map(|pool| {
                            network.solid.insert(sid.clone(), pool);
                        })
                } else {
                    FluidPool::new(sid.clone(), members.clone(), assembly)
                        .map(|pool| {
                            network.fluid.insert(sid.clone(), pool);
                        })
                };
                if let Err(e) = built {
                    log::warn!("Skipping resource system {}: {}", sid, e);
                    continue;
                }
                for member in members {
                    if let Some(part) = assembly.part_mut(member) {
                        part.resource_systems.push(sid.clone());
                    }
                }
            }
        }
        log::debug!(
            "Built resource network: {} fluid, {} solid pools",
            network.fluid.len(),
            network.solid.len()
        );
        network
    }

    pub fn len(&self) -> usize {
        self.fluid.len() + self.solid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<&ResourceSystemId> {
        self.fluid.keys().chain(self.solid.keys()).collect()
    }

    pub fn fluid(&self, id: &ResourceSystemId) -> Option<&FluidPool> {
        self.fluid.get(id)
    }

    pub fn fluid_mut(&mut self, id: &ResourceSystemId) -> Option<&mut FluidPool> {
        self.fluid.get_mut(id)
    }

    pub fn solid(&self, id: &ResourceSystemId) -> Option<&SolidPool> {
        self.solid.get(id)
    }

    pub fn solid_mut(&mut self, id: &ResourceSystemId) -> Option<&mut SolidPool> {
        self.solid.get_mut(id)
    }

    pub fn fluid_pools(&self) -> impl Iterator<Item = &FluidPool> {
        self.fluid.values()
    }

    pub fn solid_pools(&self) -> impl Iterator<Item = &SolidPool> {
        self.solid.values()
    }

    /// The system a part draws `resource` from.
    pub fn system_of<'a>(part: &'a Part, resource: &ResourceId) -> Option<&'a ResourceSystemId> {
        part.resource_systems.iter().find(|s| &s.resource == resource)
    }

    /// Total continuous amount of `resource` across all of its pools.
    pub fn total_fluid(&self, resource: &ResourceId) -> f32 {
        self.fluid
            .values()
            .filter(|p| p.resource() == resource)
            .map(|p| p.amount())
            .sum()
    }

    pub fn total_solid(&self, resource: &ResourceId) -> i32 {
        self.solid
            .values()
            .filter(|p| p.resource() == resource)
            .map(|p| p.amount())
            .sum()
    }

    /// Draw `rate × dt` of every listed resource from `part`'s pools, all or
    /// nothing. Only continuous pools can be drawn from.
    pub fn try_consume(&mut self, part: &Part, rates: &[ResourceRate], dt: f32) -> bool {
        let mut draws = Vec::with_capacity(rates.len());
        for rate in rates {
            let amount = rate.per_second * dt;
            if amount <= 0.0 {
                continue;
            }
            let Some(sid) = Self::system_of(part, &rate.resource) else {
                return false;
            };
            match self.fluid.get(sid) {
                Some(pool) if pool.has_resource(amount) => draws.push((sid.clone(), amount)),
                _ => return false,
            }
        }
        for (sid, amount) in draws {
            if let Some(pool) = self.fluid.get_mut(&sid) {
                pool.try_remove(amount);
            }
        }
        true
    }

    /// Run one generator step: consume inputs and produce outputs only if
    /// every input is available and every output has room.
    pub fn try_convert(
        &mut self,
        part: &Part,
        consumption: &[ResourceRate],
        output: &[ResourceRate],
        dt: f32,
    ) -> bool {
        for rate in output {
            let amount = rate.per_second * dt;
            let Some(sid) = Self::system_of(part, &rate.resource) else {
                return false;
            };
            match self.fluid.get(sid) {
                Some(pool) if pool.has_space(amount) => {}
                _ => return false,
            }
        }
        if !self.can_consume(part, consumption, dt) {
            return false;
        }
        self.try_consume(part, consumption, dt);
        for rate in output {
            if let Some(sid) = Self::system_of(part, &rate.resource) {
                if let Some(pool) = self.fluid.get_mut(sid) {
                    pool.try_add(rate.per_second * dt);
                }
            }
        }
        true
    }

    fn can_consume(&self, part: &Part, rates: &[ResourceRate], dt: f32) -> bool {
        rates.iter().all(|rate| {
            let amount = rate.per_second * dt;
            amount <= 0.0
                || Self::system_of(part, &rate.resource)
                    .and_then(|sid| self.fluid.get(sid))
                    .is_some_and(|pool| pool.has_resource(amount))
        })
    }

    /// Write every pool back into its member storages.
    pub fn distribute(&self, assembly: &mut Assembly) {
        for pool in self.fluid.values() {
            pool.distribute(assembly);
        }
        for pool in self.solid.values() {
            pool.distribute(assembly);
        }
    }
}
