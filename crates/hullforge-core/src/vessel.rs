//! Vessel aggregate: one connected set of placed parts.
//!
//! A vessel owns its parts through an [`Assembly`], caches the center of
//! mass, pools resources through a [`ResourceNetwork`] and defers part
//! destruction to a once-per-tick batch. When a batch disconnects the
//! parts, every component becomes a new vessel and this one is dissolved.

use std::collections::VecDeque;

use glam::IVec2;

use crate::assembly::Assembly;
use crate::catalog::PartCatalog;
use crate::components::{ActionSet, CenterOfMass, ControllerId, Part, PartId, Rect};
use crate::config::EngineConfig;
use crate::error::PreconditionError;
use crate::graph;
use crate::systems::propulsion::{self, Thrust};
use crate::systems::resource_pool::ResourceNetwork;

/// Lifecycle of a vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VesselState {
    Active,
    /// Split apart or emptied. Owns no parts and does nothing.
    Dissolved,
}

/// What a destruction batch did.
#[derive(Debug, Default)]
pub struct SplitOutcome {
    /// Parts removed by this batch.
    pub destroyed: Vec<PartId>,
    /// New vessels, one per component, when the batch disconnected the
    /// vessel. Empty when it stayed whole.
    pub fragments: Vec<Vessel>,
}

impl SplitOutcome {
    pub fn is_split(&self) -> bool {
        !self.fragments.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Vessel {
    pub name: String,
    assembly: Assembly,
    center_of_mass: CenterOfMass,
    pending_destroy: VecDeque<PartId>,
    needs_split_check: bool,
    state: VesselState,
    network: ResourceNetwork,
}

impl Vessel {
    /// Wrap already placed parts. The caller guarantees they are connected.
    pub fn new(name: impl Into<String>, mut assembly: Assembly, catalog: &PartCatalog) -> Self {
        let network = ResourceNetwork::build(&mut assembly, catalog);
        let center_of_mass = assembly.center_of_mass();
        Self {
            name: name.into(),
            assembly,
            center_of_mass,
            pending_destroy: VecDeque::new(),
            needs_split_check: false,
            state: VesselState::Active,
            network,
        }
    }

    /// Wrap placed parts that may not be connected, one vessel per component.
    pub fn connected_from(
        name: impl Into<String>,
        assembly: Assembly,
        catalog: &PartCatalog,
    ) -> Vec<Vessel> {
        let mut vessel = Self::new(name, assembly, catalog);
        vessel.needs_split_check = true;
        let outcome = vessel.process_destruction(catalog);
        if outcome.is_split() {
            outcome.fragments
        } else {
            vec![vessel]
        }
    }

    /// A vessel with no parts in a `width × height` field.
    pub fn empty(name: impl Into<String>, width: i32, height: i32) -> Result<Self, PreconditionError> {
        Ok(Self {
            name: name.into(),
            assembly: Assembly::with_size(width, height)?,
            center_of_mass: CenterOfMass::ZERO,
            pending_destroy: VecDeque::new(),
            needs_split_check: false,
            state: VesselState::Active,
            network: ResourceNetwork::default(),
        })
    }

    /// Record `entity` as the owner on every part.
    pub fn bind_entity(&mut self, entity: hecs::Entity) {
        for part in self.assembly.parts_mut() {
            part.vessel = Some(entity);
        }
    }

    pub fn state(&self) -> VesselState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == VesselState::Active
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.assembly.part(id)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.assembly.part_mut(id)
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.assembly.parts()
    }

    pub fn len(&self) -> usize {
        self.assembly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assembly.is_empty()
    }

    pub fn contains(&self, id: PartId) -> bool {
        self.assembly.contains(id)
    }

    /// Cached mass-weighted center, in vessel grid space.
    pub fn center_of_mass(&self) -> CenterOfMass {
        self.center_of_mass
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.assembly.bounds()
    }

    pub fn network(&self) -> &ResourceNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut ResourceNetwork {
        &mut self.network
    }

    pub fn pending_destroy(&self) -> impl Iterator<Item = PartId> + '_ {
        self.pending_destroy.iter().copied()
    }

    /// Rotational inertia about the center of mass, treating each part as a
    /// uniform box.
    pub fn moment_of_inertia(&self) -> f32 {
        let center = self.center_of_mass.position;
        self.assembly
            .parts()
            .filter(|p| p.is_placed())
            .map(|p| {
                let com = p.center_of_mass();
                let size = p.rect().size().as_vec2();
                com.mass * ((com.position - center).length_squared() + size.length_squared() / 12.0)
            })
            .sum()
    }

    fn membership_changed(&mut self, catalog: &PartCatalog) {
        self.network = ResourceNetwork::build(&mut self.assembly, catalog);
        self.center_of_mass = self.assembly.center_of_mass();
    }

    /// Add an oriented, unplaced part with its corner at `start`.
    ///
    /// The part is handed back if its id is taken, it is not ready to
    /// place, or its footprint does not fit.
    pub fn try_add(&mut self, part: Part, start: IVec2, catalog: &PartCatalog) -> Result<(), Part> {
        if !self.is_active() {
            return Err(part);
        }
        let id = part.id;
        self.network.distribute(&mut self.assembly);
        self.assembly.try_insert_at(part, start)?;
        let isolated = self.assembly.part(id).is_some_and(|p| p.neighbors().is_empty());
        if isolated && self.assembly.len() > 1 {
            self.needs_split_check = true;
        }
        self.membership_changed(catalog);
        log::debug!("Vessel {}: added part {}", self.name, id);
        Ok(())
    }

    /// Remove a member immediately and hand it back unplaced.
    ///
    /// Connectivity is checked on the next [`Vessel::process_destruction`].
    pub fn try_remove(&mut self, id: PartId, catalog: &PartCatalog) -> Option<Part> {
        if !self.assembly.contains(id) {
            return None;
        }
        self.network.distribute(&mut self.assembly);
        let mut part = self.assembly.remove(id)?;
        part.vessel = None;
        part.resource_systems.clear();
        self.pending_destroy.retain(|p| *p != id);
        self.needs_split_check = true;
        self.membership_changed(catalog);
        Some(part)
    }

    /// Queue a member for destruction at the end of the tick.
    pub fn request_destroy(&mut self, id: PartId) -> Result<(), PreconditionError> {
        if !self.assembly.contains(id) {
            return Err(PreconditionError::UnknownPart(id));
        }
        if !self.pending_destroy.contains(&id) {
            self.pending_destroy.push_back(id);
        }
        Ok(())
    }

    /// Lower a part's health; a part at or below zero is queued for destruction.
    pub fn damage_part(&mut self, id: PartId, amount: i32) -> Result<i32, PreconditionError> {
        let part = self
            .assembly
            .part_mut(id)
            .ok_or(PreconditionError::UnknownPart(id))?;
        part.damage(amount);
        let health = part.health();
        if part.is_broken() {
            self.request_destroy(id)?;
        }
        Ok(health)
    }

    /// Apply a collision impulse to a part. Returns the damage dealt.
    pub fn apply_impact(
        &mut self,
        id: PartId,
        impulse: f32,
        config: &EngineConfig,
    ) -> Result<i32, PreconditionError> {
        let part = self
            .assembly
            .part(id)
            .ok_or(PreconditionError::UnknownPart(id))?;
        let damage = config
            .impact_damage(impulse)
            .saturating_sub(part.impact_health());
        if damage <= 0 {
            return Ok(0);
        }
        self.damage_part(id, damage)?;
        Ok(damage)
    }

    /// Bind a controller to a part's control block.
    ///
    /// `Ok(false)` if the part has no control block or someone else holds it.
    pub fn bind_controller(
        &mut self,
        id: PartId,
        controller: ControllerId,
    ) -> Result<bool, PreconditionError> {
        let part = self
            .assembly
            .part_mut(id)
            .ok_or(PreconditionError::UnknownPart(id))?;
        Ok(part
            .control_block_mut()
            .is_some_and(|block| block.try_bind(controller)))
    }

    pub fn unbind_controller(&mut self, id: PartId) -> Option<ControllerId> {
        self.assembly
            .part_mut(id)
            .and_then(|p| p.control_block_mut())
            .and_then(|block| block.unbind())
    }

    /// Controllers bound to any control block, without duplicates.
    pub fn controllers(&self) -> Vec<ControllerId> {
        let mut controllers: Vec<ControllerId> = Vec::new();
        for id in self.assembly.parts().filter_map(Part::controller) {
            if !controllers.contains(&id) {
                controllers.push(id);
            }
        }
        controllers
    }

    /// Whether at least one control block is bound.
    pub fn is_under_control(&self) -> bool {
        self.assembly.parts().any(|p| p.controller().is_some())
    }

    /// One simulation step: generators run, then thrust is aggregated for
    /// `actions` if the vessel is under control.
    pub fn tick(&mut self, actions: ActionSet, dt: f32) -> Thrust {
        if !self.is_active() {
            return Thrust::ZERO;
        }
        propulsion::run_generators(&self.assembly, &mut self.network, dt);
        if !self.is_under_control() {
            return Thrust::ZERO;
        }
        propulsion::compute_thrust(
            &self.assembly,
            &mut self.network,
            self.center_of_mass.position,
            actions,
            dt,
        )
    }

    /// Run the queued destruction batch and split if it disconnected the
    /// vessel.
    pub fn process_destruction(&mut self, catalog: &PartCatalog) -> SplitOutcome {
        let mut outcome = SplitOutcome::default();
        if !self.is_active() || (self.pending_destroy.is_empty() && !self.needs_split_check) {
            return outcome;
        }
        self.needs_split_check = false;
        self.network.distribute(&mut self.assembly);

        while let Some(id) = self.pending_destroy.pop_front() {
            if let Some(mut part) = self.assembly.remove(id) {
                part.mark_destroyed();
                outcome.destroyed.push(id);
            }
        }
        self.assembly.rebuild_adjacency();

        let components = graph::split(&self.assembly, &self.assembly.placed_ids());
        match components.len() {
            0 => {
                log::info!("Vessel {} lost its last part", self.name);
                self.membership_changed(catalog);
                self.state = VesselState::Dissolved;
            }
            1 => self.membership_changed(catalog),
            n => {
                log::info!("Vessel {} split into {} pieces", self.name, n);
                outcome.fragments = self.split_off(components, catalog);
                self.membership_changed(catalog);
                self.state = VesselState::Dissolved;
            }
        }
        outcome
    }

    fn split_off(&mut self, components: Vec<Vec<PartId>>, catalog: &PartCatalog) -> Vec<Vessel> {
        let size = self.assembly.field().size();
        let mut fragments = Vec::with_capacity(components.len());
        for (i, members) in components.into_iter().enumerate() {
            let Ok(mut assembly) = Assembly::with_size(size.x, size.y) else {
                continue;
            };
            for id in members {
                let Some(mut part) = self.assembly.remove(id) else {
                    continue;
                };
                let start = part.rect().start;
                part.vessel = None;
                if assembly.try_insert_at(part, start).is_err() {
                    log::warn!("Vessel {}: part {} lost while splitting", self.name, id);
                }
            }
            fragments.push(Vessel::new(format!("{}-{}", self.name, i + 1), assembly, catalog));
        }
        fragments
    }
}
