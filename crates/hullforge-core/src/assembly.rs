//! Part arena bound to an occupancy field.
//!
//! `Assembly` is the place/pick/release contract shared by the builder
//! blueprint and by live vessels. It keeps three things consistent:
//! the arena, the field cells, and every part's neighbor set.

use std::collections::{BTreeMap, BTreeSet};

use glam::{IVec2, Vec2};

use crate::components::{CenterOfMass, Part, PartId, Rect};
use crate::error::PreconditionError;
use crate::field::OccupancyField;
use crate::graph::Adjacency;

/// Result of dropping a held part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The part now occupies the field.
    Placed,
    /// The footprint overlaps another part or the field edge; the part
    /// stays held.
    Declined,
    /// The footprint lies entirely outside the field; the part is gone.
    Discarded,
}

/// Owned parts plus the field they are placed in.
#[derive(Debug, Clone)]
pub struct Assembly {
    field: OccupancyField,
    parts: BTreeMap<PartId, Part>,
}

impl Assembly {
    pub fn new(field: OccupancyField) -> Self {
        Self {
            field,
            parts: BTreeMap::new(),
        }
    }

    pub fn with_size(width: i32, height: i32) -> Result<Self, PreconditionError> {
        Ok(Self::new(OccupancyField::new(width, height)?))
    }

    pub fn field(&self) -> &OccupancyField {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn contains(&self, id: PartId) -> bool {
        self.parts.contains_key(&id)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(&id)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(&id)
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn parts_mut(&mut self) -> impl Iterator<Item = &mut Part> {
        self.parts.values_mut()
    }

    /// Member ids in ascending order.
    pub fn ids(&self) -> Vec<PartId> {
        self.parts.keys().copied().collect()
    }

    pub fn placed_ids(&self) -> Vec<PartId> {
        self.parts
            .values()
            .filter(|p| p.is_placed())
            .map(|p| p.id)
            .collect()
    }

    /// Highest id in use, if any.
    pub fn max_id(&self) -> Option<PartId> {
        self.parts.keys().next_back().copied()
    }

    /// Take ownership of an unplaced part.
    pub fn insert(&mut self, part: Part) -> Result<(), PreconditionError> {
        if self.parts.contains_key(&part.id) {
            return Err(PreconditionError::DuplicatePart(part.id));
        }
        if part.is_destroyed() {
            return Err(PreconditionError::Destroyed(part.id));
        }
        if part.is_placed() {
            return Err(PreconditionError::AlreadyPlaced(part.id));
        }
        self.parts.insert(part.id, part);
        Ok(())
    }

    /// Take ownership of an oriented part and place it at `start` in one
    /// step, or hand it back untouched.
    pub fn try_insert_at(&mut self, part: Part, start: IVec2) -> Result<(), Part> {
        let Some(extent) = part.extent() else {
            return Err(part);
        };
        if self.parts.contains_key(&part.id) || part.is_placed() || part.is_destroyed() {
            return Err(part);
        }
        let rect = Rect::from_size(start, extent);
        if !self.field.is_inside(&rect)
            || !matches!(self.field.check_employment(rect.start, rect.end), Ok(true))
        {
            return Err(part);
        }
        let id = part.id;
        self.parts.insert(id, part);
        self.commit(id, rect);
        Ok(())
    }

    fn placeable(&self, id: PartId) -> Result<IVec2, PreconditionError> {
        let part = self
            .parts
            .get(&id)
            .ok_or(PreconditionError::UnknownPart(id))?;
        if part.is_destroyed() {
            return Err(PreconditionError::Destroyed(id));
        }
        if part.is_placed() {
            return Err(PreconditionError::AlreadyPlaced(id));
        }
        part.extent().ok_or(PreconditionError::NotOriented(id))
    }

    /// Place a part with its lower-left corner at `start`.
    ///
    /// Returns `Ok(false)` without touching anything if the footprint leaves
    /// the field or overlaps another part.
    pub fn place_at(&mut self, id: PartId, start: IVec2) -> Result<bool, PreconditionError> {
        let extent = self.placeable(id)?;
        let rect = Rect::from_size(start, extent);
        Ok(self.commit(id, rect))
    }

    /// Place a part whose footprint is centered at `center` (field space).
    pub fn try_place(&mut self, id: PartId, center: Vec2) -> Result<bool, PreconditionError> {
        let extent = self.placeable(id)?;
        let rect = OccupancyField::placement_rect(center, extent);
        Ok(self.commit(id, rect))
    }

    fn commit(&mut self, id: PartId, rect: Rect) -> bool {
        if !self.field.is_inside(&rect) {
            return false;
        }
        match self.field.check_employment(rect.start, rect.end) {
            Ok(true) => {}
            _ => return false,
        }
        if self.field.fill(id, rect.start, rect.end).is_err() {
            return false;
        }

        let neighbors = self.field.neighbors_of(&rect, id);
        for n in &neighbors {
            if let Some(other) = self.parts.get_mut(n) {
                other.add_neighbor(id);
            }
        }
        if let Some(part) = self.parts.get_mut(&id) {
            part.mark_placed(rect);
            part.set_neighbors(neighbors);
        }
        log::debug!("Placed part {} at {:?}", id, rect);
        true
    }

    /// Lift a placed part out of the field. It stays in the arena.
    pub fn pick(&mut self, id: PartId) -> Result<(), PreconditionError> {
        let part = self
            .parts
            .get(&id)
            .ok_or(PreconditionError::UnknownPart(id))?;
        if !part.is_placed() {
            return Err(PreconditionError::NotPlaced(id));
        }
        self.detach(id);
        Ok(())
    }

    fn detach(&mut self, id: PartId) {
        let former: Vec<PartId> = match self.parts.get_mut(&id) {
            Some(part) if part.is_placed() => {
                let former = part.neighbors().iter().copied().collect();
                part.mark_unplaced();
                former
            }
            _ => return,
        };
        for n in former {
            if let Some(other) = self.parts.get_mut(&n) {
                other.remove_neighbor(id);
            }
        }
        self.field.clear(id);
    }

    /// Drop a held part at `center`.
    pub fn try_release(&mut self, id: PartId, center: Vec2) -> Result<ReleaseOutcome, PreconditionError> {
        let extent = self.placeable(id)?;
        let rect = OccupancyField::placement_rect(center, extent);
        if !rect.intersects(&self.field.bounds()) {
            if let Some(mut part) = self.parts.remove(&id) {
                part.mark_destroyed();
            }
            log::debug!("Discarded part {} released outside the field", id);
            return Ok(ReleaseOutcome::Discarded);
        }
        if self.commit(id, rect) {
            Ok(ReleaseOutcome::Placed)
        } else {
            Ok(ReleaseOutcome::Declined)
        }
    }

    pub fn point_query(&self, position: Vec2) -> Option<PartId> {
        self.field.point_query(position)
    }

    /// Remove a part from the arena, freeing its cells first.
    pub fn remove(&mut self, id: PartId) -> Option<Part> {
        self.detach(id);
        self.parts.remove(&id)
    }

    /// Recompute every placed part's neighbor set from the field.
    pub fn rebuild_adjacency(&mut self) {
        let updates: Vec<(PartId, BTreeSet<PartId>)> = self
            .parts
            .values()
            .filter(|p| p.is_placed())
            .map(|p| (p.id, self.field.neighbors_of(&p.rect(), p.id)))
            .collect();
        for (id, neighbors) in updates {
            if let Some(part) = self.parts.get_mut(&id) {
                part.set_neighbors(neighbors);
            }
        }
    }

    /// Mass-weighted center of all placed parts.
    pub fn center_of_mass(&self) -> CenterOfMass {
        CenterOfMass::average(
            self.parts
                .values()
                .filter(|p| p.is_placed())
                .map(Part::center_of_mass),
        )
    }

    /// Bounding rectangle of all placed parts.
    pub fn bounds(&self) -> Option<Rect> {
        let rects: Vec<Rect> = self
            .parts
            .values()
            .filter(|p| p.is_placed())
            .map(Part::rect)
            .collect();
        Rect::bounding(&rects)
    }

    /// Hand every part back, unplacing them and emptying the field.
    pub fn drain(&mut self) -> Vec<Part> {
        for id in self.placed_ids() {
            self.detach(id);
        }
        std::mem::take(&mut self.parts).into_values().collect()
    }
}

impl Adjacency for Assembly {
    fn neighbors(&self, id: PartId) -> Option<&BTreeSet<PartId>> {
        self.parts.get(&id).map(Part::neighbors)
    }
}
