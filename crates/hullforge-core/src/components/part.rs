//! Part entity: one rectangular, oriented unit of a vessel.

use std::collections::BTreeSet;
use std::fmt;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::common::{CenterOfMass, Rect, MIN_HEALTH};
use super::control::ControllerId;
use super::extension::{ControlBlock, PartExtension};
use super::orientation::Orientation;
use super::resource::{ResourceId, ResourceSystemId};
use crate::catalog::PartConfig;
use crate::error::PreconditionError;

/// Arena key of a part. Unique within the owning assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(pub u32);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a part is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartState {
    /// Built from config, no orientation yet.
    Unoriented,
    /// Oriented but not in any field (fresh or picked up).
    Unplaced,
    /// Occupying cells of a field.
    Placed,
    Destroyed,
}

/// A part instance.
///
/// Geometry, mass and behavior come from a catalog [`PartConfig`]; the
/// part itself tracks orientation, placement, health and neighbors.
#[derive(Debug, Clone)]
pub struct Part {
    pub id: PartId,
    /// Catalog key of the config this part was built from.
    pub config: String,
    base_size: IVec2,
    local_center_of_mass: CenterOfMass,
    max_health: i32,
    impact_health: i32,
    health: i32,
    orientation: Option<Orientation>,
    rect: Rect,
    placed: bool,
    destroyed: bool,
    /// Disabled parts contribute neither force nor resource flow.
    pub enabled: bool,
    neighbors: BTreeSet<PartId>,
    pub extensions: Vec<PartExtension>,
    /// Pooled systems this part belongs to. Rebuilt with the owning network.
    pub resource_systems: Vec<ResourceSystemId>,
    /// Owning vessel entity, if any. Non-owning.
    pub vessel: Option<hecs::Entity>,
}

impl Part {
    /// Build an unoriented part at full health.
    pub fn new(id: PartId, config: &PartConfig) -> Result<Self, PreconditionError> {
        let extensions = config
            .extensions
            .iter()
            .map(PartExtension::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            config: config.id.clone(),
            base_size: config.size,
            local_center_of_mass: config.center_of_mass,
            max_health: config.max_health,
            impact_health: config.impact_health,
            health: config.max_health,
            orientation: None,
            rect: Rect::ZERO,
            placed: false,
            destroyed: false,
            enabled: true,
            neighbors: BTreeSet::new(),
            extensions,
            resource_systems: Vec::new(),
            vessel: None,
        })
    }

    pub fn state(&self) -> PartState {
        if self.destroyed {
            PartState::Destroyed
        } else if self.placed {
            PartState::Placed
        } else if self.orientation.is_some() {
            PartState::Unplaced
        } else {
            PartState::Unoriented
        }
    }

    /// Assign the orientation. Allowed exactly once.
    pub fn orient(&mut self, orientation: Orientation) -> Result<(), PreconditionError> {
        if self.destroyed {
            return Err(PreconditionError::Destroyed(self.id));
        }
        if self.orientation.is_some() {
            return Err(PreconditionError::AlreadyOriented(self.id));
        }
        self.orientation = Some(orientation);
        Ok(())
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    pub fn base_size(&self) -> IVec2 {
        self.base_size
    }

    /// Footprint size in grid cells once oriented.
    pub fn extent(&self) -> Option<IVec2> {
        self.orientation.map(|o| o.effective_extent(self.base_size))
    }

    /// Bounding rectangle. Meaningful only while placed.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn mark_placed(&mut self, rect: Rect) {
        self.rect = rect;
        self.placed = true;
    }

    pub(crate) fn mark_unplaced(&mut self) {
        self.placed = false;
        self.neighbors.clear();
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.mark_unplaced();
        self.destroyed = true;
        self.vessel = None;
        self.resource_systems.clear();
    }

    pub fn neighbors(&self) -> &BTreeSet<PartId> {
        &self.neighbors
    }

    pub(crate) fn set_neighbors(&mut self, neighbors: BTreeSet<PartId>) {
        self.neighbors = neighbors;
    }

    pub(crate) fn add_neighbor(&mut self, id: PartId) {
        if id != self.id {
            self.neighbors.insert(id);
        }
    }

    pub(crate) fn remove_neighbor(&mut self, id: PartId) {
        self.neighbors.remove(&id);
    }

    /// Map a point of the unrotated footprint into grid space.
    pub fn map_point(&self, local: Vec2) -> Vec2 {
        let orientation = self.orientation.unwrap_or_default();
        self.rect.start.as_vec2() + orientation.map_local(local, self.base_size.as_vec2())
    }

    /// Mass contribution in grid space.
    pub fn center_of_mass(&self) -> CenterOfMass {
        CenterOfMass {
            position: self.map_point(self.local_center_of_mass.position),
            mass: self.local_center_of_mass.mass,
        }
    }

    pub fn mass(&self) -> f32 {
        self.local_center_of_mass.mass
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.max_health
    }

    pub fn impact_health(&self) -> i32 {
        self.impact_health
    }

    /// Lose `amount` health, never dropping below [`MIN_HEALTH`].
    pub fn damage(&mut self, amount: i32) {
        self.health = self.health.saturating_sub(amount.max(0)).max(MIN_HEALTH);
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = self.health.saturating_add(amount.max(0)).min(self.max_health);
    }

    pub fn is_broken(&self) -> bool {
        self.health <= 0
    }

    /// Distinct resources this part's extensions relate to, first-seen order.
    pub fn related_to(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = Vec::new();
        for id in self.extensions.iter().flat_map(|e| e.related_to()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn relates_to(&self, resource: &ResourceId) -> bool {
        self.extensions
            .iter()
            .any(|e| e.related_to().iter().any(|r| r == resource))
    }

    pub fn control_block(&self) -> Option<&ControlBlock> {
        self.extensions.iter().find_map(|e| match e {
            PartExtension::ControlBlock(block) => Some(block),
            _ => None,
        })
    }

    pub fn control_block_mut(&mut self) -> Option<&mut ControlBlock> {
        self.extensions.iter_mut().find_map(|e| match e {
            PartExtension::ControlBlock(block) => Some(block),
            _ => None,
        })
    }

    /// Controller bound to this part's control block, if any.
    pub fn controller(&self) -> Option<ControllerId> {
        self.control_block().and_then(|b| b.controller)
    }

    /// Whether any extension is an engine or gyro.
    pub fn is_motion(&self) -> bool {
        self.extensions.iter().any(PartExtension::is_motion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExtensionConfig, PartCategory, StoredItem};
    use crate::components::{Direction, ResourceRate};

    fn tank_config() -> PartConfig {
        PartConfig {
            id: "core:tank".to_string(),
            name: "Tank".to_string(),
            description: String::new(),
            size: IVec2::new(1, 2),
            collider: Default::default(),
            category: PartCategory::Storages,
            max_health: 10,
            impact_health: 2,
            center_of_mass: CenterOfMass {
                position: Vec2::new(0.5, 0.5),
                mass: 3.0,
            },
            extensions: vec![
                ExtensionConfig::Storage {
                    stack: 50.0,
                    start: Some(StoredItem {
                        resource: "fuel".into(),
                        amount: 20.0,
                    }),
                },
                ExtensionConfig::Engine {
                    thrust: 2.0,
                    exhaust_length_multiplier: 1.0,
                    thrust_point: Vec2::new(0.5, 0.0),
                    relative_direction: Direction::Up,
                    consumption: vec![ResourceRate::new("fuel", 1.0)],
                },
            ],
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut part = Part::new(PartId(1), &tank_config()).unwrap();
        assert_eq!(part.state(), PartState::Unoriented);
        assert_eq!(part.extent(), None);

        part.orient(Orientation::RIGHT).unwrap();
        assert_eq!(part.state(), PartState::Unplaced);
        assert_eq!(part.extent(), Some(IVec2::new(2, 1)));
        assert_eq!(
            part.orient(Orientation::UP),
            Err(PreconditionError::AlreadyOriented(PartId(1)))
        );

        part.mark_placed(Rect::from_size(IVec2::new(3, 4), IVec2::new(2, 1)));
        assert_eq!(part.state(), PartState::Placed);
        part.mark_destroyed();
        assert_eq!(part.state(), PartState::Destroyed);
        assert!(part.orient(Orientation::UP).is_err());
    }

    #[test]
    fn test_health_clamps() {
        let mut part = Part::new(PartId(1), &tank_config()).unwrap();
        part.damage(5);
        assert_eq!(part.health(), 5);
        assert!(!part.is_broken());
        part.damage(100);
        assert_eq!(part.health(), MIN_HEALTH);
        assert!(part.is_broken());
        part.heal(100);
        assert_eq!(part.health(), 10);
    }

    #[test]
    fn test_extreme_damage_saturates() {
        let mut part = Part::new(PartId(1), &tank_config()).unwrap();
        part.damage(i32::MAX);
        assert_eq!(part.health(), MIN_HEALTH);
        part.damage(i32::MAX);
        assert_eq!(part.health(), MIN_HEALTH);
        part.heal(i32::MAX);
        assert_eq!(part.health(), 10);
        part.heal(i32::MAX);
        assert_eq!(part.health(), 10);
    }

    #[test]
    fn test_related_to_is_distinct() {
        let part = Part::new(PartId(1), &tank_config()).unwrap();
        assert_eq!(part.related_to(), vec![ResourceId::new("fuel")]);
        assert!(part.relates_to(&"fuel".into()));
        assert!(!part.relates_to(&"ore".into()));
    }

    #[test]
    fn test_center_of_mass_follows_orientation() {
        let mut part = Part::new(PartId(1), &tank_config()).unwrap();
        part.orient(Orientation::RIGHT).unwrap();
        part.mark_placed(Rect::from_size(IVec2::new(4, 0), IVec2::new(2, 1)));
        let com = part.center_of_mass();
        // (0.5, 0.5) in a 1x2 footprint turned right lands at (0.5, 0.5) of the 2x1 one.
        assert_eq!(com.position, Vec2::new(4.5, 0.5));
        assert_eq!(com.mass, 3.0);
    }
}
