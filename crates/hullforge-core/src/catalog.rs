//! Part and item catalog.
//!
//! Loaded once per session from a JSON document and then shared read-only
//! (`&PartCatalog`) with everything that builds parts. Nothing in the core
//! keeps a global copy.

use std::collections::BTreeMap;
use std::io::Read;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{
    CenterOfMass, Direction, PartExtension, ResourceId, ResourceRate,
};
use crate::error::PreconditionError;

/// Editor palette grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartCategory {
    Control,
    Storages,
    Engines,
    Structure,
}

/// Collision shape handed to the physics collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum ColliderShape {
    /// Box covering the whole footprint.
    #[default]
    Rect,
    Circle { radius: f32 },
}

/// Initial content of a storage extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem<A> {
    pub resource: ResourceId,
    pub amount: A,
}

fn default_exhaust_multiplier() -> f32 {
    1.0
}

/// Behavior profile entry. Each variant carries only its own parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExtensionConfig {
    ControlBlock,
    Engine {
        thrust: f32,
        #[serde(default = "default_exhaust_multiplier")]
        exhaust_length_multiplier: f32,
        /// Where the force is applied, in unrotated footprint coordinates.
        thrust_point: Vec2,
        /// Thrust direction relative to the part's facing.
        #[serde(default = "default_direction")]
        relative_direction: Direction,
        #[serde(default)]
        consumption: Vec<ResourceRate>,
    },
    Gyro {
        torque: f32,
        #[serde(default)]
        consumption: Vec<ResourceRate>,
    },
    Storage {
        stack: f32,
        #[serde(default)]
        start: Option<StoredItem<f32>>,
    },
    SolidStorage {
        stack: i32,
        #[serde(default)]
        start: Option<StoredItem<i32>>,
    },
    Generator {
        #[serde(default)]
        consumption: Vec<ResourceRate>,
        #[serde(default)]
        output: Vec<ResourceRate>,
    },
}

fn default_direction() -> Direction {
    Direction::Up
}

impl ExtensionConfig {
    /// Every resource this extension names.
    pub fn resources(&self) -> Vec<&ResourceId> {
        match self {
            ExtensionConfig::ControlBlock => Vec::new(),
            ExtensionConfig::Engine { consumption, .. } | ExtensionConfig::Gyro { consumption, .. } => {
                consumption.iter().map(|r| &r.resource).collect()
            }
            ExtensionConfig::Storage { start, .. } => start.iter().map(|s| &s.resource).collect(),
            ExtensionConfig::SolidStorage { start, .. } => {
                start.iter().map(|s| &s.resource).collect()
            }
            ExtensionConfig::Generator { consumption, output } => consumption
                .iter()
                .chain(output.iter())
                .map(|r| &r.resource)
                .collect(),
        }
    }
}

/// Everything needed to build one kind of part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unrotated footprint in cells.
    pub size: IVec2,
    #[serde(default)]
    pub collider: ColliderShape,
    pub category: PartCategory,
    pub max_health: i32,
    /// Impact damage absorbed before health is lost.
    #[serde(default)]
    pub impact_health: i32,
    /// Mass and its position in unrotated footprint coordinates.
    pub center_of_mass: CenterOfMass,
    #[serde(default)]
    pub extensions: Vec<ExtensionConfig>,
}

impl PartConfig {
    pub fn has_extension(&self, matches: impl Fn(&ExtensionConfig) -> bool) -> bool {
        self.extensions.iter().any(matches)
    }
}

/// A resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConfig {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub mass: f32,
    /// Counted in whole units rather than measured.
    #[serde(default)]
    pub discrete: bool,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate part id `{0}`")]
    DuplicatePart(String),

    #[error("duplicate item id `{0}`")]
    DuplicateItem(ResourceId),

    #[error("part `{part}`: {reason}")]
    InvalidPart { part: String, reason: String },

    #[error("part `{part}`: {source}")]
    InvalidExtension {
        part: String,
        #[source]
        source: PreconditionError,
    },

    #[error("part `{part}` references unknown resource `{resource}`")]
    UnknownResource { part: String, resource: ResourceId },
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    items: Vec<ItemConfig>,
    parts: Vec<PartConfig>,
}

/// Immutable registry of part and item configs.
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    parts: BTreeMap<String, PartConfig>,
    items: BTreeMap<ResourceId, ItemConfig>,
}

impl PartCatalog {
    /// Build and validate a catalog.
    pub fn new(items: Vec<ItemConfig>, parts: Vec<PartConfig>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for item in items {
            if catalog.items.contains_key(&item.id) {
                return Err(CatalogError::DuplicateItem(item.id));
            }
            catalog.items.insert(item.id.clone(), item);
        }
        for part in parts {
            catalog.validate(&part)?;
            if catalog.parts.contains_key(&part.id) {
                return Err(CatalogError::DuplicatePart(part.id));
            }
            catalog.parts.insert(part.id.clone(), part);
        }
        log::info!(
            "Loaded catalog: {} parts, {} items",
            catalog.parts.len(),
            catalog.items.len()
        );
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Self::new(doc.items, doc.parts)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_reader(reader)?;
        Self::new(doc.items, doc.parts)
    }

    pub fn part(&self, id: &str) -> Option<&PartConfig> {
        self.parts.get(id)
    }

    pub fn item(&self, id: &ResourceId) -> Option<&ItemConfig> {
        self.items.get(id)
    }

    /// Whether a resource is pooled in whole units. Unknown ids are continuous.
    pub fn is_discrete(&self, id: &ResourceId) -> bool {
        self.items.get(id).map(|i| i.discrete).unwrap_or(false)
    }

    pub fn parts(&self) -> impl Iterator<Item = &PartConfig> {
        self.parts.values()
    }

    pub fn parts_in(&self, category: PartCategory) -> impl Iterator<Item = &PartConfig> {
        self.parts.values().filter(move |p| p.category == category)
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn validate(&self, part: &PartConfig) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidPart {
            part: part.id.clone(),
            reason,
        };

        if part.size.x <= 0 || part.size.y <= 0 {
            return Err(invalid(format!("size must be positive, got {}", part.size)));
        }
        if part.max_health <= 0 {
            return Err(invalid(format!(
                "max health must be positive, got {}",
                part.max_health
            )));
        }
        if part.impact_health < 0 {
            return Err(invalid("impact health must be non-negative".to_string()));
        }
        let com = part.center_of_mass;
        let extent = part.size.as_vec2();
        if com.mass < 0.0 || com.position.cmplt(Vec2::ZERO).any() || com.position.cmpgt(extent).any()
        {
            return Err(invalid(format!(
                "center of mass {:?} outside footprint {}",
                com.position, part.size
            )));
        }

        for ext in &part.extensions {
            PartExtension::from_config(ext).map_err(|source| CatalogError::InvalidExtension {
                part: part.id.clone(),
                source,
            })?;
            for resource in ext.resources() {
                if !self.items.contains_key(resource) {
                    return Err(CatalogError::UnknownResource {
                        part: part.id.clone(),
                        resource: resource.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
