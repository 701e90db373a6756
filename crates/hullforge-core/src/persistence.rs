//! Save/Load of vessel layouts
//!
//! A layout lists every part by catalog key, orientation and grid
//! rectangle, grouped into connected components. It is written as JSON for
//! hand-edited designs and as versioned bincode for compact saves, and it
//! loads back either into a builder (editable) or into live vessels
//! (simulated).

use std::io::{Read, Write};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembly::Assembly;
use crate::catalog::PartCatalog;
use crate::components::{CenterOfMass, Orientation, Part, PartId, Rect};
use crate::error::PreconditionError;
use crate::graph;
use crate::vessel::Vessel;

/// Version number for layout format (increment when format changes)
pub const LAYOUT_VERSION: u32 = 1;

/// One part of a saved layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartLayout {
    /// Catalog key
    pub config: String,
    pub orientation: Orientation,
    pub start: IVec2,
    pub end: IVec2,
}

impl PartLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.start, self.end)
    }
}

/// A connected group of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLayout {
    pub bounds: Rect,
    /// Relative to `bounds.start`.
    pub center_of_mass: CenterOfMass,
    pub parts: Vec<PartLayout>,
}

/// Serializable snapshot of a design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipLayout {
    /// Layout format version
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub bounds: Rect,
    pub components: Vec<ComponentLayout>,
}

impl ShipLayout {
    /// Capture the placed parts of `assembly`, one component per connected group.
    pub fn from_assembly(name: impl Into<String>, description: impl Into<String>, assembly: &Assembly) -> Self {
        let placed = assembly.placed_ids();
        let components: Vec<ComponentLayout> = graph::split(assembly, &placed)
            .into_iter()
            .filter_map(|members| component_layout(assembly, &members))
            .collect();
        let bounds = Rect::bounding(components.iter().map(|c| &c.bounds)).unwrap_or(Rect::ZERO);
        Self {
            version: LAYOUT_VERSION,
            name: name.into(),
            description: description.into(),
            bounds,
            components,
        }
    }

    pub fn from_vessel(vessel: &Vessel, description: impl Into<String>) -> Self {
        Self::from_assembly(vessel.name.clone(), description, vessel.assembly())
    }

    pub fn part_count(&self) -> usize {
        self.components.iter().map(|c| c.parts.len()).sum()
    }
}

fn component_layout(assembly: &Assembly, members: &[PartId]) -> Option<ComponentLayout> {
    let parts: Vec<&Part> = members.iter().filter_map(|id| assembly.part(*id)).collect();
    let rects: Vec<Rect> = parts.iter().map(|p| p.rect()).collect();
    let bounds = Rect::bounding(&rects)?;
    let mut center_of_mass = CenterOfMass::average(parts.iter().map(|p| p.center_of_mass()));
    if center_of_mass.mass > 0.0 {
        center_of_mass.position -= bounds.start.as_vec2();
    }
    let parts = parts
        .iter()
        .filter_map(|p| {
            Some(PartLayout {
                config: p.config.clone(),
                orientation: p.orientation()?,
                start: p.rect().start,
                end: p.rect().end,
            })
        })
        .collect();
    Some(ComponentLayout {
        bounds,
        center_of_mass,
        parts,
    })
}

/// How a layout should be reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadMode {
    /// Oriented, unplaced parts for a builder.
    Editable,
    /// Placed parts inside vessels, ready for a rigid body.
    Simulated,
}

/// An oriented part and where the layout put its corner, relative to the
/// layout bounds.
#[derive(Debug, Clone)]
pub struct EditablePart {
    pub part: Part,
    pub start: IVec2,
}

/// A vessel rebuilt from a layout. `offset` is the corner of its field in
/// layout space, i.e. where its body sits relative to the layout origin.
#[derive(Debug, Clone)]
pub struct LoadedVessel {
    pub vessel: Vessel,
    pub offset: IVec2,
}

impl LoadedVessel {
    pub fn body_position(&self, origin: Vec2) -> Vec2 {
        origin + self.offset.as_vec2()
    }
}

/// Result of [`load_layout`].
#[derive(Debug, Clone)]
pub enum LoadedLayout {
    Editable(Vec<EditablePart>),
    Simulated(Vec<LoadedVessel>),
}

fn build_part(
    layout: &PartLayout,
    id: PartId,
    catalog: &PartCatalog,
) -> Result<Part, SaveError> {
    let config = catalog
        .part(&layout.config)
        .ok_or_else(|| SaveError::UnknownConfig(layout.config.clone()))?;
    let mut part = Part::new(id, config)?;
    part.orient(layout.orientation)?;
    let rect = layout.rect();
    if part.extent() != Some(rect.size()) {
        return Err(SaveError::Precondition(PreconditionError::InvalidRect {
            start: rect.start,
            end: rect.end,
            size: part.extent().unwrap_or(IVec2::ZERO),
        }));
    }
    Ok(part)
}

/// Rebuild a layout against `catalog`.
///
/// Part ids are assigned in layout order starting at `first_id`.
pub fn load_layout(
    layout: &ShipLayout,
    mode: LoadMode,
    catalog: &PartCatalog,
    first_id: u32,
) -> Result<LoadedLayout, SaveError> {
    check_version(layout.version)?;
    let mut next_id = first_id;
    let mut fresh_id = || {
        let id = PartId(next_id);
        next_id += 1;
        id
    };

    match mode {
        LoadMode::Editable => {
            let mut parts = Vec::with_capacity(layout.part_count());
            for component in &layout.components {
                for entry in &component.parts {
                    let part = build_part(entry, fresh_id(), catalog)?;
                    parts.push(EditablePart {
                        part,
                        start: entry.start - layout.bounds.start,
                    });
                }
            }
            log::info!("Loaded layout '{}' for editing: {} parts", layout.name, parts.len());
            Ok(LoadedLayout::Editable(parts))
        }
        LoadMode::Simulated => {
            let mut vessels = Vec::with_capacity(layout.components.len());
            for component in &layout.components {
                // Declared bounds size the field, so they must be exactly the parts' box.
                let rects: Vec<Rect> = component.parts.iter().map(PartLayout::rect).collect();
                let covered = Rect::bounding(&rects);
                if covered != Some(component.bounds) {
                    return Err(SaveError::BoundsMismatch {
                        declared: component.bounds,
                        covered: covered.unwrap_or(Rect::ZERO),
                    });
                }
                let size = component.bounds.size();
                let mut assembly = Assembly::with_size(size.x, size.y)?;
                for entry in &component.parts {
                    let part = build_part(entry, fresh_id(), catalog)?;
                    let start = entry.start - component.bounds.start;
                    if assembly.try_insert_at(part, start).is_err() {
                        log::warn!("Layout '{}': {} does not fit at {}", layout.name, entry.config, entry.start);
                        return Err(SaveError::Placement {
                            config: entry.config.clone(),
                            start: entry.start,
                        });
                    }
                }
                let offset = component.bounds.start;
                for vessel in Vessel::connected_from(layout.name.clone(), assembly, catalog) {
                    vessels.push(LoadedVessel { vessel, offset });
                }
            }
            log::info!("Loaded layout '{}': {} vessels", layout.name, vessels.len());
            Ok(LoadedLayout::Simulated(vessels))
        }
    }
}

fn check_version(found: u32) -> Result<(), SaveError> {
    if found != LAYOUT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: LAYOUT_VERSION,
            found,
        });
    }
    Ok(())
}

/// Save a layout in the binary format
pub fn save_layout<W: Write>(writer: W, layout: &ShipLayout) -> Result<(), SaveError> {
    bincode::serialize_into(writer, layout)?;
    Ok(())
}

/// Load a layout from the binary format
pub fn load_layout_binary<R: Read>(reader: R) -> Result<ShipLayout, SaveError> {
    let layout: ShipLayout = bincode::deserialize_from(reader)?;
    check_version(layout.version)?;
    Ok(layout)
}

pub fn layout_to_json(layout: &ShipLayout) -> Result<String, SaveError> {
    Ok(serde_json::to_string_pretty(layout)?)
}

pub fn layout_from_json(json: &str) -> Result<ShipLayout, SaveError> {
    let layout: ShipLayout = serde_json::from_str(json)?;
    check_version(layout.version)?;
    Ok(layout)
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Layout version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("unknown part config `{0}`")]
    UnknownConfig(String),

    #[error("part `{config}` cannot be placed at {start}")]
    Placement { config: String, start: IVec2 },

    #[error("component bounds {declared:?} do not match its parts {covered:?}")]
    BoundsMismatch { declared: Rect, covered: Rect },

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}
