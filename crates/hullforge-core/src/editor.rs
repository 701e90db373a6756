//! Builder workspace.
//!
//! A [`Blueprint`] is what the placement collaborator drives while a ship is
//! being designed: one part at a time is held on the cursor, dropped into
//! the grid, picked back up, copied or destroyed. Launching turns the grid
//! into a [`ShipLayout`].

use glam::{IVec2, Vec2};

use crate::assembly::{Assembly, ReleaseOutcome};
use crate::catalog::PartCatalog;
use crate::components::{Orientation, Part, PartId};
use crate::config::EngineConfig;
use crate::error::PreconditionError;
use crate::persistence::{self, LoadMode, LoadedLayout, SaveError, ShipLayout};

/// The part riding on the cursor. It is built and oriented only when
/// dropped, so the cursor can keep turning it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Held {
    id: PartId,
    config: String,
}

#[derive(Debug, Clone)]
pub struct Blueprint {
    pub name: String,
    pub description: String,
    assembly: Assembly,
    cursor: Orientation,
    held: Option<Held>,
    next_id: u32,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, width: i32, height: i32) -> Result<Self, PreconditionError> {
        Ok(Self {
            name: name.into(),
            description: String::new(),
            assembly: Assembly::with_size(width, height)?,
            cursor: Orientation::UP,
            held: None,
            next_id: 0,
        })
    }

    /// A blueprint with the configured builder grid.
    pub fn from_config(name: impl Into<String>, config: &EngineConfig) -> Result<Self, PreconditionError> {
        let size = config.builder_field_size;
        Self::new(name, size.x, size.y)
    }

    pub fn assembly(&self) -> &Assembly {
        &self.assembly
    }

    pub fn len(&self) -> usize {
        self.assembly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assembly.is_empty()
    }

    pub fn cursor(&self) -> Orientation {
        self.cursor
    }

    pub fn set_cursor(&mut self, orientation: Orientation) {
        self.cursor = orientation;
    }

    pub fn rotate_cursor(&mut self) -> Orientation {
        self.cursor = self.cursor.rotate_clockwise();
        self.cursor
    }

    pub fn flip_cursor_x(&mut self) -> Orientation {
        self.cursor = self.cursor.flip_x();
        self.cursor
    }

    pub fn flip_cursor_y(&mut self) -> Orientation {
        self.cursor = self.cursor.flip_y();
        self.cursor
    }

    /// Catalog key of the held part, if any.
    pub fn held(&self) -> Option<&str> {
        self.held.as_ref().map(|h| h.config.as_str())
    }

    fn fresh_id(&mut self) -> PartId {
        let id = PartId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Put a new part of kind `config` on the cursor, replacing anything held.
    pub fn create_part(&mut self, config: &str, catalog: &PartCatalog) -> Result<PartId, PreconditionError> {
        if catalog.part(config).is_none() {
            return Err(PreconditionError::UnknownConfig(config.to_string()));
        }
        if let Some(old) = self.held.take() {
            log::debug!("Dropped held part {} ({})", old.id, old.config);
        }
        let id = self.fresh_id();
        self.held = Some(Held {
            id,
            config: config.to_string(),
        });
        Ok(id)
    }

    /// Lift the part under `position` onto the cursor. The cursor takes the
    /// part's orientation. Declined while something is already held.
    pub fn pick_at(&mut self, position: Vec2) -> Option<PartId> {
        if self.held.is_some() {
            return None;
        }
        let id = self.assembly.point_query(position)?;
        let part = self.assembly.remove(id)?;
        if let Some(orientation) = part.orientation() {
            self.cursor = orientation;
        }
        self.held = Some(Held {
            id,
            config: part.config,
        });
        Some(id)
    }

    /// Drop the held part centered at `center` with the cursor orientation.
    ///
    /// A declined drop keeps the part on the cursor; a drop entirely off
    /// the grid discards it.
    pub fn release_at(
        &mut self,
        center: Vec2,
        catalog: &PartCatalog,
    ) -> Result<ReleaseOutcome, PreconditionError> {
        let held = self.held.clone().ok_or(PreconditionError::NothingHeld)?;
        let config = catalog
            .part(&held.config)
            .ok_or_else(|| PreconditionError::UnknownConfig(held.config.clone()))?;
        let mut part = Part::new(held.id, config)?;
        part.orient(self.cursor)?;
        self.assembly.insert(part)?;

        let outcome = self.assembly.try_release(held.id, center)?;
        match outcome {
            ReleaseOutcome::Placed | ReleaseOutcome::Discarded => self.held = None,
            ReleaseOutcome::Declined => {
                self.assembly.remove(held.id);
            }
        }
        log::debug!("Released {} at {}: {:?}", held.config, center, outcome);
        Ok(outcome)
    }

    /// Forget the held part.
    pub fn drop_held(&mut self) -> bool {
        self.held.take().is_some()
    }

    /// Delete the part under `position`.
    pub fn destroy_at(&mut self, position: Vec2) -> Option<PartId> {
        let id = self.assembly.point_query(position)?;
        self.assembly.remove(id).map(|part| part.id)
    }

    /// Put a fresh copy of the part under `position` on the cursor.
    pub fn copy_at(&mut self, position: Vec2) -> Option<PartId> {
        if self.held.is_some() {
            return None;
        }
        let source = self.assembly.point_query(position)?;
        let (config, orientation) = {
            let part = self.assembly.part(source)?;
            (part.config.clone(), part.orientation())
        };
        if let Some(orientation) = orientation {
            self.cursor = orientation;
        }
        let id = self.fresh_id();
        self.held = Some(Held { id, config });
        Some(id)
    }

    pub fn clear(&mut self) {
        self.assembly.drain();
        self.held = None;
    }

    /// Snapshot the grid as a layout.
    pub fn launch(&self) -> ShipLayout {
        ShipLayout::from_assembly(self.name.clone(), self.description.clone(), &self.assembly)
    }

    /// Replace the grid with `layout`, anchored at `anchor`. Returns how
    /// many parts fit.
    pub fn load(&mut self, layout: &ShipLayout, anchor: IVec2, catalog: &PartCatalog) -> Result<usize, SaveError> {
        let LoadedLayout::Editable(parts) = persistence::load_layout(layout, LoadMode::Editable, catalog, 0)? else {
            return Ok(0);
        };
        self.clear();
        self.name = layout.name.clone();
        self.description = layout.description.clone();
        self.next_id = 0;

        let mut placed = 0;
        for entry in parts {
            let mut part = entry.part;
            part.id = self.fresh_id();
            match self.assembly.try_insert_at(part, anchor + entry.start) {
                Ok(()) => placed += 1,
                Err(part) => log::warn!("Blueprint {}: {} does not fit", self.name, part.config),
            }
        }
        log::info!("Loaded blueprint {}: {} parts", self.name, placed);
        Ok(placed)
    }
}
